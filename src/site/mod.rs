//! Mapping of request paths to files under the served root.

pub mod resolver;

pub use resolver::{ResolveError, ResolvedResource, SiteRoot};
