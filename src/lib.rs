//! Static file server with unconditional gzip responses and a daily audit log.
//!
//! Core library for HTTP handling, site resolution and audit logging.

pub mod audit;
pub mod config;
pub mod http;
pub mod server;
pub mod site;
