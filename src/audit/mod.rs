//! Per-day audit trail of served requests.
//!
//! This is separate from the operational `tracing` output: audit entries are
//! plain text lines appended to `<dir>/<YYYY-MM-DD>.log`.

pub mod logger;

pub use logger::AuditLogger;
