//! Pgprobe - PostgreSQL Monitoring Probes
//!
//! Pgprobe is a family of short-lived monitoring probes against a PostgreSQL
//! server: a liveness check and metric collectors for lock counts,
//! background-writer statistics, and arbitrary queries. Every invocation
//! opens one connection, performs one unit of work, reports, and exits.
//!
//! # Core Principles
//! - One connection per invocation, released on every exit path
//! - Credentials resolved from a pgpass file when no password is given
//! - Connection failures are `critical`, statement failures are `unknown`
//! - stdout carries only the report; diagnostics go to stderr
//!
//! # Module Organization
//! - [`error`] - Failure taxonomy and severity mapping
//! - [`output`] - Severity, metric data points, report rendering
//! - [`pgpass`] - Credential resolution from pgpass-format files
//! - [`engine`] - Connection handling and query execution
//! - [`projection`] - Reduction of tabular results to reported values
//! - [`probe`] - The four probe kinds and their orchestration

pub mod engine;
pub mod error;
pub mod output;
pub mod pgpass;
pub mod probe;
pub mod projection;

// Re-export commonly used types for convenience
pub use engine::{execute, ConnectionSpec, QueryResult, DEFAULT_TIMEOUT_SECS};
pub use error::{first_line, ProbeError, Result};
pub use output::{graphite_value, DataPoint, ProbeReport, Status};
pub use pgpass::{pgpass_path, resolve, LookupKey, PgpassEntry};
pub use probe::{Probe, QueryOptions};
pub use projection::{project, Projected, ProjectionMode};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        let _status = Status::Ok;
        let _mode = ProjectionMode::RowCount;
        let _key = LookupKey::new("dbhost", 5432, "mydb", "alice");
    }
}
