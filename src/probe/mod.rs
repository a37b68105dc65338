//! Probe Orchestration
//!
//! The four probe kinds share one pipeline - resolve credentials, connect,
//! execute one statement, project, report - and differ only in their SQL and
//! in how the result is projected:
//!
//! | probe    | statement                      | reported as                       |
//! |----------|--------------------------------|-----------------------------------|
//! | alive    | `SELECT version()`             | `OK: Server version: ...`         |
//! | locks    | per-mode lock counts           | `{scheme}.locks.{db}.{mode}`      |
//! | bgwriter | `pg_stat_bgwriter` counters    | `{scheme}.bgwriter.{column}`      |
//! | query    | caller-supplied SQL            | scalar, row count, or pairs       |
//!
//! Failures map to severities by kind: connection failures are `critical`,
//! statement failures are `unknown`.

use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::engine::{self, ConnectionSpec, QueryResult};
use crate::error::Result;
use crate::output::{graphite_value, DataPoint, ProbeReport};
use crate::projection::{project, Projected, ProjectionMode};

/// Liveness statement; the returned version string becomes the ok message
const ALIVE_SQL: &str = "SELECT version()";

/// Background-writer counters (pre-PG15 `pg_stat_bgwriter` layout)
const BGWRITER_SQL: &str = "SELECT checkpoints_timed, checkpoints_req, \
     checkpoint_write_time, checkpoint_sync_time, buffers_checkpoint, \
     buffers_clean, maxwritten_clean, buffers_backend, buffers_backend_fsync, \
     buffers_alloc FROM pg_stat_bgwriter";

/// The bgwriter view is cluster-wide; the probe always reads it through the
/// maintenance database
const MAINTENANCE_DATABASE: &str = "postgres";

/// Per-mode lock counts for one database
///
/// Mode names are lowercased in SQL so the generic pairs projection emits
/// metric-safe suffixes directly.
fn locks_sql(database: &str) -> String {
    format!(
        "SELECT lower(mode) AS mode, count(mode) AS count FROM pg_locks \
         WHERE database = (SELECT oid FROM pg_database WHERE datname = '{}') \
         GROUP BY mode",
        database.replace('\'', "''")
    )
}

/// Options for the generic query probe
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Statement to execute
    pub sql: String,

    /// Report the number of rows instead of any value
    pub count_tuples: bool,

    /// Emit one data point per row (column 0 names it, column 1 is the value)
    pub multirow: bool,

    /// Metric name prefix
    pub scheme: String,
}

impl QueryOptions {
    /// Projection mode selected by the flags; row counting wins over multirow
    #[must_use]
    pub fn mode(&self) -> ProjectionMode {
        if self.count_tuples {
            ProjectionMode::RowCount
        } else if self.multirow {
            ProjectionMode::MultiRowKeyValue
        } else {
            ProjectionMode::ScalarFirstRow
        }
    }
}

/// One probe kind with its per-kind configuration
#[derive(Debug, Clone)]
pub enum Probe {
    /// Log in and report the server version
    Alive,
    /// Per-mode lock counts for the target database
    Locks { scheme: String },
    /// Background-writer statistics
    Bgwriter { scheme: String },
    /// Arbitrary caller-supplied query
    Query(QueryOptions),
}

impl Probe {
    /// Run this probe and fold any failure into a reportable severity
    pub async fn report(&self, spec: &ConnectionSpec) -> ProbeReport {
        match self.run(spec).await {
            Ok(report) => report,
            Err(err) => ProbeReport::failure(err.severity(), err.message()),
        }
    }

    /// Run this probe against the server described by `spec`
    pub async fn run(&self, spec: &ConnectionSpec) -> Result<ProbeReport> {
        // One timestamp per invocation, shared by every emitted point.
        let timestamp = Utc::now().timestamp();
        let spec = self.effective_spec(spec);

        let result = engine::execute(&spec, &self.sql(&spec)).await?;
        let report = match self {
            Self::Alive => ProbeReport::ok(alive_message(&result)),
            _ => ProbeReport::metrics(self.points(&spec, &result, timestamp)),
        };

        debug!(points = report.points.len(), "probe completed");
        Ok(report)
    }

    /// The statement this probe executes
    #[must_use]
    pub fn sql(&self, spec: &ConnectionSpec) -> String {
        match self {
            Self::Alive => ALIVE_SQL.to_string(),
            Self::Locks { .. } => locks_sql(&spec.database),
            Self::Bgwriter { .. } => BGWRITER_SQL.to_string(),
            Self::Query(opts) => opts.sql.clone(),
        }
    }

    /// Data points this probe emits for a materialized result
    ///
    /// The liveness check reports a message rather than metrics and emits no
    /// points. The locks probe takes the target database for its metric
    /// paths from the connection spec it ran against.
    #[must_use]
    pub fn points(
        &self,
        spec: &ConnectionSpec,
        result: &QueryResult,
        timestamp: i64,
    ) -> Vec<DataPoint> {
        match self {
            Self::Alive => Vec::new(),
            Self::Locks { scheme } => locks_points(result, scheme, &spec.database, timestamp),
            Self::Bgwriter { scheme } => bgwriter_points(result, scheme, timestamp),
            Self::Query(opts) => query_points(result, opts, timestamp),
        }
    }

    /// The connection spec this probe actually uses
    ///
    /// The bgwriter probe targets the maintenance database regardless of the
    /// configured database.
    fn effective_spec(&self, spec: &ConnectionSpec) -> ConnectionSpec {
        match self {
            Self::Bgwriter { .. } => spec.with_database(MAINTENANCE_DATABASE),
            _ => spec.clone(),
        }
    }
}

fn alive_message(result: &QueryResult) -> String {
    let version = result.first_value().map(graphite_value).unwrap_or_default();
    format!("Server version: {version}")
}

fn locks_points(
    result: &QueryResult,
    scheme: &str,
    database: &str,
    timestamp: i64,
) -> Vec<DataPoint> {
    let prefix = format!("{scheme}.locks.{database}");
    match project(result, ProjectionMode::MultiRowKeyValue) {
        Projected::Pairs(pairs) => points_from_pairs(pairs, &prefix, timestamp),
        _ => Vec::new(),
    }
}

/// One data point per `pg_stat_bgwriter` column of the (single) result row
fn bgwriter_points(result: &QueryResult, scheme: &str, timestamp: i64) -> Vec<DataPoint> {
    let Some(row) = result.rows.first() else {
        return Vec::new();
    };
    result
        .columns
        .iter()
        .zip(row)
        .map(|(column, value)| {
            DataPoint::new(format!("{scheme}.bgwriter.{column}"), value, timestamp)
        })
        .collect()
}

fn query_points(result: &QueryResult, opts: &QueryOptions, timestamp: i64) -> Vec<DataPoint> {
    match project(result, opts.mode()) {
        Projected::Count(count) => {
            vec![DataPoint::new(opts.scheme.clone(), &Value::from(count), timestamp)]
        }
        Projected::Scalar(Some(value)) => {
            vec![DataPoint::new(opts.scheme.clone(), &value, timestamp)]
        }
        // Absent scalar means "no data", not a failure; emit nothing.
        Projected::Scalar(None) => Vec::new(),
        Projected::Pairs(pairs) => points_from_pairs(pairs, &opts.scheme, timestamp),
    }
}

/// Expand a pairs projection into data points under a metric prefix
fn points_from_pairs(
    pairs: Vec<(String, Value)>,
    prefix: &str,
    timestamp: i64,
) -> Vec<DataPoint> {
    pairs
        .into_iter()
        .map(|(name, value)| DataPoint::new(format!("{prefix}.{name}"), &value, timestamp))
        .collect()
}
