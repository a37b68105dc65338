//! Connection Handling and Query Execution
//!
//! One probe invocation opens exactly one connection, runs exactly one
//! statement, and releases the connection on every exit path. No pooling, no
//! retries: a failed probe is reported immediately and the scheduler decides
//! when to try again.
//!
//! # Failure Classification
//! - Connection establishment errors and timeouts become
//!   [`ProbeError::ConnectionFailed`].
//! - Errors the server reports for the statement itself
//!   ([`tokio_postgres::Error::as_db_error`] is `Some`) become
//!   [`ProbeError::QueryFailed`]; transport errors mid-statement are still
//!   connection failures.
//!
//! # Resource Discipline
//! The `tokio-postgres` client is the connection handle: dropping it ends the
//! spawned connection driver task, so release is tied to scope rather than to
//! garbage collection. `execute` additionally awaits the driver task so the
//! socket is gone before the probe reports.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Client, Config, NoTls, Row};
use tracing::debug;

use crate::error::{ProbeError, Result};

/// Default connection timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 3;

/// Normalized connection parameters for one probe invocation
///
/// Built once by merging explicit inputs with pgpass resolution, immutable
/// thereafter. An empty password means "let the server decide" (trust,
/// peer, or rejection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSpec {
    /// Hostname to connect to
    pub host: String,

    /// Database port
    pub port: u16,

    /// Database name
    pub database: String,

    /// Database user
    pub user: String,

    /// Password, possibly empty after resolution
    /// WARNING: Sensitive data, do not log or include in error messages
    pub password: String,

    /// Bound on connection establishment and statement execution
    pub connect_timeout: Duration,
}

impl ConnectionSpec {
    /// Copy of this spec pointed at a different database
    ///
    /// The bgwriter probe uses this to target the `postgres` maintenance
    /// database regardless of the configured database.
    #[must_use]
    pub fn with_database(&self, database: impl Into<String>) -> Self {
        Self { database: database.into(), ..self.clone() }
    }
}

/// Materialized result of one statement
///
/// Column order and row order are preserved; cell values are JSON values
/// (numeric, textual, boolean, or null).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column names in result-set order (empty for a zero-row result)
    pub columns: Vec<String>,

    /// Result rows, each cell aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Number of rows in the result
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First row, first column value, if any
    #[must_use]
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

/// Open a connection per `spec`, run `sql` as a single statement, and return
/// the materialized result or a classified failure
pub async fn execute(spec: &ConnectionSpec, sql: &str) -> Result<QueryResult> {
    let pg_config = build_pg_config(spec);

    debug!(host = %spec.host, port = spec.port, database = %spec.database, "connecting");
    let (client, connection) =
        match tokio::time::timeout(spec.connect_timeout, pg_config.connect(NoTls)).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => return Err(ProbeError::connection_failed(e.to_string())),
            Err(_) => {
                return Err(ProbeError::connection_failed(format!(
                    "connection timed out after {}s",
                    spec.connect_timeout.as_secs()
                )))
            }
        };

    // The connection task owns the socket; it finishes when the client drops.
    // Errors are not logged here to keep credentials out of diagnostics.
    let driver = tokio::spawn(async move {
        let _ = connection.await;
    });

    let result = run_statement(&client, sql, spec.connect_timeout).await;

    // Release the handle and wait for the socket to close before reporting.
    drop(client);
    let _ = driver.await;

    result
}

/// Build the driver-level config from a connection spec
fn build_pg_config(spec: &ConnectionSpec) -> Config {
    let mut pg_config = Config::new();
    pg_config
        .host(&spec.host)
        .port(spec.port)
        .user(&spec.user)
        .dbname(&spec.database)
        .connect_timeout(spec.connect_timeout)
        .application_name("pgprobe");

    // An empty password is left unset so server-side defaults apply.
    if !spec.password.is_empty() {
        pg_config.password(&spec.password);
    }

    pg_config
}

async fn run_statement(client: &Client, sql: &str, timeout: Duration) -> Result<QueryResult> {
    let rows = match tokio::time::timeout(timeout, client.query(sql, &[])).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(e)) => return Err(classify(&e)),
        Err(_) => {
            return Err(ProbeError::connection_failed(format!(
                "statement timed out after {}s",
                timeout.as_secs()
            )))
        }
    };

    materialize(&rows)
}

/// Split driver errors into the two reportable failure kinds
fn classify(error: &tokio_postgres::Error) -> ProbeError {
    if error.as_db_error().is_some() {
        ProbeError::query_failed(error.to_string())
    } else {
        ProbeError::connection_failed(error.to_string())
    }
}

fn materialize(rows: &[Row]) -> Result<QueryResult> {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let mut cells = Vec::with_capacity(row.len());
        for idx in 0..row.len() {
            cells.push(decode_cell(row, idx)?);
        }
        out.push(cells);
    }

    Ok(QueryResult { columns, rows: out })
}

fn get_cell<'a, T: FromSql<'a>>(row: &'a Row, idx: usize) -> Result<Option<T>> {
    row.try_get(idx).map_err(|e| {
        ProbeError::query_failed(format!(
            "could not decode column {}: {e}",
            row.columns()[idx].name()
        ))
    })
}

/// Convert one cell to a JSON value, null-aware
///
/// Types without a JSON-safe mapping fall back to their text form; a type
/// the driver cannot render as text surfaces as a query failure.
fn decode_cell(row: &Row, idx: usize) -> Result<Value> {
    let value = match *row.columns()[idx].type_() {
        Type::BOOL => get_cell::<bool>(row, idx)?.map_or(Value::Null, Value::Bool),

        Type::INT2 => get_cell::<i16>(row, idx)?
            .map_or(Value::Null, |v| Value::Number(i64::from(v).into())),
        Type::INT4 => get_cell::<i32>(row, idx)?
            .map_or(Value::Null, |v| Value::Number(i64::from(v).into())),
        Type::INT8 => {
            get_cell::<i64>(row, idx)?.map_or(Value::Null, |v| Value::Number(v.into()))
        }

        // NaN and infinity have no JSON rendering and become null
        Type::FLOAT4 => get_cell::<f32>(row, idx)?.map_or(Value::Null, |v| {
            serde_json::Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number)
        }),
        Type::FLOAT8 => get_cell::<f64>(row, idx)?.map_or(Value::Null, |v| {
            serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
        }),

        Type::VARCHAR | Type::TEXT | Type::BPCHAR | Type::NAME => {
            get_cell::<String>(row, idx)?.map_or(Value::Null, Value::String)
        }

        Type::JSON | Type::JSONB => get_cell::<Value>(row, idx)?.unwrap_or(Value::Null),

        Type::BYTEA => get_cell::<Vec<u8>>(row, idx)?.map_or(Value::Null, |v| {
            use base64::Engine;
            Value::String(base64::engine::general_purpose::STANDARD.encode(v))
        }),

        Type::TIMESTAMP => get_cell::<chrono::NaiveDateTime>(row, idx)?
            .map_or(Value::Null, |v| Value::String(v.format("%Y-%m-%dT%H:%M:%S").to_string())),
        Type::TIMESTAMPTZ => get_cell::<chrono::DateTime<chrono::Utc>>(row, idx)?
            .map_or(Value::Null, |v| Value::String(v.to_rfc3339())),
        Type::DATE => get_cell::<chrono::NaiveDate>(row, idx)?
            .map_or(Value::Null, |v| Value::String(v.format("%Y-%m-%d").to_string())),
        Type::TIME => get_cell::<chrono::NaiveTime>(row, idx)?
            .map_or(Value::Null, |v| Value::String(v.format("%H:%M:%S").to_string())),

        Type::UUID => get_cell::<uuid::Uuid>(row, idx)?
            .map_or(Value::Null, |v| Value::String(v.to_string())),

        _ => get_cell::<String>(row, idx)?.map_or(Value::Null, Value::String),
    };

    Ok(value)
}
