//! Probe Pipeline Integration Tests
//!
//! Exercises the execute-project-report pipeline through the public API.
//! The offline tests feed materialized results through each probe's point
//! builder; the live tests run whole probes against a local server and are
//! ignored unless one is available.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use pgprobe::{ConnectionSpec, Probe, ProbeError, QueryOptions, QueryResult, Status};

// ============================================================================
// Test Helpers
// ============================================================================

fn local_spec() -> ConnectionSpec {
    ConnectionSpec {
        host: "localhost".to_string(),
        port: 5432,
        database: "postgres".to_string(),
        user: "postgres".to_string(),
        password: "postgres".to_string(),
        connect_timeout: Duration::from_secs(3),
    }
}

fn query_probe(sql: &str, count_tuples: bool, multirow: bool) -> Probe {
    Probe::Query(QueryOptions {
        sql: sql.to_string(),
        count_tuples,
        multirow,
        scheme: "postgres".to_string(),
    })
}

// ============================================================================
// Offline Pipeline Tests
// ============================================================================

#[test]
fn test_count_tuples_reports_single_point_with_row_count() {
    // A query returning 7 rows in row-count mode reports one point, value 7.
    let result = QueryResult {
        columns: vec!["foo".to_string()],
        rows: (0..7).map(|i| vec![json!(i)]).collect(),
    };

    let probe = query_probe("select foo from bar", true, false);
    let points = probe.points(&local_spec(), &result, 1438355430);

    assert_eq!(points.len(), 1);
    assert_eq!(points[0].to_string(), "postgres 7 1438355430");
}

#[test]
fn test_multirow_reports_prefixed_points_in_row_order() {
    let result = QueryResult {
        columns: vec!["name".to_string(), "value".to_string()],
        rows: vec![vec![json!("a"), json!(1)], vec![json!("b"), json!(2)]],
    };

    let probe = query_probe("select name, value from metrics", false, true);
    let points = probe.points(&local_spec(), &result, 100);

    let lines: Vec<String> = points.iter().map(ToString::to_string).collect();
    assert_eq!(lines, vec!["postgres.a 1 100".to_string(), "postgres.b 2 100".to_string()]);
}

#[test]
fn test_locks_probe_emits_per_mode_points() {
    let result = QueryResult {
        columns: vec!["mode".to_string(), "count".to_string()],
        rows: vec![vec![json!("accesssharelock"), json!(3)]],
    };

    let probe = Probe::Locks { scheme: "postgresql".to_string() };
    let points = probe.points(&local_spec(), &result, 100);

    assert_eq!(points[0].to_string(), "postgresql.locks.postgres.accesssharelock 3 100");
}

#[test]
fn test_alive_probe_emits_no_points() {
    let result =
        QueryResult { columns: vec!["version".to_string()], rows: vec![vec![json!("15.3")]] };
    assert!(Probe::Alive.points(&local_spec(), &result, 100).is_empty());
}

#[test]
fn test_probe_sql_table() {
    let spec = local_spec();
    assert_eq!(Probe::Alive.sql(&spec), "SELECT version()");
    assert!(Probe::Locks { scheme: String::new() }.sql(&spec).contains("pg_locks"));
    assert!(Probe::Bgwriter { scheme: String::new() }.sql(&spec).contains("pg_stat_bgwriter"));
    assert_eq!(query_probe("select 1", false, false).sql(&spec), "select 1");
}

// ============================================================================
// Failure Severity Tests
// ============================================================================

#[tokio::test]
async fn test_connectivity_failure_reports_critical() {
    let mut spec = local_spec();
    spec.host = "192.0.2.1".to_string(); // TEST-NET-1, never reachable
    spec.connect_timeout = Duration::from_millis(200);

    let report = Probe::Alive.report(&spec).await;
    assert_eq!(report.status, Status::Critical);
    assert_eq!(report.status.exit_code(), 2);
    assert!(report.points.is_empty());
}

#[tokio::test]
async fn test_connectivity_failure_message_is_single_line() {
    let mut spec = local_spec();
    spec.host = "192.0.2.1".to_string();
    spec.connect_timeout = Duration::from_millis(200);

    let err = pgprobe::execute(&spec, "SELECT 1").await.unwrap_err();
    assert!(matches!(err, ProbeError::ConnectionFailed(_)));
    assert!(!err.message().contains('\n'));
}

// ============================================================================
// Live Server Tests
// ============================================================================

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_alive_probe_reports_server_version() {
    let report = Probe::Alive.report(&local_spec()).await;
    assert_eq!(report.status, Status::Ok);
    assert!(report.message.unwrap().starts_with("Server version: PostgreSQL"));
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_invalid_sql_reports_unknown() {
    let report = query_probe("SELEC 1", false, false).report(&local_spec()).await;
    assert_eq!(report.status, Status::Unknown);
    assert_eq!(report.status.exit_code(), 3);
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_locks_probe_returns_points_against_live_server() {
    let report = Probe::Locks { scheme: "postgresql".to_string() }.report(&local_spec()).await;
    assert_eq!(report.status, Status::Ok);
    for point in &report.points {
        assert!(point.path.starts_with("postgresql.locks.postgres."));
    }
}

#[tokio::test]
#[ignore = "Requires running PostgreSQL instance"]
async fn test_bgwriter_probe_emits_counter_points() {
    let report = Probe::Bgwriter { scheme: "postgresql".to_string() }.report(&local_spec()).await;
    assert_eq!(report.status, Status::Ok);
    assert!(report.points.iter().any(|p| p.path == "postgresql.bgwriter.buffers_alloc"));
}
