//! Probe Output Types
//!
//! This module defines what a probe is allowed to say: a severity with a
//! single-line message (check style) and/or Graphite-formatted metric data
//! points (metric style).
//!
//! # Output Contract
//! - Check output: `<SEVERITY>: <message>` on stdout
//! - Metric output: one `dotted.metric.path value unix_ts` line per point
//! - Severity maps 1:1 to the process exit code: ok=0, warning=1,
//!   critical=2, unknown=3
//!
//! Nothing else is written to stdout; diagnostics go to stderr via `tracing`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Coarse-grained health signal emitted by a probe
///
/// Ordered by severity so that statuses can be escalated with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Everything checked out
    Ok,
    /// Degraded but functioning
    Warning,
    /// The target is unreachable or broken
    Critical,
    /// The probe could not determine the target's health
    Unknown,
}

impl Status {
    /// Process exit code for this severity
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Warning => 1,
            Self::Critical => 2,
            Self::Unknown => 3,
        }
    }

    /// Uppercase label used in check output lines
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One Graphite-formatted metric data point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Dotted metric path, e.g. `postgresql.locks.mydb.accesssharelock`
    pub path: String,

    /// Rendered value (numeric or textual, as returned by the server)
    pub value: String,

    /// Unix timestamp in seconds, captured once per invocation
    pub timestamp: i64,
}

impl DataPoint {
    /// Build a data point from a raw query cell value
    pub fn new(path: impl Into<String>, value: &Value, timestamp: i64) -> Self {
        Self { path: path.into(), value: graphite_value(value), timestamp }
    }
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.value, self.timestamp)
    }
}

/// Render a query cell value the way Graphite expects it
///
/// Strings are emitted raw (no quotes), booleans as 0/1, null as the empty
/// string. Anything structured falls back to its JSON rendering.
#[must_use]
pub fn graphite_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The final word of one probe invocation
#[derive(Debug, Clone)]
pub struct ProbeReport {
    /// Severity, mapped to the process exit code by the caller
    pub status: Status,

    /// Check-style message line (metric probes usually have none)
    pub message: Option<String>,

    /// Metric data points, in emission order
    pub points: Vec<DataPoint>,
}

impl ProbeReport {
    /// Check-style ok report with a message line
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: Status::Ok, message: Some(message.into()), points: Vec::new() }
    }

    /// Metric-style ok report: data points only, no message line
    #[must_use]
    pub fn metrics(points: Vec<DataPoint>) -> Self {
        Self { status: Status::Ok, message: None, points }
    }

    /// Failure report at the given severity
    pub fn failure(status: Status, message: impl Into<String>) -> Self {
        Self { status, message: Some(message.into()), points: Vec::new() }
    }

    /// Render the stdout lines for this report
    #[must_use]
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = self.points.iter().map(ToString::to_string).collect();
        if let Some(message) = &self.message {
            lines.push(format!("{}: {}", self.status, message));
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_exit_codes() {
        assert_eq!(Status::Ok.exit_code(), 0);
        assert_eq!(Status::Warning.exit_code(), 1);
        assert_eq!(Status::Critical.exit_code(), 2);
        assert_eq!(Status::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_status_escalation_order() {
        assert!(Status::Ok < Status::Warning);
        assert!(Status::Warning < Status::Critical);
        assert!(Status::Critical < Status::Unknown);
        assert_eq!(std::cmp::max(Status::Ok, Status::Critical), Status::Critical);
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::Ok).unwrap(), r#""ok""#);
        assert_eq!(serde_json::to_string(&Status::Unknown).unwrap(), r#""unknown""#);
    }

    #[test]
    fn test_graphite_value_rendering() {
        assert_eq!(graphite_value(&json!(7)), "7");
        assert_eq!(graphite_value(&json!(3.5)), "3.5");
        assert_eq!(graphite_value(&json!("42")), "42");
        assert_eq!(graphite_value(&json!(true)), "1");
        assert_eq!(graphite_value(&json!(false)), "0");
        assert_eq!(graphite_value(&Value::Null), "");
    }

    #[test]
    fn test_data_point_display() {
        let point = DataPoint::new("postgresql.bgwriter.buffers_alloc", &json!(1024), 1438355430);
        insta::assert_snapshot!(point.to_string(), @"postgresql.bgwriter.buffers_alloc 1024 1438355430");
    }

    #[test]
    fn test_check_report_render() {
        let report = ProbeReport::ok("Server version: PostgreSQL 15.3");
        insta::assert_snapshot!(report.render(), @"OK: Server version: PostgreSQL 15.3");
    }

    #[test]
    fn test_failure_report_render() {
        let report = ProbeReport::failure(Status::Critical, "Connection failed: timed out");
        assert_eq!(report.render(), "CRITICAL: Connection failed: timed out");
    }

    #[test]
    fn test_metric_report_render() {
        let report = ProbeReport::metrics(vec![
            DataPoint::new("p.a", &json!(1), 100),
            DataPoint::new("p.b", &json!(2), 100),
        ]);
        assert_eq!(report.render(), "p.a 1 100\np.b 2 100");
        assert_eq!(report.status, Status::Ok);
    }
}
