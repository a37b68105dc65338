//! Result Projection
//!
//! A tabular query result is reduced to the value(s) a probe actually
//! reports under one of three policies:
//!
//! - [`ProjectionMode::ScalarFirstRow`] - first row, first column. Zero rows
//!   project to "absent", which callers treat as "no data", not a failure.
//! - [`ProjectionMode::RowCount`] - the number of rows, regardless of
//!   column content.
//! - [`ProjectionMode::MultiRowKeyValue`] - one (name, value) pair per row,
//!   column 0 naming the pair and column 1 carrying its value, row order
//!   preserved. Zero rows project to zero pairs.

use serde_json::Value;

use crate::engine::QueryResult;
use crate::output::graphite_value;

/// Policy by which a query result is reduced to reported value(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMode {
    /// First row, first column
    ScalarFirstRow,
    /// Number of rows returned
    RowCount,
    /// One (name, value) pair per row
    MultiRowKeyValue,
}

/// The projected value(s) of a successful query
#[derive(Debug, Clone, PartialEq)]
pub enum Projected {
    /// Single scalar; `None` means the result had no rows
    Scalar(Option<Value>),
    /// Row count
    Count(usize),
    /// (name, value) pairs in row order
    Pairs(Vec<(String, Value)>),
}

/// Reduce a query result per the given projection mode
#[must_use]
pub fn project(result: &QueryResult, mode: ProjectionMode) -> Projected {
    match mode {
        ProjectionMode::ScalarFirstRow => Projected::Scalar(result.first_value().cloned()),
        ProjectionMode::RowCount => Projected::Count(result.row_count()),
        ProjectionMode::MultiRowKeyValue => Projected::Pairs(
            result
                .rows
                .iter()
                .map(|row| {
                    let name = row.first().map(graphite_value).unwrap_or_default();
                    let value = row.get(1).cloned().unwrap_or(Value::Null);
                    (name, value)
                })
                .collect(),
        ),
    }
}
