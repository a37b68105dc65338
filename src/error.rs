//! Error Handling Infrastructure
//!
//! This module defines the failure taxonomy shared by all probes.
//!
//! # Error Categories
//! - `ConnectionFailed`: the server could not be reached or authenticated to,
//!   including connection timeouts. Reported as `critical`.
//! - `QueryFailed`: the server was reachable but the statement itself failed
//!   (syntax, permissions, constraint). Reported as `unknown`, since a broken
//!   monitoring query is indistinguishable from a broken target system.
//!
//! A missing pgpass credential is not an error; it simply leaves the password
//! empty (see [`crate::pgpass`]).

use thiserror::Error;

use crate::output::Status;

/// Main error type for probe operations
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Database connection failed (unreachable, auth rejected, timed out)
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Statement execution failed against a reachable server
    #[error("Query execution failed: {0}")]
    QueryFailed(String),
}

impl ProbeError {
    /// Create a connection failed error, keeping only the first line of the
    /// underlying diagnostic text
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(first_line(&message.into()))
    }

    /// Create a query failed error, keeping only the first line of the
    /// underlying diagnostic text
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(first_line(&message.into()))
    }

    /// Map this failure to the severity it is reported with
    #[must_use]
    pub const fn severity(&self) -> Status {
        match self {
            Self::ConnectionFailed(_) => Status::Critical,
            Self::QueryFailed(_) => Status::Unknown,
        }
    }

    /// Human-readable message, safe for a single-line status report
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Truncate multi-line diagnostic text to its first line
///
/// Driver errors can carry multi-line detail (hints, positions); only the
/// first line belongs in a single-line status message.
#[must_use]
pub fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim_end().to_string()
}

/// Result type alias for probe operations
pub type Result<T> = std::result::Result<T, ProbeError>;
