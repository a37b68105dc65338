//! Pgpass Credential Resolution
//!
//! This module resolves a connection password from a pgpass-format file when
//! none is supplied explicitly.
//!
//! # File Format
//! Line-oriented text, one entry per line:
//! `host:port:database:user:password`. Lines whose first non-whitespace
//! character is `#` and blank lines are skipped. Any of the first four fields
//! may be `*`, which matches any value. A literal `:` or `\` inside a field
//! is escaped as `\:` or `\\`.
//!
//! # Resolution
//! Entries are scanned top to bottom and the first match wins. A missing or
//! unreadable file, or a file with no matching entry, is not an error - it is
//! simply "no credential found", and callers fall back to an empty password.
//!
//! # Path Precedence
//! Explicit flag > `PGPASSFILE` environment variable > `~/.pgpass`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Wildcard token matching any value for a field
const WILDCARD: &str = "*";

/// One parsed pgpass entry
///
/// All fields are stored unescaped; any of the first four may be the literal
/// wildcard `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PgpassEntry {
    pub host: String,
    pub port: String,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl PgpassEntry {
    /// Whether this entry matches the lookup key, honoring wildcards
    #[must_use]
    pub fn matches(&self, key: &LookupKey) -> bool {
        field_matches(&self.host, &key.host)
            && field_matches(&self.port, &key.port)
            && field_matches(&self.database, &key.database)
            && field_matches(&self.user, &key.user)
    }
}

/// The connection parameters a credential is looked up by
///
/// Holds literal values only, never wildcards. The port is kept in its
/// string form: pgpass matching is exact text comparison, no coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupKey {
    pub host: String,
    pub port: String,
    pub database: String,
    pub user: String,
}

impl LookupKey {
    /// Build a lookup key from connection parameters
    pub fn new(
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: port.to_string(),
            database: database.into(),
            user: user.into(),
        }
    }
}

/// Resolve the pgpass file path with flag > environment > default precedence
///
/// Returns `None` only when no explicit path is given, `PGPASSFILE` is unset,
/// and the home directory cannot be determined.
#[must_use]
pub fn pgpass_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path);
    }
    if let Ok(env_path) = std::env::var("PGPASSFILE") {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }
    dirs::home_dir().map(|home| home.join(".pgpass"))
}

/// Find the password for `key` in the pgpass file at `path`
///
/// Returns `None` when the file is absent or unreadable, or when no entry
/// matches.
#[must_use]
pub fn resolve(path: &Path, key: &LookupKey) -> Option<String> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "pgpass file not readable, skipping");
            return None;
        }
    };

    let password = resolve_from_contents(&contents, key);
    match password {
        Some(_) => debug!(host = %key.host, user = %key.user, "pgpass entry matched"),
        None => debug!(host = %key.host, user = %key.user, "no pgpass entry matched"),
    }
    password
}

/// Find the password for `key` in already-loaded pgpass file contents
///
/// Entries are evaluated in file order; the first match wins. Malformed
/// lines (fewer than five fields) are skipped, not fatal.
#[must_use]
pub fn resolve_from_contents(contents: &str, key: &LookupKey) -> Option<String> {
    contents
        .lines()
        .filter_map(parse_line)
        .find(|entry| entry.matches(key))
        .map(|entry| entry.password)
}

/// Parse one pgpass line into an entry
///
/// Returns `None` for blank lines, comment lines, and malformed lines.
fn parse_line(line: &str) -> Option<PgpassEntry> {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let mut fields = split_fields(line)?.into_iter();
    Some(PgpassEntry {
        host: fields.next()?,
        port: fields.next()?,
        database: fields.next()?,
        user: fields.next()?,
        password: fields.next()?,
    })
}

/// Split a line into exactly five fields on unescaped colons
///
/// `\:` is a literal colon, not a separator, and `\\` collapses to a single
/// backslash. After four separators the remainder of the line - unescaped
/// colons included - belongs to the password field. Lines with fewer than
/// five fields are malformed and yield `None`.
fn split_fields(line: &str) -> Option<Vec<String>> {
    let mut fields: Vec<String> = Vec::with_capacity(5);
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped @ (':' | '\\')) => current.push(escaped),
                // A backslash before anything else is taken literally
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            ':' if fields.len() < 4 => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    (fields.len() == 5).then_some(fields)
}

/// Whether a pgpass field accepts a lookup value
///
/// Comparison is case-sensitive and exact; `*` matches anything.
fn field_matches(field: &str, value: &str) -> bool {
    field == WILDCARD || field == value
}
