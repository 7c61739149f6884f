//! SQL dialect strategy
//!
//! The few places where PostgreSQL and SQLite disagree syntactically
//! are isolated here, resolved once per pool from the database URL.
//! Orchestration code never branches on backend identity directly.

use sqlmail_common::{Error, Result};

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Resolve the dialect from a database URL scheme.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split(':').next().unwrap_or("");
        match scheme {
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(Error::Config(format!(
                "Unsupported database backend: {}",
                other
            ))),
        }
    }

    /// A derived table with one `flag` column and one row per bound
    /// parameter, for joining message rows against a caller-supplied
    /// flag list. Placeholders are numbered `first..first + count`.
    ///
    /// The relation is aliased `fs` and its single column is named
    /// `flag` on both backends.
    pub fn values_relation(&self, first: usize, count: usize) -> String {
        debug_assert!(count > 0);
        match self {
            Dialect::Postgres => {
                let rows: Vec<String> = (first..first + count).map(|i| format!("(${})", i)).collect();
                format!("(VALUES {}) AS fs(flag)", rows.join(", "))
            }
            Dialect::Sqlite => {
                let mut selects = format!("SELECT ${} AS flag", first);
                for i in first + 1..first + count {
                    selects.push_str(&format!(" UNION ALL SELECT ${}", i));
                }
                format!("({}) AS fs", selects)
            }
        }
    }

    /// Clause appended to an INSERT to turn a uniqueness conflict into
    /// a no-op.
    pub fn insert_ignore(&self) -> &'static str {
        // Identical on the two supported backends; kept behind the
        // dialect so callers stay backend-agnostic.
        match self {
            Dialect::Postgres | Dialect::Sqlite => "ON CONFLICT DO NOTHING",
        }
    }

    /// Aggregate joining all flags of a message into a single string.
    ///
    /// `{` is not a legal character in flag names, so it is safe as a
    /// separator and saves a second query per fetched row.
    pub fn flags_concat(&self) -> &'static str {
        match self {
            Dialect::Postgres => "STRING_AGG(f.flag, '{')",
            Dialect::Sqlite => "GROUP_CONCAT(f.flag, '{')",
        }
    }

    /// DDL fragment for an auto-incrementing surrogate primary key.
    pub fn auto_increment_pk(&self) -> &'static str {
        match self {
            Dialect::Postgres => "BIGSERIAL PRIMARY KEY",
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }

    /// DDL type for binary columns.
    pub fn blob_type(&self) -> &'static str {
        match self {
            Dialect::Postgres => "BYTEA",
            Dialect::Sqlite => "BLOB",
        }
    }
}

/// A plain `$n, $n+1, ...` placeholder list, for `IN (...)` predicates.
/// Not dialect-specific; lives here next to the other SQL builders.
pub fn placeholders(first: usize, count: usize) -> String {
    let items: Vec<String> = (first..first + count).map(|i| format!("${}", i)).collect();
    items.join(", ")
}
