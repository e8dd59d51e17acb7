//! Store error types.

use thiserror::Error;

/// Errors surfaced by the record store.
///
/// `UnregisteredTable`, `UnknownField`, and `UnknownOrderField` indicate
/// programmer errors (a query against a definition that was never declared);
/// they are never retried. Everything else is a store-level failure the
/// caller decides how to handle.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("invalid definition for table `{table}`: {reason}")]
    InvalidDefinition { table: String, reason: String },

    #[error("table `{0}` is not registered")]
    UnregisteredTable(String),

    #[error("unknown field `{field}` for table `{table}`")]
    UnknownField { table: String, field: String },

    #[error("unknown order field `{field}` for table `{table}`")]
    UnknownOrderField { table: String, field: String },

    #[error("field `{field}` missing from a `{table}` row")]
    MissingField { table: String, field: String },

    #[error("field `{field}` on table `{table}` holds a {found} value, not {expected}")]
    FieldType {
        table: String,
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("migration failed for table `{table}`: {reason}")]
    Migration { table: String, reason: String },

    #[error("update on table `{0}` without a where clause")]
    UnboundedUpdate(String),

    #[error("store integrity check failed: {0}")]
    Integrity(String),
}
