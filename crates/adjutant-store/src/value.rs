//! Dynamic values and column types.
//!
//! Field values cross the store boundary as [`Value`], a small dynamic type
//! covering everything SQLite can hold. Each declared field carries a
//! [`ColumnType`] that fixes the physical column affinity and drives both
//! statement binding and row decoding.

use crate::error::StoreError;
use sqlx::Row as _;
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>;
type SqliteScalar<'q, O> = sqlx::query::QueryScalar<'q, Sqlite, O, SqliteArguments<'q>>;

/// Logical column type of a declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// Stored as INTEGER 0/1.
    Boolean,
    /// Opaque bytes; anything without a more specific mapping.
    Blob,
}

impl ColumnType {
    /// Physical SQLite type used in DDL.
    pub fn sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer | Self::Boolean => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }

    /// Map a declared type string from `PRAGMA table_info` back to a column
    /// type, following SQLite affinity rules. Unknown spellings decode as
    /// opaque blobs.
    pub fn from_sql(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Self::Text
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Self::Real
        } else {
            Self::Blob
        }
    }
}

/// A dynamically typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Blob(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Bool(_) => "boolean",
            Self::Blob(_) => "blob",
        }
    }

    /// Column type a literal of this value would declare. `Null` has none.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Null => None,
            Self::Integer(_) => Some(ColumnType::Integer),
            Self::Real(_) => Some(ColumnType::Real),
            Self::Text(_) => Some(ColumnType::Text),
            Self::Bool(_) => Some(ColumnType::Boolean),
            Self::Blob(_) => Some(ColumnType::Blob),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            Self::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Render as a SQL literal for DDL default clauses.
    pub(crate) fn sql_literal(&self) -> String {
        match self {
            Self::Null => "NULL".to_string(),
            Self::Integer(v) => v.to_string(),
            Self::Real(v) => v.to_string(),
            Self::Text(v) => format!("'{}'", v.replace('\'', "''")),
            Self::Bool(v) => if *v { "1" } else { "0" }.to_string(),
            Self::Blob(v) => {
                let hex: String = v.iter().map(|b| format!("{b:02X}")).collect();
                format!("X'{hex}'")
            }
        }
    }

    /// Bind this value as the next placeholder of a query.
    pub(crate) fn bind_to<'q>(self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        match self {
            Self::Null => query.bind(None::<i64>),
            Self::Integer(v) => query.bind(v),
            Self::Real(v) => query.bind(v),
            Self::Text(v) => query.bind(v),
            Self::Bool(v) => query.bind(v),
            Self::Blob(v) => query.bind(v),
        }
    }

    /// Bind this value as the next placeholder of a scalar query.
    pub(crate) fn bind_to_scalar<'q, O>(self, query: SqliteScalar<'q, O>) -> SqliteScalar<'q, O> {
        match self {
            Self::Null => query.bind(None::<i64>),
            Self::Integer(v) => query.bind(v),
            Self::Real(v) => query.bind(v),
            Self::Text(v) => query.bind(v),
            Self::Bool(v) => query.bind(v),
            Self::Blob(v) => query.bind(v),
        }
    }

    /// Decode the column at `index` according to its declared type.
    pub(crate) fn decode(row: &SqliteRow, index: usize, ty: ColumnType) -> Result<Self, StoreError> {
        let value = match ty {
            ColumnType::Integer => row
                .try_get::<Option<i64>, _>(index)?
                .map_or(Self::Null, Self::Integer),
            ColumnType::Boolean => row
                .try_get::<Option<bool>, _>(index)?
                .map_or(Self::Null, Self::Bool),
            ColumnType::Real => row
                .try_get::<Option<f64>, _>(index)?
                .map_or(Self::Null, Self::Real),
            ColumnType::Text => row
                .try_get::<Option<String>, _>(index)?
                .map_or(Self::Null, Self::Text),
            ColumnType::Blob => row
                .try_get::<Option<Vec<u8>>, _>(index)?
                .map_or(Self::Null, Self::Blob),
        };
        Ok(value)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affinity_round_trip() {
        assert_eq!(ColumnType::from_sql("INTEGER"), ColumnType::Integer);
        assert_eq!(ColumnType::from_sql("TEXT"), ColumnType::Text);
        assert_eq!(ColumnType::from_sql("REAL"), ColumnType::Real);
        assert_eq!(ColumnType::from_sql("VARCHAR(30)"), ColumnType::Text);
        assert_eq!(ColumnType::from_sql("weird"), ColumnType::Blob);
    }

    #[test]
    fn literal_escaping() {
        assert_eq!(Value::from("it's").sql_literal(), "'it''s'");
        assert_eq!(Value::from(false).sql_literal(), "0");
        assert_eq!(Value::Null.sql_literal(), "NULL");
    }

    #[test]
    fn coercions() {
        assert_eq!(Value::from(3).as_integer(), Some(3));
        assert_eq!(Value::from(true).as_integer(), Some(1));
        assert_eq!(Value::from(1i64).as_bool(), Some(true));
        assert_eq!(Value::from(Some("x")).as_str(), Some("x"));
        assert!(Value::from(None::<i64>).is_null());
    }
}
