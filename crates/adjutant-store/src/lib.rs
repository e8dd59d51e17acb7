//! adjutant-store - declarative record persistence over SQLite.
//!
//! A record type declares its schema once as a [`TableDef`]; registering it
//! against a [`Store`] reconciles the physical table with the declaration,
//! creating it when absent and migrating it (read, drop, rebuild, re-insert)
//! when the column set has drifted. No external migration tooling and no
//! hand-written DDL.
//!
//! The typed surface is [`Record`] + [`Repository`]: explicit `get_by` /
//! `list_by` / `list_all` / `save` / `delete` methods generated per record
//! type at registration time.

mod error;
mod record;
mod schema;
mod store;
mod value;

pub use error::StoreError;
pub use record::{Record, Repository};
pub use schema::{FieldSpec, IndexSpec, TableDef};
pub use store::{FieldMap, Order, Row, Store};
pub use value::{ColumnType, Value};
