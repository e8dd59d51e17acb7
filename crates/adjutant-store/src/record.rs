//! Typed records and the repository layer over the dynamic store.
//!
//! A model implements [`Record`] once; a [`Repository`] for it is created at
//! registration time and exposes the typed query surface (`get_by`,
//! `list_by`, `list_all`, `save`, `delete`). Query-by-name-pattern does not
//! exist here: every query path is an explicit method.

use crate::error::StoreError;
use crate::schema::TableDef;
use crate::store::{FieldMap, Order, Row, Store};
use crate::value::Value;
use std::marker::PhantomData;

/// A plain data record mapped to one table.
pub trait Record: Send + Sized {
    /// Table this record lives in. Must match `definition().name()`.
    const TABLE: &'static str;

    /// The declarative schema for this record type.
    fn definition() -> TableDef;

    /// Hydrate a record from a fetched row.
    fn from_row(row: &Row) -> Result<Self, StoreError>;

    /// The record's current field values, in declaration order.
    fn fields(&self) -> FieldMap;

    /// Primary key; `None` until the first save.
    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: Option<i64>);
}

/// Typed query surface for one record type.
///
/// Cheap to clone; clones share the underlying store handle.
#[derive(Clone)]
pub struct Repository<R: Record> {
    store: Store,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Record> Repository<R> {
    /// Register the record's definition (running any schema reconciliation)
    /// and return the repository serving it.
    pub async fn register(store: &Store) -> Result<Self, StoreError> {
        let def = R::definition();
        debug_assert_eq!(def.name(), R::TABLE);
        store.register(def).await?;
        Ok(Self {
            store: store.clone(),
            _marker: PhantomData,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fetch by primary key.
    pub async fn get(&self, id: i64) -> Result<Option<R>, StoreError> {
        let filter = FieldMap::new().with("id", id);
        self.first(&filter).await
    }

    /// Fetch the first record whose `field` equals `value`.
    pub async fn get_by(
        &self,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<Option<R>, StoreError> {
        let filter = FieldMap::new().with(field, value);
        self.first(&filter).await
    }

    /// Fetch every record matching all filters, id ascending.
    pub async fn list_by(&self, filter: &FieldMap) -> Result<Vec<R>, StoreError> {
        let rows = self.store.fetch_all(R::TABLE, filter).await?;
        rows.iter().map(R::from_row).collect()
    }

    /// Fetch every record, with optional ordering and limit.
    pub async fn list_all(
        &self,
        order: Option<Order>,
        limit: Option<u32>,
    ) -> Result<Vec<R>, StoreError> {
        let rows = self.store.fetch_page(R::TABLE, order.as_ref(), limit).await?;
        rows.iter().map(R::from_row).collect()
    }

    /// Insert (assigning an id) or update (by existing id).
    pub async fn save(&self, record: &mut R) -> Result<(), StoreError> {
        let fields = record.fields();
        match record.id() {
            None => {
                let id = self.store.insert(R::TABLE, &fields).await?;
                record.set_id(Some(id));
            }
            Some(id) => {
                let filter = FieldMap::new().with("id", id);
                self.store.update(R::TABLE, &fields, &filter).await?;
            }
        }
        Ok(())
    }

    /// Remove the record's row and clear its id. A record that was never
    /// saved is left untouched.
    pub async fn delete(&self, record: &mut R) -> Result<(), StoreError> {
        if let Some(id) = record.id() {
            self.store.delete(R::TABLE, id).await?;
            record.set_id(None);
        }
        Ok(())
    }

    /// Whether the record's row is still present.
    pub async fn exists(&self, record: &R) -> Result<bool, StoreError> {
        match record.id() {
            None => Ok(false),
            Some(id) => {
                let filter = FieldMap::new().with("id", id);
                Ok(self.store.count(R::TABLE, &filter).await? > 0)
            }
        }
    }

    async fn first(&self, filter: &FieldMap) -> Result<Option<R>, StoreError> {
        match self.store.fetch_one(R::TABLE, filter).await? {
            Some(row) => Ok(Some(R::from_row(&row)?)),
            None => Ok(None),
        }
    }
}
