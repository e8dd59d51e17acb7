//! The persistence engine: a SQLite-backed store that owns the physical
//! layout of every registered table.
//!
//! Registration reconciles the physical table with its [`TableDef`]: missing
//! tables are created, and any column-set mismatch triggers a
//! read-drop-rebuild migration that carries compatible row data forward.
//! Statement execution is serialized through a single pooled connection.

use crate::error::StoreError;
use crate::schema::TableDef;
use crate::value::{ColumnType, Value};
use parking_lot::RwLock;
use sqlx::Row as _;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{info, warn};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An ordered field-name → value map, used for inserts, updates, and filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(Vec<(String, Value)>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mainly for filters.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field, replacing any earlier value for the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One fetched row: the primary key plus every declared field.
#[derive(Debug, Clone)]
pub struct Row {
    table: String,
    id: i64,
    fields: FieldMap,
}

impl Row {
    pub(crate) fn new(table: String, id: i64, fields: FieldMap) -> Self {
        Self { table, id, fields }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    fn require(&self, field: &str) -> Result<&Value, StoreError> {
        self.fields.get(field).ok_or_else(|| StoreError::MissingField {
            table: self.table.clone(),
            field: field.to_string(),
        })
    }

    fn type_error(&self, field: &str, expected: &'static str, found: &Value) -> StoreError {
        StoreError::FieldType {
            table: self.table.clone(),
            field: field.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    pub fn integer(&self, field: &str) -> Result<i64, StoreError> {
        let value = self.require(field)?;
        value
            .as_integer()
            .ok_or_else(|| self.type_error(field, "integer", value))
    }

    pub fn boolean(&self, field: &str) -> Result<bool, StoreError> {
        let value = self.require(field)?;
        value
            .as_bool()
            .ok_or_else(|| self.type_error(field, "boolean", value))
    }

    pub fn text(&self, field: &str) -> Result<&str, StoreError> {
        let value = self.require(field)?;
        value
            .as_str()
            .ok_or_else(|| self.type_error(field, "text", value))
    }

    pub fn opt_integer(&self, field: &str) -> Result<Option<i64>, StoreError> {
        let value = self.require(field)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_integer()
            .map(Some)
            .ok_or_else(|| self.type_error(field, "integer", value))
    }

    pub fn opt_text(&self, field: &str) -> Result<Option<&str>, StoreError> {
        let value = self.require(field)?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_str()
            .map(Some)
            .ok_or_else(|| self.type_error(field, "text", value))
    }
}

/// Result ordering for list queries.
#[derive(Debug, Clone)]
pub struct Order {
    pub field: String,
    pub descending: bool,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Handle to the physical store. Cheap to clone; all clones share one
/// serialized connection and one definition registry.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    tables: Arc<RwLock<HashMap<String, TableDef>>>,
}

impl Store {
    /// Connection acquire timeout - prevents a wedged statement from blocking
    /// callers indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Open (creating if missing) the store at `path`. `":memory:"` opens a
    /// uniquely named in-memory database so parallel tests do not collide.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let options = if path == ":memory:" {
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let uri = format!(
                "file:adjutant-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );
            SqliteConnectOptions::new()
                .filename(&uri)
                .shared_cache(true)
                .create_if_missing(true)
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                warn!(path = %parent.display(), error = %e, "failed to create store directory");
            }
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
        };

        // One connection: the engine serializes all statement execution, so
        // there is never more than a single writer.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        let integrity: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(&pool)
            .await?;
        if integrity != "ok" {
            return Err(StoreError::Integrity(integrity));
        }

        info!(path = %path, "record store opened");

        Ok(Self {
            pool,
            tables: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Register a definition, reconciling the physical table with it.
    ///
    /// Creates the table and its indexes when absent. When present with a
    /// different column set, migrates by read-drop-rebuild-reinsert (see
    /// [`TableDef`]); removed columns are dropped with a logged warning.
    /// Registering an unchanged definition again is a no-op.
    pub async fn register(&self, def: TableDef) -> Result<(), StoreError> {
        def.validate()?;

        if self.table_exists(def.name()).await? {
            let physical = self.physical_columns(def.name()).await?;
            let existing: BTreeSet<&str> = physical.iter().map(|(n, _)| n.as_str()).collect();
            let declared: BTreeSet<&str> = def.field_names().collect();
            if existing != declared {
                self.migrate(&def, &physical).await?;
            }
        } else {
            self.create_table(&def).await?;
        }

        self.tables.write().insert(def.name().to_string(), def);
        Ok(())
    }

    /// Look up the registered definition for `table`.
    pub fn definition(&self, table: &str) -> Result<TableDef, StoreError> {
        self.tables
            .read()
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::UnregisteredTable(table.to_string()))
    }

    /// Names of every registered table.
    pub fn registered_tables(&self) -> Vec<String> {
        self.tables.read().keys().cloned().collect()
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Physical column names and affinities, primary key excluded.
    pub async fn physical_columns(
        &self,
        table: &str,
    ) -> Result<Vec<(String, ColumnType)>, StoreError> {
        let rows = sqlx::query(&format!("PRAGMA table_info('{table}')"))
            .fetch_all(&self.pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get("name")?;
            if name == "id" {
                continue;
            }
            let declared: String = row.try_get("type")?;
            columns.push((name, ColumnType::from_sql(&declared)));
        }
        Ok(columns)
    }

    async fn create_table(&self, def: &TableDef) -> Result<(), StoreError> {
        sqlx::query(&def.create_sql()).execute(&self.pool).await?;
        for sql in def.index_sql() {
            sqlx::query(&sql).execute(&self.pool).await?;
        }
        info!(table = %def.name(), "table created");
        Ok(())
    }

    /// Drop-and-rebuild migration. Lossy by design for columns no longer in
    /// the definition; everything else is carried forward with row ids
    /// preserved, new fields filled from declared defaults.
    async fn migrate(
        &self,
        def: &TableDef,
        physical: &[(String, ColumnType)],
    ) -> Result<(), StoreError> {
        let table = def.name();

        let dropped: Vec<&str> = physical
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| !def.has_field(name))
            .collect();
        if !dropped.is_empty() {
            warn!(
                table = %table,
                columns = ?dropped,
                "migration drops columns not in the current definition"
            );
        }

        self.migrate_inner(def, physical)
            .await
            .map_err(|e| StoreError::Migration {
                table: table.to_string(),
                reason: e.to_string(),
            })
    }

    async fn migrate_inner(
        &self,
        def: &TableDef,
        physical: &[(String, ColumnType)],
    ) -> Result<(), StoreError> {
        let table = def.name();

        // Read every existing row before the rebuild, oldest first.
        let old_names: Vec<&str> = physical.iter().map(|(n, _)| n.as_str()).collect();
        let select = format!(
            "SELECT id, {} FROM {table} ORDER BY id ASC",
            old_names.join(", ")
        );
        let raw = sqlx::query(&select).fetch_all(&self.pool).await?;

        let mut old_rows = Vec::with_capacity(raw.len());
        for row in &raw {
            let id: i64 = row.try_get(0)?;
            let mut fields = FieldMap::new();
            for (index, (name, ty)) in physical.iter().enumerate() {
                fields.insert(name.clone(), Value::decode(row, index + 1, *ty)?);
            }
            old_rows.push((id, fields));
        }

        let placeholders = vec!["?"; def.fields().len() + 1].join(", ");
        let insert = format!(
            "INSERT INTO {table} (id, {}) VALUES ({placeholders})",
            def.field_names().collect::<Vec<_>>().join(", ")
        );

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP TABLE {table}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&def.create_sql()).execute(&mut *tx).await?;
        for sql in def.index_sql() {
            sqlx::query(&sql).execute(&mut *tx).await?;
        }

        let migrated = old_rows.len();
        for (id, old_fields) in old_rows {
            let mut query = sqlx::query(&insert).bind(id);
            for (name, spec) in def.fields() {
                let value = old_fields
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| spec.fill_value());
                query = value.bind_to(query);
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!(table = %table, rows = migrated, "table migrated");
        Ok(())
    }

    fn check_fields(
        &self,
        def: &TableDef,
        fields: &FieldMap,
        allow_id: bool,
    ) -> Result<(), StoreError> {
        for name in fields.names() {
            if name == "id" && allow_id {
                continue;
            }
            if !def.has_field(name) {
                return Err(StoreError::UnknownField {
                    table: def.name().to_string(),
                    field: name.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Insert a row, returning its assigned id.
    pub async fn insert(&self, table: &str, fields: &FieldMap) -> Result<i64, StoreError> {
        let def = self.definition(table)?;
        self.check_fields(&def, fields, false)?;

        let names: Vec<&str> = fields.names().collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({placeholders})",
            names.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in fields.iter() {
            query = value.clone().bind_to(query);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.last_insert_rowid())
    }

    /// Update the rows matching `filter`, returning how many changed.
    pub async fn update(
        &self,
        table: &str,
        fields: &FieldMap,
        filter: &FieldMap,
    ) -> Result<u64, StoreError> {
        let def = self.definition(table)?;
        self.check_fields(&def, fields, false)?;
        self.check_fields(&def, filter, true)?;
        if filter.is_empty() {
            return Err(StoreError::UnboundedUpdate(table.to_string()));
        }

        let assignments: Vec<String> = fields.names().map(|n| format!("{n} = ?")).collect();
        let conditions: Vec<String> = filter.names().map(|n| format!("{n} = ?")).collect();
        let sql = format!(
            "UPDATE {table} SET {} WHERE {}",
            assignments.join(", "),
            conditions.join(" AND ")
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in fields.iter().chain(filter.iter()) {
            query = value.clone().bind_to(query);
        }
        let result = query.execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Delete the row with the given id.
    pub async fn delete(&self, table: &str, id: i64) -> Result<(), StoreError> {
        self.definition(table)?;
        sqlx::query(&format!("DELETE FROM {table} WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Fetch all rows matching `filter` (all rows when empty), id ascending.
    pub async fn fetch_all(&self, table: &str, filter: &FieldMap) -> Result<Vec<Row>, StoreError> {
        self.fetch(table, filter, None, None).await
    }

    /// Fetch the first row matching `filter`, if any.
    pub async fn fetch_one(
        &self,
        table: &str,
        filter: &FieldMap,
    ) -> Result<Option<Row>, StoreError> {
        let mut rows = self.fetch(table, filter, None, Some(1)).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Fetch every row with explicit ordering and an optional limit.
    pub async fn fetch_page(
        &self,
        table: &str,
        order: Option<&Order>,
        limit: Option<u32>,
    ) -> Result<Vec<Row>, StoreError> {
        self.fetch(table, &FieldMap::new(), order, limit).await
    }

    /// Count the rows matching `filter`.
    pub async fn count(&self, table: &str, filter: &FieldMap) -> Result<i64, StoreError> {
        let def = self.definition(table)?;
        self.check_fields(&def, filter, true)?;

        let mut sql = format!("SELECT COUNT(1) FROM {table}");
        if !filter.is_empty() {
            let conditions: Vec<String> = filter.names().map(|n| format!("{n} = ?")).collect();
            sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }

        let mut query = sqlx::query_scalar(&sql);
        for (_, value) in filter.iter() {
            query = value.clone().bind_to_scalar(query);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn fetch(
        &self,
        table: &str,
        filter: &FieldMap,
        order: Option<&Order>,
        limit: Option<u32>,
    ) -> Result<Vec<Row>, StoreError> {
        let def = self.definition(table)?;
        self.check_fields(&def, filter, true)?;

        if let Some(order) = order
            && order.field != "id"
            && !def.has_field(&order.field)
        {
            return Err(StoreError::UnknownOrderField {
                table: table.to_string(),
                field: order.field.clone(),
            });
        }

        let names: Vec<&str> = def.field_names().collect();
        let mut sql = format!("SELECT id, {} FROM {table}", names.join(", "));
        if !filter.is_empty() {
            let conditions: Vec<String> = filter.names().map(|n| format!("{n} = ?")).collect();
            sql.push_str(&format!(" WHERE {}", conditions.join(" AND ")));
        }
        match order {
            Some(order) => {
                let direction = if order.descending { "DESC" } else { "ASC" };
                sql.push_str(&format!(" ORDER BY {} {direction}", order.field));
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let mut query = sqlx::query(&sql);
        for (_, value) in filter.iter() {
            query = value.clone().bind_to(query);
        }
        let raw = query.fetch_all(&self.pool).await?;

        let mut rows = Vec::with_capacity(raw.len());
        for sqlite_row in &raw {
            rows.push(self.decode_row(&def, sqlite_row)?);
        }
        Ok(rows)
    }

    fn decode_row(&self, def: &TableDef, row: &SqliteRow) -> Result<Row, StoreError> {
        let id: i64 = row.try_get(0)?;
        let mut fields = FieldMap::new();
        for (index, (name, spec)) in def.fields().iter().enumerate() {
            fields.insert(
                name.clone(),
                Value::decode(row, index + 1, spec.column_type())?,
            );
        }
        Ok(Row::new(def.name().to_string(), id, fields))
    }
}
