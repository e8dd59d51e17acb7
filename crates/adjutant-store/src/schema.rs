//! Record definitions: the declarative schema a table is built from.

use crate::error::StoreError;
use crate::value::{ColumnType, Value};

/// How a declared field behaves.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSpec {
    /// Non-null column with no default; a value must be supplied on insert.
    Required(ColumnType),
    /// Nullable column.
    Optional(ColumnType),
    /// Column defaulting to a literal; type inferred from the literal.
    Default(Value),
}

impl FieldSpec {
    pub fn column_type(&self) -> ColumnType {
        match self {
            Self::Required(ty) | Self::Optional(ty) => *ty,
            Self::Default(value) => value.column_type().unwrap_or(ColumnType::Blob),
        }
    }

    pub fn not_null(&self) -> bool {
        match self {
            Self::Required(_) => true,
            Self::Optional(_) => false,
            Self::Default(value) => !value.is_null(),
        }
    }

    /// Value used to fill this field when a migration adds it to existing
    /// rows. `Required` fields have none; the rebuild insert will reject the
    /// null and fail the registration instead of inventing data.
    pub fn fill_value(&self) -> Value {
        match self {
            Self::Required(_) | Self::Optional(_) => Value::Null,
            Self::Default(value) => value.clone(),
        }
    }
}

/// A secondary index over one or more declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Declarative definition of one table: name, ordered fields, indexes.
///
/// An auto-increment `id INTEGER PRIMARY KEY` column is always added and may
/// not be declared as a field.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    name: String,
    fields: Vec<(String, FieldSpec)>,
    indexes: Vec<IndexSpec>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    pub fn required(self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.field(name, FieldSpec::Required(ty))
    }

    pub fn optional(self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.field(name, FieldSpec::Optional(ty))
    }

    pub fn defaulted(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.field(name, FieldSpec::Default(value.into()))
    }

    pub fn index(mut self, columns: &[&str]) -> Self {
        self.indexes.push(IndexSpec {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        });
        self
    }

    pub fn unique_index(mut self, columns: &[&str]) -> Self {
        self.indexes.push(IndexSpec {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: true,
        });
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[(String, FieldSpec)] {
        &self.fields
    }

    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(f, _)| f == name)
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|(f, _)| f == name)
            .map(|(_, spec)| spec)
    }

    /// Check the invariants a definition must hold before it touches the
    /// physical store.
    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        let invalid = |reason: String| StoreError::InvalidDefinition {
            table: self.name.clone(),
            reason,
        };

        if !is_identifier(&self.name) {
            return Err(invalid(format!("`{}` is not a valid table name", self.name)));
        }
        if self.fields.is_empty() {
            return Err(invalid("definition declares no fields".to_string()));
        }
        for (index, (name, _)) in self.fields.iter().enumerate() {
            if !is_identifier(name) {
                return Err(invalid(format!("`{name}` is not a valid field name")));
            }
            if name == "id" {
                return Err(invalid("`id` is reserved for the primary key".to_string()));
            }
            if self.fields[..index].iter().any(|(other, _)| other == name) {
                return Err(invalid(format!("field `{name}` is declared twice")));
            }
        }
        for index in &self.indexes {
            if index.columns.is_empty() {
                return Err(invalid("index declares no columns".to_string()));
            }
            for column in &index.columns {
                if !self.has_field(column) {
                    return Err(invalid(format!(
                        "index column `{column}` is not a declared field"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Render the CREATE TABLE statement.
    pub(crate) fn create_sql(&self) -> String {
        let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        for (name, spec) in &self.fields {
            let mut column = format!("{name} {}", spec.column_type().sql());
            if spec.not_null() {
                column.push_str(" NOT NULL");
            }
            if let FieldSpec::Default(value) = spec
                && !value.is_null()
            {
                column.push_str(&format!(" DEFAULT {}", value.sql_literal()));
            }
            columns.push(column);
        }
        format!("CREATE TABLE {} ({})", self.name, columns.join(", "))
    }

    /// Render one CREATE INDEX statement per declared index.
    pub(crate) fn index_sql(&self) -> Vec<String> {
        self.indexes
            .iter()
            .map(|index| {
                let columns = index.columns.join(", ");
                let suffix = index.columns.join("_");
                let unique = if index.unique { "UNIQUE " } else { "" };
                format!(
                    "CREATE {unique}INDEX idx_{}_{suffix} ON {} ({columns})",
                    self.name, self.name
                )
            })
            .collect()
    }
}

/// Table and field names are embedded in statements verbatim, so they are
/// restricted to plain identifiers.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
