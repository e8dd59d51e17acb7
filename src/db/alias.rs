//! Command aliases: a short word standing in for a canonical command path.

use adjutant_store::{ColumnType, FieldMap, Record, Row, StoreError, TableDef};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandAlias {
    id: Option<i64>,
    pub alias: String,
    pub command: String,
    pub created_at: i64,
}

impl CommandAlias {
    pub fn new(alias: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: None,
            alias: alias.into(),
            command: command.into(),
            created_at: chrono::Utc::now().timestamp(),
        }
    }
}

impl Record for CommandAlias {
    const TABLE: &'static str = "command_aliases";

    fn definition() -> TableDef {
        TableDef::new(Self::TABLE)
            .required("alias", ColumnType::Text)
            .required("command", ColumnType::Text)
            .defaulted("created_at", 0)
            .unique_index(&["alias"])
    }

    fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: Some(row.id()),
            alias: row.text("alias")?.to_string(),
            command: row.text("command")?.to_string(),
            created_at: row.integer("created_at")?,
        })
    }

    fn fields(&self) -> FieldMap {
        FieldMap::new()
            .with("alias", self.alias.as_str())
            .with("command", self.command.as_str())
            .with("created_at", self.created_at)
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}
