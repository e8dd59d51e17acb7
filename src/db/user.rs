//! Users the bot has persisted facts about.
//!
//! A row exists only while the user carries some standing (a global flag or
//! at least one guild membership record); plain platform users have no row.

use adjutant_store::{ColumnType, FieldMap, Record, Row, StoreError, TableDef};
use crate::platform::UserId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    id: Option<i64>,
    pub user_did: UserId,
    pub global_admin: bool,
    pub blacklisted: bool,
}

impl User {
    pub fn new(user_did: UserId) -> Self {
        Self {
            user_did,
            ..Self::default()
        }
    }
}

impl Record for User {
    const TABLE: &'static str = "users";

    fn definition() -> TableDef {
        TableDef::new(Self::TABLE)
            .required("user_did", ColumnType::Integer)
            .defaulted("global_admin", false)
            .defaulted("blacklisted", false)
            .unique_index(&["user_did"])
    }

    fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: Some(row.id()),
            user_did: row.integer("user_did")?,
            global_admin: row.boolean("global_admin")?,
            blacklisted: row.boolean("blacklisted")?,
        })
    }

    fn fields(&self) -> FieldMap {
        FieldMap::new()
            .with("user_did", self.user_did)
            .with("global_admin", self.global_admin)
            .with("blacklisted", self.blacklisted)
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}
