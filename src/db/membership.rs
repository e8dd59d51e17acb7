//! Per-guild standing for a persisted user.
//!
//! The relation to [`super::User`] is weak: `user_id` holds the parent row
//! id and the parent is re-derived by query, never held as a pointer.

use adjutant_store::{ColumnType, FieldMap, Record, Row, StoreError, TableDef};
use crate::platform::GuildId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Membership {
    id: Option<i64>,
    /// Row id of the owning user record.
    pub user_id: i64,
    pub guild_did: GuildId,
    pub admin: bool,
    pub blacklisted: bool,
}

impl Membership {
    pub fn new(user_id: i64, guild_did: GuildId) -> Self {
        Self {
            user_id,
            guild_did,
            ..Self::default()
        }
    }

    /// Whether any standing remains; a membership with none is deleted by
    /// the cleanup cascade.
    pub fn has_standing(&self) -> bool {
        self.admin || self.blacklisted
    }
}

impl Record for Membership {
    const TABLE: &'static str = "memberships";

    fn definition() -> TableDef {
        TableDef::new(Self::TABLE)
            .required("user_id", ColumnType::Integer)
            .required("guild_did", ColumnType::Integer)
            .defaulted("admin", false)
            .defaulted("blacklisted", false)
            .unique_index(&["user_id", "guild_did"])
            .index(&["guild_did"])
    }

    fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: Some(row.id()),
            user_id: row.integer("user_id")?,
            guild_did: row.integer("guild_did")?,
            admin: row.boolean("admin")?,
            blacklisted: row.boolean("blacklisted")?,
        })
    }

    fn fields(&self) -> FieldMap {
        FieldMap::new()
            .with("user_id", self.user_id)
            .with("guild_did", self.guild_did)
            .with("admin", self.admin)
            .with("blacklisted", self.blacklisted)
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}
