//! Database facade for the bot's persisted records.
//!
//! Opens the store and forces every model through the schema reconciliation
//! check; any schema problem is fatal here, before the event loop starts.
//! Hands out the typed repositories plus the cross-record operations
//! (ensure-on-demand lookups and the explicit deletion cascades).

mod alias;
mod membership;
mod user;

pub use alias::CommandAlias;
pub use membership::Membership;
pub use user::User;

use crate::platform::{GuildId, UserId};
use adjutant_store::{FieldMap, Record as _, Repository, Store, StoreError};

#[derive(Clone)]
pub struct Database {
    store: Store,
    users: Repository<User>,
    memberships: Repository<Membership>,
    aliases: Repository<CommandAlias>,
}

impl Database {
    /// Open the store at `path` and register every model, reconciling each
    /// physical table with its current definition.
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let store = Store::open(path).await?;
        let users = Repository::register(&store).await?;
        let memberships = Repository::register(&store).await?;
        let aliases = Repository::register(&store).await?;
        Ok(Self {
            store,
            users,
            memberships,
            aliases,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn users(&self) -> &Repository<User> {
        &self.users
    }

    pub fn memberships(&self) -> &Repository<Membership> {
        &self.memberships
    }

    pub fn aliases(&self) -> &Repository<CommandAlias> {
        &self.aliases
    }

    pub async fn user_by_did(&self, user_did: UserId) -> Result<Option<User>, StoreError> {
        self.users.get_by("user_did", user_did).await
    }

    /// Fetch the persisted user for a platform id, creating the row if
    /// absent.
    pub async fn ensure_user(&self, user_did: UserId) -> Result<User, StoreError> {
        if let Some(user) = self.user_by_did(user_did).await? {
            return Ok(user);
        }
        let mut user = User::new(user_did);
        self.users.save(&mut user).await?;
        Ok(user)
    }

    pub async fn membership_of(
        &self,
        user_id: i64,
        guild_did: GuildId,
    ) -> Result<Option<Membership>, StoreError> {
        let filter = FieldMap::new()
            .with("user_id", user_id)
            .with("guild_did", guild_did);
        Ok(self
            .memberships
            .list_by(&filter)
            .await?
            .into_iter()
            .next())
    }

    /// Fetch the membership linking a user row to a guild, creating it if
    /// absent.
    pub async fn ensure_membership(
        &self,
        user_id: i64,
        guild_did: GuildId,
    ) -> Result<Membership, StoreError> {
        if let Some(membership) = self.membership_of(user_id, guild_did).await? {
            return Ok(membership);
        }
        let mut membership = Membership::new(user_id, guild_did);
        self.memberships.save(&mut membership).await?;
        Ok(membership)
    }

    /// Fetch (creating on demand) the user record for a platform id and its
    /// membership in the given guild.
    pub async fn ensure_standing(
        &self,
        user_did: UserId,
        guild_did: GuildId,
    ) -> Result<(User, Membership), StoreError> {
        let user = self.ensure_user(user_did).await?;
        let user_id = user.id().expect("id assigned by save");
        let membership = self.ensure_membership(user_id, guild_did).await?;
        Ok((user, membership))
    }

    pub async fn memberships_of_user(&self, user_id: i64) -> Result<Vec<Membership>, StoreError> {
        let filter = FieldMap::new().with("user_id", user_id);
        self.memberships.list_by(&filter).await
    }

    /// Delete a user and, synchronously and first, every membership that
    /// depends on it.
    pub async fn delete_user_cascade(&self, user: &mut User) -> Result<(), StoreError> {
        if let Some(user_id) = user.id() {
            for mut membership in self.memberships_of_user(user_id).await? {
                self.memberships.delete(&mut membership).await?;
            }
        }
        self.users.delete(user).await
    }

    /// Drop a membership that no longer carries standing, and the user once
    /// it has no memberships left. Rows are removed only when nothing
    /// depends on them.
    pub async fn cleanup_standing(
        &self,
        membership: &mut Membership,
        user: &mut User,
    ) -> Result<(), StoreError> {
        if !membership.has_standing() {
            self.memberships.delete(membership).await?;
        }
        if !user.global_admin && !user.blacklisted
            && let Some(user_id) = user.id()
            && self.memberships_of_user(user_id).await?.is_empty()
        {
            self.users.delete(user).await?;
        }
        Ok(())
    }

    pub async fn alias_named(&self, alias: &str) -> Result<Option<CommandAlias>, StoreError> {
        self.aliases.get_by("alias", alias).await
    }
}
