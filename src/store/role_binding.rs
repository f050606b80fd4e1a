use crate::store::{StoreError, StoreInner, ROLE_BINDINGS_DOC};

/// Access to the guild -> granted-role bindings.
pub struct RoleBindingRepository<'a> {
    store: &'a StoreInner,
}

impl<'a> RoleBindingRepository<'a> {
    pub(crate) fn new(store: &'a StoreInner) -> Self {
        Self { store }
    }

    /// Looks up the role granted after verification in a guild.
    ///
    /// # Arguments
    /// - `guild_id`: Discord guild ID
    ///
    /// # Returns
    /// - `Some(role_id)`: A binding is configured for the guild
    /// - `None`: The guild has not been configured
    pub async fn get(&self, guild_id: u64) -> Option<u64> {
        self.store.role_bindings.read().await.get(&guild_id).copied()
    }

    /// Creates or overwrites the binding for a guild.
    ///
    /// One binding per guild; setting a new role replaces the old one.
    pub async fn set(&self, guild_id: u64, role_id: u64) -> Result<(), StoreError> {
        let mut bindings = self.store.role_bindings.write().await;
        bindings.insert(guild_id, role_id);
        self.store.persist(ROLE_BINDINGS_DOC, &*bindings).await
    }
}
