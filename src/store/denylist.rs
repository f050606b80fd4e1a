use std::collections::BTreeSet;

use crate::store::{StoreError, StoreInner, DENYLIST_DOC};

/// Access to the set of guild ids whose membership disqualifies a user.
///
/// Mutated only by the owner-gated command surface; the auditor reads it.
pub struct DenylistRepository<'a> {
    store: &'a StoreInner,
}

impl<'a> DenylistRepository<'a> {
    pub(crate) fn new(store: &'a StoreInner) -> Self {
        Self { store }
    }

    /// Adds a guild id to the denylist.
    ///
    /// # Returns
    /// - `Ok(true)`: The id was newly added
    /// - `Ok(false)`: The id was already present
    pub async fn add(&self, guild_id: u64) -> Result<bool, StoreError> {
        let mut denylist = self.store.denylist.write().await;
        let added = denylist.insert(guild_id);
        self.store.persist(DENYLIST_DOC, &*denylist).await?;
        Ok(added)
    }

    /// Removes a guild id from the denylist.
    ///
    /// # Returns
    /// - `Ok(true)`: The id was present and removed
    /// - `Ok(false)`: The id was not on the denylist
    pub async fn remove(&self, guild_id: u64) -> Result<bool, StoreError> {
        let mut denylist = self.store.denylist.write().await;
        let removed = denylist.remove(&guild_id);
        self.store.persist(DENYLIST_DOC, &*denylist).await?;
        Ok(removed)
    }

    pub async fn contains(&self, guild_id: u64) -> bool {
        self.store.denylist.read().await.contains(&guild_id)
    }

    /// Returns a snapshot of the full denylist.
    pub async fn all(&self) -> BTreeSet<u64> {
        self.store.denylist.read().await.clone()
    }
}
