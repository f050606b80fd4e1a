use crate::model::PendingVerification;
use crate::store::{StoreError, StoreInner, PENDING_DOC};

/// Access to the pending-verification set, keyed by user id.
pub struct PendingVerificationRepository<'a> {
    store: &'a StoreInner,
}

impl<'a> PendingVerificationRepository<'a> {
    pub(crate) fn new(store: &'a StoreInner) -> Self {
        Self { store }
    }

    /// Inserts a pending verification, replacing any prior entry for the
    /// same user. Most recent authorization wins.
    ///
    /// # Returns
    /// - `Ok(Some(previous))`: An older entry for the user was replaced
    /// - `Ok(None)`: The user had no pending entry
    pub async fn upsert(
        &self,
        entry: PendingVerification,
    ) -> Result<Option<PendingVerification>, StoreError> {
        let mut pending = self.store.pending.write().await;
        let previous = pending.insert(entry.user_id, entry);
        self.store.persist(PENDING_DOC, &*pending).await?;
        Ok(previous)
    }

    /// Removes and returns a user's pending entry, if any.
    pub async fn remove(&self, user_id: u64) -> Result<Option<PendingVerification>, StoreError> {
        let mut pending = self.store.pending.write().await;
        let removed = pending.remove(&user_id);
        self.store.persist(PENDING_DOC, &*pending).await?;
        Ok(removed)
    }

    pub async fn get(&self, user_id: u64) -> Option<PendingVerification> {
        self.store.pending.read().await.get(&user_id).cloned()
    }

    /// Returns a snapshot of every pending entry.
    ///
    /// The reconciliation loop works off this snapshot; callbacks arriving
    /// after it was taken are picked up on the next tick.
    pub async fn snapshot(&self) -> Vec<PendingVerification> {
        self.store.pending.read().await.values().cloned().collect()
    }
}
