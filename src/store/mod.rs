//! Durable key/value state for the verification pipeline.
//!
//! State lives in three independent JSON documents under a data directory:
//! role bindings (guild id -> role id), the denylist (set of guild ids), and
//! pending verifications (user id -> received authorization code). Each
//! document defaults to empty on first run and is rewritten after every
//! mutation while the per-document write lock is still held, so concurrent
//! writers (command handlers, the callback endpoint, the reconciliation loop)
//! always see atomic read-modify-write semantics per key.
//!
//! Callers go through the per-document repositories; nothing outside this
//! module depends on the file format.

pub mod denylist;
pub mod pending;
pub mod role_binding;

pub use denylist::DenylistRepository;
pub use pending::PendingVerificationRepository;
pub use role_binding::RoleBindingRepository;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::PendingVerification;

pub(crate) const ROLE_BINDINGS_DOC: &str = "role_bindings.json";
pub(crate) const DENYLIST_DOC: &str = "denylist.json";
pub(crate) const PENDING_DOC: &str = "pending.json";

#[derive(Error, Debug)]
pub enum StoreError {
    /// Filesystem read/write failure for a state document.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A state document could not be (de)serialized.
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

/// Handle to the shared state documents.
///
/// Cheap to clone; clones share the same locks and data directory.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    dir: Option<PathBuf>,
    pub(crate) role_bindings: RwLock<HashMap<u64, u64>>,
    pub(crate) denylist: RwLock<BTreeSet<u64>>,
    pub(crate) pending: RwLock<HashMap<u64, PendingVerification>>,
}

impl Store {
    /// Opens the store rooted at `dir`, creating the directory if needed.
    ///
    /// Missing documents load as empty; malformed documents are an error
    /// rather than silent data loss.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        let role_bindings = load_document(&dir.join(ROLE_BINDINGS_DOC)).await?;
        let denylist = load_document(&dir.join(DENYLIST_DOC)).await?;
        let pending = load_document(&dir.join(PENDING_DOC)).await?;

        Ok(Self {
            inner: Arc::new(StoreInner {
                dir: Some(dir),
                role_bindings: RwLock::new(role_bindings),
                denylist: RwLock::new(denylist),
                pending: RwLock::new(pending),
            }),
        })
    }

    /// Creates a store with no backing files. Mutations succeed but nothing
    /// survives the process; used by tests.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                dir: None,
                role_bindings: RwLock::new(HashMap::new()),
                denylist: RwLock::new(BTreeSet::new()),
                pending: RwLock::new(HashMap::new()),
            }),
        }
    }

    pub fn role_bindings(&self) -> RoleBindingRepository<'_> {
        RoleBindingRepository::new(&self.inner)
    }

    pub fn denylist(&self) -> DenylistRepository<'_> {
        DenylistRepository::new(&self.inner)
    }

    pub fn pending(&self) -> PendingVerificationRepository<'_> {
        PendingVerificationRepository::new(&self.inner)
    }
}

async fn load_document<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

impl StoreInner {
    /// Rewrites one document on disk.
    ///
    /// Must be called while the caller still holds the document's write lock
    /// so a concurrent mutation cannot interleave between the in-memory
    /// change and the durable write. Writes to a temp file and renames, so a
    /// crash mid-write leaves the previous snapshot intact.
    pub(crate) async fn persist<T: Serialize>(
        &self,
        name: &str,
        value: &T,
    ) -> Result<(), StoreError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(value)?;
        let tmp = dir.join(format!("{name}.tmp"));
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, dir.join(name)).await?;

        Ok(())
    }
}
