//! Authorization store
//!
//! The authoritative record of which keys exist, their permissions and the
//! secrets they share with the lock. Pending invitations live in a separate
//! table until they are confirmed. Identifiers are unique across both tables.

use smartlock_crypto::KeyData;
use smartlock_protocol::{Key, NewKey};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("identifier {0} is already in use")]
    AlreadyExists(Uuid),

    #[error("no entry for identifier {0}")]
    NotFound(Uuid),

    #[error("an owner key is already installed")]
    AlreadySetUp,

    #[error("store lock poisoned")]
    Poisoned,
}

/// Key and invitation storage bound to one lock
///
/// Methods take `&self`; implementations serialize writers internally.
pub trait AuthorizationStore {
    /// Save a confirmed key.
    fn add_key(&self, key: Key, secret: KeyData) -> Result<(), StoreError>;

    /// Save the first key, failing with `AlreadySetUp` unless both tables are
    /// empty. The check and the insert happen under one write.
    fn add_owner(&self, key: Key, secret: KeyData) -> Result<(), StoreError>;

    /// Load a confirmed key and its secret.
    fn key(&self, id: &Uuid) -> Result<Option<(Key, KeyData)>, StoreError>;

    /// Delete a confirmed key, returning it.
    fn remove_key(&self, id: &Uuid) -> Result<Key, StoreError>;

    /// Save a pending invitation with its temporary secret.
    fn add_new_key(&self, new_key: NewKey, secret: KeyData) -> Result<(), StoreError>;

    /// Load a pending invitation and its temporary secret.
    fn new_key(&self, id: &Uuid) -> Result<Option<(NewKey, KeyData)>, StoreError>;

    /// Delete a pending invitation, returning it.
    fn remove_new_key(&self, id: &Uuid) -> Result<NewKey, StoreError>;

    /// Replace the invitation `key.id` with the confirmed `key` in one step.
    fn confirm_new_key(&self, key: Key, secret: KeyData) -> Result<(), StoreError>;

    /// All confirmed keys, oldest first.
    fn keys(&self) -> Result<Vec<Key>, StoreError>;

    /// All pending invitations, oldest first.
    fn new_keys(&self) -> Result<Vec<NewKey>, StoreError>;

    /// True until the owner key has been added.
    fn is_empty(&self) -> Result<bool, StoreError>;
}

#[derive(Default)]
struct Tables {
    keys: HashMap<Uuid, (Key, KeyData)>,
    new_keys: HashMap<Uuid, (NewKey, KeyData)>,
}

impl Tables {
    fn contains(&self, id: &Uuid) -> bool {
        self.keys.contains_key(id) || self.new_keys.contains_key(id)
    }
}

/// Store held entirely in memory behind a single reader-writer lock
#[derive(Default)]
pub struct InMemoryAuthorizationStore {
    tables: RwLock<Tables>,
}

impl InMemoryAuthorizationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables.write().map_err(|_| StoreError::Poisoned)
    }
}

impl std::fmt::Debug for InMemoryAuthorizationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("InMemoryAuthorizationStore");
        if let Ok(tables) = self.tables.read() {
            debug
                .field("keys", &tables.keys.len())
                .field("new_keys", &tables.new_keys.len());
        }
        debug.finish_non_exhaustive()
    }
}

impl AuthorizationStore for InMemoryAuthorizationStore {
    fn add_key(&self, key: Key, secret: KeyData) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.contains(&key.id) {
            return Err(StoreError::AlreadyExists(key.id));
        }
        tables.keys.insert(key.id, (key, secret));
        Ok(())
    }

    fn add_owner(&self, key: Key, secret: KeyData) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if !tables.keys.is_empty() || !tables.new_keys.is_empty() {
            return Err(StoreError::AlreadySetUp);
        }
        tables.keys.insert(key.id, (key, secret));
        Ok(())
    }

    fn key(&self, id: &Uuid) -> Result<Option<(Key, KeyData)>, StoreError> {
        Ok(self.read()?.keys.get(id).cloned())
    }

    fn remove_key(&self, id: &Uuid) -> Result<Key, StoreError> {
        self.write()?
            .keys
            .remove(id)
            .map(|(key, _)| key)
            .ok_or(StoreError::NotFound(*id))
    }

    fn add_new_key(&self, new_key: NewKey, secret: KeyData) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.contains(&new_key.id) {
            return Err(StoreError::AlreadyExists(new_key.id));
        }
        tables.new_keys.insert(new_key.id, (new_key, secret));
        Ok(())
    }

    fn new_key(&self, id: &Uuid) -> Result<Option<(NewKey, KeyData)>, StoreError> {
        Ok(self.read()?.new_keys.get(id).cloned())
    }

    fn remove_new_key(&self, id: &Uuid) -> Result<NewKey, StoreError> {
        self.write()?
            .new_keys
            .remove(id)
            .map(|(new_key, _)| new_key)
            .ok_or(StoreError::NotFound(*id))
    }

    fn confirm_new_key(&self, key: Key, secret: KeyData) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        if tables.keys.contains_key(&key.id) {
            return Err(StoreError::AlreadyExists(key.id));
        }
        if tables.new_keys.remove(&key.id).is_none() {
            return Err(StoreError::NotFound(key.id));
        }
        tables.keys.insert(key.id, (key, secret));
        Ok(())
    }

    fn keys(&self) -> Result<Vec<Key>, StoreError> {
        let mut keys: Vec<Key> = self.read()?.keys.values().map(|(k, _)| k.clone()).collect();
        keys.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(keys)
    }

    fn new_keys(&self) -> Result<Vec<NewKey>, StoreError> {
        let mut new_keys: Vec<NewKey> = self
            .read()?
            .new_keys
            .values()
            .map(|(k, _)| k.clone())
            .collect();
        new_keys.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));
        Ok(new_keys)
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.keys.is_empty())
    }
}
