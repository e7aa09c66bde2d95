//! Persistence boundary: the store trait, its lifecycle hooks, and an
//! in-memory reference store.
//!
//! The real persistence engine lives outside this crate. It is expected to
//! call [`LifecycleHooks`] around each write the way [`MemoryStore`] does:
//!
//! ```text
//! before_write(entity, is_create, loader) -> PreWrite
//!   write
//! after_write(entity, pre)
//!
//! remove
//! after_delete(removed)
//! ```
//!
//! Hook errors surface after the write has been applied; nothing is rolled
//! back.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use thiserror::Error;

use crate::entity::{snapshot_of, Entity, Snapshot, SnapshotError, Tracked};
use crate::error::{Error, Result};

/// Failures of the persistence layer itself.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update was attempted on an entity that was never persisted.
    #[error("{type_name} has no persisted identity")]
    MissingId {
        /// Entity type name
        type_name: &'static str,
    },
    /// Persisted state could not be read back as a snapshot.
    #[error("snapshot failed: {0}")]
    Snapshot(#[from] SnapshotError),
    /// Backend specific failure.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Reads the currently persisted field values of one instance.
pub trait SnapshotLoader {
    /// Returns `Ok(None)` when no instance with `id` exists.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn load_snapshot(&self, id: &str) -> Result<Option<Snapshot>, StoreError>;
}

/// State carried from `before_write` to `after_write` for one instance.
#[derive(Debug, Clone, PartialEq)]
pub enum PreWrite {
    /// The type is not monitored
    Untracked,
    /// First write of a new instance
    Create,
    /// Write of an existing instance, with its persisted state if readable
    Update(Option<Snapshot>),
}

/// Callbacks a store invokes around writes.
pub trait LifecycleHooks: Send + Sync {
    /// Runs before the write. Must not fail the write.
    fn before_write(
        &self,
        entity: &dyn Tracked,
        is_create: bool,
        loader: &dyn SnapshotLoader,
    ) -> PreWrite;

    /// Runs after the write with the state captured beforehand.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuditWrite`] when recording fails.
    fn after_write(&self, entity: &dyn Tracked, pre: PreWrite) -> Result<()>;

    /// Runs after removal with the instance as it was just before.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AuditWrite`] when recording fails.
    fn after_delete(&self, entity: &dyn Tracked) -> Result<()>;
}

/// CRUD operations of the persistence layer for one entity type.
pub trait Store<E: Entity>: Send + Sync {
    /// Fetches one instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on backend failure.
    fn get(&self, id: &str) -> Result<Option<E>>;

    /// Fetches every instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Store`] on backend failure.
    fn list(&self) -> Result<Vec<E>>;

    /// Persists a new instance and returns it with its identity assigned.
    ///
    /// # Errors
    ///
    /// Returns hook or backend errors.
    fn insert(&self, entity: E) -> Result<E>;

    /// Persists changes to an existing instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown ids, hook or backend errors.
    fn update(&self, entity: E) -> Result<E>;

    /// Removes an instance and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for unknown ids, hook or backend errors.
    fn delete(&self, id: &str) -> Result<E>;
}

impl<E: Entity, S: Store<E> + ?Sized> Store<E> for Arc<S> {
    fn get(&self, id: &str) -> Result<Option<E>> {
        (**self).get(id)
    }

    fn list(&self) -> Result<Vec<E>> {
        (**self).list()
    }

    fn insert(&self, entity: E) -> Result<E> {
        (**self).insert(entity)
    }

    fn update(&self, entity: E) -> Result<E> {
        (**self).update(entity)
    }

    fn delete(&self, id: &str) -> Result<E> {
        (**self).delete(id)
    }
}

/// In-memory store with sequential numeric ids.
pub struct MemoryStore<E: Entity> {
    rows: RwLock<BTreeMap<u64, E>>,
    next_id: AtomicU64,
    hooks: Option<Arc<dyn LifecycleHooks>>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> MemoryStore<E> {
    /// A store without hooks.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            hooks: None,
            _entity: PhantomData,
        }
    }

    /// A store that calls `hooks` around every write.
    pub fn with_hooks(hooks: Arc<dyn LifecycleHooks>) -> Self {
        Self {
            hooks: Some(hooks),
            ..Self::new()
        }
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// True if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    fn key(id: &str) -> Option<u64> {
        id.parse().ok()
    }

    fn before(&self, entity: &E, is_create: bool) -> PreWrite {
        match &self.hooks {
            Some(hooks) => hooks.before_write(entity, is_create, self),
            None => PreWrite::Untracked,
        }
    }
}

impl<E: Entity> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> SnapshotLoader for MemoryStore<E> {
    fn load_snapshot(&self, id: &str) -> Result<Option<Snapshot>, StoreError> {
        let Some(key) = Self::key(id) else {
            return Ok(None);
        };
        let rows = self.rows.read();
        rows.get(&key)
            .map(|row| snapshot_of(row))
            .transpose()
            .map_err(StoreError::from)
    }
}

impl<E: Entity> Store<E> for MemoryStore<E> {
    fn get(&self, id: &str) -> Result<Option<E>> {
        Ok(Self::key(id).and_then(|key| self.rows.read().get(&key).cloned()))
    }

    fn list(&self) -> Result<Vec<E>> {
        Ok(self.rows.read().values().cloned().collect())
    }

    fn insert(&self, mut entity: E) -> Result<E> {
        let pre = self.before(&entity, true);

        let key = self.next_id.fetch_add(1, Ordering::Relaxed);
        entity.set_id(key.to_string());
        entity.touch(Utc::now(), true);
        self.rows.write().insert(key, entity.clone());

        if let Some(hooks) = &self.hooks {
            hooks.after_write(&entity, pre)?;
        }
        Ok(entity)
    }

    fn update(&self, mut entity: E) -> Result<E> {
        let id = entity
            .id()
            .map(str::to_string)
            .ok_or(StoreError::MissingId {
                type_name: E::TYPE_NAME,
            })?;
        let key = Self::key(&id).ok_or_else(|| Error::not_found(E::TYPE_NAME, id.as_str()))?;

        let pre = self.before(&entity, false);

        entity.touch(Utc::now(), false);
        {
            let mut rows = self.rows.write();
            let slot = rows
                .get_mut(&key)
                .ok_or_else(|| Error::not_found(E::TYPE_NAME, id.as_str()))?;
            *slot = entity.clone();
        }

        if let Some(hooks) = &self.hooks {
            hooks.after_write(&entity, pre)?;
        }
        Ok(entity)
    }

    fn delete(&self, id: &str) -> Result<E> {
        let removed = Self::key(id)
            .and_then(|key| self.rows.write().remove(&key))
            .ok_or_else(|| Error::not_found(E::TYPE_NAME, id))?;

        if let Some(hooks) = &self.hooks {
            hooks.after_delete(&removed)?;
        }
        Ok(removed)
    }
}

impl<E: Entity> std::fmt::Debug for MemoryStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("type_name", &E::TYPE_NAME)
            .field("rows", &self.len())
            .field("hooked", &self.hooks.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ActorId;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;
    use serde::Serialize;

    #[derive(Debug, Clone, Serialize)]
    struct City {
        id: Option<String>,
        owner: Option<ActorId>,
        name: String,
        updated_at: Option<DateTime<Utc>>,
    }

    impl Entity for City {
        const TYPE_NAME: &'static str = "City";

        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_id(&mut self, id: String) {
            self.id = Some(id);
        }

        fn owner(&self) -> Option<&ActorId> {
            self.owner.as_ref()
        }

        fn set_owner(&mut self, owner: Option<ActorId>) {
            self.owner = owner;
        }

        fn label(&self) -> String {
            self.name.clone()
        }

        fn touch(&mut self, now: DateTime<Utc>, _created: bool) {
            self.updated_at = Some(now);
        }
    }

    fn city(name: &str) -> City {
        City {
            id: None,
            owner: None,
            name: name.to_string(),
            updated_at: None,
        }
    }

    #[derive(Default)]
    struct RecordingHooks {
        calls: Mutex<Vec<String>>,
    }

    impl LifecycleHooks for RecordingHooks {
        fn before_write(
            &self,
            entity: &dyn Tracked,
            is_create: bool,
            loader: &dyn SnapshotLoader,
        ) -> PreWrite {
            let persisted = entity
                .target_id()
                .and_then(|id| loader.load_snapshot(id).ok().flatten());
            self.calls
                .lock()
                .push(format!("before:{is_create}:{}", persisted.is_some()));
            if is_create {
                PreWrite::Create
            } else {
                PreWrite::Update(persisted)
            }
        }

        fn after_write(&self, entity: &dyn Tracked, pre: PreWrite) -> Result<()> {
            let kind = match pre {
                PreWrite::Create => "create",
                PreWrite::Update(_) => "update",
                PreWrite::Untracked => "untracked",
            };
            self.calls
                .lock()
                .push(format!("after:{kind}:{}", entity.target_id().unwrap_or("-")));
            Ok(())
        }

        fn after_delete(&self, entity: &dyn Tracked) -> Result<()> {
            self.calls
                .lock()
                .push(format!("delete:{}", entity.target_label()));
            Ok(())
        }
    }

    #[test]
    fn insert_assigns_sequential_ids_and_touches() {
        let store = MemoryStore::new();
        let a = store.insert(city("Recife")).unwrap();
        let b = store.insert(city("Olinda")).unwrap();

        assert_eq!(a.id(), Some("1"));
        assert_eq!(b.id(), Some("2"));
        assert!(a.updated_at.is_some());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn hooks_run_in_order_around_writes() {
        let hooks = Arc::new(RecordingHooks::default());
        let store = MemoryStore::with_hooks(hooks.clone());

        let mut saved = store.insert(city("Recife")).unwrap();
        saved.name = "Recife Antigo".to_string();
        store.update(saved).unwrap();
        store.delete("1").unwrap();

        assert_eq!(
            *hooks.calls.lock(),
            vec![
                "before:true:false",
                "after:create:1",
                "before:false:true",
                "after:update:1",
                "delete:Recife Antigo",
            ]
        );
    }

    #[test]
    fn update_without_id_is_rejected() {
        let store = MemoryStore::new();
        let err = store.update(city("Nowhere")).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::MissingId { .. })));
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let store: MemoryStore<City> = MemoryStore::new();
        assert!(store.get("42").unwrap().is_none());
        assert!(store.get("abc").unwrap().is_none());
        assert!(store.delete("42").unwrap_err().is_not_found());

        let mut ghost = city("Ghost");
        ghost.set_id("42".to_string());
        assert!(store.update(ghost).unwrap_err().is_not_found());
    }

    #[test]
    fn loader_reads_persisted_state() {
        let store = MemoryStore::new();
        store.insert(city("Recife")).unwrap();

        let snap = store.load_snapshot("1").unwrap().unwrap();
        assert_eq!(snap.get("name"), Some(&serde_json::json!("Recife")));
        assert!(store.load_snapshot("2").unwrap().is_none());
    }
}
