//! Reactive collection binding
//!
//! A [`Collection`] mirrors one record partition into an in-memory ordered
//! list. Mutations are applied optimistically to the list after the write
//! lands; any write failure is classified, reported to the notification
//! collaborator, and followed by a forced full reload so the cache can never
//! keep an optimistic entry that never reached durable storage.
//!
//! The in-memory list is strictly a cache, never the source of truth.
//! Two collections over the same partition do not observe each other's
//! writes in real time; only a [`DataVersion`] bump (issued after bulk
//! merges) forces every open collection to rehydrate.

use std::rc::Rc;

use uuid::Uuid;

use crate::models::{now_millis, Record};
use crate::notify::{NoticeLevel, Notifier};
use crate::storage::{StorageEngine, StorageError, StorageResult};
use crate::version::{DataVersion, Subscription};

/// In-memory mirror of one partition, with optimistic mutation
pub struct Collection<T: Record> {
    engine: Rc<StorageEngine>,
    notifier: Rc<dyn Notifier>,
    subscription: Subscription,
    items: Vec<T>,
    loaded: bool,
}

impl<T: Record> Collection<T> {
    /// Create a binding over `T`'s partition.
    ///
    /// The partition is not read until first access.
    pub fn new(
        engine: Rc<StorageEngine>,
        versions: &Rc<DataVersion>,
        notifier: Rc<dyn Notifier>,
    ) -> Self {
        Self {
            engine,
            notifier,
            subscription: versions.subscribe(),
            items: Vec::new(),
            loaded: false,
        }
    }

    /// Whether the initial load has happened
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The current list, reloading first if the partition was never read or
    /// a data-version bump invalidated the cache
    pub fn items(&mut self) -> StorageResult<&[T]> {
        self.ensure_fresh()?;
        Ok(&self.items)
    }

    /// Discard the cache and re-read the full partition
    pub fn reload(&mut self) -> StorageResult<()> {
        let raw = self.engine.get_all(T::PARTITION)?;
        let mut items = Vec::with_capacity(raw.len());
        for value in raw {
            items.push(decode::<T>(value)?);
        }
        self.items = items;
        self.loaded = true;
        self.subscription.clear();
        Ok(())
    }

    /// Persist a new record and append it to the list.
    ///
    /// An empty id or zero creation stamp is synthesized; a caller-supplied
    /// creation stamp survives, so backdated imports keep their history.
    /// On failure the error is classified, the notifier informed, the cache
    /// resynced from storage, and the error returned to the caller.
    pub fn add(&mut self, mut item: T) -> StorageResult<T> {
        self.ensure_fresh()?;

        if item.id().is_empty() {
            item.set_id(Uuid::new_v4().to_string());
        }
        if item.created_at() == 0 {
            item.set_created_at(now_millis());
        }

        let value = match encode(&item) {
            Ok(value) => value,
            Err(err) => return Err(self.fail("add", err)),
        };
        match self.engine.put(T::PARTITION, &value, None) {
            Ok(()) => {
                // Re-adding an existing id is an upsert in storage; the
                // cache must not grow a duplicate entry
                match self.items.iter_mut().find(|entry| entry.id() == item.id()) {
                    Some(entry) => *entry = item.clone(),
                    None => self.items.push(item.clone()),
                }
                Ok(item)
            }
            Err(err) => Err(self.fail("add", err)),
        }
    }

    /// Read the current persisted record, apply `apply`, stamp the update
    /// time, persist, and patch the in-memory entry.
    ///
    /// The merge always starts from durable state, not the cached copy, so a
    /// concurrent external change is not overwritten with stale data. A
    /// missing id is a silent no-op returning `Ok(None)`, since UI state may
    /// lag the store by one re-render.
    pub fn update(&mut self, id: &str, apply: impl FnOnce(&mut T)) -> StorageResult<Option<T>> {
        self.ensure_fresh()?;

        let current = match self.engine.get(T::PARTITION, id) {
            Ok(current) => current,
            Err(err) => return Err(self.fail("update", err)),
        };
        let Some(raw) = current else {
            return Ok(None);
        };

        let mut record = match decode::<T>(raw) {
            Ok(record) => record,
            Err(err) => return Err(self.fail("update", err)),
        };
        apply(&mut record);
        // Clamped so updatedAt can never precede createdAt
        record.set_updated_at(now_millis().max(record.created_at()));

        let value = match encode(&record) {
            Ok(value) => value,
            Err(err) => return Err(self.fail("update", err)),
        };
        match self.engine.put(T::PARTITION, &value, None) {
            Ok(()) => {
                if let Some(entry) = self.items.iter_mut().find(|item| item.id() == id) {
                    *entry = record.clone();
                }
                Ok(Some(record))
            }
            Err(err) => Err(self.fail("update", err)),
        }
    }

    /// Delete from storage, then from memory; a missing id is a no-op
    pub fn delete(&mut self, id: &str) -> StorageResult<()> {
        self.ensure_fresh()?;

        match self.engine.delete(T::PARTITION, id) {
            Ok(()) => {
                self.items.retain(|item| item.id() != id);
                Ok(())
            }
            Err(err) => Err(self.fail("delete", err)),
        }
    }

    fn ensure_fresh(&mut self) -> StorageResult<()> {
        if !self.loaded || self.subscription.is_stale() {
            self.reload()?;
        }
        Ok(())
    }

    /// Classify a failed write, surface it, and force a resync
    fn fail(&mut self, action: &str, err: StorageError) -> StorageError {
        let message = if err.is_quota_exceeded() {
            "Storage full. Could not save changes. Please free up space or clear some data."
                .to_string()
        } else {
            format!("Failed to {} item. Please try again.", action)
        };
        self.notifier.notify(NoticeLevel::Error, &message);

        if let Err(reload_err) = self.reload() {
            // Leave the collection unloaded so the next access retries
            self.loaded = false;
            tracing::warn!(
                partition = T::PARTITION,
                error = %reload_err,
                "resync after failed write also failed"
            );
        }
        err
    }
}

fn encode<T: Record>(item: &T) -> StorageResult<serde_json::Value> {
    serde_json::to_value(item).map_err(|source| StorageError::Encode {
        partition: T::PARTITION.to_string(),
        source,
    })
}

fn decode<T: Record>(value: serde_json::Value) -> StorageResult<T> {
    serde_json::from_value(value).map_err(|source| StorageError::Decode {
        partition: T::PARTITION.to_string(),
        source,
    })
}
