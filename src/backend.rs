//! The database collaborator contract.
//!
//! Implement [`DocumentBackend`] to plug in a real driver. The store never
//! talks to a database directly — every durable read and write goes through
//! this trait, and driver failures come back as [`Error::Upstream`].

use crate::error::{Error, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// One key/value pair as stored by the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Caller-chosen unique identifier.
    pub key: String,
    /// The stored document, opaque to the collaborator.
    pub value: Value,
}

/// A connection to a remote document store.
///
/// The handle is a stateful session: `connect` establishes it, `select`
/// scopes every later call to one `database.collection` namespace. All calls
/// are fallible — network and driver errors surface as
/// [`Error::Upstream`](crate::Error::Upstream) and are never retried here.
pub trait DocumentBackend: Send + Sync {
    /// Open the connection. `options` is the caller's driver-option map,
    /// forwarded verbatim.
    fn connect(&self, address: &str, options: &HashMap<String, String>) -> Result<()>;

    /// Whether the connection is currently open.
    fn is_connected(&self) -> bool;

    /// Scope subsequent calls to `database.collection`.
    fn select(&self, database: &str, collection: &str) -> Result<()>;

    /// Fetch the entry for `key`, if any.
    fn find_one(&self, key: &str) -> Result<Option<Entry>>;

    /// Fetch every entry in the selected collection. Order is
    /// driver-determined and unspecified.
    fn find_all(&self) -> Result<Vec<Entry>>;

    /// Insert-or-replace by key. Returns the driver's acknowledgement.
    fn upsert_one(&self, key: &str, value: &Value) -> Result<bool>;

    /// Delete by key. Returns `true` when a document was actually removed.
    fn delete_one(&self, key: &str) -> Result<bool>;

    /// Delete every entry in the selected collection.
    fn delete_many(&self) -> Result<()>;
}

// ---- MemoryBackend ------------------------------------------------------------

/// In-process simulation of a remote document store.
///
/// Collections live behind a lock and are namespaced by `database.collection`,
/// so one backend can serve several stores. Cloning yields another handle to
/// the same underlying state, the way real driver handles share a session —
/// handy in tests for observing the store from the outside.
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    connected: AtomicBool,
    connects: AtomicUsize,
    calls: AtomicUsize,
    fail_next: AtomicBool,
    selected: RwLock<Option<String>>,
    collections: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryBackend {
    /// Fresh backend with no collections and no connection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `connect` has been called.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.inner.connects.load(Ordering::Relaxed)
    }

    /// How many collection-level calls (find/upsert/delete) have been issued.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.inner.calls.load(Ordering::Relaxed)
    }

    /// Make the next call fail with an upstream error. Single-shot.
    pub fn fail_next(&self) {
        self.inner.fail_next.store(true, Ordering::Relaxed);
    }

    fn check_fault(&self) -> Result<()> {
        if self.inner.fail_next.swap(false, Ordering::Relaxed) {
            return Err(Error::Upstream("injected failure".into()));
        }
        Ok(())
    }

    fn with_collection<T>(&self, f: impl FnOnce(&mut HashMap<String, Value>) -> T) -> Result<T> {
        self.check_fault()?;
        self.inner.calls.fetch_add(1, Ordering::Relaxed);
        let namespace = self
            .inner
            .selected
            .read()
            .clone()
            .ok_or_else(|| Error::Upstream("no collection selected".into()))?;
        let mut collections = self.inner.collections.write();
        Ok(f(collections.entry(namespace).or_default()))
    }
}

impl DocumentBackend for MemoryBackend {
    fn connect(&self, address: &str, _options: &HashMap<String, String>) -> Result<()> {
        self.check_fault()?;
        self.inner.connects.fetch_add(1, Ordering::Relaxed);
        if address.is_empty() {
            return Err(Error::Upstream("cannot connect to empty address".into()));
        }
        self.inner.connected.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::Relaxed)
    }

    fn select(&self, database: &str, collection: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::Upstream("not connected".into()));
        }
        *self.inner.selected.write() = Some(format!("{database}.{collection}"));
        Ok(())
    }

    fn find_one(&self, key: &str) -> Result<Option<Entry>> {
        self.with_collection(|coll| {
            coll.get(key).map(|value| Entry {
                key: key.to_string(),
                value: value.clone(),
            })
        })
    }

    fn find_all(&self) -> Result<Vec<Entry>> {
        self.with_collection(|coll| {
            coll.iter()
                .map(|(key, value)| Entry {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect()
        })
    }

    fn upsert_one(&self, key: &str, value: &Value) -> Result<bool> {
        self.with_collection(|coll| {
            coll.insert(key.to_string(), value.clone());
            true
        })
    }

    fn delete_one(&self, key: &str) -> Result<bool> {
        self.with_collection(|coll| coll.remove(key).is_some())
    }

    fn delete_many(&self) -> Result<()> {
        self.with_collection(|coll| coll.clear())
    }
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("connected", &self.is_connected())
            .field("selected", &*self.inner.selected.read())
            .finish_non_exhaustive()
    }
}
