//! Core store type and builder.

use crate::backend::{DocumentBackend, Entry};
use crate::error::{Error, Result};
use crate::path::{delete_path, get_path, set_path};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Connection lifecycle of a [`DocMap`].
///
/// Every operation except `connect` requires `Connected`; anything else
/// fails with [`Error::NotReady`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Initial state; no connection attempt made yet.
    Disconnected,
    /// A `connect()` call is in flight.
    Connecting,
    /// The connection is open and the collection is selected.
    Connected,
    /// The last `connect()` attempt failed. Call `connect()` again to retry.
    Failed,
}

/// Key-value map backed by a remote document store.
///
/// Reads go through the in-memory mirror when it is enabled (the default),
/// giving read-after-write consistency for a single caller without a network
/// round-trip. Writes go to the authoritative store first; the mirror is
/// updated only once the write is acknowledged, so a failed upstream write
/// never leaves the mirror ahead of durable state.
///
/// The mirror only tracks writes made through this instance. External
/// writers bypass it — `connect()` re-synchronizes, and the `_uncached`
/// read variants always ask the authoritative store.
pub struct DocMap<B> {
    backend: B,
    address: String,
    database: String,
    collection: String,
    options: HashMap<String, String>,
    mirror: Option<RwLock<Map<String, Value>>>,
    default_value: RwLock<Option<Value>>,
    status: RwLock<ConnectionStatus>,
}

impl<B: DocumentBackend> DocMap<B> {
    /// Construct a store with the mirror enabled and no driver options.
    /// Shorthand for `DocMapBuilder::new(address).database(..).collection(..)
    /// .build(backend)`.
    pub fn open(
        address: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
        backend: B,
    ) -> Result<Self> {
        DocMapBuilder::new(address)
            .database(database)
            .collection(collection)
            .build(backend)
    }

    // ---- lifecycle ----

    /// Open the connection, select the target collection, and synchronize
    /// the mirror from the authoritative entry set.
    ///
    /// Idempotent: when already connected the existing connection is reused
    /// and only the mirror is re-synchronized (cleared, then repopulated), so
    /// repeated calls never duplicate entries. A failed attempt moves the
    /// store to [`ConnectionStatus::Failed`]; calling again retries.
    pub fn connect(&self) -> Result<&Self> {
        if *self.status.read() != ConnectionStatus::Connected {
            *self.status.write() = ConnectionStatus::Connecting;
            if let Err(err) = self.backend.connect(&self.address, &self.options) {
                *self.status.write() = ConnectionStatus::Failed;
                return Err(err);
            }
        }
        if let Err(err) = self.backend.select(&self.database, &self.collection) {
            *self.status.write() = ConnectionStatus::Failed;
            return Err(err);
        }
        // Always drawn from the authoritative store, never the mirror.
        let entries = match self.backend.find_all() {
            Ok(entries) => entries,
            Err(err) => {
                *self.status.write() = ConnectionStatus::Failed;
                return Err(err);
            }
        };
        if let Some(mirror) = &self.mirror {
            let mut mirror = mirror.write();
            mirror.clear();
            for entry in entries {
                mirror.insert(entry.key, entry.value);
            }
        }
        *self.status.write() = ConnectionStatus::Connected;
        Ok(self)
    }

    /// Current connection state.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.read()
    }

    /// `true` when the store is connected and ready for operations.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    // ---- reads ----

    /// Get the value for `key`, or the `ensure` default on a miss, or `None`.
    ///
    /// Served from the mirror when it is enabled. The default is deep-copied
    /// on every substitution, so mutating a returned default never affects
    /// later calls.
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.guard_ready()?;
        match self.fetch(key, true)? {
            Some(value) => Ok(Some(value)),
            None => Ok(self.default_value.read().clone()),
        }
    }

    /// Like [`get`](Self::get) but always queries the authoritative store,
    /// bypassing the mirror.
    pub fn get_uncached(&self, key: &str) -> Result<Option<Value>> {
        self.guard_ready()?;
        match self.fetch(key, false)? {
            Some(value) => Ok(Some(value)),
            None => Ok(self.default_value.read().clone()),
        }
    }

    /// `true` if an entry exists for `key`. Checks the mirror when enabled,
    /// otherwise issues an existence query. The `ensure` default does not
    /// count as existence.
    pub fn has(&self, key: &str) -> Result<bool> {
        self.guard_ready()?;
        if let Some(mirror) = &self.mirror {
            return Ok(mirror.read().contains_key(key));
        }
        Ok(self.backend.find_one(key)?.is_some())
    }

    /// Every entry. Insertion-ordered when drawn from the mirror;
    /// driver-determined order otherwise.
    pub fn all(&self) -> Result<Vec<Entry>> {
        self.guard_ready()?;
        self.entries(true)
    }

    /// Like [`all`](Self::all) but always queries the authoritative store.
    pub fn all_uncached(&self) -> Result<Vec<Entry>> {
        self.guard_ready()?;
        self.entries(false)
    }

    /// Number of entries.
    pub fn len(&self) -> Result<usize> {
        Ok(self.all()?.len())
    }

    /// `true` when the store has no entries.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All keys, in enumeration order.
    pub fn keys(&self) -> Result<Vec<String>> {
        Ok(self.all()?.into_iter().map(|entry| entry.key).collect())
    }

    /// All values, in enumeration order.
    pub fn values(&self) -> Result<Vec<Value>> {
        Ok(self.all()?.into_iter().map(|entry| entry.value).collect())
    }

    // ---- writes ----

    /// Upsert: insert `value` under `key`, replacing any previous value.
    /// Returns the authoritative store's acknowledgement; the mirror is
    /// refreshed only when the write was acknowledged.
    pub fn set(&self, key: &str, value: Value) -> Result<bool> {
        self.guard_ready()?;
        let acked = self.backend.upsert_one(key, &value)?;
        if acked {
            if let Some(mirror) = &self.mirror {
                mirror.write().insert(key.to_string(), value);
            }
        }
        Ok(acked)
    }

    /// Remove the entry for `key` from both layers. Returns `true` when the
    /// authoritative store actually removed a document.
    pub fn delete(&self, key: &str) -> Result<bool> {
        self.guard_ready()?;
        let removed = self.backend.delete_one(key)?;
        if let Some(mirror) = &self.mirror {
            mirror.write().shift_remove(key);
        }
        Ok(removed)
    }

    /// Remove every entry from both layers.
    pub fn clear(&self) -> Result<()> {
        self.guard_ready()?;
        self.backend.delete_many()?;
        if let Some(mirror) = &self.mirror {
            mirror.write().clear();
        }
        Ok(())
    }

    /// Set the fallback value substituted when `get` finds nothing.
    /// Chainable; calling again overwrites the previous default.
    pub fn ensure(&self, default_value: Value) -> &Self {
        *self.default_value.write() = Some(default_value);
        self
    }

    // ---- enumeration helpers ----

    /// Entries whose value satisfies `predicate`, preserving enumeration
    /// order. The predicate also sees the key and the entry's index.
    pub fn filter<F>(&self, mut predicate: F) -> Result<Vec<Entry>>
    where
        F: FnMut(&Value, &str, usize) -> bool,
    {
        let entries = self.all()?;
        Ok(entries
            .into_iter()
            .enumerate()
            .filter(|(index, entry)| predicate(&entry.value, &entry.key, *index))
            .map(|(_, entry)| entry)
            .collect())
    }

    /// Transform every entry's value, one result per entry, in enumeration
    /// order.
    pub fn map<T, F>(&self, mut transform: F) -> Result<Vec<T>>
    where
        F: FnMut(&Value, &str, usize) -> T,
    {
        let entries = self.all()?;
        Ok(entries
            .iter()
            .enumerate()
            .map(|(index, entry)| transform(&entry.value, &entry.key, index))
            .collect())
    }

    /// The first value (in enumeration order) satisfying `predicate`.
    pub fn find<F>(&self, mut predicate: F) -> Result<Option<Value>>
    where
        F: FnMut(&Value) -> bool,
    {
        Ok(self
            .all()?
            .into_iter()
            .find(|entry| predicate(&entry.value))
            .map(|entry| entry.value))
    }

    /// The earliest entry by current enumeration order, if any.
    pub fn first(&self) -> Result<Option<Entry>> {
        Ok(self.all()?.into_iter().next())
    }

    /// The earliest `n` entries by current enumeration order. Returns fewer
    /// when the store holds fewer.
    pub fn first_n(&self, n: usize) -> Result<Vec<Entry>> {
        let mut entries = self.all()?;
        entries.truncate(n);
        Ok(entries)
    }

    // ---- sub-property operations ----

    /// Read the nested field at `path` inside the value stored under `key`.
    ///
    /// Fails with [`Error::InvalidPath`] when no value is stored for `key`
    /// at all; returns `Ok(None)` when the value exists but the path walks
    /// off its edge. The `ensure` default is not substituted here.
    pub fn get_at(&self, key: &str, path: &str) -> Result<Option<Value>> {
        self.guard_ready()?;
        self.get_at_inner(key, path, true)
    }

    /// Like [`get_at`](Self::get_at) but bypassing the mirror.
    pub fn get_at_uncached(&self, key: &str, path: &str) -> Result<Option<Value>> {
        self.guard_ready()?;
        self.get_at_inner(key, path, false)
    }

    /// Write `value` at `path` inside the value stored under `key`, creating
    /// intermediate objects as needed. An absent entry starts from `{}`.
    ///
    /// This is a read-modify-write of the whole value; concurrent writers to
    /// the same key race at whole-value granularity, last write wins.
    pub fn set_at(&self, key: &str, path: &str, value: Value) -> Result<bool> {
        self.guard_ready()?;
        let mut root = self
            .fetch(key, true)?
            .unwrap_or_else(|| Value::Object(Map::new()));
        set_path(&mut root, path, value, true)?;
        self.set(key, root)
    }

    /// Remove the nested field at `path` inside the value stored under
    /// `key`, writing the mutated value back. Returns whether the field was
    /// actually removed. Fails with [`Error::InvalidPath`] when no value is
    /// stored for `key`.
    pub fn delete_at(&self, key: &str, path: &str) -> Result<bool> {
        self.guard_ready()?;
        let mut root = self
            .fetch(key, true)?
            .ok_or_else(|| Error::InvalidPath(format!("no value stored for key `{key}`")))?;
        let removed = delete_path(&mut root, path)?;
        self.set(key, root)?;
        Ok(removed)
    }

    // ---- internal ----

    fn guard_ready(&self) -> Result<()> {
        if *self.status.read() == ConnectionStatus::Connected {
            Ok(())
        } else {
            Err(Error::NotReady)
        }
    }

    // Raw lookup, no default substitution.
    fn fetch(&self, key: &str, use_mirror: bool) -> Result<Option<Value>> {
        if use_mirror {
            if let Some(mirror) = &self.mirror {
                return Ok(mirror.read().get(key).cloned());
            }
        }
        Ok(self.backend.find_one(key)?.map(|entry| entry.value))
    }

    fn entries(&self, use_mirror: bool) -> Result<Vec<Entry>> {
        if use_mirror {
            if let Some(mirror) = &self.mirror {
                return Ok(mirror
                    .read()
                    .iter()
                    .map(|(key, value)| Entry {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect());
            }
        }
        self.backend.find_all()
    }

    fn get_at_inner(&self, key: &str, path: &str, use_mirror: bool) -> Result<Option<Value>> {
        let root = self
            .fetch(key, use_mirror)?
            .ok_or_else(|| Error::InvalidPath(format!("no value stored for key `{key}`")))?;
        Ok(get_path(&root, path)?.cloned())
    }
}

impl<B> std::fmt::Debug for DocMap<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocMap")
            .field("address", &self.address)
            .field("database", &self.database)
            .field("collection", &self.collection)
            .field("status", &*self.status.read())
            .field("mirror", &self.mirror.is_some())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and constructs a [`DocMap`].
///
/// Construction never connects — call [`DocMap::connect`] on the result.
///
/// ```rust
/// use doc_map::{DocMapBuilder, MemoryBackend};
///
/// let db = DocMapBuilder::new("mem://local")
///     .database("app")
///     .collection("settings")
///     .mirror(false)
///     .build(MemoryBackend::new())
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct DocMapBuilder {
    address: String,
    database: String,
    collection: String,
    mirror: bool,
    options: HashMap<String, String>,
}

impl DocMapBuilder {
    /// Start configuring a store that will connect to `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            database: String::new(),
            collection: String::new(),
            mirror: true,
            options: HashMap::new(),
        }
    }

    /// Target database name.
    #[must_use]
    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.database = name.into();
        self
    }

    /// Target collection name.
    #[must_use]
    pub fn collection(mut self, name: impl Into<String>) -> Self {
        self.collection = name.into();
        self
    }

    /// Enable or disable the in-memory mirror (default: enabled).
    #[must_use]
    pub fn mirror(mut self, yes: bool) -> Self {
        self.mirror = yes;
        self
    }

    /// Add a driver option, forwarded verbatim to the backend on connect.
    #[must_use]
    pub fn driver_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Validate the configuration and construct the store.
    pub fn build<B: DocumentBackend>(self, backend: B) -> Result<DocMap<B>> {
        if self.address.is_empty() {
            return Err(Error::Config("address must not be empty".into()));
        }
        if self.database.is_empty() {
            return Err(Error::Config("database name must not be empty".into()));
        }
        if self.collection.is_empty() {
            return Err(Error::Config("collection name must not be empty".into()));
        }
        Ok(DocMap {
            backend,
            address: self.address,
            database: self.database,
            collection: self.collection,
            options: self.options,
            mirror: self.mirror.then(|| RwLock::new(Map::new())),
            default_value: RwLock::new(None),
            status: RwLock::new(ConnectionStatus::Disconnected),
        })
    }
}
