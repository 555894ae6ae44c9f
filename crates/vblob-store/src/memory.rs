use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::debug;
use vblob_crypto::ContentHasher;

use crate::error::{StoreError, StoreResult};
use crate::metadata::ObjectMetadata;
use crate::traits::ObjectStore;

struct Entry {
    data: Bytes,
    metadata: ObjectMetadata,
}

/// Per-operation call counts of an [`InMemoryObjectStore`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpStats {
    pub puts: u64,
    pub gets: u64,
    pub heads: u64,
    pub deletes: u64,
    pub batch_deletes: u64,
    pub lists: u64,
    pub copies: u64,
}

impl OpStats {
    /// Calls that may have changed the store.
    pub fn mutations(&self) -> u64 {
        self.puts + self.deletes + self.batch_deletes + self.copies
    }
}

#[derive(Default)]
struct OpCounters {
    puts: AtomicU64,
    gets: AtomicU64,
    heads: AtomicU64,
    deletes: AtomicU64,
    batch_deletes: AtomicU64,
    lists: AtomicU64,
    copies: AtomicU64,
}

impl OpCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OpStats {
        OpStats {
            puts: self.puts.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            heads: self.heads.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            batch_deletes: self.batch_deletes.load(Ordering::Relaxed),
            lists: self.lists.load(Ordering::Relaxed),
            copies: self.copies.load(Ordering::Relaxed),
        }
    }
}

/// In-memory, `BTreeMap`-based object store.
///
/// Intended for tests and embedding. Objects live behind a `RwLock`; content
/// is held as [`Bytes`] so reads are cheap clones. Every trait call is
/// counted, which lets tests assert that an operation did (or did not) touch
/// the backend.
pub struct InMemoryObjectStore {
    objects: RwLock<BTreeMap<String, Entry>>,
    counters: OpCounters,
}

impl InMemoryObjectStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            counters: OpCounters::default(),
        }
    }

    /// Write an object with an explicit modification time.
    ///
    /// Not counted in [`stats`](Self::stats); used to seed objects that
    /// predate the code under test.
    pub fn put_with_timestamp(
        &self,
        key: &str,
        data: impl Into<Bytes>,
        last_modified: DateTime<Utc>,
    ) -> StoreResult<ObjectMetadata> {
        let data = data.into();
        let metadata = ObjectMetadata {
            key: key.to_string(),
            size: data.len() as u64,
            etag: ContentHasher::ETAG.hash_hex(&data),
            last_modified,
        };
        self.write_lock()?.insert(
            key.to_string(),
            Entry {
                data,
                metadata: metadata.clone(),
            },
        );
        Ok(metadata)
    }

    /// Snapshot of the call counters.
    pub fn stats(&self) -> OpStats {
        self.counters.snapshot()
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.read_lock().map(|map| map.len()).unwrap_or_default()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All keys in ascending order.
    pub fn keys(&self) -> Vec<String> {
        self.read_lock()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn read_lock(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Entry>>> {
        self.objects
            .read()
            .map_err(|e| StoreError::Transport(format!("lock poisoned: {e}")))
    }

    fn write_lock(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Entry>>> {
        self.objects
            .write()
            .map_err(|e| StoreError::Transport(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for InMemoryObjectStore {
    fn put(&self, key: &str, data: Bytes) -> StoreResult<ObjectMetadata> {
        OpCounters::bump(&self.counters.puts);
        debug!(key, size = data.len(), "put");
        self.put_with_timestamp(key, data, Utc::now())
    }

    fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        OpCounters::bump(&self.counters.gets);
        Ok(self.read_lock()?.get(key).map(|entry| entry.data.clone()))
    }

    fn head(&self, key: &str) -> StoreResult<Option<ObjectMetadata>> {
        OpCounters::bump(&self.counters.heads);
        Ok(self.read_lock()?.get(key).map(|entry| entry.metadata.clone()))
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        OpCounters::bump(&self.counters.deletes);
        debug!(key, "delete");
        Ok(self.write_lock()?.remove(key).is_some())
    }

    fn delete_many(&self, keys: &[String]) -> StoreResult<Vec<String>> {
        OpCounters::bump(&self.counters.batch_deletes);
        debug!(count = keys.len(), "delete_many");
        let mut map = self.write_lock()?;
        Ok(keys
            .iter()
            .filter(|key| map.remove(key.as_str()).is_some())
            .cloned()
            .collect())
    }

    fn list_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        OpCounters::bump(&self.counters.lists);
        let map = self.read_lock()?;
        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }

    fn copy(&self, src: &str, dst: &str) -> StoreResult<ObjectMetadata> {
        OpCounters::bump(&self.counters.copies);
        debug!(src, dst, "copy");
        let mut map = self.write_lock()?;
        let (data, etag) = match map.get(src) {
            Some(entry) => (entry.data.clone(), entry.metadata.etag.clone()),
            None => {
                return Err(StoreError::NotFound {
                    key: src.to_string(),
                })
            }
        };
        let metadata = ObjectMetadata {
            key: dst.to_string(),
            size: data.len() as u64,
            etag,
            last_modified: Utc::now(),
        };
        map.insert(
            dst.to_string(),
            Entry {
                data,
                metadata: metadata.clone(),
            },
        );
        Ok(metadata)
    }
}

impl std::fmt::Debug for InMemoryObjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryObjectStore")
            .field("object_count", &self.len())
            .field("stats", &self.stats())
            .finish()
    }
}
