use std::sync::Arc;

use bytes::Bytes;

use crate::error::StoreResult;
use crate::metadata::ObjectMetadata;

/// Flat key-value object store.
///
/// Every call is a blocking round-trip to the backend and may fail
/// transiently; implementations do not retry. Implementations must be safe to
/// share across threads.
pub trait ObjectStore: Send + Sync {
    /// Write `data` at `key`, replacing any existing object.
    fn put(&self, key: &str, data: Bytes) -> StoreResult<ObjectMetadata>;

    /// Read an object's bytes.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get(&self, key: &str) -> StoreResult<Option<Bytes>>;

    /// Read an object's metadata without fetching its bytes.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn head(&self, key: &str) -> StoreResult<Option<ObjectMetadata>>;

    /// Delete an object. Returns `true` if the object existed.
    fn delete(&self, key: &str) -> StoreResult<bool>;

    /// Delete several objects and return the keys that existed.
    ///
    /// Default implementation calls `delete()` for each key. Backends with a
    /// batch endpoint should override this.
    fn delete_many(&self, keys: &[String]) -> StoreResult<Vec<String>> {
        let mut deleted = Vec::with_capacity(keys.len());
        for key in keys {
            if self.delete(key)? {
                deleted.push(key.clone());
            }
        }
        Ok(deleted)
    }

    /// List every key starting with `prefix`, in ascending order.
    ///
    /// Keys are logical: any storage-level prefix is stripped.
    fn list_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Server-side copy of `src` to `dst`, without moving the bytes through
    /// the caller. Fails with `NotFound` if `src` does not exist.
    fn copy(&self, src: &str, dst: &str) -> StoreResult<ObjectMetadata>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    fn put(&self, key: &str, data: Bytes) -> StoreResult<ObjectMetadata> {
        (**self).put(key, data)
    }

    fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        (**self).get(key)
    }

    fn head(&self, key: &str) -> StoreResult<Option<ObjectMetadata>> {
        (**self).head(key)
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        (**self).delete(key)
    }

    fn delete_many(&self, keys: &[String]) -> StoreResult<Vec<String>> {
        (**self).delete_many(keys)
    }

    fn list_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        (**self).list_by_prefix(prefix)
    }

    fn copy(&self, src: &str, dst: &str) -> StoreResult<ObjectMetadata> {
        (**self).copy(src, dst)
    }
}
