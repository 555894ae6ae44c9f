//! Prefix-scoped view over another object store.
//!
//! Deployments commonly share one bucket and give each application its own
//! top-level folder. [`PrefixedObjectStore`] adds that folder to every key on
//! the way in and strips it on the way out, so the layers above only ever
//! handle logical keys.

use bytes::Bytes;

use crate::error::StoreResult;
use crate::metadata::ObjectMetadata;
use crate::traits::ObjectStore;

/// An [`ObjectStore`] that stores every key under `<prefix>/`.
pub struct PrefixedObjectStore<S> {
    inner: S,
    prefix: String,
}

impl<S: ObjectStore> PrefixedObjectStore<S> {
    /// Wrap `inner`, scoping keys under `prefix`. Surrounding slashes in
    /// `prefix` are ignored.
    pub fn new(inner: S, prefix: &str) -> Self {
        let trimmed = prefix.trim_matches('/');
        let prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}/")
        };
        Self { inner, prefix }
    }

    /// The storage-level prefix including its trailing slash.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn physical(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    fn logical<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.prefix.as_str())
    }

    fn relabel(&self, metadata: ObjectMetadata) -> ObjectMetadata {
        let key = self.logical(&metadata.key).map(str::to_string);
        match key {
            Some(key) => metadata.with_key(key),
            None => metadata,
        }
    }
}

impl<S: ObjectStore> ObjectStore for PrefixedObjectStore<S> {
    fn put(&self, key: &str, data: Bytes) -> StoreResult<ObjectMetadata> {
        self.inner.put(&self.physical(key), data).map(|m| self.relabel(m))
    }

    fn get(&self, key: &str) -> StoreResult<Option<Bytes>> {
        self.inner.get(&self.physical(key))
    }

    fn head(&self, key: &str) -> StoreResult<Option<ObjectMetadata>> {
        Ok(self
            .inner
            .head(&self.physical(key))?
            .map(|m| self.relabel(m)))
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        self.inner.delete(&self.physical(key))
    }

    fn delete_many(&self, keys: &[String]) -> StoreResult<Vec<String>> {
        let physical: Vec<String> = keys.iter().map(|k| self.physical(k)).collect();
        Ok(self
            .inner
            .delete_many(&physical)?
            .iter()
            .filter_map(|k| self.logical(k).map(str::to_string))
            .collect())
    }

    fn list_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .inner
            .list_by_prefix(&self.physical(prefix))?
            .iter()
            .filter_map(|k| self.logical(k).map(str::to_string))
            .collect())
    }

    fn copy(&self, src: &str, dst: &str) -> StoreResult<ObjectMetadata> {
        self.inner
            .copy(&self.physical(src), &self.physical(dst))
            .map(|m| self.relabel(m))
    }
}

impl<S> std::fmt::Debug for PrefixedObjectStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefixedObjectStore")
            .field("prefix", &self.prefix)
            .finish()
    }
}
