use std::sync::{Arc, OnceLock};

use bytes::buf::Reader;
use bytes::{Buf, Bytes};
use chrono::{DateTime, Utc};
use tracing::debug;
use vblob_store::{ObjectMetadata, ObjectStore};
use vblob_types::VersionIdentifier;

use crate::error::{BlobError, BlobResult};

/// A stored version, with its content fetched on first read.
///
/// Creating a handle costs at most one `head` call; the backend's `get` is
/// issued only when [`read`](Self::read) or [`open`](Self::open) is first
/// called, and the bytes are then cached and shared by every clone.
#[derive(Clone)]
pub struct StoredObjectHandle {
    id: VersionIdentifier,
    locator: String,
    filename: Option<String>,
    metadata: ObjectMetadata,
    content: LazyContent,
}

#[derive(Clone)]
struct LazyContent {
    backend: Arc<dyn ObjectStore>,
    cache: Arc<OnceLock<Bytes>>,
}

impl StoredObjectHandle {
    pub(crate) fn new(
        id: VersionIdentifier,
        locator: String,
        filename: Option<String>,
        metadata: ObjectMetadata,
        backend: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            id,
            locator,
            filename,
            metadata,
            content: LazyContent {
                backend,
                cache: Arc::new(OnceLock::new()),
            },
        }
    }

    pub fn id(&self) -> &VersionIdentifier {
        &self.id
    }

    /// Scheme-prefixed identifier handed to callers outside the store.
    pub fn locator(&self) -> &str {
        &self.locator
    }

    /// Display filename given at upload. Never part of the key.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn etag(&self) -> &str {
        &self.metadata.etag
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.metadata.last_modified
    }

    pub fn metadata(&self) -> &ObjectMetadata {
        &self.metadata
    }

    /// Returns `true` once the content has been fetched.
    pub fn is_loaded(&self) -> bool {
        self.content.cache.get().is_some()
    }

    /// The full content. Fetches from the backend on first call.
    pub fn read(&self) -> BlobResult<Bytes> {
        if let Some(bytes) = self.content.cache.get() {
            return Ok(bytes.clone());
        }
        let key = self.metadata.key.as_str();
        debug!(key, "fetching content");
        let bytes = self
            .content
            .backend
            .get(key)?
            .ok_or_else(|| BlobError::not_found(&self.id))?;
        // A concurrent reader may have won the race; either value is the same object.
        let _ = self.content.cache.set(bytes.clone());
        Ok(bytes)
    }

    /// The content as a [`std::io::Read`] stream.
    pub fn open(&self) -> BlobResult<Reader<Bytes>> {
        Ok(self.read()?.reader())
    }
}

impl std::fmt::Debug for StoredObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredObjectHandle")
            .field("id", &self.id)
            .field("filename", &self.filename)
            .field("size", &self.metadata.size)
            .field("etag", &self.metadata.etag)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
