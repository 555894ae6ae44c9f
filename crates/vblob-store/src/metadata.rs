use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the backend knows about a stored object without reading its bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMetadata {
    /// Logical key of the object.
    pub key: String,
    /// Content length in bytes.
    pub size: u64,
    /// Digest of the content, as reported by the backend.
    pub etag: String,
    /// Time the object was last written.
    pub last_modified: DateTime<Utc>,
}

impl ObjectMetadata {
    /// The same metadata re-keyed, e.g. after a copy or prefix rewrite.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }
}
