/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested key does not exist.
    #[error("object not found: {key}")]
    NotFound { key: String },

    /// The bucket or container backing the store does not exist.
    #[error("bucket missing: {bucket}")]
    BucketMissing { bucket: String },

    /// Network or backend failure. Callers may retry.
    #[error("transport error: {0}")]
    Transport(String),
}

impl StoreError {
    /// Returns `true` for errors that mean "there is nothing at this key".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::BucketMissing { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
