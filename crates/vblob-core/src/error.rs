use thiserror::Error;
use vblob_store::StoreError;
use vblob_types::TypeError;

/// Errors surfaced by [`VersionedBlobStore`](crate::VersionedBlobStore).
#[derive(Debug, Error)]
pub enum BlobError {
    /// The identifier resolves to no live object.
    #[error("not found: {id}")]
    NotFound { id: String },

    /// Post-upload checksum verification failed. The object stays written.
    #[error("integrity check failed for {id}")]
    Integrity { id: String },

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] TypeError),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// Backend failure other than a missing object or bucket.
    #[error("backend error: {0}")]
    Backend(StoreError),
}

impl BlobError {
    pub(crate) fn not_found(id: impl ToString) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<StoreError> for BlobError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { key } => Self::NotFound { id: key },
            StoreError::BucketMissing { bucket } => Self::NotFound { id: bucket },
            other => Self::Backend(other),
        }
    }
}

pub type BlobResult<T> = Result<T, BlobError>;
