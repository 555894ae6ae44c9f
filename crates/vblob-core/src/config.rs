use serde::{Deserialize, Serialize};
use vblob_types::Locator;

use crate::error::{BlobError, BlobResult};

/// Configuration for a [`VersionedBlobStore`](crate::VersionedBlobStore).
///
/// The backend, clock, and verifier are injected separately; this covers
/// only what callers see in identifiers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobStoreConfig {
    /// Scheme token of external identifiers (`<scheme>://<key>`).
    pub scheme: String,
    /// Optional deployment prefix (`<prefix>-<scheme>://<key>`).
    pub prefix: Option<String>,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            scheme: "vblob".into(),
            prefix: None,
        }
    }
}

impl BlobStoreConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> BlobResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| BlobError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> BlobResult<()> {
        let valid_char = |c: char| c.is_ascii_alphanumeric() || c == '+' || c == '.';
        if self.scheme.is_empty() || !self.scheme.chars().all(valid_char) {
            return Err(BlobError::Config(format!("invalid scheme: {:?}", self.scheme)));
        }
        if let Some(prefix) = &self.prefix {
            if prefix.contains("://") {
                return Err(BlobError::Config(format!("invalid prefix: {prefix:?}")));
            }
        }
        Ok(())
    }

    pub fn locator(&self) -> Locator {
        Locator::new(&self.scheme, self.prefix.as_deref())
    }
}
