//! Capability queries used by the host framework to route identifiers.
//!
//! A host may register several storage adapters side by side. It asks each
//! one whether it [`handles`](VersionedBlobStore::handles) an identifier and
//! which optional [`Feature`]s it [`supports`](VersionedBlobStore::supports).

use std::fmt;
use std::str::FromStr;

use vblob_types::{TypeError, VersionIdentifier};

use crate::error::BlobResult;
use crate::store::VersionedBlobStore;

/// Optional adapter capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Several versions per base can be stored and listed.
    Versions,
    /// Single versions can be deleted independently of their base.
    VersionDeletion,
}

impl Feature {
    pub const ALL: [Feature; 2] = [Feature::Versions, Feature::VersionDeletion];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Versions => "versions",
            Self::VersionDeletion => "versionDeletion",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, TypeError> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.name() == s)
            .ok_or_else(|| TypeError::UnknownFeature { name: s.to_string() })
    }
}

impl VersionedBlobStore {
    /// Returns `true` if `identifier` carries this store's scheme and prefix.
    pub fn handles(&self, identifier: &str) -> bool {
        self.locator().handles(identifier)
    }

    pub fn supports(&self, feature: Feature) -> bool {
        matches!(feature, Feature::Versions | Feature::VersionDeletion)
    }

    /// Name-based form of [`supports`](Self::supports); unknown names are
    /// unsupported.
    pub fn supports_named(&self, feature: &str) -> bool {
        feature.parse::<Feature>().is_ok_and(|f| self.supports(f))
    }

    /// Parse an external identifier handled by this store.
    pub fn parse_locator(&self, identifier: &str) -> BlobResult<VersionIdentifier> {
        Ok(self.locator().parse(identifier)?)
    }

    pub fn format_locator(&self, id: &VersionIdentifier) -> String {
        self.locator().format(id)
    }
}
