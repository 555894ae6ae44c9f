//! Version tokens and the identifiers built from them.
//!
//! Key grammar:
//!
//! ```text
//! key       = base [ "_v-" token ]
//! token     = stamp | "current" | stamp "-deletionmarker"
//! stamp     = 13*DIGIT           ; zero-padded, exactly as displayed
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::base::{BaseIdentifier, VERSION_DELIMITER};
use crate::error::{Result, TypeError};
use crate::stamp::VersionStamp;

/// Symbolic token that resolves to the newest live version of a base.
pub const CURRENT_TOKEN: &str = "current";

/// Suffix appended to a stamp to mark the version as deleted.
pub const TOMBSTONE_SUFFIX: &str = "-deletionmarker";

/// The version part of a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VersionToken {
    /// A live version created at the given stamp.
    Timestamp(VersionStamp),
    /// The `current` reference.
    Current,
    /// Deletion marker for the version with the same stamp.
    Tombstone(VersionStamp),
}

impl VersionToken {
    /// Parse the text that follows the delimiter. Returns `None` when the
    /// text is not a valid token.
    pub fn parse(text: &str) -> Option<Self> {
        if text == CURRENT_TOKEN {
            return Some(Self::Current);
        }
        if let Some(stamp) = text.strip_suffix(TOMBSTONE_SUFFIX) {
            return VersionStamp::parse(stamp).map(Self::Tombstone);
        }
        VersionStamp::parse(text).map(Self::Timestamp)
    }

    /// The stamp carried by a timestamp or tombstone token.
    pub fn stamp(&self) -> Option<VersionStamp> {
        match self {
            Self::Timestamp(stamp) | Self::Tombstone(stamp) => Some(*stamp),
            Self::Current => None,
        }
    }

    // (major, stamp, minor): `Current` above everything; a tombstone sorts
    // just after the live version it marks, like its longer key text does.
    fn sort_key(&self) -> (u8, u64, u8) {
        match self {
            Self::Timestamp(stamp) => (0, stamp.as_millis(), 0),
            Self::Tombstone(stamp) => (0, stamp.as_millis(), 1),
            Self::Current => (1, 0, 0),
        }
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timestamp(stamp) => write!(f, "{stamp}"),
            Self::Current => f.write_str(CURRENT_TOKEN),
            Self::Tombstone(stamp) => write!(f, "{stamp}{TOMBSTONE_SUFFIX}"),
        }
    }
}

/// A base identifier, optionally qualified by a version token.
///
/// `version == None` names the bare base: either a legacy unversioned object
/// or "whatever is newest", depending on the operation.
///
/// Ordering is by base, then version; unversioned sorts first. Sorting the
/// identifiers of one base in descending order yields newest first.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionIdentifier {
    base: BaseIdentifier,
    version: Option<VersionToken>,
}

impl VersionIdentifier {
    pub fn new(base: BaseIdentifier, version: VersionToken) -> Self {
        Self {
            base,
            version: Some(version),
        }
    }

    pub fn unversioned(base: BaseIdentifier) -> Self {
        Self {
            base,
            version: None,
        }
    }

    /// The `current` reference of a base.
    pub fn current(base: BaseIdentifier) -> Self {
        Self::new(base, VersionToken::Current)
    }

    /// Parse a raw storage key.
    ///
    /// Splits on the last delimiter. A key without the delimiter parses as an
    /// unversioned identifier. Every accepted key renders back unchanged
    /// through [`key`](Self::key), so stamps must be in padded form.
    ///
    /// # Examples
    ///
    /// ```
    /// use vblob_types::VersionIdentifier;
    ///
    /// let id = VersionIdentifier::parse("r1/u1_v-0000000001000").unwrap();
    /// assert_eq!(id.base_identifier().as_str(), "r1/u1");
    /// assert!(id.is_versioned());
    ///
    /// let legacy = VersionIdentifier::parse("r1/u1").unwrap();
    /// assert!(!legacy.is_versioned());
    /// ```
    pub fn parse(raw_key: &str) -> Result<Self> {
        let Some((base, token)) = raw_key.rsplit_once(VERSION_DELIMITER) else {
            return Ok(Self::unversioned(BaseIdentifier::new(raw_key)?));
        };
        let version = VersionToken::parse(token).ok_or_else(|| TypeError::InvalidVersionToken {
            key: raw_key.to_string(),
            token: token.to_string(),
        })?;
        Ok(Self::new(BaseIdentifier::new(base)?, version))
    }

    pub fn base_identifier(&self) -> &BaseIdentifier {
        &self.base
    }

    pub fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    pub fn stamp(&self) -> Option<VersionStamp> {
        self.version.and_then(|v| v.stamp())
    }

    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }

    pub fn is_current_reference(&self) -> bool {
        matches!(self.version, Some(VersionToken::Current))
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self.version, Some(VersionToken::Tombstone(_)))
    }

    /// True for a live timestamp version.
    pub fn is_live_version(&self) -> bool {
        matches!(self.version, Some(VersionToken::Timestamp(_)))
    }

    /// True when the identifier names one stored key rather than a
    /// reference that needs resolving.
    pub fn is_concrete(&self) -> bool {
        self.stamp().is_some()
    }

    /// A fresh live version of the same base.
    ///
    /// `at` is used verbatim when given (legacy migration keeps the original
    /// modification time); otherwise the wall clock is read.
    pub fn new_version(&self, at: Option<VersionStamp>) -> Self {
        let stamp = at.unwrap_or_else(VersionStamp::now);
        Self::new(self.base.clone(), VersionToken::Timestamp(stamp))
    }

    /// The tombstone marking this version as deleted. `None` unless this is a
    /// live timestamp version.
    pub fn tombstone(&self) -> Option<Self> {
        match self.version {
            Some(VersionToken::Timestamp(stamp)) => {
                Some(Self::new(self.base.clone(), VersionToken::Tombstone(stamp)))
            }
            _ => None,
        }
    }

    /// The live version a tombstone refers to.
    pub fn tombstoned_version(&self) -> Option<Self> {
        match self.version {
            Some(VersionToken::Tombstone(stamp)) => {
                Some(Self::new(self.base.clone(), VersionToken::Timestamp(stamp)))
            }
            _ => None,
        }
    }

    /// The bare-base identifier of this family.
    pub fn to_unversioned(&self) -> Self {
        Self::unversioned(self.base.clone())
    }

    /// Storage key text.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}{VERSION_DELIMITER}{version}", self.base),
            None => write!(f, "{}", self.base),
        }
    }
}

impl fmt::Debug for VersionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionIdentifier({self})")
    }
}

impl FromStr for VersionIdentifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionIdentifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionIdentifier> for String {
    fn from(id: VersionIdentifier) -> Self {
        id.to_string()
    }
}

impl From<BaseIdentifier> for VersionIdentifier {
    fn from(base: BaseIdentifier) -> Self {
        Self::unversioned(base)
    }
}
