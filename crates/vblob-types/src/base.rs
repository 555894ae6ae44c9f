use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};

/// Separator between a base identifier and its version token.
///
/// Underscores never appear in UUID text, so a generated base can never
/// contain the delimiter and the split in `VersionIdentifier::parse` is
/// unambiguous.
pub const VERSION_DELIMITER: &str = "_v-";

/// Stable name of a logical object family, e.g. `"invoices/0191…"`.
///
/// Assigned once at first upload and shared by every version of the object.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BaseIdentifier(String);

impl BaseIdentifier {
    /// Validate and wrap a base identifier.
    ///
    /// Rejects empty strings and strings containing [`VERSION_DELIMITER`].
    pub fn new(base: impl Into<String>) -> Result<Self> {
        let base = base.into();
        if base.is_empty() {
            return Err(TypeError::InvalidBase {
                base,
                reason: "must not be empty".into(),
            });
        }
        if base.contains(VERSION_DELIMITER) {
            return Err(TypeError::InvalidBase {
                base,
                reason: format!("must not contain {VERSION_DELIMITER:?}"),
            });
        }
        Ok(Self(base))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key prefix shared by every versioned key of this base.
    pub fn version_prefix(&self) -> String {
        format!("{}{VERSION_DELIMITER}", self.0)
    }
}

impl TryFrom<String> for BaseIdentifier {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<BaseIdentifier> for String {
    fn from(base: BaseIdentifier) -> Self {
        base.0
    }
}

impl AsRef<str> for BaseIdentifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseIdentifier({})", self.0)
    }
}

impl fmt::Display for BaseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
