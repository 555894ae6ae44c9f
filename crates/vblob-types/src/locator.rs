//! External identifier form: `[<prefix>-]<scheme>://<key>`.
//!
//! Callers outside the storage layer never see raw keys; they hold locators
//! such as `tenant-vblob://r1/u1_v-0000000002000`. The prefix segment lets
//! several deployments share one identifier namespace.

use crate::error::{Result, TypeError};
use crate::version::VersionIdentifier;

/// Formats and recognises scheme-prefixed identifiers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
    lead: String,
}

impl Locator {
    pub fn new(scheme: &str, prefix: Option<&str>) -> Self {
        let lead = match prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}-{scheme}://"),
            _ => format!("{scheme}://"),
        };
        Self { lead }
    }

    /// The fixed leading text every handled identifier starts with.
    pub fn lead(&self) -> &str {
        &self.lead
    }

    /// Returns `true` if `value` belongs to this locator.
    pub fn handles(&self, value: &str) -> bool {
        value.starts_with(&self.lead)
    }

    pub fn format(&self, id: &VersionIdentifier) -> String {
        format!("{}{id}", self.lead)
    }

    /// Strip the lead and parse the remaining key.
    pub fn parse(&self, value: &str) -> Result<VersionIdentifier> {
        let key = value
            .strip_prefix(&self.lead)
            .ok_or_else(|| TypeError::InvalidLocator {
                value: value.to_string(),
                expected: self.lead.clone(),
            })?;
        VersionIdentifier::parse(key)
    }
}
