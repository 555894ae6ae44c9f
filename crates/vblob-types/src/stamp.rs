use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Number of digits in the text form of a stamp.
///
/// Epoch milliseconds stay at 13 digits until the year 2286; zero-padding to
/// this width keeps lexicographic order equal to numeric order for older
/// values too. Small stamps therefore appear padded in keys: t=1000 is
/// written `0000000001000`, never `1000`.
pub const STAMP_WIDTH: usize = 13;

/// Wall-clock milliseconds since the UNIX epoch identifying one version.
///
/// Ordering is numeric. The `Display` form is zero-padded to
/// [`STAMP_WIDTH`] digits so keys sort chronologically as plain strings.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionStamp(u64);

impl VersionStamp {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Stamp for the current wall-clock time.
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self(millis)
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    /// The smallest stamp strictly after this one.
    pub fn successor(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Parse the text form. Only the exact `Display` rendering is accepted,
    /// so a parsed stamp always formats back to the same text. Unpadded
    /// tokens such as `"1000"` are rejected.
    pub fn parse(text: &str) -> Option<Self> {
        if text.len() < STAMP_WIDTH || !text.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let stamp = Self(text.parse().ok()?);
        (stamp.to_string() == text).then_some(stamp)
    }
}

impl fmt::Debug for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionStamp({}ms)", self.0)
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = STAMP_WIDTH)
    }
}

impl From<u64> for VersionStamp {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}
