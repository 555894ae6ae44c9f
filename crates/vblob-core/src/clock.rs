use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use vblob_types::VersionStamp;

/// Source of wall-clock time for new versions.
pub trait Clock: Send + Sync {
    fn now(&self) -> VersionStamp;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> VersionStamp {
        VersionStamp::now()
    }
}

/// A clock that only moves when told to. Useful for deterministic stamps.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    pub fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> VersionStamp {
        VersionStamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// Issues strictly increasing version stamps.
///
/// Works like the physical half of a hybrid logical clock: each stamp is
/// `max(now, last + 1)`, so two versions written within the same millisecond
/// by one store still get distinct, correctly ordered keys. Stamps observed
/// from elsewhere (e.g. a migrated object's modification time) push the
/// high-water mark forward. Collisions between separate processes are not
/// prevented.
pub struct VersionClock {
    source: Arc<dyn Clock>,
    last: Mutex<Option<VersionStamp>>,
}

impl VersionClock {
    pub fn new(source: Arc<dyn Clock>) -> Self {
        Self {
            source,
            last: Mutex::new(None),
        }
    }

    /// Generate a stamp strictly greater than every stamp this clock has
    /// issued or observed.
    pub fn next(&self) -> VersionStamp {
        let now = self.source.now();
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let stamp = match *last {
            Some(prev) if now <= prev => prev.successor(),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }

    /// Record a stamp issued outside this clock.
    pub fn observe(&self, stamp: VersionStamp) {
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        if last.map_or(true, |prev| stamp > prev) {
            *last = Some(stamp);
        }
    }
}

impl Default for VersionClock {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for VersionClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let last = *self.last.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("VersionClock").field("last", &last).finish()
    }
}
