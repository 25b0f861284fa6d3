//! Provenance timestamps for cache entries

use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the timestamp stamped onto each stored record
///
/// The value is provenance only; nothing in the cache orders or expires
/// entries by it.
pub trait TimeProvider: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn current_time(&self) -> i64;
}

/// Wall-clock provider
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn current_time(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Provider pinned to one timestamp
///
/// Build orchestrators sample the clock once at build start so every entry
/// written during that build carries the same stamp; tests use it for
/// deterministic records.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeProvider {
    timestamp: i64,
}

impl FixedTimeProvider {
    pub fn new(timestamp: i64) -> Self {
        Self { timestamp }
    }

    /// Pin to the wall clock as of this call
    pub fn from_now() -> Self {
        Self::new(SystemTimeProvider.current_time())
    }
}

impl TimeProvider for FixedTimeProvider {
    fn current_time(&self) -> i64 {
        self.timestamp
    }
}
