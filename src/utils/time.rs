//! Wall-clock timestamps with an injectable source for tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of event and template timestamps
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;

    fn now_millis(&self) -> u64 {
        self.now_nanos() / 1_000_000
    }
}

/// Reads the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now_nanos(&self) -> u64 {
        current_timestamp_nanos()
    }
}

/// Manually driven clock for deterministic tests
#[derive(Debug, Default)]
pub struct MockTimeProvider {
    current_time: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
        }
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.current_time.load(Ordering::Relaxed)
    }
}

/// Nanoseconds since the Unix epoch; 0 if the clock is before it
pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock() {
        let clock = MockTimeProvider::new(1_000_000);
        assert_eq!(clock.now_nanos(), 1_000_000);
        clock.advance_by(2_000_000);
        assert_eq!(clock.now_millis(), 3);
        clock.set_time(5);
        assert_eq!(clock.now_nanos(), 5);
    }

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemTimeProvider.now_nanos() > 0);
    }
}
