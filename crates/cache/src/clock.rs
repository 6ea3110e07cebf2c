//! Wall-clock helpers shared by the envelope and the eviction registry

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, clamped to zero for pre-epoch times
#[inline]
pub fn epoch_millis(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .min(u128::from(u64::MAX)) as u64
}

#[inline]
pub fn now_millis() -> u64 {
    epoch_millis(SystemTime::now())
}

pub fn from_epoch_millis(ms: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_millis(ms)
}

/// Usage-time source that never hands out the same stamp twice.
///
/// Stamps track wall-clock milliseconds but are bumped past the last issued
/// value, so an entry touched twice within one millisecond still moves
/// forward in LRU order.
#[derive(Debug, Default)]
pub struct UsageClock {
    last: AtomicU64,
}

impl UsageClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stamp(&self) -> u64 {
        let wall = now_millis();
        let previous = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(wall.max(last.saturating_add(1)))
            })
            .unwrap_or_else(|last| last);
        wall.max(previous.saturating_add(1))
    }

    /// Make sure later stamps sort after `ms` (used for scanned mtimes)
    pub fn observe(&self, ms: u64) {
        self.last.fetch_max(ms, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamps_strictly_increase() {
        let clock = UsageClock::new();
        let mut previous = clock.stamp();
        for _ in 0..10_000 {
            let next = clock.stamp();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn test_stamps_follow_wall_clock() {
        let clock = UsageClock::new();
        let before = now_millis();
        assert!(clock.stamp() >= before);
    }

    #[test]
    fn test_observe_pushes_future_stamps_past_value() {
        let clock = UsageClock::new();
        let far = now_millis() + 60_000;
        clock.observe(far);
        assert!(clock.stamp() > far);
    }

    #[test]
    fn test_millis_round_trip() {
        let ms = 1_700_000_000_123;
        assert_eq!(epoch_millis(from_epoch_millis(ms)), ms);
    }
}
