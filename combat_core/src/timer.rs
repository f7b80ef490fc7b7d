//! Ready-at clocks for cooldowns and the global cooldown

use crate::sim::Sim;
use crate::types::TimerId;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::time::Duration;

/// A monotonic ready-at timestamp
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    ready_at: Duration,
}

impl Timer {
    pub fn ready_at(&self) -> Duration {
        self.ready_at
    }

    pub fn is_ready(&self, now: Duration) -> bool {
        self.ready_at <= now
    }

    /// Time remaining until ready (zero if already ready)
    pub fn time_to_ready(&self, now: Duration) -> Duration {
        self.ready_at.saturating_sub(now)
    }

    pub fn set(&mut self, ready_at: Duration) {
        self.ready_at = ready_at;
    }

    pub fn reset(&mut self) {
        self.ready_at = Duration::ZERO;
    }
}

/// A timer together with the duration it is armed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cooldown {
    pub timer: TimerId,
    pub duration: Duration,
}

/// Signed millisecond offset applied to a duration
///
/// Offsets accumulate freely and are only clamped at zero when applied, so
/// adding and later removing a reduction larger than the base restores the
/// original value exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimeOffset(pub i64);

impl TimeOffset {
    pub const ZERO: TimeOffset = TimeOffset(0);

    pub fn from_millis(ms: i64) -> Self {
        TimeOffset(ms)
    }

    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Apply the offset to a base duration, clamping at zero
    pub fn apply(self, base: Duration) -> Duration {
        let ms = base.as_millis() as i64 + self.0;
        Duration::from_millis(ms.max(0) as u64)
    }
}

impl Add for TimeOffset {
    type Output = TimeOffset;
    fn add(self, rhs: TimeOffset) -> TimeOffset {
        TimeOffset(self.0 + rhs.0)
    }
}

impl Sub for TimeOffset {
    type Output = TimeOffset;
    fn sub(self, rhs: TimeOffset) -> TimeOffset {
        TimeOffset(self.0 - rhs.0)
    }
}

impl AddAssign for TimeOffset {
    fn add_assign(&mut self, rhs: TimeOffset) {
        self.0 += rhs.0;
    }
}

impl SubAssign for TimeOffset {
    fn sub_assign(&mut self, rhs: TimeOffset) {
        self.0 -= rhs.0;
    }
}

impl Neg for TimeOffset {
    type Output = TimeOffset;
    fn neg(self) -> TimeOffset {
        TimeOffset(-self.0)
    }
}

impl Sim {
    pub fn timer(&self, id: TimerId) -> &Timer {
        &self.units[id.unit.index()].timers[id.index as usize]
    }

    pub(crate) fn timer_mut(&mut self, id: TimerId) -> &mut Timer {
        &mut self.units[id.unit.index()].timers[id.index as usize]
    }

    pub fn is_cooldown_ready(&self, cooldown: &Cooldown) -> bool {
        self.timer(cooldown.timer).is_ready(self.now())
    }

    /// Arm a cooldown for its full duration starting now
    pub fn use_cooldown(&mut self, cooldown: &Cooldown) {
        let ready_at = self.now() + cooldown.duration;
        self.timer_mut(cooldown.timer).set(ready_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_ready() {
        let mut timer = Timer::default();
        assert!(timer.is_ready(Duration::ZERO));

        timer.set(Duration::from_secs(5));
        assert!(!timer.is_ready(Duration::from_secs(4)));
        assert!(timer.is_ready(Duration::from_secs(5)));
        assert_eq!(
            timer.time_to_ready(Duration::from_secs(3)),
            Duration::from_secs(2)
        );
        assert_eq!(timer.time_to_ready(Duration::from_secs(9)), Duration::ZERO);
    }

    #[test]
    fn test_offset_clamps_only_on_read() {
        let base = Duration::from_millis(1500);
        let mut offset = TimeOffset::ZERO;
        offset += TimeOffset::from_millis(-2000);
        assert_eq!(offset.apply(base), Duration::ZERO);

        offset -= TimeOffset::from_millis(-2000);
        assert_eq!(offset.apply(base), base);
    }

    #[test]
    fn test_offset_negation() {
        let offset = TimeOffset::from_millis(250);
        assert_eq!((offset + -offset), TimeOffset::ZERO);
    }
}
