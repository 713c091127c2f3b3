//! Failsafe deadline.
//!
//! A one-shot timer armed alongside the primary fade. If the user has not
//! acknowledged the alarm by the deadline, the service escalates to the
//! loud fixed tone. Expiry is reported exactly once; cancelling any
//! running alarm disarms a pending deadline.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Default)]
pub struct FailsafeTimer {
    deadline: Option<DateTime<Utc>>,
}

impl FailsafeTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a deadline `minutes` from `now`, replacing any prior one.
    pub fn arm(&mut self, minutes: u32, now: DateTime<Utc>) {
        self.deadline = Some(now + Duration::minutes(i64::from(minutes)));
    }

    /// Disarm a pending deadline. Idempotent.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// True exactly once, on the first tick at or past the deadline.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 7, 0, 0).unwrap()
    }

    #[test]
    fn fires_exactly_once_at_deadline() {
        let mut timer = FailsafeTimer::new();
        timer.arm(5, t0());
        assert!(!timer.tick(t0() + Duration::minutes(4)));
        assert!(timer.tick(t0() + Duration::minutes(5)));
        assert!(!timer.tick(t0() + Duration::minutes(6)));
        assert!(!timer.is_armed());
    }

    #[test]
    fn cancel_disarms() {
        let mut timer = FailsafeTimer::new();
        timer.arm(5, t0());
        timer.cancel();
        assert!(!timer.tick(t0() + Duration::minutes(10)));
    }

    #[test]
    fn unarmed_never_fires() {
        let mut timer = FailsafeTimer::new();
        assert!(!timer.tick(t0() + Duration::days(1)));
    }
}
