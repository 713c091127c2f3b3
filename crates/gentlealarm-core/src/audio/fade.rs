//! Volume fade engine.
//!
//! Computes the ramp from silence to full volume as a function of elapsed
//! wall-clock time, not tick count, so the curve stays correct under
//! irregular tick delivery (variable timer latency, process suspension).
//! The caller ticks it -- recommended cadence 4 Hz -- and writes the
//! returned volume into the playback port.

use chrono::{DateTime, Utc};

/// Exponent for the volume curve: 1.0 = linear, higher = slower start,
/// faster finish. At 2.5, 10% elapsed is ~3% volume and 75% elapsed is
/// ~49% volume.
const VOLUME_CURVE_EXPONENT: f64 = 2.5;

/// Elapsed-time-driven volume ramp with a completion latch.
#[derive(Debug, Clone)]
pub struct FadeEngine {
    duration_secs: f64,
    target_volume: f32,
    started_at: Option<DateTime<Utc>>,
    completed: bool,
}

impl FadeEngine {
    pub fn new() -> Self {
        Self {
            duration_secs: 0.0,
            target_volume: 1.0,
            started_at: None,
            completed: false,
        }
    }

    /// Begin a fade over `duration_min` minutes, starting from silence.
    pub fn start(&mut self, duration_min: u32, now: DateTime<Utc>) {
        self.duration_secs = f64::from(duration_min) * 60.0;
        self.started_at = Some(now);
        self.completed = false;
    }

    /// Stop the fade and clear elapsed-time tracking.
    pub fn stop(&mut self) {
        self.started_at = None;
        self.completed = false;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    /// Whether the ramp reached target and latched there.
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn target_volume(&self) -> f32 {
        self.target_volume
    }

    /// Recompute the volume for `now`.
    ///
    /// Returns the volume to write into the playback port, or `None` when
    /// there is nothing to write (not running, or already latched at
    /// target). On the tick that completes the ramp the engine latches:
    /// the final target volume is returned once and later ticks return
    /// `None`, so no stale recomputation can undo the lock.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<f32> {
        if self.completed {
            return None;
        }
        let started_at = self.started_at?;

        let progress = self.progress_at(started_at, now);
        if progress >= 1.0 {
            self.completed = true;
            self.started_at = None;
            return Some(self.target_volume);
        }
        Some(Self::curve(progress) * self.target_volume)
    }

    fn progress_at(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        if self.duration_secs <= 0.0 {
            return 1.0;
        }
        let elapsed = (now - started_at).num_milliseconds() as f64 / 1000.0;
        (elapsed / self.duration_secs).clamp(0.0, 1.0)
    }

    /// The concave ramp: `p^2.5`, front-loaded silence, assertive finish.
    pub fn curve(progress: f64) -> f32 {
        progress.clamp(0.0, 1.0).powf(VOLUME_CURVE_EXPONENT) as f32
    }
}

impl Default for FadeEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 7, 0, 0).unwrap()
    }

    fn secs(s: i64) -> chrono::Duration {
        chrono::Duration::seconds(s)
    }

    #[test]
    fn curve_endpoints_and_midpoint() {
        assert_eq!(FadeEngine::curve(0.0), 0.0);
        assert_eq!(FadeEngine::curve(1.0), 1.0);
        // Strictly concave toward completion: well under half at halfway.
        assert!(FadeEngine::curve(0.5) < 0.5);
        assert!((FadeEngine::curve(0.5) - 0.177).abs() < 0.01);
    }

    #[test]
    fn curve_is_monotonic() {
        let mut prev = -1.0f32;
        for i in 0..=100 {
            let v = FadeEngine::curve(f64::from(i) / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn volume_tracks_elapsed_time_not_tick_count() {
        let mut fade = FadeEngine::new();
        fade.start(3, t0()); // 180 seconds

        // Many rapid ticks move nothing if no time passes.
        let v1 = fade.tick(t0() + secs(10)).unwrap();
        let v2 = fade.tick(t0() + secs(10)).unwrap();
        assert_eq!(v1, v2);

        // One late tick lands at the same place as many on-time ticks.
        let halfway = fade.tick(t0() + secs(90)).unwrap();
        assert!((halfway - 0.5f32.powf(2.5)).abs() < 1e-4);
    }

    #[test]
    fn three_minute_fade_scenario() {
        // Fired at 7:00:00, fade 3 min: at 7:01:30 volume is 0.5^2.5.
        let mut fade = FadeEngine::new();
        fade.start(3, t0());
        let v = fade.tick(t0() + secs(90)).unwrap();
        assert!((v - 0.176_776_7).abs() < 1e-4);
    }

    #[test]
    fn completion_latches_at_target() {
        let mut fade = FadeEngine::new();
        fade.start(1, t0());
        assert_eq!(fade.tick(t0() + secs(60)), Some(1.0));
        assert!(fade.is_completed());
        // Latched: no further writes.
        assert_eq!(fade.tick(t0() + secs(61)), None);
        assert_eq!(fade.tick(t0() + secs(3600)), None);
    }

    #[test]
    fn stop_resets_tracking() {
        let mut fade = FadeEngine::new();
        fade.start(3, t0());
        fade.tick(t0() + secs(30));
        fade.stop();
        assert!(!fade.is_running());
        assert!(!fade.is_completed());
        assert_eq!(fade.tick(t0() + secs(60)), None);
    }

    #[test]
    fn tick_before_start_is_silent() {
        let mut fade = FadeEngine::new();
        assert_eq!(fade.tick(t0()), None);
    }
}
