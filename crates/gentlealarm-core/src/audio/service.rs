//! Playback orchestration: keep-alive scheduling, the primary fade, and
//! failsafe escalation.
//!
//! `AudioService` owns the playback port and enforces the exclusivity
//! invariant: at any instant the device is held by exactly one of
//! {keep-alive, primary fade, failsafe}, and acquiring it for a new
//! purpose stops the previous holder. It has no internal threads -- the
//! caller ticks it and consumes the events it produces, so every timer
//! callback funnels through the single owning context.
//!
//! Each firing session carries an epoch. Events are tagged with it, and
//! a new session supersedes the old one, so a stale timer can never act
//! against a session that has been replaced.

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::alarm::{Alarm, AlarmSound};
use crate::audio::fade::FadeEngine;
use crate::audio::failsafe::FailsafeTimer;
use crate::audio::playback::{PlaybackPort, ToneSource};

/// Near-silent volume for the keep-alive stream.
const KEEP_ALIVE_VOLUME: f32 = 0.01;
/// Essentially inaudible volume for the fallback keep-alive loop.
const MINIMAL_VOLUME: f32 = 0.001;

/// Everything needed to ring: a value snapshot of the firing alarm's
/// audio parameters, independent of the live collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingParams {
    pub sound: AlarmSound,
    pub fade_in_min: u32,
    pub failsafe_enabled: bool,
    pub failsafe_min: u32,
}

impl From<&Alarm> for RingParams {
    fn from(alarm: &Alarm) -> Self {
        Self {
            sound: alarm.sound,
            fade_in_min: alarm.fade_in_min,
            failsafe_enabled: alarm.failsafe_enabled,
            failsafe_min: alarm.failsafe_min,
        }
    }
}

/// The keep-alive loop's working state. At most one exists; starting a
/// new one supersedes any prior instance.
#[derive(Debug, Clone, Copy)]
struct PendingAlarm {
    fire_at: DateTime<Utc>,
    params: RingParams,
}

/// Who holds the playback device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeviceHolder {
    Idle,
    KeepAlive,
    Primary,
    Failsafe,
}

/// Produced by [`AudioService::tick`]; consumed by the manager.
#[derive(Debug, Clone, Copy)]
pub enum AudioEvent {
    /// The keep-alive poll reached its target instant and the primary
    /// alarm playback has begun.
    Triggered {
        epoch: u64,
        params: RingParams,
        at: DateTime<Utc>,
    },
    /// The fade ramp reached target volume and latched.
    FadeCompleted { epoch: u64, at: DateTime<Utc> },
    /// The failsafe deadline expired and the loud tone is playing.
    FailsafeTriggered { epoch: u64, at: DateTime<Utc> },
}

pub struct AudioService<P: PlaybackPort> {
    port: P,
    holder: DeviceHolder,
    fade: FadeEngine,
    failsafe: FailsafeTimer,
    failsafe_active: bool,
    pending: Option<PendingAlarm>,
    epoch: u64,
}

impl<P: PlaybackPort> AudioService<P> {
    pub fn new(port: P) -> Self {
        Self {
            port,
            holder: DeviceHolder::Idle,
            fade: FadeEngine::new(),
            failsafe: FailsafeTimer::new(),
            failsafe_active: false,
            pending: None,
            epoch: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_firing(&self) -> bool {
        matches!(self.holder, DeviceHolder::Primary | DeviceHolder::Failsafe)
    }

    pub fn is_failsafe_active(&self) -> bool {
        self.failsafe_active
    }

    pub fn is_keep_alive_active(&self) -> bool {
        self.holder == DeviceHolder::KeepAlive
    }

    /// Target instant of the pending keep-alive session, if any.
    pub fn pending_fire_at(&self) -> Option<DateTime<Utc>> {
        self.pending.map(|p| p.fire_at)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start ringing: looping playback from silence, fade ramp, and the
    /// failsafe deadline when enabled. Supersedes any current holder of
    /// the device, including a pending keep-alive session.
    pub fn play_alarm(&mut self, params: RingParams, now: DateTime<Utc>) -> u64 {
        self.stop();
        self.epoch += 1;

        self.acquire(ToneSource::Asset(params.sound), 0.0, DeviceHolder::Primary);
        self.fade.start(params.fade_in_min, now);
        if params.failsafe_enabled {
            self.failsafe.arm(params.failsafe_min, now);
        }
        self.epoch
    }

    /// Stop ringing: cancels the fade, any pending failsafe deadline,
    /// and the playback stream. Idempotent.
    pub fn stop_alarm(&mut self) {
        self.fade.stop();
        self.failsafe.cancel();
        self.failsafe_active = false;
        if self.is_firing() {
            self.port.stop();
            self.holder = DeviceHolder::Idle;
        }
    }

    /// Arm the in-process trigger path: hold a near-silent stream open
    /// and poll `fire_at` from [`tick`]. A prior pending session is
    /// silently superseded.
    ///
    /// [`tick`]: AudioService::tick
    pub fn start_keep_alive(
        &mut self,
        fire_at: DateTime<Utc>,
        params: RingParams,
        _now: DateTime<Utc>,
    ) -> u64 {
        self.stop();
        self.epoch += 1;
        self.pending = Some(PendingAlarm { fire_at, params });

        // Session liveness beats silence fidelity: if the chosen tone
        // cannot load, loop any tone that can, as quietly as possible.
        if self
            .port
            .play(ToneSource::Asset(params.sound), KEEP_ALIVE_VOLUME, true)
            .is_err()
        {
            self.play_minimal_keep_alive();
        }
        self.holder = DeviceHolder::KeepAlive;
        self.epoch
    }

    /// Tear down the keep-alive session. Idempotent.
    pub fn stop_keep_alive(&mut self) {
        self.pending = None;
        if self.holder == DeviceHolder::KeepAlive {
            self.port.stop();
            self.holder = DeviceHolder::Idle;
        }
    }

    /// Move the armed deadline without restarting the keep-alive stream,
    /// so a snooze reschedule produces no audio glitch.
    pub fn update_target(&mut self, fire_at: DateTime<Utc>) {
        if let Some(pending) = &mut self.pending {
            pending.fire_at = fire_at;
        }
    }

    /// Full teardown of whatever is running.
    pub fn stop(&mut self) {
        self.stop_alarm();
        self.stop_keep_alive();
    }

    /// Reassert target volume after the ramp has latched (or while the
    /// failsafe tone rings). External volume writes cannot undo the lock.
    pub fn ensure_max_volume(&mut self) {
        if (self.fade.is_completed() || self.failsafe_active) && self.port.is_playing() {
            self.port.set_volume(self.fade.target_volume());
        }
    }

    // ── Tick ─────────────────────────────────────────────────────────

    /// Advance all in-process timers to `now`.
    ///
    /// Recommended cadence: 1 Hz covers the keep-alive poll; 4 Hz keeps
    /// the fade smooth. Ordering: the keep-alive trigger runs first
    /// (exactly once per armed session), then the failsafe deadline --
    /// which always preempts an in-flight fade, never the reverse --
    /// then the fade recompute.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<AudioEvent> {
        if self.pending.is_some_and(|p| now >= p.fire_at) {
            let pending = self.pending.take().expect("pending checked above");
            let epoch = self.play_alarm(pending.params, now);
            return Some(AudioEvent::Triggered {
                epoch,
                params: pending.params,
                at: now,
            });
        }

        if self.failsafe.tick(now) {
            self.trigger_failsafe();
            return Some(AudioEvent::FailsafeTriggered {
                epoch: self.epoch,
                at: now,
            });
        }

        if self.holder == DeviceHolder::Primary && self.fade.is_running() {
            if let Some(volume) = self.fade.tick(now) {
                self.port.set_volume(volume);
                if self.fade.is_completed() {
                    return Some(AudioEvent::FadeCompleted {
                        epoch: self.epoch,
                        at: now,
                    });
                }
            }
        }

        None
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn trigger_failsafe(&mut self) {
        // The fade is cancelled permanently for this session; the loud
        // tone is never ramped.
        self.fade.stop();
        self.failsafe_active = true;
        self.port.stop();
        self.acquire(
            ToneSource::Asset(AlarmSound::ClockAlarm),
            1.0,
            DeviceHolder::Failsafe,
        );
    }

    /// Play `source` looping, falling back to the built-in system tone if
    /// the asset is missing. The fallback still honors the fade and
    /// failsafe contracts: volume stays software-controlled.
    fn acquire(&mut self, source: ToneSource, volume: f32, holder: DeviceHolder) {
        if let Err(err) = self.port.play(source, volume, true) {
            warn!(%err, "sound asset unavailable, falling back to system tone");
            if let Err(err) = self.port.play(ToneSource::SystemDefault, volume, true) {
                warn!(%err, "system tone unavailable, playback degraded");
            }
        }
        self.holder = holder;
    }

    fn play_minimal_keep_alive(&mut self) {
        for sound in AlarmSound::ALL {
            if self
                .port
                .play(ToneSource::Asset(sound), MINIMAL_VOLUME, true)
                .is_ok()
            {
                return;
            }
        }
        if let Err(err) = self.port.play(ToneSource::SystemDefault, MINIMAL_VOLUME, true) {
            warn!(%err, "keep-alive playback unavailable");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlaybackError;
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    /// Records every port call; can be told which assets are missing.
    struct FakePlayback {
        playing: Option<(ToneSource, bool)>,
        volume: f32,
        missing: HashSet<AlarmSound>,
        plays: Vec<(ToneSource, f32, bool)>,
        stops: usize,
    }

    impl FakePlayback {
        fn new() -> Self {
            Self {
                playing: None,
                volume: 0.0,
                missing: HashSet::new(),
                plays: Vec::new(),
                stops: 0,
            }
        }
    }

    impl PlaybackPort for FakePlayback {
        fn play(
            &mut self,
            source: ToneSource,
            volume: f32,
            looping: bool,
        ) -> Result<(), PlaybackError> {
            if let ToneSource::Asset(sound) = source {
                if self.missing.contains(&sound) {
                    return Err(PlaybackError::SoundUnavailable(
                        sound.asset_id().to_string(),
                    ));
                }
            }
            self.plays.push((source, volume, looping));
            self.playing = Some((source, looping));
            self.volume = volume;
            Ok(())
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn stop(&mut self) {
            self.playing = None;
            self.stops += 1;
        }

        fn is_playing(&self) -> bool {
            self.playing.is_some()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, 7, 0, 0).unwrap()
    }

    fn params() -> RingParams {
        RingParams {
            sound: AlarmSound::MorningBirds,
            fade_in_min: 3,
            failsafe_enabled: false,
            failsafe_min: 5,
        }
    }

    #[test]
    fn keep_alive_triggers_exactly_once_at_target() {
        let mut svc = AudioService::new(FakePlayback::new());
        svc.start_keep_alive(t0(), params(), t0() - Duration::minutes(30));
        assert!(svc.is_keep_alive_active());

        assert!(svc.tick(t0() - Duration::seconds(1)).is_none());
        let event = svc.tick(t0()).unwrap();
        assert!(matches!(event, AudioEvent::Triggered { .. }));
        assert!(svc.is_firing());
        assert!(svc.pending_fire_at().is_none());

        // Trigger consumed: later ticks only drive the fade.
        for i in 1..10 {
            let next = svc.tick(t0() + Duration::seconds(i));
            assert!(next.is_none());
        }
    }

    #[test]
    fn new_keep_alive_supersedes_prior() {
        let mut svc = AudioService::new(FakePlayback::new());
        let first = svc.start_keep_alive(t0(), params(), t0() - Duration::hours(1));
        let second = svc.start_keep_alive(
            t0() + Duration::hours(2),
            params(),
            t0() - Duration::hours(1),
        );
        assert!(second > first);
        // The old target must not fire.
        assert!(svc.tick(t0()).is_none());
        assert_eq!(svc.pending_fire_at(), Some(t0() + Duration::hours(2)));
    }

    #[test]
    fn keep_alive_stream_is_near_silent() {
        let mut svc = AudioService::new(FakePlayback::new());
        svc.start_keep_alive(t0(), params(), t0() - Duration::hours(1));
        let (_, volume, looping) = svc.port().plays[0];
        assert!(volume <= KEEP_ALIVE_VOLUME);
        assert!(looping);
    }

    #[test]
    fn keep_alive_falls_back_to_any_available_tone() {
        let mut port = FakePlayback::new();
        port.missing.insert(AlarmSound::MorningBirds);
        let mut svc = AudioService::new(port);
        svc.start_keep_alive(t0(), params(), t0() - Duration::hours(1));
        // Still holding the device despite the missing asset.
        assert!(svc.is_keep_alive_active());
        assert!(svc.port().is_playing());
    }

    #[test]
    fn update_target_does_not_restart_playback() {
        let mut svc = AudioService::new(FakePlayback::new());
        svc.start_keep_alive(t0(), params(), t0() - Duration::hours(1));
        let plays_before = svc.port().plays.len();
        svc.update_target(t0() + Duration::minutes(5));
        assert_eq!(svc.port().plays.len(), plays_before);
        assert_eq!(svc.pending_fire_at(), Some(t0() + Duration::minutes(5)));
    }

    #[test]
    fn stop_keep_alive_is_idempotent() {
        let mut svc = AudioService::new(FakePlayback::new());
        svc.stop_keep_alive();
        svc.start_keep_alive(t0(), params(), t0() - Duration::hours(1));
        svc.stop_keep_alive();
        svc.stop_keep_alive();
        assert!(!svc.is_keep_alive_active());
        assert!(svc.pending_fire_at().is_none());
        assert!(svc.tick(t0() + Duration::hours(1)).is_none());
    }

    #[test]
    fn alarm_starts_silent_and_fades_up() {
        let mut svc = AudioService::new(FakePlayback::new());
        svc.play_alarm(params(), t0());
        assert_eq!(svc.port().volume, 0.0);

        svc.tick(t0() + Duration::seconds(90)); // halfway through 3 min
        let halfway = svc.port().volume;
        assert!((halfway - 0.5f32.powf(2.5)).abs() < 1e-4);

        let done = svc.tick(t0() + Duration::seconds(180)).unwrap();
        assert!(matches!(done, AudioEvent::FadeCompleted { .. }));
        assert_eq!(svc.port().volume, 1.0);
    }

    #[test]
    fn failsafe_preempts_in_flight_fade() {
        // Fired at 7:00, fade 3 min, failsafe 2 min: at 7:02 the fade is
        // preempted and volume jumps to 1.0 immediately.
        let mut svc = AudioService::new(FakePlayback::new());
        svc.play_alarm(
            RingParams {
                failsafe_enabled: true,
                failsafe_min: 2,
                ..params()
            },
            t0(),
        );
        svc.tick(t0() + Duration::seconds(60));
        assert!(svc.port().volume < 0.2);

        let event = svc.tick(t0() + Duration::minutes(2)).unwrap();
        assert!(matches!(event, AudioEvent::FailsafeTriggered { .. }));
        assert!(svc.is_failsafe_active());
        assert_eq!(svc.port().volume, 1.0);
        let (source, volume, _) = *svc.port().plays.last().unwrap();
        assert_eq!(source, ToneSource::Asset(AlarmSound::ClockAlarm));
        assert_eq!(volume, 1.0);

        // Fade recomputation has stopped permanently for this session.
        let volume_after = svc.port().volume;
        assert!(svc.tick(t0() + Duration::minutes(3)).is_none());
        assert_eq!(svc.port().volume, volume_after);
    }

    #[test]
    fn stop_alarm_cancels_pending_failsafe() {
        let mut svc = AudioService::new(FakePlayback::new());
        svc.play_alarm(
            RingParams {
                failsafe_enabled: true,
                failsafe_min: 2,
                ..params()
            },
            t0(),
        );
        svc.stop_alarm();
        assert!(!svc.is_failsafe_active());
        // The deadline must not fire after the alarm was stopped.
        assert!(svc.tick(t0() + Duration::minutes(5)).is_none());
    }

    #[test]
    fn missing_asset_falls_back_to_system_tone() {
        let mut port = FakePlayback::new();
        port.missing.insert(AlarmSound::MorningBirds);
        let mut svc = AudioService::new(port);
        svc.play_alarm(params(), t0());
        let (source, _, _) = *svc.port().plays.last().unwrap();
        assert_eq!(source, ToneSource::SystemDefault);
        // Fade still runs against the fallback tone.
        svc.tick(t0() + Duration::seconds(90));
        assert!(svc.port().volume > 0.0);
    }

    #[test]
    fn play_alarm_supersedes_pending_keep_alive() {
        let mut svc = AudioService::new(FakePlayback::new());
        svc.start_keep_alive(t0() + Duration::minutes(10), params(), t0());
        // Notification path wins the race; the poll target must die.
        svc.play_alarm(params(), t0() + Duration::minutes(9));
        assert!(svc.pending_fire_at().is_none());
        assert!(svc.tick(t0() + Duration::minutes(10)).is_none());
    }

    #[test]
    fn epoch_advances_per_session() {
        let mut svc = AudioService::new(FakePlayback::new());
        let a = svc.play_alarm(params(), t0());
        let b = svc.play_alarm(params(), t0() + Duration::minutes(1));
        assert!(b > a);
    }

    #[test]
    fn ensure_max_volume_only_after_latch() {
        let mut svc = AudioService::new(FakePlayback::new());
        svc.play_alarm(params(), t0());
        svc.tick(t0() + Duration::seconds(90));
        let mid = svc.port().volume;
        svc.ensure_max_volume(); // fade not latched: no-op
        assert_eq!(svc.port().volume, mid);

        svc.tick(t0() + Duration::seconds(180));
        svc.port.set_volume(0.3); // external write after latch
        svc.ensure_max_volume();
        assert_eq!(svc.port().volume, 1.0);
    }
}
