//! The alarm manager: the orchestrating state machine.
//!
//! The manager is the single logical owner of all alarm state. It owns
//! the collection, the persistence handle, the audio service, and the
//! notification port; every timer-driven callback in the system arrives
//! here as an event returned from `tick`, never as a free-threaded
//! mutation.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Armed -> Firing -> (Armed via snooze)
//!                         -> Idle  (dismiss, one-time)
//!                         -> Armed (dismiss, repeating)
//! ```
//!
//! Arming is redundant by design: an OS notification is scheduled AND
//! the in-process keep-alive poll targets the same instant. Whichever
//! path reaches the firing transition first wins; the other is
//! suppressed by the session check in [`AlarmManager::fire`].

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::alarm::Alarm;
use crate::audio::{AudioEvent, AudioService, PlaybackPort, RingParams};
use crate::events::Event;
use crate::notify::{AlarmNotification, NotificationPayload, NotificationPort};
use crate::storage::Database;

/// Convert a wall-clock instant into the engine timeline.
///
/// During a DST fold the earlier mapping wins; a skipped wall-clock time
/// falls back to `latest`, so an instant is always produced.
pub fn local_instant(naive: NaiveDateTime) -> DateTime<Utc> {
    let mapped = Local
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| Local.from_local_datetime(&naive).latest());
    match mapped {
        Some(local) => local.with_timezone(&Utc),
        None => Utc::now(),
    }
}

fn wall_clock(now: DateTime<Utc>) -> NaiveDateTime {
    now.with_timezone(&Local).naive_local()
}

/// Coarse state of the manager, derived from its owned sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Armed,
    Firing,
}

/// "This alarm is currently ringing": a value copy of the alarm it was
/// derived from, so later edits or deletion of the collection entry
/// cannot reach into the ringing session.
#[derive(Debug, Clone)]
pub struct FiringSession {
    pub alarm: Alarm,
    pub started_at: DateTime<Utc>,
    pub epoch: u64,
}

pub struct AlarmManager<P: PlaybackPort, N: NotificationPort> {
    alarms: Vec<Alarm>,
    db: Database,
    audio: AudioService<P>,
    notifier: N,
    firing: Option<FiringSession>,
    armed_alarm_id: Option<Uuid>,
}

impl<P: PlaybackPort, N: NotificationPort> AlarmManager<P, N> {
    /// Construct the manager and load the saved collection. Load happens
    /// exactly once, here.
    pub fn new(playback: P, notifier: N, db: Database) -> Self {
        let alarms = db.load_alarms();
        Self {
            alarms,
            db,
            audio: AudioService::new(playback),
            notifier,
            firing: None,
            armed_alarm_id: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn firing_session(&self) -> Option<&FiringSession> {
        self.firing.as_ref()
    }

    pub fn is_failsafe_active(&self) -> bool {
        self.audio.is_failsafe_active()
    }

    pub fn armed_alarm_id(&self) -> Option<Uuid> {
        self.armed_alarm_id
    }

    /// Target instant of the armed keep-alive session, if any.
    pub fn armed_fire_at(&self) -> Option<DateTime<Utc>> {
        self.audio.pending_fire_at()
    }

    pub fn state(&self) -> ManagerState {
        if self.firing.is_some() {
            ManagerState::Firing
        } else if self.armed_alarm_id.is_some() {
            ManagerState::Armed
        } else {
            ManagerState::Idle
        }
    }

    /// The enabled alarm with the earliest computable fire date. Alarms
    /// whose scan produces nothing are excluded; ties keep collection
    /// order.
    pub fn next_alarm(&self, now: DateTime<Utc>) -> Option<(&Alarm, NaiveDateTime)> {
        let wall = wall_clock(now);
        self.alarms
            .iter()
            .filter(|a| a.enabled)
            .filter_map(|a| a.next_fire_date(wall).map(|fire| (a, fire)))
            .min_by_key(|(_, fire)| *fire)
    }

    /// Human phrasing for the next alarm: "in 12 minutes", "in 2 hours
    /// and 5 minutes", or "Monday at 7:00 AM" beyond a day out.
    pub fn next_alarm_description(&self, now: DateTime<Utc>) -> Option<String> {
        let (alarm, fire) = self.next_alarm(now)?;
        let seconds = (fire - wall_clock(now)).num_seconds().max(0);

        let text = if seconds < 60 {
            "in less than a minute".to_string()
        } else if seconds < 3600 {
            let minutes = seconds / 60;
            format!("in {} minute{}", minutes, plural(minutes))
        } else if seconds < 86_400 {
            let hours = seconds / 3600;
            let minutes = (seconds % 3600) / 60;
            if minutes == 0 {
                format!("in {} hour{}", hours, plural(hours))
            } else {
                format!(
                    "in {} hour{} and {} minute{}",
                    hours,
                    plural(hours),
                    minutes,
                    plural(minutes)
                )
            }
        } else {
            use chrono::Datelike;
            let day = crate::alarm::Weekday::from(fire.weekday());
            format!("{} at {}", day.name(), alarm.time_string())
        };
        Some(text)
    }

    // ── Collection operations ────────────────────────────────────────

    pub fn add_alarm(&mut self, alarm: Alarm, now: DateTime<Utc>) -> Vec<Event> {
        self.alarms.push(alarm.clone());
        self.persist();
        if alarm.enabled {
            self.arm(&alarm, now).into_iter().collect()
        } else {
            Vec::new()
        }
    }

    /// Whole-record replacement by id.
    pub fn update_alarm(&mut self, alarm: Alarm, now: DateTime<Utc>) -> Vec<Event> {
        let Some(slot) = self.alarms.iter_mut().find(|a| a.id == alarm.id) else {
            return Vec::new();
        };
        *slot = alarm.clone();
        self.persist();
        if alarm.enabled {
            self.arm(&alarm, now).into_iter().collect()
        } else {
            self.disarm(alarm.id);
            Vec::new()
        }
    }

    pub fn delete_alarm(&mut self, id: Uuid) {
        self.alarms.retain(|a| a.id != id);
        self.persist();
        self.disarm(id);
    }

    pub fn toggle_alarm(&mut self, id: Uuid, now: DateTime<Utc>) -> Vec<Event> {
        let Some(alarm) = self.alarms.iter_mut().find(|a| a.id == id) else {
            return Vec::new();
        };
        alarm.enabled = !alarm.enabled;
        let alarm = alarm.clone();
        self.persist();
        if alarm.enabled {
            self.arm(&alarm, now).into_iter().collect()
        } else {
            self.disarm(id);
            Vec::new()
        }
    }

    /// Re-issue scheduling for every enabled alarm, e.g. after a process
    /// relaunch. The keep-alive session targets the earliest of them.
    pub fn reschedule_all(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        for alarm in self.alarms.clone() {
            if alarm.enabled {
                self.schedule_notification(&alarm, now);
            }
        }
        if let Some((alarm, _)) = self.next_alarm(now) {
            let alarm = alarm.clone();
            self.arm(&alarm, now).into_iter().collect()
        } else {
            Vec::new()
        }
    }

    // ── Firing lifecycle ─────────────────────────────────────────────

    /// Transition to Firing from an externally delivered trigger.
    ///
    /// Safe to call on a cold start: when the payload's id matches a
    /// known alarm its live parameters win; otherwise a transient alarm
    /// is reconstructed from the payload alone. Calling it for an alarm
    /// that is already ringing is a no-op -- that is how the losing half
    /// of the redundant trigger paths is suppressed.
    pub fn fire(&mut self, payload: &NotificationPayload, now: DateTime<Utc>) -> Vec<Event> {
        if let Some(session) = &self.firing {
            if session.alarm.id == payload.alarm_id {
                debug!(alarm_id = %payload.alarm_id, "duplicate trigger suppressed");
                return Vec::new();
            }
        }

        let alarm = self
            .alarms
            .iter()
            .find(|a| a.id == payload.alarm_id)
            .cloned()
            .unwrap_or_else(|| synthesize_alarm(payload));

        let params = RingParams::from(&alarm);
        let epoch = self.audio.play_alarm(params, now);
        self.armed_alarm_id = None;
        info!(alarm_id = %alarm.id, label = %alarm.label, "alarm firing");

        let event = Event::AlarmFired {
            alarm_id: alarm.id,
            sound: alarm.sound,
            fade_in_min: alarm.fade_in_min,
            at: now,
        };
        self.firing = Some(FiringSession {
            alarm,
            started_at: now,
            epoch,
        });
        vec![event]
    }

    /// Stop ringing and re-arm for `now + snooze` using a snapshot of the
    /// firing alarm's parameters. Every timer of the old session is
    /// cancelled; a not-yet-fired failsafe deadline dies with it.
    pub fn snooze(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let Some(session) = self.firing.take() else {
            return Vec::new();
        };
        self.audio.stop_alarm();
        self.notifier.cancel(session.alarm.id);

        let until = now + chrono::Duration::minutes(i64::from(session.alarm.snooze_min));
        let params = RingParams::from(&session.alarm);
        self.audio.start_keep_alive(until, params, now);
        self.armed_alarm_id = Some(session.alarm.id);

        let notification = AlarmNotification {
            fire_at: wall_clock(until),
            label: session.alarm.label.clone(),
            payload: NotificationPayload::from(&session.alarm),
        };
        if let Err(err) = self.notifier.schedule(&notification) {
            warn!(%err, "snooze notification not scheduled, keep-alive path remains");
        }

        info!(alarm_id = %session.alarm.id, %until, "alarm snoozed");
        vec![Event::AlarmSnoozed {
            alarm_id: session.alarm.id,
            until,
            at: now,
        }]
    }

    /// Stop ringing. A one-time alarm self-disables; a repeating alarm is
    /// immediately re-armed for its true next occurrence.
    pub fn dismiss(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let Some(session) = self.firing.take() else {
            return Vec::new();
        };
        self.audio.stop_alarm();
        self.notifier.cancel(session.alarm.id);

        let mut events = Vec::new();
        let rearmed = if session.alarm.is_one_time() {
            if let Some(alarm) = self.alarms.iter_mut().find(|a| a.id == session.alarm.id) {
                alarm.enabled = false;
                self.persist();
            }
            false
        } else {
            events.extend(self.arm(&session.alarm, now));
            true
        };

        info!(alarm_id = %session.alarm.id, rearmed, "alarm dismissed");
        events.push(Event::AlarmDismissed {
            alarm_id: session.alarm.id,
            rearmed,
            at: now,
        });
        events
    }

    // ── Tick ─────────────────────────────────────────────────────────

    /// Advance the in-process timers and convert whatever they produced
    /// into manager transitions.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Event> {
        let Some(audio_event) = self.audio.tick(now) else {
            return Vec::new();
        };
        match audio_event {
            AudioEvent::Triggered { epoch, params, at } => {
                // The keep-alive path won; playback is already running.
                let alarm = self
                    .armed_alarm_id
                    .take()
                    .and_then(|id| self.alarms.iter().find(|a| a.id == id))
                    .cloned()
                    .unwrap_or_else(|| synthesize_alarm_from_params(&params));
                info!(alarm_id = %alarm.id, "alarm triggered by keep-alive poll");
                let event = Event::AlarmFired {
                    alarm_id: alarm.id,
                    sound: alarm.sound,
                    fade_in_min: alarm.fade_in_min,
                    at,
                };
                self.firing = Some(FiringSession {
                    alarm,
                    started_at: at,
                    epoch,
                });
                vec![event]
            }
            AudioEvent::FadeCompleted { epoch, at } => self
                .firing
                .as_ref()
                .filter(|s| s.epoch == epoch)
                .map(|s| {
                    vec![Event::FadeCompleted {
                        alarm_id: s.alarm.id,
                        at,
                    }]
                })
                .unwrap_or_default(),
            AudioEvent::FailsafeTriggered { epoch, at } => self
                .firing
                .as_ref()
                .filter(|s| s.epoch == epoch)
                .map(|s| {
                    vec![Event::FailsafeTriggered {
                        alarm_id: s.alarm.id,
                        at,
                    }]
                })
                .unwrap_or_default(),
        }
    }

    /// Reassert full volume after the fade has latched (or while the
    /// failsafe tone rings). The front end may call this periodically.
    pub fn ensure_max_volume(&mut self) {
        self.audio.ensure_max_volume();
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            firing: self.firing.is_some(),
            failsafe_active: self.audio.is_failsafe_active(),
            armed_alarm_id: self.armed_alarm_id,
            alarm_count: self.alarms.len(),
            at: now,
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Arm both redundant trigger paths for `alarm`.
    fn arm(&mut self, alarm: &Alarm, now: DateTime<Utc>) -> Option<Event> {
        let Some(fire) = alarm.next_fire_date(wall_clock(now)) else {
            // Unsatisfiable schedule: skip, don't disable, don't crash.
            debug!(alarm_id = %alarm.id, "no computable fire date, scheduling skipped");
            return None;
        };

        self.schedule_notification(alarm, now);

        let instant = local_instant(fire);
        self.audio
            .start_keep_alive(instant, RingParams::from(alarm), now);
        self.armed_alarm_id = Some(alarm.id);
        info!(alarm_id = %alarm.id, %fire, "alarm armed");

        Some(Event::AlarmArmed {
            alarm_id: alarm.id,
            fire_at: fire,
            at: now,
        })
    }

    fn disarm(&mut self, id: Uuid) {
        self.notifier.cancel(id);
        if self.armed_alarm_id == Some(id) {
            self.audio.stop_keep_alive();
            self.armed_alarm_id = None;
        }
    }

    /// Best-effort outbound scheduling request. Refusal (e.g. declined
    /// notification authorization) leaves the alarm enabled; the
    /// keep-alive path is the mitigation and is always attempted.
    fn schedule_notification(&mut self, alarm: &Alarm, now: DateTime<Utc>) {
        let Some(fire) = alarm.next_fire_date(wall_clock(now)) else {
            return;
        };
        self.notifier.cancel(alarm.id);
        let notification = AlarmNotification {
            fire_at: fire,
            label: alarm.label.clone(),
            payload: NotificationPayload::from(alarm),
        };
        if let Err(err) = self.notifier.schedule(&notification) {
            warn!(alarm_id = %alarm.id, %err, "notification not scheduled, keep-alive path remains");
        }
    }

    fn persist(&mut self) {
        if let Err(err) = self.db.save_alarms(&self.alarms) {
            warn!(%err, "failed to persist alarm collection");
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Reconstruct a transient alarm from a notification payload. Used when a
/// trigger arrives after a cold start and the collection has no matching
/// record.
fn synthesize_alarm(payload: &NotificationPayload) -> Alarm {
    let mut alarm = Alarm::new(0, 0);
    alarm.id = payload.alarm_id;
    alarm.sound = payload.sound;
    alarm.fade_in_min = payload.fade_in_min;
    alarm.snooze_min = payload.snooze_min;
    alarm.failsafe_enabled = payload.failsafe_enabled;
    alarm.failsafe_min = payload.failsafe_min;
    alarm
}

fn synthesize_alarm_from_params(params: &RingParams) -> Alarm {
    let mut alarm = Alarm::new(0, 0);
    alarm.sound = params.sound;
    alarm.fade_in_min = params.fade_in_min;
    alarm.failsafe_enabled = params.failsafe_enabled;
    alarm.failsafe_min = params.failsafe_min;
    alarm
}
