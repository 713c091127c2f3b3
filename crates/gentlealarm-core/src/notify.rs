//! The notification port: the seam between the engine and the platform's
//! alert-delivery subsystem.
//!
//! The platform guarantees "fire a local alert at a given wall-clock
//! time, invoke a handler with a payload". The payload carries everything
//! needed to ring correctly from a cold start, failsafe parameters
//! included, because the process that receives the alert may not have the
//! alarm collection in memory yet.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alarm::{Alarm, AlarmSound};
use crate::error::NotifyError;

/// The payload delivered back with a fired alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub alarm_id: Uuid,
    pub sound: AlarmSound,
    pub fade_in_min: u32,
    pub snooze_min: u32,
    pub failsafe_enabled: bool,
    pub failsafe_min: u32,
}

impl From<&Alarm> for NotificationPayload {
    fn from(alarm: &Alarm) -> Self {
        Self {
            alarm_id: alarm.id,
            sound: alarm.sound,
            fade_in_min: alarm.fade_in_min,
            snooze_min: alarm.snooze_min,
            failsafe_enabled: alarm.failsafe_enabled,
            failsafe_min: alarm.failsafe_min,
        }
    }
}

/// An outbound request to deliver an alert at `fire_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmNotification {
    pub fire_at: NaiveDateTime,
    pub label: String,
    pub payload: NotificationPayload,
}

/// Handle to the platform's alert scheduler.
pub trait NotificationPort {
    /// Schedule an alert, replacing any previously scheduled alert for
    /// the same alarm id.
    fn schedule(&mut self, notification: &AlarmNotification) -> Result<(), NotifyError>;

    /// Cancel any pending alert for `alarm_id`. Idempotent.
    fn cancel(&mut self, alarm_id: Uuid);
}
