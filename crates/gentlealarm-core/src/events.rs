use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alarm::AlarmSound;

/// Every state change in the system produces an Event.
/// The front end polls for them; the CLI prints them as JSON lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// An alarm was armed: the keep-alive session holds the process
    /// schedulable until `fire_at`, redundant with the OS notification.
    AlarmArmed {
        alarm_id: Uuid,
        fire_at: NaiveDateTime,
        at: DateTime<Utc>,
    },
    /// The alarm is ringing and the fade ramp has begun.
    AlarmFired {
        alarm_id: Uuid,
        sound: AlarmSound,
        fade_in_min: u32,
        at: DateTime<Utc>,
    },
    /// The fade reached full volume and latched.
    FadeCompleted {
        alarm_id: Uuid,
        at: DateTime<Utc>,
    },
    /// The failsafe deadline expired; the loud backup tone is playing.
    FailsafeTriggered {
        alarm_id: Uuid,
        at: DateTime<Utc>,
    },
    AlarmSnoozed {
        alarm_id: Uuid,
        until: DateTime<Utc>,
        at: DateTime<Utc>,
    },
    AlarmDismissed {
        alarm_id: Uuid,
        /// True when a repeating alarm was immediately re-armed for its
        /// next occurrence.
        rearmed: bool,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        firing: bool,
        failsafe_active: bool,
        armed_alarm_id: Option<Uuid>,
        alarm_count: usize,
        at: DateTime<Utc>,
    },
}
