//! The alarm record and its fire-date arithmetic.
//!
//! An [`Alarm`] is a plain data record. It is owned exclusively by the
//! manager's collection and mutated only by whole-record replacement.
//! `next_fire_date` takes the caller's `now` so the scan is a pure
//! function of its inputs.

use std::collections::BTreeSet;

use chrono::{Datelike, Days, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::sound::AlarmSound;

/// Day of week, Sunday = 1 through Saturday = 7.
///
/// Persisted as its small-integer value so the stored form is a set of
/// 1..=7 integers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "u8", try_from = "u8")]
pub enum Weekday {
    Sunday = 1,
    Monday = 2,
    Tuesday = 3,
    Wednesday = 4,
    Thursday = 5,
    Friday = 6,
    Saturday = 7,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sun",
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
        }
    }
}

impl From<Weekday> for u8 {
    fn from(day: Weekday) -> u8 {
        day as u8
    }
}

impl TryFrom<u8> for Weekday {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Weekday::ALL
            .into_iter()
            .find(|d| *d as u8 == value)
            .ok_or_else(|| format!("weekday out of range: {value}"))
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        // chrono counts 0..=6 from Sunday; we count 1..=7.
        Weekday::ALL[day.num_days_from_sunday() as usize]
    }
}

/// One alarm's configuration and scheduling rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Stable identity, unchanged across edits.
    pub id: Uuid,
    pub hour: u32,
    pub minute: u32,
    #[serde(default)]
    pub label: String,
    pub enabled: bool,
    #[serde(default)]
    pub sound: AlarmSound,
    /// Minutes over which volume ramps from 0 to 100%.
    pub fade_in_min: u32,
    pub snooze_min: u32,
    /// Empty set = one-shot; the alarm self-disables after firing.
    #[serde(default)]
    pub repeat_days: BTreeSet<Weekday>,
    #[serde(default)]
    pub failsafe_enabled: bool,
    /// Minutes of unacknowledged ringing before the failsafe tone.
    pub failsafe_min: u32,
}

impl Alarm {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            hour,
            minute,
            label: "Alarm".to_string(),
            enabled: true,
            sound: AlarmSound::default(),
            fade_in_min: 3,
            snooze_min: 5,
            repeat_days: BTreeSet::new(),
            failsafe_enabled: false,
            failsafe_min: 5,
        }
    }

    pub fn is_one_time(&self) -> bool {
        self.repeat_days.is_empty()
    }

    /// The earliest strictly-future instant this alarm should fire.
    ///
    /// One-time: today at the alarm's time-of-day if that is still ahead
    /// of `now`, otherwise the same time tomorrow. Repeating: scan day
    /// offsets 0..=7 and return the first day whose weekday is in
    /// `repeat_days` and whose time-of-day lands strictly after `now` --
    /// offset 0 wins over the same weekday next week. The comparison is
    /// strict, so an alarm whose time equals `now` rolls forward.
    ///
    /// Returns `None` when the scan produces no valid instant (e.g. a
    /// malformed weekday set). That is an edge case the caller skips
    /// over, not an error.
    pub fn next_fire_date(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        let today_at = now.date().and_hms_opt(self.hour, self.minute, 0)?;

        if self.repeat_days.is_empty() {
            if today_at > now {
                return Some(today_at);
            }
            return today_at.checked_add_days(Days::new(1));
        }

        // Inclusive 8-day scan: offset 7 covers "today's weekday, next
        // week" once today's occurrence has already passed.
        for offset in 0..=7u64 {
            let date = now.date().checked_add_days(Days::new(offset))?;
            if !self.repeat_days.contains(&Weekday::from(date.weekday())) {
                continue;
            }
            let candidate = date.and_hms_opt(self.hour, self.minute, 0)?;
            if candidate > now {
                return Some(candidate);
            }
        }
        None
    }

    /// "7:05 AM" style rendering for list output.
    pub fn time_string(&self) -> String {
        let (hour12, meridiem) = match self.hour {
            0 => (12, "AM"),
            1..=11 => (self.hour, "AM"),
            12 => (12, "PM"),
            _ => (self.hour - 12, "PM"),
        };
        format!("{}:{:02} {}", hour12, self.minute, meridiem)
    }

    /// Human description of the repeat rule.
    pub fn repeat_description(&self) -> String {
        let weekdays: BTreeSet<Weekday> = [
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
        ]
        .into();
        let weekend: BTreeSet<Weekday> = [Weekday::Saturday, Weekday::Sunday].into();

        if self.repeat_days.is_empty() {
            "One time".to_string()
        } else if self.repeat_days.len() == 7 {
            "Every day".to_string()
        } else if self.repeat_days == weekdays {
            "Weekdays".to_string()
        } else if self.repeat_days == weekend {
            "Weekends".to_string()
        } else {
            self.repeat_days
                .iter()
                .map(|d| d.short_name())
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}
