use std::collections::BTreeSet;

use chrono::{Local, Utc};
use clap::Subcommand;
use gentlealarm_core::{Alarm, AlarmSound, Config, Database, Weekday};
use serde_json::json;
use uuid::Uuid;

use crate::ports::{JsonPlayback, LogNotifier};

#[derive(Subcommand)]
pub enum AlarmAction {
    /// Create an alarm
    Add {
        /// Time of day, HH:MM (24-hour)
        time: String,
        #[arg(long, default_value = "Alarm")]
        label: String,
        /// Tone asset id (see `sounds`)
        #[arg(long)]
        sound: Option<String>,
        /// Fade-in duration in minutes (1-10)
        #[arg(long)]
        fade: Option<u32>,
        /// Snooze duration in minutes
        #[arg(long)]
        snooze: Option<u32>,
        /// Repeat days: comma-separated (mon,tue,...), or "weekdays",
        /// "weekends", "daily". Omit for a one-time alarm.
        #[arg(long)]
        repeat: Option<String>,
        /// Enable the loud failsafe tone
        #[arg(long)]
        failsafe: bool,
        /// Minutes of unacknowledged ringing before the failsafe
        #[arg(long)]
        failsafe_min: Option<u32>,
        /// Create disabled
        #[arg(long)]
        disabled: bool,
    },
    /// List all alarms
    List,
    /// Delete an alarm by id
    Remove { id: Uuid },
    /// Flip an alarm's enabled flag
    Toggle { id: Uuid },
    /// Show the next alarm due to fire
    Next,
}

pub fn run(action: AlarmAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let mut alarms = db.load_alarms();

    match action {
        AlarmAction::Add {
            time,
            label,
            sound,
            fade,
            snooze,
            repeat,
            failsafe,
            failsafe_min,
            disabled,
        } => {
            let (hour, minute) = parse_time(&time)?;
            let defaults = Config::load().defaults;

            let mut alarm = Alarm::new(hour, minute);
            alarm.label = label;
            alarm.enabled = !disabled;
            alarm.sound = match sound {
                Some(id) => parse_sound(&id)?,
                None => defaults.sound,
            };
            alarm.fade_in_min = fade.unwrap_or(defaults.fade_in_min).clamp(1, 10);
            alarm.snooze_min = snooze.unwrap_or(defaults.snooze_min);
            alarm.failsafe_enabled = failsafe || defaults.failsafe_enabled;
            alarm.failsafe_min = failsafe_min.unwrap_or(defaults.failsafe_min);
            if let Some(spec) = repeat {
                alarm.repeat_days = parse_repeat(&spec)?;
            }

            alarms.push(alarm.clone());
            db.save_alarms(&alarms)?;
            println!("{}", serde_json::to_string_pretty(&alarm)?);
        }
        AlarmAction::List => {
            let now = Local::now().naive_local();
            let rows: Vec<serde_json::Value> = alarms
                .iter()
                .map(|a| {
                    json!({
                        "id": a.id,
                        "time": a.time_string(),
                        "label": a.label,
                        "enabled": a.enabled,
                        "sound": a.sound.asset_id(),
                        "repeat": a.repeat_description(),
                        "next_fire": a.next_fire_date(now),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        AlarmAction::Remove { id } => {
            let before = alarms.len();
            alarms.retain(|a| a.id != id);
            if alarms.len() == before {
                return Err(format!("no alarm with id {id}").into());
            }
            db.save_alarms(&alarms)?;
            println!("{}", json!({ "removed": id }));
        }
        AlarmAction::Toggle { id } => {
            let alarm = alarms
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| format!("no alarm with id {id}"))?;
            alarm.enabled = !alarm.enabled;
            let enabled = alarm.enabled;
            db.save_alarms(&alarms)?;
            println!("{}", json!({ "id": id, "enabled": enabled }));
        }
        AlarmAction::Next => {
            // Borrow the manager's selection logic so the CLI agrees
            // with the running engine about what fires next.
            let mgr = gentlealarm_core::AlarmManager::new(JsonPlayback::new(), LogNotifier, db);
            let now = Utc::now();
            match mgr.next_alarm(now) {
                Some((alarm, fire)) => println!(
                    "{}",
                    json!({
                        "id": alarm.id,
                        "label": alarm.label,
                        "fire_at": fire,
                        "when": mgr.next_alarm_description(now),
                    })
                ),
                None => println!("{}", json!({ "next": null })),
            }
        }
    }
    Ok(())
}

fn parse_time(s: &str) -> Result<(u32, u32), String> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| format!("invalid time '{s}', expected HH:MM"))?;
    let hour: u32 = h.parse().map_err(|_| format!("invalid hour '{h}'"))?;
    let minute: u32 = m.parse().map_err(|_| format!("invalid minute '{m}'"))?;
    if hour > 23 || minute > 59 {
        return Err(format!("time out of range: {s}"));
    }
    Ok((hour, minute))
}

fn parse_sound(id: &str) -> Result<AlarmSound, String> {
    let sound = AlarmSound::from_asset_id(id).ok_or_else(|| format!("unknown sound '{id}'"))?;
    if sound.is_failsafe_only() {
        return Err(format!("'{id}' is reserved for the failsafe"));
    }
    Ok(sound)
}

fn parse_repeat(spec: &str) -> Result<BTreeSet<Weekday>, String> {
    match spec {
        "daily" => return Ok(Weekday::ALL.into()),
        "weekdays" => {
            return Ok([
                Weekday::Monday,
                Weekday::Tuesday,
                Weekday::Wednesday,
                Weekday::Thursday,
                Weekday::Friday,
            ]
            .into())
        }
        "weekends" => return Ok([Weekday::Saturday, Weekday::Sunday].into()),
        _ => {}
    }
    spec.split(',')
        .map(|day| match day.trim().to_lowercase().as_str() {
            "sun" | "sunday" => Ok(Weekday::Sunday),
            "mon" | "monday" => Ok(Weekday::Monday),
            "tue" | "tuesday" => Ok(Weekday::Tuesday),
            "wed" | "wednesday" => Ok(Weekday::Wednesday),
            "thu" | "thursday" => Ok(Weekday::Thursday),
            "fri" | "friday" => Ok(Weekday::Friday),
            "sat" | "saturday" => Ok(Weekday::Saturday),
            other => Err(format!("unknown weekday '{other}'")),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_times() {
        assert_eq!(parse_time("7:30").unwrap(), (7, 30));
        assert_eq!(parse_time("00:00").unwrap(), (0, 0));
        assert!(parse_time("24:00").is_err());
        assert!(parse_time("730").is_err());
    }

    #[test]
    fn parses_repeat_shorthands() {
        assert_eq!(parse_repeat("daily").unwrap().len(), 7);
        assert_eq!(parse_repeat("weekdays").unwrap().len(), 5);
        assert_eq!(parse_repeat("weekends").unwrap().len(), 2);
        let set = parse_repeat("mon, wed,fri").unwrap();
        assert_eq!(
            set,
            [Weekday::Monday, Weekday::Wednesday, Weekday::Friday].into()
        );
        assert!(parse_repeat("blursday").is_err());
    }

    #[test]
    fn failsafe_tone_is_not_selectable() {
        assert!(parse_sound("clock-alarm").is_err());
        assert!(parse_sound("ocean-waves").is_ok());
    }
}
