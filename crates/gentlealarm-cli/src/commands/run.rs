//! The foreground engine loop.
//!
//! Loads the saved collection, arms the next enabled alarm through both
//! trigger paths, then ticks the manager on an interval and prints every
//! event as a JSON line. Stdin accepts the two user actions a ringing
//! alarm exposes -- `snooze` and `dismiss` -- plus `fire <id>` to
//! simulate an externally delivered notification trigger, and `quit`.

use chrono::Utc;
use gentlealarm_core::{AlarmManager, Config, Database, Event, NotificationPayload};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::ports::{JsonPlayback, LogNotifier};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run_loop())
}

async fn run_loop() -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let config = Config::load();
    let mut mgr = AlarmManager::new(JsonPlayback::new(), LogNotifier, db);

    emit_all(mgr.reschedule_all(Utc::now()));
    print_event(&mgr.snapshot(Utc::now()));

    let mut ticker =
        tokio::time::interval(std::time::Duration::from_millis(config.keep_alive.poll_interval_ms));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                emit_all(mgr.tick(Utc::now()));
                mgr.ensure_max_volume();
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_action(line.trim()) {
                    Some(Action::Snooze) => emit_all(mgr.snooze(Utc::now())),
                    Some(Action::Dismiss) => emit_all(mgr.dismiss(Utc::now())),
                    Some(Action::Fire(id)) => {
                        let Some(payload) = mgr
                            .alarms()
                            .iter()
                            .find(|a| a.id == id)
                            .map(NotificationPayload::from)
                        else {
                            eprintln!("no alarm with id {id}");
                            continue;
                        };
                        emit_all(mgr.fire(&payload, Utc::now()));
                    }
                    Some(Action::Status) => print_event(&mgr.snapshot(Utc::now())),
                    Some(Action::Quit) => break,
                    None => eprintln!("unknown command: {line}"),
                }
            }
        }
    }
    Ok(())
}

enum Action {
    Snooze,
    Dismiss,
    Fire(Uuid),
    Status,
    Quit,
}

fn parse_action(line: &str) -> Option<Action> {
    match line {
        "snooze" => Some(Action::Snooze),
        "dismiss" => Some(Action::Dismiss),
        "status" => Some(Action::Status),
        "quit" | "exit" => Some(Action::Quit),
        _ => {
            let id = line.strip_prefix("fire ")?.trim();
            id.parse().ok().map(Action::Fire)
        }
    }
}

fn emit_all(events: Vec<Event>) {
    for event in &events {
        print_event(event);
    }
}

fn print_event(event: &Event) {
    match serde_json::to_string(event) {
        Ok(json) => println!("{json}"),
        Err(err) => eprintln!("error: could not serialize event: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_actions() {
        assert!(matches!(parse_action("snooze"), Some(Action::Snooze)));
        assert!(matches!(parse_action("dismiss"), Some(Action::Dismiss)));
        assert!(matches!(parse_action("quit"), Some(Action::Quit)));
        let id = Uuid::new_v4();
        assert!(matches!(
            parse_action(&format!("fire {id}")),
            Some(Action::Fire(parsed)) if parsed == id
        ));
        assert!(parse_action("ring").is_none());
        assert!(parse_action("fire not-a-uuid").is_none());
    }
}
