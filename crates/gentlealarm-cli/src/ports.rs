//! CLI-side implementations of the platform ports.
//!
//! On a phone these seams are the native audio session and the local
//! notification center. The CLI stands them in with a playback adapter
//! that reports state changes as JSON lines on stdout and a notifier
//! that records outbound scheduling requests in the log.

use gentlealarm_core::{AlarmNotification, NotificationPort, PlaybackError, PlaybackPort, ToneSource};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

/// Playback stand-in: emits one JSON line per state change.
pub struct JsonPlayback {
    playing: Option<ToneSource>,
    /// Volume writes below this delta are not re-emitted, so the 4 Hz
    /// fade tick doesn't flood stdout.
    emit_threshold: f32,
    last_emitted_volume: f32,
}

impl JsonPlayback {
    pub fn new() -> Self {
        Self {
            playing: None,
            emit_threshold: 0.01,
            last_emitted_volume: -1.0,
        }
    }

    fn describe(source: ToneSource) -> String {
        match source {
            ToneSource::Asset(sound) => sound.asset_id().to_string(),
            ToneSource::SystemDefault => "system-default".to_string(),
        }
    }
}

impl PlaybackPort for JsonPlayback {
    fn play(
        &mut self,
        source: ToneSource,
        volume: f32,
        looping: bool,
    ) -> Result<(), PlaybackError> {
        self.playing = Some(source);
        self.last_emitted_volume = volume;
        println!(
            "{}",
            json!({
                "type": "Playback",
                "state": "start",
                "tone": Self::describe(source),
                "volume": volume,
                "looping": looping,
            })
        );
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        if (volume - self.last_emitted_volume).abs() >= self.emit_threshold {
            self.last_emitted_volume = volume;
            println!(
                "{}",
                json!({ "type": "Playback", "state": "volume", "volume": volume })
            );
        }
    }

    fn stop(&mut self) {
        if self.playing.take().is_some() {
            println!("{}", json!({ "type": "Playback", "state": "stop" }));
        }
    }

    fn is_playing(&self) -> bool {
        self.playing.is_some()
    }
}

/// Notification stand-in: logs the outbound request.
pub struct LogNotifier;

impl NotificationPort for LogNotifier {
    fn schedule(
        &mut self,
        notification: &AlarmNotification,
    ) -> Result<(), gentlealarm_core::NotifyError> {
        info!(
            alarm_id = %notification.payload.alarm_id,
            fire_at = %notification.fire_at,
            label = %notification.label,
            "alert scheduled"
        );
        Ok(())
    }

    fn cancel(&mut self, alarm_id: Uuid) {
        info!(%alarm_id, "alert cancelled");
    }
}
