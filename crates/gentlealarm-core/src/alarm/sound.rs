//! The closed catalog of alarm tones.

use serde::{Deserialize, Serialize};

/// An alarm tone identifier.
///
/// Serialized by its asset id, so the persisted form matches the sound
/// file name shipped with the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmSound {
    #[serde(rename = "morning_birds")]
    MorningBirds,
    #[serde(rename = "ocean-waves")]
    OceanWaves,
    /// Loud backup tone. Failsafe-only, never offered in the picker.
    #[serde(rename = "clock-alarm")]
    ClockAlarm,
}

impl AlarmSound {
    pub const ALL: [AlarmSound; 3] = [
        AlarmSound::MorningBirds,
        AlarmSound::OceanWaves,
        AlarmSound::ClockAlarm,
    ];

    /// Sounds offered in the user-facing picker (failsafe-only tones excluded).
    pub fn selectable() -> impl Iterator<Item = AlarmSound> {
        Self::ALL.into_iter().filter(|s| !s.is_failsafe_only())
    }

    pub fn is_failsafe_only(self) -> bool {
        self == AlarmSound::ClockAlarm
    }

    /// The asset id, identical to the serialized form.
    pub fn asset_id(self) -> &'static str {
        match self {
            AlarmSound::MorningBirds => "morning_birds",
            AlarmSound::OceanWaves => "ocean-waves",
            AlarmSound::ClockAlarm => "clock-alarm",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AlarmSound::MorningBirds => "Morning Birds",
            AlarmSound::OceanWaves => "Ocean Waves",
            AlarmSound::ClockAlarm => "Clock Alarm",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AlarmSound::MorningBirds => "Nature sounds",
            AlarmSound::OceanWaves => "Calm waves",
            AlarmSound::ClockAlarm => "Loud failsafe alarm",
        }
    }

    /// Parse an asset id back into a tone, for notification payloads.
    pub fn from_asset_id(id: &str) -> Option<AlarmSound> {
        Self::ALL.into_iter().find(|s| s.asset_id() == id)
    }
}

impl Default for AlarmSound {
    fn default() -> Self {
        AlarmSound::MorningBirds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectable_excludes_failsafe_tone() {
        let sounds: Vec<AlarmSound> = AlarmSound::selectable().collect();
        assert_eq!(sounds, vec![AlarmSound::MorningBirds, AlarmSound::OceanWaves]);
        assert!(!sounds.contains(&AlarmSound::ClockAlarm));
    }

    #[test]
    fn asset_id_round_trip() {
        for sound in AlarmSound::ALL {
            assert_eq!(AlarmSound::from_asset_id(sound.asset_id()), Some(sound));
        }
        assert_eq!(AlarmSound::from_asset_id("nope"), None);
    }

    #[test]
    fn serializes_as_asset_id() {
        let json = serde_json::to_string(&AlarmSound::OceanWaves).unwrap();
        assert_eq!(json, "\"ocean-waves\"");
        let back: AlarmSound = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AlarmSound::OceanWaves);
    }
}
