use clap::Subcommand;
use gentlealarm_core::{AlarmSound, Config};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the active configuration
    Show,
    /// Update defaults applied to newly created alarms
    SetDefaults {
        /// Tone asset id
        #[arg(long)]
        sound: Option<String>,
        /// Fade-in minutes (1-10)
        #[arg(long)]
        fade: Option<u32>,
        /// Snooze minutes
        #[arg(long)]
        snooze: Option<u32>,
        /// Enable failsafe by default
        #[arg(long)]
        failsafe: Option<bool>,
        /// Failsafe delay minutes
        #[arg(long)]
        failsafe_min: Option<u32>,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::SetDefaults {
            sound,
            fade,
            snooze,
            failsafe,
            failsafe_min,
        } => {
            let mut config = Config::load();
            if let Some(id) = sound {
                let parsed = AlarmSound::from_asset_id(&id)
                    .ok_or_else(|| format!("unknown sound '{id}'"))?;
                if parsed.is_failsafe_only() {
                    return Err(format!("'{id}' is reserved for the failsafe").into());
                }
                config.defaults.sound = parsed;
            }
            if let Some(fade) = fade {
                config.defaults.fade_in_min = fade.clamp(1, 10);
            }
            if let Some(snooze) = snooze {
                config.defaults.snooze_min = snooze;
            }
            if let Some(failsafe) = failsafe {
                config.defaults.failsafe_enabled = failsafe;
            }
            if let Some(minutes) = failsafe_min {
                config.defaults.failsafe_min = minutes;
            }
            config.save()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
