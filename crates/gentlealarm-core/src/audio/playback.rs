//! The playback port: the seam between the engine and the platform's
//! audio layer.
//!
//! The engine never touches a device directly. It asks the port to play
//! one tone at a software-controlled volume, looping or not, and the port
//! guarantees at most one stream at a time -- acquiring it for a new
//! purpose stops the previous holder.

use crate::alarm::AlarmSound;
use crate::error::PlaybackError;

/// What to play: a catalog asset, or the platform's built-in tone used
/// when an asset cannot be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToneSource {
    Asset(AlarmSound),
    SystemDefault,
}

/// Handle to the single playback device.
pub trait PlaybackPort {
    /// Start playing `source` at `volume` (0.0..=1.0), replacing whatever
    /// was playing. `looping` keeps the tone going until [`stop`].
    ///
    /// `Err(SoundUnavailable)` means the asset could not be loaded; the
    /// caller retries with [`ToneSource::SystemDefault`].
    ///
    /// [`stop`]: PlaybackPort::stop
    fn play(&mut self, source: ToneSource, volume: f32, looping: bool)
        -> Result<(), PlaybackError>;

    /// Adjust the volume of the current stream. No-op when idle.
    fn set_volume(&mut self, volume: f32);

    /// Stop the current stream. Idempotent.
    fn stop(&mut self);

    fn is_playing(&self) -> bool;
}
