mod fade;
mod failsafe;
mod playback;
mod service;

pub use fade::FadeEngine;
pub use failsafe::FailsafeTimer;
pub use playback::{PlaybackPort, ToneSource};
pub use service::{AudioEvent, AudioService, RingParams};
