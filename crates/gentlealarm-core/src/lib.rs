//! # GentleAlarm Core Library
//!
//! Core engine for GentleAlarm, a personal alarm clock built around one
//! hard problem: reliably waking a sleeping user despite OS limits on
//! background execution, audio playback, and notification delivery.
//!
//! ## Architecture
//!
//! - **Alarm model**: plain data records with pure fire-date arithmetic
//! - **Audio service**: a wall-clock tick-driven state machine owning the
//!   single playback device -- keep-alive session, volume fade, failsafe
//!   escalation. No internal threads; the caller ticks it and consumes
//!   events
//! - **Alarm manager**: the orchestrating state machine owning the
//!   collection, persistence, and the firing/snooze/dismiss lifecycle
//! - **Ports**: the platform audio and notification subsystems are
//!   injected behind [`PlaybackPort`] and [`NotificationPort`], so tests
//!   run against deterministic fakes
//! - **Storage**: SQLite key-value persistence and TOML configuration
//!
//! Arming is deliberately redundant: every enabled alarm gets an OS
//! notification request AND an in-process keep-alive poll targeting the
//! same instant. Whichever path fires first wins; the other is
//! suppressed.

pub mod alarm;
pub mod audio;
pub mod error;
pub mod events;
pub mod manager;
pub mod notify;
pub mod storage;

pub use alarm::{Alarm, AlarmSound, Weekday};
pub use audio::{AudioEvent, AudioService, FadeEngine, FailsafeTimer, PlaybackPort, RingParams, ToneSource};
pub use error::{ConfigError, CoreError, NotifyError, PlaybackError, StorageError};
pub use events::Event;
pub use manager::{AlarmManager, FiringSession, ManagerState};
pub use notify::{AlarmNotification, NotificationPayload, NotificationPort};
pub use storage::{Config, Database};
