mod model;
mod sound;

pub use model::{Alarm, Weekday};
pub use sound::AlarmSound;
