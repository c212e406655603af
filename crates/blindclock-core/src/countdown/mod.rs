mod engine;
mod format;

pub use engine::{Countdown, CountdownState, TICK_PERIOD};
pub use format::{format_remaining, SECS_PER_HOUR};
