use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::countdown::CountdownState;
use crate::host::Cue;

/// Every state change in the widget produces an Event.
/// Engine commands return them; the controller collects them per dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CountdownStarted {
        initial_secs: u32,
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    CountdownStopped {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    CountdownReset {
        remaining_secs: u32,
        at: DateTime<Utc>,
    },
    CountdownTicked {
        remaining_secs: u32,
        display: String,
        at: DateTime<Utc>,
    },
    /// The tick that reached zero. The engine is already stopped.
    CountdownCompleted {
        display: String,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: CountdownState,
        initial_secs: u32,
        remaining_secs: u32,
        display: String,
        has_counted: bool,
        at: DateTime<Utc>,
    },
    /// A new generation was built from freshly resolved elements.
    GenerationStarted {
        generation: u64,
        duration_secs: u32,
        next_level_uri: Option<String>,
        at: DateTime<Utc>,
    },
    /// Element resolution failed; the generation has no countdown.
    GenerationFailed {
        generation: u64,
        reason: String,
        at: DateTime<Utc>,
    },
    CueRequested {
        cue: Cue,
        at: DateTime<Utc>,
    },
    NextLevelRequested {
        uri: String,
        delay_ms: u64,
        at: DateTime<Utc>,
    },
    /// Completion without a next level: the display shows the final state.
    TimerFinished {
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Display text carried by tick and completion events.
    pub fn display(&self) -> Option<&str> {
        match self {
            Event::CountdownTicked { display, .. }
            | Event::CountdownCompleted { display, .. }
            | Event::StateSnapshot { display, .. } => Some(display),
            _ => None,
        }
    }
}
