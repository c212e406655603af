//! Countdown engine implementation.
//!
//! The engine counts whole seconds down to zero. It does not run a timer
//! itself: `start()` asks its [`TickScheduler`] for a repeating one-second
//! task, and the host calls `tick()` each time that task fires.
//!
//! ## State Transitions
//!
//! ```text
//! Stopped --start (remaining > 0)--> Running
//! Running --stop-------------------> Stopped
//! Running --tick (remaining > 0)---> Running
//! Running --tick (remaining == 0)--> Stopped + CountdownCompleted
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut countdown = Countdown::new(300, false, scheduler);
//! countdown.start();
//! // Each time the scheduled task fires:
//! countdown.tick(); // Some(CountdownTicked) or Some(CountdownCompleted)
//! ```

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::format::format_remaining;
use crate::events::Event;
use crate::host::TickScheduler;

/// Period of the repeating tick.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownState {
    Stopped,
    Running,
}

/// Core countdown engine.
///
/// Running is defined by holding a tick handle, so there is never a running
/// engine without a scheduled tick or a stopped one with a tick outstanding.
pub struct Countdown<S: TickScheduler> {
    initial_secs: u32,
    remaining_secs: u32,
    show_hours: bool,
    has_counted: bool,
    scheduler: S,
    tick_handle: Option<S::Handle>,
}

impl<S: TickScheduler> Countdown<S> {
    /// Create a stopped countdown at `initial_secs`.
    pub fn new(initial_secs: u32, show_hours: bool, scheduler: S) -> Self {
        Self {
            initial_secs,
            remaining_secs: initial_secs,
            show_hours,
            has_counted: false,
            scheduler,
            tick_handle: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> CountdownState {
        if self.tick_handle.is_some() {
            CountdownState::Running
        } else {
            CountdownState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        self.tick_handle.is_some()
    }

    /// Whether a tick has fired since the countdown was created or reset.
    pub fn has_counted(&self) -> bool {
        self.has_counted
    }

    pub fn initial_secs(&self) -> u32 {
        self.initial_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn show_hours(&self) -> bool {
        self.show_hours
    }

    pub fn format(&self, value: u32) -> String {
        format_remaining(value, self.show_hours)
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            state: self.state(),
            initial_secs: self.initial_secs,
            remaining_secs: self.remaining_secs,
            display: self.format(self.remaining_secs),
            has_counted: self.has_counted,
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start counting down.
    ///
    /// Starting a running countdown resets it first. A countdown at zero
    /// refuses to start.
    pub fn start(&mut self) -> Option<Event> {
        if self.is_running() {
            tracing::debug!("start while running, resetting first");
            self.reset();
        }

        if self.remaining_secs == 0 {
            tracing::warn!("countdown is at 0, refusing to start");
            return None;
        }

        self.tick_handle = Some(self.scheduler.schedule_repeating(TICK_PERIOD));
        tracing::debug!(remaining_secs = self.remaining_secs, "countdown started");
        Some(Event::CountdownStarted {
            initial_secs: self.initial_secs,
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Stop counting down. Stopping a stopped countdown is a no-op.
    pub fn stop(&mut self) -> Option<Event> {
        let Some(handle) = self.tick_handle.take() else {
            tracing::warn!("stop called without an active tick");
            return None;
        };
        self.scheduler.cancel(handle);
        tracing::debug!(remaining_secs = self.remaining_secs, "countdown stopped");
        Some(Event::CountdownStopped {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    pub fn toggle(&mut self) -> Option<Event> {
        if self.is_running() {
            self.stop()
        } else {
            self.start()
        }
    }

    /// Stop and restore the initial value. Does not restart.
    pub fn reset(&mut self) -> Option<Event> {
        if let Some(handle) = self.tick_handle.take() {
            self.scheduler.cancel(handle);
        }
        self.remaining_secs = self.initial_secs;
        self.has_counted = false;
        Some(Event::CountdownReset {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        })
    }

    /// Re-arm the tick without touching the remaining value.
    pub fn resume(&mut self) -> Option<Event> {
        if self.is_running() {
            self.stop();
        }
        self.start()
    }

    /// Call once per scheduled tick.
    ///
    /// Returns `CountdownCompleted` on the tick that reaches zero, after the
    /// engine has stopped itself. Ticks delivered while stopped are ignored.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.is_running() {
            tracing::debug!("tick while stopped, ignoring");
            return None;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        self.has_counted = true;
        let display = self.format(self.remaining_secs);

        if self.remaining_secs == 0 {
            self.stop();
            tracing::debug!("countdown completed");
            return Some(Event::CountdownCompleted {
                display,
                at: Utc::now(),
            });
        }

        Some(Event::CountdownTicked {
            remaining_secs: self.remaining_secs,
            display,
            at: Utc::now(),
        })
    }
}

impl<S: TickScheduler> Drop for Countdown<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.tick_handle.take() {
            self.scheduler.cancel(handle);
        }
    }
}

impl<S: TickScheduler> std::fmt::Debug for Countdown<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Countdown")
            .field("initial_secs", &self.initial_secs)
            .field("remaining_secs", &self.remaining_secs)
            .field("show_hours", &self.show_hours)
            .field("has_counted", &self.has_counted)
            .field("state", &self.state())
            .finish()
    }
}
