//! Seams between the core and the page it runs in.
//!
//! The controller never touches a DOM, a timer or an audio element directly.
//! A host (the browser shell, the terminal simulator, or the in-memory host
//! used in tests) implements these traits and feeds DOM events back into
//! [`crate::Controller`].

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Schedules the countdown's repeating tick.
///
/// The task behind a handle must stop firing as soon as `cancel` returns.
pub trait TickScheduler {
    type Handle;

    fn schedule_repeating(&mut self, period: Duration) -> Self::Handle;

    fn cancel(&mut self, handle: Self::Handle);
}

/// Element lookup and mutation.
pub trait Document {
    /// Handle to one element of the current fragment. Handles go stale when
    /// the fragment is swapped out.
    type Element: Clone + fmt::Debug;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    fn set_text(&mut self, element: &Self::Element, text: &str);

    fn add_class(&mut self, element: &Self::Element, class: &str);

    fn remove_class(&mut self, element: &Self::Element, class: &str);
}

/// Cancellation token scoping one generation's listener registrations.
pub trait AbortScope {
    fn abort(&self);

    fn is_aborted(&self) -> bool;
}

/// Plain shared-flag scope for hosts without a native abort primitive.
#[derive(Debug, Clone, Default)]
pub struct ScopeToken {
    aborted: Rc<Cell<bool>>,
}

impl ScopeToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AbortScope for ScopeToken {
    fn abort(&self) {
        self.aborted.set(true);
    }

    fn is_aborted(&self) -> bool {
        self.aborted.get()
    }
}

/// Registers DOM listeners under an abort scope.
pub trait Listeners: Document {
    type Scope: AbortScope;

    fn new_scope(&mut self) -> Self::Scope;

    /// Route clicks on `toggle` to [`crate::Controller::on_toggle_click`]
    /// until `scope` is aborted.
    fn listen_toggle(&mut self, toggle: &Self::Element, scope: &Self::Scope);
}

/// Audio cues the widget can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cue {
    /// First start of a level ("The clock has started").
    Play,
    /// Level started by a proceed signal ("Blinds up").
    Continue,
    /// Ten-second warning before the level ends.
    Beep,
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cue::Play => write!(f, "play"),
            Cue::Continue => write!(f, "continue"),
            Cue::Beep => write!(f, "beep"),
        }
    }
}

/// Fire-and-forget audio playback. Failures are the host's to report.
pub trait AudioPlayer: Document {
    fn play(&mut self, cue: Cue, audio: &Self::Element);
}

/// A GET fetch-and-swap handed to the partial-update library.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentRequest<E> {
    pub uri: String,
    pub target: E,
    pub delay: Duration,
}

/// Partial page updates. The core never sees the response; the host reports
/// the swap back through [`crate::Controller::on_fragment_settled`] and any
/// after-settle triggers.
pub trait PartialUpdate: Listeners {
    /// Perform `request` after its delay, unless `scope` has been aborted by
    /// then. A fetch never outlives the generation that asked for it.
    fn fetch_and_swap(&mut self, request: FragmentRequest<Self::Element>, scope: &Self::Scope);
}

/// Everything the controller needs from its environment.
pub trait Host: Listeners + AudioPlayer + PartialUpdate {
    type Scheduler: TickScheduler;

    /// A scheduler for a new countdown. Called once per generation.
    fn scheduler(&mut self) -> Self::Scheduler;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_token_clones_share_abort() {
        let scope = ScopeToken::new();
        let registered = scope.clone();
        assert!(!registered.is_aborted());
        scope.abort();
        assert!(registered.is_aborted());
    }

    #[test]
    fn cue_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Cue::Beep).unwrap(), "\"beep\"");
        assert_eq!(Cue::Continue.to_string(), "continue");
    }
}
