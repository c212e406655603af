//! Routes DOM callbacks to the shared controller.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use blindclock_core::{Controller, Event};

use crate::host::WebHost;

pub type SharedController = Rc<RefCell<Controller<WebHost>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    PageLoad,
    Settled,
    Proceed,
    Reset,
    Toggle,
    Tick,
}

/// Weak handle to the controller, cloned into every callback.
///
/// Callbacks hold the relay rather than the controller so that closures
/// owned by the controller do not keep it alive.
#[derive(Clone, Default)]
pub struct Relay {
    target: Rc<RefCell<Weak<RefCell<Controller<WebHost>>>>>,
}

impl Relay {
    pub fn bind(&self, controller: &SharedController) {
        *self.target.borrow_mut() = Rc::downgrade(controller);
    }

    pub fn dispatch(&self, signal: Signal) {
        let Some(controller) = self.target.borrow().upgrade() else {
            tracing::warn!(?signal, "controller gone, signal dropped");
            return;
        };
        let Ok(mut controller) = controller.try_borrow_mut() else {
            tracing::warn!(?signal, "re-entrant signal dropped");
            return;
        };

        let events = match signal {
            Signal::PageLoad => controller.on_page_load(),
            Signal::Settled => controller.on_fragment_settled(),
            Signal::Proceed => controller.on_proceed(),
            Signal::Reset => controller.on_reset(),
            Signal::Toggle => controller.on_toggle_click(),
            Signal::Tick => controller.on_tick(),
        };
        log_events(&events);
    }
}

fn log_events(events: &[Event]) {
    for event in events {
        match serde_json::to_string(event) {
            Ok(json) => tracing::debug!(event = %json),
            Err(e) => tracing::warn!("failed to serialize event: {e}"),
        }
    }
}

/// Map a DOM event name to the signal it raises.
pub fn signal_for(event: &str) -> Option<Signal> {
    match event {
        "DOMContentLoaded" => Some(Signal::PageLoad),
        "htmx:load" => Some(Signal::Settled),
        "countdown::proceed" => Some(Signal::Proceed),
        "countdown::reset" => Some(Signal::Reset),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_events_map_to_signals() {
        assert_eq!(signal_for("htmx:load"), Some(Signal::Settled));
        assert_eq!(signal_for("countdown::proceed"), Some(Signal::Proceed));
        assert_eq!(signal_for("countdown::reset"), Some(Signal::Reset));
        assert_eq!(signal_for("click"), None);
    }

    #[test]
    fn unbound_relay_drops_signals() {
        Relay::default().dispatch(Signal::Tick);
    }
}
