//! Blindclock browser shell.
//!
//! Builds a [`Controller`] over the live document and wires page lifecycle
//! events to it:
//! - `DOMContentLoaded` (or immediately, when the module loads late)
//! - `htmx:load` after every fragment swap
//! - the server's `countdown::proceed` and `countdown::reset` triggers
//!
//! Configuration is read from two optional attributes on `<body>`:
//! `data-blindclock-config` (JSON [`WidgetConfig`]) and `data-blindclock-log`
//! (a `tracing` filter directive, default `warn`).

use std::cell::RefCell;
use std::rc::Rc;

use blindclock_core::{Controller, WidgetConfig};
use wasm_bindgen::prelude::*;
use web_sys::EventTarget;

pub mod host;
pub mod logging;
pub mod relay;

pub use host::{WebHost, WebScheduler, WebScope};
pub use relay::{Relay, Signal};

const CONFIG_ATTRIBUTE: &str = "data-blindclock-config";
const LOG_ATTRIBUTE: &str = "data-blindclock-log";

const BODY_EVENTS: [&str; 3] = ["htmx:load", "countdown::proceed", "countdown::reset"];

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;
    let body = document.body().ok_or("no body")?;

    logging::init(body.get_attribute(LOG_ATTRIBUTE).as_deref());
    let config = parse_config(body.get_attribute(CONFIG_ATTRIBUTE).as_deref());

    let relay = Relay::default();
    let controller = Rc::new(RefCell::new(Controller::new(
        WebHost::new(document.clone(), relay.clone()),
        config,
    )));
    relay.bind(&controller);
    // Keeps the controller alive for the lifetime of the page.
    std::mem::forget(controller);

    for name in BODY_EVENTS {
        listen(&body, name, &relay)?;
    }
    if document.ready_state() == "loading" {
        listen(&document, "DOMContentLoaded", &relay)?;
    } else {
        relay.dispatch(Signal::PageLoad);
    }

    tracing::debug!("blindclock started");
    Ok(())
}

fn listen(target: &EventTarget, name: &str, relay: &Relay) -> Result<(), JsValue> {
    let signal = relay::signal_for(name).ok_or_else(|| format!("unbound event {name}"))?;
    let relay = relay.clone();
    let closure = Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
        relay.dispatch(signal);
    });
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// Parse the JSON widget config, falling back to defaults.
pub fn parse_config(raw: Option<&str>) -> WidgetConfig {
    let Some(raw) = raw else {
        return WidgetConfig::default();
    };
    match serde_json::from_str(raw) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid {CONFIG_ATTRIBUTE}, using defaults: {e}");
            WidgetConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_uses_defaults() {
        assert_eq!(parse_config(None), WidgetConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = parse_config(Some(r#"{"timing": {"beep_at_secs": 5}}"#));
        assert_eq!(config.timing.beep_at_secs, 5);
        assert_eq!(config.ids, WidgetConfig::default().ids);
    }

    #[test]
    fn invalid_config_uses_defaults() {
        assert_eq!(parse_config(Some("{not json")), WidgetConfig::default());
    }

    #[test]
    fn every_body_event_has_a_signal() {
        for name in BODY_EVENTS {
            assert!(relay::signal_for(name).is_some(), "{name}");
        }
    }
}
