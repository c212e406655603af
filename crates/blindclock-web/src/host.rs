//! Host traits over the live DOM.

use std::cell::RefCell;
use std::time::Duration;

use blindclock_core::host::{
    AbortScope, AudioPlayer, Cue, Document, FragmentRequest, Host, Listeners, PartialUpdate,
    TickScheduler,
};
use gloo_timers::callback::{Interval, Timeout};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{AbortController, AddEventListenerOptions, Element, HtmlAudioElement};

use crate::relay::{Relay, Signal};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = htmx, js_name = ajax, catch)]
    fn htmx_ajax(verb: &str, path: &str, target: &Element) -> Result<js_sys::Promise, JsValue>;
}

type ClickClosure = Closure<dyn FnMut(web_sys::Event)>;

pub struct WebHost {
    document: web_sys::Document,
    relay: Relay,
}

impl WebHost {
    pub fn new(document: web_sys::Document, relay: Relay) -> Self {
        Self { document, relay }
    }
}

impl Document for WebHost {
    type Element = Element;

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn set_text(&mut self, element: &Element, text: &str) {
        element.set_text_content(Some(text));
    }

    fn add_class(&mut self, element: &Element, class: &str) {
        if let Err(e) = element.class_list().add_1(class) {
            tracing::warn!(class, "failed to add class: {e:?}");
        }
    }

    fn remove_class(&mut self, element: &Element, class: &str) {
        if let Err(e) = element.class_list().remove_1(class) {
            tracing::warn!(class, "failed to remove class: {e:?}");
        }
    }
}

/// Abort scope backed by an `AbortController`.
///
/// Owns the click closures registered under its signal so they live until
/// the generation is dropped, and the delayed fetches it issued so dropping
/// the generation cancels them.
pub struct WebScope {
    controller: Option<AbortController>,
    listeners: RefCell<Vec<ClickClosure>>,
    fetches: RefCell<Vec<Timeout>>,
}

impl AbortScope for WebScope {
    fn abort(&self) {
        if let Some(controller) = &self.controller {
            controller.abort();
        }
    }

    fn is_aborted(&self) -> bool {
        self.controller
            .as_ref()
            .map_or(true, |c| c.signal().aborted())
    }
}

impl Listeners for WebHost {
    type Scope = WebScope;

    fn new_scope(&mut self) -> WebScope {
        let controller = match AbortController::new() {
            Ok(controller) => Some(controller),
            Err(e) => {
                tracing::error!("failed to create abort controller: {e:?}");
                None
            }
        };
        WebScope {
            controller,
            listeners: RefCell::new(Vec::new()),
            fetches: RefCell::new(Vec::new()),
        }
    }

    fn listen_toggle(&mut self, toggle: &Element, scope: &WebScope) {
        let Some(controller) = &scope.controller else {
            tracing::error!("no abort signal, toggle click not registered");
            return;
        };

        let relay = self.relay.clone();
        let closure = ClickClosure::new(move |_: web_sys::Event| relay.dispatch(Signal::Toggle));
        let options = AddEventListenerOptions::new();
        options.set_signal(&controller.signal());

        if let Err(e) = toggle.add_event_listener_with_callback_and_add_event_listener_options(
            "click",
            closure.as_ref().unchecked_ref(),
            &options,
        ) {
            tracing::error!("failed to register toggle click: {e:?}");
            return;
        }
        scope.listeners.borrow_mut().push(closure);
    }
}

impl AudioPlayer for WebHost {
    fn play(&mut self, cue: Cue, audio: &Element) {
        let Some(audio) = audio.dyn_ref::<HtmlAudioElement>() else {
            tracing::error!(%cue, "element is not an audio element");
            return;
        };
        match audio.play() {
            Ok(promise) => spawn_local(async move {
                match JsFuture::from(promise).await {
                    Ok(_) => tracing::debug!(%cue, "audio played"),
                    Err(e) => tracing::error!(%cue, "failed to play audio: {e:?}"),
                }
            }),
            Err(e) => tracing::error!(%cue, "failed to play audio: {e:?}"),
        }
    }
}

impl PartialUpdate for WebHost {
    fn fetch_and_swap(&mut self, request: FragmentRequest<Element>, scope: &WebScope) {
        let FragmentRequest { uri, target, delay } = request;
        tracing::debug!(%uri, delay_ms = delay.as_millis() as u64, "next level scheduled");
        let signal = scope.controller.as_ref().map(AbortController::signal);
        let timeout = Timeout::new(millis(delay), move || {
            if signal.as_ref().is_some_and(|s| s.aborted()) {
                tracing::debug!(%uri, "generation torn down, next level fetch skipped");
                return;
            }
            match htmx_ajax("GET", &uri, &target) {
                Ok(promise) => spawn_local(async move {
                    if let Err(e) = JsFuture::from(promise).await {
                        tracing::error!(%uri, "failed to fetch next level: {e:?}");
                    }
                }),
                Err(e) => tracing::error!(%uri, "failed to fetch next level: {e:?}"),
            }
        });
        scope.fetches.borrow_mut().push(timeout);
    }
}

impl Host for WebHost {
    type Scheduler = WebScheduler;

    fn scheduler(&mut self) -> WebScheduler {
        WebScheduler {
            relay: self.relay.clone(),
        }
    }
}

/// Repeating ticks on `setInterval`, delivered through the relay.
pub struct WebScheduler {
    relay: Relay,
}

impl TickScheduler for WebScheduler {
    type Handle = Interval;

    fn schedule_repeating(&mut self, period: Duration) -> Interval {
        let relay = self.relay.clone();
        Interval::new(millis(period), move || relay.dispatch(Signal::Tick))
    }

    fn cancel(&mut self, handle: Interval) {
        let closure = handle.cancel();
        // Cancellation can happen inside this interval's own callback.
        spawn_local(async move { drop(closure) });
    }
}

fn millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_saturates() {
        assert_eq!(millis(Duration::from_secs(1)), 1000);
        assert_eq!(millis(Duration::from_secs(u64::MAX)), u32::MAX);
    }
}
