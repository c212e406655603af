//! Lifecycle controller.
//!
//! The controller owns the current generation: the abort scope of its
//! listeners, the elements resolved for it, and its countdown. Every load,
//! settle, proceed and reset signal tears the whole generation down and
//! builds a new one from a fresh resolution, so handles and listeners never
//! outlive the fragment they were taken from.
//!
//! Hosts forward DOM events to the `on_*` methods. Each returns the events
//! produced while handling it.

use std::time::Duration;

use chrono::Utc;

use crate::countdown::{Countdown, SECS_PER_HOUR};
use crate::elements::{fetch_elements, ResolvedElements};
use crate::events::Event;
use crate::host::{AbortScope, Cue, FragmentRequest, Host};
use crate::widget_config::{ClassNames, WidgetConfig};

struct Widget<H: Host> {
    elements: ResolvedElements<H::Element>,
    countdown: Countdown<H::Scheduler>,
}

struct Generation<H: Host> {
    id: u64,
    scope: H::Scope,
    /// Absent when element resolution failed.
    widget: Option<Widget<H>>,
}

pub struct Controller<H: Host> {
    host: H,
    config: WidgetConfig,
    generation: Option<Generation<H>>,
    generations_built: u64,
}

impl<H: Host> Controller<H> {
    pub fn new(host: H, config: WidgetConfig) -> Self {
        Self {
            host,
            config,
            generation: None,
            generations_built: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// Id of the live generation, if one has been built.
    pub fn generation(&self) -> Option<u64> {
        self.generation.as_ref().map(|g| g.id)
    }

    pub fn countdown(&self) -> Option<&Countdown<H::Scheduler>> {
        self.widget().map(|w| &w.countdown)
    }

    pub fn elements(&self) -> Option<&ResolvedElements<H::Element>> {
        self.widget().map(|w| &w.elements)
    }

    pub fn is_running(&self) -> bool {
        self.countdown().is_some_and(|c| c.is_running())
    }

    pub fn snapshot(&self) -> Option<Event> {
        self.countdown().map(|c| c.snapshot())
    }

    fn widget(&self) -> Option<&Widget<H>> {
        self.generation.as_ref()?.widget.as_ref()
    }

    // ── Signals ──────────────────────────────────────────────────────

    /// Initial page load.
    pub fn on_page_load(&mut self) -> Vec<Event> {
        tracing::debug!("page load");
        self.rebuild()
    }

    /// The partial-update library swapped in a new fragment.
    pub fn on_fragment_settled(&mut self) -> Vec<Event> {
        tracing::debug!("fragment settled");
        self.rebuild()
    }

    /// `countdown::reset`: rebuild, leave stopped.
    pub fn on_reset(&mut self) -> Vec<Event> {
        tracing::debug!("countdown::reset");
        self.rebuild()
    }

    /// `countdown::proceed`: rebuild, then start.
    pub fn on_proceed(&mut self) -> Vec<Event> {
        tracing::debug!("countdown::proceed");
        let mut events = self.rebuild();

        let Self {
            host,
            config,
            generation,
            ..
        } = self;
        let Some(widget) = generation.as_mut().and_then(|g| g.widget.as_mut()) else {
            tracing::error!("failed to start countdown, countdown not set");
            return events;
        };

        if let Some(started) = widget.countdown.start() {
            events.push(started);
            play_cue(host, Cue::Continue, widget.elements.audio.continue_.as_ref(), &mut events);
        }
        sync_toggle(host, &config.classes, &widget.elements.toggle, widget.countdown.is_running());
        events
    }

    /// Click on the toggle control.
    pub fn on_toggle_click(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let Self {
            host,
            config,
            generation,
            ..
        } = self;
        let Some(widget) = generation.as_mut().and_then(|g| g.widget.as_mut()) else {
            tracing::error!("toggle clicked but countdown not set");
            return events;
        };

        events.extend(widget.countdown.toggle());
        let running = widget.countdown.is_running();
        sync_toggle(host, &config.classes, &widget.elements.toggle, running);

        if running && !widget.countdown.has_counted() {
            play_cue(host, Cue::Play, widget.elements.audio.play.as_ref(), &mut events);
        }
        events
    }

    /// One firing of the countdown's scheduled tick.
    pub fn on_tick(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        let Self {
            host,
            config,
            generation,
            ..
        } = self;
        let Some(Generation {
            scope,
            widget: Some(widget),
            ..
        }) = generation.as_mut()
        else {
            tracing::debug!("tick without a countdown, ignoring");
            return events;
        };
        let Some(event) = widget.countdown.tick() else {
            return events;
        };

        match &event {
            Event::CountdownTicked {
                remaining_secs,
                display,
                ..
            } => {
                host.set_text(&widget.elements.display, display);
                let beep_at = config.timing.beep_at_secs;
                events.push(event.clone());
                if beep_at != 0 && *remaining_secs == beep_at {
                    tracing::debug!("starting end of level beep");
                    play_cue(host, Cue::Beep, widget.elements.audio.beep.as_ref(), &mut events);
                }
            }
            Event::CountdownCompleted { display, .. } => {
                host.set_text(&widget.elements.display, display);
                sync_toggle(host, &config.classes, &widget.elements.toggle, false);
                events.push(event.clone());
                complete_level(host, config, &widget.elements, scope, &mut events);
            }
            _ => events.push(event.clone()),
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn rebuild(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        self.teardown(&mut events);
        self.setup(&mut events);
        events
    }

    /// Stop the countdown and abort the scope. Dropping the generation drops
    /// its countdown, which cancels any tick still outstanding.
    fn teardown(&mut self, events: &mut Vec<Event>) {
        let Some(mut old) = self.generation.take() else {
            return;
        };
        if let Some(widget) = old.widget.as_mut() {
            if widget.countdown.is_running() {
                events.extend(widget.countdown.stop());
            }
        }
        old.scope.abort();
        tracing::debug!(generation = old.id, "generation torn down");
    }

    fn setup(&mut self, events: &mut Vec<Event>) {
        self.generations_built += 1;
        let id = self.generations_built;
        let scope = self.host.new_scope();

        let widget = match fetch_elements(&self.host, &self.config) {
            Ok(elements) => {
                let duration = elements.duration_secs();
                let countdown =
                    Countdown::new(duration, duration > SECS_PER_HOUR, self.host.scheduler());
                self.host.listen_toggle(&elements.toggle, &scope);
                sync_toggle(&mut self.host, &self.config.classes, &elements.toggle, false);

                tracing::debug!(generation = id, duration, "generation started");
                events.push(Event::GenerationStarted {
                    generation: id,
                    duration_secs: duration,
                    next_level_uri: elements
                        .has_next_level()
                        .then(|| elements.next_level_uri.clone()),
                    at: Utc::now(),
                });
                Some(Widget { elements, countdown })
            }
            Err(e) => {
                tracing::error!(generation = id, error = %e, "failed to fetch elements, countdown not set");
                events.push(Event::GenerationFailed {
                    generation: id,
                    reason: e.to_string(),
                    at: Utc::now(),
                });
                None
            }
        };

        self.generation = Some(Generation { id, scope, widget });
    }
}

/// Show exactly one of the play/stop affordances.
fn sync_toggle<H: Host>(host: &mut H, classes: &ClassNames, toggle: &H::Element, running: bool) {
    let (show, hide) = if running {
        (&classes.stop, &classes.play)
    } else {
        (&classes.play, &classes.stop)
    };
    host.remove_class(toggle, hide);
    host.add_class(toggle, show);
}

fn play_cue<H: Host>(host: &mut H, cue: Cue, audio: Option<&H::Element>, events: &mut Vec<Event>) {
    let Some(audio) = audio else {
        tracing::error!(%cue, "audio element is undefined");
        return;
    };
    host.play(cue, audio);
    events.push(Event::CueRequested {
        cue,
        at: Utc::now(),
    });
}

/// Fetch the next level, or show the final state when there is none.
fn complete_level<H: Host>(
    host: &mut H,
    config: &WidgetConfig,
    elements: &ResolvedElements<H::Element>,
    scope: &H::Scope,
    events: &mut Vec<Event>,
) {
    if elements.has_next_level() {
        let uri = with_query(&elements.next_level_uri, &config.timing.proceed_query);
        let delay_ms = config.timing.next_level_delay_ms;
        tracing::debug!(%uri, delay_ms, "requesting next level");
        host.fetch_and_swap(
            FragmentRequest {
                uri: uri.clone(),
                target: elements.container.clone(),
                delay: Duration::from_millis(delay_ms),
            },
            scope,
        );
        events.push(Event::NextLevelRequested {
            uri,
            delay_ms,
            at: Utc::now(),
        });
    } else {
        tracing::debug!("no next level, timer complete");
        host.remove_class(&elements.display, &config.classes.running_font);
        host.add_class(&elements.display, &config.classes.complete_font);
        host.set_text(&elements.display, &config.complete_text);
        events.push(Event::TimerFinished { at: Utc::now() });
    }
}

fn with_query(uri: &str, query: &str) -> String {
    if query.is_empty() {
        uri.to_string()
    } else if uri.contains('?') {
        format!("{uri}&{query}")
    } else {
        format!("{uri}?{query}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryDom, MemoryHost, MemoryNode};

    fn level_fragment(duration: Option<&str>, next: Option<&str>) -> Vec<(String, MemoryNode)> {
        let mut timer = MemoryNode::new().with_class("timer-large-font");
        if let Some(duration) = duration {
            timer = timer.with_attr("data-level-duration-sec", duration);
        }
        let mut nodes = vec![
            ("timer-container".to_string(), MemoryNode::new()),
            ("timer".to_string(), timer),
            (
                "toggle-timer-button".to_string(),
                MemoryNode::new().with_class("fa-circle-play"),
            ),
            ("audio-play".to_string(), MemoryNode::new()),
            ("audio-continue".to_string(), MemoryNode::new()),
            ("audio-beep".to_string(), MemoryNode::new()),
        ];
        if let Some(next) = next {
            nodes.push((
                "trigger-next-timer-level".to_string(),
                MemoryNode::new().with_attr("hx-get", next),
            ));
        }
        nodes
    }

    fn controller(duration: &str, next: Option<&str>) -> Controller<MemoryHost> {
        let mut dom = MemoryDom::new();
        dom.swap(level_fragment(Some(duration), next));
        let mut ctrl = Controller::new(MemoryHost::new(dom), WidgetConfig::default());
        ctrl.on_page_load();
        ctrl
    }

    fn toggle_classes(ctrl: &Controller<MemoryHost>) -> (bool, bool) {
        let dom = &ctrl.host().dom;
        (
            dom.has_class("toggle-timer-button", "fa-circle-play"),
            dom.has_class("toggle-timer-button", "fa-circle-stop"),
        )
    }

    #[test]
    fn page_load_builds_stopped_generation() {
        let ctrl = controller("300", Some("/play/t1/next"));
        assert_eq!(ctrl.generation(), Some(1));
        let countdown = ctrl.countdown().unwrap();
        assert_eq!(countdown.remaining_secs(), 300);
        assert!(!countdown.show_hours());
        assert!(!ctrl.is_running());
        assert_eq!(ctrl.host().live_toggle_listeners(), 1);
        assert_eq!(toggle_classes(&ctrl), (true, false));
    }

    #[test]
    fn long_level_shows_hours() {
        let ctrl = controller("5400", None);
        assert!(ctrl.countdown().unwrap().show_hours());
        let ctrl = controller("3600", None);
        assert!(!ctrl.countdown().unwrap().show_hours());
    }

    #[test]
    fn toggle_swaps_affordance_and_plays_start_cue_once() {
        let mut ctrl = controller("300", None);

        ctrl.on_toggle_click();
        assert!(ctrl.is_running());
        assert_eq!(toggle_classes(&ctrl), (false, true));
        assert_eq!(ctrl.host().played(), &[Cue::Play]);

        ctrl.on_tick();
        ctrl.on_toggle_click();
        assert!(!ctrl.is_running());
        assert_eq!(toggle_classes(&ctrl), (true, false));

        ctrl.on_toggle_click();
        assert!(ctrl.is_running());
        assert_eq!(ctrl.host().played(), &[Cue::Play]);
        assert_eq!(ctrl.countdown().unwrap().remaining_secs(), 299);
    }

    #[test]
    fn repeated_swaps_keep_one_listener_and_one_tick() {
        let mut ctrl = controller("300", Some("/next"));
        ctrl.on_toggle_click();

        for _ in 0..5 {
            ctrl.host_mut()
                .dom
                .swap(level_fragment(Some("300"), Some("/next")));
            ctrl.on_fragment_settled();
            ctrl.on_toggle_click();
        }

        assert_eq!(ctrl.generation(), Some(6));
        assert_eq!(ctrl.host().live_toggle_listeners(), 1);
        assert_eq!(ctrl.host().ticks().active(), 1);
        assert!(ctrl
            .host()
            .registrations()
            .iter()
            .rev()
            .skip(1)
            .all(|r| r.scope.is_aborted()));
    }

    #[test]
    fn settle_while_running_cancels_old_tick() {
        let mut ctrl = controller("300", Some("/next"));
        ctrl.on_toggle_click();
        assert_eq!(ctrl.host().ticks().active(), 1);

        ctrl.host_mut().dom.swap(level_fragment(Some("600"), None));
        let events = ctrl.on_fragment_settled();

        assert!(matches!(events.first(), Some(Event::CountdownStopped { .. })));
        assert_eq!(ctrl.host().ticks().active(), 0);
        assert!(!ctrl.is_running());
        assert_eq!(ctrl.countdown().unwrap().remaining_secs(), 600);
        assert_eq!(ctrl.host().dom.stale_writes(), 0);
    }

    #[test]
    fn ticks_write_display_and_beep_at_eleven() {
        let mut ctrl = controller("13", Some("/next"));
        ctrl.on_toggle_click();

        ctrl.on_tick();
        assert_eq!(ctrl.host().dom.text("timer"), Some("00:12"));
        assert!(!ctrl.host().played().contains(&Cue::Beep));

        let events = ctrl.on_tick();
        assert_eq!(ctrl.host().dom.text("timer"), Some("00:11"));
        assert_eq!(ctrl.host().played(), &[Cue::Play, Cue::Beep]);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::CueRequested { cue: Cue::Beep, .. })));
    }

    #[test]
    fn completion_requests_next_level_once() {
        let mut ctrl = controller("2", Some("/play/t1/next"));
        ctrl.on_toggle_click();
        ctrl.on_tick();
        let events = ctrl.on_tick();
        ctrl.on_tick();

        assert!(events
            .iter()
            .any(|e| matches!(e, Event::CountdownCompleted { .. })));
        let fetches = ctrl.host().fetches();
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].uri, "/play/t1/next?proceed=true");
        assert_eq!(fetches[0].target.id(), "timer-container");
        assert_eq!(fetches[0].delay, Duration::from_secs(1));
        assert_eq!(toggle_classes(&ctrl), (true, false));
        assert_eq!(ctrl.host().dom.text("timer"), Some("00:00"));
    }

    #[test]
    fn completion_without_next_level_is_terminal() {
        let mut ctrl = controller("1", None);
        ctrl.on_toggle_click();
        let events = ctrl.on_tick();

        assert!(matches!(events.last(), Some(Event::TimerFinished { .. })));
        assert!(ctrl.host().fetches().is_empty());
        let dom = &ctrl.host().dom;
        assert_eq!(dom.text("timer"), Some("Timer Complete"));
        assert!(dom.has_class("timer", "timer-complete-font"));
        assert!(!dom.has_class("timer", "timer-large-font"));
    }

    #[test]
    fn trigger_without_target_is_terminal() {
        let mut dom = MemoryDom::new();
        dom.swap(level_fragment(Some("1"), None));
        dom.insert("trigger-next-timer-level", MemoryNode::new());
        let mut ctrl = Controller::new(MemoryHost::new(dom), WidgetConfig::default());
        ctrl.on_page_load();
        assert!(!ctrl.elements().unwrap().has_next_level());

        ctrl.on_toggle_click();
        let events = ctrl.on_tick();

        assert!(matches!(events.last(), Some(Event::TimerFinished { .. })));
        assert!(ctrl.host().fetches().is_empty());
        assert_eq!(ctrl.host().dom.text("timer"), Some("Timer Complete"));
    }

    #[test]
    fn reset_drops_pending_next_level() {
        let mut ctrl = controller("1", Some("/next"));
        ctrl.on_toggle_click();
        ctrl.on_tick();
        assert_eq!(ctrl.host().fetches().len(), 1);

        ctrl.on_reset();
        assert_eq!(ctrl.generation(), Some(2));
        assert!(ctrl.host().fetches().is_empty());
        assert!(ctrl.host_mut().take_fetches().is_empty());
    }

    #[test]
    fn settle_and_proceed_drop_pending_next_level() {
        let mut ctrl = controller("1", Some("/next"));
        ctrl.on_toggle_click();
        ctrl.on_tick();
        ctrl.on_fragment_settled();
        assert!(ctrl.host().fetches().is_empty());

        ctrl.on_proceed();
        ctrl.on_tick();
        assert_eq!(ctrl.host().fetches().len(), 1);
        ctrl.on_proceed();
        assert!(ctrl.host_mut().take_fetches().is_empty());
    }

    #[test]
    fn missing_toggle_disables_widget() {
        let mut dom = MemoryDom::new();
        dom.swap(level_fragment(Some("300"), None));
        dom.remove("toggle-timer-button");
        let mut ctrl = Controller::new(MemoryHost::new(dom), WidgetConfig::default());

        let events = ctrl.on_page_load();
        assert!(matches!(events.as_slice(), [Event::GenerationFailed { .. }]));
        assert!(ctrl.countdown().is_none());
        assert_eq!(ctrl.host().live_toggle_listeners(), 0);
        assert!(ctrl.on_toggle_click().is_empty());
        assert!(ctrl.on_tick().is_empty());
        assert!(ctrl.on_proceed().iter().all(|e| matches!(e, Event::GenerationFailed { .. })));
    }

    #[test]
    fn proceed_starts_with_continue_cue() {
        let mut ctrl = controller("300", Some("/next"));
        let events = ctrl.on_proceed();
        assert!(ctrl.is_running());
        assert_eq!(toggle_classes(&ctrl), (false, true));
        assert_eq!(ctrl.host().played(), &[Cue::Continue]);
        assert!(events
            .iter()
            .any(|e| matches!(e, Event::CountdownStarted { .. })));
        assert_eq!(ctrl.generation(), Some(2));
    }

    #[test]
    fn proceed_on_finished_fragment_stays_stopped() {
        let mut dom = MemoryDom::new();
        dom.swap(level_fragment(None, None));
        let mut ctrl = Controller::new(MemoryHost::new(dom), WidgetConfig::default());
        ctrl.on_page_load();

        ctrl.on_proceed();
        assert!(!ctrl.is_running());
        assert!(ctrl.host().played().is_empty());
        assert_eq!(toggle_classes(&ctrl), (true, false));
    }

    #[test]
    fn reset_rebuilds_stopped_at_initial() {
        let mut ctrl = controller("300", Some("/next"));
        ctrl.on_toggle_click();
        ctrl.on_tick();
        ctrl.on_tick();

        ctrl.on_reset();
        assert!(!ctrl.is_running());
        assert_eq!(ctrl.countdown().unwrap().remaining_secs(), 300);
        assert_eq!(ctrl.host().ticks().active(), 0);
        assert_eq!(ctrl.host().live_toggle_listeners(), 1);
    }

    #[test]
    fn rejected_audio_does_not_disturb_countdown() {
        let mut ctrl = controller("300", None);
        ctrl.host_mut().reject_audio(true);
        ctrl.on_toggle_click();
        assert!(ctrl.is_running());
        assert_eq!(ctrl.host().failed_cues(), &[Cue::Play]);
        ctrl.on_tick();
        assert_eq!(ctrl.countdown().unwrap().remaining_secs(), 299);
    }

    #[test]
    fn five_second_level_end_to_end() {
        let mut ctrl = controller("5", Some("/next"));
        ctrl.on_toggle_click();

        let mut displays = Vec::new();
        let mut completions = 0;
        for _ in 0..5 {
            for event in ctrl.on_tick() {
                if let Some(display) = event.display() {
                    displays.push(display.to_string());
                }
                if matches!(event, Event::CountdownCompleted { .. }) {
                    completions += 1;
                    assert_eq!(displays.len(), 5);
                }
            }
        }

        assert_eq!(displays, ["00:04", "00:03", "00:02", "00:01", "00:00"]);
        assert_eq!(completions, 1);
        assert_eq!(ctrl.host().fetches().len(), 1);
    }

    #[test]
    fn query_is_appended_once() {
        assert_eq!(with_query("/next", "proceed=true"), "/next?proceed=true");
        assert_eq!(with_query("/next?a=1", "proceed=true"), "/next?a=1&proceed=true");
        assert_eq!(with_query("/next", ""), "/next");
    }
}
