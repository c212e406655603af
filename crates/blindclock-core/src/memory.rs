//! In-memory host.
//!
//! A small document model, a manually driven scheduler, and a [`Host`] that
//! records every side effect. The terminal simulator runs on it and the
//! controller tests assert against it.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;
use std::time::Duration;

use crate::host::{
    AbortScope, AudioPlayer, Cue, Document, FragmentRequest, Host, Listeners, PartialUpdate,
    ScopeToken, TickScheduler,
};

/// One element of a [`MemoryDom`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryNode {
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub classes: BTreeSet<String>,
}

impl MemoryNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.insert(class.into());
        self
    }
}

/// Handle to a node of one particular fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    id: String,
    fragment: u64,
}

impl NodeRef {
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Flat id-keyed document. `swap` replaces the whole fragment and bumps the
/// fragment number, so handles from before the swap stop resolving.
#[derive(Debug, Default)]
pub struct MemoryDom {
    nodes: HashMap<String, MemoryNode>,
    fragment: u64,
    stale_writes: usize,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every node with `nodes`.
    pub fn swap<I, K>(&mut self, nodes: I)
    where
        I: IntoIterator<Item = (K, MemoryNode)>,
        K: Into<String>,
    {
        self.fragment += 1;
        self.nodes = nodes.into_iter().map(|(id, node)| (id.into(), node)).collect();
    }

    pub fn insert(&mut self, id: impl Into<String>, node: MemoryNode) {
        self.nodes.insert(id.into(), node);
    }

    pub fn remove(&mut self, id: &str) -> Option<MemoryNode> {
        self.nodes.remove(id)
    }

    pub fn node(&self, id: &str) -> Option<&MemoryNode> {
        self.nodes.get(id)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).map(|n| n.text.as_str())
    }

    pub fn has_class(&self, id: &str, class: &str) -> bool {
        self.nodes.get(id).is_some_and(|n| n.classes.contains(class))
    }

    pub fn fragment(&self) -> u64 {
        self.fragment
    }

    /// Writes dropped because they targeted a swapped-out fragment.
    pub fn stale_writes(&self) -> usize {
        self.stale_writes
    }

    pub fn is_live(&self, node: &NodeRef) -> bool {
        node.fragment == self.fragment && self.nodes.contains_key(&node.id)
    }

    fn live_mut(&mut self, node: &NodeRef) -> Option<&mut MemoryNode> {
        if node.fragment != self.fragment {
            self.stale_writes += 1;
            tracing::debug!(id = %node.id, "write to stale element dropped");
            return None;
        }
        self.nodes.get_mut(&node.id)
    }
}

impl Document for MemoryDom {
    type Element = NodeRef;

    fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        self.nodes.contains_key(id).then(|| NodeRef {
            id: id.to_string(),
            fragment: self.fragment,
        })
    }

    fn attribute(&self, element: &NodeRef, name: &str) -> Option<String> {
        if element.fragment != self.fragment {
            return None;
        }
        self.nodes.get(&element.id)?.attributes.get(name).cloned()
    }

    fn set_text(&mut self, element: &NodeRef, text: &str) {
        if let Some(node) = self.live_mut(element) {
            node.text = text.to_string();
        }
    }

    fn add_class(&mut self, element: &NodeRef, class: &str) {
        if let Some(node) = self.live_mut(element) {
            node.classes.insert(class.to_string());
        }
    }

    fn remove_class(&mut self, element: &NodeRef, class: &str) {
        if let Some(node) = self.live_mut(element) {
            node.classes.remove(class);
        }
    }
}

#[derive(Debug, Default)]
struct ScheduleLog {
    next_handle: u64,
    active: BTreeSet<u64>,
    scheduled: usize,
    cancelled: usize,
    last_period: Option<Duration>,
}

/// Scheduler whose ticks are delivered by hand. Clones share one log, so a
/// test can keep a clone while the countdown owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    log: Rc<RefCell<ScheduleLog>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of outstanding repeating tasks.
    pub fn active(&self) -> usize {
        self.log.borrow().active.len()
    }

    pub fn scheduled(&self) -> usize {
        self.log.borrow().scheduled
    }

    pub fn cancelled(&self) -> usize {
        self.log.borrow().cancelled
    }

    pub fn last_period(&self) -> Option<Duration> {
        self.log.borrow().last_period
    }
}

impl TickScheduler for ManualScheduler {
    type Handle = u64;

    fn schedule_repeating(&mut self, period: Duration) -> u64 {
        let mut log = self.log.borrow_mut();
        log.next_handle += 1;
        let handle = log.next_handle;
        log.active.insert(handle);
        log.scheduled += 1;
        log.last_period = Some(period);
        handle
    }

    fn cancel(&mut self, handle: u64) {
        let mut log = self.log.borrow_mut();
        if log.active.remove(&handle) {
            log.cancelled += 1;
        } else {
            tracing::warn!(handle, "cancel of unknown tick handle");
        }
    }
}

/// A toggle click registration and the scope it lives under.
#[derive(Debug, Clone)]
pub struct Registration {
    pub element: NodeRef,
    pub scope: ScopeToken,
}

/// A fetch waiting out its delay, tied to the generation that issued it.
#[derive(Debug, Clone)]
pub struct PendingFetch {
    pub request: FragmentRequest<NodeRef>,
    pub scope: ScopeToken,
}

/// [`Host`] over a [`MemoryDom`] that records what the controller asked for.
#[derive(Debug, Default)]
pub struct MemoryHost {
    pub dom: MemoryDom,
    scheduler: ManualScheduler,
    registrations: Vec<Registration>,
    played: Vec<Cue>,
    failed: Vec<Cue>,
    fetches: Vec<PendingFetch>,
    reject_audio: bool,
}

impl MemoryHost {
    pub fn new(dom: MemoryDom) -> Self {
        Self {
            dom,
            ..Self::default()
        }
    }

    /// Make every subsequent audio playback fail, as a browser does when
    /// autoplay is blocked.
    pub fn reject_audio(&mut self, reject: bool) {
        self.reject_audio = reject;
    }

    /// Shared view of every scheduler handed out.
    pub fn ticks(&self) -> &ManualScheduler {
        &self.scheduler
    }

    /// Toggle registrations still able to fire: scope not aborted and element
    /// still in the document.
    pub fn live_toggle_listeners(&self) -> usize {
        self.registrations
            .iter()
            .filter(|r| !r.scope.is_aborted() && self.dom.is_live(&r.element))
            .count()
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn played(&self) -> &[Cue] {
        &self.played
    }

    pub fn failed_cues(&self) -> &[Cue] {
        &self.failed
    }

    /// Fetches whose generation is still live.
    pub fn fetches(&self) -> Vec<&FragmentRequest<NodeRef>> {
        self.fetches
            .iter()
            .filter(|f| !f.scope.is_aborted())
            .map(|f| &f.request)
            .collect()
    }

    /// Drain the queue, dropping fetches whose generation was torn down.
    pub fn take_fetches(&mut self) -> Vec<FragmentRequest<NodeRef>> {
        std::mem::take(&mut self.fetches)
            .into_iter()
            .filter_map(|f| {
                if f.scope.is_aborted() {
                    tracing::debug!(uri = %f.request.uri, "dropping fetch from a torn down generation");
                    None
                } else {
                    Some(f.request)
                }
            })
            .collect()
    }
}

impl Document for MemoryHost {
    type Element = NodeRef;

    fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        self.dom.element_by_id(id)
    }

    fn attribute(&self, element: &NodeRef, name: &str) -> Option<String> {
        self.dom.attribute(element, name)
    }

    fn set_text(&mut self, element: &NodeRef, text: &str) {
        self.dom.set_text(element, text);
    }

    fn add_class(&mut self, element: &NodeRef, class: &str) {
        self.dom.add_class(element, class);
    }

    fn remove_class(&mut self, element: &NodeRef, class: &str) {
        self.dom.remove_class(element, class);
    }
}

impl Listeners for MemoryHost {
    type Scope = ScopeToken;

    fn new_scope(&mut self) -> ScopeToken {
        ScopeToken::new()
    }

    fn listen_toggle(&mut self, toggle: &NodeRef, scope: &ScopeToken) {
        self.registrations.retain(|r| !r.scope.is_aborted());
        self.registrations.push(Registration {
            element: toggle.clone(),
            scope: scope.clone(),
        });
    }
}

impl AudioPlayer for MemoryHost {
    fn play(&mut self, cue: Cue, audio: &NodeRef) {
        if self.reject_audio || !self.dom.is_live(audio) {
            tracing::error!(%cue, "there was an issue playing audio");
            self.failed.push(cue);
            return;
        }
        self.played.push(cue);
    }
}

impl PartialUpdate for MemoryHost {
    fn fetch_and_swap(&mut self, request: FragmentRequest<NodeRef>, scope: &ScopeToken) {
        self.fetches.push(PendingFetch {
            request,
            scope: scope.clone(),
        });
    }
}

impl Host for MemoryHost {
    type Scheduler = ManualScheduler;

    fn scheduler(&mut self) -> ManualScheduler {
        self.scheduler.clone()
    }
}
