//! # Blindclock Core Library
//!
//! This library provides the core logic for the Blindclock poker tournament
//! clock widget. The widget lives inside a server-rendered page whose timer
//! fragment is replaced by htmx every time a level changes; everything that
//! touches the page goes through the traits in [`host`], so the same
//! controller runs in the browser (`blindclock-web`) and in the terminal
//! simulator (`blindclock-cli`).
//!
//! ## Architecture
//!
//! - **Countdown Engine**: A one-second-tick state machine. It owns the handle
//!   of its repeating tick and reports every transition as an [`Event`]
//! - **Element Resolver**: Looks up the DOM handles and attributes of the
//!   current fragment and fails closed when a required one is missing
//! - **Lifecycle Controller**: Rebuilds a fresh generation (abort scope,
//!   elements, engine) on every load, settle, proceed and reset signal
//!
//! ## Key Components
//!
//! - [`Countdown`]: Core countdown state machine
//! - [`Controller`]: Generation owner and event router
//! - [`WidgetConfig`]: Element ids, classes and timing knobs
//! - [`Structure`]: Blind structure definitions

pub mod controller;
pub mod countdown;
pub mod elements;
pub mod error;
pub mod events;
pub mod host;
pub mod memory;
pub mod structure;
pub mod widget_config;

pub use controller::Controller;
pub use countdown::{format_remaining, Countdown, CountdownState};
pub use elements::{fetch_elements, AudioElements, ResolvedElements};
pub use error::{ConfigError, CoreError, ElementError, ValidationError};
pub use events::Event;
pub use host::{
    AbortScope, AudioPlayer, Cue, Document, FragmentRequest, Host, Listeners, PartialUpdate,
    ScopeToken, TickScheduler,
};
pub use memory::{ManualScheduler, MemoryDom, MemoryHost, MemoryNode, PendingFetch};
pub use structure::{Level, LevelType, Structure};
pub use widget_config::{ElementIds, WidgetConfig};
