//! Terminal tournament clock.
//!
//! Runs the same controller the browser widget runs, over an in-memory
//! document. The fragment server answers next-level fetches, a tokio interval
//! stands in for the browser's repeating timer, and the partial-update delay
//! is honoured before each swap.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use blindclock_core::countdown::TICK_PERIOD;
use blindclock_core::memory::NodeRef;
use blindclock_core::{Controller, Event, FragmentRequest, MemoryDom, MemoryHost, Structure, WidgetConfig};
use clap::Args;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::paths;
use crate::server::{FragmentServer, Trigger};

#[derive(Args)]
pub struct PlayArgs {
    /// Blind structure TOML file
    #[arg(long, short)]
    structure: PathBuf,
    /// Clock speed multiplier (2 runs a level in half the time)
    #[arg(long, default_value = "1")]
    speed: u32,
    /// Level to start at (0-based)
    #[arg(long, default_value = "0")]
    level: usize,
    /// Print every event as a JSON line
    #[arg(long)]
    json: bool,
}

pub fn run(args: PlayArgs) -> Result<(), Box<dyn Error>> {
    if args.speed == 0 {
        return Err("speed must be at least 1".into());
    }
    let content = std::fs::read_to_string(&args.structure)?;
    let structure = Structure::from_toml_str(&content)?;
    let config = WidgetConfig::load_from(&paths::config_path()?)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(play(structure, config, args))
}

/// Writes events to stdout, either as JSON lines or as a live display.
struct Reporter<'a> {
    json: bool,
    server: &'a FragmentServer,
    finished: bool,
}

impl<'a> Reporter<'a> {
    fn new(json: bool, server: &'a FragmentServer) -> Self {
        Self {
            json,
            server,
            finished: false,
        }
    }

    fn level_changed(&self, level: usize) -> io::Result<()> {
        if self.json {
            return Ok(());
        }
        if let Some(level) = self.server.structure().get(level) {
            let mut out = io::stdout().lock();
            writeln!(out)?;
            writeln!(out, "== {} ==", level.label())?;
            write!(out, "{}", level.display())?;
            out.flush()?;
        }
        Ok(())
    }

    fn report(&mut self, events: &[Event]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        for event in events {
            if matches!(event, Event::TimerFinished { .. }) {
                self.finished = true;
            }
            if self.json {
                let line = serde_json::to_string(event).map_err(io::Error::other)?;
                writeln!(out, "{line}")?;
                continue;
            }
            match event {
                Event::CountdownTicked { display, .. } => write!(out, "\r{display}  ")?,
                Event::CountdownCompleted { display, .. } => write!(out, "\r{display}  ")?,
                Event::TimerFinished { .. } => writeln!(out, "\nTimer Complete")?,
                _ => {}
            }
        }
        out.flush()
    }
}

/// A next-level fetch waiting out its delay.
struct Pending {
    due: Instant,
    generation: Option<u64>,
    request: FragmentRequest<NodeRef>,
}

async fn play(structure: Structure, config: WidgetConfig, args: PlayArgs) -> Result<(), Box<dyn Error>> {
    let server = FragmentServer::new(structure, config.clone());
    let first = server
        .render(args.level)
        .ok_or_else(|| format!("structure has no level {}", args.level))?;

    let mut dom = MemoryDom::new();
    dom.swap(first);
    let mut ctrl = Controller::new(MemoryHost::new(dom), config);
    let mut reporter = Reporter::new(args.json, &server);

    reporter.level_changed(args.level)?;
    reporter.report(&ctrl.on_page_load())?;
    if ctrl.host().live_toggle_listeners() == 0 {
        return Err("timer fragment has no toggle control".into());
    }
    reporter.report(&ctrl.on_toggle_click())?;

    let mut ticker = time::interval(scaled(TICK_PERIOD, args.speed));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    let mut pending: Option<Pending> = None;
    loop {
        if pending
            .as_ref()
            .is_some_and(|p| p.generation != ctrl.generation())
        {
            tracing::debug!("generation changed, dropping pending level fetch");
            pending = None;
        }
        for request in ctrl.host_mut().take_fetches() {
            pending = Some(Pending {
                due: Instant::now() + scaled(request.delay, args.speed),
                generation: ctrl.generation(),
                request,
            });
        }

        if reporter.finished {
            break;
        }
        if pending.is_none() && !ctrl.is_running() {
            tracing::warn!("clock stopped with no level pending");
            break;
        }

        let running = ctrl.is_running();
        let deadline = pending.as_ref().map(|p| p.due);
        tokio::select! {
            _ = ticker.tick(), if running => {
                let events = ctrl.on_tick();
                reporter.report(&events)?;
            }
            _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                if let Some(Pending { request, .. }) = pending.take() {
                    swap_in(&server, &mut ctrl, &request.uri, &mut reporter)?;
                    ticker.reset();
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break;
            }
        }
    }

    if !args.json {
        println!();
    }
    Ok(())
}

/// Perform a fetch-and-swap: replace the fragment, then deliver the settle
/// event and the server's after-settle trigger.
fn swap_in(
    server: &FragmentServer,
    ctrl: &mut Controller<MemoryHost>,
    uri: &str,
    reporter: &mut Reporter<'_>,
) -> io::Result<()> {
    let response = match server.get(uri) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%uri, error = %e, "failed to fetch next level");
            return Ok(());
        }
    };

    ctrl.host_mut().dom.swap(response.nodes);
    reporter.level_changed(response.level)?;
    reporter.report(&ctrl.on_fragment_settled())?;
    let events = match response.trigger {
        Trigger::Proceed => ctrl.on_proceed(),
        Trigger::Reset => ctrl.on_reset(),
    };
    reporter.report(&events)
}

fn scaled(delay: Duration, speed: u32) -> Duration {
    delay / speed.max(1)
}
