//! `tracing` output for the browser console.
//!
//! Each formatted event is buffered and written with the console method
//! matching its level when the writer is dropped.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;
use wasm_bindgen::JsValue;

pub const DEFAULT_FILTER: &str = "warn";

pub struct ConsoleWriter {
    level: Level,
    buf: Vec<u8>,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        let line = console_line(&self.buf);
        if line.is_empty() {
            return;
        }
        let line = JsValue::from(line);
        match self.level {
            Level::ERROR => web_sys::console::error_1(&line),
            Level::WARN => web_sys::console::warn_1(&line),
            Level::INFO => web_sys::console::info_1(&line),
            _ => web_sys::console::debug_1(&line),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MakeConsoleWriter;

impl<'a> MakeWriter<'a> for MakeConsoleWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buf: Vec::new(),
        }
    }
}

fn console_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf).trim_end().to_string()
}

/// Parse a filter directive, falling back to [`DEFAULT_FILTER`].
pub fn filter_from(directive: Option<&str>) -> EnvFilter {
    directive
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the console subscriber. Later calls are ignored.
pub fn init(directive: Option<&str>) {
    console_error_panic_hook::set_once();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from(directive))
        .with_writer(MakeConsoleWriter)
        .with_ansi(false)
        .without_time()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_line_drops_trailing_newline() {
        assert_eq!(console_line(b" WARN tick ignored\n"), " WARN tick ignored");
        assert_eq!(console_line(b"\n"), "");
    }

    #[test]
    fn invalid_directive_falls_back() {
        assert_eq!(filter_from(Some("blindclock=loud")).to_string(), DEFAULT_FILTER);
        assert_eq!(filter_from(None).to_string(), DEFAULT_FILTER);
        assert_eq!(filter_from(Some("debug")).to_string(), "debug");
    }
}
