//! Element resolution.
//!
//! Every lifecycle event resolves the fragment from scratch. Handles from a
//! previous resolution are never reused: after a swap they point at nodes
//! that are no longer in the page.

use crate::error::ElementError;
use crate::host::Document;
use crate::widget_config::WidgetConfig;

/// Optional audio elements of the fragment.
#[derive(Debug, Clone)]
pub struct AudioElements<E> {
    pub play: Option<E>,
    pub continue_: Option<E>,
    pub beep: Option<E>,
}

/// Snapshot of the handles and attributes the widget works with.
#[derive(Debug, Clone)]
pub struct ResolvedElements<E> {
    pub container: E,
    pub display: E,
    pub toggle: E,
    pub next_trigger: Option<E>,
    pub audio: AudioElements<E>,
    /// Next-level fetch target; empty when this is the last level.
    pub next_level_uri: String,
    /// Raw duration attribute; `"0"` when absent.
    pub duration_raw: String,
}

impl<E> ResolvedElements<E> {
    /// Level duration in whole seconds. Unparsable values count as zero.
    pub fn duration_secs(&self) -> u32 {
        parse_duration(&self.duration_raw).unwrap_or_else(|| {
            tracing::warn!(raw = %self.duration_raw, "unparsable level duration, using 0");
            0
        })
    }

    pub fn has_next_level(&self) -> bool {
        !self.next_level_uri.is_empty()
    }
}

/// Parse leading decimal digits, the way the server's `%v` floats read back:
/// `"300"` and `"300.0"` are both 300.
pub fn parse_duration(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

fn require<D: Document>(doc: &D, id: &str) -> Result<D::Element, ElementError> {
    doc.element_by_id(id).ok_or_else(|| {
        tracing::error!(id, "failed to fetch required element by id");
        ElementError::MissingElement { id: id.to_string() }
    })
}

/// Resolve the widget's elements from `doc`.
///
/// # Errors
///
/// Returns [`ElementError::MissingElement`] naming the first missing required
/// id (container, display, toggle, in that order).
pub fn fetch_elements<D: Document>(
    doc: &D,
    config: &WidgetConfig,
) -> Result<ResolvedElements<D::Element>, ElementError> {
    let ids = &config.ids;
    let attrs = &config.attributes;

    let container = require(doc, &ids.container)?;
    let display = require(doc, &ids.display)?;
    let toggle = require(doc, &ids.toggle)?;

    let next_trigger = doc.element_by_id(&ids.next_trigger);
    let next_level_uri = match &next_trigger {
        Some(trigger) => doc.attribute(trigger, &attrs.next_level).unwrap_or_else(|| {
            tracing::warn!(id = %ids.next_trigger, attr = %attrs.next_level, "next level trigger has no target");
            String::new()
        }),
        None => {
            tracing::debug!(id = %ids.next_trigger, "no next level trigger");
            String::new()
        }
    };

    let duration_raw = doc
        .attribute(&display, &attrs.duration)
        .filter(|raw| !raw.is_empty())
        .unwrap_or_else(|| {
            tracing::warn!(id = %ids.display, attr = %attrs.duration, "display has no duration, using 0");
            "0".to_string()
        });

    let audio = AudioElements {
        play: doc.element_by_id(&ids.audio_play),
        continue_: doc.element_by_id(&ids.audio_continue),
        beep: doc.element_by_id(&ids.audio_beep),
    };

    Ok(ResolvedElements {
        container,
        display,
        toggle,
        next_trigger,
        audio,
        next_level_uri,
        duration_raw,
    })
}
