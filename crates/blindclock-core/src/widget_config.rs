//! TOML-based widget configuration.
//!
//! Everything the widget looks up or writes in the page is named here:
//! - Element ids of the timer fragment
//! - Attribute names carrying the duration and next-level target
//! - CSS classes of the toggle control and the display
//! - Timing knobs (beep threshold, delay before fetching the next level)
//!
//! The defaults match the fragments rendered by the tournament server.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, CoreError, Result};

/// Element ids of the timer fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementIds {
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default = "default_display")]
    pub display: String,
    #[serde(default = "default_toggle")]
    pub toggle: String,
    #[serde(default = "default_next_trigger")]
    pub next_trigger: String,
    #[serde(default = "default_audio_play")]
    pub audio_play: String,
    #[serde(default = "default_audio_continue")]
    pub audio_continue: String,
    #[serde(default = "default_audio_beep")]
    pub audio_beep: String,
}

/// Attribute names read from the fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeNames {
    #[serde(default = "default_duration_attr")]
    pub duration: String,
    #[serde(default = "default_next_level_attr")]
    pub next_level: String,
}

/// CSS classes toggled by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassNames {
    #[serde(default = "default_play_class")]
    pub play: String,
    #[serde(default = "default_stop_class")]
    pub stop: String,
    #[serde(default = "default_running_font")]
    pub running_font: String,
    #[serde(default = "default_complete_font")]
    pub complete_font: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Remaining seconds at which the beep cue plays. `0` disables it.
    #[serde(default = "default_beep_at")]
    pub beep_at_secs: u32,
    /// Delay between completion and the next-level fetch.
    #[serde(default = "default_next_level_delay")]
    pub next_level_delay_ms: u64,
    /// Query appended to the next-level target on completion.
    #[serde(default = "default_proceed_query")]
    pub proceed_query: String,
}

/// Widget configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub ids: ElementIds,
    #[serde(default)]
    pub attributes: AttributeNames,
    #[serde(default)]
    pub classes: ClassNames,
    #[serde(default)]
    pub timing: TimingConfig,
    /// Display text once the final level has run out.
    #[serde(default = "default_complete_text")]
    pub complete_text: String,
}

// Default functions
fn default_container() -> String {
    "timer-container".into()
}
fn default_display() -> String {
    "timer".into()
}
fn default_toggle() -> String {
    "toggle-timer-button".into()
}
fn default_next_trigger() -> String {
    "trigger-next-timer-level".into()
}
fn default_audio_play() -> String {
    "audio-play".into()
}
fn default_audio_continue() -> String {
    "audio-continue".into()
}
fn default_audio_beep() -> String {
    "audio-beep".into()
}
fn default_duration_attr() -> String {
    "data-level-duration-sec".into()
}
fn default_next_level_attr() -> String {
    "hx-get".into()
}
fn default_play_class() -> String {
    "fa-circle-play".into()
}
fn default_stop_class() -> String {
    "fa-circle-stop".into()
}
fn default_running_font() -> String {
    "timer-large-font".into()
}
fn default_complete_font() -> String {
    "timer-complete-font".into()
}
fn default_beep_at() -> u32 {
    11
}
fn default_next_level_delay() -> u64 {
    1000
}
fn default_proceed_query() -> String {
    "proceed=true".into()
}
fn default_complete_text() -> String {
    "Timer Complete".into()
}

impl Default for ElementIds {
    fn default() -> Self {
        Self {
            container: default_container(),
            display: default_display(),
            toggle: default_toggle(),
            next_trigger: default_next_trigger(),
            audio_play: default_audio_play(),
            audio_continue: default_audio_continue(),
            audio_beep: default_audio_beep(),
        }
    }
}

impl Default for AttributeNames {
    fn default() -> Self {
        Self {
            duration: default_duration_attr(),
            next_level: default_next_level_attr(),
        }
    }
}

impl Default for ClassNames {
    fn default() -> Self {
        Self {
            play: default_play_class(),
            stop: default_stop_class(),
            running_font: default_running_font(),
            complete_font: default_complete_font(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            beep_at_secs: default_beep_at(),
            next_level_delay_ms: default_next_level_delay(),
            proceed_query: default_proceed_query(),
        }
    }
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            ids: ElementIds::default(),
            attributes: AttributeNames::default(),
            classes: ClassNames::default(),
            timing: TimingConfig::default(),
            complete_text: default_complete_text(),
        }
    }
}

impl WidgetConfig {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let (parents, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (Some(parents), leaf),
            None => (None, key),
        };
        if leaf.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        for part in parents.into_iter().flat_map(|p| p.split('.')) {
            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        let obj = current.as_object_mut().ok_or_else(unknown)?;
        let existing = obj.get(leaf).ok_or_else(unknown)?;
        let new_value = match existing {
            serde_json::Value::Number(_) => value
                .parse::<u64>()
                .map(|n| serde_json::Value::Number(n.into()))
                .map_err(|e| invalid(e.to_string()))?,
            serde_json::Value::Bool(_) => value
                .parse::<bool>()
                .map(serde_json::Value::Bool)
                .map_err(|e| invalid(e.to_string()))?,
            serde_json::Value::Object(_) => return Err(invalid("not a leaf value".into())),
            _ => serde_json::Value::String(value.into()),
        };
        obj.insert(leaf.to_string(), new_value);
        Ok(())
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| {
            CoreError::Config(ConfigError::InvalidValue {
                key: String::new(),
                message: e.to_string(),
            })
        })
    }

    /// Load from `path`, or return the default when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_toml_str(&content).map_err(|e| {
                CoreError::Config(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| {
            CoreError::Config(ConfigError::SaveFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        })
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by dot-separated key. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value has the wrong type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    #[test]
    fn default_config_roundtrip() {
        let cfg = WidgetConfig::default();
        let toml_str = cfg.to_toml_string().unwrap();
        let parsed = WidgetConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.ids.toggle, "toggle-timer-button");
        assert_eq!(parsed.timing.beep_at_secs, 11);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = WidgetConfig::from_toml_str(indoc! {r#"
            complete_text = "Game Over"

            [timing]
            next_level_delay_ms = 0
        "#})
        .unwrap();
        assert_eq!(cfg.complete_text, "Game Over");
        assert_eq!(cfg.timing.next_level_delay_ms, 0);
        assert_eq!(cfg.timing.beep_at_secs, 11);
        assert_eq!(cfg.ids.display, "timer");
    }

    #[test]
    fn get_by_dot_path() {
        let cfg = WidgetConfig::default();
        assert_eq!(cfg.get("ids.container").as_deref(), Some("timer-container"));
        assert_eq!(cfg.get("timing.beep_at_secs").as_deref(), Some("11"));
        assert_eq!(cfg.get("ids.nope"), None);
        assert_eq!(cfg.get(""), None);
    }

    #[test]
    fn set_by_dot_path() {
        let mut cfg = WidgetConfig::default();
        cfg.set("timing.beep_at_secs", "0").unwrap();
        cfg.set("classes.play", "icon-play").unwrap();
        cfg.set("complete_text", "Done").unwrap();
        assert_eq!(cfg.timing.beep_at_secs, 0);
        assert_eq!(cfg.classes.play, "icon-play");
        assert_eq!(cfg.complete_text, "Done");
    }

    #[test]
    fn set_rejects_unknown_and_mistyped() {
        let mut cfg = WidgetConfig::default();
        assert!(cfg.set("timing.nope", "1").is_err());
        assert!(cfg.set("timing.beep_at_secs", "soon").is_err());
        assert!(cfg.set("timing", "1").is_err());
        assert_eq!(cfg, WidgetConfig::default());
    }

    #[test]
    fn load_missing_file_is_default() {
        let path = std::env::temp_dir().join("blindclock-does-not-exist/config.toml");
        let cfg = WidgetConfig::load_from(&path).unwrap();
        assert_eq!(cfg, WidgetConfig::default());
    }
}
