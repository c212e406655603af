//! Tournament blind structures.
//!
//! A structure is an ordered list of blind and break levels. The widget only
//! ever sees one level at a time, as a fragment carrying that level's
//! duration; structures are what the fragment renderer walks through.

use serde::{Deserialize, Serialize};

use crate::countdown::format_remaining;
use crate::error::{Result, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelType {
    Blind,
    Break,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    #[serde(rename = "type", default = "default_level_type")]
    pub level_type: LevelType,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub small_blind: u64,
    #[serde(default)]
    pub big_blind: u64,
    #[serde(default)]
    pub ante: u64,
    #[serde(default)]
    pub duration_min: u32,
    #[serde(default)]
    pub duration_sec: u32,
}

fn default_level_type() -> LevelType {
    LevelType::Blind
}

impl Level {
    /// Total level duration in seconds.
    pub fn duration_secs(&self) -> u32 {
        self.duration_min
            .saturating_mul(60)
            .saturating_add(self.duration_sec)
    }

    /// The pre-rendered `MM:SS` text a fresh fragment shows.
    pub fn display(&self) -> String {
        let secs = self.duration_secs();
        format_remaining(secs, secs > crate::countdown::SECS_PER_HOUR)
    }

    /// Short human label, e.g. `Level 3: 100/200 (ante 25)` or `Break`.
    pub fn label(&self) -> String {
        match self.level_type {
            LevelType::Break => "Break".to_string(),
            LevelType::Blind if self.ante > 0 => format!(
                "Level {}: {}/{} (ante {})",
                self.level, self.small_blind, self.big_blind, self.ante
            ),
            LevelType::Blind => format!(
                "Level {}: {}/{}",
                self.level, self.small_blind, self.big_blind
            ),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.level_type == LevelType::Blind && self.small_blind > self.big_blind {
            return Err(ValidationError::InvalidValue {
                field: "small_blind".into(),
                message: "small blind cannot be greater than big blind".into(),
            });
        }
        if self.duration_secs() == 0 {
            return Err(ValidationError::InvalidValue {
                field: "duration_min".into(),
                message: "duration must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub name: String,
    #[serde(default)]
    pub levels: Vec<Level>,
}

impl Structure {
    /// Parse and validate a structure from TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or the structure is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let structure: Structure = toml::from_str(content)?;
        structure.validate()?;
        Ok(structure)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.chars().count() < 3 {
            return Err(ValidationError::InvalidValue {
                field: "name".into(),
                message: "name must be 3 or more characters in length".into(),
            });
        }
        if self.levels.is_empty() {
            return Err(ValidationError::EmptyCollection("levels".into()));
        }
        for (index, level) in self.levels.iter().enumerate() {
            level.validate().map_err(|e| match e {
                ValidationError::InvalidValue { field, message } => ValidationError::InvalidValue {
                    field: format!("levels[{index}].{field}"),
                    message,
                },
                other => other,
            })?;
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    pub fn is_last(&self, index: usize) -> bool {
        index + 1 >= self.levels.len()
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.levels.iter().map(|l| u64::from(l.duration_secs())).sum()
    }
}
