//! Core error types for blindclock-core.
//!
//! Nothing in here is fatal to a running countdown: the controller logs these
//! and carries on with whatever generation it still has.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for blindclock-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Element resolution errors
    #[error("Element error: {0}")]
    Element(#[from] ElementError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Failures while resolving the widget's DOM handles.
///
/// Only required handles produce an error; optional ones degrade to a
/// default inside [`crate::elements::fetch_elements`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ElementError {
    /// A required element id is not present in the document
    #[error("required element #{id} not found")]
    MissingElement { id: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-separated key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_element_names_the_id() {
        let err = ElementError::MissingElement {
            id: "toggle-timer-button".into(),
        };
        assert_eq!(err.to_string(), "required element #toggle-timer-button not found");
    }

    #[test]
    fn element_error_converts_into_core_error() {
        let err: CoreError = ElementError::MissingElement { id: "timer".into() }.into();
        assert!(matches!(err, CoreError::Element(_)));
        assert!(err.to_string().contains("#timer"));
    }
}
