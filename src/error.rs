// src/error.rs

//! Unified error handling for the harvester.

use std::fmt;

use thiserror::Error;

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Network or HTTP failure
    #[error("Transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// Source layout did not match the adapter's expectations
    #[error("Parsing error in {context}: {message}")]
    Parsing { context: String, message: String },

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Archive write failed
    #[error("Saving error for {path}: {message}")]
    Saving { path: String, message: String },

    /// Archive read failed
    #[error("Reading error for {path}: {message}")]
    Reading { path: String, message: String },

    /// Ledger persistence failed
    #[error("Ledger error: {0}")]
    Ledger(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// No registered source adapter handles the requested URL
    #[error("No source adapter found for '{input}'")]
    NoAdapter { input: String },
}

impl AppError {
    /// Create a transport error for a URL.
    pub fn transport(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parsing error with context.
    pub fn parsing(context: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parsing {
            context: context.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create an archive saving error.
    pub fn saving(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Saving {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create an archive reading error.
    pub fn reading(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        Self::Reading {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a "no adapter" error for an unknown source.
    pub fn no_adapter(input: impl Into<String>) -> Self {
        Self::NoAdapter {
            input: input.into(),
        }
    }

    /// Errors that must abort a run before any work starts.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Validation(_) | Self::NoAdapter { .. } | Self::Toml(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_adapter_is_config_error() {
        assert!(AppError::no_adapter("example.org").is_config_error());
        assert!(AppError::config("missing").is_config_error());
    }

    #[test]
    fn test_item_errors_are_not_config_errors() {
        assert!(!AppError::transport("https://a.test", "timeout").is_config_error());
        assert!(!AppError::parsing("listing", "no rows").is_config_error());
        assert!(!AppError::saving("/tmp/x.zip", "disk full").is_config_error());
    }

    #[test]
    fn test_display_includes_context() {
        let err = AppError::parsing("tag bitcoin", "missing title");
        assert_eq!(err.to_string(), "Parsing error in tag bitcoin: missing title");
    }
}
