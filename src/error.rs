//! Engine error types.
//!
//! Everything the engine does is pure computation over state that is already
//! available, so there are no transient failures to retry. An [`EngineError`]
//! is either a configuration problem (a blueprint that cannot render its
//! message) or a programmer error (evaluating without a control attached).
//!
//! # Examples
//!
//! ```
//! use formgate::EngineError;
//!
//! let err = EngineError::configuration("minlength", "payload has no requiredLength");
//! assert!(err.is_configuration());
//! assert_eq!(
//!     err.to_string(),
//!     "blueprint for 'minlength' failed: payload has no requiredLength"
//! );
//! ```

use std::fmt;

/// Error returned by an evaluation or by configuration setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A blueprint could not produce a message for its rule.
    ///
    /// The gate is left untouched, so a later pulse with valid input recovers.
    Configuration {
        /// The rule whose blueprint failed.
        key: String,
        /// What went wrong, as reported by the blueprint.
        reason: String,
    },
    /// Evaluation was requested without a control or group context.
    MissingControl {
        /// Which part of the context was absent.
        context: &'static str,
    },
    /// The engine was detached; its display is gone for good.
    Detached,
    /// The error list could not be serialized for comparison.
    Serialization(String),
    /// A process-wide default configuration was already installed.
    DefaultConfigInstalled,
}

impl EngineError {
    /// Create a configuration error for the given rule.
    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-control error.
    pub fn missing_control(context: &'static str) -> Self {
        Self::MissingControl { context }
    }

    /// Returns true if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    /// Returns true if the engine was used after being detached.
    pub fn is_detached(&self) -> bool {
        matches!(self, Self::Detached)
    }

    /// Returns true if the engine was used without a control attached.
    pub fn is_missing_control(&self) -> bool {
        matches!(self, Self::MissingControl { .. })
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { key, reason } => {
                write!(f, "blueprint for '{}' failed: {}", key, reason)
            }
            Self::MissingControl { context } => {
                write!(f, "no {} attached to the validation engine", context)
            }
            Self::Detached => write!(f, "validation engine was detached"),
            Self::Serialization(reason) => {
                write!(f, "could not serialize validation errors: {}", reason)
            }
            Self::DefaultConfigInstalled => {
                write!(f, "default validation config is already installed")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
