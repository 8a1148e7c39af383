//! Configuration resolution
//!
//! Configuration comes in two layers:
//!
//! - a process-wide default, installed once at application start with
//!   [`install_default`] and read-only afterwards;
//! - per-control [`ConfigOverrides`], supplied when a control is attached.
//!
//! Overrides win field by field. Blueprints are layered per rule key, so an
//! override that only customizes `"required"` keeps the default messages for
//! every other rule.
//!
//! # Examples
//!
//! ```
//! use formgate::config::{ConfigOverrides, ValidationConfig};
//!
//! let base = ValidationConfig::new().with_invalid_classes("has-error");
//! let overrides = ConfigOverrides::new().with_validate_on_submit(true);
//!
//! let resolved = base.merged(&overrides);
//! assert_eq!(resolved.invalid_classes, "has-error");
//! assert!(resolved.validate_on_submit);
//! ```

use std::sync::OnceLock;

use serde::Deserialize;

use crate::blueprint::{Blueprints, ValidationError};
use crate::control::ControlSource;
use crate::error::EngineError;
use crate::gate::DEFAULT_INVALID_CLASSES;
use crate::merge::MapErrorsFn;
use crate::render::ErrorTemplate;

static DEFAULT_CONFIG: OnceLock<ValidationConfig> = OnceLock::new();

/// Install the process-wide default configuration.
///
/// # Errors
///
/// Returns [`EngineError::DefaultConfigInstalled`] if a default was already
/// installed, or if [`ValidationConfig::global`] was read before this call.
pub fn install_default(config: ValidationConfig) -> Result<(), EngineError> {
    DEFAULT_CONFIG
        .set(config)
        .map_err(|_| EngineError::DefaultConfigInstalled)
}

/// Fully resolved configuration for one control.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Message blueprints per rule key.
    pub blueprints: Blueprints,
    /// Classes put on the marker element while errors are shown.
    pub invalid_classes: String,
    /// Merge policy for control and group errors.
    pub map_errors_fn: MapErrorsFn,
    /// Selector for the ancestor that should carry the invalid classes.
    pub target_selector: Option<String>,
    /// Whether form submission triggers evaluation.
    pub validate_on_submit: bool,
    /// What the renderer instantiates to show errors.
    pub error_template: ErrorTemplate,
    /// Drop every pulse without evaluating.
    pub skip_validation: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            blueprints: Blueprints::new(),
            invalid_classes: DEFAULT_INVALID_CLASSES.to_string(),
            map_errors_fn: MapErrorsFn::default(),
            target_selector: None,
            validate_on_submit: false,
            error_template: ErrorTemplate::default(),
            skip_validation: false,
        }
    }
}

impl ValidationConfig {
    /// The built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// The installed process-wide default, or the built-in one.
    pub fn global() -> &'static ValidationConfig {
        DEFAULT_CONFIG.get_or_init(ValidationConfig::default)
    }

    /// The process-wide default with `overrides` applied.
    pub fn resolve(overrides: &ConfigOverrides) -> ValidationConfig {
        Self::global().merged(overrides)
    }

    /// Replace the blueprints.
    pub fn with_blueprints(mut self, blueprints: Blueprints) -> Self {
        self.blueprints = blueprints;
        self
    }

    /// Replace the invalid classes.
    pub fn with_invalid_classes(mut self, classes: impl Into<String>) -> Self {
        self.invalid_classes = classes.into();
        self
    }

    /// Replace the merge policy.
    pub fn with_map_errors_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<ValidationError>, Vec<ValidationError>, &dyn ControlSource) -> Vec<ValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.map_errors_fn = MapErrorsFn::new(f);
        self
    }

    /// Set the marker selector.
    pub fn with_target_selector(mut self, selector: impl Into<String>) -> Self {
        self.target_selector = Some(selector.into());
        self
    }

    /// Enable or disable submit pulses.
    pub fn with_validate_on_submit(mut self, enabled: bool) -> Self {
        self.validate_on_submit = enabled;
        self
    }

    /// Replace the error template.
    pub fn with_error_template(mut self, template: ErrorTemplate) -> Self {
        self.error_template = template;
        self
    }

    /// Enable or disable skipping.
    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = skip;
        self
    }

    /// A copy of this config with `overrides` applied.
    pub fn merged(&self, overrides: &ConfigOverrides) -> ValidationConfig {
        let blueprints = match &overrides.blueprints {
            Some(local) => self.blueprints.clone().layered(local),
            None => self.blueprints.clone(),
        };

        ValidationConfig {
            blueprints,
            invalid_classes: overrides
                .invalid_classes
                .clone()
                .unwrap_or_else(|| self.invalid_classes.clone()),
            map_errors_fn: overrides
                .map_errors_fn
                .clone()
                .unwrap_or_else(|| self.map_errors_fn.clone()),
            target_selector: overrides
                .target_selector
                .clone()
                .or_else(|| self.target_selector.clone()),
            validate_on_submit: overrides
                .validate_on_submit
                .unwrap_or(self.validate_on_submit),
            error_template: overrides
                .error_template
                .clone()
                .unwrap_or_else(|| self.error_template.clone()),
            skip_validation: overrides.skip_validation.unwrap_or(self.skip_validation),
        }
    }
}

/// A partial configuration. Unset fields fall through to the layer below.
///
/// Deserializes from camelCase JSON; `map_errors_fn` can only be set in code.
///
/// # Examples
///
/// ```
/// use formgate::config::ConfigOverrides;
///
/// let overrides: ConfigOverrides = serde_json::from_str(r#"{
///     "invalidClasses": "is-invalid shake",
///     "validateOnSubmit": true,
///     "blueprints": { "required": "Required" }
/// }"#).unwrap();
///
/// assert_eq!(overrides.validate_on_submit, Some(true));
/// assert!(overrides.target_selector.is_none());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigOverrides {
    /// Blueprints layered over the base per key.
    pub blueprints: Option<Blueprints>,
    /// Replacement invalid classes.
    pub invalid_classes: Option<String>,
    /// Replacement merge policy.
    #[serde(skip)]
    pub map_errors_fn: Option<MapErrorsFn>,
    /// Replacement marker selector.
    pub target_selector: Option<String>,
    /// Replacement submit flag.
    pub validate_on_submit: Option<bool>,
    /// Replacement error template.
    pub error_template: Option<ErrorTemplate>,
    /// Replacement skip flag.
    pub skip_validation: Option<bool>,
}

impl ConfigOverrides {
    /// No overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override blueprints.
    pub fn with_blueprints(mut self, blueprints: Blueprints) -> Self {
        self.blueprints = Some(blueprints);
        self
    }

    /// Override invalid classes.
    pub fn with_invalid_classes(mut self, classes: impl Into<String>) -> Self {
        self.invalid_classes = Some(classes.into());
        self
    }

    /// Override the merge policy.
    pub fn with_map_errors_fn(mut self, f: MapErrorsFn) -> Self {
        self.map_errors_fn = Some(f);
        self
    }

    /// Override the marker selector.
    pub fn with_target_selector(mut self, selector: impl Into<String>) -> Self {
        self.target_selector = Some(selector.into());
        self
    }

    /// Override the submit flag.
    pub fn with_validate_on_submit(mut self, enabled: bool) -> Self {
        self.validate_on_submit = Some(enabled);
        self
    }

    /// Override the error template.
    pub fn with_error_template(mut self, template: ErrorTemplate) -> Self {
        self.error_template = Some(template);
        self
    }

    /// Override the skip flag.
    pub fn with_skip_validation(mut self, skip: bool) -> Self {
        self.skip_validation = Some(skip);
        self
    }

    /// Stack a closer-scoped layer on top of this one.
    ///
    /// Fields set in `closer` win; blueprints are layered per key.
    pub fn then(self, closer: ConfigOverrides) -> ConfigOverrides {
        let blueprints = match (self.blueprints, closer.blueprints) {
            (Some(outer), Some(inner)) => Some(outer.layered(&inner)),
            (outer, inner) => inner.or(outer),
        };

        ConfigOverrides {
            blueprints,
            invalid_classes: closer.invalid_classes.or(self.invalid_classes),
            map_errors_fn: closer.map_errors_fn.or(self.map_errors_fn),
            target_selector: closer.target_selector.or(self.target_selector),
            validate_on_submit: closer.validate_on_submit.or(self.validate_on_submit),
            error_template: closer.error_template.or(self.error_template),
            skip_validation: closer.skip_validation.or(self.skip_validation),
        }
    }
}
