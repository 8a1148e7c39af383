//! Error merge policies
//!
//! After the control and group error lists are built, a single function
//! decides what the final list looks like. That function is the one override
//! point of the pipeline (`map_errors_fn` in the config); nothing normalizes
//! its output afterwards.
//!
//! # Examples
//!
//! ```
//! use formgate::blueprint::ValidationError;
//! use formgate::control::ControlSnapshot;
//! use formgate::merge::concat_errors;
//! use serde_json::json;
//!
//! let control = vec![ValidationError::new("required", "invalid", json!(true))];
//! let group = vec![ValidationError::new("mismatch", "invalid", json!(true))];
//!
//! let merged = concat_errors(control, group, &ControlSnapshot::new());
//! assert_eq!(merged[0].key(), "required");
//! assert_eq!(merged[1].key(), "mismatch");
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::blueprint::ValidationError;
use crate::control::ControlSource;
use crate::semigroup::Semigroup;

type MergeFn =
    dyn Fn(Vec<ValidationError>, Vec<ValidationError>, &dyn ControlSource) -> Vec<ValidationError>
        + Send
        + Sync;

/// A shareable merge policy.
///
/// Called as `f(control_errors, group_errors, control)`.
#[derive(Clone)]
pub struct MapErrorsFn(Arc<MergeFn>);

impl MapErrorsFn {
    /// Wrap a merge function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<ValidationError>, Vec<ValidationError>, &dyn ControlSource) -> Vec<ValidationError>
            + Send
            + Sync
            + 'static,
    {
        Self(Arc::new(f))
    }

    /// Run the policy.
    pub fn apply(
        &self,
        control_errors: Vec<ValidationError>,
        group_errors: Vec<ValidationError>,
        control: &dyn ControlSource,
    ) -> Vec<ValidationError> {
        (self.0)(control_errors, group_errors, control)
    }
}

impl Default for MapErrorsFn {
    fn default() -> Self {
        Self::new(concat_errors)
    }
}

impl fmt::Debug for MapErrorsFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MapErrorsFn").field(&"<fn>").finish()
    }
}

/// Control errors first, then group errors.
pub fn concat_errors(
    control_errors: Vec<ValidationError>,
    group_errors: Vec<ValidationError>,
    _control: &dyn ControlSource,
) -> Vec<ValidationError> {
    control_errors.combine(group_errors)
}

/// Like [`concat_errors`], but a group error is dropped when the control
/// already reports the same key.
pub fn control_first_unique_keys(
    control_errors: Vec<ValidationError>,
    group_errors: Vec<ValidationError>,
    _control: &dyn ControlSource,
) -> Vec<ValidationError> {
    let seen: HashSet<String> = control_errors.iter().map(|e| e.key().to_string()).collect();
    let group_errors = group_errors
        .into_iter()
        .filter(|e| !seen.contains(e.key()))
        .collect();
    control_errors.combine(group_errors)
}

/// Ignore group errors entirely.
pub fn control_only(
    control_errors: Vec<ValidationError>,
    _group_errors: Vec<ValidationError>,
    _control: &dyn ControlSource,
) -> Vec<ValidationError> {
    control_errors
}
