//! Visibility policy
//!
//! Errors are only surfaced on fields the user has touched, except at
//! submission time, when every invalid field is revealed.

use crate::blueprint::ValidationError;
use crate::pulse::EvaluationPulse;

/// The engine's output for one evaluation cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayDecision {
    /// Whether errors should be on screen.
    pub show: bool,
    /// The merged error list.
    pub errors: Vec<ValidationError>,
}

impl DisplayDecision {
    /// Apply [`decide`] to a merged error list.
    pub fn new(errors: Vec<ValidationError>, pulse: EvaluationPulse, is_dirty: bool) -> Self {
        let show = decide(&errors, pulse, is_dirty);
        Self { show, errors }
    }

    /// A decision that hides everything.
    pub fn hidden() -> Self {
        Self {
            show: false,
            errors: Vec::new(),
        }
    }
}

/// Decide whether errors should be displayed now.
///
/// True iff there is at least one error and the control is dirty or the
/// pulse came from a submission.
///
/// # Examples
///
/// ```
/// use formgate::blueprint::ValidationError;
/// use formgate::policy::decide;
/// use formgate::pulse::EvaluationPulse;
/// use serde_json::json;
///
/// let errors = vec![ValidationError::new("required", "invalid", json!(true))];
///
/// assert!(decide(&errors, EvaluationPulse::Submit, false));
/// assert!(!decide(&errors, EvaluationPulse::Status, false));
/// assert!(decide(&errors, EvaluationPulse::Value, true));
/// assert!(!decide(&[], EvaluationPulse::Submit, true));
/// ```
pub fn decide(errors: &[ValidationError], pulse: EvaluationPulse, is_dirty: bool) -> bool {
    !errors.is_empty() && (is_dirty || pulse.is_submit())
}
