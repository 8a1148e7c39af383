//! Evaluation pulses
//!
//! A pulse is one trigger that makes the engine re-evaluate a control. Only
//! its origin matters: a submit pulse reveals errors on pristine controls,
//! status and value pulses do not.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The origin of one re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationPulse {
    /// The control's validity status changed.
    Status,
    /// The control's value changed.
    Value,
    /// The enclosing form was submitted.
    Submit,
}

impl EvaluationPulse {
    /// Returns true for pulses that force errors to display.
    pub fn is_submit(self) -> bool {
        matches!(self, Self::Submit)
    }
}

impl fmt::Display for EvaluationPulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Status => "status",
            Self::Value => "value",
            Self::Submit => "submit",
        };
        f.write_str(name)
    }
}

/// A raw notification from the host's form library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlEvent {
    /// Validity status changed.
    StatusChanged,
    /// Value changed.
    ValueChanged,
    /// The form was submitted.
    FormSubmitted,
}

/// Map a host notification to a pulse.
///
/// Submissions only become pulses when `validate_on_submit` is enabled.
///
/// # Examples
///
/// ```
/// use formgate::pulse::{pulse_for, ControlEvent, EvaluationPulse};
///
/// assert_eq!(pulse_for(ControlEvent::ValueChanged, false), Some(EvaluationPulse::Value));
/// assert_eq!(pulse_for(ControlEvent::FormSubmitted, true), Some(EvaluationPulse::Submit));
/// assert_eq!(pulse_for(ControlEvent::FormSubmitted, false), None);
/// ```
pub fn pulse_for(event: ControlEvent, validate_on_submit: bool) -> Option<EvaluationPulse> {
    match event {
        ControlEvent::StatusChanged => Some(EvaluationPulse::Status),
        ControlEvent::ValueChanged => Some(EvaluationPulse::Value),
        ControlEvent::FormSubmitted if validate_on_submit => Some(EvaluationPulse::Submit),
        ControlEvent::FormSubmitted => None,
    }
}
