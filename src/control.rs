//! Control state as seen by the engine
//!
//! The host's form library owns the real control. The engine only reads
//! three things from it on each pulse: the control's own error map, its
//! group's error map, and the dirty flag. [`ControlSource`] is that read-only
//! surface; [`ControlSnapshot`] is a plain-data implementation for hosts that
//! push state in, and for tests.
//!
//! # Examples
//!
//! ```
//! use formgate::control::{ControlSnapshot, ControlSource, ErrorMap};
//! use serde_json::json;
//!
//! let control = ControlSnapshot::new()
//!     .with_error("required", json!(true))
//!     .dirty(true);
//!
//! assert!(control.is_dirty());
//! assert_eq!(control.errors().map(|m| m.len()), Some(1));
//! assert_eq!(control.group().and_then(|g| g.errors), None);
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

/// Rule key to rule payload, in the order the validation system reported them.
pub type ErrorMap = serde_json::Map<String, Value>;

/// The group a control belongs to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupState {
    /// Cross-field errors reported on the group, if any.
    pub errors: Option<ErrorMap>,
}

impl GroupState {
    /// A group with no errors.
    pub fn valid() -> Self {
        Self::default()
    }

    /// A group carrying the given errors.
    pub fn with_errors(errors: ErrorMap) -> Self {
        Self {
            errors: Some(errors),
        }
    }
}

/// Read-only view of a form control.
pub trait ControlSource {
    /// The control's current error map, `None` when valid.
    fn errors(&self) -> Option<ErrorMap>;

    /// Whether the user has interacted with the control since the last reset.
    fn is_dirty(&self) -> bool;

    /// The enclosing group, `None` if the control is not inside one.
    ///
    /// Evaluating a control without a group is a programmer error.
    fn group(&self) -> Option<GroupState>;
}

impl<C: ControlSource + ?Sized> ControlSource for &C {
    fn errors(&self) -> Option<ErrorMap> {
        (**self).errors()
    }

    fn is_dirty(&self) -> bool {
        (**self).is_dirty()
    }

    fn group(&self) -> Option<GroupState> {
        (**self).group()
    }
}

impl<C: ControlSource + ?Sized> ControlSource for Rc<RefCell<C>> {
    fn errors(&self) -> Option<ErrorMap> {
        self.borrow().errors()
    }

    fn is_dirty(&self) -> bool {
        self.borrow().is_dirty()
    }

    fn group(&self) -> Option<GroupState> {
        self.borrow().group()
    }
}

/// Plain-data control state.
///
/// Starts valid, pristine and inside an error-free group.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSnapshot {
    errors: Option<ErrorMap>,
    dirty: bool,
    group: Option<GroupState>,
}

impl Default for ControlSnapshot {
    fn default() -> Self {
        Self {
            errors: None,
            dirty: false,
            group: Some(GroupState::valid()),
        }
    }
}

impl ControlSnapshot {
    /// A valid, pristine control inside a valid group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a failing rule to the control.
    pub fn with_error(mut self, key: impl Into<String>, payload: Value) -> Self {
        self.errors
            .get_or_insert_with(ErrorMap::new)
            .insert(key.into(), payload);
        self
    }

    /// Add a failing rule to the enclosing group.
    pub fn with_group_error(mut self, key: impl Into<String>, payload: Value) -> Self {
        self.group
            .get_or_insert_with(GroupState::valid)
            .errors
            .get_or_insert_with(ErrorMap::new)
            .insert(key.into(), payload);
        self
    }

    /// Set the dirty flag.
    pub fn dirty(mut self, dirty: bool) -> Self {
        self.dirty = dirty;
        self
    }

    /// Detach the control from its group.
    pub fn without_group(mut self) -> Self {
        self.group = None;
        self
    }

    /// Replace the control's error map.
    pub fn set_errors(&mut self, errors: Option<ErrorMap>) {
        self.errors = errors;
    }

    /// Replace the group's error map.
    pub fn set_group_errors(&mut self, errors: Option<ErrorMap>) {
        self.group.get_or_insert_with(GroupState::valid).errors = errors;
    }

    /// Update the dirty flag in place.
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

impl ControlSource for ControlSnapshot {
    fn errors(&self) -> Option<ErrorMap> {
        self.errors.clone()
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn group(&self) -> Option<GroupState> {
        self.group.clone()
    }
}
