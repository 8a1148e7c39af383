//! Dedup/render gate
//!
//! The gate is the only stateful part of the pipeline. It remembers what it
//! last put on screen and turns each [`DisplayDecision`] into the minimal set
//! of renderer calls:
//!
//! ```text
//!            show, same errors: no-op
//!              ┌──────┐
//!              ▼      │
//! Hidden ──show──▶ Shown(serialized) ──hide──▶ Hidden
//!   ▲ │                │  show, new errors: teardown + insert
//!   └─┘ hide: no-op    │
//!                      └──destroy──▶ Destroyed (terminal)
//! ```
//!
//! Error lists are compared through their JSON serialization, which is
//! computed before any side effect so a failure leaves the gate untouched.
//!
//! # Examples
//!
//! ```
//! use formgate::blueprint::ValidationError;
//! use formgate::gate::{GateTransition, RenderGate, RenderSlot};
//! use formgate::policy::DisplayDecision;
//! use formgate::testing::RecordingRenderer;
//! use serde_json::json;
//!
//! let mut renderer = RecordingRenderer::new();
//! let mut gate = RenderGate::new(RenderSlot::at("input"));
//!
//! let decision = DisplayDecision {
//!     show: true,
//!     errors: vec![ValidationError::new("required", "invalid", json!(true))],
//! };
//!
//! assert_eq!(gate.apply(&decision, &mut renderer).unwrap(), GateTransition::Inserted);
//! assert_eq!(gate.apply(&decision, &mut renderer).unwrap(), GateTransition::Unchanged);
//! assert_eq!(renderer.inserted_count(), 1);
//! ```

use std::mem;

use crate::error::EngineError;
use crate::policy::DisplayDecision;
use crate::render::{Anchor, ErrorTemplate, Renderer};

/// Default class added to the marker element while errors are shown.
pub const DEFAULT_INVALID_CLASSES: &str = "is-invalid";

/// Memory of what was last rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedState {
    last_serialized_errors: String,
}

impl RenderedState {
    fn new(serialized: String) -> Self {
        Self {
            last_serialized_errors: serialized,
        }
    }

    /// The serialized error list currently on screen.
    pub fn last_serialized_errors(&self) -> &str {
        &self.last_serialized_errors
    }
}

/// Where and how the gate renders, resolved once per control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSlot {
    /// Element that receives the invalid classes.
    pub mark: Anchor,
    /// Element error views are inserted into.
    pub target: Anchor,
    /// What to render.
    pub template: ErrorTemplate,
    /// Whitespace-separated invalid classes.
    pub invalid_classes: String,
}

impl RenderSlot {
    /// Mark and insert at the same element, default template and classes.
    pub fn at(anchor: impl Into<Anchor>) -> Self {
        let anchor = anchor.into();
        Self {
            mark: anchor.clone(),
            target: anchor,
            template: ErrorTemplate::default(),
            invalid_classes: DEFAULT_INVALID_CLASSES.to_string(),
        }
    }
}

/// What one [`RenderGate::apply`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    /// Nothing changed on screen.
    Unchanged,
    /// Errors appeared where none were shown.
    Inserted,
    /// Shown errors were replaced by a different list.
    Replaced,
    /// Shown errors were removed.
    Cleared,
    /// The gate is destroyed; the decision was dropped.
    Ignored,
}

impl GateTransition {
    /// Returns true if the renderer was called.
    pub fn is_visible(self) -> bool {
        matches!(self, Self::Inserted | Self::Replaced | Self::Cleared)
    }
}

/// Coarse gate state, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStatus {
    /// No errors displayed.
    Hidden,
    /// Errors displayed.
    Shown,
    /// Torn down for good.
    Destroyed,
}

#[derive(Debug)]
enum GateState<V> {
    Hidden,
    Shown { rendered: RenderedState, view: V },
    Destroyed,
}

/// Per-control render state machine.
#[derive(Debug)]
pub struct RenderGate<V> {
    slot: RenderSlot,
    state: GateState<V>,
}

impl<V> RenderGate<V> {
    /// A hidden gate rendering into `slot`.
    pub fn new(slot: RenderSlot) -> Self {
        Self {
            slot,
            state: GateState::Hidden,
        }
    }

    /// The slot this gate renders into.
    pub fn slot(&self) -> &RenderSlot {
        &self.slot
    }

    /// Current coarse state.
    pub fn status(&self) -> GateStatus {
        match self.state {
            GateState::Hidden => GateStatus::Hidden,
            GateState::Shown { .. } => GateStatus::Shown,
            GateState::Destroyed => GateStatus::Destroyed,
        }
    }

    /// What is on screen, if anything.
    pub fn rendered(&self) -> Option<&RenderedState> {
        match &self.state {
            GateState::Shown { rendered, .. } => Some(rendered),
            _ => None,
        }
    }

    /// Feed one decision through the gate.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Serialization`] if the error list cannot be
    /// serialized. The gate and the screen are unchanged in that case.
    pub fn apply<R>(
        &mut self,
        decision: &DisplayDecision,
        renderer: &mut R,
    ) -> Result<GateTransition, EngineError>
    where
        R: Renderer<View = V> + ?Sized,
    {
        if matches!(self.state, GateState::Destroyed) {
            return Ok(GateTransition::Ignored);
        }

        let transition = if decision.show {
            let serialized = serde_json::to_string(&decision.errors)?;
            self.show(serialized, decision, renderer)
        } else {
            self.hide(renderer)
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            ?transition,
            show = decision.show,
            errors = decision.errors.len(),
            "render gate"
        );

        Ok(transition)
    }

    fn show<R>(
        &mut self,
        serialized: String,
        decision: &DisplayDecision,
        renderer: &mut R,
    ) -> GateTransition
    where
        R: Renderer<View = V> + ?Sized,
    {
        if let GateState::Shown { rendered, .. } = &self.state {
            if rendered.last_serialized_errors == serialized {
                return GateTransition::Unchanged;
            }
        }

        let replaced = match mem::replace(&mut self.state, GateState::Hidden) {
            GateState::Shown { view, .. } => {
                renderer.remove_errors(view);
                true
            }
            _ => false,
        };

        let view = renderer.insert_errors(&decision.errors, &self.slot.template, &self.slot.target);
        renderer.add_class(&self.slot.mark, &self.slot.invalid_classes);
        self.state = GateState::Shown {
            rendered: RenderedState::new(serialized),
            view,
        };

        if replaced {
            GateTransition::Replaced
        } else {
            GateTransition::Inserted
        }
    }

    /// Hiding while already hidden touches nothing, not even the invalid class.
    fn hide<R>(&mut self, renderer: &mut R) -> GateTransition
    where
        R: Renderer<View = V> + ?Sized,
    {
        match mem::replace(&mut self.state, GateState::Hidden) {
            GateState::Shown { view, .. } => {
                renderer.remove_errors(view);
                renderer.remove_class(&self.slot.mark, &self.slot.invalid_classes);
                GateTransition::Cleared
            }
            other => {
                self.state = other;
                GateTransition::Unchanged
            }
        }
    }

    /// Release everything the gate holds and move to the terminal state.
    ///
    /// Returns true on the first call. Later calls, and later
    /// [`apply`](Self::apply) calls, have no side effects.
    pub fn destroy<R>(&mut self, renderer: &mut R) -> bool
    where
        R: Renderer<View = V> + ?Sized,
    {
        match mem::replace(&mut self.state, GateState::Destroyed) {
            GateState::Shown { view, .. } => {
                renderer.remove_errors(view);
                renderer.remove_class(&self.slot.mark, &self.slot.invalid_classes);
                true
            }
            GateState::Hidden => true,
            GateState::Destroyed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::ValidationError;
    use crate::testing::{RecordingRenderer, RenderCall};
    use serde_json::json;

    fn errors(keys: &[&str]) -> Vec<ValidationError> {
        keys.iter()
            .map(|k| ValidationError::new(*k, "invalid", json!(true)))
            .collect()
    }

    fn shown(keys: &[&str]) -> DisplayDecision {
        DisplayDecision {
            show: true,
            errors: errors(keys),
        }
    }

    fn gate() -> RenderGate<usize> {
        RenderGate::new(RenderSlot::at("input"))
    }

    #[test]
    fn test_starts_hidden() {
        let gate = gate();
        assert_eq!(gate.status(), GateStatus::Hidden);
        assert!(gate.rendered().is_none());
    }

    #[test]
    fn test_hide_while_hidden_is_noop() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        let t = gate.apply(&DisplayDecision::hidden(), &mut renderer).unwrap();
        assert_eq!(t, GateTransition::Unchanged);
        assert!(renderer.calls().is_empty());
        assert_eq!(renderer.class_removes(), 0);
    }

    #[test]
    fn test_identical_show_is_suppressed() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        gate.apply(&shown(&["required"]), &mut renderer).unwrap();
        let t = gate.apply(&shown(&["required"]), &mut renderer).unwrap();

        assert_eq!(t, GateTransition::Unchanged);
        assert_eq!(renderer.inserted_count(), 1);
        assert_eq!(renderer.class_adds(), 1);
    }

    #[test]
    fn test_changed_errors_replace_view() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        gate.apply(&shown(&["required"]), &mut renderer).unwrap();
        let t = gate.apply(&shown(&["minlength"]), &mut renderer).unwrap();

        assert_eq!(t, GateTransition::Replaced);
        assert_eq!(
            renderer.calls(),
            &[
                RenderCall::Insert {
                    view: 0,
                    keys: vec!["required".to_string()],
                    target: Anchor::from("input"),
                },
                RenderCall::AddClass {
                    element: Anchor::from("input"),
                    classes: "is-invalid".to_string(),
                },
                RenderCall::Remove { view: 0 },
                RenderCall::Insert {
                    view: 1,
                    keys: vec!["minlength".to_string()],
                    target: Anchor::from("input"),
                },
                RenderCall::AddClass {
                    element: Anchor::from("input"),
                    classes: "is-invalid".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_reordered_errors_count_as_change() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        gate.apply(&shown(&["a", "b"]), &mut renderer).unwrap();
        let t = gate.apply(&shown(&["b", "a"]), &mut renderer).unwrap();
        assert_eq!(t, GateTransition::Replaced);
    }

    #[test]
    fn test_hide_after_show_clears() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        gate.apply(&shown(&["required"]), &mut renderer).unwrap();
        let t = gate.apply(&DisplayDecision::hidden(), &mut renderer).unwrap();

        assert_eq!(t, GateTransition::Cleared);
        assert_eq!(gate.status(), GateStatus::Hidden);
        assert_eq!(renderer.live_views(), 0);
        assert_eq!(renderer.class_removes(), 1);
    }

    #[test]
    fn test_show_after_clear_renders_again() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        gate.apply(&shown(&["required"]), &mut renderer).unwrap();
        gate.apply(&DisplayDecision::hidden(), &mut renderer).unwrap();
        let t = gate.apply(&shown(&["required"]), &mut renderer).unwrap();

        assert_eq!(t, GateTransition::Inserted);
        assert_eq!(renderer.inserted_count(), 2);
    }

    #[test]
    fn test_show_with_empty_list_is_honored() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        let decision = DisplayDecision {
            show: true,
            errors: Vec::new(),
        };
        let t = gate.apply(&decision, &mut renderer).unwrap();
        assert_eq!(t, GateTransition::Inserted);
        assert_eq!(gate.rendered().unwrap().last_serialized_errors(), "[]");
    }

    #[test]
    fn test_rendered_state_holds_serialization() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        gate.apply(&shown(&["required"]), &mut renderer).unwrap();
        assert_eq!(
            gate.rendered().unwrap().last_serialized_errors(),
            r#"[{"key":"required","message":"invalid","payload":true}]"#
        );
    }

    #[test]
    fn test_destroy_releases_view_once() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();

        gate.apply(&shown(&["required"]), &mut renderer).unwrap();
        assert!(gate.destroy(&mut renderer));
        assert!(!gate.destroy(&mut renderer));

        assert_eq!(gate.status(), GateStatus::Destroyed);
        assert_eq!(renderer.live_views(), 0);
        assert_eq!(renderer.removed_count(), 1);
    }

    #[test]
    fn test_destroyed_gate_ignores_decisions() {
        let mut renderer = RecordingRenderer::new();
        let mut gate = gate();
        gate.destroy(&mut renderer);

        let t = gate.apply(&shown(&["required"]), &mut renderer).unwrap();
        assert_eq!(t, GateTransition::Ignored);
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn test_custom_slot_routes_calls() {
        let mut renderer = RecordingRenderer::new();
        let slot = RenderSlot {
            mark: Anchor::from("group"),
            target: Anchor::from("errors"),
            template: ErrorTemplate::Template("inline".to_string()),
            invalid_classes: "has-error text-danger".to_string(),
        };
        let mut gate = RenderGate::new(slot);

        gate.apply(&shown(&["required"]), &mut renderer).unwrap();
        assert_eq!(
            renderer.calls()[1],
            RenderCall::AddClass {
                element: Anchor::from("group"),
                classes: "has-error text-danger".to_string(),
            }
        );
        assert!(renderer.has_class("group", "has-error"));
        assert!(renderer.has_class("group", "text-danger"));
    }
}
