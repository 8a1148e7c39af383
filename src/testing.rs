//! Testing utilities
//!
//! Helpers for exercising the engine without a real UI: a renderer that
//! records every call it receives, assertion macros for evaluations, and
//! (with the `proptest` feature) `Arbitrary` support for pulses.
//!
//! # Examples
//!
//! ```rust
//! use formgate::prelude::*;
//! use formgate::testing::RecordingRenderer;
//! use formgate::{assert_hidden, assert_shown};
//! use serde_json::json;
//!
//! let control = ControlSnapshot::new().with_error("required", json!(true));
//! let mut engine = ValidationEngine::new(
//!     ValidationConfig::new(),
//!     RecordingRenderer::new(),
//!     &Placement::new("name"),
//! )
//! .with_control(control);
//!
//! assert_hidden!(engine.evaluate(EvaluationPulse::Value).unwrap());
//! assert_shown!(engine.evaluate(EvaluationPulse::Submit).unwrap());
//! assert_eq!(engine.renderer().inserted_count(), 1);
//! ```

use std::collections::{BTreeSet, HashMap};

use crate::blueprint::ValidationError;
use crate::render::{Anchor, ErrorTemplate, Renderer};

/// One call received by a [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderCall {
    /// An error view was inserted.
    Insert {
        /// Id handed back as the view.
        view: usize,
        /// Keys of the rendered errors, in order.
        keys: Vec<String>,
        /// Where it was inserted.
        target: Anchor,
    },
    /// An error view was removed.
    Remove {
        /// The view removed.
        view: usize,
    },
    /// Classes were added.
    AddClass {
        /// Element touched.
        element: Anchor,
        /// Classes as passed.
        classes: String,
    },
    /// Classes were removed.
    RemoveClass {
        /// Element touched.
        element: Anchor,
        /// Classes as passed.
        classes: String,
    },
}

/// A [`Renderer`] that records calls and tracks the resulting "screen".
///
/// Views are numbered from zero in insertion order.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    calls: Vec<RenderCall>,
    next_view: usize,
    live: BTreeSet<usize>,
    classes: HashMap<Anchor, BTreeSet<String>>,
    ancestors: HashMap<(Anchor, String), Anchor>,
    templates: Vec<ErrorTemplate>,
}

impl RecordingRenderer {
    /// A renderer with an empty screen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `closest(from, selector)` resolves to `ancestor`.
    pub fn with_ancestor(
        mut self,
        from: impl Into<Anchor>,
        selector: impl Into<String>,
        ancestor: impl Into<Anchor>,
    ) -> Self {
        self.ancestors
            .insert((from.into(), selector.into()), ancestor.into());
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> &[RenderCall] {
        &self.calls
    }

    /// Forget recorded calls; the screen state is kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Number of insertions.
    pub fn inserted_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::Insert { .. }))
            .count()
    }

    /// Number of removals.
    pub fn removed_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::Remove { .. }))
            .count()
    }

    /// Number of class additions.
    pub fn class_adds(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::AddClass { .. }))
            .count()
    }

    /// Number of class removals.
    pub fn class_removes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, RenderCall::RemoveClass { .. }))
            .count()
    }

    /// Views currently on screen.
    pub fn live_views(&self) -> usize {
        self.live.len()
    }

    /// Targets of every insertion, in order.
    pub fn inserted_targets(&self) -> Vec<Anchor> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RenderCall::Insert { target, .. } => Some(target.clone()),
                _ => None,
            })
            .collect()
    }

    /// Templates used by every insertion, in order.
    pub fn inserted_templates(&self) -> &[ErrorTemplate] {
        &self.templates
    }

    /// Keys of the most recent insertion.
    pub fn last_inserted_keys(&self) -> Option<&[String]> {
        self.calls.iter().rev().find_map(|c| match c {
            RenderCall::Insert { keys, .. } => Some(keys.as_slice()),
            _ => None,
        })
    }

    /// Whether `element` currently carries `class`.
    pub fn has_class(&self, element: &str, class: &str) -> bool {
        self.classes
            .get(&Anchor::from(element))
            .is_some_and(|set| set.contains(class))
    }
}

impl Renderer for RecordingRenderer {
    type View = usize;

    fn insert_errors(
        &mut self,
        errors: &[ValidationError],
        template: &ErrorTemplate,
        target: &Anchor,
    ) -> usize {
        let view = self.next_view;
        self.next_view += 1;
        self.live.insert(view);
        self.templates.push(template.clone());
        self.calls.push(RenderCall::Insert {
            view,
            keys: errors.iter().map(|e| e.key().to_string()).collect(),
            target: target.clone(),
        });
        view
    }

    fn remove_errors(&mut self, view: usize) {
        self.live.remove(&view);
        self.calls.push(RenderCall::Remove { view });
    }

    fn add_class(&mut self, element: &Anchor, classes: &str) {
        let set = self.classes.entry(element.clone()).or_default();
        set.extend(classes.split_whitespace().map(str::to_string));
        self.calls.push(RenderCall::AddClass {
            element: element.clone(),
            classes: classes.to_string(),
        });
    }

    fn remove_class(&mut self, element: &Anchor, classes: &str) {
        if let Some(set) = self.classes.get_mut(element) {
            for class in classes.split_whitespace() {
                set.remove(class);
            }
        }
        self.calls.push(RenderCall::RemoveClass {
            element: element.clone(),
            classes: classes.to_string(),
        });
    }

    fn closest(&self, from: &Anchor, selector: &str) -> Option<Anchor> {
        self.ancestors
            .get(&(from.clone(), selector.to_string()))
            .cloned()
    }
}

/// Assert that an evaluation decided to show errors.
///
/// # Example
///
/// ```rust
/// use formgate::assert_shown;
/// use formgate::engine::Evaluation;
/// use formgate::gate::GateTransition;
/// use formgate::policy::DisplayDecision;
///
/// let evaluation = Evaluation::Evaluated {
///     decision: DisplayDecision { show: true, errors: vec![] },
///     transition: GateTransition::Inserted,
/// };
/// assert_shown!(evaluation);
/// ```
#[macro_export]
macro_rules! assert_shown {
    ($evaluation:expr) => {
        match $evaluation {
            $crate::engine::Evaluation::Evaluated { decision, .. } => {
                if !decision.show {
                    panic!("Expected errors shown, got hidden: {:?}", decision.errors);
                }
            }
            $crate::engine::Evaluation::Skipped => {
                panic!("Expected errors shown, evaluation was skipped");
            }
        }
    };
}

/// Assert that an evaluation decided to hide errors.
///
/// # Example
///
/// ```rust
/// use formgate::assert_hidden;
/// use formgate::engine::Evaluation;
/// use formgate::gate::GateTransition;
/// use formgate::policy::DisplayDecision;
///
/// let evaluation = Evaluation::Evaluated {
///     decision: DisplayDecision::hidden(),
///     transition: GateTransition::Unchanged,
/// };
/// assert_hidden!(evaluation);
/// ```
#[macro_export]
macro_rules! assert_hidden {
    ($evaluation:expr) => {
        match $evaluation {
            $crate::engine::Evaluation::Evaluated { decision, .. } => {
                if decision.show {
                    panic!("Expected errors hidden, got shown: {:?}", decision.errors);
                }
            }
            $crate::engine::Evaluation::Skipped => {
                panic!("Expected errors hidden, evaluation was skipped");
            }
        }
    };
}

#[cfg(feature = "proptest")]
use proptest::prelude::*;

#[cfg(feature = "proptest")]
impl Arbitrary for crate::pulse::EvaluationPulse {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        prop_oneof![
            Just(crate::pulse::EvaluationPulse::Status),
            Just(crate::pulse::EvaluationPulse::Value),
            Just(crate::pulse::EvaluationPulse::Submit),
        ]
        .boxed()
    }
}
