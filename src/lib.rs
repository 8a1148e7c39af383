//! # formgate
//!
//! A reactive form-validation decision engine.
//!
//! formgate watches one form control, turns its raw error maps into a
//! structured error list, decides whether those errors should be visible
//! right now, and tells a renderer exactly what to change, and nothing when
//! nothing changed.
//!
//! ## Pure core, imperative shell
//!
//! - **Pure**: [`blueprint`], [`builder`], [`merge`], [`policy`] are plain
//!   functions of control state and configuration.
//! - **Stateful**: [`gate`] remembers what is on screen and suppresses
//!   redundant renders.
//! - **Shell**: [`engine`] and [`trigger`] wire pulses from the host to the
//!   pipeline and the pipeline to a [`Renderer`](render::Renderer).
//!
//! ## Quick Example
//!
//! ```rust
//! use formgate::prelude::*;
//! use formgate::testing::RecordingRenderer;
//! use serde_json::json;
//!
//! let control = ControlSnapshot::new()
//!     .with_error("minlength", json!({ "requiredLength": 8, "actualLength": 3 }))
//!     .dirty(true);
//!
//! let config = ValidationConfig::new().with_blueprints(Blueprints::standard());
//! let mut engine = ValidationEngine::new(config, RecordingRenderer::new(), &Placement::new("password"))
//!     .with_control(control);
//!
//! let evaluation = engine.evaluate(EvaluationPulse::Value).unwrap();
//! let decision = evaluation.decision().unwrap();
//!
//! assert!(decision.show);
//! assert_eq!(decision.errors[0].message(), "Please enter at least 8 characters.");
//! assert!(engine.renderer().has_class("password", "is-invalid"));
//! ```
//!
//! ## Features
//!
//! - `async`: [`Subscription::run_until`](engine::Subscription::run_until), a
//!   tokio driver loop with graceful shutdown.
//! - `tracing`: debug/warn logs for gate transitions and failures.
//! - `proptest`: `Arbitrary` for [`EvaluationPulse`].

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod blueprint;
pub mod builder;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod gate;
pub mod merge;
pub mod policy;
pub mod pulse;
pub mod render;
pub mod semigroup;
pub mod testing;
pub mod trigger;

// Re-exports
pub use blueprint::{Blueprint, Blueprints, ValidationError};
pub use config::{ConfigOverrides, ValidationConfig};
pub use engine::{Evaluation, Subscription, ValidationEngine};
pub use error::EngineError;
pub use policy::DisplayDecision;
pub use pulse::EvaluationPulse;
pub use semigroup::Semigroup;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::blueprint::{Blueprint, Blueprints, ValidationError};
    pub use crate::config::{ConfigOverrides, ValidationConfig};
    pub use crate::control::{ControlSnapshot, ControlSource, ErrorMap, GroupState};
    pub use crate::engine::{Evaluation, Subscription, ValidationEngine};
    pub use crate::error::EngineError;
    pub use crate::gate::{GateStatus, GateTransition};
    pub use crate::merge::MapErrorsFn;
    pub use crate::policy::DisplayDecision;
    pub use crate::pulse::{ControlEvent, EvaluationPulse};
    pub use crate::render::{Anchor, ErrorTemplate, Placement, Renderer};
    pub use crate::trigger::{PulseBus, PulseEmitter};
}
