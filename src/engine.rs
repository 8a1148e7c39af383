//! The validation engine and its subscription lifecycle
//!
//! [`ValidationEngine`] wires the pure pipeline to one control and one
//! render gate:
//!
//! ```text
//! pulse ─▶ build control/group errors ─▶ merge ─▶ decide ─▶ gate ─▶ renderer
//! ```
//!
//! Each [`evaluate`](ValidationEngine::evaluate) call runs that pipeline to
//! completion. Taking `&mut self` is what keeps pulses from interleaving.
//!
//! [`ValidationEngine::start`] packages an engine with a pulse channel into a
//! [`Subscription`], the single cancelable unit a host keeps per control.
//!
//! # Examples
//!
//! ```
//! use formgate::prelude::*;
//! use formgate::testing::RecordingRenderer;
//! use serde_json::json;
//!
//! let control = ControlSnapshot::new()
//!     .with_error("required", json!(true))
//!     .dirty(true);
//! let mut renderer = RecordingRenderer::new();
//!
//! let (mut subscription, emitter) = ValidationEngine::start(
//!     control,
//!     ValidationConfig::new(),
//!     &mut renderer,
//!     &Placement::new("email"),
//! );
//!
//! emitter.value_changed();
//! let results = subscription.process_pending();
//! assert_eq!(results.len(), 1);
//!
//! subscription.stop();
//! assert_eq!(renderer.inserted_count(), 1);
//! assert_eq!(renderer.live_views(), 0);
//! ```

use std::fmt;

use futures::StreamExt;

use crate::builder::build_errors;
use crate::config::ValidationConfig;
use crate::control::ControlSource;
use crate::error::EngineError;
use crate::gate::{GateStatus, GateTransition, RenderGate, RenderSlot};
use crate::policy::DisplayDecision;
use crate::pulse::EvaluationPulse;
use crate::render::{Placement, Renderer};
use crate::trigger::{PulseBus, PulseEmitter, PulseReceiver};

/// Result of one evaluation cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Validation is switched off; nothing was computed.
    Skipped,
    /// The pipeline ran.
    Evaluated {
        /// What the policy decided.
        decision: DisplayDecision,
        /// What the gate did with it.
        transition: GateTransition,
    },
}

impl Evaluation {
    /// The decision, if the pipeline ran.
    pub fn decision(&self) -> Option<&DisplayDecision> {
        match self {
            Self::Evaluated { decision, .. } => Some(decision),
            Self::Skipped => None,
        }
    }

    /// The gate transition, if the pipeline ran.
    pub fn transition(&self) -> Option<GateTransition> {
        match self {
            Self::Evaluated { transition, .. } => Some(*transition),
            Self::Skipped => None,
        }
    }
}

/// Validation decision engine for one control.
///
/// Dropping the engine releases whatever its gate still holds.
pub struct ValidationEngine<C, R: Renderer> {
    config: ValidationConfig,
    control: Option<C>,
    renderer: R,
    gate: RenderGate<R::View>,
}

impl<C, R: Renderer> fmt::Debug for ValidationEngine<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationEngine")
            .field("config", &self.config)
            .field("attached", &self.control.is_some())
            .field("slot", self.gate.slot())
            .field("status", &self.gate.status())
            .finish()
    }
}

impl<C: ControlSource, R: Renderer> ValidationEngine<C, R> {
    /// An engine with no control attached.
    ///
    /// Mark element and insertion target are resolved from `placement` now
    /// and stay fixed for the engine's lifetime.
    pub fn new(config: ValidationConfig, renderer: R, placement: &Placement) -> Self {
        let slot = RenderSlot {
            mark: placement.mark_element(&renderer, config.target_selector.as_deref()),
            target: placement.insertion_target(),
            template: config.error_template.clone(),
            invalid_classes: config.invalid_classes.clone(),
        };

        Self {
            config,
            control: None,
            renderer,
            gate: RenderGate::new(slot),
        }
    }

    /// Attach a control, builder style.
    pub fn with_control(mut self, control: C) -> Self {
        self.control = Some(control);
        self
    }

    /// Attach a control, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`EngineError::Detached`] once [`detach`](Self::detach) has run; the
    /// control is dropped.
    pub fn attach(&mut self, control: C) -> Result<(), EngineError> {
        if self.is_detached() {
            return Err(EngineError::Detached);
        }
        self.control = Some(control);
        Ok(())
    }

    /// Detach the control and tear down anything on screen.
    ///
    /// The engine is finished afterwards: attaching and evaluating fail with
    /// [`EngineError::Detached`].
    pub fn detach(&mut self) -> Option<C> {
        if self.gate.destroy(&mut self.renderer) {
            #[cfg(feature = "tracing")]
            tracing::debug!(slot = ?self.gate.slot().target, "validation engine detached");
        }
        self.control.take()
    }

    /// Start a subscription for `control`.
    ///
    /// Returns the subscription and the emitter the host's notification
    /// sources push into. Submissions are only forwarded when
    /// `config.validate_on_submit` is set.
    pub fn start(
        control: C,
        config: ValidationConfig,
        renderer: R,
        placement: &Placement,
    ) -> (Subscription<C, R>, PulseEmitter) {
        let (emitter, pulses) = PulseBus::channel(config.validate_on_submit);
        let engine = Self::new(config, renderer, placement).with_control(control);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            host = placement.host().as_str(),
            validate_on_submit = engine.config.validate_on_submit,
            "validation subscription started"
        );

        (Subscription { pulses, engine }, emitter)
    }

    /// The resolved configuration.
    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// The attached control, if any.
    pub fn control(&self) -> Option<&C> {
        self.control.as_ref()
    }

    /// The renderer.
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Current gate state.
    pub fn status(&self) -> GateStatus {
        self.gate.status()
    }

    /// Whether [`detach`](Self::detach) has run.
    pub fn is_detached(&self) -> bool {
        self.gate.status() == GateStatus::Destroyed
    }

    /// Run build, merge and policy for `pulse` without touching the gate.
    ///
    /// # Errors
    ///
    /// [`EngineError::Detached`] after [`detach`](Self::detach),
    /// [`EngineError::MissingControl`] without a control or group, and
    /// [`EngineError::Configuration`] when a blueprint fails.
    pub fn decide(&self, pulse: EvaluationPulse) -> Result<DisplayDecision, EngineError> {
        if self.is_detached() {
            return Err(EngineError::Detached);
        }
        let control = self
            .control
            .as_ref()
            .ok_or(EngineError::missing_control("control"))?;
        let group = control
            .group()
            .ok_or(EngineError::missing_control("group"))?;

        let control_errors = build_errors(control.errors().as_ref(), &self.config.blueprints)?;
        let group_errors = build_errors(group.errors.as_ref(), &self.config.blueprints)?;
        let errors = self
            .config
            .map_errors_fn
            .apply(control_errors, group_errors, control);

        Ok(DisplayDecision::new(errors, pulse, control.is_dirty()))
    }

    /// Run the full pipeline for one pulse.
    ///
    /// On error nothing on screen changes, so a later pulse can recover.
    ///
    /// # Errors
    ///
    /// Everything [`decide`](Self::decide) returns, plus
    /// [`EngineError::Serialization`] from the gate.
    pub fn evaluate(&mut self, pulse: EvaluationPulse) -> Result<Evaluation, EngineError> {
        if self.config.skip_validation {
            #[cfg(feature = "tracing")]
            tracing::trace!(%pulse, "validation skipped");
            return Ok(Evaluation::Skipped);
        }

        let decision = self.decide(pulse).inspect_err(|_err| {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %_err, %pulse, "validation evaluation failed");
        })?;
        let transition = self.gate.apply(&decision, &mut self.renderer)?;

        Ok(Evaluation::Evaluated {
            decision,
            transition,
        })
    }
}

impl<C, R: Renderer> Drop for ValidationEngine<C, R> {
    fn drop(&mut self) {
        self.gate.destroy(&mut self.renderer);
    }
}

/// A running validation subscription for one control.
///
/// Owns the pulse receiver and the engine. Stopping (or dropping) it closes
/// the pulse channel first, then releases the display, so no side effect can
/// happen afterwards.
pub struct Subscription<C, R: Renderer> {
    // Declared first so it drops before the engine tears down.
    pulses: PulseReceiver,
    engine: ValidationEngine<C, R>,
}

impl<C, R: Renderer> fmt::Debug for Subscription<C, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("pulses", &self.pulses)
            .field("engine", &self.engine)
            .finish()
    }
}

impl<C: ControlSource, R: Renderer> Subscription<C, R> {
    /// The engine behind this subscription.
    pub fn engine(&self) -> &ValidationEngine<C, R> {
        &self.engine
    }

    /// Evaluate every pulse already queued, in arrival order.
    pub fn process_pending(&mut self) -> Vec<Result<Evaluation, EngineError>> {
        let mut results = Vec::new();
        while let Some(pulse) = self.pulses.try_recv() {
            results.push(self.engine.evaluate(pulse));
        }
        results
    }

    /// Wait for the next pulse and evaluate it.
    ///
    /// Returns `None` once every emitter has been dropped and the queue is
    /// empty.
    pub async fn next_evaluation(&mut self) -> Option<Result<Evaluation, EngineError>> {
        let pulse = self.pulses.next().await?;
        Some(self.engine.evaluate(pulse))
    }

    /// Cancel the subscription.
    ///
    /// Pending pulses are discarded, emitters start reporting closed, and the
    /// gate releases its view and invalid classes.
    pub fn stop(mut self) {
        self.pulses.close();
        self.engine.detach();

        #[cfg(feature = "tracing")]
        tracing::debug!("validation subscription stopped");
    }

    /// Drive the subscription until `shutdown` resolves or every emitter is
    /// gone, then stop it.
    ///
    /// Evaluation errors are logged and counted; the loop keeps going, since
    /// the gate is unchanged after a failed pulse.
    #[cfg(feature = "async")]
    pub async fn run_until<F>(mut self, shutdown: F) -> RunSummary
    where
        F: std::future::Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut summary = RunSummary::default();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                next = self.next_evaluation() => match next {
                    Some(Ok(evaluation)) => summary.record(&evaluation),
                    Some(Err(_err)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %_err, "pulse failed, keeping previous display");
                        summary.failures += 1;
                    }
                    None => break,
                },
            }
        }

        self.stop();
        summary
    }
}

/// Counters collected by [`Subscription::run_until`].
#[cfg(feature = "async")]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Pulses that ran the full pipeline.
    pub evaluated: usize,
    /// Pulses dropped because validation was skipped.
    pub skipped: usize,
    /// Pulses that failed.
    pub failures: usize,
    /// Evaluations that changed what is on screen.
    pub visible_changes: usize,
}

#[cfg(feature = "async")]
impl RunSummary {
    fn record(&mut self, evaluation: &Evaluation) {
        match evaluation {
            Evaluation::Skipped => self.skipped += 1,
            Evaluation::Evaluated { transition, .. } => {
                self.evaluated += 1;
                if transition.is_visible() {
                    self.visible_changes += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{Blueprint, Blueprints};
    use crate::control::ControlSnapshot;
    use crate::render::Anchor;
    use crate::testing::RecordingRenderer;
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn required_dirty() -> ControlSnapshot {
        ControlSnapshot::new()
            .with_error("required", json!(true))
            .dirty(true)
    }

    fn engine_for(
        control: ControlSnapshot,
        config: ValidationConfig,
    ) -> ValidationEngine<ControlSnapshot, RecordingRenderer> {
        ValidationEngine::new(config, RecordingRenderer::new(), &Placement::new("input"))
            .with_control(control)
    }

    #[test]
    fn test_dirty_required_is_shown() {
        let mut engine = engine_for(required_dirty(), ValidationConfig::new());

        let evaluation = engine.evaluate(EvaluationPulse::Value).unwrap();
        let decision = evaluation.decision().unwrap();

        assert!(decision.show);
        assert_eq!(
            decision.errors,
            vec![crate::blueprint::ValidationError::new(
                "required",
                "invalid",
                json!(true)
            )]
        );
        assert_eq!(evaluation.transition(), Some(GateTransition::Inserted));
        assert!(engine.renderer().has_class("input", "is-invalid"));
    }

    #[test]
    fn test_pristine_required_is_hidden() {
        let control = required_dirty().dirty(false);
        let mut engine = engine_for(control, ValidationConfig::new());

        let evaluation = engine.evaluate(EvaluationPulse::Value).unwrap();
        assert!(!evaluation.decision().unwrap().show);
        assert_eq!(engine.renderer().inserted_count(), 0);
        assert!(!engine.renderer().has_class("input", "is-invalid"));
    }

    #[test]
    fn test_submit_reveals_pristine_errors() {
        let control = required_dirty().dirty(false);
        let mut engine = engine_for(control, ValidationConfig::new());

        let evaluation = engine.evaluate(EvaluationPulse::Submit).unwrap();
        assert!(evaluation.decision().unwrap().show);
        assert_eq!(engine.renderer().inserted_count(), 1);
    }

    #[test]
    fn test_group_errors_follow_control_errors() {
        let control = required_dirty().with_group_error("passwordMismatch", json!(true));
        let engine = engine_for(control, ValidationConfig::new());

        let decision = engine.decide(EvaluationPulse::Status).unwrap();
        let keys: Vec<&str> = decision.errors.iter().map(|e| e.key()).collect();
        assert_eq!(keys, vec!["required", "passwordMismatch"]);
    }

    #[test]
    fn test_missing_control_fails_fast() {
        let mut engine: ValidationEngine<ControlSnapshot, _> = ValidationEngine::new(
            ValidationConfig::new(),
            RecordingRenderer::new(),
            &Placement::new("input"),
        );

        let err = engine.evaluate(EvaluationPulse::Value).unwrap_err();
        assert_eq!(err, EngineError::missing_control("control"));
    }

    #[test]
    fn test_missing_group_fails_fast() {
        let mut engine = engine_for(required_dirty().without_group(), ValidationConfig::new());
        let err = engine.evaluate(EvaluationPulse::Value).unwrap_err();
        assert_eq!(err, EngineError::missing_control("group"));
        assert_eq!(engine.renderer().calls().len(), 0);
    }

    #[test]
    fn test_configuration_error_keeps_display() {
        let control = Rc::new(RefCell::new(required_dirty()));
        let config = ValidationConfig::new().with_blueprints(
            Blueprints::new().with(
                "custom",
                Blueprint::from_fn(|_| Err("cannot render".to_string())),
            ),
        );
        let mut engine = ValidationEngine::new(
            config,
            RecordingRenderer::new(),
            &Placement::new("input"),
        )
        .with_control(Rc::clone(&control));

        engine.evaluate(EvaluationPulse::Value).unwrap();
        let before = engine.renderer().calls().len();

        control.borrow_mut().set_errors(Some(
            [("custom".to_string(), json!(1))].into_iter().collect(),
        ));
        let err = engine.evaluate(EvaluationPulse::Value).unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(engine.renderer().calls().len(), before);
        assert_eq!(engine.status(), GateStatus::Shown);

        control.borrow_mut().set_errors(None);
        let evaluation = engine.evaluate(EvaluationPulse::Value).unwrap();
        assert_eq!(evaluation.transition(), Some(GateTransition::Cleared));
    }

    #[test]
    fn test_skip_validation_does_nothing() {
        let mut engine = engine_for(
            required_dirty(),
            ValidationConfig::new().with_skip_validation(true),
        );

        assert_eq!(
            engine.evaluate(EvaluationPulse::Submit).unwrap(),
            Evaluation::Skipped
        );
        assert!(engine.renderer().calls().is_empty());
    }

    #[test]
    fn test_skip_validation_does_not_need_control() {
        let mut engine: ValidationEngine<ControlSnapshot, _> = ValidationEngine::new(
            ValidationConfig::new().with_skip_validation(true),
            RecordingRenderer::new(),
            &Placement::new("input"),
        );
        assert_eq!(
            engine.evaluate(EvaluationPulse::Value).unwrap(),
            Evaluation::Skipped
        );
    }

    #[test]
    fn test_target_selector_moves_marker() {
        let renderer = RecordingRenderer::new().with_ancestor("input", ".form-group", "row");
        let config = ValidationConfig::new().with_target_selector(".form-group");
        let mut engine = ValidationEngine::new(config, renderer, &Placement::new("input"))
            .with_control(required_dirty());

        engine.evaluate(EvaluationPulse::Value).unwrap();
        assert!(engine.renderer().has_class("row", "is-invalid"));
        assert!(!engine.renderer().has_class("input", "is-invalid"));
    }

    #[test]
    fn test_detach_releases_display() {
        let mut engine = engine_for(required_dirty(), ValidationConfig::new());
        engine.evaluate(EvaluationPulse::Value).unwrap();

        assert!(engine.detach().is_some());
        assert_eq!(engine.status(), GateStatus::Destroyed);
        assert_eq!(engine.renderer().live_views(), 0);

        let err = engine.evaluate(EvaluationPulse::Value).unwrap_err();
        assert!(err.is_detached());
    }

    #[test]
    fn test_attach_after_detach_is_rejected() {
        let mut engine = engine_for(ControlSnapshot::new(), ValidationConfig::new());
        engine.detach();

        let err = engine.attach(required_dirty()).unwrap_err();
        assert_eq!(err, EngineError::Detached);
        assert!(engine.control().is_none());

        let err = engine.evaluate(EvaluationPulse::Value).unwrap_err();
        assert!(err.is_detached());
        assert_eq!(engine.renderer().inserted_count(), 0);
    }

    #[test]
    fn test_with_control_after_detach_still_fails() {
        let mut engine = engine_for(ControlSnapshot::new(), ValidationConfig::new());
        engine.detach();
        let mut engine = engine.with_control(required_dirty());

        let err = engine.evaluate(EvaluationPulse::Submit).unwrap_err();
        assert!(err.is_detached());
        assert!(engine.renderer().calls().is_empty());
    }

    #[test]
    fn test_attach_replaces_control() {
        let mut engine = engine_for(ControlSnapshot::new(), ValidationConfig::new());
        assert!(!engine.evaluate(EvaluationPulse::Value).unwrap().decision().unwrap().show);

        engine.attach(required_dirty()).unwrap();
        assert!(engine.evaluate(EvaluationPulse::Value).unwrap().decision().unwrap().show);
    }

    #[test]
    fn test_drop_releases_display() {
        let renderer = Rc::new(RefCell::new(RecordingRenderer::new()));
        {
            let mut engine = ValidationEngine::new(
                ValidationConfig::new(),
                Rc::clone(&renderer),
                &Placement::new("input"),
            )
            .with_control(required_dirty());
            engine.evaluate(EvaluationPulse::Value).unwrap();
            assert_eq!(renderer.borrow().live_views(), 1);
        }
        assert_eq!(renderer.borrow().live_views(), 0);
        assert!(!renderer.borrow().has_class("input", "is-invalid"));
    }

    #[test]
    fn test_subscription_processes_in_arrival_order() {
        let control = Rc::new(RefCell::new(required_dirty().dirty(false)));
        let mut renderer = RecordingRenderer::new();
        let config = ValidationConfig::new().with_validate_on_submit(true);

        let (mut subscription, emitter) = ValidationEngine::start(
            Rc::clone(&control),
            config,
            &mut renderer,
            &Placement::new("input"),
        );

        emitter.status_changed();
        emitter.form_submitted();
        let transitions: Vec<_> = subscription
            .process_pending()
            .into_iter()
            .map(|r| r.unwrap().transition().unwrap())
            .collect();

        assert_eq!(
            transitions,
            vec![GateTransition::Unchanged, GateTransition::Inserted]
        );
        subscription.stop();
        assert_eq!(renderer.live_views(), 0);
    }

    #[test]
    fn test_stop_closes_emitters() {
        let mut renderer = RecordingRenderer::new();
        let (subscription, emitter) = ValidationEngine::start(
            required_dirty(),
            ValidationConfig::new(),
            &mut renderer,
            &Placement::new("input"),
        );

        emitter.value_changed();
        subscription.stop();

        assert!(emitter.is_closed());
        assert!(!emitter.value_changed());
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn test_submit_ignored_without_flag() {
        let mut renderer = RecordingRenderer::new();
        let (mut subscription, emitter) = ValidationEngine::start(
            required_dirty().dirty(false),
            ValidationConfig::new(),
            &mut renderer,
            &Placement::new("input"),
        );

        assert!(!emitter.form_submitted());
        assert!(subscription.process_pending().is_empty());
        subscription.stop();
        assert!(renderer.calls().is_empty());
    }

    #[test]
    fn test_container_target_receives_view() {
        let mut renderer = RecordingRenderer::new();
        let placement = Placement::new("input").with_container_target("container");
        let (mut subscription, emitter) = ValidationEngine::start(
            required_dirty(),
            ValidationConfig::new(),
            &mut renderer,
            &placement,
        );

        emitter.value_changed();
        subscription.process_pending();
        subscription.stop();

        assert_eq!(
            renderer.inserted_targets(),
            vec![Anchor::from("container")]
        );
    }

    #[tokio::test]
    async fn test_next_evaluation_ends_with_emitters() {
        let mut renderer = RecordingRenderer::new();
        let (mut subscription, emitter) = ValidationEngine::start(
            required_dirty(),
            ValidationConfig::new(),
            &mut renderer,
            &Placement::new("input"),
        );

        emitter.value_changed();
        drop(emitter);

        let first = subscription.next_evaluation().await.unwrap().unwrap();
        assert_eq!(first.transition(), Some(GateTransition::Inserted));
        assert!(subscription.next_evaluation().await.is_none());
        subscription.stop();
    }
}
