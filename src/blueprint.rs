//! Blueprints and the error blueprint resolver
//!
//! A blueprint tells the engine how to turn one failing rule into a
//! human-facing message. The validation system reports failures as a rule key
//! (`"required"`, `"minlength"`, ...) plus a rule-specific payload; [`resolve`]
//! pairs them with an optional [`Blueprint`] and produces a [`ValidationError`].
//!
//! # Examples
//!
//! ```
//! use formgate::blueprint::{resolve, Blueprint};
//! use serde_json::json;
//!
//! // No blueprint: a `true` payload renders as the generic message
//! let err = resolve("required", &json!(true), None).unwrap();
//! assert_eq!(err.message(), "invalid");
//!
//! // Static text ignores the payload
//! let bp = Blueprint::text("This field is required.");
//! let err = resolve("required", &json!(true), Some(&bp)).unwrap();
//! assert_eq!(err.message(), "This field is required.");
//!
//! // Templates read fields out of an object payload
//! let bp = Blueprint::template("At least {{ requiredLength }} characters");
//! let payload = json!({ "requiredLength": 8, "actualLength": 3 });
//! let err = resolve("minlength", &payload, Some(&bp)).unwrap();
//! assert_eq!(err.message(), "At least 8 characters");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

/// Message used when a rule has no blueprint and its payload is `true`.
pub const DEFAULT_MESSAGE: &str = "invalid";

/// A user-supplied message function.
///
/// Receives the rule payload and returns the message, or a reason why it
/// could not produce one.
pub type MessageFn = Arc<dyn Fn(&Value) -> Result<String, String> + Send + Sync>;

/// One structured, displayable validation error.
///
/// Built fresh on every evaluation and never modified afterwards. The
/// serialized form (field order `key`, `message`, `payload`) is what the
/// render gate compares between evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    key: String,
    message: String,
    payload: Value,
}

impl ValidationError {
    /// Create a validation error.
    pub fn new(key: impl Into<String>, message: impl Into<String>, payload: Value) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
            payload,
        }
    }

    /// The rule key this error came from.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The human-facing message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The raw payload reported by the validation system.
    pub fn payload(&self) -> &Value {
        &self.payload
    }
}

/// How a blueprint produces its message.
#[derive(Clone)]
pub enum BlueprintMessage {
    /// Fixed text, used verbatim.
    Static(String),
    /// Text with `{{ field }}` placeholders filled from an object payload.
    Template(String),
    /// A function of the payload.
    Dynamic(MessageFn),
}

impl fmt::Debug for BlueprintMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Template(text) => f.debug_tuple("Template").field(text).finish(),
            Self::Dynamic(_) => f.debug_tuple("Dynamic").field(&"<fn>").finish(),
        }
    }
}

/// Per-rule message configuration.
///
/// Deserializes from either a plain string (static text) or an object
/// `{ "template": "..." }`. Function blueprints are code-only.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "BlueprintRepr")]
pub struct Blueprint {
    message: BlueprintMessage,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BlueprintRepr {
    Text(String),
    Template { template: String },
}

impl From<BlueprintRepr> for Blueprint {
    fn from(repr: BlueprintRepr) -> Self {
        match repr {
            BlueprintRepr::Text(text) => Blueprint::text(text),
            BlueprintRepr::Template { template } => Blueprint::template(template),
        }
    }
}

impl Blueprint {
    /// A blueprint with fixed text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            message: BlueprintMessage::Static(text.into()),
        }
    }

    /// A blueprint with `{{ field }}` placeholders.
    pub fn template(template: impl Into<String>) -> Self {
        Self {
            message: BlueprintMessage::Template(template.into()),
        }
    }

    /// A blueprint computed from the payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use formgate::blueprint::{resolve, Blueprint};
    /// use serde_json::json;
    ///
    /// let bp = Blueprint::from_fn(|payload| {
    ///     payload["requiredLength"]
    ///         .as_u64()
    ///         .map(|n| format!("{} characters minimum", n))
    ///         .ok_or_else(|| "requiredLength missing".to_string())
    /// });
    ///
    /// let err = resolve("minlength", &json!({ "requiredLength": 4 }), Some(&bp)).unwrap();
    /// assert_eq!(err.message(), "4 characters minimum");
    ///
    /// let err = resolve("minlength", &json!(true), Some(&bp)).unwrap_err();
    /// assert!(err.is_configuration());
    /// ```
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<String, String> + Send + Sync + 'static,
    {
        Self {
            message: BlueprintMessage::Dynamic(Arc::new(f)),
        }
    }

    /// The message source of this blueprint.
    pub fn message(&self) -> &BlueprintMessage {
        &self.message
    }

    fn render(&self, key: &str, payload: &Value) -> Result<String, EngineError> {
        match &self.message {
            BlueprintMessage::Static(text) => Ok(text.clone()),
            BlueprintMessage::Template(template) => interpolate(key, template, payload),
            BlueprintMessage::Dynamic(f) => match catch_unwind(AssertUnwindSafe(|| f(payload))) {
                Ok(Ok(message)) => Ok(message),
                Ok(Err(reason)) => Err(EngineError::configuration(key, reason)),
                Err(panic) => Err(EngineError::configuration(key, panic_reason(&*panic))),
            },
        }
    }
}

fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("message function panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("message function panicked: {}", s)
    } else {
        "message function panicked".to_string()
    }
}

/// Render a payload value for display: strings raw, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn interpolate(key: &str, template: &str, payload: &Value) -> Result<String, EngineError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("}}") else {
            break;
        };

        out.push_str(&rest[..start]);
        let field = after_open[..end].trim();

        let fields = payload.as_object().ok_or_else(|| {
            EngineError::configuration(
                key,
                format!("template placeholder '{}' needs an object payload", field),
            )
        })?;
        let value = fields.get(field).ok_or_else(|| {
            EngineError::configuration(key, format!("payload has no field '{}'", field))
        })?;

        out.push_str(&display_value(value));
        rest = &after_open[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Resolve one failing rule into a [`ValidationError`].
///
/// Without a blueprint the message is [`DEFAULT_MESSAGE`] for a `true`
/// payload, the text of a string payload, or compact JSON otherwise.
///
/// # Errors
///
/// Returns [`EngineError::Configuration`] when a function blueprint fails or
/// panics, or when a template placeholder cannot be filled.
pub fn resolve(
    key: &str,
    payload: &Value,
    blueprint: Option<&Blueprint>,
) -> Result<ValidationError, EngineError> {
    let message = match blueprint {
        Some(bp) => bp.render(key, payload)?,
        None => match payload {
            Value::Bool(true) => DEFAULT_MESSAGE.to_string(),
            other => display_value(other),
        },
    };

    Ok(ValidationError::new(key, message, payload.clone()))
}

/// Blueprints keyed by rule.
///
/// # Examples
///
/// ```
/// use formgate::blueprint::{Blueprint, Blueprints};
///
/// let blueprints = Blueprints::new()
///     .with("required", Blueprint::text("Required"))
///     .with("email", Blueprint::text("Not an email"));
///
/// assert_eq!(blueprints.len(), 2);
/// assert!(blueprints.get("required").is_some());
/// assert!(blueprints.get("pattern").is_none());
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Blueprints(HashMap<String, Blueprint>);

impl Blueprints {
    /// An empty set of blueprints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stock English messages for the common rules.
    ///
    /// Covers `required`, `email`, `minlength`, `maxlength`, `min`, `max`
    /// and `pattern`, reading the payload fields those rules report.
    pub fn standard() -> Self {
        Self::new()
            .with("required", Blueprint::text("This field is required."))
            .with("email", Blueprint::text("Please enter a valid email address."))
            .with(
                "minlength",
                Blueprint::template("Please enter at least {{ requiredLength }} characters."),
            )
            .with(
                "maxlength",
                Blueprint::template("Please enter at most {{ requiredLength }} characters."),
            )
            .with(
                "min",
                Blueprint::template("Please enter a number greater than or equal to {{ min }}."),
            )
            .with(
                "max",
                Blueprint::template("Please enter a number less than or equal to {{ max }}."),
            )
            .with("pattern", Blueprint::text("Please match the requested format."))
    }

    /// Add or replace the blueprint for `key`.
    pub fn with(mut self, key: impl Into<String>, blueprint: Blueprint) -> Self {
        self.insert(key, blueprint);
        self
    }

    /// Add or replace the blueprint for `key`.
    pub fn insert(&mut self, key: impl Into<String>, blueprint: Blueprint) {
        self.0.insert(key.into(), blueprint);
    }

    /// Look up the blueprint for `key`.
    pub fn get(&self, key: &str) -> Option<&Blueprint> {
        self.0.get(key)
    }

    /// Number of configured rules.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no rule has a blueprint.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Layer `other` over `self`; keys present in `other` win.
    pub fn layered(mut self, other: &Blueprints) -> Self {
        for (key, bp) in &other.0 {
            self.0.insert(key.clone(), bp.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_message_for_true() {
        let err = resolve("required", &json!(true), None).unwrap();
        assert_eq!(err.key(), "required");
        assert_eq!(err.message(), "invalid");
        assert_eq!(err.payload(), &json!(true));
    }

    #[test]
    fn test_default_message_stringifies_payload() {
        let err = resolve("custom", &json!("must be unique"), None).unwrap();
        assert_eq!(err.message(), "must be unique");

        let err = resolve("minlength", &json!({ "requiredLength": 3 }), None).unwrap();
        assert_eq!(err.message(), r#"{"requiredLength":3}"#);

        let err = resolve("flag", &json!(false), None).unwrap();
        assert_eq!(err.message(), "false");
    }

    #[test]
    fn test_static_ignores_payload() {
        let bp = Blueprint::text("Nope");
        let err = resolve("pattern", &json!({ "requiredPattern": "^a" }), Some(&bp)).unwrap();
        assert_eq!(err.message(), "Nope");
    }

    #[test]
    fn test_template_interpolation() {
        let bp = Blueprint::template("{{min}} to {{ max }}, got {{ actual }}");
        let payload = json!({ "min": 1, "max": 5, "actual": "seven" });
        let err = resolve("range", &payload, Some(&bp)).unwrap();
        assert_eq!(err.message(), "1 to 5, got seven");
    }

    #[test]
    fn test_template_without_placeholders_accepts_any_payload() {
        let bp = Blueprint::template("plain text");
        let err = resolve("required", &json!(true), Some(&bp)).unwrap();
        assert_eq!(err.message(), "plain text");
    }

    #[test]
    fn test_template_unclosed_placeholder_is_literal() {
        let bp = Blueprint::template("broken {{ field");
        let err = resolve("x", &json!({}), Some(&bp)).unwrap();
        assert_eq!(err.message(), "broken {{ field");
    }

    #[test]
    fn test_template_missing_field_is_configuration_error() {
        let bp = Blueprint::template("{{ requiredLength }}");
        let err = resolve("minlength", &json!({}), Some(&bp)).unwrap_err();
        assert_eq!(
            err,
            EngineError::configuration("minlength", "payload has no field 'requiredLength'")
        );
    }

    #[test]
    fn test_template_non_object_payload_is_configuration_error() {
        let bp = Blueprint::template("{{ requiredLength }}");
        let err = resolve("minlength", &json!(true), Some(&bp)).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_dynamic_receives_payload() {
        let bp = Blueprint::from_fn(|p| Ok(format!("got {}", p)));
        let err = resolve("k", &json!(42), Some(&bp)).unwrap();
        assert_eq!(err.message(), "got 42");
    }

    #[test]
    fn test_dynamic_error_is_reported() {
        let bp = Blueprint::from_fn(|_| Err("no message".to_string()));
        let err = resolve("k", &json!(true), Some(&bp)).unwrap_err();
        assert_eq!(err, EngineError::configuration("k", "no message"));
    }

    #[test]
    fn test_dynamic_panic_is_reported() {
        let bp = Blueprint::from_fn(|_| panic!("kaboom"));
        let err = resolve("k", &json!(true), Some(&bp)).unwrap_err();
        match err {
            EngineError::Configuration { key, reason } => {
                assert_eq!(key, "k");
                assert!(reason.contains("kaboom"));
            }
            other => panic!("Expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_standard_minlength() {
        let blueprints = Blueprints::standard();
        let payload = json!({ "requiredLength": 8, "actualLength": 2 });
        let err = resolve("minlength", &payload, blueprints.get("minlength")).unwrap();
        assert_eq!(err.message(), "Please enter at least 8 characters.");
    }

    #[test]
    fn test_layered_overrides_per_key() {
        let base = Blueprints::new()
            .with("required", Blueprint::text("base required"))
            .with("email", Blueprint::text("base email"));
        let local = Blueprints::new().with("required", Blueprint::text("local required"));

        let merged = base.layered(&local);
        let required = resolve("required", &json!(true), merged.get("required")).unwrap();
        let email = resolve("email", &json!(true), merged.get("email")).unwrap();

        assert_eq!(required.message(), "local required");
        assert_eq!(email.message(), "base email");
    }

    #[test]
    fn test_deserialize_blueprints() {
        let blueprints: Blueprints = serde_json::from_value(json!({
            "required": "Required!",
            "minlength": { "template": "min {{ requiredLength }}" }
        }))
        .unwrap();

        let required = resolve("required", &json!(true), blueprints.get("required")).unwrap();
        let min = resolve(
            "minlength",
            &json!({ "requiredLength": 2 }),
            blueprints.get("minlength"),
        )
        .unwrap();

        assert_eq!(required.message(), "Required!");
        assert_eq!(min.message(), "min 2");
    }

    #[test]
    fn test_serialization_field_order() {
        let err = ValidationError::new("required", "invalid", json!(true));
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#"{"key":"required","message":"invalid","payload":true}"#);
    }
}
