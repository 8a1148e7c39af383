//! Error list builder
//!
//! Turns a raw [`ErrorMap`] into structured [`ValidationError`]s by running
//! every entry through the blueprint resolver.
//!
//! # Examples
//!
//! ```
//! use formgate::blueprint::Blueprints;
//! use formgate::builder::build_errors;
//! use formgate::control::ErrorMap;
//! use serde_json::json;
//!
//! let mut map = ErrorMap::new();
//! map.insert("required".into(), json!(true));
//!
//! let errors = build_errors(Some(&map), &Blueprints::new()).unwrap();
//! assert_eq!(errors.len(), 1);
//! assert_eq!(errors[0].message(), "invalid");
//!
//! assert!(build_errors(None, &Blueprints::new()).unwrap().is_empty());
//! ```

use crate::blueprint::{resolve, Blueprints, ValidationError};
use crate::control::ErrorMap;
use crate::error::EngineError;

/// Build the error list for one error map.
///
/// Every key of the map appears exactly once, in the map's iteration order.
/// A missing or empty map yields an empty list.
///
/// # Errors
///
/// Stops at the first blueprint that fails and returns its
/// [`EngineError::Configuration`].
pub fn build_errors(
    errors: Option<&ErrorMap>,
    blueprints: &Blueprints,
) -> Result<Vec<ValidationError>, EngineError> {
    let Some(errors) = errors else {
        return Ok(Vec::new());
    };

    errors
        .iter()
        .map(|(key, payload)| resolve(key, payload, blueprints.get(key)))
        .collect()
}
