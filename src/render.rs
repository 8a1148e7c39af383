//! Renderer collaborator and placement
//!
//! The engine never touches a UI directly. Everything visible goes through a
//! host-provided [`Renderer`]: insert an error view, remove it, add or remove
//! the invalid-state classes on a marker element.
//!
//! Where things go is decided once, when a control is attached, from a
//! [`Placement`]: the host element plus any optional anchors the surrounding
//! layout provides. The closest-scoped anchor wins.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::blueprint::ValidationError;

/// Opaque handle to a host element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Anchor(String);

impl Anchor {
    /// Wrap a host element identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as given by the host.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Anchor {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// What the renderer should instantiate to show errors.
///
/// Opaque to the engine; passed through to [`Renderer::insert_errors`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "name")]
pub enum ErrorTemplate {
    /// A component that receives the error list as input.
    Component(String),
    /// An inline template that receives the error list as its context.
    Template(String),
}

impl Default for ErrorTemplate {
    fn default() -> Self {
        Self::Component("validation-error".to_string())
    }
}

/// The display side of the engine.
///
/// Implementations are expected to be idempotent for class changes.
pub trait Renderer {
    /// Handle to one inserted error view.
    type View;

    /// Render `errors` with `template` at the end of `target`.
    fn insert_errors(
        &mut self,
        errors: &[ValidationError],
        template: &ErrorTemplate,
        target: &Anchor,
    ) -> Self::View;

    /// Tear down a view returned by [`insert_errors`](Self::insert_errors).
    fn remove_errors(&mut self, view: Self::View);

    /// Add whitespace-separated `classes` to `element`.
    fn add_class(&mut self, element: &Anchor, classes: &str);

    /// Remove whitespace-separated `classes` from `element`.
    fn remove_class(&mut self, element: &Anchor, classes: &str);

    /// Nearest ancestor of `from` (inclusive) matching `selector`.
    fn closest(&self, _from: &Anchor, _selector: &str) -> Option<Anchor> {
        None
    }
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    type View = R::View;

    fn insert_errors(
        &mut self,
        errors: &[ValidationError],
        template: &ErrorTemplate,
        target: &Anchor,
    ) -> Self::View {
        (**self).insert_errors(errors, template, target)
    }

    fn remove_errors(&mut self, view: Self::View) {
        (**self).remove_errors(view)
    }

    fn add_class(&mut self, element: &Anchor, classes: &str) {
        (**self).add_class(element, classes)
    }

    fn remove_class(&mut self, element: &Anchor, classes: &str) {
        (**self).remove_class(element, classes)
    }

    fn closest(&self, from: &Anchor, selector: &str) -> Option<Anchor> {
        (**self).closest(from, selector)
    }
}

impl<R: Renderer + ?Sized> Renderer for Rc<RefCell<R>> {
    type View = R::View;

    fn insert_errors(
        &mut self,
        errors: &[ValidationError],
        template: &ErrorTemplate,
        target: &Anchor,
    ) -> Self::View {
        self.borrow_mut().insert_errors(errors, template, target)
    }

    fn remove_errors(&mut self, view: Self::View) {
        self.borrow_mut().remove_errors(view)
    }

    fn add_class(&mut self, element: &Anchor, classes: &str) {
        self.borrow_mut().add_class(element, classes)
    }

    fn remove_class(&mut self, element: &Anchor, classes: &str) {
        self.borrow_mut().remove_class(element, classes)
    }

    fn closest(&self, from: &Anchor, selector: &str) -> Option<Anchor> {
        self.borrow().closest(from, selector)
    }
}

/// Where a control sits in the host layout.
///
/// # Examples
///
/// ```
/// use formgate::render::{Anchor, Placement};
///
/// let placement = Placement::new("email-input")
///     .with_target_anchor("errors-below-form");
///
/// assert_eq!(placement.insertion_target(), Anchor::from("errors-below-form"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    host: Anchor,
    style_anchor: Option<Anchor>,
    target_anchor: Option<Anchor>,
    container_target: Option<Anchor>,
}

impl Placement {
    /// A placement with only the control's own element.
    pub fn new(host: impl Into<Anchor>) -> Self {
        Self {
            host: host.into(),
            style_anchor: None,
            target_anchor: None,
            container_target: None,
        }
    }

    /// An enclosing element that should carry the invalid classes.
    pub fn with_style_anchor(mut self, anchor: impl Into<Anchor>) -> Self {
        self.style_anchor = Some(anchor.into());
        self
    }

    /// An enclosing element errors should be rendered into.
    pub fn with_target_anchor(mut self, anchor: impl Into<Anchor>) -> Self {
        self.target_anchor = Some(anchor.into());
        self
    }

    /// The render target of a container wrapping this control directly.
    pub fn with_container_target(mut self, anchor: impl Into<Anchor>) -> Self {
        self.container_target = Some(anchor.into());
        self
    }

    /// The control's own element.
    pub fn host(&self) -> &Anchor {
        &self.host
    }

    /// The element that receives the invalid classes.
    ///
    /// Style anchor, then the closest ancestor matching `target_selector`,
    /// then the host itself.
    pub fn mark_element<R: Renderer + ?Sized>(
        &self,
        renderer: &R,
        target_selector: Option<&str>,
    ) -> Anchor {
        self.style_anchor
            .clone()
            .or_else(|| target_selector.and_then(|sel| renderer.closest(&self.host, sel)))
            .unwrap_or_else(|| self.host.clone())
    }

    /// The element error views are inserted into.
    ///
    /// Container target, then target anchor, then the host itself.
    pub fn insertion_target(&self) -> Anchor {
        self.container_target
            .clone()
            .or_else(|| self.target_anchor.clone())
            .unwrap_or_else(|| self.host.clone())
    }
}

impl From<&str> for Placement {
    fn from(host: &str) -> Self {
        Self::new(host)
    }
}
