//! A password field validated while the user types, then submitted.
//!
//! Run with: cargo run --example signup_form --features tracing,async

use std::cell::RefCell;
use std::rc::Rc;

use formgate::prelude::*;
use serde_json::json;

/// Prints every side effect instead of touching a UI.
#[derive(Debug, Default)]
struct ConsoleRenderer {
    next_view: usize,
}

impl Renderer for ConsoleRenderer {
    type View = usize;

    fn insert_errors(
        &mut self,
        errors: &[ValidationError],
        template: &ErrorTemplate,
        target: &Anchor,
    ) -> usize {
        let view = self.next_view;
        self.next_view += 1;
        let messages: Vec<&str> = errors.iter().map(ValidationError::message).collect();
        println!("  + view #{} in {} via {:?}: {:?}", view, target.as_str(), template, messages);
        view
    }

    fn remove_errors(&mut self, view: usize) {
        println!("  - view #{}", view);
    }

    fn add_class(&mut self, element: &Anchor, classes: &str) {
        println!("  + class '{}' on {}", classes, element.as_str());
    }

    fn remove_class(&mut self, element: &Anchor, classes: &str) {
        println!("  - class '{}' on {}", classes, element.as_str());
    }
}

fn too_short(actual: usize) -> ErrorMap {
    [(
        "minlength".to_string(),
        json!({ "requiredLength": 8, "actualLength": actual }),
    )]
    .into_iter()
    .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let control = Rc::new(RefCell::new(
        ControlSnapshot::new().with_error("required", json!(true)),
    ));
    let config = ValidationConfig::new()
        .with_blueprints(Blueprints::standard())
        .with_validate_on_submit(true);
    let mut renderer = ConsoleRenderer::default();

    let (subscription, emitter) = ValidationEngine::start(
        Rc::clone(&control),
        config,
        &mut renderer,
        &Placement::new("#password"),
    );

    let typing = async move {
        tracing::info!("user focuses and leaves the field empty, then submits");
        emitter.form_submitted();
        tokio::task::yield_now().await;

        for typed in 1..=3 {
            tracing::info!(typed, "user types");
            {
                let mut c = control.borrow_mut();
                c.set_dirty(true);
                c.set_errors(Some(too_short(typed)));
            }
            emitter.value_changed();
            emitter.status_changed();
            tokio::task::yield_now().await;
        }

        tracing::info!("user finishes a valid password");
        control.borrow_mut().set_errors(None);
        emitter.value_changed();
        drop(emitter);
    };

    let (summary, ()) = tokio::join!(subscription.run_until(std::future::pending()), typing);

    tracing::info!(?summary, "form closed");
}
