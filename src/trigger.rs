//! Trigger stream combinator
//!
//! Status changes, value changes and (optionally) form submissions arrive
//! independently. This module fans them into one ordered sequence of
//! [`EvaluationPulse`]s.
//!
//! Two shapes are offered:
//!
//! - [`PulseBus`]: an explicit channel. Every source holds a [`PulseEmitter`]
//!   and pushes into the same unbounded queue, so pulses come out strictly in
//!   arrival order. This is what a [`Subscription`](crate::engine::Subscription)
//!   listens on.
//! - [`merge_sources`]: a stream adapter over three existing `()` streams for
//!   hosts that already expose their notifications as streams.
//!
//! Neither deduplicates: two notifications are two pulses.
//!
//! # Examples
//!
//! ```
//! use formgate::pulse::EvaluationPulse;
//! use formgate::trigger::PulseBus;
//!
//! let (emitter, mut receiver) = PulseBus::channel(false);
//!
//! assert!(emitter.value_changed());
//! assert!(emitter.status_changed());
//! assert!(!emitter.form_submitted()); // validate_on_submit is off
//!
//! assert_eq!(receiver.try_recv(), Some(EvaluationPulse::Value));
//! assert_eq!(receiver.try_recv(), Some(EvaluationPulse::Status));
//! assert_eq!(receiver.try_recv(), None);
//! ```

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use futures::FutureExt;

use crate::pulse::{pulse_for, ControlEvent, EvaluationPulse};

/// Constructor for the pulse channel.
#[derive(Debug, Clone, Copy)]
pub struct PulseBus;

impl PulseBus {
    /// Create a connected emitter/receiver pair.
    ///
    /// With `validate_on_submit` off, submissions never reach the receiver.
    pub fn channel(validate_on_submit: bool) -> (PulseEmitter, PulseReceiver) {
        let (tx, rx) = unbounded();
        (
            PulseEmitter {
                tx,
                validate_on_submit,
            },
            PulseReceiver { rx },
        )
    }
}

/// Sending half of the pulse channel. Cheap to clone, one per source.
#[derive(Debug, Clone)]
pub struct PulseEmitter {
    tx: UnboundedSender<EvaluationPulse>,
    validate_on_submit: bool,
}

impl PulseEmitter {
    /// Forward a host notification.
    ///
    /// Returns true if a pulse was queued; false if the notification maps to
    /// no pulse or the subscription has stopped.
    pub fn notify(&self, event: ControlEvent) -> bool {
        match pulse_for(event, self.validate_on_submit) {
            Some(pulse) => self.tx.unbounded_send(pulse).is_ok(),
            None => false,
        }
    }

    /// The control's validity status changed.
    pub fn status_changed(&self) -> bool {
        self.notify(ControlEvent::StatusChanged)
    }

    /// The control's value changed.
    pub fn value_changed(&self) -> bool {
        self.notify(ControlEvent::ValueChanged)
    }

    /// The enclosing form was submitted.
    pub fn form_submitted(&self) -> bool {
        self.notify(ControlEvent::FormSubmitted)
    }

    /// Returns true once the receiving side has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of the pulse channel.
#[derive(Debug)]
pub struct PulseReceiver {
    rx: UnboundedReceiver<EvaluationPulse>,
}

impl PulseReceiver {
    /// Take the next queued pulse without waiting.
    pub fn try_recv(&mut self) -> Option<EvaluationPulse> {
        self.rx.next().now_or_never().flatten()
    }

    /// Stop accepting pulses. Emitters see `is_closed() == true` afterwards.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

impl Stream for PulseReceiver {
    type Item = EvaluationPulse;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.rx).poll_next(cx)
    }
}

/// Merge three notification streams into one pulse stream.
///
/// When `validate_on_submit` is false the submit stream is dropped and
/// replaced by one that never yields. The merged stream ends once every
/// remaining source has ended.
///
/// # Examples
///
/// ```
/// use formgate::pulse::EvaluationPulse;
/// use formgate::trigger::merge_sources;
/// use futures::stream::{self, StreamExt};
///
/// # tokio_test::block_on(async {
/// let pulses: Vec<_> = merge_sources(
///     stream::iter(vec![()]),
///     stream::empty(),
///     stream::iter(vec![(), ()]),
///     false,
/// )
/// .collect()
/// .await;
///
/// assert_eq!(pulses, vec![EvaluationPulse::Status]);
/// # });
/// ```
pub fn merge_sources<S1, S2, S3>(
    status: S1,
    value: S2,
    submit: S3,
    validate_on_submit: bool,
) -> BoxStream<'static, EvaluationPulse>
where
    S1: Stream<Item = ()> + Send + 'static,
    S2: Stream<Item = ()> + Send + 'static,
    S3: Stream<Item = ()> + Send + 'static,
{
    let submit = if validate_on_submit {
        submit.map(|()| EvaluationPulse::Submit).boxed()
    } else {
        stream::empty().boxed()
    };

    stream::select_all([
        status.map(|()| EvaluationPulse::Status).boxed(),
        value.map(|()| EvaluationPulse::Value).boxed(),
        submit,
    ])
    .boxed()
}
