//! Result sinks: where the worker delivers an execution's single outcome.
//!
//! # Design
//! `deliver` takes `self` by value, so a sink can accept at most one
//! outcome. Two shapes are provided: a pair of closures for callers that
//! want separate success and failure channels, and a tokio oneshot sender
//! for callers that prefer to await or block on the result.

use tokio::sync::oneshot;

use crate::types::{DecodedPayload, ExecutionOutcome, Failure};

pub trait ResultSink: Send + 'static {
    fn deliver(self, outcome: ExecutionOutcome);
}

/// Routes an outcome to one of two closures.
pub struct CallbackSink<S, F> {
    on_success: S,
    on_failure: F,
}

/// Build a two-channel sink. Exactly one of the closures runs.
pub fn callbacks<S, F>(on_success: S, on_failure: F) -> CallbackSink<S, F>
where
    S: FnOnce(DecodedPayload) + Send + 'static,
    F: FnOnce(Failure) + Send + 'static,
{
    CallbackSink { on_success, on_failure }
}

impl<S, F> ResultSink for CallbackSink<S, F>
where
    S: FnOnce(DecodedPayload) + Send + 'static,
    F: FnOnce(Failure) + Send + 'static,
{
    fn deliver(self, outcome: ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Success { payload, .. } => (self.on_success)(payload),
            ExecutionOutcome::Failure(failure) => (self.on_failure)(failure),
        }
    }
}

impl ResultSink for oneshot::Sender<ExecutionOutcome> {
    fn deliver(self, outcome: ExecutionOutcome) {
        if self.send(outcome).is_err() {
            tracing::debug!("result receiver dropped before delivery");
        }
    }
}

/// Discards the outcome.
impl ResultSink for () {
    fn deliver(self, _outcome: ExecutionOutcome) {}
}

/// A oneshot sender/receiver pair. The receiver resolves when the request
/// completes, or errors if the execution ends without delivering.
pub fn oneshot_sink() -> (oneshot::Sender<ExecutionOutcome>, oneshot::Receiver<ExecutionOutcome>) {
    oneshot::channel()
}
