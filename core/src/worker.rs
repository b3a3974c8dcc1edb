//! Single-task background worker: runs one round trip off the caller's
//! thread and delivers its outcome.
//!
//! # Design
//! Each client owns one `ExecutionState` cell shared with its worker and
//! any `ExecutionHandle`. State moves forward only, through atomic
//! compare-and-swap:
//!
//! ```text
//! Idle -> Submitted -> InFlight -> Delivered | Suppressed
//!   \________\_______-> Cancelled
//! ```
//!
//! `cancel` wins only while the task has not started. Once the worker has
//! moved the state to `InFlight` the round trip runs to completion, since
//! the transport call cannot be interrupted.
//!
//! The task travels to the worker thread through a one-slot queue whose
//! sending side is dropped immediately after the single submission.

use std::ops::{Deref, DerefMut};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};

use crate::classify::{classify, Classification};
use crate::error::TransportError;
use crate::http::{Connection, HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::sink::ResultSink;
use crate::types::{ExecutionOutcome, Failure};

const WORKER_THREAD_NAME: &str = "webclient-worker";

/// Lifecycle of a client's single execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExecutionState {
    Idle = 0,
    Submitted = 1,
    InFlight = 2,
    Delivered = 3,
    /// Finished without delivering (2xx without a reason phrase).
    Suppressed = 4,
    Cancelled = 5,
}

impl ExecutionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ExecutionState::Idle,
            1 => ExecutionState::Submitted,
            2 => ExecutionState::InFlight,
            3 => ExecutionState::Delivered,
            4 => ExecutionState::Suppressed,
            5 => ExecutionState::Cancelled,
            other => unreachable!("invalid execution state byte {other}"),
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Delivered | ExecutionState::Suppressed | ExecutionState::Cancelled
        )
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SharedState(Arc<AtomicU8>);

impl SharedState {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ExecutionState::Idle as u8)))
    }

    pub(crate) fn load(&self) -> ExecutionState {
        ExecutionState::from_u8(self.0.load(Ordering::Acquire))
    }

    fn transition(&self, from: ExecutionState, to: ExecutionState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn store(&self, to: ExecutionState) {
        self.0.store(to as u8, Ordering::Release);
    }

    /// Returns true if this call prevented the task from starting.
    pub(crate) fn cancel(&self) -> bool {
        let cancelled = self.transition(ExecutionState::Idle, ExecutionState::Cancelled)
            || self.transition(ExecutionState::Submitted, ExecutionState::Cancelled);
        if cancelled {
            tracing::debug!("execution cancelled before start");
        }
        cancelled
    }
}

/// Handle to a submitted execution.
#[derive(Debug)]
pub struct ExecutionHandle {
    state: SharedState,
    thread: Option<JoinHandle<()>>,
}

impl ExecutionHandle {
    /// Best-effort cancellation. Returns true only if the request had not
    /// started; an in-flight round trip is never interrupted.
    pub fn cancel(&self) -> bool {
        self.state.cancel()
    }

    pub fn state(&self) -> ExecutionState {
        self.state.load()
    }

    /// Block until the worker thread has exited and return the final state.
    pub fn join(mut self) -> ExecutionState {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("worker thread panicked");
            }
        }
        self.state.load()
    }
}

struct Task<T, S> {
    transport: Arc<T>,
    request: HttpRequest,
    sink: S,
}

/// Submit `request` for execution on a dedicated worker thread.
///
/// Returns immediately. If the state was already cancelled nothing is
/// spawned and the sink is dropped without a delivery.
pub(crate) fn submit<T, S>(
    transport: Arc<T>,
    request: HttpRequest,
    sink: S,
    state: SharedState,
) -> ExecutionHandle
where
    T: Transport,
    S: ResultSink,
{
    if !state.transition(ExecutionState::Idle, ExecutionState::Submitted) {
        tracing::debug!(state = ?state.load(), "submission rejected");
        return ExecutionHandle { state, thread: None };
    }
    tracing::debug!(method = request.method.as_str(), url = %request.url, "request submitted");

    let (queue, inbox) = mpsc::sync_channel::<Task<T, S>>(1);
    let worker_state = state.clone();
    let spawned = thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(move || {
            if let Ok(task) = inbox.recv() {
                run(task, &worker_state);
            }
        });

    let task = Task { transport, request, sink };
    let thread = match spawned {
        Ok(thread) => match queue.send(task) {
            Ok(()) => Some(thread),
            Err(mpsc::SendError(task)) => {
                fail_unstarted(task, &state);
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "failed to spawn worker thread");
            fail_unstarted(task, &state);
            None
        }
    };
    drop(queue);

    ExecutionHandle { state, thread }
}

/// Deliver a transport failure for a task the worker never received.
fn fail_unstarted<T, S: ResultSink>(task: Task<T, S>, state: &SharedState) {
    if state.transition(ExecutionState::Submitted, ExecutionState::Delivered) {
        task.sink.deliver(ExecutionOutcome::Failure(Failure::transport()));
    }
}

fn run<T: Transport, S: ResultSink>(task: Task<T, S>, state: &SharedState) {
    if !state.transition(ExecutionState::Submitted, ExecutionState::InFlight) {
        tracing::debug!("task cancelled before start");
        return;
    }

    let span = tracing::info_span!(
        "round_trip",
        method = task.request.method.as_str(),
        url = %task.request.url,
    );
    let _enter = span.enter();

    let result = catch_unwind(AssertUnwindSafe(|| round_trip(&*task.transport, &task.request)))
        .unwrap_or(Err(TransportError::Panicked));

    let classification = match result {
        Ok(response) => {
            tracing::debug!(status = response.status, "response received");
            classify(&response)
        }
        Err(e) => {
            tracing::warn!(error = %e, "round trip failed");
            Classification::Deliver(ExecutionOutcome::Failure(Failure::transport()))
        }
    };

    match classification {
        Classification::Deliver(outcome) => {
            state.store(ExecutionState::Delivered);
            task.sink.deliver(outcome);
        }
        Classification::Suppress => {
            tracing::warn!("2xx response without a reason phrase, no result delivered");
            state.store(ExecutionState::Suppressed);
        }
    }
}

/// Closes the wrapped connection when dropped.
struct ConnectionGuard<C: Connection>(C);

impl<C: Connection> Deref for ConnectionGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.0
    }
}

impl<C: Connection> DerefMut for ConnectionGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.0
    }
}

impl<C: Connection> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Open, configure, write and send. The connection is closed on return.
pub(crate) fn round_trip<T: Transport>(
    transport: &T,
    request: &HttpRequest,
) -> Result<HttpResponse, TransportError> {
    let mut conn = ConnectionGuard(transport.open(&request.url)?);
    conn.set_method(request.method);
    conn.set_timeouts(request.timeout, request.timeout);
    conn.set_follow_redirects(false);
    for (name, value) in &request.headers {
        conn.set_header(name, value);
    }

    let body = request.body.as_deref().filter(|body| !body.is_empty());
    if let (HttpMethod::Post, Some(body)) = (request.method, body) {
        if request.header("content-type").is_none() {
            if let Some(content_type) = &request.body_content_type {
                conn.set_header("Content-Type", content_type);
            }
        }
        conn.set_header("Content-Length", &body.len().to_string());
        conn.write_body(body)?;
    }

    conn.send()
}
