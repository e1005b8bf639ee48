//! Asynchronous polling state machine for long-running backend tasks.
//!
//! The backend answers every poll of a task endpoint with
//! `{status, preliminary, result}`: while the computation runs it may ship
//! partial snapshots in `preliminary`; once it finishes, `result` is
//! authoritative. [`TaskPoller`] re-issues the request on a fixed period
//! until the task is terminal and notifies a subscription callback on every
//! externally visible state change.
//!
//! State never mutates ad hoc: every change goes through the pure
//! [`transition`] function over the closed [`PollEvent`] union, and the
//! poller owns the single mutable state container. Each request carries a
//! monotonically increasing sequence number; a response older than the last
//! applied one is discarded, so transitions apply in request-issue order
//! even if a slow response races a newer one.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use tokio::task::JoinHandle;

use flowscope_core::DfmDocument;

use crate::api::DfmQuery;
use crate::error::ClientError;

/// Default spacing between poll requests.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(1000);

/// Lifecycle of one long-running backend computation.
///
/// `Done` and `Failed` are terminal; `Running` may update its preliminary
/// payload any number of times.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskState<T> {
    /// Polling has not started.
    Idle,
    /// The computation is in progress, possibly with a partial snapshot.
    Running { preliminary: Option<T> },
    /// The computation finished; `result` is authoritative.
    Done { result: T },
    /// Transport failure, non-success status, malformed payload, or a
    /// backend-reported failure. Never left once entered.
    Failed,
}

impl<T> TaskState<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Done { .. } | TaskState::Failed)
    }
}

/// Status field of a poll response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Done,
    Running,
    Failed,
}

/// Wire shape of one poll response. Payloads stay undecoded JSON here;
/// the poller runs them through its decoder before they become observable.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskResponse {
    pub status: TaskStatus,
    #[serde(default)]
    pub preliminary: Option<serde_json::Value>,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

/// Everything that can happen to the state machine, as a closed union.
#[derive(Debug)]
pub enum PollEvent<T> {
    /// The request could not be issued, answered with a non-success status,
    /// or its payload could not be decoded or validated.
    Failure,
    /// A decoded, validated poll response.
    Response {
        status: TaskStatus,
        preliminary: Option<T>,
        result: Option<T>,
    },
}

/// Pure transition function of the task state machine.
///
/// Returns the next state when `event` causes an externally visible change,
/// `None` otherwise. Terminal states absorb every further event. A running
/// response whose preliminary is absent or deep-equal to the current one is
/// not a visible change.
pub fn transition<T: Clone + PartialEq>(
    current: &TaskState<T>,
    event: PollEvent<T>,
) -> Option<TaskState<T>> {
    if current.is_terminal() {
        return None;
    }

    match event {
        PollEvent::Failure => Some(TaskState::Failed),
        PollEvent::Response {
            status: TaskStatus::Failed,
            ..
        } => Some(TaskState::Failed),
        PollEvent::Response {
            status: TaskStatus::Done,
            result: Some(result),
            ..
        } => Some(TaskState::Done { result }),
        // A done response without a result is a protocol violation.
        PollEvent::Response {
            status: TaskStatus::Done,
            result: None,
            ..
        } => Some(TaskState::Failed),
        PollEvent::Response {
            status: TaskStatus::Running,
            preliminary: Some(next),
            ..
        } => {
            let unchanged = matches!(
                current,
                TaskState::Running { preliminary: Some(previous) } if *previous == next
            );
            if unchanged {
                None
            } else {
                Some(TaskState::Running {
                    preliminary: Some(next),
                })
            }
        }
        PollEvent::Response {
            status: TaskStatus::Running,
            preliminary: None,
            ..
        } => None,
    }
}

type PayloadDecoder<T> = dyn Fn(serde_json::Value) -> Result<T, ClientError> + Send + Sync;

/// Subscription callback invoked on every externally visible state change.
pub type ChangeListener<T> = Box<dyn Fn(&TaskState<T>) + Send + Sync>;

struct PollState<T> {
    state: TaskState<T>,
    /// Sequence number of the most recently applied response.
    last_applied: u64,
}

struct Shared<T> {
    client: reqwest::Client,
    url: Url,
    decode: Box<PayloadDecoder<T>>,
    state: Mutex<PollState<T>>,
    on_change: ChangeListener<T>,
}

impl<T: Clone + PartialEq + Send + 'static> Shared<T> {
    async fn run(self: Arc<Self>, period: Duration) {
        let mut sequence: u64 = 0;
        loop {
            tokio::time::sleep(period).await;
            sequence += 1;

            let event = match self.fetch().await {
                Ok(event) => event,
                Err(err) => {
                    tracing::warn!(sequence, error = %err, "task poll failed");
                    PollEvent::Failure
                }
            };
            self.apply(sequence, event);

            if self.state.lock().unwrap().state.is_terminal() {
                tracing::debug!(url = %self.url, "task terminal; polling stops");
                break;
            }
        }
    }

    async fn fetch(&self) -> Result<PollEvent<T>, ClientError> {
        tracing::debug!(url = %self.url, "polling task endpoint");
        let response = self.client.get(self.url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::HttpStatus { status });
        }

        let body = response.text().await?;
        let payload: TaskResponse = serde_json::from_str(&body)?;
        let preliminary = payload.preliminary.map(|v| (self.decode)(v)).transpose()?;
        let result = payload.result.map(|v| (self.decode)(v)).transpose()?;

        Ok(PollEvent::Response {
            status: payload.status,
            preliminary,
            result,
        })
    }

    fn apply(&self, sequence: u64, event: PollEvent<T>) {
        let mut poll_state = self.state.lock().unwrap();

        // A response that raced past a newer one must not rewind the machine.
        if sequence < poll_state.last_applied {
            tracing::debug!(
                sequence,
                last_applied = poll_state.last_applied,
                "discarding stale poll response"
            );
            return;
        }

        if let Some(next) = transition(&poll_state.state, event) {
            poll_state.state = next;
            poll_state.last_applied = sequence;
            let snapshot = poll_state.state.clone();
            drop(poll_state);
            (self.on_change)(&snapshot);
        }
    }
}

/// Polls one task endpoint on a fixed period until the task is terminal.
///
/// An owned object: `start` spawns the polling loop, `stop` (or dropping
/// the poller) aborts it unconditionally, so no timer and no state update
/// can outlive the owner.
pub struct TaskPoller<T> {
    shared: Arc<Shared<T>>,
    period: Duration,
    handle: Option<JoinHandle<()>>,
}

impl<T: Clone + PartialEq + Send + 'static> TaskPoller<T> {
    /// Creates an idle poller for `url`. `decode` turns each raw
    /// preliminary/result payload into the observable value, failing the
    /// task on invalid payloads; `on_change` is invoked on every externally
    /// visible state change.
    pub fn new(
        client: reqwest::Client,
        url: Url,
        decode: impl Fn(serde_json::Value) -> Result<T, ClientError> + Send + Sync + 'static,
        on_change: impl Fn(&TaskState<T>) + Send + Sync + 'static,
    ) -> Self {
        TaskPoller {
            shared: Arc::new(Shared {
                client,
                url,
                decode: Box::new(decode),
                state: Mutex::new(PollState {
                    state: TaskState::Idle,
                    last_applied: 0,
                }),
                on_change: Box::new(on_change),
            }),
            period: DEFAULT_POLL_PERIOD,
            handle: None,
        }
    }

    /// Overrides the fixed poll period (1000 ms by default).
    pub fn with_poll_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Starts the polling loop. Idempotent while running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        {
            let mut poll_state = self.shared.state.lock().unwrap();
            if matches!(poll_state.state, TaskState::Idle) {
                poll_state.state = TaskState::Running { preliminary: None };
            }
        }

        let shared = Arc::clone(&self.shared);
        let period = self.period;
        self.handle = Some(tokio::spawn(shared.run(period)));
    }

    /// Snapshot of the current task state.
    pub fn state(&self) -> TaskState<T> {
        self.shared.state.lock().unwrap().state.clone()
    }
}

impl<T> TaskPoller<T> {
    /// Cancels the polling loop unconditionally.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl<T> Drop for TaskPoller<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Poller for the DFM discovery task of one event log. Every document
/// payload is validated at ingestion; a malformed document fails the task.
pub fn document_poller(
    client: reqwest::Client,
    base: &str,
    query: &DfmQuery,
    on_change: impl Fn(&TaskState<DfmDocument>) + Send + Sync + 'static,
) -> Result<TaskPoller<DfmDocument>, ClientError> {
    let url = query.url(base)?;
    Ok(TaskPoller::new(
        client,
        url,
        |value| DfmDocument::from_value(value).map_err(ClientError::from),
        on_change,
    ))
}
