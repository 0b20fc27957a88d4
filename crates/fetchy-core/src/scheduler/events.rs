//! Applying transport events to the registry.

use crate::error::FetchError;
use crate::state::{RequestState, Response, StatesSnapshot};
use crate::transport::{EventKind, TransportEvent};

use super::{AdmissionReport, FetchScheduler};

/// What a processed transport event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Progress,
    Fulfilled,
    Rejected,
    /// Event from a cancelled or superseded admission; nothing changed.
    Stale,
}

/// Result of processing one transport event.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub id: String,
    pub kind: UpdateKind,
    /// Requests started because this event freed a slot.
    pub admission: AdmissionReport,
}

impl FetchScheduler {
    /// Waits for the next transport event and applies it.
    ///
    /// Returns `None` once nothing is in flight (no further events will
    /// arrive) or after [`unmount`](Self::unmount). Cancel-safe: dropping the
    /// future before it resolves loses no event.
    pub async fn step(&mut self) -> Option<Update> {
        if self.closed {
            return None;
        }
        if let Some(update) = self.try_step() {
            return Some(update);
        }
        if !self.registry.has_any_in_flight() {
            return None;
        }
        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }

    /// Applies an already-delivered event, if any, without waiting.
    pub fn try_step(&mut self) -> Option<Update> {
        if self.closed {
            return None;
        }
        let event = self.events_rx.try_recv().ok()?;
        Some(self.apply(event))
    }

    /// Drives the scheduler until nothing is in flight and returns the final states.
    pub async fn run_until_idle(&mut self) -> StatesSnapshot {
        while self.step().await.is_some() {}
        self.states()
    }

    fn apply(&mut self, event: TransportEvent) -> Update {
        let TransportEvent {
            id,
            generation,
            kind,
        } = event;

        let kind = match kind {
            EventKind::Progress(progress) => {
                if self
                    .registry
                    .update_pending(&id, generation, |s| s.progress = Some(progress))
                {
                    self.publish();
                    UpdateKind::Progress
                } else {
                    UpdateKind::Stale
                }
            }
            EventKind::Succeeded(response) => self.settle(&id, generation, Ok(response)),
            EventKind::Failed(error, response) => {
                let state = RequestState::rejected(error, response);
                self.settle(&id, generation, Err(state))
            }
        };

        if kind == UpdateKind::Stale {
            tracing::trace!(id = %id, generation, "dropping stale transport event");
            return Update {
                id,
                kind,
                admission: AdmissionReport::default(),
            };
        }
        let admission = match kind {
            UpdateKind::Fulfilled | UpdateKind::Rejected => self.admit_and_publish(),
            _ => AdmissionReport::default(),
        };
        Update {
            id,
            kind,
            admission,
        }
    }

    fn settle(
        &mut self,
        id: &str,
        generation: u64,
        outcome: Result<Response, RequestState>,
    ) -> UpdateKind {
        if !self.registry.is_current(id, generation) {
            return UpdateKind::Stale;
        }
        let progress = self.registry.get(id).and_then(|s| s.progress);

        let mut state = match outcome {
            Ok(response) => match response.decode_value() {
                Ok(value) => {
                    let state = RequestState::fulfilled(response, value);
                    match self.find(id).and_then(|d| d.then.as_ref()) {
                        Some(then) => then.apply(state),
                        None => state,
                    }
                }
                Err(e) => RequestState::rejected(e, Some(response)),
            },
            Err(state) => state,
        };
        normalize_settled(&mut state);
        if state.progress.is_none() {
            state.progress = progress;
        }

        let kind = if state.rejected {
            UpdateKind::Rejected
        } else {
            UpdateKind::Fulfilled
        };
        match &state.error {
            Some(e) => tracing::info!(id = %id, generation, "request rejected: {}", e),
            None => tracing::info!(
                id = %id,
                generation,
                status = state.result.as_ref().map(|r| r.status),
                "request fulfilled"
            ),
        }
        self.registry.settle(id, generation, state);
        kind
    }
}

/// Makes a settled state consistent after a `then` transform: exactly one of
/// `fulfilled`/`rejected`, an error iff rejected, never pending.
fn normalize_settled(state: &mut RequestState) {
    state.pending = false;
    if state.rejected {
        state.fulfilled = false;
        if state.error.is_none() {
            state.error = Some(FetchError::RequestFailure {
                status: state.result.as_ref().map(|r| r.status),
                message: "rejected by completion transform".to_string(),
            });
        }
    } else {
        state.fulfilled = true;
        state.error = None;
    }
}
