//! Single-request lifecycle collaborator.
//!
//! The scheduler hands each admitted request to a [`Transport`] together with
//! a [`Reporter`]. The transport performs one HTTP call without blocking the
//! caller, reports zero or more progress events and then exactly one outcome,
//! unless the request is cancelled first, in which case nothing is reported.

mod curl_easy;
mod parse;

pub use curl_easy::{CurlOptions, CurlTransport};

use tokio::sync::mpsc::UnboundedSender;

use crate::descriptor::PreparedRequest;
use crate::error::FetchError;
use crate::handle::{AbortToken, RequestHandle};
use crate::state::{Progress, Response};

/// Performs single requests on behalf of the scheduler.
pub trait Transport: Send + Sync {
    /// Starts `request` and returns its cancellable handle. Must not block.
    fn start(&self, request: PreparedRequest, reporter: Reporter) -> RequestHandle;
}

/// What a transport delivered for one admitted request.
#[derive(Debug)]
pub(crate) enum EventKind {
    Progress(Progress),
    Succeeded(Response),
    Failed(FetchError, Option<Response>),
}

/// Event stamped with the admission it belongs to.
#[derive(Debug)]
pub(crate) struct TransportEvent {
    pub(crate) id: String,
    pub(crate) generation: u64,
    pub(crate) kind: EventKind,
}

/// Delivers progress and the final outcome of one request back to the scheduler.
///
/// `succeed` and `fail` consume the reporter, so an outcome is delivered at
/// most once. Nothing is sent after the request's abort token is set.
///
/// A reporter dropped without an outcome (transport bug, panic in the worker)
/// reports a `RequestFailure`, so the request never stays pending forever.
#[derive(Debug)]
pub struct Reporter {
    id: String,
    generation: u64,
    token: AbortToken,
    tx: UnboundedSender<TransportEvent>,
    settled: bool,
}

/// Message stored when a transport drops a request without an outcome.
pub const DROPPED_MESSAGE: &str = "transport dropped request";

impl Reporter {
    pub(crate) fn new(
        id: String,
        generation: u64,
        token: AbortToken,
        tx: UnboundedSender<TransportEvent>,
    ) -> Self {
        Self {
            id,
            generation,
            token,
            tx,
            settled: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Handle sharing this request's abort token.
    pub fn handle(&self) -> RequestHandle {
        RequestHandle::new(self.token.clone())
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn progress(&self, progress: Progress) {
        self.send(EventKind::Progress(progress));
    }

    pub fn succeed(mut self, response: Response) {
        self.settled = true;
        self.send(EventKind::Succeeded(response));
    }

    pub fn fail(mut self, error: FetchError, response: Option<Response>) {
        self.settled = true;
        self.send(EventKind::Failed(error, response));
    }

    fn send(&self, kind: EventKind) {
        if self.token.is_cancelled() {
            return;
        }
        // Receiver gone means the scheduler was dropped; nothing left to update.
        let _ = self.tx.send(TransportEvent {
            id: self.id.clone(),
            generation: self.generation,
            kind,
        });
    }
}

impl Drop for Reporter {
    fn drop(&mut self) {
        if self.settled || self.token.is_cancelled() {
            return;
        }
        tracing::warn!(id = %self.id, generation = self.generation, "{}", DROPPED_MESSAGE);
        self.send(EventKind::Failed(
            FetchError::RequestFailure {
                status: None,
                message: DROPPED_MESSAGE.to_string(),
            },
            None,
        ));
    }
}
