//! Control surface: abort and retry by id.

use crate::error::FetchError;
use crate::state::RequestState;

use super::{AdmissionReport, FetchScheduler};

impl FetchScheduler {
    /// Aborts `id`: cancels its in-flight call if there is one and marks it
    /// rejected with `Aborted`. Works for declared ids that were never started,
    /// which then stay rejected without ever being admitted. The freed slot is
    /// offered to the next eligible request.
    pub fn abort(&mut self, id: &str) -> AdmissionReport {
        if self.closed {
            return AdmissionReport::default();
        }
        self.mark_aborted(id);
        self.admit_and_publish()
    }

    /// Aborts every in-flight id and every declared id.
    pub fn abort_all(&mut self) -> AdmissionReport {
        if self.closed {
            return AdmissionReport::default();
        }
        let mut ids: Vec<String> = self.requests.iter().map(|d| d.id.clone()).collect();
        let mut extra: Vec<String> = self
            .registry
            .in_flight_ids()
            .into_iter()
            .filter(|id| !ids.contains(id))
            .collect();
        extra.sort();
        ids.extend(extra);
        for id in &ids {
            self.mark_aborted(id);
        }
        self.admit_and_publish()
    }

    /// Restarts `id`: cancels any in-flight call, clears its state and runs
    /// admission, so `id` starts again as soon as a slot is free.
    ///
    /// Fails with `RetryTargetNotFound` if `id` is not declared.
    pub fn retry(&mut self, id: &str) -> Result<AdmissionReport, FetchError> {
        if self.find(id).is_none() {
            return Err(FetchError::RetryTargetNotFound { id: id.to_string() });
        }
        if self.closed {
            return Ok(AdmissionReport::default());
        }
        let was_running = self.registry.has_in_flight(id);
        self.registry.remove(id);
        tracing::debug!(id = %id, was_running, "retry requested");
        Ok(self.admit_and_publish())
    }

    fn mark_aborted(&mut self, id: &str) {
        let was_running = self.registry.cancel(id);
        self.registry.set(id, RequestState::aborted());
        tracing::debug!(id = %id, was_running, "request aborted");
    }
}
