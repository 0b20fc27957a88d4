//! Admission: fill free concurrency slots from declared, not-yet-started requests.

use std::sync::Arc;

use crate::descriptor::{PreparedRequest, RequestDescriptor};
use crate::error::FetchError;
use crate::handle::AbortToken;
use crate::state::RequestState;
use crate::transport::Reporter;

use super::FetchScheduler;

/// Outcome of one admission pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdmissionReport {
    /// Ids started in this pass, in declared order.
    pub started: Vec<String>,
    /// Descriptors that failed validation; each is now rejected with the error.
    pub failed: Vec<FetchError>,
}

impl AdmissionReport {
    pub fn is_empty(&self) -> bool {
        self.started.is_empty() && self.failed.is_empty()
    }
}

impl FetchScheduler {
    /// Starts up to `concurrency - pending` eligible requests in declared order.
    ///
    /// Eligible means declared with no registry entry at all: terminal states
    /// are never re-admitted automatically. A descriptor that fails validation
    /// is recorded as rejected, does not take a slot and does not stop the pass.
    /// The pending count is read from the registry on every call, so one pass
    /// always reaches the fixed point for the current list.
    pub(super) fn admit(&mut self) -> AdmissionReport {
        let mut report = AdmissionReport::default();
        if !self.is_active() {
            return report;
        }
        let available = self
            .concurrency
            .saturating_sub(self.registry.count_pending());
        if available == 0 {
            return report;
        }

        let requests = Arc::clone(&self.requests);
        for descriptor in requests.iter() {
            if report.started.len() >= available {
                break;
            }
            if self.registry.get(&descriptor.id).is_some() {
                continue;
            }
            match descriptor.prepare() {
                Ok(prepared) => {
                    self.launch(descriptor, prepared);
                    report.started.push(descriptor.id.clone());
                }
                Err(e) => {
                    tracing::warn!(id = %descriptor.id, "request not started: {}", e);
                    self.registry
                        .set(&descriptor.id, RequestState::rejected(e.clone(), None));
                    report.failed.push(e);
                }
            }
        }
        debug_assert!(self.registry.count_pending() <= self.concurrency);
        report
    }

    fn launch(&mut self, descriptor: &RequestDescriptor, prepared: PreparedRequest) {
        let generation = self.registry.next_generation();
        let reporter = Reporter::new(
            descriptor.id.clone(),
            generation,
            AbortToken::new(),
            self.events_tx.clone(),
        );
        tracing::debug!(
            id = %descriptor.id,
            generation,
            method = %prepared.method,
            url = %prepared.url,
            "admitting request"
        );
        let handle = self.transport.start(prepared, reporter);
        self.registry.begin(&descriptor.id, generation, handle);
    }
}
