//! Reconciliation of the registry against a newly declared request list.

use std::collections::HashSet;
use std::sync::Arc;

use crate::descriptor::{ensure_unique_ids, RequestDescriptor};
use crate::error::FetchError;

use super::{AdmissionReport, FetchScheduler};

impl FetchScheduler {
    /// Replaces the declared list.
    ///
    /// No-op when `requests` is the list already declared (same allocation).
    /// Ids no longer declared are cancelled and forgotten; retained ids keep
    /// their state untouched, even if other descriptor fields changed; newly
    /// declared ids are admitted as slots allow.
    pub fn set_requests(
        &mut self,
        requests: Arc<[RequestDescriptor]>,
    ) -> Result<AdmissionReport, FetchError> {
        if Arc::ptr_eq(&self.requests, &requests) {
            return Ok(AdmissionReport::default());
        }
        ensure_unique_ids(&requests)?;
        if self.closed {
            return Ok(AdmissionReport::default());
        }

        let declared: HashSet<&str> = requests.iter().map(|d| d.id.as_str()).collect();
        let mut removed: Vec<String> = self
            .registry
            .known_ids()
            .into_iter()
            .filter(|id| !declared.contains(id.as_str()))
            .collect();
        removed.sort();
        for id in &removed {
            let was_running = self.registry.has_in_flight(id);
            self.registry.remove(id);
            tracing::debug!(id = %id, was_running, "request no longer declared, evicted");
        }

        self.requests = requests;
        Ok(self.admit_and_publish())
    }
}
