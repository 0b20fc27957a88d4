//! Concurrency-bounded multi-request scheduler.
//!
//! Keeps at most `concurrency` declared requests in flight, admits the rest in
//! declared order as slots free up, reconciles the registry when the declared
//! list changes and exposes `abort` / `retry` per id.
//!
//! All registry mutation happens through `&mut self` on one task. Transports
//! report over a channel; [`FetchScheduler::step`] is the only suspension
//! point, and admission runs again after every event that mutates state.

mod admission;
mod control;
mod events;
mod reconcile;


pub use admission::AdmissionReport;
pub use events::{Update, UpdateKind};

use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::descriptor::{ensure_unique_ids, RequestDescriptor};
use crate::error::FetchError;
use crate::registry::Registry;
use crate::state::{RequestState, StatesSnapshot};
use crate::transport::{Transport, TransportEvent};

/// Default number of requests in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 2;

/// Scheduler for a declared list of requests.
pub struct FetchScheduler {
    transport: Arc<dyn Transport>,
    concurrency: usize,
    requests: Arc<[RequestDescriptor]>,
    registry: Registry,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: mpsc::UnboundedReceiver<TransportEvent>,
    snapshot_tx: watch::Sender<StatesSnapshot>,
    mounted: bool,
    closed: bool,
}

impl FetchScheduler {
    /// Creates a scheduler for `requests`. Nothing starts until [`mount`](Self::mount).
    ///
    /// `concurrency` is clamped to at least 1.
    pub fn new(
        transport: Arc<dyn Transport>,
        concurrency: usize,
        requests: Arc<[RequestDescriptor]>,
    ) -> Result<Self, FetchError> {
        ensure_unique_ids(&requests)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, _) = watch::channel(StatesSnapshot::default());
        let scheduler = Self {
            transport,
            concurrency: concurrency.max(1),
            requests,
            registry: Registry::new(),
            events_tx,
            events_rx,
            snapshot_tx,
            mounted: false,
            closed: false,
        };
        scheduler.publish();
        Ok(scheduler)
    }

    /// Starts scheduling: admits the first `concurrency` declared requests.
    pub fn mount(&mut self) -> AdmissionReport {
        if self.closed || self.mounted {
            return AdmissionReport::default();
        }
        self.mounted = true;
        tracing::debug!(
            requests = self.requests.len(),
            concurrency = self.concurrency,
            "scheduler mounted"
        );
        self.admit_and_publish()
    }

    /// Aborts every known request and stops the scheduler. Later transport
    /// events, reconciliations, retries and admissions have no effect.
    pub fn unmount(&mut self) {
        if self.closed {
            return;
        }
        self.abort_all();
        self.closed = true;
        tracing::debug!("scheduler unmounted");
        self.publish();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Changes the concurrency cap and fills any newly available slots.
    /// Lowering the cap never cancels requests already in flight.
    pub fn set_concurrency(&mut self, concurrency: usize) -> AdmissionReport {
        self.concurrency = concurrency.max(1);
        self.admit_and_publish()
    }

    pub fn requests(&self) -> &Arc<[RequestDescriptor]> {
        &self.requests
    }

    /// State of every declared request, in declared order. Declared ids that
    /// have not been admitted yet report the idle state.
    pub fn states(&self) -> StatesSnapshot {
        StatesSnapshot::new(
            self.requests
                .iter()
                .map(|d| {
                    let state = self.registry.get(&d.id).cloned().unwrap_or_default();
                    (d.id.clone(), state)
                })
                .collect(),
        )
    }

    /// State of one id, if it is declared.
    pub fn state(&self, id: &str) -> Option<RequestState> {
        self.find(id)
            .map(|d| self.registry.get(&d.id).cloned().unwrap_or_default())
    }

    /// Receives a fresh snapshot after every state change.
    pub fn subscribe(&self) -> watch::Receiver<StatesSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.registry.count_pending()
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &Registry {
        &self.registry
    }

    fn find(&self, id: &str) -> Option<&RequestDescriptor> {
        self.requests.iter().find(|d| d.id == id)
    }

    fn is_active(&self) -> bool {
        self.mounted && !self.closed
    }

    fn admit_and_publish(&mut self) -> AdmissionReport {
        let report = self.admit();
        self.publish();
        report
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.states());
    }
}
