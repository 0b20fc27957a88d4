//! Request registry: per-id state plus the handle of the in-flight call.
//!
//! Invariant: an id has an in-flight entry iff its state is `pending`. Every
//! in-flight entry carries the generation it was admitted with; transport
//! events from any other generation are stale and must be dropped.

use std::collections::{HashMap, HashSet};

use crate::handle::RequestHandle;
use crate::state::RequestState;

#[derive(Debug)]
struct InFlight {
    generation: u64,
    handle: RequestHandle,
}

/// Registry owned by one scheduler instance.
#[derive(Debug, Default)]
pub struct Registry {
    states: HashMap<String, RequestState>,
    in_flight: HashMap<String, InFlight>,
    next_generation: u64,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&RequestState> {
        self.states.get(id)
    }

    /// Stores a non-pending state for `id`, cancelling any in-flight call first.
    /// Pending states are only created through [`Registry::begin`].
    pub fn set(&mut self, id: &str, state: RequestState) {
        debug_assert!(!state.pending, "pending states come from begin()");
        self.cancel(id);
        self.states.insert(id.to_string(), state);
    }

    /// Removes all trace of `id`, cancelling its in-flight call if any.
    pub fn remove(&mut self, id: &str) -> Option<RequestState> {
        self.cancel(id);
        self.states.remove(id)
    }

    /// Cancels and forgets the in-flight call for `id`. Returns true if one existed.
    pub fn cancel(&mut self, id: &str) -> bool {
        match self.in_flight.remove(id) {
            Some(entry) => {
                entry.handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Reserves the generation for a new admission of `id`.
    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Marks `id` pending with `handle` as its in-flight call.
    pub fn begin(&mut self, id: &str, generation: u64, handle: RequestHandle) {
        if let Some(previous) = self.in_flight.insert(
            id.to_string(),
            InFlight { generation, handle },
        ) {
            previous.handle.cancel();
        }
        self.states.insert(id.to_string(), RequestState::pending());
    }

    /// True if `generation` is the live admission of `id`.
    pub fn is_current(&self, id: &str, generation: u64) -> bool {
        self.in_flight
            .get(id)
            .map(|entry| entry.generation == generation)
            .unwrap_or(false)
    }

    /// Applies `update` to the pending state of the live admission. Returns
    /// false (and changes nothing) for a stale generation.
    pub fn update_pending<F>(&mut self, id: &str, generation: u64, update: F) -> bool
    where
        F: FnOnce(&mut RequestState),
    {
        if !self.is_current(id, generation) {
            return false;
        }
        match self.states.get_mut(id) {
            Some(state) => {
                update(state);
                true
            }
            None => false,
        }
    }

    /// Completes the live admission of `id` with a terminal state. Returns
    /// false (and changes nothing) for a stale generation.
    pub fn settle(&mut self, id: &str, generation: u64, state: RequestState) -> bool {
        if !self.is_current(id, generation) {
            return false;
        }
        self.in_flight.remove(id);
        self.states.insert(id.to_string(), state);
        true
    }

    pub fn pending_ids(&self) -> HashSet<String> {
        self.states
            .iter()
            .filter(|(_, s)| s.pending)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn count_pending(&self) -> usize {
        self.states.values().filter(|s| s.pending).count()
    }

    /// Ids with either a state entry or an in-flight call.
    pub fn known_ids(&self) -> HashSet<String> {
        self.states
            .keys()
            .chain(self.in_flight.keys())
            .cloned()
            .collect()
    }

    pub fn in_flight_ids(&self) -> Vec<String> {
        self.in_flight.keys().cloned().collect()
    }

    pub fn has_in_flight(&self, id: &str) -> bool {
        self.in_flight.contains_key(id)
    }

    pub fn has_any_in_flight(&self) -> bool {
        !self.in_flight.is_empty()
    }

    /// Checks the handle/pending invariant. Used by tests and debug assertions.
    pub fn invariant_holds(&self) -> bool {
        let pending = self.pending_ids();
        pending.len() == self.in_flight.len()
            && self.in_flight.keys().all(|id| pending.contains(id))
    }

    /// Cancels every in-flight call and clears the handle map (states are kept).
    pub fn cancel_all(&mut self) {
        for (_, entry) in self.in_flight.drain() {
            entry.handle.cancel();
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
