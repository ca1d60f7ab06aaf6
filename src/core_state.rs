//! Owner of the canonical stop collection.
//!
//! `CoreState` is the single writer: merges, removals and resets each take
//! the write lock for their whole duration, so readers observe either the
//! previous collection or the next one, never a merge in progress.

use std::sync::{RwLock, RwLockReadGuard};

use serde::Serialize;
use thiserror::Error;

use crate::models::{DeliveryStop, StopId};
use crate::pipeline::reconcile::{self, SortPolicy};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Internal lock poisoned")]
    LockPoisoned,
}

/// What a merge changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    pub added: usize,
    pub duplicates: usize,
    pub total: usize,
}

/// Canonical collection state, shared by reference (wrap in `Arc` if needed).
pub struct CoreState {
    stops: RwLock<Vec<DeliveryStop>>,
    sort_policy: SortPolicy,
}

impl CoreState {
    pub fn new(sort_policy: SortPolicy) -> Self {
        Self {
            stops: RwLock::new(Vec::new()),
            sort_policy,
        }
    }

    pub fn sort_policy(&self) -> SortPolicy {
        self.sort_policy
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<DeliveryStop>>, CoreError> {
        self.stops.read().map_err(|_| CoreError::LockPoisoned)
    }

    /// Snapshot of the current collection.
    pub fn stops(&self) -> Result<Vec<DeliveryStop>, CoreError> {
        Ok(self.read()?.clone())
    }

    pub fn len(&self) -> Result<usize, CoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, CoreError> {
        Ok(self.read()?.is_empty())
    }

    /// Reconcile a batch into the collection and swap the result in.
    pub fn merge_batch(&self, batch: Vec<DeliveryStop>) -> Result<MergeSummary, CoreError> {
        let incoming = batch.len();
        let mut guard = self.stops.write().map_err(|_| CoreError::LockPoisoned)?;

        let before = guard.len();
        let next = reconcile::merge(&guard, batch, self.sort_policy);
        let added = next.len() - before;
        *guard = next;

        let summary = MergeSummary {
            added,
            duplicates: incoming - added,
            total: guard.len(),
        };
        tracing::info!(
            added = summary.added,
            duplicates = summary.duplicates,
            total = summary.total,
            "Merged batch into stop collection"
        );
        Ok(summary)
    }

    /// Remove the stop with this id. Returns whether one was removed.
    pub fn remove_stop(&self, id: &StopId) -> Result<bool, CoreError> {
        let mut guard = self.stops.write().map_err(|_| CoreError::LockPoisoned)?;
        let before = guard.len();
        guard.retain(|s| s.id() != id);
        let removed = guard.len() < before;
        if removed {
            tracing::debug!(stop_id = %id, "Removed stop");
        }
        Ok(removed)
    }

    /// Empty the collection. Returns how many stops were dropped.
    pub fn reset(&self) -> Result<usize, CoreError> {
        let mut guard = self.stops.write().map_err(|_| CoreError::LockPoisoned)?;
        let dropped = guard.len();
        guard.clear();
        tracing::info!(dropped, "Stop collection reset");
        Ok(dropped)
    }
}

impl Default for CoreState {
    fn default() -> Self {
        Self::new(SortPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawStop;
    use crate::pipeline::extraction::normalize_stop;

    fn stop(number: &str, address: &str) -> DeliveryStop {
        normalize_stop(RawStop {
            stop_number: number.into(),
            address: address.into(),
            ..RawStop::default()
        })
    }

    #[test]
    fn new_state_is_empty() {
        let state = CoreState::default();
        assert!(state.is_empty().unwrap());
        assert_eq!(state.len().unwrap(), 0);
    }

    #[test]
    fn merge_reports_added_and_duplicates() {
        let state = CoreState::default();
        let first = state
            .merge_batch(vec![stop("2", "Rua B"), stop("1", "Rua A")])
            .unwrap();
        assert_eq!(first, MergeSummary { added: 2, duplicates: 0, total: 2 });

        let second = state
            .merge_batch(vec![stop("1", "rua a"), stop("3", "Rua C")])
            .unwrap();
        assert_eq!(second, MergeSummary { added: 1, duplicates: 1, total: 3 });

        let numbers: Vec<String> = state
            .stops()
            .unwrap()
            .iter()
            .map(|s| s.stop_number().to_string())
            .collect();
        assert_eq!(numbers, ["1", "2", "3"]);
    }

    #[test]
    fn remove_by_id() {
        let state = CoreState::default();
        state.merge_batch(vec![stop("1", "Rua A"), stop("2", "Rua B")]).unwrap();
        let target = state.stops().unwrap()[0].id().clone();

        assert!(state.remove_stop(&target).unwrap());
        assert!(!state.remove_stop(&target).unwrap());
        assert_eq!(state.len().unwrap(), 1);
    }

    #[test]
    fn removed_key_can_be_merged_again_with_new_id() {
        let state = CoreState::default();
        state.merge_batch(vec![stop("1", "Rua A")]).unwrap();
        let old_id = state.stops().unwrap()[0].id().clone();
        state.remove_stop(&old_id).unwrap();

        state.merge_batch(vec![stop("1", "Rua A")]).unwrap();
        let stops = state.stops().unwrap();
        assert_eq!(stops.len(), 1);
        assert_ne!(stops[0].id(), &old_id);
    }

    #[test]
    fn reset_clears_everything() {
        let state = CoreState::default();
        state.merge_batch(vec![stop("1", "Rua A"), stop("2", "Rua B")]).unwrap();
        assert_eq!(state.reset().unwrap(), 2);
        assert!(state.is_empty().unwrap());
    }

    #[test]
    fn policy_is_applied_on_merge() {
        let state = CoreState::new(SortPolicy::UnparsedLast);
        state.merge_batch(vec![stop("x", "Rua X"), stop("1", "Rua A")]).unwrap();
        let stops = state.stops().unwrap();
        assert_eq!(stops[0].stop_number(), "1");
        assert_eq!(stops[1].stop_number(), "x");
    }
}
