//! Reconciliation of a new batch into the canonical stop collection.
//!
//! `merge` is a pure function from (current, batch) to the next collection:
//! concatenate (existing first), keep the first stop per dedup key, then
//! stable-sort by the numeric value of `stopNumber`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::DeliveryStop;

/// Ordering of stops whose `stopNumber` is not an integer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Unparsable labels sort as 0, ahead of every positive stop number.
    #[default]
    UnparsedAsZero,
    /// Unparsable labels go after all numeric ones, in arrival order.
    UnparsedLast,
}

/// Business identity of a stop: exact stop number + case-folded, trimmed address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    stop_number: String,
    address: String,
}

impl DedupKey {
    pub fn of(stop: &DeliveryStop) -> Self {
        Self {
            stop_number: stop.stop_number().to_string(),
            address: stop.address().trim().to_lowercase(),
        }
    }
}

/// Integer value of a stop label, if it has one.
pub fn parse_stop_number(label: &str) -> Option<i64> {
    label.trim().parse().ok()
}

/// Keep only the first stop for each dedup key, preserving order.
pub fn dedup_stops(stops: Vec<DeliveryStop>) -> Vec<DeliveryStop> {
    let mut seen = HashSet::with_capacity(stops.len());
    stops
        .into_iter()
        .filter(|stop| seen.insert(DedupKey::of(stop)))
        .collect()
}

/// Stable sort by stop number under the given policy.
pub fn sort_stops(stops: &mut [DeliveryStop], policy: SortPolicy) {
    match policy {
        SortPolicy::UnparsedAsZero => {
            stops.sort_by_key(|s| parse_stop_number(s.stop_number()).unwrap_or(0));
        }
        SortPolicy::UnparsedLast => {
            stops.sort_by_key(|s| match parse_stop_number(s.stop_number()) {
                Some(n) => (false, n),
                None => (true, 0),
            });
        }
    }
}

/// Produce the next canonical collection from the current one and a new batch.
pub fn merge(
    current: &[DeliveryStop],
    batch: Vec<DeliveryStop>,
    policy: SortPolicy,
) -> Vec<DeliveryStop> {
    let mut combined = Vec::with_capacity(current.len() + batch.len());
    combined.extend_from_slice(current);
    combined.extend(batch);

    let mut merged = dedup_stops(combined);
    sort_stops(&mut merged, policy);
    merged
}
