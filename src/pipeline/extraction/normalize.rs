//! Field normalization: raw candidate → `DeliveryStop`.
//!
//! Total by construction: absent fields are already empty strings on
//! `RawStop`, and nothing here can fail. Display fields keep their original
//! casing and spacing; comparison-only normalization lives in `reconcile`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::LazyLock;

use rand::Rng;

use crate::models::{DeliveryStop, RawStop, StopId};

/// Per-process nonce so ids from different runs never collide.
static PROCESS_NONCE: LazyLock<u32> = LazyLock::new(|| rand::thread_rng().gen());

/// Monotonic within a process; never reset, so ids are never reused.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh stop id: time + sequence + process nonce.
pub fn new_stop_id() -> StopId {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let millis = chrono::Utc::now().timestamp_millis();
    StopId::new(format!("{millis:x}-{seq:x}-{:08x}", *PROCESS_NONCE))
}

/// Normalize a postal code.
///
/// Non-digits are stripped. Exactly eight digits become `NNNNN-NNN`;
/// anything else is returned as the bare digit string (possibly empty).
pub fn normalize_cep(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 8 {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits
    }
}

/// Build a `DeliveryStop` from one raw candidate.
pub fn normalize_stop(raw: RawStop) -> DeliveryStop {
    DeliveryStop::new(
        new_stop_id(),
        raw.stop_number,
        raw.address,
        normalize_cep(&raw.cep),
        raw.city,
    )
}

pub fn normalize_stops(raw: Vec<RawStop>) -> Vec<DeliveryStop> {
    raw.into_iter().map(normalize_stop).collect()
}
