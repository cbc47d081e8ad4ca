//! Per-turn monotonic sequence numbers (spec §3, §5 "Ordering guarantees").
//!
//! A turn may span multiple runs (pause/resume). Each [`TurnSequencer`] is
//! keyed by `TurnId` so a resumed run continues numbering where the prior
//! run left off, as long as the caller threads the same sequencer (or one
//! seeded with the last-seen value) across the resume boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use art_domain::{RunId, TurnId};

#[derive(Default)]
pub struct TurnSequencer {
    counters: Mutex<HashMap<TurnId, AtomicU64>>,
}

impl TurnSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number for `turn_id`, starting at 1 and strictly
    /// increasing per turn.
    pub fn next(&self, turn_id: &TurnId) -> u64 {
        let mut counters = self.counters.lock();
        let counter = counters
            .entry(turn_id.clone())
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Seed a turn's counter so a resumed run continues from where a
    /// previous run left off, instead of restarting at 1.
    pub fn seed(&self, turn_id: &TurnId, last_seen: u64) {
        self.counters
            .lock()
            .insert(turn_id.clone(), AtomicU64::new(last_seen));
    }

    /// Next sequence number for a run: when `turn_id` is `Some`, events
    /// are sequenced under that shared `TurnId` counter (spec §4.5 "child
    /// events share the parent's sequencer" when a `TurnId` is inherited).
    /// When `None`, `run_id` keys its own counter, so a run with no
    /// `TurnId` still gets a fresh, strictly increasing sequence instead
    /// of colliding with any other run.
    pub fn next_for(&self, run_id: RunId, turn_id: &Option<TurnId>) -> u64 {
        match turn_id {
            Some(id) => self.next(id),
            None => self.next(&TurnId(format!("__run:{run_id}"))),
        }
    }
}
