//! Tracks children discovered under a nested agent-as-tool invocation and
//! emits `ToolCallUpdated` only on monotonic growth of the child set
//! (spec §9 "event completeness" / §4.2 step (c)).

use std::collections::HashMap;

use art_domain::ToolCallId;
use parking_lot::Mutex;

#[derive(Default)]
pub struct ChildTracker {
    counts: Mutex<HashMap<ToolCallId, usize>>,
}

impl ChildTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `parent` now has `count` children. Returns `Some(count)`
    /// when this is a genuine increase worth emitting a hook event for,
    /// `None` when `count` does not exceed what was already observed.
    pub fn observe(&self, parent: ToolCallId, count: usize) -> Option<usize> {
        let mut counts = self.counts.lock();
        let entry = counts.entry(parent).or_insert(0);
        if count > *entry {
            *entry = count;
            Some(count)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_growth_is_reported() {
        let tracker = ChildTracker::new();
        let parent = ToolCallId::new();
        assert_eq!(tracker.observe(parent, 1), Some(1));
        assert_eq!(tracker.observe(parent, 1), None);
        assert_eq!(tracker.observe(parent, 3), Some(3));
        assert_eq!(tracker.observe(parent, 2), None, "count must never regress");
    }

    #[test]
    fn parents_are_tracked_independently() {
        let tracker = ChildTracker::new();
        let a = ToolCallId::new();
        let b = ToolCallId::new();
        assert_eq!(tracker.observe(a, 1), Some(1));
        assert_eq!(tracker.observe(b, 1), Some(1));
    }
}
