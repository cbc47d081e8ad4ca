//! Policy state (spec §3 "Policy state").

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Per-run caps, decremented as tool calls are allowed through.
#[derive(Debug, Clone)]
pub struct CapsState {
    pub remaining_tool_calls: Option<u32>,
    pub remaining_consecutive_failed_tool_calls: Option<u32>,
    pub deadline: Option<DateTime<Utc>>,
}

impl CapsState {
    pub fn unbounded() -> Self {
        Self {
            remaining_tool_calls: None,
            remaining_consecutive_failed_tool_calls: None,
            deadline: None,
        }
    }

    pub fn with_max_tool_calls(max: u32) -> Self {
        Self {
            remaining_tool_calls: Some(max),
            ..Self::unbounded()
        }
    }

    pub fn deadline_exceeded(&self, now: DateTime<Utc>) -> bool {
        self.deadline.map(|d| now >= d).unwrap_or(false)
    }

    pub fn exhausted(&self) -> bool {
        self.remaining_tool_calls == Some(0)
    }

    /// Record a tool failure; returns `true` if the consecutive-failure
    /// cap has now been exceeded.
    pub fn record_failure(&mut self) -> bool {
        if let Some(n) = self.remaining_consecutive_failed_tool_calls.as_mut() {
            if *n == 0 {
                return true;
            }
            *n -= 1;
            return *n == 0;
        }
        false
    }

    pub fn record_success(&mut self) {
        // A success resets nothing here: the cap tracks a running budget,
        // not a streak — callers that want streak semantics reset the
        // field themselves between turns.
    }
}

/// Per-turn overrides narrowing which tool requests are allowed through
/// (spec §3 "Policy state").
#[derive(Debug, Clone, Default)]
pub struct TurnOverrides {
    pub per_turn_max_tool_calls: Option<u32>,
    pub restrict_to_tool: Option<String>,
    pub allowed_tags: Vec<String>,
    pub denied_tags: Vec<String>,
    /// Pattern (exact name, or `prefix*`) -> timeout override.
    pub per_tool_timeout: HashMap<String, std::time::Duration>,
}

/// Resolve the effective timeout for a tool name: exact match wins, then
/// the longest matching `prefix*` pattern, then `default` (spec §4.2
/// step 3b, §5).
pub fn resolve_timeout(
    overrides: &HashMap<String, std::time::Duration>,
    tool_name: &str,
    default: std::time::Duration,
) -> std::time::Duration {
    if let Some(d) = overrides.get(tool_name) {
        return *d;
    }
    let mut best: Option<(&str, std::time::Duration)> = None;
    for (pattern, dur) in overrides {
        if let Some(prefix) = pattern.strip_suffix('*') {
            if tool_name.starts_with(prefix) {
                if best.map(|(p, _)| prefix.len() > p.len()).unwrap_or(true) {
                    best = Some((prefix, *dur));
                }
            }
        }
    }
    best.map(|(_, d)| d).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn exact_match_wins_over_prefix() {
        let mut overrides = HashMap::new();
        overrides.insert("ops.search.query".to_string(), Duration::from_secs(5));
        overrides.insert("ops.search.*".to_string(), Duration::from_secs(30));
        let d = resolve_timeout(&overrides, "ops.search.query", Duration::from_secs(10));
        assert_eq!(d, Duration::from_secs(5));
    }

    #[test]
    fn longest_prefix_wins() {
        let mut overrides = HashMap::new();
        overrides.insert("ops.*".to_string(), Duration::from_secs(30));
        overrides.insert("ops.search.*".to_string(), Duration::from_secs(15));
        let d = resolve_timeout(&overrides, "ops.search.query", Duration::from_secs(10));
        assert_eq!(d, Duration::from_secs(15));
    }

    #[test]
    fn falls_back_to_default_when_no_pattern_matches() {
        let overrides = HashMap::new();
        let d = resolve_timeout(&overrides, "ops.search.query", Duration::from_secs(10));
        assert_eq!(d, Duration::from_secs(10));
    }

    #[test]
    fn caps_monotonic_never_increase() {
        let mut caps = CapsState::with_max_tool_calls(2);
        assert_eq!(caps.remaining_tool_calls, Some(2));
        caps.remaining_tool_calls = caps.remaining_tool_calls.map(|n| n.saturating_sub(2));
        assert!(caps.exhausted());
    }
}
