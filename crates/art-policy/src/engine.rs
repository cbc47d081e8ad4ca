//! The policy engine (spec §4.3).
//!
//! Never throws: every rejected request becomes a synthetic tool result
//! carrying the reason, so the planner can recover.

use art_domain::error::{ToolError, ToolErrorKind};
use art_domain::ToolCallId;
use art_planner::ToolRequest;
use art_tools::ToolCatalogue;

use crate::state::{CapsState, TurnOverrides};

pub struct PolicyDecision {
    pub allowed: Vec<ToolRequest>,
    pub rejected: Vec<(ToolRequest, ToolError)>,
    /// `ToolCallId`s that repeated a prior id in the same turn's requests
    /// (the first occurrence is kept in `allowed`/`rejected`, later ones
    /// are dropped here) — the caller must surface this as a `PlannerNote`
    /// rather than dropping it silently (spec §4.2 "Edge cases").
    pub duplicates: Vec<ToolCallId>,
}

/// Apply the five-step filter described in spec §4.3, mutating `caps` by
/// decrementing `remaining_tool_calls` by however many requests survive.
///
/// Duplicate `ToolCallId`s within one turn are a design error: the first
/// occurrence wins and the rest are dropped with a `PlannerNote`-worthy
/// reason (spec §4.2 "Edge cases").
pub fn apply_policy(
    catalogue: &ToolCatalogue,
    caps: &mut CapsState,
    overrides: &TurnOverrides,
    requests: Vec<ToolRequest>,
) -> PolicyDecision {
    let mut allowed = Vec::new();
    let mut rejected = Vec::new();

    // Step 0 (edge case, spec §4.2): dedup on ToolCallId within the turn.
    let mut seen_ids = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    let requests: Vec<ToolRequest> = requests
        .into_iter()
        .filter(|r| {
            if seen_ids.insert(r.id) {
                true
            } else {
                duplicates.push(r.id);
                false
            }
        })
        .collect();

    // Step 1: drop unknown tools.
    let mut candidates = Vec::new();
    for req in requests {
        if catalogue.contains(&req.name) {
            candidates.push(req);
        } else {
            let err = ToolError::new(
                ToolErrorKind::ToolUnknown,
                format!("tool '{}' is not in the active catalogue", req.name),
            );
            rejected.push((req, err));
        }
    }

    // Step 2: RestrictToTool. When set, this takes precedence over
    // allowed/denied tags (spec §9 Open Question) — so tag filtering is
    // skipped entirely once a restriction narrows the set.
    let restricted = overrides.restrict_to_tool.is_some();
    if let Some(only) = &overrides.restrict_to_tool {
        let mut kept = Vec::new();
        for req in candidates {
            if &req.name == only {
                kept.push(req);
            } else {
                let err = ToolError::new(
                    ToolErrorKind::PolicyDenied,
                    format!("run is restricted to tool '{only}'"),
                );
                rejected.push((req, err));
            }
        }
        candidates = kept;
    }

    // Step 3: AllowedTags / DeniedTags (only when not already restricted).
    if !restricted {
        if !overrides.allowed_tags.is_empty() {
            let mut kept = Vec::new();
            for req in candidates {
                let tags = catalogue.get(&req.name).map(|s| s.tags.as_slice()).unwrap_or(&[]);
                if tags.iter().any(|t| overrides.allowed_tags.contains(t)) {
                    kept.push(req);
                } else {
                    let err = ToolError::new(
                        ToolErrorKind::PolicyDenied,
                        format!("tool '{}' is not in the allowed tag set", req.name),
                    );
                    rejected.push((req, err));
                }
            }
            candidates = kept;
        }
        if !overrides.denied_tags.is_empty() {
            let mut kept = Vec::new();
            for req in candidates {
                let tags = catalogue.get(&req.name).map(|s| s.tags.as_slice()).unwrap_or(&[]);
                if tags.iter().any(|t| overrides.denied_tags.contains(t)) {
                    let err = ToolError::new(
                        ToolErrorKind::PolicyDenied,
                        format!("tool '{}' matches a denied tag", req.name),
                    );
                    rejected.push((req, err));
                } else {
                    kept.push(req);
                }
            }
            candidates = kept;
        }
    }

    // Step 4: PerTurnMaxToolCalls — truncate deterministically, preserving order.
    if let Some(max) = overrides.per_turn_max_tool_calls {
        let max = max as usize;
        if candidates.len() > max {
            let overflow = candidates.split_off(max);
            for req in overflow {
                let err = ToolError::new(
                    ToolErrorKind::CapExceeded,
                    "per-turn tool call limit reached".to_string(),
                );
                rejected.push((req, err));
            }
        }
    }

    // Step 5: RemainingToolCalls — decrement; keep only what fits.
    if let Some(remaining) = caps.remaining_tool_calls {
        let remaining = remaining as usize;
        if candidates.len() > remaining {
            let overflow = candidates.split_off(remaining);
            for req in overflow {
                let err = ToolError::new(ToolErrorKind::CapExceeded, "tool call cap exceeded".to_string());
                rejected.push((req, err));
            }
        }
        caps.remaining_tool_calls = Some((remaining - candidates.len()) as u32);
    }

    allowed.extend(candidates);

    tracing::debug!(
        allowed = allowed.len(),
        rejected = rejected.len(),
        "policy decision"
    );

    PolicyDecision { allowed, rejected, duplicates }
}
