//! The append-only per-run ledger.
//!
//! Enforces spec §3 invariant 1 (every tool-result references a
//! previously appended tool-use with the same id in the same run) at
//! append time, and invariant 2 (entries never mutate) by construction —
//! there is no mutation API, only `append`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use art_domain::{RunId, ToolCallId, TranscriptError};

use crate::entry::LedgerEntry;

pub struct Ledger {
    run_id: RunId,
    entries: RwLock<Vec<LedgerEntry>>,
    open_tool_uses: RwLock<HashSet<ToolCallId>>,
}

impl Ledger {
    pub fn new(run_id: RunId) -> Self {
        Self {
            run_id,
            entries: RwLock::new(Vec::new()),
            open_tool_uses: RwLock::new(HashSet::new()),
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Append one entry. Returns `Err` (and appends nothing) if a
    /// `ToolResult` references a `tool_call_id` with no prior `ToolUse` in
    /// this ledger (spec §3 invariant 1).
    pub fn append(&self, entry: LedgerEntry) -> Result<(), TranscriptError> {
        if let LedgerEntry::ToolResult { tool_call_id, .. } = &entry {
            if !self.open_tool_uses.read().contains(tool_call_id) {
                return Err(TranscriptError::DanglingToolUse(format!(
                    "tool_result for {tool_call_id} has no matching tool_use in run {}",
                    self.run_id
                )));
            }
        }
        if let LedgerEntry::ToolUse { tool_call_id, .. } = &entry {
            self.open_tool_uses.write().insert(*tool_call_id);
        }
        tracing::debug!(run_id = %self.run_id, "ledger append");
        self.entries.write().push(entry);
        Ok(())
    }

    /// `at` must come from the workflow's engine clock (`WorkflowContext::now`),
    /// never a direct `Utc::now()` read, so replay with identical activity
    /// responses produces a byte-identical ledger (spec §9).
    pub fn append_assistant_text(&self, text: impl Into<String>, at: DateTime<Utc>) {
        let _ = self.append(LedgerEntry::AssistantText { text: text.into(), at });
    }

    pub fn append_thinking(&self, text: impl Into<String>, at: DateTime<Utc>) {
        let _ = self.append(LedgerEntry::AssistantThinking { text: text.into(), at });
    }

    pub fn append_tool_use(
        &self,
        tool_call_id: ToolCallId,
        tool_id: impl Into<String>,
        arguments: serde_json::Value,
        at: DateTime<Utc>,
    ) {
        let _ = self.append(LedgerEntry::ToolUse {
            tool_call_id,
            tool_id: tool_id.into(),
            arguments,
            at,
        });
    }

    pub fn append_tool_result(
        &self,
        tool_call_id: ToolCallId,
        result: serde_json::Value,
        is_error: bool,
        at: DateTime<Utc>,
    ) -> Result<(), TranscriptError> {
        self.append(LedgerEntry::ToolResult {
            tool_call_id,
            result,
            is_error,
            at,
        })
    }

    pub fn append_note(&self, note: serde_json::Value, at: DateTime<Utc>) {
        let _ = self.append(LedgerEntry::PlannerNote { note, at });
    }

    pub fn append_usage(&self, input_tokens: u32, output_tokens: u32, model: impl Into<String>, at: DateTime<Utc>) {
        let _ = self.append(LedgerEntry::UsageDelta {
            input_tokens,
            output_tokens,
            model: model.into(),
            at,
        });
    }

    /// A point-in-time snapshot of every entry appended so far.
    pub fn snapshot(&self) -> Vec<LedgerEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Clone for LedgerEntry {
    fn clone(&self) -> Self {
        // Manual clone impl kept out of `entry.rs` derive to document that
        // ledger entries are cloned freely for projection/snapshot use —
        // the ledger itself never hands out mutable references.
        match self {
            Self::AssistantText { text, at } => Self::AssistantText {
                text: text.clone(),
                at: *at,
            },
            Self::AssistantThinking { text, at } => Self::AssistantThinking {
                text: text.clone(),
                at: *at,
            },
            Self::ToolUse {
                tool_call_id,
                tool_id,
                arguments,
                at,
            } => Self::ToolUse {
                tool_call_id: *tool_call_id,
                tool_id: tool_id.clone(),
                arguments: arguments.clone(),
                at: *at,
            },
            Self::ToolResult {
                tool_call_id,
                result,
                is_error,
                at,
            } => Self::ToolResult {
                tool_call_id: *tool_call_id,
                result: result.clone(),
                is_error: *is_error,
                at: *at,
            },
            Self::PlannerNote { note, at } => Self::PlannerNote {
                note: note.clone(),
                at: *at,
            },
            Self::UsageDelta {
                input_tokens,
                output_tokens,
                model,
                at,
            } => Self::UsageDelta {
                input_tokens: *input_tokens,
                output_tokens: *output_tokens,
                model: model.clone(),
                at: *at,
            },
        }
    }
}
