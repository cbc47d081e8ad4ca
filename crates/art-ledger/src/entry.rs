//! Ledger entry types (spec §3 "Transcript / ledger").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use art_domain::ToolCallId;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum LedgerEntry {
    AssistantText {
        text: String,
        at: DateTime<Utc>,
    },
    AssistantThinking {
        text: String,
        at: DateTime<Utc>,
    },
    ToolUse {
        tool_call_id: ToolCallId,
        tool_id: String,
        arguments: Value,
        at: DateTime<Utc>,
    },
    ToolResult {
        tool_call_id: ToolCallId,
        result: Value,
        is_error: bool,
        at: DateTime<Utc>,
    },
    PlannerNote {
        note: Value,
        at: DateTime<Utc>,
    },
    UsageDelta {
        input_tokens: u32,
        output_tokens: u32,
        model: String,
        at: DateTime<Utc>,
    },
}

impl LedgerEntry {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::AssistantText { at, .. }
            | Self::AssistantThinking { at, .. }
            | Self::ToolUse { at, .. }
            | Self::ToolResult { at, .. }
            | Self::PlannerNote { at, .. }
            | Self::UsageDelta { at, .. } => *at,
        }
    }

    pub fn tool_use_id(&self) -> Option<&ToolCallId> {
        match self {
            Self::ToolUse { tool_call_id, .. } | Self::ToolResult { tool_call_id, .. } => {
                Some(tool_call_id)
            }
            _ => None,
        }
    }
}
