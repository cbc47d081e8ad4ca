//! Hook event kinds (spec §4.7).

use serde::{Deserialize, Serialize};
use serde_json::Value;

use art_domain::{AgentId, RunId, SessionId, ToolCallId, TurnId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookEnvelope {
    pub run_id: RunId,
    pub agent_id: AgentId,
    pub session_id: Option<SessionId>,
    pub turn_id: Option<TurnId>,
    pub timestamp_ms: i64,
    /// Strictly increasing within a `TurnId` (spec §3, §5 "Ordering
    /// guarantees"). `0` when the run carries no `TurnId` to sequence under.
    #[serde(default)]
    pub seq: u64,
    pub kind: HookEvent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HookEvent {
    ToolCallScheduled {
        tool_call_id: ToolCallId,
        tool_id: String,
    },
    /// Emitted only on monotonic growth of the child set (spec §9).
    ToolCallUpdated {
        tool_call_id: ToolCallId,
        child_count: usize,
    },
    ToolResultReceived {
        tool_call_id: ToolCallId,
        tool_id: String,
        is_error: bool,
        duration_ms: u64,
    },
    AssistantMessage {
        text: String,
    },
    AssistantChunk {
        text: String,
    },
    PlannerThinkingBlock {
        text: String,
    },
    PlannerNote {
        note: Value,
    },
    UsageDelta {
        input_tokens: u32,
        output_tokens: u32,
        model: String,
    },
    HardProtection {
        reason: String,
        tool_count: usize,
        children: usize,
        tool_names: Vec<String>,
    },
}
