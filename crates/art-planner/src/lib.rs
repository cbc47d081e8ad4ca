//! Planner contract (spec §6): `PlanStart`/`PlanResume` return a
//! discriminated [`PlanResult`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use art_domain::{AgentId, PlannerError, RunId, SessionId, ToolCallId, TurnId};
use art_model::Message;

/// A candidate tool invocation requested by the planner for this turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    pub id: ToolCallId,
    /// Qualified tool name, e.g. `ops.search.query`.
    pub name: String,
    pub arguments: Value,
}

/// The previous result of a tool call, fed back into `PlanResume`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultEnvelope {
    pub tool_call_id: ToolCallId,
    pub result: Value,
    pub is_error: bool,
}

/// A finished assistant turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentMessage {
    pub text: String,
    #[serde(default)]
    pub thinking: Option<String>,
}

/// The run-scoped context threaded into every plan call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunContext {
    pub run_id: RunId,
    pub agent_id: AgentId,
    pub session_id: Option<SessionId>,
    pub turn_id: Option<TurnId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    pub messages: Vec<Message>,
    pub run_context: RunContext,
    pub tool_results: Vec<ToolResultEnvelope>,
    pub agent_id: AgentId,
    /// System-level reminders to surface to the planner this turn (spec
    /// §4.2 step 3(f)): each entry is the inner text of one
    /// `<system-reminder>`-wrapped message, sourced from the invoked
    /// tools' `ToolSpec::result_reminder`.
    #[serde(default)]
    pub system_messages: Vec<String>,
}

/// The sum type a planner call resolves to (spec §6).
///
/// Serializable: per spec §4.2 step 2 and §9, the planner call itself runs
/// inside an activity, so its result crosses the workflow/activity
/// boundary as plain JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlanResult {
    Final(AgentMessage),
    Tools(Vec<ToolRequest>),
    Fail(PlannerError),
}

/// The planner contract every agent registers (spec §6).
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan_start(&self, input: PlanInput) -> PlanResult;
    async fn plan_resume(&self, input: PlanInput) -> PlanResult;
}
