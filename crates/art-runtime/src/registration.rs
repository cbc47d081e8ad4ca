//! Registration types accepted by the orchestrator (spec §4.1
//! `RegisterAgent`/`RegisterToolset`/`RegisterModel`).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use art_domain::{AgentId, PolicyDefaults, RunId, SessionId, ToolError, TurnId};
use art_model::Message;
use art_planner::Planner;
use art_tools::ToolCatalogue;

/// Everything the orchestrator needs to run one agent: its planner, the
/// catalogue of tools visible to it, and the policy defaults seeded into
/// every run's `CapsState` unless a caller overrides them.
pub struct AgentRegistration {
    pub agent_id: AgentId,
    pub planner: Arc<dyn Planner>,
    pub tool_specs: Arc<ToolCatalogue>,
    pub policy: Option<PolicyDefaults>,
}

/// A toolset's `Execute` entry point (spec §3 "Toolset"). One executor
/// backs every non-agent tool the toolset advertises; the activity
/// registered per tool just forwards into this by qualified name.
#[async_trait]
pub trait ToolsetExecutor: Send + Sync {
    async fn execute(&self, tool_name: &str, arguments: Value) -> Result<Value, ToolError>;
}

pub struct ToolsetRegistration {
    pub name: String,
    pub specs: Vec<art_tools::ToolSpec>,
    pub executor: Arc<dyn ToolsetExecutor>,
}

/// Input to `StartRun` (spec §4.1).
#[derive(Debug, Clone)]
pub struct RunInput {
    pub run_id: Option<RunId>,
    pub agent_id: AgentId,
    pub session_id: Option<SessionId>,
    pub turn_id: Option<TurnId>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub run_id: RunId,
    pub message: art_planner::AgentMessage,
    pub is_error: bool,
}

/// Wire payload for the registered agent workflow (spec §4.2): what
/// crosses from `StartRun` into the workflow body via
/// `WorkflowEngine::start_workflow`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WorkflowInput {
    pub run_id: RunId,
    pub agent_id: AgentId,
    pub session_id: Option<SessionId>,
    pub turn_id: Option<TurnId>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WorkflowOutput {
    pub message: art_planner::AgentMessage,
    pub is_error: bool,
    /// Set when a `pause` signal was observed at a loop checkpoint (spec
    /// §4.1 `PauseRun`): the run record moves to `Paused` rather than a
    /// terminal status, and `ResumeRun` starts a fresh workflow execution
    /// continuing the same ledger.
    pub paused: bool,
}
