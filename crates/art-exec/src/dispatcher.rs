//! The tool execution substrate (spec §4.4): three dispatch modes —
//! activity, inline-agent, and custom — joined deterministically in
//! request order (spec §4.2 step (d), §9 "tool-result ordering").

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use art_domain::error::{ToolError, ToolErrorKind};
use art_domain::{AgentId, SessionId, ToolCallId, TurnId};
use art_hooks::{HookBus, HookEnvelope, HookEvent};
use art_ledger::TurnSequencer;
use art_planner::ToolRequest;
use art_tools::{extract_bounded_result, BoundedResultMeta, ToolCatalogue, ToolSpec};
use art_workflow::{ActivityError, ActivityOptions, WorkflowContext};

use crate::child_tracker::ChildTracker;
use crate::state_machine::{ToolCallPhase, ToolCallStateMachine};

/// Which of the three dispatch modes applies to a tool (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Activity,
    InlineAgent,
    Custom,
}

pub fn mode_for(spec: &ToolSpec, has_custom: bool) -> ExecutionMode {
    if spec.is_agent_tool {
        ExecutionMode::InlineAgent
    } else if has_custom {
        ExecutionMode::Custom
    } else {
        ExecutionMode::Activity
    }
}

/// A runtime-owned tool invoked directly in the workflow context (spec
/// §4.4 "Custom mode"), e.g. `tool_unavailable`.
#[async_trait]
pub trait CustomTool: Send + Sync {
    async fn execute(&self, arguments: Value) -> Result<Value, ToolError>;
}

/// Built-in custom tool returned to a provider when a transcript
/// references a tool no longer in the active catalogue (spec §4.2 step
/// (h), §9 "tool_unavailable injection is mandatory").
pub struct ToolUnavailable;

#[async_trait]
impl CustomTool for ToolUnavailable {
    async fn execute(&self, _arguments: Value) -> Result<Value, ToolError> {
        Err(ToolError::new(
            ToolErrorKind::ExecutionError,
            "this tool is no longer available in the active catalogue",
        ))
    }
}

/// Outcome of running a nested agent-as-tool invocation (spec §4.5).
pub struct InlineAgentOutcome {
    pub result: Value,
    pub is_error: bool,
    pub child_tool_call_count: usize,
}

/// Runs a complete planner loop synchronously in the caller's execution
/// context for an agent-tool invocation (spec §4.5 `ExecuteAgentInline`).
/// Implemented by `art-runtime`, which owns the agent registry; `art-exec`
/// only needs the narrow callback.
#[async_trait]
pub trait InlineAgentRunner: Send + Sync {
    /// `session_id`/`turn_id` are the parent run's own, passed through so
    /// the nested run's events are sequenced under the parent's `TurnID`
    /// when one was provided (spec §4.4, §4.5).
    async fn run_inline(
        &self,
        ctx: &Arc<dyn WorkflowContext>,
        agent_id: &AgentId,
        parent_call: ToolCallId,
        session_id: Option<SessionId>,
        turn_id: Option<TurnId>,
        arguments: Value,
    ) -> InlineAgentOutcome;
}

/// One dispatched call's outcome.
pub struct DispatchOutcome {
    pub tool_call_id: ToolCallId,
    pub result: Value,
    pub is_error: bool,
    pub error: Option<ToolError>,
    pub bounded_result: Option<BoundedResultMeta>,
    pub duration: Duration,
    /// Set when an agent-tool invocation produced zero child tool calls
    /// (spec §4.2 step (g)): the caller should emit `HardProtection` and
    /// request finalisation.
    pub zero_child_tool_calls: bool,
}

pub struct Dispatcher {
    catalogue: Arc<ToolCatalogue>,
    custom_tools: RwLock<HashMap<String, Arc<dyn CustomTool>>>,
    hooks: Arc<HookBus>,
    child_tracker: ChildTracker,
    turn_sequencer: Arc<TurnSequencer>,
}

impl Dispatcher {
    pub fn new(catalogue: Arc<ToolCatalogue>, hooks: Arc<HookBus>, turn_sequencer: Arc<TurnSequencer>) -> Self {
        let mut custom_tools: HashMap<String, Arc<dyn CustomTool>> = HashMap::new();
        custom_tools.insert("tool_unavailable".to_string(), Arc::new(ToolUnavailable));
        Self {
            catalogue,
            custom_tools: RwLock::new(custom_tools),
            hooks,
            child_tracker: ChildTracker::new(),
            turn_sequencer,
        }
    }

    pub fn register_custom_tool(&self, qualified_name: impl Into<String>, tool: Arc<dyn CustomTool>) {
        self.custom_tools.write().insert(qualified_name.into(), tool);
    }

    /// Dispatch every request concurrently, joining results back into the
    /// original request order regardless of completion order (spec §9
    /// "tool-result ordering under parallel dispatch").
    pub async fn dispatch_batch(
        &self,
        envelope: &HookEnvelope,
        ctx: &Arc<dyn WorkflowContext>,
        requests: Vec<ToolRequest>,
        timeouts: &HashMap<ToolCallId, Duration>,
        inline_runner: Option<&Arc<dyn InlineAgentRunner>>,
    ) -> Vec<DispatchOutcome> {
        let futures = requests.into_iter().map(|req| {
            let timeout = timeouts.get(&req.id).copied().unwrap_or(Duration::from_secs(30));
            self.dispatch_one(envelope, ctx, req, timeout, inline_runner)
        });
        futures_util::future::join_all(futures).await
    }

    async fn dispatch_one(
        &self,
        envelope: &HookEnvelope,
        ctx: &Arc<dyn WorkflowContext>,
        req: ToolRequest,
        timeout: Duration,
        inline_runner: Option<&Arc<dyn InlineAgentRunner>>,
    ) -> DispatchOutcome {
        let spec = self.catalogue.get(&req.name).cloned();
        let has_custom = self.custom_tools.read().contains_key(&req.name);
        let mode = spec
            .as_ref()
            .map(|s| mode_for(s, has_custom))
            .unwrap_or(ExecutionMode::Custom);

        self.emit(envelope, HookEvent::ToolCallScheduled {
            tool_call_id: req.id,
            tool_id: req.name.clone(),
        });

        let started = Instant::now();
        let mut zero_child_tool_calls = false;
        let mut call_state = ToolCallStateMachine::new();
        call_state
            .advance(ToolCallPhase::Dispatch)
            .expect("a freshly issued call always advances to dispatch");

        if let Some(err) = spec.as_ref().and_then(|s| s.payload.decode(&req.arguments).err()) {
            call_state
                .advance(ToolCallPhase::Running)
                .expect("dispatch always advances to running");
            call_state
                .advance(ToolCallPhase::Failed)
                .expect("running always advances to a terminal phase");
            self.emit(envelope, HookEvent::ToolResultReceived {
                tool_call_id: req.id,
                tool_id: req.name.clone(),
                is_error: true,
                duration_ms: started.elapsed().as_millis() as u64,
            });
            return DispatchOutcome {
                tool_call_id: req.id,
                result: Value::Null,
                is_error: true,
                error: Some(err),
                bounded_result: None,
                duration: started.elapsed(),
                zero_child_tool_calls: false,
            };
        }
        call_state
            .advance(ToolCallPhase::Running)
            .expect("dispatch always advances to running");

        let (result, is_error, error) = match mode {
            ExecutionMode::Activity => {
                let opts = ActivityOptions {
                    timeout,
                    max_attempts: 1,
                };
                match ctx.execute_activity(&req.name, req.arguments, opts).await {
                    Ok(value) => (value, false, None),
                    Err(err) => {
                        let tool_err = activity_error_to_tool_error(err);
                        (Value::Null, true, Some(tool_err))
                    }
                }
            }
            ExecutionMode::InlineAgent => {
                let agent_id = spec
                    .as_ref()
                    .and_then(|s| s.agent_id.clone())
                    .map(AgentId)
                    .unwrap_or_else(|| AgentId::from(req.name.as_str()));
                match inline_runner {
                    Some(runner) => {
                        let outcome = runner
                            .run_inline(
                                ctx,
                                &agent_id,
                                req.id,
                                envelope.session_id.clone(),
                                envelope.turn_id.clone(),
                                req.arguments,
                            )
                            .await;
                        if outcome.child_tool_call_count == 0 {
                            zero_child_tool_calls = true;
                        } else if let Some(count) = self.child_tracker.observe(req.id, outcome.child_tool_call_count) {
                            self.emit(envelope, HookEvent::ToolCallUpdated {
                                tool_call_id: req.id,
                                child_count: count,
                            });
                        }
                        (outcome.result, outcome.is_error, None)
                    }
                    None => {
                        let err = ToolError::new(
                            ToolErrorKind::ExecutionError,
                            "no inline agent runner configured",
                        );
                        (Value::Null, true, Some(err))
                    }
                }
            }
            ExecutionMode::Custom => {
                let tool = self.custom_tools.read().get(&req.name).cloned();
                match tool {
                    Some(tool) => match tool.execute(req.arguments).await {
                        Ok(value) => (value, false, None),
                        Err(err) => (Value::Null, true, Some(err)),
                    },
                    None => {
                        let err = ToolError::new(ToolErrorKind::ToolUnknown, format!("no handler for '{}'", req.name));
                        (Value::Null, true, Some(err))
                    }
                }
            }
        };

        call_state
            .advance(if is_error { ToolCallPhase::Failed } else { ToolCallPhase::Completed })
            .expect("running always advances to a terminal phase");
        debug_assert!(call_state.phase().is_terminal());

        let duration = started.elapsed();
        let bounded_result = spec
            .as_ref()
            .filter(|s| s.bounded_result)
            .and_then(|_| extract_bounded_result(&result));

        self.emit(envelope, HookEvent::ToolResultReceived {
            tool_call_id: req.id,
            tool_id: req.name.clone(),
            is_error,
            duration_ms: duration.as_millis() as u64,
        });

        DispatchOutcome {
            tool_call_id: req.id,
            result,
            is_error,
            error,
            bounded_result,
            duration,
            zero_child_tool_calls,
        }
    }

    fn emit(&self, envelope: &HookEnvelope, kind: HookEvent) {
        let mut e = envelope.clone();
        e.kind = kind;
        e.seq = self.turn_sequencer.next_for(envelope.run_id, &envelope.turn_id);
        self.hooks.publish(e);
    }
}

fn activity_error_to_tool_error(err: ActivityError) -> ToolError {
    match err {
        ActivityError::NotRegistered(name) => {
            ToolError::new(ToolErrorKind::ToolUnknown, format!("activity '{name}' is not registered"))
        }
        ActivityError::Timeout(d) => {
            ToolError::new(ToolErrorKind::Timeout, format!("tool call exceeded {d:?}"))
        }
        ActivityError::Failed(message) => serde_json::from_str::<ToolError>(&message)
            .unwrap_or_else(|_| ToolError::new(ToolErrorKind::ExecutionError, message)),
        ActivityError::Cancelled => ToolError::new(ToolErrorKind::ExecutionError, "run was cancelled"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use art_domain::RunId;
    use art_hooks::HookBus;
    use art_tools::TypeSpec;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashMap as Map;

    fn envelope() -> HookEnvelope {
        HookEnvelope {
            run_id: RunId::new(),
            agent_id: AgentId::from("svc.agent"),
            session_id: None,
            turn_id: None,
            timestamp_ms: Utc::now().timestamp_millis(),
            seq: 0,
            kind: HookEvent::AssistantChunk { text: String::new() },
        }
    }

    fn custom_spec() -> ToolSpec {
        ToolSpec {
            name: "unavailable".into(),
            service: "svc".into(),
            toolset: "tool".into(),
            description: String::new(),
            tags: vec![],
            meta: Map::new(),
            terminal_run: false,
            is_agent_tool: false,
            agent_id: None,
            bounded_result: false,
            paging: None,
            server_data: vec![],
            result_reminder: None,
            confirmation: None,
            payload: TypeSpec::new("P", json!({"type":"object"})),
            result: TypeSpec::new("R", json!({"type":"object"})),
        }
    }

    struct Dummy;

    #[async_trait::async_trait]
    impl WorkflowContext for Dummy {
        async fn execute_activity(
            &self,
            _activity: &str,
            _input: Value,
            _opts: ActivityOptions,
        ) -> Result<Value, ActivityError> {
            unreachable!("custom mode never calls execute_activity")
        }
        fn now(&self) -> chrono::DateTime<Utc> {
            Utc::now()
        }
        fn is_cancelled(&self) -> bool {
            false
        }
        async fn next_signal(&self) -> Option<(String, Value)> {
            None
        }
        fn try_next_signal(&self) -> Option<(String, Value)> {
            None
        }
    }

    #[tokio::test]
    async fn custom_tool_unavailable_errors_without_crashing() {
        let cat = ToolCatalogue::new();
        let dispatcher = Dispatcher::new(Arc::new(cat), Arc::new(HookBus::new()), Arc::new(TurnSequencer::new()));
        let req = ToolRequest {
            id: ToolCallId::new(),
            name: "tool_unavailable".into(),
            arguments: json!({}),
        };
        let env = envelope();
        let ctx: Arc<dyn WorkflowContext> = Arc::new(Dummy);
        let outcome = dispatcher
            .dispatch_one(&env, &ctx, req, Duration::from_secs(1), None)
            .await;
        assert!(outcome.is_error);
        assert_eq!(outcome.error.unwrap().kind, ToolErrorKind::ExecutionError);
    }

    #[tokio::test]
    async fn unknown_tool_surfaces_tool_unknown() {
        let cat = ToolCatalogue::new();
        let dispatcher = Dispatcher::new(Arc::new(cat), Arc::new(HookBus::new()), Arc::new(TurnSequencer::new()));
        let req = ToolRequest {
            id: ToolCallId::new(),
            name: "ghost.tool".into(),
            arguments: json!({}),
        };
        let env = envelope();
        let ctx: Arc<dyn WorkflowContext> = Arc::new(Dummy);
        let outcome = dispatcher
            .dispatch_one(&env, &ctx, req, Duration::from_secs(1), None)
            .await;
        assert!(outcome.is_error);
        assert_eq!(outcome.error.unwrap().kind, ToolErrorKind::ToolUnknown);
    }

    #[tokio::test]
    async fn inline_agent_without_a_runner_errors() {
        let mut cat = ToolCatalogue::new();
        let mut spec = custom_spec();
        spec.is_agent_tool = true;
        spec.toolset = "agent".into();
        spec.name = "run".into();
        cat.insert(spec);
        let dispatcher = Dispatcher::new(Arc::new(cat), Arc::new(HookBus::new()), Arc::new(TurnSequencer::new()));
        let req = ToolRequest {
            id: ToolCallId::new(),
            name: "agent.run".into(),
            arguments: json!({}),
        };
        let env = envelope();
        let ctx: Arc<dyn WorkflowContext> = Arc::new(Dummy);
        let outcome = dispatcher
            .dispatch_one(&env, &ctx, req, Duration::from_secs(1), None)
            .await;
        assert!(outcome.is_error);
        assert!(!outcome.zero_child_tool_calls);
    }
}
