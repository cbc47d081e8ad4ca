//! The orchestrator (spec §4.1): the single entry point embedding
//! applications call — `RegisterAgent`/`RegisterToolset`/`RegisterModel`,
//! then `StartRun`/`Run`/`PauseRun`/`ResumeRun`.
//!
//! Registration wires each agent's plan/execute loop ([`crate::run_loop`])
//! as a named workflow on the configured [`WorkflowEngine`], and wraps its
//! planner and every toolset tool as registered activities — so the
//! "planner and tool decoding happen inside activities" invariant holds by
//! construction, not by convention.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;

use art_domain::error::{DispatchError, RegistrationError};
use art_domain::{AgentId, PolicyDefaults, RunId, RunRecord, RunStatus, SessionId, ToolCallId, TurnId};
use art_exec::{Dispatcher, InlineAgentOutcome, InlineAgentRunner};
use art_hooks::HookBus;
use art_ledger::{Ledger, TurnSequencer};
use art_model::Client;
use art_planner::{AgentMessage, RunContext};
use art_tools::ToolCatalogue;
use art_workflow::{WorkflowContext, WorkflowEngine, WorkflowHandle};

use crate::registration::{
    AgentRegistration, RunInput, RunOutput, ToolsetRegistration, WorkflowInput, WorkflowOutput,
};
use crate::run_loop::{run_plan_loop, LoopOutcome, PlanLoopResult, RunLoopDeps};

struct RunEntry {
    record: RunRecord,
    handle: Arc<dyn WorkflowHandle>,
}

pub struct Orchestrator {
    engine: Arc<dyn WorkflowEngine>,
    config: art_domain::RuntimeConfig,
    agents: RwLock<HashMap<AgentId, Arc<AgentRegistration>>>,
    toolsets: RwLock<HashMap<String, Arc<ToolsetRegistration>>>,
    models: RwLock<HashMap<String, Arc<dyn Client>>>,
    runs: RwLock<HashMap<RunId, RunEntry>>,
    ledgers: RwLock<HashMap<RunId, Arc<Ledger>>>,
    hooks: Arc<HookBus>,
    dispatchers: RwLock<HashMap<AgentId, Arc<Dispatcher>>>,
    /// Shared across every agent and run so nested agent-as-tool
    /// invocations that inherit the parent's `TurnID` sequence under the
    /// very same counters the parent's own hook events use (spec §4.5).
    turn_sequencer: Arc<TurnSequencer>,
    self_ref: std::sync::Weak<Orchestrator>,
}

impl Orchestrator {
    pub fn new(engine: Arc<dyn WorkflowEngine>, config: art_domain::RuntimeConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            engine,
            config,
            agents: RwLock::new(HashMap::new()),
            toolsets: RwLock::new(HashMap::new()),
            models: RwLock::new(HashMap::new()),
            runs: RwLock::new(HashMap::new()),
            ledgers: RwLock::new(HashMap::new()),
            hooks: Arc::new(HookBus::new()),
            dispatchers: RwLock::new(HashMap::new()),
            turn_sequencer: Arc::new(TurnSequencer::new()),
            self_ref: weak.clone(),
        })
    }

    pub fn hooks(&self) -> &Arc<HookBus> {
        &self.hooks
    }

    /// Recovers the `Arc<Orchestrator>` this value is always held behind
    /// (via `Orchestrator::new`), as an `Arc<dyn InlineAgentRunner>` for
    /// threading into a nested plan loop's own dependencies (spec §4.5).
    fn shared(&self) -> Arc<dyn InlineAgentRunner> {
        self.self_ref
            .upgrade()
            .expect("Orchestrator always lives behind the Arc returned by Orchestrator::new")
    }

    pub fn model(&self, id: &str) -> Option<Arc<dyn Client>> {
        self.models.read().get(id).cloned()
    }

    pub fn register_model(&self, id: impl Into<String>, client: Arc<dyn Client>) {
        self.models.write().insert(id.into(), client);
    }

    /// Register a toolset: one activity per non-agent tool it advertises,
    /// each forwarding into `executor.execute` and serializing any
    /// `ToolError` into the activity's `Err(String)` channel so
    /// `art-exec`'s `activity_error_to_tool_error` can recover full
    /// fidelity on the other side (spec §4.4).
    pub fn register_toolset(&self, reg: ToolsetRegistration) -> Result<(), RegistrationError> {
        if reg.name.is_empty() {
            return Err(RegistrationError::MissingField("name"));
        }
        if self.toolsets.read().contains_key(&reg.name) {
            return Err(RegistrationError::DuplicateId(reg.name.clone()));
        }
        for spec in &reg.specs {
            if spec.is_agent_tool {
                continue;
            }
            let qualified = spec.qualified_name();
            let executor = reg.executor.clone();
            let tool_name = spec.name.clone();
            self.engine.register_activity(
                &qualified,
                Arc::new(move |input: Value| {
                    let executor = executor.clone();
                    let tool_name = tool_name.clone();
                    Box::pin(async move {
                        executor
                            .execute(&tool_name, input)
                            .await
                            .map_err(|e| serde_json::to_string(&e).unwrap_or_else(|_| e.message))
                    })
                }),
            );
        }
        self.toolsets.write().insert(reg.name.clone(), Arc::new(reg));
        Ok(())
    }

    /// Register an agent: wraps its planner's `plan_start`/`plan_resume`
    /// as activities and registers the plan/execute loop as the workflow
    /// body named after the agent id (spec §4.1, §4.2).
    pub fn register_agent(
        self: &Arc<Self>,
        agent_id: AgentId,
        planner: Arc<dyn art_planner::Planner>,
        toolset_names: &[&str],
        policy: Option<PolicyDefaults>,
    ) -> Result<(), RegistrationError> {
        if self.agents.read().contains_key(&agent_id) {
            return Err(RegistrationError::DuplicateId(agent_id.to_string()));
        }

        let mut catalogue = ToolCatalogue::new();
        let toolsets = self.toolsets.read();
        for name in toolset_names {
            let ts = toolsets
                .get(*name)
                .ok_or_else(|| RegistrationError::UnknownTarget((*name).to_string()))?;
            for spec in &ts.specs {
                catalogue.insert(spec.clone());
            }
        }
        drop(toolsets);
        let catalogue = Arc::new(catalogue);

        let start_planner = planner.clone();
        self.engine.register_activity(
            &format!("{}.plan_start", agent_id.as_str()),
            Arc::new(move |input: Value| {
                let planner = start_planner.clone();
                Box::pin(async move {
                    let plan_input: art_planner::PlanInput = serde_json::from_value(input)
                        .map_err(|e| format!("undecodable PlanInput: {e}"))?;
                    let result = planner.plan_start(plan_input).await;
                    serde_json::to_value(result).map_err(|e| e.to_string())
                })
            }),
        );

        let resume_planner = planner.clone();
        self.engine.register_activity(
            &format!("{}.plan_resume", agent_id.as_str()),
            Arc::new(move |input: Value| {
                let planner = resume_planner.clone();
                Box::pin(async move {
                    let plan_input: art_planner::PlanInput = serde_json::from_value(input)
                        .map_err(|e| format!("undecodable PlanInput: {e}"))?;
                    let result = planner.plan_resume(plan_input).await;
                    serde_json::to_value(result).map_err(|e| e.to_string())
                })
            }),
        );

        let registration = Arc::new(AgentRegistration {
            agent_id: agent_id.clone(),
            planner,
            tool_specs: catalogue.clone(),
            policy,
        });

        let dispatcher = Arc::new(Dispatcher::new(catalogue, self.hooks.clone(), self.turn_sequencer.clone()));
        self.dispatchers.write().insert(agent_id.clone(), dispatcher);
        self.agents.write().insert(agent_id.clone(), registration);

        let orchestrator = self.clone();
        let workflow_agent_id = agent_id.clone();
        self.engine.register_workflow(
            agent_id.as_str(),
            Arc::new(move |ctx: Arc<dyn WorkflowContext>, input: Value| {
                let orchestrator = orchestrator.clone();
                let agent_id = workflow_agent_id.clone();
                Box::pin(async move {
                    let input: WorkflowInput = match serde_json::from_value(input) {
                        Ok(i) => i,
                        Err(e) => {
                            return serde_json::to_value(WorkflowOutput {
                                message: AgentMessage {
                                    text: format!("undecodable workflow input: {e}"),
                                    thinking: None,
                                },
                                is_error: true,
                                paused: false,
                            })
                            .unwrap();
                        }
                    };
                    let output = orchestrator.run_agent(ctx, agent_id, input).await;
                    serde_json::to_value(output).unwrap()
                })
            }),
        );

        Ok(())
    }

    async fn run_agent(self: &Arc<Self>, ctx: Arc<dyn WorkflowContext>, agent_id: AgentId, input: WorkflowInput) -> WorkflowOutput {
        let registration = match self.agents.read().get(&agent_id).cloned() {
            Some(r) => r,
            None => {
                return WorkflowOutput {
                    message: AgentMessage {
                        text: format!("agent '{agent_id}' is not registered"),
                        thinking: None,
                    },
                    is_error: true,
                    paused: false,
                }
            }
        };
        let dispatcher = self.dispatchers.read().get(&agent_id).cloned().expect("dispatcher registered alongside agent");
        let ledger = self.ledger_for(input.run_id);
        let policy_defaults = registration.policy.clone().unwrap_or_else(|| self.config.policy.clone());

        let deps = RunLoopDeps {
            registration,
            dispatcher,
            hooks: self.hooks.clone(),
            ledger,
            policy_defaults,
            plan_activity: self.config.plan_activity.clone(),
            inline_runner: self.clone(),
            turn_sequencer: self.turn_sequencer.clone(),
        };

        let run_context = RunContext {
            run_id: input.run_id,
            agent_id,
            session_id: input.session_id,
            turn_id: input.turn_id,
        };

        match run_plan_loop(&deps, ctx, run_context, input.messages).await.outcome {
            LoopOutcome::Completed(message) => WorkflowOutput { message, is_error: false, paused: false },
            LoopOutcome::Failed(message) => WorkflowOutput { message, is_error: true, paused: false },
            LoopOutcome::Paused => WorkflowOutput {
                message: AgentMessage { text: String::new(), thinking: None },
                is_error: false,
                paused: true,
            },
        }
    }

    fn ledger_for(&self, run_id: RunId) -> Arc<Ledger> {
        self.ledgers
            .write()
            .entry(run_id)
            .or_insert_with(|| Arc::new(Ledger::new(run_id)))
            .clone()
    }

    pub async fn start_run(self: &Arc<Self>, input: RunInput) -> Result<RunOutput, DispatchError> {
        let handle_wrap = self.start_run_handle(input).await?;
        let run_id = handle_wrap.0;
        let handle = handle_wrap.1;
        let value = handle.wait().await;
        let output: WorkflowOutput = serde_json::from_value(value).unwrap_or(WorkflowOutput {
            message: AgentMessage {
                text: "workflow produced an undecodable result".into(),
                thinking: None,
            },
            is_error: true,
            paused: false,
        });
        self.finalize(run_id, &output);
        Ok(RunOutput {
            run_id,
            message: output.message,
            is_error: output.is_error,
        })
    }

    /// `StartRun` without blocking on completion — returns once the
    /// workflow has been dispatched (spec §4.1).
    pub async fn dispatch_run(self: &Arc<Self>, input: RunInput) -> Result<RunId, DispatchError> {
        Ok(self.start_run_handle(input).await?.0)
    }

    async fn start_run_handle(
        self: &Arc<Self>,
        input: RunInput,
    ) -> Result<(RunId, Arc<dyn WorkflowHandle>), DispatchError> {
        if !self.agents.read().contains_key(&input.agent_id) {
            return Err(DispatchError::NotRegistered(input.agent_id.to_string()));
        }
        let run_id = input.run_id.unwrap_or_else(RunId::new);
        let mut record = RunRecord::new(input.agent_id.clone(), input.session_id.clone(), input.turn_id.clone());
        record.run_id = run_id;
        record.transition(RunStatus::Running, chrono::Utc::now());

        let workflow_input = WorkflowInput {
            run_id,
            agent_id: input.agent_id.clone(),
            session_id: input.session_id,
            turn_id: input.turn_id,
            messages: input.messages,
        };
        let payload = serde_json::to_value(&workflow_input).map_err(|e| DispatchError::EngineStart(e.to_string()))?;

        let execution_id = next_execution_id(&self.runs.read(), run_id);
        let handle = self
            .engine
            .start_workflow(input.agent_id.as_str(), execution_id, payload)
            .await
            .map_err(DispatchError::EngineStart)?;

        self.runs.write().insert(run_id, RunEntry { record, handle: handle.clone() });
        Ok((run_id, handle))
    }

    fn finalize(&self, run_id: RunId, output: &WorkflowOutput) {
        if let Some(entry) = self.runs.write().get_mut(&run_id) {
            let next = if output.paused {
                RunStatus::Paused
            } else if output.is_error {
                RunStatus::Failed
            } else {
                RunStatus::Completed
            };
            entry.record.transition(next, chrono::Utc::now());
        }
    }

    pub async fn pause_run(&self, run_id: RunId) -> Result<(), DispatchError> {
        let handle = self
            .runs
            .read()
            .get(&run_id)
            .map(|e| e.handle.clone())
            .ok_or_else(|| DispatchError::NotFound(run_id.to_string()))?;
        handle.signal("pause", Value::Null).await;
        Ok(())
    }

    /// `ResumeRun` (spec §4.1): starts a fresh workflow execution under the
    /// same caller-visible `RunId`, seeded with the paused run's projected
    /// transcript plus the caller's new messages, continuing the same
    /// ledger (see `DESIGN.md` "pause/resume, same RunId").
    pub async fn resume_run(self: &Arc<Self>, run_id: RunId, messages: Vec<art_model::Message>) -> Result<RunOutput, DispatchError> {
        let (agent_id, session_id, turn_id) = {
            let runs = self.runs.read();
            let entry = runs.get(&run_id).ok_or_else(|| DispatchError::NotFound(run_id.to_string()))?;
            (entry.record.agent_id.clone(), entry.record.session_id.clone(), entry.record.turn_id.clone())
        };

        let mut seed = self.ledger_snapshot_as_messages(run_id);
        seed.extend(messages);

        let input = RunInput {
            run_id: Some(run_id),
            agent_id,
            session_id,
            turn_id,
            messages: seed,
        };
        self.start_run(input).await
    }

    fn ledger_snapshot_as_messages(&self, run_id: RunId) -> Vec<art_model::Message> {
        self.ledgers
            .read()
            .get(&run_id)
            .map(|l| art_ledger::project(&l.snapshot()).unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn run_status(&self, run_id: RunId) -> Option<RunStatus> {
        self.runs.read().get(&run_id).map(|e| e.record.status)
    }
}

fn next_execution_id(runs: &HashMap<RunId, RunEntry>, run_id: RunId) -> String {
    let attempt = runs.get(&run_id).map(|_| 1).unwrap_or(0);
    format!("{run_id}-{attempt}")
}

#[async_trait]
impl InlineAgentRunner for Orchestrator {
    /// Runs a nested agent-as-tool invocation in the parent's own
    /// `WorkflowContext` rather than starting a new workflow (spec §4.5):
    /// its planner/tool activities are dispatched through the same `ctx`,
    /// so they remain part of the parent run's durable history.
    async fn run_inline(
        &self,
        ctx: &Arc<dyn WorkflowContext>,
        agent_id: &AgentId,
        parent_call: ToolCallId,
        session_id: Option<SessionId>,
        turn_id: Option<TurnId>,
        arguments: Value,
    ) -> InlineAgentOutcome {
        let registration = match self.agents.read().get(agent_id).cloned() {
            Some(r) => r,
            None => {
                return InlineAgentOutcome {
                    result: Value::String(format!("nested agent '{agent_id}' is not registered")),
                    is_error: true,
                    child_tool_call_count: 0,
                }
            }
        };
        let dispatcher = self.dispatchers.read().get(agent_id).cloned().expect("dispatcher registered alongside agent");
        let run_id = RunId::new();
        let ledger = self.ledger_for(run_id);
        let policy_defaults = registration.policy.clone().unwrap_or_else(|| self.config.policy.clone());

        // `Orchestrator` is always held behind an `Arc`, constructed only
        // via `Orchestrator::new`; `self.shared()` recovers that `Arc` so
        // the nested loop can keep dispatching through the very same
        // `InlineAgentRunner` any further nesting would need.
        let deps = RunLoopDeps {
            registration,
            dispatcher: dispatcher.clone(),
            hooks: self.hooks.clone(),
            ledger,
            policy_defaults,
            plan_activity: self.config.plan_activity.clone(),
            inline_runner: self.shared(),
            turn_sequencer: self.turn_sequencer.clone(),
        };
        // The nested run keeps its own `RunId` (it is still a distinct
        // ledger/workflow), but inherits the parent's `SessionId`/`TurnId`
        // when provided, so its hook events sequence under the parent's
        // turn rather than starting a disconnected one (spec §4.4, §4.5).
        let run_context = RunContext {
            run_id,
            agent_id: agent_id.clone(),
            session_id,
            turn_id,
        };
        let text = serde_json::to_string(&arguments).unwrap_or_default();
        let message = art_model::Message::user(text);

        let PlanLoopResult { outcome, tool_call_count } =
            run_plan_loop(&deps, ctx.clone(), run_context, vec![message]).await;
        let _ = parent_call; // correlated via the dispatcher's own ToolCallScheduled/Updated events
        match outcome {
            LoopOutcome::Completed(msg) => InlineAgentOutcome {
                result: Value::String(msg.text),
                is_error: false,
                child_tool_call_count: tool_call_count,
            },
            LoopOutcome::Failed(msg) => InlineAgentOutcome {
                result: Value::String(msg.text),
                is_error: true,
                child_tool_call_count: tool_call_count,
            },
            LoopOutcome::Paused => InlineAgentOutcome {
                result: Value::String("nested run paused".into()),
                is_error: true,
                child_tool_call_count: tool_call_count,
            },
        }
    }
}
