//! The plan/execute loop (spec §4.2): the body every agent workflow runs,
//! whether driven top-level by `StartRun` or nested inline by an
//! agent-as-tool invocation (spec §4.5).
//!
//! Planner calls and tool activities are the only things that suspend
//! this loop (spec §9 "Planner and tool decoding happen inside
//! activities, never in the workflow body") — everything here is plain,
//! synchronous bookkeeping between those two kinds of await points.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use art_domain::error::{ToolError, ToolErrorKind};
use art_domain::{ActivityRetryConfig, PolicyDefaults};
use art_exec::{Dispatcher, InlineAgentRunner};
use art_hooks::{HookBus, HookEnvelope, HookEvent};
use art_ledger::{Ledger, TurnSequencer};
use art_model::Message;
use art_planner::{AgentMessage, PlanInput, PlanResult, RunContext, ToolRequest, ToolResultEnvelope};
use art_policy::{apply_policy, resolve_timeout, CapsState, TurnOverrides};
use art_workflow::{ActivityOptions, WorkflowContext};

use crate::registration::AgentRegistration;

pub(crate) struct RunLoopDeps {
    pub registration: Arc<AgentRegistration>,
    pub dispatcher: Arc<Dispatcher>,
    pub hooks: Arc<HookBus>,
    pub ledger: Arc<Ledger>,
    pub policy_defaults: PolicyDefaults,
    pub plan_activity: ActivityRetryConfig,
    pub inline_runner: Arc<dyn InlineAgentRunner>,
    /// Shared with this agent's [`Dispatcher`] so loop-level hook events
    /// (assistant messages, hard protection) and dispatcher-level ones
    /// (tool scheduling/results) share one strictly-increasing sequence
    /// per turn (spec §3, §5 "Ordering guarantees").
    pub turn_sequencer: Arc<TurnSequencer>,
}

pub(crate) enum LoopOutcome {
    Completed(AgentMessage),
    Failed(AgentMessage),
    Paused,
}

/// [`LoopOutcome`] plus the number of tool calls this invocation of the
/// loop itself dispatched — used by [`crate::orchestrator`] to populate
/// `InlineAgentOutcome::child_tool_call_count` for nested agent-as-tool
/// invocations (spec §4.2 step (g)) without any cross-call bookkeeping.
pub(crate) struct PlanLoopResult {
    pub outcome: LoopOutcome,
    pub tool_call_count: usize,
}

fn seed_caps(defaults: &PolicyDefaults, now: chrono::DateTime<chrono::Utc>) -> CapsState {
    CapsState {
        remaining_tool_calls: defaults.max_tool_calls,
        remaining_consecutive_failed_tool_calls: defaults.max_consecutive_failed_tool_calls,
        deadline: defaults.time_budget().map(|d| now + d),
    }
}

fn activity_options(retry: &ActivityRetryConfig) -> ActivityOptions {
    ActivityOptions {
        timeout: retry.timeout(),
        max_attempts: retry.max_attempts,
    }
}

async fn call_plan(
    ctx: &Arc<dyn WorkflowContext>,
    activity: &str,
    input: &PlanInput,
    opts: ActivityOptions,
) -> PlanResult {
    let payload = serde_json::to_value(input).unwrap_or(Value::Null);
    match ctx.execute_activity(activity, payload, opts).await {
        Ok(value) => serde_json::from_value(value).unwrap_or_else(|e| {
            PlanResult::Fail(art_domain::PlannerError::InvariantViolation(format!(
                "planner activity returned an undecodable PlanResult: {e}"
            )))
        }),
        Err(err) => PlanResult::Fail(art_domain::PlannerError::ProviderFailure(err.to_string())),
    }
}

fn envelope(
    run_context: &RunContext,
    now: chrono::DateTime<chrono::Utc>,
    seq: u64,
    kind: HookEvent,
) -> HookEnvelope {
    HookEnvelope {
        run_id: run_context.run_id,
        agent_id: run_context.agent_id.clone(),
        session_id: run_context.session_id.clone(),
        turn_id: run_context.turn_id.clone(),
        timestamp_ms: now.timestamp_millis(),
        seq,
        kind,
    }
}

fn tool_error_value(err: &ToolError) -> Value {
    serde_json::to_value(err).unwrap_or_else(|_| json!({"kind": err.kind.to_string(), "message": err.message}))
}

/// Run the plan/execute loop to completion, pause, or failure.
pub(crate) async fn run_plan_loop(
    deps: &RunLoopDeps,
    ctx: Arc<dyn WorkflowContext>,
    run_context: RunContext,
    messages: Vec<Message>,
) -> PlanLoopResult {
    let mut tool_call_count = 0usize;
    let mut caps = seed_caps(&deps.policy_defaults, ctx.now());
    let overrides = TurnOverrides::default();
    let plan_opts = activity_options(&deps.plan_activity);
    let plan_activity_name = format!("{}.plan_start", run_context.agent_id.as_str());
    let resume_activity_name = format!("{}.plan_resume", run_context.agent_id.as_str());

    let start_input = PlanInput {
        messages,
        run_context: run_context.clone(),
        tool_results: vec![],
        agent_id: run_context.agent_id.clone(),
        system_messages: vec![],
    };
    let mut result = call_plan(&ctx, &plan_activity_name, &start_input, plan_opts.clone()).await;

    loop {
        if let Some((name, _payload)) = ctx.try_next_signal() {
            if name == "pause" {
                deps.ledger.append_note(json!({"paused": true}), ctx.now());
                return PlanLoopResult { outcome: LoopOutcome::Paused, tool_call_count };
            }
        }

        match result {
            PlanResult::Final(msg) => {
                let now = ctx.now();
                deps.ledger.append_assistant_text(msg.text.clone(), now);
                let seq = deps.turn_sequencer.next_for(run_context.run_id, &run_context.turn_id);
                deps.hooks.publish(envelope(
                    &run_context,
                    now,
                    seq,
                    HookEvent::AssistantMessage { text: msg.text.clone() },
                ));
                return PlanLoopResult { outcome: LoopOutcome::Completed(msg), tool_call_count };
            }
            PlanResult::Fail(err) => {
                deps.ledger
                    .append_note(json!({"planner_failed": err.to_string()}), ctx.now());
                return PlanLoopResult {
                    outcome: LoopOutcome::Failed(AgentMessage {
                        text: err.to_string(),
                        thinking: None,
                    }),
                    tool_call_count,
                };
            }
            PlanResult::Tools(requests) => {
                tool_call_count += requests.len();
                let now = ctx.now();
                if caps.deadline_exceeded(now) {
                    caps.remaining_tool_calls = Some(0);
                }

                let decision = apply_policy(
                    &deps.registration.tool_specs,
                    &mut caps,
                    &overrides,
                    requests.clone(),
                );

                if !decision.duplicates.is_empty() {
                    deps.ledger.append_note(
                        json!({"duplicate_tool_call_ids": decision.duplicates}),
                        now,
                    );
                }

                for req in &requests {
                    deps.ledger
                        .append_tool_use(req.id, req.name.clone(), req.arguments.clone(), now);
                }

                let timeouts = build_timeouts(
                    &overrides,
                    &decision.allowed,
                    deps.policy_defaults.default_tool_timeout(),
                );
                let batch_seq = deps.turn_sequencer.next_for(run_context.run_id, &run_context.turn_id);
                let env = envelope(&run_context, now, batch_seq, HookEvent::AssistantChunk { text: String::new() });
                let outcomes = deps
                    .dispatcher
                    .dispatch_batch(&env, &ctx, decision.allowed.clone(), &timeouts, Some(&deps.inline_runner))
                    .await;

                let mut results: HashMap<art_domain::ToolCallId, (Value, bool)> = HashMap::new();
                for (req, err) in &decision.rejected {
                    if matches!(err.kind, ToolErrorKind::CapExceeded) {
                        caps.record_failure();
                    }
                    results.insert(req.id, (tool_error_value(err), true));
                }

                let mut hard_protection_names = Vec::new();
                let mut terminal: Option<(art_domain::ToolCallId, String)> = None;
                for outcome in &outcomes {
                    if outcome.is_error {
                        caps.record_failure();
                    } else {
                        caps.record_success();
                    }
                    let payload = outcome
                        .error
                        .as_ref()
                        .map(tool_error_value)
                        .unwrap_or_else(|| outcome.result.clone());
                    results.insert(outcome.tool_call_id, (payload.clone(), outcome.is_error));

                    if outcome.zero_child_tool_calls {
                        if let Some(req) = requests.iter().find(|r| r.id == outcome.tool_call_id) {
                            hard_protection_names.push(req.name.clone());
                        }
                    }
                    if !outcome.is_error {
                        if let Some(req) = requests.iter().find(|r| r.id == outcome.tool_call_id) {
                            if deps
                                .registration
                                .tool_specs
                                .get(&req.name)
                                .map(|s| s.terminal_run)
                                .unwrap_or(false)
                            {
                                terminal = Some((outcome.tool_call_id, payload.to_string()));
                            }
                        }
                    }
                }

                let mut tool_results = Vec::new();
                for req in &requests {
                    if let Some((payload, is_error)) = results.get(&req.id) {
                        let _ = deps
                            .ledger
                            .append_tool_result(req.id, payload.clone(), *is_error, now);
                        tool_results.push(ToolResultEnvelope {
                            tool_call_id: req.id,
                            result: payload.clone(),
                            is_error: *is_error,
                        });
                    }
                }

                // spec §4.2 step 3(f): each invoked tool's `result_reminder`
                // becomes one line of a single `<system-reminder>`-wrapped
                // system message, recorded in the ledger for audit and fed
                // to the planner's next call via `PlanInput::system_messages`.
                let reminders: Vec<String> = requests
                    .iter()
                    .filter_map(|r| deps.registration.tool_specs.get(&r.name))
                    .filter_map(|s| s.result_reminder.clone())
                    .collect();
                if !reminders.is_empty() {
                    deps.ledger.append_note(
                        json!({ "system_reminder": reminders.join("\n") }),
                        now,
                    );
                }

                if !hard_protection_names.is_empty() {
                    let seq = deps.turn_sequencer.next_for(run_context.run_id, &run_context.turn_id);
                    deps.hooks.publish(envelope(
                        &run_context,
                        now,
                        seq,
                        HookEvent::HardProtection {
                            reason: "agent-tool invocation produced zero child tool calls".into(),
                            tool_count: requests.len(),
                            children: 0,
                            tool_names: hard_protection_names,
                        },
                    ));
                }

                if let Some((_, text)) = terminal {
                    deps.ledger.append_assistant_text(text.clone(), now);
                    return PlanLoopResult {
                        outcome: LoopOutcome::Completed(AgentMessage { text, thinking: None }),
                        tool_call_count,
                    };
                }

                let resume_input = PlanInput {
                    messages: vec![],
                    run_context: run_context.clone(),
                    tool_results,
                    agent_id: run_context.agent_id.clone(),
                    system_messages: reminders,
                };
                result = call_plan(&ctx, &resume_activity_name, &resume_input, plan_opts.clone()).await;
            }
        }
    }
}

fn build_timeouts(
    overrides: &TurnOverrides,
    allowed: &[ToolRequest],
    default: Duration,
) -> HashMap<art_domain::ToolCallId, Duration> {
    allowed
        .iter()
        .map(|req| {
            let d = resolve_timeout(&overrides.per_tool_timeout, &req.name, default);
            (req.id, d)
        })
        .collect()
}
