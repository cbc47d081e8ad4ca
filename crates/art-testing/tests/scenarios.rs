//! End-to-end scenario tests against the in-memory engine, covering the
//! six run-loop scenarios and the cross-cutting invariants they exercise.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use art_domain::{error::ToolErrorKind, AgentId, PolicyDefaults, RunId, RunStatus, RuntimeConfig, ToolError};
use art_hooks::{HookEnvelope, HookEvent, Subscriber};
use art_planner::{AgentMessage, PlanResult, ToolRequest};
use art_runtime::{Orchestrator, RunInput, ToolsetExecutor, ToolsetRegistration};
use art_tools::{ToolSpec, TypeSpec};
use art_testing::ScriptedPlanner;
use art_workflow::InMemoryEngine;

fn search_query_spec() -> ToolSpec {
    ToolSpec {
        name: "query".into(),
        service: "svc".into(),
        toolset: "ops.search".into(),
        description: "search for records matching a query".into(),
        tags: vec!["read".into()],
        meta: HashMap::new(),
        terminal_run: false,
        is_agent_tool: false,
        agent_id: None,
        bounded_result: false,
        paging: None,
        server_data: vec![],
        result_reminder: None,
        confirmation: None,
        payload: TypeSpec::new(
            "SearchPayload",
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": { "type": "string" },
                    "limit": { "type": "integer" }
                }
            }),
        )
        .with_example(json!({"query": "text", "limit": 10})),
        result: TypeSpec::new("SearchResult", json!({"type": "object"})),
    }
}

fn render_terminal_spec() -> ToolSpec {
    ToolSpec {
        name: "render".into(),
        service: "svc".into(),
        toolset: "report".into(),
        description: "render a final report".into(),
        tags: vec![],
        meta: HashMap::new(),
        terminal_run: true,
        is_agent_tool: false,
        agent_id: None,
        bounded_result: false,
        paging: None,
        server_data: vec![],
        result_reminder: None,
        confirmation: None,
        payload: TypeSpec::new("RenderPayload", json!({"type": "object"})),
        result: TypeSpec::new("RenderResult", json!({"type": "object"})),
    }
}

fn sub_agent_tool_spec(agent_id: &AgentId) -> ToolSpec {
    ToolSpec {
        name: "agent.run".into(),
        service: "svc".into(),
        toolset: "sub".into(),
        description: "delegate to the nested sub agent".into(),
        tags: vec![],
        meta: HashMap::new(),
        terminal_run: false,
        is_agent_tool: true,
        agent_id: Some(agent_id.as_str().to_string()),
        bounded_result: false,
        paging: None,
        server_data: vec![],
        result_reminder: None,
        confirmation: None,
        payload: TypeSpec::new("SubAgentPayload", json!({"type": "object"})),
        result: TypeSpec::new("SubAgentResult", json!({"type": "object"})),
    }
}

struct EchoExecutor;

#[async_trait]
impl ToolsetExecutor for EchoExecutor {
    async fn execute(&self, tool_name: &str, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        match tool_name {
            "query" => Ok(json!({"hits": ["a", "b"]})),
            "render" => Ok(arguments),
            other => Err(ToolError::new(ToolErrorKind::ToolUnknown, format!("unhandled tool: {other}"))),
        }
    }
}

/// A slow echo, used by the pause/resume scenario to keep the run loop
/// alive in a real tool dispatch long enough for a concurrently-sent
/// pause signal to land.
struct SlowEchoExecutor;

#[async_trait]
impl ToolsetExecutor for SlowEchoExecutor {
    async fn execute(&self, _tool_name: &str, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        tokio::time::sleep(Duration::from_millis(40)).await;
        Ok(arguments)
    }
}

fn req(name: &str, args: serde_json::Value) -> ToolRequest {
    ToolRequest {
        id: art_domain::ToolCallId::new(),
        name: name.into(),
        arguments: args,
    }
}

#[derive(Default)]
struct EventRecorder {
    events: Mutex<Vec<HookEvent>>,
}

impl Subscriber for EventRecorder {
    fn on_event(&self, event: &HookEnvelope) -> Result<(), String> {
        self.events.lock().push(event.kind.clone());
        Ok(())
    }
}

#[tokio::test]
async fn s1_single_tool_happy_path() {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());
    orchestrator
        .register_toolset(ToolsetRegistration {
            name: "ops.search".into(),
            specs: vec![search_query_spec()],
            executor: Arc::new(EchoExecutor),
        })
        .unwrap();

    let agent_id = AgentId::new("svc", "chat");
    let planner = Arc::new(ScriptedPlanner::new(vec![
        PlanResult::Tools(vec![req("ops.search.query", json!({"query": "kv", "limit": 3}))]),
        PlanResult::Final(AgentMessage { text: "found 2 hits".into(), thinking: None }),
    ]));
    orchestrator
        .register_agent(agent_id.clone(), planner, &["ops.search"], None)
        .unwrap();

    let output = orchestrator
        .start_run(RunInput {
            run_id: None,
            agent_id,
            session_id: None,
            turn_id: None,
            messages: vec![art_model::Message::user("find kv records")],
        })
        .await
        .unwrap();

    assert!(!output.is_error);
    assert_eq!(output.message.text, "found 2 hits");
    assert_eq!(orchestrator.run_status(output.run_id), Some(RunStatus::Completed));
}

#[tokio::test]
async fn s2_cap_exhaustion_keeps_only_what_fits() {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());
    orchestrator
        .register_toolset(ToolsetRegistration {
            name: "ops.search".into(),
            specs: vec![search_query_spec()],
            executor: Arc::new(EchoExecutor),
        })
        .unwrap();

    let agent_id = AgentId::new("svc", "capped");
    let planner = Arc::new(ScriptedPlanner::new(vec![
        PlanResult::Tools(vec![
            req("ops.search.query", json!({"query": "a"})),
            req("ops.search.query", json!({"query": "b"})),
            req("ops.search.query", json!({"query": "c"})),
        ]),
        PlanResult::Final(AgentMessage { text: "done".into(), thinking: None }),
    ]));
    orchestrator
        .register_agent(
            agent_id.clone(),
            planner.clone(),
            &["ops.search"],
            Some(PolicyDefaults { max_tool_calls: Some(2), ..PolicyDefaults::default() }),
        )
        .unwrap();

    let output = orchestrator
        .start_run(RunInput {
            run_id: None,
            agent_id,
            session_id: None,
            turn_id: None,
            messages: vec![art_model::Message::user("go")],
        })
        .await
        .unwrap();

    assert!(!output.is_error);
    assert_eq!(output.message.text, "done");

    // The second plan call (resume) should have seen exactly 2 successful
    // results and 1 cap_exceeded rejection, in the original request order.
    let calls = planner.calls();
    let resume_input = &calls[1];
    assert_eq!(resume_input.tool_results.len(), 3);
    assert!(!resume_input.tool_results[0].is_error);
    assert!(!resume_input.tool_results[1].is_error);
    assert!(resume_input.tool_results[2].is_error);
}

#[tokio::test]
async fn s3_agent_as_tool_with_zero_child_calls_raises_hard_protection() {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());

    let recorder = Arc::new(EventRecorder::default());
    orchestrator.hooks().subscribe(Box::new(ArcSubscriber(recorder.clone())));

    let sub_agent_id = AgentId::new("svc", "sub");
    let sub_planner = Arc::new(ScriptedPlanner::new(vec![PlanResult::Final(AgentMessage {
        text: "ok".into(),
        thinking: None,
    })]));
    orchestrator.register_agent(sub_agent_id.clone(), sub_planner, &[], None).unwrap();

    orchestrator
        .register_toolset(ToolsetRegistration {
            name: "sub".into(),
            specs: vec![sub_agent_tool_spec(&sub_agent_id)],
            executor: Arc::new(EchoExecutor),
        })
        .unwrap();

    let parent_agent_id = AgentId::new("svc", "parent");
    let parent_planner = Arc::new(ScriptedPlanner::new(vec![
        PlanResult::Tools(vec![req("sub.agent.run", json!({"task": "ping"}))]),
        PlanResult::Final(AgentMessage { text: "parent done".into(), thinking: None }),
    ]));
    orchestrator
        .register_agent(parent_agent_id.clone(), parent_planner, &["sub"], None)
        .unwrap();

    let output = orchestrator
        .start_run(RunInput {
            run_id: None,
            agent_id: parent_agent_id,
            session_id: None,
            turn_id: None,
            messages: vec![art_model::Message::user("delegate")],
        })
        .await
        .unwrap();

    assert!(!output.is_error);
    assert_eq!(output.message.text, "parent done");

    let saw_hard_protection = recorder.events.lock().iter().any(|e| {
        matches!(
            e,
            HookEvent::HardProtection { tool_count, children, tool_names, .. }
                if *tool_count == 1 && *children == 0 && tool_names == &vec!["sub.agent.run".to_string()]
        )
    });
    assert!(saw_hard_protection, "expected a HardProtection event for the zero-child agent-tool call");
}

struct ArcSubscriber(Arc<EventRecorder>);

impl Subscriber for ArcSubscriber {
    fn on_event(&self, event: &HookEnvelope) -> Result<(), String> {
        self.0.on_event(event)
    }
}

#[tokio::test]
async fn s4_decode_error_carries_example_then_planner_retries() {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());
    orchestrator
        .register_toolset(ToolsetRegistration {
            name: "ops.search".into(),
            specs: vec![search_query_spec()],
            executor: Arc::new(EchoExecutor),
        })
        .unwrap();

    let agent_id = AgentId::new("svc", "retrier");
    let planner = Arc::new(ScriptedPlanner::new(vec![
        PlanResult::Tools(vec![req("ops.search.query", json!({"query": 42}))]),
        PlanResult::Tools(vec![req("ops.search.query", json!({"query": "text", "limit": 10}))]),
        PlanResult::Final(AgentMessage { text: "found it".into(), thinking: None }),
    ]));
    orchestrator
        .register_agent(agent_id.clone(), planner.clone(), &["ops.search"], None)
        .unwrap();

    let output = orchestrator
        .start_run(RunInput {
            run_id: None,
            agent_id,
            session_id: None,
            turn_id: None,
            messages: vec![art_model::Message::user("search")],
        })
        .await
        .unwrap();

    assert!(!output.is_error);
    assert_eq!(output.message.text, "found it");

    let calls = planner.calls();
    let first_resume = &calls[1];
    assert!(first_resume.tool_results[0].is_error);
    let err: ToolError = serde_json::from_value(first_resume.tool_results[0].result.clone()).unwrap();
    assert_eq!(err.kind, ToolErrorKind::ValidationError);
    let hint = err.retry_hint.expect("validation errors carry a retry hint");
    assert_eq!(hint.example, Some(json!({"query": "text", "limit": 10})));
}

#[tokio::test]
async fn s5_pause_then_resume_continues_from_last_ledger_position() {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());
    orchestrator
        .register_toolset(ToolsetRegistration {
            name: "demo".into(),
            specs: vec![ToolSpec {
                name: "slow".into(),
                service: "svc".into(),
                toolset: "demo".into(),
                description: String::new(),
                tags: vec![],
                meta: HashMap::new(),
                terminal_run: false,
                is_agent_tool: false,
                agent_id: None,
                bounded_result: false,
                paging: None,
                server_data: vec![],
                result_reminder: None,
                confirmation: None,
                payload: TypeSpec::new("P", json!({"type": "object"})),
                result: TypeSpec::new("R", json!({"type": "object"})),
            }],
            executor: Arc::new(SlowEchoExecutor),
        })
        .unwrap();

    let agent_id = AgentId::new("svc", "pausable");
    let planner = Arc::new(ScriptedPlanner::new(vec![
        PlanResult::Tools(vec![req("demo.slow", json!({"step": 1}))]),
        PlanResult::Tools(vec![req("demo.slow", json!({"step": 2}))]),
        PlanResult::Final(AgentMessage { text: "resumed".into(), thinking: None }),
    ]));
    orchestrator
        .register_agent(agent_id.clone(), planner, &["demo"], None)
        .unwrap();

    let run_id = RunId::new();
    let orch = orchestrator.clone();
    let started = orch.clone();
    let agent_for_task = agent_id.clone();
    let handle = tokio::spawn(async move {
        started
            .start_run(RunInput {
                run_id: Some(run_id),
                agent_id: agent_for_task,
                session_id: None,
                turn_id: None,
                messages: vec![art_model::Message::user("go")],
            })
            .await
            .unwrap()
    });

    // give the workflow time to enter its first (slow) tool dispatch
    // before the pause signal is sent, so it lands at the loop checkpoint
    // between turns rather than being missed entirely.
    tokio::time::sleep(Duration::from_millis(10)).await;
    orch.pause_run(run_id).await.unwrap();

    let paused_output = handle.await.unwrap();
    assert!(!paused_output.is_error);
    assert_eq!(orchestrator.run_status(run_id), Some(RunStatus::Paused));

    let resumed = orchestrator
        .resume_run(run_id, vec![art_model::Message::user("continue")])
        .await
        .unwrap();
    assert!(!resumed.is_error);
    assert_eq!(resumed.message.text, "resumed");
    assert_eq!(orchestrator.run_status(run_id), Some(RunStatus::Completed));
}

#[tokio::test]
async fn s7_result_reminder_reaches_the_next_plan_input() {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());

    let mut spec = search_query_spec();
    spec.result_reminder = Some("results may be stale; re-query before reporting".into());
    orchestrator
        .register_toolset(ToolsetRegistration {
            name: "ops.search".into(),
            specs: vec![spec],
            executor: Arc::new(EchoExecutor),
        })
        .unwrap();

    let agent_id = AgentId::new("svc", "reminded");
    let planner = Arc::new(ScriptedPlanner::new(vec![
        PlanResult::Tools(vec![req("ops.search.query", json!({"query": "kv"}))]),
        PlanResult::Final(AgentMessage { text: "done".into(), thinking: None }),
    ]));
    orchestrator
        .register_agent(agent_id.clone(), planner.clone(), &["ops.search"], None)
        .unwrap();

    let output = orchestrator
        .start_run(RunInput {
            run_id: None,
            agent_id,
            session_id: None,
            turn_id: None,
            messages: vec![art_model::Message::user("find kv records")],
        })
        .await
        .unwrap();

    assert!(!output.is_error);

    let calls = planner.calls();
    let resume_input = &calls[1];
    assert_eq!(
        resume_input.system_messages,
        vec!["results may be stale; re-query before reporting".to_string()]
    );
}

#[tokio::test]
async fn s6_terminal_run_tool_short_circuits_the_loop() {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());
    orchestrator
        .register_toolset(ToolsetRegistration {
            name: "report".into(),
            specs: vec![render_terminal_spec()],
            executor: Arc::new(EchoExecutor),
        })
        .unwrap();

    let agent_id = AgentId::new("svc", "reporter");
    // Only one script step: if the loop wrongly asked the planner for a
    // further turn after the terminal tool, `ScriptedPlanner` would fail
    // with "script ran out of steps" instead of this test's assertion.
    let planner = Arc::new(ScriptedPlanner::new(vec![PlanResult::Tools(vec![req(
        "report.render",
        json!({"title": "Q3"}),
    )])]));
    orchestrator
        .register_agent(agent_id.clone(), planner, &["report"], None)
        .unwrap();

    let output = orchestrator
        .start_run(RunInput {
            run_id: None,
            agent_id,
            session_id: None,
            turn_id: None,
            messages: vec![art_model::Message::user("render it")],
        })
        .await
        .unwrap();

    assert!(!output.is_error);
    assert_eq!(output.message.text, json!({"title": "Q3"}).to_string());
}
