//! Wires a demo agent ("demo.assistant") and a "clock" toolset onto an
//! in-memory [`art_workflow::WorkflowEngine`] — the runnable surface the
//! teacher's `serialagent` binary gives its own core (spec §10 "CLI demo
//! harness").

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use art_domain::{AgentId, RuntimeConfig, ToolError};
use art_runtime::{Orchestrator, ToolsetExecutor, ToolsetRegistration};
use art_tools::{ToolSpec, TypeSpec};
use art_workflow::InMemoryEngine;

use crate::planner::DemoPlanner;

struct ClockExecutor;

#[async_trait]
impl ToolsetExecutor for ClockExecutor {
    async fn execute(&self, _tool_name: &str, _arguments: Value) -> Result<Value, ToolError> {
        Ok(json!({ "now": chrono::Utc::now().to_rfc3339() }))
    }
}

fn clock_now_spec() -> ToolSpec {
    ToolSpec {
        name: "now".into(),
        service: "demo".into(),
        toolset: "clock".into(),
        description: "return the current UTC time".into(),
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
        payload: TypeSpec::new("ClockPayload", json!({"type": "object"})),
        result: TypeSpec::new("ClockResult", json!({"type": "object"})),
    }
}

pub const DEMO_AGENT_SERVICE: &str = "demo";
pub const DEMO_AGENT_NAME: &str = "assistant";

/// Build a fresh demo orchestrator with the "demo.assistant" agent
/// registered against the "clock" toolset and [`DemoPlanner`].
pub fn build() -> (Arc<Orchestrator>, AgentId) {
    let engine = Arc::new(InMemoryEngine::new());
    let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());

    orchestrator
        .register_toolset(ToolsetRegistration {
            name: "clock".into(),
            specs: vec![clock_now_spec()],
            executor: Arc::new(ClockExecutor),
        })
        .expect("demo toolset registration never collides on a fresh orchestrator");

    let agent_id = AgentId::new(DEMO_AGENT_SERVICE, DEMO_AGENT_NAME);
    orchestrator
        .register_agent(agent_id.clone(), Arc::new(DemoPlanner), &["clock"], None)
        .expect("demo agent registration never collides on a fresh orchestrator");

    (orchestrator, agent_id)
}
