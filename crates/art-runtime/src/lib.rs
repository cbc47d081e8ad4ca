//! The orchestrator crate: wires the planner, policy engine, tool
//! dispatcher, ledger, and hook bus around a [`art_workflow::WorkflowEngine`]
//! into the public surface described in spec §4.1 —
//! `RegisterAgent`/`RegisterToolset`/`RegisterModel`,
//! `StartRun`/`Run`/`PauseRun`/`ResumeRun`.

mod orchestrator;
mod registration;
mod run_loop;

pub use orchestrator::Orchestrator;
pub use registration::{AgentRegistration, RunInput, RunOutput, ToolsetExecutor, ToolsetRegistration};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;

    use art_domain::{AgentId, PolicyDefaults, RunId, RuntimeConfig};
    use art_planner::{AgentMessage, PlanInput, PlanResult, Planner, ToolRequest};
    use art_tools::{ToolSpec, TypeSpec};
    use art_workflow::InMemoryEngine;

    use super::*;

    /// A scripted planner: replies with one tool call, then finalizes once
    /// it sees that call's result.
    struct ScriptedPlanner;

    #[async_trait]
    impl Planner for ScriptedPlanner {
        async fn plan_start(&self, _input: PlanInput) -> PlanResult {
            PlanResult::Tools(vec![ToolRequest {
                id: art_domain::ToolCallId::new(),
                name: "demo.echo".into(),
                arguments: json!({"text": "hi"}),
            }])
        }

        async fn plan_resume(&self, input: PlanInput) -> PlanResult {
            let echoed = input
                .tool_results
                .first()
                .map(|r| r.result.clone())
                .unwrap_or(json!(null));
            PlanResult::Final(AgentMessage {
                text: format!("echoed: {echoed}"),
                thinking: None,
            })
        }
    }

    struct EchoExecutor;

    #[async_trait]
    impl ToolsetExecutor for EchoExecutor {
        async fn execute(&self, _tool_name: &str, arguments: serde_json::Value) -> Result<serde_json::Value, art_domain::ToolError> {
            Ok(arguments)
        }
    }

    fn echo_spec() -> ToolSpec {
        ToolSpec {
            name: "echo".into(),
            service: "svc".into(),
            toolset: "demo".into(),
            description: "echoes its input".into(),
            tags: vec![],
            meta: std::collections::HashMap::new(),
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
        }
    }

    #[tokio::test]
    async fn a_full_run_plans_dispatches_and_finalizes() {
        let engine = Arc::new(InMemoryEngine::new());
        let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());

        orchestrator
            .register_toolset(ToolsetRegistration {
                name: "demo".into(),
                specs: vec![echo_spec()],
                executor: Arc::new(EchoExecutor),
            })
            .unwrap();

        let agent_id = AgentId::new("svc", "demo");
        orchestrator
            .register_agent(agent_id.clone(), Arc::new(ScriptedPlanner), &["demo"], None)
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
        assert!(output.message.text.contains("hi"));
    }

    #[tokio::test]
    async fn unregistered_agent_is_rejected_at_start() {
        let engine = Arc::new(InMemoryEngine::new());
        let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());
        let err = orchestrator
            .start_run(RunInput {
                run_id: Some(RunId::new()),
                agent_id: AgentId::new("svc", "ghost"),
                session_id: None,
                turn_id: None,
                messages: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, art_domain::error::DispatchError::NotRegistered(_)));
    }

    #[tokio::test]
    async fn cap_of_zero_tool_calls_surfaces_as_cap_exceeded_without_dispatch() {
        let engine = Arc::new(InMemoryEngine::new());
        let orchestrator = Orchestrator::new(engine, RuntimeConfig::default());
        orchestrator
            .register_toolset(ToolsetRegistration {
                name: "demo".into(),
                specs: vec![echo_spec()],
                executor: Arc::new(EchoExecutor),
            })
            .unwrap();
        let agent_id = AgentId::new("svc", "capped");
        orchestrator
            .register_agent(
                agent_id.clone(),
                Arc::new(ScriptedPlanner),
                &["demo"],
                Some(PolicyDefaults {
                    max_tool_calls: Some(0),
                    ..PolicyDefaults::default()
                }),
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

        // The tool call is rejected by the policy engine (cap_exceeded) and
        // fed back to the planner, which still finalizes from the rejection
        // payload rather than a real echo.
        assert!(!output.is_error);
        assert!(output.message.text.contains("cap_exceeded"));
    }
}
