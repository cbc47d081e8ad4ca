//! A minimal rule-based [`Planner`] for the demo binary: no model call at
//! all, just enough branching to exercise the tool-dispatch path (spec §10
//! "CLI demo harness"). A real embedding swaps this for a model-backed
//! planner behind the same trait.

use async_trait::async_trait;

use art_domain::ToolCallId;
use art_model::Role;
use art_planner::{AgentMessage, PlanInput, PlanResult, Planner, ToolRequest};

pub struct DemoPlanner;

#[async_trait]
impl Planner for DemoPlanner {
    async fn plan_start(&self, input: PlanInput) -> PlanResult {
        let last_user = input
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.text())
            .unwrap_or_default();

        if last_user.trim_start().starts_with("/time") {
            PlanResult::Tools(vec![ToolRequest {
                id: ToolCallId::new(),
                name: "clock.now".into(),
                arguments: serde_json::json!({}),
            }])
        } else {
            PlanResult::Final(AgentMessage {
                text: format!("you said: {last_user}"),
                thinking: None,
            })
        }
    }

    async fn plan_resume(&self, input: PlanInput) -> PlanResult {
        let summary = input
            .tool_results
            .iter()
            .map(|r| r.result.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        PlanResult::Final(AgentMessage {
            text: format!("the current time is {summary}"),
            thinking: None,
        })
    }
}
