//! Test harness crate: a scripted [`Planner`](art_planner::Planner), a
//! scripted [`Client`](art_model::Client), and re-exports of the in-memory
//! [`art_workflow::WorkflowEngine`] every scenario test in this workspace
//! is built on (spec §2 "Test harness").

mod mock_client;
mod scripted_planner;

pub use mock_client::ScriptedClient;
pub use scripted_planner::ScriptedPlanner;
