//! The workflow engine contract (spec §6): `RegisterWorkflow`,
//! `RegisterActivity`, `StartWorkflow(req) -> Handle`; `Handle.Signal`,
//! `Handle.Wait`. `WorkflowContext` exposes `ExecuteActivityAsync`,
//! `Context`, and a deterministic `Now`.
//!
//! The core is deliberately engine-agnostic (spec "Non-goals": "does not
//! prescribe a workflow engine... any engine providing this contract
//! suffices"). [`crate::memory`] is one such engine, suitable for tests
//! and single-process deployments.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Retry/timeout options attached to each activity definition (spec §6).
#[derive(Debug, Clone)]
pub struct ActivityOptions {
    pub timeout: Duration,
    pub max_attempts: u32,
}

impl Default for ActivityOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 1,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ActivityError {
    #[error("activity '{0}' is not registered")]
    NotRegistered(String),
    #[error("activity timed out after {0:?}")]
    Timeout(Duration),
    #[error("activity failed: {0}")]
    Failed(String),
    #[error("workflow was cancelled")]
    Cancelled,
}

/// The execution context threaded through a running workflow body.
///
/// Per spec §4.2 "Suspension points", only activity futures, signals, and
/// timers may suspend a workflow body — planner/tool decoding happens
/// inside activities, never here.
#[async_trait]
pub trait WorkflowContext: Send + Sync {
    async fn execute_activity(
        &self,
        activity: &str,
        input: Value,
        opts: ActivityOptions,
    ) -> Result<Value, ActivityError>;

    /// Deterministic clock: workflow bodies must never read the wall
    /// clock directly (spec §9 "Durable workflow replay").
    fn now(&self) -> DateTime<Utc>;

    fn is_cancelled(&self) -> bool;

    /// Blocks until the next signal addressed to this workflow arrives,
    /// or `None` once the workflow has been cancelled.
    async fn next_signal(&self) -> Option<(String, Value)>;

    /// Non-blocking peek used at the plan-loop checkpoints between
    /// activity calls (spec §4.2 "Suspension points"): `None` when no
    /// signal is queued right now.
    fn try_next_signal(&self) -> Option<(String, Value)>;
}

pub type ActivityFn =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;
pub type WorkflowFn =
    Arc<dyn Fn(Arc<dyn WorkflowContext>, Value) -> BoxFuture<'static, Value> + Send + Sync>;

/// A live workflow execution. `signal`/`wait` mirror `Handle.Signal` and
/// `Handle.Wait` from spec §6.
#[async_trait]
pub trait WorkflowHandle: Send + Sync {
    async fn signal(&self, name: &str, payload: Value);
    async fn wait(&self) -> Value;
    fn cancel(&self);
}

/// `RegisterWorkflow`/`RegisterActivity`/`StartWorkflow` (spec §6).
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    fn register_workflow(&self, name: &str, body: WorkflowFn);
    fn register_activity(&self, name: &str, f: ActivityFn);

    async fn start_workflow(
        &self,
        workflow: &str,
        execution_id: String,
        input: Value,
    ) -> Result<Arc<dyn WorkflowHandle>, String>;
}
