//! An in-process [`WorkflowEngine`] implementation: workflow bodies run as
//! tokio tasks, activities dispatch through a registry shared by every
//! execution, and signals/results flow over channels (grounded on the
//! gateway's `tokio::sync` usage in `runtime/runs.rs` and the cancel-token
//! pattern in `runtime/cancel.rs`).
//!
//! This is the engine [`art_testing`] wires up for scenario tests, and a
//! reasonable default for single-process deployments; it does not persist
//! state across process restarts, so it does not itself satisfy the
//! "durable" half of the contract — a production deployment substitutes a
//! real durable engine behind the same trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};

use crate::cancel::CancelToken;
use crate::contract::{
    ActivityError, ActivityFn, ActivityOptions, WorkflowContext, WorkflowEngine, WorkflowFn,
    WorkflowHandle,
};

#[derive(Default)]
pub struct InMemoryEngine {
    workflows: RwLock<HashMap<String, WorkflowFn>>,
    activities: Arc<RwLock<HashMap<String, ActivityFn>>>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowEngine for InMemoryEngine {
    fn register_workflow(&self, name: &str, body: WorkflowFn) {
        self.workflows.write().insert(name.to_string(), body);
    }

    fn register_activity(&self, name: &str, f: ActivityFn) {
        self.activities.write().insert(name.to_string(), f);
    }

    async fn start_workflow(
        &self,
        workflow: &str,
        _execution_id: String,
        input: Value,
    ) -> Result<Arc<dyn WorkflowHandle>, String> {
        let body = self
            .workflows
            .read()
            .get(workflow)
            .cloned()
            .ok_or_else(|| format!("workflow '{workflow}' is not registered"))?;

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (result_tx, result_rx) = watch::channel(None);
        let cancel = CancelToken::new();

        let ctx: Arc<dyn WorkflowContext> = Arc::new(InMemoryContext {
            activities: self.activities.clone(),
            cancel: cancel.clone(),
            signal_rx: AsyncMutex::new(signal_rx),
        });

        tokio::spawn(async move {
            let output = body(ctx, input).await;
            let _ = result_tx.send(Some(output));
        });

        Ok(Arc::new(InMemoryHandle {
            signal_tx,
            result_rx,
            cancel,
        }))
    }
}

struct InMemoryContext {
    activities: Arc<RwLock<HashMap<String, ActivityFn>>>,
    cancel: CancelToken,
    signal_rx: AsyncMutex<mpsc::UnboundedReceiver<(String, Value)>>,
}

#[async_trait]
impl WorkflowContext for InMemoryContext {
    async fn execute_activity(
        &self,
        activity: &str,
        input: Value,
        opts: ActivityOptions,
    ) -> Result<Value, ActivityError> {
        if self.cancel.is_cancelled() {
            return Err(ActivityError::Cancelled);
        }
        let f = self
            .activities
            .read()
            .get(activity)
            .cloned()
            .ok_or_else(|| ActivityError::NotRegistered(activity.to_string()))?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match tokio::time::timeout(opts.timeout, f(input.clone())).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(message)) if attempt >= opts.max_attempts => {
                    return Err(ActivityError::Failed(message))
                }
                Err(_) if attempt >= opts.max_attempts => {
                    return Err(ActivityError::Timeout(opts.timeout))
                }
                _ => {
                    if self.cancel.is_cancelled() {
                        return Err(ActivityError::Cancelled);
                    }
                }
            }
        }
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn next_signal(&self) -> Option<(String, Value)> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.signal_rx.lock().await.recv().await
    }

    fn try_next_signal(&self) -> Option<(String, Value)> {
        self.signal_rx.try_lock().ok()?.try_recv().ok()
    }
}

struct InMemoryHandle {
    signal_tx: mpsc::UnboundedSender<(String, Value)>,
    result_rx: watch::Receiver<Option<Value>>,
    cancel: CancelToken,
}

#[async_trait]
impl WorkflowHandle for InMemoryHandle {
    async fn signal(&self, name: &str, payload: Value) {
        let _ = self.signal_tx.send((name.to_string(), payload));
    }

    async fn wait(&self) -> Value {
        let mut rx = self.result_rx.clone();
        loop {
            if let Some(value) = rx.borrow().clone() {
                return value;
            }
            if rx.changed().await.is_err() {
                return Value::Null;
            }
        }
    }

    fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn opts() -> ActivityOptions {
        ActivityOptions {
            timeout: Duration::from_secs(1),
            max_attempts: 1,
        }
    }

    #[tokio::test]
    async fn activity_result_flows_back_to_workflow_output() {
        let engine = InMemoryEngine::new();
        engine.register_activity(
            "double",
            Arc::new(|v: Value| {
                Box::pin(async move {
                    let n = v.as_i64().unwrap_or(0);
                    Ok(json!(n * 2))
                })
            }),
        );
        engine.register_workflow(
            "doubler",
            Arc::new(|ctx: Arc<dyn WorkflowContext>, input: Value| {
                Box::pin(async move { ctx.execute_activity("double", input, opts()).await.unwrap() })
            }),
        );

        let handle = engine
            .start_workflow("doubler", "exec-1".into(), json!(21))
            .await
            .unwrap();
        assert_eq!(handle.wait().await, json!(42));
    }

    #[tokio::test]
    async fn unregistered_activity_surfaces_not_registered() {
        let engine = InMemoryEngine::new();
        engine.register_workflow(
            "broken",
            Arc::new(|ctx: Arc<dyn WorkflowContext>, input: Value| {
                Box::pin(async move {
                    match ctx.execute_activity("missing", input, opts()).await {
                        Err(ActivityError::NotRegistered(name)) => json!({"missing": name}),
                        _ => json!("unexpected"),
                    }
                })
            }),
        );
        let handle = engine
            .start_workflow("broken", "exec-2".into(), json!(null))
            .await
            .unwrap();
        assert_eq!(handle.wait().await, json!({"missing": "missing"}));
    }

    #[tokio::test]
    async fn signal_wakes_a_waiting_workflow() {
        let engine = InMemoryEngine::new();
        engine.register_workflow(
            "waits_for_resume",
            Arc::new(|ctx: Arc<dyn WorkflowContext>, _input: Value| {
                Box::pin(async move {
                    let (name, payload) = ctx.next_signal().await.unwrap();
                    json!({"signal": name, "payload": payload})
                })
            }),
        );
        let handle = engine
            .start_workflow("waits_for_resume", "exec-3".into(), json!(null))
            .await
            .unwrap();
        handle.signal("resume", json!({"messages": ["go"]})).await;
        assert_eq!(
            handle.wait().await,
            json!({"signal": "resume", "payload": {"messages": ["go"]}})
        );
    }

    #[tokio::test]
    async fn cancelled_activity_is_refused_before_dispatch() {
        let engine = InMemoryEngine::new();
        engine.register_activity(
            "noop",
            Arc::new(|_v: Value| Box::pin(async move { Ok(json!(null)) })),
        );
        engine.register_workflow(
            "cancel_then_call",
            Arc::new(|ctx: Arc<dyn WorkflowContext>, _input: Value| {
                Box::pin(async move {
                    // give the driver a moment to call handle.cancel()
                    tokio::task::yield_now().await;
                    match ctx.execute_activity("noop", json!(null), opts()).await {
                        Err(ActivityError::Cancelled) => json!("cancelled"),
                        other => json!(format!("{other:?}")),
                    }
                })
            }),
        );
        let handle = engine
            .start_workflow("cancel_then_call", "exec-4".into(), json!(null))
            .await
            .unwrap();
        handle.cancel();
        assert_eq!(handle.wait().await, json!("cancelled"));
    }
}
