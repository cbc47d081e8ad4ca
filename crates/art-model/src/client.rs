//! The model contract: a provider-agnostic `Complete`/`Stream` surface
//! (spec §6 "Model client").
//!
//! The core never implements a provider — it only calls through this
//! trait, which a thin adapter backs with whatever HTTP/SDK client the
//! embedding application already uses.

use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::message::{Message, Part};

pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },
    #[error("timeout after {0}ms")]
    Timeout(u64),
}

pub type Result<T> = std::result::Result<T, ModelError>;

/// Tool definition offered to the model for this request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Where to insert a prompt-cache checkpoint (spec §4.6 rule 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheCheckpoint {
    AfterSystem,
    AfterTools,
}

/// Cache hints attached to a request. Advisory only — their absence must
/// never invalidate the transcript (spec §9).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CachePolicy {
    pub checkpoints: Vec<CacheCheckpoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

/// A provider-agnostic chat completion request.
#[derive(Debug, Clone)]
pub struct Request {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub model: Option<String>,
    pub cache_policy: CachePolicy,
}

/// A provider-agnostic chat completion response.
#[derive(Debug, Clone)]
pub struct Response {
    pub parts: Vec<Part>,
    pub usage: Usage,
    pub model: String,
    pub finish_reason: Option<String>,
}

impl Response {
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn tool_uses(&self) -> Vec<&Part> {
        self.parts.iter().filter(|p| p.is_tool_use()).collect()
    }
}

/// Discriminated streaming chunk.
#[derive(Debug, Clone)]
pub enum Chunk {
    Text(String),
    Thinking(String),
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolCallDelta {
        id: String,
        delta: String,
    },
    Usage(Usage),
}

/// Trait every model adapter implements. Object-safe so the orchestrator
/// can hold a registry of `Arc<dyn Client>` keyed by model id.
#[async_trait]
pub trait Client: Send + Sync {
    async fn complete(&self, req: Request) -> Result<Response>;
    async fn stream(&self, req: Request) -> Result<BoxStream<'static, Result<Chunk>>>;

    /// A unique identifier for this client instance (spec §6).
    fn client_id(&self) -> &str;
}
