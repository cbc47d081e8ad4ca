//! A [`Client`] backed by a fixed script of responses, for tests that
//! exercise a model adapter directly rather than going through a
//! [`crate::scripted_planner::ScriptedPlanner`] (spec §6 "Model client").

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use art_model::client::{BoxStream, Result as ModelResult};
use art_model::{Chunk, Client, Request, Response};

pub struct ScriptedClient {
    id: String,
    script: Mutex<VecDeque<Response>>,
}

impl ScriptedClient {
    pub fn new(id: impl Into<String>, script: Vec<Response>) -> Self {
        Self {
            id: id.into(),
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl Client for ScriptedClient {
    async fn complete(&self, _req: Request) -> ModelResult<Response> {
        self.script
            .lock()
            .pop_front()
            .ok_or_else(|| art_model::ModelError::Provider {
                provider: self.id.clone(),
                message: "scripted client's script ran out of responses".into(),
            })
    }

    async fn stream(&self, req: Request) -> ModelResult<BoxStream<'static, ModelResult<Chunk>>> {
        let response = self.complete(req).await?;
        let chunks: Vec<ModelResult<Chunk>> = response
            .parts
            .iter()
            .map(|p| {
                Ok(match p {
                    art_model::Part::Text { text } => Chunk::Text(text.clone()),
                    art_model::Part::Thinking { text } => Chunk::Thinking(text.clone()),
                    art_model::Part::ToolUse { id, name, input } => Chunk::ToolCall {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    },
                    art_model::Part::ToolResult { content, .. } => Chunk::Text(content.clone()),
                })
            })
            .chain(std::iter::once(Ok(Chunk::Usage(response.usage.clone()))))
            .collect();
        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }

    fn client_id(&self) -> &str {
        &self.id
    }
}
