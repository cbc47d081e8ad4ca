//! Provider-agnostic conversation types.
//!
//! Every model adapter converts provider wire formats to/from `Message`.
//! `Part` is the discriminated union the ledger projects into ("text",
//! "tool_use", "tool_result", "thinking" — spec §3 "Transcript / ledger").

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Part {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "thinking")]
    Thinking { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl Part {
    pub fn text(t: impl Into<String>) -> Self {
        Self::Text { text: t.into() }
    }

    pub fn is_tool_use(&self) -> bool {
        matches!(self, Part::ToolUse { .. })
    }

    pub fn is_tool_result(&self) -> bool {
        matches!(self, Part::ToolResult { .. })
    }

    pub fn tool_use_id(&self) -> Option<&str> {
        match self {
            Part::ToolUse { id, .. } => Some(id),
            Part::ToolResult { tool_use_id, .. } => Some(tool_use_id),
            _ => None,
        }
    }
}

/// A single provider-agnostic conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            parts: vec![Part::text(text)],
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            parts: vec![Part::text(text)],
        }
    }

    pub fn assistant(parts: Vec<Part>) -> Self {
        Self {
            role: Role::Assistant,
            parts,
        }
    }

    /// Build the single user message that carries every tool result for a
    /// turn, in the same order as the preceding assistant `tool_use` parts
    /// (spec §3 invariant 4, §4.6 rule 2).
    pub fn tool_results(results: Vec<Part>) -> Self {
        debug_assert!(results.iter().all(Part::is_tool_result));
        Self {
            role: Role::Tool,
            parts: results,
        }
    }

    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn tool_use_ids(&self) -> Vec<&str> {
        self.parts.iter().filter_map(Part::tool_use_id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_results_message_preserves_order() {
        let msg = Message::tool_results(vec![
            Part::ToolResult {
                tool_use_id: "c1".into(),
                content: "a".into(),
                is_error: false,
            },
            Part::ToolResult {
                tool_use_id: "c2".into(),
                content: "b".into(),
                is_error: false,
            },
        ]);
        assert_eq!(msg.tool_use_ids(), vec!["c1", "c2"]);
    }
}
