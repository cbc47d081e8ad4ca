//! `ToolSpec` — the immutable per-tool record (spec §3 "ToolSpec"), plus
//! the JSON codec and retry-hint construction that sit alongside it.

use std::collections::HashMap;

use serde_json::Value;

use art_domain::error::{RetryHint, ToolError, ToolErrorKind};

use crate::schema::{validate, ValidationError};

/// A JSON-typed payload or result shape.
#[derive(Debug, Clone)]
pub struct TypeSpec {
    pub name: String,
    pub schema: Value,
    pub example_json: Option<Value>,
    pub example_input: Option<Value>,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
            example_json: None,
            example_input: None,
        }
    }

    pub fn with_example(mut self, example: Value) -> Self {
        self.example_json = Some(example.clone());
        self.example_input = Some(example);
        self
    }

    /// Decode-and-validate: `art_domain::error::ToolError` on failure,
    /// suitable for handing straight back to the planner as a tool result
    /// (spec §8 property 5, §7 `DecodeError`/`ValidationError`).
    pub fn decode(&self, value: &Value) -> Result<Value, ToolError> {
        let errors: Vec<ValidationError> = validate(&self.schema, value);
        if errors.is_empty() {
            return Ok(value.clone());
        }
        let message = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        let mut hint = RetryHint::new(ToolErrorKind::ValidationError, message.clone());
        if let Some(example) = &self.example_input {
            hint = hint.with_example(example.clone());
        }
        Err(ToolError::new(ToolErrorKind::ValidationError, message).with_hint(hint))
    }

    pub fn encode(&self, value: &Value) -> Value {
        value.clone()
    }
}

/// Paging metadata advertised by a tool (optional).
#[derive(Debug, Clone)]
pub struct PagingSpec {
    pub cursor_param: String,
    pub default_page_size: u32,
}

/// A confirmation requirement before a tool call may execute.
#[derive(Debug, Clone)]
pub struct ConfirmationSpec {
    pub prompt: String,
}

/// Immutable per-tool record (spec §3).
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub service: String,
    pub toolset: String,
    pub description: String,
    pub tags: Vec<String>,
    pub meta: HashMap<String, Value>,
    /// When `true`, a successful call ends the run immediately without a
    /// further planner turn (spec §4.2).
    pub terminal_run: bool,
    /// When `true`, this tool's `Execute` invokes a nested agent inline
    /// rather than scheduling an activity (spec §4.4, §4.5).
    pub is_agent_tool: bool,
    pub agent_id: Option<String>,
    /// When `true`, decoded results are expected to carry truncation
    /// metadata (spec §4.2 "BoundedResult tools").
    pub bounded_result: bool,
    pub paging: Option<PagingSpec>,
    pub server_data: Vec<Value>,
    /// When set, wraps into a `<system-reminder>` block after dispatch
    /// (spec §4.2 step 3f).
    pub result_reminder: Option<String>,
    pub confirmation: Option<ConfirmationSpec>,
    pub payload: TypeSpec,
    pub result: TypeSpec,
}

impl ToolSpec {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.toolset, self.name)
    }
}

/// Truncation metadata a tool result envelope carries for bounded-result
/// tools (spec §3 "Bounded result", §4.2).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BoundedResultMeta {
    pub returned: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    pub truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refinement_hint: Option<String>,
}

/// Extract bounded-result metadata from a decoded JSON result, if present
/// under the conventional `returned`/`total`/`truncated`/`refinement_hint`
/// keys. Tools that don't implement the bounded-result contract simply
/// produce `None` here.
pub fn extract_bounded_result(value: &Value) -> Option<BoundedResultMeta> {
    let obj = value.as_object()?;
    let returned = obj.get("returned")?.as_u64()?;
    let truncated = obj.get("truncated").and_then(Value::as_bool).unwrap_or(false);
    let total = obj.get("total").and_then(Value::as_u64);
    let refinement_hint = obj
        .get("refinement_hint")
        .and_then(Value::as_str)
        .map(String::from);
    Some(BoundedResultMeta {
        returned,
        total,
        truncated,
        refinement_hint,
    })
}
