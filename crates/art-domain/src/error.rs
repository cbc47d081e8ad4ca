//! Error taxonomy shared across the runtime (spec §7).
//!
//! Three tiers, deliberately kept distinct so callers can apply the right
//! propagation policy: registration/dispatch errors surface synchronously
//! from orchestrator calls, tool-level errors are recovered and carried
//! inside a `ToolResult`, planner/transcript errors are fatal for the run.

use serde::{Deserialize, Serialize};

/// Registration errors, surfaced synchronously from `RegisterAgent` /
/// `RegisterToolset` / `RegisterModel`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("unknown target: {0}")]
    UnknownTarget(String),
}

/// Dispatch errors, surfaced from `StartRun` / `PauseRun` / `ResumeRun`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("agent not registered: {0}")]
    NotRegistered(String),
    #[error("run not found: {0}")]
    NotFound(String),
    #[error("workflow engine failed to start: {0}")]
    EngineStart(String),
}

/// Tool-level error kind (spec §7). Carried inside `ToolResult.error`,
/// never propagated to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    DecodeError,
    ValidationError,
    ExecutionError,
    Timeout,
    CapExceeded,
    PolicyDenied,
    ToolUnknown,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DecodeError => "decode_error",
            Self::ValidationError => "validation_error",
            Self::ExecutionError => "execution_error",
            Self::Timeout => "timeout",
            Self::CapExceeded => "cap_exceeded",
            Self::PolicyDenied => "policy_denied",
            Self::ToolUnknown => "tool_unknown",
        };
        write!(f, "{s}")
    }
}

/// Structured retry guidance attached to a failed tool result so the
/// planner can self-correct (spec §4.4, §7).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryHint {
    pub kind: ToolErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<serde_json::Value>,
}

impl RetryHint {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            example: None,
        }
    }

    pub fn with_example(mut self, example: serde_json::Value) -> Self {
        self.example = Some(example);
        self
    }
}

/// Tool-level error, carried inside a `ToolResult`. Never thrown — the
/// policy engine and dispatcher construct these and hand them back to the
/// planner as ordinary tool output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_hint: Option<RetryHint>,
    /// Whether retrying the same tool call (possibly with different
    /// arguments) might succeed.
    pub retryable: bool,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        let retryable = !matches!(kind, ToolErrorKind::PolicyDenied | ToolErrorKind::CapExceeded);
        Self {
            kind,
            message: message.into(),
            retry_hint: None,
            retryable,
        }
    }

    pub fn with_hint(mut self, hint: RetryHint) -> Self {
        self.retry_hint = Some(hint);
        self
    }
}

/// Planner-level errors (spec §7): propagate out of the planner activity,
/// trigger its retry policy, and fail the run if all attempts are
/// exhausted.
///
/// Serializable because it crosses the workflow-activity boundary as part
/// of `PlanResult` (spec §4.2 step 2, §9 "Planner and tool decoding
/// happen inside activities").
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlannerError {
    #[error("provider failure: {0}")]
    ProviderFailure(String),
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Transcript errors (spec §7): fatal for the run.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
    #[error("dangling tool_use: {0}")]
    DanglingToolUse(String),
}

/// Top-level error wrapping every tier, used by callers that need a single
/// return type (e.g. the orchestrator's public surface).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Planner(#[from] PlannerError),
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
