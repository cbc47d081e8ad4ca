//! Shared identifiers, run records, and error taxonomy for the agent
//! execution runtime. Every other crate in the workspace depends on this
//! one; it depends on nothing but serde/chrono/uuid/thiserror.

pub mod config;
pub mod error;
pub mod ids;
pub mod run;

pub use config::{ActivityRetryConfig, PolicyDefaults, RuntimeConfig};
pub use error::{
    DispatchError, PlannerError, RegistrationError, Result, RetryHint, RuntimeError, ToolError,
    ToolErrorKind, TranscriptError,
};
pub use ids::{AgentId, RunId, SessionId, ToolCallId, ToolId, TurnId};
pub use run::{RunRecord, RunStatus};
