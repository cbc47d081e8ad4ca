//! Tool execution substrate (spec §4.4): dispatch modes, the per-call
//! state machine, and child tracking for nested agent-as-tool calls.

pub mod child_tracker;
pub mod dispatcher;
pub mod state_machine;

pub use child_tracker::ChildTracker;
pub use dispatcher::{
    mode_for, CustomTool, DispatchOutcome, Dispatcher, ExecutionMode, InlineAgentOutcome,
    InlineAgentRunner, ToolUnavailable,
};
pub use state_machine::{IllegalTransition, ToolCallPhase, ToolCallStateMachine};
