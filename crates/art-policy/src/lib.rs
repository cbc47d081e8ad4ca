//! Policy engine (spec §4.3): caps, timeouts, and tool allow/deny
//! filtering applied to planner output before dispatch.

pub mod engine;
pub mod state;

pub use engine::{apply_policy, PolicyDecision};
pub use state::{resolve_timeout, CapsState, TurnOverrides};
