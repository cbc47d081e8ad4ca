//! Per-call state machine (spec §4.4): `issued -> dispatch -> running ->
//! {completed, failed, cancelled}`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolCallPhase {
    Issued,
    Dispatch,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ToolCallPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// `true` if `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: Self) -> bool {
        use ToolCallPhase::*;
        matches!(
            (self, next),
            (Issued, Dispatch)
                | (Dispatch, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Issued, Cancelled)
                | (Dispatch, Cancelled)
                | (Running, Cancelled)
        )
    }
}

/// Tracks one call's phase, rejecting illegal transitions rather than
/// silently clamping them.
#[derive(Debug, Clone)]
pub struct ToolCallStateMachine {
    phase: ToolCallPhase,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("illegal tool call transition {from:?} -> {to:?}")]
pub struct IllegalTransition {
    pub from: ToolCallPhase,
    pub to: ToolCallPhase,
}

impl ToolCallStateMachine {
    pub fn new() -> Self {
        Self {
            phase: ToolCallPhase::Issued,
        }
    }

    pub fn phase(&self) -> ToolCallPhase {
        self.phase
    }

    pub fn advance(&mut self, next: ToolCallPhase) -> Result<(), IllegalTransition> {
        if !self.phase.can_advance_to(next) {
            return Err(IllegalTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }
}

impl Default for ToolCallStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
