//! Run records (spec §3 "Run record").
//!
//! Only the orchestrator mutates `status`; any store is write-through —
//! see `art-runtime::orchestrator`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, RunId, SessionId, TurnId};

/// Run status. Transitions: `pending -> running -> (completed | failed |
/// canceled)`; `running <-> paused`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Canceled,
    Paused,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    /// Whether `self -> next` is a legal transition per spec §3.
    pub fn can_transition_to(self, next: RunStatus) -> bool {
        use RunStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Canceled)
                | (Running, Paused)
                | (Paused, Running)
                | (Paused, Canceled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub agent_id: AgentId,
    pub run_id: RunId,
    pub session_id: Option<SessionId>,
    pub turn_id: Option<TurnId>,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Caller metadata (e.g. tenant, user-facing labels).
    #[serde(default)]
    pub labels: HashMap<String, String>,
    /// Implementation-specific metadata (e.g. an error code).
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RunRecord {
    pub fn new(agent_id: AgentId, session_id: Option<SessionId>, turn_id: Option<TurnId>) -> Self {
        let now = Utc::now();
        Self {
            agent_id,
            run_id: RunId::new(),
            session_id,
            turn_id,
            status: RunStatus::Pending,
            started_at: now,
            updated_at: now,
            labels: HashMap::new(),
            metadata: HashMap::new(),
        }
    }

    /// Attempt a status transition, returning `false` (and leaving the
    /// record untouched) if the transition is illegal.
    pub fn transition(&mut self, next: RunStatus, now: DateTime<Utc>) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        self.updated_at = now;
        true
    }
}
