//! A planner driven by a fixed script of [`PlanResult`]s, one per call to
//! `plan_start`/`plan_resume` in order — the test-harness analogue of a
//! real model-backed planner (spec §6 "Planner").

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use art_planner::{PlanInput, PlanResult, Planner};

pub struct ScriptedPlanner {
    script: Mutex<VecDeque<PlanResult>>,
    calls: Mutex<Vec<PlanInput>>,
}

impl ScriptedPlanner {
    pub fn new(script: Vec<PlanResult>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every `PlanInput` this planner has been called with, in order —
    /// lets a scenario test assert on what the loop fed back after a tool
    /// dispatch (e.g. S4's corrected retry arguments).
    pub fn calls(&self) -> Vec<PlanInput> {
        self.calls.lock().clone()
    }

    fn next(&self, input: PlanInput) -> PlanResult {
        self.calls.lock().push(input);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| PlanResult::Fail(art_domain::PlannerError::InvariantViolation(
                "scripted planner's script ran out of steps".into(),
            )))
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan_start(&self, input: PlanInput) -> PlanResult {
        self.next(input)
    }

    async fn plan_resume(&self, input: PlanInput) -> PlanResult {
        self.next(input)
    }
}
