//! `OrchestrationAttempt` (§3): one Setup→Running→Deciding→Presenting cycle.
//! The engine may produce up to `max_orchestration_restarts + 1` attempts.

use crate::ids::AgentId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    Done,
    Restart { reason: String },
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationAttempt {
    pub attempt_number: u32,
    pub outcome: Option<AttemptOutcome>,
    pub winner: Option<AgentId>,
    pub final_answer: Option<String>,
}

impl OrchestrationAttempt {
    pub fn new(attempt_number: u32) -> Self {
        Self {
            attempt_number,
            outcome: None,
            winner: None,
            final_answer: None,
        }
    }

    pub fn complete(&mut self, winner: AgentId, final_answer: String, outcome: AttemptOutcome) {
        self.winner = Some(winner);
        self.final_answer = Some(final_answer);
        self.outcome = Some(outcome);
    }

    pub fn fail(&mut self, final_answer: Option<String>) {
        self.final_answer = final_answer;
        self.outcome = Some(AttemptOutcome::Failed);
    }

    /// Enforces the attempt cap strictly (§4.1 step 9): `attempt_number` is
    /// 1-indexed, so attempts 1..=max_orchestration_restarts+1 are legal.
    pub fn may_restart(attempt_number: u32, max_orchestration_restarts: u32) -> bool {
        attempt_number <= max_orchestration_restarts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attempt_cap_is_enforced_strictly() {
        assert!(OrchestrationAttempt::may_restart(1, 1));
        assert!(!OrchestrationAttempt::may_restart(2, 1));
        assert!(!OrchestrationAttempt::may_restart(1, 0));
    }
}
