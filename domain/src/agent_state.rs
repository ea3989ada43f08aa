//! `AgentState`: one row per agent in the engine-owned coordination table
//! (spec §3). This is a different concept from a single agent's own
//! plan/execution state — it is the shared view the engine keeps of every
//! participant, indexed by [`AgentId`].

use crate::ids::AgentId;
use crate::vote::Vote;
use serde::{Deserialize, Serialize};

/// Why an agent was marked `Killed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KillReason {
    BackendFailure,
    Timeout,
}

/// Lifecycle of one agent within an attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    Idle,
    Streaming,
    AnsweredWaiting,
    Voted,
    Killed(KillReason),
}

impl AgentStatus {
    pub fn is_killed(&self) -> bool {
        matches!(self, AgentStatus::Killed(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Voted | AgentStatus::Killed(_))
    }
}

/// One row of the coordination table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    pub id: AgentId,
    pub status: AgentStatus,
    pub answer: Option<String>,
    pub answer_version: u32,
    pub answer_count: u32,
    pub vote: Option<Vote>,
    pub tokens_used: u64,
}

impl AgentState {
    pub fn idle(id: AgentId) -> Self {
        Self {
            id,
            status: AgentStatus::Idle,
            answer: None,
            answer_version: 0,
            answer_count: 0,
            vote: None,
            tokens_used: 0,
        }
    }

    /// Invariant: `status=Killed ⇒ cannot be winner and cannot be voted for`.
    pub fn is_valid_vote_target(&self) -> bool {
        !self.status.is_killed() && self.answer.is_some()
    }

    /// Invariant: `answer_count ≤ max_new_answers_per_agent` when that bound
    /// is set.
    pub fn has_reached_answer_cap(&self, max_new_answers_per_agent: Option<u32>) -> bool {
        match max_new_answers_per_agent {
            Some(cap) => self.answer_count >= cap,
            None => false,
        }
    }

    /// Records an accepted `new_answer`: bumps version/count, moves to
    /// `AnsweredWaiting`. Called only after the novelty gate and answer-cap
    /// checks pass (§4.1 step 4).
    pub fn accept_answer(&mut self, content: String) {
        self.answer = Some(content);
        self.answer_version += 1;
        self.answer_count += 1;
        self.status = AgentStatus::AnsweredWaiting;
    }

    /// Records a vote and commits this agent's participation (§4.1 step 5).
    pub fn record_vote(&mut self, vote: Vote) {
        self.vote = Some(vote);
        self.status = AgentStatus::Voted;
    }

    /// Invalidation on a peer update (§4.1 step 4, §5 ordering guarantee):
    /// if this agent's vote targeted the updated agent, clear it and revert
    /// status to `AnsweredWaiting` (it has an answer of its own already) or
    /// `Streaming` (it is still running).
    pub fn invalidate_vote_if_targeting(&mut self, updated: &AgentId, still_streaming: bool) -> bool {
        let targets_updated = matches!(&self.vote, Some(v) if &v.target == updated);
        if targets_updated {
            self.vote = None;
            self.status = if still_streaming {
                AgentStatus::Streaming
            } else {
                AgentStatus::AnsweredWaiting
            };
        }
        targets_updated
    }

    pub fn kill(&mut self, reason: KillReason) {
        self.status = AgentStatus::Killed(reason);
    }

    /// Appends a planning-mode "planned action" notice to this agent's
    /// answer buffer (§4.1.c) — not a new committed answer, so
    /// `answer_version`/`answer_count`/`status` are untouched.
    pub fn append_planned_action(&mut self, notice: &str) {
        let buffer = self.answer.get_or_insert_with(String::new);
        if !buffer.is_empty() {
            buffer.push('\n');
        }
        buffer.push_str(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn killed_agent_is_never_a_valid_vote_target() {
        let mut state = AgentState::idle(AgentId::new("a1"));
        state.accept_answer("hello".into());
        assert!(state.is_valid_vote_target());
        state.kill(KillReason::Timeout);
        assert!(!state.is_valid_vote_target());
    }

    #[test]
    fn accept_answer_bumps_version_and_count() {
        let mut state = AgentState::idle(AgentId::new("a1"));
        state.accept_answer("v1".into());
        assert_eq!(state.answer_version, 1);
        assert_eq!(state.answer_count, 1);
        state.accept_answer("v2".into());
        assert_eq!(state.answer_version, 2);
        assert_eq!(state.answer_count, 2);
        assert_eq!(state.status, AgentStatus::AnsweredWaiting);
    }

    #[test]
    fn answer_cap_is_enforced_only_when_set() {
        let mut state = AgentState::idle(AgentId::new("a1"));
        state.accept_answer("v1".into());
        assert!(!state.has_reached_answer_cap(None));
        assert!(state.has_reached_answer_cap(Some(1)));
        assert!(!state.has_reached_answer_cap(Some(2)));
    }

    #[test]
    fn vote_invalidation_clears_vote_and_reverts_status() {
        let mut voter = AgentState::idle(AgentId::new("a2"));
        voter.accept_answer("own answer".into());
        voter.record_vote(Vote::new(AgentId::new("a2"), AgentId::new("a1"), "ok"));
        assert_eq!(voter.status, AgentStatus::Voted);

        let invalidated = voter.invalidate_vote_if_targeting(&AgentId::new("a1"), false);
        assert!(invalidated);
        assert!(voter.vote.is_none());
        assert_eq!(voter.status, AgentStatus::AnsweredWaiting);
    }

    #[test]
    fn vote_invalidation_is_noop_for_unrelated_target() {
        let mut voter = AgentState::idle(AgentId::new("a2"));
        voter.record_vote(Vote::new(AgentId::new("a2"), AgentId::new("a1"), "ok"));
        let invalidated = voter.invalidate_vote_if_targeting(&AgentId::new("a3"), false);
        assert!(!invalidated);
        assert!(voter.vote.is_some());
    }

    #[test]
    fn planned_action_appends_without_bumping_version() {
        let mut state = AgentState::idle(AgentId::new("a1"));
        state.accept_answer("v1".into());
        state.append_planned_action("planned: write to out.txt");
        assert_eq!(state.answer.as_deref(), Some("v1\nplanned: write to out.txt"));
        assert_eq!(state.answer_version, 1);
        assert_eq!(state.answer_count, 1);
    }

    #[test]
    fn planned_action_before_any_answer_creates_the_buffer() {
        let mut state = AgentState::idle(AgentId::new("a1"));
        state.append_planned_action("planned: write to out.txt");
        assert_eq!(state.answer.as_deref(), Some("planned: write to out.txt"));
        assert_eq!(state.answer_version, 0);
    }
}
