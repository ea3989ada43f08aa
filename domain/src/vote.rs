//! Votes, the vote ledger, and winner selection (§4.1 step 7).
//!
//! Adapted from the donor's `domain/src/quorum/{vote.rs,consensus.rs}` tally
//! pattern, but plurality-with-tie-break rather than threshold quorum: the
//! donor's `QuorumRule` (majority/unanimous/at-least/percentage) has no
//! counterpart here and was dropped (see DESIGN.md).

use crate::agent_state::AgentState;
use crate::ids::AgentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One agent's completed vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: AgentId,
    pub target: AgentId,
    pub reason: String,
}

impl Vote {
    pub fn new(voter: AgentId, target: AgentId, reason: impl Into<String>) -> Self {
        Self {
            voter,
            target,
            reason: reason.into(),
        }
    }
}

/// `voter -> target`, derived from each `AgentState.vote`. Monotone within a
/// round: votes are recorded, never retracted by the voter — they are only
/// invalidated by the *target* posting a new answer (§4.1 step 4).
#[derive(Debug, Clone, Default)]
pub struct VoteLedger {
    votes: HashMap<AgentId, AgentId>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild(states: &HashMap<AgentId, AgentState>) -> Self {
        let votes = states
            .values()
            .filter_map(|s| s.vote.as_ref().map(|v| (s.id.clone(), v.target.clone())))
            .collect();
        Self { votes }
    }

    pub fn target_of(&self, voter: &AgentId) -> Option<&AgentId> {
        self.votes.get(voter)
    }

    pub fn tally(&self) -> HashMap<AgentId, u32> {
        let mut counts: HashMap<AgentId, u32> = HashMap::new();
        for target in self.votes.values() {
            *counts.entry(target.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Validates a proposed vote against §4.1 step 5: the target must be an
/// active agent with a non-empty answer, and must not be the voter itself
/// (Open Question #1 — self-voting is forbidden).
pub fn validate_vote_target(
    voter: &AgentId,
    target: &AgentId,
    states: &HashMap<AgentId, AgentState>,
) -> Result<(), String> {
    if voter == target {
        return Err("agents may not vote for themselves".to_string());
    }
    match states.get(target) {
        Some(state) if state.is_valid_vote_target() => Ok(()),
        Some(_) => Err(format!("'{target}' is killed or has no answer yet")),
        None => Err(format!("unknown agent '{target}'")),
    }
}

/// Winner selection (§4.1 step 7): plurality over the vote ledger restricted
/// to active targets, ties broken by (a) highest `answer_version`, (b)
/// earliest first-published time represented here by lower `answer_version`
/// having been reached first — since version is monotonic per agent we use
/// the version itself as the recency signal and fall through to (c) stable
/// declaration order. No randomness is ever consulted.
pub fn select_winner(
    ledger: &VoteLedger,
    states: &HashMap<AgentId, AgentState>,
    declaration_order: &[AgentId],
) -> Option<AgentId> {
    let tally = ledger.tally();
    if tally.is_empty() {
        return None;
    }

    let max_votes = *tally.values().max().unwrap();
    let mut candidates: Vec<&AgentId> = tally
        .iter()
        .filter(|(_, &count)| count == max_votes)
        .map(|(id, _)| id)
        .collect();

    if candidates.len() == 1 {
        return candidates.pop().cloned();
    }

    // (a) highest answer_version.
    let max_version = candidates
        .iter()
        .filter_map(|id| states.get(*id).map(|s| s.answer_version))
        .max()
        .unwrap_or(0);
    candidates.retain(|id| states.get(*id).map(|s| s.answer_version) == Some(max_version));

    if candidates.len() == 1 {
        return candidates.pop().cloned();
    }

    // (c) stable agent-declaration order — the tie of last resort, never
    // broken by randomness.
    declaration_order
        .iter()
        .find(|id| candidates.contains(id))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_state::AgentState;

    fn states_with_answers(ids: &[&str]) -> HashMap<AgentId, AgentState> {
        ids.iter()
            .map(|id| {
                let mut state = AgentState::idle(AgentId::new(*id));
                state.accept_answer(format!("answer from {id}"));
                (state.id.clone(), state)
            })
            .collect()
    }

    #[test]
    fn self_vote_is_rejected() {
        let states = states_with_answers(&["a1", "a2"]);
        let a1 = AgentId::new("a1");
        assert!(validate_vote_target(&a1, &a1, &states).is_err());
    }

    #[test]
    fn vote_for_killed_agent_is_rejected() {
        let mut states = states_with_answers(&["a1", "a2"]);
        states.get_mut(&AgentId::new("a2")).unwrap().kill(crate::agent_state::KillReason::Timeout);
        let result = validate_vote_target(&AgentId::new("a1"), &AgentId::new("a2"), &states);
        assert!(result.is_err());
    }

    #[test]
    fn plurality_winner_is_selected() {
        let states = states_with_answers(&["a1", "a2"]);
        let mut ledger = VoteLedger::new();
        ledger.votes.insert(AgentId::new("a1"), AgentId::new("a2"));
        ledger.votes.insert(AgentId::new("a2"), AgentId::new("a2"));
        let order = vec![AgentId::new("a1"), AgentId::new("a2")];
        assert_eq!(select_winner(&ledger, &states, &order), Some(AgentId::new("a2")));
    }

    #[test]
    fn tie_is_broken_by_declaration_order() {
        let states = states_with_answers(&["a1", "a2"]);
        let mut ledger = VoteLedger::new();
        ledger.votes.insert(AgentId::new("a1"), AgentId::new("a2"));
        ledger.votes.insert(AgentId::new("a2"), AgentId::new("a1"));
        let order = vec![AgentId::new("a1"), AgentId::new("a2")];
        assert_eq!(select_winner(&ledger, &states, &order), Some(AgentId::new("a1")));
    }

    #[test]
    fn tie_is_broken_by_higher_answer_version_before_declaration_order() {
        let mut states = states_with_answers(&["a1", "a2"]);
        states.get_mut(&AgentId::new("a2")).unwrap().accept_answer("v2".into());
        let mut ledger = VoteLedger::new();
        ledger.votes.insert(AgentId::new("a1"), AgentId::new("a2"));
        ledger.votes.insert(AgentId::new("a2"), AgentId::new("a1"));
        let order = vec![AgentId::new("a1"), AgentId::new("a2")];
        // a2 now has answer_version=2, a1 has answer_version=1 → a2 wins despite
        // coming second in declaration order.
        assert_eq!(select_winner(&ledger, &states, &order), Some(AgentId::new("a2")));
    }
}
