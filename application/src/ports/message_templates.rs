//! `MessageTemplates` (§2 item 8, §9): a pure function from (task, peer
//! answers, vote state, phase) to the next prompt for a given agent. No
//! donor port does this — the donor composes prompt strings inline — so
//! this trait is new, but its implementations follow the donor's
//! plain-string-composition texture rather than pulling in a templating
//! engine.

use massgen_domain::{AgentId, Task, VotingSensitivity};

/// Whether tool calls are currently restricted to `new_answer`/`vote`/
/// read-only tools (§4.1.c).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Planning,
    Unrestricted,
}

/// One peer's answer as visible to the agent being prompted. Both active
/// and killed peers are visible (§4.1 step 2); only active peers are valid
/// vote targets, which `is_killed` lets the template communicate.
#[derive(Debug, Clone)]
pub struct PeerAnswer {
    pub agent_id: AgentId,
    pub answer: String,
    pub is_killed: bool,
}

/// A tally entry for the final presentation prompt.
#[derive(Debug, Clone)]
pub struct VoteTally {
    pub target: AgentId,
    pub votes: u32,
}

pub trait MessageTemplates: Send + Sync {
    fn initial_prompt(&self, task: &Task, agent_id: &AgentId, phase: TurnPhase) -> String;

    fn reprompt_with_peers(
        &self,
        task: &Task,
        agent_id: &AgentId,
        peers: &[PeerAnswer],
        voting_sensitivity: VotingSensitivity,
        phase: TurnPhase,
    ) -> String;

    fn novelty_rejection_feedback(&self, jaccard: f64, threshold: f64) -> String;

    fn answer_cap_reached_feedback(&self) -> String;

    fn vote_invalidated_feedback(&self, target: &AgentId) -> String;

    fn invalid_vote_target_feedback(&self, target: &AgentId, reason: &str) -> String;

    fn planned_action_notice(&self, tool_name: &str, arguments_json: &str) -> String;

    fn final_presentation_prompt(
        &self,
        task: &Task,
        winner_id: &AgentId,
        peers: &[PeerAnswer],
        tally: &[VoteTally],
    ) -> String;

    fn restart_self_eval_prompt(&self, final_answer: &str) -> String;
}

/// Plain-text implementation. Deliberately terse — prompt wording itself is
/// out of scope (§1); this exists so the engine is runnable end to end.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextTemplates;

impl MessageTemplates for PlainTextTemplates {
    fn initial_prompt(&self, task: &Task, agent_id: &AgentId, phase: TurnPhase) -> String {
        let mut prompt = format!("Task for agent {agent_id}:\n{}\n", task.prompt);
        if phase == TurnPhase::Planning {
            prompt.push_str("\nYou are in planning mode: side-effectful tool calls will be recorded as planned actions, not executed.\n");
        }
        prompt.push_str("\nUse `new_answer` to propose a candidate answer, and `vote` once you are satisfied with the best answer among the team.");
        prompt
    }

    fn reprompt_with_peers(
        &self,
        task: &Task,
        agent_id: &AgentId,
        peers: &[PeerAnswer],
        voting_sensitivity: VotingSensitivity,
        phase: TurnPhase,
    ) -> String {
        let mut prompt = format!("Task for agent {agent_id}:\n{}\n\nPeer answers so far:\n", task.prompt);
        for peer in peers {
            let marker = if peer.is_killed { " (killed, not a valid vote target)" } else { "" };
            prompt.push_str(&format!("- {}{}: {}\n", peer.agent_id, marker, peer.answer));
        }
        prompt.push_str(&format!(
            "\nYour voting bar is '{voting_sensitivity}': only vote once you are confident a peer's answer meets that bar, or submit your own with `new_answer`."
        ));
        if phase == TurnPhase::Planning {
            prompt.push_str("\nYou are still in planning mode.");
        }
        prompt
    }

    fn novelty_rejection_feedback(&self, jaccard: f64, threshold: f64) -> String {
        format!(
            "Your new_answer was rejected: it overlaps {jaccard:.0}% with your previous answer, above the {threshold:.0}% novelty threshold. Please submit a substantively different answer."
        )
    }

    fn answer_cap_reached_feedback(&self) -> String {
        "You have reached your answer cap for this attempt; please vote instead of submitting another answer.".to_string()
    }

    fn vote_invalidated_feedback(&self, target: &AgentId) -> String {
        format!("Agent {target} updated its answer, which invalidates your previous vote for it. Please review the new answer and vote again.")
    }

    fn invalid_vote_target_feedback(&self, target: &AgentId, reason: &str) -> String {
        format!("Your vote for {target} was rejected: {reason}.")
    }

    fn planned_action_notice(&self, tool_name: &str, arguments_json: &str) -> String {
        format!("[planned action, not executed: {tool_name}({arguments_json})]")
    }

    fn final_presentation_prompt(
        &self,
        task: &Task,
        winner_id: &AgentId,
        peers: &[PeerAnswer],
        tally: &[VoteTally],
    ) -> String {
        let mut prompt = format!(
            "You ({winner_id}) were selected as the winner for:\n{}\n\nFinal vote tally:\n",
            task.prompt
        );
        for entry in tally {
            prompt.push_str(&format!("- {}: {} vote(s)\n", entry.target, entry.votes));
        }
        prompt.push_str("\nAll peer answers (including killed agents):\n");
        for peer in peers {
            prompt.push_str(&format!("- {}: {}\n", peer.agent_id, peer.answer));
        }
        prompt.push_str("\nProduce your final, complete answer now. If filesystem writes were planned earlier, execute them now.");
        prompt
    }

    fn restart_self_eval_prompt(&self, final_answer: &str) -> String {
        format!(
            "Your final answer was:\n{final_answer}\n\nReview it against the original task. Call `submit` if it fully satisfies the task, or `restart(reason)` with a concrete improvement instruction."
        )
    }
}
