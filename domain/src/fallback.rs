//! Deterministic fallback synthesizer (§7, branch 2): used when the only
//! answers available at a global timeout came from killed agents. Pure
//! function of the `(agent_id, answer)` set so the idempotence property in
//! §8 ("re-applying the synthesizer to the same set yields identical
//! output") holds regardless of call order.

use crate::ids::AgentId;

const MARKER: &str = "[orchestrator-generated fallback summary]";
const ANSWER_PREFIX_LIMIT: usize = 280;

fn truncate(answer: &str) -> String {
    if answer.chars().count() <= ANSWER_PREFIX_LIMIT {
        answer.to_string()
    } else {
        let prefix: String = answer.chars().take(ANSWER_PREFIX_LIMIT).collect();
        format!("{prefix}...")
    }
}

/// Builds the fallback presentation. Sorts by `AgentId` so the same input
/// set always produces the same output string regardless of iteration
/// order upstream.
pub fn synthesize_fallback(answers: &[(AgentId, String)]) -> String {
    let mut sorted: Vec<&(AgentId, String)> = answers.iter().collect();
    sorted.sort_by(|a, b| a.0.as_str().cmp(b.0.as_str()));

    let mut out = String::new();
    out.push_str(MARKER);
    out.push_str("\nNo agent reached a vote before the coordination timeout. The following answers were collected:\n\n");
    for (agent_id, answer) in sorted {
        out.push_str(&format!("- {agent_id}: {}\n", truncate(answer)));
    }
    out
}

/// The literal message for branch 3: no answers at all.
pub fn no_answers_message() -> String {
    "No answers were produced by any agent before the coordination timeout.".to_string()
}
