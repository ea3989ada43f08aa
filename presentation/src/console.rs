//! Final-result formatting, adapted from `presentation/src/output/console.rs`'s
//! `ConsoleFormatter` — section headers + colored model/content blocks —
//! generalized from the donor's fixed three-phase `QuorumResult` to one
//! winner + final answer + outcome.

use colored::Colorize;
use massgen_domain::{AttemptOutcome, OrchestrationAttempt};

pub struct ConsoleFormatter;

impl ConsoleFormatter {
    pub fn format(attempt: &OrchestrationAttempt) -> String {
        let mut output = String::new();
        output.push_str(&Self::header(&format!("MassGen coordination — attempt {}", attempt.attempt_number)));

        match &attempt.outcome {
            Some(AttemptOutcome::Done) => {
                if let Some(winner) = &attempt.winner {
                    output.push_str(&format!("{} {}\n\n", "Winner:".cyan().bold(), winner));
                }
                output.push_str(&format!("{}\n", "Final answer:".green().bold()));
                output.push_str(attempt.final_answer.as_deref().unwrap_or(""));
                output.push('\n');
            }
            Some(AttemptOutcome::Restart { reason }) => {
                output.push_str(&format!("{} {}\n", "Restart requested:".yellow().bold(), reason));
            }
            Some(AttemptOutcome::Failed) => {
                output.push_str(&format!("{}\n", "Coordination failed:".red().bold()));
                output.push_str(attempt.final_answer.as_deref().unwrap_or("(no answer produced)"));
                output.push('\n');
            }
            None => output.push_str(&format!("{}\n", "Coordination did not reach a terminal outcome.".red())),
        }

        output
    }

    fn header(title: &str) -> String {
        let bar = "=".repeat(title.len().max(20));
        format!("{bar}\n{}\n{bar}\n", title.bold())
    }
}
