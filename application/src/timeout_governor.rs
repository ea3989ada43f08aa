//! `TimeoutGovernor` (§2 item 7, §4.5): wall-clock and token budgets for
//! global orchestration and per agent, checked on every chunk. Cancellation
//! is cooperative — a flag (here, a `CancellationToken`) that runners
//! observe at chunk boundaries, not a hidden thread-local (§9).

use massgen_domain::{AgentId, TimeoutSettings};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// One agent's or the orchestrator's budget tracker.
pub struct Budget {
    started_at: Instant,
    wall_clock_limit: Duration,
    token_limit: u64,
    tokens_used: AtomicU64,
    cancel: CancellationToken,
}

impl Budget {
    pub fn new(wall_clock_limit: Duration, token_limit: u64) -> Self {
        Self {
            started_at: Instant::now(),
            wall_clock_limit,
            token_limit,
            tokens_used: AtomicU64::new(0),
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn record_tokens(&self, tokens: u64) -> u64 {
        self.tokens_used.fetch_add(tokens, Ordering::SeqCst) + tokens
    }

    pub fn tokens_used(&self) -> u64 {
        self.tokens_used.load(Ordering::SeqCst)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Checked on every chunk (§4.5): exceeding wall-clock or token budget
    /// triggers cancellation.
    pub fn check_and_cancel_if_exceeded(&self) -> Option<BudgetExceeded> {
        if self.cancel.is_cancelled() {
            return None;
        }
        if self.elapsed() > self.wall_clock_limit {
            self.cancel.cancel();
            return Some(BudgetExceeded::WallClock);
        }
        if self.tokens_used() > self.token_limit {
            self.cancel.cancel();
            return Some(BudgetExceeded::Tokens);
        }
        None
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetExceeded {
    WallClock,
    Tokens,
}

/// Owns the global budget and hands out fresh per-agent budgets, keeping a
/// handle to each so a global timeout or a single agent's vote-commit can
/// reach its runner directly (§5/§8: cancellation must reach every live
/// runner within one chunk boundary on global timeout, and immediately on
/// vote-commit per §4.1 step 5). One instance per `OrchestrationAttempt`.
pub struct TimeoutGovernor {
    global: Budget,
    settings: TimeoutSettings,
    agent_budgets: Mutex<HashMap<AgentId, Arc<Budget>>>,
}

impl TimeoutGovernor {
    pub fn new(settings: TimeoutSettings) -> Self {
        Self {
            global: Budget::new(
                Duration::from_secs(settings.orchestrator_timeout_seconds),
                settings.orchestrator_max_tokens,
            ),
            settings,
            agent_budgets: Mutex::new(HashMap::new()),
        }
    }

    pub fn global_budget(&self) -> &Budget {
        &self.global
    }

    /// Creates `agent_id`'s budget for this attempt and registers it so
    /// `cancel_all`/`cancel_agent` can reach it later. One call per agent
    /// per attempt — the same budget is reused across that agent's re-prompts
    /// within the attempt.
    pub fn new_agent_budget(&self, agent_id: AgentId) -> Arc<Budget> {
        let budget = Arc::new(Budget::new(
            Duration::from_secs(self.settings.agent_timeout_seconds),
            self.settings.agent_max_tokens,
        ));
        self.agent_budgets.lock().unwrap().insert(agent_id, budget.clone());
        budget
    }

    /// Cancels the global budget and every registered per-agent budget.
    pub fn cancel_all(&self) {
        self.global.cancel();
        for budget in self.agent_budgets.lock().unwrap().values() {
            budget.cancel();
        }
    }

    /// Cancels one agent's budget (§4.1 step 5: a committed vote cancels
    /// that agent's own runner), leaving the others untouched.
    pub fn cancel_agent(&self, agent_id: &AgentId) {
        if let Some(budget) = self.agent_budgets.lock().unwrap().get(agent_id) {
            budget.cancel();
        }
    }

    pub fn enable_timeout_fallback(&self) -> bool {
        self.settings.enable_timeout_fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_budget_triggers_cancellation() {
        let budget = Budget::new(Duration::from_secs(3600), 100);
        budget.record_tokens(150);
        assert_eq!(budget.check_and_cancel_if_exceeded(), Some(BudgetExceeded::Tokens));
        assert!(budget.is_cancelled());
    }

    #[test]
    fn wall_clock_budget_triggers_cancellation() {
        let budget = Budget::new(Duration::from_millis(0), 1_000_000);
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(budget.check_and_cancel_if_exceeded(), Some(BudgetExceeded::WallClock));
    }

    #[test]
    fn within_budget_does_not_cancel() {
        let budget = Budget::new(Duration::from_secs(3600), 1_000_000);
        budget.record_tokens(10);
        assert_eq!(budget.check_and_cancel_if_exceeded(), None);
        assert!(!budget.is_cancelled());
    }

    #[test]
    fn cancel_all_reaches_every_registered_agent_budget() {
        let governor = TimeoutGovernor::new(TimeoutSettings::default());
        let a1 = governor.new_agent_budget(AgentId::new("a1"));
        let a2 = governor.new_agent_budget(AgentId::new("a2"));

        governor.cancel_all();

        assert!(governor.global_budget().is_cancelled());
        assert!(a1.is_cancelled());
        assert!(a2.is_cancelled());
    }

    #[test]
    fn cancel_agent_only_cancels_that_agent() {
        let governor = TimeoutGovernor::new(TimeoutSettings::default());
        let a1 = governor.new_agent_budget(AgentId::new("a1"));
        let a2 = governor.new_agent_budget(AgentId::new("a2"));

        governor.cancel_agent(&AgentId::new("a1"));

        assert!(a1.is_cancelled());
        assert!(!a2.is_cancelled());
        assert!(!governor.global_budget().is_cancelled());
    }
}
