//! `CoordinationEngine` (§2 item 6, §4.1): the core. Owns the `AgentState`
//! table for the current attempt, runs rounds until consensus or timeout,
//! applies the voting rules, selects a winner, and drives planning mode and
//! restart. Adapted from the donor's `application/src/use_cases/run_quorum.rs`
//! `JoinSet` + `mpsc` merge loop, generalized from three fixed phases
//! (Initial/Review/Synthesis) to the full Setup→Running→Deciding→Presenting→
//! {Done,Restart,Failed} state machine, with a single mutex-guarded state
//! table rather than the donor's per-field locking.

use crate::agent_runner::{AgentRunner, ToolPolicy};
use crate::error::{CoordinationError, RunAgentError};
use crate::event_bus::EventBus;
use crate::ports::{
    BackendPort, ConversationLogger, MessageTemplates, PeerAnswer, ToolInvoker, TurnPhase,
    VoteTally, WorkspaceManager,
};
use crate::timeout_governor::{Budget, TimeoutGovernor};
use massgen_domain::{
    is_control_tool_name, jaccard_overlap, no_answers_message, novelty_rejects, select_winner,
    synthesize_fallback, validate_vote_target, AgentErrorKind, AgentEvent, AgentId, AgentSpec,
    AgentState, AgentStatus, AttemptOutcome, Chunk, ConfigError, ContextPermission, KillReason,
    Message, OrchestrationAttempt, Task, ToolSpec, Vote, VoteLedger, NEW_ANSWER_TOOL,
    RESTART_TOOL, VOTE_TOOL,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

/// Per-attempt bookkeeping, held behind one mutex (§9: a single state lock
/// rather than per-field locking) so accepting an answer, recording a vote,
/// and invalidating a stale vote are each an atomic read-modify-write.
struct CoordinationState {
    agents: HashMap<AgentId, AgentState>,
    /// Feedback notices (novelty rejection, answer cap, invalid vote) queued
    /// for an agent's next prompt. Not part of `AgentState` itself — it is
    /// transient per-round commentary, not coordination state peers observe.
    feedback: HashMap<AgentId, Vec<String>>,
}

impl CoordinationState {
    fn new(task: &Task) -> Self {
        let agents = task
            .config
            .agents
            .iter()
            .map(|a| (a.id.clone(), AgentState::idle(a.id.clone())))
            .collect();
        Self { agents, feedback: HashMap::new() }
    }

    fn peer_answers(&self, exclude: &AgentId) -> Vec<PeerAnswer> {
        self.agents
            .values()
            .filter(|s| &s.id != exclude)
            .filter_map(|s| {
                s.answer.clone().map(|answer| PeerAnswer {
                    agent_id: s.id.clone(),
                    answer,
                    is_killed: s.status.is_killed(),
                })
            })
            .collect()
    }

    fn active_ids(&self) -> Vec<AgentId> {
        self.agents.values().filter(|s| !s.status.is_terminal()).map(|s| s.id.clone()).collect()
    }

    /// Consensus (§4.1 step 6): every non-killed agent has voted, or has
    /// answered and has no legal vote target left (the single-active-agent
    /// edge case named in §9's open questions).
    fn consensus_reached(&self) -> bool {
        let active: Vec<&AgentState> = self.agents.values().filter(|s| !s.status.is_killed()).collect();
        if active.is_empty() {
            return false;
        }
        active.iter().all(|s| match s.status {
            AgentStatus::Voted => true,
            AgentStatus::AnsweredWaiting => {
                !active.iter().any(|o| o.id != s.id && o.is_valid_vote_target())
            }
            _ => false,
        })
    }
}

/// Collaborators the engine needs, threaded in explicitly through the
/// constructor rather than reached via a global singleton (§9).
pub struct CoordinationEngine {
    backends: HashMap<String, Arc<dyn BackendPort>>,
    tool_invoker: Arc<dyn ToolInvoker>,
    templates: Arc<dyn MessageTemplates>,
    logger: Arc<dyn ConversationLogger>,
    workspace: Arc<dyn WorkspaceManager>,
    bus: EventBus,
}

impl CoordinationEngine {
    /// `PathPermissionManager` is deliberately not a direct collaborator
    /// here: every filesystem-touching tool call routes through
    /// `tool_invoker`, whose concrete (infrastructure-layer) implementation
    /// owns the permission manager and applies `policy.role` itself.
    pub fn new(
        backends: HashMap<String, Arc<dyn BackendPort>>,
        tool_invoker: Arc<dyn ToolInvoker>,
        templates: Arc<dyn MessageTemplates>,
        logger: Arc<dyn ConversationLogger>,
        workspace: Arc<dyn WorkspaceManager>,
        bus: EventBus,
    ) -> Self {
        Self { backends, tool_invoker, templates, logger, workspace, bus }
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.bus
    }

    /// `coordinate(task)` (§4.1 contract): runs attempts until `Done` or
    /// `Failed`, restarting per the winner's self-eval up to
    /// `max_orchestration_restarts` times. Fails only when no agent ever
    /// produced content across every attempt.
    pub async fn coordinate(&self, task: Task) -> Result<OrchestrationAttempt, CoordinationError> {
        task.config.validate()?;
        for agent in &task.config.agents {
            if !self.backends.contains_key(&agent.backend_ref) {
                return Err(ConfigError::UnknownBackendRef(agent.backend_ref.clone(), agent.id.clone()).into());
            }
        }

        let mut current_task = task;
        let mut attempt_number = 1u32;
        let mut any_content_ever = false;

        loop {
            let governor = TimeoutGovernor::new(current_task.config.timeout);
            let attempt = self.run_attempt(&current_task, attempt_number, &governor).await;
            any_content_ever |= attempt.final_answer.is_some();

            match attempt.outcome.clone() {
                Some(AttemptOutcome::Restart { reason }) => {
                    let max = current_task.config.coordination.max_orchestration_restarts;
                    if OrchestrationAttempt::may_restart(attempt_number, max) {
                        info!(attempt_number, %reason, "restart requested by winner");
                        current_task = current_task.with_restart_reason(&reason);
                        attempt_number += 1;
                        continue;
                    }
                    let mut capped = attempt;
                    capped.outcome = Some(AttemptOutcome::Done);
                    return Ok(capped);
                }
                Some(AttemptOutcome::Done) => return Ok(attempt),
                Some(AttemptOutcome::Failed) => {
                    if !any_content_ever {
                        return Err(CoordinationError::NoContentProduced { attempts: attempt_number });
                    }
                    return Ok(attempt);
                }
                None => unreachable!("run_attempt always sets an outcome"),
            }
        }
    }

    async fn run_attempt(
        &self,
        task: &Task,
        attempt_number: u32,
        governor: &TimeoutGovernor,
    ) -> OrchestrationAttempt {
        let mut result = OrchestrationAttempt::new(attempt_number);

        // Debug harness (§6): bypass Running/Deciding entirely.
        if task.config.skip_coordination_rounds {
            return match task.config.declaration_order().into_iter().next() {
                Some(winner) => {
                    let answer = task
                        .config
                        .debug_final_answer
                        .clone()
                        .unwrap_or_else(|| "(no debug answer configured)".to_string());
                    result.complete(winner, answer, AttemptOutcome::Done);
                    result
                }
                None => {
                    result.fail(None);
                    result
                }
            };
        }

        let state = Arc::new(Mutex::new(CoordinationState::new(task)));
        let declaration_order = task.config.declaration_order();
        let phase = if task.config.coordination.enable_planning_mode {
            TurnPhase::Planning
        } else {
            TurnPhase::Unrestricted
        };
        let policy = match phase {
            TurnPhase::Planning => ToolPolicy {
                planning_mode: true,
                read_only_whitelist: Default::default(),
                role: massgen_domain::CallerRole::Other,
            },
            TurnPhase::Unrestricted => ToolPolicy::unrestricted(),
        };

        let agent_budgets: HashMap<AgentId, Arc<Budget>> =
            declaration_order.iter().map(|id| (id.clone(), governor.new_agent_budget(id.clone()))).collect();

        'running: loop {
            if governor.global_budget().check_and_cancel_if_exceeded().is_some() {
                governor.cancel_all();
                break 'running;
            }

            let active_ids = state.lock().await.active_ids();
            if active_ids.is_empty() {
                break 'running;
            }

            let (agg_tx, mut agg_rx) = mpsc::unbounded_channel::<AgentEvent>();

            for agent_id in &active_ids {
                let Some(agent_spec) = task.config.agents.iter().find(|a| &a.id == agent_id) else { continue };
                let Some(backend) = self.backends.get(&agent_spec.backend_ref).cloned() else { continue };
                let runner = Arc::new(AgentRunner::new(backend, self.tool_invoker.clone(), self.templates.clone()));
                let budget = agent_budgets[agent_id].clone();
                let messages = self.build_messages(task, agent_spec, &state, phase).await;

                let mut rx = runner.run(
                    agent_id.clone(),
                    messages,
                    ToolSpec::with_control_tools(),
                    policy.clone(),
                    budget,
                );
                let tx = agg_tx.clone();
                tokio::spawn(async move {
                    while let Some(event) = rx.recv().await {
                        let terminal = event.is_terminal();
                        if tx.send(event).is_err() || terminal {
                            break;
                        }
                    }
                });
            }
            drop(agg_tx);

            while let Some(event) = agg_rx.recv().await {
                self.logger.log_event(attempt_number, &event).await;
                self.bus.publish(event.clone());

                match event {
                    AgentEvent::Content { .. } => {}
                    AgentEvent::ToolCall { agent_id, name, arguments_json, .. } => {
                        self.handle_control_tool_call(task, &state, governor, &agent_id, &name, &arguments_json).await;
                    }
                    AgentEvent::PlannedAction { agent_id, notice } => {
                        let mut guard = state.lock().await;
                        if let Some(agent_state) = guard.agents.get_mut(&agent_id) {
                            agent_state.append_planned_action(&notice);
                        }
                    }
                    AgentEvent::Error { agent_id, kind } => {
                        let reason = match kind {
                            AgentErrorKind::Timeout | AgentErrorKind::TokenCap => KillReason::Timeout,
                            AgentErrorKind::BackendTransient | AgentErrorKind::BackendFatal => {
                                KillReason::BackendFailure
                            }
                        };
                        let mut guard = state.lock().await;
                        if let Some(agent_state) = guard.agents.get_mut(&agent_id) {
                            agent_state.kill(reason);
                        }
                        warn!(%agent_id, ?kind, "agent killed");
                    }
                    AgentEvent::End { .. } => {}
                }

                if governor.global_budget().check_and_cancel_if_exceeded().is_some() {
                    governor.cancel_all();
                    break;
                }
                if state.lock().await.consensus_reached() {
                    break;
                }
            }

            let should_stop = governor.global_budget().is_cancelled() || state.lock().await.consensus_reached();
            if should_stop {
                break 'running;
            }
            // Otherwise some agents were killed/voted but not all — loop
            // again to re-prompt whoever is still active with the updated
            // peer view (§4.1 step 2's "Re-prompt all non-Killed,
            // non-terminal agents").
        }

        self.finish_attempt(task, attempt_number, &state, governor).await
    }

    async fn build_messages(
        &self,
        task: &Task,
        agent_spec: &AgentSpec,
        state: &Arc<Mutex<CoordinationState>>,
        phase: TurnPhase,
    ) -> Vec<Message> {
        let mut guard = state.lock().await;
        let peers = guard.peer_answers(&agent_spec.id);
        let prompt = if peers.is_empty() {
            self.templates.initial_prompt(task, &agent_spec.id, phase)
        } else {
            self.templates.reprompt_with_peers(task, &agent_spec.id, &peers, task.config.voting_sensitivity, phase)
        };

        let mut messages = Vec::new();
        if let Some(system_message) = &agent_spec.system_message {
            messages.push(Message::system(system_message.clone()));
        }
        messages.push(Message::user(prompt));
        if let Some(feedback) = guard.feedback.remove(&agent_spec.id) {
            messages.extend(feedback.into_iter().map(Message::user));
        }
        messages
    }

    async fn handle_control_tool_call(
        &self,
        task: &Task,
        state: &Arc<Mutex<CoordinationState>>,
        governor: &TimeoutGovernor,
        agent_id: &AgentId,
        name: &str,
        arguments_json: &str,
    ) {
        let args: serde_json::Value = serde_json::from_str(arguments_json).unwrap_or(serde_json::Value::Null);
        match name {
            NEW_ANSWER_TOOL => {
                let Some(content) = args.get("content").and_then(|v| v.as_str()) else { return };
                self.handle_new_answer(task, state, agent_id, content.to_string()).await;
            }
            VOTE_TOOL => {
                let target = args.get("target_agent_id").and_then(|v| v.as_str()).unwrap_or_default();
                let reason = args.get("reason").and_then(|v| v.as_str()).unwrap_or_default();
                self.handle_vote(state, governor, agent_id, AgentId::new(target), reason.to_string()).await;
            }
            _ => {}
        }
    }

    /// §4.1 step 4: novelty gate → answer-cap gate → accept → invalidate
    /// stale votes targeting this agent → snapshot.
    async fn handle_new_answer(
        &self,
        task: &Task,
        state: &Arc<Mutex<CoordinationState>>,
        agent_id: &AgentId,
        content: String,
    ) {
        let novelty_level = task.config.answer_novelty_requirement;
        let max_answers = task.config.max_new_answers_per_agent;
        let mut invalidated_voters: Vec<AgentId> = Vec::new();
        let new_version;

        {
            let mut guard = state.lock().await;
            let CoordinationState { agents, feedback } = &mut *guard;

            let Some(existing) = agents.get(agent_id) else { return };
            if let Some(previous) = existing.answer.clone() {
                if novelty_rejects(&content, &previous, novelty_level) {
                    let jaccard = jaccard_overlap(&content, &previous);
                    let threshold = novelty_level.threshold().unwrap_or(1.0);
                    let msg = self.templates.novelty_rejection_feedback(jaccard, threshold);
                    feedback.entry(agent_id.clone()).or_default().push(msg);
                    return;
                }
            }
            if existing.has_reached_answer_cap(max_answers) {
                let msg = self.templates.answer_cap_reached_feedback();
                feedback.entry(agent_id.clone()).or_default().push(msg);
                return;
            }

            agents.get_mut(agent_id).expect("checked above").accept_answer(content);
            new_version = agents.get(agent_id).expect("just inserted").answer_version;

            for other in agents.values_mut() {
                if &other.id == agent_id {
                    continue;
                }
                let still_streaming = matches!(other.status, AgentStatus::Streaming);
                if other.invalidate_vote_if_targeting(agent_id, still_streaming) {
                    invalidated_voters.push(other.id.clone());
                }
            }
            for voter in &invalidated_voters {
                let msg = self.templates.vote_invalidated_feedback(agent_id);
                feedback.entry(voter.clone()).or_default().push(msg);
            }
        }

        if let Err(err) = self.workspace.snapshot(agent_id, new_version).await {
            warn!(%agent_id, %err, "workspace snapshot failed after new_answer");
        }
    }

    /// §4.1 step 5: self-vote and killed/answerless targets are rejected as
    /// soft feedback, never a fatal error. A committed vote cancels the
    /// voter's own runner immediately — it has nothing further to do.
    async fn handle_vote(
        &self,
        state: &Arc<Mutex<CoordinationState>>,
        governor: &TimeoutGovernor,
        agent_id: &AgentId,
        target: AgentId,
        reason: String,
    ) {
        let mut guard = state.lock().await;
        let CoordinationState { agents, feedback } = &mut *guard;
        match validate_vote_target(agent_id, &target, agents) {
            Ok(()) => {
                if let Some(agent_state) = agents.get_mut(agent_id) {
                    agent_state.record_vote(Vote::new(agent_id.clone(), target, reason));
                }
                drop(guard);
                governor.cancel_agent(agent_id);
            }
            Err(reason) => {
                let msg = self.templates.invalid_vote_target_feedback(&target, &reason);
                feedback.entry(agent_id.clone()).or_default().push(msg);
            }
        }
    }

    /// Deciding → Presenting → restart gate (§4.1 steps 7-9), plus the
    /// global-timeout fallback branches (§7).
    async fn finish_attempt(
        &self,
        task: &Task,
        attempt_number: u32,
        state: &Arc<Mutex<CoordinationState>>,
        governor: &TimeoutGovernor,
    ) -> OrchestrationAttempt {
        let mut result = OrchestrationAttempt::new(attempt_number);
        let declaration_order = task.config.declaration_order();

        let (winner, tally, peers, winner_answer) = {
            let guard = state.lock().await;
            let ledger = VoteLedger::rebuild(&guard.agents);
            let active_with_answers: Vec<AgentId> = guard
                .agents
                .values()
                .filter(|s| !s.status.is_killed() && s.answer.is_some())
                .map(|s| s.id.clone())
                .collect();

            let winner = if active_with_answers.is_empty() {
                None
            } else {
                select_winner(&ledger, &guard.agents, &declaration_order).or_else(|| {
                    // No votes recorded at all (global timeout mid-round): fall
                    // back to the same deterministic tie-break rule, restricted
                    // to agents that actually have an answer.
                    let max_version = active_with_answers
                        .iter()
                        .filter_map(|id| guard.agents.get(id).map(|s| s.answer_version))
                        .max()
                        .unwrap_or(0);
                    declaration_order
                        .iter()
                        .find(|id| {
                            active_with_answers.contains(id)
                                && guard.agents.get(*id).map(|s| s.answer_version) == Some(max_version)
                        })
                        .cloned()
                })
            };

            match winner {
                Some(winner_id) => {
                    let tally: Vec<VoteTally> =
                        ledger.tally().into_iter().map(|(target, votes)| VoteTally { target, votes }).collect();
                    let peers = guard.peer_answers(&winner_id);
                    let answer = guard.agents.get(&winner_id).and_then(|s| s.answer.clone()).unwrap_or_default();
                    (Some(winner_id), tally, peers, answer)
                }
                None => (None, Vec::new(), Vec::new(), String::new()),
            }
        };

        let Some(winner_id) = winner else {
            return self.finish_without_winner(attempt_number, state, governor).await;
        };

        let final_answer = self.present(task, attempt_number, &winner_id, &winner_answer, &peers, &tally, governor).await;

        if let Some(reason) = self.maybe_restart(task, attempt_number, &winner_id, &final_answer, governor).await {
            result.complete(winner_id, final_answer, AttemptOutcome::Restart { reason });
        } else {
            result.complete(winner_id, final_answer, AttemptOutcome::Done);
        }
        result
    }

    /// §7 branches 2/3: the Running loop ended with no active agent holding
    /// an answer. If `enable_timeout_fallback` and a killed agent has one,
    /// synthesize a deterministic summary; otherwise report no answers.
    async fn finish_without_winner(
        &self,
        attempt_number: u32,
        state: &Arc<Mutex<CoordinationState>>,
        governor: &TimeoutGovernor,
    ) -> OrchestrationAttempt {
        let mut result = OrchestrationAttempt::new(attempt_number);

        if !governor.enable_timeout_fallback() {
            result.fail(None);
            return result;
        }

        let killed_answers: Vec<(AgentId, String)> = {
            let guard = state.lock().await;
            guard
                .agents
                .values()
                .filter(|s| s.status.is_killed())
                .filter_map(|s| s.answer.clone().map(|a| (s.id.clone(), a)))
                .collect()
        };

        if killed_answers.is_empty() {
            result.fail(Some(no_answers_message()));
        } else {
            result.fail(Some(synthesize_fallback(&killed_answers)));
        }
        result
    }

    /// §4.1 step 8: replay the winner with the full vote summary and all
    /// peer answers, regaining Write access to context paths for this
    /// phase only, then copy its workspace out.
    async fn present(
        &self,
        task: &Task,
        attempt_number: u32,
        winner_id: &AgentId,
        winner_answer: &str,
        peers: &[PeerAnswer],
        tally: &[VoteTally],
        governor: &TimeoutGovernor,
    ) -> String {
        let Some(agent_spec) = task.config.agents.iter().find(|a| &a.id == winner_id) else {
            return winner_answer.to_string();
        };
        let Some(backend) = self.backends.get(&agent_spec.backend_ref).cloned() else {
            return winner_answer.to_string();
        };

        let runner = Arc::new(AgentRunner::new(backend, self.tool_invoker.clone(), self.templates.clone()));
        let budget = Arc::new(governor.new_agent_budget());
        let prompt = self.templates.final_presentation_prompt(task, winner_id, peers, tally);

        let mut messages = Vec::new();
        if let Some(system_message) = &agent_spec.system_message {
            messages.push(Message::system(system_message.clone()));
        }
        messages.push(Message::user(prompt));

        let presenting_policy = ToolPolicy {
            planning_mode: false,
            read_only_whitelist: Default::default(),
            role: massgen_domain::CallerRole::PresentingWinner,
        };
        let mut rx = runner.run(winner_id.clone(), messages, ToolSpec::with_control_tools(), presenting_policy, budget);
        let mut final_text = String::new();
        while let Some(event) = rx.recv().await {
            self.logger.log_event(attempt_number, &event).await;
            self.bus.publish(event.clone());
            if let AgentEvent::Content { text, .. } = &event {
                final_text.push_str(text);
            }
        }

        let final_answer = if final_text.trim().is_empty() { winner_answer.to_string() } else { final_text };

        let write_targets: Vec<crate::ports::WriteTarget> = task
            .config
            .context_paths
            .iter()
            .filter(|p| p.permission == ContextPermission::Write)
            .map(|p| {
                crate::ports::WriteTarget::new(p.path.as_str(), p.protected_paths.iter().map(PathBuf::from).collect())
            })
            .collect();
        if !write_targets.is_empty() {
            if let Err(err) = self.workspace.finalize(winner_id, &write_targets).await {
                warn!(%winner_id, %err, "workspace finalize failed");
            }
        }

        final_answer
    }

    /// §4.1 step 9: the restart gate, modeled as a distinct self-eval turn
    /// offering only `submit`/`restart(reason)` — never alongside
    /// `new_answer`/`vote`, which would let the winner re-litigate voting.
    async fn maybe_restart(
        &self,
        task: &Task,
        attempt_number: u32,
        winner_id: &AgentId,
        final_answer: &str,
        governor: &TimeoutGovernor,
    ) -> Option<String> {
        if task.config.coordination.max_orchestration_restarts == 0 {
            return None;
        }
        let agent_spec = task.config.agents.iter().find(|a| &a.id == winner_id)?;
        let backend = self.backends.get(&agent_spec.backend_ref)?.clone();
        let runner = Arc::new(AgentRunner::new(backend, self.tool_invoker.clone(), self.templates.clone()));
        let budget = Arc::new(governor.new_agent_budget());
        let prompt = self.templates.restart_self_eval_prompt(final_answer);
        let messages = vec![Message::user(prompt)];

        let mut rx = runner.run(winner_id.clone(), messages, massgen_domain::ToolSpec::with_restart_tools(), ToolPolicy::unrestricted(), budget);
        let mut reason = None;
        while let Some(event) = rx.recv().await {
            self.logger.log_event(attempt_number, &event).await;
            if let AgentEvent::ToolCall { name, arguments_json, .. } = &event {
                if name == RESTART_TOOL {
                    let args: serde_json::Value = serde_json::from_str(arguments_json).unwrap_or(serde_json::Value::Null);
                    reason = Some(args.get("reason").and_then(|v| v.as_str()).unwrap_or("unspecified").to_string());
                }
            }
        }
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::conversation_logger::NoopConversationLogger;
    use crate::ports::message_templates::PlainTextTemplates;
    use crate::ports::tool_invoker::NoopToolInvoker;
    use async_trait::async_trait;
    use futures::stream::{self, BoxStream};
    use futures::StreamExt as _;
    use massgen_domain::{AgentSpec, CoordinationSettings, FilesystemSupport, TaskId};
    use std::sync::Mutex as StdMutex;
    use tokio_util::sync::CancellationToken;

    /// Replays one queued turn (`Vec<Chunk>`) per `stream()` call, holding on
    /// the last queued turn once exhausted — lets a test script a whole
    /// coordination run (several re-prompts) for one agent up front.
    struct QueuedBackend {
        turns: StdMutex<Vec<Vec<Chunk>>>,
        cursor: StdMutex<usize>,
    }

    impl QueuedBackend {
        fn new(turns: Vec<Vec<Chunk>>) -> Self {
            Self { turns: StdMutex::new(turns), cursor: StdMutex::new(0) }
        }
    }

    #[async_trait]
    impl BackendPort for QueuedBackend {
        async fn stream(
            &self,
            _messages: Vec<Message>,
            _tools: ToolSpec,
            _cancel: CancellationToken,
        ) -> Result<BoxStream<'static, Chunk>, RunAgentError> {
            let turns = self.turns.lock().unwrap();
            let mut cursor = self.cursor.lock().unwrap();
            let idx = (*cursor).min(turns.len().saturating_sub(1));
            *cursor += 1;
            Ok(stream::iter(turns[idx].clone()).boxed())
        }

        fn filesystem_support(&self) -> FilesystemSupport {
            FilesystemSupport::None
        }
    }

    struct NoopWorkspaceManager;

    #[async_trait]
    impl WorkspaceManager for NoopWorkspaceManager {
        async fn ensure(&self, agent_id: &AgentId) -> Result<PathBuf, crate::ports::workspace::WorkspaceError> {
            Ok(PathBuf::from(agent_id.as_str()))
        }

        async fn snapshot(
            &self,
            agent_id: &AgentId,
            answer_version: u32,
        ) -> Result<massgen_domain::Snapshot, crate::ports::workspace::WorkspaceError> {
            Ok(massgen_domain::Snapshot::new(
                massgen_domain::SnapshotId::from_digest("test"),
                agent_id.clone(),
                answer_version,
                vec![],
            ))
        }

        async fn read_view(
            &self,
            _agent_id: &AgentId,
            peer_id: &AgentId,
        ) -> Result<PathBuf, crate::ports::workspace::WorkspaceError> {
            Ok(PathBuf::from(peer_id.as_str()))
        }

        async fn finalize(&self, _winner_id: &AgentId, _write_targets: &[crate::ports::WriteTarget]) -> Result<(), crate::ports::workspace::WorkspaceError> {
            Ok(())
        }
    }

    fn content_then_vote(text: &str, target: &str) -> Vec<Chunk> {
        vec![
            Chunk::ToolCall {
                id: "1".into(),
                name: NEW_ANSWER_TOOL.into(),
                arguments_json: format!("{{\"content\":\"{text}\"}}"),
            },
            Chunk::ToolCall {
                id: "2".into(),
                name: VOTE_TOOL.into(),
                arguments_json: format!("{{\"target_agent_id\":\"{target}\",\"reason\":\"best\"}}"),
            },
            Chunk::End { reason: massgen_domain::EndReason::Tool },
        ]
    }

    fn answer_only(text: &str) -> Vec<Chunk> {
        vec![
            Chunk::ToolCall {
                id: "1".into(),
                name: NEW_ANSWER_TOOL.into(),
                arguments_json: format!("{{\"content\":\"{text}\"}}"),
            },
            Chunk::End { reason: massgen_domain::EndReason::Tool },
        ]
    }

    fn vote_only(target: &str) -> Vec<Chunk> {
        vec![
            Chunk::ToolCall {
                id: "1".into(),
                name: VOTE_TOOL.into(),
                arguments_json: format!("{{\"target_agent_id\":\"{target}\",\"reason\":\"best\"}}"),
            },
            Chunk::End { reason: massgen_domain::EndReason::Tool },
        ]
    }

    fn presentation_turn(text: &str) -> Vec<Chunk> {
        vec![Chunk::Content { text: text.into() }, Chunk::End { reason: massgen_domain::EndReason::Stop }]
    }

    /// A turn that neither answers nor votes — used to give an agent
    /// something to stream on a round where the test script has nothing
    /// new for it to do, without perturbing its coordination state.
    fn noop_turn() -> Vec<Chunk> {
        vec![Chunk::Content { text: "thinking".into() }, Chunk::End { reason: massgen_domain::EndReason::Stop }]
    }

    fn two_agent_config() -> massgen_domain::CoordinationConfig {
        massgen_domain::CoordinationConfig {
            agents: vec![AgentSpec::new(AgentId::new("a1"), "b1"), AgentSpec::new(AgentId::new("a2"), "b2")],
            ..Default::default()
        }
    }

    fn engine(backends: HashMap<String, Arc<dyn BackendPort>>) -> CoordinationEngine {
        CoordinationEngine::new(
            backends,
            Arc::new(NoopToolInvoker),
            Arc::new(PlainTextTemplates),
            Arc::new(NoopConversationLogger),
            Arc::new(NoopWorkspaceManager),
            EventBus::default(),
        )
    }

    #[tokio::test]
    async fn two_agent_unanimous_vote_produces_a_winner() {
        // Round 1: both submit an answer. Round 2: each votes for the other
        // agent's (now-committed) answer — kept in a separate round so
        // neither vote ever races its target's own `new_answer` event.
        let mut backends: HashMap<String, Arc<dyn BackendPort>> = HashMap::new();
        backends.insert(
            "b1".into(),
            Arc::new(QueuedBackend::new(vec![answer_only("answer one"), vote_only("a2"), presentation_turn("final from a1")])),
        );
        backends.insert("b2".into(), Arc::new(QueuedBackend::new(vec![answer_only("answer two"), vote_only("a1")])));

        let engine = engine(backends);
        let task = Task::new(TaskId::new("t1"), "do the thing", two_agent_config());
        let attempt = engine.coordinate(task).await.unwrap();

        assert_eq!(attempt.outcome, Some(AttemptOutcome::Done));
        assert!(attempt.winner.is_some());
        assert_eq!(attempt.final_answer.as_deref(), Some("final from a1"));
    }

    #[tokio::test]
    async fn novelty_rejection_under_balanced_sensitivity_keeps_agent_active() {
        let mut config = two_agent_config();
        config.voting_sensitivity = massgen_domain::VotingSensitivity::Balanced;
        config.answer_novelty_requirement = massgen_domain::VotingSensitivity::Balanced;

        // Round 1: a1 answers, a2 answers. Round 2: a1's near-duplicate
        // resubmission is rejected (no version bump); a2 votes for a1's
        // round-1 answer, which is already committed. Round 3 (a2 now
        // terminal, only a1 active): a1 submits a sufficiently different
        // answer and votes for a2.
        let mut backends: HashMap<String, Arc<dyn BackendPort>> = HashMap::new();
        backends.insert(
            "b1".into(),
            Arc::new(QueuedBackend::new(vec![
                answer_only("Paris is the capital of France."),
                answer_only("Paris is the capital of France!"),
                content_then_vote("a distinct new answer text entirely", "a2"),
                presentation_turn("final from a1"),
            ])),
        );
        backends.insert("b2".into(), Arc::new(QueuedBackend::new(vec![answer_only("something unrelated entirely"), vote_only("a1")])));

        let engine = engine(backends);
        let task = Task::new(TaskId::new("t2"), "do the thing", config);
        let attempt = engine.coordinate(task).await.unwrap();

        assert_eq!(attempt.outcome, Some(AttemptOutcome::Done));
        // a1's rejected resubmission never bumped its answer_version, so the
        // 1-1 tie is broken in a1's favor by its higher final version (2 vs 1).
        assert_eq!(attempt.winner, Some(AgentId::new("a1")));
        assert_eq!(attempt.final_answer.as_deref(), Some("final from a1"));
    }

    #[tokio::test]
    async fn vote_is_invalidated_when_target_submits_a_new_answer() {
        let config = two_agent_config();
        let mut backends: HashMap<String, Arc<dyn BackendPort>> = HashMap::new();
        // R1: a1 answers, a2 no-ops. R2: a1 no-ops, a2 votes for a1 (now
        // terminal). R3: a1 revises its answer, invalidating a2's vote and
        // reactivating it. R4: a1 no-ops again, a2 re-votes for a1.
        backends.insert(
            "b1".into(),
            Arc::new(QueuedBackend::new(vec![
                answer_only("first answer"),
                noop_turn(),
                answer_only("revised answer"),
                noop_turn(),
                presentation_turn("final"),
            ])),
        );
        backends.insert("b2".into(), Arc::new(QueuedBackend::new(vec![noop_turn(), vote_only("a1")])));

        let engine = engine(backends);
        let task = Task::new(TaskId::new("t3"), "do the thing", config);
        let attempt = engine.coordinate(task).await.unwrap();

        assert_eq!(attempt.outcome, Some(AttemptOutcome::Done));
        assert_eq!(attempt.winner, Some(AgentId::new("a1")));
        assert_eq!(attempt.final_answer.as_deref(), Some("final"));
    }

    #[tokio::test]
    async fn partial_timeout_falls_back_to_a_killed_agents_answer() {
        let mut config = two_agent_config();
        config.timeout.agent_max_tokens = 10;
        config.timeout.enable_timeout_fallback = true;

        let mut backends: HashMap<String, Arc<dyn BackendPort>> = HashMap::new();
        // a1 submits an answer, then blows its token cap before ever voting;
        // a2 blows its token cap without ever answering. No winner emerges,
        // so the engine must fall back to a1's last answer.
        backends.insert(
            "b1".into(),
            Arc::new(QueuedBackend::new(vec![vec![
                Chunk::ToolCall { id: "1".into(), name: NEW_ANSWER_TOOL.into(), arguments_json: "{\"content\":\"first answer\"}".into() },
                Chunk::Usage { input_tokens: 600, output_tokens: 0 },
                Chunk::Content { text: "unreachable".into() },
            ]])),
        );
        backends.insert(
            "b2".into(),
            Arc::new(QueuedBackend::new(vec![vec![
                Chunk::Usage { input_tokens: 600, output_tokens: 0 },
                Chunk::Content { text: "unreachable".into() },
            ]])),
        );

        let engine = engine(backends);
        let task = Task::new(TaskId::new("t4"), "do the thing", config);
        let attempt = engine.coordinate(task).await.unwrap();

        assert_eq!(attempt.outcome, Some(AttemptOutcome::Failed));
        assert!(attempt.final_answer.as_deref().unwrap_or("").contains("first answer"));
    }

    #[tokio::test]
    async fn planning_mode_commits_the_winners_final_answer() {
        let mut config = two_agent_config();
        config.coordination = CoordinationSettings { enable_planning_mode: true, ..Default::default() };

        // Same round-separated answer-then-vote shape as the unanimous-vote
        // case; planning mode only restricts tool execution during the
        // Running phase, which `NoopToolInvoker` never exercises here.
        let mut backends: HashMap<String, Arc<dyn BackendPort>> = HashMap::new();
        backends.insert(
            "b1".into(),
            Arc::new(QueuedBackend::new(vec![answer_only("plan then answer"), vote_only("a2"), presentation_turn("final plan result")])),
        );
        backends.insert("b2".into(), Arc::new(QueuedBackend::new(vec![answer_only("alternative plan"), vote_only("a1")])));

        let engine = engine(backends);
        let task = Task::new(TaskId::new("t5"), "do the thing", config);
        let attempt = engine.coordinate(task).await.unwrap();

        assert_eq!(attempt.outcome, Some(AttemptOutcome::Done));
        assert_eq!(attempt.final_answer.as_deref(), Some("final plan result"));
    }

    #[tokio::test]
    async fn winner_restart_request_runs_a_second_attempt() {
        let mut config = two_agent_config();
        config.coordination.max_orchestration_restarts = 1;

        // Attempt 1: R1 both answer, R2 both vote, then a1 presents and is
        // asked to self-evaluate — it requests a restart. Attempt 2 repeats
        // the same shape (fresh per-attempt state) and this time submits.
        let mut backends: HashMap<String, Arc<dyn BackendPort>> = HashMap::new();
        backends.insert(
            "b1".into(),
            Arc::new(QueuedBackend::new(vec![
                answer_only("first pass"),
                vote_only("a2"),
                presentation_turn("first final"),
                vec![Chunk::ToolCall { id: "r1".into(), name: RESTART_TOOL.into(), arguments_json: "{\"reason\":\"found a bug\"}".into() }, Chunk::End { reason: massgen_domain::EndReason::Tool }],
                answer_only("second pass"),
                vote_only("a2"),
                presentation_turn("second final"),
                vec![Chunk::ToolCall { id: "r2".into(), name: "submit".into(), arguments_json: "{}".into() }, Chunk::End { reason: massgen_domain::EndReason::Tool }],
            ])),
        );
        backends.insert(
            "b2".into(),
            Arc::new(QueuedBackend::new(vec![
                answer_only("other pass"),
                vote_only("a1"),
                answer_only("other pass again"),
                vote_only("a1"),
            ])),
        );

        let engine = engine(backends);
        let task = Task::new(TaskId::new("t6"), "do the thing", config);
        let attempt = engine.coordinate(task).await.unwrap();

        assert_eq!(attempt.outcome, Some(AttemptOutcome::Done));
        assert_eq!(attempt.final_answer.as_deref(), Some("second final"));
    }

    #[tokio::test]
    async fn unknown_backend_ref_is_rejected_before_any_agent_runs() {
        let config = massgen_domain::CoordinationConfig {
            agents: vec![AgentSpec::new(AgentId::new("a1"), "missing")],
            ..Default::default()
        };
        let engine = engine(HashMap::new());
        let task = Task::new(TaskId::new("t7"), "do the thing", config);
        let result = engine.coordinate(task).await;
        assert!(matches!(result, Err(CoordinationError::Config(ConfigError::UnknownBackendRef(_, _)))));
    }

    #[tokio::test]
    async fn skip_coordination_rounds_returns_the_debug_answer_immediately() {
        let config = massgen_domain::CoordinationConfig {
            agents: vec![AgentSpec::new(AgentId::new("a1"), "b1")],
            skip_coordination_rounds: true,
            debug_final_answer: Some("canned answer".into()),
            ..Default::default()
        };
        let mut backends: HashMap<String, Arc<dyn BackendPort>> = HashMap::new();
        backends.insert("b1".into(), Arc::new(QueuedBackend::new(vec![vec![]])));

        let engine = engine(backends);
        let task = Task::new(TaskId::new("t8"), "do the thing", config);
        let attempt = engine.coordinate(task).await.unwrap();

        assert_eq!(attempt.outcome, Some(AttemptOutcome::Done));
        assert_eq!(attempt.final_answer.as_deref(), Some("canned answer"));
        assert_eq!(attempt.winner, Some(AgentId::new("a1")));
    }
}
