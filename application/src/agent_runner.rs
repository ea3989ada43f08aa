//! `AgentRunner` (§2 item 5, §4.2): drives one backend stream to completion
//! for one coordination step. Adapted from the donor's generic
//! `RunAgentUseCase<G,T,C>` shape and its `CancellationToken` +
//! `check_cancelled()` pattern in `application/src/use_cases/run_agent/mod.rs`.

use crate::error::RunAgentError;
use crate::ports::backend::BackendPort;
use crate::ports::message_templates::MessageTemplates;
use crate::ports::tool_invoker::ToolInvoker;
use crate::timeout_governor::Budget;
use futures::StreamExt;
use massgen_domain::{AgentErrorKind, AgentEvent, AgentId, CallerRole, Chunk, EndReason, Message, ToolCall, ToolSpec};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// How this turn should treat side-effectful tool calls (§4.1.c) and which
/// permission role it executes under (§4.4).
#[derive(Debug, Clone)]
pub struct ToolPolicy {
    pub planning_mode: bool,
    pub read_only_whitelist: HashSet<String>,
    pub role: CallerRole,
}

impl ToolPolicy {
    pub fn unrestricted() -> Self {
        Self { planning_mode: false, read_only_whitelist: HashSet::new(), role: CallerRole::Other }
    }

    fn permits_execution(&self, tool_name: &str) -> bool {
        !self.planning_mode || self.read_only_whitelist.contains(tool_name)
    }
}

const MAX_TRANSIENT_RETRIES: u32 = 3;

pub struct AgentRunner {
    backend: Arc<dyn BackendPort>,
    tool_invoker: Arc<dyn ToolInvoker>,
    templates: Arc<dyn MessageTemplates>,
}

impl AgentRunner {
    pub fn new(
        backend: Arc<dyn BackendPort>,
        tool_invoker: Arc<dyn ToolInvoker>,
        templates: Arc<dyn MessageTemplates>,
    ) -> Self {
        Self { backend, tool_invoker, templates }
    }

    /// Drives `messages` to completion against `tools`, forwarding every
    /// event through the returned channel as it happens. Guarantees exactly
    /// one terminal (`End`/`Error`) event before the channel closes.
    pub fn run(
        self: Arc<Self>,
        agent_id: AgentId,
        mut messages: Vec<Message>,
        tools: ToolSpec,
        policy: ToolPolicy,
        budget: Arc<Budget>,
    ) -> mpsc::UnboundedReceiver<AgentEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut retries = 0u32;

            'turn: loop {
                if budget.is_cancelled() {
                    let _ = tx.send(AgentEvent::Error { agent_id: agent_id.clone(), kind: AgentErrorKind::Timeout });
                    return;
                }

                let cancel = budget.cancellation_token();
                let stream_result = self.backend.stream(messages.clone(), tools.clone(), cancel).await;

                let mut stream = match stream_result {
                    Ok(stream) => stream,
                    Err(RunAgentError::BackendTransient(reason)) if retries < MAX_TRANSIENT_RETRIES => {
                        retries += 1;
                        warn!(%agent_id, retries, %reason, "transient backend error, retrying");
                        tokio::time::sleep(std::time::Duration::from_millis(200 * 2u64.pow(retries))).await;
                        continue 'turn;
                    }
                    Err(RunAgentError::BackendTransient(_)) => {
                        let _ = tx.send(AgentEvent::Error { agent_id: agent_id.clone(), kind: AgentErrorKind::BackendTransient });
                        return;
                    }
                    Err(_other) => {
                        let _ = tx.send(AgentEvent::Error { agent_id: agent_id.clone(), kind: AgentErrorKind::BackendFatal });
                        return;
                    }
                };

                let mut saw_tool_result_this_round = false;

                while let Some(chunk) = stream.next().await {
                    if let Some(exceeded) = budget.check_and_cancel_if_exceeded() {
                        debug!(%agent_id, ?exceeded, "agent budget exceeded");
                        let kind = match exceeded {
                            crate::timeout_governor::BudgetExceeded::WallClock => AgentErrorKind::Timeout,
                            crate::timeout_governor::BudgetExceeded::Tokens => AgentErrorKind::TokenCap,
                        };
                        let _ = tx.send(AgentEvent::Error { agent_id: agent_id.clone(), kind });
                        return;
                    }
                    if budget.is_cancelled() {
                        let _ = tx.send(AgentEvent::Error { agent_id: agent_id.clone(), kind: AgentErrorKind::Timeout });
                        return;
                    }

                    match chunk {
                        Chunk::Content { text } => {
                            let _ = tx.send(AgentEvent::Content { agent_id: agent_id.clone(), text });
                        }
                        Chunk::Usage { input_tokens, output_tokens } => {
                            budget.record_tokens(input_tokens + output_tokens);
                        }
                        Chunk::ToolResult { .. } => {
                            // Produced by the backend echoing a prior call; not
                            // expected on the initial leg, ignored defensively.
                        }
                        Chunk::ToolCall { id, name, arguments_json } => {
                            if massgen_domain::is_control_tool_name(&name) {
                                let _ = tx.send(AgentEvent::ToolCall {
                                    agent_id: agent_id.clone(),
                                    call_id: id,
                                    name,
                                    arguments_json,
                                });
                                continue;
                            }

                            let call = match serde_json::from_str::<serde_json::Value>(&arguments_json) {
                                Ok(serde_json::Value::Object(map)) => {
                                    let mut call = ToolCall::new(id.clone(), name.clone());
                                    call.arguments = map.into_iter().collect();
                                    call
                                }
                                _ => ToolCall::new(id.clone(), name.clone()),
                            };

                            let result = if policy.permits_execution(&name) {
                                self.tool_invoker.invoke(&agent_id, &call, policy.role).await
                            } else {
                                let notice = self.templates.planned_action_notice(&name, &arguments_json);
                                let _ = tx.send(AgentEvent::PlannedAction {
                                    agent_id: agent_id.clone(),
                                    notice: notice.clone(),
                                });
                                massgen_domain::ToolResult::ok(id.clone(), notice)
                            };

                            messages.push(Message::assistant(format!("[tool_call {name}]")));
                            messages.push(Message::tool(result.payload.clone()));
                            saw_tool_result_this_round = true;
                        }
                        Chunk::End { reason } => {
                            let _ = tx.send(AgentEvent::End { agent_id: agent_id.clone(), reason });
                            return;
                        }
                    }
                }

                if saw_tool_result_this_round {
                    // The backend closed its stream after emitting tool
                    // results that were handled locally; continue the turn
                    // with the updated transcript rather than terminating.
                    continue 'turn;
                }

                let _ = tx.send(AgentEvent::End { agent_id: agent_id.clone(), reason: EndReason::Stop });
                return;
            }
        });

        rx
    }
}
