//! `EventBus` (§2 item 9, §5): fan-out of `AgentEvent`s to UI/logger
//! subscribers, strictly non-blocking to producers. Built on
//! `tokio::sync::broadcast`, whose `Lagged(n)` receiver error is the direct
//! Rust expression of "bounded per-subscriber buffer + backpressure-by-lag"
//! — chosen over the donor's synchronous Lua `EventBus`
//! (`infrastructure/src/scripting/event_bus.rs`), which has no async
//! multi-subscriber story.

use massgen_domain::AgentEvent;
use tokio::sync::broadcast;

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AgentEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish is infallible from the producer's point of view: with no
    /// subscribers, `send` returning `Err` just means nobody's listening,
    /// which is not a producer-facing failure.
    pub fn publish(&self, event: AgentEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
