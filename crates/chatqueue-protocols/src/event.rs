//! State-change event fan-out.

use tokio::sync::broadcast;

/// A state change other components may react to.
///
/// Events carry no payload: subscribers recompute whatever they need from
/// the shared [`QueueState`](crate::QueueState), which stays the single
/// source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEvent {
    QueueChanged,
    ModelsChanged,
    PhaseChanged,
    PauseChanged,
    RunningChanged,
    CollapsedChanged,
    SendStarted,
    SendFinished { ok: bool },
    Disposed,
}

/// Broadcast bus for [`StateEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StateEvent>,
}

impl EventBus {
    /// Create a bus with a bounded backlog.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emit an event. Lagging or absent receivers are not an error.
    pub fn emit(&self, event: StateEvent) {
        let _ = self.tx.send(event);
    }

    /// Subscribe to future events.
    pub fn subscribe(&self) -> broadcast::Receiver<StateEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_without_subscribers_is_ok() {
        let bus = EventBus::default();
        bus.emit(StateEvent::QueueChanged);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(StateEvent::SendFinished { ok: true });
        assert_eq!(rx.recv().await.unwrap(), StateEvent::SendFinished { ok: true });
    }
}
