//! Shared queue state handle.
//!
//! The in-memory queue is the single source of truth; the rendered list
//! and the persisted snapshot are projections recomputed after every
//! mutation. All mutation goes through this handle so every change is
//! synchronous (no awaits while a mutation is in progress) and emits its
//! state-change event exactly once.

use chrono::Utc;
use parking_lot::Mutex;

use chatqueue_protocols::{
    EventBus, PauseReason, PersistedQueueState, QueueEntry, QueuePhase, QueueState, StateEvent,
};

/// Shared handle over [`QueueState`] plus the event bus.
pub struct QueueHandle {
    state: Mutex<QueueState>,
    events: EventBus,
}

impl QueueHandle {
    /// Create a handle over fresh state.
    pub fn new(events: EventBus) -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            events,
        }
    }

    /// The event bus this handle emits on.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Read the state under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&QueueState) -> R) -> R {
        f(&self.state.lock())
    }

    /// Mutate the state under the lock. Synchronous by construction -
    /// the closure cannot await.
    pub fn with<R>(&self, f: impl FnOnce(&mut QueueState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Project the persisted snapshot.
    pub fn snapshot(&self) -> PersistedQueueState {
        PersistedQueueState::from(&*self.state.lock())
    }

    /// Restore a loaded snapshot.
    pub fn restore(&self, snapshot: &PersistedQueueState) {
        self.with(|s| snapshot.apply_to(s));
        self.events.emit(StateEvent::QueueChanged);
    }

    // ------------------------------------------------------------------
    // Queue mutations
    // ------------------------------------------------------------------

    /// Append an entry; returns its index.
    pub fn enqueue(&self, entry: QueueEntry) -> usize {
        let index = self.with(|s| {
            s.queue.push(entry);
            s.queue.len() - 1
        });
        self.events.emit(StateEvent::QueueChanged);
        index
    }

    /// Insert an entry at `index` (clamped to the queue length).
    pub fn insert_at(&self, index: usize, entry: QueueEntry) {
        self.with(|s| {
            let index = index.min(s.queue.len());
            s.queue.insert(index, entry);
        });
        self.events.emit(StateEvent::QueueChanged);
    }

    /// Remove and return the entry at `index`.
    pub fn remove_at(&self, index: usize) -> Option<QueueEntry> {
        let removed = self.with(|s| {
            if index < s.queue.len() {
                Some(s.queue.remove(index))
            } else {
                None
            }
        });
        if removed.is_some() {
            self.events.emit(StateEvent::QueueChanged);
        }
        removed
    }

    /// Splice-move an entry from `from` to `to`.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        let moved = self.with(|s| {
            if from >= s.queue.len() || to >= s.queue.len() {
                return false;
            }
            let entry = s.queue.remove(from);
            s.queue.insert(to, entry);
            true
        });
        if moved {
            self.events.emit(StateEvent::QueueChanged);
        }
        moved
    }

    /// Edit the entry at `index` in place.
    pub fn update_entry(&self, index: usize, f: impl FnOnce(&mut QueueEntry)) -> bool {
        let updated = self.with(|s| match s.queue.get_mut(index) {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        });
        if updated {
            self.events.emit(StateEvent::QueueChanged);
        }
        updated
    }

    // ------------------------------------------------------------------
    // Send-protocol bookkeeping
    // ------------------------------------------------------------------

    /// Atomically claim the busy flag for a send.
    ///
    /// Fails when a send is already in flight, when paused (unless
    /// overridden) or when the queue is empty. On success the flag is
    /// set before the caller reaches its first await point, which is
    /// what makes the protocol single-flight.
    pub fn try_begin_send(&self, allow_while_paused: bool) -> bool {
        let begun = self.with(|s| {
            if s.busy || (s.paused && !allow_while_paused) || s.queue.is_empty() {
                return false;
            }
            s.busy = true;
            s.phase = QueuePhase::Sending;
            true
        });
        if begun {
            self.events.emit(StateEvent::SendStarted);
        }
        begun
    }

    /// Move to a new protocol phase.
    pub fn set_phase(&self, phase: QueuePhase) {
        let changed = self.with(|s| {
            if s.phase == phase {
                return false;
            }
            s.phase = phase;
            true
        });
        if changed {
            self.events.emit(StateEvent::PhaseChanged);
        }
    }

    /// End the send protocol, successful or not.
    pub fn finish_send(&self, ok: bool) {
        self.with(|s| {
            s.busy = false;
            s.phase = QueuePhase::Idle;
        });
        self.events.emit(StateEvent::SendFinished { ok });
    }

    // ------------------------------------------------------------------
    // Pause / collapse
    // ------------------------------------------------------------------

    /// Pause auto-dispatch.
    pub fn pause(&self, reason: PauseReason) {
        let changed = self.with(|s| {
            if s.paused {
                return false;
            }
            s.paused = true;
            s.pause_reason = Some(reason);
            s.paused_at = Some(Utc::now());
            true
        });
        if changed {
            self.events.emit(StateEvent::PauseChanged);
        }
    }

    /// Resume auto-dispatch.
    pub fn resume(&self) {
        let changed = self.with(|s| {
            if !s.paused {
                return false;
            }
            s.paused = false;
            s.pause_reason = None;
            s.paused_at = None;
            true
        });
        if changed {
            self.events.emit(StateEvent::PauseChanged);
        }
    }

    /// Enable or disable auto-dispatch wholesale. Unlike pause this is
    /// a persistent switch with no reason/timestamp bookkeeping.
    pub fn set_running(&self, running: bool) {
        let changed = self.with(|s| {
            if s.running == running {
                return false;
            }
            s.running = running;
            true
        });
        if changed {
            self.events.emit(StateEvent::RunningChanged);
        }
    }

    /// Collapse or expand the panel.
    pub fn set_collapsed(&self, collapsed: bool) {
        let changed = self.with(|s| {
            if s.collapsed == collapsed {
                return false;
            }
            s.collapsed = collapsed;
            true
        });
        if changed {
            self.events.emit(StateEvent::CollapsedChanged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> QueueHandle {
        QueueHandle::new(EventBus::default())
    }

    #[test]
    fn test_order_follows_operations() {
        let h = handle();
        h.enqueue(QueueEntry::new("a"));
        h.enqueue(QueueEntry::new("b"));
        h.enqueue(QueueEntry::new("c"));
        h.move_item(2, 0);
        h.remove_at(1);

        let texts: Vec<String> = h.read(|s| s.queue.iter().map(|e| e.text.clone()).collect());
        assert_eq!(texts, vec!["c", "b"]);
    }

    #[test]
    fn test_move_item_out_of_range() {
        let h = handle();
        h.enqueue(QueueEntry::new("a"));
        assert!(!h.move_item(0, 5));
        assert!(!h.move_item(3, 0));
    }

    #[test]
    fn test_try_begin_send_is_exclusive() {
        let h = handle();
        h.enqueue(QueueEntry::new("a"));

        assert!(h.try_begin_send(false));
        assert!(!h.try_begin_send(false));

        h.finish_send(true);
        assert!(h.try_begin_send(false));
    }

    #[test]
    fn test_try_begin_send_respects_pause_gate() {
        let h = handle();
        h.enqueue(QueueEntry::new("a"));
        h.pause(PauseReason::Manual);

        assert!(!h.try_begin_send(false));
        assert!(h.try_begin_send(true));
    }

    #[test]
    fn test_try_begin_send_empty_queue() {
        let h = handle();
        assert!(!h.try_begin_send(false));
    }

    #[test]
    fn test_insert_at_clamps() {
        let h = handle();
        h.enqueue(QueueEntry::new("a"));
        h.insert_at(99, QueueEntry::new("b"));
        assert_eq!(h.read(|s| s.queue[1].text.clone()), "b");
    }

    #[test]
    fn test_set_running_is_change_detected() {
        let h = handle();
        let mut rx = h.events().subscribe();

        h.set_running(false);
        assert!(!h.read(|s| s.running));
        assert_eq!(rx.try_recv().ok(), Some(StateEvent::RunningChanged));

        // No change, no event.
        h.set_running(false);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_resume_clears_pause_metadata() {
        let h = handle();
        h.pause(PauseReason::Shortcut);
        assert!(h.read(|s| s.paused_at.is_some()));

        h.resume();
        h.read(|s| {
            assert!(!s.paused);
            assert!(s.pause_reason.is_none());
            assert!(s.paused_at.is_none());
        });
    }
}
