//! Queue controller: data ownership, scheduling and the command surface.
//!
//! Auto-dispatch policy: after every state change, if the queue has work,
//! nothing is busy or paused, the host is idle and the user is not
//! mid-draft, send the head entry - debounced so bursts of mutations
//! collapse into one attempt, backed off after failures so a misbehaving
//! host is retried gently instead of hammered.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use chatqueue_codec::normalize_attachment;
use chatqueue_host::wait::sleep_ms;
use chatqueue_host::HostProbe;
use chatqueue_protocols::{
    Command, PauseReason, QueueEntry, StateEvent, StatusReport, ThinkingLevel,
};
use chatqueue_store::SnapshotStore;

use crate::composer::ComposerController;
use crate::config::DispatchConfig;
use crate::model::ModelController;
use crate::state::QueueHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveKind {
    /// Structural mutation: save on the next pump turn.
    Immediate,
    /// High-frequency edit: coalesce behind the save debounce.
    Debounced,
}

/// Owns the queue and drives dispatch.
pub struct QueueController {
    handle: Arc<QueueHandle>,
    composer: Arc<ComposerController>,
    models: Arc<ModelController>,
    probe: Arc<dyn HostProbe>,
    store: Arc<SnapshotStore>,
    conversation_key: String,
    config: DispatchConfig,
    dispatch_tx: mpsc::UnboundedSender<()>,
    dispatch_rx: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
    save_tx: mpsc::UnboundedSender<SaveKind>,
    save_rx: Mutex<Option<mpsc::UnboundedReceiver<SaveKind>>>,
    /// At most one parked manual send; a newer request replaces it.
    pending_manual: Mutex<Option<usize>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl QueueController {
    /// Build a controller from injected collaborators.
    pub fn new(
        handle: Arc<QueueHandle>,
        composer: Arc<ComposerController>,
        models: Arc<ModelController>,
        probe: Arc<dyn HostProbe>,
        store: Arc<SnapshotStore>,
        conversation_key: impl Into<String>,
        config: DispatchConfig,
    ) -> Arc<Self> {
        let (dispatch_tx, dispatch_rx) = mpsc::unbounded_channel();
        let (save_tx, save_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            handle,
            composer,
            models,
            probe,
            store,
            conversation_key: conversation_key.into(),
            config,
            dispatch_tx,
            dispatch_rx: Mutex::new(Some(dispatch_rx)),
            save_tx,
            save_rx: Mutex::new(Some(save_rx)),
            pending_manual: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// The shared state handle.
    pub fn handle(&self) -> Arc<QueueHandle> {
        self.handle.clone()
    }

    /// Restore the persisted snapshot for this conversation, if any.
    pub async fn restore_persisted(&self) {
        if let Some(snapshot) = self.store.load(&self.conversation_key).await {
            info!(
                "Restored {} queued entr{} for {}",
                snapshot.queue.len(),
                if snapshot.queue.len() == 1 { "y" } else { "ies" },
                self.conversation_key
            );
            self.handle.restore(&snapshot);
        }
        self.nudge();
    }

    /// Start the dispatch loop and the debounced save pump.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            return;
        }

        let this = Arc::clone(self);
        let mut dispatch_rx = self
            .dispatch_rx
            .lock()
            .take()
            .expect("dispatch loop started twice");
        tasks.push(tokio::spawn(async move {
            loop {
                let nudged = tokio::select! {
                    received = dispatch_rx.recv() => match received {
                        Some(()) => true,
                        None => break,
                    },
                    _ = sleep_ms(this.config.idle_poll_ms) => false,
                };
                if nudged {
                    sleep_ms(this.config.dispatch_debounce_ms).await;
                    while dispatch_rx.try_recv().is_ok() {}
                }
                this.run_dispatch_tick().await;
            }
        }));

        // Single consumer so saves never land out of order; the snapshot
        // is projected at save time, so the last write always reflects
        // the freshest state.
        let this = Arc::clone(self);
        let mut save_rx = self
            .save_rx
            .lock()
            .take()
            .expect("save pump started twice");
        tasks.push(tokio::spawn(async move {
            while let Some(kind) = save_rx.recv().await {
                if kind == SaveKind::Debounced {
                    sleep_ms(this.config.save_debounce_ms).await;
                }
                while save_rx.try_recv().is_ok() {}
                this.persist().await;
            }
        }));
    }

    /// Stop the scheduler and watchers. The queue state stays intact.
    pub fn dispose(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        self.models.dispose();
        self.handle.events().emit(StateEvent::Disposed);
    }

    async fn run_dispatch_tick(&self) {
        // A parked manual send runs as soon as the flag frees up.
        let parked = self.pending_manual.lock().take();
        if let Some(index) = parked {
            if self.handle.read(|s| s.busy) {
                let mut pending = self.pending_manual.lock();
                if pending.is_none() {
                    *pending = Some(index);
                }
                return;
            }
            debug!("Running parked manual send for index {}", index);
            self.composer.send_from_queue(index, true).await;
            self.nudge();
            return;
        }

        if !self.should_dispatch().await {
            return;
        }
        if self.composer.send_from_queue(0, false).await {
            // More entries may be waiting.
            self.nudge();
        } else {
            sleep_ms(self.config.failure_backoff_ms).await;
            self.nudge();
        }
    }

    /// The auto-dispatch gate: work waiting, nothing in flight, not
    /// paused, host idle, and the user not mid-draft.
    async fn should_dispatch(&self) -> bool {
        let ready = self
            .handle
            .read(|s| s.running && !s.busy && !s.paused && !s.queue.is_empty());
        if !ready {
            return false;
        }
        if self.probe.is_generating().await {
            return false;
        }
        self.probe.editor_is_empty().await
    }

    fn nudge(&self) {
        let _ = self.dispatch_tx.send(());
    }

    // ------------------------------------------------------------------
    // Queue operations
    // ------------------------------------------------------------------

    /// Append an entry.
    pub fn enqueue(&self, entry: QueueEntry) -> usize {
        let index = self.handle.enqueue(entry);
        self.persist_now();
        self.nudge();
        index
    }

    /// Remove the entry at `index`.
    pub fn remove_at(&self, index: usize) -> Option<QueueEntry> {
        let removed = self.handle.remove_at(index);
        if removed.is_some() {
            self.persist_now();
            self.nudge();
        }
        removed
    }

    /// Reorder: drag-and-drop and the editable position indicator both
    /// funnel through this splice-move.
    pub fn move_item(&self, from: usize, to: usize) -> bool {
        let moved = self.handle.move_item(from, to);
        if moved {
            self.persist_now();
            self.nudge();
        }
        moved
    }

    /// Inline text edit. Persistence is debounced: one write per pause
    /// in typing, not one per keystroke.
    pub fn update_text(&self, index: usize, text: impl Into<String>) -> bool {
        let text = text.into();
        let updated = self.handle.update_entry(index, |e| e.text = text);
        if updated {
            let _ = self.save_tx.send(SaveKind::Debounced);
        }
        updated
    }

    /// Set or clear an entry's model override.
    pub fn set_entry_model(&self, index: usize, model: Option<String>) -> bool {
        let label = model.as_deref().and_then(|id| {
            self.handle
                .read(|s| s.models.iter().find(|m| m.id == id).map(|m| m.label.clone()))
        });
        let updated = self.handle.update_entry(index, |e| {
            e.model = model;
            e.model_label = label;
        });
        if updated {
            self.persist_now();
        }
        updated
    }

    /// Set or clear an entry's thinking override.
    pub fn set_entry_thinking(&self, index: usize, thinking: Option<ThinkingLevel>) -> bool {
        let updated = self.handle.update_entry(index, |e| e.thinking = thinking);
        if updated {
            self.persist_now();
        }
        updated
    }

    /// Attach a loosely-typed attachment object to an entry. Rejects
    /// inputs the codec cannot resolve to self-contained data.
    pub fn add_attachment(&self, index: usize, raw: &Value) -> bool {
        let Some(attachment) = normalize_attachment(raw) else {
            return false;
        };
        let updated = self
            .handle
            .update_entry(index, |e| e.attachments.push(attachment));
        if updated {
            self.persist_now();
        }
        updated
    }

    /// Remove an attachment from an entry by id.
    pub fn remove_attachment(&self, index: usize, attachment_id: &str) -> bool {
        let mut removed = false;
        let updated = self.handle.update_entry(index, |e| {
            let before = e.attachments.len();
            e.attachments.retain(|a| a.id != attachment_id);
            removed = e.attachments.len() != before;
        });
        if updated && removed {
            self.persist_now();
        }
        updated && removed
    }

    // ------------------------------------------------------------------
    // Pause / collapse / reset
    // ------------------------------------------------------------------

    /// Pause auto-dispatch.
    pub fn pause(&self, reason: PauseReason) {
        self.handle.pause(reason);
        self.persist_now();
    }

    /// Resume auto-dispatch.
    pub fn resume(&self) {
        self.handle.resume();
        self.persist_now();
        self.nudge();
    }

    /// Enable or disable auto-dispatch wholesale.
    pub fn set_running(&self, running: bool) {
        self.handle.set_running(running);
        self.persist_now();
        if running {
            self.nudge();
        }
    }

    /// Collapse or expand the panel.
    pub fn set_collapsed(&self, collapsed: bool) {
        self.handle.set_collapsed(collapsed);
        self.persist_now();
    }

    /// Drop the queue for this conversation, memory and store both.
    pub async fn reset_conversation(&self) {
        self.handle.with(|s| s.queue.clear());
        self.handle.events().emit(StateEvent::QueueChanged);
        self.store.clear(&self.conversation_key).await;
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Request a send of the entry at `index`.
    ///
    /// Manual requests bypass the pause gate; if a send is already in
    /// flight, the request parks as the single pending manual intent
    /// (newest wins) and runs when the protocol concludes. Automatic
    /// requests just nudge the scheduler.
    pub async fn request_send(&self, index: usize, manual: bool) -> bool {
        if !manual {
            self.nudge();
            return true;
        }
        if self.handle.read(|s| s.busy) {
            debug!("Send in flight; parking manual request for index {}", index);
            *self.pending_manual.lock() = Some(index);
            self.nudge();
            return true;
        }
        let ok = self.composer.send_from_queue(index, true).await;
        self.nudge();
        ok
    }

    // ------------------------------------------------------------------
    // Command surface
    // ------------------------------------------------------------------

    /// Current status, as the popup displays it.
    pub fn status(&self) -> StatusReport {
        self.handle.read(|s| StatusReport {
            queued: s.queue.len(),
            phase: s.phase,
            running: s.running,
            busy: s.busy,
            paused: s.paused,
            collapsed: s.collapsed,
            active_model: self.models.current_model_id(),
        })
    }

    /// Entry point for the inter-process command messages.
    pub async fn handle_command(&self, command: Command) -> Option<StatusReport> {
        match command {
            Command::ToggleQueue => {
                if self.handle.read(|s| s.paused) {
                    self.resume();
                } else {
                    self.pause(PauseReason::Shortcut);
                }
                None
            }
            Command::QueueFromShortcut => {
                self.composer.queue_composer_input().await;
                self.nudge();
                None
            }
            Command::ToggleUi => {
                let collapsed = self.handle.read(|s| s.collapsed);
                self.set_collapsed(!collapsed);
                None
            }
            Command::ShowUi => {
                self.set_collapsed(false);
                None
            }
            Command::GetStatus => Some(self.status()),
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Structural mutations persist on the next save-pump turn,
    /// fire-and-forget from the caller's perspective.
    fn persist_now(&self) {
        let _ = self.save_tx.send(SaveKind::Immediate);
    }

    async fn persist(&self) {
        self.store
            .save(&self.conversation_key, &self.handle.snapshot())
            .await;
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
