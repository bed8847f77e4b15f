//! Composer controller: the send state machine.
//!
//! A send walks `idle -> sending -> waiting -> idle`, every step gated on
//! the previous one and bounded by a timeout. The entry is removed from
//! the queue optimistically at the start; any failure before the click
//! commits puts it back at its original index, so a transient host
//! hiccup costs nothing but a retry on the next dispatch tick.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use chatqueue_codec::attachment_to_file;
use chatqueue_host::wait::{sleep_ms, wait_until};
use chatqueue_host::{EditorBridge, HostProbe, InteractionDispatcher, ProbeTarget};
use chatqueue_protocols::{QueueEntry, QueuePhase, ThinkingLevel};
use chatqueue_store::SnapshotStore;

use crate::catalog::supports_thinking;
use crate::config::ComposerConfig;
use crate::model::ModelController;
use crate::state::QueueHandle;

/// Runs the send protocol against the host composer.
pub struct ComposerController {
    handle: Arc<QueueHandle>,
    probe: Arc<dyn HostProbe>,
    interact: Arc<dyn InteractionDispatcher>,
    bridge: Arc<EditorBridge>,
    models: Arc<ModelController>,
    store: Arc<SnapshotStore>,
    conversation_key: String,
    config: ComposerConfig,
    scratch_dir: PathBuf,
}

impl ComposerController {
    /// Build a controller from injected capabilities. `scratch_dir` is
    /// where attachments are materialized for the host's file input.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        handle: Arc<QueueHandle>,
        probe: Arc<dyn HostProbe>,
        interact: Arc<dyn InteractionDispatcher>,
        bridge: Arc<EditorBridge>,
        models: Arc<ModelController>,
        store: Arc<SnapshotStore>,
        conversation_key: impl Into<String>,
        config: ComposerConfig,
        scratch_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            handle,
            probe,
            interact,
            bridge,
            models,
            store,
            conversation_key: conversation_key.into(),
            config,
            scratch_dir: scratch_dir.into(),
        }
    }

    /// Send the queue entry at `index` through the host composer.
    ///
    /// Returns `false` - with the queue exactly as it was - when a send
    /// is already in flight, the pause gate blocks, or any protocol step
    /// fails. The `busy` flag is claimed synchronously before the first
    /// await, so concurrent calls cannot interleave.
    pub async fn send_from_queue(&self, index: usize, allow_while_paused: bool) -> bool {
        if !self.handle.try_begin_send(allow_while_paused) {
            return false;
        }

        // Never queue a prompt on top of an in-flight generation: stop
        // it with the host's own control and wait for idle.
        if self.probe.is_generating().await {
            let clicked = match self.probe.find(ProbeTarget::StopButton).await {
                Some(stop) => self.interact.click(stop).await,
                None => false,
            };
            if !clicked || !self.wait_idle(self.config.stop_wait_ms).await {
                warn!("Host did not stop generating; send aborted");
                self.handle.finish_send(false);
                return false;
            }
        }

        // Optimistic removal; every later failure restores to `index`.
        let Some(entry) = self.handle.remove_at(index) else {
            self.handle.finish_send(false);
            return false;
        };
        self.persist().await;

        if let Some(model_id) = entry.model.clone() {
            if self.models.current_model_id().as_deref() != Some(model_id.as_str())
                && !self.models.ensure_model(&model_id).await
            {
                debug!("Model switch to {} failed", model_id);
                return self.restore(index, entry, &[]).await;
            }
        }

        if let Some(level) = entry.thinking {
            let id = entry.model.clone().or_else(|| self.models.current_model_id());
            let label = entry
                .model_label
                .clone()
                .or_else(|| self.models.current_model_label());
            if supports_thinking(id.as_deref().unwrap_or(""), label.as_deref())
                && !self.apply_thinking(level).await
            {
                debug!("Thinking level {:?} not applied", level);
                return self.restore(index, entry, &[]).await;
            }
        }

        if !self.bridge.set_prompt(&entry.text).await {
            return self.restore(index, entry, &[]).await;
        }

        let mut scratch_files = Vec::new();
        if !entry.attachments.is_empty() {
            match self.apply_attachments(&entry).await {
                Some(files) => scratch_files = files,
                None => return self.restore(index, entry, &[]).await,
            }
        }

        if !self.wait_send_enabled().await {
            return self.restore(index, entry, &scratch_files).await;
        }

        let Some(send) = self.probe.find(ProbeTarget::SendButton).await else {
            return self.restore(index, entry, &scratch_files).await;
        };
        if !self.interact.click(send).await {
            return self.restore(index, entry, &scratch_files).await;
        }
        self.handle.set_phase(QueuePhase::Waiting);

        // Did the click take? Streaming started or the draft left the
        // editor both count as committed.
        if !self.wait_committed().await {
            warn!("Send click did not take");
            return self.restore(index, entry, &scratch_files).await;
        }

        // Committed: from here the prompt is the host's, never restored.
        if !self.wait_complete().await {
            warn!("Generation still running at the completion ceiling");
        }
        let cooldown_ms = self.handle.read(|s| s.cooldown_ms);
        sleep_ms(cooldown_ms).await;

        self.cleanup_files(&scratch_files).await;
        self.handle.finish_send(true);
        self.persist().await;
        info!("Sent queued prompt ({} left)", self.handle.read(|s| s.queue.len()));
        true
    }

    /// Capture the host editor's draft (text plus drafted attachments)
    /// as a new queue entry tagged with the active model and thinking
    /// state, then clear the draft.
    pub async fn queue_composer_input(&self) -> bool {
        let text = self.probe.editor_text().await;
        let drafted = self.probe.drafted_attachments().await;
        if text.trim().is_empty() && drafted.is_empty() {
            return false;
        }

        let mut entry = QueueEntry::new(text).with_attachments(drafted);
        if let Some(id) = self.models.current_model_id() {
            entry.model_label = self.models.current_model_label();
            entry.model = Some(id);
        }
        entry.thinking = self.current_thinking().await;

        self.handle.enqueue(entry);
        self.persist().await;
        self.bridge.clear_prompt().await;
        true
    }

    /// Thinking level the host currently displays, when the active
    /// model has the control at all.
    async fn current_thinking(&self) -> Option<ThinkingLevel> {
        let id = self.models.current_model_id()?;
        let label = self.models.current_model_label();
        if !supports_thinking(&id, label.as_deref()) {
            return None;
        }
        let trigger = self.probe.find(ProbeTarget::ThinkingTrigger).await?;
        let text = self.probe.text(trigger).await.to_ascii_lowercase();
        ThinkingLevel::ALL
            .into_iter()
            .find(|level| text.contains(level.as_str()))
    }

    /// Select a thinking level in the host's menu, restoring the menu's
    /// prior state when the level cannot be applied.
    async fn apply_thinking(&self, level: ThinkingLevel) -> bool {
        let was_open = self.probe.exists(ProbeTarget::ThinkingMenu).await;
        if !was_open {
            let Some(trigger) = self.probe.find(ProbeTarget::ThinkingTrigger).await else {
                return false;
            };
            if !self.interact.activate(trigger).await {
                return false;
            }
            let probe = self.probe.clone();
            let opened = wait_until(
                self.config.thinking_wait_ms,
                self.config.poll_interval_ms,
                || {
                    let probe = probe.clone();
                    async move { probe.exists(ProbeTarget::ThinkingMenu).await }
                },
            )
            .await;
            if !opened {
                return false;
            }
        }

        let wanted = level.as_str();
        for el in self.probe.find_all(ProbeTarget::ThinkingMenuItem).await {
            let text = self.probe.text(el).await.to_ascii_lowercase();
            if text.contains(wanted) {
                return self.interact.activate(el).await;
            }
        }

        // Level not offered: close the menu if we opened it.
        if !was_open && self.probe.exists(ProbeTarget::ThinkingMenu).await {
            if let Some(trigger) = self.probe.find(ProbeTarget::ThinkingTrigger).await {
                self.interact.activate(trigger).await;
            }
        }
        false
    }

    /// Materialize attachments and push them through the host's file
    /// input. `None` aborts the send: entries are never quietly sent
    /// without the images the user attached.
    async fn apply_attachments(&self, entry: &QueueEntry) -> Option<Vec<PathBuf>> {
        let before = self.probe.attachment_count().await;

        let mut files = Vec::new();
        for attachment in &entry.attachments {
            match attachment_to_file(attachment, &self.scratch_dir).await {
                Some(path) => files.push(path),
                None => warn!("Skipping unreadable attachment '{}'", attachment.name),
            }
        }
        if files.is_empty() {
            warn!("No attachment could be materialized; aborting send");
            return None;
        }

        let input = match self.probe.find(ProbeTarget::FileInput).await {
            Some(input) => Some(input),
            None => {
                // Hidden until the attach control reveals it.
                if let Some(button) = self.probe.find(ProbeTarget::AttachButton).await {
                    self.interact.activate(button).await;
                    let probe = self.probe.clone();
                    wait_until(
                        self.config.attachment_wait_ms,
                        self.config.poll_interval_ms,
                        || {
                            let probe = probe.clone();
                            async move { probe.exists(ProbeTarget::FileInput).await }
                        },
                    )
                    .await;
                }
                self.probe.find(ProbeTarget::FileInput).await
            }
        };
        let Some(input) = input else {
            self.cleanup_files(&files).await;
            return None;
        };

        let paths: Vec<String> = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        if !self.interact.set_input_files(input, &paths).await {
            self.cleanup_files(&files).await;
            return None;
        }

        // The host reflects accepted files in its preview strip; wait
        // for the count to reach what we handed it.
        let expected = before + files.len();
        let probe = self.probe.clone();
        let reflected = wait_until(
            self.config.attachment_wait_ms,
            self.config.poll_interval_ms,
            || {
                let probe = probe.clone();
                async move { probe.attachment_count().await >= expected }
            },
        )
        .await;
        if !reflected {
            warn!("Host never showed the added attachments");
            self.cleanup_files(&files).await;
            return None;
        }
        Some(files)
    }

    /// Put a removed entry back where it came from and release the
    /// protocol. The queue ends up exactly as before the send started.
    async fn restore(&self, index: usize, entry: QueueEntry, scratch: &[PathBuf]) -> bool {
        self.cleanup_files(scratch).await;
        self.handle.insert_at(index, entry);
        self.handle.finish_send(false);
        self.persist().await;
        false
    }

    async fn cleanup_files(&self, files: &[PathBuf]) {
        for path in files {
            let _ = tokio::fs::remove_file(path).await;
        }
    }

    async fn persist(&self) {
        self.store
            .save(&self.conversation_key, &self.handle.snapshot())
            .await;
    }

    // ------------------------------------------------------------------
    // Bounded waits over host state
    // ------------------------------------------------------------------

    async fn wait_idle(&self, timeout_ms: u64) -> bool {
        let probe = self.probe.clone();
        wait_until(timeout_ms, self.config.poll_interval_ms, || {
            let probe = probe.clone();
            async move { !probe.is_generating().await }
        })
        .await
    }

    async fn wait_send_enabled(&self) -> bool {
        let probe = self.probe.clone();
        wait_until(
            self.config.send_enabled_wait_ms,
            self.config.poll_interval_ms,
            || {
                let probe = probe.clone();
                async move { probe.send_enabled().await }
            },
        )
        .await
    }

    async fn wait_committed(&self) -> bool {
        let probe = self.probe.clone();
        wait_until(
            self.config.commit_wait_ms,
            self.config.poll_interval_ms,
            || {
                let probe = probe.clone();
                async move { probe.is_generating().await || probe.editor_is_empty().await }
            },
        )
        .await
    }

    /// Generation is done when the stop control is gone and the send or
    /// voice control is back. Hosts flicker between done and not-done
    /// during trailing re-renders; the caller's cooldown absorbs that.
    async fn wait_complete(&self) -> bool {
        let probe = self.probe.clone();
        wait_until(
            self.config.completion_wait_ms,
            self.config.poll_interval_ms,
            || {
                let probe = probe.clone();
                async move {
                    !probe.is_generating().await
                        && (probe.send_enabled().await
                            || probe.exists(ProbeTarget::VoiceButton).await)
                }
            },
        )
        .await
    }
}

#[cfg(test)]
#[path = "composer_tests.rs"]
mod tests;
