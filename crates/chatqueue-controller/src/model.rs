//! Model controller: catalog upkeep and driving the host's switcher menu.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use chatqueue_host::wait::{sleep_ms, wait_until};
use chatqueue_host::{HostProbe, InteractionDispatcher, ProbeTarget};
use chatqueue_protocols::{ModelDefinition, StateEvent};

use crate::catalog::default_catalog;
use crate::config::ModelConfig;
use crate::matching::match_model_label;
use crate::state::QueueHandle;

#[derive(Default)]
struct ActiveModel {
    id: Option<String>,
    label: Option<String>,
}

/// Tracks the host's active model and drives its switcher menu.
///
/// The host offers no model API, so selection means opening its menu and
/// activating an item, and the active model is re-derived from whatever
/// label the switcher button displays.
pub struct ModelController {
    handle: Arc<QueueHandle>,
    probe: Arc<dyn HostProbe>,
    interact: Arc<dyn InteractionDispatcher>,
    config: ModelConfig,
    current: Mutex<ActiveModel>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl ModelController {
    /// Build a controller from injected capabilities.
    pub fn new(
        handle: Arc<QueueHandle>,
        probe: Arc<dyn HostProbe>,
        interact: Arc<dyn InteractionDispatcher>,
        config: ModelConfig,
    ) -> Self {
        Self {
            handle,
            probe,
            interact,
            config,
            current: Mutex::new(ActiveModel::default()),
            watcher: Mutex::new(None),
        }
    }

    /// The shared state handle this controller mutates.
    pub fn handle(&self) -> Arc<QueueHandle> {
        self.handle.clone()
    }

    /// Canonical id of the model believed active.
    pub fn current_model_id(&self) -> Option<String> {
        self.current.lock().id.clone()
    }

    /// Displayed label of the model believed active.
    pub fn current_model_label(&self) -> Option<String> {
        self.current.lock().label.clone()
    }

    /// Populate or refresh the catalog and sync the selected flag from
    /// the host's header label. Emits `ModelsChanged` only when the
    /// catalog or selection actually changed, so repeated calls with a
    /// quiet host are free.
    pub async fn ensure_model_options(&self, force: bool) -> Vec<ModelDefinition> {
        let mut changed = false;

        if force || self.handle.read(|s| s.models.is_empty()) {
            let catalog = default_catalog();
            changed |= self.handle.with(|s| {
                let same = s.models.len() == catalog.len()
                    && s.models.iter().zip(&catalog).all(|(a, b)| a.id == b.id);
                if same {
                    false
                } else {
                    s.models = catalog;
                    true
                }
            });
        }

        if let Some(label) = self.probe.header_model_label().await {
            let catalog = self.handle.read(|s| s.models.clone());
            if let Some(id) = match_model_label(&label, &catalog) {
                changed |= self.apply_selection(&id, Some(label));
            }
        }

        if changed {
            self.handle.events().emit(StateEvent::ModelsChanged);
        }
        self.handle.read(|s| s.models.clone())
    }

    /// Record `id` as the active model and keep exactly one catalog
    /// entry selected. Used after our own switches and after detecting
    /// out-of-band changes made directly in the host UI.
    pub fn mark_model_selected(&self, id: &str, label: Option<String>) {
        if self.apply_selection(id, label) {
            self.handle.events().emit(StateEvent::ModelsChanged);
        }
    }

    fn apply_selection(&self, id: &str, label: Option<String>) -> bool {
        let label = label.or_else(|| {
            self.handle
                .read(|s| s.models.iter().find(|m| m.id == id).map(|m| m.label.clone()))
        });

        let mut current = self.current.lock();
        let changed_current = current.id.as_deref() != Some(id) || current.label != label;
        current.id = Some(id.to_string());
        current.label = label;
        drop(current);

        let changed_flags = self.handle.with(|s| {
            let mut changed = false;
            for model in &mut s.models {
                let want = model.id == id;
                if model.selected != want {
                    model.selected = want;
                    changed = true;
                }
            }
            changed
        });

        changed_current || changed_flags
    }

    /// Make `model_id` the host's active model.
    ///
    /// No-op fast path when already active. Otherwise walks the host's
    /// switcher menu - nested submenus included - and activates the
    /// matching item. Returns `false` when the item cannot be located in
    /// time; the menu's original open/closed state is restored on every
    /// exit path.
    pub async fn ensure_model(&self, model_id: &str) -> bool {
        if self.current_model_id().as_deref() == Some(model_id) {
            return true;
        }
        if self.handle.read(|s| s.models.is_empty()) {
            self.ensure_model_options(false).await;
        }

        let Some(switcher) = self.probe.find(ProbeTarget::ModelSwitcher).await else {
            warn!("Model switcher not found");
            return false;
        };

        let was_open = self.probe.menu_open().await;
        if !was_open {
            if !self.interact.activate(switcher).await {
                return false;
            }
            let probe = self.probe.clone();
            let opened = wait_until(self.config.menu_timeout_ms, self.config.menu_poll_ms, || {
                let probe = probe.clone();
                async move { probe.menu_open().await }
            })
            .await;
            if !opened {
                warn!("Model menu did not open");
                return false;
            }
        }

        let selected = self.locate_and_activate(model_id).await;

        // Restore the menu to how we found it, success or not.
        if !was_open && self.probe.menu_open().await {
            if let Some(switcher) = self.probe.find(ProbeTarget::ModelSwitcher).await {
                self.interact.activate(switcher).await;
            }
        }

        if selected {
            let label = self.probe.header_model_label().await;
            self.mark_model_selected(model_id, label);
            info!("Switched model to {}", model_id);
        }
        selected
    }

    /// Scan menu items for the target model, opening closed submenus in
    /// turn, until found or the deadline passes.
    async fn locate_and_activate(&self, model_id: &str) -> bool {
        let catalog = self.handle.read(|s| s.models.clone());
        let deadline = tokio::time::Instant::now()
            + std::time::Duration::from_millis(self.config.menu_timeout_ms);
        let mut opened_submenus = 0usize;

        loop {
            for el in self.probe.find_all(ProbeTarget::ModelMenuItem).await {
                let text = self.probe.text(el).await;
                let first_line = text.lines().next().unwrap_or("").trim();
                if match_model_label(first_line, &catalog).as_deref() == Some(model_id) {
                    debug!("Activating menu item '{}'", first_line);
                    if !self.interact.activate(el).await {
                        return false;
                    }
                    sleep_ms(self.config.submenu_wait_ms).await;
                    return true;
                }
            }

            // Not in view: open the next unopened submenu and re-scan.
            let triggers = self.probe.find_all(ProbeTarget::SubmenuTrigger).await;
            if let Some(trigger) = triggers.get(opened_submenus) {
                opened_submenus += 1;
                self.interact.activate(*trigger).await;
                sleep_ms(self.config.submenu_wait_ms).await;
                continue;
            }

            if tokio::time::Instant::now() >= deadline {
                warn!("Model '{}' not found in switcher menu", model_id);
                return false;
            }
            sleep_ms(self.config.menu_poll_ms).await;
        }
    }

    /// Re-derive the active model from a displayed header label. The
    /// header is never a clean identifier, so this goes through the
    /// scoring matcher and ignores labels nothing matches.
    pub fn reconcile_header(&self, label: &str) {
        let catalog = self.handle.read(|s| s.models.clone());
        if let Some(id) = match_model_label(label, &catalog) {
            self.mark_model_selected(&id, Some(label.to_string()));
        }
    }

    /// Watch the header label for out-of-band model changes (the user
    /// switching models directly in the host UI), debounced.
    pub fn spawn_header_watch(self: &Arc<Self>) {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut last_seen: Option<String> = None;
            loop {
                sleep_ms(this.config.header_debounce_ms).await;
                let label = this.probe.header_model_label().await;
                if label != last_seen {
                    last_seen = label.clone();
                    if let Some(label) = label {
                        this.reconcile_header(&label);
                    }
                }
            }
        });
        *self.watcher.lock() = Some(task);
    }

    /// Stop the header watcher.
    pub fn dispose(&self) {
        if let Some(task) = self.watcher.lock().take() {
            task.abort();
        }
    }
}

impl Drop for ModelController {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod tests;
