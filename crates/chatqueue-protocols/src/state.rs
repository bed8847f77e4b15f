//! In-memory and persisted queue state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::QueueEntry;
use crate::model::ModelDefinition;

/// Send-protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueuePhase {
    Idle,
    Sending,
    Waiting,
}

/// Why the queue is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PauseReason {
    /// User paused through the panel.
    Manual,
    /// User paused through a keyboard shortcut.
    Shortcut,
    /// Paused after repeated dispatch failures.
    Error,
}

/// Shared queue state for one page load.
///
/// Owned exclusively by the queue controller. Other controllers receive
/// the shared handle and go through the controller's mutation methods for
/// shared fields; the rendered list and the persisted snapshot are both
/// recomputed projections of this struct, never maintained independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueState {
    /// Whether auto-dispatch is enabled at all.
    pub running: bool,
    /// A send protocol is in flight. Sole mutual-exclusion mechanism.
    pub busy: bool,
    pub paused: bool,
    #[serde(default)]
    pub pause_reason: Option<PauseReason>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
    pub phase: QueuePhase,
    /// Panel collapsed in the host page.
    pub collapsed: bool,
    /// Settle delay after the host reports generation complete.
    pub cooldown_ms: u64,
    pub queue: Vec<QueueEntry>,
    pub models: Vec<ModelDefinition>,
}

impl Default for QueueState {
    fn default() -> Self {
        Self {
            running: true,
            busy: false,
            paused: false,
            pause_reason: None,
            paused_at: None,
            phase: QueuePhase::Idle,
            collapsed: false,
            cooldown_ms: 1200,
            queue: Vec::new(),
            models: Vec::new(),
        }
    }
}

impl QueueState {
    /// The currently selected catalog entry, if any.
    pub fn selected_model(&self) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.selected)
    }

    /// Catalog entries grouped for display, preserving catalog order.
    ///
    /// Derived on demand - a projection, not a second copy of the list.
    pub fn models_by_section(&self) -> Vec<(Option<&str>, Vec<&ModelDefinition>)> {
        let mut sections: Vec<(Option<&str>, Vec<&ModelDefinition>)> = Vec::new();
        for model in &self.models {
            let section = model.section.as_deref();
            match sections.last_mut() {
                Some((last, entries)) if *last == section => entries.push(model),
                _ => sections.push((section, vec![model])),
            }
        }
        sections
    }
}

/// The serializable subset of [`QueueState`], keyed by conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedQueueState {
    pub running: bool,
    pub queue: Vec<QueueEntry>,
    pub collapsed: bool,
    pub paused: bool,
    #[serde(default)]
    pub pause_reason: Option<PauseReason>,
    #[serde(default)]
    pub paused_at: Option<DateTime<Utc>>,
}

impl From<&QueueState> for PersistedQueueState {
    fn from(state: &QueueState) -> Self {
        Self {
            running: state.running,
            queue: state.queue.clone(),
            collapsed: state.collapsed,
            paused: state.paused,
            pause_reason: state.pause_reason,
            paused_at: state.paused_at,
        }
    }
}

impl PersistedQueueState {
    /// Restore this snapshot into live state. Transient fields (`busy`,
    /// `phase`) are reset - a reloaded page never resumes mid-send.
    pub fn apply_to(&self, state: &mut QueueState) {
        state.running = self.running;
        state.queue = self.queue.clone();
        state.collapsed = self.collapsed;
        state.paused = self.paused;
        state.pause_reason = self.pause_reason;
        state.paused_at = self.paused_at;
        state.busy = false;
        state.phase = QueuePhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_roundtrip() {
        let mut state = QueueState::default();
        state.queue.push(QueueEntry::new("draw a cat"));
        state.paused = true;
        state.pause_reason = Some(PauseReason::Manual);

        let snapshot = PersistedQueueState::from(&state);
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: PersistedQueueState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn test_apply_resets_transient_fields() {
        let snapshot = PersistedQueueState {
            running: true,
            queue: vec![QueueEntry::new("hello")],
            collapsed: true,
            paused: false,
            pause_reason: None,
            paused_at: None,
        };

        let mut state = QueueState::default();
        state.busy = true;
        state.phase = QueuePhase::Waiting;

        snapshot.apply_to(&mut state);
        assert!(!state.busy);
        assert_eq!(state.phase, QueuePhase::Idle);
        assert_eq!(state.queue.len(), 1);
        assert!(state.collapsed);
    }

    #[test]
    fn test_models_by_section_groups_adjacent() {
        let mut state = QueueState::default();
        state.models = vec![
            ModelDefinition::new("a", "A").with_section("Featured"),
            ModelDefinition::new("b", "B").with_section("Featured"),
            ModelDefinition::new("c", "C").with_section("Legacy"),
        ];
        let sections = state.models_by_section();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].1.len(), 2);
        assert_eq!(sections[1].0, Some("Legacy"));
    }
}
