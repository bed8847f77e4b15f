//! Inter-process command messages.
//!
//! Thin triggers sent by the popup/background glue. The core exposes one
//! controller method per command; the glue itself lives outside this
//! workspace.

use serde::{Deserialize, Serialize};

use crate::state::QueuePhase;

/// A command message consumed by the queue controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Command {
    /// Pause or resume auto-dispatch.
    ToggleQueue,
    /// Capture the editor draft into the queue.
    QueueFromShortcut,
    /// Show or hide the queue panel.
    ToggleUi,
    /// Reveal the queue panel.
    ShowUi,
    /// Report current queue status.
    GetStatus,
}

/// Reply to [`Command::GetStatus`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub queued: usize,
    pub phase: QueuePhase,
    pub running: bool,
    pub busy: bool,
    pub paused: bool,
    pub collapsed: bool,
    #[serde(default)]
    pub active_model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_form() {
        let json = serde_json::to_string(&Command::QueueFromShortcut).unwrap();
        assert_eq!(json, r#"{"kind":"queue-from-shortcut"}"#);

        let parsed: Command = serde_json::from_str(r#"{"kind":"toggle-queue"}"#).unwrap();
        assert_eq!(parsed, Command::ToggleQueue);
    }
}
