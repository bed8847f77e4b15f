//! Controller configuration.

use serde::{Deserialize, Serialize};

/// Timeouts for the send state machine, in milliseconds.
///
/// Tests shrink these; production values match how long the host is
/// realistically allowed to take at each stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Waiting for a clicked stop control to end generation.
    #[serde(default = "default_stop_wait_ms")]
    pub stop_wait_ms: u64,

    /// Waiting for the host to reflect newly added attachments.
    #[serde(default = "default_attachment_wait_ms")]
    pub attachment_wait_ms: u64,

    /// Waiting for the send button to become enabled.
    #[serde(default = "default_send_enabled_wait_ms")]
    pub send_enabled_wait_ms: u64,

    /// Waiting for evidence that a send click committed.
    #[serde(default = "default_commit_wait_ms")]
    pub commit_wait_ms: u64,

    /// Ceiling on waiting for generation to finish.
    #[serde(default = "default_completion_wait_ms")]
    pub completion_wait_ms: u64,

    /// Waiting for the thinking-level menu to render.
    #[serde(default = "default_thinking_wait_ms")]
    pub thinking_wait_ms: u64,

    /// Poll interval for all of the above.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_stop_wait_ms() -> u64 {
    10_000
}

fn default_attachment_wait_ms() -> u64 {
    4_000
}

fn default_send_enabled_wait_ms() -> u64 {
    5_000
}

fn default_commit_wait_ms() -> u64 {
    8_000
}

fn default_completion_wait_ms() -> u64 {
    120_000
}

fn default_thinking_wait_ms() -> u64 {
    1_200
}

fn default_poll_interval_ms() -> u64 {
    120
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            stop_wait_ms: default_stop_wait_ms(),
            attachment_wait_ms: default_attachment_wait_ms(),
            send_enabled_wait_ms: default_send_enabled_wait_ms(),
            commit_wait_ms: default_commit_wait_ms(),
            completion_wait_ms: default_completion_wait_ms(),
            thinking_wait_ms: default_thinking_wait_ms(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ComposerConfig {
    /// Short timeouts for tests against fixture hosts.
    pub fn fast() -> Self {
        Self {
            stop_wait_ms: 200,
            attachment_wait_ms: 200,
            send_enabled_wait_ms: 200,
            commit_wait_ms: 200,
            completion_wait_ms: 400,
            thinking_wait_ms: 200,
            poll_interval_ms: 10,
        }
    }
}

/// Model-switcher interaction timeouts, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Locating the target menu item, submenus included.
    #[serde(default = "default_menu_timeout_ms")]
    pub menu_timeout_ms: u64,

    /// Settle time after opening a submenu trigger.
    #[serde(default = "default_submenu_wait_ms")]
    pub submenu_wait_ms: u64,

    /// Poll interval while the menu renders.
    #[serde(default = "default_menu_poll_ms")]
    pub menu_poll_ms: u64,

    /// Header-label watcher debounce.
    #[serde(default = "default_header_debounce_ms")]
    pub header_debounce_ms: u64,
}

fn default_menu_timeout_ms() -> u64 {
    3_000
}

fn default_submenu_wait_ms() -> u64 {
    400
}

fn default_menu_poll_ms() -> u64 {
    80
}

fn default_header_debounce_ms() -> u64 {
    500
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            menu_timeout_ms: default_menu_timeout_ms(),
            submenu_wait_ms: default_submenu_wait_ms(),
            menu_poll_ms: default_menu_poll_ms(),
            header_debounce_ms: default_header_debounce_ms(),
        }
    }
}

impl ModelConfig {
    /// Short timeouts for tests against fixture hosts.
    pub fn fast() -> Self {
        Self {
            menu_timeout_ms: 300,
            submenu_wait_ms: 20,
            menu_poll_ms: 10,
            header_debounce_ms: 20,
        }
    }
}

/// Auto-dispatch scheduling knobs, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Debounce between a state change and the dispatch attempt.
    #[serde(default = "default_dispatch_debounce_ms")]
    pub dispatch_debounce_ms: u64,

    /// Backoff before retrying after a failed send.
    #[serde(default = "default_failure_backoff_ms")]
    pub failure_backoff_ms: u64,

    /// Debounce for persisting high-frequency text edits.
    #[serde(default = "default_save_debounce_ms")]
    pub save_debounce_ms: u64,

    /// Re-check interval while waiting for the host to go idle.
    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
}

fn default_dispatch_debounce_ms() -> u64 {
    120
}

fn default_failure_backoff_ms() -> u64 {
    240
}

fn default_save_debounce_ms() -> u64 {
    150
}

fn default_idle_poll_ms() -> u64 {
    1_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            dispatch_debounce_ms: default_dispatch_debounce_ms(),
            failure_backoff_ms: default_failure_backoff_ms(),
            save_debounce_ms: default_save_debounce_ms(),
            idle_poll_ms: default_idle_poll_ms(),
        }
    }
}

impl DispatchConfig {
    /// Short timings for tests.
    pub fn fast() -> Self {
        Self {
            dispatch_debounce_ms: 10,
            failure_backoff_ms: 20,
            save_debounce_ms: 10,
            idle_poll_ms: 20,
        }
    }
}
