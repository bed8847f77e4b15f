//! Host access configuration.

use serde::{Deserialize, Serialize};

/// Configuration for reaching the host page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    /// Chrome debugging endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-command CDP timeout in milliseconds.
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Poll interval for DOM-state waits in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Round-trip timeout for the editor bridge in milliseconds.
    #[serde(default = "default_bridge_timeout_ms")]
    pub bridge_timeout_ms: u64,
}

fn default_endpoint() -> String {
    "http://localhost:9222".to_string()
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_poll_interval_ms() -> u64 {
    120
}

fn default_bridge_timeout_ms() -> u64 {
    1_500
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            call_timeout_ms: default_call_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            bridge_timeout_ms: default_bridge_timeout_ms(),
        }
    }
}
