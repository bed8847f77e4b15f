//! Page-realm editor bridge.
//!
//! The host's rich editor keeps its document model in the page's own
//! script realm, out of reach of direct DOM writes. Prompt injection is
//! therefore a message round-trip: a `CQ_SET_PROMPT` request posted into
//! the page, answered by `CQ_SET_PROMPT_DONE` from the injected bridge
//! script (which itself lives outside this workspace). The round-trip
//! carries a hard timeout, and timeout means failure - never assumed
//! success.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cdp::PageSession;

/// Request type posted into the page realm.
pub const SET_PROMPT_TYPE: &str = "CQ_SET_PROMPT";
/// Acknowledgement type posted back by the bridge script.
pub const SET_PROMPT_DONE_TYPE: &str = "CQ_SET_PROMPT_DONE";

/// Name of the page binding the acknowledgement relay calls.
const BRIDGE_BINDING: &str = "cqBridgeNotify";

/// Message transport between extension realm and page realm.
#[async_trait]
pub trait BridgeTransport: Send + Sync {
    /// Post a message into the page. `false` when delivery failed.
    async fn send(&self, message: Value) -> bool;

    /// Next message from the page, `None` when the channel is gone.
    async fn recv(&self) -> Option<Value>;
}

/// Request/response wrapper over a [`BridgeTransport`].
pub struct EditorBridge {
    transport: Arc<dyn BridgeTransport>,
    timeout: Duration,
}

impl EditorBridge {
    /// Create a bridge with the given round-trip timeout.
    pub fn new(transport: Arc<dyn BridgeTransport>, timeout_ms: u64) -> Self {
        Self {
            transport,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    /// Replace the editor draft with `text`.
    ///
    /// `true` only after the page acknowledged the mutation within the
    /// timeout. Unrelated messages arriving meanwhile are skipped.
    pub async fn set_prompt(&self, text: &str) -> bool {
        let request = json!({ "type": SET_PROMPT_TYPE, "text": text });
        if !self.transport.send(request).await {
            warn!("Bridge send failed");
            return false;
        }

        let deadline = Instant::now() + self.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!("Bridge acknowledgement timed out");
                return false;
            }

            let message = tokio::time::timeout(remaining, self.transport.recv()).await;
            match message {
                Ok(Some(value)) => {
                    if value.get("type").and_then(Value::as_str) == Some(SET_PROMPT_DONE_TYPE) {
                        debug!("Bridge acknowledged prompt injection");
                        return true;
                    }
                }
                Ok(None) => {
                    warn!("Bridge channel closed");
                    return false;
                }
                Err(_) => {
                    warn!("Bridge acknowledgement timed out");
                    return false;
                }
            }
        }
    }

    /// Clear the editor draft.
    pub async fn clear_prompt(&self) -> bool {
        self.set_prompt("").await
    }
}

/// Transport over a CDP session.
///
/// Outbound messages are `window.postMessage` calls evaluated in the
/// page; inbound acknowledgements arrive through a `Runtime.addBinding`
/// relay the transport installs next to the bridge script.
pub struct CdpBridgeTransport {
    session: Arc<PageSession>,
}

impl CdpBridgeTransport {
    /// Install the acknowledgement relay and return the transport.
    pub async fn install(session: Arc<PageSession>) -> Result<Self, crate::cdp::CdpError> {
        session.add_binding(BRIDGE_BINDING).await?;
        let relay = format!(
            "window.addEventListener('message', function(ev) {{\
               if (ev.data && ev.data.type === '{done}') {{\
                 window.{binding}(JSON.stringify(ev.data));\
               }}\
             }});",
            done = SET_PROMPT_DONE_TYPE,
            binding = BRIDGE_BINDING,
        );
        session.evaluate(&relay).await?;
        Ok(Self { session })
    }
}

#[async_trait]
impl BridgeTransport for CdpBridgeTransport {
    async fn send(&self, message: Value) -> bool {
        let Ok(payload) = serde_json::to_string(&message) else {
            return false;
        };
        let expression = format!("window.postMessage({}, '*');", payload);
        self.session.evaluate(&expression).await.is_ok()
    }

    async fn recv(&self) -> Option<Value> {
        loop {
            let event = self
                .session
                .next_event(Duration::from_secs(3600))
                .await?;
            if event.method != "Runtime.bindingCalled" {
                continue;
            }
            if event.params["name"].as_str() != Some(BRIDGE_BINDING) {
                continue;
            }
            let payload = event.params["payload"].as_str()?;
            return serde_json::from_str(payload).ok();
        }
    }
}
