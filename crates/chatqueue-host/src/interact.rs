//! Synthetic interaction dispatch.
//!
//! Which event type the host's framework binds to is an implementation
//! detail of the host, so activation fires the whole family: pointer,
//! mouse and keyboard. Injected into controllers as a capability so
//! tests can observe interactions instead of performing them.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::cdp::PageSession;
use crate::probe::HostElement;

/// Drives host controls with synthetic events.
#[async_trait]
pub trait InteractionDispatcher: Send + Sync {
    /// Plain native click at the element's center.
    async fn click(&self, el: HostElement) -> bool;

    /// Full activation fan-out: pointer-down/up, mouse-down/up/click and
    /// a keyboard Enter, so a handler bound to any of them fires.
    async fn activate(&self, el: HostElement) -> bool;

    /// Populate a file input with files on disk and fire `change`.
    async fn set_input_files(&self, el: HostElement, paths: &[String]) -> bool;
}

const ACTIVATE_FN: &str = r#"function() {
    const opts = { bubbles: true, cancelable: true, composed: true };
    this.dispatchEvent(new PointerEvent('pointerdown', opts));
    this.dispatchEvent(new MouseEvent('mousedown', opts));
    this.dispatchEvent(new PointerEvent('pointerup', opts));
    this.dispatchEvent(new MouseEvent('mouseup', opts));
    this.dispatchEvent(new MouseEvent('click', opts));
    this.dispatchEvent(new KeyboardEvent('keydown', { key: 'Enter', ...opts }));
    this.dispatchEvent(new KeyboardEvent('keyup', { key: 'Enter', ...opts }));
    return true;
}"#;

const CHANGE_FN: &str = r#"function() {
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return true;
}"#;

/// Live dispatcher over a CDP page session.
pub struct CdpInteractions {
    session: Arc<PageSession>,
}

impl CdpInteractions {
    /// Create a dispatcher over an attached session.
    pub fn new(session: Arc<PageSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl InteractionDispatcher for CdpInteractions {
    async fn click(&self, el: HostElement) -> bool {
        match self.session.click_node(el.node_id).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Click on node {} failed: {}", el.node_id, e);
                false
            }
        }
    }

    async fn activate(&self, el: HostElement) -> bool {
        // Native click first (trusted event), then the scripted fan-out
        // for frameworks that listen on the other event types.
        let clicked = self.click(el).await;
        match self
            .session
            .call_function_on_node(el.node_id, ACTIVATE_FN)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                debug!("Activation fan-out on node {} failed: {}", el.node_id, e);
                clicked
            }
        }
    }

    async fn set_input_files(&self, el: HostElement, paths: &[String]) -> bool {
        if let Err(e) = self.session.set_file_input(el.node_id, paths).await {
            warn!("Populating file input failed: {}", e);
            return false;
        }
        match self.session.call_function_on_node(el.node_id, CHANGE_FN).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Dispatching change on file input failed: {}", e);
                false
            }
        }
    }
}
