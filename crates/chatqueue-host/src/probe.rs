//! DOM probe layer.
//!
//! Pure read/locate operations over the host document. No owned state,
//! no element caching: the host re-renders freely, so every call
//! re-queries and a returned handle is only trusted until the next wait
//! boundary.

use async_trait::async_trait;
use tracing::trace;

use chatqueue_protocols::Attachment;

use crate::cdp::PageSession;
use crate::selectors::{selectors_for, ProbeTarget};

/// Handle to a located host element. Cheap to copy, valid only until the
/// next wait boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostElement {
    pub node_id: i64,
}

/// Read/locate capability over the host page.
///
/// Controllers depend on this trait only; the live implementation is
/// [`CdpProbe`], tests use scripted fixtures. Locate operations return
/// `None` for anything absent, never an error.
#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Locate a control: first currently visible match, falling back to
    /// the first match of any candidate selector.
    async fn find(&self, target: ProbeTarget) -> Option<HostElement>;

    /// All matches for a control, candidate selectors in order.
    async fn find_all(&self, target: ProbeTarget) -> Vec<HostElement>;

    /// Rendered text of an element, empty when unreadable.
    async fn text(&self, el: HostElement) -> String;

    /// Whether an element is disabled (`disabled` or `aria-disabled`).
    async fn is_disabled(&self, el: HostElement) -> bool;

    /// URL of the page this probe is attached to.
    async fn current_url(&self) -> Option<String>;

    /// Whether a control currently exists.
    async fn exists(&self, target: ProbeTarget) -> bool {
        self.find(target).await.is_some()
    }

    /// Current editor draft text.
    async fn editor_text(&self) -> String {
        match self.find(ProbeTarget::Editor).await {
            Some(el) => self.text(el).await,
            None => String::new(),
        }
    }

    /// Whether the editor draft is empty.
    async fn editor_is_empty(&self) -> bool {
        self.editor_text().await.trim().is_empty()
    }

    /// Whether the host is mid-generation (stop control showing).
    async fn is_generating(&self) -> bool {
        self.exists(ProbeTarget::StopButton).await
    }

    /// Whether the send button exists and is enabled.
    async fn send_enabled(&self) -> bool {
        match self.find(ProbeTarget::SendButton).await {
            Some(el) => !self.is_disabled(el).await,
            None => false,
        }
    }

    /// Number of attachment previews the host is showing.
    async fn attachment_count(&self) -> usize {
        self.find_all(ProbeTarget::AttachmentPreview).await.len()
    }

    /// Label the model-switcher button currently displays.
    async fn header_model_label(&self) -> Option<String> {
        let el = self.find(ProbeTarget::ModelSwitcher).await?;
        let label = self.text(el).await.trim().to_string();
        (!label.is_empty()).then_some(label)
    }

    /// Whether the model-switcher menu is open.
    async fn menu_open(&self) -> bool {
        self.exists(ProbeTarget::ModelMenu).await
    }

    /// Attachments drafted in the composer but not yet sent, as
    /// self-contained data. Hosts whose previews cannot be read back
    /// yield an empty list.
    async fn drafted_attachments(&self) -> Vec<Attachment> {
        Vec::new()
    }
}

/// Live probe over a CDP page session.
pub struct CdpProbe {
    session: std::sync::Arc<PageSession>,
}

impl CdpProbe {
    /// Create a probe over an attached session.
    pub fn new(session: std::sync::Arc<PageSession>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl HostProbe for CdpProbe {
    async fn find(&self, target: ProbeTarget) -> Option<HostElement> {
        let mut first_match = None;
        for selector in selectors_for(target) {
            let Ok(nodes) = self.session.query_all(selector).await else {
                continue;
            };
            for node_id in nodes {
                if first_match.is_none() {
                    first_match = Some(HostElement { node_id });
                }
                if self.session.is_visible(node_id).await {
                    return Some(HostElement { node_id });
                }
            }
        }
        trace!("Probe {:?}: visible=none, fallback={:?}", target, first_match);
        first_match
    }

    async fn find_all(&self, target: ProbeTarget) -> Vec<HostElement> {
        let mut elements = Vec::new();
        for selector in selectors_for(target) {
            if let Ok(nodes) = self.session.query_all(selector).await {
                elements.extend(nodes.into_iter().map(|node_id| HostElement { node_id }));
            }
            if !elements.is_empty() {
                break;
            }
        }
        elements
    }

    async fn text(&self, el: HostElement) -> String {
        self.session.node_text(el.node_id).await.unwrap_or_default()
    }

    async fn is_disabled(&self, el: HostElement) -> bool {
        let Ok(attributes) = self.session.attributes(el.node_id).await else {
            return false;
        };
        attributes.contains_key("disabled")
            || attributes.get("aria-disabled").map(String::as_str) == Some("true")
    }

    async fn current_url(&self) -> Option<String> {
        let value = self.session.evaluate("location.href").await.ok()?;
        value.as_str().map(str::to_string)
    }

    async fn drafted_attachments(&self) -> Vec<Attachment> {
        // Preview thumbnails are redrawn onto a canvas to recover their
        // pixel data; previews that taint the canvas or carry no image
        // are skipped.
        let mut attachments = Vec::new();
        for el in self.find_all(ProbeTarget::AttachmentPreview).await {
            let Ok(value) = self.session.call_function_on_node(el.node_id, EXTRACT_PREVIEW_FN).await
            else {
                continue;
            };
            if let Some(attachment) = chatqueue_codec::normalize_attachment(&value) {
                attachments.push(attachment);
            }
        }
        attachments
    }
}

const EXTRACT_PREVIEW_FN: &str = r#"function() {
    const img = this.querySelector('img');
    if (!img || !img.complete || !img.naturalWidth) return null;
    try {
        const canvas = document.createElement('canvas');
        canvas.width = img.naturalWidth;
        canvas.height = img.naturalHeight;
        canvas.getContext('2d').drawImage(img, 0, 0);
        return { dataUrl: canvas.toDataURL('image/png'), name: img.alt || '' };
    } catch (e) {
        return null;
    }
}"#;
