//! Page session: DOM, input and runtime operations on one attached tab.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::SinkExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use super::client::{PendingRequest, WsSink};
use super::error::CdpError;
use super::protocol::{CdpRequest, PageEvent};

/// A session attached to a single tab.
pub struct PageSession {
    target_id: String,
    session_id: String,
    ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    request_id: Arc<AtomicU64>,
    call_timeout: Duration,
    /// Protocol events for this session, consumed by the editor bridge.
    events: tokio::sync::Mutex<mpsc::UnboundedReceiver<PageEvent>>,
}

impl PageSession {
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
        call_timeout: Duration,
        event_rx: mpsc::UnboundedReceiver<PageEvent>,
    ) -> Self {
        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
            call_timeout,
            events: tokio::sync::Mutex::new(event_rx),
        }
    }

    /// Target id of the attached tab.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Send a command within this session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: Some(self.session_id.clone()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP session send: {}", &json[..json.len().min(200)]);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("{} timed out", method)))
            }
        }
    }

    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;
        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }

    /// Next protocol event for this session, if any arrives in time.
    pub async fn next_event(&self, timeout: Duration) -> Option<PageEvent> {
        let mut events = self.events.lock().await;
        tokio::time::timeout(timeout, events.recv()).await.ok()?
    }

    // ------------------------------------------------------------------
    // DOM reads
    // ------------------------------------------------------------------

    async fn document_root(&self) -> Result<i64, CdpError> {
        let result = self.call("DOM.getDocument", Some(json!({"depth": 0}))).await?;
        result["root"]["nodeId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("Missing document root".to_string()))
    }

    /// Query one selector. The document is re-fetched on every call so a
    /// stale root after a host re-render never poisons later queries.
    pub async fn query(&self, selector: &str) -> Result<Option<i64>, CdpError> {
        let root = self.document_root().await?;
        let result = self
            .call(
                "DOM.querySelector",
                Some(json!({"nodeId": root, "selector": selector})),
            )
            .await?;

        Ok(match result["nodeId"].as_i64() {
            Some(0) | None => None,
            Some(node_id) => Some(node_id),
        })
    }

    /// Query all matches for a selector.
    pub async fn query_all(&self, selector: &str) -> Result<Vec<i64>, CdpError> {
        let root = self.document_root().await?;
        let result = self
            .call(
                "DOM.querySelectorAll",
                Some(json!({"nodeId": root, "selector": selector})),
            )
            .await?;

        Ok(result["nodeIds"]
            .as_array()
            .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
            .unwrap_or_default())
    }

    /// Whether a node currently has a non-empty box.
    pub async fn is_visible(&self, node_id: i64) -> bool {
        let Ok(result) = self
            .call("DOM.getBoxModel", Some(json!({"nodeId": node_id})))
            .await
        else {
            return false;
        };
        result["model"]["width"].as_f64().unwrap_or(0.0) > 0.0
            && result["model"]["height"].as_f64().unwrap_or(0.0) > 0.0
    }

    /// Attributes of a node as name/value pairs.
    pub async fn attributes(&self, node_id: i64) -> Result<HashMap<String, String>, CdpError> {
        let result = self
            .call("DOM.getAttributes", Some(json!({"nodeId": node_id})))
            .await?;

        let flat: Vec<String> = result["attributes"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(flat
            .chunks_exact(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect())
    }

    /// Rendered text of a node.
    pub async fn node_text(&self, node_id: i64) -> Result<String, CdpError> {
        let value = self
            .call_function_on_node(
                node_id,
                "function() { return this.innerText || this.textContent || ''; }",
            )
            .await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }

    // ------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------

    /// Click a node at its box-model center with a native input event.
    pub async fn click_node(&self, node_id: i64) -> Result<(), CdpError> {
        // Best effort; a node already in view makes this a no-op.
        let _ = self
            .call("DOM.scrollIntoViewIfNeeded", Some(json!({"nodeId": node_id})))
            .await;

        let result = self
            .call("DOM.getBoxModel", Some(json!({"nodeId": node_id})))
            .await?;
        let quad: Vec<f64> = result["model"]["content"]
            .as_array()
            .map(|q| q.iter().filter_map(Value::as_f64).collect())
            .unwrap_or_default();
        if quad.len() < 8 {
            return Err(CdpError::InvalidResponse("Degenerate box model".to_string()));
        }
        let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
        let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;

        for kind in ["mousePressed", "mouseReleased"] {
            self.call(
                "Input.dispatchMouseEvent",
                Some(json!({
                    "type": kind,
                    "x": x,
                    "y": y,
                    "button": "left",
                    "clickCount": 1,
                })),
            )
            .await?;
        }
        Ok(())
    }

    /// Populate a file input with real files on disk.
    pub async fn set_file_input(&self, node_id: i64, paths: &[String]) -> Result<(), CdpError> {
        self.call(
            "DOM.setFileInputFiles",
            Some(json!({"nodeId": node_id, "files": paths})),
        )
        .await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Runtime
    // ------------------------------------------------------------------

    /// Evaluate an expression in the page realm.
    pub async fn evaluate(&self, expression: &str) -> Result<Value, CdpError> {
        let result = self
            .call(
                "Runtime.evaluate",
                Some(json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }
        Ok(result["result"]["value"].clone())
    }

    /// Run a function with a DOM node as `this`.
    pub async fn call_function_on_node(
        &self,
        node_id: i64,
        function: &str,
    ) -> Result<Value, CdpError> {
        let resolved = self
            .call("DOM.resolveNode", Some(json!({"nodeId": node_id})))
            .await?;
        let object_id = resolved["object"]["objectId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Node has no object id".to_string()))?;

        let result = self
            .call(
                "Runtime.callFunctionOn",
                Some(json!({
                    "objectId": object_id,
                    "functionDeclaration": function,
                    "returnByValue": true,
                })),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception["text"].as_str().unwrap_or("Unknown error");
            return Err(CdpError::JavaScript(text.to_string()));
        }
        Ok(result["result"]["value"].clone())
    }

    /// Register a page-callable binding routed back as a protocol event.
    pub async fn add_binding(&self, name: &str) -> Result<(), CdpError> {
        self.call("Runtime.addBinding", Some(json!({"name": name})))
            .await?;
        Ok(())
    }
}
