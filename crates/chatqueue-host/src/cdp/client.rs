//! CDP WebSocket client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpRequest, CdpResponse, PageEvent, PageInfo};
use super::session::PageSession;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
pub(crate) type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Pending command waiting for its response.
pub(crate) struct PendingRequest {
    pub tx: oneshot::Sender<Result<Value, CdpError>>,
}

type EventRouters = Arc<RwLock<HashMap<String, mpsc::UnboundedSender<PageEvent>>>>;

/// Client for one browser's debugging socket.
///
/// Commands are multiplexed over a single WebSocket; responses resolve
/// pending oneshot channels by id, events are routed to the attached
/// session they belong to.
pub struct CdpClient {
    http_endpoint: String,
    pub(crate) ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    pub(crate) request_id: Arc<AtomicU64>,
    pub(crate) pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    event_routers: EventRouters,
    pub(crate) call_timeout: Duration,
    _recv_task: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a browser's debugging endpoint.
    pub async fn connect(endpoint: &str, call_timeout: Duration) -> Result<Self, CdpError> {
        let http_endpoint = endpoint.trim_end_matches('/').to_string();

        let version_url = format!("{}/json/version", http_endpoint);
        debug!("Fetching browser version from {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?
            .json()
            .await
            .map_err(|e| CdpError::ChromeNotAvailable(format!("{}: {}", endpoint, e)))?;

        debug!("Connected to browser: {}", version.browser);

        let (ws_stream, _) = tokio_tungstenite::connect_async(&version.web_socket_debugger_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("WebSocket: {}", e)))?;

        let (ws_sink, ws_source) = ws_stream.split();
        let pending: Arc<Mutex<HashMap<u64, PendingRequest>>> = Arc::new(Mutex::new(HashMap::new()));
        let event_routers: EventRouters = Arc::new(RwLock::new(HashMap::new()));

        let recv_task = {
            let pending = pending.clone();
            let event_routers = event_routers.clone();
            tokio::spawn(async move {
                Self::receive_loop(ws_source, pending, event_routers).await;
            })
        };

        Ok(Self {
            http_endpoint,
            ws_tx: Arc::new(tokio::sync::Mutex::new(ws_sink)),
            request_id: Arc::new(AtomicU64::new(1)),
            pending,
            event_routers,
            call_timeout,
            _recv_task: recv_task,
        })
    }

    async fn receive_loop(
        mut ws_source: WsSource,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        event_routers: EventRouters,
    ) {
        while let Some(message) = ws_source.next().await {
            let text = match message {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    error!("CDP socket error: {}", e);
                    break;
                }
            };
            trace!("CDP recv: {}", &text[..text.len().min(200)]);

            let response: CdpResponse = match serde_json::from_str(&text) {
                Ok(response) => response,
                Err(e) => {
                    warn!("Unparseable CDP message: {}", e);
                    continue;
                }
            };

            if let Some(id) = response.id {
                let Some(request) = pending.lock().remove(&id) else {
                    continue;
                };
                let result = match response.error {
                    Some(err) => Err(CdpError::Protocol {
                        code: err.code,
                        message: err.message,
                    }),
                    None => Ok(response.result.unwrap_or(Value::Null)),
                };
                let _ = request.tx.send(result);
            } else if let Some(method) = response.method {
                let Some(session_id) = response.session_id else {
                    continue;
                };
                let routers = event_routers.read().await;
                if let Some(tx) = routers.get(&session_id) {
                    let _ = tx.send(PageEvent {
                        method,
                        params: response.params.unwrap_or(Value::Null),
                    });
                }
            }
        }

        // Socket gone: fail every waiter instead of hanging them.
        let mut pending = pending.lock();
        for (_, request) in pending.drain() {
            let _ = request.tx.send(Err(CdpError::SessionClosed));
        }
    }

    /// Send a browser-level (sessionless) command.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: None,
        };

        let json = serde_json::to_string(&request)?;
        let (tx, rx) = oneshot::channel();
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

    /// List open page tabs.
    pub async fn pages(&self) -> Result<Vec<PageInfo>, CdpError> {
        let list_url = format!("{}/json/list", self.http_endpoint);
        let tabs: Vec<PageInfo> = reqwest::get(&list_url).await?.json().await?;
        Ok(tabs.into_iter().filter(|t| t.kind == "page").collect())
    }

    /// Find the first open tab whose URL contains `url_fragment`.
    pub async fn find_page(&self, url_fragment: &str) -> Result<PageInfo, CdpError> {
        self.pages()
            .await?
            .into_iter()
            .find(|p| p.url.contains(url_fragment))
            .ok_or_else(|| CdpError::PageNotFound(url_fragment.to_string()))
    }

    /// Attach to a tab and return a page session with required domains
    /// enabled.
    pub async fn attach(&self, page: &PageInfo) -> Result<PageSession, CdpError> {
        let result = self
            .call(
                "Target.attachToTarget",
                Some(json!({"targetId": page.id, "flatten": true})),
            )
            .await?;

        let session_id = result["sessionId"]
            .as_str()
            .ok_or_else(|| CdpError::InvalidResponse("Missing sessionId".to_string()))?
            .to_string();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        self.event_routers
            .write()
            .await
            .insert(session_id.clone(), event_tx);

        let session = PageSession::new(
            page.id.clone(),
            session_id,
            self.ws_tx.clone(),
            self.pending.clone(),
            self.request_id.clone(),
            self.call_timeout,
            event_rx,
        );
        session.enable_domains().await?;

        debug!("Attached to page {} ({})", page.id, page.url);
        Ok(session)
    }
}
