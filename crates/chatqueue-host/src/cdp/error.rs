//! CDP error types.

use thiserror::Error;

/// CDP transport errors.
#[derive(Debug, Error)]
pub enum CdpError {
    /// Chrome not found or not running with remote debugging.
    #[error("Chrome not available at {0}. Start Chrome with: chrome --remote-debugging-port=9222")]
    ChromeNotAvailable(String),

    /// Failed to connect to the debugging socket.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// HTTP error during endpoint discovery.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Error reported by the protocol itself.
    #[error("CDP error: {message} (code: {code})")]
    Protocol { code: i64, message: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No open tab matched the requested page.
    #[error("Page not found: {0}")]
    PageNotFound(String),

    /// JavaScript evaluation threw in the page realm.
    #[error("JavaScript error: {0}")]
    JavaScript(String),

    /// Command did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The attached session went away.
    #[error("Session closed")]
    SessionClosed,

    /// Response shape did not match the protocol.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CdpError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CdpError::WebSocket(e.to_string())
    }
}

impl From<reqwest::Error> for CdpError {
    fn from(e: reqwest::Error) -> Self {
        CdpError::Http(e.to_string())
    }
}
