//! CDP wire types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Outgoing CDP command.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpRequest {
    pub id: u64,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Incoming CDP message: either a command response (has `id`) or an
/// event (has `method`).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdpResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<CdpErrorPayload>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Error payload inside a command response.
#[derive(Debug, Deserialize)]
pub struct CdpErrorPayload {
    pub code: i64,
    pub message: String,
}

/// `/json/version` discovery response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserVersion {
    #[serde(default, rename = "Browser")]
    pub browser: String,
    pub web_socket_debugger_url: String,
}

/// One entry of the `/json/list` tab listing.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A protocol event routed to an attached session.
#[derive(Debug, Clone)]
pub struct PageEvent {
    pub method: String,
    pub params: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_omits_absent_fields() {
        let request = CdpRequest {
            id: 7,
            method: "DOM.getDocument".to_string(),
            params: None,
            session_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json, json!({"id": 7, "method": "DOM.getDocument"}));
    }

    #[test]
    fn test_response_vs_event() {
        let response: CdpResponse =
            serde_json::from_str(r#"{"id":1,"result":{"ok":true},"sessionId":"S"}"#).unwrap();
        assert_eq!(response.id, Some(1));
        assert!(response.method.is_none());

        let event: CdpResponse = serde_json::from_str(
            r#"{"method":"Runtime.bindingCalled","params":{"name":"x"},"sessionId":"S"}"#,
        )
        .unwrap();
        assert!(event.id.is_none());
        assert_eq!(event.method.as_deref(), Some("Runtime.bindingCalled"));
    }

    #[test]
    fn test_page_info_kind() {
        let info: PageInfo = serde_json::from_str(
            r#"{"id":"T1","title":"Chat","url":"https://chat.example.com/c/1","type":"page"}"#,
        )
        .unwrap();
        assert_eq!(info.kind, "page");
    }
}
