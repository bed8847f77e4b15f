//! Conversation-scoped storage keys.

use url::Url;

/// Prefix for per-conversation snapshot keys.
pub const CONVERSATION_KEY_PREFIX: &str = "cq:v2:";

/// The single global key used before snapshots were conversation-scoped.
/// Migrated forward and deleted on first read.
pub const LEGACY_QUEUE_KEY: &str = "cq:queue";

/// Derive the storage key for the conversation a URL points at.
///
/// Conversation pages (`…/c/<id>` or `…/chat/<id>`) key on host plus the
/// conversation id so the queue follows the conversation across path
/// cosmetics; anything else keys on host plus path. Returns `None` for
/// unparseable URLs.
pub fn conversation_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    for window in segments.windows(2) {
        if matches!(window[0], "c" | "chat") {
            return Some(format!(
                "{}{}/c/{}",
                CONVERSATION_KEY_PREFIX, host, window[1]
            ));
        }
    }

    let path = parsed.path().trim_end_matches('/');
    Some(format!("{}{}{}", CONVERSATION_KEY_PREFIX, host, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_page_keys_on_id() {
        let key = conversation_key("https://chat.example.com/c/abc123?src=nav").unwrap();
        assert_eq!(key, "cq:v2:chat.example.com/c/abc123");

        let key = conversation_key("https://chat.example.com/app/chat/xyz/").unwrap();
        assert_eq!(key, "cq:v2:chat.example.com/c/xyz");
    }

    #[test]
    fn test_non_conversation_page_keys_on_path() {
        let key = conversation_key("https://chat.example.com/").unwrap();
        assert_eq!(key, "cq:v2:chat.example.com");

        let key = conversation_key("https://chat.example.com/library/").unwrap();
        assert_eq!(key, "cq:v2:chat.example.com/library");
    }

    #[test]
    fn test_invalid_url() {
        assert!(conversation_key("not a url").is_none());
    }

    #[test]
    fn test_same_conversation_same_key() {
        let a = conversation_key("https://chat.example.com/c/abc123").unwrap();
        let b = conversation_key("https://chat.example.com/c/abc123#latest").unwrap();
        assert_eq!(a, b);
    }
}
