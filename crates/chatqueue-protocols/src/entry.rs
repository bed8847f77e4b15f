//! Queue entries and attachments.

use serde::{Deserialize, Serialize};

/// Generation-effort setting the host offers on certain models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThinkingLevel {
    Light,
    Standard,
    Extended,
    Heavy,
}

impl ThinkingLevel {
    /// All levels, in the order the host menu lists them.
    pub const ALL: [ThinkingLevel; 4] = [
        ThinkingLevel::Light,
        ThinkingLevel::Standard,
        ThinkingLevel::Extended,
        ThinkingLevel::Heavy,
    ];

    /// Wire/menu form of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThinkingLevel::Light => "light",
            ThinkingLevel::Standard => "standard",
            ThinkingLevel::Extended => "extended",
            ThinkingLevel::Heavy => "heavy",
        }
    }

    /// Parse a wire/menu form, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(ThinkingLevel::Light),
            "standard" => Some(ThinkingLevel::Standard),
            "extended" => Some(ThinkingLevel::Extended),
            "heavy" => Some(ThinkingLevel::Heavy),
            _ => None,
        }
    }
}

/// One image attachment carried by a queue entry.
///
/// `data_url` is the only persisted representation. It must stay fully
/// self-contained so an entry survives serialization and reload in a new
/// page context where transient references (blob handles) are invalid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Opaque generator-assigned id, unique within a queue.
    pub id: String,
    pub name: String,
    pub mime: String,
    pub data_url: String,
}

/// One pending follow-up prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    /// Prompt body, newline-preserving.
    pub text: String,
    /// Ordered; insertion order is significant.
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Canonical model id to apply before sending; `None` = send with
    /// whatever model is currently active.
    #[serde(default)]
    pub model: Option<String>,
    /// Cached human-readable label. Fallback display only, never
    /// authoritative.
    #[serde(default)]
    pub model_label: Option<String>,
    /// Explicit thinking-level override, if any.
    #[serde(default)]
    pub thinking: Option<ThinkingLevel>,
}

impl QueueEntry {
    /// Create an entry with just a prompt body.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attachments: Vec::new(),
            model: None,
            model_label: None,
            thinking: None,
        }
    }

    /// Set the model id and cached label.
    pub fn with_model(mut self, id: impl Into<String>, label: Option<String>) -> Self {
        self.model = Some(id.into());
        self.model_label = label;
        self
    }

    /// Set the thinking-level override.
    pub fn with_thinking(mut self, level: ThinkingLevel) -> Self {
        self.thinking = Some(level);
        self
    }

    /// Set the attachment list.
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}
