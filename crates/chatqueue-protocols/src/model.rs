//! Model catalog entries.

use serde::{Deserialize, Serialize};

/// One model the host's switcher menu can select.
///
/// Built from a static catalog: the host exposes no enumeration API, only
/// a clickable menu, so discovery is a lookup table kept current by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    /// Canonical model identifier.
    pub id: String,
    /// Human-readable label as the host displays it.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Menu section the item appears under, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Logical group for models that appear as one entry with tiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,
    /// Sort order within the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// Tier badges the host renders next to the label.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tiers: Vec<String>,
    /// Whether this entry is the currently active model. At most one
    /// entry carries `true` across an active catalog.
    #[serde(default)]
    pub selected: bool,
}

impl ModelDefinition {
    /// Create a catalog entry with id and label.
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            section: None,
            group: None,
            group_label: None,
            order: None,
            tiers: Vec::new(),
            selected: false,
        }
    }

    /// Set the menu section.
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Set the logical group and its display label.
    pub fn with_group(mut self, group: impl Into<String>, label: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self.group_label = Some(label.into());
        self
    }

    /// Set the sort order.
    pub fn with_order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}
