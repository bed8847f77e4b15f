//! Static model catalog.
//!
//! The host offers no API for enumerating models - only a clickable
//! menu - so the catalog is a lookup table kept in step with what the
//! menu shows. Entries the host has stopped offering are kept in the
//! legacy section: queued entries referencing them must still render.

use chatqueue_protocols::ModelDefinition;

/// The models the host's switcher currently offers.
pub fn default_catalog() -> Vec<ModelDefinition> {
    vec![
        ModelDefinition::new("gpt-5-1", "GPT-5.1")
            .with_section("Featured")
            .with_group("gpt-5-1", "GPT-5.1")
            .with_order(0),
        ModelDefinition::new("gpt-5-1-thinking", "GPT-5.1 Thinking")
            .with_section("Featured")
            .with_group("gpt-5-1", "GPT-5.1")
            .with_order(1),
        ModelDefinition::new("gpt-5-1-mini", "GPT-5.1 Mini")
            .with_section("Featured")
            .with_order(2),
        ModelDefinition::new("gpt-5", "GPT-5")
            .with_section("Legacy")
            .with_order(10),
        ModelDefinition::new("gpt-5-thinking", "GPT-5 Thinking")
            .with_section("Legacy")
            .with_order(11),
        ModelDefinition::new("gpt-4-1", "GPT-4.1")
            .with_section("Legacy")
            .with_order(12),
        ModelDefinition::new("gpt-4o", "GPT-4o")
            .with_section("Legacy")
            .with_order(13),
    ]
}

/// Whether a model exposes the thinking-level control.
///
/// A naming-convention heuristic: thinking variants carry "thinking" in
/// their id or label. Isolated here so a convention change is a
/// one-line fix.
pub fn supports_thinking(id: &str, label: Option<&str>) -> bool {
    id.to_ascii_lowercase().contains("thinking")
        || label
            .map(|l| l.to_ascii_lowercase().contains("thinking"))
            .unwrap_or(false)
}
