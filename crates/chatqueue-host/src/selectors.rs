//! Host-page selector knowledge.
//!
//! The single place that knows host markup. Every entry is an ordered
//! list of best-effort candidates: the host ships markup changes without
//! notice, so earlier selectors are the current ones and later entries
//! are known fallbacks.

/// A host control the core needs to locate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeTarget {
    /// Rich-text prompt editor.
    Editor,
    SendButton,
    StopButton,
    VoiceButton,
    /// Container wrapping editor and controls.
    ComposerRoot,
    /// Native file input for attachments.
    FileInput,
    /// Button that reveals the hidden file input.
    AttachButton,
    /// Button showing the active model and opening the switcher menu.
    ModelSwitcher,
    /// The opened model-switcher menu.
    ModelMenu,
    ModelMenuItem,
    /// Menu items that expand a nested submenu.
    SubmenuTrigger,
    /// Control that opens the thinking-level menu.
    ThinkingTrigger,
    ThinkingMenu,
    ThinkingMenuItem,
    AttachmentPreview,
    AttachmentRemove,
}

/// Candidate selectors for a target, in preference order.
pub fn selectors_for(target: ProbeTarget) -> &'static [&'static str] {
    match target {
        ProbeTarget::Editor => &[
            "div.ProseMirror[contenteditable=\"true\"]",
            "#prompt-textarea",
            "[data-testid=\"composer\"] [contenteditable=\"true\"]",
        ],
        ProbeTarget::SendButton => &[
            "button[data-testid=\"send-button\"]",
            "#composer-submit-button",
            "button[aria-label*=\"Send\"]",
        ],
        ProbeTarget::StopButton => &[
            "button[data-testid=\"stop-button\"]",
            "button[aria-label*=\"Stop\"]",
        ],
        ProbeTarget::VoiceButton => &[
            "button[data-testid=\"composer-speech-button\"]",
            "button[aria-label*=\"Voice\"]",
        ],
        ProbeTarget::ComposerRoot => &[
            "form[data-type=\"unified-composer\"]",
            "[data-testid=\"composer\"]",
        ],
        ProbeTarget::FileInput => &["input[type=\"file\"]"],
        ProbeTarget::AttachButton => &[
            "button[data-testid=\"composer-attach-button\"]",
            "button[aria-label*=\"Attach\"]",
        ],
        ProbeTarget::ModelSwitcher => &[
            "button[data-testid=\"model-switcher-dropdown-button\"]",
            "button[aria-label*=\"Model selector\"]",
        ],
        ProbeTarget::ModelMenu => &[
            "[role=\"menu\"][data-testid=\"model-switcher-menu\"]",
            "div[role=\"menu\"]",
        ],
        ProbeTarget::ModelMenuItem => &[
            "[role=\"menu\"] [role=\"menuitem\"]",
            "[role=\"menu\"] [role=\"option\"]",
        ],
        ProbeTarget::SubmenuTrigger => &[
            "[role=\"menu\"] [role=\"menuitem\"][aria-haspopup=\"menu\"]",
            "[role=\"menu\"] [data-has-submenu]",
        ],
        ProbeTarget::ThinkingTrigger => &[
            "button[data-testid=\"thinking-effort-selector\"]",
            "button[aria-label*=\"Thinking\"]",
        ],
        ProbeTarget::ThinkingMenu => &[
            "[role=\"menu\"][data-testid=\"thinking-effort-menu\"]",
        ],
        ProbeTarget::ThinkingMenuItem => &[
            "[role=\"menu\"][data-testid=\"thinking-effort-menu\"] [role=\"menuitem\"]",
            "[role=\"menu\"] [role=\"menuitemradio\"]",
        ],
        ProbeTarget::AttachmentPreview => &[
            "[data-testid=\"attachment-preview\"]",
            "[data-testid^=\"file-thumbnail\"]",
        ],
        ProbeTarget::AttachmentRemove => &[
            "[data-testid=\"attachment-preview\"] button[aria-label*=\"Remove\"]",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_target_has_candidates() {
        let targets = [
            ProbeTarget::Editor,
            ProbeTarget::SendButton,
            ProbeTarget::StopButton,
            ProbeTarget::VoiceButton,
            ProbeTarget::ComposerRoot,
            ProbeTarget::FileInput,
            ProbeTarget::AttachButton,
            ProbeTarget::ModelSwitcher,
            ProbeTarget::ModelMenu,
            ProbeTarget::ModelMenuItem,
            ProbeTarget::SubmenuTrigger,
            ProbeTarget::ThinkingTrigger,
            ProbeTarget::ThinkingMenu,
            ProbeTarget::ThinkingMenuItem,
            ProbeTarget::AttachmentPreview,
            ProbeTarget::AttachmentRemove,
        ];
        for target in targets {
            assert!(!selectors_for(target).is_empty(), "{:?}", target);
        }
    }
}
