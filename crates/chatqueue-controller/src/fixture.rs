//! Scripted host fixture for controller tests.
//!
//! One object plays the host page: it answers probe reads from a mutable
//! script state, records every interaction, and acks (or ignores) bridge
//! round-trips. Tests tweak the state between steps to walk controllers
//! through host behaviors.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use chatqueue_host::{
    BridgeTransport, HostElement, HostProbe, InteractionDispatcher, ProbeTarget, SET_PROMPT_TYPE,
    SET_PROMPT_DONE_TYPE,
};
use chatqueue_protocols::Attachment;

pub const EDITOR: i64 = 1;
pub const SEND: i64 = 2;
pub const STOP: i64 = 3;
pub const SWITCHER: i64 = 4;
pub const FILE_INPUT: i64 = 5;
pub const THINKING_TRIGGER: i64 = 6;
pub const THINKING_MENU: i64 = 7;
pub const MODEL_MENU: i64 = 8;
pub const COMPOSER_ROOT: i64 = 9;
pub const VOICE: i64 = 10;
pub const MODEL_ITEM_BASE: i64 = 100;
pub const THINKING_ITEM_BASE: i64 = 200;
pub const PREVIEW_BASE: i64 = 300;
pub const SUBMENU_TRIGGER: i64 = 400;

const THINKING_LABELS: [&str; 4] = ["Light", "Standard", "Extended", "Heavy"];

pub struct FixtureState {
    // Script state.
    pub editor_text: String,
    pub generating: bool,
    pub send_present: bool,
    pub send_disabled: bool,
    pub attachment_count: usize,
    pub header_label: Option<String>,
    pub switcher_present: bool,
    pub switcher_toggles_menu: bool,
    pub menu_open: bool,
    pub menu_items: Vec<String>,
    pub submenu_present: bool,
    pub submenu_opened: bool,
    pub submenu_items: Vec<String>,
    pub select_on_activate: bool,
    pub thinking_menu_open: bool,
    pub thinking_selected: Option<String>,
    pub file_input_present: bool,
    pub reflect_file_sets: bool,
    pub ack_prompt: bool,
    pub drafted: Vec<Attachment>,

    // Recordings.
    pub clicks: Vec<i64>,
    pub activations: Vec<i64>,
    pub file_sets: Vec<(i64, Vec<String>)>,
    pub injected_prompts: Vec<String>,
    pub stop_clicks: usize,
}

impl Default for FixtureState {
    fn default() -> Self {
        Self {
            editor_text: String::new(),
            generating: false,
            send_present: true,
            send_disabled: false,
            attachment_count: 0,
            header_label: Some("GPT-5.1".to_string()),
            switcher_present: true,
            switcher_toggles_menu: true,
            menu_open: false,
            menu_items: vec![
                "GPT-5.1".to_string(),
                "GPT-5.1 Thinking".to_string(),
                "GPT-5.1 Mini".to_string(),
            ],
            submenu_present: true,
            submenu_opened: false,
            submenu_items: vec![
                "GPT-5 Thinking".to_string(),
                "GPT-4.1".to_string(),
                "GPT-4o".to_string(),
            ],
            select_on_activate: true,
            thinking_menu_open: false,
            thinking_selected: None,
            file_input_present: true,
            reflect_file_sets: true,
            ack_prompt: true,
            drafted: Vec::new(),
            clicks: Vec::new(),
            activations: Vec::new(),
            file_sets: Vec::new(),
            injected_prompts: Vec::new(),
            stop_clicks: 0,
        }
    }
}

impl FixtureState {
    /// Menu items visible right now, with their node ids.
    fn visible_menu_items(&self) -> Vec<(i64, String)> {
        if !self.menu_open {
            return Vec::new();
        }
        let mut items: Vec<(i64, String)> = self
            .menu_items
            .iter()
            .enumerate()
            .map(|(i, label)| (MODEL_ITEM_BASE + i as i64, label.clone()))
            .collect();
        if self.submenu_opened {
            items.extend(self.submenu_items.iter().enumerate().map(|(i, label)| {
                (MODEL_ITEM_BASE + 500 + i as i64, label.clone())
            }));
        }
        items
    }

    fn menu_item_label(&self, node_id: i64) -> Option<String> {
        self.visible_menu_items()
            .into_iter()
            .find(|(id, _)| *id == node_id)
            .map(|(_, label)| label)
    }
}

/// The scripted host.
pub struct FixtureHost {
    pub state: Mutex<FixtureState>,
    bridge_tx: mpsc::UnboundedSender<Value>,
    bridge_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Value>>,
}

impl FixtureHost {
    pub fn new() -> Arc<Self> {
        let (bridge_tx, bridge_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            state: Mutex::new(FixtureState::default()),
            bridge_tx,
            bridge_rx: tokio::sync::Mutex::new(bridge_rx),
        })
    }

    /// Inspect or mutate the script state.
    pub fn with<R>(&self, f: impl FnOnce(&mut FixtureState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn sends_clicked(&self) -> usize {
        self.with(|s| s.clicks.iter().filter(|&&id| id == SEND).count())
    }
}

#[async_trait]
impl HostProbe for FixtureHost {
    async fn find(&self, target: ProbeTarget) -> Option<HostElement> {
        let s = self.state.lock();
        let node_id = match target {
            ProbeTarget::Editor => Some(EDITOR),
            ProbeTarget::SendButton => s.send_present.then_some(SEND),
            ProbeTarget::StopButton => s.generating.then_some(STOP),
            ProbeTarget::VoiceButton => (!s.generating).then_some(VOICE),
            ProbeTarget::ComposerRoot => Some(COMPOSER_ROOT),
            ProbeTarget::FileInput => s.file_input_present.then_some(FILE_INPUT),
            ProbeTarget::AttachButton => None,
            ProbeTarget::ModelSwitcher => s.switcher_present.then_some(SWITCHER),
            ProbeTarget::ModelMenu => s.menu_open.then_some(MODEL_MENU),
            ProbeTarget::ThinkingTrigger => Some(THINKING_TRIGGER),
            ProbeTarget::ThinkingMenu => s.thinking_menu_open.then_some(THINKING_MENU),
            _ => None,
        };
        node_id.map(|node_id| HostElement { node_id })
    }

    async fn find_all(&self, target: ProbeTarget) -> Vec<HostElement> {
        let s = self.state.lock();
        let ids: Vec<i64> = match target {
            ProbeTarget::ModelMenuItem => {
                s.visible_menu_items().into_iter().map(|(id, _)| id).collect()
            }
            ProbeTarget::SubmenuTrigger => {
                if s.menu_open && s.submenu_present {
                    vec![SUBMENU_TRIGGER]
                } else {
                    Vec::new()
                }
            }
            ProbeTarget::ThinkingMenuItem => {
                if s.thinking_menu_open {
                    (0..THINKING_LABELS.len() as i64)
                        .map(|i| THINKING_ITEM_BASE + i)
                        .collect()
                } else {
                    Vec::new()
                }
            }
            ProbeTarget::AttachmentPreview => {
                (0..s.attachment_count as i64).map(|i| PREVIEW_BASE + i).collect()
            }
            _ => {
                drop(s);
                return self.find(target).await.into_iter().collect();
            }
        };
        ids.into_iter().map(|node_id| HostElement { node_id }).collect()
    }

    async fn text(&self, el: HostElement) -> String {
        let s = self.state.lock();
        match el.node_id {
            EDITOR => s.editor_text.clone(),
            SWITCHER => s.header_label.clone().unwrap_or_default(),
            THINKING_TRIGGER => s
                .thinking_selected
                .clone()
                .unwrap_or_else(|| "Standard".to_string()),
            id if id >= THINKING_ITEM_BASE && id < PREVIEW_BASE => THINKING_LABELS
                [(id - THINKING_ITEM_BASE) as usize]
                .to_string(),
            id => s.menu_item_label(id).unwrap_or_default(),
        }
    }

    async fn is_disabled(&self, el: HostElement) -> bool {
        let s = self.state.lock();
        el.node_id == SEND && s.send_disabled
    }

    async fn current_url(&self) -> Option<String> {
        Some("https://chat.example.com/c/fixture".to_string())
    }

    async fn drafted_attachments(&self) -> Vec<Attachment> {
        self.state.lock().drafted.clone()
    }
}

#[async_trait]
impl InteractionDispatcher for FixtureHost {
    async fn click(&self, el: HostElement) -> bool {
        let mut s = self.state.lock();
        s.clicks.push(el.node_id);
        match el.node_id {
            STOP => {
                s.stop_clicks += 1;
                s.generating = false;
            }
            SEND => {
                if !s.send_disabled {
                    s.editor_text.clear();
                    s.attachment_count = 0;
                }
            }
            _ => {}
        }
        true
    }

    async fn activate(&self, el: HostElement) -> bool {
        {
            let mut s = self.state.lock();
            s.activations.push(el.node_id);
            match el.node_id {
                SWITCHER => {
                    if s.switcher_toggles_menu {
                        s.menu_open = !s.menu_open;
                        if !s.menu_open {
                            s.submenu_opened = false;
                        }
                    }
                }
                SUBMENU_TRIGGER => s.submenu_opened = true,
                THINKING_TRIGGER => s.thinking_menu_open = !s.thinking_menu_open,
                id if id >= THINKING_ITEM_BASE && id < PREVIEW_BASE => {
                    s.thinking_selected =
                        Some(THINKING_LABELS[(id - THINKING_ITEM_BASE) as usize].to_string());
                    s.thinking_menu_open = false;
                }
                id => {
                    if let Some(label) = s.menu_item_label(id) {
                        if s.select_on_activate {
                            s.header_label = Some(label);
                            s.menu_open = false;
                            s.submenu_opened = false;
                        }
                    }
                }
            }
        }
        if el.node_id == SEND {
            return self.click(el).await;
        }
        true
    }

    async fn set_input_files(&self, el: HostElement, paths: &[String]) -> bool {
        let mut s = self.state.lock();
        s.file_sets.push((el.node_id, paths.to_vec()));
        if s.reflect_file_sets {
            s.attachment_count += paths.len();
        }
        true
    }
}

#[async_trait]
impl BridgeTransport for FixtureHost {
    async fn send(&self, message: Value) -> bool {
        let mut s = self.state.lock();
        if message.get("type").and_then(Value::as_str) == Some(SET_PROMPT_TYPE) {
            let text = message
                .get("text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            s.editor_text = text.clone();
            s.injected_prompts.push(text);
            if s.ack_prompt {
                let _ = self
                    .bridge_tx
                    .send(serde_json::json!({ "type": SET_PROMPT_DONE_TYPE }));
            }
        }
        true
    }

    async fn recv(&self) -> Option<Value> {
        self.bridge_rx.lock().await.recv().await
    }
}
