//! # ChatQueue Protocols
//!
//! Shared data model for the ChatQueue workspace: queue entries and
//! attachments, the model catalog, in-memory and persisted queue state,
//! state-change events and the inter-process command surface.
//!
//! Contains data definitions only - behavior lives in the controller,
//! store and host crates.

pub mod command;
pub mod conversation;
pub mod entry;
pub mod event;
pub mod model;
pub mod state;

pub use command::{Command, StatusReport};
pub use conversation::{conversation_key, CONVERSATION_KEY_PREFIX, LEGACY_QUEUE_KEY};
pub use entry::{Attachment, QueueEntry, ThinkingLevel};
pub use event::{EventBus, StateEvent};
pub use model::ModelDefinition;
pub use state::{PauseReason, PersistedQueueState, QueuePhase, QueueState};
