//! # ChatQueue Controller
//!
//! The dispatch core: the queue controller owns the ordered queue and
//! its scheduling policy, the composer controller runs the send state
//! machine against the host page, and the model controller drives the
//! host's model-switcher menu.
//!
//! Controllers are explicit instances built from injected capabilities
//! (shared state handle, event bus, host probe, interaction dispatcher,
//! editor bridge, snapshot store) and torn down with `dispose()` - there
//! are no process-wide singletons, so tests run several independent
//! stacks side by side.

pub mod catalog;
pub mod composer;
pub mod config;
pub mod matching;
pub mod model;
pub mod queue;
pub mod state;

#[cfg(test)]
pub(crate) mod fixture;

pub use composer::ComposerController;
pub use config::{ComposerConfig, DispatchConfig, ModelConfig};
pub use matching::match_model_label;
pub use model::ModelController;
pub use queue::QueueController;
pub use state::QueueHandle;
