//! # ChatQueue Host
//!
//! Everything that touches the host page lives here: the CDP transport,
//! the DOM probe layer (the only place that knows host selectors), the
//! synthetic-interaction dispatcher and the page-realm editor bridge.
//!
//! The rest of the workspace depends on the traits ([`HostProbe`],
//! [`InteractionDispatcher`], [`BridgeTransport`]) rather than on CDP, so
//! tests substitute scripted fixtures for the live page.

pub mod bridge;
pub mod cdp;
pub mod config;
pub mod interact;
pub mod probe;
pub mod selectors;
pub mod wait;

pub use bridge::{
    BridgeTransport, CdpBridgeTransport, EditorBridge, SET_PROMPT_DONE_TYPE, SET_PROMPT_TYPE,
};
pub use cdp::{CdpClient, CdpError, PageSession};
pub use config::HostConfig;
pub use interact::{CdpInteractions, InteractionDispatcher};
pub use probe::{CdpProbe, HostElement, HostProbe};
pub use selectors::ProbeTarget;
