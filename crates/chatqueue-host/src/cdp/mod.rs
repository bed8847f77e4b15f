//! Chrome DevTools Protocol transport.

pub mod client;
pub mod error;
pub mod protocol;
pub mod session;

pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::{BrowserVersion, CdpRequest, CdpResponse, PageEvent, PageInfo};
pub use session::PageSession;
