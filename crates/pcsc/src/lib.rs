//! PC/SC transport backend for `cairn-apdu`.
//!
//! Wraps the platform PC/SC stack behind the [`CardTransport`] trait:
//! [`PcscManager`] enumerates readers and opens connections, and
//! [`PcscTransport`] moves APDUs to and from a connected card.
//!
//! [`CardTransport`]: cairn_apdu::CardTransport

mod config;
mod error;
mod manager;
mod transport;

pub use config::{PcscConfig, ShareMode};
pub use error::PcscError;
pub use manager::PcscManager;
pub use transport::PcscTransport;
