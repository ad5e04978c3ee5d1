//! Configuration options for the PC/SC transport.

use pcsc::{Protocols, ShareMode as RawShareMode};

/// Sharing mode for card connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card (default)
    Shared,
    /// Direct connection to the reader
    Direct,
}

impl From<ShareMode> for RawShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

/// Configuration for a PC/SC connection.
#[derive(Debug, Clone)]
pub struct PcscConfig {
    /// Sharing mode for the card connection
    pub share_mode: ShareMode,
    /// Protocols offered during connect
    pub protocols: Protocols,
    /// Reconnect automatically when the card reports a reset
    pub auto_reconnect: bool,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            protocols: Protocols::ANY,
            auto_reconnect: true,
        }
    }
}
