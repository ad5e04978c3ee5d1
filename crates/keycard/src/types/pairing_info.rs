use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A pairing record: the slot index assigned by the card, the derived
/// pairing key and the salt it was derived from.
///
/// The library keeps nothing on disk; persisting this record between
/// sessions is the embedder's job.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PairingInfo {
    /// Derived pairing key (SHA-256 of pairing token and salt).
    pub key: [u8; 32],
    /// Pairing slot index assigned by the card.
    pub index: u8,
    /// Salt returned by the card during pairing.
    pub salt: [u8; 32],
}

impl fmt::Debug for PairingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingInfo")
            .field("index", &self.index)
            .field("key", &"[redacted]")
            .finish()
    }
}
