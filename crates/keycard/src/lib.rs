//! Host-side client for the Status Keycard applet.
//!
//! The [`Keycard`] session aggregate owns a [`CardTransport`] and drives the
//! applet protocol over it: SELECT and INIT, pairing, the ECDH-derived
//! AES-256-CBC secure channel with its MAC chain, and the full command set
//! (PIN management, key management, signing, data storage).
//!
//! Pairing records returned by [`Keycard::pair`] are the embedder's to
//! persist; the library keeps no state on disk.
//!
//! [`CardTransport`]: cairn_apdu::CardTransport

pub mod commands;
mod constants;
mod crypto;
mod error;
mod keycard;
mod path;
mod secrets;
mod secure_channel;
mod tlv;
mod types;

pub use crypto::{Challenge, Cryptogram, PairingToken};
pub use error::{Error, Result};
pub use keycard::Keycard;
pub use path::{DeriveMode, KeyPath, PathError, PathSource};
pub use secrets::Secrets;
pub use secure_channel::{SecureChannel, SecureChannelError};
pub use types::{
    ApplicationInfo, ApplicationStatus, Capabilities, Capability, ExportedKey, Identity, Mnemonic,
    PairingInfo, Signature, Version,
};

pub use constants::{tags, KEYCARD_AID};

/// Version of the applet protocol a card speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppletVersion {
    /// Versions before 3.1
    Legacy,
    /// Version 3.1 and above
    V3_1,
}

/// Build the AID of a specific Keycard applet instance.
pub fn keycard_instance_aid(index: u8) -> Vec<u8> {
    assert!(index >= 1);
    let mut aid = Vec::from(KEYCARD_AID);
    aid.push(index);
    aid
}
