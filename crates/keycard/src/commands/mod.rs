//! Per-command encodings, status-word mappings and typed responses.
//!
//! Each module covers one applet instruction: a builder producing the
//! [`Command`], an `Ok` type for the parsed success payload and a closed
//! error enum with one variant per documented status word plus a catch-all
//! `Unknown { sw }` retaining the raw value.
//!
//! [`Command`]: cairn_apdu::Command

pub mod data;
pub mod export_key;
pub mod factory_reset;
pub mod generate_key;
pub mod generate_mnemonic;
pub mod get_status;
pub mod ident;
pub mod init;
pub mod load_key;
pub mod mutually_authenticate;
pub mod open_secure_channel;
pub mod pair;
pub mod pin;
pub mod remove_key;
pub mod select;
pub mod set_pinless_path;
pub mod sign;
pub mod unpair;

pub use data::*;
pub use export_key::*;
pub use factory_reset::*;
pub use generate_key::*;
pub use generate_mnemonic::*;
pub use get_status::*;
pub use ident::*;
pub use init::*;
pub use load_key::*;
pub use mutually_authenticate::*;
pub use open_secure_channel::*;
pub use pair::*;
pub use pin::*;
pub use remove_key::*;
pub use select::*;
pub use set_pinless_path::*;
pub use sign::*;
pub use unpair::*;

use crate::path::{DeriveMode, KeyPath};

/// Proprietary class byte used by every Keycard instruction.
pub const CLA_GP: u8 = 0x80;

/// Persistent data regions addressed by STORE DATA / GET DATA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistentRecord {
    /// General-purpose public data
    Public = 0x00,
    /// NDEF record (requires the NDEF capability)
    Ndef = 0x01,
    /// Cash applet data
    Cash = 0x02,
}

/// Compose the P1 byte and path payload shared by the derivation-aware
/// commands (SIGN, EXPORT KEY).
///
/// A path with no components and a current-key source means "use the
/// current key" (P1 = 0x00, empty payload); anything else requires a
/// derive mode and encodes the path after the source bits.
pub(crate) fn prepare_derivation_parameters(
    path: &KeyPath,
    derive_mode: Option<DeriveMode>,
) -> (u8, Vec<u8>) {
    use crate::path::PathSource;

    if path.is_empty() && path.source() == PathSource::Current {
        return (0x00, Vec::new());
    }

    let mode = derive_mode.unwrap_or(DeriveMode::Temporary);
    (mode.p1_bits() | path.source().p1_bits(), path.to_bytes())
}
