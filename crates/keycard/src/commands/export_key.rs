//! EXPORT KEY command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::path::{DeriveMode, KeyPath};
use crate::types::ExportedKey;

use super::{prepare_derivation_parameters, CLA_GP};

/// What EXPORT KEY should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOption {
    /// Private and public key
    PrivateAndPublic = 0x00,
    /// Public key only
    PublicKeyOnly = 0x01,
    /// Public key with chain code
    ExtendedPublicKey = 0x02,
}

/// EXPORT KEY (INS 0xC2): exports the current or a derived key.
pub struct ExportKeyCommand;

impl ExportKeyCommand {
    /// Export the current key without derivation.
    pub fn from_current(what: ExportOption) -> Command {
        Command::new(CLA_GP, 0xC2, 0x00, what as u8)
    }

    /// Export a key derived along `path`.
    pub fn with_derivation(
        what: ExportOption,
        path: &KeyPath,
        derive_mode: DeriveMode,
    ) -> Command {
        let (p1, data) = prepare_derivation_parameters(path, Some(derive_mode));
        let command = Command::new(CLA_GP, 0xC2, p1, what as u8);
        if data.is_empty() {
            command
        } else {
            command.with_data(data)
        }
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<ExportedKey, ExportKeyError> {
        match response.status().to_u16() {
            0x9000 => {
                ExportedKey::parse(response.data()).map_err(ExportKeyError::InvalidResponse)
            }
            0x6985 => Err(ExportKeyError::PrivateNotExportable),
            0x6A80 => Err(ExportKeyError::InvalidPath),
            0x6A86 => Err(ExportKeyError::InvalidParams),
            sw => Err(ExportKeyError::Unknown { sw }),
        }
    }
}

/// Errors from EXPORT KEY.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExportKeyError {
    /// The private key at this path may not leave the card.
    #[error("private key not exportable from this path")]
    PrivateNotExportable,

    /// The derivation path was rejected.
    #[error("card rejected the derivation path")]
    InvalidPath,

    /// The export option or derivation source is invalid.
    #[error("invalid export parameters")]
    InvalidParams,

    /// The response payload has an unexpected shape.
    #[error("invalid EXPORT KEY response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
