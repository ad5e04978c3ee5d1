//! SET PINLESS PATH command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::path::KeyPath;

use super::CLA_GP;

/// SET PINLESS PATH (INS 0xC1): marks a BIP32 subtree for signing without
/// PIN verification. An empty payload disables the feature.
pub struct SetPinlessPathCommand;

impl SetPinlessPathCommand {
    /// Set the PIN-less path.
    pub fn with_path(path: &KeyPath) -> Command {
        Command::new(CLA_GP, 0xC1, 0x00, 0x00).with_data(path.to_bytes())
    }

    /// Disable PIN-less signing.
    pub fn disable() -> Command {
        Self::with_path(&KeyPath::current())
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<(), SetPinlessPathError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            0x6A80 => Err(SetPinlessPathError::InvalidData),
            0x6985 => Err(SetPinlessPathError::ConditionsNotMet),
            sw => Err(SetPinlessPathError::Unknown { sw }),
        }
    }
}

/// Errors from SET PINLESS PATH.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetPinlessPathError {
    /// The path encoding was rejected.
    #[error("card rejected the path")]
    InvalidData,

    /// Secure channel and verified PIN are required.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
