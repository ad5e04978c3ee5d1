//! UNPAIR command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use super::CLA_GP;

/// UNPAIR (INS 0x13): frees a pairing slot. Sent over the secure channel.
pub struct UnpairCommand;

impl UnpairCommand {
    /// Unpair the given slot index.
    pub fn with_index(index: u8) -> Command {
        Command::new(CLA_GP, 0x13, index, 0x00)
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<(), UnpairError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            0x6985 => Err(UnpairError::ConditionsNotMet),
            0x6A86 => Err(UnpairError::InvalidIndex),
            sw => Err(UnpairError::Unknown { sw }),
        }
    }
}

/// Errors from UNPAIR.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnpairError {
    /// Secure channel and verified PIN are required.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// The index does not name a pairing slot.
    #[error("invalid pairing index")]
    InvalidIndex,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
