//! REMOVE KEY command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use super::CLA_GP;

/// REMOVE KEY (INS 0xD3): deletes the master key from the card.
pub struct RemoveKeyCommand;

impl RemoveKeyCommand {
    /// Build the command.
    pub fn remove() -> Command {
        Command::new(CLA_GP, 0xD3, 0x00, 0x00)
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<(), RemoveKeyError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            0x6985 => Err(RemoveKeyError::ConditionsNotMet),
            sw => Err(RemoveKeyError::Unknown { sw }),
        }
    }
}

/// Errors from REMOVE KEY.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemoveKeyError {
    /// Secure channel and verified PIN are required.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
