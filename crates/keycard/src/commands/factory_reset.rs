//! FACTORY RESET command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use super::CLA_GP;

/// FACTORY RESET (INS 0xFD, P1 0xAA, P2 0x55): wipes the card back to its
/// pre-initialized state. Requires only a prior SELECT.
pub struct FactoryResetCommand;

impl FactoryResetCommand {
    /// Build the command. The magic P1/P2 values guard against stray
    /// instructions.
    pub fn reset() -> Command {
        Command::new(CLA_GP, 0xFD, 0xAA, 0x55)
    }

    /// Parse the response.
    pub fn parse_response(response: Response) -> Result<(), FactoryResetError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            0x6A86 => Err(FactoryResetError::InvalidP1P2),
            sw => Err(FactoryResetError::Unknown { sw }),
        }
    }
}

/// Errors from FACTORY RESET.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FactoryResetError {
    /// The magic P1/P2 values were not recognized.
    #[error("factory reset not accepted")]
    InvalidP1P2,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
