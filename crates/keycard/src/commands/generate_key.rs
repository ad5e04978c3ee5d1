//! GENERATE KEY command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use super::CLA_GP;

/// GENERATE KEY (INS 0xD4): creates a new master keypair on the card and
/// returns its key UID (SHA-256 of the public key).
pub struct GenerateKeyCommand;

impl GenerateKeyCommand {
    /// Build the command.
    pub fn create() -> Command {
        Command::new(CLA_GP, 0xD4, 0x00, 0x00)
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<[u8; 32], GenerateKeyError> {
        match response.status().to_u16() {
            0x9000 => response
                .data()
                .try_into()
                .map_err(|_| GenerateKeyError::InvalidResponse("key UID must be 32 bytes")),
            0x6985 => Err(GenerateKeyError::ConditionsNotMet),
            sw => Err(GenerateKeyError::Unknown { sw }),
        }
    }
}

/// Errors from GENERATE KEY.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateKeyError {
    /// Secure channel and verified PIN are required.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// The response payload has an unexpected shape.
    #[error("invalid GENERATE KEY response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
