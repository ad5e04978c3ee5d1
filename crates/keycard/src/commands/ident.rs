//! IDENT command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::crypto::{random_challenge, Challenge};
use crate::types::Identity;

use super::CLA_GP;

/// IDENT (INS 0x14): has the card prove its identity by signing a
/// challenge with its identification key.
pub struct IdentCommand;

impl IdentCommand {
    /// Identify against a caller-provided 32-byte challenge.
    pub fn with_challenge(challenge: &Challenge) -> Command {
        Command::new(CLA_GP, 0x14, 0x00, 0x00).with_data(challenge.to_vec())
    }

    /// Identify against a freshly generated random challenge.
    pub fn with_random_challenge() -> Command {
        Self::with_challenge(&random_challenge())
    }

    /// Parse the IDENT response.
    pub fn parse_response(response: Response) -> Result<Identity, IdentError> {
        match response.status().to_u16() {
            0x9000 => Identity::parse(response.data()).map_err(IdentError::InvalidResponse),
            0x6A80 => Err(IdentError::InvalidFormat),
            sw => Err(IdentError::Unknown { sw }),
        }
    }
}

/// Errors from IDENT.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentError {
    /// The card rejected the challenge format.
    #[error("card rejected the challenge format")]
    InvalidFormat,

    /// The response record could not be parsed.
    #[error("invalid IDENT response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
