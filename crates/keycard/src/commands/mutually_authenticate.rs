//! MUTUALLY AUTHENTICATE command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::crypto::Challenge;

use super::CLA_GP;

/// MUTUALLY AUTHENTICATE (INS 0x11): the first exchange over a freshly
/// keyed channel. Both sides prove possession of the session keys by
/// producing a MAC the other can verify; the payload itself is random.
pub struct MutuallyAuthenticateCommand;

impl MutuallyAuthenticateCommand {
    /// Build the command around a 32-byte client challenge.
    pub fn with_challenge(challenge: &Challenge) -> Command {
        Command::new(CLA_GP, 0x11, 0x00, 0x00).with_data(challenge.to_vec())
    }

    /// Parse the (already unwrapped) response.
    ///
    /// Reaching a verified inner status word means the card speaks our MAC
    /// key; no further check of the returned random is required.
    pub fn parse_response(response: Response) -> Result<(), MutuallyAuthenticateError> {
        match response.status().to_u16() {
            0x9000 => {
                if response.data().len() < 16 {
                    return Err(MutuallyAuthenticateError::InvalidResponse(
                        "authentication payload too short",
                    ));
                }
                Ok(())
            }
            0x6982 => Err(MutuallyAuthenticateError::Failed),
            0x6985 => Err(MutuallyAuthenticateError::NotAfterOpen),
            sw => Err(MutuallyAuthenticateError::Unknown { sw }),
        }
    }
}

/// Errors from MUTUALLY AUTHENTICATE.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MutuallyAuthenticateError {
    /// The card could not verify our MAC.
    #[error("card could not authenticate the client")]
    Failed,

    /// The previous command was not OPEN SECURE CHANNEL.
    #[error("must immediately follow OPEN SECURE CHANNEL")]
    NotAfterOpen,

    /// The response payload has an unexpected shape.
    #[error("invalid MUTUALLY AUTHENTICATE response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
