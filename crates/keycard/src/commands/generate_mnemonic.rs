//! GENERATE MNEMONIC command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::types::Mnemonic;

use super::CLA_GP;

/// GENERATE MNEMONIC (INS 0xD2): produces BIP39 word indexes from card
/// entropy. P1 is the checksum size in bits (4..=8), giving
/// `12 + (P1 - 4) * 3` words.
pub struct GenerateMnemonicCommand;

impl GenerateMnemonicCommand {
    /// Build the command for a checksum size in bits.
    ///
    /// The range is enforced here; the card would answer 6A86 anyway.
    pub fn with_checksum_size(bits: u8) -> Result<Command, GenerateMnemonicError> {
        if !(4..=8).contains(&bits) {
            return Err(GenerateMnemonicError::InvalidChecksumSize);
        }
        Ok(Command::new(CLA_GP, 0xD2, bits, 0x00))
    }

    /// Build the command for a word count (12, 15, 18, 21 or 24).
    pub fn with_words(words: u8) -> Result<Command, GenerateMnemonicError> {
        match words {
            12 | 15 | 18 | 21 | 24 => Self::with_checksum_size(words / 3),
            _ => Err(GenerateMnemonicError::InvalidChecksumSize),
        }
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<Mnemonic, GenerateMnemonicError> {
        match response.status().to_u16() {
            0x9000 => {
                Mnemonic::parse(response.data()).map_err(GenerateMnemonicError::InvalidResponse)
            }
            0x6A86 => Err(GenerateMnemonicError::InvalidChecksumSize),
            sw => Err(GenerateMnemonicError::Unknown { sw }),
        }
    }
}

/// Errors from GENERATE MNEMONIC.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerateMnemonicError {
    /// The checksum size is outside 4..=8 bits.
    #[error("checksum size out of range (must be 4 to 8 bits)")]
    InvalidChecksumSize,

    /// The response payload has an unexpected shape.
    #[error("invalid GENERATE MNEMONIC response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
