//! GET STATUS command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::path::KeyPath;
use crate::types::ApplicationStatus;

use super::CLA_GP;

/// GET STATUS (INS 0xF2): application status (P1 0x00) or the current
/// BIP32 key path (P1 0x01).
pub struct GetStatusCommand;

impl GetStatusCommand {
    /// Query PIN/PUK retry counters and key presence.
    pub fn application() -> Command {
        Command::new(CLA_GP, 0xF2, 0x00, 0x00)
    }

    /// Query the current key path.
    pub fn key_path() -> Command {
        Command::new(CLA_GP, 0xF2, 0x01, 0x00)
    }

    /// Parse an application-status response.
    pub fn parse_application(response: Response) -> Result<ApplicationStatus, GetStatusError> {
        let data = Self::check_status(response)?;
        ApplicationStatus::parse(&data).map_err(GetStatusError::InvalidResponse)
    }

    /// Parse a key-path response: a concatenation of 32-bit big-endian
    /// components, empty for the master key.
    pub fn parse_key_path(response: Response) -> Result<KeyPath, GetStatusError> {
        let data = Self::check_status(response)?;
        if data.len() % 4 != 0 {
            return Err(GetStatusError::InvalidResponse(
                "key path must be 32-bit components",
            ));
        }
        KeyPath::from_card_bytes(&data)
            .map_err(|_| GetStatusError::InvalidResponse("key path too deep"))
    }

    fn check_status(response: Response) -> Result<bytes::Bytes, GetStatusError> {
        match response.status().to_u16() {
            0x9000 => Ok(response.into_data()),
            0x6A86 => Err(GetStatusError::InvalidP1),
            sw => Err(GetStatusError::Unknown { sw }),
        }
    }
}

/// Errors from GET STATUS.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GetStatusError {
    /// P1 does not name a status kind.
    #[error("invalid status selector")]
    InvalidP1,

    /// The response payload has an unexpected shape.
    #[error("invalid GET STATUS response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_apdu::StatusWord;
    use hex_literal::hex;

    #[test]
    fn parses_key_path_components() {
        let response = Response::new(
            hex!("8000002C8000003C00000000").to_vec(),
            StatusWord::from_u16(0x9000),
        );
        let path = GetStatusCommand::parse_key_path(response).unwrap();
        assert_eq!(path.to_string(), "m/44'/60'/0");
    }

    #[test]
    fn empty_key_path_is_master() {
        let response = Response::new(Vec::new(), StatusWord::from_u16(0x9000));
        let path = GetStatusCommand::parse_key_path(response).unwrap();
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "m");
    }
}
