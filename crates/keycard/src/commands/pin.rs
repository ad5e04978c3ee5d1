//! VERIFY PIN, CHANGE SECRET and UNBLOCK PIN commands.

use bytes::{Bytes, BytesMut};
use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::crypto::generate_pairing_token;

use super::CLA_GP;

/// VERIFY PIN (INS 0x20): authenticates the user over the secure channel.
pub struct VerifyPinCommand;

impl VerifyPinCommand {
    /// Build the command; the payload is the raw PIN digits.
    pub fn with_pin(pin: &str) -> Command {
        Command::new(CLA_GP, 0x20, 0x00, 0x00).with_data(Bytes::copy_from_slice(pin.as_bytes()))
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<(), VerifyPinError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            sw if sw & 0xFFF0 == 0x63C0 => match (sw & 0x000F) as u8 {
                0 => Err(VerifyPinError::Blocked),
                retries => Err(VerifyPinError::Incorrect { retries }),
            },
            sw => Err(VerifyPinError::Unknown { sw }),
        }
    }
}

/// Errors from VERIFY PIN.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyPinError {
    /// Wrong PIN; the given number of attempts remain.
    #[error("incorrect PIN, {retries} attempts remaining")]
    Incorrect { retries: u8 },

    /// No attempts remain; the PIN must be unblocked with the PUK.
    #[error("PIN is blocked")]
    Blocked,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

/// Which credential CHANGE SECRET replaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialType {
    /// User PIN (six digits)
    Pin,
    /// PUK (twelve digits)
    Puk,
    /// Pairing secret (arbitrary password)
    PairingSecret,
}

/// CHANGE SECRET (INS 0x21): replaces the PIN, PUK or pairing secret.
pub struct ChangeSecretCommand;

impl ChangeSecretCommand {
    /// Replace the user PIN.
    pub fn with_pin(pin: &str) -> Command {
        Command::new(CLA_GP, 0x21, 0x00, 0x00).with_data(Bytes::copy_from_slice(pin.as_bytes()))
    }

    /// Replace the PUK.
    pub fn with_puk(puk: &str) -> Command {
        Command::new(CLA_GP, 0x21, 0x01, 0x00).with_data(Bytes::copy_from_slice(puk.as_bytes()))
    }

    /// Replace the pairing secret. The password runs through the same
    /// PBKDF2 derivation as during pairing.
    pub fn with_pairing_secret(password: &str) -> Command {
        Command::new(CLA_GP, 0x21, 0x02, 0x00)
            .with_data(generate_pairing_token(password).to_vec())
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<(), ChangeSecretError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            0x6A80 => Err(ChangeSecretError::InvalidFormat),
            0x6A86 => Err(ChangeSecretError::InvalidP1),
            0x6985 => Err(ChangeSecretError::ConditionsNotMet),
            sw => Err(ChangeSecretError::Unknown { sw }),
        }
    }
}

/// Errors from CHANGE SECRET.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChangeSecretError {
    /// The new credential has an invalid format.
    #[error("card rejected the new credential format")]
    InvalidFormat,

    /// P1 does not name a changeable credential.
    #[error("invalid credential selector")]
    InvalidP1,

    /// Secure channel and verified PIN are required.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

/// UNBLOCK PIN (INS 0x22): resets a blocked PIN using the PUK.
pub struct UnblockPinCommand;

impl UnblockPinCommand {
    /// Build the command: `puk(12) ‖ new_pin(6)`.
    pub fn with_puk_and_new_pin(puk: &str, new_pin: &str) -> Command {
        let mut buf = BytesMut::with_capacity(puk.len() + new_pin.len());
        buf.extend_from_slice(puk.as_bytes());
        buf.extend_from_slice(new_pin.as_bytes());
        Command::new(CLA_GP, 0x22, 0x00, 0x00).with_data(buf.freeze())
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<(), UnblockPinError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            sw if sw & 0xFFF0 == 0x63C0 => match (sw & 0x000F) as u8 {
                // A blocked PUK means the wallet is effectively lost.
                0 => Err(UnblockPinError::PukBlocked),
                retries => Err(UnblockPinError::IncorrectPuk { retries }),
            },
            0x6985 => Err(UnblockPinError::ConditionsNotMet),
            0x6A80 => Err(UnblockPinError::InvalidFormat),
            sw => Err(UnblockPinError::Unknown { sw }),
        }
    }
}

/// Errors from UNBLOCK PIN.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnblockPinError {
    /// Wrong PUK; the given number of attempts remain.
    #[error("incorrect PUK, {retries} attempts remaining")]
    IncorrectPuk { retries: u8 },

    /// No PUK attempts remain.
    #[error("PUK is blocked")]
    PukBlocked,

    /// The PIN is not blocked, or the channel preconditions fail.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// The payload format was rejected.
    #[error("card rejected the unblock data format")]
    InvalidFormat,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_apdu::StatusWord;

    fn response(sw: u16) -> Response {
        Response::new(Bytes::new(), StatusWord::from_u16(sw))
    }

    #[test]
    fn retry_counter_mapping() {
        assert_eq!(
            VerifyPinCommand::parse_response(response(0x63C2)),
            Err(VerifyPinError::Incorrect { retries: 2 })
        );
        assert_eq!(
            VerifyPinCommand::parse_response(response(0x63CF)),
            Err(VerifyPinError::Incorrect { retries: 15 })
        );
        assert_eq!(
            VerifyPinCommand::parse_response(response(0x63C0)),
            Err(VerifyPinError::Blocked)
        );
        assert!(VerifyPinCommand::parse_response(response(0x9000)).is_ok());
    }

    #[test]
    fn unblock_payload_concatenates_puk_and_pin() {
        let command = UnblockPinCommand::with_puk_and_new_pin("123456789012", "654321");
        assert_eq!(command.data().unwrap(), b"123456789012654321");
        assert_eq!(command.data().unwrap().len(), 18);
    }

    #[test]
    fn change_secret_selectors() {
        assert_eq!(ChangeSecretCommand::with_pin("123456").p1(), 0x00);
        assert_eq!(ChangeSecretCommand::with_puk("123456789012").p1(), 0x01);
        let pairing = ChangeSecretCommand::with_pairing_secret("hunter2");
        assert_eq!(pairing.p1(), 0x02);
        assert_eq!(pairing.data().unwrap().len(), 32);
    }
}
