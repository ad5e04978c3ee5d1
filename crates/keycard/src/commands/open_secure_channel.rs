//! OPEN SECURE CHANNEL command.

use bytes::Bytes;
use cairn_apdu::{Command, Response};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use thiserror::Error;

use crate::crypto::Challenge;

use super::CLA_GP;

/// OPEN SECURE CHANNEL (INS 0x10): presents our ephemeral public key
/// against a pairing slot and receives the session salt and initial IV.
pub struct OpenSecureChannelCommand;

impl OpenSecureChannelCommand {
    /// Build the command for the given pairing slot and ephemeral key.
    ///
    /// The payload is the full 65-byte uncompressed point; sending a
    /// compressed or hashed form does not interoperate.
    pub fn with_pairing_index_and_pubkey(
        pairing_index: u8,
        public_key: &k256::PublicKey,
    ) -> Command {
        Command::new(CLA_GP, 0x10, pairing_index, 0x00)
            .with_data(Bytes::copy_from_slice(public_key.to_encoded_point(false).as_bytes()))
    }

    /// Parse the response: exactly `salt(32) ‖ iv(16)`.
    pub fn parse_response(
        response: Response,
    ) -> Result<(Challenge, [u8; 16]), OpenSecureChannelError> {
        match response.status().to_u16() {
            0x9000 => {
                let data = response.into_data();
                if data.len() != 48 {
                    return Err(OpenSecureChannelError::InvalidResponse(
                        "expected 48 bytes of salt and IV",
                    ));
                }

                let salt = *Challenge::from_slice(&data[..32]);
                let mut iv = [0u8; 16];
                iv.copy_from_slice(&data[32..]);
                Ok((salt, iv))
            }
            0x6A86 => Err(OpenSecureChannelError::InvalidP1),
            0x6A80 => Err(OpenSecureChannelError::InvalidData),
            sw => Err(OpenSecureChannelError::Unknown { sw }),
        }
    }
}

/// Errors from OPEN SECURE CHANNEL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OpenSecureChannelError {
    /// The pairing index does not name an occupied slot.
    #[error("invalid pairing index")]
    InvalidP1,

    /// The payload is not a valid public key.
    #[error("card rejected the ephemeral public key")]
    InvalidData,

    /// The response payload has an unexpected shape.
    #[error("invalid OPEN SECURE CHANNEL response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::generate_ephemeral_keypair;
    use cairn_apdu::StatusWord;

    #[test]
    fn sends_full_uncompressed_point() {
        let key = generate_ephemeral_keypair();
        let command =
            OpenSecureChannelCommand::with_pairing_index_and_pubkey(2, &key.public_key());

        assert_eq!(command.instruction(), 0x10);
        assert_eq!(command.p1(), 2);
        let data = command.data().unwrap();
        assert_eq!(data.len(), 65);
        assert_eq!(data[0], 0x04);
    }

    #[test]
    fn rejects_wrong_length_response() {
        let response = Response::new(vec![0u8; 47], StatusWord::from_u16(0x9000));
        assert!(matches!(
            OpenSecureChannelCommand::parse_response(response),
            Err(OpenSecureChannelError::InvalidResponse(_))
        ));
    }

    #[test]
    fn splits_salt_and_iv() {
        let mut payload = vec![0xAAu8; 32];
        payload.extend([0xBBu8; 16]);
        let response = Response::new(payload, StatusWord::from_u16(0x9000));

        let (salt, iv) = OpenSecureChannelCommand::parse_response(response).unwrap();
        assert_eq!(salt.as_slice(), &[0xAA; 32]);
        assert_eq!(iv, [0xBB; 16]);
    }
}
