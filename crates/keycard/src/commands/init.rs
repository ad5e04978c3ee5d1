//! INIT command.

use bytes::BytesMut;
use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::crypto::{generate_ecdh_shared_secret, generate_ephemeral_keypair, one_shot_encrypt};
use crate::secrets::Secrets;

use super::CLA_GP;

/// INIT (INS 0xFE): sets the card's PIN, PUK and pairing secret, encrypted
/// under a one-shot ECDH key against the card's public key.
pub struct InitCommand;

impl InitCommand {
    /// Build the INIT command for the given card key and secrets.
    pub fn with_card_pubkey_and_secrets(
        card_public_key: &k256::PublicKey,
        secrets: &Secrets,
    ) -> Command {
        // The ephemeral key only lives for this one ECDH run.
        let host_private_key = generate_ephemeral_keypair();
        let shared_secret = generate_ecdh_shared_secret(&host_private_key, card_public_key);

        let mut data = BytesMut::from(secrets.to_bytes().as_ref());
        let payload = one_shot_encrypt(&host_private_key.public_key(), &shared_secret, &mut data);

        Command::new(CLA_GP, 0xFE, 0x00, 0x00).with_data(payload)
    }

    /// Parse the INIT response.
    pub fn parse_response(response: Response) -> Result<(), InitError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            0x6D00 => Err(InitError::AlreadyInitialized),
            0x6A80 => Err(InitError::InvalidData),
            sw => Err(InitError::Unknown { sw }),
        }
    }
}

/// Errors from INIT.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    /// The card is already initialized.
    #[error("card is already initialized")]
    AlreadyInitialized,

    /// The card rejected the encrypted payload.
    #[error("card rejected the initialization data")]
    InvalidData,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
