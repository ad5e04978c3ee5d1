//! LOAD KEY command.

use cairn_apdu::{Command, Response};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use thiserror::Error;

use crate::constants::tags;
use crate::tlv::{self, Tlv};

use super::CLA_GP;

/// LOAD KEY (INS 0xD0): imports key material as the card's master key.
/// Clears any PIN-less path. Returns the new key UID.
pub struct LoadKeyCommand;

impl LoadKeyCommand {
    /// Load an ECC keypair (P1 0x01). The public key is optional; the
    /// card recomputes it when absent.
    pub fn load_keypair(
        public_key: Option<&k256::PublicKey>,
        private_key: &k256::SecretKey,
    ) -> Command {
        Command::new(CLA_GP, 0xD0, 0x01, 0x00)
            .with_data(keypair_template(public_key, private_key, None))
    }

    /// Load an extended ECC keypair with its chain code (P1 0x02).
    pub fn load_extended_keypair(
        public_key: Option<&k256::PublicKey>,
        private_key: &k256::SecretKey,
        chain_code: &[u8; 32],
    ) -> Command {
        Command::new(CLA_GP, 0xD0, 0x02, 0x00)
            .with_data(keypair_template(public_key, private_key, Some(chain_code)))
    }

    /// Load a raw 64-byte BIP39 seed (P1 0x03).
    pub fn load_bip39_seed(seed: &[u8; 64]) -> Command {
        Command::new(CLA_GP, 0xD0, 0x03, 0x00).with_data(seed.to_vec())
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<[u8; 32], LoadKeyError> {
        match response.status().to_u16() {
            0x9000 => response
                .data()
                .try_into()
                .map_err(|_| LoadKeyError::InvalidResponse("key UID must be 32 bytes")),
            0x6A80 => Err(LoadKeyError::InvalidData),
            0x6985 => Err(LoadKeyError::ConditionsNotMet),
            sw => Err(LoadKeyError::Unknown { sw }),
        }
    }
}

fn keypair_template(
    public_key: Option<&k256::PublicKey>,
    private_key: &k256::SecretKey,
    chain_code: Option<&[u8; 32]>,
) -> Vec<u8> {
    let mut children = Vec::new();
    if let Some(public_key) = public_key {
        children.extend(
            Tlv::new(
                tags::ECC_PUBLIC_KEY,
                public_key.to_encoded_point(false).as_bytes().to_vec(),
            )
            .to_bytes(),
        );
    }
    children.extend(
        Tlv::new(tags::ECC_PRIVATE_KEY, private_key.to_bytes().to_vec()).to_bytes(),
    );
    if let Some(chain_code) = chain_code {
        children.extend(Tlv::new(tags::CHAIN_CODE, chain_code.to_vec()).to_bytes());
    }

    tlv::encode(tags::TEMPLATE_KEYPAIR, &children)
}

/// Errors from LOAD KEY.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadKeyError {
    /// The key material was rejected.
    #[error("card rejected the key material")]
    InvalidData,

    /// Secure channel and verified PIN are required.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// The response payload has an unexpected shape.
    #[error("invalid LOAD KEY response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
