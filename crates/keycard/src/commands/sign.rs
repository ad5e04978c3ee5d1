//! SIGN command.

use bytes::{BufMut, Bytes, BytesMut};
use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::path::{DeriveMode, KeyPath};
use crate::types::Signature;

use super::{prepare_derivation_parameters, CLA_GP};

/// ECDSA over secp256k1; the only algorithm current applets implement.
const ALGORITHM_ECDSA_SECP256K1: u8 = 0x00;

/// SIGN (INS 0xC0): signs a 32-byte hash with the current or a derived
/// key. P1 0x03 selects the PIN-less path, which bypasses the secure
/// channel entirely.
pub struct SignCommand;

impl SignCommand {
    /// Sign with the current key or along a derivation path.
    pub fn with(hash: &[u8; 32], path: &KeyPath, derive_mode: Option<DeriveMode>) -> Command {
        let (p1, path_data) = prepare_derivation_parameters(path, derive_mode);

        let data = if path_data.is_empty() {
            Bytes::copy_from_slice(hash)
        } else {
            let mut buf = BytesMut::with_capacity(hash.len() + path_data.len());
            buf.put_slice(hash);
            buf.put_slice(&path_data);
            buf.freeze()
        };

        Command::new(CLA_GP, 0xC0, p1, ALGORITHM_ECDSA_SECP256K1).with_data(data)
    }

    /// Sign with the PIN-less path (P1 0x03), outside the secure channel.
    pub fn with_pinless(hash: &[u8; 32]) -> Command {
        Command::new(CLA_GP, 0xC0, 0x03, ALGORITHM_ECDSA_SECP256K1)
            .with_data(Bytes::copy_from_slice(hash))
    }

    /// Parse the response, accepting both the raw 65-byte shape and the
    /// public-key-plus-DER template newer firmware returns.
    pub fn parse_response(response: Response) -> Result<Signature, SignError> {
        match response.status().to_u16() {
            0x9000 => Signature::parse(response.data()).map_err(SignError::InvalidResponse),
            0x6A80 => Err(SignError::DataTooShort),
            0x6A81 => Err(SignError::AlgorithmNotSupported),
            0x6A88 => Err(SignError::NoPinlessPath),
            0x6985 => Err(SignError::ConditionsNotMet),
            sw => Err(SignError::Unknown { sw }),
        }
    }
}

/// Errors from SIGN.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignError {
    /// The hash to sign must be exactly 32 bytes.
    #[error("data to sign must be a 32-byte hash")]
    DataTooShort,

    /// P2 names a reserved signing algorithm.
    #[error("signing algorithm not supported")]
    AlgorithmNotSupported,

    /// PIN-less signing was requested but no PIN-less path is set.
    #[error("no PIN-less path set")]
    NoPinlessPath,

    /// Secure channel and verified PIN are required.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// The response payload has an unexpected shape.
    #[error("invalid SIGN response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_key_sign_sends_bare_hash() {
        let command = SignCommand::with(&[0x5A; 32], &KeyPath::current(), None);
        assert_eq!(command.p1(), 0x00);
        assert_eq!(command.p2(), 0x00);
        assert_eq!(command.data().unwrap().len(), 32);
    }

    #[test]
    fn derived_sign_appends_path() {
        let path: KeyPath = "m/44'/60'".parse().unwrap();
        let command = SignCommand::with(&[0x5A; 32], &path, Some(DeriveMode::Persistent));
        assert_eq!(command.p1(), 0x02);
        assert_eq!(command.data().unwrap().len(), 32 + 8);
    }

    #[test]
    fn pinless_sign_uses_p1_3() {
        let command = SignCommand::with_pinless(&[0x5A; 32]);
        assert_eq!(command.p1(), 0x03);
        assert_eq!(command.data().unwrap().len(), 32);
    }
}
