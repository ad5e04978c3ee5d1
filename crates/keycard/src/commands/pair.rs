//! PAIR command.

use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::crypto::{Challenge, Cryptogram};

use super::CLA_GP;

/// PAIR (INS 0x12): the two-step cryptogram exchange that allocates a
/// pairing slot on the card.
pub struct PairCommand;

impl PairCommand {
    /// First step (P1 0x00): present a random client challenge.
    pub fn first_stage(challenge: &Challenge) -> Command {
        Command::new(CLA_GP, 0x12, 0x00, 0x00).with_data(challenge.to_vec())
    }

    /// Final step (P1 0x01): answer the card's challenge with our
    /// cryptogram.
    pub fn final_stage(cryptogram: &Cryptogram) -> Command {
        Command::new(CLA_GP, 0x12, 0x01, 0x00).with_data(cryptogram.to_vec())
    }

    /// Parse the first-stage response: card cryptogram and card challenge.
    pub fn parse_first_stage(response: Response) -> Result<(Cryptogram, Challenge), PairError> {
        let data = Self::check_status(response)?;
        if data.len() != 64 {
            return Err(PairError::InvalidResponse(
                "first pairing step must return 64 bytes",
            ));
        }

        Ok((
            *Cryptogram::from_slice(&data[..32]),
            *Challenge::from_slice(&data[32..]),
        ))
    }

    /// Parse the final-stage response: pairing index and salt.
    pub fn parse_final_stage(response: Response) -> Result<(u8, [u8; 32]), PairError> {
        let data = Self::check_status(response)?;
        if data.len() != 33 {
            return Err(PairError::InvalidResponse(
                "final pairing step must return 33 bytes",
            ));
        }

        let mut salt = [0u8; 32];
        salt.copy_from_slice(&data[1..]);
        Ok((data[0], salt))
    }

    fn check_status(response: Response) -> Result<bytes::Bytes, PairError> {
        match response.status().to_u16() {
            0x9000 => Ok(response.into_data()),
            0x6A80 => Err(PairError::InvalidData),
            0x6A84 => Err(PairError::SlotsFull),
            0x6A86 => Err(PairError::InvalidP1),
            0x6982 => Err(PairError::CryptogramFailed),
            0x6985 => Err(PairError::SecureChannelOpen),
            sw => Err(PairError::Unknown { sw }),
        }
    }
}

/// Errors from PAIR.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairError {
    /// The challenge or cryptogram format was rejected.
    #[error("card rejected the pairing data")]
    InvalidData,

    /// Every pairing slot on the card is taken.
    #[error("all pairing slots are taken")]
    SlotsFull,

    /// P1 is invalid, or the final step was sent before the first.
    #[error("invalid pairing step")]
    InvalidP1,

    /// The card could not verify our cryptogram.
    #[error("client cryptogram verification failed")]
    CryptogramFailed,

    /// Pairing is not possible while a secure channel is open.
    #[error("secure channel is open")]
    SecureChannelOpen,

    /// The response payload has an unexpected shape.
    #[error("invalid PAIR response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use cairn_apdu::StatusWord;

    #[test]
    fn builds_both_stages() {
        let challenge_bytes = [0x0Au8; 32];
        let challenge = Challenge::from_slice(&challenge_bytes);
        let first = PairCommand::first_stage(challenge);
        assert_eq!(first.instruction(), 0x12);
        assert_eq!(first.p1(), 0x00);
        assert_eq!(first.data().unwrap().len(), 32);

        let final_stage = PairCommand::final_stage(challenge);
        assert_eq!(final_stage.p1(), 0x01);
    }

    #[test]
    fn parses_first_stage_payload() {
        let mut payload = vec![0x11u8; 32];
        payload.extend([0x22u8; 32]);
        let response = Response::new(payload, StatusWord::from_u16(0x9000));

        let (cryptogram, challenge) = PairCommand::parse_first_stage(response).unwrap();
        assert_eq!(cryptogram.as_slice(), &[0x11; 32]);
        assert_eq!(challenge.as_slice(), &[0x22; 32]);
    }

    #[test]
    fn parses_final_stage_payload() {
        let mut payload = vec![0x03u8];
        payload.extend([0x44u8; 32]);
        let response = Response::new(payload, StatusWord::from_u16(0x9000));

        let (index, salt) = PairCommand::parse_final_stage(response).unwrap();
        assert_eq!(index, 3);
        assert_eq!(salt, [0x44; 32]);
    }

    #[test]
    fn maps_slot_exhaustion() {
        let response = Response::new(Bytes::new(), StatusWord::from_u16(0x6A84));
        assert_eq!(
            PairCommand::parse_first_stage(response),
            Err(PairError::SlotsFull)
        );
    }

    #[test]
    fn retains_unmapped_status_words() {
        let response = Response::new(Bytes::new(), StatusWord::from_u16(0x6A83));
        assert_eq!(
            PairCommand::parse_first_stage(response),
            Err(PairError::Unknown { sw: 0x6A83 })
        );
    }
}
