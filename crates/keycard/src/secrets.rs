//! Credentials for initializing and pairing with a card.

use base64::prelude::*;
use bytes::{BufMut, Bytes, BytesMut};
use rand::{Rng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{generate_pairing_token, PairingToken};
use crate::AppletVersion;

const MAX_PIN_NUMBER: u64 = 999_999;
const MAX_PUK_NUMBER: u64 = 999_999_999_999;
const DEFAULT_MAX_PIN_ATTEMPTS: u8 = 3;
const DEFAULT_MAX_PUK_ATTEMPTS: u8 = 5;

pub(crate) const PIN_LENGTH: usize = 6;
pub(crate) const PUK_LENGTH: usize = 12;

/// The secret data needed to initialize a card and pair clients with it.
///
/// Construction validates formats up front so INIT can fail locally
/// instead of bouncing off the card.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secrets {
    pin: String,
    puk: String,
    pairing_pass: String,
    #[zeroize(skip)]
    pairing_token: PairingToken,
    #[zeroize(skip)]
    version: AppletVersion,
    max_pin_attempts: u8,
    max_puk_attempts: u8,
    duress_pin: Option<String>,
}

impl Secrets {
    /// Create secrets with the provided PIN, PUK and pairing password, in
    /// the pre-3.1 INIT payload format.
    pub fn new(pin: &str, puk: &str, pairing_pass: &str) -> crate::Result<Self> {
        validate_digits(pin, PIN_LENGTH, "PIN must be exactly 6 digits")?;
        validate_digits(puk, PUK_LENGTH, "PUK must be exactly 12 digits")?;

        Ok(Self {
            pin: pin.to_string(),
            puk: puk.to_string(),
            pairing_pass: pairing_pass.to_string(),
            pairing_token: generate_pairing_token(pairing_pass),
            version: AppletVersion::Legacy,
            max_pin_attempts: DEFAULT_MAX_PIN_ATTEMPTS,
            max_puk_attempts: DEFAULT_MAX_PUK_ATTEMPTS,
            duress_pin: None,
        })
    }

    /// Create secrets in the 3.1+ INIT payload format, which additionally
    /// carries attempt limits and a duress PIN.
    pub fn new_v3_1(
        pin: &str,
        puk: &str,
        pairing_pass: &str,
        max_pin_attempts: u8,
        max_puk_attempts: u8,
        duress_pin: Option<&str>,
    ) -> crate::Result<Self> {
        let mut secrets = Self::new(pin, puk, pairing_pass)?;

        if let Some(duress) = duress_pin {
            validate_digits(duress, PIN_LENGTH, "duress PIN must be exactly 6 digits")?;
            secrets.duress_pin = Some(duress.to_string());
        }

        secrets.version = AppletVersion::V3_1;
        secrets.max_pin_attempts = max_pin_attempts;
        secrets.max_puk_attempts = max_puk_attempts;

        Ok(secrets)
    }

    /// Generate secrets with a random PIN, PUK and pairing password, in
    /// the pre-3.1 format.
    pub fn generate() -> Self {
        let pairing_pass = generate_pairing_pass();
        let mut rng = rand::rng();

        // format! zero-pads, so the validated constructor cannot fail
        Self::new(
            &format!("{:06}", rng.random_range(0..=MAX_PIN_NUMBER)),
            &format!("{:012}", rng.random_range(0..=MAX_PUK_NUMBER)),
            &pairing_pass,
        )
        .unwrap()
    }

    /// Generate random secrets in the 3.1+ format.
    pub fn generate_v3_1(max_pin_attempts: u8, max_puk_attempts: u8, with_duress_pin: bool) -> Self {
        let mut rng = rand::rng();

        let duress = with_duress_pin.then(|| format!("{:06}", rng.random_range(0..=MAX_PIN_NUMBER)));
        let mut secrets = Self::generate();

        secrets.version = AppletVersion::V3_1;
        secrets.max_pin_attempts = max_pin_attempts;
        secrets.max_puk_attempts = max_puk_attempts;
        secrets.duress_pin = duress;

        secrets
    }

    /// The PIN.
    pub fn pin(&self) -> &str {
        &self.pin
    }

    /// The PUK.
    pub fn puk(&self) -> &str {
        &self.puk
    }

    /// The pairing password.
    pub fn pairing_pass(&self) -> &str {
        &self.pairing_pass
    }

    /// The pairing token derived from the pairing password.
    pub fn pairing_token(&self) -> &PairingToken {
        &self.pairing_token
    }

    /// The INIT payload format these secrets target.
    pub fn version(&self) -> AppletVersion {
        self.version
    }

    /// Encode the INIT plaintext: `pin ‖ puk ‖ pairing token`, plus the
    /// attempt limits and duress PIN for 3.1+.
    pub(crate) fn to_bytes(&self) -> Bytes {
        let mut buffer = BytesMut::with_capacity(PIN_LENGTH + PUK_LENGTH + 32 + 2 + PIN_LENGTH);

        buffer.put_slice(self.pin.as_bytes());
        buffer.put_slice(self.puk.as_bytes());
        buffer.put_slice(&self.pairing_token);

        if self.version == AppletVersion::V3_1 {
            buffer.put_u8(self.max_pin_attempts);
            buffer.put_u8(self.max_puk_attempts);
            match &self.duress_pin {
                Some(duress) => buffer.put_slice(duress.as_bytes()),
                // Default duress PIN: the first half of the PUK.
                None => buffer.put_slice(&self.puk.as_bytes()[..PIN_LENGTH]),
            }
        }

        buffer.freeze()
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

fn validate_digits(value: &str, length: usize, message: &'static str) -> crate::Result<()> {
    if value.len() != length || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(crate::Error::InvalidData(message));
    }
    Ok(())
}

fn generate_pairing_pass() -> String {
    let mut raw = [0u8; 12];
    rand::rng().fill_bytes(&mut raw);
    BASE64_URL_SAFE_NO_PAD.encode(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_secrets() {
        let secrets = Secrets::new("123456", "123456789012", "pairing-pass").unwrap();
        assert_eq!(secrets.pin(), "123456");
        assert_eq!(secrets.puk(), "123456789012");
        assert_eq!(secrets.pairing_pass(), "pairing-pass");
        assert_eq!(secrets.version(), AppletVersion::Legacy);
    }

    #[test]
    fn rejects_bad_pin_and_puk() {
        assert!(Secrets::new("12345", "123456789012", "p").is_err());
        assert!(Secrets::new("12345a", "123456789012", "p").is_err());
        assert!(Secrets::new("123456", "12345678901", "p").is_err());
        assert!(Secrets::new("123456", "12345678901x", "p").is_err());
        assert!(Secrets::new_v3_1("123456", "123456789012", "p", 3, 5, Some("12")).is_err());
    }

    #[test]
    fn legacy_payload_layout() {
        let secrets = Secrets::new("123456", "123456789012", "pairing-pass").unwrap();
        let bytes = secrets.to_bytes();

        assert_eq!(bytes.len(), PIN_LENGTH + PUK_LENGTH + 32);
        assert_eq!(&bytes[..6], b"123456");
        assert_eq!(&bytes[6..18], b"123456789012");
        assert_eq!(&bytes[18..], secrets.pairing_token().as_slice());
    }

    #[test]
    fn v3_1_payload_layout() {
        let secrets =
            Secrets::new_v3_1("123456", "123456789012", "pass", 5, 7, Some("654321")).unwrap();
        let bytes = secrets.to_bytes();

        assert_eq!(bytes.len(), PIN_LENGTH + PUK_LENGTH + 32 + 2 + PIN_LENGTH);
        assert_eq!(bytes[50], 5);
        assert_eq!(bytes[51], 7);
        assert_eq!(&bytes[52..], b"654321");
    }

    #[test]
    fn v3_1_default_duress_is_puk_prefix() {
        let secrets = Secrets::new_v3_1("123456", "987654321098", "pass", 3, 5, None).unwrap();
        let bytes = secrets.to_bytes();
        assert_eq!(&bytes[52..], b"987654");
    }

    #[test]
    fn generated_secrets_are_well_formed() {
        let secrets = Secrets::generate();
        assert_eq!(secrets.pin().len(), PIN_LENGTH);
        assert!(secrets.pin().bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(secrets.puk().len(), PUK_LENGTH);
        assert!(secrets.puk().bytes().all(|b| b.is_ascii_digit()));
        assert!(!secrets.pairing_pass().is_empty());

        let v3 = Secrets::generate_v3_1(4, 6, true);
        assert_eq!(v3.version(), AppletVersion::V3_1);
        assert_eq!(v3.to_bytes().len(), 58);
    }
}
