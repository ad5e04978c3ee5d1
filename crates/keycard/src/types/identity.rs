use crate::constants::tags;
use crate::tlv;

use super::{array_from, ParseResult};

/// Card identity proof returned by IDENT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Identification certificate; its first 33 bytes are the card's
    /// compressed identification public key.
    pub certificate: Vec<u8>,
    /// DER-encoded signature over the challenge.
    pub signature: Vec<u8>,
}

impl Identity {
    /// Minimum certificate length the applet produces.
    const MIN_CERTIFICATE_LEN: usize = 65;

    pub(crate) fn parse(data: &[u8]) -> ParseResult<Self> {
        let items = tlv::parse(data);
        let first = items.first().ok_or("empty identity response")?;
        if first.tag != tags::TEMPLATE_SIGNATURE {
            return Err("unexpected leading tag in identity response");
        }

        let children = tlv::parse(&first.value);

        let certificate = tlv::find_tag(&children, tags::CERTIFICATE);
        if certificate.len() < Self::MIN_CERTIFICATE_LEN {
            return Err("identity certificate too short");
        }

        let signature = tlv::find_tag(&children, tags::ECDSA_SIGNATURE);
        if signature.is_empty() {
            return Err("identity response is missing the signature");
        }

        Ok(Self {
            certificate: certificate.to_vec(),
            // Re-wrap: verification tooling expects the full DER SEQUENCE.
            signature: tlv::encode(tags::ECDSA_SIGNATURE, signature),
        })
    }

    /// The card's compressed identification public key.
    pub fn public_key(&self) -> [u8; 33] {
        array_from(&self.certificate[..33], "certificate too short")
            .expect("certificate length checked during parsing")
    }
}
