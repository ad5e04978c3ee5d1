use crate::constants::tags;
use crate::tlv;

use super::{array_from, ParseResult};

/// An ECDSA signature returned by SIGN.
///
/// The applet answers in one of two shapes: a raw 65-byte `r ‖ s ‖ recId`
/// under tag `0x80`, or a template `0xA0 { 0x80 public key, 0x30 DER }`.
/// Both normalize to 32-byte scalars here; the recovery id is only
/// available in the raw shape and must otherwise be recovered by the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Signature scalar `r`, left-padded to 32 bytes.
    pub r: [u8; 32],
    /// Signature scalar `s`, left-padded to 32 bytes.
    pub s: [u8; 32],
    /// Recovery id, present only in the raw response shape.
    pub recovery_id: Option<u8>,
    /// Signing public key, present only in the template response shape.
    pub public_key: Option<[u8; 65]>,
}

impl Signature {
    pub(crate) fn parse(data: &[u8]) -> ParseResult<Self> {
        let items = tlv::parse(data);
        let first = items.first().ok_or("empty signature response")?;

        match first.tag {
            tags::ECC_PUBLIC_KEY => Self::parse_raw(&first.value),
            tags::TEMPLATE_SIGNATURE => Self::parse_template(&first.value),
            _ => Err("unexpected leading tag in signature response"),
        }
    }

    fn parse_raw(value: &[u8]) -> ParseResult<Self> {
        if value.len() != 65 {
            return Err("raw signature must be 65 bytes");
        }

        Ok(Self {
            r: array_from(&value[..32], "truncated r")?,
            s: array_from(&value[32..64], "truncated s")?,
            recovery_id: Some(value[64]),
            public_key: None,
        })
    }

    fn parse_template(template: &[u8]) -> ParseResult<Self> {
        let items = tlv::parse(template);

        let public_key = match tlv::find_tag(&items, tags::ECC_PUBLIC_KEY) {
            value if value.len() == 65 => array_from(value, "truncated public key")?,
            _ => return Err("signature template is missing the public key"),
        };

        // The 0x30 item is a DER SEQUENCE of two INTEGERs.
        let der = tlv::find_tag(&items, tags::ECDSA_SIGNATURE);
        let integers = tlv::parse(der);
        let [r, s] = integers.as_slice() else {
            return Err("DER signature must contain exactly r and s");
        };
        if r.tag != 0x02 || s.tag != 0x02 {
            return Err("DER signature integers have unexpected tags");
        }

        Ok(Self {
            r: normalize_scalar(&r.value)?,
            s: normalize_scalar(&s.value)?,
            recovery_id: None,
            public_key: Some(public_key),
        })
    }

    /// The 64-byte `r ‖ s` form.
    pub fn to_rs_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }
}

// Strip leading zero bytes of a DER INTEGER and left-pad to 32 bytes.
fn normalize_scalar(raw: &[u8]) -> ParseResult<[u8; 32]> {
    let significant = match raw.iter().position(|&b| b != 0) {
        Some(start) => &raw[start..],
        None => &[],
    };
    if significant.len() > 32 {
        return Err("signature scalar wider than 32 bytes");
    }

    let mut out = [0u8; 32];
    out[32 - significant.len()..].copy_from_slice(significant);
    Ok(out)
}
