use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::tags;
use crate::tlv;

use super::{array_from, ParseResult};

/// Key material returned by EXPORT KEY.
///
/// The keypair template carries only the components the export option
/// allows: the private key is absent for public-only exports, the chain
/// code is present only for extended exports.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ExportedKey {
    /// Uncompressed public key, when returned.
    pub public_key: Option<[u8; 65]>,
    /// Private key scalar, when the card allowed exporting it.
    pub private_key: Option<[u8; 32]>,
    /// BIP32 chain code, for extended exports.
    pub chain_code: Option<[u8; 32]>,
}

impl ExportedKey {
    pub(crate) fn parse(data: &[u8]) -> ParseResult<Self> {
        let items = tlv::parse(data);
        let first = items.first().ok_or("empty export response")?;
        if first.tag != tags::TEMPLATE_KEYPAIR {
            return Err("unexpected leading tag in export response");
        }

        let children = tlv::parse(&first.value);

        let public_key = match tlv::find_tag(&children, tags::ECC_PUBLIC_KEY) {
            [] => None,
            value => Some(array_from(value, "invalid public key length")?),
        };
        let private_key = match tlv::find_tag(&children, tags::ECC_PRIVATE_KEY) {
            [] => None,
            value => Some(array_from(value, "invalid private key length")?),
        };
        let chain_code = match tlv::find_tag(&children, tags::CHAIN_CODE) {
            [] => None,
            value => Some(array_from(value, "invalid chain code length")?),
        };

        if public_key.is_none() && private_key.is_none() {
            return Err("export response carries no key material");
        }

        Ok(Self {
            public_key,
            private_key,
            chain_code,
        })
    }
}

impl std::fmt::Debug for ExportedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportedKey")
            .field("public_key", &self.public_key.map(hex::encode))
            .field(
                "private_key",
                &self.private_key.map(|_| "[redacted]"),
            )
            .field("chain_code", &self.chain_code.is_some())
            .finish()
    }
}
