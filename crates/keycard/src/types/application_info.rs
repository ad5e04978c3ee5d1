use std::fmt;

use crate::constants::tags;
use crate::tlv::{self, Tlv};

use super::{array_from, Capabilities, Capability, ParseResult, Version};

/// Sentinel reported as the free-slot count before the card is initialized.
pub const PRE_INIT_FREE_SLOTS: u8 = 0xFF;

/// Parsed SELECT response.
///
/// An uninitialized card answers with a bare `0x80` public-key item; an
/// initialized card wraps the full record in an `0xA4` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    /// Instance UID; present exactly when the card is initialized.
    pub instance_uid: Option<[u8; 16]>,
    /// Uncompressed secp256k1 public key for the secure channel.
    pub public_key: Option<[u8; 65]>,
    /// Applet version; 0.0 before initialization.
    pub version: Version,
    /// Free pairing slots, or [`PRE_INIT_FREE_SLOTS`] before INIT.
    pub free_slots: u8,
    /// SHA-256 of the loaded master public key; `None` when no key is loaded.
    pub key_uid: Option<[u8; 32]>,
    /// Capability bitmask.
    pub capabilities: Capabilities,
}

impl ApplicationInfo {
    /// Whether the card has been initialized.
    pub const fn is_initialized(&self) -> bool {
        self.instance_uid.is_some()
    }

    /// Whether a master key is loaded.
    pub const fn has_master_key(&self) -> bool {
        self.key_uid.is_some()
    }

    pub(crate) fn parse(data: &[u8]) -> ParseResult<Self> {
        let items = tlv::parse(data);
        let first = items.first().ok_or("empty SELECT response")?;

        match first.tag {
            tags::ECC_PUBLIC_KEY => Self::parse_pre_init(&first.value),
            tags::TEMPLATE_APPLICATION_INFO => Self::parse_initialized(&first.value),
            _ => Err("unexpected leading tag in SELECT response"),
        }
    }

    fn parse_pre_init(public_key: &[u8]) -> ParseResult<Self> {
        let public_key = match public_key.len() {
            0 => None,
            65 => Some(array_from(public_key, "truncated public key")?),
            _ => return Err("invalid public key length"),
        };

        Ok(Self {
            instance_uid: None,
            public_key,
            version: Version::default(),
            free_slots: PRE_INIT_FREE_SLOTS,
            key_uid: None,
            // An uninitialized applet does not advertise capabilities yet;
            // it can at least be initialized, and paired with once it has
            // a public key.
            capabilities: if public_key.is_some() {
                Capabilities::new(&[Capability::SecureChannel, Capability::CredentialsManagement])
            } else {
                Capabilities::new(&[Capability::CredentialsManagement])
            },
        })
    }

    fn parse_initialized(template: &[u8]) -> ParseResult<Self> {
        let items = tlv::parse(template);

        let instance_uid = array_from(
            tlv::find_tag(&items, tags::INSTANCE_UID),
            "instance UID must be 16 bytes",
        )?;

        let public_key = match tlv::find_tag(&items, tags::ECC_PUBLIC_KEY) {
            value if value.is_empty() => None,
            value => Some(array_from(value, "invalid public key length")?),
        };

        // Version and free slots share tag 0x02 and are told apart by
        // value length, in order of appearance.
        let mut version = None;
        let mut free_slots = None;
        for item in items.iter().filter(|item| item.tag == tags::INT) {
            match item.value.len() {
                2 if version.is_none() => version = Some(Version::parse(&item.value)?),
                1 if free_slots.is_none() => free_slots = Some(item.value[0]),
                _ => {}
            }
        }

        let key_uid = match tlv::find_tag(&items, tags::KEY_UID) {
            value if value.is_empty() => None,
            value => Some(array_from(value, "key UID must be 32 bytes")?),
        };

        // Applets that predate the capabilities tag support everything.
        let capabilities = match tlv::find_tag(&items, tags::CAPABILITIES) {
            [] => Capabilities::all(),
            [bits, ..] => Capabilities::from(*bits),
        };

        Ok(Self {
            instance_uid: Some(instance_uid),
            public_key,
            version: version.ok_or("missing application version")?,
            free_slots: free_slots.ok_or("missing free pairing slot count")?,
            key_uid,
            capabilities,
        })
    }

    /// Re-encode into the SELECT response wire form. Used by card
    /// simulators and round-trip tests.
    pub fn to_tlv_bytes(&self) -> Vec<u8> {
        match self.instance_uid {
            None => tlv::encode(
                tags::ECC_PUBLIC_KEY,
                self.public_key.as_ref().map_or(&[] as &[u8], |pk| pk.as_slice()),
            ),
            Some(uid) => {
                let mut children = Vec::new();
                children.extend(Tlv::new(tags::INSTANCE_UID, uid.to_vec()).to_bytes());
                children.extend(
                    Tlv::new(
                        tags::ECC_PUBLIC_KEY,
                        self.public_key.map_or(Vec::new(), |pk| pk.to_vec()),
                    )
                    .to_bytes(),
                );
                children.extend(
                    Tlv::new(tags::INT, vec![self.version.major, self.version.minor]).to_bytes(),
                );
                children.extend(Tlv::new(tags::INT, vec![self.free_slots]).to_bytes());
                children.extend(
                    Tlv::new(tags::KEY_UID, self.key_uid.map_or(Vec::new(), |id| id.to_vec()))
                        .to_bytes(),
                );
                children
                    .extend(Tlv::new(tags::CAPABILITIES, vec![self.capabilities.bits()]).to_bytes());

                tlv::encode(tags::TEMPLATE_APPLICATION_INFO, &children)
            }
        }
    }
}

impl fmt::Display for ApplicationInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Application Info:")?;
        match self.instance_uid {
            Some(uid) => writeln!(f, "  Instance UID: {}", hex::encode(uid))?,
            None => writeln!(f, "  Instance UID: none (card not initialized)")?,
        }
        writeln!(f, "  Version: {}", self.version)?;
        if self.free_slots == PRE_INIT_FREE_SLOTS {
            writeln!(f, "  Free pairing slots: n/a")?;
        } else {
            writeln!(f, "  Free pairing slots: {}", self.free_slots)?;
        }
        match self.key_uid {
            Some(uid) => writeln!(f, "  Key UID: {}", hex::encode(uid))?,
            None => writeln!(f, "  Key UID: none (use GENERATE KEY)")?,
        }
        writeln!(f, "  Capabilities: {}", self.capabilities)?;
        write!(f, "  Secure channel public key: ")?;
        match self.public_key {
            Some(key) => write!(f, "{}", hex::encode(key)),
            None => write!(f, "none"),
        }
    }
}
