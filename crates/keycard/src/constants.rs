/// AID of the Keycard wallet applet.
pub const KEYCARD_AID: &[u8] = b"\xA0\x00\x00\x08\x04\x00\x01\x01";

pub mod tags {
    /// Signature template containing:
    /// - TAG_ECC_PUBLIC_KEY
    /// - TAG_ECDSA_SIGNATURE
    pub const TEMPLATE_SIGNATURE: u8 = 0xA0;
    /// Keypair template containing:
    /// - TAG_ECC_PRIVATE_KEY
    /// - optional TAG_CHAIN_CODE / TAG_ECC_PUBLIC_KEY
    pub const TEMPLATE_KEYPAIR: u8 = 0xA1;
    /// Application status template containing:
    /// - TAG_INT (PIN and PUK retry counts)
    /// - TAG_KEY_INITIALIZED
    pub const TEMPLATE_APPLICATION_STATUS: u8 = 0xA3;
    /// Application info template containing:
    /// - TAG_INSTANCE_UID
    /// - TAG_ECC_PUBLIC_KEY
    /// - TAG_INT (application version and free pairing slots)
    /// - TAG_KEY_UID
    /// - TAG_CAPABILITIES
    pub const TEMPLATE_APPLICATION_INFO: u8 = 0xA4;

    /// Instance UID (16 bytes)
    pub const INSTANCE_UID: u8 = 0x8F;
    /// ECC public key (uncompressed, 65 bytes, or absent)
    pub const ECC_PUBLIC_KEY: u8 = 0x80;
    /// ECC private key (32 bytes)
    pub const ECC_PRIVATE_KEY: u8 = 0x81;
    /// BIP32 chain code (32 bytes)
    pub const CHAIN_CODE: u8 = 0x82;
    /// Integer: application version (2 bytes) or free pairing slots (1 byte)
    pub const INT: u8 = 0x02;
    /// Key UID (32 bytes, SHA-256 of the master public key)
    pub const KEY_UID: u8 = 0x8E;
    /// Capabilities bitmask (1 byte)
    pub const CAPABILITIES: u8 = 0x8D;
    /// Identification certificate
    pub const CERTIFICATE: u8 = 0x8A;
    /// DER-encoded ECDSA signature (a SEQUENCE of two INTEGERs)
    pub const ECDSA_SIGNATURE: u8 = 0x30;
    /// Key initialized flag (0xFF when a key is loaded, 0 otherwise)
    pub const KEY_INITIALIZED: u8 = 0x01;
}
