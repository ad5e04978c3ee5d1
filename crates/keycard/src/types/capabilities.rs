use std::fmt;

/// A single applet capability bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    SecureChannel = 0x01,
    KeyManagement = 0x02,
    CredentialsManagement = 0x04,
    Ndef = 0x08,
}

/// Capability bitmask advertised in the application info.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities(u8);

impl Capabilities {
    /// Build a mask from individual capabilities.
    pub fn new(capabilities: &[Capability]) -> Self {
        Self(capabilities.iter().fold(0, |flags, &cap| flags | cap as u8))
    }

    /// All four capabilities.
    pub const fn all() -> Self {
        Self(0x0F)
    }

    /// Whether the mask carries a capability.
    pub const fn has(&self, capability: Capability) -> bool {
        self.0 & capability as u8 != 0
    }

    /// Raw bitmask value.
    pub const fn bits(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Capabilities {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.has(Capability::SecureChannel) {
            names.push("Secure Channel");
        }
        if self.has(Capability::KeyManagement) {
            names.push("Key Management");
        }
        if self.has(Capability::CredentialsManagement) {
            names.push("Credentials Management");
        }
        if self.has(Capability::Ndef) {
            names.push("NDEF");
        }
        write!(f, "{}", names.join(", "))
    }
}
