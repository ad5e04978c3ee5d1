//! BIP32 key path handling.
//!
//! The applet derives keys relative to one of three starting points: the
//! master key, the parent of the current key, or the current key itself.
//! The textual form mirrors that: `m/44'/60'/0'/0/0`, `../0`, `./1'` or a
//! bare `1'` for current-relative paths.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Hardened-derivation marker, bit 31 of a component.
pub const HARDENED: u32 = 0x8000_0000;

/// The applet refuses paths deeper than this.
pub const MAX_COMPONENTS: usize = 10;

/// Errors raised while parsing a key path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    /// A component is not a decimal number with optional `'`.
    #[error("invalid path component: {0:?}")]
    InvalidComponent(String),

    /// A component does not fit in 31 bits.
    #[error("path component out of range: {0}")]
    ComponentOutOfRange(u32),

    /// The path exceeds [`MAX_COMPONENTS`] components.
    #[error("too many path components: {0}")]
    TooManyComponents(usize),
}

/// Starting point of a derivation path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathSource {
    /// Derive from the master key (`m/`)
    Master,
    /// Derive from the parent of the current key (`../`)
    Parent,
    /// Derive from the current key (`./` or no prefix)
    #[default]
    Current,
}

impl PathSource {
    /// Source bits folded into P1 by commands that take a path.
    pub const fn p1_bits(self) -> u8 {
        match self {
            Self::Master => 0x00,
            Self::Parent => 0x40,
            Self::Current => 0x80,
        }
    }
}

/// Whether a derivation changes the card's current key path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeriveMode {
    /// Derive for this operation only (0x01)
    Temporary,
    /// Derive and make the result the new current path (0x02)
    Persistent,
}

impl DeriveMode {
    pub(crate) const fn p1_bits(self) -> u8 {
        match self {
            Self::Temporary => 0x01,
            Self::Persistent => 0x02,
        }
    }
}

/// A parsed BIP32 path: a source plus at most [`MAX_COMPONENTS`] 32-bit
/// components, hardened components carrying bit 31.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPath {
    source: PathSource,
    components: Vec<u32>,
}

impl KeyPath {
    /// An empty current-relative path (the "no derivation" case).
    pub fn current() -> Self {
        Self::default()
    }

    /// Build a path from raw components.
    pub fn new(source: PathSource, components: Vec<u32>) -> Result<Self, PathError> {
        if components.len() > MAX_COMPONENTS {
            return Err(PathError::TooManyComponents(components.len()));
        }
        Ok(Self { source, components })
    }

    /// Reassemble an absolute path from the card's GET STATUS response:
    /// a concatenation of 32-bit big-endian components.
    pub fn from_card_bytes(data: &[u8]) -> Result<Self, PathError> {
        let components = data
            .chunks_exact(4)
            .map(|chunk| u32::from_be_bytes(chunk.try_into().unwrap()))
            .collect::<Vec<_>>();
        Self::new(PathSource::Master, components)
    }

    /// The derivation source.
    pub const fn source(&self) -> PathSource {
        self.source
    }

    /// The path components, hardened bit included.
    pub fn components(&self) -> &[u32] {
        &self.components
    }

    /// Whether the path has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Wire encoding: the big-endian concatenation of all components.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.components
            .iter()
            .flat_map(|component| component.to_be_bytes())
            .collect()
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (source, rest) = match s {
            "m" => return Self::new(PathSource::Master, Vec::new()),
            ".." => return Self::new(PathSource::Parent, Vec::new()),
            "." | "" => return Self::new(PathSource::Current, Vec::new()),
            _ => {
                if let Some(rest) = s.strip_prefix("m/") {
                    (PathSource::Master, rest)
                } else if let Some(rest) = s.strip_prefix("../") {
                    (PathSource::Parent, rest)
                } else if let Some(rest) = s.strip_prefix("./") {
                    (PathSource::Current, rest)
                } else {
                    (PathSource::Current, s)
                }
            }
        };

        let components = rest
            .split('/')
            .map(parse_component)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(source, components)
    }
}

fn parse_component(raw: &str) -> Result<u32, PathError> {
    let (digits, hardened) = match raw.strip_suffix('\'') {
        Some(digits) => (digits, true),
        None => (raw, false),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PathError::InvalidComponent(raw.to_string()));
    }

    let value: u32 = digits
        .parse()
        .map_err(|_| PathError::InvalidComponent(raw.to_string()))?;
    if value >= HARDENED {
        return Err(PathError::ComponentOutOfRange(value));
    }

    Ok(if hardened { value | HARDENED } else { value })
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            PathSource::Master => write!(f, "m")?,
            PathSource::Parent => write!(f, "..")?,
            // canonical form omits the ./ prefix
            PathSource::Current => {}
        }

        for (i, component) in self.components.iter().enumerate() {
            if i > 0 || self.source != PathSource::Current {
                write!(f, "/")?;
            }
            if component & HARDENED != 0 {
                write!(f, "{}'", component & !HARDENED)?;
            } else {
                write!(f, "{component}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_master_path() {
        let path: KeyPath = "m/44'/60'/0'/0/0".parse().unwrap();
        assert_eq!(path.source(), PathSource::Master);
        assert_eq!(
            path.components(),
            &[
                44 | HARDENED,
                60 | HARDENED,
                HARDENED,
                0,
                0
            ]
        );
    }

    #[test]
    fn parses_relative_paths() {
        let parent: KeyPath = "../0/1".parse().unwrap();
        assert_eq!(parent.source(), PathSource::Parent);
        assert_eq!(parent.components(), &[0, 1]);

        let dotted: KeyPath = "./2'".parse().unwrap();
        assert_eq!(dotted.source(), PathSource::Current);
        assert_eq!(dotted.components(), &[2 | HARDENED]);

        let bare: KeyPath = "3/4".parse().unwrap();
        assert_eq!(bare.source(), PathSource::Current);
        assert_eq!(bare.components(), &[3, 4]);
    }

    #[test]
    fn parses_prefix_only() {
        assert_eq!("m".parse::<KeyPath>().unwrap().source(), PathSource::Master);
        assert_eq!("..".parse::<KeyPath>().unwrap().source(), PathSource::Parent);
        assert!("".parse::<KeyPath>().unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_components() {
        assert!(matches!(
            "m/x".parse::<KeyPath>(),
            Err(PathError::InvalidComponent(_))
        ));
        assert!(matches!(
            "m/12a".parse::<KeyPath>(),
            Err(PathError::InvalidComponent(_))
        ));
        assert!(matches!(
            "m//1".parse::<KeyPath>(),
            Err(PathError::InvalidComponent(_))
        ));
        assert!(matches!(
            "m/'".parse::<KeyPath>(),
            Err(PathError::InvalidComponent(_))
        ));
        assert!(matches!(
            "m/2147483648".parse::<KeyPath>(),
            Err(PathError::ComponentOutOfRange(_))
        ));
    }

    #[test]
    fn rejects_deep_paths() {
        let path = format!("m/{}", vec!["0"; 11].join("/"));
        assert_eq!(
            path.parse::<KeyPath>(),
            Err(PathError::TooManyComponents(11))
        );

        let path = format!("m/{}", vec!["0"; 10].join("/"));
        assert!(path.parse::<KeyPath>().is_ok());
    }

    #[test]
    fn display_round_trip() {
        for s in ["m/44'/60'/0'/0/0", "m", "..", "../0/1", "0/1/2'", ""] {
            let path: KeyPath = s.parse().unwrap();
            assert_eq!(path.to_string(), s);
            let reparsed: KeyPath = path.to_string().parse().unwrap();
            assert_eq!(reparsed, path);
        }

        // ./ prefix is accepted on input but omitted by the canonical form
        let dotted: KeyPath = "./1'/2".parse().unwrap();
        assert_eq!(dotted.to_string(), "1'/2");
    }

    #[test]
    fn encodes_big_endian_components() {
        let path: KeyPath = "m/44'/1".parse().unwrap();
        assert_eq!(
            path.to_bytes(),
            vec![0x80, 0x00, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x01]
        );
        assert!(KeyPath::current().to_bytes().is_empty());
    }

    #[test]
    fn round_trips_card_bytes() {
        let path: KeyPath = "m/44'/60'/0'".parse().unwrap();
        let restored = KeyPath::from_card_bytes(&path.to_bytes()).unwrap();
        assert_eq!(restored, path);
        assert!(KeyPath::from_card_bytes(&[]).unwrap().is_empty());
    }
}
