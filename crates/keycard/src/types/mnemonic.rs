use super::ParseResult;

/// BIP39 word indexes produced by GENERATE MNEMONIC.
///
/// Resolving indexes against a wordlist is left to the embedder; the
/// protocol only ever moves the 16-bit indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mnemonic(Vec<u16>);

impl Mnemonic {
    pub(crate) fn parse(data: &[u8]) -> ParseResult<Self> {
        if data.is_empty() || data.len() % 2 != 0 {
            return Err("mnemonic response must be 16-bit word indexes");
        }

        let indexes = data
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect::<Vec<_>>();

        if indexes.iter().any(|&index| index > 2047) {
            return Err("word index out of wordlist range");
        }

        Ok(Self(indexes))
    }

    /// The word indexes, each in `0..2048`.
    pub fn indexes(&self) -> &[u16] {
        &self.0
    }

    /// Number of words in the phrase.
    pub fn word_count(&self) -> usize {
        self.0.len()
    }
}
