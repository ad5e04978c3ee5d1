//! Error types for the PC/SC transport.

use cairn_apdu::TransportError;
use thiserror::Error;

/// PC/SC specific errors.
#[derive(Debug, Error)]
pub enum PcscError {
    /// Error reported by the PC/SC stack.
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers are attached to the system.
    #[error("no readers available")]
    NoReadersAvailable,

    /// The named reader does not exist.
    #[error("reader not found: {0}")]
    ReaderNotFound(String),

    /// No card is present in the reader.
    #[error("no card present in reader: {0}")]
    NoCard(String),
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        match error {
            PcscError::Pcsc(pcsc::Error::NoSmartcard)
            | PcscError::Pcsc(pcsc::Error::RemovedCard)
            | PcscError::NoCard(_) => Self::NotConnected,
            other => Self::Device(other.to_string()),
        }
    }
}
