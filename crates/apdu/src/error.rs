//! APDU-level error types.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised while building or parsing APDUs.
#[derive(Debug, Error)]
pub enum Error {
    /// The raw command buffer cannot be a valid APDU.
    #[error("invalid command length: {0} bytes")]
    InvalidCommandLength(usize),

    /// The payload exceeds the short-form Lc limit.
    #[error("command payload too long for short APDU: {0} bytes")]
    DataTooLong(usize),

    /// The card returned fewer bytes than a status word.
    #[error("response too short: {0} bytes")]
    ResponseTooShort(usize),

    /// A transport-level failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
