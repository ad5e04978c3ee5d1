//! Response APDU parsing.

use bytes::Bytes;

use crate::{Error, StatusWord};

/// A response APDU: payload followed by a two-byte status word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    data: Bytes,
    status: StatusWord,
}

impl Response {
    /// Assemble a response from an already split payload and status.
    pub fn new<T: Into<Bytes>>(data: T, status: StatusWord) -> Self {
        Self {
            data: data.into(),
            status,
        }
    }

    /// Split raw reader output into payload and status word.
    ///
    /// Fails with [`Error::ResponseTooShort`] when fewer than two bytes
    /// were returned.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < 2 {
            return Err(Error::ResponseTooShort(raw.len()));
        }

        let (data, sw) = raw.split_at(raw.len() - 2);
        Ok(Self {
            data: Bytes::copy_from_slice(data),
            status: StatusWord::new(sw[0], sw[1]),
        })
    }

    /// Response payload, not including the status word.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// The status word.
    pub const fn status(&self) -> StatusWord {
        self.status
    }

    /// Whether the status word is `90 00`.
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
