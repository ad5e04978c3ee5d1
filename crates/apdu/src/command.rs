//! Command APDU construction and serialization.

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Maximum payload length of a short-form command APDU.
pub const MAX_DATA_LEN: usize = 255;

/// A command APDU: four header bytes plus an optional payload.
///
/// Only the short form is supported; the encoder rejects payloads longer
/// than [`MAX_DATA_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Class byte (CLA)
    cla: u8,
    /// Instruction byte (INS)
    ins: u8,
    /// First parameter (P1)
    p1: u8,
    /// Second parameter (P2)
    p2: u8,
    /// Payload, if any
    data: Option<Bytes>,
}

impl Command {
    /// Create a command with an empty payload.
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
        }
    }

    /// Create a command carrying a payload.
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self::new(cla, ins, p1, p2).with_data(data)
    }

    /// Attach a payload to the command.
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Class byte.
    pub const fn class(&self) -> u8 {
        self.cla
    }

    /// Instruction byte.
    pub const fn instruction(&self) -> u8 {
        self.ins
    }

    /// First parameter.
    pub const fn p1(&self) -> u8 {
        self.p1
    }

    /// Second parameter.
    pub const fn p2(&self) -> u8 {
        self.p2
    }

    /// Payload, if any.
    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Serialize to wire format: `CLA INS P1 P2 [Lc DATA]`.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        let data_len = self.data.as_ref().map_or(0, Bytes::len);
        if data_len > MAX_DATA_LEN {
            return Err(Error::DataTooLong(data_len));
        }

        let mut buffer = BytesMut::with_capacity(4 + if data_len > 0 { 1 + data_len } else { 0 });
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if let Some(data) = &self.data {
            if !data.is_empty() {
                buffer.put_u8(data.len() as u8);
                buffer.put_slice(data);
            }
        }

        Ok(buffer.freeze())
    }

    /// Parse a command from wire format.
    ///
    /// Used by secure-channel implementations that re-wrap an already
    /// serialized command.
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < 4 {
            return Err(Error::InvalidCommandLength(raw.len()));
        }

        let mut command = Self::new(raw[0], raw[1], raw[2], raw[3]);

        if raw.len() > 4 {
            let lc = raw[4] as usize;
            if raw.len() != 5 + lc {
                return Err(Error::InvalidCommandLength(raw.len()));
            }
            command.data = Some(Bytes::copy_from_slice(&raw[5..]));
        }

        Ok(command)
    }
}
