//! STORE DATA and GET DATA commands.

use bytes::Bytes;
use cairn_apdu::{Command, Response};
use thiserror::Error;

use super::{PersistentRecord, CLA_GP};

/// STORE DATA (INS 0xE2): writes one of the persistent data regions.
/// Sent over the secure channel.
pub struct StoreDataCommand;

impl StoreDataCommand {
    /// Store `data` into the selected region.
    pub fn put(record: PersistentRecord, data: &[u8]) -> Command {
        Command::new(CLA_GP, 0xE2, record as u8, 0x00).with_data(Bytes::copy_from_slice(data))
    }

    /// Parse the (already unwrapped) response.
    pub fn parse_response(response: Response) -> Result<(), StoreDataError> {
        match response.status().to_u16() {
            0x9000 => Ok(()),
            0x6A80 => Err(StoreDataError::InvalidData),
            0x6A86 => Err(StoreDataError::InvalidP1),
            0x6985 => Err(StoreDataError::ConditionsNotMet),
            sw => Err(StoreDataError::Unknown { sw }),
        }
    }
}

/// Errors from STORE DATA.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreDataError {
    /// The payload was rejected (e.g. too large for the region).
    #[error("card rejected the data")]
    InvalidData,

    /// P1 does not name a data region.
    #[error("invalid data region")]
    InvalidP1,

    /// Preconditions for writing are not met.
    #[error("conditions not satisfied")]
    ConditionsNotMet,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

/// GET DATA (INS 0xCA): reads one of the persistent data regions.
/// Public readout, sent outside the secure channel.
pub struct GetDataCommand;

impl GetDataCommand {
    /// Read the selected region.
    pub fn get(record: PersistentRecord) -> Command {
        Command::new(CLA_GP, 0xCA, record as u8, 0x00)
    }

    /// Parse the response.
    pub fn parse_response(response: Response) -> Result<Vec<u8>, GetDataError> {
        match response.status().to_u16() {
            0x9000 => Ok(response.data().to_vec()),
            0x6A86 => Err(GetDataError::InvalidP1),
            sw => Err(GetDataError::Unknown { sw }),
        }
    }
}

/// Errors from GET DATA.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GetDataError {
    /// P1 does not name a data region.
    #[error("invalid data region")]
    InvalidP1,

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}
