//! ISO/IEC 7816-4 APDU model and card transport abstraction.
//!
//! This crate provides the building blocks shared by every card protocol
//! built on top of it: the [`Command`] and [`Response`] types, the
//! [`StatusWord`] taxonomy, and the [`CardTransport`] trait implemented by
//! concrete readers. A scripted [`MockTransport`] is included so protocol
//! crates can drive their full stack in tests without hardware.

mod command;
mod error;
mod response;
#[path = "status.rs"]
mod status_word;
mod transport;

pub use command::{Command, MAX_DATA_LEN};
pub use error::Error;
pub use response::Response;
pub use status_word::{status, StatusWord};
pub use transport::{CardTransport, MockResponder, MockTransport, TransportError};

/// Result alias for APDU-level operations.
pub type Result<T> = std::result::Result<T, Error>;
