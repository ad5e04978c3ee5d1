//! SELECT command.

use bytes::Bytes;
use cairn_apdu::{Command, Response};
use thiserror::Error;

use crate::types::ApplicationInfo;

/// SELECT (ISO class, INS 0xA4, P1 0x04): selects the applet by AID and
/// returns the application info record.
pub struct SelectCommand;

impl SelectCommand {
    /// Select the applet with the given AID.
    pub fn with_aid(aid: &[u8]) -> Command {
        Command::new(0x00, 0xA4, 0x04, 0x00).with_data(Bytes::copy_from_slice(aid))
    }

    /// Parse the SELECT response into an [`ApplicationInfo`].
    pub fn parse_response(response: Response) -> Result<ApplicationInfo, SelectError> {
        match response.status().to_u16() {
            0x9000 => {
                ApplicationInfo::parse(response.data()).map_err(SelectError::InvalidResponse)
            }
            0x6A82 => Err(SelectError::AppletNotFound),
            sw => Err(SelectError::Unknown { sw }),
        }
    }
}

/// Errors from SELECT.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    /// No applet with the requested AID is installed.
    #[error("applet not found")]
    AppletNotFound,

    /// The response record could not be parsed.
    #[error("invalid SELECT response: {0}")]
    InvalidResponse(&'static str),

    /// Any other status word, retained raw.
    #[error("unexpected status word: {sw:04X}")]
    Unknown { sw: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KEYCARD_AID;
    use cairn_apdu::StatusWord;
    use hex_literal::hex;

    #[test]
    fn builds_select_apdu() {
        let bytes = SelectCommand::with_aid(KEYCARD_AID).to_bytes().unwrap();
        assert_eq!(bytes.as_ref(), hex!("00A4040008A000000804000101"));
    }

    #[test]
    fn maps_not_found() {
        let response = Response::new(Bytes::new(), StatusWord::from_u16(0x6A82));
        assert_eq!(
            SelectCommand::parse_response(response),
            Err(SelectError::AppletNotFound)
        );
    }
}
