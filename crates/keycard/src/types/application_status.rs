use std::fmt;

use crate::constants::tags;
use crate::tlv;

use super::ParseResult;

/// Application status returned by GET STATUS (P1 = 0x00).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplicationStatus {
    /// Remaining PIN attempts
    pub pin_retry_count: u8,
    /// Remaining PUK attempts
    pub puk_retry_count: u8,
    /// Whether a master key is loaded
    pub key_initialized: bool,
}

impl ApplicationStatus {
    pub(crate) fn parse(data: &[u8]) -> ParseResult<Self> {
        let items = tlv::parse(data);
        let first = items.first().ok_or("empty status response")?;
        if first.tag != tags::TEMPLATE_APPLICATION_STATUS {
            return Err("unexpected leading tag in status response");
        }

        let children = tlv::parse(&first.value);

        let mut counters = children
            .iter()
            .filter(|item| item.tag == tags::INT && item.value.len() == 1)
            .map(|item| item.value[0]);
        let pin_retry_count = counters.next().ok_or("missing PIN retry counter")?;
        let puk_retry_count = counters.next().ok_or("missing PUK retry counter")?;

        let key_initialized = match tlv::find_tag(&children, tags::KEY_INITIALIZED) {
            [] => return Err("missing key-initialized flag"),
            [flag, ..] => *flag != 0,
        };

        Ok(Self {
            pin_retry_count,
            puk_retry_count,
            key_initialized,
        })
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PIN retries: {}, PUK retries: {}, key: {}",
            self.pin_retry_count,
            self.puk_retry_count,
            if self.key_initialized {
                "loaded"
            } else {
                "not loaded"
            }
        )
    }
}
