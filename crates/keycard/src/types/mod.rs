mod application_info;
mod application_status;
mod capabilities;
mod exported_key;
mod identity;
mod mnemonic;
mod pairing_info;
mod signature;
mod version;

pub use application_info::ApplicationInfo;
pub use application_status::ApplicationStatus;
pub use capabilities::{Capabilities, Capability};
pub use exported_key::ExportedKey;
pub use identity::Identity;
pub use mnemonic::Mnemonic;
pub use pairing_info::PairingInfo;
pub use signature::Signature;
pub use version::Version;

/// Parse failures inside typed response records; command modules wrap
/// these into their own error enums.
pub(crate) type ParseResult<T> = Result<T, &'static str>;

pub(crate) fn array_from<const N: usize>(
    data: &[u8],
    what: &'static str,
) -> ParseResult<[u8; N]> {
    data.try_into().map_err(|_| what)
}
