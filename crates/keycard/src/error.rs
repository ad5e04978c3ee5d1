//! Error types for Keycard operations.
//!
//! Every protocol command has its own closed error enum carrying the
//! mapped status words; this module aggregates them together with the
//! precondition, transport and secure-layer failures.

use cairn_apdu::TransportError;
use thiserror::Error;

use crate::commands::*;
use crate::path::PathError;
use crate::secure_channel::SecureChannelError;
use crate::types::Capability;

/// Result type for Keycard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for Keycard operations.
#[derive(Debug, Error)]
pub enum Error {
    //
    // Precondition errors, detected before any APDU is sent
    //
    /// The applet has not been selected yet.
    #[error("applet not selected")]
    NotSelected,

    /// The operation requires an open secure channel.
    #[error("secure channel not open")]
    SecureChannelNotOpen,

    /// The card does not advertise a required capability.
    #[error("capability not supported: {0:?}")]
    CapabilityNotSupported(Capability),

    /// Pairing information is required for this operation.
    #[error("pairing information required")]
    PairingRequired,

    /// Locally rejected input.
    #[error("invalid data: {0}")]
    InvalidData(&'static str),

    //
    // Authentication failures
    //
    /// The card's pairing cryptogram did not verify. Either the pairing
    /// password is wrong or the card is not the one it claims to be.
    #[error("card cryptogram verification failed")]
    CardAuthenticationFailed,

    /// Mutual authentication after opening the secure channel failed.
    #[error("mutual authentication failed")]
    MutualAuthenticationFailed,

    //
    // Transport and secure layer
    //
    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// APDU encoding or parsing failure.
    #[error(transparent)]
    Apdu(cairn_apdu::Error),

    /// Secure channel failure; the channel is closed when this is raised.
    #[error(transparent)]
    SecureChannel(#[from] SecureChannelError),

    /// Key path parsing failure.
    #[error(transparent)]
    Path(#[from] PathError),

    //
    // Command-specific errors
    //
    /// Error from SELECT.
    #[error(transparent)]
    Select(#[from] SelectError),

    /// Error from INIT.
    #[error(transparent)]
    Init(#[from] InitError),

    /// Error from IDENT.
    #[error(transparent)]
    Ident(#[from] IdentError),

    /// Error from PAIR.
    #[error(transparent)]
    Pair(#[from] PairError),

    /// Error from UNPAIR.
    #[error(transparent)]
    Unpair(#[from] UnpairError),

    /// Error from OPEN SECURE CHANNEL.
    #[error(transparent)]
    OpenSecureChannel(#[from] OpenSecureChannelError),

    /// Error from MUTUALLY AUTHENTICATE.
    #[error(transparent)]
    MutuallyAuthenticate(#[from] MutuallyAuthenticateError),

    /// Error from VERIFY PIN.
    #[error(transparent)]
    VerifyPin(#[from] VerifyPinError),

    /// Error from CHANGE PIN/PUK/pairing secret.
    #[error(transparent)]
    ChangeSecret(#[from] ChangeSecretError),

    /// Error from UNBLOCK PIN.
    #[error(transparent)]
    UnblockPin(#[from] UnblockPinError),

    /// Error from GET STATUS.
    #[error(transparent)]
    GetStatus(#[from] GetStatusError),

    /// Error from STORE DATA.
    #[error(transparent)]
    StoreData(#[from] StoreDataError),

    /// Error from GET DATA.
    #[error(transparent)]
    GetData(#[from] GetDataError),

    /// Error from GENERATE KEY.
    #[error(transparent)]
    GenerateKey(#[from] GenerateKeyError),

    /// Error from REMOVE KEY.
    #[error(transparent)]
    RemoveKey(#[from] RemoveKeyError),

    /// Error from LOAD KEY.
    #[error(transparent)]
    LoadKey(#[from] LoadKeyError),

    /// Error from GENERATE MNEMONIC.
    #[error(transparent)]
    GenerateMnemonic(#[from] GenerateMnemonicError),

    /// Error from EXPORT KEY.
    #[error(transparent)]
    ExportKey(#[from] ExportKeyError),

    /// Error from SIGN.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// Error from SET PINLESS PATH.
    #[error(transparent)]
    SetPinlessPath(#[from] SetPinlessPathError),

    /// Error from FACTORY RESET.
    #[error(transparent)]
    FactoryReset(#[from] FactoryResetError),
}

impl From<cairn_apdu::Error> for Error {
    fn from(err: cairn_apdu::Error) -> Self {
        match err {
            cairn_apdu::Error::Transport(err) => Self::Transport(err),
            other => Self::Apdu(other),
        }
    }
}
