//! The Keycard secure channel.
//!
//! After OPEN SECURE CHANNEL and MUTUALLY AUTHENTICATE, nearly every
//! command is tunneled: the payload is AES-256-CBC encrypted, the APDU is
//! authenticated by an AES-CBC-MAC, and the MAC of each message becomes
//! the IV of the next. Any MAC, decryption or transport failure while the
//! channel is open tears it down irreversibly; reopening requires a fresh
//! OPEN SECURE CHANNEL.

use bytes::{BufMut, Bytes, BytesMut};
use cairn_apdu::{CardTransport, Command, Response, StatusWord, TransportError};
use thiserror::Error;
use tracing::{debug, trace, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::commands::{
    MutuallyAuthenticateCommand, MutuallyAuthenticateError, OpenSecureChannelCommand,
    OpenSecureChannelError,
};
use crate::crypto::{
    calculate_mac, decrypt_data, derive_session_keys, encrypt_data, generate_ecdh_shared_secret,
    generate_ephemeral_keypair, random_challenge, ApduMeta, ScpIv, ScpKey,
};
use crate::types::PairingInfo;

/// Errors raised by the secure layer. All of them leave the channel
/// closed.
#[derive(Debug, Error)]
pub enum SecureChannelError {
    /// No session keys are established.
    #[error("secure channel not open")]
    NotOpen,

    /// The response MAC did not verify. The channel cannot be trusted.
    #[error("response MAC verification failed")]
    InvalidMac,

    /// The response violates the secure framing.
    #[error("invalid secure response: {0}")]
    InvalidResponse(&'static str),

    /// OPEN SECURE CHANNEL failed.
    #[error(transparent)]
    Open(#[from] OpenSecureChannelError),

    /// MUTUALLY AUTHENTICATE failed.
    #[error(transparent)]
    Authentication(#[from] MutuallyAuthenticateError),

    /// Transport failure during a secure exchange.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// APDU encoding failure.
    #[error(transparent)]
    Apdu(cairn_apdu::Error),
}

impl From<cairn_apdu::Error> for SecureChannelError {
    fn from(err: cairn_apdu::Error) -> Self {
        match err {
            cairn_apdu::Error::Transport(err) => Self::Transport(err),
            other => Self::Apdu(other),
        }
    }
}

/// Session keys and the evolving IV. Wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct Session {
    enc: [u8; 32],
    mac: [u8; 32],
    iv: [u8; 16],
    pairing_index: u8,
}

/// Secure channel state, embedded in a Keycard session.
#[derive(Default)]
pub struct SecureChannel {
    session: Option<Session>,
    open: bool,
}

impl std::fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel")
            .field("open", &self.open)
            .field("keyed", &self.session.is_some())
            .finish()
    }
}

impl SecureChannel {
    /// A closed channel with no session keys.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the channel is open for secure exchanges.
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// The pairing slot the channel was opened against.
    pub fn pairing_index(&self) -> Option<u8> {
        self.session.as_ref().map(|session| session.pairing_index)
    }

    /// Restore a channel from raw session state.
    ///
    /// This is the seam card simulators and tests use; a live channel is
    /// established with [`SecureChannel::open`].
    pub fn from_raw_keys(enc: [u8; 32], mac: [u8; 32], iv: [u8; 16], pairing_index: u8) -> Self {
        Self {
            session: Some(Session {
                enc,
                mac,
                iv,
                pairing_index,
            }),
            open: true,
        }
    }

    /// Open the channel: run OPEN SECURE CHANNEL against the pairing
    /// slot, derive the session keys, and (unless opted out) prove them
    /// with MUTUALLY AUTHENTICATE.
    ///
    /// No channel state is mutated when the open itself fails; a failed
    /// authentication closes the channel.
    pub fn open<T: CardTransport>(
        &mut self,
        transport: &mut T,
        card_public_key: &k256::PublicKey,
        pairing: &PairingInfo,
        authenticate: bool,
    ) -> Result<(), SecureChannelError> {
        let host_private_key = generate_ephemeral_keypair();

        let command = OpenSecureChannelCommand::with_pairing_index_and_pubkey(
            pairing.index,
            &host_private_key.public_key(),
        );
        let response = transport.transmit(&command)?;
        let (salt, iv) = OpenSecureChannelCommand::parse_response(response)?;

        let shared_secret = generate_ecdh_shared_secret(&host_private_key, card_public_key);
        let (enc_key, mac_key) =
            derive_session_keys(shared_secret, ScpKey::from_slice(&pairing.key), &salt);

        debug!(pairing_index = pairing.index, "secure channel keyed");
        let mut enc = [0u8; 32];
        let mut mac = [0u8; 32];
        enc.copy_from_slice(&enc_key);
        mac.copy_from_slice(&mac_key);
        self.session = Some(Session {
            enc,
            mac,
            iv,
            pairing_index: pairing.index,
        });
        self.open = true;

        if authenticate {
            if let Err(err) = self.authenticate(transport) {
                self.close();
                return Err(err);
            }
        }

        Ok(())
    }

    /// Prove the session keys to both sides with MUTUALLY AUTHENTICATE.
    ///
    /// Verifying the card's response MAC is the authentication; the
    /// decrypted random needs no further check.
    pub fn authenticate<T: CardTransport>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), SecureChannelError> {
        let challenge = random_challenge();
        let command = MutuallyAuthenticateCommand::with_challenge(&challenge);

        let response = self.send(transport, &command)?;
        match MutuallyAuthenticateCommand::parse_response(response) {
            Ok(()) => {
                debug!("mutual authentication succeeded");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "mutual authentication failed");
                self.close();
                Err(err.into())
            }
        }
    }

    /// Run one secure exchange.
    ///
    /// The returned [`Response`] carries the *inner* status word extracted
    /// from the decrypted payload. A raw status other than `90 00` closes
    /// the channel and is surfaced as a response with empty data, so the
    /// command layer can map it.
    pub fn send<T: CardTransport>(
        &mut self,
        transport: &mut T,
        command: &Command,
    ) -> Result<Response, SecureChannelError> {
        let wire = self.wrap_command(command)?;

        let raw = match transport.transmit(&wire) {
            Ok(raw) => raw,
            Err(err) => {
                // A lost exchange desynchronizes the IV chain.
                self.close();
                return Err(err.into());
            }
        };

        if !raw.is_success() {
            warn!(sw = %raw.status(), "secure exchange refused");
            self.close();
            return Ok(Response::new(Bytes::new(), raw.status()));
        }

        match self.unwrap_response(&raw.into_data()) {
            Ok(response) => Ok(response),
            Err(err) => {
                self.close();
                Err(err)
            }
        }
    }

    /// Close the channel and wipe the key material. Idempotent.
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            trace!("secure channel closed");
        }
        self.open = false;
    }

    /// Encrypt and MAC an APDU for transmission, advancing the IV.
    fn wrap_command(&mut self, command: &Command) -> Result<Command, SecureChannelError> {
        let session = self.session.as_mut().ok_or(SecureChannelError::NotOpen)?;

        let mut plaintext = BytesMut::from(command.data().unwrap_or(&[]));
        let ciphertext = encrypt_data(
            &mut plaintext,
            ScpKey::from_slice(&session.enc),
            ScpIv::from_slice(&session.iv),
        );

        if ciphertext.len() + 16 > cairn_apdu::MAX_DATA_LEN {
            return Err(cairn_apdu::Error::DataTooLong(ciphertext.len() + 16).into());
        }

        let mut meta = ApduMeta::default();
        meta[0] = command.class();
        meta[1] = command.instruction();
        meta[2] = command.p1();
        meta[3] = command.p2();
        meta[4] = (ciphertext.len() + 16) as u8;

        let mac = calculate_mac(&meta, &ciphertext, ScpKey::from_slice(&session.mac));
        // Our MAC is the IV of the next encryption.
        session.iv.copy_from_slice(&mac);

        trace!(
            lc = ciphertext.len() + 16,
            "wrapped secure command ins={:02X}",
            command.instruction()
        );

        let mut body = BytesMut::with_capacity(16 + ciphertext.len());
        body.put_slice(&mac);
        body.put_slice(&ciphertext);

        Ok(Command::new(
            command.class(),
            command.instruction(),
            command.p1(),
            command.p2(),
        )
        .with_data(body.freeze()))
    }

    /// Verify, decrypt and split a secure response body into data and the
    /// inner status word, advancing the IV.
    fn unwrap_response(&mut self, body: &[u8]) -> Result<Response, SecureChannelError> {
        let session = self.session.as_mut().ok_or(SecureChannelError::NotOpen)?;

        if body.len() < 16 {
            return Err(SecureChannelError::InvalidResponse(
                "secure response shorter than a MAC",
            ));
        }
        let (received_mac, ciphertext) = body.split_at(16);

        let mut meta = ApduMeta::default();
        meta[0] = body.len() as u8;
        let expected_mac = calculate_mac(&meta, ciphertext, ScpKey::from_slice(&session.mac));
        if expected_mac.as_slice() != received_mac {
            warn!("secure response MAC mismatch");
            return Err(SecureChannelError::InvalidMac);
        }

        // Decrypt with the IV in effect before this response, i.e. the
        // MAC we sent; the received MAC only becomes the next IV.
        let mut buf = BytesMut::from(ciphertext);
        let plaintext = decrypt_data(
            &mut buf,
            ScpKey::from_slice(&session.enc),
            ScpIv::from_slice(&session.iv),
        )
        .map_err(|_| SecureChannelError::InvalidResponse("invalid padding"))?;

        if plaintext.len() < 2 {
            return Err(SecureChannelError::InvalidMac);
        }

        session.iv.copy_from_slice(received_mac);

        let (data, sw) = plaintext.split_at(plaintext.len() - 2);
        Ok(Response::new(
            Bytes::copy_from_slice(data),
            StatusWord::new(sw[0], sw[1]),
        ))
    }
}
