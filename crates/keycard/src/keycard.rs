//! The Keycard session aggregate.
//!
//! A [`Keycard`] owns the transport to one physical card and tracks the
//! protocol state built on top of it: the applet info from SELECT, the
//! pairing in use and the secure channel. Operations are synchronous and
//! must not be interleaved; callers wanting concurrency serialize at a
//! higher level.

use cairn_apdu::{CardTransport, Command, Response};
use tracing::{debug, warn};

use crate::commands::*;
use crate::constants::KEYCARD_AID;
use crate::crypto::{calculate_cryptogram, generate_pairing_token, random_challenge, Challenge};
use crate::path::{DeriveMode, KeyPath};
use crate::secrets::Secrets;
use crate::secure_channel::{SecureChannel, SecureChannelError};
use crate::types::{
    ApplicationInfo, ApplicationStatus, Capability, ExportedKey, Identity, Mnemonic, PairingInfo,
    Signature,
};
use crate::{Error, Result};

/// A session with one Keycard.
pub struct Keycard<T: CardTransport> {
    transport: T,
    card_public_key: Option<[u8; 65]>,
    application_info: Option<ApplicationInfo>,
    pairing_info: Option<PairingInfo>,
    secure_channel: SecureChannel,
}

impl<T: CardTransport> std::fmt::Debug for Keycard<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keycard")
            .field("selected", &self.application_info.is_some())
            .field("paired", &self.pairing_info.is_some())
            .field("secure_channel", &self.secure_channel)
            .finish()
    }
}

impl<T: CardTransport> Keycard<T> {
    /// Create a session over a connected transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            card_public_key: None,
            application_info: None,
            pairing_info: None,
            secure_channel: SecureChannel::new(),
        }
    }

    /// Create a session with a stored pairing record, so the secure
    /// channel can be opened without pairing again.
    pub fn with_pairing(transport: T, pairing_info: PairingInfo) -> Self {
        let mut keycard = Self::new(transport);
        keycard.pairing_info = Some(pairing_info);
        keycard
    }

    /// The underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Tear down the session and hand the transport back.
    pub fn into_transport(mut self) -> T {
        self.secure_channel.close();
        self.transport
    }

    /// Application info from the last successful SELECT.
    pub fn application_info(&self) -> Option<&ApplicationInfo> {
        self.application_info.as_ref()
    }

    /// The pairing record in use, if any.
    pub fn pairing_info(&self) -> Option<&PairingInfo> {
        self.pairing_info.as_ref()
    }

    /// Install a pairing record persisted by the embedder.
    pub fn set_pairing_info(&mut self, pairing_info: PairingInfo) {
        self.pairing_info = Some(pairing_info);
    }

    /// Whether the secure channel is open.
    pub fn is_secure_channel_open(&self) -> bool {
        self.secure_channel.is_open()
    }

    //
    // SELECT / INIT / IDENT / FACTORY RESET (plain transport)
    //

    /// Select the Keycard applet and refresh the session's application
    /// info and card public key.
    pub fn select(&mut self) -> Result<ApplicationInfo> {
        self.select_with_aid(KEYCARD_AID)
    }

    /// Select an applet instance by AID.
    pub fn select_with_aid(&mut self, aid: &[u8]) -> Result<ApplicationInfo> {
        let response = self.transport.transmit(&SelectCommand::with_aid(aid))?;
        let info = SelectCommand::parse_response(response)?;

        debug!(initialized = info.is_initialized(), "applet selected");
        self.card_public_key = info.public_key;
        self.application_info = Some(info.clone());

        Ok(info)
    }

    /// Initialize the card with a PIN, PUK and pairing password.
    ///
    /// Credential formats are validated locally; nothing is transmitted
    /// when they are rejected.
    pub fn init(&mut self, pin: &str, puk: &str, pairing_password: &str) -> Result<()> {
        let secrets = Secrets::new(pin, puk, pairing_password)?;
        self.init_with_secrets(&secrets)
    }

    /// Initialize the card with prepared [`Secrets`].
    pub fn init_with_secrets(&mut self, secrets: &Secrets) -> Result<()> {
        self.require_selected()?;
        let card_public_key = self.card_public_key_point()?;

        let command = InitCommand::with_card_pubkey_and_secrets(&card_public_key, secrets);
        let response = self.transport.transmit(&command)?;
        InitCommand::parse_response(response)?;

        // Any previous pairing died with the old card state.
        self.pairing_info = None;
        Ok(())
    }

    /// Have the card prove its identity by signing a challenge.
    pub fn ident(&mut self, challenge: Option<&Challenge>) -> Result<Identity> {
        let command = match challenge {
            Some(challenge) => IdentCommand::with_challenge(challenge),
            None => IdentCommand::with_random_challenge(),
        };

        let response = self.transport.transmit(&command)?;
        Ok(IdentCommand::parse_response(response)?)
    }

    /// Wipe the card back to its factory state. Requires only SELECT.
    pub fn factory_reset(&mut self) -> Result<()> {
        self.require_selected()?;

        let response = self.transport.transmit(&FactoryResetCommand::reset())?;
        FactoryResetCommand::parse_response(response)?;

        // The card forgot everything; so do we.
        self.secure_channel.close();
        self.pairing_info = None;
        Ok(())
    }

    //
    // Pairing
    //

    /// Run the two-step pairing handshake and return the new pairing
    /// record. The caller is responsible for persisting it.
    pub fn pair(&mut self, pairing_password: &str) -> Result<PairingInfo> {
        self.require_capability(Capability::SecureChannel)?;

        let shared_secret = generate_pairing_token(pairing_password);
        let challenge = random_challenge();

        let response = self
            .transport
            .transmit(&PairCommand::first_stage(&challenge))?;
        let (card_cryptogram, card_challenge) = PairCommand::parse_first_stage(response)?;

        // The card must prove knowledge of the pairing secret before we
        // answer its challenge; a mismatch means a wrong password or a
        // card in the middle.
        if card_cryptogram != calculate_cryptogram(&shared_secret, &challenge) {
            warn!("card cryptogram mismatch during pairing");
            return Err(Error::CardAuthenticationFailed);
        }

        let client_cryptogram = calculate_cryptogram(&shared_secret, &card_challenge);
        let response = self
            .transport
            .transmit(&PairCommand::final_stage(&client_cryptogram))?;
        let (index, salt) = PairCommand::parse_final_stage(response)?;

        let mut key = [0u8; 32];
        key.copy_from_slice(&calculate_cryptogram(
            &shared_secret,
            Challenge::from_slice(&salt),
        ));

        debug!(index, "paired");
        let pairing_info = PairingInfo { key, index, salt };
        self.pairing_info = Some(pairing_info.clone());

        Ok(pairing_info)
    }

    /// Free a pairing slot. Requires an open secure channel.
    pub fn unpair(&mut self, index: u8) -> Result<()> {
        self.require_capability(Capability::SecureChannel)?;

        let response = self.send_secure(&UnpairCommand::with_index(index))?;
        UnpairCommand::parse_response(response)?;

        if self.pairing_info.as_ref().map(|info| info.index) == Some(index) {
            self.pairing_info = None;
        }
        Ok(())
    }

    //
    // Secure channel
    //

    /// Open the secure channel and mutually authenticate.
    pub fn open_secure_channel(&mut self) -> Result<()> {
        self.open_channel(true)
    }

    /// Open the secure channel without the authentication round-trip.
    ///
    /// Almost every caller wants [`Keycard::open_secure_channel`];
    /// skipping authentication leaves the key agreement unproven until
    /// the first exchange.
    pub fn open_secure_channel_without_authentication(&mut self) -> Result<()> {
        self.open_channel(false)
    }

    fn open_channel(&mut self, authenticate: bool) -> Result<()> {
        self.require_capability(Capability::SecureChannel)?;
        let card_public_key = self.card_public_key_point()?;
        let pairing = self.pairing_info.clone().ok_or(Error::PairingRequired)?;

        self.secure_channel
            .open(&mut self.transport, &card_public_key, &pairing, authenticate)
            .map_err(flatten_authentication_failure)
    }

    /// Run MUTUALLY AUTHENTICATE on an already keyed channel.
    pub fn mutually_authenticate(&mut self) -> Result<()> {
        self.secure_channel
            .authenticate(&mut self.transport)
            .map_err(flatten_authentication_failure)
    }

    //
    // Credentials
    //

    /// Verify the user PIN over the secure channel.
    pub fn verify_pin(&mut self, pin: &str) -> Result<()> {
        let response = self.send_secure(&VerifyPinCommand::with_pin(pin))?;
        Ok(VerifyPinCommand::parse_response(response)?)
    }

    /// Change the user PIN (six digits).
    pub fn change_pin(&mut self, new_pin: &str) -> Result<()> {
        self.require_capability(Capability::CredentialsManagement)?;
        validate_digits(new_pin, 6, "PIN must be exactly 6 digits")?;

        let response = self.send_secure(&ChangeSecretCommand::with_pin(new_pin))?;
        Ok(ChangeSecretCommand::parse_response(response)?)
    }

    /// Change the PUK (twelve digits).
    pub fn change_puk(&mut self, new_puk: &str) -> Result<()> {
        self.require_capability(Capability::CredentialsManagement)?;
        validate_digits(new_puk, 12, "PUK must be exactly 12 digits")?;

        let response = self.send_secure(&ChangeSecretCommand::with_puk(new_puk))?;
        Ok(ChangeSecretCommand::parse_response(response)?)
    }

    /// Change the pairing secret. Existing pairings stay valid; new
    /// pairings derive from the new password.
    pub fn change_pairing_secret(&mut self, new_password: &str) -> Result<()> {
        self.require_capability(Capability::CredentialsManagement)?;

        let response = self.send_secure(&ChangeSecretCommand::with_pairing_secret(new_password))?;
        Ok(ChangeSecretCommand::parse_response(response)?)
    }

    /// Reset a blocked PIN using the PUK.
    pub fn unblock_pin(&mut self, puk: &str, new_pin: &str) -> Result<()> {
        self.require_capability(Capability::CredentialsManagement)?;
        validate_digits(puk, 12, "PUK must be exactly 12 digits")?;
        validate_digits(new_pin, 6, "PIN must be exactly 6 digits")?;

        let response = self.send_secure(&UnblockPinCommand::with_puk_and_new_pin(puk, new_pin))?;
        Ok(UnblockPinCommand::parse_response(response)?)
    }

    //
    // Status
    //

    /// PIN/PUK retry counters and key presence.
    pub fn get_status(&mut self) -> Result<ApplicationStatus> {
        let response = self.send_secure(&GetStatusCommand::application())?;
        Ok(GetStatusCommand::parse_application(response)?)
    }

    /// The card's current BIP32 key path.
    pub fn get_key_path(&mut self) -> Result<KeyPath> {
        let response = self.send_secure(&GetStatusCommand::key_path())?;
        Ok(GetStatusCommand::parse_key_path(response)?)
    }

    //
    // Data storage
    //

    /// Store data into one of the persistent regions.
    pub fn store_data(&mut self, record: PersistentRecord, data: &[u8]) -> Result<()> {
        if record == PersistentRecord::Ndef {
            self.require_capability(Capability::Ndef)?;
        }

        let response = self.send_secure(&StoreDataCommand::put(record, data))?;
        Ok(StoreDataCommand::parse_response(response)?)
    }

    /// Read one of the persistent regions. Public readout; no secure
    /// channel required.
    pub fn get_data(&mut self, record: PersistentRecord) -> Result<Vec<u8>> {
        if record == PersistentRecord::Ndef {
            self.require_capability(Capability::Ndef)?;
        }

        let response = self.transport.transmit(&GetDataCommand::get(record))?;
        Ok(GetDataCommand::parse_response(response)?)
    }

    //
    // Key management
    //

    /// Generate a new master key on the card; returns its key UID.
    pub fn generate_key(&mut self) -> Result<[u8; 32]> {
        self.require_capability(Capability::KeyManagement)?;

        let response = self.send_secure(&GenerateKeyCommand::create())?;
        Ok(GenerateKeyCommand::parse_response(response)?)
    }

    /// Remove the master key from the card.
    pub fn remove_key(&mut self) -> Result<()> {
        self.require_capability(Capability::KeyManagement)?;

        let response = self.send_secure(&RemoveKeyCommand::remove())?;
        Ok(RemoveKeyCommand::parse_response(response)?)
    }

    /// Load an ECC keypair as the master key; returns its key UID.
    pub fn load_key(
        &mut self,
        public_key: Option<&k256::PublicKey>,
        private_key: &k256::SecretKey,
    ) -> Result<[u8; 32]> {
        self.require_capability(Capability::KeyManagement)?;

        let response = self.send_secure(&LoadKeyCommand::load_keypair(public_key, private_key))?;
        Ok(LoadKeyCommand::parse_response(response)?)
    }

    /// Load an extended keypair (with chain code) as the master key.
    pub fn load_extended_key(
        &mut self,
        public_key: Option<&k256::PublicKey>,
        private_key: &k256::SecretKey,
        chain_code: &[u8; 32],
    ) -> Result<[u8; 32]> {
        self.require_capability(Capability::KeyManagement)?;

        let response = self.send_secure(&LoadKeyCommand::load_extended_keypair(
            public_key,
            private_key,
            chain_code,
        ))?;
        Ok(LoadKeyCommand::parse_response(response)?)
    }

    /// Load a 64-byte BIP39 seed as the master key.
    pub fn load_seed(&mut self, seed: &[u8; 64]) -> Result<[u8; 32]> {
        self.require_capability(Capability::KeyManagement)?;

        let response = self.send_secure(&LoadKeyCommand::load_bip39_seed(seed))?;
        Ok(LoadKeyCommand::parse_response(response)?)
    }

    /// Generate BIP39 word indexes from card entropy.
    pub fn generate_mnemonic(&mut self, words: u8) -> Result<Mnemonic> {
        self.require_capability(Capability::KeyManagement)?;

        let command = GenerateMnemonicCommand::with_words(words)?;
        let response = self.send_secure(&command)?;
        Ok(GenerateMnemonicCommand::parse_response(response)?)
    }

    /// Export the current key.
    pub fn export_key(&mut self, what: ExportOption) -> Result<ExportedKey> {
        let response = self.send_secure(&ExportKeyCommand::from_current(what))?;
        Ok(ExportKeyCommand::parse_response(response)?)
    }

    /// Export a key derived along `path`.
    pub fn export_key_with_derivation(
        &mut self,
        what: ExportOption,
        path: &KeyPath,
        derive_mode: DeriveMode,
    ) -> Result<ExportedKey> {
        let response =
            self.send_secure(&ExportKeyCommand::with_derivation(what, path, derive_mode))?;
        Ok(ExportKeyCommand::parse_response(response)?)
    }

    //
    // Signing
    //

    /// Sign a 32-byte hash with the current key or along a derivation
    /// path. Requires an open secure channel and a verified PIN.
    pub fn sign(
        &mut self,
        hash: &[u8],
        path: &KeyPath,
        derive_mode: Option<DeriveMode>,
    ) -> Result<Signature> {
        self.require_secure_channel()?;
        let hash: &[u8; 32] = hash.try_into().map_err(|_| SignError::DataTooShort)?;

        let response = self.send_secure(&SignCommand::with(hash, path, derive_mode))?;
        Ok(SignCommand::parse_response(response)?)
    }

    /// Sign a 32-byte hash with the PIN-less path, outside the secure
    /// channel.
    pub fn sign_pinless(&mut self, hash: &[u8]) -> Result<Signature> {
        let hash: &[u8; 32] = hash.try_into().map_err(|_| SignError::DataTooShort)?;

        let response = self.transport.transmit(&SignCommand::with_pinless(hash))?;
        Ok(SignCommand::parse_response(response)?)
    }

    /// Set the PIN-less signing path; `None` disables the feature.
    pub fn set_pinless_path(&mut self, path: Option<&KeyPath>) -> Result<()> {
        let command = match path {
            Some(path) => SetPinlessPathCommand::with_path(path),
            None => SetPinlessPathCommand::disable(),
        };

        let response = self.send_secure(&command)?;
        Ok(SetPinlessPathCommand::parse_response(response)?)
    }

    //
    // Gates and plumbing
    //

    fn require_selected(&self) -> Result<&ApplicationInfo> {
        self.application_info.as_ref().ok_or(Error::NotSelected)
    }

    fn require_capability(&self, capability: Capability) -> Result<()> {
        let info = self.require_selected()?;
        if !info.capabilities.has(capability) {
            return Err(Error::CapabilityNotSupported(capability));
        }
        Ok(())
    }

    fn require_secure_channel(&self) -> Result<()> {
        if !self.secure_channel.is_open() {
            return Err(Error::SecureChannelNotOpen);
        }
        Ok(())
    }

    /// The card's public key as a validated curve point.
    fn card_public_key_point(&self) -> Result<k256::PublicKey> {
        let raw = self.card_public_key.ok_or(Error::NotSelected)?;
        k256::PublicKey::from_sec1_bytes(&raw)
            .map_err(|_| Error::InvalidData("card public key is not a valid secp256k1 point"))
    }

    fn send_secure(&mut self, command: &Command) -> Result<Response> {
        self.require_secure_channel()?;
        Ok(self.secure_channel.send(&mut self.transport, command)?)
    }
}

// A card-reported authentication failure surfaces as the dedicated
// top-level error; MAC failures keep their secure-layer identity.
fn flatten_authentication_failure(err: SecureChannelError) -> Error {
    match err {
        SecureChannelError::Authentication(_) => Error::MutualAuthenticationFailed,
        other => other.into(),
    }
}

fn validate_digits(value: &str, length: usize, message: &'static str) -> Result<()> {
    if value.len() != length || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidData(message));
    }
    Ok(())
}
