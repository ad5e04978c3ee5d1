//! A scripted card simulator for driving the full client stack.
//!
//! The simulator implements the card side of the protocol independently,
//! from the same published primitives (k256, sha2, AES-CBC), so the test
//! suite cross-checks the client rather than mirroring its internals. It
//! plugs into [`MockTransport::with_responder`].

// Not every test binary exercises every helper.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use cairn_apdu::MockTransport;
use cipher::block_padding::{Iso7816, NoPadding};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use sha2::{Digest, Sha256, Sha512};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

pub const PAIRING_PASSWORD: &str = "KeycardTest";
pub const PIN: &str = "123456";
pub const PUK: &str = "123456789012";

/// Derive the pairing token the way both sides do.
pub fn pairing_token(password: &str) -> [u8; 32] {
    let mut token = [0u8; 32];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        b"Keycard Pairing Password Salt",
        50_000,
        &mut token,
    );
    token
}

fn sha256_pair(a: &[u8], b: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(a);
    hasher.update(b);
    hasher.finalize().into()
}

fn iso_encrypt(key: &[u8; 32], iv: &[u8; 16], plaintext: &[u8]) -> Vec<u8> {
    let mut buf = plaintext.to_vec();
    let len = buf.len();
    buf.resize(len + 16 - len % 16, 0);
    Aes256CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<Iso7816>(&mut buf, len)
        .unwrap()
        .to_vec()
}

fn iso_decrypt(key: &[u8; 32], iv: &[u8; 16], ciphertext: &[u8]) -> Vec<u8> {
    let mut buf = ciphertext.to_vec();
    Aes256CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<Iso7816>(&mut buf)
        .unwrap()
        .to_vec()
}

fn cbc_mac(key: &[u8; 32], meta: &[u8; 16], data: &[u8]) -> [u8; 16] {
    let mut buf = Vec::with_capacity(16 + data.len());
    buf.extend_from_slice(meta);
    buf.extend_from_slice(data);
    let len = buf.len();
    let ciphertext = Aes256CbcEnc::new(key.into(), &[0u8; 16].into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .unwrap()
        .to_vec();
    ciphertext[ciphertext.len() - 16..].try_into().unwrap()
}

struct Session {
    enc: [u8; 32],
    mac: [u8; 32],
    /// IV for decrypting the next host command: the initial IV after
    /// OPEN, then always the MAC of our own last response.
    decrypt_iv: [u8; 16],
    authenticated: bool,
}

struct State {
    card_sk: k256::SecretKey,
    token: [u8; 32],
    instance_uid: [u8; 16],
    pairing_key: Option<[u8; 32]>,
    card_challenge: [u8; 32],
    salt: [u8; 32],
    session: Option<Session>,
    pin_verified: bool,
    factory_reset_count: usize,
}

/// Handle to the simulated card. Cloning shares the state.
#[derive(Clone)]
pub struct SimCard {
    state: Arc<Mutex<State>>,
}

impl SimCard {
    pub fn new() -> Self {
        let card_sk = k256::SecretKey::random(&mut rand_v8::thread_rng());
        Self {
            state: Arc::new(Mutex::new(State {
                card_sk,
                token: pairing_token(PAIRING_PASSWORD),
                instance_uid: [0x1D; 16],
                pairing_key: None,
                card_challenge: [0x5C; 32],
                salt: [0x77; 32],
                session: None,
                pin_verified: false,
                factory_reset_count: 0,
            })),
        }
    }

    pub fn public_key(&self) -> [u8; 65] {
        let state = self.state.lock().unwrap();
        state
            .card_sk
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .try_into()
            .unwrap()
    }

    /// A transport whose responder is this card.
    pub fn transport(&self) -> MockTransport {
        let card = self.clone();
        MockTransport::with_responder(move |apdu| card.handle(apdu).into())
    }

    pub fn pairing_key(&self) -> Option<[u8; 32]> {
        self.state.lock().unwrap().pairing_key
    }

    pub fn factory_reset_count(&self) -> usize {
        self.state.lock().unwrap().factory_reset_count
    }

    /// The SELECT response for an initialized card with all capabilities.
    fn application_info(state: &State) -> Vec<u8> {
        let public_key = state
            .card_sk
            .public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        let mut children = Vec::new();
        children.extend([0x8F, 0x10]);
        children.extend(state.instance_uid);
        children.extend([0x80, 0x41]);
        children.extend(public_key);
        children.extend([0x02, 0x02, 0x03, 0x01]); // version 3.1
        children.extend([0x02, 0x01, 0x05]); // five free slots
        children.extend([0x8E, 0x00]); // no key loaded
        children.extend([0x8D, 0x01, 0x0F]); // all capabilities

        let mut out = vec![0xA4, 0x81, children.len() as u8];
        out.extend(children);
        out
    }

    fn handle(&self, apdu: &[u8]) -> Vec<u8> {
        let mut state = self.state.lock().unwrap();
        let (cla, ins, p1, _p2) = (apdu[0], apdu[1], apdu[2], apdu[3]);
        let data = if apdu.len() > 5 { &apdu[5..] } else { &[][..] };

        match (cla, ins) {
            (0x00, 0xA4) => {
                let mut out = Self::application_info(&state);
                out.extend([0x90, 0x00]);
                out
            }
            (0x80, 0x12) => Self::handle_pair(&mut state, p1, data),
            (0x80, 0x10) => Self::handle_open(&mut state, p1, data),
            (0x80, 0xFD) => {
                state.factory_reset_count += 1;
                state.session = None;
                state.pairing_key = None;
                vec![0x90, 0x00]
            }
            (0x80, 0xC0) if p1 == 0x03 => {
                // PIN-less signing bypasses the secure channel
                let mut out = vec![0x80, 0x41];
                out.extend([0xE1; 65]);
                out.extend([0x90, 0x00]);
                out
            }
            (0x80, _) if state.session.is_some() => Self::handle_secure(&mut state, apdu, data),
            _ => vec![0x6D, 0x00],
        }
    }

    fn handle_pair(state: &mut State, p1: u8, data: &[u8]) -> Vec<u8> {
        match p1 {
            0x00 => {
                let cryptogram = sha256_pair(&state.token, data);
                let mut out = cryptogram.to_vec();
                out.extend(state.card_challenge);
                out.extend([0x90, 0x00]);
                out
            }
            0x01 => {
                let expected = sha256_pair(&state.token, &state.card_challenge);
                if data != expected.as_slice() {
                    return vec![0x69, 0x82];
                }
                state.pairing_key = Some(sha256_pair(&state.token, &state.salt));

                let mut out = vec![0x01]; // slot 1
                out.extend(state.salt);
                out.extend([0x90, 0x00]);
                out
            }
            _ => vec![0x6A, 0x86],
        }
    }

    fn handle_open(state: &mut State, p1: u8, data: &[u8]) -> Vec<u8> {
        if p1 != 0x01 {
            return vec![0x6A, 0x86];
        }
        let Some(pairing_key) = state.pairing_key else {
            return vec![0x6A, 0x86];
        };
        let Ok(host_pub) = k256::PublicKey::from_sec1_bytes(data) else {
            return vec![0x6A, 0x80];
        };

        let shared = k256::elliptic_curve::ecdh::diffie_hellman(
            state.card_sk.to_nonzero_scalar(),
            host_pub.as_affine(),
        );

        let salt = [0x9E; 32];
        let iv = [0xB4; 16];

        let mut hasher = Sha512::new();
        hasher.update(shared.raw_secret_bytes());
        hasher.update(pairing_key);
        hasher.update(salt);
        let derived = hasher.finalize();

        state.session = Some(Session {
            enc: derived[..32].try_into().unwrap(),
            mac: derived[32..].try_into().unwrap(),
            decrypt_iv: iv,
            authenticated: false,
        });
        state.pin_verified = false;

        let mut out = salt.to_vec();
        out.extend(iv);
        out.extend([0x90, 0x00]);
        out
    }

    fn handle_secure(state: &mut State, apdu: &[u8], body: &[u8]) -> Vec<u8> {
        let (enc, mac, decrypt_iv) = {
            let session = state.session.as_ref().unwrap();
            (session.enc, session.mac, session.decrypt_iv)
        };

        if body.len() < 16 {
            state.session = None;
            return vec![0x69, 0x82];
        }
        let (host_mac, ciphertext) = body.split_at(16);

        let mut meta = [0u8; 16];
        meta[..4].copy_from_slice(&apdu[..4]);
        meta[4] = body.len() as u8;
        if cbc_mac(&mac, &meta, ciphertext).as_slice() != host_mac {
            state.session = None;
            return vec![0x69, 0x82];
        }

        let plaintext = iso_decrypt(&enc, &decrypt_iv, ciphertext);
        let (response, sw) = Self::dispatch_secure(state, apdu[1], &plaintext);

        let mut inner = response;
        inner.extend(sw);

        let host_mac: [u8; 16] = host_mac.try_into().unwrap();
        let response_ct = iso_encrypt(&enc, &host_mac, &inner);

        let mut rmeta = [0u8; 16];
        rmeta[0] = (response_ct.len() + 16) as u8;
        let rmac = cbc_mac(&mac, &rmeta, &response_ct);

        if let Some(session) = state.session.as_mut() {
            session.decrypt_iv = rmac;
        }

        let mut out = rmac.to_vec();
        out.extend(response_ct);
        out.extend([0x90, 0x00]);
        out
    }

    fn dispatch_secure(state: &mut State, ins: u8, plaintext: &[u8]) -> (Vec<u8>, [u8; 2]) {
        match ins {
            // MUTUALLY AUTHENTICATE: echo 32 bytes of card randomness
            0x11 => {
                if let Some(session) = state.session.as_mut() {
                    session.authenticated = true;
                }
                (vec![0x6A; 32], [0x90, 0x00])
            }
            // VERIFY PIN
            0x20 => {
                if plaintext == PIN.as_bytes() {
                    state.pin_verified = true;
                    (Vec::new(), [0x90, 0x00])
                } else {
                    (Vec::new(), [0x63, 0xC2])
                }
            }
            // GET STATUS (application)
            0xF2 => (
                vec![0xA3, 0x09, 0x02, 0x01, 0x03, 0x02, 0x01, 0x05, 0x01, 0x01, 0x00],
                [0x90, 0x00],
            ),
            // SIGN: raw shape, r ‖ s ‖ recovery id
            0xC0 => {
                if !state.pin_verified {
                    return (Vec::new(), [0x69, 0x85]);
                }
                let mut signature = vec![0x80, 0x41];
                signature.extend([0xD7; 32]);
                signature.extend([0xE8; 32]);
                signature.push(0x00);
                (signature, [0x90, 0x00])
            }
            _ => (Vec::new(), [0x6D, 0x00]),
        }
    }
}
