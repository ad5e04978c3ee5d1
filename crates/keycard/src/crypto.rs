//! Cryptographic primitives for the Keycard protocol.
//!
//! Everything the secure channel and pairing subprotocol need: AES-256-CBC
//! with ISO/IEC 9797-1 method 2 padding, AES-CBC-MAC, the SHA-512 session
//! KDF, PBKDF2 pairing-token derivation and raw-X ECDH.

use aes::cipher::{
    block_padding::{Iso7816, NoPadding},
    typenum::{U16, U32},
    BlockDecryptMut, BlockEncryptMut, Iv, IvSizeUser, Key, KeyIvInit, KeySizeUser,
};
use bytes::{BufMut, Bytes, BytesMut};
use cipher::block_padding::UnpadError;
use generic_array::GenericArray;
use k256::{ecdh::SharedSecret, elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};
use unicode_normalization::UnicodeNormalization;

/// Salt mixed into the PBKDF2 derivation of pairing tokens.
pub const PAIRING_TOKEN_SALT: &str = "Keycard Pairing Password Salt";

const PAIRING_TOKEN_ROUNDS: u32 = 50_000;

/// 32-byte secret derived from the pairing password.
pub type PairingToken = GenericArray<u8, U32>;
/// 32-byte challenge exchanged during pairing and authentication.
pub type Challenge = GenericArray<u8, U32>;
/// SHA-256 over a shared secret and a challenge.
pub type Cryptogram = GenericArray<u8, U32>;
/// Header block prepended to MAC inputs.
pub(crate) type ApduMeta = GenericArray<u8, U16>;

type Encryptor = cbc::Encryptor<aes::Aes256>;
type Decryptor = cbc::Decryptor<aes::Aes256>;

/// Marker fixing the secure channel's key and IV sizes.
pub struct Scp;

impl KeySizeUser for Scp {
    type KeySize = U32;
}

impl IvSizeUser for Scp {
    type IvSize = U16;
}

/// 32-byte secure channel key.
pub type ScpKey = Key<Scp>;
/// 16-byte secure channel IV.
pub type ScpIv = Iv<Scp>;

/// Fill a buffer from the OS CSPRNG. Failure aborts the process.
pub(crate) fn random_challenge() -> Challenge {
    let mut challenge = Challenge::default();
    rand::rng().fill_bytes(&mut challenge);
    challenge
}

/// Generate an ephemeral secp256k1 keypair.
pub(crate) fn generate_ephemeral_keypair() -> SecretKey {
    SecretKey::random(&mut rand_v8::thread_rng())
}

/// Raw ECDH: the shared point's X coordinate, unhashed.
///
/// The card derives session keys from the bare coordinate; hashing the
/// output here would not interoperate.
pub(crate) fn generate_ecdh_shared_secret(private: &SecretKey, public: &PublicKey) -> SharedSecret {
    k256::elliptic_curve::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
}

/// SHA-256 over `shared_secret ‖ challenge`, used on both sides of the
/// pairing handshake.
pub(crate) fn calculate_cryptogram(
    shared_secret: &PairingToken,
    challenge: &Challenge,
) -> Cryptogram {
    let mut hasher = Sha256::new();
    hasher.update(shared_secret);
    hasher.update(challenge);
    hasher.finalize()
}

/// Derive the pairing token from a human pairing password.
///
/// PBKDF2-HMAC-SHA256 with 50 000 iterations; password and salt are both
/// NFKD-normalized first.
pub(crate) fn generate_pairing_token(password: &str) -> PairingToken {
    let password = password.nfkd().collect::<String>();
    let salt = PAIRING_TOKEN_SALT.nfkd().collect::<String>();

    let mut token = PairingToken::default();
    pbkdf2_hmac::<Sha256>(
        password.as_bytes(),
        salt.as_bytes(),
        PAIRING_TOKEN_ROUNDS,
        &mut token,
    );

    token
}

/// Derive the session keys for a freshly opened secure channel:
/// `(K_enc | K_mac) = SHA-512(shared_secret ‖ pairing_key ‖ salt)`.
pub(crate) fn derive_session_keys(
    secret: SharedSecret,
    pairing_key: &ScpKey,
    salt: &Challenge,
) -> (ScpKey, ScpKey) {
    let mut hasher = Sha512::new();
    hasher.update(secret.raw_secret_bytes());
    hasher.update(pairing_key);
    hasher.update(salt);
    let data = hasher.finalize();

    let enc_key = ScpKey::clone_from_slice(&data[0..32]);
    let mac_key = ScpKey::clone_from_slice(&data[32..64]);

    (enc_key, mac_key)
}

/// AES-256-CBC encrypt with ISO 7816 padding (0x80 marker, zero fill;
/// always at least one padding byte).
pub(crate) fn encrypt_data(data: &mut BytesMut, enc_key: &ScpKey, iv: &ScpIv) -> Bytes {
    let msg_len = reserve_padding(data);
    // The buffer was extended to the next block boundary above, so padded
    // encryption cannot fail.
    let encrypted = Encryptor::new(enc_key, iv)
        .encrypt_padded_mut::<Iso7816>(data, msg_len)
        .unwrap();
    Bytes::copy_from_slice(encrypted)
}

/// AES-256-CBC decrypt, stripping ISO 7816 padding by scanning back for
/// the 0x80 marker.
pub(crate) fn decrypt_data(
    data: &mut BytesMut,
    enc_key: &ScpKey,
    iv: &ScpIv,
) -> Result<Bytes, UnpadError> {
    let decrypted = Decryptor::new(enc_key, iv).decrypt_padded_mut::<Iso7816>(data)?;
    Ok(Bytes::copy_from_slice(decrypted))
}

/// AES-CBC-MAC over `meta ‖ data` with a zero IV: the last ciphertext
/// block. MAC inputs in this protocol are pre-padded by construction, so
/// no padding is applied here.
pub(crate) fn calculate_mac(meta: &ApduMeta, data: &[u8], mac_key: &ScpKey) -> ScpIv {
    let iv = ScpIv::default();

    let mut buf = BytesMut::with_capacity(meta.len() + data.len());
    buf.extend_from_slice(meta);
    buf.extend_from_slice(data);

    let msg_len = buf.len();
    debug_assert_eq!(msg_len % 16, 0, "MAC input must be block aligned");
    let ciphertext = Encryptor::new(mac_key, &iv)
        .encrypt_padded_mut::<NoPadding>(&mut buf, msg_len)
        .unwrap();

    *ScpIv::from_slice(&ciphertext[ciphertext.len() - 16..])
}

/// One-shot ECDH encryption of the INIT payload.
///
/// Output layout: `len(pub) ‖ pub(65) ‖ iv(16) ‖ ciphertext`, where the
/// ciphertext is the secrets blob encrypted under the raw ECDH secret with
/// a random IV.
pub(crate) fn one_shot_encrypt(
    public_key: &PublicKey,
    ecdh_shared_secret: &SharedSecret,
    data: &mut BytesMut,
) -> Bytes {
    let mut iv = ScpIv::default();
    rand::rng().fill_bytes(&mut iv);

    let msg_len = reserve_padding(data);
    let ciphertext = Encryptor::new(ecdh_shared_secret.raw_secret_bytes(), &iv)
        .encrypt_padded_mut::<Iso7816>(data, msg_len)
        .unwrap();

    let point = public_key.to_encoded_point(false);
    let mut buf = BytesMut::with_capacity(1 + point.len() + iv.len() + ciphertext.len());
    buf.put_u8(point.len() as u8);
    buf.put_slice(point.as_bytes());
    buf.put_slice(&iv);
    buf.put_slice(ciphertext);

    buf.into()
}

// Extend the buffer to the next 16-byte boundary (always at least one
// extra byte) and return the original message length.
fn reserve_padding(data: &mut BytesMut) -> usize {
    let len = data.len();
    data.resize(len + 16 - len % 16, 0);

    len
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn ecdh_is_symmetric() {
        let sk1 = generate_ephemeral_keypair();
        let sk2 = generate_ephemeral_keypair();

        let shared1 = generate_ecdh_shared_secret(&sk1, &sk2.public_key());
        let shared2 = generate_ecdh_shared_secret(&sk2, &sk1.public_key());

        assert_eq!(shared1.raw_secret_bytes(), shared2.raw_secret_bytes());
        assert_eq!(shared1.raw_secret_bytes().len(), 32);
        assert_ne!(shared1.raw_secret_bytes().as_slice(), &[0u8; 32]);
    }

    #[test]
    fn derives_session_keys() {
        let secret = hex!("B410E816DA313545151807E25A830201FA389913A977066AB0C6DE0E8631E400");
        let pairing_key = hex!("544FF0B9B0737E4BFC4ECDFCE09F522B837051BBE4FFCEC494FA420D8525670E");
        let card_data = hex!(
            "1D7C033E75E10EC578AB538F69F1B02538571BA3831441F1649E3F24B5B3E3E7"
            "1D7BC2D6A3D02FC8CB2FBB3FD8711BB5"
        );

        let salt = Challenge::from_slice(&card_data[..32]);
        let iv = &card_data[32..48];

        let (enc_key, mac_key) = derive_session_keys(
            SharedSecret::from(*GenericArray::from_slice(&secret)),
            ScpKey::from_slice(&pairing_key),
            salt,
        );

        assert_eq!(iv, hex!("1D7BC2D6A3D02FC8CB2FBB3FD8711BB5"));
        assert_eq!(
            enc_key.as_slice(),
            hex!("4FF496554C01BAE0A52323E3481B448C99D43982118D95C6918FE0354D224B90")
        );
        assert_eq!(
            mac_key.as_slice(),
            hex!("185811013138EA1B4FFDBBFA7343EF2DBE3E54C2C231885E867F792448AC2FE5")
        );
    }

    #[test]
    fn encrypts_with_iso7816_padding() {
        let data = hex!("A8A686D0E3290459BCB36088A8FD04A76BF13283BE4B1EAE2E1248EF609F94DC");
        let enc_key = hex!("44D689AB4B18206F7EEE5439FB9A71A8A617406BA5259728D1EBC2786D24896C");
        let iv = hex!("9D3EF41EF1D221DD98A54AD5470F58F2");

        let encrypted = encrypt_data(
            &mut BytesMut::from(data.as_slice()),
            ScpKey::from_slice(&enc_key),
            ScpIv::from_slice(&iv),
        );

        assert_eq!(
            encrypted.as_ref(),
            hex!(
                "FFB41FED5F71A2B57A6AE62D5D5ECD1C12616F6464637DD0A7A930920ACBA558"
                "67A7E12CC4F06B089AF34FF4ED4BAB08"
            )
        );
    }

    #[test]
    fn decrypts_and_strips_padding() {
        let enc_data = hex!(
            "73B58B66372E3446E14A9F54BA59666DB432E9DD87D24F9B0525180EE52DA210"
            "6E0C70EED7CD42B5B313E4443D6AC90D"
        );
        let enc_key = hex!("D93D8E6164196D5C5B5F84F10E4B90D98F8D282ED145513ED666AA55C9871E79");
        let iv = hex!("F959B1220333046D3C47D61B1E1B891B");

        let data = decrypt_data(
            &mut BytesMut::from(enc_data.as_slice()),
            ScpKey::from_slice(&enc_key),
            ScpIv::from_slice(&iv),
        )
        .unwrap();

        assert_eq!(
            data.as_ref(),
            hex!("2E21F9F2B2C2CC9038D518A5C6B490613E7955BD19D19108B77786986B7ABFE69000")
        );
    }

    #[test]
    fn decrypt_without_marker_fails() {
        // All-zero plaintext block carries no 0x80 marker once decrypted
        let enc_key = ScpKey::default();
        let iv = ScpIv::default();
        let mut buf = [0u8; 16];
        let ciphertext = Encryptor::new(&enc_key, &iv)
            .encrypt_padded_mut::<NoPadding>(&mut buf, 16)
            .unwrap();
        let mut block = BytesMut::from(ciphertext);

        assert!(decrypt_data(&mut block, &enc_key, &iv).is_err());
    }

    #[test]
    fn aes_round_trip() {
        let key_bytes = [0x42u8; 32];
        let iv_bytes = [0x24u8; 16];
        let enc_key = ScpKey::from_slice(&key_bytes);
        let iv = ScpIv::from_slice(&iv_bytes);

        for len in [0usize, 1, 15, 16, 17, 32, 255] {
            let plaintext = vec![0xABu8; len];
            let encrypted = encrypt_data(&mut BytesMut::from(plaintext.as_slice()), enc_key, iv);
            assert_eq!(encrypted.len() % 16, 0);
            assert!(encrypted.len() > len);

            let decrypted =
                decrypt_data(&mut BytesMut::from(encrypted.as_ref()), enc_key, iv).unwrap();
            assert_eq!(decrypted.as_ref(), plaintext.as_slice(), "length {len}");
        }
    }

    #[test]
    fn mac_is_deterministic_and_block_sized() {
        let key_bytes = [0x11u8; 32];
        let mac_key = ScpKey::from_slice(&key_bytes);
        let meta = ApduMeta::default();
        let data = [0x5Au8; 48];

        let mac1 = calculate_mac(&meta, &data, mac_key);
        let mac2 = calculate_mac(&meta, &data, mac_key);
        assert_eq!(mac1, mac2);
        assert_eq!(mac1.len(), 16);

        let other = calculate_mac(&meta, &[0x5Bu8; 48], mac_key);
        assert_ne!(mac1, other);
    }

    #[test]
    fn pairing_token_is_stable() {
        let token = generate_pairing_token("KeycardTest");
        assert_eq!(token, generate_pairing_token("KeycardTest"));
        assert_ne!(token, generate_pairing_token("keycardtest"));
        assert_eq!(token.len(), 32);
    }

    #[test]
    fn one_shot_encrypt_layout() {
        let host = generate_ephemeral_keypair();
        let card = generate_ephemeral_keypair();
        let shared = generate_ecdh_shared_secret(&host, &card.public_key());

        let secrets = [0x77u8; 50];
        let out = one_shot_encrypt(
            &host.public_key(),
            &shared,
            &mut BytesMut::from(secrets.as_slice()),
        );

        assert_eq!(out[0], 65);
        assert_eq!(out[1], 0x04);
        // 1 + pub + iv, then ciphertext of 50 bytes padded to 64
        assert_eq!(out.len(), 1 + 65 + 16 + 64);
    }
}
