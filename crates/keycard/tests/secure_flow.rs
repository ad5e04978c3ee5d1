//! End-to-end secure channel flows against the card simulator.

mod common;

use cairn_keycard::{Error, Keycard, SecureChannelError};
use common::SimCard;

fn paired_keycard(card: &SimCard) -> Keycard<cairn_apdu::MockTransport> {
    let mut keycard = Keycard::new(card.transport());
    keycard.select().unwrap();
    keycard.pair(common::PAIRING_PASSWORD).unwrap();
    keycard
}

#[test]
fn open_authenticate_and_verify_pin() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);

    keycard.open_secure_channel().unwrap();
    assert!(keycard.is_secure_channel_open());

    keycard.verify_pin(common::PIN).unwrap();

    let status = keycard.get_status().unwrap();
    assert_eq!(status.pin_retry_count, 3);
    assert_eq!(status.puk_retry_count, 5);
    assert!(!status.key_initialized);
}

#[test]
fn wrong_pin_reports_retries_and_keeps_channel() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);
    keycard.open_secure_channel().unwrap();

    let err = keycard.verify_pin("000000").unwrap_err();
    assert!(matches!(
        err,
        Error::VerifyPin(cairn_keycard::commands::VerifyPinError::Incorrect { retries: 2 })
    ));
    // An inner failure does not tear the channel down
    assert!(keycard.is_secure_channel_open());
}

#[test]
fn multi_command_iv_chain_stays_in_sync() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);
    keycard.open_secure_channel().unwrap();

    // Each exchange advances both IV mirrors; any drift would show up as
    // a MAC failure on one side.
    keycard.verify_pin(common::PIN).unwrap();
    for _ in 0..5 {
        keycard.get_status().unwrap();
    }

    let signature = keycard
        .sign(&[0x42; 32], &cairn_keycard::KeyPath::current(), None)
        .unwrap();
    assert_eq!(signature.r, [0xD7; 32]);
    assert_eq!(signature.s, [0xE8; 32]);
    assert_eq!(signature.recovery_id, Some(0));
}

#[test]
fn secure_commands_require_open_channel() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);

    assert!(matches!(
        keycard.get_status(),
        Err(Error::SecureChannelNotOpen)
    ));
    assert!(matches!(
        keycard.sign(&[0x42; 32], &cairn_keycard::KeyPath::current(), None),
        Err(Error::SecureChannelNotOpen)
    ));
}

#[test]
fn sign_validates_hash_length_without_transmitting() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);
    keycard.open_secure_channel().unwrap();
    keycard.verify_pin(common::PIN).unwrap();

    let sent_before = keycard.transport_mut().transmitted().len();
    let err = keycard
        .sign(&[0u8; 16], &cairn_keycard::KeyPath::current(), None)
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Sign(cairn_keycard::commands::SignError::DataTooShort)
    ));
    assert_eq!(keycard.transport_mut().transmitted().len(), sent_before);
}

#[test]
fn pinless_sign_bypasses_secure_channel() {
    let card = SimCard::new();
    let mut keycard = Keycard::new(card.transport());
    keycard.select().unwrap();

    // No pairing, no channel: PIN-less signing still goes through
    let signature = keycard.sign_pinless(&[0x42; 32]).unwrap();
    assert_eq!(signature.r, [0xE1; 32]);

    let transmitted = keycard.transport_mut().last_transmitted().unwrap();
    assert_eq!(&transmitted[..4], [0x80, 0xC0, 0x03, 0x00]);
    // Bare hash, no MAC prefix
    assert_eq!(transmitted[4], 32);
}

#[test]
fn secure_exchange_apdu_shape() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);
    keycard.open_secure_channel().unwrap();

    keycard.verify_pin(common::PIN).unwrap();

    let transmitted = keycard.transport_mut().last_transmitted().unwrap();
    let lc = transmitted[4] as usize;
    let body = &transmitted[5..];

    assert_eq!(body.len(), lc);
    // mac(16) ‖ cipher(16·n)
    assert!(lc >= 32);
    assert_eq!((lc - 16) % 16, 0);
}

#[test]
fn tampered_response_mac_closes_channel() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);
    keycard.open_secure_channel().unwrap();

    // Override the card with a garbage-but-well-formed secure response
    let mut garbage = vec![0u8; 48];
    garbage.extend([0x90, 0x00]);
    keycard.transport_mut().push_response(garbage);

    let err = keycard.get_status().unwrap_err();
    assert!(matches!(
        err,
        Error::SecureChannel(SecureChannelError::InvalidMac)
    ));
    assert!(!keycard.is_secure_channel_open());

    // The channel cannot be used again without a fresh open
    assert!(matches!(
        keycard.get_status(),
        Err(Error::SecureChannelNotOpen)
    ));
}

#[test]
fn raw_failure_status_closes_channel() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);
    keycard.open_secure_channel().unwrap();

    // Card aborts the secure session (e.g. after a reset): raw 6982
    keycard.transport_mut().push_response(vec![0x69, 0x82]);

    let err = keycard.get_status().unwrap_err();
    assert!(matches!(
        err,
        Error::GetStatus(cairn_keycard::commands::GetStatusError::Unknown { sw: 0x6982 })
    ));
    assert!(!keycard.is_secure_channel_open());
}

#[test]
fn open_without_authentication_then_authenticate() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);

    keycard.open_secure_channel_without_authentication().unwrap();
    assert!(keycard.is_secure_channel_open());

    keycard.mutually_authenticate().unwrap();
    keycard.verify_pin(common::PIN).unwrap();
}

#[test]
fn open_requires_pairing_info() {
    let card = SimCard::new();
    let mut keycard = Keycard::new(card.transport());
    keycard.select().unwrap();

    assert!(matches!(
        keycard.open_secure_channel(),
        Err(Error::PairingRequired)
    ));
}

#[test]
fn factory_reset_closes_channel_and_forgets_pairing() {
    let card = SimCard::new();
    let mut keycard = paired_keycard(&card);
    keycard.open_secure_channel().unwrap();

    keycard.factory_reset().unwrap();
    assert_eq!(card.factory_reset_count(), 1);
    assert!(!keycard.is_secure_channel_open());
    assert!(keycard.pairing_info().is_none());
}
