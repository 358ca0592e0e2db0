//! Integration tests for the credential handshake over the GATT server.

use febina::app::events::SessionEvent;
use febina::auth::{handle_auth, sha256_hex};
use febina::config::DeviceConfig;
use febina::gatt::codec::ZERO_SENTINEL;
use febina::gatt::uuids;
use futures_lite::future;

use crate::mock_ble::{self, PASSWORD, PEER, RecordingSink, USERNAME, until};

#[test]
fn valid_credentials_and_ok_complete_handshake() {
    let config = DeviceConfig::default();
    let server = mock_ble::server(&config);
    let store = mock_ble::credentials();
    let events = RecordingSink::new();
    server.on_connect(PEER);

    let (auth, token) = future::block_on(future::zip(
        handle_auth(&server, &store, &events),
        mock_ble::log_in(&server),
    ));

    assert_eq!(auth.token.as_str(), token);
    assert_eq!(auth.username_hash, sha256_hex(USERNAME.as_bytes()));
    assert_eq!(auth.password_hash, sha256_hex(PASSWORD.as_bytes()));
    assert_eq!(token.len(), 64);
    assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));

    // One-shot: zeroed and unreadable afterwards.
    for ch in server.auth.all() {
        assert_eq!(ch.value(), ZERO_SENTINEL);
    }
    assert!(server.on_read(uuids::AUTH_TOKEN).is_err());
    assert!(server.on_read(uuids::AUTH_RESPONSE).is_err());
}

#[test]
fn wrong_password_never_issues_a_token() {
    let config = DeviceConfig::default();
    let server = mock_ble::server(&config);
    let store = mock_ble::credentials();
    let events = RecordingSink::new();
    server.on_connect(PEER);

    let outcome = future::block_on(future::or(
        async {
            handle_auth(&server, &store, &events).await;
            "completed"
        },
        async {
            server.on_write(uuids::AUTH_USERNAME, USERNAME.as_bytes()).unwrap();
            server.on_write(uuids::AUTH_PASSWORD, b"wrong").unwrap();
            until(|| {
                events.count(|e| matches!(e, SessionEvent::CredentialsRejected)) == 1
            })
            .await;
            mock_ble::settle().await;
            "rejected"
        },
    ));

    assert_eq!(outcome, "rejected");
    assert!(server.backend().issued_token().is_none());
    // All four characteristics were cleared with a notification each.
    for uuid in [
        uuids::AUTH_USERNAME,
        uuids::AUTH_PASSWORD,
        uuids::AUTH_TOKEN,
        uuids::AUTH_RESPONSE,
    ] {
        assert_eq!(server.backend().notified(uuid), vec![ZERO_SENTINEL.to_vec()]);
    }
}

#[test]
fn retry_after_rejection_succeeds() {
    let config = DeviceConfig::default();
    let server = mock_ble::server(&config);
    let store = mock_ble::credentials();
    let events = RecordingSink::new();
    server.on_connect(PEER);

    let (auth, token) = future::block_on(future::zip(
        handle_auth(&server, &store, &events),
        async {
            server.on_write(uuids::AUTH_USERNAME, b"intruder").unwrap();
            server.on_write(uuids::AUTH_PASSWORD, PASSWORD.as_bytes()).unwrap();
            until(|| {
                events.count(|e| matches!(e, SessionEvent::CredentialsRejected)) == 1
            })
            .await;
            mock_ble::log_in(&server).await
        },
    ));

    assert_eq!(auth.token.as_str(), token);
    assert_eq!(
        events.count(|e| matches!(e, SessionEvent::TokenIssued { .. })),
        1
    );
}

#[test]
fn non_ok_acknowledgement_discards_token_and_restarts() {
    let config = DeviceConfig::default();
    let server = mock_ble::server(&config);
    let store = mock_ble::credentials();
    let events = RecordingSink::new();
    server.on_connect(PEER);

    let (auth, (first, second)) = future::block_on(future::zip(
        handle_auth(&server, &store, &events),
        async {
            server.on_write(uuids::AUTH_USERNAME, USERNAME.as_bytes()).unwrap();
            server.on_write(uuids::AUTH_PASSWORD, PASSWORD.as_bytes()).unwrap();
            until(|| server.backend().issued_token().is_some()).await;
            let first = server.backend().issued_token().unwrap();

            server.on_write(uuids::AUTH_RESPONSE, b"ok").unwrap();
            until(|| {
                events.count(|e| matches!(e, SessionEvent::AcknowledgementRejected)) == 1
            })
            .await;
            assert_eq!(server.auth.token.value(), ZERO_SENTINEL);
            assert!(server.auth.token.is_readable());

            let second = mock_ble::log_in(&server).await;
            (first, second)
        },
    ));

    assert_ne!(first, second, "a fresh token per validation");
    assert_eq!(auth.token.as_str(), second);
}

#[test]
fn username_and_password_may_arrive_in_any_order() {
    let config = DeviceConfig::default();
    let server = mock_ble::server(&config);
    let store = mock_ble::credentials();
    let events = RecordingSink::new();
    server.on_connect(PEER);

    let (auth, ()) = future::block_on(future::zip(
        handle_auth(&server, &store, &events),
        async {
            server.on_write(uuids::AUTH_PASSWORD, PASSWORD.as_bytes()).unwrap();
            mock_ble::settle().await;
            server.on_write(uuids::AUTH_USERNAME, USERNAME.as_bytes()).unwrap();
            until(|| server.backend().issued_token().is_some()).await;
            server.on_write(uuids::AUTH_RESPONSE, b"OK").unwrap();
        },
    ));

    assert_eq!(Some(auth.token.as_str().to_string()), server.backend().issued_token());
}

#[test]
fn corrected_username_is_the_one_validated() {
    let config = DeviceConfig::default();
    let server = mock_ble::server(&config);
    let store = mock_ble::credentials();
    let events = RecordingSink::new();
    server.on_connect(PEER);

    let (auth, ()) = future::block_on(future::zip(
        handle_auth(&server, &store, &events),
        async {
            server.on_write(uuids::AUTH_USERNAME, b"typo").unwrap();
            server.on_write(uuids::AUTH_USERNAME, USERNAME.as_bytes()).unwrap();
            server.on_write(uuids::AUTH_PASSWORD, PASSWORD.as_bytes()).unwrap();
            until(|| server.backend().issued_token().is_some()).await;
            server.on_write(uuids::AUTH_RESPONSE, b"OK").unwrap();
        },
    ));

    assert_eq!(auth.username_hash, sha256_hex(USERNAME.as_bytes()));
    assert_eq!(
        events.count(|e| matches!(e, SessionEvent::CredentialsRejected)),
        0
    );
}
