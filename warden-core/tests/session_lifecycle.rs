//! Refresh-session lifecycle through the public orchestrator API.

mod support;

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use warden_core::auth::{
    AuthError,
    infrastructure::repositories::{InMemorySessionStore, InMemoryUserStore},
};

use support::{AuthHarness, TEST_EMAIL, TEST_PASSWORD, TEST_USERNAME, fingerprint};

fn harness() -> AuthHarness {
    AuthHarness::new(
        Arc::new(InMemorySessionStore::new()),
        Arc::new(InMemoryUserStore::new()),
    )
}

#[tokio::test]
async fn rotation_chain_ends_in_mismatch_and_full_revocation() -> Result<()> {
    let h = harness();
    let cancel = CancellationToken::new();
    let user_id = h
        .auth
        .sign_up(TEST_USERNAME, TEST_PASSWORD, TEST_EMAIL, &cancel)
        .await?;

    let s1 = h
        .auth
        .sign_in(
            TEST_USERNAME,
            TEST_PASSWORD,
            fingerprint("A", "F1", "1.1.1.1"),
            &cancel,
        )
        .await?;

    // Only the user agent carries over.
    let s2 = h
        .auth
        .refresh(
            s1.refresh_token.as_str(),
            fingerprint("A", "F2", "2.2.2.2"),
            &cancel,
        )
        .await?;
    assert_eq!(h.sessions.count_by_user(user_id).await?, 1);

    let replay = h
        .auth
        .refresh(
            s1.refresh_token.as_str(),
            fingerprint("A", "F1", "1.1.1.1"),
            &cancel,
        )
        .await;
    assert!(matches!(replay, Err(AuthError::TokenNotFound)));

    let mismatch = h
        .auth
        .refresh(
            s2.refresh_token.as_str(),
            fingerprint("B", "F3", "3.3.3.3"),
            &cancel,
        )
        .await;
    assert!(matches!(mismatch, Err(AuthError::FingerprintMismatch)));
    assert_eq!(h.sessions.count_by_user(user_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn sixth_sign_in_leaves_a_single_session() -> Result<()> {
    let h = harness();
    let cancel = CancellationToken::new();
    let user_id = h
        .auth
        .sign_up(TEST_USERNAME, TEST_PASSWORD, TEST_EMAIL, &cancel)
        .await?;

    let mut pairs = Vec::new();
    for device in 0..6 {
        pairs.push(
            h.auth
                .sign_in(
                    TEST_USERNAME,
                    TEST_PASSWORD,
                    fingerprint("A", &format!("device-{device}"), "1.1.1.1"),
                    &cancel,
                )
                .await?,
        );
        let expected = if device < 5 { device + 1 } else { 1 };
        assert_eq!(h.sessions.count_by_user(user_id).await?, expected);
    }

    let newest = pairs.pop().expect("six sign-ins");
    let oldest = pairs.remove(0);
    assert!(matches!(
        h.auth
            .refresh(
                oldest.refresh_token.as_str(),
                fingerprint("A", "device-0", "1.1.1.1"),
                &cancel,
            )
            .await,
        Err(AuthError::TokenNotFound)
    ));
    h.auth
        .refresh(
            newest.refresh_token.as_str(),
            fingerprint("A", "device-5", "1.1.1.1"),
            &cancel,
        )
        .await?;

    Ok(())
}

#[tokio::test]
async fn logout_then_refresh_is_rejected() -> Result<()> {
    let h = harness();
    let cancel = CancellationToken::new();
    h.auth
        .sign_up(TEST_USERNAME, TEST_PASSWORD, TEST_EMAIL, &cancel)
        .await?;
    let pair = h
        .auth
        .sign_in(
            TEST_USERNAME,
            TEST_PASSWORD,
            fingerprint("A", "F1", "1.1.1.1"),
            &cancel,
        )
        .await?;

    h.auth.logout(pair.refresh_token.as_str(), &cancel).await?;
    let result = h
        .auth
        .refresh(
            pair.refresh_token.as_str(),
            fingerprint("A", "F1", "1.1.1.1"),
            &cancel,
        )
        .await;
    assert!(matches!(result, Err(AuthError::TokenNotFound)));

    Ok(())
}

#[tokio::test]
async fn refresh_token_is_not_an_access_token() -> Result<()> {
    let h = harness();
    let cancel = CancellationToken::new();
    h.auth
        .sign_up(TEST_USERNAME, TEST_PASSWORD, TEST_EMAIL, &cancel)
        .await?;
    let pair = h
        .auth
        .sign_in(
            TEST_USERNAME,
            TEST_PASSWORD,
            fingerprint("A", "F1", "1.1.1.1"),
            &cancel,
        )
        .await?;

    assert!(matches!(
        h.auth.verify_access_token(pair.refresh_token.as_str()),
        Err(AuthError::InvalidToken)
    ));
    Ok(())
}
