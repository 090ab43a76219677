//! Failure handling in the sign-in workflow.

#![allow(clippy::unwrap_used)]

use tourvisto_core::{Decision, Intent, RequestStatus, Route};
use tourvisto_integration_tests::{FlakyStore, StaticIdentityProvider, principal, token};
use tourvisto_server::db::AccountStore;
use tourvisto_server::services::SignInFlow;

fn provider() -> StaticIdentityProvider {
    let provider = StaticIdentityProvider::new();
    provider.register("tok", principal("acct", "acct@example.com", None));
    provider
}

#[tokio::test]
async fn missing_token_goes_to_sign_in() {
    let provider = provider();
    let store = FlakyStore::new();

    let outcome = SignInFlow::new(&provider, &store).run(None, Intent::User).await;

    assert_eq!(outcome.decision, Decision::Redirect(Route::SignIn));
    assert!(outcome.profile.is_none());
    assert!(!outcome.failed);
}

#[tokio::test]
async fn unknown_token_goes_to_sign_in() {
    let provider = provider();
    let store = FlakyStore::new();

    let outcome = SignInFlow::new(&provider, &store)
        .run(Some(&token("stale")), Intent::Admin)
        .await;

    assert_eq!(outcome.decision, Decision::Redirect(Route::SignIn));
    assert!(!outcome.failed);
    assert_eq!(store.inner().profile_count(), 0);
}

#[tokio::test]
async fn unreachable_provider_goes_to_sign_in() {
    let provider = provider();
    provider.set_unavailable(true);
    let store = FlakyStore::new();

    let outcome = SignInFlow::new(&provider, &store)
        .run(Some(&token("tok")), Intent::User)
        .await;

    assert_eq!(outcome.decision, Decision::Redirect(Route::SignIn));
    assert!(outcome.failed);
    assert_eq!(store.inner().profile_count(), 0);
}

#[tokio::test]
async fn profile_write_failure_goes_to_sign_in() {
    let provider = provider();
    let store = FlakyStore::new();
    store.fail_profile_writes(true);

    let outcome = SignInFlow::new(&provider, &store)
        .run(Some(&token("tok")), Intent::Admin)
        .await;

    assert_eq!(outcome.decision, Decision::Redirect(Route::SignIn));
    assert!(outcome.failed);
    assert!(outcome.profile.is_none());
    assert_eq!(store.inner().request_count(), 0);
}

#[tokio::test]
async fn request_write_failure_falls_back_to_home() {
    let provider = provider();
    let store = FlakyStore::new();
    store.fail_request_writes(true);

    let outcome = SignInFlow::new(&provider, &store)
        .run(Some(&token("tok")), Intent::Admin)
        .await;

    assert_eq!(outcome.decision, Decision::Redirect(Route::Home));
    assert!(!outcome.failed);
    assert!(outcome.request_status.is_none());

    // The profile write stands.
    let profile = outcome.profile.unwrap();
    let stored = store.get_profile(&profile.account_id).await.unwrap().unwrap();
    assert_eq!(stored.request_status, RequestStatus::Pending);
    assert_eq!(store.inner().request_count(), 0);
}

#[tokio::test]
async fn replay_after_request_failure_creates_the_request() {
    let provider = provider();
    let store = FlakyStore::new();
    let flow = SignInFlow::new(&provider, &store);

    store.fail_request_writes(true);
    flow.run(Some(&token("tok")), Intent::Admin).await;

    store.fail_request_writes(false);
    let outcome = flow.run(Some(&token("tok")), Intent::Admin).await;

    assert_eq!(outcome.decision, Decision::PendingApproval);
    assert_eq!(store.inner().profile_count(), 1);
    assert_eq!(store.inner().request_count(), 1);
}
