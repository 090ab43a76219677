//! Requests against the full router.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use tourvisto_core::AccountId;
use tourvisto_integration_tests::{
    TestApp, assert_redirect, body_json, body_text, location, principal,
};
use tourvisto_server::services::ElevationRequestManager;

const RETRY: &str = "/sign-in?error=sign_in_failed";

fn app_with_alice() -> TestApp {
    let app = TestApp::new();
    app.identity
        .register("tok-alice", principal("alice", "alice@example.com", Some("Alice")));
    app
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::new();
    let response = app.get("/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn readiness_reports_store_outage() {
    let app = TestApp::new();
    assert_eq!(
        app.get("/health/ready", None, None).await.status(),
        StatusCode::OK
    );

    app.store.fail_reads(true);
    assert_eq!(
        app.get("/health/ready", None, None).await.status(),
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn responses_carry_security_headers() {
    let app = TestApp::new();
    let response = app.get("/health", None, None).await;
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    assert_eq!(response.headers()["x-frame-options"], "DENY");
    assert!(response.headers().contains_key("x-request-id"));
}

// =============================================================================
// Sign-in page and root
// =============================================================================

#[tokio::test]
async fn sign_in_page_links_to_both_intents() {
    let app = TestApp::new();
    let response = app.get("/sign-in", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("intent%3Duser"));
    assert!(html.contains("intent%3Dadmin"));
    assert!(!html.contains("role=\"alert\""));
}

#[tokio::test]
async fn sign_in_page_shows_generic_error() {
    let app = app_with_alice();
    let response = app
        .get("/sign-in?error=provider_exploded", Some("tok-alice"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains("try again"));
    assert!(!html.contains("provider_exploded"));
}

#[tokio::test]
async fn sign_in_page_sends_known_principal_back_to_root() {
    let app = app_with_alice();
    let response = app.get("/sign-in", Some("tok-alice"), None).await;
    assert_redirect(&response, "/");
}

#[tokio::test]
async fn root_routes_by_session_and_token() {
    let app = app_with_alice();
    assert_redirect(&app.get("/", None, None).await, "/sign-in");
    assert_redirect(&app.get("/", Some("tok-alice"), None).await, "/auth/callback");

    let (_, session) = app.sign_in("tok-alice", "user").await;
    assert_redirect(&app.get("/", None, session.as_deref()).await, "/home");
}

// =============================================================================
// Callback
// =============================================================================

#[tokio::test]
async fn user_callback_redirects_home_and_starts_session() {
    let app = app_with_alice();
    let (response, session) = app.sign_in("tok-alice", "user").await;
    assert_redirect(&response, "/home");
    let session = session.unwrap();

    let response = app.get("/home", None, Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Welcome, Alice"));

    let me = body_json(app.get("/api/me", None, Some(&session)).await).await;
    assert_eq!(me["profile"]["status"], "user");
    assert_eq!(me["profile"]["request_status"], "approved");
    assert!(me["elevation"].is_null());
}

#[tokio::test]
async fn admin_callback_renders_pending_page() {
    let app = app_with_alice();
    let (response, session) = app.sign_in("tok-alice", "admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(location(&response).is_none());

    let html = body_text(response).await;
    assert!(html.contains("alice@example.com"));
    assert!(html.contains("waiting for approval"));

    // Still signed in as a regular user.
    let session = session.unwrap();
    assert_redirect(&app.get("/dashboard", None, Some(&session)).await, "/home");
    let me = body_json(app.get("/api/me", None, Some(&session)).await).await;
    assert_eq!(me["elevation"], "pending");
}

#[tokio::test]
async fn role_parameter_is_accepted_as_intent() {
    let app = app_with_alice();
    let response = app
        .get("/auth/callback?role=admin", Some("tok-alice"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn intent_must_match_exactly() {
    let app = app_with_alice();
    let response = app
        .get("/auth/callback?intent=ADMIN", Some("tok-alice"), None)
        .await;
    assert_redirect(&response, "/home");
    assert_eq!(app.store.inner().request_count(), 0);
}

#[tokio::test]
async fn garbled_intent_is_treated_as_none() {
    let app = app_with_alice();
    let response = app
        .get("/auth/callback?intent=superuser", Some("tok-alice"), None)
        .await;
    assert_redirect(&response, "/home");
    assert_eq!(app.store.inner().request_count(), 0);
}

#[tokio::test]
async fn approved_admin_lands_on_dashboard() {
    let app = app_with_alice();
    app.sign_in("tok-alice", "admin").await;
    ElevationRequestManager::new(app.store.as_ref())
        .approve(&AccountId::parse("alice").unwrap())
        .await
        .unwrap();

    let (response, session) = app.sign_in("tok-alice", "user").await;
    assert_redirect(&response, "/dashboard");

    let response = app.get("/dashboard", None, session.as_deref()).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("No pending requests."));
}

#[tokio::test]
async fn approval_after_sign_in_reaches_dashboard_without_signing_in_again() {
    let app = app_with_alice();
    let (response, session) = app.sign_in("tok-alice", "admin").await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = session.unwrap();
    assert_redirect(&app.get("/", None, Some(&session)).await, "/home");

    ElevationRequestManager::new(app.store.as_ref())
        .approve(&AccountId::parse("alice").unwrap())
        .await
        .unwrap();

    assert_redirect(&app.get("/", None, Some(&session)).await, "/dashboard");
    let response = app.get("/dashboard", None, Some(&session)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // The refreshed status was written back to the session.
    app.store.fail_reads(true);
    assert_redirect(&app.get("/", None, Some(&session)).await, "/dashboard");
}

#[tokio::test]
async fn store_outage_keeps_the_session_snapshot() {
    let app = app_with_alice();
    let (_, session) = app.sign_in("tok-alice", "user").await;
    let session = session.unwrap();

    app.store.fail_reads(true);
    assert_redirect(&app.get("/", None, Some(&session)).await, "/home");
    assert_redirect(&app.get("/dashboard", None, Some(&session)).await, "/home");
}

#[tokio::test]
async fn callback_without_token_goes_to_sign_in() {
    let app = app_with_alice();
    let response = app.get("/auth/callback?intent=user", None, None).await;
    assert_redirect(&response, "/sign-in");
}

#[tokio::test]
async fn provider_error_goes_to_sign_in_with_message() {
    let app = app_with_alice();
    let response = app
        .get("/auth/callback?error=access_denied", Some("tok-alice"), None)
        .await;
    assert_redirect(&response, RETRY);
    assert_eq!(app.store.inner().profile_count(), 0);
}

#[tokio::test]
async fn provider_outage_goes_to_sign_in_with_message() {
    let app = app_with_alice();
    app.identity.set_unavailable(true);
    let (response, session) = app.sign_in("tok-alice", "user").await;
    assert_redirect(&response, RETRY);
    assert!(session.is_none());
}

#[tokio::test]
async fn profile_write_failure_stores_nothing() {
    let app = app_with_alice();
    app.store.fail_profile_writes(true);
    let (response, session) = app.sign_in("tok-alice", "admin").await;
    assert_redirect(&response, RETRY);
    assert!(session.is_none());
}

#[tokio::test]
async fn request_write_failure_still_signs_in() {
    let app = app_with_alice();
    app.store.fail_request_writes(true);
    let (response, session) = app.sign_in("tok-alice", "admin").await;
    assert_redirect(&response, "/home");
    assert!(session.is_some());
}

// =============================================================================
// Guards and sign-out
// =============================================================================

#[tokio::test]
async fn guarded_pages_require_a_session() {
    let app = TestApp::new();
    assert_redirect(&app.get("/home", None, None).await, "/sign-in");
    assert_redirect(&app.get("/dashboard", None, None).await, "/sign-in");
    assert_eq!(
        app.get("/api/me", None, None).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[tokio::test]
async fn sign_out_ends_both_sessions() {
    let app = app_with_alice();
    let (_, session) = app.sign_in("tok-alice", "user").await;
    let session = session.unwrap();

    let response = app
        .send("POST", "/auth/sign-out", Some("tok-alice"), Some(&session))
        .await;
    assert_redirect(&response, "/sign-in");
    assert_eq!(app.identity.sign_out_count(), 1);

    let expired = response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with("sb-access-token=;") && v.contains("Max-Age=0"));
    assert!(expired);

    assert_redirect(&app.get("/home", None, Some(&session)).await, "/sign-in");
}

#[tokio::test]
async fn sign_out_survives_provider_outage() {
    let app = app_with_alice();
    let (_, session) = app.sign_in("tok-alice", "user").await;
    app.identity.set_unavailable(true);

    let response = app
        .send("POST", "/auth/sign-out", Some("tok-alice"), session.as_deref())
        .await;
    assert_redirect(&response, "/sign-in");
    assert_eq!(app.identity.sign_out_count(), 0);
}
