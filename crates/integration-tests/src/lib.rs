//! In-process test harness for Tourvisto.
//!
//! Drives the real router and services against an in-memory account store
//! and a scripted identity provider, so no database or provider is needed.
//!
//! # Usage
//!
//! ```rust,ignore
//! let app = TestApp::new();
//! app.identity.register("tok-alice", principal("alice", "alice@example.com", Some("Alice")));
//! let response = app.get("/auth/callback?intent=admin", Some("tok-alice"), None).await;
//! ```

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, StatusCode, header},
};
use parking_lot::Mutex;
use secrecy::SecretString;
use tokio::sync::Barrier;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use tourvisto_core::{
    AccountId, ElevationRequest, Email, Principal, Profile, RequestStatus,
};
use tourvisto_server::config::{IdentityConfig, ServerConfig};
use tourvisto_server::db::{AccountStore, MemoryAccountStore, ProfileWrite, RepositoryError};
use tourvisto_server::identity::{AccessToken, IdentityProvider, ProviderError};
use tourvisto_server::middleware::SESSION_COOKIE_NAME;
use tourvisto_server::state::AppState;

/// Cookie the scripted provider's token travels in.
pub const TOKEN_COOKIE: &str = "sb-access-token";

/// Build a principal with a fixed-format account id.
pub fn principal(id: &str, email: &str, name: Option<&str>) -> Principal {
    Principal {
        id: AccountId::parse(id).unwrap(),
        email: Email::parse(email).unwrap(),
        name: name.map(String::from),
        avatar_url: None,
    }
}

pub fn token(raw: &str) -> AccessToken {
    AccessToken::new(raw).unwrap()
}

/// Configuration pointing at nothing real.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        database_url: SecretString::from("postgres://localhost/tourvisto_test"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_owned(),
        identity: IdentityConfig {
            url: Url::parse("https://id.test").unwrap(),
            anon_key: SecretString::from("test-anon-key"),
            oauth_provider: "google".to_owned(),
            token_cookie: TOKEN_COOKIE.to_owned(),
            timeout: Duration::from_secs(1),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

// =============================================================================
// Identity provider
// =============================================================================

/// Identity provider answering from a fixed token table.
#[derive(Default)]
pub struct StaticIdentityProvider {
    principals: Mutex<HashMap<String, Principal>>,
    unavailable: AtomicBool,
    sign_outs: AtomicUsize,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, token: &str, principal: Principal) {
        self.principals.lock().insert(token.to_owned(), principal);
    }

    /// Make every lookup fail as if the provider were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(ProviderError::Unreachable("connection refused".to_owned()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn get_principal(&self, token: &AccessToken) -> Result<Option<Principal>, ProviderError> {
        self.check_available()?;
        Ok(self.principals.lock().get(token.expose()).cloned())
    }

    async fn sign_out(&self, _token: &AccessToken) -> Result<(), ProviderError> {
        self.check_available()?;
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn authorize_url(&self, redirect_to: &str) -> Result<String, ProviderError> {
        let mut url = Url::parse("https://id.test/auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", "google")
            .append_pair("redirect_to", redirect_to);
        Ok(url.into())
    }
}

// =============================================================================
// Account store
// =============================================================================

/// In-memory store whose writes can be switched to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryAccountStore,
    fail_profile_writes: AtomicBool,
    fail_request_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &MemoryAccountStore {
        &self.inner
    }

    pub fn fail_profile_writes(&self, fail: bool) {
        self.fail_profile_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_request_writes(&self, fail: bool) {
        self.fail_request_writes.store(fail, Ordering::SeqCst);
    }

    /// Make pings and reads fail too.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            Err(RepositoryError::Unavailable("injected failure".to_owned()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AccountStore for FlakyStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.ping().await
    }

    async fn get_profile(&self, account_id: &AccountId) -> Result<Option<Profile>, RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.get_profile(account_id).await
    }

    async fn upsert_profile(&self, write: &ProfileWrite) -> Result<Profile, RepositoryError> {
        Self::check(&self.fail_profile_writes)?;
        self.inner.upsert_profile(write).await
    }

    async fn get_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ElevationRequest>, RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.get_elevation_request(account_id).await
    }

    async fn insert_elevation_request_if_absent(
        &self,
        account_id: &AccountId,
        email: &Email,
        name: &str,
    ) -> Result<Option<ElevationRequest>, RepositoryError> {
        Self::check(&self.fail_request_writes)?;
        self.inner
            .insert_elevation_request_if_absent(account_id, email, name)
            .await
    }

    async fn approve_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError> {
        Self::check(&self.fail_request_writes)?;
        self.inner.approve_elevation_request(account_id).await
    }

    async fn reject_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError> {
        Self::check(&self.fail_request_writes)?;
        self.inner.reject_elevation_request(account_id).await
    }

    async fn list_elevation_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ElevationRequest>, RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.list_elevation_requests(status).await
    }

    async fn list_profiles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Profile>, i64), RepositoryError> {
        Self::check(&self.fail_reads)?;
        self.inner.list_profiles(limit, offset).await
    }
}

/// Store that holds concurrent sign-ins at a barrier before each write.
///
/// Profile upserts and request inserts only reach the inner store once
/// `parties` callers are waiting, so every caller's write overlaps the
/// others. Records the highest number of writes seen in flight at once.
pub struct ContendedStore {
    inner: FlakyStore,
    upsert_gate: Barrier,
    insert_gate: Barrier,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ContendedStore {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: FlakyStore::new(),
            upsert_gate: Barrier::new(parties),
            insert_gate: Barrier::new(parties),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &MemoryAccountStore {
        self.inner.inner()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, gate: &Barrier) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        gate.wait().await;
        tokio::task::yield_now().await;
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountStore for ContendedStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.ping().await
    }

    async fn get_profile(&self, account_id: &AccountId) -> Result<Option<Profile>, RepositoryError> {
        self.inner.get_profile(account_id).await
    }

    async fn upsert_profile(&self, write: &ProfileWrite) -> Result<Profile, RepositoryError> {
        self.enter(&self.upsert_gate).await;
        let result = self.inner.upsert_profile(write).await;
        self.leave();
        result
    }

    async fn get_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ElevationRequest>, RepositoryError> {
        self.inner.get_elevation_request(account_id).await
    }

    async fn insert_elevation_request_if_absent(
        &self,
        account_id: &AccountId,
        email: &Email,
        name: &str,
    ) -> Result<Option<ElevationRequest>, RepositoryError> {
        self.enter(&self.insert_gate).await;
        let result = self
            .inner
            .insert_elevation_request_if_absent(account_id, email, name)
            .await;
        self.leave();
        result
    }

    async fn approve_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError> {
        self.inner.approve_elevation_request(account_id).await
    }

    async fn reject_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError> {
        self.inner.reject_elevation_request(account_id).await
    }

    async fn list_elevation_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ElevationRequest>, RepositoryError> {
        self.inner.list_elevation_requests(status).await
    }

    async fn list_profiles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Profile>, i64), RepositoryError> {
        self.inner.list_profiles(limit, offset).await
    }
}

// =============================================================================
// Application
// =============================================================================

/// The full router wired to in-memory collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<FlakyStore>,
    pub identity: Arc<StaticIdentityProvider>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(FlakyStore::new());
        let identity = Arc::new(StaticIdentityProvider::new());
        let state = AppState::new(test_config(), store.clone(), identity.clone());
        let router = tourvisto_server::build_router(state, MemoryStore::default());
        Self {
            router,
            store,
            identity,
        }
    }

    /// Send a request, optionally carrying a provider token cookie and a
    /// session cookie.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        session: Option<&str>,
    ) -> Response<Body> {
        let cookies: Vec<String> = token
            .map(|t| format!("{TOKEN_COOKIE}={t}"))
            .into_iter()
            .chain(session.map(|s| format!("{SESSION_COOKIE_NAME}={s}")))
            .collect();

        let mut request = Request::builder().method(method).uri(uri);
        if !cookies.is_empty() {
            request = request.header(header::COOKIE, cookies.join("; "));
        }

        self.router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    pub async fn get(&self, uri: &str, token: Option<&str>, session: Option<&str>) -> Response<Body> {
        self.send("GET", uri, token, session).await
    }

    /// Run the callback for `token` and return the session id it issued.
    pub async fn sign_in(&self, token: &str, intent: &str) -> (Response<Body>, Option<String>) {
        let response = self
            .get(&format!("/auth/callback?intent={intent}"), Some(token), None)
            .await;
        let session = session_cookie(&response);
        (response, session)
    }
}

/// The `Location` header of a redirect.
pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

/// Assert `response` is a redirect to `target`.
pub fn assert_redirect(response: &Response<Body>, target: &str) {
    assert!(
        response.status().is_redirection(),
        "expected redirect to {target}, got {}",
        response.status()
    );
    assert_eq!(location(response), Some(target));
}

/// Session id set by `response`, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE_NAME && !value.is_empty())
        .map(|(_, value)| value.to_owned())
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
