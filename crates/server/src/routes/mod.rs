//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                - Redirect to /home or /sign-in
//! GET  /health          - Liveness
//! GET  /health/ready    - Store readiness
//!
//! # Auth
//! GET  /sign-in         - Sign-in page with provider links
//! GET  /auth/callback   - OAuth callback (?intent=user|admin)
//! POST /auth/sign-out   - Sign out
//!
//! # Pages (require a session profile)
//! GET  /home            - Landing page
//! GET  /dashboard       - Admin dashboard (admins only)
//!
//! # API
//! GET  /api/me          - Current profile as JSON
//! ```

pub mod api;
pub mod auth;
pub mod health;
pub mod pages;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/callback", get(auth::callback))
        .route("/sign-out", post(auth::sign_out))
}

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new().route("/me", get(api::me))
}

/// Create the full application router (without session or tracing layers).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .route("/sign-in", get(auth::sign_in_page))
        .route("/home", get(pages::home))
        .route("/dashboard", get(pages::dashboard))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
}
