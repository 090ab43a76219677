//! Account storage.
//!
//! # Tables
//!
//! - `profiles` - One row per account, keyed by `account_id`
//! - `elevation_requests` - Zero or one admin request per account
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! Services talk to the store through the [`AccountStore`] trait so the
//! same workflow runs against [`PgAccountStore`] in production and
//! [`MemoryAccountStore`] in tests.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p tv-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use tourvisto_core::{
    AccountId, DesiredRole, ElevationRequest, Email, Profile, RequestStatus,
};

pub use memory::MemoryAccountStore;
pub use postgres::PgAccountStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation or a transition from the wrong state.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Everything a sign-in writes to a profile.
///
/// The store combines it with the existing row, if any, using
/// [`tourvisto_core::RoleResolution`].
#[derive(Debug, Clone)]
pub struct ProfileWrite {
    pub account_id: AccountId,
    pub email: Email,
    pub name: String,
    pub image_url: Option<String>,
    pub desired_role: DesiredRole,
}

/// Persistence boundary for profiles and elevation requests.
///
/// Every write that can race with another sign-in for the same account is a
/// single conditional statement; implementations never read then write.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Check the store is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;

    async fn get_profile(&self, account_id: &AccountId) -> Result<Option<Profile>, RepositoryError>;

    /// Insert the profile or merge into the existing row, returning the row
    /// as committed.
    async fn upsert_profile(&self, write: &ProfileWrite) -> Result<Profile, RepositoryError>;

    async fn get_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ElevationRequest>, RepositoryError>;

    /// Create a pending request unless one already exists.
    ///
    /// Returns `None` when a row was already present.
    async fn insert_elevation_request_if_absent(
        &self,
        account_id: &AccountId,
        email: &Email,
        name: &str,
    ) -> Result<Option<ElevationRequest>, RepositoryError>;

    /// Move a pending request to approved and promote the profile to admin,
    /// atomically.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no request, `Conflict` if it is already decided.
    async fn approve_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError>;

    /// Move a pending request to rejected, atomically updating the profile hint.
    ///
    /// # Errors
    ///
    /// `NotFound` if there is no request, `Conflict` if it is already decided.
    async fn reject_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError>;

    /// Requests ordered oldest first, optionally filtered by status.
    async fn list_elevation_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ElevationRequest>, RepositoryError>;

    /// A page of profiles ordered by join date, and the total row count.
    async fn list_profiles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Profile>, i64), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
