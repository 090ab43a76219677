//! Profile inspection commands.

use thiserror::Error;

use tourvisto_server::db::{AccountStore, PgAccountStore, RepositoryError};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum ProfilesError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Print one page of profiles.
pub async fn list(limit: i64, offset: i64) -> Result<(), ProfilesError> {
    let store = PgAccountStore::new(connect().await?);
    let (profiles, total) = store.list_profiles(limit.max(0), offset.max(0)).await?;

    for profile in &profiles {
        tracing::info!(
            account_id = %profile.account_id,
            email = %profile.email,
            name = %profile.name,
            status = %profile.status,
            request_status = %profile.request_status,
            joined_at = %profile.joined_at.format("%Y-%m-%d"),
            "profile"
        );
    }
    tracing::info!("Showing {} of {} profiles", profiles.len(), total);
    Ok(())
}
