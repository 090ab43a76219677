//! Elevation request commands.
//!
//! The approver's side of the admin elevation flow: list requests and move a
//! pending one to approved or rejected.

use thiserror::Error;

use tourvisto_core::{AccountId, AccountIdError, ElevationRequest, RequestStatus};
use tourvisto_server::db::{PgAccountStore, RepositoryError};
use tourvisto_server::services::{ApprovalError, ElevationRequestManager};

use super::{ConnectError, connect};

#[derive(Debug, Error)]
pub enum RequestsError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid account id: {0}")]
    InvalidAccount(#[from] AccountIdError),

    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

fn log_request(request: &ElevationRequest) {
    tracing::info!(
        account_id = %request.account_id,
        email = %request.email,
        name = %request.name,
        status = %request.req_status,
        created_at = %request.created_at.format("%Y-%m-%d %H:%M"),
        "elevation request"
    );
}

/// List elevation requests, optionally filtered by status.
pub async fn list(status: Option<RequestStatus>) -> Result<(), RequestsError> {
    let store = PgAccountStore::new(connect().await?);
    let requests = ElevationRequestManager::new(&store).list(status).await?;

    if requests.is_empty() {
        tracing::info!("No elevation requests found");
    }
    for request in &requests {
        log_request(request);
    }
    Ok(())
}

/// Approve the account's pending request.
pub async fn approve(account: &str) -> Result<(), RequestsError> {
    let account_id = AccountId::parse(account)?;
    let store = PgAccountStore::new(connect().await?);

    let request = ElevationRequestManager::new(&store)
        .approve(&account_id)
        .await?;

    tracing::info!("Approved: {} ({}) is now an admin", request.name, request.email);
    Ok(())
}

/// Reject the account's pending request.
pub async fn reject(account: &str) -> Result<(), RequestsError> {
    let account_id = AccountId::parse(account)?;
    let store = PgAccountStore::new(connect().await?);

    let request = ElevationRequestManager::new(&store)
        .reject(&account_id)
        .await?;

    tracing::info!("Rejected admin request from {} ({})", request.name, request.email);
    Ok(())
}
