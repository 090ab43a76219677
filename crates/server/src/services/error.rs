//! Service error types.

use thiserror::Error;

use tourvisto_core::{AccountId, RequestStatus};

use crate::db::RepositoryError;
use crate::identity::ProviderError;

/// Errors that can interrupt the sign-in workflow.
#[derive(Debug, Error)]
pub enum SignInError {
    /// The identity provider could not be consulted.
    #[error("authentication unavailable: {0}")]
    AuthUnavailable(#[from] ProviderError),

    /// A profile or elevation request write failed.
    #[error("store write failed: {0}")]
    StoreWriteFailed(#[from] RepositoryError),
}

/// Errors from the approver's approve/reject transitions.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The account never asked for elevation.
    #[error("no elevation request for account {0}")]
    NoRequest(AccountId),

    /// The request was already approved or rejected.
    #[error("elevation request for account {account_id} is already {status}")]
    AlreadyDecided {
        account_id: AccountId,
        status: RequestStatus,
    },

    #[error("store error: {0}")]
    Store(#[from] RepositoryError),
}
