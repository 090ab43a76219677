//! Admin elevation requests.
//!
//! A request moves `pending -> approved` or `pending -> rejected` exactly
//! once. Sign-in only ever creates pending requests; decisions come from the
//! approver through [`ElevationRequestManager::approve`] and
//! [`ElevationRequestManager::reject`].

use tracing::{info, instrument, warn};

use tourvisto_core::{AccountId, ElevationRequest, Profile, RequestStatus};

use super::{ApprovalError, SignInError};
use crate::db::{AccountStore, RepositoryError};

pub struct ElevationRequestManager<'a> {
    store: &'a dyn AccountStore,
}

impl<'a> ElevationRequestManager<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn AccountStore) -> Self {
        Self { store }
    }

    /// Make sure the account has an elevation request and return its status.
    ///
    /// Creates a pending request the first time; afterwards the stored status
    /// is returned untouched, so approved and rejected outcomes stick.
    ///
    /// # Errors
    ///
    /// Returns `SignInError::StoreWriteFailed` if the store fails.
    #[instrument(skip_all, fields(account_id = %account_id))]
    pub async fn ensure_request(
        &self,
        account_id: &AccountId,
        profile: &Profile,
    ) -> Result<RequestStatus, SignInError> {
        if let Some(created) = self
            .store
            .insert_elevation_request_if_absent(account_id, &profile.email, &profile.name)
            .await?
        {
            info!(request_id = %created.id, "Elevation request created");
            return Ok(created.req_status);
        }

        // Lost the insert to an existing row; its status is the answer.
        let existing = self
            .store
            .get_elevation_request(account_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(existing.req_status)
    }

    /// Approve a pending request and promote the account to admin.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::NoRequest` or `ApprovalError::AlreadyDecided`
    /// when the transition is not allowed.
    #[instrument(skip(self))]
    pub async fn approve(&self, account_id: &AccountId) -> Result<ElevationRequest, ApprovalError> {
        let result = self.store.approve_elevation_request(account_id).await;
        let request = self.map_transition(account_id, result).await?;
        info!(request_id = %request.id, "Elevation request approved");
        Ok(request)
    }

    /// Reject a pending request.
    ///
    /// # Errors
    ///
    /// Returns `ApprovalError::NoRequest` or `ApprovalError::AlreadyDecided`
    /// when the transition is not allowed.
    #[instrument(skip(self))]
    pub async fn reject(&self, account_id: &AccountId) -> Result<ElevationRequest, ApprovalError> {
        let result = self.store.reject_elevation_request(account_id).await;
        let request = self.map_transition(account_id, result).await?;
        info!(request_id = %request.id, "Elevation request rejected");
        Ok(request)
    }

    /// List requests, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the store fails.
    pub async fn list(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ElevationRequest>, RepositoryError> {
        self.store.list_elevation_requests(status).await
    }

    async fn map_transition(
        &self,
        account_id: &AccountId,
        result: Result<ElevationRequest, RepositoryError>,
    ) -> Result<ElevationRequest, ApprovalError> {
        match result {
            Ok(request) => Ok(request),
            Err(RepositoryError::NotFound) => Err(ApprovalError::NoRequest(account_id.clone())),
            Err(RepositoryError::Conflict(reason)) => {
                warn!(%reason, "Elevation transition refused");
                let status = self
                    .store
                    .get_elevation_request(account_id)
                    .await?
                    .map_or(RequestStatus::Pending, |r| r.req_status);
                Err(ApprovalError::AlreadyDecided {
                    account_id: account_id.clone(),
                    status,
                })
            }
            Err(other) => Err(other.into()),
        }
    }
}
