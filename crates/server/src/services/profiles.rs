//! Profile reconciliation.

use tracing::{info, instrument};

use tourvisto_core::{DesiredRole, Principal, Profile};

use super::SignInError;
use crate::db::{AccountStore, ProfileWrite};

/// Creates or refreshes the profile for a signed-in principal.
pub struct ProfileReconciler<'a> {
    store: &'a dyn AccountStore,
}

impl<'a> ProfileReconciler<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn AccountStore) -> Self {
        Self { store }
    }

    /// Reconcile the profile for `principal` with the requested role.
    ///
    /// Safe to repeat: there is never more than one profile per account, and
    /// an admin is never demoted. See [`tourvisto_core::RoleResolution`] for
    /// the merge rule.
    ///
    /// # Errors
    ///
    /// Returns `SignInError::StoreWriteFailed` if the write fails.
    #[instrument(skip_all, fields(account_id = %principal.id, desired = desired.as_str()))]
    pub async fn reconcile(
        &self,
        principal: &Principal,
        desired: DesiredRole,
    ) -> Result<Profile, SignInError> {
        let write = ProfileWrite {
            account_id: principal.id.clone(),
            email: principal.email.clone(),
            name: principal.display_name().to_owned(),
            image_url: principal.avatar().map(str::to_owned),
            desired_role: desired,
        };

        let profile = self.store.upsert_profile(&write).await?;

        info!(
            profile_id = %profile.id,
            status = %profile.status,
            request_status = %profile.request_status,
            "Profile reconciled"
        );

        Ok(profile)
    }
}
