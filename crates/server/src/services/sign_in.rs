//! The sign-in callback workflow.
//!
//! Resolve the principal, reconcile the profile, touch the elevation request
//! when admin was asked for, then hand everything to [`decide`]. Failures
//! degrade instead of surfacing:
//!
//! | Step fails           | Outcome                         |
//! |----------------------|---------------------------------|
//! | provider / no token  | sign-in                         |
//! | profile write        | sign-in, nothing stored         |
//! | elevation request    | normal decision without request |

use tracing::{error, info, instrument, warn};

use tourvisto_core::{Decision, Intent, Profile, RequestStatus, Route, decide};

use super::{ElevationRequestManager, ProfileReconciler, SessionResolver, SignInError};
use crate::db::AccountStore;
use crate::identity::{AccessToken, IdentityProvider};

/// Result of one pass through the workflow.
#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub decision: Decision,
    /// The committed profile, when reconciliation succeeded.
    pub profile: Option<Profile>,
    /// Elevation request status, when one was consulted.
    pub request_status: Option<RequestStatus>,
    /// A step failed and the user should be told to try again.
    pub failed: bool,
}

impl SignInOutcome {
    const fn signed_out(failed: bool) -> Self {
        Self {
            decision: Decision::Redirect(Route::SignIn),
            profile: None,
            request_status: None,
            failed,
        }
    }
}

pub struct SignInFlow<'a> {
    provider: &'a dyn IdentityProvider,
    store: &'a dyn AccountStore,
}

impl<'a> SignInFlow<'a> {
    #[must_use]
    pub const fn new(provider: &'a dyn IdentityProvider, store: &'a dyn AccountStore) -> Self {
        Self { provider, store }
    }

    /// Run the workflow for `token` with the caller's `intent`.
    ///
    /// Never fails: every error is logged, reported, and mapped to a
    /// decision. Replaying it for the same account is always safe.
    #[instrument(skip_all, fields(intent = ?intent))]
    pub async fn run(&self, token: Option<&AccessToken>, intent: Intent) -> SignInOutcome {
        let principal = match SessionResolver::new(self.provider).resolve(token).await {
            Ok(Some(principal)) => principal,
            Ok(None) => {
                info!("No authenticated principal");
                return SignInOutcome::signed_out(false);
            }
            Err(e) => {
                report(&e, "Identity provider unavailable during sign-in");
                return SignInOutcome::signed_out(true);
            }
        };

        let profile = match ProfileReconciler::new(self.store)
            .reconcile(&principal, intent.desired_role())
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                report(&e, "Profile write failed during sign-in");
                return SignInOutcome::signed_out(true);
            }
        };

        let request_status = if intent == Intent::Admin && !profile.is_admin() {
            match ElevationRequestManager::new(self.store)
                .ensure_request(&profile.account_id, &profile)
                .await
            {
                Ok(status) => Some(status),
                Err(e) => {
                    warn!(error = %e, "Elevation request write failed, continuing without it");
                    sentry::capture_error(&e);
                    None
                }
            }
        } else {
            None
        };

        let decision = decide(Some(&profile), request_status, intent);
        info!(
            account_id = %profile.account_id,
            status = %profile.status,
            decision = ?decision,
            "Sign-in decided"
        );

        SignInOutcome {
            decision,
            profile: Some(profile),
            request_status,
            failed: false,
        }
    }
}

fn report(e: &SignInError, message: &str) {
    let event_id = sentry::capture_error(e);
    error!(error = %e, sentry_event_id = %event_id, "{message}");
}
