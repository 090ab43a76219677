//! Where a client goes after sign-in.
//!
//! [`decide`] is pure: it looks at the reconciled profile, the authoritative
//! elevation request status and the caller's intent, and never writes.

use serde::Serialize;

use crate::types::{Intent, Profile, RequestStatus};

/// Pages a sign-in can land on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    SignIn,
    Home,
    Dashboard,
}

impl Route {
    /// Absolute path of the route.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::SignIn => "/sign-in",
            Self::Home => "/home",
            Self::Dashboard => "/dashboard",
        }
    }
}

/// Outcome of a sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "route")]
pub enum Decision {
    /// Send the client to another page.
    Redirect(Route),
    /// Stay on the callback and show the pending-approval view.
    PendingApproval,
}

impl Decision {
    /// The redirect target, if any.
    #[must_use]
    pub const fn route(self) -> Option<Route> {
        match self {
            Self::Redirect(route) => Some(route),
            Self::PendingApproval => None,
        }
    }
}

/// Decide the destination for a finished sign-in.
///
/// `request` is the elevation request's status when one was consulted. It is
/// `None` when the intent was not admin or when the request step failed, in
/// which case the client is sent home.
///
/// Admins go to the dashboard whatever they asked for; everyone else goes
/// home unless their admin request is still pending.
///
/// ## Examples
///
/// ```
/// use tourvisto_core::{Decision, Intent, Route, decide};
///
/// assert_eq!(decide(None, None, Intent::Admin), Decision::Redirect(Route::SignIn));
/// ```
#[must_use]
pub fn decide(profile: Option<&Profile>, request: Option<RequestStatus>, intent: Intent) -> Decision {
    let Some(profile) = profile else {
        return Decision::Redirect(Route::SignIn);
    };

    if profile.is_admin() {
        return Decision::Redirect(Route::Dashboard);
    }

    match (intent, request) {
        (Intent::Admin, Some(RequestStatus::Pending)) => Decision::PendingApproval,
        _ => Decision::Redirect(Route::Home),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::{AccountId, Email, ProfileId, ProfileStatus};

    fn profile(status: ProfileStatus) -> Profile {
        Profile {
            id: ProfileId::new(7),
            account_id: AccountId::parse("acct-7").unwrap(),
            email: Email::parse("guide@example.com").unwrap(),
            name: "Guide".to_owned(),
            image_url: None,
            joined_at: Utc::now(),
            status,
            request_status: RequestStatus::Approved,
        }
    }

    const INTENTS: [Intent; 3] = [Intent::None, Intent::User, Intent::Admin];
    const REQUESTS: [Option<RequestStatus>; 4] = [
        None,
        Some(RequestStatus::Pending),
        Some(RequestStatus::Approved),
        Some(RequestStatus::Rejected),
    ];

    #[test]
    fn test_no_profile_goes_to_sign_in() {
        for intent in INTENTS {
            for request in REQUESTS {
                assert_eq!(
                    decide(None, request, intent),
                    Decision::Redirect(Route::SignIn)
                );
            }
        }
    }

    #[test]
    fn test_admin_goes_to_dashboard_for_every_intent() {
        let admin = profile(ProfileStatus::Admin);
        for intent in INTENTS {
            for request in REQUESTS {
                assert_eq!(
                    decide(Some(&admin), request, intent),
                    Decision::Redirect(Route::Dashboard)
                );
            }
        }
    }

    #[test]
    fn test_user_with_pending_admin_request_waits() {
        let user = profile(ProfileStatus::User);
        assert_eq!(
            decide(Some(&user), Some(RequestStatus::Pending), Intent::Admin),
            Decision::PendingApproval
        );
    }

    #[test]
    fn test_user_with_rejected_request_goes_home() {
        let user = profile(ProfileStatus::User);
        assert_eq!(
            decide(Some(&user), Some(RequestStatus::Rejected), Intent::Admin),
            Decision::Redirect(Route::Home)
        );
    }

    #[test]
    fn test_user_when_request_step_failed_goes_home() {
        let user = profile(ProfileStatus::User);
        assert_eq!(
            decide(Some(&user), None, Intent::Admin),
            Decision::Redirect(Route::Home)
        );
    }

    #[test]
    fn test_pending_only_matters_for_admin_intent() {
        let user = profile(ProfileStatus::User);
        for intent in [Intent::None, Intent::User] {
            assert_eq!(
                decide(Some(&user), Some(RequestStatus::Pending), intent),
                Decision::Redirect(Route::Home)
            );
        }
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::SignIn.path(), "/sign-in");
        assert_eq!(Route::Home.path(), "/home");
        assert_eq!(Route::Dashboard.path(), "/dashboard");
        assert_eq!(Decision::PendingApproval.route(), None);
    }
}
