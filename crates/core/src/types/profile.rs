//! Stored account records and the role merge rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    AccountId, DesiredRole, ElevationRequestId, Email, ProfileId, ProfileStatus, RequestStatus,
};

/// The application's record of an account, one per [`AccountId`].
///
/// Created on first sign-in and refreshed on every later one. Never deleted
/// by sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub account_id: AccountId,
    pub email: Email,
    pub name: String,
    pub image_url: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub status: ProfileStatus,
    /// Denormalized hint of the elevation state.
    ///
    /// [`ElevationRequest::req_status`] is authoritative when both exist.
    pub request_status: RequestStatus,
}

impl Profile {
    /// Returns true if the profile holds the admin role.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.status.is_admin()
    }
}

/// An account's request to be elevated to admin, zero or one per account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElevationRequest {
    pub id: ElevationRequestId,
    pub account_id: AccountId,
    pub email: Email,
    pub name: String,
    pub req_status: RequestStatus,
    pub created_at: DateTime<Utc>,
    /// Set when the request leaves `pending`.
    pub decided_at: Option<DateTime<Utc>>,
}

/// The `status` / `request_status` pair a sign-in writes to a profile.
///
/// Every store evaluates this against the row as it exists at write time.
/// The Postgres store expresses the same rule inside its upsert statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleResolution {
    pub status: ProfileStatus,
    pub request_status: RequestStatus,
}

impl RoleResolution {
    /// Resolve the roles for a sign-in asking for `desired`.
    ///
    /// - New profiles start as `user`; asking for admin marks them `pending`,
    ///   otherwise `approved`.
    /// - Admins stay admin and are always `approved`.
    /// - A user asking for admin becomes `pending`; a plain user sign-in
    ///   keeps whatever request status the profile already had.
    ///
    /// ## Examples
    ///
    /// ```
    /// use tourvisto_core::{DesiredRole, ProfileStatus, RequestStatus, RoleResolution};
    ///
    /// let fresh = RoleResolution::for_sign_in(None, DesiredRole::Admin);
    /// assert_eq!(fresh.status, ProfileStatus::User);
    /// assert_eq!(fresh.request_status, RequestStatus::Pending);
    /// ```
    #[must_use]
    pub const fn for_sign_in(existing: Option<&Profile>, desired: DesiredRole) -> Self {
        match existing {
            None => Self {
                status: ProfileStatus::User,
                request_status: match desired {
                    DesiredRole::Admin => RequestStatus::Pending,
                    DesiredRole::User => RequestStatus::Approved,
                },
            },
            Some(profile) if profile.status.is_admin() => Self {
                status: ProfileStatus::Admin,
                request_status: RequestStatus::Approved,
            },
            Some(profile) => Self {
                status: ProfileStatus::User,
                request_status: match desired {
                    DesiredRole::Admin => RequestStatus::Pending,
                    DesiredRole::User => profile.request_status,
                },
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn profile(status: ProfileStatus, request_status: RequestStatus) -> Profile {
        Profile {
            id: ProfileId::new(1),
            account_id: AccountId::parse("acct-1").unwrap(),
            email: Email::parse("ada@example.com").unwrap(),
            name: "Ada".to_owned(),
            image_url: None,
            joined_at: Utc::now(),
            status,
            request_status,
        }
    }

    #[test]
    fn test_new_profile_user_is_approved() {
        let r = RoleResolution::for_sign_in(None, DesiredRole::User);
        assert_eq!(r.status, ProfileStatus::User);
        assert_eq!(r.request_status, RequestStatus::Approved);
    }

    #[test]
    fn test_new_profile_admin_is_pending_user() {
        let r = RoleResolution::for_sign_in(None, DesiredRole::Admin);
        assert_eq!(r.status, ProfileStatus::User);
        assert_eq!(r.request_status, RequestStatus::Pending);
    }

    #[test]
    fn test_admin_is_sticky() {
        let admin = profile(ProfileStatus::Admin, RequestStatus::Approved);
        for desired in [DesiredRole::User, DesiredRole::Admin] {
            let r = RoleResolution::for_sign_in(Some(&admin), desired);
            assert_eq!(r.status, ProfileStatus::Admin);
            assert_eq!(r.request_status, RequestStatus::Approved);
        }
    }

    #[test]
    fn test_admin_with_stale_hint_is_normalized() {
        let admin = profile(ProfileStatus::Admin, RequestStatus::Pending);
        let r = RoleResolution::for_sign_in(Some(&admin), DesiredRole::User);
        assert_eq!(r.request_status, RequestStatus::Approved);
    }

    #[test]
    fn test_user_asking_admin_goes_pending() {
        let user = profile(ProfileStatus::User, RequestStatus::Rejected);
        let r = RoleResolution::for_sign_in(Some(&user), DesiredRole::Admin);
        assert_eq!(r.status, ProfileStatus::User);
        assert_eq!(r.request_status, RequestStatus::Pending);
    }

    #[test]
    fn test_user_sign_in_keeps_request_status() {
        for existing in [
            RequestStatus::Approved,
            RequestStatus::Pending,
            RequestStatus::Rejected,
        ] {
            let user = profile(ProfileStatus::User, existing);
            let r = RoleResolution::for_sign_in(Some(&user), DesiredRole::User);
            assert_eq!(r.status, ProfileStatus::User);
            assert_eq!(r.request_status, existing);
        }
    }
}
