//! Session-related types.

use serde::{Deserialize, Serialize};

use tourvisto_core::{AccountId, Email, Profile, ProfileId, ProfileStatus};

/// Session-stored snapshot of the signed-in profile.
///
/// Written after a successful callback. A non-admin `status` here may be
/// stale: the admin guard and `/` re-read the store before trusting it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentProfile {
    pub profile_id: ProfileId,
    pub account_id: AccountId,
    pub email: Email,
    pub name: String,
    pub image_url: Option<String>,
    pub status: ProfileStatus,
}

impl CurrentProfile {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.status.is_admin()
    }
}

impl From<&Profile> for CurrentProfile {
    fn from(profile: &Profile) -> Self {
        Self {
            profile_id: profile.id,
            account_id: profile.account_id.clone(),
            email: profile.email.clone(),
            name: profile.name.clone(),
            image_url: profile.image_url.clone(),
            status: profile.status,
        }
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the signed-in profile.
    pub const CURRENT_PROFILE: &str = "current_profile";
}
