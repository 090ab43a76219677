//! The authenticated identity reported by the identity provider.

use serde::{Deserialize, Serialize};

use super::{AccountId, Email};

/// An authenticated account as the identity provider describes it.
///
/// Owned by the provider and never persisted as-is: the profile reconciler
/// copies the fields it needs into a [`Profile`](super::Profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Provider subject, the key of every stored record for this account.
    pub id: AccountId,
    pub email: Email,
    /// Display name from provider metadata, if any.
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

impl Principal {
    /// The name to show and store for this principal.
    ///
    /// Falls back to the email address when the provider supplied no
    /// non-blank name.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.email.as_str())
    }

    /// Avatar URL, ignoring blank values.
    #[must_use]
    pub fn avatar(&self) -> Option<&str> {
        self.avatar_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }
}
