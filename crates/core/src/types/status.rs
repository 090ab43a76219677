//! Role and request status enums.

use serde::{Deserialize, Serialize};

/// Error returned when a status string is not one of the known values.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind}: {value}")]
pub struct ParseStatusError {
    kind: &'static str,
    value: String,
}

impl ParseStatusError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

/// The role a profile currently holds.
///
/// Once a profile is `Admin` it stays `Admin`: sign-in writes never demote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "profile_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    #[default]
    User,
    Admin,
}

impl ProfileStatus {
    /// Returns true for [`ProfileStatus::Admin`].
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Lowercase name as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProfileStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(ParseStatusError::new("profile status", s)),
        }
    }
}

/// Status of an admin-elevation request.
///
/// Used both for `ElevationRequest::req_status` (authoritative) and the
/// denormalized `Profile::request_status` hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "request_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// Approved and rejected requests are never rewritten.
    #[must_use]
    pub const fn is_decided(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Lowercase name as stored and serialized.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ParseStatusError::new("request status", s)),
        }
    }
}

/// The role a sign-in asks the reconciler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DesiredRole {
    User,
    Admin,
}

impl DesiredRole {
    /// Lowercase name as sent to the store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

/// The role the client explicitly asked for on the callback URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    None,
    User,
    Admin,
}

impl Intent {
    /// Normalize a raw `intent` / `role` query value.
    ///
    /// Only the exact values `user` and `admin` are recognized. Anything
    /// else, including other casings, becomes [`Intent::None`].
    #[must_use]
    pub fn from_param(raw: Option<&str>) -> Self {
        match raw {
            Some("user") => Self::User,
            Some("admin") => Self::Admin,
            _ => Self::None,
        }
    }

    /// The role handed to the profile reconciler.
    ///
    /// No intent reconciles as a plain user sign-in.
    #[must_use]
    pub const fn desired_role(self) -> DesiredRole {
        match self {
            Self::Admin => DesiredRole::Admin,
            Self::None | Self::User => DesiredRole::User,
        }
    }

    /// Query-string value for links back into the callback.
    #[must_use]
    pub const fn as_param(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::User => Some("user"),
            Self::Admin => Some("admin"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_normalization() {
        assert_eq!(Intent::from_param(Some("admin")), Intent::Admin);
        assert_eq!(Intent::from_param(Some("user")), Intent::User);
        assert_eq!(Intent::from_param(Some("client")), Intent::None);
        assert_eq!(Intent::from_param(Some("admin'--")), Intent::None);
        assert_eq!(Intent::from_param(Some("")), Intent::None);
        assert_eq!(Intent::from_param(None), Intent::None);
    }

    #[test]
    fn test_intent_is_case_and_space_sensitive() {
        assert_eq!(Intent::from_param(Some("ADMIN")), Intent::None);
        assert_eq!(Intent::from_param(Some(" user ")), Intent::None);
        assert_eq!(Intent::from_param(Some("Admin")), Intent::None);
    }

    #[test]
    fn test_intent_desired_role() {
        assert_eq!(Intent::None.desired_role(), DesiredRole::User);
        assert_eq!(Intent::User.desired_role(), DesiredRole::User);
        assert_eq!(Intent::Admin.desired_role(), DesiredRole::Admin);
    }

    #[test]
    fn test_request_status_decided() {
        assert!(!RequestStatus::Pending.is_decided());
        assert!(RequestStatus::Approved.is_decided());
        assert!(RequestStatus::Rejected.is_decided());
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("admin".parse::<ProfileStatus>().unwrap(), ProfileStatus::Admin);
        assert_eq!(
            "rejected".parse::<RequestStatus>().unwrap(),
            RequestStatus::Rejected
        );
        let err = "root".parse::<ProfileStatus>().unwrap_err();
        assert_eq!(err.to_string(), "invalid profile status: root");
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProfileStatus::Admin).unwrap(),
            "\"admin\""
        );
        assert_eq!(
            serde_json::to_string(&RequestStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
