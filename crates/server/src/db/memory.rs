//! In-process [`AccountStore`] with the same semantics as the Postgres one.
//!
//! Each operation runs under a single lock, which stands in for the
//! statement-level atomicity the database provides.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use tourvisto_core::{
    AccountId, ElevationRequest, ElevationRequestId, Email, Profile, ProfileId, ProfileStatus,
    RequestStatus, RoleResolution,
};

use super::{AccountStore, ProfileWrite, RepositoryError};

#[derive(Default)]
struct Tables {
    profiles: HashMap<AccountId, Profile>,
    requests: HashMap<AccountId, ElevationRequest>,
    next_profile_id: i32,
    next_request_id: i32,
}

/// Account store kept in memory, used by tests and local tooling.
#[derive(Default)]
pub struct MemoryAccountStore {
    tables: Mutex<Tables>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored profiles.
    #[must_use]
    pub fn profile_count(&self) -> usize {
        self.tables.lock().profiles.len()
    }

    /// Number of stored elevation requests.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.tables.lock().requests.len()
    }

    fn decide(
        &self,
        account_id: &AccountId,
        to: RequestStatus,
    ) -> Result<ElevationRequest, RepositoryError> {
        let mut tables = self.tables.lock();
        let Tables {
            profiles, requests, ..
        } = &mut *tables;

        let request = requests.get_mut(account_id).ok_or(RepositoryError::NotFound)?;
        if request.req_status != RequestStatus::Pending {
            return Err(RepositoryError::Conflict(format!(
                "elevation request already {}",
                request.req_status
            )));
        }
        request.req_status = to;
        request.decided_at = Some(Utc::now());

        if let Some(profile) = profiles.get_mut(account_id) {
            match to {
                RequestStatus::Approved => {
                    profile.status = ProfileStatus::Admin;
                    profile.request_status = RequestStatus::Approved;
                }
                RequestStatus::Rejected if !profile.is_admin() => {
                    profile.request_status = RequestStatus::Rejected;
                }
                _ => {}
            }
        }

        Ok(request.clone())
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn get_profile(&self, account_id: &AccountId) -> Result<Option<Profile>, RepositoryError> {
        Ok(self.tables.lock().profiles.get(account_id).cloned())
    }

    async fn upsert_profile(&self, write: &ProfileWrite) -> Result<Profile, RepositoryError> {
        let mut tables = self.tables.lock();
        let roles = RoleResolution::for_sign_in(
            tables.profiles.get(&write.account_id),
            write.desired_role,
        );

        if let Some(profile) = tables.profiles.get_mut(&write.account_id) {
            profile.email = write.email.clone();
            if !write.name.is_empty() {
                profile.name.clone_from(&write.name);
            }
            if write.image_url.is_some() {
                profile.image_url.clone_from(&write.image_url);
            }
            profile.status = roles.status;
            profile.request_status = roles.request_status;
            return Ok(profile.clone());
        }

        tables.next_profile_id += 1;
        let profile = Profile {
            id: ProfileId::new(tables.next_profile_id),
            account_id: write.account_id.clone(),
            email: write.email.clone(),
            name: write.name.clone(),
            image_url: write.image_url.clone(),
            joined_at: Utc::now(),
            status: roles.status,
            request_status: roles.request_status,
        };
        tables
            .profiles
            .insert(write.account_id.clone(), profile.clone());
        Ok(profile)
    }

    async fn get_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<ElevationRequest>, RepositoryError> {
        Ok(self.tables.lock().requests.get(account_id).cloned())
    }

    async fn insert_elevation_request_if_absent(
        &self,
        account_id: &AccountId,
        email: &Email,
        name: &str,
    ) -> Result<Option<ElevationRequest>, RepositoryError> {
        let mut tables = self.tables.lock();
        if !tables.profiles.contains_key(account_id) {
            return Err(RepositoryError::Conflict("no profile for account".to_owned()));
        }
        if tables.requests.contains_key(account_id) {
            return Ok(None);
        }

        tables.next_request_id += 1;
        let request = ElevationRequest {
            id: ElevationRequestId::new(tables.next_request_id),
            account_id: account_id.clone(),
            email: email.clone(),
            name: name.to_owned(),
            req_status: RequestStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
        };
        tables.requests.insert(account_id.clone(), request.clone());
        Ok(Some(request))
    }

    async fn approve_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError> {
        self.decide(account_id, RequestStatus::Approved)
    }

    async fn reject_elevation_request(
        &self,
        account_id: &AccountId,
    ) -> Result<ElevationRequest, RepositoryError> {
        self.decide(account_id, RequestStatus::Rejected)
    }

    async fn list_elevation_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<ElevationRequest>, RepositoryError> {
        let tables = self.tables.lock();
        let mut requests: Vec<ElevationRequest> = tables
            .requests
            .values()
            .filter(|r| status.is_none_or(|s| r.req_status == s))
            .cloned()
            .collect();
        requests.sort_by_key(|r| (r.created_at, r.id.as_i32()));
        Ok(requests)
    }

    async fn list_profiles(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Profile>, i64), RepositoryError> {
        let tables = self.tables.lock();
        let mut profiles: Vec<Profile> = tables.profiles.values().cloned().collect();
        profiles.sort_by_key(|p| (p.joined_at, p.id.as_i32()));

        let total = i64::try_from(profiles.len())
            .map_err(|e| RepositoryError::DataCorruption(e.to_string()))?;
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        let page = profiles.into_iter().skip(offset).take(limit).collect();
        Ok((page, total))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tourvisto_core::DesiredRole;

    use super::*;

    fn write(account: &str, desired_role: DesiredRole) -> ProfileWrite {
        ProfileWrite {
            account_id: AccountId::parse(account).unwrap(),
            email: Email::parse(&format!("{account}@example.com")).unwrap(),
            name: account.to_owned(),
            image_url: None,
            desired_role,
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_then_merges() {
        let store = MemoryAccountStore::new();
        let first = store.upsert_profile(&write("a", DesiredRole::User)).await.unwrap();
        let second = store.upsert_profile(&write("a", DesiredRole::Admin)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.joined_at, second.joined_at);
        assert_eq!(second.request_status, RequestStatus::Pending);
        assert_eq!(store.profile_count(), 1);
    }

    #[tokio::test]
    async fn test_upsert_keeps_name_when_blank() {
        let store = MemoryAccountStore::new();
        store.upsert_profile(&write("a", DesiredRole::User)).await.unwrap();
        let mut blank = write("a", DesiredRole::User);
        blank.name = String::new();
        let profile = store.upsert_profile(&blank).await.unwrap();
        assert_eq!(profile.name, "a");
    }

    #[tokio::test]
    async fn test_request_requires_profile() {
        let store = MemoryAccountStore::new();
        let w = write("ghost", DesiredRole::Admin);
        let err = store
            .insert_elevation_request_if_absent(&w.account_id, &w.email, &w.name)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_decided_request_cannot_be_decided_again() {
        let store = MemoryAccountStore::new();
        let w = write("a", DesiredRole::Admin);
        store.upsert_profile(&w).await.unwrap();
        store
            .insert_elevation_request_if_absent(&w.account_id, &w.email, &w.name)
            .await
            .unwrap();

        store.reject_elevation_request(&w.account_id).await.unwrap();
        let err = store.approve_elevation_request(&w.account_id).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let profile = store.get_profile(&w.account_id).await.unwrap().unwrap();
        assert_eq!(profile.status, ProfileStatus::User);
        assert_eq!(profile.request_status, RequestStatus::Rejected);
    }

    #[tokio::test]
    async fn test_list_profiles_pages() {
        let store = MemoryAccountStore::new();
        for account in ["a", "b", "c"] {
            store.upsert_profile(&write(account, DesiredRole::User)).await.unwrap();
        }

        let (page, total) = store.list_profiles(2, 1).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].account_id.as_str(), "b");
    }
}
