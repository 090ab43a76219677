//! Invariants that must hold over arbitrary sign-in sequences.

#![allow(clippy::unwrap_used)]

use tourvisto_core::{
    DesiredRole, Intent, Profile, ProfileStatus, RequestStatus, Route, decide,
};
use tourvisto_integration_tests::{FlakyStore, principal};
use tourvisto_server::db::AccountStore;
use tourvisto_server::services::{ElevationRequestManager, ProfileReconciler};

const SEQUENCES: &[&[DesiredRole]] = &[
    &[DesiredRole::User, DesiredRole::User, DesiredRole::User],
    &[DesiredRole::Admin, DesiredRole::User, DesiredRole::Admin],
    &[DesiredRole::User, DesiredRole::Admin, DesiredRole::User, DesiredRole::User],
    &[DesiredRole::Admin, DesiredRole::Admin],
];

#[tokio::test]
async fn reconcile_keeps_exactly_one_profile_per_account() {
    for (i, roles) in SEQUENCES.iter().enumerate() {
        let store = FlakyStore::new();
        let reconciler = ProfileReconciler::new(&store);
        let who = principal(&format!("acct-{i}"), "p@example.com", Some("P"));

        let mut ids = Vec::new();
        for role in *roles {
            ids.push(reconciler.reconcile(&who, *role).await.unwrap().id);
        }

        assert_eq!(store.inner().profile_count(), 1, "sequence {i}");
        assert!(ids.windows(2).all(|w| w[0] == w[1]), "sequence {i}");
    }
}

#[tokio::test]
async fn request_status_hint_follows_desired_role() {
    let store = FlakyStore::new();
    let reconciler = ProfileReconciler::new(&store);
    let who = principal("acct", "p@example.com", None);

    let first = reconciler.reconcile(&who, DesiredRole::User).await.unwrap();
    assert_eq!(first.request_status, RequestStatus::Approved);

    let asked = reconciler.reconcile(&who, DesiredRole::Admin).await.unwrap();
    assert_eq!(asked.request_status, RequestStatus::Pending);
    assert_eq!(asked.status, ProfileStatus::User);

    // A plain sign-in leaves the hint where it was.
    let later = reconciler.reconcile(&who, DesiredRole::User).await.unwrap();
    assert_eq!(later.request_status, RequestStatus::Pending);
}

#[tokio::test]
async fn reconcile_refreshes_display_fields() {
    let store = FlakyStore::new();
    let reconciler = ProfileReconciler::new(&store);

    let before = principal("acct", "old@example.com", Some("Old Name"));
    let joined = reconciler
        .reconcile(&before, DesiredRole::User)
        .await
        .unwrap()
        .joined_at;

    let after = principal("acct", "new@example.com", Some("New Name"));
    let profile = reconciler.reconcile(&after, DesiredRole::User).await.unwrap();
    assert_eq!(profile.name, "New Name");
    assert_eq!(profile.email.as_str(), "new@example.com");
    assert_eq!(profile.joined_at, joined);
}

#[tokio::test]
async fn admin_status_survives_user_sign_ins() {
    let store = FlakyStore::new();
    let reconciler = ProfileReconciler::new(&store);
    let manager = ElevationRequestManager::new(&store);
    let who = principal("acct", "p@example.com", None);

    let profile = reconciler.reconcile(&who, DesiredRole::Admin).await.unwrap();
    manager.ensure_request(&who.id, &profile).await.unwrap();
    manager.approve(&who.id).await.unwrap();

    for _ in 0..3 {
        let profile = reconciler.reconcile(&who, DesiredRole::User).await.unwrap();
        assert_eq!(profile.status, ProfileStatus::Admin);
    }
}

#[tokio::test]
async fn ensure_request_never_overwrites_a_decision() {
    for approve in [true, false] {
        let store = FlakyStore::new();
        let reconciler = ProfileReconciler::new(&store);
        let manager = ElevationRequestManager::new(&store);
        let who = principal("acct", "p@example.com", None);

        let profile = reconciler.reconcile(&who, DesiredRole::Admin).await.unwrap();
        manager.ensure_request(&who.id, &profile).await.unwrap();
        let decided = if approve {
            manager.approve(&who.id).await.unwrap()
        } else {
            manager.reject(&who.id).await.unwrap()
        };

        for _ in 0..3 {
            let profile = reconciler.reconcile(&who, DesiredRole::Admin).await.unwrap();
            let status = manager.ensure_request(&who.id, &profile).await.unwrap();
            assert_eq!(status, decided.req_status);
        }

        let stored = store.get_elevation_request(&who.id).await.unwrap().unwrap();
        assert_eq!(stored.req_status, decided.req_status);
        assert_eq!(stored.decided_at, decided.decided_at);
    }
}

#[tokio::test]
async fn admins_land_on_dashboard_for_admin_and_no_intent() {
    let store = FlakyStore::new();
    let reconciler = ProfileReconciler::new(&store);
    let manager = ElevationRequestManager::new(&store);
    let who = principal("acct", "p@example.com", None);

    let profile = reconciler.reconcile(&who, DesiredRole::Admin).await.unwrap();
    manager.ensure_request(&who.id, &profile).await.unwrap();
    manager.approve(&who.id).await.unwrap();
    let admin: Profile = store.get_profile(&who.id).await.unwrap().unwrap();

    for intent in [Intent::Admin, Intent::None] {
        for request in [None, Some(RequestStatus::Approved)] {
            assert_eq!(decide(Some(&admin), request, intent).route(), Some(Route::Dashboard));
        }
    }
}
