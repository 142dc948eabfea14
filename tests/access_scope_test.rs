mod common;

use assert_matches::assert_matches;
use common::{seed_customer, seed_profile, seed_project, seed_supervisor, test_db, ProjectSeed};
use construction_inventory::{
    errors::ServiceError,
    services::{AccessScopeResolver, DeclaredRole, IdentityResolver, ProjectOrdering},
};

#[tokio::test]
async fn owner_sees_only_owned_projects() {
    let db = test_db().await;
    seed_profile(&db, 1, Some("builder")).await;
    seed_project(&db, ProjectSeed::owned_by(1, "P-OWN-1")).await;
    seed_project(&db, ProjectSeed::owned_by(1, "P-OWN-2")).await;
    seed_project(&db, ProjectSeed::owned_by(2, "P-OTHER")).await;

    let identity = IdentityResolver::new(db.clone()).resolve(1).await.unwrap();
    assert_eq!(identity.declared_role, DeclaredRole::Owner);

    let projects = AccessScopeResolver::new(db.clone())
        .accessible_projects(&identity, ProjectOrdering::NameAsc)
        .await
        .unwrap();
    let codes: Vec<_> = projects.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["P-OWN-1", "P-OWN-2"]);
}

#[tokio::test]
async fn supervisor_sees_assigned_projects_only() {
    let db = test_db().await;
    seed_profile(&db, 5, Some("supervisor")).await;
    let supervisor = seed_supervisor(&db, Some(5), 1, "SUP-0001").await;
    // The supervisor also owns a project under their own actor id
    seed_project(&db, ProjectSeed::owned_by(5, "P-SELF")).await;
    let assigned =
        seed_project(&db, ProjectSeed::owned_by(1, "P-ASSIGNED").supervised_by(supervisor.id)).await;
    seed_project(&db, ProjectSeed::owned_by(1, "P-UNASSIGNED")).await;

    let identity = IdentityResolver::new(db.clone()).resolve(5).await.unwrap();
    assert_eq!(identity.supervisor_id, Some(supervisor.id));

    let ids = AccessScopeResolver::new(db.clone())
        .accessible_project_ids(&identity)
        .await
        .unwrap();
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![assigned.id]);
}

#[tokio::test]
async fn supervisor_role_without_record_sees_nothing() {
    let db = test_db().await;
    seed_profile(&db, 7, Some("supervisor")).await;
    seed_project(&db, ProjectSeed::owned_by(7, "P-SEVEN")).await;

    let identity = IdentityResolver::new(db.clone()).resolve(7).await.unwrap();
    let projects = AccessScopeResolver::new(db.clone())
        .accessible_projects(&identity, ProjectOrdering::Recent)
        .await
        .unwrap();

    assert!(projects.is_empty());
}

#[tokio::test]
async fn unspecified_role_sees_union_of_owned_and_assigned() {
    let db = test_db().await;
    // No profile at all
    let supervisor = seed_supervisor(&db, Some(9), 1, "SUP-0001").await;
    let owned = seed_project(&db, ProjectSeed::owned_by(9, "P-MINE")).await;
    let assigned =
        seed_project(&db, ProjectSeed::owned_by(1, "P-SUPERVISED").supervised_by(supervisor.id)).await;
    seed_project(&db, ProjectSeed::owned_by(1, "P-HIDDEN")).await;

    let identity = IdentityResolver::new(db.clone()).resolve(9).await.unwrap();
    assert_eq!(identity.declared_role, DeclaredRole::Unspecified);

    let ids = AccessScopeResolver::new(db.clone())
        .accessible_project_ids(&identity)
        .await
        .unwrap();
    let mut expected = vec![owned.id, assigned.id];
    expected.sort_unstable();
    assert_eq!(ids.into_iter().collect::<Vec<_>>(), expected);
}

#[tokio::test]
async fn customer_role_is_refused() {
    let db = test_db().await;
    seed_profile(&db, 11, Some("customer")).await;
    let customer = seed_customer(&db, Some(11), "CUS-0001").await;
    let project =
        seed_project(&db, ProjectSeed::owned_by(1, "P-BOUGHT").for_customer(customer.id)).await;

    let identity = IdentityResolver::new(db.clone()).resolve(11).await.unwrap();
    assert_eq!(identity.customer_id, Some(customer.id));

    let scope = AccessScopeResolver::new(db.clone());
    assert_matches!(
        scope.accessible_projects(&identity, ProjectOrdering::NameAsc).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        scope.authorize_project(&identity, project.id).await,
        Err(ServiceError::Forbidden(_))
    );
}

#[tokio::test]
async fn authorize_distinguishes_missing_from_foreign() {
    let db = test_db().await;
    seed_profile(&db, 1, Some("builder")).await;
    let foreign = seed_project(&db, ProjectSeed::owned_by(2, "P-FOREIGN")).await;
    let mine = seed_project(&db, ProjectSeed::owned_by(1, "P-MINE")).await;

    let identity = IdentityResolver::new(db.clone()).resolve(1).await.unwrap();
    let scope = AccessScopeResolver::new(db.clone());

    assert_eq!(scope.authorize_project(&identity, mine.id).await.unwrap().id, mine.id);
    assert_matches!(
        scope.authorize_project(&identity, foreign.id).await,
        Err(ServiceError::Forbidden(_))
    );
    assert_matches!(
        scope.authorize_project(&identity, 9_999).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(
        scope.authorize_block(&identity, 9_999).await,
        Err(ServiceError::NotFound(_))
    );
}
