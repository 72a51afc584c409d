//! Integration tests for review-graph generation, wired to the
//! SurrealDB repositories on the in-memory engine.

use chrono::{Duration, Utc};
use peerloop_core::error::PeerloopError;
use peerloop_core::models::assignment::CreateReviewAssignment;
use peerloop_core::models::group::CreateGroup;
use peerloop_core::models::membership::{Role, UpsertMembership};
use peerloop_core::models::workspace::CreateWorkspace;
use peerloop_core::repository::{MembershipRepository, ReviewRepository, WorkspaceRepository};
use peerloop_db::repository::{
    SurrealAssignmentRepository, SurrealMembershipRepository, SurrealReviewRepository,
    SurrealWorkspaceRepository,
};
use peerloop_engine::AssignmentService;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

/// Spin up in-memory DB, run migrations, create a workspace.
async fn setup() -> (Surreal<Db>, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    peerloop_db::run_migrations(&db).await.unwrap();

    let workspace_repo = SurrealWorkspaceRepository::new(db.clone());
    let workspace = workspace_repo
        .create(CreateWorkspace {
            name: "CS 301".into(),
            description: String::new(),
        })
        .await
        .unwrap();

    (db, workspace.id)
}

fn service(
    db: &Surreal<Db>,
) -> AssignmentService<
    SurrealWorkspaceRepository<Db>,
    SurrealMembershipRepository<Db>,
    SurrealAssignmentRepository<Db>,
    SurrealReviewRepository<Db>,
> {
    AssignmentService::new(
        SurrealWorkspaceRepository::new(db.clone()),
        SurrealMembershipRepository::new(db.clone()),
        SurrealAssignmentRepository::new(db.clone()),
        SurrealReviewRepository::new(db.clone()),
    )
}

/// Create a group of `size` fresh members; returns (group_id, members).
async fn add_group(
    db: &Surreal<Db>,
    workspace_id: Uuid,
    name: &str,
    size: usize,
) -> (Uuid, Vec<Uuid>) {
    let repo = SurrealMembershipRepository::new(db.clone());
    let group = repo
        .create_group(CreateGroup {
            workspace_id,
            name: name.into(),
        })
        .await
        .unwrap();

    let mut members = Vec::with_capacity(size);
    for _ in 0..size {
        let user_id = Uuid::new_v4();
        repo.upsert(UpsertMembership {
            workspace_id,
            user_id,
            role: Role::Student,
            group_id: Some(group.id),
        })
        .await
        .unwrap();
        members.push(user_id);
    }
    (group.id, members)
}

fn open_input(workspace_id: Uuid) -> CreateReviewAssignment {
    let now = Utc::now();
    CreateReviewAssignment {
        workspace_id,
        description: None,
        questions: vec!["q1".into(), "q2".into()],
        start_date: now - Duration::hours(1),
        due_date: now + Duration::days(7),
    }
}

#[tokio::test]
async fn generation_count_is_sum_of_n_times_n_minus_one() {
    let (db, workspace_id) = setup().await;
    // Groups of sizes 3, 2, 1, and 0: expect 3·2 + 2·1 + 0 + 0 = 8.
    add_group(&db, workspace_id, "trio", 3).await;
    add_group(&db, workspace_id, "pair", 2).await;
    add_group(&db, workspace_id, "solo", 1).await;
    add_group(&db, workspace_id, "empty", 0).await;

    let svc = service(&db);
    let assignment = svc.create(open_input(workspace_id)).await.unwrap();

    let review_repo = SurrealReviewRepository::new(db.clone());
    let reviews = review_repo.list_by_assignment(assignment.id).await.unwrap();
    assert_eq!(reviews.len(), 8);
    assert!(reviews.iter().all(|r| r.reviewer_id != r.target_id));
    assert!(reviews.iter().all(|r| !r.completed));
}

#[tokio::test]
async fn trio_produces_all_six_ordered_pairs() {
    let (db, workspace_id) = setup().await;
    let (group_id, members) = add_group(&db, workspace_id, "trio", 3).await;

    let svc = service(&db);
    let assignment = svc.create(open_input(workspace_id)).await.unwrap();

    let review_repo = SurrealReviewRepository::new(db.clone());
    let reviews = review_repo.list_by_assignment(assignment.id).await.unwrap();
    assert_eq!(reviews.len(), 6);
    assert!(reviews.iter().all(|r| r.group_id == group_id));

    for reviewer in &members {
        for target in &members {
            if reviewer != target {
                let found = review_repo
                    .get_by_key(assignment.id, *reviewer, *target)
                    .await;
                assert!(found.is_ok(), "missing pair ({reviewer}, {target})");
            }
        }
    }
}

#[tokio::test]
async fn ungrouped_members_are_silently_excluded() {
    let (db, workspace_id) = setup().await;
    add_group(&db, workspace_id, "pair", 2).await;

    // A member with no group contributes no reviews.
    let membership_repo = SurrealMembershipRepository::new(db.clone());
    let loner = Uuid::new_v4();
    membership_repo
        .upsert(UpsertMembership {
            workspace_id,
            user_id: loner,
            role: Role::Student,
            group_id: None,
        })
        .await
        .unwrap();

    let svc = service(&db);
    let assignment = svc.create(open_input(workspace_id)).await.unwrap();

    let review_repo = SurrealReviewRepository::new(db.clone());
    let reviews = review_repo.list_by_assignment(assignment.id).await.unwrap();
    assert_eq!(reviews.len(), 2);
    assert!(
        reviews
            .iter()
            .all(|r| r.reviewer_id != loner && r.target_id != loner)
    );
}

#[tokio::test]
async fn workspace_without_pairable_members_generates_nothing() {
    let (db, workspace_id) = setup().await;
    add_group(&db, workspace_id, "solo", 1).await;

    let svc = service(&db);
    let assignment = svc.create(open_input(workspace_id)).await.unwrap();

    let review_repo = SurrealReviewRepository::new(db.clone());
    assert_eq!(
        review_repo.count_by_assignment(assignment.id).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn generation_is_idempotent() {
    let (db, workspace_id) = setup().await;
    add_group(&db, workspace_id, "trio", 3).await;

    let svc = service(&db);
    let assignment = svc.create(open_input(workspace_id)).await.unwrap();

    let review_repo = SurrealReviewRepository::new(db.clone());
    assert_eq!(
        review_repo.count_by_assignment(assignment.id).await.unwrap(),
        6
    );

    // A second run conflicts on the unique pairing index and no-ops.
    let inserted = svc.generate_for(assignment.id).await.unwrap();
    assert_eq!(inserted, 0);
    assert_eq!(
        review_repo.count_by_assignment(assignment.id).await.unwrap(),
        6
    );
}

#[tokio::test]
async fn future_start_defers_generation() {
    let (db, workspace_id) = setup().await;
    add_group(&db, workspace_id, "trio", 3).await;

    let now = Utc::now();
    let mut input = open_input(workspace_id);
    input.start_date = now + Duration::days(1);
    input.due_date = now + Duration::days(8);

    let svc = service(&db);
    let assignment = svc.create(input).await.unwrap();

    let review_repo = SurrealReviewRepository::new(db.clone());
    assert_eq!(
        review_repo.count_by_assignment(assignment.id).await.unwrap(),
        0
    );

    // The external trigger must not be able to run early either.
    let err = svc.generate_for(assignment.id).await.unwrap_err();
    assert!(matches!(err, PeerloopError::Validation { .. }));
    assert_eq!(
        review_repo.count_by_assignment(assignment.id).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn generate_for_missing_assignment_is_not_found() {
    let (db, _workspace_id) = setup().await;
    let svc = service(&db);

    let err = svc.generate_for(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, PeerloopError::NotFound { .. }));
}

#[tokio::test]
async fn membership_changes_after_generation_do_not_alter_graph() {
    let (db, workspace_id) = setup().await;
    let (group_id, _members) = add_group(&db, workspace_id, "pair", 2).await;

    let svc = service(&db);
    let assignment = svc.create(open_input(workspace_id)).await.unwrap();

    // A member joining after generation does not appear in the graph;
    // the rows are a snapshot of membership at generation time.
    let membership_repo = SurrealMembershipRepository::new(db.clone());
    membership_repo
        .upsert(UpsertMembership {
            workspace_id,
            user_id: Uuid::new_v4(),
            role: Role::Student,
            group_id: Some(group_id),
        })
        .await
        .unwrap();

    let inserted = svc.generate_for(assignment.id).await.unwrap();
    assert_eq!(inserted, 0);

    let review_repo = SurrealReviewRepository::new(db.clone());
    assert_eq!(
        review_repo.count_by_assignment(assignment.id).await.unwrap(),
        2
    );
}
