//! Integration tests for the assignment lifecycle service, wired to
//! the SurrealDB repositories on the in-memory engine.

use chrono::{Duration, Utc};
use peerloop_core::error::PeerloopError;
use peerloop_core::models::assignment::{CreateReviewAssignment, UpdateReviewAssignment};
use peerloop_core::models::group::CreateGroup;
use peerloop_core::models::membership::{Role, UpsertMembership};
use peerloop_core::models::workspace::CreateWorkspace;
use peerloop_core::repository::{MembershipRepository, ReviewRepository, WorkspaceRepository};
use peerloop_db::repository::{
    SurrealAssignmentRepository, SurrealMembershipRepository, SurrealReviewRepository,
    SurrealWorkspaceRepository,
};
use peerloop_engine::{AssignmentService, EngineConfig, SubmissionService, SubmitReview};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;

struct Fixture {
    db: Surreal<Db>,
    workspace_id: Uuid,
    alice: Uuid,
    bob: Uuid,
}

/// Spin up in-memory DB, run migrations, create a workspace with one
/// two-member group.
async fn setup() -> Fixture {
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

    let membership_repo = SurrealMembershipRepository::new(db.clone());
    let group = membership_repo
        .create_group(CreateGroup {
            workspace_id: workspace.id,
            name: "Team A".into(),
        })
        .await
        .unwrap();

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    for user_id in [alice, bob] {
        membership_repo
            .upsert(UpsertMembership {
                workspace_id: workspace.id,
                user_id,
                role: Role::Student,
                group_id: Some(group.id),
            })
            .await
            .unwrap();
    }

    Fixture {
        db,
        workspace_id: workspace.id,
        alice,
        bob,
    }
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

fn open_input(workspace_id: Uuid) -> CreateReviewAssignment {
    let now = Utc::now();
    CreateReviewAssignment {
        workspace_id,
        description: Some("Sprint retro".into()),
        questions: vec!["Communication?".into(), "Contribution?".into()],
        start_date: now - Duration::hours(1),
        due_date: now + Duration::days(7),
    }
}

#[tokio::test]
async fn create_rejects_empty_questions() {
    let fx = setup().await;
    let svc = service(&fx.db);

    let mut input = open_input(fx.workspace_id);
    input.questions = vec![];
    let err = svc.create(input).await.unwrap_err();
    assert!(matches!(err, PeerloopError::Validation { .. }));
}

#[tokio::test]
async fn create_rejects_blank_question() {
    let fx = setup().await;
    let svc = service(&fx.db);

    let mut input = open_input(fx.workspace_id);
    input.questions = vec!["Communication?".into(), "   ".into()];
    let err = svc.create(input).await.unwrap_err();
    assert!(matches!(err, PeerloopError::Validation { .. }));
}

#[tokio::test]
async fn create_rejects_inverted_dates() {
    let fx = setup().await;
    let svc = service(&fx.db);

    let now = Utc::now();
    let mut input = open_input(fx.workspace_id);
    input.start_date = now;
    input.due_date = now - Duration::days(1);
    let err = svc.create(input).await.unwrap_err();
    assert!(matches!(err, PeerloopError::Validation { .. }));
}

#[tokio::test]
async fn create_for_missing_workspace_is_not_found() {
    let fx = setup().await;
    let svc = service(&fx.db);

    let err = svc.create(open_input(Uuid::new_v4())).await.unwrap_err();
    assert!(matches!(err, PeerloopError::NotFound { .. }));
}

#[tokio::test]
async fn edit_merges_and_revalidates_dates() {
    let fx = setup().await;
    let svc = service(&fx.db);
    let assignment = svc.create(open_input(fx.workspace_id)).await.unwrap();

    // Pulling the due date before the existing start date must fail
    // even though the update itself only touches one field.
    let err = svc
        .edit(
            assignment.id,
            UpdateReviewAssignment {
                due_date: Some(assignment.start_date - Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PeerloopError::Validation { .. }));

    let updated = svc
        .edit(
            assignment.id,
            UpdateReviewAssignment {
                description: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.description, "Renamed");
    assert_eq!(updated.questions, assignment.questions);
}

#[tokio::test]
async fn edit_missing_assignment_is_not_found() {
    let fx = setup().await;
    let svc = service(&fx.db);

    let err = svc
        .edit(
            Uuid::new_v4(),
            UpdateReviewAssignment {
                description: Some("nope".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PeerloopError::NotFound { .. }));
}

#[tokio::test]
async fn question_edit_allowed_before_any_submission() {
    let fx = setup().await;
    let svc = service(&fx.db);
    let assignment = svc.create(open_input(fx.workspace_id)).await.unwrap();

    // Reviews exist (generated at create) but none is completed, so
    // the pending rows cannot be misaligned by a schema change.
    let updated = svc
        .edit(
            assignment.id,
            UpdateReviewAssignment {
                questions: Some(vec!["One question only?".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.questions.len(), 1);
}

#[tokio::test]
async fn question_edit_rejected_after_completed_submission() {
    let fx = setup().await;
    let svc = service(&fx.db);
    let assignment = svc.create(open_input(fx.workspace_id)).await.unwrap();

    let submissions = SubmissionService::new(
        SurrealAssignmentRepository::new(fx.db.clone()),
        SurrealReviewRepository::new(fx.db.clone()),
        EngineConfig::default(),
    );
    submissions
        .submit(
            fx.alice,
            SubmitReview {
                assignment_id: assignment.id,
                reviewer_id: fx.alice,
                target_id: fx.bob,
                ratings: vec![4, 5],
                comment: None,
            },
        )
        .await
        .unwrap();

    let err = svc
        .edit(
            assignment.id,
            UpdateReviewAssignment {
                questions: Some(vec!["New question?".into()]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PeerloopError::Validation { .. }));

    // Date edits stay possible.
    let updated = svc
        .edit(
            assignment.id,
            UpdateReviewAssignment {
                due_date: Some(assignment.due_date + Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.due_date, assignment.due_date + Duration::days(1));
}

#[tokio::test]
async fn delete_cascades_to_reviews() {
    let fx = setup().await;
    let svc = service(&fx.db);
    let assignment = svc.create(open_input(fx.workspace_id)).await.unwrap();

    let review_repo = SurrealReviewRepository::new(fx.db.clone());
    assert_eq!(
        review_repo.count_by_assignment(assignment.id).await.unwrap(),
        2
    );

    svc.delete(assignment.id).await.unwrap();

    assert_eq!(
        review_repo.count_by_assignment(assignment.id).await.unwrap(),
        0
    );
    let err = svc.delete(assignment.id).await.unwrap_err();
    assert!(matches!(err, PeerloopError::NotFound { .. }));
}
