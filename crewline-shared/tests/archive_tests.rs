/// Integration tests for project archiving
///
/// Run with: cargo test --test archive_tests
mod common;

use common::Fixture;
use crewline_shared::error::{EngineError, EntityKind};
use crewline_shared::models::{Availability, Role, TaskStatus};

#[tokio::test]
async fn test_archive_releases_assignees_and_archives_every_task() {
    let fx = Fixture::new();
    let team = fx.team("Platform").await;
    let eve = fx.user("eve@crewline.dev", Role::Engineer, Some(team.id)).await;
    let sam = fx.user("sam@crewline.dev", Role::Engineer, Some(team.id)).await;
    let project = fx.project(team.id, "Ingest").await;
    let parser = fx.task(project.id, "Write parser").await;
    let loader = fx.task(project.id, "Write loader").await;
    let docs = fx.task(project.id, "Write docs").await;

    let assignments = fx.engine.assignments();
    assignments.assign_task(parser.id, eve.id).await.expect("assign eve");
    assignments.assign_task(loader.id, sam.id).await.expect("assign sam");

    let archived = fx
        .engine
        .archiver()
        .archive_project(project.id, team.id)
        .await
        .expect("archive");

    assert_eq!(archived.archived_tasks_count, 3);
    assert!(archived.project.archived);
    assert!(archived.project.archived_at.is_some());
    let mut released = archived.released_users.clone();
    released.sort();
    let mut expected = vec![eve.id, sam.id];
    expected.sort();
    assert_eq!(released, expected);

    for task in [&parser, &loader, &docs] {
        let task = fx.reload_task(task.id).await;
        assert!(task.archived, "task {} should be archived", task.title);
        assert!(task.archived_at.is_some());
    }
    // History keeps who was working on it
    assert_eq!(fx.reload_task(parser.id).await.assignee_id, Some(eve.id));

    assert_eq!(fx.reload_user(eve.id).await.availability, Availability::Available);
    assert_eq!(fx.reload_user(sam.id).await.availability, Availability::Available);
    assert!(fx.reload_project(project.id).await.archived);
}

#[tokio::test]
async fn test_archive_twice_is_rejected() {
    let fx = Fixture::new();
    let team = fx.team("Platform").await;
    let project = fx.project(team.id, "Ingest").await;
    fx.task(project.id, "Write parser").await;

    let archiver = fx.engine.archiver();
    archiver
        .archive_project(project.id, team.id)
        .await
        .expect("first archive");
    let err = archiver
        .archive_project(project.id, team.id)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::ProjectAlreadyArchived(id) if id == project.id));
    assert_eq!(err.code(), "project_already_archived");
}

#[tokio::test]
async fn test_archive_requires_owning_team() {
    let fx = Fixture::new();
    let owner = fx.team("Platform").await;
    let other = fx.team("Mobile").await;
    let project = fx.project(owner.id, "Ingest").await;

    let err = fx
        .engine
        .archiver()
        .archive_project(project.id, other.id)
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::NotFound { entity: EntityKind::Project, .. }));
    assert!(!fx.reload_project(project.id).await.archived);
}

#[tokio::test]
async fn test_archive_leaves_done_tasks_and_their_assignee_alone() {
    let fx = Fixture::new();
    let team = fx.team("Platform").await;
    let eve = fx.user("eve@crewline.dev", Role::Engineer, Some(team.id)).await;
    let project = fx.project(team.id, "Ingest").await;
    let other_project = fx.project(team.id, "Billing").await;
    let finished = fx.task(project.id, "Write parser").await;
    let elsewhere = fx.task(other_project.id, "Invoice export").await;

    let assignments = fx.engine.assignments();
    assignments.assign_task(finished.id, eve.id).await.expect("assign");
    assignments.complete_task(finished.id).await.expect("complete");
    assignments.assign_task(elsewhere.id, eve.id).await.expect("assign elsewhere");

    let archived = fx
        .engine
        .archiver()
        .archive_project(project.id, team.id)
        .await
        .expect("archive");

    // Only in-progress tasks hold their assignee
    assert!(archived.released_users.is_empty());
    assert_eq!(archived.archived_tasks_count, 1);
    assert_eq!(fx.reload_task(finished.id).await.status, TaskStatus::Done);
    assert_eq!(fx.reload_user(eve.id).await.availability, Availability::Busy);
    assert!(!fx.reload_task(elsewhere.id).await.archived);
}

#[tokio::test]
async fn test_failed_archive_changes_nothing() {
    let fx = Fixture::new();
    let team = fx.team("Platform").await;
    let eve = fx.user("eve@crewline.dev", Role::Engineer, Some(team.id)).await;
    let project = fx.project(team.id, "Ingest").await;
    let task = fx.task(project.id, "Write parser").await;
    fx.engine
        .assignments()
        .assign_task(task.id, eve.id)
        .await
        .expect("assign");

    // Fails after the assignee has been released inside the unit
    fx.store.fail_on("archive_tasks_in_project");
    let err = fx
        .engine
        .archiver()
        .archive_project(project.id, team.id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));
    fx.store.clear_faults();

    assert!(!fx.reload_project(project.id).await.archived);
    let task = fx.reload_task(task.id).await;
    assert!(!task.archived);
    assert_eq!(task.status, TaskStatus::InProgress);
    assert_eq!(fx.reload_user(eve.id).await.availability, Availability::Busy);

    // And the operation succeeds once the store recovers
    fx.engine
        .archiver()
        .archive_project(project.id, team.id)
        .await
        .expect("archive after recovery");
}
