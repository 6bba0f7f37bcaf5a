//! Optimistic mutation tests.

mod common;

use serde_json::json;

use helios_panels::error::{ApiError, MutationError};
use helios_panels::mutation::LOCAL_ID_PREFIX;
use helios_panels::types::{ResourceKind, TaskNote};
use helios_panels::Mutation;

use common::fixtures::TestFixtures;
use common::harness::{gated_session, session, unlinked_config};

fn set_status(task_id: &str, status: &str) -> Mutation {
    Mutation::SetTaskStatus {
        task_id: task_id.to_string(),
        status: status.to_string(),
    }
}

fn toggle_owner(task_id: &str, user: &str) -> Mutation {
    Mutation::ToggleTaskOwner {
        task_id: task_id.to_string(),
        user: user.to_string(),
    }
}

// ============================================================================
// Apply and reconcile
// ============================================================================

#[tokio::test]
async fn test_server_record_replaces_optimistic_write() {
    let (session, api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));
    session.loader(ResourceKind::Task).load_initial().await;
    let before = session.cache().get(ResourceKind::Task, "t-1").unwrap();

    let note = TaskNote::new("amy", "Left voicemail");
    let stored = session
        .mutator()
        .apply(Mutation::AppendNote {
            task_id: "t-1".to_string(),
            note: note.clone(),
        })
        .await
        .unwrap();

    // One revision for the optimistic write, one for the server copy.
    assert_eq!(stored.revision(), before.revision() + 2);
    let task = stored.data().as_task().unwrap();
    assert_eq!(task.notes, vec![note]);
    assert_eq!(task.title.as_deref(), Some("Call back"));

    let server = api.record(ResourceKind::Task, "t-1").unwrap();
    assert_eq!(server["notes"][0]["text"], "Left voicemail");
    assert_eq!(api.update_calls(), 1);
}

#[tokio::test]
async fn test_patch_applies_to_any_kind() {
    let (session, api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));
    session.loader(ResourceKind::Patient).load_initial().await;

    session
        .mutator()
        .apply(Mutation::Patch {
            kind: ResourceKind::Patient,
            id: "p-2".to_string(),
            patch: json!({"mrn": "MRN-0042", "givenName": null}),
        })
        .await
        .unwrap();

    let record = session.cache().get(ResourceKind::Patient, "p-2").unwrap();
    let patient = record.data().as_patient().unwrap();
    assert_eq!(patient.mrn.as_deref(), Some("MRN-0042"));
    assert_eq!(patient.given_name, None);
    assert_eq!(patient.display_name(), "Turing");
    assert!(api.record(ResourceKind::Patient, "p-2").unwrap().get("givenName").is_none());
}

#[tokio::test]
async fn test_rejected_update_restores_previous_content() {
    let (session, api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));
    session.loader(ResourceKind::Task).load_initial().await;
    let before = session.cache().get(ResourceKind::Task, "t-2").unwrap();

    api.reject_updates(Some("task is locked".to_string()));
    let err = session
        .mutator()
        .apply(set_status("t-2", "completed"))
        .await
        .unwrap_err();

    let MutationError::Rejected { kind, id, source } = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert_eq!(kind, ResourceKind::Task);
    assert_eq!(id, "t-2");
    assert!(matches!(source, ApiError::Rejected { .. }));

    // Optimistic write, then rollback: same content, two revisions later.
    let after = session.cache().get(ResourceKind::Task, "t-2").unwrap();
    assert_eq!(after.data(), before.data());
    assert_eq!(after.revision(), before.revision() + 2);
    assert_eq!(api.record(ResourceKind::Task, "t-2").unwrap()["status"], "ready");
}

#[tokio::test]
async fn test_revisions_never_repeat_across_rollback() {
    let (session, api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));
    session.loader(ResourceKind::Task).load_initial().await;
    let mut seen = vec![session.cache().get(ResourceKind::Task, "t-1").unwrap().revision()];

    api.reject_updates(Some("offline".to_string()));
    session.mutator().apply(set_status("t-1", "done")).await.unwrap_err();
    seen.push(session.cache().get(ResourceKind::Task, "t-1").unwrap().revision());

    api.reject_updates(None);
    let stored = session.mutator().apply(set_status("t-1", "x")).await.unwrap();
    seen.push(stored.revision());

    assert!(seen.windows(2).all(|pair| pair[0] < pair[1]), "revisions {seen:?}");
    assert_eq!(stored.data().as_task().unwrap().status.as_deref(), Some("x"));
}

#[tokio::test]
async fn test_uncached_record_is_not_sent() {
    let (session, api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));

    let err = session
        .mutator()
        .apply(set_status("t-1", "completed"))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        MutationError::NotCached {
            kind: ResourceKind::Task,
            id: "t-1".to_string(),
        }
    );
    assert_eq!(api.update_calls(), 0);
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_same_record_mutations_run_in_order() {
    let (session, api) = gated_session(&TestFixtures::minimal(), unlinked_config(10, 100));
    session.loader(ResourceKind::Task).load_initial().await;
    api.close();

    let first_session = session.clone();
    let first = tokio::spawn(async move { first_session.mutator().apply(toggle_owner("t-1", "amy")).await });
    api.wait_entered(2).await;

    // The optimistic write is visible while the request is held.
    let pending = session.cache().get(ResourceKind::Task, "t-1").unwrap();
    assert_eq!(pending.data().as_task().unwrap().owner.as_deref(), Some("amy"));
    assert!(session.mutator().is_in_flight(ResourceKind::Task, "t-1"));

    let second_session = session.clone();
    let second = tokio::spawn(async move { second_session.mutator().apply(toggle_owner("t-1", "amy")).await });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    // The second toggle waits for the first before computing its patch.
    assert_eq!(api.entered(), 2);

    api.release(2);
    first.await.unwrap().unwrap();
    let last = second.await.unwrap().unwrap();

    assert_eq!(last.data().as_task().unwrap().owner, None);
    assert!(api.inner().record(ResourceKind::Task, "t-1").unwrap().get("owner").is_none());
    assert!(!session.mutator().is_in_flight(ResourceKind::Task, "t-1"));
}

#[tokio::test]
async fn test_different_records_mutate_concurrently() {
    let (session, api) = gated_session(&TestFixtures::minimal(), unlinked_config(10, 100));
    session.loader(ResourceKind::Task).load_initial().await;
    api.close();

    let a = session.clone();
    let first = tokio::spawn(async move { a.mutator().apply(set_status("t-1", "completed")).await });
    let b = session.clone();
    let second = tokio::spawn(async move { b.mutator().apply(set_status("t-2", "completed")).await });

    // Both requests reach the API before either is released.
    api.wait_entered(3).await;
    api.release(2);
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    for id in ["t-1", "t-2"] {
        let record = session.cache().get(ResourceKind::Task, id).unwrap();
        assert_eq!(record.data().as_task().unwrap().status.as_deref(), Some("completed"));
    }
}

// ============================================================================
// Create
// ============================================================================

#[tokio::test]
async fn test_create_swaps_local_id_for_server_id() {
    let (session, api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));
    session.loader(ResourceKind::Task).load_initial().await;

    let created = session
        .mutator()
        .create(
            ResourceKind::Task,
            json!({"patientId": "p-1", "title": "Book transport", "status": "draft"}),
        )
        .await
        .unwrap();

    assert!(!created.id().starts_with(LOCAL_ID_PREFIX));
    assert!(api.record(ResourceKind::Task, created.id()).is_some());

    let ids: Vec<String> = session
        .cache()
        .records(ResourceKind::Task)
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert_eq!(ids.len(), 4);
    assert_eq!(ids.last().map(String::as_str), Some(created.id()));
    assert!(ids.iter().all(|id| !id.starts_with(LOCAL_ID_PREFIX)));

    let view = session.worklist();
    let task = view.tasks.iter().find(|t| t.id() == created.id()).unwrap();
    assert_eq!(task.task.title.as_deref(), Some("Book transport"));
}

#[tokio::test]
async fn test_rejected_create_leaves_no_trace() {
    let (session, api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));
    session.loader(ResourceKind::Task).load_initial().await;
    api.reject_creates(Some("patient archived".to_string()));

    let err = session
        .mutator()
        .create(ResourceKind::Task, json!({"patientId": "p-2", "title": "Refill"}))
        .await
        .unwrap_err();
    let MutationError::Rejected { id, .. } = err else {
        panic!("expected rejection, got {err:?}");
    };
    assert!(id.starts_with(LOCAL_ID_PREFIX));
    assert!(!session.cache().contains(ResourceKind::Task, &id));
    assert_eq!(session.cache().len(ResourceKind::Task), 3);
    assert_eq!(api.count(ResourceKind::Task), 3);
}

#[tokio::test]
async fn test_create_rejects_non_object_fields() {
    let (session, api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));

    let err = session
        .mutator()
        .create(ResourceKind::Task, json!(["not", "a", "record"]))
        .await
        .unwrap_err();
    assert!(matches!(err, MutationError::Record(_)));
    assert_eq!(api.create_calls(), 0);
    assert!(session.cache().is_empty(ResourceKind::Task));
}
