//! Worklist join tests over loaded sessions.

mod common;

use std::collections::HashMap;

use helios_panels::types::ResourceKind;
use helios_panels::{Mutation, WorklistView};

use common::fixtures::TestFixtures;
use common::harness::{linked_config, session, unlinked_config};

/// Every task points at its patient and every patient lists exactly its tasks.
fn assert_consistent(view: &WorklistView) {
    let mut expected: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in &view.tasks {
        if let Some(patient) = &task.patient {
            assert_eq!(task.task.patient_id.as_deref(), Some(patient.id()));
            assert!(patient.tasks.is_empty());
            assert_eq!(task.patient_display_name.as_deref(), Some(patient.display_name.as_str()));
        }
        if let Some(patient_id) = task.task.patient_id.as_deref() {
            expected.entry(patient_id).or_default().push(task.id());
        }
    }

    for patient in &view.patients {
        let ids: Vec<&str> = patient.tasks.iter().map(|t| t.id()).collect();
        let wanted = expected.get(patient.id()).cloned().unwrap_or_default();
        assert_eq!(ids, wanted, "tasks of {}", patient.id());
        for task in &patient.tasks {
            assert_eq!(task.task.patient_id.as_deref(), Some(patient.id()));
        }
    }
}

#[tokio::test]
async fn test_patient_load_pulls_in_their_tasks() {
    let (session, _api) = session(&TestFixtures::minimal(), linked_config(10, 100));
    session.loader(ResourceKind::Patient).load_initial().await;

    let view = session.worklist();
    assert_consistent(&view);
    assert_eq!(view.patients.len(), 2);
    assert_eq!(view.tasks.len(), 2);

    let ada = &view.patients[0];
    assert_eq!(ada.display_name, "Ada Lovelace");
    assert_eq!(ada.tasks.len(), 1);
    assert_eq!(ada.tasks[0].task.title.as_deref(), Some("Call back"));
    assert_eq!(ada.tasks[0].patient_given_name.as_deref(), Some("Ada"));
}

#[tokio::test]
async fn test_tasks_before_patients() {
    let (session, _api) = session(&TestFixtures::minimal(), unlinked_config(10, 100));

    session.loader(ResourceKind::Task).load_initial().await;
    let early = session.worklist();
    assert_eq!(early.tasks.len(), 3);
    assert!(early.tasks.iter().all(|t| t.patient.is_none()));
    assert!(early.patients.is_empty());

    session.loader(ResourceKind::Patient).load_initial().await;
    let late = session.worklist();
    assert!(late.version > early.version);
    assert_consistent(&late);

    let attached: Vec<&str> = late
        .tasks
        .iter()
        .filter(|t| t.patient.is_some())
        .map(|t| t.id())
        .collect();
    assert_eq!(attached, vec!["t-1", "t-2"]);

    // The task for an unknown patient stays unattached.
    let orphan = late.tasks.iter().find(|t| t.id() == "t-3").unwrap();
    assert!(orphan.patient_display_name.is_none());
}

#[tokio::test]
async fn test_interleaved_pages_stay_consistent() {
    let fixtures = TestFixtures::bulk(7, 3);
    let (session, _api) = session(&fixtures, unlinked_config(4, 1000));
    let patients = session.loader(ResourceKind::Patient);
    let tasks = session.loader(ResourceKind::Task);

    patients.load_initial().await;
    tasks.load_initial().await;
    assert_consistent(&session.worklist());

    while patients.load_more().await.is_applied() {
        assert_consistent(&session.worklist());
        tasks.load_more().await;
        assert_consistent(&session.worklist());
    }
    session.load_all(ResourceKind::Task).await;

    let view = session.worklist();
    assert_consistent(&view);
    assert_eq!(view.patients.len(), 7);
    assert_eq!(view.tasks.len(), 21);
    assert!(view.patients.iter().all(|p| p.tasks.len() == 3));
    assert!(view.tasks.iter().all(|t| t.patient.is_some()));
}

#[tokio::test]
async fn test_mutation_shows_in_next_view() {
    let (session, _api) = session(&TestFixtures::minimal(), linked_config(10, 100));
    session.loader(ResourceKind::Patient).load_initial().await;

    session
        .mutator()
        .apply(Mutation::ToggleTaskOwner {
            task_id: "t-1".to_string(),
            user: "amy".to_string(),
        })
        .await
        .unwrap();

    let view = session.worklist();
    assert_eq!(view.patients[0].tasks[0].task.owner.as_deref(), Some("amy"));
    assert_eq!(view.tasks[0].task.owner.as_deref(), Some("amy"));
}
