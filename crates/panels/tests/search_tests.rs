//! Search overlay tests over worklist rows.

mod common;

use std::sync::Arc;
use std::time::Duration;

use helios_panels::search::{ColumnFilter, SearchMode, SortDirective};
use helios_panels::types::ResourceKind;
use helios_panels::{Mutation, PanelSession, PanelsConfig, WorklistTask};

use common::fixtures::TestFixtures;
use common::harness::{linked_config, session};

async fn loaded(config: PanelsConfig) -> Arc<PanelSession> {
    let (session, _api) = session(&TestFixtures::minimal(), config);
    session.loader(ResourceKind::Patient).load_initial().await;
    session.loader(ResourceKind::Task).load_initial().await;
    session
}

fn ids(rows: &[WorklistTask]) -> Vec<&str> {
    rows.iter().map(|t| t.id()).collect()
}

// ============================================================================
// Debounce
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_typing_burst_filters_once() {
    let session = loaded(PanelsConfig {
        search_debounce_ms: 300,
        ..linked_config(10, 100)
    })
    .await;
    let view = session.worklist();
    let mut overlay = session.search_overlay();

    assert_eq!(overlay.filtered_data(&view.tasks, view.version).len(), 3);
    let baseline = overlay.filter_passes();

    for term in ["r", "re", "ref"] {
        overlay.set_search_term(term);
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(overlay.filtered_data(&view.tasks, view.version).len(), 3);
    }
    assert!(overlay.is_searching());
    assert_eq!(overlay.filter_passes(), baseline);
    assert_eq!(overlay.search_term(), "ref");
    assert_eq!(overlay.debounced_term(), "");

    tokio::time::advance(Duration::from_millis(300)).await;
    let rows = overlay.filtered_data(&view.tasks, view.version);
    assert_eq!(ids(&rows), vec!["t-2"]);
    assert_eq!(overlay.filter_passes(), baseline + 1);
    assert!(!overlay.is_searching());

    // Same inputs hit the memo.
    overlay.filtered_data(&view.tasks, view.version);
    assert_eq!(overlay.filter_passes(), baseline + 1);
}

#[tokio::test(start_paused = true)]
async fn test_settle_applies_pending_term() {
    let session = loaded(PanelsConfig {
        search_debounce_ms: 300,
        ..linked_config(10, 100)
    })
    .await;
    let mut overlay = session.search_overlay();

    overlay.set_search_term("lovelace");
    assert!(overlay.settle().await);
    assert_eq!(overlay.debounced_term(), "lovelace");

    let view = session.worklist();
    assert_eq!(ids(&overlay.filtered_data(&view.tasks, view.version)), vec!["t-1"]);
}

// ============================================================================
// Search modes
// ============================================================================

#[tokio::test]
async fn test_literal_search_matches_patient_names() {
    let session = loaded(linked_config(10, 100)).await;
    let view = session.worklist();
    let mut overlay = session.search_overlay();

    overlay.set_search_term("TURING");
    assert_eq!(ids(&overlay.filtered_data(&view.tasks, view.version)), vec!["t-2"]);

    overlay.set_search_term("   ");
    assert_eq!(overlay.filtered_data(&view.tasks, view.version).len(), 3);
}

#[tokio::test]
async fn test_path_expressions() {
    let session = loaded(linked_config(10, 100)).await;
    let view = session.worklist();
    let mut overlay = session.search_overlay();

    overlay.set_search_term("owner");
    overlay.set_search_mode(SearchMode::PathExpression);
    assert_eq!(overlay.search_mode(), SearchMode::PathExpression);
    assert_eq!(ids(&overlay.filtered_data(&view.tasks, view.version)), vec!["t-2"]);

    overlay.set_search_term("patient.givenName = 'Ada'");
    assert_eq!(ids(&overlay.filtered_data(&view.tasks, view.version)), vec!["t-1"]);

    // Malformed expressions match nothing.
    overlay.set_search_term("patient.givenName[");
    assert!(overlay.filtered_data(&view.tasks, view.version).is_empty());
}

// ============================================================================
// Filters and sort
// ============================================================================

#[tokio::test]
async fn test_filters_and_sort_compose_with_search() {
    let session = loaded(linked_config(10, 100)).await;
    let view = session.worklist();
    let mut overlay = session.search_overlay();

    overlay.set_sort(Some(SortDirective::parse("rank")));
    assert_eq!(
        ids(&overlay.filtered_data(&view.tasks, view.version)),
        vec!["t-2", "t-1", "t-3"]
    );

    overlay.set_sort(Some(SortDirective::parse("-rank")));
    assert_eq!(
        ids(&overlay.filtered_data(&view.tasks, view.version)),
        vec!["t-1", "t-2", "t-3"]
    );

    overlay.add_filter("status=ready".parse::<ColumnFilter>().unwrap());
    assert_eq!(
        ids(&overlay.filtered_data(&view.tasks, view.version)),
        vec!["t-1", "t-2"]
    );

    overlay.add_filter(ColumnFilter::contains("patientFamilyName", "love"));
    assert_eq!(ids(&overlay.filtered_data(&view.tasks, view.version)), vec!["t-1"]);

    overlay.clear_filters();
    overlay.set_sort(None);
    assert_eq!(
        ids(&overlay.filtered_data(&view.tasks, view.version)),
        vec!["t-1", "t-2", "t-3"]
    );
}

#[tokio::test]
async fn test_cache_change_invalidates_memo() {
    let session = loaded(linked_config(10, 100)).await;
    let mut overlay = session.search_overlay();
    overlay.set_search_term("amy");

    let view = session.worklist();
    assert_eq!(ids(&overlay.filtered_data(&view.tasks, view.version)), vec!["t-2"]);
    let passes = overlay.filter_passes();

    session
        .mutator()
        .apply(Mutation::ToggleTaskOwner {
            task_id: "t-1".to_string(),
            user: "amy".to_string(),
        })
        .await
        .unwrap();

    let view = session.worklist();
    assert_eq!(ids(&overlay.filtered_data(&view.tasks, view.version)), vec!["t-1", "t-2"]);
    assert_eq!(overlay.filter_passes(), passes + 1);
}
