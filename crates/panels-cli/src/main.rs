//! Helios worklist panels
//!
//! Loads one resource kind through the progressive cache, applies a search
//! overlay and prints the resulting rows as JSON lines.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use helios_panels::search::{ColumnFilter, SearchMode, SearchRow, SearchOverlay, SortDirective};
use helios_panels::{InMemoryApi, LoadOutcome, PanelSession, PanelsConfig, ResourceKind, init_logging};
use serde_json::{Value, json};
use tracing::{info, warn};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "panels", version, about = "Load, search and print clinical worklist panels")]
struct Cli {
    /// JSON array of records carrying `resourceType`. Built-in demo data when omitted.
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Resource kind to load (Patient, Task, Appointment, Location).
    #[arg(long, default_value = "Task")]
    kind: ResourceKind,

    /// Search term.
    #[arg(long)]
    search: Option<String>,

    /// How the search term is interpreted (literal, path).
    #[arg(long, default_value = "literal")]
    mode: SearchMode,

    /// Column filter, `column=value` or `column~text`. Repeatable.
    #[arg(long = "filter")]
    filters: Vec<ColumnFilter>,

    /// Sort column, prefixed with `-` for descending.
    #[arg(long)]
    sort: Option<String>,

    /// Keep loading pages until the source is exhausted or the cap is hit.
    #[arg(long)]
    all: bool,

    #[command(flatten)]
    config: PanelsConfig,
}

/// Reads the fixture file, or falls back to the demo records.
fn load_api(fixture: Option<&PathBuf>) -> anyhow::Result<InMemoryApi> {
    let records = match fixture {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading fixture {}", path.display()))?;
            serde_json::from_str::<Vec<Value>>(&text)
                .with_context(|| format!("parsing fixture {}", path.display()))?
        }
        None => demo_records(),
    };

    let count = records.len();
    let api = InMemoryApi::from_fixture(records).context("seeding in-memory api")?;
    info!(records = count, "Seeded in-memory api");
    Ok(api)
}

fn demo_records() -> Vec<Value> {
    vec![
        json!({"resourceType": "Patient", "id": "p-1", "givenName": "Ada", "familyName": "Lovelace", "mrn": "MRN-001"}),
        json!({"resourceType": "Patient", "id": "p-2", "givenName": "Alan", "familyName": "Turing", "mrn": "MRN-002"}),
        json!({"resourceType": "Patient", "id": "p-3", "givenName": "Grace", "familyName": "Hopper", "mrn": "MRN-003"}),
        json!({"resourceType": "Task", "id": "t-1", "patientId": "p-1", "title": "Call back with lab results", "status": "ready", "priority": "routine"}),
        json!({"resourceType": "Task", "id": "t-2", "patientId": "p-2", "title": "Refill prescription", "status": "ready", "priority": "urgent", "owner": "amy"}),
        json!({"resourceType": "Task", "id": "t-3", "patientId": "p-1", "title": "Schedule follow-up", "status": "in-progress", "priority": "routine"}),
        json!({"resourceType": "Task", "id": "t-4", "patientId": "p-3", "title": "Prior authorization", "status": "ready", "priority": "stat", "owner": "bob"}),
        json!({"resourceType": "Location", "id": "l-1", "name": "Ward 3"}),
        json!({"resourceType": "Appointment", "id": "a-1", "patientId": "p-3", "locationId": "l-1", "status": "booked"}),
    ]
}

/// Runs the overlay over `rows` and renders the survivors.
fn render<R: SearchRow + Clone>(overlay: &mut SearchOverlay, rows: &[R], version: u64) -> Vec<Value> {
    overlay
        .filtered_data(rows, version)
        .iter()
        .map(SearchRow::to_value)
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    if let Err(errors) = cli.config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    let api = load_api(cli.fixture.as_ref())?;
    let session = PanelSession::new(Arc::new(api), cli.config.clone());

    info!(
        kind = %cli.kind,
        page_size = cli.config.page_size,
        max_records = cli.config.max_records,
        linked = cli.config.linked_fetch,
        "Loading panel"
    );

    let outcome = if cli.all {
        session.load_all(cli.kind).await
    } else {
        session.loader(cli.kind).load_initial().await
    };
    if let LoadOutcome::Failed(error) = &outcome {
        anyhow::bail!("loading {} failed: {}", cli.kind, error);
    }

    let snapshot = session.snapshot(cli.kind);
    if let Some(error) = &snapshot.error {
        warn!(error = %error, "Panel loaded with errors");
    }

    let mut overlay = session.search_overlay();
    if let Some(term) = &cli.search {
        overlay.set_search_term(term.clone());
    }
    // Switching mode applies the typed term without waiting for the debounce.
    overlay.set_search_mode(cli.mode);
    overlay.set_filters(cli.filters.clone());
    overlay.set_sort(cli.sort.as_deref().map(SortDirective::parse));

    let view = session.worklist();
    let rows = match cli.kind {
        ResourceKind::Patient => render(&mut overlay, &view.patients, view.version),
        ResourceKind::Task => render(&mut overlay, &view.tasks, view.version),
        kind => render(&mut overlay, &session.cache().records(kind), session.cache().version()),
    };

    for row in &rows {
        println!("{}", serde_json::to_string(row)?);
    }

    info!(
        kind = %cli.kind,
        loaded = snapshot.loaded_count,
        total = ?snapshot.total_count,
        has_more = snapshot.has_more,
        capped = snapshot.is_capped,
        shown = rows.len(),
        "Panel rendered"
    );

    Ok(())
}
