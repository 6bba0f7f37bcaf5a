//! Search, filter and sort over rendered rows.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::types::ResourceRecord;

use super::debounce::Debouncer;
use super::evaluator::{ExpressionEvaluator, PathEvaluator, is_truthy};
use super::filter::{ColumnFilter, SortDirective};

/// How the search term is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SearchMode {
    /// Case-insensitive substring over the row's visible text.
    #[default]
    Literal,
    /// Path expression whose result must be truthy.
    PathExpression,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Literal => write!(f, "literal"),
            SearchMode::PathExpression => write!(f, "path"),
        }
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "literal" | "text" => Ok(SearchMode::Literal),
            "path" | "expression" => Ok(SearchMode::PathExpression),
            _ => Err(format!("unknown search mode: {s}")),
        }
    }
}

/// Search input as typed and as applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchState {
    /// The term as typed.
    pub raw_term: String,
    /// The term applied to rows.
    pub debounced_term: String,
    /// How the term is interpreted.
    pub mode: SearchMode,
}

/// A row the overlay can search.
pub trait SearchRow {
    /// The row as JSON, for path expressions, filters and sorting.
    fn to_value(&self) -> Value;

    /// The row's visible text, for literal search.
    fn search_text(&self) -> String;
}

impl SearchRow for ResourceRecord {
    fn to_value(&self) -> Value {
        ResourceRecord::to_value(self)
    }

    fn search_text(&self) -> String {
        collect_text(&ResourceRecord::to_value(self))
    }
}

impl<R: SearchRow> SearchRow for Arc<R> {
    fn to_value(&self) -> Value {
        R::to_value(self)
    }

    fn search_text(&self) -> String {
        R::search_text(self)
    }
}

/// Joins every string, number and boolean in `value` with spaces.
pub fn collect_text(value: &Value) -> String {
    fn walk(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::Null => {}
            Value::String(s) => out.push(s.clone()),
            Value::Number(n) => out.push(n.to_string()),
            Value::Bool(b) => out.push(b.to_string()),
            Value::Array(items) => items.iter().for_each(|v| walk(v, out)),
            Value::Object(fields) => fields.values().for_each(|v| walk(v, out)),
        }
    }

    let mut parts = Vec::new();
    walk(value, &mut parts);
    parts.join(" ")
}

#[derive(Debug, Clone, PartialEq)]
struct MemoKey {
    term: String,
    mode: SearchMode,
    filters: Vec<ColumnFilter>,
    sort: Option<SortDirective>,
    source_version: u64,
    row_count: usize,
}

struct Memo {
    key: MemoKey,
    indices: Vec<usize>,
}

/// Debounced search plus column filters and sort over one table.
///
/// The result of [`filtered_data`](Self::filtered_data) is memoized on the
/// applied term, mode, filters, sort, source version and row count. One
/// overlay serves one table; rows passed to it must come from the source
/// whose version is given.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use helios_panels::search::{SearchMode, SearchOverlay, SearchRow};
/// use serde_json::{json, Value};
///
/// #[derive(Clone)]
/// struct Row(Value);
///
/// impl SearchRow for Row {
///     fn to_value(&self) -> Value {
///         self.0.clone()
///     }
///     fn search_text(&self) -> String {
///         self.0["title"].as_str().unwrap_or_default().to_string()
///     }
/// }
///
/// let rows = vec![
///     Row(json!({"title": "Call back", "owner": "amy"})),
///     Row(json!({"title": "Refill"})),
/// ];
///
/// let mut overlay = SearchOverlay::new(Duration::ZERO);
/// overlay.set_search_term("call");
/// assert_eq!(overlay.filtered_data(&rows, 1).len(), 1);
///
/// overlay.set_search_mode(SearchMode::PathExpression);
/// overlay.set_search_term("owner");
/// assert_eq!(overlay.filtered_data(&rows, 1)[0].0["title"], "Call back");
/// ```
pub struct SearchOverlay {
    state: SearchState,
    debouncer: Debouncer<String>,
    filters: Vec<ColumnFilter>,
    sort: Option<SortDirective>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    memo: Option<Memo>,
    passes: u64,
}

impl SearchOverlay {
    /// Creates an overlay using the [`PathEvaluator`].
    pub fn new(debounce: Duration) -> Self {
        Self::with_evaluator(debounce, Arc::new(PathEvaluator))
    }

    /// Creates an overlay using a custom expression evaluator.
    pub fn with_evaluator(debounce: Duration, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self {
            state: SearchState::default(),
            debouncer: Debouncer::new(debounce),
            filters: Vec::new(),
            sort: None,
            evaluator,
            memo: None,
            passes: 0,
        }
    }

    /// Typed term, applied term and mode.
    pub fn state(&self) -> &SearchState {
        &self.state
    }

    /// The term as typed.
    pub fn search_term(&self) -> &str {
        &self.state.raw_term
    }

    /// The term currently applied to rows.
    pub fn debounced_term(&self) -> &str {
        &self.state.debounced_term
    }

    /// How the term is interpreted.
    pub fn search_mode(&self) -> SearchMode {
        self.state.mode
    }

    /// Whether a typed term is waiting for the debounce delay.
    pub fn is_searching(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Updates the typed term. It is applied after the debounce delay.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        self.state.raw_term = term.clone();
        if let Some(applied) = self.debouncer.push(term) {
            self.state.debounced_term = applied;
        }
    }

    /// Switches mode and applies the typed term immediately.
    pub fn set_search_mode(&mut self, mode: SearchMode) {
        self.state.mode = mode;
        self.debouncer.cancel();
        self.state.debounced_term = self.state.raw_term.clone();
    }

    /// Clears the typed and applied term.
    pub fn clear_search(&mut self) {
        self.debouncer.cancel();
        self.state.raw_term.clear();
        self.state.debounced_term.clear();
    }

    /// Applies the typed term if its debounce delay has passed.
    ///
    /// Returns whether the applied term changed.
    pub fn poll(&mut self) -> bool {
        match self.debouncer.poll() {
            Some(term) => {
                let changed = term != self.state.debounced_term;
                self.state.debounced_term = term;
                changed
            }
            None => false,
        }
    }

    /// Waits out the debounce delay and applies the typed term.
    pub async fn settle(&mut self) -> bool {
        match self.debouncer.settle().await {
            Some(term) => {
                let changed = term != self.state.debounced_term;
                self.state.debounced_term = term;
                changed
            }
            None => false,
        }
    }

    /// Active column filters.
    pub fn filters(&self) -> &[ColumnFilter] {
        &self.filters
    }

    /// Replaces all column filters.
    pub fn set_filters(&mut self, filters: Vec<ColumnFilter>) {
        self.filters = filters;
    }

    /// Adds a column filter. Filters are AND-combined.
    pub fn add_filter(&mut self, filter: ColumnFilter) {
        self.filters.push(filter);
    }

    /// Removes all column filters.
    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    /// Active sort, if any.
    pub fn sort(&self) -> Option<&SortDirective> {
        self.sort.as_ref()
    }

    /// Sets or clears the sort.
    pub fn set_sort(&mut self, sort: Option<SortDirective>) {
        self.sort = sort;
    }

    /// Number of times rows were actually re-filtered.
    pub fn filter_passes(&self) -> u64 {
        self.passes
    }

    /// Applies search, then filters, then sort.
    ///
    /// Rows are returned unchanged when no term, filter or sort is set.
    pub fn filtered_data<R: SearchRow + Clone>(&mut self, rows: &[R], source_version: u64) -> Vec<R> {
        self.poll();
        let key = MemoKey {
            term: self.state.debounced_term.trim().to_string(),
            mode: self.state.mode,
            filters: self.filters.clone(),
            sort: self.sort.clone(),
            source_version,
            row_count: rows.len(),
        };

        if let Some(memo) = self.memo.as_ref().filter(|m| m.key == key) {
            trace!(rows = rows.len(), "search: memo hit");
            return memo.indices.iter().filter_map(|&i| rows.get(i).cloned()).collect();
        }

        let indices = self.compute(rows, &key);
        self.passes += 1;
        debug!(
            term = %key.term,
            mode = %key.mode,
            rows = rows.len(),
            matched = indices.len(),
            "search: filtered rows"
        );

        let result = indices.iter().filter_map(|&i| rows.get(i).cloned()).collect();
        self.memo = Some(Memo { key, indices });
        result
    }

    fn compute<R: SearchRow>(&self, rows: &[R], key: &MemoKey) -> Vec<usize> {
        let needle = key.term.to_lowercase();
        let needs_value = !key.filters.is_empty()
            || key.sort.is_some()
            || (key.mode == SearchMode::PathExpression && !key.term.is_empty());

        let mut kept: Vec<(usize, Option<Value>)> = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let value = needs_value.then(|| row.to_value());

            let found = match (key.mode, key.term.is_empty()) {
                (_, true) => true,
                (SearchMode::Literal, false) => row.search_text().to_lowercase().contains(&needle),
                (SearchMode::PathExpression, false) => value
                    .as_ref()
                    .and_then(|v| self.resolve(v, &key.term))
                    .is_some_and(|v| is_truthy(&v)),
            };
            if !found {
                continue;
            }

            let passes_filters = key.filters.iter().all(|filter| {
                let resolved = value.as_ref().and_then(|v| self.resolve(v, &filter.column));
                filter.matches(resolved.as_ref())
            });
            if !passes_filters {
                continue;
            }

            let sort_value = match (&key.sort, &value) {
                (Some(sort), Some(v)) => self.resolve(v, &sort.column),
                _ => None,
            };
            kept.push((index, sort_value));
        }

        if let Some(sort) = &key.sort {
            kept.sort_by(|(_, a), (_, b)| sort.compare(a.as_ref(), b.as_ref()));
        }
        kept.into_iter().map(|(index, _)| index).collect()
    }

    /// Evaluates `expression`, treating failures as "no value".
    fn resolve(&self, value: &Value, expression: &str) -> Option<Value> {
        match self.evaluator.evaluate(value, expression) {
            Ok(result) => result,
            Err(err) => {
                debug!(error = %err, "search: expression failed, treating as no match");
                None
            }
        }
    }
}

impl Default for SearchOverlay {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}
