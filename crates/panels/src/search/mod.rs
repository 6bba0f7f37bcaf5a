//! Client-side search, filtering and sorting.
//!
//! A [`SearchOverlay`] sits between loaded rows and the table that renders
//! them. Typing is debounced; column filters and sort apply on every pass.
//! Searching never triggers a fetch.

mod debounce;
mod evaluator;
mod filter;
mod overlay;

pub use debounce::Debouncer;
pub use evaluator::{ExpressionEvaluator, PathEvaluator, is_truthy};
pub use filter::{ColumnFilter, FilterOp, SortDirection, SortDirective};
pub use overlay::{SearchMode, SearchOverlay, SearchRow, SearchState, collect_text};
