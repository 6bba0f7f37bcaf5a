//! Column filters and sort directives.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a column value is tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterOp {
    /// Exact match. Matches when any element of an array column equals.
    Equals(Value),
    /// Case-insensitive substring match on the column's text.
    Contains(String),
}

/// A filter on one column. Columns are path expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    /// Path expression of the column.
    pub column: String,
    /// The test applied to the column value.
    pub op: FilterOp,
}

impl ColumnFilter {
    /// Exact-match filter.
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Equals(value.into()),
        }
    }

    /// Substring filter.
    pub fn contains(column: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op: FilterOp::Contains(text.into()),
        }
    }

    /// Tests a resolved column value. A missing column never matches.
    pub fn matches(&self, resolved: Option<&Value>) -> bool {
        let Some(resolved) = resolved else {
            return false;
        };
        match &self.op {
            FilterOp::Equals(expected) => match resolved {
                Value::Array(items) => items.contains(expected),
                other => other == expected,
            },
            FilterOp::Contains(text) => {
                let needle = text.to_lowercase();
                match resolved {
                    Value::Array(items) => items.iter().any(|v| value_text(v).to_lowercase().contains(&needle)),
                    other => value_text(other).to_lowercase().contains(&needle),
                }
            }
        }
    }
}

/// Parses `column=value` (exact) or `column~text` (substring).
///
/// The value of an exact filter is read as JSON when it parses, otherwise as
/// a string, so `priority=1` matches the number and `status=ready` the string.
impl FromStr for ColumnFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s.find(['=', '~']).ok_or_else(|| {
            format!("invalid filter '{s}': expected column=value or column~text")
        })?;
        let column = s[..split].trim();
        if column.is_empty() {
            return Err(format!("invalid filter '{s}': missing column"));
        }
        let operand = &s[split + 1..];

        Ok(if s[split..].starts_with('~') {
            ColumnFilter::contains(column, operand)
        } else {
            let value = serde_json::from_str(operand).unwrap_or_else(|_| Value::String(operand.to_string()));
            ColumnFilter::equals(column, value)
        })
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortDirection {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// A sort on one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDirective {
    /// Path expression of the sort column.
    pub column: String,
    /// Sort direction.
    pub direction: SortDirection,
}

impl SortDirective {
    /// Ascending sort on `column`.
    pub fn ascending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending sort on `column`.
    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Parses a sort column (e.g., "-dueDate" for descending).
    pub fn parse(s: &str) -> Self {
        match s.strip_prefix('-') {
            Some(stripped) => Self::descending(stripped),
            None => Self::ascending(s),
        }
    }

    /// Orders two resolved column values. Missing values sort last in both
    /// directions.
    pub fn compare(&self, a: Option<&Value>, b: Option<&Value>) -> Ordering {
        let a = a.filter(|v| !v.is_null());
        let b = b.filter(|v| !v.is_null());
        match (a, b) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => {
                let ordering = compare_values(a, b);
                match self.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            }
        }
    }
}

impl fmt::Display for SortDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.direction {
            SortDirection::Ascending => write!(f, "{}", self.column),
            SortDirection::Descending => write!(f, "-{}", self.column),
        }
    }
}

/// Numbers numerically, strings case-insensitively, mixed types by type.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a)
            .cmp(&type_rank(b))
            .then_with(|| value_text(a).cmp(&value_text(b))),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
