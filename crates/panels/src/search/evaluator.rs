//! Path expressions over row values.

use jsonpath_rust::JsonPath;
use serde_json::Value;

use crate::error::EvaluationError;

/// Evaluates an expression against a JSON value.
///
/// `Ok(None)` means the expression selected nothing.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `expression` against `value`.
    fn evaluate(&self, value: &Value, expression: &str) -> Result<Option<Value>, EvaluationError>;
}

/// JSONPath evaluator backed by `jsonpath-rust`.
///
/// The leading `$.` may be omitted, so `patient.familyName` and
/// `notes[*].author` are both accepted. One trailing comparison against a
/// literal is supported (`status = 'ready'`, `priority != 'routine'`) and
/// yields a boolean. Null selections are dropped; a selection of more than
/// one value is returned as an array.
///
/// # Examples
///
/// ```
/// use helios_panels::search::{ExpressionEvaluator, PathEvaluator};
/// use serde_json::json;
///
/// let row = json!({"notes": [{"text": "called"}, {"text": "left message"}]});
/// let evaluator = PathEvaluator;
///
/// assert_eq!(
///     evaluator.evaluate(&row, "notes[1].text").unwrap(),
///     Some(json!("left message"))
/// );
/// assert_eq!(evaluator.evaluate(&row, "missing").unwrap(), None);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct PathEvaluator;

impl ExpressionEvaluator for PathEvaluator {
    fn evaluate(&self, value: &Value, expression: &str) -> Result<Option<Value>, EvaluationError> {
        let Some((path, negate, literal)) = split_comparison(expression) else {
            return Ok(collapse(select(value, expression, expression)?));
        };

        let expected = parse_literal(literal, expression)?;
        let selected = select(value, path, expression)?;
        let equal = match selected.as_slice() {
            [] => expected.is_null(),
            [Value::Array(items)] => items.contains(&expected),
            many => many.contains(&expected),
        };
        Ok(Some(Value::Bool(equal != negate)))
    }
}

/// Whether a value counts as a match: anything except null, `false`, `0`
/// and empty strings, arrays and objects.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

fn invalid(expression: &str, message: impl Into<String>) -> EvaluationError {
    EvaluationError::InvalidExpression {
        expression: expression.to_string(),
        message: message.into(),
    }
}

/// Runs the JSONPath query and returns the non-null matches.
fn select(value: &Value, path: &str, expression: &str) -> Result<Vec<Value>, EvaluationError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(invalid(expression, "empty path"));
    }

    let query = if path.starts_with('$') {
        path.to_string()
    } else {
        format!("$.{path}")
    };
    let compiled: JsonPath = query
        .parse()
        .map_err(|err| invalid(expression, format!("{err}")))?;

    Ok(match compiled.find(value) {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter(|v| !v.is_null()).collect(),
        single => vec![single],
    })
}

fn collapse(mut selected: Vec<Value>) -> Option<Value> {
    match selected.len() {
        0 => None,
        1 => selected.pop(),
        _ => Some(Value::Array(selected)),
    }
}

/// Splits `path = literal` / `path != literal`, ignoring operators inside
/// quotes and brackets (JSONPath filters carry their own `==`).
fn split_comparison(expression: &str) -> Option<(&str, bool, &str)> {
    let mut quote = None;
    let mut depth = 0usize;
    for (i, c) in expression.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '!') if depth == 0 && expression[i + 1..].starts_with('=') => {
                return Some((&expression[..i], true, &expression[i + 2..]));
            }
            (None, '=') if depth == 0 => {
                return Some((&expression[..i], false, &expression[i + 1..]));
            }
            _ => {}
        }
    }
    None
}

fn parse_literal(literal: &str, expression: &str) -> Result<Value, EvaluationError> {
    let literal = literal.trim();
    if literal.is_empty() {
        return Err(invalid(expression, "missing comparison value"));
    }
    if let Some(inner) = literal
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
    {
        return Ok(Value::String(inner.to_string()));
    }
    serde_json::from_str(literal).map_err(|e| invalid(expression, format!("bad literal '{literal}': {e}")))
}
