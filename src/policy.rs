//! Semantic comparison of trust policy documents.
//!
//! Two documents are equivalent when they hold the same *set* of statements.
//! Inside a statement every array is compared as a set as well, and an array
//! with a single element is the same as that element on its own, so
//! `"Service": "a"` and `"Service": ["a"]` compare equal. `Version` and `Id`
//! do not take part in the comparison.

use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RoleError;
use crate::types::PolicyDocument;

/// Diff-suppression predicate for trust policies.
///
/// Never fails: text that does not parse as a policy document is reported as
/// not equivalent to anything, itself included.
pub fn policies_equivalent(a: &str, b: &str) -> bool {
    let (a_doc, b_doc) = match (PolicyDocument::parse(a), PolicyDocument::parse(b)) {
        (Ok(a_doc), Ok(b_doc)) => (a_doc, b_doc),
        (a_res, b_res) => {
            debug!(
                event = "Compare",
                phase = "Parse",
                left_error = a_res.err().map(|e| e.to_string()),
                right_error = b_res.err().map(|e| e.to_string()),
            );
            return false;
        }
    };

    let equivalent = statement_set(&a_doc) == statement_set(&b_doc);
    debug!(event = "Compare", phase = "Result", equivalent);
    equivalent
}

/// Render policy text in canonical form for storing in state.
///
/// Keys and arrays are sorted, statements deduplicated; blank input, `{}`
/// and statement-less documents all normalize to the empty string.
pub fn normalize_policy(text: &str) -> Result<String, RoleError> {
    let doc = PolicyDocument::parse(text).map_err(|e| RoleError::InvalidPolicy(e.to_string()))?;
    if doc.is_empty() {
        return Ok(String::new());
    }

    let mut out = Map::new();
    if let Some(id) = &doc.id {
        out.insert("Id".to_string(), Value::String(id.clone()));
    }
    out.insert("Statement".to_string(), Value::Array(statement_set(&doc)));
    if let Some(version) = &doc.version {
        out.insert("Version".to_string(), Value::String(version.clone()));
    }

    serde_json::to_string(&Value::Object(out)).map_err(|e| RoleError::InvalidPolicy(e.to_string()))
}

/// Canonical, sorted and deduplicated statements of a document.
fn statement_set(doc: &PolicyDocument) -> Vec<Value> {
    doc.statements()
        .into_iter()
        .map(|statement| canonicalize(&Value::Object(statement)))
        .sorted_by_cached_key(Value::to_string)
        .dedup()
        .collect()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .sorted_by(|a, b| a.0.cmp(b.0))
                .map(|(key, inner)| (key.clone(), canonicalize(inner)))
                .collect(),
        ),
        Value::Array(items) => {
            let mut items: Vec<Value> = items
                .iter()
                .map(canonicalize)
                .sorted_by_cached_key(Value::to_string)
                .dedup()
                .collect();
            if items.len() == 1 {
                items.remove(0)
            } else {
                Value::Array(items)
            }
        }
        other => other.clone(),
    }
}
