//! Trust policy documents.

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single policy statement, kept as raw JSON since only its structure
/// (not its policy language) matters for comparison.
pub type Statement = Map<String, Value>;

/// `Statement` may be written either as one object or as a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementList {
    One(Statement),
    Many(Vec<Statement>),
}

impl StatementList {
    pub fn into_vec(self) -> Vec<Statement> {
        match self {
            StatementList::One(statement) => vec![statement],
            StatementList::Many(statements) => statements,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "Id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Statement", default, skip_serializing_if = "Option::is_none")]
    pub statement: Option<StatementList>,
}

impl PolicyDocument {
    /// Parse policy text. Blank input is the empty document, same as `{}`.
    /// Anything other than a JSON object is rejected.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        match serde_json::from_str(text)? {
            value @ Value::Object(_) => serde_json::from_value(value),
            _ => Err(serde_json::Error::custom("policy document must be a JSON object")),
        }
    }

    /// Statements in document order; a lone statement object becomes a
    /// one-element list.
    pub fn statements(&self) -> Vec<Statement> {
        self.statement
            .clone()
            .map(StatementList::into_vec)
            .unwrap_or_default()
    }

    /// True for `""`, `{}` and any document without statements.
    pub fn is_empty(&self) -> bool {
        self.statements().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_statement_object() {
        let doc = PolicyDocument::parse(
            r#"{"Version":"2012-10-17","Statement":{"Effect":"Allow","Action":"sts:AssumeRole"}}"#,
        )
        .unwrap();
        assert_eq!(doc.version.as_deref(), Some("2012-10-17"));
        assert_eq!(doc.statements().len(), 1);
    }

    #[test]
    fn test_statement_list() {
        let doc = PolicyDocument::parse(
            r#"{"Id":"trust","Statement":[{"Sid":"a"},{"Sid":"b"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.id.as_deref(), Some("trust"));
        assert_eq!(doc.statements().len(), 2);
    }

    #[test]
    fn test_blank_and_empty_object_are_empty() {
        assert!(PolicyDocument::parse("").unwrap().is_empty());
        assert!(PolicyDocument::parse("  \n ").unwrap().is_empty());
        assert!(PolicyDocument::parse("{}").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_non_object_documents() {
        assert!(PolicyDocument::parse("[]").is_err());
        assert!(PolicyDocument::parse(r#""text""#).is_err());
        assert!(PolicyDocument::parse(r#"{"Statement":"Allow"}"#).is_err());
        assert!(PolicyDocument::parse("{not json").is_err());
    }

    #[test]
    fn test_rejects_positional_array_document() {
        let err = PolicyDocument::parse(
            r#"["2012-10-17", null, {"Effect":"Allow","Action":"a"}]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }
}
