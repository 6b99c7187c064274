use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("invalid configuration: {0}")]
    Validation(String),

    #[error("failed to parse configuration: {0}")]
    Config(String),

    #[error("invalid policy document: {0}")]
    InvalidPolicy(String),

    #[error("creating role {name:?}: role already exists (after {attempts} attempt(s)): {message}")]
    AlreadyExists {
        name: String,
        attempts: u32,
        message: String,
    },

    #[error(
        "{operation} role {name:?}: timed out after {attempts} attempt(s) in {elapsed_secs}s: {last_error}"
    )]
    Timeout {
        operation: String,
        name: String,
        attempts: u32,
        elapsed_secs: u64,
        last_error: String,
    },

    #[error("{operation} role {name:?}: cancelled after {attempts} attempt(s)")]
    Cancelled {
        operation: String,
        name: String,
        attempts: u32,
    },

    #[error("{operation} role {name:?}: {message}")]
    Remote {
        operation: String,
        name: String,
        message: String,
    },
}

impl RoleError {
    /// Number of remote calls made before the error was returned, if any were.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            RoleError::AlreadyExists { attempts, .. }
            | RoleError::Timeout { attempts, .. }
            | RoleError::Cancelled { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for RoleError {
    fn from(err: serde_json::Error) -> Self {
        RoleError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_remote_text() {
        let err = RoleError::AlreadyExists {
            name: "app".to_string(),
            attempts: 1,
            message: "Role already exists".to_string(),
        };
        let display = err.to_string();
        assert!(display.contains("\"app\""));
        assert!(display.contains("Role already exists"));
        assert!(display.contains("1 attempt"));
    }

    #[test]
    fn test_timeout_display() {
        let err = RoleError::Timeout {
            operation: "creating".to_string(),
            name: "app".to_string(),
            attempts: 8,
            elapsed_secs: 120,
            last_error: "trust principal not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "creating role \"app\": timed out after 8 attempt(s) in 120s: trust principal not found"
        );
    }

    #[test]
    fn test_attempts_accessor() {
        let err = RoleError::Cancelled {
            operation: "reading".to_string(),
            name: "app".to_string(),
            attempts: 3,
        };
        assert_eq!(err.attempts(), Some(3));
        assert_eq!(err.to_string(), "reading role \"app\": cancelled after 3 attempt(s)");
        assert_eq!(RoleError::Validation("x".into()).attempts(), None);
    }

    #[test]
    fn test_serde_json_error_maps_to_config() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(RoleError::from(err), RoleError::Config(_)));
    }
}
