//! Typed provider and resource configuration.
//!
//! The lifecycle framework hands configuration over as JSON; it is
//! deserialized into these structs and validated once, so the rest of the
//! crate never looks values up by key.

use std::fmt::{Debug, Formatter, Result as FmtResult};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use utoipa::ToSchema;

use crate::create::RetryPolicy;
use crate::error::RoleError;
use crate::naming::UNIQUE_SUFFIX_LENGTH;
use crate::policy::normalize_policy;
use crate::types::{CreateRoleInput, IgnoreRule, RoleIdentity, TagSet};

/// Longest role name the service accepts.
pub const MAX_NAME_LENGTH: usize = 128;

static NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w+=,.@-]+$").expect("valid regex"));

/// How the provider authenticates against the broker service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display)]
#[serde(tag = "mode", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthMode {
    Basic {
        username: String,
        password: String,
    },
    Sts {
        access_key_id: String,
        secret_access_key: String,
        #[serde(default)]
        session_token: Option<String>,
    },
    Bearer {
        token: String,
    },
}

impl Debug for AuthMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AuthMode::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            AuthMode::Sts { access_key_id, .. } => f
                .debug_struct("Sts")
                .field("access_key_id", access_key_id)
                .finish_non_exhaustive(),
            AuthMode::Bearer { .. } => f.debug_struct("Bearer").finish_non_exhaustive(),
        }
    }
}

impl AuthMode {
    fn validate(&self) -> Result<(), RoleError> {
        let missing = match self {
            AuthMode::Basic { username, password } => {
                [("username", username), ("password", password)]
                    .into_iter()
                    .find(|(_, v)| v.is_empty())
            }
            AuthMode::Sts {
                access_key_id,
                secret_access_key,
                ..
            } => [
                ("access_key_id", access_key_id),
                ("secret_access_key", secret_access_key),
            ]
            .into_iter()
            .find(|(_, v)| v.is_empty()),
            AuthMode::Bearer { token } => [("token", token)].into_iter().find(|(_, v)| v.is_empty()),
        };
        match missing {
            Some((field, _)) => Err(RoleError::Validation(format!(
                "auth mode {self} requires {field}"
            ))),
            None => Ok(()),
        }
    }
}

/// Provider-scoped settings shared by every role in one plan/apply cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProviderConfig {
    #[serde(default)]
    pub auth: Option<AuthMode>,
    #[serde(default)]
    pub default_tags: TagSet,
    #[serde(default)]
    pub ignore_tags: IgnoreRule,
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl ProviderConfig {
    pub fn from_json(text: &str) -> Result<Self, RoleError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RoleError> {
        if let Some(auth) = &self.auth {
            auth.validate()?;
        }
        validate_tag_keys("default_tags", &self.default_tags)?;
        if self.retry.delay_ms == 0 {
            return Err(RoleError::Validation("retry.delay_ms must be positive".into()));
        }
        if self.retry.timeout_ms < self.retry.delay_ms {
            return Err(RoleError::Validation(
                "retry.timeout_ms must not be shorter than retry.delay_ms".into(),
            ));
        }
        Ok(())
    }
}

/// Desired state of one role, as declared by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub name_prefix: Option<String>,
    #[serde(default)]
    pub role_type: String,
    #[serde(default)]
    pub trust_arn: String,
    #[serde(default)]
    pub enable_access: bool,
    #[serde(default)]
    pub trust_policy: Option<String>,
    #[serde(default)]
    pub tags: TagSet,
    /// Poll the role after creation until it is readable.
    #[serde(default = "default_wait_for_read")]
    pub wait_for_read: bool,
}

fn default_wait_for_read() -> bool {
    true
}

impl RoleConfig {
    pub fn from_json(text: &str) -> Result<Self, RoleError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RoleError> {
        if self.role_type.trim().is_empty() {
            return Err(RoleError::Validation("role_type is required".into()));
        }
        if self.trust_arn.trim().is_empty() {
            return Err(RoleError::Validation("trust_arn is required".into()));
        }

        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            validate_name_chars("name", name)?;
            if name.chars().count() > MAX_NAME_LENGTH {
                return Err(RoleError::Validation(format!(
                    "name must be at most {MAX_NAME_LENGTH} characters"
                )));
            }
        }
        if let Some(prefix) = self.name_prefix.as_deref().filter(|p| !p.is_empty()) {
            validate_name_chars("name_prefix", prefix)?;
            let max = MAX_NAME_LENGTH - UNIQUE_SUFFIX_LENGTH;
            if prefix.chars().count() > max {
                return Err(RoleError::Validation(format!(
                    "name_prefix must be at most {max} characters"
                )));
            }
        }

        if let Some(policy) = &self.trust_policy {
            normalize_policy(policy)
                .map_err(|e| RoleError::Validation(format!("trust_policy: {e}")))?;
        }
        validate_tag_keys("tags", &self.tags)
    }

    /// Build the remote request for an already resolved identity.
    pub fn create_input(&self, identity: &RoleIdentity, tags: TagSet) -> CreateRoleInput {
        CreateRoleInput {
            name: identity.name.clone(),
            role_type: self.role_type.clone(),
            trust_arn: self.trust_arn.clone(),
            enable_access: self.enable_access,
            tags,
        }
    }
}

fn validate_name_chars(field: &str, value: &str) -> Result<(), RoleError> {
    if NAME_CHARS.is_match(value) {
        Ok(())
    } else {
        Err(RoleError::Validation(format!(
            "{field} {value:?} may only contain alphanumerics and +=,.@_-"
        )))
    }
}

fn validate_tag_keys(field: &str, tags: &TagSet) -> Result<(), RoleError> {
    if tags.keys().any(|k| k.trim().is_empty()) {
        return Err(RoleError::Validation(format!("{field} contains an empty key")));
    }
    Ok(())
}
