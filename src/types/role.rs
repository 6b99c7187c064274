use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::identity::RoleIdentity;
use super::tags::TagSet;

/// Parameters for a single `create_role` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateRoleInput {
    pub name: String,
    pub role_type: String,
    pub trust_arn: String,
    pub enable_access: bool,
    #[serde(default)]
    pub tags: TagSet,
}

/// A role as reported by the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleAttributes {
    pub name: String,
    /// Remote identifier (ARN or opaque id), when the service reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role_type: String,
    pub trust_arn: String,
    pub enable_access: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_policy: Option<String>,
    /// Every tag on the remote object, inherited defaults included.
    #[serde(default)]
    pub tags: TagSet,
}

impl RoleAttributes {
    /// The identifier handed back to the lifecycle framework: the remote id
    /// when present, otherwise the name.
    pub fn identifier(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }
}

/// What gets persisted for a role after a successful create or refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RoleState {
    /// Identifier handed back to the lifecycle framework.
    pub id: String,
    pub identity: RoleIdentity,
    pub role_type: String,
    pub trust_arn: String,
    pub enable_access: bool,
    /// Normalized trust policy; empty when none is set.
    #[serde(default)]
    pub trust_policy: String,
    /// Tags the resource declared itself, ignored keys excluded.
    #[serde(default)]
    pub tags: TagSet,
    /// Every tag observed on the remote object.
    #[serde(default)]
    pub tags_all: TagSet,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_prefers_remote_id() {
        let mut attrs = RoleAttributes {
            name: "app".to_string(),
            ..Default::default()
        };
        assert_eq!(attrs.identifier(), "app");

        attrs.id = Some("arn:broker:role/app".to_string());
        assert_eq!(attrs.identifier(), "arn:broker:role/app");
    }

    #[test]
    fn test_attributes_deserialize_without_optional_fields() {
        let attrs: RoleAttributes = serde_json::from_str(
            r#"{"name":"app","role_type":"aws","trust_arn":"arn:t","enable_access":true}"#,
        )
        .unwrap();
        assert!(attrs.tags.is_empty());
        assert!(attrs.trust_policy.is_none());
    }
}
