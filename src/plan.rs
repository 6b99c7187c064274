//! Plan-phase projection: what a role will look like before any remote call.

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tracing::debug;

use crate::config::{ProviderConfig, RoleConfig};
use crate::error::RoleError;
use crate::policy::{normalize_policy, policies_equivalent};
use crate::tags::{PlannedTagsAll, compute_tags_all_diff, effective_tags};
use crate::types::{NameSource, RoleIdentity, RoleState, TagSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlanAction {
    Create,
    /// The remote service has no update call for these attributes.
    Replace,
    Update,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolePlan {
    pub action: PlanAction,
    pub identity: RoleIdentity,
    /// Full effective tag set the remote object should carry, ignored keys
    /// included.
    pub tags: TagSet,
    pub tags_all: PlannedTagsAll,
    /// Tags to add or change on an existing role.
    pub tags_to_set: TagSet,
    /// Tags to drop from an existing role. Never contains ignored keys.
    pub tags_to_remove: TagSet,
    /// Normalized trust policy to store.
    pub trust_policy: String,
    pub trust_policy_changed: bool,
}

/// Effective tags with ignored keys dropped, as used for diffs.
fn diff_tags(config: &RoleConfig, provider: &ProviderConfig) -> TagSet {
    let rule = &provider.ignore_tags;
    effective_tags(&provider.default_tags.ignore(rule), &config.tags.ignore(rule))
}

fn desired_policy(config: &RoleConfig) -> &str {
    config.trust_policy.as_deref().unwrap_or("")
}

/// Plan a role that does not exist yet.
pub fn plan_create(config: &RoleConfig, provider: &ProviderConfig) -> Result<RolePlan, RoleError> {
    config.validate()?;

    let identity = RoleIdentity::resolve(config.name.as_deref(), config.name_prefix.as_deref());
    let tags = effective_tags(&provider.default_tags, &config.tags);
    let tags_all = compute_tags_all_diff(&diff_tags(config, provider), &TagSet::new(), false);
    let trust_policy = normalize_policy(desired_policy(config))?;

    debug!(
        event = "Plan",
        phase = "Create",
        name = identity.name,
        tags = tags.len(),
        trust_policy = !trust_policy.is_empty()
    );

    Ok(RolePlan {
        action: PlanAction::Create,
        identity,
        tags_to_set: tags.clone(),
        tags,
        tags_all,
        tags_to_remove: TagSet::new(),
        trust_policy_changed: false,
        trust_policy,
    })
}

/// Plan changes to an existing role.
///
/// Trust policy differences that are only textual are suppressed. Tag keys
/// matched by the provider's ignore rule are never scheduled for removal.
pub fn plan_update(
    config: &RoleConfig,
    provider: &ProviderConfig,
    prior: &RoleState,
) -> Result<RolePlan, RoleError> {
    config.validate()?;

    if needs_replacement(config, prior) {
        let mut plan = plan_create(config, provider)?;
        plan.action = PlanAction::Replace;
        debug!(event = "Plan", phase = "Replace", name = prior.identity.name);
        return Ok(plan);
    }

    let desired = diff_tags(config, provider);
    let current = prior.tags_all.ignore(&provider.ignore_tags);
    let tags_to_remove = current.removed(&desired);
    let tags_to_set = current.updated(&desired);
    let tags_changed = !tags_to_remove.is_empty() || !tags_to_set.is_empty();
    let tags_all = compute_tags_all_diff(&desired, &current, tags_changed);

    let trust_policy_changed = !policies_equivalent(&prior.trust_policy, desired_policy(config));
    let trust_policy = if trust_policy_changed {
        normalize_policy(desired_policy(config))?
    } else {
        prior.trust_policy.clone()
    };

    let action = if tags_changed || trust_policy_changed {
        PlanAction::Update
    } else {
        PlanAction::NoOp
    };

    debug!(
        event = "Plan",
        phase = "Update",
        name = prior.identity.name,
        action = %action,
        tags_to_set = tags_to_set.len(),
        tags_to_remove = tags_to_remove.len(),
        trust_policy_changed
    );

    Ok(RolePlan {
        action,
        identity: prior.identity.clone(),
        tags: effective_tags(&provider.default_tags, &config.tags),
        tags_all,
        tags_to_set,
        tags_to_remove,
        trust_policy,
        trust_policy_changed,
    })
}

fn needs_replacement(config: &RoleConfig, prior: &RoleState) -> bool {
    let name_changed = match config.name.as_deref().filter(|n| !n.is_empty()) {
        Some(name) => name != prior.identity.name,
        None => match config.name_prefix.as_deref().filter(|p| !p.is_empty()) {
            Some(prefix) => prior.identity.name_prefix.as_deref() != Some(prefix),
            // Dropping the prefix moves the role back to a default-prefixed name.
            None => prior.identity.source != NameSource::Generated,
        },
    };

    name_changed
        || config.role_type != prior.role_type
        || config.trust_arn != prior.trust_arn
        || config.enable_access != prior.enable_access
}
