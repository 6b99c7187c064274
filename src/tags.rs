//! Merging of provider default tags with resource tags.
//!
//! Three tag sets exist for every resource: the provider's default tags, the
//! tags declared on the resource itself, and the effective set (`tags_all`)
//! which is always derived from the other two.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::TagSet;

/// What the plan should announce for `tags_all` before the remote call runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "tags", rename_all = "snake_case")]
pub enum PlannedTagsAll {
    /// The value is fully known.
    Known(TagSet),
    /// The remote side decides; read the value back after apply.
    Recompute,
    /// Nothing to announce.
    Unchanged,
}

/// Defaults overlaid with resource tags. On a key collision the resource
/// value wins.
pub fn effective_tags(default_tags: &TagSet, resource_tags: &TagSet) -> TagSet {
    let mut merged = default_tags.clone();
    for (key, value) in resource_tags.iter() {
        merged.insert(key, value);
    }
    merged
}

/// Recover the tags a resource declared itself from everything observed on
/// the remote object.
///
/// A default is only stripped when both key and value match; a differing
/// value means the resource overrides that default and keeps it.
pub fn remove_default_tags(all_tags: &TagSet, default_tags: &TagSet) -> TagSet {
    let mut own = all_tags.clone();
    for (key, default_value) in default_tags.iter() {
        if own.get(key) == Some(default_value) {
            own.remove(key);
        }
    }
    own
}

/// Decide the planned `tags_all`.
///
/// `effective_tags` and `prior_tags_all` are expected to be ignore-filtered
/// already. `changed` reports any other detected change to `tags_all`.
pub fn compute_tags_all_diff(
    effective_tags: &TagSet,
    prior_tags_all: &TagSet,
    changed: bool,
) -> PlannedTagsAll {
    let planned = if !effective_tags.is_empty() {
        PlannedTagsAll::Known(effective_tags.clone())
    } else if !prior_tags_all.is_empty() || changed {
        PlannedTagsAll::Recompute
    } else {
        PlannedTagsAll::Unchanged
    };

    debug!(
        event = "Plan",
        phase = "TagsAll",
        effective = effective_tags.len(),
        prior = prior_tags_all.len(),
        changed,
        planned = ?planned
    );
    planned
}
