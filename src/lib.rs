// src/lib.rs
pub use config::{AuthMode, ProviderConfig, RoleConfig};
pub use create::{CreatedRole, FailureClass, RetryPolicy, RoleCreator, classify_failure};
pub use error::RoleError;
pub use naming::{prefix_from_name, resolve_name};
pub use plan::{PlanAction, RolePlan, plan_create, plan_update};
pub use policy::{normalize_policy, policies_equivalent};
pub use reconcile::Reconciler;
pub use service::{RoleService, ServiceError};
pub use tags::{PlannedTagsAll, compute_tags_all_diff, effective_tags, remove_default_tags};
pub use types::*;

pub mod config;
pub mod create;
mod error;
pub mod metrics;
pub mod naming;
pub mod plan;
pub mod policy;
mod reconcile;
pub mod service;
pub mod tags;
mod types;

#[cfg(test)]
mod tests;
