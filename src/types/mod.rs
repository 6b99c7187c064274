//! Value types shared by the reconciliation components.
//!
//! Everything here is plain data: tag sets, policy documents, resolved
//! identities, remote role attributes and create attempt records. None of
//! these types hold shared mutable state.

mod attempt;
mod identity;
mod policy_document;
mod role;
mod tags;

pub use attempt::{AttemptOutcome, CreateAttempt};
pub use identity::{NameSource, RoleIdentity};
pub use policy_document::{PolicyDocument, Statement, StatementList};
pub use role::{CreateRoleInput, RoleAttributes, RoleState};
pub use tags::{IgnoreRule, TagSet};
