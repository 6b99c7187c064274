//! Resolved role names and where they came from.

use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumString};
use utoipa::ToSchema;

/// How a role name was obtained.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, StrumDisplay, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NameSource {
    /// The user supplied the full name.
    Explicit,
    /// A user prefix with a generated suffix.
    Prefixed,
    /// The default prefix with a generated suffix.
    Generated,
}

impl NameSource {
    /// Whether the name ends in a generated unique suffix.
    pub fn has_generated_suffix(&self) -> bool {
        !matches!(self, NameSource::Explicit)
    }
}

/// The identity a role is created under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct RoleIdentity {
    pub name: String,
    pub name_prefix: Option<String>,
    pub source: NameSource,
}

impl Display for RoleIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{} ({})", self.name, self.source)
    }
}
