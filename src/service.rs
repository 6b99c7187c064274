//! Interface of the remote role service.
//!
//! The HTTP client lives outside this crate; it only has to implement
//! [`RoleService`]. Errors are opaque text because the service's error
//! vocabulary is not under our control.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{CreateRoleInput, RoleAttributes};

/// An error reported by the remote service, carried as its raw message.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct ServiceError {
    message: String,
}

impl ServiceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ServiceError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ServiceError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[async_trait]
pub trait RoleService: Send + Sync {
    async fn create_role(&self, input: &CreateRoleInput) -> Result<RoleAttributes, ServiceError>;

    async fn get_role(&self, name: &str) -> Result<RoleAttributes, ServiceError>;
}

#[async_trait]
impl<T: RoleService + ?Sized> RoleService for Arc<T> {
    async fn create_role(&self, input: &CreateRoleInput) -> Result<RoleAttributes, ServiceError> {
        (**self).create_role(input).await
    }

    async fn get_role(&self, name: &str) -> Result<RoleAttributes, ServiceError> {
        (**self).get_role(name).await
    }
}
