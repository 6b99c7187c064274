//! Entry points the resource-lifecycle framework calls for one role.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ProviderConfig, RoleConfig};
use crate::create::RoleCreator;
use crate::error::RoleError;
use crate::metrics::MetricsSink;
use crate::plan::{RolePlan, plan_create, plan_update};
use crate::policy::normalize_policy;
use crate::service::RoleService;
use crate::tags::remove_default_tags;
use crate::types::{NameSource, RoleAttributes, RoleIdentity, RoleState};

/// Plans and creates roles for one provider configuration.
///
/// The provider's default tags and ignore rule are fixed for the lifetime of
/// a reconciler, matching one plan/apply cycle.
pub struct Reconciler<S> {
    provider: ProviderConfig,
    creator: RoleCreator<S>,
}

impl<S: RoleService> Reconciler<S> {
    pub fn new(provider: ProviderConfig, service: S) -> Result<Self, RoleError> {
        provider.validate()?;
        let creator = RoleCreator::new(service, provider.retry);
        Ok(Self { provider, creator })
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.creator = self.creator.with_metrics_sink(sink);
        self
    }

    pub fn provider(&self) -> &ProviderConfig {
        &self.provider
    }

    /// Plan a create (no prior state) or an update.
    pub fn plan(&self, config: &RoleConfig, prior: Option<&RoleState>) -> Result<RolePlan, RoleError> {
        match prior {
            Some(prior) => plan_update(config, &self.provider, prior),
            None => plan_create(config, &self.provider),
        }
    }

    /// Create the role described by `config`.
    ///
    /// Returns the state to persist only once the remote create call has
    /// succeeded; any error means the role was not created.
    pub async fn create(
        &self,
        config: &RoleConfig,
        cancel: &CancellationToken,
    ) -> Result<RoleState, RoleError> {
        let plan = plan_create(config, &self.provider)?;
        let input = config.create_input(&plan.identity, plan.tags.clone());
        let created = self.creator.create(&input, cancel).await?;

        let attributes = if config.wait_for_read {
            match self.creator.wait_for_role(&input.name, cancel).await {
                Ok(attributes) => attributes,
                Err(err) => {
                    // The role exists; report it from the create response.
                    warn!(
                        event = "Create",
                        phase = "ReadBack",
                        name = input.name,
                        error = %err
                    );
                    created.attributes
                }
            }
        } else {
            created.attributes
        };

        let state = self.state_from(plan.identity, attributes, &plan.trust_policy);
        info!(
            event = "Create",
            phase = "State",
            id = state.id,
            name = state.identity.name,
            tags = state.tags.len(),
            tags_all = state.tags_all.len()
        );
        Ok(state)
    }

    /// Read an existing role by name, e.g. for import or refresh.
    pub async fn read(&self, name: &str, source: NameSource) -> Result<RoleState, RoleError> {
        let attributes = self
            .creator
            .service()
            .get_role(name)
            .await
            .map_err(|e| RoleError::Remote {
                operation: "reading".to_string(),
                name: name.to_string(),
                message: e.to_string(),
            })?;

        debug!(event = "Read", phase = "Fetched", name);
        Ok(self.state_from(RoleIdentity::from_stored(name, source), attributes, ""))
    }

    fn state_from(
        &self,
        identity: RoleIdentity,
        attributes: RoleAttributes,
        planned_policy: &str,
    ) -> RoleState {
        let trust_policy = match attributes.trust_policy.as_deref() {
            Some(remote) => normalize_policy(remote).unwrap_or_else(|err| {
                warn!(event = "Read", phase = "TrustPolicy", error = %err);
                remote.to_string()
            }),
            None => planned_policy.to_string(),
        };
        let tags = remove_default_tags(&attributes.tags, &self.provider.default_tags)
            .ignore(&self.provider.ignore_tags);

        RoleState {
            id: attributes.identifier().to_string(),
            identity,
            role_type: attributes.role_type,
            trust_arn: attributes.trust_arn,
            enable_access: attributes.enable_access,
            trust_policy,
            tags,
            tags_all: attributes.tags,
        }
    }
}
