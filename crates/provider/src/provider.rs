//! NAS Provider Implementation
//!
//! Routes schema, plan and apply requests to the resource handler that owns
//! the requested type.

use std::sync::Arc;

use alinas_common::{Error, Result};
use tracing::{debug, info};

use crate::client::{NasApi, NasClient};
use crate::config::ProviderConfig;
use crate::resources::access_rule::AccessRuleResource;
use crate::resources::smb_acl_attachment::SmbAclAttachmentResource;
use crate::resources::{Resource, ResourceContext};
use crate::schema::{
    self, Diagnostic, PlanAction, PlannedChange, Schema, ACCESS_RULE_TYPE,
    SMB_ACL_ATTACHMENT_TYPE,
};
use crate::state::{make_state, string_value, DynamicValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    AccessRule,
    SmbAclAttachment,
}

fn kind(type_name: &str) -> Result<Kind> {
    match type_name {
        ACCESS_RULE_TYPE => Ok(Kind::AccessRule),
        SMB_ACL_ATTACHMENT_TYPE => Ok(Kind::SmbAclAttachment),
        other => Err(Error::InvalidConfig(format!(
            "unknown resource type: {}",
            other
        ))),
    }
}

/// Run `$body` with `$r` bound to the handler type of `$kind`
macro_rules! with_resource {
    ($kind:expr, $r:ident => $body:expr) => {
        match $kind {
            Kind::AccessRule => {
                type $r = AccessRuleResource;
                $body
            }
            Kind::SmbAclAttachment => {
                type $r = SmbAclAttachmentResource;
                $body
            }
        }
    };
}

/// Schema of one resource type
pub fn resource_schema(type_name: &str) -> Result<Schema> {
    Ok(with_resource!(kind(type_name)?, R => R::schema()))
}

/// Check a configuration without touching the API
pub fn validate_resource_config(type_name: &str, config: &DynamicValue) -> Result<Vec<Diagnostic>> {
    debug!("ValidateResourceConfig called for {}", type_name);
    Ok(with_resource!(kind(type_name)?, R => R::validate(config)))
}

pub fn plan_resource_change(
    type_name: &str,
    prior: &DynamicValue,
    proposed: &DynamicValue,
) -> Result<PlannedChange> {
    let change = resource_schema(type_name)?.plan(prior, proposed);
    debug!(
        action = %change.action,
        replace = ?change.requires_replace,
        "Planned change for {}",
        type_name
    );
    Ok(change)
}

/// NAS resource provider
pub struct NasProvider {
    api: Arc<dyn NasApi>,
    config: ProviderConfig,
}

impl NasProvider {
    /// Build a provider talking to the real API
    pub fn new(config: ProviderConfig) -> Result<Self> {
        let client = NasClient::new(&config)?;
        info!(endpoint = client.endpoint(), region = %config.region, "Configured NAS provider");
        Ok(Self::with_api(Arc::new(client), config))
    }

    /// Build a provider over any API implementation
    pub fn with_api(api: Arc<dyn NasApi>, config: ProviderConfig) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn context(&self) -> ResourceContext<'_> {
        ResourceContext::new(self.api.as_ref(), &self.config.timeouts, &self.config.retry)
    }

    pub fn schemas(&self) -> Vec<Schema> {
        schema::all_schemas()
    }

    pub fn schema(&self, type_name: &str) -> Result<Schema> {
        resource_schema(type_name)
    }

    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &DynamicValue,
    ) -> Result<Vec<Diagnostic>> {
        validate_resource_config(type_name, config)
    }

    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: &DynamicValue,
        proposed: &DynamicValue,
    ) -> Result<PlannedChange> {
        plan_resource_change(type_name, prior, proposed)
    }

    /// Drive the remote object from `prior` to `planned`
    ///
    /// A null `prior` creates, a null `planned` deletes and returns null.
    /// A change to a force-new attribute deletes then recreates.
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior: &DynamicValue,
        planned: &DynamicValue,
    ) -> Result<DynamicValue> {
        info!("ApplyResourceChange called for {}", type_name);
        let kind = kind(type_name)?;
        let ctx = self.context();
        with_resource!(kind, R => apply::<R>(&ctx, prior, planned).await)
    }

    /// Refresh `current` from the API; `None` once the object is gone
    pub async fn read_resource(
        &self,
        type_name: &str,
        current: &DynamicValue,
    ) -> Result<Option<DynamicValue>> {
        info!("ReadResource called for {}", type_name);
        let kind = kind(type_name)?;
        if current.is_null() {
            return Ok(None);
        }
        let ctx = self.context();
        with_resource!(kind, R => R::read(&ctx, current).await)
    }

    /// `prior` as the API reports it now; null once the object is gone
    pub async fn refresh_prior(&self, type_name: &str, prior: &DynamicValue) -> Result<DynamicValue> {
        Ok(self
            .read_resource(type_name, prior)
            .await?
            .unwrap_or_default())
    }

    /// Adopt an existing object by id
    pub async fn import_resource_state(&self, type_name: &str, id: &str) -> Result<DynamicValue> {
        info!(id, "ImportResourceState called for {}", type_name);
        let kind = kind(type_name)?;
        let ctx = self.context();
        let state = make_state(vec![("id", string_value(id))]);
        with_resource!(kind, R => R::read(&ctx, &state).await)?
            .ok_or_else(|| Error::not_found(type_name, id))
    }
}

/// Planned states carry computed values, which a configuration may not set
fn reject_invalid<R: Resource>(planned: &DynamicValue) -> Result<()> {
    let mut config = planned.clone();
    for attr in R::schema().attributes.iter().filter(|a| a.is_computed_only()) {
        config.set(attr.name, DynamicValue::Null);
    }

    let errors: Vec<String> = R::validate(&config)
        .into_iter()
        .filter(Diagnostic::is_error)
        .map(|d| d.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::InvalidConfig(errors.join("; ")))
    }
}

async fn apply<R: Resource>(
    ctx: &ResourceContext<'_>,
    prior: &DynamicValue,
    planned: &DynamicValue,
) -> Result<DynamicValue> {
    match (prior.is_null(), planned.is_null()) {
        (true, true) => Ok(DynamicValue::Null),
        (false, true) => {
            R::delete(ctx, prior).await?;
            Ok(DynamicValue::Null)
        }
        (true, false) => {
            reject_invalid::<R>(planned)?;
            R::create(ctx, planned).await
        }
        (false, false) => {
            reject_invalid::<R>(planned)?;
            let change = R::schema().plan(prior, planned);
            if change.action == PlanAction::Replace {
                info!(
                    replace = ?change.requires_replace,
                    "Replacing {}",
                    R::type_name()
                );
                R::delete(ctx, prior).await?;
                R::create(ctx, &change.planned_state).await
            } else {
                R::update(ctx, prior, &change.planned_state).await
            }
        }
    }
}
