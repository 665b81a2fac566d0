//! Access Rule resource handler

use alinas_common::{AccessRuleId, Error, FileSystemType, Result};
use tracing::{debug, info};

use super::{Resource, ResourceContext};
use crate::client::RequestParams;
use crate::schema::{self, Schema, ACCESS_RULE_TYPE};
use crate::service::{self, value_to_i64, value_to_string, NAS_NOT_FOUND};
use crate::state::{
    get_int_attr, get_optional_string_attr, get_string_attr, int_value, make_state, string_value,
    DynamicValue,
};

pub struct AccessRuleResource;

/// Attributes whose change is sent with ModifyAccessRule
const MUTABLE_ATTRS: &[&str] = &[
    "rw_access_type",
    "user_access_type",
    "priority",
    "source_cidr_ip",
    "ipv6_source_cidr_ip",
];

fn state_id(state: &DynamicValue) -> Result<&str> {
    state
        .id()
        .ok_or_else(|| Error::Internal(format!("{} state has no id", ACCESS_RULE_TYPE)))
}

/// Id parts plus the region, the addressing every call after create shares
fn addressed(ctx: &ResourceContext<'_>, id: &AccessRuleId) -> RequestParams {
    let mut params = RequestParams::new();
    params
        .insert("RegionId", ctx.region())
        .insert("AccessGroupName", id.access_group_name.as_str())
        .insert("AccessRuleId", id.access_rule_id.as_str())
        .insert("FileSystemType", id.file_system_type.as_str());
    params
}

#[async_trait::async_trait]
impl Resource for AccessRuleResource {
    fn type_name() -> &'static str {
        ACCESS_RULE_TYPE
    }

    fn schema() -> Schema {
        schema::access_rule_schema()
    }

    async fn create(ctx: &ResourceContext<'_>, config: &DynamicValue) -> Result<DynamicValue> {
        let action = "CreateAccessRule";
        let group = get_string_attr(config, "access_group_name");
        let fs_type = get_optional_string_attr(config, "file_system_type")
            .unwrap_or_else(|| FileSystemType::default().to_string());

        let mut params = RequestParams::new();
        params
            .insert("RegionId", ctx.region())
            .insert("AccessGroupName", group.as_str())
            .insert_opt(
                "RWAccessType",
                get_optional_string_attr(config, "rw_access_type").as_deref(),
            )
            .insert_opt(
                "UserAccessType",
                get_optional_string_attr(config, "user_access_type").as_deref(),
            )
            .insert_opt(
                "SourceCidrIp",
                get_optional_string_attr(config, "source_cidr_ip").as_deref(),
            )
            .insert_opt(
                "Ipv6SourceCidrIp",
                get_optional_string_attr(config, "ipv6_source_cidr_ip").as_deref(),
            )
            .insert_int("Priority", get_int_attr(config, "priority", 1))
            .insert("FileSystemType", fs_type.as_str());

        let response = ctx
            .call(action, &params, ctx.timeouts.create())
            .await?;
        let rule_id = value_to_string(response.get("AccessRuleId"));
        if rule_id.is_empty() {
            return Err(Error::Internal(format!(
                "{} response carries no AccessRuleId: {}",
                action, response
            )));
        }

        let id = AccessRuleId::new(group, rule_id, fs_type);
        info!(id = %id, "Created NAS access rule");

        let created = make_state(vec![("id", string_value(id.to_string()))]);
        Self::read(ctx, &created)
            .await?
            .ok_or_else(|| Error::not_found("Nas:AccessRule", id.to_string()))
    }

    async fn read(ctx: &ResourceContext<'_>, state: &DynamicValue) -> Result<Option<DynamicValue>> {
        let (id, legacy) = AccessRuleId::parse_lenient(state_id(state)?)?;

        let object = match service::describe_access_rule(
            ctx.api,
            ctx.retry,
            ctx.timeouts.read(),
            &id,
        )
        .await
        {
            Ok(object) => object,
            Err(e) if e.is_not_found() => {
                debug!(id = %id, "Resource {} describe failed, removing from state: {}", ACCESS_RULE_TYPE, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if legacy {
            debug!(id = %id, "Normalized legacy access rule id");
        }

        let priority = value_to_i64(object.get("Priority")).unwrap_or(0);

        Ok(Some(make_state(vec![
            ("id", string_value(id.to_string())),
            ("access_group_name", string_value(&id.access_group_name)),
            ("access_rule_id", string_value(&id.access_rule_id)),
            ("file_system_type", string_value(&id.file_system_type)),
            ("source_cidr_ip", string_value(value_to_string(object.get("SourceCidrIp")))),
            (
                "ipv6_source_cidr_ip",
                string_value(value_to_string(object.get("Ipv6SourceCidrIp"))),
            ),
            ("priority", int_value(priority)),
            ("rw_access_type", string_value(value_to_string(object.get("RWAccess")))),
            ("user_access_type", string_value(value_to_string(object.get("UserAccess")))),
        ])))
    }

    async fn update(
        ctx: &ResourceContext<'_>,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue> {
        let id: AccessRuleId = state_id(state)?.parse()?;
        let schema = Self::schema();

        let changed: Vec<&str> = MUTABLE_ATTRS
            .iter()
            .copied()
            .filter(|attr| schema.has_change(state, config, attr))
            .collect();

        if !changed.is_empty() {
            let action = "ModifyAccessRule";
            let mut params = addressed(ctx, &id);
            params
                .insert("RWAccessType", get_string_attr(config, "rw_access_type"))
                .insert("UserAccessType", get_string_attr(config, "user_access_type"))
                .insert_int("Priority", get_int_attr(config, "priority", 1))
                .insert_opt(
                    "SourceCidrIp",
                    get_optional_string_attr(config, "source_cidr_ip").as_deref(),
                )
                .insert_opt(
                    "Ipv6SourceCidrIp",
                    get_optional_string_attr(config, "ipv6_source_cidr_ip").as_deref(),
                );

            ctx.call(action, &params, ctx.timeouts.update()).await?;
            info!(id = %id, changed = ?changed, "Modified NAS access rule");
        }

        Self::read(ctx, state)
            .await?
            .ok_or_else(|| Error::not_found("Nas:AccessRule", id.to_string()))
    }

    async fn delete(ctx: &ResourceContext<'_>, state: &DynamicValue) -> Result<()> {
        let action = "DeleteAccessRule";
        let id: AccessRuleId = state_id(state)?.parse()?;
        let params = addressed(ctx, &id);

        match ctx.call(action, &params, ctx.timeouts.delete()).await {
            Ok(_) => {
                info!(id = %id, "Deleted NAS access rule");
                Ok(())
            }
            Err(e) if e.is_expected(NAS_NOT_FOUND) => {
                debug!(id = %id, "Access rule already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
