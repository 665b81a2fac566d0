//! Describe helpers shared by the NAS resource handlers

use std::time::Duration;

use alinas_common::{AccessRuleId, Error, Result};
use serde_json::Value;

use crate::client::{NasApi, RequestParams};
use crate::config::RetryConfig;
use crate::retry::retry;

/// API codes meaning the file system or access group is gone
pub const NAS_NOT_FOUND: &[&str] = &["Forbidden.NasNotFound"];

const SMB_ACL_NOT_FOUND: &[&str] = &["Forbidden.NasNotFound", "InvalidFileSystem.NotFound"];

/// Render a JSON value the way it is stored in state
pub fn value_to_string(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Integer from a number or a numeric string
pub fn value_to_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Bool from a JSON bool or a `"true"`/`"false"` string
pub fn value_to_bool(value: Option<&Value>) -> Option<bool> {
    match value? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().to_ascii_lowercase().parse().ok(),
        _ => None,
    }
}

/// Fetch one access rule
pub async fn describe_access_rule(
    api: &dyn NasApi,
    policy: &RetryConfig,
    timeout: Duration,
    id: &AccessRuleId,
) -> Result<Value> {
    let action = "DescribeAccessRules";
    let mut params = RequestParams::new();
    params
        .insert("RegionId", api.region())
        .insert("AccessGroupName", id.access_group_name.as_str())
        .insert("AccessRuleId", id.access_rule_id.as_str())
        .insert("FileSystemType", id.file_system_type.as_str());

    let response = match retry(policy, timeout, action, || api.call(action, &params)).await {
        Ok(response) => response,
        Err(e) if e.is_expected(NAS_NOT_FOUND) => {
            return Err(Error::not_found("Nas:AccessRule", id.to_string()))
        }
        Err(e) => return Err(e),
    };

    let first = response
        .pointer("/AccessRules/AccessRule")
        .and_then(Value::as_array)
        .and_then(|rules| rules.first())
        .ok_or_else(|| Error::not_found("Nas:AccessRule", id.to_string()))?;

    // The API falls back to listing the whole group when the id is unknown.
    if value_to_string(first.get("AccessRuleId")) != id.access_rule_id {
        return Err(Error::not_found("Nas:AccessRule", id.to_string()));
    }
    Ok(first.clone())
}

/// Fetch the SMB ACL settings of a file system
pub async fn describe_smb_acl(
    api: &dyn NasApi,
    policy: &RetryConfig,
    timeout: Duration,
    file_system_id: &str,
) -> Result<Value> {
    let action = "DescribeSmbAcl";
    let mut params = RequestParams::new();
    params
        .insert("RegionId", api.region())
        .insert("FileSystemId", file_system_id);

    let response = match retry(policy, timeout, action, || api.call(action, &params)).await {
        Ok(response) => response,
        Err(e) if e.is_expected(SMB_ACL_NOT_FOUND) => {
            return Err(Error::not_found("Nas:SmbAcl", file_system_id))
        }
        Err(e) => return Err(e),
    };

    match response.get("Acl") {
        Some(acl) if acl.is_object() => Ok(acl.clone()),
        _ => Err(Error::not_found("Nas:SmbAcl", file_system_id)),
    }
}
