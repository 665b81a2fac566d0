//! Resource Implementations
//!
//! Implements the CRUD operations for each resource type.

pub mod access_rule;
pub mod smb_acl_attachment;

use std::time::Duration;

use alinas_common::Result;
use serde_json::Value;

use crate::client::{NasApi, RequestParams};
use crate::config::{RetryConfig, Timeouts};
use crate::retry::retry;
use crate::schema::{Diagnostic, Schema};
use crate::state::DynamicValue;

/// Everything a handler needs to talk to the API
pub struct ResourceContext<'a> {
    pub api: &'a dyn NasApi,
    pub timeouts: &'a Timeouts,
    pub retry: &'a RetryConfig,
}

impl<'a> ResourceContext<'a> {
    pub fn new(api: &'a dyn NasApi, timeouts: &'a Timeouts, retry: &'a RetryConfig) -> Self {
        Self { api, timeouts, retry }
    }

    pub fn region(&self) -> &str {
        self.api.region()
    }

    /// Call `action`, retrying transient failures until `timeout`
    pub async fn call(
        &self,
        action: &str,
        params: &RequestParams,
        timeout: Duration,
    ) -> Result<Value> {
        let api = self.api;
        retry(self.retry, timeout, action, || api.call(action, params)).await
    }
}

/// Trait for resource operations
#[async_trait::async_trait]
pub trait Resource {
    /// Resource type name
    fn type_name() -> &'static str;

    fn schema() -> Schema;

    /// Check a configuration beyond what the schema expresses
    fn validate(config: &DynamicValue) -> Vec<Diagnostic> {
        Self::schema().validate(config)
    }

    /// Create a new resource
    async fn create(ctx: &ResourceContext<'_>, config: &DynamicValue) -> Result<DynamicValue>;

    /// Read an existing resource; `None` when it no longer exists
    async fn read(ctx: &ResourceContext<'_>, state: &DynamicValue) -> Result<Option<DynamicValue>>;

    /// Update an existing resource
    async fn update(
        ctx: &ResourceContext<'_>,
        state: &DynamicValue,
        config: &DynamicValue,
    ) -> Result<DynamicValue>;

    /// Delete a resource
    async fn delete(ctx: &ResourceContext<'_>, state: &DynamicValue) -> Result<()>;
}
