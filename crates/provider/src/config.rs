//! Provider configuration

use std::path::Path;
use std::time::Duration;

use alinas_common::{Error, Result, NAS_API_VERSION};
use serde::{Deserialize, Serialize};

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Region the NAS resources live in
    pub region: String,

    /// Access key id
    pub access_key: String,

    /// Access key secret
    pub secret_key: String,

    /// STS token for temporary credentials
    pub security_token: Option<String>,

    /// API endpoint override
    pub endpoint: Option<String>,

    /// NAS API version
    pub api_version: String,

    /// Per-request HTTP timeout in seconds
    pub request_timeout_secs: u64,

    /// Operation deadlines
    pub timeouts: Timeouts,

    /// Retry wait schedule
    pub retry: RetryConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            region: String::new(),
            access_key: String::new(),
            secret_key: String::new(),
            security_token: None,
            endpoint: None,
            api_version: NAS_API_VERSION.to_string(),
            request_timeout_secs: 30,
            timeouts: Timeouts::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Operation deadlines in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub create: u64,
    pub read: u64,
    pub update: u64,
    pub delete: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: 20 * 60,
            read: 5 * 60,
            update: 20 * 60,
            delete: 20 * 60,
        }
    }
}

impl Timeouts {
    pub fn create(&self) -> Duration {
        Duration::from_secs(self.create)
    }

    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read)
    }

    pub fn update(&self) -> Duration {
        Duration::from_secs(self.update)
    }

    pub fn delete(&self) -> Duration {
        Duration::from_secs(self.delete)
    }
}

/// Wait schedule between retries of a transient failure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Wait before the second attempt
    pub first_wait_ms: u64,

    /// Growth of the wait on each further attempt
    pub increment_ms: u64,

    /// Upper bound for a single wait
    pub max_wait_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            first_wait_ms: 3000,
            increment_ms: 3000,
            max_wait_ms: 30_000,
        }
    }
}

impl ProviderConfig {
    /// Load configuration from file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)
                .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| Error::Internal(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Override fields from `ALICLOUD_*` variables
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(region) = non_empty("ALICLOUD_REGION") {
            self.region = region;
        }
        if let Some(key) = non_empty("ALICLOUD_ACCESS_KEY") {
            self.access_key = key;
        }
        if let Some(secret) = non_empty("ALICLOUD_SECRET_KEY") {
            self.secret_key = secret;
        }
        if let Some(token) = non_empty("ALICLOUD_SECURITY_TOKEN") {
            self.security_token = Some(token);
        }
        if let Some(endpoint) = non_empty("ALICLOUD_NAS_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
    }

    /// Check that credentials and region are present
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("region", &self.region),
            ("access_key", &self.access_key),
            ("secret_key", &self.secret_key),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(k, _)| *k)
        .collect();

        if !missing.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "missing provider settings: {}",
                missing.join(", ")
            )));
        }
        Ok(())
    }

    /// Endpoint URL, derived from the region unless overridden
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) if endpoint.contains("://") => endpoint.trim_end_matches('/').to_string(),
            Some(host) => format!("https://{}", host.trim_end_matches('/')),
            None => format!("https://nas.{}.aliyuncs.com", self.region),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
