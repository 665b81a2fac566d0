//! Client for the NAS management API

use std::collections::BTreeMap;

use alinas_common::{ApiError, Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::signer::{self, Credentials, SigningInput};

/// Parameters that must never reach the logs
const REDACTED_PARAMS: &[&str] = &["Keytab"];

/// Request parameters of an RPC-style action, kept in canonical order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn insert_bool(&mut self, key: &str, value: bool) -> &mut Self {
        self.insert(key, value.to_string())
    }

    pub fn insert_int(&mut self, key: &str, value: i64) -> &mut Self {
        self.insert(key, value.to_string())
    }

    /// Insert only when the value is present and non-empty
    pub fn insert_opt(&mut self, key: &str, value: Option<&str>) -> &mut Self {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            self.insert(key, v);
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    /// Copy suitable for logging
    pub fn redacted(&self) -> BTreeMap<&str, &str> {
        self.0
            .iter()
            .map(|(k, v)| {
                if REDACTED_PARAMS.contains(&k.as_str()) {
                    (k.as_str(), "<redacted>")
                } else {
                    (k.as_str(), v.as_str())
                }
            })
            .collect()
    }
}

/// Access to the NAS management API
#[async_trait]
pub trait NasApi: Send + Sync {
    /// Region every request is scoped to
    fn region(&self) -> &str;

    /// Invoke one API action and return the decoded response body
    async fn call(&self, action: &str, params: &RequestParams) -> Result<Value>;
}

/// HTTP client for the NAS management API
pub struct NasClient {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    region: String,
    api_version: String,
    credentials: Credentials,
}

impl NasClient {
    /// Build a client from provider configuration
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let endpoint = config.endpoint_url();
        let url = reqwest::Url::parse(&endpoint)
            .map_err(|e| Error::InvalidConfig(format!("endpoint {}: {}", endpoint, e)))?;
        let host = match (url.host_str(), url.port()) {
            (Some(h), Some(p)) => format!("{}:{}", h, p),
            (Some(h), None) => h.to_string(),
            (None, _) => {
                return Err(Error::InvalidConfig(format!("endpoint {} has no host", endpoint)))
            }
        };

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("alinas/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("http client: {}", e)))?;

        Ok(Self {
            http,
            endpoint,
            host,
            region: config.region.clone(),
            api_version: config.api_version.clone(),
            credentials: Credentials {
                access_key: config.access_key.clone(),
                secret_key: config.secret_key.clone(),
                security_token: config.security_token.clone(),
            },
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl NasApi for NasClient {
    fn region(&self) -> &str {
        &self.region
    }

    async fn call(&self, action: &str, params: &RequestParams) -> Result<Value> {
        let date = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let nonce = uuid::Uuid::new_v4().to_string();

        let signed = signer::sign(
            &self.credentials,
            &SigningInput {
                method: "POST",
                host: &self.host,
                action,
                version: &self.api_version,
                date: &date,
                nonce: &nonce,
                query: params.as_map(),
                body: b"",
            },
        );

        let url = format!("{}/?{}", self.endpoint, signed.canonical_query);
        let mut request = self.http.post(&url);
        for (name, value) in &signed.headers {
            // reqwest derives Host from the URL.
            if name != "host" {
                request = request.header(name.as_str(), value.as_str());
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Transport(format!("POST {}: {}", self.endpoint, e)))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("reading {} response: {}", action, e)))?;

        if !status.is_success() {
            let mut api_error = serde_json::from_str::<ApiError>(&text).unwrap_or_else(|_| ApiError {
                status: 0,
                code: String::new(),
                message: text.clone(),
                request_id: String::new(),
            });
            api_error.status = status.as_u16();
            debug!(action, request = ?params.redacted(), error = %api_error, "NAS API call failed");
            return Err(Error::Api(api_error));
        }

        let body: Value = serde_json::from_str(&text)?;
        debug!(action, request = ?params.redacted(), response = %body, "NAS API call");
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    type Seen = Arc<Mutex<Vec<(HeaderMap, HashMap<String, String>)>>>;

    async fn handler(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> impl IntoResponse {
        let action = headers
            .get("x-acs-action")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        seen.lock().push((headers, query));

        match action.as_str() {
            "CreateAccessRule" => (
                StatusCode::OK,
                Json(serde_json::json!({"RequestId": "r-1", "AccessRuleId": "12"})),
            ),
            "DescribeSmbAcl" => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "RequestId": "r-2",
                    "Code": "ServiceUnavailable",
                    "Message": "The request has failed due to a temporary failure of the server."
                })),
            ),
            _ => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "RequestId": "r-3",
                    "Code": "Forbidden.NasNotFound",
                    "Message": "Specified NAS does not exist."
                })),
            ),
        }
    }

    async fn spawn_server() -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/", post(handler))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    fn client_for(endpoint: &str) -> NasClient {
        NasClient::new(&ProviderConfig {
            region: "cn-hangzhou".into(),
            access_key: "ak".into(),
            secret_key: "sk".into(),
            endpoint: Some(endpoint.to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_request_params() {
        let mut params = RequestParams::new();
        params
            .insert("RegionId", "cn-hangzhou")
            .insert_int("Priority", 5)
            .insert_bool("EncryptData", true)
            .insert_opt("SourceCidrIp", Some(""))
            .insert_opt("Ipv6SourceCidrIp", None)
            .insert("Keytab", "BQIAAAB");

        assert_eq!(params.get("Priority"), Some("5"));
        assert_eq!(params.get("EncryptData"), Some("true"));
        assert!(!params.contains("SourceCidrIp"));
        assert!(!params.contains("Ipv6SourceCidrIp"));
        assert_eq!(params.redacted()["Keytab"], "<redacted>");
        assert_eq!(params.redacted()["RegionId"], "cn-hangzhou");
    }

    #[test]
    fn test_new_rejects_incomplete_config() {
        assert!(NasClient::new(&ProviderConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_call_sends_signed_request() {
        let (endpoint, seen) = spawn_server().await;
        let client = client_for(&endpoint);

        let mut params = RequestParams::new();
        params
            .insert("RegionId", client.region())
            .insert("AccessGroupName", "my group");
        let body = client.call("CreateAccessRule", &params).await.unwrap();
        assert_eq!(body["AccessRuleId"], "12");

        let seen = seen.lock();
        let (headers, query) = &seen[0];
        assert_eq!(query["AccessGroupName"], "my group");
        assert_eq!(headers["x-acs-version"], "2017-06-26");
        assert!(headers["authorization"]
            .to_str()
            .unwrap()
            .starts_with("ACS3-HMAC-SHA256 Credential=ak,"));
    }

    #[tokio::test]
    async fn test_call_maps_api_errors() {
        let (endpoint, _) = spawn_server().await;
        let client = client_for(&endpoint);
        let params = RequestParams::new();

        let err = client.call("DescribeSmbAcl", &params).await.unwrap_err();
        assert!(err.is_retryable());

        let err = client.call("DeleteAccessRule", &params).await.unwrap_err();
        assert!(err.is_expected(&["Forbidden.NasNotFound"]));
        match err {
            Error::Api(api) => {
                assert_eq!(api.status, 404);
                assert_eq!(api.request_id, "r-3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{}", addr));
        let err = client.call("DescribeAccessRules", &RequestParams::new()).await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.is_retryable());
    }
}
