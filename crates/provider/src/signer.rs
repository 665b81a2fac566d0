//! ACS3-HMAC-SHA256 request signing

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Credentials used to sign requests
#[derive(Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub security_token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("security_token", &self.security_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Everything that goes into one signature
pub struct SigningInput<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub action: &'a str,
    pub version: &'a str,
    /// UTC timestamp, `%Y-%m-%dT%H:%M:%SZ`
    pub date: &'a str,
    pub nonce: &'a str,
    pub query: &'a BTreeMap<String, String>,
    pub body: &'a [u8],
}

/// Headers to attach to the signed request
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub headers: BTreeMap<String, String>,
    pub canonical_query: String,
}

/// RFC 3986 encoding: everything except unreserved characters
pub fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

/// Sorted, encoded `k=v` pairs joined with `&`
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Sign a request and return the headers that carry the signature
pub fn sign(credentials: &Credentials, input: &SigningInput<'_>) -> SignedRequest {
    let payload_hash = sha256_hex(input.body);

    let mut headers = BTreeMap::new();
    headers.insert("host".to_string(), input.host.to_string());
    headers.insert("x-acs-action".to_string(), input.action.to_string());
    headers.insert("x-acs-version".to_string(), input.version.to_string());
    headers.insert("x-acs-date".to_string(), input.date.to_string());
    headers.insert("x-acs-signature-nonce".to_string(), input.nonce.to_string());
    headers.insert("x-acs-content-sha256".to_string(), payload_hash.clone());
    if let Some(token) = &credentials.security_token {
        headers.insert("x-acs-security-token".to_string(), token.clone());
    }

    // BTreeMap keeps header names sorted, which the canonical form requires.
    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();
    let signed_headers = headers.keys().cloned().collect::<Vec<_>>().join(";");
    let canonical_query = canonical_query(input.query);

    let canonical_request = format!(
        "{}\n/\n{}\n{}\n{}\n{}",
        input.method, canonical_query, canonical_headers, signed_headers, payload_hash
    );
    let string_to_sign = format!(
        "{}\n{}",
        SIGNATURE_ALGORITHM,
        sha256_hex(canonical_request.as_bytes())
    );

    let signature = hmac_sha256_hex(credentials.secret_key.as_bytes(), string_to_sign.as_bytes());

    headers.insert(
        "authorization".to_string(),
        format!(
            "{} Credential={},SignedHeaders={},Signature={}",
            SIGNATURE_ALGORITHM, credentials.access_key, signed_headers, signature
        ),
    );

    SignedRequest {
        headers,
        canonical_query,
    }
}

fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(secret: &str) -> Credentials {
        Credentials {
            access_key: "LTAI-test".into(),
            secret_key: secret.into(),
            security_token: None,
        }
    }

    fn query() -> BTreeMap<String, String> {
        [
            ("RegionId", "cn-hangzhou"),
            ("AccessGroupName", "vpc group"),
            ("SourceCidrIp", "10.0.0.0/8"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn sign_with(secret: &str, nonce: &str) -> SignedRequest {
        let q = query();
        sign(
            &creds(secret),
            &SigningInput {
                method: "POST",
                host: "nas.cn-hangzhou.aliyuncs.com",
                action: "CreateAccessRule",
                version: "2017-06-26",
                date: "2026-01-02T03:04:05Z",
                nonce,
                query: &q,
                body: b"",
            },
        )
    }

    #[test]
    fn test_canonical_query_is_sorted_and_encoded() {
        assert_eq!(
            canonical_query(&query()),
            "AccessGroupName=vpc%20group&RegionId=cn-hangzhou&SourceCidrIp=10.0.0.0%2F8"
        );
        assert_eq!(percent_encode("a-b_c.d~e*"), "a-b_c.d~e%2A");
    }

    #[test]
    fn test_payload_hash_of_empty_body() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_authorization_header_shape() {
        let signed = sign_with("secret", "nonce-1");
        let auth = &signed.headers["authorization"];
        assert!(auth.starts_with("ACS3-HMAC-SHA256 Credential=LTAI-test,"));
        assert!(auth.contains(
            "SignedHeaders=host;x-acs-action;x-acs-content-sha256;x-acs-date;x-acs-signature-nonce;x-acs-version,"
        ));
        let signature = auth.rsplit("Signature=").next().unwrap();
        assert_eq!(signature.len(), 64);
    }

    #[test]
    fn test_signature_is_deterministic() {
        let a = sign_with("secret", "nonce-1");
        let b = sign_with("secret", "nonce-1");
        assert_eq!(a.headers["authorization"], b.headers["authorization"]);

        let other_secret = sign_with("other", "nonce-1");
        let other_nonce = sign_with("secret", "nonce-2");
        assert_ne!(a.headers["authorization"], other_secret.headers["authorization"]);
        assert_ne!(a.headers["authorization"], other_nonce.headers["authorization"]);
    }

    #[test]
    fn test_security_token_is_signed() {
        let q = query();
        let mut c = creds("hunter2");
        c.security_token = Some("sts-token".into());
        let signed = sign(
            &c,
            &SigningInput {
                method: "POST",
                host: "nas.cn-hangzhou.aliyuncs.com",
                action: "DescribeSmbAcl",
                version: "2017-06-26",
                date: "2026-01-02T03:04:05Z",
                nonce: "n",
                query: &q,
                body: b"",
            },
        );
        assert_eq!(signed.headers["x-acs-security-token"], "sts-token");
        assert!(signed.headers["authorization"].contains(";x-acs-security-token;"));
        assert!(!format!("{:?}", c).contains("hunter2"));
    }
}
