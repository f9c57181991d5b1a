//! Amazon S3 backend.
//!
//! Reads and overwrites a single object with `GetObject` / `PutObject`
//! through the S3 REST API, signing every request with AWS Signature
//! Version 4. Uses only pure-Rust dependencies (`hmac`, `sha2`) for signing.
//!
//! # Configuration
//!
//! ```toml
//! [storage]
//! location = "s3://acme-learning/progress/me.json"
//!
//! [storage.s3]
//! region = "us-east-1"
//! # endpoint_url = "http://localhost:9000"   # MinIO
//! ```
//!
//! With no `endpoint_url`, requests go to the virtual-hosted endpoint
//! `https://<bucket>.s3.<region>.amazonaws.com/<key>`. With one, they use
//! path-style addressing: `<endpoint_url>/<bucket>/<key>`.
//!
//! # Credentials
//!
//! Credentials are ambient and never stored in configuration. They are
//! resolved on every request, in this order:
//!
//! 1. `AWS_ACCESS_KEY_ID` + `AWS_SECRET_ACCESS_KEY` (+ `AWS_SESSION_TOKEN`)
//! 2. the ECS task role, when `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` is set
//! 3. the EC2 instance role via IMDSv2, unless `AWS_EC2_METADATA_DISABLED=true`
//!
//! When none of these yield credentials the request is not sent and the
//! caller gets [`StoreError::CredentialsUnavailable`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use skilltrack_core::Document;

use crate::backend::Backend;
use crate::config::S3Config;
use crate::error::StoreError;

type HmacSha256 = Hmac<Sha256>;

const METADATA_TIMEOUT: Duration = Duration::from_secs(2);
const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254";
const ECS_CREDENTIALS_HOST: &str = "http://169.254.170.2";

// ============ AWS Credentials ============

/// A set of AWS credentials.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AwsCredentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Read the standard `AWS_*` variables.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let access_key_id = non_empty("AWS_ACCESS_KEY_ID")
            .ok_or_else(|| "AWS_ACCESS_KEY_ID environment variable not set".to_string())?;
        let secret_access_key = non_empty("AWS_SECRET_ACCESS_KEY")
            .ok_or_else(|| "AWS_SECRET_ACCESS_KEY environment variable not set".to_string())?;
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: non_empty("AWS_SESSION_TOKEN"),
        })
    }
}

/// Credential document returned by both IMDS and the ECS endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RoleCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: Option<String>,
}

impl From<RoleCredentials> for AwsCredentials {
    fn from(role: RoleCredentials) -> Self {
        AwsCredentials::new(role.access_key_id, role.secret_access_key, role.token)
    }
}

/// How the backend obtains credentials.
#[derive(Debug, Clone)]
pub enum CredentialSource {
    /// Environment, then container role, then instance role.
    Ambient,
    /// Fixed credentials, for S3-compatible test endpoints.
    Static(AwsCredentials),
}

impl CredentialSource {
    async fn resolve(&self) -> Result<AwsCredentials, StoreError> {
        match self {
            CredentialSource::Static(creds) => Ok(creds.clone()),
            CredentialSource::Ambient => resolve_ambient().await,
        }
    }
}

async fn resolve_ambient() -> Result<AwsCredentials, StoreError> {
    let env_reason = match AwsCredentials::from_env() {
        Ok(creds) => return Ok(creds),
        Err(reason) => reason,
    };

    let client = reqwest::Client::builder()
        .timeout(METADATA_TIMEOUT)
        .build()
        .map_err(|e| StoreError::CredentialsUnavailable(e.to_string()))?;

    if let Ok(relative) = std::env::var("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI") {
        return container_credentials(&client, &relative)
            .await
            .map_err(|e| {
                StoreError::CredentialsUnavailable(format!("{}; container role: {}", env_reason, e))
            });
    }

    let imds_disabled = std::env::var("AWS_EC2_METADATA_DISABLED")
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if imds_disabled {
        return Err(StoreError::CredentialsUnavailable(env_reason));
    }

    let endpoint = std::env::var("AWS_EC2_METADATA_SERVICE_ENDPOINT")
        .unwrap_or_else(|_| DEFAULT_IMDS_ENDPOINT.to_string());
    instance_credentials(&client, endpoint.trim_end_matches('/'))
        .await
        .map_err(|e| StoreError::CredentialsUnavailable(format!("{}; instance role: {}", env_reason, e)))
}

async fn container_credentials(client: &reqwest::Client, relative_uri: &str) -> Result<AwsCredentials, String> {
    let url = format!("{}{}", ECS_CREDENTIALS_HOST, relative_uri);
    let resp = client
        .get(&url)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let role: RoleCredentials = resp.json().await.map_err(|e| e.to_string())?;
    Ok(role.into())
}

/// Fetch instance-role credentials through IMDSv2 (token, role name, credentials).
async fn instance_credentials(client: &reqwest::Client, endpoint: &str) -> Result<AwsCredentials, String> {
    let token = client
        .put(format!("{}/latest/api/token", endpoint))
        .header("X-aws-ec2-metadata-token-ttl-seconds", "60")
        .send()
        .await
        .map_err(|e| format!("metadata service unreachable: {}", e))?;
    if !token.status().is_success() {
        return Err(format!("metadata token request failed (HTTP {})", token.status()));
    }
    let token = token.text().await.map_err(|e| e.to_string())?;

    let base = format!("{}/latest/meta-data/iam/security-credentials/", endpoint);
    let role = client
        .get(&base)
        .header("X-aws-ec2-metadata-token", &token)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !role.status().is_success() {
        return Err(format!("no instance role attached (HTTP {})", role.status()));
    }
    let role_name = role.text().await.map_err(|e| e.to_string())?;
    let role_name = role_name.lines().next().unwrap_or("").trim().to_string();
    if role_name.is_empty() {
        return Err("no instance role attached".to_string());
    }

    let creds = client
        .get(format!("{}{}", base, role_name))
        .header("X-aws-ec2-metadata-token", &token)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    if !creds.status().is_success() {
        return Err(format!("role credentials request failed (HTTP {})", creds.status()));
    }
    let role: RoleCredentials = creds.json().await.map_err(|e| e.to_string())?;
    Ok(role.into())
}

// ============ Backend ============

/// One S3 object holding the progress document.
pub struct S3Backend {
    bucket: String,
    key: String,
    region: String,
    endpoint_url: Option<String>,
    credentials: CredentialSource,
    client: reqwest::Client,
}

/// Where a request for this object goes, and what gets signed.
struct ObjectAddress {
    url: String,
    host: String,
    canonical_uri: String,
}

impl S3Backend {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        settings: &S3Config,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let bucket = bucket.into();
        let key = key.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::RemoteUnavailable {
                location: format!("s3://{}/{}", bucket, key),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            bucket,
            key,
            region: settings.resolved_region(),
            endpoint_url: settings.endpoint_url.clone(),
            credentials: CredentialSource::Ambient,
            client,
        })
    }

    /// Use fixed credentials instead of the ambient chain.
    pub fn with_credentials(mut self, creds: AwsCredentials) -> Self {
        self.credentials = CredentialSource::Static(creds);
        self
    }

    fn location(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    fn address(&self) -> ObjectAddress {
        let encoded_key = self.key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        match &self.endpoint_url {
            Some(endpoint) => {
                // Path-style: MinIO, LocalStack, etc.
                let base = endpoint.trim_end_matches('/');
                let host = base
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .split('/')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                let canonical_uri = format!("/{}/{}", uri_encode(&self.bucket), encoded_key);
                ObjectAddress {
                    url: format!("{}{}", base, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
            None => {
                let host = format!("{}.s3.{}.amazonaws.com", self.bucket, self.region);
                let canonical_uri = format!("/{}", encoded_key);
                ObjectAddress {
                    url: format!("https://{}{}", host, canonical_uri),
                    host,
                    canonical_uri,
                }
            }
        }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        body: Option<(Vec<u8>, &str)>,
    ) -> Result<reqwest::Response, SendError> {
        let creds = self.credentials.resolve().await.map_err(SendError::Credentials)?;
        let addr = self.address();
        let (payload, content_type) = match &body {
            Some((bytes, ct)) => (bytes.as_slice(), Some(*ct)),
            None => (&[][..], None),
        };

        let headers = sign_request(
            method.as_str(),
            &addr,
            payload,
            content_type,
            &creds,
            &self.region,
            Utc::now(),
        );

        let mut req = self.client.request(method, &addr.url);
        for (name, value) in &headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if let Some((bytes, _)) = body {
            req = req.body(bytes);
        }

        req.send().await.map_err(|e| {
            if e.is_timeout() {
                SendError::Transport("request timed out".to_string())
            } else {
                SendError::Transport(e.to_string())
            }
        })
    }

    /// Overwrite the object with the whole document.
    pub async fn put(&self, doc: &Document) -> Result<(), StoreError> {
        let location = self.location();
        let body = doc.to_json().map_err(|e| StoreError::RemoteWrite {
            location: location.clone(),
            reason: e.to_string(),
        })?;
        tracing::debug!(location = %location, bytes = body.len(), "uploading progress document");

        let resp = self
            .send(reqwest::Method::PUT, Some((body, "application/json")))
            .await
            .map_err(|e| e.into_store_error(|reason| StoreError::RemoteWrite {
                location: location.clone(),
                reason,
            }))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(StoreError::RemoteWrite {
                location,
                reason: describe_failure("PutObject", status, &text),
            });
        }
        Ok(())
    }
}

/// Failure before an HTTP status was available.
enum SendError {
    Credentials(StoreError),
    Transport(String),
}

impl SendError {
    fn into_store_error(self, transport: impl FnOnce(String) -> StoreError) -> StoreError {
        match self {
            SendError::Credentials(e) => e,
            SendError::Transport(reason) => transport(reason),
        }
    }
}

#[async_trait]
impl Backend for S3Backend {
    fn name(&self) -> &str {
        "s3"
    }

    fn describe(&self) -> String {
        self.location()
    }

    async fn fetch(&self) -> Result<Document, StoreError> {
        let location = self.location();
        tracing::debug!(location = %location, "fetching progress document");

        let resp = self
            .send(reqwest::Method::GET, None)
            .await
            .map_err(|e| e.into_store_error(|reason| StoreError::RemoteUnavailable {
                location: location.clone(),
                reason,
            }))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(StoreError::RemoteUnavailable {
                location,
                reason: describe_failure("GetObject", status, &text),
            });
        }

        let bytes = resp.bytes().await.map_err(|e| StoreError::RemoteUnavailable {
            location: location.clone(),
            reason: e.to_string(),
        })?;

        Document::from_json(&bytes).map_err(|source| StoreError::RemoteParse { location, source })
    }
}

/// Summarize an S3 error response, using its XML `<Code>` when present.
fn describe_failure(op: &str, status: reqwest::StatusCode, body: &str) -> String {
    match (extract_xml_value(body, "Code"), extract_xml_value(body, "Message")) {
        (Some(code), Some(message)) => format!("S3 {} failed (HTTP {}): {}: {}", op, status, code, message),
        (Some(code), None) => format!("S3 {} failed (HTTP {}): {}", op, status, code),
        _ => format!("S3 {} failed (HTTP {})", op, status),
    }
}

// ============ AWS SigV4 Helpers ============

/// Build the headers for a signed request, including `Authorization`.
///
/// Signs `host`, `x-amz-content-sha256`, `x-amz-date`, and, when present,
/// `content-type` and `x-amz-security-token`. The `host` header itself is
/// left to the HTTP client.
fn sign_request(
    method: &str,
    addr: &ObjectAddress,
    payload: &[u8],
    content_type: Option<&str>,
    creds: &AwsCredentials,
    region: &str,
    now: DateTime<Utc>,
) -> Vec<(String, String)> {
    let date_stamp = now.format("%Y%m%d").to_string();
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let payload_hash = hex_sha256(payload);

    let mut headers = vec![
        ("host".to_string(), addr.host.clone()),
        ("x-amz-content-sha256".to_string(), payload_hash.clone()),
        ("x-amz-date".to_string(), amz_date.clone()),
    ];
    if let Some(ct) = content_type {
        headers.push(("content-type".to_string(), ct.to_string()));
    }
    if let Some(ref token) = creds.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_headers: String = headers
        .iter()
        .map(|(k, _)| k.as_str())
        .collect::<Vec<_>>()
        .join(";");

    let canonical_headers: String = headers
        .iter()
        .map(|(k, v)| format!("{}:{}\n", k, v.trim()))
        .collect();

    let canonical_request = format!(
        "{}\n{}\n\n{}\n{}\n{}",
        method, addr.canonical_uri, canonical_headers, signed_headers, payload_hash
    );

    let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, region);
    let string_to_sign = format!(
        "AWS4-HMAC-SHA256\n{}\n{}\n{}",
        amz_date,
        credential_scope,
        hex_sha256(canonical_request.as_bytes())
    );

    let signing_key = derive_signing_key(&creds.secret_access_key, &date_stamp, region, "s3");
    let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

    let authorization = format!(
        "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
        creds.access_key_id, credential_scope, signed_headers, signature
    );

    let mut out: Vec<(String, String)> = headers.into_iter().filter(|(k, _)| k != "host").collect();
    out.push(("authorization".to_string(), authorization));
    out
}

/// Compute the hex-encoded SHA-256 hash of data.
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service.
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986, leaving only `A-Z a-z 0-9 - _ . ~`.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

/// Extract the text content of an XML tag (simple, non-nested).
fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].to_string())
}
