//! Signed HTTP transport for the OCI REST APIs.
//!
//! Every call the scanner makes goes through [`OciClient`], which attaches the
//! `date`/`host` headers (plus the body digest headers on writes), signs the
//! request with the profile's API key and decodes the JSON response.
//!
//! The per-service clients in this module implement the traits defined by the
//! scanning modules:
//!
//! - [`search::SearchClient`] - [`crate::inventory::ResourceSearch`]
//! - [`logging::LoggingManagementClient`] - [`crate::provisioning::LoggingManagement`]
//! - [`kms::KmsClient`] - [`crate::key_version::KeyManagement`]
//! - [`ingestion::LoggingIngestionClient`] - [`crate::alert::LogIngestion`]

pub mod ingestion;
pub mod kms;
pub mod logging;
pub mod search;
pub mod signer;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub use signer::RequestSigner;

/// Timeout applied to every individual HTTP request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors produced by any OCI API call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("OCI API request failed with status {status}: {code}: {message}")]
    Service {
        status: u16,
        code: String,
        message: String,
        opc_request_id: Option<String>,
    },

    #[error("failed to parse JSON response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to sign request: {0}")]
    Signing(String),

    #[error("invalid request URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ApiError {
    /// Build a service error without a request id. Mostly useful for fakes.
    pub fn service(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            code: code.into(),
            message: message.into(),
            opc_request_id: None,
        }
    }

    /// HTTP status of a service error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The resource already exists (409 Conflict).
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }
}

/// Error payload returned by OCI services on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ServiceErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Base URLs for the services the scanner talks to.
///
/// The KMS management endpoint is not listed here: it is per vault and is
/// discovered at scan time from the vault itself.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub search: String,
    pub logging: String,
    pub kms_vault: String,
    pub ingestion: String,
}

impl Endpoints {
    /// Public endpoints for an OCI region such as `us-ashburn-1`.
    pub fn for_region(region: &str) -> Self {
        Self {
            search: format!("https://query.{}.oci.oraclecloud.com", region),
            logging: format!("https://logging.{}.oci.oraclecloud.com", region),
            kms_vault: format!("https://kms.{}.oraclecloud.com", region),
            ingestion: format!("https://ingestion.logging.{}.oci.oraclecloud.com", region),
        }
    }

    /// Point every service at the same base URL (used against mock servers).
    pub fn uniform(base: &str) -> Self {
        let base = base.trim_end_matches('/').to_string();
        Self {
            search: base.clone(),
            logging: base.clone(),
            kms_vault: base.clone(),
            ingestion: base,
        }
    }
}

/// Build a URL from a base, a path and optional query parameters.
pub(crate) fn build_url(base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url, ApiError> {
    let raw = format!("{}{}", base.trim_end_matches('/'), path);
    let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl {
        url: raw.clone(),
        reason: e.to_string(),
    })?;
    if !query.is_empty() {
        url.query_pairs_mut().extend_pairs(query.iter().copied());
    }
    Ok(url)
}

/// A decoded response: the body plus the pagination token, if any.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub body: T,
    pub next_page: Option<String>,
}

struct RawResponse {
    url: String,
    headers: HeaderMap,
    body: String,
}

impl RawResponse {
    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
    }

    fn decode<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, ApiError> {
        let body = match serde_json::from_str(&self.body) {
            Ok(body) => body,
            Err(source) => {
                tracing::warn!(
                    url = %self.url,
                    opc_request_id = ?self.header("opc-request-id"),
                    "response body did not match the expected shape"
                );
                return Err(ApiError::Decode {
                    url: self.url,
                    source,
                });
            }
        };
        Ok(ApiResponse {
            body,
            next_page: self.header("opc-next-page"),
        })
    }
}

/// OCI API client holding the HTTP connection pool and the request signer.
#[derive(Clone)]
pub struct OciClient {
    client: Client,
    signer: Arc<RequestSigner>,
}

impl OciClient {
    pub fn new(signer: RequestSigner) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ApiError::Transport {
                url: String::new(),
                source,
            })?;

        Ok(Self {
            client,
            signer: Arc::new(signer),
        })
    }

    /// Signed GET, decoding the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<ApiResponse<T>, ApiError> {
        self.execute(Method::GET, url, None).await?.decode()
    }

    /// Signed POST with a JSON body, decoding the JSON response.
    pub async fn post<B, T>(&self, url: Url, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = encode_body(&url, body)?;
        self.execute(Method::POST, url, Some(payload))
            .await?
            .decode()
    }

    /// Signed POST whose response body is ignored. Returns the `opc-request-id`
    /// or `opc-work-request-id` header when the service sends one.
    pub async fn post_accepted<B>(&self, url: Url, body: &B) -> Result<Option<String>, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let payload = encode_body(&url, body)?;
        let raw = self.execute(Method::POST, url, Some(payload)).await?;
        Ok(raw
            .header("opc-work-request-id")
            .or_else(|| raw.header("opc-request-id")))
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<RawResponse, ApiError> {
        let url_str = url.to_string();
        let headers = self.signed_headers(&method, &url, body.as_deref())?;

        tracing::debug!(method = %method, url = %url_str, "sending OCI request");

        let mut request = self.client.request(method, url).headers(headers);
        if let Some(bytes) = body {
            request = request.body(bytes);
        }

        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                url: url_str.clone(),
                source,
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|source| ApiError::Transport {
                url: url_str.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(service_error(status, &headers, &text));
        }

        Ok(RawResponse {
            url: url_str,
            headers,
            body: text,
        })
    }

    fn signed_headers(
        &self,
        method: &Method,
        url: &Url,
        body: Option<&[u8]>,
    ) -> Result<HeaderMap, ApiError> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut signed: Vec<(&'static str, String)> = vec![
            ("date", date),
            ("host", host_header(url)?),
        ];

        if let Some(bytes) = body {
            let digest = BASE64_STANDARD.encode(Sha256::digest(bytes));
            signed.push(("x-content-sha256", digest));
            signed.push(("content-type", "application/json".to_string()));
            signed.push(("content-length", bytes.len().to_string()));
        }

        let authorization = self
            .signer
            .authorization(method.as_str(), &request_path(url), &signed)?;

        let mut headers = HeaderMap::new();
        for (name, value) in signed.iter().map(|(n, v)| (*n, v.as_str())) {
            insert_header(&mut headers, name, value)?;
        }
        insert_header(&mut headers, "authorization", &authorization)?;
        insert_header(&mut headers, "accept", "application/json")?;
        Ok(headers)
    }
}

fn encode_body<B: Serialize + ?Sized>(url: &Url, body: &B) -> Result<Vec<u8>, ApiError> {
    serde_json::to_vec(body).map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<(), ApiError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ApiError::Signing(format!("invalid header name {}: {}", name, e)))?;
    let value = HeaderValue::from_str(value)
        .map_err(|e| ApiError::Signing(format!("invalid value for header {}: {}", name, e)))?;
    headers.insert(name, value);
    Ok(())
}

/// `host` header value: hostname plus the port when it is not the default.
pub(crate) fn host_header(url: &Url) -> Result<String, ApiError> {
    let host = url.host_str().ok_or_else(|| ApiError::InvalidUrl {
        url: url.to_string(),
        reason: "URL has no host".to_string(),
    })?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// Path and query as they appear in the `(request-target)` pseudo header.
pub(crate) fn request_path(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

fn service_error(status: StatusCode, headers: &HeaderMap, body: &str) -> ApiError {
    let opc_request_id = headers
        .get("opc-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let parsed = serde_json::from_str::<ServiceErrorBody>(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|b| b.code.clone())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string());
    let message = parsed
        .and_then(|b| b.message)
        .unwrap_or_else(|| body.to_string());

    ApiError::Service {
        status: status.as_u16(),
        code,
        message,
        opc_request_id,
    }
}
