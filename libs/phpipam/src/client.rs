//! HTTP client for the phpIPAM REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, Method};
use serde_json::Value;
use tracing::debug;

use crate::envelope;
use crate::error::{PhpIpamError, Result};

/// Per-call timeout used when the caller does not pick one
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(7000);

/// Header phpIPAM reads the app code token from
pub const TOKEN_HEADER: &str = "phpipam-token";

/// Where and how to reach one phpIPAM application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiTarget {
    pub base_url: String,
    pub app_id: String,
    pub app_code: String,
}

impl ApiTarget {
    pub fn new(
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        app_code: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            app_id: app_id.into(),
            app_code: app_code.into(),
        }
    }
}

/// Options for a single call
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub method: Method,
    /// Extra headers sent after the token header
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
    /// Treat "nothing found" answers as an empty list
    pub allow_not_found: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            method: Method::GET,
            headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            allow_not_found: false,
        }
    }
}

impl FetchOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn allow_not_found(mut self) -> Self {
        self.allow_not_found = true;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Build `<base_url>/<app_id>/<endpoint>` with single separators
pub fn build_url(target: &ApiTarget, endpoint: &str) -> Result<String> {
    let base = target.base_url.trim().trim_end_matches('/');
    if base.is_empty() {
        return Err(PhpIpamError::Configuration(
            "phpIPAM base URL is not configured".to_string(),
        ));
    }
    let app_id = target.app_id.trim().trim_matches('/');
    if app_id.is_empty() {
        return Err(PhpIpamError::Configuration(
            "phpIPAM app id is not configured".to_string(),
        ));
    }
    let endpoint = endpoint.trim_start_matches('/');
    Ok(format!("{}/{}/{}", base, app_id, endpoint))
}

/// Source of phpIPAM data
///
/// Implemented by [`PhpIpamClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait PhpIpamApi: Send + Sync {
    /// Perform one call and return the unwrapped payload
    async fn fetch(
        &self,
        target: &ApiTarget,
        endpoint: &str,
        options: &FetchOptions,
    ) -> Result<Value>;
}

/// phpIPAM client backed by a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct PhpIpamClient {
    http: Client,
}

impl PhpIpamClient {
    /// Create a new client
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("ipamsrv/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PhpIpamError::Configuration(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self { http })
    }

    /// Wrap an existing `reqwest::Client`
    pub fn from_client(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PhpIpamApi for PhpIpamClient {
    async fn fetch(
        &self,
        target: &ApiTarget,
        endpoint: &str,
        options: &FetchOptions,
    ) -> Result<Value> {
        let url = build_url(target, endpoint)?;

        let mut request = self
            .http
            .request(options.method.clone(), &url)
            .header(TOKEN_HEADER, target.app_code.as_str())
            .header(ACCEPT, "application/json");
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        // Send and body read share one deadline; on expiry the future is dropped
        let exchange = async {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match tokio::time::timeout(options.timeout, exchange).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => return Err(PhpIpamError::Transport(e.to_string())),
            Err(_) => {
                return Err(PhpIpamError::Timeout {
                    endpoint: endpoint.to_string(),
                    timeout_ms: options.timeout.as_millis() as u64,
                })
            },
        };

        debug!(
            method = %options.method,
            url = %url,
            status,
            bytes = body.len(),
            "phpIPAM response"
        );

        envelope::decode(status, &body, options.allow_not_found)
    }
}
