//! Outbound transport.
//!
//! One request, one answer: there is no retry at this layer. Whether a failed
//! fetch is worth another attempt (through a different endpoint) is decided by
//! the resolver's fallback chains.

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use reqwest::{Client, ClientBuilder, Proxy, Url};
use serde_json::Value;
use std::time::Duration;

const HTML_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const JSON_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

/// What the caller expects back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadKind {
    Html,
    Json,
}

/// Body of a successful response.
#[derive(Clone, Debug, PartialEq)]
pub enum RawPayload {
    Html(String),
    Json(Value),
    /// A JSON request whose body did not parse as JSON. The AJAX layer of the
    /// upstream sometimes answers with a bare HTML fragment.
    HtmlFallback(String),
}

impl RawPayload {
    pub fn json(&self) -> Option<&Value> {
        match self {
            RawPayload::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Markup carried by this payload: the page itself, a fallback body, or a
    /// JSON envelope's `html` field.
    pub fn html(&self) -> Option<&str> {
        match self {
            RawPayload::Html(s) | RawPayload::HtmlFallback(s) => Some(s.as_str()),
            RawPayload::Json(v) => v
                .get("html")
                .or_else(|| v.get("data").filter(|d| d.is_string()))
                .or_else(|| v.get("result").filter(|d| d.is_string()))
                .and_then(Value::as_str),
        }
    }

    pub fn into_html(self) -> Option<String> {
        match self {
            RawPayload::Html(s) | RawPayload::HtmlFallback(s) => Some(s),
            json @ RawPayload::Json(_) => json.html().map(str::to_string),
        }
    }
}

/// Fetches raw upstream payloads.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, kind: PayloadKind) -> Result<RawPayload, FetchError>;

    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let payload = self.fetch(url, PayloadKind::Html).await?;
        Ok(payload.into_html().unwrap_or_default())
    }

    async fn fetch_json(&self, url: &str) -> Result<RawPayload, FetchError> {
        self.fetch(url, PayloadKind::Json).await
    }
}

/// Configuration for the reqwest-backed transport
#[derive(Clone, Debug)]
pub struct HttpTransportConfig {
    pub html_timeout: Duration,
    pub json_timeout: Duration,
    pub proxy_url: Option<String>,
    pub user_agent: String,
    pub referer: String,
    pub accept_language: String,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            html_timeout: Duration::from_secs(15),
            json_timeout: Duration::from_secs(10),
            proxy_url: None,
            user_agent: crate::config::DEFAULT_USER_AGENT.to_string(),
            referer: String::new(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// HTTP transport with a fixed browser-like identity
pub struct HttpTransport {
    client: Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpTransportConfig::default())
    }

    pub fn with_config(config: HttpTransportConfig) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, v);
        }
        if !config.referer.is_empty() {
            match HeaderValue::from_str(&config.referer) {
                Ok(v) => {
                    headers.insert(REFERER, v);
                }
                Err(_) => log::warn!("Referer {:?} is not a valid header value", config.referer),
            }
        }

        let mut builder = ClientBuilder::new()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .gzip(true)
            .brotli(true)
            .connect_timeout(config.html_timeout)
            .redirect(reqwest::redirect::Policy::limited(10));

        if let Some(proxy_url) = config.proxy_url.as_deref() {
            builder = builder.proxy(Proxy::all(proxy_url)?);
            log::info!("Routing upstream requests through proxy");
        }

        let client = builder.build()?;
        Ok(Self { client, config })
    }

    pub fn timeout_for(&self, kind: PayloadKind) -> Duration {
        match kind {
            PayloadKind::Html => self.config.html_timeout,
            PayloadKind::Json => self.config.json_timeout,
        }
    }

    pub fn uses_proxy(&self) -> bool {
        self.config.proxy_url.is_some()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str, kind: PayloadKind) -> Result<RawPayload, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;

        let mut request = self.client.get(parsed).timeout(self.timeout_for(kind));
        request = match kind {
            PayloadKind::Html => request.header(ACCEPT, HTML_ACCEPT),
            PayloadKind::Json => request
                .header(ACCEPT, JSON_ACCEPT)
                .header("X-Requested-With", "XMLHttpRequest"),
        };

        let response = request.send().await.map_err(|e| {
            log::warn!("Request to {} failed: {}", url, e);
            FetchError::from_reqwest(url, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("Upstream returned {} for {}", status, url);
            return Err(FetchError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        Ok(match kind {
            PayloadKind::Html => RawPayload::Html(body),
            PayloadKind::Json => match serde_json::from_str::<Value>(&body) {
                Ok(value) => RawPayload::Json(value),
                Err(_) => {
                    log::debug!("Non-JSON body from {}, keeping it as HTML", url);
                    RawPayload::HtmlFallback(body)
                }
            },
        })
    }
}
