//! Shared fixtures for integration tests: a recording in-memory transport and
//! canned extraction delegates.
#![allow(dead_code)]

use async_trait::async_trait;
use rust_anime_scraper::config::ResolverConfig;
use rust_anime_scraper::error::{ExtractionError, FetchError};
use rust_anime_scraper::extractor::StreamExtractor;
use rust_anime_scraper::http_client::{PayloadKind, RawPayload, Transport};
use rust_anime_scraper::models::{MediaKind, PlayableMedia};
use rust_anime_scraper::Resolver;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const BASE: &str = "https://anime.example/";

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path.trim_start_matches('/'))
}

enum Route {
    Html(String),
    Json(Value),
    Status(u16),
    Timeout,
}

/// Answers from a fixed route table and records every requested URL in order.
/// Unknown URLs answer 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, Route>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(mut self, path: &str, body: impl Into<String>) -> Self {
        self.routes.insert(url(path), Route::Html(body.into()));
        self
    }

    /// Route on another host, keyed by its full URL.
    pub fn html_at(mut self, full_url: &str, body: impl Into<String>) -> Self {
        self.routes.insert(full_url.to_string(), Route::Html(body.into()));
        self
    }

    pub fn json(mut self, path: &str, body: Value) -> Self {
        self.routes.insert(url(path), Route::Json(body));
        self
    }

    pub fn status(mut self, path: &str, status: u16) -> Self {
        self.routes.insert(url(path), Route::Status(status));
        self
    }

    pub fn timeout(mut self, path: &str) -> Self {
        self.routes.insert(url(path), Route::Timeout);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, path: &str) -> bool {
        let target = url(path);
        self.calls().iter().any(|c| *c == target)
    }

    pub fn position(&self, path: &str) -> Option<usize> {
        let target = url(path);
        self.calls().iter().position(|c| *c == target)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn fetch(&self, url: &str, kind: PayloadKind) -> Result<RawPayload, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.routes.get(url) {
            Some(Route::Html(body)) => Ok(match kind {
                PayloadKind::Html => RawPayload::Html(body.clone()),
                PayloadKind::Json => match serde_json::from_str(body) {
                    Ok(value) => RawPayload::Json(value),
                    Err(_) => RawPayload::HtmlFallback(body.clone()),
                },
            }),
            Some(Route::Json(value)) => Ok(match kind {
                PayloadKind::Json => RawPayload::Json(value.clone()),
                PayloadKind::Html => RawPayload::Html(value.to_string()),
            }),
            Some(Route::Status(status)) => Err(FetchError::BadStatus {
                url: url.to_string(),
                status: *status,
            }),
            Some(Route::Timeout) => Err(FetchError::Timeout { url: url.to_string() }),
            None => Err(FetchError::BadStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

pub fn resolver(transport: Arc<FakeTransport>) -> Resolver {
    Resolver::new(transport, BASE, ResolverConfig::default()).unwrap()
}

/// Delegate that always fails, counting its invocations.
#[derive(Default)]
pub struct FailingExtractor {
    pub seen: Mutex<Vec<String>>,
}

#[async_trait]
impl StreamExtractor for FailingExtractor {
    async fn extract(&self, server_url: &str) -> Result<PlayableMedia, ExtractionError> {
        self.seen.lock().unwrap().push(server_url.to_string());
        Err(ExtractionError::NoPlayableSource {
            url: server_url.to_string(),
        })
    }
}

/// Delegate that resolves every server to the same HLS manifest.
pub struct FixedExtractor(pub &'static str);

#[async_trait]
impl StreamExtractor for FixedExtractor {
    async fn extract(&self, server_url: &str) -> Result<PlayableMedia, ExtractionError> {
        Ok(PlayableMedia {
            url: self.0.to_string(),
            kind: MediaKind::Hls,
            referer: Some(server_url.to_string()),
        })
    }
}

pub fn server_token(name: &str, url: &str) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    format!("{}:{}", STANDARD.encode(name), STANDARD.encode(url))
}
