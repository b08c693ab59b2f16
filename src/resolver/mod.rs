//! Resolution orchestrator.
//!
//! One `Resolver` per process, shared read-only by every request. Each use
//! case lives in its own submodule and is a sequence of fetches and pure
//! parse steps; parsed trees are never held across an `.await`.

mod details;
mod home;
mod listing;
mod search;
mod stream;
mod tooltip;

pub use stream::select_server;

use crate::card::{cards_from_json, extract_cards_from_fragment};
use crate::config::ResolverConfig;
use crate::error::{FetchError, ResolveError};
use crate::extractor::{EmbedScanExtractor, StreamExtractor};
use crate::http_client::{RawPayload, Transport};
use crate::models::ContentCard;
use reqwest::Url;
use std::sync::Arc;

pub struct Resolver {
    transport: Arc<dyn Transport>,
    base: Url,
    config: ResolverConfig,
    extractor: Arc<dyn StreamExtractor>,
}

impl Resolver {
    /// Build a resolver for the upstream at `base_url`. The default extraction
    /// delegate scans embed pages through the same transport.
    pub fn new(
        transport: Arc<dyn Transport>,
        base_url: &str,
        config: ResolverConfig,
    ) -> Result<Self, ResolveError> {
        let mut base = Url::parse(base_url.trim())
            .map_err(|e| ResolveError::InvalidInput(format!("base url {:?}: {}", base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ResolveError::InvalidInput(format!(
                "base url {:?} is not http(s)",
                base_url
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let extractor = Arc::new(EmbedScanExtractor::new(transport.clone()));
        Ok(Self {
            transport,
            base,
            config,
            extractor,
        })
    }

    /// Replace the stream extraction delegate.
    pub fn with_extractor(mut self, extractor: Arc<dyn StreamExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Upstream URL built from path segments under the base. Segments are
    /// percent-encoded; a trailing `""` segment yields a trailing slash.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub(crate) async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        log::debug!("GET {}", url);
        self.transport.fetch_html(url.as_str()).await
    }

    pub(crate) async fn fetch_json(&self, url: &Url) -> Result<RawPayload, FetchError> {
        log::debug!("GET (json) {}", url);
        self.transport.fetch_json(url.as_str()).await
    }
}

/// Cards out of an AJAX payload: a JSON list first, then any HTML fragment the
/// payload carries.
pub(crate) fn cards_from_payload(payload: &RawPayload, base: &Url) -> Vec<ContentCard> {
    let from_json = payload
        .json()
        .map(|v| cards_from_json(v, base))
        .unwrap_or_default();
    if !from_json.is_empty() {
        return from_json;
    }
    payload
        .html()
        .map(|fragment| extract_cards_from_fragment(fragment, base))
        .unwrap_or_default()
}

/// Turn a 404/410 answer into `None`: the host was reachable and the
/// resource simply does not exist.
pub(crate) fn found<T>(result: Result<T, FetchError>) -> Result<Option<T>, FetchError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => {
            log::info!("Not found upstream: {}", e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Reject ids that cannot name an upstream resource.
pub(crate) fn require_id<'s>(what: &str, id: &'s str) -> Result<&'s str, ResolveError> {
    let id = id.trim().trim_matches('/');
    if id.is_empty() {
        return Err(ResolveError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(id)
}
