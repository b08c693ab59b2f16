//! Stream extraction delegate.
//!
//! Turns a chosen server's opaque embed URL into something a player can load.
//! The resolver treats this step as best-effort: a failure here still yields a
//! stream response, just without a resolved source.

use crate::error::ExtractionError;
use crate::http_client::Transport;
use crate::models::{MediaKind, PlayableMedia};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

static HLS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["'](https?:(?:\\?/){2}[^"'\s<>]+?\.m3u8[^"'\s<>]*)["']"#).expect("static regex")
});
static MP4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["'](https?:(?:\\?/){2}[^"'\s<>]+?\.mp4[^"'\s<>]*)["']"#).expect("static regex")
});
static FILE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?:file|src)\s*:\s*["'](https?:[^"']+)["']"#).expect("static regex")
});
static SOURCE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<source\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).expect("static regex")
});

#[async_trait]
pub trait StreamExtractor: Send + Sync {
    async fn extract(&self, server_url: &str) -> Result<PlayableMedia, ExtractionError>;
}

/// Fetches the embed page and scans it for an HLS manifest or an MP4 file.
pub struct EmbedScanExtractor {
    transport: Arc<dyn Transport>,
}

impl EmbedScanExtractor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl StreamExtractor for EmbedScanExtractor {
    async fn extract(&self, server_url: &str) -> Result<PlayableMedia, ExtractionError> {
        if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
            return Err(ExtractionError::Unsupported(server_url.to_string()));
        }

        if let Some(kind) = media_kind_of(server_url) {
            return Ok(PlayableMedia {
                url: server_url.to_string(),
                kind,
                referer: None,
            });
        }

        let page = self.transport.fetch_html(server_url).await?;
        log::debug!("Scanning {} bytes of embed page {}", page.len(), server_url);

        scan_embed_page(&page)
            .map(|(url, kind)| PlayableMedia {
                url,
                kind,
                referer: Some(server_url.to_string()),
            })
            .ok_or_else(|| ExtractionError::NoPlayableSource {
                url: server_url.to_string(),
            })
    }
}

fn media_kind_of(url: &str) -> Option<MediaKind> {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    if path.ends_with(".m3u8") {
        Some(MediaKind::Hls)
    } else if path.ends_with(".mp4") {
        Some(MediaKind::Mp4)
    } else {
        None
    }
}

/// Find the best media reference in an embed page. HLS beats MP4; an explicit
/// player `file:` entry or `<source>` tag comes last.
pub fn scan_embed_page(page: &str) -> Option<(String, MediaKind)> {
    let first = |re: &Regex| {
        re.captures(page)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().replace("\\/", "/"))
    };

    if let Some(url) = first(&HLS_RE) {
        return Some((url, MediaKind::Hls));
    }
    if let Some(url) = first(&MP4_RE) {
        return Some((url, MediaKind::Mp4));
    }
    first(&FILE_RE)
        .or_else(|| first(&SOURCE_TAG_RE))
        .filter(|u| u.starts_with("http"))
        .map(|url| {
            let kind = media_kind_of(&url).unwrap_or(MediaKind::Embed);
            (url, kind)
        })
}
