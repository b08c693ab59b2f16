use super::{require_id, Resolver};
use crate::error::ResolveError;
use crate::helpers::{absolute_url, meaningful, slug_from_href};
use crate::markup::{select_first, selector, self_or_descendant};
use crate::models::{ServerCategory, ServerDescriptor, StreamBundle, StreamResponse};
use crate::server_decoder::decode_in;
use reqwest::Url;
use scraper::{ElementRef, Html};
use std::collections::HashSet;

const TOKEN_ATTRS: &[&str] = &["data-embed", "data-server", "data-hash", "data-em"];
const TOKEN_NODES: &str = "[data-embed], [data-server], [data-hash], [data-em], select.mirror option[value]";
const CATEGORY_ATTRS: &[&str] = &["data-type", "data-category", "data-lang"];
const IFRAME_SELECTORS: &[&str] = &[
    "#iframe-embed",
    ".player-embed iframe",
    ".video-content iframe",
    "#player iframe",
    "iframe",
];
const NEXT_SELECTORS: &[&str] = &[
    ".next-episode",
    "a.nav-next",
    ".naveps .nvs.rght a",
    "a[rel=\"next\"]",
];
const PREV_SELECTORS: &[&str] = &[
    ".prev-episode",
    "a.nav-prev",
    ".naveps .nvs:not(.rght) a",
    "a[rel=\"prev\"]",
];
const NAV_ATTR: &str = "data-open-nav-episode";

impl Resolver {
    /// Servers and navigation of one episode, plus a best-effort playable
    /// source for the preferred server. `server` names a server the caller
    /// wants ahead of the configured preferences.
    pub async fn stream(
        &self,
        episode_id: &str,
        server: Option<&str>,
    ) -> Result<StreamResponse, ResolveError> {
        let episode_id = require_id("episode id", episode_id)?;
        let url = self.endpoint(&["episode", episode_id, ""]);
        let html = self.fetch_page(&url).await?;
        let bundle = parse_watch_page(episode_id, &html, &self.base);

        let mut preferences: Vec<String> = server.map(str::to_string).into_iter().collect();
        preferences.extend(self.config.preferred_servers.iter().cloned());

        let selected = select_server(&bundle.servers, &preferences)
            .cloned()
            .or_else(|| {
                bundle.iframe_url.clone().map(|url| ServerDescriptor {
                    name: "default".to_string(),
                    url,
                    is_embed: true,
                    category: ServerCategory::Unknown,
                })
            });

        let stream = match &selected {
            Some(chosen) => match self.extractor.extract(&chosen.url).await {
                Ok(media) => Some(media),
                Err(e) => {
                    log::warn!(
                        "Extraction failed for {} via server '{}': {}",
                        episode_id,
                        chosen.name,
                        e
                    );
                    None
                }
            },
            None => {
                log::info!("No servers found for episode {}", episode_id);
                None
            }
        };

        Ok(StreamResponse {
            bundle,
            selected_server: selected,
            stream,
        })
    }
}

/// Pick a server by case-insensitive name match against `preferences`, in
/// preference order, falling back to the first server.
pub fn select_server<'s>(
    servers: &'s [ServerDescriptor],
    preferences: &[String],
) -> Option<&'s ServerDescriptor> {
    preferences
        .iter()
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .find_map(|p| servers.iter().find(|s| s.name.to_lowercase().contains(&p)))
        .or_else(|| servers.first())
}

pub(crate) fn parse_watch_page(episode_id: &str, html: &str, base: &Url) -> StreamBundle {
    let document = Html::parse_document(html);
    let root = document.root_element();

    StreamBundle {
        episode_id: episode_id.to_string(),
        iframe_url: select_first(root, IFRAME_SELECTORS)
            .and_then(|el| el.value().attr("src").or_else(|| el.value().attr("data-src")))
            .and_then(|src| absolute_url(base, src))
            .map(|u| u.to_string()),
        servers: extract_servers(root),
        next_episode_id: nav_target(root, NEXT_SELECTORS, base),
        prev_episode_id: nav_target(root, PREV_SELECTORS, base),
        requires_extraction: true,
    }
}

fn extract_servers(root: ElementRef<'_>) -> Vec<ServerDescriptor> {
    let Some(nodes) = selector(TOKEN_NODES) else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    root.select(&nodes)
        .filter_map(|node| {
            let token = TOKEN_ATTRS
                .iter()
                .find_map(|a| node.value().attr(a))
                .or_else(|| node.value().attr("value"))?
                .trim();
            if token.is_empty() {
                return None;
            }
            let decoded = decode_in(token, category_of(node));
            if decoded.is_none() {
                log::debug!("Dropping undecodable server token {:?}", token);
            }
            decoded
        })
        .filter(|s| seen.insert((s.url.clone(), s.category)))
        .collect()
}

/// Category from the node or its closest marked container: an explicit
/// `data-type`-style attribute, or a server-list class such as `servers-dub`.
fn category_of(node: ElementRef<'_>) -> ServerCategory {
    std::iter::once(node)
        .chain(node.ancestors().filter_map(ElementRef::wrap))
        .find_map(|el| {
            let v = el.value();
            let from_attr = CATEGORY_ATTRS
                .iter()
                .filter_map(|a| v.attr(a))
                .map(ServerCategory::from_marker)
                .find(|c| *c != ServerCategory::Unknown);
            let from_class = || {
                v.attr("class")
                    .filter(|c| c.contains("server"))
                    .map(ServerCategory::from_marker)
                    .filter(|c| *c != ServerCategory::Unknown)
            };
            from_attr.or_else(from_class)
        })
        .unwrap_or_default()
}

/// Episode id behind a next/prev control, read from the control itself or
/// the link it wraps. An explicit nav attribute is authoritative, so
/// `"undefined"` there means no neighbour.
fn nav_target(root: ElementRef<'_>, candidates: &[&str], base: &Url) -> Option<String> {
    let el = select_first(root, candidates)?;
    let nav = self_or_descendant(el, &format!("[{}]", NAV_ATTR)).and_then(|n| n.value().attr(NAV_ATTR));
    if let Some(value) = nav {
        return meaningful(value).map(|v| {
            if v.contains('/') {
                slug_from_href(base, &v).unwrap_or(v)
            } else {
                v
            }
        });
    }
    self_or_descendant(el, "[href]")
        .and_then(|a| a.value().attr("href"))
        .and_then(meaningful)
        .and_then(|href| slug_from_href(base, &href))
}
