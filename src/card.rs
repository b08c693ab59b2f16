//! Card extractor.
//!
//! One field-extraction routine shared by every listing grid (home sections,
//! search results, category pages, recommendations). Call sites only supply
//! the selectors that locate the card roots.

use crate::helpers::{
    absolute_url, detect_audio_tags, non_empty, normalize_whitespace, slug_from_url, strip_tags,
};
use crate::markup::{
    attr_deep, background_image_url, first_attr, first_text, select_all_first_match,
    self_or_descendant, text_of,
};
use crate::models::ContentCard;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html};
use serde_json::Value;

static KIND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(TV|Movie|OVA|ONA|Special|Music)\b").expect("static regex"));
static EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:EP|Episode)s?\.?\s*(\d+(?:\.\d+)?(?:\s*/\s*\d+)?)").expect("static regex")
});
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d+\s*(?:h\s*\d+\s*)?m(?:in)?)\b").expect("static regex"));

const TITLE_ATTRS_EN: &[&str] = &["data-en-title", "data-title-en"];
const TITLE_HEADINGS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", ".title", ".film-name", ".entry-title",
];
const TITLE_ATTR_GENERIC: &str = "title";
const TITLE_ATTRS_NATIVE: &[&str] = &["data-jp-title", "data-jname", "data-native-title"];
const IMAGE_ATTRS: &[&str] = &["data-src", "src", "data-lazy-src"];
const LAZY_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-bg"];
const KIND_SELECTORS: &[&str] = &[".type", ".item-type", ".fdi-type", ".tick-type"];
const EPISODE_SELECTORS: &[&str] = &[".episode", ".ep", ".tick-eps", ".episodes", ".epx", ".num-ep"];
const DURATION_SELECTORS: &[&str] = &[".duration", ".fdi-duration", ".runtime"];

/// Candidate roots for grid items inside AJAX fragments.
pub const FRAGMENT_ITEM_SELECTORS: &[&str] = &[
    "article",
    ".item",
    ".nav-item",
    ".search-item",
    "li",
    "a[href]",
];

/// Extract one card from a grid item. `None` when the node has no link or no
/// usable title.
pub fn extract_card(node: ElementRef<'_>, base: &Url) -> Option<ContentCard> {
    let link = self_or_descendant(node, "a[href]")?;
    let source_url = absolute_url(base, link.value().attr("href")?)?;
    let id = slug_from_url(&source_url)?;

    let title = extract_title(node, link)?;

    Some(ContentCard {
        id,
        title,
        source_url: source_url.to_string(),
        image_url: extract_image(node, base),
        kind: extract_kind(node),
        episode_label: extract_episode_label(node),
        audio_tags: detect_audio_tags(&text_of(node)),
        duration_label: extract_duration(node),
    })
}

/// Apply [`extract_card`] to every match of the first selector that yields at
/// least one card.
pub fn extract_cards(scope: ElementRef<'_>, item_selectors: &[&str], base: &Url) -> Vec<ContentCard> {
    for css in item_selectors {
        let cards: Vec<ContentCard> = select_all_first_match(scope, &[*css])
            .into_iter()
            .filter_map(|node| extract_card(node, base))
            .collect();
        if !cards.is_empty() {
            return dedupe(cards);
        }
    }
    Vec::new()
}

/// Cards out of a loose HTML fragment (AJAX responses).
pub fn extract_cards_from_fragment(fragment: &str, base: &Url) -> Vec<ContentCard> {
    let html = Html::parse_fragment(fragment);
    extract_cards(html.root_element(), FRAGMENT_ITEM_SELECTORS, base)
}

fn dedupe(cards: Vec<ContentCard>) -> Vec<ContentCard> {
    let mut seen = std::collections::HashSet::new();
    cards.into_iter().filter(|c| seen.insert(c.id.clone())).collect()
}

fn extract_title(node: ElementRef<'_>, link: ElementRef<'_>) -> Option<String> {
    first_attr(node, TITLE_ATTRS_EN)
        .or_else(|| first_text(node, TITLE_HEADINGS))
        .or_else(|| {
            node.value()
                .attr(TITLE_ATTR_GENERIC)
                .or_else(|| link.value().attr(TITLE_ATTR_GENERIC))
                .and_then(non_empty)
                .or_else(|| attr_deep(node, TITLE_ATTR_GENERIC))
        })
        .or_else(|| first_attr(node, TITLE_ATTRS_NATIVE))
        .or_else(|| non_empty(&text_of(node)))
        .map(|t| strip_tags(&t))
        .filter(|t| usable_title(t))
}

/// Titles made only of punctuation ("???", "-") are placeholder noise.
fn usable_title(title: &str) -> bool {
    title.chars().any(char::is_alphanumeric)
}

fn extract_image(node: ElementRef<'_>, base: &Url) -> Option<String> {
    let usable = |v: &str| non_empty(v).filter(|v| !v.starts_with("data:"));
    let from_img = self_or_descendant(node, "img").and_then(|img| {
        IMAGE_ATTRS
            .iter()
            .find_map(|attr| img.value().attr(attr).and_then(usable))
    });
    from_img
        .or_else(|| {
            LAZY_ATTRS
                .iter()
                .find_map(|attr| attr_deep(node, attr).and_then(|v| usable(&v)))
        })
        .or_else(|| background_image_url(node))
        .and_then(|src| absolute_url(base, &src))
        .map(|u| u.to_string())
}

fn extract_kind(node: ElementRef<'_>) -> Option<String> {
    first_text(node, KIND_SELECTORS)
        .or_else(|| attr_deep(node, "data-type"))
        .or_else(|| {
            KIND_RE
                .captures(&text_of(node))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
}

fn extract_episode_label(node: ElementRef<'_>) -> Option<String> {
    first_text(node, EPISODE_SELECTORS).or_else(|| {
        EPISODE_RE
            .captures(&text_of(node))
            .and_then(|c| c.get(0))
            .map(|m| normalize_whitespace(m.as_str()))
    })
}

fn extract_duration(node: ElementRef<'_>) -> Option<String> {
    first_text(node, DURATION_SELECTORS).or_else(|| {
        DURATION_RE
            .captures(&text_of(node))
            .and_then(|c| c.get(1))
            .map(|m| normalize_whitespace(m.as_str()))
    })
}

/// Build a card from one item of an AJAX/REST JSON list. Same guarantees as
/// [`extract_card`]: no URL or no title means no card.
pub fn card_from_json(item: &Value, base: &Url) -> Option<ContentCard> {
    let text = |keys: &[&str]| -> Option<String> {
        keys.iter().find_map(|k| match item.get(*k)? {
            Value::String(s) => non_empty(&strip_tags(s)),
            // WordPress REST shape: {"rendered": "..."}
            Value::Object(o) => o
                .get("rendered")
                .and_then(Value::as_str)
                .and_then(|s| non_empty(&strip_tags(s))),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    };

    let source_url = absolute_url(base, &text(&["url", "link", "permalink", "href"])?)?;
    let id = text(&["slug"]).or_else(|| slug_from_url(&source_url))?;
    let title = text(&["title", "name", "post_title", "en_title"]).filter(|t| usable_title(t))?;

    let audio_source = text(&["lang", "language", "audio"]).unwrap_or_default();

    Some(ContentCard {
        id,
        source_url: source_url.to_string(),
        image_url: text(&["image", "thumbnail", "poster", "img", "cover"])
            .and_then(|src| absolute_url(base, &src))
            .map(|u| u.to_string()),
        kind: text(&["type", "kind", "subtype"]),
        episode_label: text(&["episode", "episodes", "ep"]),
        audio_tags: detect_audio_tags(&format!("{} {}", title, audio_source)),
        duration_label: text(&["duration"]),
        title,
    })
}

/// Cards from a JSON value that is either a list or an object wrapping one.
pub fn cards_from_json(value: &Value, base: &Url) -> Vec<ContentCard> {
    let list = match value {
        Value::Array(items) => Some(items),
        Value::Object(obj) => ["results", "data", "items", "posts", "animes", "suggestions"]
            .iter()
            .find_map(|k| obj.get(*k).and_then(Value::as_array)),
        _ => None,
    };
    list.map(|items| dedupe(items.iter().filter_map(|i| card_from_json(i, base)).collect()))
        .unwrap_or_default()
}
