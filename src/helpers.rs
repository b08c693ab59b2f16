//! Small text and URL helpers shared by the extractors.

use crate::models::AudioTag;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use std::collections::BTreeSet;

static AUDIO_KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(multi|hindi|eng|tamil|telugu)").expect("static regex"));
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)").expect("static regex"));
static RESOLUTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(\d{3,4}p|4k|hd|sd|fhd)\b").expect("static regex"));

/// Collapse runs of whitespace and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trimmed, whitespace-normalized text or `None` when nothing is left.
pub fn non_empty(s: &str) -> Option<String> {
    let s = normalize_whitespace(s);
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Resolve `href` against `base`. Returns `None` for empty, `javascript:` and
/// fragment-only links.
pub fn absolute_url(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    base.join(href).ok().filter(|u| matches!(u.scheme(), "http" | "https"))
}

/// Last non-empty path segment of a URL: `/anime/fma-2009/` -> `fma-2009`.
pub fn slug_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
}

/// Slug of an `href` relative to `base`.
pub fn slug_from_href(base: &Url, href: &str) -> Option<String> {
    absolute_url(base, href).as_ref().and_then(slug_from_url)
}

/// Scan text for language keywords. Matching is case-insensitive and only at
/// word starts, so "english" counts for `eng` but "revenge" does not.
pub fn detect_audio_tags(text: &str) -> BTreeSet<AudioTag> {
    let lower = text.to_lowercase();
    AUDIO_KEYWORD_RE
        .captures_iter(&lower)
        .filter_map(|c| match c.get(1).map(|m| m.as_str()) {
            Some("multi") => Some(AudioTag::Multi),
            Some("hindi") => Some(AudioTag::Hindi),
            Some("eng") => Some(AudioTag::English),
            Some("tamil") => Some(AudioTag::Tamil),
            Some("telugu") => Some(AudioTag::Telugu),
            _ => None,
        })
        .collect()
}

/// First number in a string, kept as text ("Episode 5.5" -> "5.5").
pub fn extract_number(s: &str) -> Option<String> {
    NUMBER_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Sort key for an episode number. Unparseable numbers sort last.
pub fn episode_sort_key(number: &str) -> f64 {
    extract_number(number)
        .and_then(|n| n.parse::<f64>().ok())
        .unwrap_or(f64::MAX)
}

pub fn extract_resolution(s: &str) -> Option<String> {
    RESOLUTION_RE
        .captures(s)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_lowercase())
}

/// Plain text of an HTML snippet, entities decoded.
pub fn strip_tags(s: &str) -> String {
    if !s.contains('<') && !s.contains('&') {
        return normalize_whitespace(s);
    }
    let fragment = scraper::Html::parse_fragment(s);
    normalize_whitespace(&fragment.root_element().text().collect::<String>())
}

/// Treat upstream placeholders for "no value" as absent.
pub fn meaningful(value: &str) -> Option<String> {
    let v = value.trim();
    match v.to_lowercase().as_str() {
        "" | "undefined" | "null" | "#" | "none" | "false" => None,
        _ => Some(v.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://anime.example/").unwrap()
    }

    #[test]
    fn test_slug_from_href() {
        assert_eq!(slug_from_href(&base(), "/anime/fma-2009/").as_deref(), Some("fma-2009"));
        assert_eq!(
            slug_from_href(&base(), "https://anime.example/episode/fma-2009-1x3").as_deref(),
            Some("fma-2009-1x3")
        );
        assert_eq!(slug_from_href(&base(), "/"), None);
        assert_eq!(slug_from_href(&base(), "#top"), None);
        assert_eq!(slug_from_href(&base(), "javascript:void(0)"), None);
    }

    #[test]
    fn test_audio_tags() {
        let tags = detect_audio_tags("HINDI | Tamil | Telugu | English  MULTI audio");
        assert_eq!(tags.len(), 5);

        let tags = detect_audio_tags("The Revenge of Naruto");
        assert!(tags.is_empty());

        let tags = detect_audio_tags("Eng Sub");
        assert!(tags.contains(&AudioTag::English));
    }

    #[test]
    fn test_episode_numbers() {
        assert_eq!(extract_number("Episode 5.5").as_deref(), Some("5.5"));
        assert!(episode_sort_key("12") > episode_sort_key("5.5"));
        assert_eq!(episode_sort_key("Special"), f64::MAX);
    }

    #[test]
    fn test_meaningful_placeholders() {
        assert_eq!(meaningful("undefined"), None);
        assert_eq!(meaningful("  "), None);
        assert_eq!(meaningful("ep-2").as_deref(), Some("ep-2"));
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Fullmetal</b> &amp; Alchemist"), "Fullmetal & Alchemist");
        assert_eq!(extract_resolution("Download 1080P (Drive)").as_deref(), Some("1080p"));
    }
}
