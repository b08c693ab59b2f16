//! Tree-query primitives over `scraper`.
//!
//! Every lookup takes an ordered list of candidates and returns the first one
//! that produces a value, so extractors can describe "try this, then that"
//! without repeating the traversal code.

use crate::helpers::{non_empty, normalize_whitespace};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

static BACKGROUND_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"background(?:-image)?\s*:[^;]*url\(\s*['"]?([^'")]+)['"]?\s*\)"#)
        .expect("static regex")
});

/// Parse a selector, logging and skipping invalid ones.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            log::warn!("Invalid selector {:?}: {:?}", css, e);
            None
        }
    }
}

/// First element matching any of `candidates`, tried in order.
pub fn select_first<'a>(scope: ElementRef<'a>, candidates: &[&str]) -> Option<ElementRef<'a>> {
    candidates
        .iter()
        .filter_map(|css| selector(css))
        .find_map(|sel| scope.select(&sel).next())
}

/// All elements matching the first candidate that matches anything.
pub fn select_all_first_match<'a>(scope: ElementRef<'a>, candidates: &[&str]) -> Vec<ElementRef<'a>> {
    for css in candidates {
        if let Some(sel) = selector(css) {
            let found: Vec<_> = scope.select(&sel).collect();
            if !found.is_empty() {
                return found;
            }
        }
    }
    Vec::new()
}

/// The element itself if it matches `css`, otherwise its first descendant that does.
pub fn self_or_descendant<'a>(node: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    if sel.matches(&node) {
        return Some(node);
    }
    node.select(&sel).next()
}

/// Normalized text content of an element. Text nodes are joined with a space
/// so sibling badges stay separate words.
pub fn text_of(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

/// First non-empty text among the candidates.
pub fn first_text(scope: ElementRef<'_>, candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|css| selector(css))
        .flat_map(|sel| scope.select(&sel).collect::<Vec<_>>())
        .find_map(|el| non_empty(&text_of(el)))
}

/// Non-empty value of `attr` on the node itself or on the first descendant
/// carrying it.
pub fn attr_deep(node: ElementRef<'_>, attr: &str) -> Option<String> {
    if let Some(v) = node.value().attr(attr).and_then(non_empty) {
        return Some(v);
    }
    let sel = selector(&format!("[{}]", attr))?;
    node.select(&sel)
        .find_map(|el| el.value().attr(attr).and_then(non_empty))
}

/// First non-empty attribute among `attrs`, each looked up with [`attr_deep`].
pub fn first_attr(node: ElementRef<'_>, attrs: &[&str]) -> Option<String> {
    attrs.iter().find_map(|a| attr_deep(node, a))
}

/// Texts of every element matching `css` inside `scope`.
pub fn texts(scope: ElementRef<'_>, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    scope
        .select(&sel)
        .filter_map(|el| non_empty(&text_of(el)))
        .collect()
}

/// URL inside a CSS `background-image` declaration on the node or any
/// descendant.
pub fn background_image_url(node: ElementRef<'_>) -> Option<String> {
    let from_style = |el: ElementRef<'_>| {
        el.value().attr("style").and_then(|style| {
            BACKGROUND_URL_RE
                .captures(style)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
    };
    if let Some(url) = from_style(node) {
        return Some(url);
    }
    let sel = selector("[style]")?;
    node.select(&sel).find_map(from_style)
}

/// Content of `<meta property=..>` or `<meta name=..>`.
pub fn meta_content(document: &Html, key: &str) -> Option<String> {
    let css = format!(r#"meta[property="{key}"], meta[name="{key}"]"#);
    let sel = selector(&css)?;
    document
        .select(&sel)
        .find_map(|el| el.value().attr("content").and_then(non_empty))
}

/// Collect "Label: value" rows from info blocks.
///
/// Keys are lower-cased labels without the colon. A row's value is the list of
/// its link texts when it has links (genres, studios), otherwise its remaining
/// text.
pub fn label_values(scope: ElementRef<'_>, row_candidates: &[&str]) -> BTreeMap<String, Vec<String>> {
    let mut out = BTreeMap::new();
    let link_sel = selector("a");
    let label_sel = selector("b, strong, .item-head, .name, span.type, dt, th");

    for row in select_all_first_match(scope, row_candidates) {
        let full = text_of(row);
        let (label, rest) = match label_sel
            .as_ref()
            .and_then(|sel| row.select(sel).next())
            .map(text_of)
            .filter(|l| !l.is_empty())
        {
            Some(l) => {
                let rest = full.strip_prefix(l.as_str()).unwrap_or(full.as_str()).to_string();
                (l, rest)
            }
            None => match full.split_once(':') {
                Some((l, r)) => (l.to_string(), r.to_string()),
                None => continue,
            },
        };

        let key = label.trim().trim_end_matches(':').trim().to_lowercase();
        if key.is_empty() {
            continue;
        }

        let links: Vec<String> = link_sel
            .as_ref()
            .map(|sel| row.select(sel).filter_map(|a| non_empty(&text_of(a))).collect())
            .unwrap_or_default();
        let values = if links.is_empty() {
            non_empty(rest.trim().trim_start_matches(':'))
                .map(|v| vec![v])
                .unwrap_or_default()
        } else {
            links
        };
        if !values.is_empty() {
            out.entry(key).or_insert(values);
        }
    }
    out
}
