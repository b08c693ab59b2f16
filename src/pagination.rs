//! Pagination extractor.
//!
//! Two sources, cheapest first: a small settings object embedded in an inline
//! script (`var pagination = {"current":2,"pages":9,"total":214};`), then the
//! rendered pager links. Finding neither is not an error: the page is treated
//! as a single complete page.

use crate::helpers::normalize_whitespace;
use crate::markup::{select_first, selector};
use crate::models::Pagination;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html};
use std::collections::HashMap;

static SCRIPT_BLOB_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"=\s*(\{[^{}]*\})").expect("static regex"));
static BLOB_FIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["']?([A-Za-z_]+)["']?\s*:\s*["']?(\d+)["']?"#).expect("static regex")
});
static HREF_PAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:/page/|[?&](?:page|paged)=)(\d+)").expect("static regex"));

const CURRENT_KEYS: &[&str] = &["current", "current_page", "paged", "page"];
const PAGES_KEYS: &[&str] = &["pages", "total_pages", "max_pages", "max_page", "last_page"];
const TOTAL_KEYS: &[&str] = &["total", "found", "found_posts", "total_results"];
const PER_PAGE_KEYS: &[&str] = &["per_page", "posts_per_page", "limit"];

const PAGER_CONTAINERS: &[&str] = &[
    ".pagination",
    ".nav-links",
    ".wp-pagenavi",
    ".pagenavi",
    ".pager",
    "nav[aria-label*=\"agination\"]",
];

/// Derive pagination from a listing page. `parsed` avoids re-parsing when the
/// caller already holds the tree.
pub fn extract_pagination(raw_html: &str, parsed: Option<&Html>) -> Pagination {
    if let Some(p) = from_script_blob(raw_html) {
        return p;
    }

    let owned;
    let document = match parsed {
        Some(doc) => doc,
        None => {
            owned = Html::parse_document(raw_html);
            &owned
        }
    };

    from_pager_markup(document.root_element()).unwrap_or_default()
}

fn from_script_blob(raw_html: &str) -> Option<Pagination> {
    // Only look inside <script> bodies, a cheap string scan avoids a full parse.
    for script in raw_html.split("<script").skip(1) {
        let body = script.split("</script>").next().unwrap_or("");
        for cap in SCRIPT_BLOB_RE.captures_iter(body) {
            let Some(blob) = cap.get(1) else { continue };
            let fields: HashMap<String, u64> = BLOB_FIELD_RE
                .captures_iter(blob.as_str())
                .filter_map(|c| {
                    let key = c.get(1)?.as_str().to_lowercase();
                    let value = c.get(2)?.as_str().parse::<u64>().ok()?;
                    Some((key, value))
                })
                .collect();

            let lookup = |keys: &[&str]| keys.iter().find_map(|k| fields.get(*k).copied());
            let pages = lookup(PAGES_KEYS);
            let total = lookup(TOTAL_KEYS);
            if pages.is_none() && total.is_none() {
                continue;
            }

            let current = lookup(CURRENT_KEYS).unwrap_or(1);
            let pages = pages.or_else(|| {
                let per_page = lookup(PER_PAGE_KEYS).filter(|p| *p > 0)?;
                Some(total?.div_ceil(per_page))
            });
            let current = clamp_u32(current);
            return Some(Pagination::new(
                current,
                pages.map(clamp_u32).unwrap_or(current),
                total.unwrap_or(0),
            ));
        }
    }
    None
}

fn from_pager_markup(root: ElementRef<'_>) -> Option<Pagination> {
    let pager = select_first(root, PAGER_CONTAINERS)?;
    let items = selector("a, span, li")?;

    let mut current: Option<u32> = None;
    let mut highest: Option<u32> = None;

    for el in pager.select(&items) {
        let class = el.value().attr("class").unwrap_or("").to_lowercase();
        if class.contains("next") || class.contains("prev") || class.contains("dots") {
            // "Last »" links still tell us the final page through their href.
            if let Some(n) = el.value().attr("href").and_then(page_from_href) {
                highest = highest.max(Some(n));
            }
            continue;
        }

        let text = normalize_whitespace(&el.text().collect::<String>());
        let number = text.parse::<u32>().ok();

        let is_current = class.contains("current")
            || class.contains("active")
            || el.value().attr("aria-current").is_some();
        if is_current && current.is_none() {
            current = number;
        }

        let from_href = el.value().attr("href").and_then(page_from_href);
        highest = highest.max(number).max(from_href);
    }

    if current.is_none() && highest.is_none() {
        return None;
    }
    let current = current.unwrap_or(1);
    Some(Pagination::new(current, highest.unwrap_or(current), 0))
}

fn page_from_href(href: &str) -> Option<u32> {
    HREF_PAGE_RE
        .captures(href)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

fn clamp_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}
