use super::{cards_from_payload, found, require_id, Resolver};
use crate::card::extract_cards;
use crate::error::{FetchError, ResolveError};
use crate::fallback::{non_empty, FallbackChain};
use crate::helpers::{
    absolute_url, detect_audio_tags, episode_sort_key, extract_number, extract_resolution,
    non_empty as non_empty_text, slug_from_url, strip_tags,
};
use crate::markup::{
    attr_deep, background_image_url, first_attr, first_text, label_values, meta_content,
    select_all_first_match, select_first, selector, text_of, texts,
};
use crate::models::{ContentCard, DetailRecord, DownloadLink, EpisodeRef};
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html};
use std::collections::{BTreeMap, HashSet};

static RECOMMEND_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)["']((?:https?:)?\\?/[^"'\s]*?recommend[^"'\s]*)["']"#).expect("static regex")
});
static POST_ID_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bpostid-(\d+)\b").expect("static regex"));
static POST_ID_SCRIPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"["']?(?:post_id|postId|anime_id|animeId)["']?\s*[:=]\s*["']?(\d+)"#).expect("static regex")
});
static TRAILING_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)/?$").expect("static regex"));
static SEASON_SLUG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:[-_/](\d{1,3})x\d+(?:\.\d+)?/?$|season-?(\d+))").expect("static regex")
});
static EPISODE_TEXT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:ep|episode)\.?\s*(\d+(?:\.\d+)?)").expect("static regex")
});

const TITLE_SELECTORS: &[&str] = &[
    ".anisc-detail .film-name",
    "h1.entry-title",
    "h2.film-name",
    ".anime-title",
    "h1",
];
const NATIVE_SELECTORS: &[&str] = &[".alternative", ".jname", ".japanese", ".alter"];
const NATIVE_ATTRS: &[&str] = &["data-jname", "data-jp-title", "data-native-title"];
const INFO_ROWS: &[&str] = &[
    ".anisc-info .item",
    ".info-content .spe span",
    ".spe span",
    ".anime-info li",
    ".info li",
    ".details li",
];
const POSTER_SELECTORS: &[&str] = &[
    ".anisc-poster img",
    ".film-poster img",
    ".thumb img",
    ".poster img",
];
const BANNER_SELECTORS: &[&str] = &[".anis-cover", ".bigcover", ".banner", ".backdrop"];
const SYNOPSIS_SELECTORS: &[&str] = &[
    ".film-description .text",
    ".entry-content[itemprop=\"description\"]",
    ".synp .entry-content",
    ".synopsis",
    ".description",
];
const GENRE_LINKS: &str = ".genxed a, .genres a, .sgeneros a";
const BADGE_SELECTORS: &str = ".tick-item, .badge, .lang, .audio";
const RECOMMENDATION_GRIDS: &[&str] = &[
    ".block_area-realtime .flw-item",
    ".recommendations article",
    ".related article",
    ".bixbox .listupd article",
    ".recommended .item",
];
const EPISODE_LINKS: &[&str] = &[
    ".episodes-list a[href]",
    ".eplister li a[href]",
    ".ss-list a[href]",
    "ul.episodios li a[href]",
    ".episode-list a[href]",
];
const EPISODE_NUMBER_SELECTORS: &[&str] = &[".epl-num", ".ssli-order", ".num", ".episode-number"];
const EPISODE_TITLE_SELECTORS: &[&str] = &[".epl-title", ".ep-name", ".episode-title"];
const DOWNLOAD_LINKS: &[&str] = &[
    ".download-links a[href]",
    ".dls a[href]",
    ".soraddl a[href]",
    "#download a[href]",
    ".mctnx a[href]",
];

/// Everything read from the detail page in one synchronous pass.
pub(crate) struct DetailPage {
    pub record: DetailRecord,
    pub script_endpoint: Option<Url>,
    pub post_id: Option<String>,
    pub static_recommendations: Vec<ContentCard>,
}

impl Resolver {
    /// Full profile of one title. `Ok(None)` when the page has no title.
    pub async fn details(&self, id: &str) -> Result<Option<DetailRecord>, ResolveError> {
        let id = require_id("id", id)?;
        let url = self.endpoint(&["anime", id, ""]);
        let Some(html) = found(self.fetch_page(&url).await)? else {
            return Ok(None);
        };

        let Some(page) = parse_detail_page(id, &html, &self.base) else {
            log::info!("No detail record found at {}", url);
            return Ok(None);
        };
        let DetailPage {
            mut record,
            script_endpoint,
            post_id,
            static_recommendations,
        } = page;

        record.recommendations = self
            .recommendations(id, script_endpoint, post_id, static_recommendations)
            .await;
        Ok(Some(record))
    }

    /// Four sources, each tried only if the previous produced nothing:
    /// an endpoint found in inline scripts, the numeric post id endpoints,
    /// the slug endpoint, and finally the grid already on the page.
    async fn recommendations(
        &self,
        slug: &str,
        script_endpoint: Option<Url>,
        post_id: Option<String>,
        static_recommendations: Vec<ContentCard>,
    ) -> Vec<ContentCard> {
        let post_id = post_id.unwrap_or_default();
        let has_post_id = !post_id.is_empty();

        let mut admin_ajax = self.endpoint(&["wp-admin", "admin-ajax.php"]);
        admin_ajax
            .query_pairs_mut()
            .append_pair("action", "get_recommendations")
            .append_pair("post_id", &post_id);
        let by_id = self.endpoint(&["ajax", "recommend", &post_id]);
        let rest = self.endpoint(&["wp-json", "anime", "v1", "recommendations", &post_id]);
        let mut by_slug = self.endpoint(&["ajax", "recommend"]);
        by_slug.query_pairs_mut().append_pair("slug", slug);

        let outcome = FallbackChain::new("recommendations")
            .step_if(script_endpoint.is_some(), "script-endpoint", || {
                self.recommendations_from(script_endpoint)
            })
            .step_if(has_post_id, "post-id:admin-ajax", || {
                self.recommendations_from(Some(admin_ajax))
            })
            .step_if(has_post_id, "post-id:ajax", || self.recommendations_from(Some(by_id)))
            .step_if(has_post_id, "post-id:rest", || self.recommendations_from(Some(rest)))
            .step("slug", || self.recommendations_from(Some(by_slug)))
            .step("static-grid", || {
                async move { Ok::<_, FetchError>(non_empty(static_recommendations)) }.boxed()
            })
            .run()
            .await;

        match outcome {
            Ok(outcome) => outcome.into_value().unwrap_or_default(),
            Err(e) => {
                log::warn!("Recommendations for {} unavailable: {}", slug, e);
                Vec::new()
            }
        }
    }

    fn recommendations_from(
        &self,
        url: Option<Url>,
    ) -> futures::future::BoxFuture<'_, Result<Option<Vec<ContentCard>>, FetchError>> {
        async move {
            let Some(url) = url else {
                return Ok::<_, FetchError>(None);
            };
            let payload = self.fetch_json(&url).await?;
            Ok(non_empty(cards_from_payload(&payload, &self.base)))
        }
        .boxed()
    }
}

pub(crate) fn parse_detail_page(id: &str, html: &str, base: &Url) -> Option<DetailPage> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title_el = select_first(root, TITLE_SELECTORS);
    let title = title_el
        .map(text_of)
        .and_then(|t| non_empty_text(&t))
        .or_else(|| meta_content(&document, "og:title"))
        .map(|t| strip_tags(&t))
        .filter(|t| t.chars().any(char::is_alphanumeric))?;

    let info = label_values(root, INFO_ROWS);

    let native_title = title_el
        .and_then(|el| first_attr(el, NATIVE_ATTRS))
        .or_else(|| first_text(root, NATIVE_SELECTORS))
        .or_else(|| info_text(&info, &["japanese", "native", "native title"]));
    let english_title = title_el
        .and_then(|el| attr_deep(el, "data-en-title"))
        .or_else(|| info_text(&info, &["english", "english title"]));

    let synonyms = info_list(&info, &["synonyms", "other names", "alternative"]);

    let mut genres = info_list(&info, &["genres", "genre"]);
    if genres.is_empty() {
        genres = texts(root, GENRE_LINKS);
    }

    let mut audio_source = title.clone();
    for value in info_list(&info, &["language", "languages", "audio"]) {
        audio_source.push(' ');
        audio_source.push_str(&value);
    }
    for badge in texts(root, BADGE_SELECTORS) {
        audio_source.push(' ');
        audio_source.push_str(&badge);
    }

    let record = DetailRecord {
        id: id.to_string(),
        native_title,
        english_title,
        synonyms,
        image_url: poster(root, base).or_else(|| {
            meta_content(&document, "og:image")
                .and_then(|src| absolute_url(base, &src))
                .map(|u| u.to_string())
        }),
        banner_url: select_first(root, BANNER_SELECTORS)
            .and_then(|el| background_image_url(el).or_else(|| attr_deep(el, "data-bg")))
            .and_then(|src| absolute_url(base, &src))
            .map(|u| u.to_string()),
        synopsis: first_text(root, SYNOPSIS_SELECTORS)
            .or_else(|| meta_content(&document, "og:description"))
            .or_else(|| meta_content(&document, "description")),
        kind: info_text(&info, &["type"]),
        status: info_text(&info, &["status"]),
        aired: info_text(&info, &["aired", "released", "release date"]),
        premiered: info_text(&info, &["premiered", "season"]),
        duration: info_text(&info, &["duration"]),
        rating: info_text(&info, &["mal score", "score", "rating"]),
        studios: info_list(&info, &["studios", "studio"]),
        producers: info_list(&info, &["producers", "producer"]),
        genres,
        audio_tags: detect_audio_tags(&audio_source),
        recommendations: Vec::new(),
        episodes: extract_episodes(root, base),
        downloads: extract_downloads(root, base),
        title,
    };

    Some(DetailPage {
        record,
        script_endpoint: script_recommend_endpoint(&document, base),
        post_id: post_id(&document, html),
        static_recommendations: extract_cards(root, RECOMMENDATION_GRIDS, base),
    })
}

fn info_text(info: &BTreeMap<String, Vec<String>>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| info.get(*k))
        .map(|values| values.join(", "))
        .and_then(|v| non_empty_text(&v))
}

/// Multi-valued info row. A single plain-text value is split on commas.
fn info_list(info: &BTreeMap<String, Vec<String>>, keys: &[&str]) -> Vec<String> {
    let Some(values) = keys.iter().find_map(|k| info.get(*k)) else {
        return Vec::new();
    };
    if values.len() == 1 {
        values[0]
            .split(',')
            .filter_map(non_empty_text)
            .collect()
    } else {
        values.clone()
    }
}

fn poster(root: ElementRef<'_>, base: &Url) -> Option<String> {
    let img = select_first(root, POSTER_SELECTORS)?;
    ["data-src", "src"]
        .iter()
        .find_map(|a| img.value().attr(a).and_then(non_empty_text))
        .filter(|src| !src.starts_with("data:"))
        .and_then(|src| absolute_url(base, &src))
        .map(|u| u.to_string())
}

/// First endpoint-shaped string mentioning "recommend" inside an inline script.
fn script_recommend_endpoint(document: &Html, base: &Url) -> Option<Url> {
    let scripts = selector("script")?;
    document.select(&scripts).find_map(|script| {
        let body = script.text().collect::<String>();
        RECOMMEND_URL_RE
            .captures_iter(&body)
            .filter_map(|c| c.get(1))
            .find_map(|m| absolute_url(base, &m.as_str().replace("\\/", "/")))
    })
}

/// Numeric post id: a `data-post-id` attribute, a `postid-N` body class, or an
/// id assigned in an inline script.
fn post_id(document: &Html, html: &str) -> Option<String> {
    let root = document.root_element();
    let numeric = |v: String| Some(v).filter(|v| v.chars().all(|c| c.is_ascii_digit()));

    attr_deep(root, "data-post-id")
        .and_then(numeric)
        .or_else(|| {
            let body = select_first(root, &["body"])?;
            let class = body.value().attr("class")?;
            POST_ID_CLASS_RE
                .captures(class)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
        .or_else(|| {
            POST_ID_SCRIPT_RE
                .captures(html)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
}

/// Episode list in ascending order, whatever order the page lists them in.
pub(crate) fn extract_episodes(root: ElementRef<'_>, base: &Url) -> Vec<EpisodeRef> {
    let mut seen = HashSet::new();
    let mut episodes: Vec<(u32, EpisodeRef)> = select_all_first_match(root, EPISODE_LINKS)
        .into_iter()
        .filter_map(|link| {
            let ep = episode_from_link(link, base)?;
            Some((season_of(link, &ep.id), ep))
        })
        .filter(|(_, ep)| seen.insert(ep.id.clone()))
        .collect();

    episodes.sort_by(|(sa, a), (sb, b)| {
        sa.cmp(sb)
            .then_with(|| episode_sort_key(&a.number).total_cmp(&episode_sort_key(&b.number)))
    });
    episodes.into_iter().map(|(_, ep)| ep).collect()
}

/// Season of an episode link: `data-season` on the link or an enclosing list,
/// else a `2x5` or `season-2` slug. Unmarked episodes count as season 1.
fn season_of(link: ElementRef<'_>, id: &str) -> u32 {
    std::iter::once(link)
        .chain(link.ancestors().filter_map(ElementRef::wrap))
        .find_map(|el| el.value().attr("data-season"))
        .and_then(extract_number)
        .or_else(|| {
            SEASON_SLUG_RE
                .captures(id)
                .and_then(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().to_string())
        })
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(1)
}

fn episode_from_link(link: ElementRef<'_>, base: &Url) -> Option<EpisodeRef> {
    let url = absolute_url(base, link.value().attr("href")?)?;
    let id = slug_from_url(&url)?;
    let text = text_of(link);

    let number = link
        .value()
        .attr("data-number")
        .and_then(extract_number)
        .or_else(|| first_text(link, EPISODE_NUMBER_SELECTORS).and_then(|t| extract_number(&t)))
        .or_else(|| {
            EPISODE_TEXT_RE
                .captures(&text)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
        .or_else(|| {
            TRAILING_NUMBER_RE
                .captures(&id)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
        })
        .unwrap_or_default();

    let title = first_text(link, EPISODE_TITLE_SELECTORS)
        .or_else(|| link.value().attr("title").and_then(non_empty_text));
    let image = select_first(link, &["img"])
        .and_then(|img| {
            ["data-src", "src"]
                .iter()
                .find_map(|a| img.value().attr(a).and_then(non_empty_text))
        })
        .and_then(|src| absolute_url(base, &src))
        .map(|u| u.to_string());

    Some(EpisodeRef {
        id,
        number,
        url: url.to_string(),
        title,
        image,
    })
}

pub(crate) fn extract_downloads(root: ElementRef<'_>, base: &Url) -> Vec<DownloadLink> {
    let mut seen = HashSet::new();
    select_all_first_match(root, DOWNLOAD_LINKS)
        .into_iter()
        .filter_map(|link| {
            let url = absolute_url(base, link.value().attr("href")?)?;
            let row_text = link
                .parent()
                .and_then(ElementRef::wrap)
                .map(text_of)
                .unwrap_or_default();
            let resolution = extract_resolution(&text_of(link)).or_else(|| extract_resolution(&row_text));
            let host = url
                .host_str()
                .map(|h| h.trim_start_matches("www.").to_string());
            Some(DownloadLink {
                resolution,
                url: url.to_string(),
                host,
            })
        })
        .filter(|d| seen.insert(d.url.clone()))
        .collect()
}
