use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Language badge detected on a card or detail page.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AudioTag {
    Multi,
    Hindi,
    English,
    Tamil,
    Telugu,
}

impl AudioTag {
    pub fn as_str(self) -> &'static str {
        match self {
            AudioTag::Multi => "multi",
            AudioTag::Hindi => "hindi",
            AudioTag::English => "english",
            AudioTag::Tamil => "tamil",
            AudioTag::Telugu => "telugu",
        }
    }
}

/// One listing-grid item.
///
/// Only ever built by the card extractor, which guarantees `id`, `title` and
/// `source_url` are non-empty.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentCard {
    pub id: String,
    pub title: String,
    pub source_url: String,
    pub image_url: Option<String>,
    pub kind: Option<String>,
    pub episode_label: Option<String>,
    pub audio_tags: BTreeSet<AudioTag>,
    pub duration_label: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub has_next_page: bool,
}

impl Pagination {
    /// Build a pagination record, keeping `total_pages >= current_page >= 1`.
    pub fn new(current_page: u32, total_pages: u32, total_results: u64) -> Self {
        let current_page = current_page.max(1);
        let total_pages = total_pages.max(current_page);
        Self {
            current_page,
            total_pages,
            total_results,
            has_next_page: current_page < total_pages,
        }
    }

    /// A single complete page holding `total_results` items.
    pub fn single_page(total_results: u64) -> Self {
        Self::new(1, 1, total_results)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::single_page(0)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRef {
    pub id: String,
    /// Kept as text: upstream numbers include specials such as "5.5".
    pub number: String,
    pub url: String,
    pub title: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    pub resolution: Option<String>,
    pub url: String,
    pub host: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetailRecord {
    pub id: String,
    pub title: String,
    pub native_title: Option<String>,
    pub english_title: Option<String>,
    pub synonyms: Vec<String>,
    pub image_url: Option<String>,
    pub banner_url: Option<String>,
    pub synopsis: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub aired: Option<String>,
    pub premiered: Option<String>,
    pub duration: Option<String>,
    pub rating: Option<String>,
    pub studios: Vec<String>,
    pub producers: Vec<String>,
    pub genres: Vec<String>,
    pub audio_tags: BTreeSet<AudioTag>,
    pub recommendations: Vec<ContentCard>,
    /// Ascending airing order.
    pub episodes: Vec<EpisodeRef>,
    pub downloads: Vec<DownloadLink>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ServerCategory {
    Sub,
    Dub,
    Raw,
    #[default]
    Unknown,
}

impl ServerCategory {
    /// Infer a category from a free-form marker such as `data-type="dub"` or a
    /// tab heading like "Hindi Dub".
    pub fn from_marker(marker: &str) -> Self {
        let lower = marker.to_lowercase();
        if lower.contains("dub") || lower.contains("hindi") || lower.contains("multi") {
            ServerCategory::Dub
        } else if lower.contains("sub") {
            ServerCategory::Sub
        } else if lower.contains("raw") {
            ServerCategory::Raw
        } else {
            ServerCategory::Unknown
        }
    }
}

/// A decoded candidate video source for an episode.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerDescriptor {
    pub name: String,
    pub url: String,
    pub is_embed: bool,
    pub category: ServerCategory,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamBundle {
    pub episode_id: String,
    pub iframe_url: Option<String>,
    pub servers: Vec<ServerDescriptor>,
    pub next_episode_id: Option<String>,
    pub prev_episode_id: Option<String>,
    /// No descriptor from this upstream is directly playable.
    pub requires_extraction: bool,
}

impl StreamBundle {
    pub fn servers_in(&self, category: ServerCategory) -> impl Iterator<Item = &ServerDescriptor> {
        self.servers.iter().filter(move |s| s.category == category)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Hls,
    Mp4,
    Embed,
}

/// Final playable reference returned by the extraction delegate.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayableMedia {
    pub url: String,
    pub kind: MediaKind,
    pub referer: Option<String>,
}

/// Stream use-case result. `stream` is `None` when extraction failed; the
/// servers are still returned so the caller can offer a switch.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    #[serde(flatten)]
    pub bundle: StreamBundle,
    pub selected_server: Option<ServerDescriptor>,
    pub stream: Option<PlayableMedia>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TooltipRecord {
    pub id: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub rating: Option<String>,
    pub kind: Option<String>,
    pub status: Option<String>,
    pub aired: Option<String>,
    pub genres: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HomeFeed {
    pub spotlight: Vec<ContentCard>,
    pub trending: Vec<ContentCard>,
    pub latest_episodes: Vec<ContentCard>,
    pub popular: Vec<ContentCard>,
    pub upcoming: Vec<ContentCard>,
}

impl HomeFeed {
    pub fn is_empty(&self) -> bool {
        self.spotlight.is_empty()
            && self.trending.is_empty()
            && self.latest_episodes.is_empty()
            && self.popular.is_empty()
            && self.upcoming.is_empty()
    }
}

/// A page of cards: search results and category listings.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CardPage {
    pub results: Vec<ContentCard>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub keyword: String,
    pub page: u32,
    pub year: Option<String>,
    pub season: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub genres: Vec<String>,
    pub statuses: Vec<String>,
    pub types: Vec<String>,
}

impl SearchParams {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            page: 1,
            ..Default::default()
        }
    }

    pub fn page_or_first(&self) -> u32 {
        self.page.max(1)
    }

    pub fn has_filters(&self) -> bool {
        self.year.is_some()
            || self.season.is_some()
            || self.sort.is_some()
            || self.order.is_some()
            || !self.genres.is_empty()
            || !self.statuses.is_empty()
            || !self.types.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Genre,
    Tag,
    Az,
}

impl CategoryKind {
    pub fn path_segment(self) -> &'static str {
        match self {
            CategoryKind::Genre => "genre",
            CategoryKind::Tag => "tag",
            CategoryKind::Az => "az-list",
        }
    }
}
