use super::{found, require_id, Resolver};
use crate::card::extract_cards;
use crate::error::ResolveError;
use crate::models::{CardPage, CategoryKind};
use crate::pagination::extract_pagination;
use reqwest::Url;
use scraper::Html;

const CATEGORY_GRID_SELECTORS: &[&str] = &[
    ".film_list-wrap .flw-item",
    ".listupd article",
    ".items .item",
    ".post-list article",
    "article",
];

impl Resolver {
    /// One page of a genre, tag or A-Z listing.
    pub async fn category(
        &self,
        kind: CategoryKind,
        slug: &str,
        page: u32,
    ) -> Result<CardPage, ResolveError> {
        let slug = require_id("category", slug)?;
        let url = self.category_url(kind, slug, page);
        // Paging past the last page answers 404 on most themes.
        let Some(html) = found(self.fetch_page(&url).await)? else {
            return Ok(CardPage::default());
        };
        let listing = parse_category_page(&html, &self.base);
        log::debug!(
            "{} '{}' page {}: {} cards",
            kind.path_segment(),
            slug,
            listing.pagination.current_page,
            listing.results.len()
        );
        Ok(listing)
    }

    /// `genre/action/` for the first page, `genre/action/page/3/` after that.
    pub(crate) fn category_url(&self, kind: CategoryKind, slug: &str, page: u32) -> Url {
        let page = page.max(1).to_string();
        let mut segments = vec![kind.path_segment(), slug];
        if page != "1" {
            segments.extend(["page", page.as_str()]);
        }
        segments.push("");
        self.endpoint(&segments)
    }
}

pub(crate) fn parse_category_page(html: &str, base: &Url) -> CardPage {
    let document = Html::parse_document(html);
    CardPage {
        results: extract_cards(document.root_element(), CATEGORY_GRID_SELECTORS, base),
        pagination: extract_pagination(html, Some(&document)),
    }
}
