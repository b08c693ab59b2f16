use super::{cards_from_payload, Resolver};
use crate::card::extract_cards;
use crate::error::{FetchError, ResolveError};
use crate::fallback::{non_empty, FallbackChain};
use crate::models::{CardPage, ContentCard, Pagination, SearchParams};
use crate::pagination::extract_pagination;
use futures::FutureExt;
use reqwest::Url;
use scraper::Html;

/// Grid item candidates on the search page, most specific first.
pub(crate) const SEARCH_GRID_SELECTORS: &[&str] = &[
    ".film_list-wrap .flw-item",
    ".search-results article",
    ".listupd article",
    ".items .item",
    "article.bs",
    "article",
];

impl Resolver {
    /// Type-ahead suggestions: AJAX JSON, then the REST search API, then the
    /// search page itself. Every source is cut to the configured limit.
    pub async fn suggestions(&self, keyword: &str) -> Result<Vec<ContentCard>, ResolveError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let limit = self.config.suggestion_limit;

        let mut ajax_url = self.endpoint(&["ajax", "search", "suggest"]);
        ajax_url.query_pairs_mut().append_pair("keyword", keyword);

        let mut rest_url = self.endpoint(&["wp-json", "wp", "v2", "search"]);
        rest_url
            .query_pairs_mut()
            .append_pair("search", keyword)
            .append_pair("per_page", &limit.to_string());

        let page_url = self.search_page_url(&SearchParams::keyword(keyword));

        let outcome = FallbackChain::new("suggestions")
            .step("ajax", || {
                async move {
                    let payload = self.fetch_json(&ajax_url).await?;
                    Ok::<_, FetchError>(non_empty(cards_from_payload(&payload, &self.base)))
                }
                .boxed()
            })
            .step("rest", || {
                async move {
                    let payload = self.fetch_json(&rest_url).await?;
                    Ok::<_, FetchError>(non_empty(cards_from_payload(&payload, &self.base)))
                }
                .boxed()
            })
            .step("search-page", || {
                async move {
                    let html = self.fetch_page(&page_url).await?;
                    Ok::<_, FetchError>(non_empty(parse_search_page(&html, &self.base).results))
                }
                .boxed()
            })
            .run()
            .await?;

        let mut cards = outcome.into_value().unwrap_or_default();
        cards.truncate(limit);
        Ok(cards)
    }

    /// Search with optional filters.
    ///
    /// A plain keyword search for page 1 asks the AJAX endpoint first. Filtered
    /// or later-page searches go straight to the query-parameterized page.
    pub async fn search(&self, params: &SearchParams) -> Result<CardPage, ResolveError> {
        let keyword = params.keyword.trim();
        if keyword.is_empty() && !params.has_filters() {
            return Ok(CardPage::default());
        }
        let ajax_first = !params.has_filters() && params.page_or_first() == 1;

        let outcome = FallbackChain::new("search")
            .step_if(ajax_first, "ajax", || {
                async move {
                    let mut url = self.endpoint(&["ajax", "search"]);
                    url.query_pairs_mut().append_pair("keyword", keyword);
                    let payload = self.fetch_json(&url).await?;
                    let results = cards_from_payload(&payload, &self.base);
                    let pagination = Pagination::single_page(results.len() as u64);
                    Ok::<_, FetchError>(non_empty(CardPage { results, pagination }))
                }
                .boxed()
            })
            .step("search-page", || {
                async move {
                    // Built only once the cheaper source came back empty.
                    let url = self.search_page_url(params);
                    let html = self.fetch_page(&url).await?;
                    Ok::<_, FetchError>(Some(parse_search_page(&html, &self.base)))
                }
                .boxed()
            })
            .run()
            .await?;

        Ok(outcome.into_value().unwrap_or_default())
    }

    /// `search/?keyword=..&page=..&year=..&genre=a&genre=b...`
    pub(crate) fn search_page_url(&self, params: &SearchParams) -> Url {
        let mut url = self.endpoint(&["search", ""]);
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("keyword", params.keyword.trim());
            query.append_pair("page", &params.page_or_first().to_string());
            for (key, value) in [
                ("year", &params.year),
                ("season", &params.season),
                ("sort", &params.sort),
                ("order", &params.order),
            ] {
                if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                    query.append_pair(key, v);
                }
            }
            for (key, values) in [
                ("genre", &params.genres),
                ("status", &params.statuses),
                ("type", &params.types),
            ] {
                for v in values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()) {
                    query.append_pair(key, v);
                }
            }
        }
        url
    }
}

/// Cards and pagination of a search results page.
pub(crate) fn parse_search_page(html: &str, base: &Url) -> CardPage {
    let document = Html::parse_document(html);
    let results = extract_cards(document.root_element(), SEARCH_GRID_SELECTORS, base);
    let pagination = extract_pagination(html, Some(&document));
    CardPage { results, pagination }
}
