use super::Resolver;
use crate::card::extract_cards;
use crate::error::ResolveError;
use crate::models::{ContentCard, HomeFeed};
use reqwest::Url;
use scraper::Html;

const SPOTLIGHT: &[&str] = &[
    "#slider .swiper-slide",
    ".deslide-item",
    ".slider .item",
    ".spotlight article",
];
const TRENDING: &[&str] = &[
    "#trending-home .swiper-slide",
    ".trending .item",
    ".trending article",
    "#trending article",
];
const LATEST_EPISODES: &[&str] = &[
    ".latest-episodes article",
    "#latest .item",
    ".latest .flw-item",
    ".listupd.latest article",
];
const POPULAR: &[&str] = &[
    ".popular article",
    "#popular .item",
    ".most-popular li",
    ".wpop-items li",
];
const UPCOMING: &[&str] = &[
    ".upcoming article",
    ".film_list-wrap .flw-item",
    ".listupd article",
    "article",
];

impl Resolver {
    /// Home feed. The home page and the upcoming page are fetched together;
    /// an unreachable upcoming page only empties that section.
    pub async fn home(&self) -> Result<HomeFeed, ResolveError> {
        let home_url = self.endpoint(&[""]);
        let upcoming_url = self.endpoint(&["upcoming", ""]);

        let (home, upcoming) =
            futures::join!(self.fetch_page(&home_url), self.fetch_page(&upcoming_url));

        let mut feed = parse_home_page(&home?, &self.base);
        feed.upcoming = match upcoming {
            Ok(html) => section(&Html::parse_document(&html), UPCOMING, &self.base),
            Err(e) => {
                log::warn!("Upcoming section unavailable: {}", e);
                Vec::new()
            }
        };
        Ok(feed)
    }
}

fn section(document: &Html, selectors: &[&str], base: &Url) -> Vec<ContentCard> {
    extract_cards(document.root_element(), selectors, base)
}

/// Home page sections. Each section tries its own selector list.
pub(crate) fn parse_home_page(html: &str, base: &Url) -> HomeFeed {
    let document = Html::parse_document(html);
    HomeFeed {
        spotlight: section(&document, SPOTLIGHT, base),
        trending: section(&document, TRENDING, base),
        latest_episodes: section(&document, LATEST_EPISODES, base),
        popular: section(&document, POPULAR, base),
        upcoming: Vec::new(),
    }
}
