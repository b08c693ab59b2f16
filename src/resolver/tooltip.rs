use super::{found, require_id, Resolver};
use crate::error::ResolveError;
use crate::helpers::non_empty;
use crate::markup::{first_text, label_values, texts};
use crate::models::TooltipRecord;
use scraper::Html;

const NAME_SELECTORS: &[&str] = &[".pre-qtip-title", ".qtip-title", ".title", "h3", "h2"];
const DESCRIPTION_SELECTORS: &[&str] = &[
    ".pre-qtip-description",
    ".qtip-description",
    ".description",
    "p",
];
const RATING_SELECTORS: &[&str] = &[".pqd-li .fa-star", ".rating", ".score", ".imdb"];
const KIND_SELECTORS: &[&str] = &[".badge-type", ".type", ".tick-quality"];
const LINE_ROWS: &[&str] = &[".pre-qtip-line", ".pqd-line", ".line", "li"];

impl Resolver {
    /// Hover preview. `Ok(None)` when the fragment names nothing.
    pub async fn tooltip(&self, id: &str) -> Result<Option<TooltipRecord>, ResolveError> {
        let id = require_id("id", id)?;
        let url = self.endpoint(&["ajax", "qtip", id]);
        let Some(payload) = found(self.fetch_json(&url).await)? else {
            return Ok(None);
        };

        let Some(fragment) = payload.html() else {
            log::debug!("Tooltip payload for {} carried no markup", id);
            return Ok(None);
        };
        Ok(parse_tooltip(id, fragment))
    }
}

pub(crate) fn parse_tooltip(id: &str, fragment: &str) -> Option<TooltipRecord> {
    let html = Html::parse_fragment(fragment);
    let root = html.root_element();
    let lines = label_values(root, LINE_ROWS);
    let line = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| lines.get(*k))
            .and_then(|v| non_empty(&v.join(", ")))
    };

    let name = first_text(root, NAME_SELECTORS);
    let description = first_text(root, DESCRIPTION_SELECTORS);
    if name.is_none() && description.is_none() {
        return None;
    }

    let mut genres = lines
        .get("genres")
        .or_else(|| lines.get("genre"))
        .cloned()
        .unwrap_or_default();
    if genres.is_empty() {
        genres = texts(root, ".pre-qtip-genres a, .genres a");
    }

    Some(TooltipRecord {
        id: id.to_string(),
        name,
        description,
        rating: first_text(root, RATING_SELECTORS).or_else(|| line(&["score", "rating", "mal"])),
        kind: line(&["type"]).or_else(|| first_text(root, KIND_SELECTORS)),
        status: line(&["status"]),
        aired: line(&["aired", "released"]),
        genres,
    })
}
