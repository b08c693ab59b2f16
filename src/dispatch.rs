//! Request dispatcher.
//!
//! Maps `GET /api?action=...` onto a resolver use case and wraps the result in
//! the `{success, data}` / `{success: false, error, code}` envelope.

use crate::app_state::AppState;
use crate::error::{DispatchError, FetchError, ResolveError};
use crate::models::{CategoryKind, SearchParams};
use crate::resolver::Resolver;
use actix_web::http::StatusCode;
use actix_web::{get, web, HttpResponse, Responder};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Home,
    Suggestions {
        keyword: String,
    },
    Search(SearchParams),
    Details {
        id: String,
    },
    Stream {
        episode_id: String,
        server: Option<String>,
    },
    Category {
        kind: CategoryKind,
        slug: String,
        page: u32,
    },
    Tooltip {
        id: String,
    },
}

/// Lookup over raw query pairs. Repeated keys are kept.
struct Params<'q>(&'q [(String, String)]);

impl<'q> Params<'q> {
    fn get(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| {
            self.0
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.trim())
                .find(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    fn require(&self, name: &'static str, keys: &[&str]) -> Result<String, DispatchError> {
        self.get(keys).ok_or(DispatchError::MissingParam(name))
    }

    /// Every value for `keys`, comma-separated values split.
    fn all(&self, keys: &[&str]) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| keys.contains(&k.as_str()))
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn page(&self) -> u32 {
        self.get(&["page"])
            .and_then(|p| p.parse::<u32>().ok())
            .unwrap_or(1)
            .max(1)
    }
}

impl Action {
    pub fn from_query(pairs: &[(String, String)]) -> Result<Self, DispatchError> {
        let params = Params(pairs);
        let action = params.require("action", &["action"])?.to_lowercase();

        let action = match action.as_str() {
            "home" => Action::Home,
            "suggestions" | "suggest" => Action::Suggestions {
                keyword: params.require("keyword", &["keyword", "q", "query"])?,
            },
            "search" | "filter" => {
                let keyword = if action == "search" {
                    params.require("keyword", &["keyword", "q", "query"])?
                } else {
                    params.get(&["keyword", "q", "query"]).unwrap_or_default()
                };
                Action::Search(SearchParams {
                    keyword,
                    page: params.page(),
                    year: params.get(&["year"]),
                    season: params.get(&["season"]),
                    sort: params.get(&["sort"]),
                    order: params.get(&["order"]),
                    genres: params.all(&["genre", "genres", "genre[]"]),
                    statuses: params.all(&["status", "status[]"]),
                    types: params.all(&["type", "type[]"]),
                })
            }
            "details" | "info" => Action::Details {
                id: params.require("id", &["id", "slug"])?,
            },
            "stream" | "watch" => Action::Stream {
                episode_id: params.require("episodeId", &["episodeId", "episode", "ep", "id"])?,
                server: params.get(&["server"]),
            },
            "genre" | "tag" => Action::Category {
                kind: if action == "genre" {
                    CategoryKind::Genre
                } else {
                    CategoryKind::Tag
                },
                slug: params.require("slug", &["slug", "id", "name", action.as_str()])?,
                page: params.page(),
            },
            "az" | "az-list" => Action::Category {
                kind: CategoryKind::Az,
                slug: params.require("letter", &["letter", "slug", "id"])?,
                page: params.page(),
            },
            "qtip" | "tooltip" => Action::Tooltip {
                id: params.require("id", &["id"])?,
            },
            _ => return Err(DispatchError::UnknownAction(action)),
        };
        Ok(action)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::Home => "home",
            Action::Suggestions { .. } => "suggestions",
            Action::Search(_) => "search",
            Action::Details { .. } => "details",
            Action::Stream { .. } => "stream",
            Action::Category { kind, .. } => kind.path_segment(),
            Action::Tooltip { .. } => "qtip",
        }
    }
}

/// Run one action. "Nothing found" is a successful empty value (`[]`, an
/// empty page, or `null`), never an error.
pub async fn execute(resolver: &Resolver, action: Action) -> Result<Value, DispatchError> {
    let value = match action {
        Action::Home => serde_json::to_value(resolver.home().await?)?,
        Action::Suggestions { keyword } => serde_json::to_value(resolver.suggestions(&keyword).await?)?,
        Action::Search(params) => serde_json::to_value(resolver.search(&params).await?)?,
        Action::Details { id } => serde_json::to_value(resolver.details(&id).await?)?,
        Action::Stream { episode_id, server } => {
            serde_json::to_value(resolver.stream(&episode_id, server.as_deref()).await?)?
        }
        Action::Category { kind, slug, page } => {
            serde_json::to_value(resolver.category(kind, &slug, page).await?)?
        }
        Action::Tooltip { id } => serde_json::to_value(resolver.tooltip(&id).await?)?,
    };
    Ok(value)
}

impl DispatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::MissingParam(_) | DispatchError::UnknownAction(_) => StatusCode::BAD_REQUEST,
            DispatchError::Resolve(ResolveError::InvalidInput(_)) => StatusCode::BAD_REQUEST,
            DispatchError::Resolve(ResolveError::Upstream(e)) if e.is_not_found() => StatusCode::NOT_FOUND,
            DispatchError::Resolve(ResolveError::Upstream(_)) => StatusCode::BAD_GATEWAY,
            DispatchError::Serialize(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable code so clients can tell "host unreachable" from
    /// "host answered with an error" and "bad request".
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::MissingParam(_) => "MISSING_PARAMETER",
            DispatchError::UnknownAction(_) => "UNKNOWN_ACTION",
            DispatchError::Resolve(ResolveError::InvalidInput(_)) => "INVALID_INPUT",
            DispatchError::Resolve(ResolveError::Upstream(e)) => {
                if e.is_unreachable() {
                    "UPSTREAM_UNREACHABLE"
                } else if e.is_not_found() {
                    "NOT_FOUND"
                } else if matches!(e, FetchError::BadStatus { .. }) {
                    "UPSTREAM_STATUS"
                } else {
                    "UPSTREAM_ERROR"
                }
            }
            DispatchError::Serialize(_) => "INTERNAL",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }

    pub fn error(err: &DispatchError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err.to_string()),
            code: Some(err.code()),
        }
    }
}

pub fn respond(result: Result<Value, DispatchError>) -> HttpResponse {
    match result {
        Ok(data) => HttpResponse::Ok().json(ApiResponse::ok(data)),
        Err(e) => {
            let status = e.status();
            if status.is_server_error() {
                log::error!("Request failed: {}", e);
            } else {
                log::warn!("Request rejected: {}", e);
            }
            HttpResponse::build(status).json(ApiResponse::error(&e))
        }
    }
}

#[get("/api")]
pub async fn api(
    data: web::Data<AppState>,
    query: web::Query<Vec<(String, String)>>,
) -> impl Responder {
    let pairs = query.into_inner();
    let result = match Action::from_query(&pairs) {
        Ok(action) => {
            log::info!("Dispatching action '{}'", action.name());
            execute(&data.resolver, action).await
        }
        Err(e) => Err(e),
    };
    respond(result)
}

/// Liveness plus the few settings worth seeing from outside.
#[get("/health")]
pub async fn health(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "baseUrl": data.resolver.base_url().as_str(),
        "proxy": data.config.transport.proxy_url.is_some(),
    }))
}
