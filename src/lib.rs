// Library interface for rust_anime_scraper
// The binary only wires configuration, logging and the HTTP server around it.

pub mod app_state;
pub mod card;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod extractor;
pub mod fallback;
pub mod helpers;
pub mod http_client;
pub mod markup;
pub mod models;
pub mod pagination;
pub mod resolver;
pub mod server_decoder;

pub use error::{DispatchError, ExtractionError, FetchError, ResolveError};
pub use resolver::Resolver;
