//! Application state for the Actix-web server
//!
//! Wrapped in `web::Data` and shared by every handler. Nothing in it is
//! mutated after startup.

use crate::config::Config;
use crate::resolver::Resolver;

pub struct AppState {
    pub resolver: Resolver,
    pub config: Config,
}
