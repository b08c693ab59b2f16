use actix_web::{web, App, HttpServer};
use log::{error, info};
use rust_anime_scraper::app_state::AppState;
use rust_anime_scraper::config::Config;
use rust_anime_scraper::dispatch;
use rust_anime_scraper::resolver::Resolver;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::load();

    let transport = match cfg.create_transport() {
        Ok(t) => Arc::new(t),
        Err(e) => {
            error!("Failed to create HTTP transport: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e));
        }
    };

    info!("HTTP transport initialized:");
    info!("  Upstream: {}", cfg.base_url);
    info!(
        "  Timeouts: {}s html / {}s json",
        cfg.transport.html_timeout_secs, cfg.transport.json_timeout_secs
    );
    info!("  Proxy: {}", if transport.uses_proxy() { "enabled" } else { "direct" });

    let resolver = match Resolver::new(transport, &cfg.base_url, cfg.resolver.clone()) {
        Ok(r) => r,
        Err(e) => {
            error!("Invalid upstream configuration: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    let bind_addr = cfg.bind_addr.clone();
    let data = web::Data::new(AppState {
        resolver,
        config: cfg,
    });

    info!("Listening on http://{}", bind_addr);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .service(dispatch::api)
            .service(dispatch::health)
    })
    .bind(&bind_addr)?
    .run()
    .await
}
