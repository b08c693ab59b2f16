mod common;

use actix_web::{test, web, App};
use common::FakeTransport;
use rust_anime_scraper::app_state::AppState;
use rust_anime_scraper::config::Config;
use rust_anime_scraper::dispatch;
use serde_json::{json, Value};
use std::sync::Arc;

fn state(fake: Arc<FakeTransport>) -> web::Data<AppState> {
    web::Data::new(AppState {
        resolver: common::resolver(fake),
        config: Config::default(),
    })
}

async fn get(fake: Arc<FakeTransport>, uri: &str) -> (u16, Value) {
    let app = test::init_service(
        App::new()
            .app_data(state(fake))
            .service(dispatch::api)
            .service(dispatch::health),
    )
    .await;
    let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
    let status = resp.status().as_u16();
    let body: Value = test::read_body_json(resp).await;
    (status, body)
}

#[actix_web::test]
async fn missing_parameter_is_a_400() {
    let (status, body) = get(Arc::new(FakeTransport::new()), "/api?action=search").await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "MISSING_PARAMETER");
}

#[actix_web::test]
async fn unknown_action_is_a_400() {
    let (status, body) = get(Arc::new(FakeTransport::new()), "/api?action=comments").await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "UNKNOWN_ACTION");
}

#[actix_web::test]
async fn unreachable_upstream_is_distinguished_from_nothing_found() {
    let fake = Arc::new(FakeTransport::new().timeout("anime/fma-2009/"));
    let (status, body) = get(fake, "/api?action=details&id=fma-2009").await;
    assert_eq!(status, 502);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UPSTREAM_UNREACHABLE");

    let fake = Arc::new(FakeTransport::new().html("anime/fma-2009/", "<html><body></body></html>"));
    let (status, body) = get(fake, "/api?action=details&id=fma-2009").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], Value::Null);
}

#[actix_web::test]
async fn missing_title_is_an_empty_success() {
    // Unrouted paths answer 404.
    let (status, body) = get(Arc::new(FakeTransport::new()), "/api?action=details&id=no-such-show").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], Value::Null);

    let (status, body) = get(Arc::new(FakeTransport::new()), "/api?action=qtip&id=99999").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], Value::Null);

    let (status, body) = get(Arc::new(FakeTransport::new()), "/api?action=genre&slug=action&page=40").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["results"], json!([]));
}

#[actix_web::test]
async fn upstream_answers_are_not_reported_as_unreachable() {
    let (status, body) = get(Arc::new(FakeTransport::new()), "/api?action=stream&episodeId=no-such-ep").await;
    assert_eq!(status, 404);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "NOT_FOUND");

    let fake = Arc::new(FakeTransport::new().status("anime/fma-2009/", 503));
    let (status, body) = get(fake, "/api?action=details&id=fma-2009").await;
    assert_eq!(status, 502);
    assert_eq!(body["code"], "UPSTREAM_STATUS");
}

#[actix_web::test]
async fn search_results_are_wrapped() {
    let fake = Arc::new(FakeTransport::new().json(
        "ajax/search?keyword=one+piece",
        json!([{"title": "One Piece", "url": "/anime/one-piece/"}]),
    ));
    let (status, body) = get(fake, "/api?action=search&keyword=one%20piece").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["results"][0]["id"], "one-piece");
    assert_eq!(body["data"]["results"][0]["sourceUrl"], "https://anime.example/anime/one-piece/");
    assert_eq!(body["data"]["pagination"]["hasNextPage"], false);
}

#[actix_web::test]
async fn stream_response_is_flat() {
    let page = format!(
        r#"<div class="server-item" data-embed="{}">Mirror</div>
           <a class="next-episode" data-open-nav-episode="undefined">Next</a>"#,
        common::server_token("Mirror", "https://mirror.example/e/1"),
    );
    let fake = Arc::new(FakeTransport::new().html("episode/ep-1/", page));
    let (status, body) = get(fake, "/api?action=stream&episodeId=ep-1").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["episodeId"], "ep-1");
    assert_eq!(body["data"]["nextEpisodeId"], Value::Null);
    assert_eq!(body["data"]["servers"][0]["name"], "Mirror");
    assert_eq!(body["data"]["selectedServer"]["url"], "https://mirror.example/e/1");
    // The default extractor hits an unrouted embed URL and fails softly.
    assert_eq!(body["data"]["stream"], Value::Null);
}

#[actix_web::test]
async fn health_reports_configuration() {
    let (status, body) = get(Arc::new(FakeTransport::new()), "/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["baseUrl"], "https://anime.example/");
    assert_eq!(body["proxy"], false);
}
