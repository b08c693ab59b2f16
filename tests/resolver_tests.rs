mod common;

use common::{server_token, FailingExtractor, FakeTransport, FixedExtractor};
use rust_anime_scraper::error::{FetchError, ResolveError};
use rust_anime_scraper::models::{CategoryKind, MediaKind, SearchParams, ServerCategory};
use serde_json::json;
use std::sync::Arc;

const FMA_SEARCH_PAGE: &str = r#"<html><body>
  <div class="film_list-wrap">
    <div class="flw-item" data-en-title="Fullmetal Alchemist">
      <a href="/anime/fma-2009/"><img data-src="/posters/fma.jpg"></a>
      <h3 class="film-name">Hagane no Renkinjutsushi</h3>
    </div>
    <div class="flw-item">???</div>
  </div>
</body></html>"#;

fn cards_page(count: usize) -> String {
    let items: String = (1..=count)
        .map(|i| format!(r#"<article><a href="/anime/show-{i}/"><h3>Show {i}</h3></a></article>"#))
        .collect();
    format!(r#"<html><body><div class="listupd">{}</div></body></html>"#, items)
}

#[tokio::test]
async fn search_end_to_end_keeps_only_the_titled_card() {
    let fake = Arc::new(FakeTransport::new().html("search/?keyword=fullmetal&page=1", FMA_SEARCH_PAGE));
    let resolver = common::resolver(fake.clone());

    let page = resolver.search(&SearchParams::keyword("fullmetal")).await.unwrap();

    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, "fma-2009");
    assert_eq!(page.results[0].title, "Fullmetal Alchemist");
    assert_eq!(
        page.results[0].image_url.as_deref(),
        Some("https://anime.example/posters/fma.jpg")
    );
    assert!(!page.pagination.has_next_page);
}

#[tokio::test]
async fn plain_first_page_search_asks_ajax_before_building_the_page_url() {
    let fake = Arc::new(FakeTransport::new().html("search/?keyword=fullmetal&page=1", FMA_SEARCH_PAGE));
    let resolver = common::resolver(fake.clone());

    resolver.search(&SearchParams::keyword("fullmetal")).await.unwrap();

    assert_eq!(
        fake.calls(),
        vec![
            common::url("ajax/search?keyword=fullmetal"),
            common::url("search/?keyword=fullmetal&page=1"),
        ]
    );
}

#[tokio::test]
async fn ajax_hit_never_touches_the_search_page() {
    let fake = Arc::new(FakeTransport::new().json(
        "ajax/search?keyword=naruto",
        json!({"results": [
            {"title": "Naruto", "url": "/anime/naruto/"},
            {"title": "Naruto Shippuden", "url": "/anime/naruto-shippuden/"}
        ]}),
    ));
    let resolver = common::resolver(fake.clone());

    let page = resolver.search(&SearchParams::keyword("naruto")).await.unwrap();

    assert_eq!(page.results.len(), 2);
    assert_eq!(page.pagination.total_results, 2);
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn filtered_search_goes_straight_to_the_page() {
    let fake = Arc::new(FakeTransport::new().html(
        "search/?keyword=fullmetal&page=1&year=2009&genre=action&genre=drama",
        FMA_SEARCH_PAGE,
    ));
    let resolver = common::resolver(fake.clone());

    let params = SearchParams {
        year: Some("2009".into()),
        genres: vec!["action".into(), "drama".into()],
        ..SearchParams::keyword("fullmetal")
    };
    let page = resolver.search(&params).await.unwrap();

    assert_eq!(page.results.len(), 1);
    assert_eq!(fake.calls().len(), 1);
    assert!(!fake.was_called("ajax/search?keyword=fullmetal"));
}

#[tokio::test]
async fn empty_final_step_is_an_empty_success() {
    let fake = Arc::new(
        FakeTransport::new().html("search/?keyword=zzz&page=1", "<html><body>No results</body></html>"),
    );
    let resolver = common::resolver(fake.clone());

    let page = resolver.search(&SearchParams::keyword("zzz")).await.unwrap();

    assert!(page.results.is_empty());
    assert_eq!(page.pagination.total_pages, 1);
}

#[tokio::test]
async fn suggestions_fall_through_and_truncate() {
    let fake = Arc::new(
        FakeTransport::new()
            .status("ajax/search/suggest?keyword=show", 500)
            .json("wp-json/wp/v2/search?search=show&per_page=10", json!([]))
            .html("search/?keyword=show&page=1", cards_page(14)),
    );
    let resolver = common::resolver(fake.clone());

    let cards = resolver.suggestions("show").await.unwrap();

    assert_eq!(cards.len(), 10);
    assert_eq!(cards[0].id, "show-1");
    assert_eq!(
        fake.calls(),
        vec![
            common::url("ajax/search/suggest?keyword=show"),
            common::url("wp-json/wp/v2/search?search=show&per_page=10"),
            common::url("search/?keyword=show&page=1"),
        ]
    );
}

#[tokio::test]
async fn suggestions_accept_html_from_the_json_endpoint() {
    let fake = Arc::new(FakeTransport::new().html(
        "ajax/search/suggest?keyword=bleach",
        r#"<a class="nav-item" href="/anime/bleach/"><div class="film-name">Bleach</div></a>"#,
    ));
    let resolver = common::resolver(fake.clone());

    let cards = resolver.suggestions("bleach").await.unwrap();

    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].title, "Bleach");
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn unreachable_final_step_is_surfaced() {
    let fake = Arc::new(FakeTransport::new().timeout("search/?keyword=x&page=1"));
    let resolver = common::resolver(fake.clone());

    let err = resolver.suggestions("x").await.unwrap_err();

    assert!(matches!(err, ResolveError::Upstream(FetchError::Timeout { .. })));
}

fn detail_page(script: &str) -> String {
    format!(
        r#"<html><body class="single postid-77">
        <div class="anisc-detail"><h2 class="film-name">Fullmetal Alchemist: Brotherhood</h2></div>
        <div class="episodes-list">
          <a href="/episode/fma-2009-episode-3/" data-number="3">EP 3</a>
          <a href="/episode/fma-2009-episode-2/" data-number="2">EP 2</a>
          <a href="/episode/fma-2009-episode-1/" data-number="1">EP 1</a>
        </div>
        <section class="recommendations">
          <article><a href="/anime/static-one/"><h3>Static One</h3></a></article>
        </section>
        <script>{}</script>
        </body></html>"#,
        script
    )
}

#[tokio::test]
async fn recommendations_stop_at_the_script_endpoint() {
    let fake = Arc::new(
        FakeTransport::new()
            .html(
                "anime/fma-2009/",
                detail_page(r#"var recs = "/ajax/recommendations/list?anime=fma-2009";"#),
            )
            .json(
                "ajax/recommendations/list?anime=fma-2009",
                json!([
                    {"title": "Hunter x Hunter", "url": "/anime/hxh/"},
                    {"title": "Attack on Titan", "url": "/anime/aot/"},
                    {"title": "Steins;Gate", "url": "/anime/steins-gate/"}
                ]),
            ),
    );
    let resolver = common::resolver(fake.clone());

    let record = resolver.details("fma-2009").await.unwrap().unwrap();

    assert_eq!(record.recommendations.len(), 3);
    assert_eq!(record.recommendations[0].id, "hxh");
    assert!(!fake.was_called("wp-admin/admin-ajax.php?action=get_recommendations&post_id=77"));
    assert!(!fake.was_called("ajax/recommend/77"));
    assert!(!fake.was_called("wp-json/anime/v1/recommendations/77"));
    assert!(!fake.was_called("ajax/recommend?slug=fma-2009"));
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn recommendations_fall_back_to_the_static_grid() {
    let fake = Arc::new(
        FakeTransport::new()
            .html("anime/fma-2009/", detail_page(""))
            .json("ajax/recommend/77", json!({"results": []})),
    );
    let resolver = common::resolver(fake.clone());

    let record = resolver.details("fma-2009").await.unwrap().unwrap();

    assert_eq!(record.recommendations.len(), 1);
    assert_eq!(record.recommendations[0].title, "Static One");
    assert_eq!(
        fake.calls(),
        vec![
            common::url("anime/fma-2009/"),
            common::url("wp-admin/admin-ajax.php?action=get_recommendations&post_id=77"),
            common::url("ajax/recommend/77"),
            common::url("wp-json/anime/v1/recommendations/77"),
            common::url("ajax/recommend?slug=fma-2009"),
        ]
    );
}

#[tokio::test]
async fn details_episodes_are_ascending() {
    let fake = Arc::new(FakeTransport::new().html("anime/fma-2009/", detail_page("")));
    let resolver = common::resolver(fake.clone());

    let record = resolver.details("fma-2009").await.unwrap().unwrap();

    let ids: Vec<&str> = record.episodes.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(
        ids,
        vec!["fma-2009-episode-1", "fma-2009-episode-2", "fma-2009-episode-3"]
    );
}

#[tokio::test]
async fn details_of_an_empty_page_is_none() {
    let fake = Arc::new(FakeTransport::new().html("anime/gone/", "<html><body></body></html>"));
    let resolver = common::resolver(fake.clone());

    assert!(resolver.details("gone").await.unwrap().is_none());
}

fn watch_page() -> String {
    format!(
        r##"<html><body>
        <iframe id="iframe-embed" src="https://alpha.example/embed/1"></iframe>
        <div class="servers-sub">
          <div class="server-item" data-embed="{}">Alpha</div>
          <div class="server-item" data-embed="{}">VMoly</div>
          <div class="server-item" data-embed="garbage">Broken</div>
        </div>
        <div class="servers-dub">
          <div class="server-item" data-embed="{}">Alpha Dub</div>
        </div>
        <a class="prev-episode" data-open-nav-episode="fma-2009-episode-0" href="/episode/fma-2009-episode-0/">Prev</a>
        <a class="next-episode" data-open-nav-episode="undefined" href="#">Next</a>
        </body></html>"##,
        server_token("Alpha", "https://alpha.example/embed/1"),
        server_token("VMoly", r#"<iframe src="https://vmoly.example/e/abc"></iframe>"#),
        server_token("Alpha Dub", "https://alpha.example/embed/1-dub"),
    )
}

#[tokio::test]
async fn stream_survives_extraction_failure() {
    let fake = Arc::new(FakeTransport::new().html("episode/fma-2009-episode-1/", watch_page()));
    let extractor = Arc::new(FailingExtractor::default());
    let resolver = common::resolver(fake.clone()).with_extractor(extractor.clone());

    let response = resolver.stream("fma-2009-episode-1", None).await.unwrap();

    assert!(response.stream.is_none());
    assert_eq!(response.bundle.servers.len(), 3);
    assert_eq!(response.bundle.next_episode_id, None);
    assert_eq!(response.bundle.prev_episode_id.as_deref(), Some("fma-2009-episode-0"));
    assert!(response.bundle.requires_extraction);
    assert_eq!(response.bundle.servers_in(ServerCategory::Dub).count(), 1);

    let selected = response.selected_server.unwrap();
    assert_eq!(selected.name, "VMoly");
    assert!(selected.is_embed);
    assert_eq!(
        *extractor.seen.lock().unwrap(),
        vec!["https://vmoly.example/e/abc".to_string()]
    );
}

#[tokio::test]
async fn stream_requested_server_wins() {
    let fake = Arc::new(FakeTransport::new().html("episode/fma-2009-episode-1/", watch_page()));
    let resolver = common::resolver(fake.clone())
        .with_extractor(Arc::new(FixedExtractor("https://cdn.example/master.m3u8")));

    let response = resolver.stream("fma-2009-episode-1", Some("alpha dub")).await.unwrap();

    assert_eq!(response.selected_server.unwrap().name, "Alpha Dub");
    let media = response.stream.unwrap();
    assert_eq!(media.url, "https://cdn.example/master.m3u8");
    assert_eq!(media.referer.as_deref(), Some("https://alpha.example/embed/1-dub"));
}

#[tokio::test]
async fn default_extractor_scans_the_embed_page() {
    let fake = Arc::new(
        FakeTransport::new()
            .html("episode/fma-2009-episode-1/", watch_page())
            .html_at(
                "https://vmoly.example/e/abc",
                r#"<script>player.setup({sources:[{file:"https://cdn.vmoly.example/hls/abc/master.m3u8"}]})</script>"#,
            ),
    );
    let resolver = common::resolver(fake.clone());

    let response = resolver.stream("fma-2009-episode-1", None).await.unwrap();

    let media = response.stream.unwrap();
    assert_eq!(media.kind, MediaKind::Hls);
    assert_eq!(media.url, "https://cdn.vmoly.example/hls/abc/master.m3u8");
    assert_eq!(media.referer.as_deref(), Some("https://vmoly.example/e/abc"));
}

#[tokio::test]
async fn category_page_with_pagination() {
    let html = r#"<html><body>
        <div class="listupd">
          <article><a href="/anime/a/"><h3>A</h3></a></article>
          <article><a href="/anime/b/"><h3>B</h3></a></article>
        </div>
        <div class="pagination">
          <a href="/genre/action/">1</a><span class="current">2</span><a href="/genre/action/page/3/">3</a>
        </div>
    </body></html>"#;
    let fake = Arc::new(FakeTransport::new().html("genre/action/page/2/", html));
    let resolver = common::resolver(fake.clone());

    let page = resolver.category(CategoryKind::Genre, "action", 2).await.unwrap();

    assert_eq!(page.results.len(), 2);
    assert_eq!(page.pagination.current_page, 2);
    assert_eq!(page.pagination.total_pages, 3);
    assert!(page.pagination.has_next_page);
}

#[tokio::test]
async fn az_first_page_has_no_page_segment() {
    let fake = Arc::new(FakeTransport::new().html("az-list/b/", cards_page(3)));
    let resolver = common::resolver(fake.clone());

    let page = resolver.category(CategoryKind::Az, "b", 1).await.unwrap();

    assert_eq!(page.results.len(), 3);
    assert_eq!(fake.calls(), vec![common::url("az-list/b/")]);
}

#[tokio::test]
async fn tooltip_parses_the_wrapped_fragment() {
    let fake = Arc::new(FakeTransport::new().json(
        "ajax/qtip/fma-2009",
        json!({"status": true, "html": r#"<div class="pre-qtip-title">Fullmetal Alchemist: Brotherhood</div>
            <div class="pre-qtip-description">Two brothers.</div>
            <div class="pre-qtip-line"><span>Status:</span> Finished Airing</div>"#}),
    ));
    let resolver = common::resolver(fake.clone());

    let tip = resolver.tooltip("fma-2009").await.unwrap().unwrap();

    assert_eq!(tip.name.as_deref(), Some("Fullmetal Alchemist: Brotherhood"));
    assert_eq!(tip.description.as_deref(), Some("Two brothers."));
    assert_eq!(tip.status.as_deref(), Some("Finished Airing"));
}

#[tokio::test]
async fn home_degrades_when_upcoming_is_unreachable() {
    let html = r#"<html><body>
        <div id="slider"><div class="swiper-slide"><a href="/anime/spot/"><h2>Spot</h2></a></div></div>
        <div class="popular"><article><a href="/anime/pop/"><h3>Pop</h3></a></article></div>
    </body></html>"#;
    let fake = Arc::new(FakeTransport::new().html("", html).status("upcoming/", 503));
    let resolver = common::resolver(fake.clone());

    let feed = resolver.home().await.unwrap();

    assert_eq!(feed.spotlight[0].id, "spot");
    assert_eq!(feed.popular[0].id, "pop");
    assert!(feed.upcoming.is_empty());
    assert_eq!(fake.calls().len(), 2);
}

#[tokio::test]
async fn home_fails_when_the_host_is_unreachable() {
    let fake = Arc::new(FakeTransport::new().timeout("").html("upcoming/", cards_page(2)));
    let resolver = common::resolver(fake.clone());

    assert!(matches!(resolver.home().await, Err(ResolveError::Upstream(_))));
}
