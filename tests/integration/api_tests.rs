use super::*;
use axum::http::{header, Method, StatusCode};

fn submit(url: &str) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("matchUrl", url)
        .finish();
    Request::builder()
        .method(Method::POST)
        .uri("/submit")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_submit_then_poll_status() -> anyhow::Result<()> {
    let fetcher = ScriptedFetcher::new();
    fetcher.serve(MATCH_URL, score_page("Anadolu Efes", "Fenerbahce", "33", "29", "2nd Quarter"));
    let app = create_test_app(AppConfig::default(), fetcher).await?;

    let (status, headers, _) = send(app.router(), submit(MATCH_URL)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        headers[header::LOCATION],
        "/match-analysis?matchId=match-1&status=started"
    );

    let (status, _, json) = send(app.router(), get("/match-status/match-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["homeTeam"], "Anadolu Efes");
    assert_eq!(json["awayTeam"], "Fenerbahce");
    assert_eq!(json["homeScore"], "33");
    assert_eq!(json["awayScore"], "29");
    assert_eq!(json["period"], "2nd Quarter");
    assert_eq!(json["status"], "2nd Quarter");
    assert_eq!(json["matchStarted"], true);
    assert_eq!(json["phase"], "in_progress");
    assert!(json["lastChecked"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_submit_unreachable_page_redirects_waiting() -> anyhow::Result<()> {
    let app = create_test_app(AppConfig::default(), ScriptedFetcher::new()).await?;

    let (status, headers, _) = send(app.router(), submit(MATCH_URL)).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    assert_eq!(
        headers[header::LOCATION],
        "/match-analysis?matchId=match-1&status=waiting"
    );

    let (_, _, json) = send(app.router(), get("/match-status/match-1")).await;
    assert_eq!(json["status"], "Bekleniyor");
    assert!(json.get("homeTeam").is_none());

    Ok(())
}

#[tokio::test]
async fn test_submit_rejects_non_http_url() -> anyhow::Result<()> {
    let app = create_test_app(AppConfig::default(), ScriptedFetcher::new()).await?;

    let (status, _, json) = send(app.router(), submit("javascript:alert(1)")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(app.tracker.list().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_match_api_lifecycle() -> anyhow::Result<()> {
    let fetcher = ScriptedFetcher::new();
    fetcher.serve(MATCH_URL, score_page("Efes", "Fener", "5", "7", "1st Quarter"));
    fetcher.serve(OTHER_URL, score_page("Real", "Barca", "", "", ""));
    let app = create_test_app(AppConfig::default(), fetcher).await?;

    let (status, _, json) = send(
        app.router(),
        post_json("/api/v1/matches", serde_json::json!({ "url": MATCH_URL })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["matchId"], "match-1");
    assert_eq!(json["data"]["status"], "started");

    let (status, _, json) = send(
        app.router(),
        post_json("/api/v1/matches", serde_json::json!({ "url": OTHER_URL })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["status"], "waiting");

    let (status, _, json) = send(app.router(), get("/api/v1/matches")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["meta"]["total"], 2);
    assert_eq!(json["data"][0]["id"], "match-1");
    assert_eq!(json["data"][1]["sourceUrl"], OTHER_URL);

    app.fetcher.serve(MATCH_URL, score_page("Efes", "Fener", "19", "22", "2nd Quarter"));
    let (status, _, json) = send(
        app.router(),
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/matches/match-1/refresh")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "2nd Quarter");
    assert_eq!(json["data"]["awayScore"], "22");

    let (status, _, json) = send(
        app.router(),
        Request::builder()
            .method(Method::DELETE)
            .uri("/api/v1/matches/match-1")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["refreshCount"], 2);

    let (status, _, json) = send(app.router(), get("/api/v1/matches/match-1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");

    let (status, _, json) = send(app.router(), get("/match-status/match-1")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "Bekleniyor");

    Ok(())
}

#[tokio::test]
async fn test_refresh_unknown_match_is_not_found() -> anyhow::Result<()> {
    let app = create_test_app(AppConfig::default(), ScriptedFetcher::new()).await?;

    let (status, _, _) = send(
        app.router(),
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/matches/ghost/refresh")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn test_pages_render() -> anyhow::Result<()> {
    let app = create_test_app(AppConfig::default(), ScriptedFetcher::new()).await?;

    for uri in ["/", "/match-analysis?matchId=match-1&status=waiting"] {
        let response = app.router().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str()?.to_string();
        assert!(content_type.starts_with("text/html"));
    }

    Ok(())
}

#[tokio::test]
async fn test_scheduler_stats_after_firing() -> anyhow::Result<()> {
    let fetcher = ScriptedFetcher::new();
    fetcher.serve(MATCH_URL, score_page("Efes", "Fener", "8", "6", "1st Quarter"));
    let app = create_test_app(AppConfig::default(), fetcher).await?;

    app.tracker.register(MATCH_URL).await?;
    app.scheduler_run().await;

    let (status, _, json) = send(app.router(), get("/api/v1/scheduler/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["firings"], 1);
    assert_eq!(json["data"]["matches_refreshed"], 1);
    assert_eq!(json["data"]["last_report"]["checked"], 1);

    Ok(())
}
