use axum::{
    extract::State,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::{AppConfig, ServerConfig};
use crate::scheduler::MatchScheduler;
use crate::tracker::MatchTracker;

pub mod handlers;
pub mod responses;

pub use handlers::{
    delete_match, get_match, get_scheduler_stats, list_matches, match_status, refresh_match,
    register_match, submit_match,
};
pub use responses::*;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<MatchTracker>,
    pub scheduler: Arc<tokio::sync::Mutex<MatchScheduler>>,
    pub config: AppConfig,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        // Browser-facing routes
        .route("/", get(index_page))
        .route("/submit", post(submit_match))
        .route("/match-analysis", get(match_analysis_page))
        .route("/match-status/:id", get(match_status))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/matches", get(list_matches).post(register_match))
        .route("/matches/:id", get(get_match).delete(delete_match))
        .route("/matches/:id/refresh", post(refresh_match))
        .route("/scheduler/stats", get(get_scheduler_stats))
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "match-watcher",
        "matches": state.tracker.registry().len().await,
    }))
}

async fn index_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Match Watcher</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        input[type=url] { width: 480px; padding: 6px; }
        button { padding: 6px 14px; }
    </style>
</head>
<body>
    <h1>Match Watcher</h1>
    <form method="post" action="/submit">
        <label for="matchUrl">Match URL</label>
        <input type="url" id="matchUrl" name="matchUrl" required>
        <button type="submit">Track</button>
    </form>
</body>
</html>"#,
    )
}

async fn match_analysis_page() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Match Analysis - Match Watcher</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
        body { font-family: Arial, sans-serif; margin: 40px; }
        #score { font-size: 2em; margin: 20px 0; }
        #meta { color: #6c757d; }
    </style>
</head>
<body>
    <h1>Match Analysis</h1>
    <div id="score">Loading...</div>
    <div id="period"></div>
    <div id="meta"></div>
    <p><a href="/">Track another match</a></p>
    <script>
        const params = new URLSearchParams(window.location.search);
        const matchId = params.get('matchId');

        function render(data) {
            if (data.homeTeam === undefined) {
                document.getElementById('score').textContent = data.status;
                document.getElementById('period').textContent = '';
            } else {
                document.getElementById('score').textContent =
                    data.homeTeam + ' ' + data.homeScore + ' - ' + data.awayScore + ' ' + data.awayTeam;
                document.getElementById('period').textContent = data.status;
            }
            document.getElementById('meta').textContent = 'Last checked: ' + data.lastChecked;
        }

        function poll() {
            fetch('/match-status/' + encodeURIComponent(matchId))
                .then(response => response.json())
                .then(render)
                .catch(error => {
                    document.getElementById('meta').textContent = 'Error: ' + error;
                });
        }

        if (matchId) {
            poll();
            setInterval(poll, 60000);
        } else {
            document.getElementById('score').textContent = 'No match selected';
        }
    </script>
</body>
</html>"#,
    )
}

pub async fn serve<F>(config: &ServerConfig, state: AppState, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server starting on {}:{}", config.host, config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
