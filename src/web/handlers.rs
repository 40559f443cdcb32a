use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Json, Redirect},
    Form,
};
use serde::Deserialize;
use validator::Validate;

use super::{ApiResponse, AppState, WebError};
use crate::models::{MatchId, MatchRecord, MatchSnapshot};
use crate::scheduler::SchedulerStats;
use crate::tracker::Registration;
use crate::utils::error::AppError;

#[derive(Debug, Deserialize)]
pub struct SubmitForm {
    #[serde(rename = "matchUrl")]
    pub match_url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(url(message = "must be an absolute http(s) URL"))]
    pub url: String,
}

// Form handlers

pub async fn submit_match(
    State(state): State<AppState>,
    Form(form): Form<SubmitForm>,
) -> Result<Redirect, WebError> {
    let registration = state.tracker.register(&form.match_url).await?;

    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("matchId", registration.match_id.as_str())
        .append_pair("status", registration.status.as_str())
        .finish();

    Ok(Redirect::to(&format!("/match-analysis?{}", query)))
}

/// Always answers with a snapshot; unknown ids get the pending placeholder.
pub async fn match_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<MatchSnapshot> {
    Json(state.tracker.status(&MatchId::from(id)).await)
}

// Match API handlers

pub async fn register_match(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Registration>>), WebError> {
    request.validate().map_err(AppError::from)?;

    let registration = state.tracker.register(&request.url).await?;
    tracing::info!(
        match_id = %registration.match_id,
        status = %registration.status,
        "Match registered through API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(registration))))
}

pub async fn list_matches(State(state): State<AppState>) -> Json<ApiResponse<Vec<MatchRecord>>> {
    let matches = state.tracker.list().await;
    let meta = serde_json::json!({ "total": matches.len() });
    Json(ApiResponse::success_with_meta(matches, meta))
}

pub async fn get_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MatchRecord>>, WebError> {
    let record = state.tracker.lookup(&MatchId::from(id)).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn delete_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MatchRecord>>, WebError> {
    let record = state.tracker.unregister(&MatchId::from(id)).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn refresh_match(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MatchSnapshot>>, WebError> {
    let snapshot = state.tracker.refresh(&MatchId::from(id)).await?;
    Ok(Json(ApiResponse::success(snapshot)))
}

// Scheduler handlers

pub async fn get_scheduler_stats(
    State(state): State<AppState>,
) -> Json<ApiResponse<SchedulerStats>> {
    let stats = state.scheduler.lock().await.get_stats().await;
    Json(ApiResponse::success(stats))
}
