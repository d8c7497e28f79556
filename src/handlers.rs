use crate::{db, error::AppError, models::Event, state::AppState};
use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

#[derive(Serialize)]
pub struct EventResponse {
    message: String,
    event: Event,
}

#[derive(Serialize)]
pub struct SimilarEventsResponse {
    message: String,
    events: Vec<Event>,
}

fn sanitize_slug(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(
            "Invalid or missing slug parameter".to_string(),
        ));
    }
    Ok(trimmed.to_lowercase())
}

pub async fn get_event_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<EventResponse>, AppError> {
    let sanitized = sanitize_slug(&slug)?;
    let event = db::find_event_by_slug(&state.db, &sanitized)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event with slug '{sanitized}' not found")))?;
    Ok(Json(EventResponse {
        message: "Event fetched successfully".to_string(),
        event,
    }))
}

pub async fn get_similar_events(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<SimilarEventsResponse>, AppError> {
    let sanitized = sanitize_slug(&slug)?;
    let events = db::find_similar_events_by_slug(&state.db, &sanitized).await;
    Ok(Json(SimilarEventsResponse {
        message: "Similar events fetched successfully".to_string(),
        events,
    }))
}

// Matches the bare trailing-slash form of the events route, which axum will
// not feed to the `{slug}` matcher.
pub async fn get_event_missing_slug() -> AppError {
    AppError::BadRequest("Invalid or missing slug parameter".to_string())
}
