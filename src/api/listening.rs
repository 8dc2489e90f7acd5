use axum::{
    Json,
    extract::{Query, State},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    api::{ApiError, session},
    error::Error,
    server::AppState,
    types::{ListeningPage, UserProfile},
    utils,
};

/// Spotify's history endpoint is asked for its maximum unless told otherwise.
const RECENTLY_PLAYED_DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ViewParams {
    time_range: Option<String>,
    limit: Option<String>,
}

fn require_session(jar: &CookieJar) -> Result<String, ApiError> {
    session::current_session(jar).ok_or(ApiError(Error::NotAuthenticated))
}

pub async fn profile(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<UserProfile>, ApiError> {
    let session_id = require_session(&jar)?;
    Ok(Json(state.listening.profile(&session_id).await?))
}

pub async fn currently_playing(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<Value>, ApiError> {
    let session_id = require_session(&jar)?;
    let item = state.listening.currently_playing(&session_id).await?;

    Ok(Json(json!({
        "playing": item.is_some(),
        "item": item,
    })))
}

pub async fn top_tracks(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<ViewParams>,
) -> Result<Json<ListeningPage>, ApiError> {
    let session_id = require_session(&jar)?;
    let page = state
        .listening
        .top_tracks(
            &session_id,
            params.time_range.as_deref(),
            utils::parse_limit(params.limit.as_deref()),
        )
        .await?;
    Ok(Json(page))
}

pub async fn top_artists(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<ViewParams>,
) -> Result<Json<ListeningPage>, ApiError> {
    let session_id = require_session(&jar)?;
    let page = state
        .listening
        .top_artists(
            &session_id,
            params.time_range.as_deref(),
            utils::parse_limit(params.limit.as_deref()),
        )
        .await?;
    Ok(Json(page))
}

pub async fn recently_played(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<ViewParams>,
) -> Result<Json<ListeningPage>, ApiError> {
    let session_id = require_session(&jar)?;
    let limit = match params.limit.as_deref() {
        Some(raw) => utils::parse_limit(Some(raw)),
        None => Some(RECENTLY_PLAYED_DEFAULT_LIMIT),
    };
    let page = state
        .listening
        .recently_played(&session_id, limit)
        .await?;
    Ok(Json(page))
}
