//! Game and event routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use frcstats_engine::{EventSnapshot, GameInfo, TeamMatch};

use crate::error::Result;
use crate::handlers::{
    handle_delete_event, handle_delete_match, handle_event_matches, handle_export, handle_import,
    handle_update_match, DeleteResponse, ImportResponse, UpdateMatchRequest,
};
use crate::AppState;

/// Create game and event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games", get(list_games))
        .route("/games/{year}/events/{event}", delete(delete_event))
        .route("/games/{year}/events/{event}/matches", get(event_matches))
        .route("/games/{year}/events/{event}/export", get(export_event))
        .route("/games/{year}/events/{event}/import", post(import_event))
        .route(
            "/games/{year}/events/{event}/matches/{match_number}",
            delete(delete_match).put(update_match),
        )
        .route(
            "/games/{year}/events/{event}/matches/{match_number}/teams/{team}",
            delete(delete_team_match),
        )
}

/// GET /games - List supported games.
async fn list_games(State(state): State<AppState>) -> Json<Vec<GameInfo>> {
    Json(state.registry.games().cloned().collect())
}

/// GET /games/{year}/events/{event}/matches - Event records in match order.
async fn event_matches(
    State(state): State<AppState>,
    Path((year, event)): Path<(String, String)>,
) -> Result<Json<Vec<TeamMatch>>> {
    let engine = state.registry.get(&year)?;
    let matches = handle_event_matches(engine, state.store.as_ref(), &event).await?;
    Ok(Json(matches))
}

/// GET /games/{year}/events/{event}/export - Event snapshot document.
async fn export_event(
    State(state): State<AppState>,
    Path((year, event)): Path<(String, String)>,
) -> Result<Json<EventSnapshot>> {
    let engine = state.registry.get(&year)?;
    let snapshot = handle_export(engine, state.store.as_ref(), &event).await?;
    Ok(Json(snapshot))
}

/// POST /games/{year}/events/{event}/import - Write a snapshot without merging.
async fn import_event(
    State(state): State<AppState>,
    Path((year, event)): Path<(String, String)>,
    Json(snapshot): Json<EventSnapshot>,
) -> Result<(StatusCode, Json<ImportResponse>)> {
    let engine = state.registry.get(&year)?;
    let response =
        handle_import(engine, state.store.as_ref(), &state.sessions, &event, snapshot).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// DELETE /games/{year}/events/{event} - Remove every record of an event.
async fn delete_event(
    State(state): State<AppState>,
    Path((year, event)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    let engine = state.registry.get(&year)?;
    let response = handle_delete_event(engine, state.store.as_ref(), &state.sessions, &event).await?;
    Ok(Json(response))
}

/// PUT /games/{year}/events/{event}/matches/{match} - Renumber a match.
async fn update_match(
    State(state): State<AppState>,
    Path((year, event, match_number)): Path<(String, String, String)>,
    Json(request): Json<UpdateMatchRequest>,
) -> Result<Json<Vec<TeamMatch>>> {
    let engine = state.registry.get(&year)?;
    let matches = handle_update_match(
        engine,
        state.store.as_ref(),
        &state.sessions,
        &event,
        &match_number,
        request,
    )
    .await?;
    Ok(Json(matches))
}

/// DELETE /games/{year}/events/{event}/matches/{match} - Remove a match.
async fn delete_match(
    State(state): State<AppState>,
    Path((year, event, match_number)): Path<(String, String, String)>,
) -> Result<Json<DeleteResponse>> {
    let engine = state.registry.get(&year)?;
    let response = handle_delete_match(
        engine,
        state.store.as_ref(),
        &state.sessions,
        &event,
        &match_number,
        None,
    )
    .await?;
    Ok(Json(response))
}

/// DELETE /games/{year}/events/{event}/matches/{match}/teams/{team} - Remove one team's row.
async fn delete_team_match(
    State(state): State<AppState>,
    Path((year, event, match_number, team)): Path<(String, String, String, String)>,
) -> Result<Json<DeleteResponse>> {
    let engine = state.registry.get(&year)?;
    let response = handle_delete_match(
        engine,
        state.store.as_ref(),
        &state.sessions,
        &event,
        &match_number,
        Some(team.as_str()),
    )
    .await?;
    Ok(Json(response))
}
