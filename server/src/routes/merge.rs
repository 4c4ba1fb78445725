//! Merge session routes.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use frcstats_engine::EventSnapshot;

use crate::error::Result;
use crate::handlers::{
    handle_abandon, handle_begin_merge, handle_complete, handle_get_session, handle_resolve,
    CompleteResponse, ResolveRequest, SessionView,
};
use crate::AppState;

/// Create merge session routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/games/{year}/merge", post(begin_merge))
        .route(
            "/games/{year}/merge/{session}",
            get(get_session).delete(abandon),
        )
        .route("/games/{year}/merge/{session}/resolve", post(resolve))
        .route("/games/{year}/merge/{session}/complete", post(complete))
}

/// POST /games/{year}/merge - Reconcile a snapshot and open a session.
async fn begin_merge(
    State(state): State<AppState>,
    Path(year): Path<String>,
    Json(snapshot): Json<EventSnapshot>,
) -> Result<(StatusCode, Json<SessionView>)> {
    let engine = state.registry.get(&year)?;
    let view = handle_begin_merge(engine, state.store.as_ref(), &state.sessions, snapshot).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /games/{year}/merge/{session} - Current session states.
async fn get_session(
    State(state): State<AppState>,
    Path((year, session)): Path<(String, String)>,
) -> Result<Json<SessionView>> {
    let engine = state.registry.get(&year)?;
    Ok(Json(handle_get_session(engine, &state.sessions, &session)?))
}

/// POST /games/{year}/merge/{session}/resolve - Submit resolutions.
async fn resolve(
    State(state): State<AppState>,
    Path((year, session)): Path<(String, String)>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<SessionView>> {
    let engine = state.registry.get(&year)?;
    let view = handle_resolve(engine, &state.sessions, &session, request).await?;
    Ok(Json(view))
}

/// POST /games/{year}/merge/{session}/complete - Apply the session.
async fn complete(
    State(state): State<AppState>,
    Path((year, session)): Path<(String, String)>,
) -> Result<Json<CompleteResponse>> {
    let engine = state.registry.get(&year)?;
    let response = handle_complete(engine, state.store.as_ref(), &state.sessions, &session).await?;
    Ok(Json(response))
}

/// DELETE /games/{year}/merge/{session} - Abandon the session.
async fn abandon(
    State(state): State<AppState>,
    Path((year, session)): Path<(String, String)>,
) -> Result<StatusCode> {
    let engine = state.registry.get(&year)?;
    handle_abandon(engine, &state.sessions, &session)?;
    Ok(StatusCode::NO_CONTENT)
}
