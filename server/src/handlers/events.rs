//! Event maintenance handlers: listing, export, simple import and deletes.

use crate::error::{AppError, Result};
use crate::session::{EventGuard, SessionManager};
use frcstats_engine::{EventSnapshot, MergeEngine, RecordStore, TeamMatch, TeamNumber};
use serde::{Deserialize, Serialize};

/// Response for import requests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: usize,
}

/// Response for delete requests.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted: usize,
}

/// Request body for renumbering a match.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMatchRequest {
    /// New match number; the same number keeps the match where it is
    pub match_number: String,
    /// Teams that stay in the match
    pub teams: Vec<TeamNumber>,
}

/// All records of an event, naturally ordered by match.
pub async fn handle_event_matches(
    engine: &MergeEngine,
    store: &dyn RecordStore,
    event_code: &str,
) -> Result<Vec<TeamMatch>> {
    Ok(engine.event_team_matches(store, event_code).await?)
}

/// Export an event as a snapshot document.
pub async fn handle_export(
    engine: &MergeEngine,
    store: &dyn RecordStore,
    event_code: &str,
) -> Result<EventSnapshot> {
    let snapshot = engine.export_event(store, event_code).await?;
    tracing::info!(
        game = engine.game_code(),
        event = event_code,
        matches = snapshot.matches.len(),
        "Exported event"
    );
    Ok(snapshot)
}

/// Bulk-write a snapshot without merging.
pub async fn handle_import(
    engine: &MergeEngine,
    store: &dyn RecordStore,
    sessions: &SessionManager,
    event_code: &str,
    snapshot: EventSnapshot,
) -> Result<ImportResponse> {
    check_event(event_code, &snapshot)?;

    let _guard = lock_idle_event(engine, sessions, event_code).await?;

    let imported = engine.import_simple(store, snapshot).await?;
    Ok(ImportResponse { imported })
}

/// Delete every record of an event.
pub async fn handle_delete_event(
    engine: &MergeEngine,
    store: &dyn RecordStore,
    sessions: &SessionManager,
    event_code: &str,
) -> Result<DeleteResponse> {
    let _guard = lock_idle_event(engine, sessions, event_code).await?;

    let deleted = engine.delete_event(store, event_code).await?;
    tracing::info!(game = engine.game_code(), event = event_code, deleted, "Deleted event");
    Ok(DeleteResponse { deleted })
}

/// Renumber a match and drop teams that left it.
pub async fn handle_update_match(
    engine: &MergeEngine,
    store: &dyn RecordStore,
    sessions: &SessionManager,
    event_code: &str,
    match_number: &str,
    request: UpdateMatchRequest,
) -> Result<Vec<TeamMatch>> {
    if request.match_number.is_empty() {
        return Err(AppError::BadRequest("matchNumber must not be empty".to_string()));
    }

    let _guard = lock_idle_event(engine, sessions, event_code).await?;

    engine
        .update_match(
            store,
            event_code,
            match_number,
            &request.match_number,
            &request.teams,
        )
        .await?;
    Ok(engine.event_team_matches(store, event_code).await?)
}

/// Delete one match, or one team's row of it when `team_number` is given.
pub async fn handle_delete_match(
    engine: &MergeEngine,
    store: &dyn RecordStore,
    sessions: &SessionManager,
    event_code: &str,
    match_number: &str,
    team_number: Option<&str>,
) -> Result<DeleteResponse> {
    let _guard = lock_idle_event(engine, sessions, event_code).await?;

    let deleted = match team_number {
        Some(team) => {
            engine
                .delete_team_match(store, event_code, match_number, team)
                .await?
        }
        None => engine.delete_match(store, event_code, match_number).await?,
    };
    if deleted == 0 {
        return Err(AppError::NotFound(format!(
            "no records for match {} at {}",
            match_number, event_code
        )));
    }
    Ok(DeleteResponse { deleted })
}

/// Take the event's write lock, refusing while a merge session is open on it.
async fn lock_idle_event<'a>(
    engine: &MergeEngine,
    sessions: &'a SessionManager,
    event_code: &str,
) -> Result<EventGuard<'a>> {
    let key = (engine.game_code().to_string(), event_code.to_string());
    let guard = sessions.lock_event(key.clone()).await;
    sessions.ensure_idle(&key)?;
    Ok(guard)
}

/// The snapshot must describe the event named in the path.
pub(crate) fn check_event(event_code: &str, snapshot: &EventSnapshot) -> Result<()> {
    if snapshot.event.event_code != event_code {
        return Err(AppError::BadRequest(format!(
            "snapshot is for event {}, not {}",
            snapshot.event.event_code, event_code
        )));
    }
    Ok(())
}
