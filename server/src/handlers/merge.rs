//! Merge session handlers: begin, inspect, resolve, complete, abandon.

use crate::error::{AppError, Result};
use crate::session::{MergeSession, SessionManager};
use chrono::{DateTime, Utc};
use frcstats_engine::{
    unresolved_keys, ApplySummary, Error as EngineError, EventSnapshot, MatchKey, MergeEngine,
    MergeState, MergeStats, RecordStore, Resolution,
};
use serde::{Deserialize, Serialize};

/// A merge session as returned to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: String,
    pub game: String,
    pub event_code: String,
    pub stats: MergeStats,
    /// Keys still waiting for a decision
    pub unresolved: Vec<MatchKey>,
    pub states: Vec<MergeState>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<MergeSession> for SessionView {
    fn from(session: MergeSession) -> Self {
        Self {
            stats: MergeStats::from_states(&session.states),
            unresolved: unresolved_keys(&session.states),
            session_id: session.id,
            game: session.game,
            event_code: session.event_code,
            states: session.states,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

/// Request body for submitting resolutions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub resolutions: Vec<ResolutionItem>,
}

/// One decision for one (match, team) of the session's event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionItem {
    pub match_number: String,
    pub team_number: String,
    pub resolution: Resolution,
}

/// Response for a completed merge.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteResponse {
    pub session_id: String,
    pub summary: ApplySummary,
}

/// Reconcile an uploaded snapshot against the store and open a session.
pub async fn handle_begin_merge(
    engine: &MergeEngine,
    store: &dyn RecordStore,
    sessions: &SessionManager,
    snapshot: EventSnapshot,
) -> Result<SessionView> {
    let event_code = snapshot.event.event_code.clone();
    let _guard = sessions
        .lock_event((engine.game_code().to_string(), event_code.clone()))
        .await;

    let states = engine.begin_merge(store, snapshot).await?;
    let session = sessions.open(engine.game_code().to_string(), event_code, states)?;
    Ok(session.into())
}

/// Look up a session of this game.
pub fn handle_get_session(
    engine: &MergeEngine,
    sessions: &SessionManager,
    session_id: &str,
) -> Result<SessionView> {
    Ok(session_for_game(engine, sessions, session_id)?.into())
}

/// Apply a batch of resolutions.
///
/// The batch is all-or-nothing: if any item is rejected the session keeps
/// its previous states.
pub async fn handle_resolve(
    engine: &MergeEngine,
    sessions: &SessionManager,
    session_id: &str,
    request: ResolveRequest,
) -> Result<SessionView> {
    let session = session_for_game(engine, sessions, session_id)?;
    let _guard = sessions.lock_event(session.event_key()).await;

    // re-read under the lock
    let mut session = session_for_game(engine, sessions, session_id)?;
    for item in request.resolutions {
        let key = MatchKey::new(
            session.event_code.clone(),
            item.match_number,
            item.team_number,
        );
        let state = session
            .states
            .iter_mut()
            .find(|s| s.key() == key)
            .ok_or_else(|| AppError::NotFound(format!("no merge item for {}", key)))?;
        state.apply_resolution(item.resolution)?;
    }

    sessions.update_states(session_id, session.states.clone())?;
    tracing::debug!(
        session = session_id,
        unresolved = unresolved_keys(&session.states).len(),
        "Resolutions applied"
    );
    Ok(session.into())
}

/// Apply a fully resolved session to the store and close it.
///
/// An unresolved session stays open. A store failure also closes it, since
/// its states no longer describe the store.
pub async fn handle_complete(
    engine: &MergeEngine,
    store: &dyn RecordStore,
    sessions: &SessionManager,
    session_id: &str,
) -> Result<CompleteResponse> {
    let session = session_for_game(engine, sessions, session_id)?;
    let _guard = sessions.lock_event(session.event_key()).await;

    let session = session_for_game(engine, sessions, session_id)?;
    match engine.complete_merge(store, &session.states).await {
        Ok(summary) => {
            sessions.close(session_id);
            Ok(CompleteResponse {
                session_id: session.id,
                summary,
            })
        }
        Err(err @ EngineError::StoreIo { .. }) => {
            sessions.close(session_id);
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}

/// Drop a session without applying it.
pub fn handle_abandon(
    engine: &MergeEngine,
    sessions: &SessionManager,
    session_id: &str,
) -> Result<()> {
    session_for_game(engine, sessions, session_id)?;
    sessions.close(session_id);
    Ok(())
}

fn session_for_game(
    engine: &MergeEngine,
    sessions: &SessionManager,
    session_id: &str,
) -> Result<MergeSession> {
    let session = sessions.get(session_id)?;
    if session.game != engine.game_code() {
        return Err(AppError::NotFound(format!(
            "merge session {} is not a {} session",
            session_id,
            engine.game_code()
        )));
    }
    Ok(session)
}
