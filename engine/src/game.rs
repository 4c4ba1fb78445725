//! Per-game merge engines and the registry that holds them.
//!
//! Every supported game year gets one [`MergeEngine`]. The
//! [`GameRegistry`] is built once at start-up and handed to whoever needs
//! it; there is no global lookup.

use crate::apply::{ApplyPlan, ApplySummary, Applier};
use crate::identity::key_of;
use crate::natsort::natural_cmp;
use crate::snapshot::{EventDescriptor, EventSnapshot};
use crate::store::{MatchFilter, RecordStore};
use crate::{reconcile, Error, GameCode, MergeState, Result, TeamMatch, TeamNumber};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Descriptive data about a supported game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    pub game_code: GameCode,
    pub year: String,
    pub name: String,
}

impl GameInfo {
    pub fn new(game_code: impl Into<GameCode>, year: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            game_code: game_code.into(),
            year: year.into(),
            name: name.into(),
        }
    }
}

/// Merge and maintenance operations for one game's records.
#[derive(Debug, Clone)]
pub struct MergeEngine {
    info: GameInfo,
}

impl MergeEngine {
    pub fn new(info: GameInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &GameInfo {
        &self.info
    }

    pub fn game_code(&self) -> &str {
        &self.info.game_code
    }

    fn event_filter(&self, event_code: &str) -> MatchFilter {
        MatchFilter::event(self.info.game_code.clone(), event_code)
    }

    /// Every record of an event, in natural match order.
    pub async fn event_team_matches<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        event_code: &str,
    ) -> Result<Vec<TeamMatch>> {
        let mut matches = store.query(&self.event_filter(event_code)).await?;
        matches.sort_by(|a, b| {
            natural_cmp(&a.match_number, &b.match_number)
                .then_with(|| a.team_number.cmp(&b.team_number))
        });
        Ok(matches)
    }

    /// Start a merge: validate the snapshot, load the local records of its
    /// event and reconcile the two.
    pub async fn begin_merge<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        mut snapshot: EventSnapshot,
    ) -> Result<Vec<MergeState>> {
        snapshot.validate(&self.info.game_code)?;
        snapshot.clear_ids();

        let local = store
            .query(&self.event_filter(&snapshot.event.event_code))
            .await?;

        tracing::debug!(
            game = %self.info.game_code,
            event = %snapshot.event.event_code,
            local = local.len(),
            imported = snapshot.matches.len(),
            "beginning merge"
        );

        Ok(reconcile(local, snapshot.matches))
    }

    /// Commit a fully resolved merge.
    pub async fn complete_merge<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        states: &[MergeState],
    ) -> Result<ApplySummary> {
        Applier::new(store).apply(states).await
    }

    /// Export an event's records as a snapshot document.
    pub async fn export_event<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        event_code: &str,
    ) -> Result<EventSnapshot> {
        let records = store.query(&self.event_filter(event_code)).await?;
        let event = EventDescriptor::new(self.info.game_code.clone(), event_code);
        Ok(EventSnapshot::from_records(event, records))
    }

    /// Write a snapshot's records straight into the store without merging.
    pub async fn import_simple<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        mut snapshot: EventSnapshot,
    ) -> Result<usize> {
        snapshot.validate(&self.info.game_code)?;
        snapshot.clear_ids();
        let ids = store.bulk_put(snapshot.matches).await?;
        tracing::info!(
            game = %self.info.game_code,
            event = %snapshot.event.event_code,
            imported = ids.len(),
            "imported snapshot without merge"
        );
        Ok(ids.len())
    }

    /// Delete every record of an event. Returns how many were removed.
    pub async fn delete_event<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        event_code: &str,
    ) -> Result<usize> {
        let records = store.query(&self.event_filter(event_code)).await?;
        self.delete_records(store, records).await
    }

    /// Renumber a match and drop rows for teams no longer in it.
    ///
    /// Rows of `old_match` whose team is not in `teams` are deleted; the
    /// remaining rows move to `new_match` when the number changed.
    pub async fn update_match<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        event_code: &str,
        old_match: &str,
        new_match: &str,
        teams: &[TeamNumber],
    ) -> Result<()> {
        let teams: HashSet<&str> = teams.iter().map(String::as_str).collect();
        let records = store
            .query(&self.event_filter(event_code).match_number(old_match))
            .await?;

        let mut plan = ApplyPlan::default();
        for mut record in records {
            let id = record.id;
            match id {
                Some(id) if !teams.contains(record.team_number.as_str()) => {
                    plan.deletes.push((key_of(&record), id));
                    plan.summary.deleted += 1;
                }
                _ if old_match != new_match => {
                    record.match_number = new_match.to_string();
                    plan.upserts.push((key_of(&record), record));
                    plan.summary.updated += 1;
                }
                _ => plan.summary.unchanged += 1,
            }
        }

        tracing::debug!(
            event = event_code,
            old_match,
            new_match,
            moved = plan.upserts.len(),
            dropped = plan.deletes.len(),
            "updating match"
        );

        // same two-batch reporting as a merge, including partial application
        Applier::new(store).execute(plan).await?;
        Ok(())
    }

    /// Delete every team's row of one match.
    pub async fn delete_match<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        event_code: &str,
        match_number: &str,
    ) -> Result<usize> {
        let records = store
            .query(&self.event_filter(event_code).match_number(match_number))
            .await?;
        self.delete_records(store, records).await
    }

    /// Delete a single team's row of one match.
    pub async fn delete_team_match<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        event_code: &str,
        match_number: &str,
        team_number: &str,
    ) -> Result<usize> {
        let filter = self
            .event_filter(event_code)
            .match_number(match_number)
            .team_number(team_number);
        let records = store.query(&filter).await?;
        self.delete_records(store, records).await
    }

    async fn delete_records<S: RecordStore + ?Sized>(
        &self,
        store: &S,
        records: Vec<TeamMatch>,
    ) -> Result<usize> {
        let ids: Vec<_> = records.into_iter().filter_map(|r| r.id).collect();
        let count = ids.len();
        if count > 0 {
            store.bulk_delete(ids).await?;
        }
        Ok(count)
    }
}

/// Map from game code to the engine handling it.
#[derive(Debug, Clone, Default)]
pub struct GameRegistry {
    games: BTreeMap<GameCode, MergeEngine>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every game this crate has a payload for.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(MergeEngine::new(GameInfo::new(
            "2018",
            "2018",
            "FIRST POWER UP",
        )));
        registry.register(MergeEngine::new(GameInfo::new(
            "2019",
            "2019",
            "DESTINATION: DEEP SPACE",
        )));
        registry
    }

    /// Add an engine, replacing any engine for the same game code.
    pub fn register(&mut self, engine: MergeEngine) -> &mut Self {
        self.games.insert(engine.info.game_code.clone(), engine);
        self
    }

    pub fn get(&self, game_code: &str) -> Result<&MergeEngine> {
        self.games
            .get(game_code)
            .ok_or_else(|| Error::UnknownGame(game_code.to_string()))
    }

    pub fn games(&self) -> impl Iterator<Item = &GameInfo> {
        self.games.values().map(|e| &e.info)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GameScores, PowerUpScores};
    use crate::store::MemoryStore;
    use crate::{BatchKind, MatchKey};

    fn record(match_number: &str, team: &str) -> TeamMatch {
        TeamMatch::new(
            "casj",
            match_number,
            team,
            GameScores::PowerUp(PowerUpScores::default()),
        )
    }

    fn engine() -> MergeEngine {
        GameRegistry::standard().get("2018").unwrap().clone()
    }

    #[test]
    fn standard_registry_lists_games() {
        let registry = GameRegistry::standard();
        let codes: Vec<_> = registry.games().map(|g| g.game_code.as_str()).collect();
        assert_eq!(codes, vec!["2018", "2019"]);
        assert_eq!(registry.get("2017").unwrap_err(), Error::UnknownGame("2017".into()));
    }

    #[tokio::test]
    async fn begin_merge_rejects_wrong_year_before_reading() {
        let store = MemoryStore::new();
        let snapshot = EventSnapshot::new(EventDescriptor::new("2019", "casj"));

        let err = engine().begin_merge(&store, snapshot).await.unwrap_err();

        assert!(matches!(err, Error::SchemaMismatch { .. }));
    }

    #[tokio::test]
    async fn event_matches_are_naturally_sorted() {
        let store = MemoryStore::with_records(vec![
            record("qf1", "254"),
            record("10", "254"),
            record("2", "254"),
        ]);

        let matches = engine().event_team_matches(&store, "casj").await.unwrap();
        let order: Vec<_> = matches.iter().map(|m| m.match_number.as_str()).collect();

        assert_eq!(order, vec!["2", "10", "qf1"]);
    }

    #[tokio::test]
    async fn update_match_renumbers_and_drops_teams() {
        let store = MemoryStore::with_records(vec![
            record("1", "254"),
            record("1", "1678"),
            record("1", "971"),
            record("2", "254"),
        ]);
        let teams = vec!["254".to_string(), "1678".to_string()];

        engine()
            .update_match(&store, "casj", "1", "3", &teams)
            .await
            .unwrap();

        let matches = engine().event_team_matches(&store, "casj").await.unwrap();
        let rows: Vec<_> = matches
            .iter()
            .map(|m| (m.match_number.as_str(), m.team_number.as_str()))
            .collect();
        assert_eq!(rows, vec![("2", "254"), ("3", "1678"), ("3", "254")]);
    }

    #[tokio::test]
    async fn update_match_reports_partial_write() {
        let store = MemoryStore::with_records(vec![
            record("1", "254"),
            record("1", "971"),
            record("3", "254"),
        ]);
        let teams = vec!["254".to_string()];

        // 3/254 is taken, so the move fails while the drop of 971 lands
        let err = engine()
            .update_match(&store, "casj", "1", "3", &teams)
            .await
            .unwrap_err();

        match err {
            Error::StoreIo {
                batch,
                keys,
                partially_applied,
                ..
            } => {
                assert_eq!(batch, BatchKind::Upsert);
                assert_eq!(keys, vec![MatchKey::new("casj", "3", "254")]);
                assert!(partially_applied);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        let rows: Vec<_> = store
            .all()
            .into_iter()
            .map(|m| (m.match_number, m.team_number))
            .collect();
        assert_eq!(
            rows,
            vec![("1".to_string(), "254".to_string()), ("3".to_string(), "254".to_string())]
        );
    }

    #[tokio::test]
    async fn delete_helpers_report_counts() {
        let store = MemoryStore::with_records(vec![
            record("1", "254"),
            record("1", "1678"),
            record("2", "254"),
            record("3", "254"),
        ]);
        let engine = engine();

        assert_eq!(engine.delete_team_match(&store, "casj", "1", "254").await.unwrap(), 1);
        assert_eq!(engine.delete_match(&store, "casj", "1").await.unwrap(), 1);
        assert_eq!(engine.delete_event(&store, "casj").await.unwrap(), 2);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn export_then_import_simple_copies_an_event() {
        let source = MemoryStore::with_records(vec![record("1", "254"), record("2", "254")]);
        let target = MemoryStore::new();
        let engine = engine();

        let snapshot = engine.export_event(&source, "casj").await.unwrap();
        let count = engine.import_simple(&target, snapshot).await.unwrap();

        assert_eq!(count, 2);
        assert_eq!(target.len(), 2);
    }
}
