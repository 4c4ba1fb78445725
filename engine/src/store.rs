//! Record storage seam and an in-memory implementation.
//!
//! The engine never talks to a database directly. Anything that can look up
//! team matches by id, query them by business key and write or delete them
//! in batches can back a merge session by implementing [`RecordStore`].

use crate::error::StoreError;
use crate::identity::key_of;
use crate::{EventCode, GameCode, MatchKey, MatchNumber, RecordId, TeamMatch, TeamNumber};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// Result type for store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Range filter over one game's records of one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFilter {
    pub game: GameCode,
    pub event_code: EventCode,
    pub match_number: Option<MatchNumber>,
    pub team_number: Option<TeamNumber>,
}

impl MatchFilter {
    /// All records of an event.
    pub fn event(game: impl Into<GameCode>, event_code: impl Into<EventCode>) -> Self {
        Self {
            game: game.into(),
            event_code: event_code.into(),
            match_number: None,
            team_number: None,
        }
    }

    /// Narrow to one match.
    pub fn match_number(mut self, match_number: impl Into<MatchNumber>) -> Self {
        self.match_number = Some(match_number.into());
        self
    }

    /// Narrow to one team.
    pub fn team_number(mut self, team_number: impl Into<TeamNumber>) -> Self {
        self.team_number = Some(team_number.into());
        self
    }

    /// Check whether a record falls inside the filter.
    pub fn matches(&self, record: &TeamMatch) -> bool {
        record.scores.matches_game(&self.game)
            && record.event_code == self.event_code
            && self
                .match_number
                .as_ref()
                .map_or(true, |m| *m == record.match_number)
            && self
                .team_number
                .as_ref()
                .map_or(true, |t| *t == record.team_number)
    }
}

/// Keyed persistent storage for team-match records.
///
/// `put` with an id replaces the row with that id; without an id it inserts a
/// new row and returns the assigned id. Each bulk call is atomic on its own;
/// nothing is promised across calls.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(&self, filter: &MatchFilter) -> StoreResult<Vec<TeamMatch>>;

    async fn get(&self, id: RecordId) -> StoreResult<Option<TeamMatch>>;

    async fn put(&self, record: TeamMatch) -> StoreResult<RecordId>;

    async fn bulk_put(&self, records: Vec<TeamMatch>) -> StoreResult<Vec<RecordId>>;

    async fn delete(&self, id: RecordId) -> StoreResult<()>;

    async fn bulk_delete(&self, ids: Vec<RecordId>) -> StoreResult<()>;
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<RecordId, TeamMatch>,
    next_id: RecordId,
}

impl Table {
    /// Validate a batch of writes against the current rows without applying it.
    fn check_batch(&self, records: &[TeamMatch]) -> StoreResult<()> {
        let mut owners: HashMap<(GameCode, MatchKey), Option<RecordId>> = self
            .rows
            .iter()
            .map(|(id, r)| ((r.game_code(), key_of(r)), Some(*id)))
            .collect();

        for record in records {
            let slot = (record.game_code(), key_of(record));
            if let Some(id) = record.id {
                owners.retain(|_, owner| *owner != Some(id));
            }
            match owners.get(&slot) {
                Some(owner) if record.id.is_none() || *owner != record.id => {
                    return Err(StoreError::Backend(format!(
                        "duplicate business key {}",
                        slot.1
                    )));
                }
                _ => {
                    owners.insert(slot, record.id);
                }
            }
        }
        Ok(())
    }

    fn write(&mut self, mut record: TeamMatch) -> RecordId {
        let id = match record.id {
            Some(id) => id,
            None => {
                self.next_id += 1;
                self.next_id
            }
        };
        self.next_id = self.next_id.max(id);
        record.id = Some(id);
        self.rows.insert(id, record);
        id
    }
}

/// In-memory [`RecordStore`], used by tests, benches and tooling.
///
/// Rejects writes that would leave two rows with the same business key.
#[derive(Debug, Default)]
pub struct MemoryStore {
    table: RwLock<Table>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records, assigning ids where missing.
    pub fn with_records(records: impl IntoIterator<Item = TeamMatch>) -> Self {
        let store = Self::new();
        if let Ok(mut table) = store.table.write() {
            for record in records {
                table.write(record);
            }
        }
        store
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.table.read().map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every stored row, ordered by id.
    pub fn all(&self) -> Vec<TeamMatch> {
        self.table
            .read()
            .map(|t| t.rows.values().cloned().collect())
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Backend("memory store lock poisoned".to_string())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query(&self, filter: &MatchFilter) -> StoreResult<Vec<TeamMatch>> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table
            .rows
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn get(&self, id: RecordId) -> StoreResult<Option<TeamMatch>> {
        let table = self.table.read().map_err(poisoned)?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn put(&self, record: TeamMatch) -> StoreResult<RecordId> {
        let mut table = self.table.write().map_err(poisoned)?;
        table.check_batch(std::slice::from_ref(&record))?;
        Ok(table.write(record))
    }

    async fn bulk_put(&self, records: Vec<TeamMatch>) -> StoreResult<Vec<RecordId>> {
        let mut table = self.table.write().map_err(poisoned)?;
        table.check_batch(&records)?;
        Ok(records.into_iter().map(|r| table.write(r)).collect())
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        let mut table = self.table.write().map_err(poisoned)?;
        table.rows.remove(&id);
        Ok(())
    }

    async fn bulk_delete(&self, ids: Vec<RecordId>) -> StoreResult<()> {
        let mut table = self.table.write().map_err(poisoned)?;
        for id in ids {
            table.rows.remove(&id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DeepSpaceScores, GameScores, PowerUpScores};

    fn power_up(event: &str, match_number: &str, team: &str) -> TeamMatch {
        TeamMatch::new(
            event,
            match_number,
            team,
            GameScores::PowerUp(PowerUpScores::default()),
        )
    }

    #[tokio::test]
    async fn put_assigns_fresh_ids() {
        let store = MemoryStore::new();
        let a = store.put(power_up("casj", "1", "254")).await.unwrap();
        let b = store.put(power_up("casj", "1", "1678")).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(a).await.unwrap().unwrap().id, Some(a));
    }

    #[tokio::test]
    async fn put_with_id_replaces_row() {
        let store = MemoryStore::with_records(vec![power_up("casj", "1", "254")]);
        let mut record = store.all().remove(0);
        if let GameScores::PowerUp(scores) = &mut record.scores {
            scores.fouls = 2;
        }

        let id = store.put(record.clone()).await.unwrap();

        assert_eq!(Some(id), record.id);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn rejects_duplicate_business_key() {
        let store = MemoryStore::with_records(vec![power_up("casj", "1", "254")]);

        let result = store.put(power_up("casj", "1", "254")).await;

        assert!(matches!(result, Err(StoreError::Backend(_))));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn bulk_put_is_all_or_nothing() {
        let store = MemoryStore::with_records(vec![power_up("casj", "1", "254")]);

        let result = store
            .bulk_put(vec![
                power_up("casj", "2", "254"),
                power_up("casj", "1", "254"),
            ])
            .await;

        assert!(result.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn same_key_in_different_games_is_allowed() {
        let store = MemoryStore::new();
        store.put(power_up("casj", "1", "254")).await.unwrap();
        store
            .put(TeamMatch::new(
                "casj",
                "1",
                "254",
                GameScores::DeepSpace(DeepSpaceScores::default()),
            ))
            .await
            .unwrap();

        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn query_narrows_by_filter() {
        let store = MemoryStore::with_records(vec![
            power_up("casj", "1", "254"),
            power_up("casj", "1", "1678"),
            power_up("casj", "2", "254"),
            power_up("txho", "1", "254"),
        ]);

        let event = store.query(&MatchFilter::event("2018", "casj")).await.unwrap();
        assert_eq!(event.len(), 3);

        let one_match = store
            .query(&MatchFilter::event("2018", "casj").match_number("1"))
            .await
            .unwrap();
        assert_eq!(one_match.len(), 2);

        let one_row = store
            .query(
                &MatchFilter::event("2018", "casj")
                    .match_number("1")
                    .team_number("1678"),
            )
            .await
            .unwrap();
        assert_eq!(one_row.len(), 1);

        let other_game = store.query(&MatchFilter::event("2019", "casj")).await.unwrap();
        assert!(other_game.is_empty());
    }

    #[tokio::test]
    async fn bulk_delete_ignores_missing_ids() {
        let store = MemoryStore::with_records(vec![
            power_up("casj", "1", "254"),
            power_up("casj", "2", "254"),
        ]);
        let ids: Vec<_> = store.all().iter().filter_map(|r| r.id).collect();

        store.bulk_delete(vec![ids[0], 999]).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(store.get(ids[0]).await.unwrap().is_none());
    }
}
