//! PostgreSQL-backed record store for the team_matches table.

use async_trait::async_trait;
use frcstats_engine::{
    GameScores, MatchFilter, RecordId, RecordStore, StoreError, StoreResult, TeamMatch,
};
use sqlx::{PgPool, Postgres, Row, Transaction};

/// A stored team-match row from the database.
#[derive(Debug)]
pub struct StoredMatch {
    pub id: i64,
    pub year: String,
    pub event_code: String,
    pub match_number: String,
    pub team_number: String,
    pub scores: serde_json::Value,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredMatch {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredMatch {
            id: row.try_get("id")?,
            year: row.try_get("year")?,
            event_code: row.try_get("event_code")?,
            match_number: row.try_get("match_number")?,
            team_number: row.try_get("team_number")?,
            scores: row.try_get("scores")?,
        })
    }
}

impl StoredMatch {
    /// Convert a database row to an engine record.
    pub fn to_record(&self) -> StoreResult<TeamMatch> {
        let scores: GameScores = serde_json::from_value(self.scores.clone()).map_err(|e| {
            StoreError::Backend(format!("row {} has unreadable scores: {}", self.id, e))
        })?;
        if !scores.matches_game(&self.year) {
            return Err(StoreError::Backend(format!(
                "row {} is stored under {} but scores are for {}",
                self.id,
                self.year,
                scores.game_code()
            )));
        }
        Ok(TeamMatch::new(
            self.event_code.clone(),
            self.match_number.clone(),
            self.team_number.clone(),
            scores,
        )
        .with_id(self.id))
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn scores_json(record: &TeamMatch) -> StoreResult<serde_json::Value> {
    serde_json::to_value(&record.scores).map_err(|e| StoreError::Backend(e.to_string()))
}

const SELECT_COLUMNS: &str =
    "SELECT id, year, event_code, match_number, team_number, scores FROM team_matches";

/// [`RecordStore`] over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace one record inside an open transaction.
    async fn write(tx: &mut Transaction<'_, Postgres>, record: &TeamMatch) -> StoreResult<RecordId> {
        let scores = scores_json(record)?;
        let year = record.game_code();

        let row = match record.id {
            Some(id) => {
                sqlx::query(
                    r#"
                    INSERT INTO team_matches (id, year, event_code, match_number, team_number, scores)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    ON CONFLICT (id) DO UPDATE SET
                        year = EXCLUDED.year,
                        event_code = EXCLUDED.event_code,
                        match_number = EXCLUDED.match_number,
                        team_number = EXCLUDED.team_number,
                        scores = EXCLUDED.scores,
                        updated_at = now()
                    RETURNING id
                    "#,
                )
                .bind(id)
                .bind(&year)
                .bind(&record.event_code)
                .bind(&record.match_number)
                .bind(&record.team_number)
                .bind(&scores)
                .fetch_one(&mut **tx)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO team_matches (year, event_code, match_number, team_number, scores)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(&year)
                .bind(&record.event_code)
                .bind(&record.match_number)
                .bind(&record.team_number)
                .bind(&scores)
                .fetch_one(&mut **tx)
                .await
            }
        }
        .map_err(backend)?;

        row.try_get("id").map_err(backend)
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn query(&self, filter: &MatchFilter) -> StoreResult<Vec<TeamMatch>> {
        let rows = sqlx::query_as::<_, StoredMatch>(&format!(
            r#"
            {SELECT_COLUMNS}
            WHERE year = $1 AND event_code = $2
              AND ($3::TEXT IS NULL OR match_number = $3)
              AND ($4::TEXT IS NULL OR team_number = $4)
            ORDER BY id
            "#
        ))
        .bind(&filter.game)
        .bind(&filter.event_code)
        .bind(&filter.match_number)
        .bind(&filter.team_number)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.iter().map(StoredMatch::to_record).collect()
    }

    async fn get(&self, id: RecordId) -> StoreResult<Option<TeamMatch>> {
        let row = sqlx::query_as::<_, StoredMatch>(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        row.as_ref().map(StoredMatch::to_record).transpose()
    }

    async fn put(&self, record: TeamMatch) -> StoreResult<RecordId> {
        let mut ids = self.bulk_put(vec![record]).await?;
        ids.pop()
            .ok_or_else(|| StoreError::Backend("insert returned no id".to_string()))
    }

    async fn bulk_put(&self, records: Vec<TeamMatch>) -> StoreResult<Vec<RecordId>> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let mut ids = Vec::with_capacity(records.len());
        for record in &records {
            ids.push(Self::write(&mut tx, record).await?);
        }
        // the business-key constraint is deferred, so a batch may swap keys
        tx.commit().await.map_err(backend)?;

        tracing::debug!(rows = ids.len(), "bulk put committed");
        Ok(ids)
    }

    async fn delete(&self, id: RecordId) -> StoreResult<()> {
        sqlx::query("DELETE FROM team_matches WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn bulk_delete(&self, ids: Vec<RecordId>) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        let result = sqlx::query("DELETE FROM team_matches WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        tx.commit().await.map_err(backend)?;

        tracing::debug!(
            requested = ids.len(),
            removed = result.rows_affected(),
            "bulk delete committed"
        );
        Ok(())
    }
}
