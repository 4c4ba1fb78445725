//! Commit a resolved merge to a [`RecordStore`].
//!
//! Applying happens in two steps. First the whole state set is checked and
//! classified into an [`ApplyPlan`]; nothing touches the store if any state
//! is unresolved or contradictory. Then the plan's upsert batch and delete
//! batch are submitted concurrently. Their id sets are disjoint because each
//! business key (and therefore each persisted id) yields a single outcome.
//!
//! There is no rollback across batches. When one batch fails after the other
//! succeeded, the error says so (`partially_applied`) and lists the keys of
//! the failed batch.

use crate::error::BatchKind;
use crate::resolution::{final_outcome, unresolved_keys, Outcome};
use crate::store::RecordStore;
use crate::{Error, MatchKey, MergeState, RecordId, Result, TeamMatch};
use serde::{Deserialize, Serialize};

/// Counts of what an apply did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

/// Store mutations derived from a fully resolved state set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplyPlan {
    /// Records to write, each with the key it resolves
    pub upserts: Vec<(MatchKey, TeamMatch)>,
    /// Ids to delete, each with the key it resolves
    pub deletes: Vec<(MatchKey, RecordId)>,
    pub summary: ApplySummary,
}

impl ApplyPlan {
    /// Check and classify every state.
    ///
    /// Fails with [`Error::UnresolvedMerge`] listing every unresolved key
    /// before looking at any outcome.
    pub fn from_states(states: &[MergeState]) -> Result<Self> {
        let unresolved = unresolved_keys(states);
        if !unresolved.is_empty() {
            return Err(Error::UnresolvedMerge { keys: unresolved });
        }

        let mut plan = Self::default();
        for state in states {
            match final_outcome(state)? {
                Outcome::NoOp => plan.summary.unchanged += 1,
                Outcome::Insert { record } => {
                    plan.summary.inserted += 1;
                    plan.upserts.push((state.key(), record));
                }
                Outcome::Upsert { record, .. } => {
                    plan.summary.updated += 1;
                    plan.upserts.push((state.key(), record));
                }
                Outcome::Delete { id } => {
                    plan.summary.deleted += 1;
                    plan.deletes.push((state.key(), id));
                }
            }
        }
        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty()
    }
}

/// Writes resolved merges into a store.
pub struct Applier<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> Applier<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Validate, classify and commit a state set.
    pub async fn apply(&self, states: &[MergeState]) -> Result<ApplySummary> {
        let plan = ApplyPlan::from_states(states)?;
        self.execute(plan).await
    }

    /// Submit a plan's two batches concurrently.
    pub async fn execute(&self, plan: ApplyPlan) -> Result<ApplySummary> {
        let summary = plan.summary;
        if plan.is_empty() {
            tracing::debug!(unchanged = summary.unchanged, "merge has nothing to write");
            return Ok(summary);
        }

        let (upsert_keys, records): (Vec<_>, Vec<_>) = plan.upserts.into_iter().unzip();
        let (delete_keys, ids): (Vec<_>, Vec<_>) = plan.deletes.into_iter().unzip();

        let upserts = async {
            if records.is_empty() {
                return Ok(());
            }
            self.store.bulk_put(records).await.map(|_| ())
        };
        let deletes = async {
            if ids.is_empty() {
                return Ok(());
            }
            self.store.bulk_delete(ids).await
        };

        let (upsert_result, delete_result) = futures::join!(upserts, deletes);

        match (upsert_result, delete_result) {
            (Ok(()), Ok(())) => {
                tracing::info!(
                    inserted = summary.inserted,
                    updated = summary.updated,
                    deleted = summary.deleted,
                    unchanged = summary.unchanged,
                    "merge applied"
                );
                Ok(summary)
            }
            (Err(e), Ok(())) => {
                let partially_applied = !delete_keys.is_empty();
                tracing::warn!(error = %e, partially_applied, "upsert batch failed");
                Err(Error::StoreIo {
                    batch: BatchKind::Upsert,
                    keys: upsert_keys,
                    partially_applied,
                    message: e.to_string(),
                })
            }
            (Ok(()), Err(e)) => {
                let partially_applied = !upsert_keys.is_empty();
                tracing::warn!(error = %e, partially_applied, "delete batch failed");
                Err(Error::StoreIo {
                    batch: BatchKind::Delete,
                    keys: delete_keys,
                    partially_applied,
                    message: e.to_string(),
                })
            }
            (Err(upsert_err), Err(delete_err)) => {
                tracing::warn!(%upsert_err, %delete_err, "both merge batches failed");
                Err(Error::StoreIo {
                    batch: BatchKind::Upsert,
                    keys: upsert_keys,
                    partially_applied: false,
                    message: format!("{}; delete batch also failed: {}", upsert_err, delete_err),
                })
            }
        }
    }
}
