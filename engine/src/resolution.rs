//! Resolution of merge states and derivation of their final outcome.
//!
//! A conflicting [`MergeState`] is resolved externally (usually by a person)
//! with one of the [`Resolution`] choices. Once every state is resolved,
//! [`final_outcome`] maps each one to the store mutation it implies.
//!
//! Outcome priority:
//!
//! 1. `same` → no-op
//! 2. both `takeLocal` and `takeFromFile` → contradictory
//! 3. `takeLocal` → no-op, the persisted value stays
//! 4. `takeFromFile` → insert the imported record, replacing the local row
//!    (same surrogate id) when there is one
//! 5. no flags, local-only → delete the local row
//! 6. `merged` → upsert over the local id, or insert
//! 7. anything else is unresolved

use crate::identity::key_of;
use crate::{Error, MatchKey, MergeState, RecordId, Result, TeamMatch};
use serde::{Deserialize, Serialize};

/// Choice made for a single merge state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "choice", content = "record", rename_all = "camelCase")]
pub enum Resolution {
    /// Keep the persisted value
    TakeLocal,
    /// Replace with the imported value
    TakeFromFile,
    /// Store a custom merged value
    Merged(TeamMatch),
    /// Remove a record that is absent from the import
    Delete,
}

/// Store mutation implied by a resolved merge state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Outcome {
    NoOp,
    /// Write a new row; the record carries no id
    Insert { record: TeamMatch },
    Delete { id: RecordId },
    /// Overwrite an existing row; the record carries `id`
    Upsert { record: TeamMatch, id: RecordId },
}

impl MergeState {
    /// Keep the persisted record.
    pub fn take_local(&mut self) -> Result<()> {
        if self.local_saved.is_none() {
            return Err(Error::NotMergeable(self.key()));
        }
        self.set_resolution(true, false, None);
        Ok(())
    }

    /// Take the imported record.
    pub fn take_from_file(&mut self) -> Result<()> {
        if self.from_file.is_none() {
            return Err(Error::NotMergeable(self.key()));
        }
        self.set_resolution(false, true, None);
        Ok(())
    }

    /// Resolve with a custom value. The record must have this state's key;
    /// any id it carries is dropped.
    pub fn merge_with(&mut self, record: TeamMatch) -> Result<()> {
        let key = self.key();
        let actual = key_of(&record);
        if actual != key {
            return Err(Error::KeyMismatch {
                expected: key,
                actual,
            });
        }
        if self.from_file.is_none() {
            return Err(Error::NotMergeable(key));
        }
        self.set_resolution(false, false, Some(record.without_id()));
        Ok(())
    }

    /// Delete the persisted record. Only valid when the import lacks it.
    pub fn mark_for_deletion(&mut self) -> Result<()> {
        if self.local_saved.is_none() || self.from_file.is_some() {
            return Err(Error::NotMergeable(self.key()));
        }
        self.set_resolution(false, false, None);
        Ok(())
    }

    /// Apply an externally supplied resolution.
    pub fn apply_resolution(&mut self, resolution: Resolution) -> Result<()> {
        match resolution {
            Resolution::TakeLocal => self.take_local(),
            Resolution::TakeFromFile => self.take_from_file(),
            Resolution::Merged(record) => self.merge_with(record),
            Resolution::Delete => self.mark_for_deletion(),
        }
    }

    fn set_resolution(&mut self, take_local: bool, take_from_file: bool, merged: Option<TeamMatch>) {
        self.take_local = take_local;
        self.take_from_file = take_from_file;
        self.merged = merged;
        self.resolved = true;
    }
}

/// Whether every state has a determinate outcome.
pub fn all_resolved(states: &[MergeState]) -> bool {
    states.iter().all(|s| s.resolved)
}

/// Keys of the states still awaiting a resolution.
pub fn unresolved_keys(states: &[MergeState]) -> Vec<MatchKey> {
    states
        .iter()
        .filter(|s| !s.resolved)
        .map(MergeState::key)
        .collect()
}

/// Derive the store mutation for a state.
pub fn final_outcome(state: &MergeState) -> Result<Outcome> {
    if state.same {
        return Ok(Outcome::NoOp);
    }

    let key = state.key();
    if !state.resolved {
        return Err(Error::UnresolvedMerge { keys: vec![key] });
    }

    if state.take_local && state.take_from_file {
        return Err(contradiction(key, "both takeLocal and takeFromFile are set"));
    }

    if state.take_local {
        if state.local_saved.is_none() {
            return Err(contradiction(key, "takeLocal without a persisted record"));
        }
        return Ok(Outcome::NoOp);
    }

    if state.take_from_file {
        let imported = state
            .from_file
            .as_ref()
            .ok_or_else(|| contradiction(key.clone(), "takeFromFile without an imported record"))?;
        return write_over_local(state, imported, key);
    }

    if let (Some(local), None) = (&state.local_saved, &state.from_file) {
        let id = local
            .id
            .ok_or_else(|| contradiction(key, "persisted record has no id"))?;
        return Ok(Outcome::Delete { id });
    }

    if let Some(merged) = &state.merged {
        let actual = key_of(merged);
        if actual != key {
            return Err(Error::KeyMismatch {
                expected: key,
                actual,
            });
        }
        return write_over_local(state, merged, key);
    }

    Err(Error::UnresolvedMerge { keys: vec![key] })
}

/// Insert `record`, or upsert it over the local row's id when one exists.
fn write_over_local(state: &MergeState, record: &TeamMatch, key: MatchKey) -> Result<Outcome> {
    match &state.local_saved {
        Some(local) => {
            let id = local
                .id
                .ok_or_else(|| contradiction(key, "persisted record has no id"))?;
            Ok(Outcome::Upsert {
                record: record.without_id().with_id(id),
                id,
            })
        }
        None => Ok(Outcome::Insert {
            record: record.without_id(),
        }),
    }
}

fn contradiction(key: MatchKey, reason: &str) -> Error {
    Error::ContradictoryResolution {
        key,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile;
    use crate::record::{GameScores, PowerUpScores};

    fn record(match_number: &str, team: &str, score: u32) -> TeamMatch {
        TeamMatch::new(
            "casj",
            match_number,
            team,
            GameScores::PowerUp(PowerUpScores {
                tele_switch_cubes: score,
                ..Default::default()
            }),
        )
    }

    fn conflict() -> MergeState {
        reconcile(
            vec![record("1", "100", 10).with_id(5)],
            vec![record("1", "100", 15)],
        )
        .remove(0)
    }

    #[test]
    fn same_is_always_noop() {
        let mut state = reconcile(
            vec![record("1", "100", 10).with_id(5)],
            vec![record("1", "100", 10)],
        )
        .remove(0);
        state.take_local = true;
        state.take_from_file = true;

        assert_eq!(final_outcome(&state).unwrap(), Outcome::NoOp);
    }

    #[test]
    fn unresolved_conflict_is_an_error() {
        let state = conflict();
        assert!(!all_resolved(std::slice::from_ref(&state)));
        assert_eq!(
            final_outcome(&state),
            Err(Error::UnresolvedMerge {
                keys: vec![MatchKey::new("casj", "1", "100")]
            })
        );
    }

    #[test]
    fn take_local_is_noop() {
        let mut state = conflict();
        state.take_local().unwrap();
        assert!(state.resolved);
        assert_eq!(final_outcome(&state).unwrap(), Outcome::NoOp);
    }

    #[test]
    fn take_from_file_replaces_local_row() {
        let mut state = conflict();
        state.take_from_file().unwrap();

        let expected = record("1", "100", 15).with_id(5);
        assert_eq!(
            final_outcome(&state).unwrap(),
            Outcome::Upsert {
                record: expected,
                id: 5
            }
        );
    }

    #[test]
    fn merged_value_keeps_local_id() {
        let mut state = conflict();
        state.merge_with(record("1", "100", 15).with_id(99)).unwrap();

        assert_eq!(state.merged.as_ref().unwrap().id, None);
        assert_eq!(
            final_outcome(&state).unwrap(),
            Outcome::Upsert {
                record: record("1", "100", 15).with_id(5),
                id: 5
            }
        );
    }

    #[test]
    fn merged_value_must_match_key() {
        let mut state = conflict();
        let err = state.merge_with(record("2", "100", 15)).unwrap_err();
        assert!(matches!(err, Error::KeyMismatch { .. }));
        assert!(!state.resolved);
    }

    #[test]
    fn import_only_defaults_to_insert() {
        let state = reconcile(Vec::new(), vec![record("2", "200", 0).with_id(3)]).remove(0);

        assert_eq!(
            final_outcome(&state).unwrap(),
            Outcome::Insert {
                record: record("2", "200", 0)
            }
        );
    }

    #[test]
    fn local_only_defaults_to_noop_until_marked() {
        let mut state = reconcile(vec![record("3", "300", 7).with_id(9)], Vec::new()).remove(0);
        assert_eq!(final_outcome(&state).unwrap(), Outcome::NoOp);

        state.mark_for_deletion().unwrap();
        assert_eq!(final_outcome(&state).unwrap(), Outcome::Delete { id: 9 });
    }

    #[test]
    fn deletion_requires_local_only_state() {
        let mut state = conflict();
        assert_eq!(
            state.mark_for_deletion(),
            Err(Error::NotMergeable(MatchKey::new("casj", "1", "100")))
        );
    }

    #[test]
    fn both_flags_are_contradictory() {
        let mut state = conflict();
        state.take_local = true;
        state.take_from_file = true;
        state.resolved = true;

        assert!(matches!(
            final_outcome(&state),
            Err(Error::ContradictoryResolution { .. })
        ));
    }

    #[test]
    fn apply_resolution_dispatches() {
        let mut state = conflict();
        state
            .apply_resolution(Resolution::Merged(record("1", "100", 12)))
            .unwrap();
        assert!(state.resolved && state.merged.is_some());

        state.apply_resolution(Resolution::TakeLocal).unwrap();
        assert!(state.take_local && state.merged.is_none());
    }

    #[test]
    fn resolution_json_shape() {
        let json = serde_json::to_value(Resolution::TakeFromFile).unwrap();
        assert_eq!(json, serde_json::json!({"choice": "takeFromFile"}));
    }
}
