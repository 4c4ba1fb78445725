//! Reconciliation of locally stored records with an imported snapshot.
//!
//! Given the records the store holds for an event and the records of an
//! imported snapshot, this module produces one [`MergeState`] per business
//! key seen on either side.
//!
//! # Algorithm
//!
//! 1. Index every local record by business key (`localSaved`)
//! 2. Attach every imported record to the state with the same key, or open
//!    a new state for it (`fromFile`); imported ids are dropped
//! 3. Compute sameness and default resolutions
//! 4. Sort by natural match order, then team number
//!
//! The result is deterministic: input order never changes the output.

use crate::identity::{key_of, same_record, MatchKey};
use crate::{EventCode, MatchNumber, TeamMatch, TeamNumber};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Merge status of one business key.
///
/// Created by the [`Reconciler`], mutated through the resolution operations
/// in [`crate::resolution`], consumed by the [`Applier`](crate::Applier).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeState {
    pub event_code: EventCode,
    pub match_number: MatchNumber,
    pub team_number: TeamNumber,
    /// The record as currently persisted
    pub local_saved: Option<TeamMatch>,
    /// The record as imported (never carries an id)
    pub from_file: Option<TeamMatch>,
    /// Both sides present and equal ignoring id
    pub same: bool,
    /// Custom resolved value
    pub merged: Option<TeamMatch>,
    /// Whether the state has a determinate outcome
    pub resolved: bool,
    pub take_local: bool,
    pub take_from_file: bool,
}

impl MergeState {
    /// Open a state for a locally persisted record.
    pub fn from_local(record: TeamMatch) -> Self {
        let key = key_of(&record);
        let mut state = Self::empty(key);
        state.local_saved = Some(record);
        state
    }

    /// Open a state for an imported record. Any id on the record is dropped.
    pub fn from_import(record: TeamMatch) -> Self {
        let key = key_of(&record);
        let mut state = Self::empty(key);
        state.from_file = Some(record.without_id());
        state
    }

    fn empty(key: MatchKey) -> Self {
        Self {
            event_code: key.event_code,
            match_number: key.match_number,
            team_number: key.team_number,
            local_saved: None,
            from_file: None,
            same: false,
            merged: None,
            resolved: false,
            take_local: false,
            take_from_file: false,
        }
    }

    pub fn key(&self) -> MatchKey {
        MatchKey::new(
            self.event_code.clone(),
            self.match_number.clone(),
            self.team_number.clone(),
        )
    }

    /// Present on both sides and not the same.
    pub fn is_conflict(&self) -> bool {
        self.local_saved.is_some() && self.from_file.is_some() && !self.same
    }

    /// Compute sameness and the default resolution.
    ///
    /// Single-sided states resolve immediately: a local-only record is kept,
    /// an import-only record is added. Conflicts stay unresolved.
    pub fn set_sameness(&mut self) {
        self.merged = None;
        match (&self.local_saved, &self.from_file) {
            (Some(local), Some(imported)) => {
                self.same = same_record(local, imported);
                self.resolved = self.same;
                self.take_local = false;
                self.take_from_file = false;
            }
            (Some(_), None) => {
                self.same = false;
                self.resolved = true;
                self.take_local = true;
                self.take_from_file = false;
            }
            (None, Some(_)) => {
                self.same = false;
                self.resolved = true;
                self.take_local = false;
                self.take_from_file = true;
            }
            (None, None) => {
                self.same = false;
                self.resolved = false;
            }
        }
    }
}

/// Counts over a set of merge states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeStats {
    pub total: usize,
    pub same: usize,
    pub conflicts: usize,
    pub local_only: usize,
    pub import_only: usize,
    pub unresolved: usize,
}

impl MergeStats {
    pub fn from_states(states: &[MergeState]) -> Self {
        let mut stats = Self {
            total: states.len(),
            ..Default::default()
        };
        for state in states {
            if state.same {
                stats.same += 1;
            }
            if state.is_conflict() {
                stats.conflicts += 1;
            }
            match (&state.local_saved, &state.from_file) {
                (Some(_), None) => stats.local_only += 1,
                (None, Some(_)) => stats.import_only += 1,
                _ => {}
            }
            if !state.resolved {
                stats.unresolved += 1;
            }
        }
        stats
    }
}

/// Builds the merge state set for one session.
#[derive(Debug, Default)]
pub struct Reconciler {
    states: HashMap<MatchKey, MergeState>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the records currently persisted for the event.
    pub fn load_local(&mut self, records: impl IntoIterator<Item = TeamMatch>) {
        for record in records {
            let key = key_of(&record);
            match self.states.get_mut(&key) {
                Some(state) => state.local_saved = Some(record),
                None => {
                    self.states.insert(key, MergeState::from_local(record));
                }
            }
        }
    }

    /// Load the records of the imported snapshot.
    pub fn load_imported(&mut self, records: impl IntoIterator<Item = TeamMatch>) {
        for record in records {
            let key = key_of(&record);
            match self.states.get_mut(&key) {
                Some(state) => state.from_file = Some(record.without_id()),
                None => {
                    self.states.insert(key, MergeState::from_import(record));
                }
            }
        }
    }

    /// Compute sameness and return the states in schedule order.
    pub fn finish(self) -> Vec<MergeState> {
        let mut states: Vec<MergeState> = self.states.into_values().collect();
        for state in &mut states {
            state.set_sameness();
        }
        states.sort_by(|a, b| a.key().schedule_cmp(&b.key()));

        let stats = MergeStats::from_states(&states);
        tracing::debug!(
            total = stats.total,
            same = stats.same,
            conflicts = stats.conflicts,
            local_only = stats.local_only,
            import_only = stats.import_only,
            "reconciled merge states"
        );

        states
    }
}

/// Reconcile local records with imported records.
pub fn reconcile(
    local: impl IntoIterator<Item = TeamMatch>,
    imported: impl IntoIterator<Item = TeamMatch>,
) -> Vec<MergeState> {
    let mut reconciler = Reconciler::new();
    reconciler.load_local(local);
    reconciler.load_imported(imported);
    reconciler.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{GameScores, PowerUpScores};
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn record(match_number: &str, team: &str, cubes: u32) -> TeamMatch {
        TeamMatch::new(
            "casj",
            match_number,
            team,
            GameScores::PowerUp(PowerUpScores {
                tele_scale_cubes: cubes,
                ..Default::default()
            }),
        )
    }

    #[test]
    fn identical_records_are_same_and_resolved() {
        let local = vec![record("1", "254", 3).with_id(1)];
        let imported = vec![record("1", "254", 3)];

        let states = reconcile(local, imported);

        assert_eq!(states.len(), 1);
        assert!(states[0].same);
        assert!(states[0].resolved);
        assert!(!states[0].is_conflict());
    }

    #[test]
    fn differing_records_are_unresolved_conflicts() {
        let local = vec![record("1", "254", 3).with_id(1)];
        let imported = vec![record("1", "254", 5)];

        let states = reconcile(local, imported);

        assert_eq!(states.len(), 1);
        assert!(!states[0].same);
        assert!(!states[0].resolved);
        assert!(states[0].is_conflict());
    }

    #[test]
    fn single_sided_states_resolve_by_default() {
        let local = vec![record("3", "300", 7).with_id(9)];
        let imported = vec![record("2", "200", 0)];

        let states = reconcile(local, imported);

        assert_eq!(states.len(), 2);
        let import_only = &states[0];
        assert_eq!(import_only.match_number, "2");
        assert!(import_only.resolved && import_only.take_from_file);
        assert!(import_only.local_saved.is_none());

        let local_only = &states[1];
        assert_eq!(local_only.match_number, "3");
        assert!(local_only.resolved && local_only.take_local);
        assert!(local_only.from_file.is_none());
    }

    #[test]
    fn imported_ids_are_dropped() {
        let imported = vec![record("1", "254", 3).with_id(77)];
        let states = reconcile(Vec::new(), imported);

        assert_eq!(states[0].from_file.as_ref().unwrap().id, None);
    }

    #[test]
    fn output_is_in_schedule_order() {
        let imported = vec![
            record("qf1", "100", 0),
            record("10", "100", 0),
            record("2", "254", 0),
            record("2", "1678", 0),
        ];

        let states = reconcile(Vec::new(), imported);
        let order: Vec<_> = states
            .iter()
            .map(|s| (s.match_number.as_str(), s.team_number.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![("2", "1678"), ("2", "254"), ("10", "100"), ("qf1", "100")]
        );
    }

    #[test]
    fn stats_count_each_category() {
        let local = vec![
            record("1", "1", 0).with_id(1),
            record("2", "2", 0).with_id(2),
            record("3", "3", 0).with_id(3),
        ];
        let imported = vec![record("1", "1", 0), record("2", "2", 9), record("4", "4", 0)];

        let stats = MergeStats::from_states(&reconcile(local, imported));

        assert_eq!(
            stats,
            MergeStats {
                total: 4,
                same: 1,
                conflicts: 1,
                local_only: 1,
                import_only: 1,
                unresolved: 1,
            }
        );
    }

    fn arb_records(max: usize) -> impl Strategy<Value = Vec<TeamMatch>> {
        proptest::collection::vec(
            ("(qf)?[1-9][0-9]?", "[1-9][0-9]{0,3}", 0u32..3),
            0..max,
        )
        .prop_map(|rows| {
            let mut seen = HashSet::new();
            rows.into_iter()
                .filter(|(m, t, _)| seen.insert((m.clone(), t.clone())))
                .map(|(m, t, c)| record(&m, &t, c))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn one_state_per_distinct_key(local in arb_records(20), imported in arb_records(20)) {
            let keys: HashSet<MatchKey> = local.iter().chain(imported.iter()).map(key_of).collect();
            let states = reconcile(local, imported);

            prop_assert_eq!(states.len(), keys.len());
            let state_keys: HashSet<MatchKey> = states.iter().map(MergeState::key).collect();
            prop_assert_eq!(state_keys, keys);
        }

        #[test]
        fn input_order_does_not_matter(local in arb_records(15), imported in arb_records(15)) {
            let forward = reconcile(local.clone(), imported.clone());
            let mut local_rev = local;
            let mut imported_rev = imported;
            local_rev.reverse();
            imported_rev.reverse();
            let backward = reconcile(local_rev, imported_rev);

            prop_assert_eq!(forward, backward);
        }

        #[test]
        fn every_state_has_a_side(local in arb_records(15), imported in arb_records(15)) {
            for state in reconcile(local, imported) {
                prop_assert!(state.local_saved.is_some() || state.from_file.is_some());
                if state.same {
                    prop_assert!(state.local_saved.is_some() && state.from_file.is_some());
                }
            }
        }
    }
}
