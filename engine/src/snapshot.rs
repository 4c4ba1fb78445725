//! Event snapshots: the document exchanged between scouting devices.
//!
//! A snapshot carries an event descriptor and that event's team-match
//! records, without surrogate ids. It is what gets exported from one store
//! and merged into another.

use crate::identity::key_of;
use crate::natsort::natural_cmp;
use crate::{error::Result, Error, EventCode, GameCode, TeamMatch};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Identifies the event (and game year) a snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    /// Game year, doubling as the record schema version
    pub year: GameCode,
    pub event_code: EventCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EventDescriptor {
    pub fn new(year: impl Into<GameCode>, event_code: impl Into<EventCode>) -> Self {
        Self {
            year: year.into(),
            event_code: event_code.into(),
            name: None,
        }
    }
}

/// An exported or imported event document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    pub event: EventDescriptor,
    #[serde(default)]
    pub matches: Vec<TeamMatch>,
}

impl EventSnapshot {
    pub fn new(event: EventDescriptor) -> Self {
        Self {
            event,
            matches: Vec::new(),
        }
    }

    /// Build a snapshot from stored records: ids are stripped and matches
    /// are put in schedule order.
    pub fn from_records(event: EventDescriptor, records: impl IntoIterator<Item = TeamMatch>) -> Self {
        let mut matches: Vec<TeamMatch> = records.into_iter().map(|r| r.without_id()).collect();
        matches.sort_by(|a, b| {
            natural_cmp(&a.match_number, &b.match_number)
                .then_with(|| a.team_number.cmp(&b.team_number))
        });
        Self { event, matches }
    }

    pub fn add_match(&mut self, record: TeamMatch) {
        self.matches.push(record.without_id());
    }

    /// Drop any surrogate ids carried by the document.
    pub fn clear_ids(&mut self) {
        for record in &mut self.matches {
            record.id = None;
        }
    }

    /// Check the snapshot against the game year the caller expects.
    ///
    /// The year check comes first and is a hard failure. Afterwards every
    /// record must belong to the declared event and game, and no business
    /// key may repeat.
    pub fn validate(&self, expected_year: &str) -> Result<()> {
        if self.event.year != expected_year {
            return Err(Error::SchemaMismatch {
                expected: expected_year.to_string(),
                actual: self.event.year.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(self.matches.len());
        for record in &self.matches {
            if record.event_code != self.event.event_code {
                return Err(Error::InvalidSnapshot(format!(
                    "match {} belongs to event {}, not {}",
                    key_of(record),
                    record.event_code,
                    self.event.event_code
                )));
            }
            if !record.scores.matches_game(expected_year) {
                return Err(Error::SchemaMismatch {
                    expected: expected_year.to_string(),
                    actual: record.game_code(),
                });
            }
            let key = key_of(record);
            if !seen.insert(key.clone()) {
                return Err(Error::DuplicateKey(key));
            }
        }

        Ok(())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Parse a snapshot document. Ids in the document are dropped.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        snapshot.clear_ids();
        Ok(snapshot)
    }
}
