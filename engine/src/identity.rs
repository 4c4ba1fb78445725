//! Business identity and sameness of team-match records.
//!
//! A record is identified by `(eventCode, matchNumber, teamNumber)`, never by
//! its surrogate id. Sameness is structural equality of everything except
//! the id. Optional fields are compared as-is: an absent `notes` and an empty
//! `notes` are different values.

use crate::{natsort::natural_cmp, EventCode, MatchNumber, TeamMatch, TeamNumber};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Business key of a team-match record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchKey {
    pub event_code: EventCode,
    pub match_number: MatchNumber,
    pub team_number: TeamNumber,
}

impl MatchKey {
    pub fn new(
        event_code: impl Into<EventCode>,
        match_number: impl Into<MatchNumber>,
        team_number: impl Into<TeamNumber>,
    ) -> Self {
        Self {
            event_code: event_code.into(),
            match_number: match_number.into(),
            team_number: team_number.into(),
        }
    }

    /// Schedule order: natural order of match number, then plain string
    /// order of team number.
    pub fn schedule_cmp(&self, other: &MatchKey) -> Ordering {
        natural_cmp(&self.match_number, &other.match_number)
            .then_with(|| self.team_number.cmp(&other.team_number))
            .then_with(|| self.event_code.cmp(&other.event_code))
    }
}

impl std::fmt::Display for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.event_code, self.match_number, self.team_number
        )
    }
}

/// The business key of a record.
pub fn key_of(record: &TeamMatch) -> MatchKey {
    MatchKey::new(
        record.event_code.clone(),
        record.match_number.clone(),
        record.team_number.clone(),
    )
}

/// Field-level equality ignoring the surrogate id.
pub fn same_record(a: &TeamMatch, b: &TeamMatch) -> bool {
    a.event_code == b.event_code
        && a.match_number == b.match_number
        && a.team_number == b.team_number
        && a.scores == b.scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DeepSpaceScores, GameScores, PowerUpScores};

    fn record(notes: Option<&str>) -> TeamMatch {
        TeamMatch::new(
            "casj",
            "1",
            "254",
            GameScores::PowerUp(PowerUpScores {
                auto_switch_cubes: 1,
                notes: notes.map(String::from),
                ..Default::default()
            }),
        )
    }

    #[test]
    fn key_ignores_payload_and_id() {
        let a = record(Some("fast")).with_id(4);
        let b = record(None);
        assert_eq!(key_of(&a), key_of(&b));
        assert_eq!(key_of(&a).to_string(), "casj/1/254");
    }

    #[test]
    fn sameness_ignores_id() {
        let a = record(Some("fast")).with_id(4);
        let b = record(Some("fast"));
        assert!(same_record(&a, &b));
        assert!(same_record(&b, &a));
    }

    #[test]
    fn sameness_detects_payload_change() {
        let a = record(None);
        let mut b = record(None);
        if let GameScores::PowerUp(scores) = &mut b.scores {
            scores.auto_switch_cubes = 2;
        }
        assert!(!same_record(&a, &b));
    }

    #[test]
    fn empty_and_absent_notes_differ() {
        assert!(!same_record(&record(None), &record(Some(""))));
    }

    #[test]
    fn different_games_are_never_same() {
        let a = record(None);
        let b = TeamMatch::new(
            "casj",
            "1",
            "254",
            GameScores::DeepSpace(DeepSpaceScores::default()),
        );
        assert!(!same_record(&a, &b));
    }

    #[test]
    fn schedule_order_breaks_ties_by_team() {
        let a = MatchKey::new("casj", "2", "1678");
        let b = MatchKey::new("casj", "2", "254");
        let c = MatchKey::new("casj", "10", "1");
        assert_eq!(a.schedule_cmp(&b), Ordering::Less);
        assert_eq!(b.schedule_cmp(&c), Ordering::Less);
    }
}
