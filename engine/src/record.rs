//! Team-match records and their game-specific score payloads.

use crate::{EventCode, GameCode, MatchNumber, RecordId, TeamNumber};
use serde::{Deserialize, Serialize};

/// Endgame outcome for FIRST POWER UP (2018).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerUpEndgame {
    #[default]
    None,
    Parked,
    Climbed,
    Levitated,
}

/// Scored fields for a 2018 FIRST POWER UP team match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerUpScores {
    pub auto_cross_line: bool,
    pub auto_switch_cubes: u32,
    pub auto_scale_cubes: u32,
    pub tele_switch_cubes: u32,
    pub tele_scale_cubes: u32,
    pub tele_exchange_cubes: u32,
    pub endgame: PowerUpEndgame,
    pub fouls: u32,
    pub is_failure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Scored fields for a 2019 DESTINATION: DEEP SPACE team match.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepSpaceScores {
    /// HAB level the robot started the sandstorm on (1-2)
    pub sandstorm_start_level: u8,
    pub sandstorm_hatches: u32,
    pub sandstorm_cargo: u32,
    pub cargo_ship_hatches: u32,
    pub cargo_ship_cargo: u32,
    pub rocket_hatches: u32,
    pub rocket_cargo: u32,
    /// HAB level reached at the end of the match (0-3)
    pub climb_level: u8,
    pub played_defense: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Game-specific payload, discriminated by the game year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "year")]
pub enum GameScores {
    #[serde(rename = "2018")]
    PowerUp(PowerUpScores),
    #[serde(rename = "2019")]
    DeepSpace(DeepSpaceScores),
}

impl GameScores {
    /// The game code (year) this payload belongs to.
    pub fn game_code(&self) -> &'static str {
        match self {
            GameScores::PowerUp(_) => "2018",
            GameScores::DeepSpace(_) => "2019",
        }
    }

    pub fn matches_game(&self, game: &str) -> bool {
        self.game_code() == game
    }
}

/// A single team's performance in one match of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMatch {
    /// Storage-assigned identifier, absent until persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    pub event_code: EventCode,
    pub match_number: MatchNumber,
    pub team_number: TeamNumber,
    #[serde(flatten)]
    pub scores: GameScores,
}

impl TeamMatch {
    /// Create a new, not yet persisted record.
    pub fn new(
        event_code: impl Into<EventCode>,
        match_number: impl Into<MatchNumber>,
        team_number: impl Into<TeamNumber>,
        scores: GameScores,
    ) -> Self {
        Self {
            id: None,
            event_code: event_code.into(),
            match_number: match_number.into(),
            team_number: team_number.into(),
            scores,
        }
    }

    /// Builder-style setter for the surrogate id.
    pub fn with_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    /// Copy of this record without its surrogate id.
    pub fn without_id(&self) -> Self {
        Self {
            id: None,
            ..self.clone()
        }
    }

    pub fn game_code(&self) -> GameCode {
        self.scores.game_code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn power_up(switch: u32) -> GameScores {
        GameScores::PowerUp(PowerUpScores {
            tele_switch_cubes: switch,
            ..Default::default()
        })
    }

    #[test]
    fn create_record() {
        let record = TeamMatch::new("casj", "qf1", "254", power_up(3));

        assert_eq!(record.id, None);
        assert_eq!(record.event_code, "casj");
        assert_eq!(record.match_number, "qf1");
        assert_eq!(record.team_number, "254");
        assert_eq!(record.game_code(), "2018");
    }

    #[test]
    fn without_id_strips_only_id() {
        let record = TeamMatch::new("casj", "1", "254", power_up(3)).with_id(12);
        let stripped = record.without_id();

        assert_eq!(stripped.id, None);
        assert_eq!(stripped.scores, record.scores);
        assert_eq!(stripped.match_number, record.match_number);
    }

    #[test]
    fn json_shape_is_flat_with_year_tag() {
        let record = TeamMatch::new("casj", "2", "1678", power_up(4));
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["year"], "2018");
        assert_eq!(value["eventCode"], "casj");
        assert_eq!(value["teleSwitchCubes"], 4);
        assert!(value.get("id").is_none());
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn parses_deep_space_record() {
        let value = json!({
            "id": 3,
            "year": "2019",
            "eventCode": "txho",
            "matchNumber": "14",
            "teamNumber": "118",
            "sandstormStartLevel": 2,
            "sandstormHatches": 1,
            "sandstormCargo": 0,
            "cargoShipHatches": 2,
            "cargoShipCargo": 3,
            "rocketHatches": 4,
            "rocketCargo": 1,
            "climbLevel": 3,
            "playedDefense": false
        });

        let record: TeamMatch = serde_json::from_value(value).unwrap();
        assert_eq!(record.id, Some(3));
        assert_eq!(record.game_code(), "2019");
        match record.scores {
            GameScores::DeepSpace(scores) => {
                assert_eq!(scores.climb_level, 3);
                assert_eq!(scores.notes, None);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_year() {
        let value = json!({
            "year": "2017",
            "eventCode": "casj",
            "matchNumber": "1",
            "teamNumber": "254"
        });

        assert!(serde_json::from_value::<TeamMatch>(value).is_err());
    }
}
