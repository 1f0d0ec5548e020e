use std::fmt;

use serde::{Deserialize, Serialize};

use crate::modules::profile::Profile;
use crate::modules::scoring::TurnScore;

/// Terminal and in-flight states of a run. `Traveling` is the only
/// non-terminal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Traveling,
    Complete,
    TurnsExceeded,
    Stuck,
    InvalidAction,
    Error(String),
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Traveling)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Traveling => write!(f, "Traveling"),
            RunStatus::Complete => write!(f, "Complete"),
            RunStatus::TurnsExceeded => write!(f, "Turns Exceeded"),
            RunStatus::Stuck => write!(f, "Got Stuck"),
            RunStatus::InvalidAction => write!(f, "Invalid Action Selection"),
            RunStatus::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// One logged choice: the action kind plus the content id or direction it
/// acted on.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub kind: String,
    pub target: String,
}

/// The run-scoped ledger: everything the player did and how it scored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub profile: Profile,
    pub run_name: String,
    pub start_location: usize,
    pub rooms_visited: Vec<usize>,
    pub encounter_ids: Vec<String>,
    pub loot_ids: Vec<String>,
    pub decisions: Vec<Decision>,
    pub turns: u32,
    pub points: f64,
    pub expected_points: f64,
    pub status: RunStatus,
}

impl Player {
    pub fn new(name: String, profile: Profile, run_name: String, start_location: usize) -> Self {
        Self {
            name,
            profile,
            run_name,
            start_location,
            rooms_visited: Vec::new(),
            encounter_ids: Vec::new(),
            loot_ids: Vec::new(),
            decisions: Vec::new(),
            turns: 0,
            points: 0.0,
            expected_points: 0.0,
            status: RunStatus::Traveling,
        }
    }

    pub fn room_visit(&mut self, loc: usize) {
        self.rooms_visited.push(loc);
    }

    pub fn record_encounter(&mut self, id: &str) {
        self.encounter_ids.push(id.to_string());
        self.decide("encounter", id);
    }

    pub fn record_loot(&mut self, id: &str) {
        self.loot_ids.push(id.to_string());
        self.decide("loot", id);
    }

    pub fn decide(&mut self, kind: &str, target: &str) {
        self.decisions.push(Decision {
            kind: kind.to_string(),
            target: target.to_string(),
        });
    }

    pub fn add_score(&mut self, score: TurnScore) {
        self.points += score.actual;
        self.expected_points += score.expected;
    }

    pub fn summary(&self) -> String {
        format!(
            "Player: {}\nProfile: {}\nRun: {}\nStatus: {}\nTurns: {}\nPoints: {:.2}\nExpected Points: {:.2}",
            self.name,
            self.profile,
            self.run_name,
            self.status,
            self.turns,
            self.points,
            self.expected_points
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ledger_accumulates_scores_and_decisions() {
        let profile = "CG-Speed".parse().unwrap();
        let mut player = Player::new("Brynn".into(), profile, "TEST".into(), 3);
        player.add_score(TurnScore {
            actual: 0.4,
            expected: 0.9,
        });
        player.add_score(TurnScore {
            actual: 0.5,
            expected: 0.5,
        });
        player.record_encounter("RE4");
        player.record_loot("L2");

        assert_eq!(player.points, 0.9);
        assert_eq!(player.expected_points, 1.4);
        assert_eq!(player.decisions.len(), 2);
        assert_eq!(player.encounter_ids, vec!["RE4"]);
        assert_eq!(player.loot_ids, vec!["L2"]);
        assert!(!player.status.is_terminal());
    }
}
