use crate::modules::menu::{MenuAction, TurnMenu};

/// Point deltas for one resolved action: what the choice earned and the best
/// any choice on the menu could have earned.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TurnScore {
    pub actual: f64,
    pub expected: f64,
}

/// Score a resolved action against the turn's full menu.
///
/// `expected` is the turn-wide maximum over every point value any entry
/// carries. An ignore-class move earns the single largest ignore value among
/// the content presented that turn; it is never a sum.
pub fn score_turn(menu: &TurnMenu, choice: &MenuAction) -> TurnScore {
    let mut expected = 0.0f64;
    let mut best_ignore = 0.0f64;

    for entry in &menu.entries {
        match &entry.action {
            MenuAction::Encounter { points, .. } => {
                expected = fold_max(expected, points);
                best_ignore = best_ignore.max(points[2]);
            }
            MenuAction::Loot { points, .. }
            | MenuAction::SensedEncounter { points, .. }
            | MenuAction::SensedLoot { points, .. } => {
                expected = fold_max(expected, points);
                best_ignore = best_ignore.max(points[1]);
            }
            MenuAction::Move { .. } | MenuAction::MoveIgnoring { .. } => {}
        }
    }

    let actual = match choice {
        MenuAction::Encounter { points, option, .. } => points[*option],
        MenuAction::Loot { points, .. }
        | MenuAction::SensedEncounter { points, .. }
        | MenuAction::SensedLoot { points, .. } => points[0],
        MenuAction::MoveIgnoring { .. } => best_ignore,
        MenuAction::Move { .. } => 0.0,
    };

    TurnScore { actual, expected }
}

fn fold_max(current: f64, points: &[f64]) -> f64 {
    points.iter().fold(current, |acc, value| acc.max(*value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::grid::Direction;
    use crate::modules::menu::MenuEntry;

    fn menu_of(actions: Vec<MenuAction>) -> TurnMenu {
        TurnMenu {
            prompt: String::new(),
            entries: actions
                .into_iter()
                .enumerate()
                .map(|(i, action)| MenuEntry {
                    index: i + 1,
                    text: String::new(),
                    action,
                })
                .collect(),
        }
    }

    #[test]
    fn direct_choice_scores_its_own_value_against_turn_max() {
        let menu = menu_of(vec![
            MenuAction::Encounter {
                id: "RE1".into(),
                option: 0,
                points: [0.3, 0.1, 0.6],
            },
            MenuAction::Encounter {
                id: "RE1".into(),
                option: 1,
                points: [0.3, 0.1, 0.6],
            },
            MenuAction::Loot {
                id: "L1".into(),
                points: [0.9, 0.1],
                special: None,
            },
            MenuAction::MoveIgnoring {
                direction: Direction::North,
            },
        ]);

        let score = score_turn(&menu, &menu.entries[0].action);
        assert_eq!(score.actual, 0.3);
        assert_eq!(score.expected, 0.9);

        let score = score_turn(&menu, &menu.entries[2].action);
        assert_eq!(score.actual, 0.9);
        assert_eq!(score.expected, 0.9);
    }

    #[test]
    fn ignore_class_move_takes_the_single_best_ignore_value() {
        let menu = menu_of(vec![
            MenuAction::Encounter {
                id: "RE2".into(),
                option: 0,
                points: [0.2, 0.0, 0.4],
            },
            MenuAction::Loot {
                id: "L2".into(),
                points: [0.5, 0.3],
                special: None,
            },
            MenuAction::SensedLoot {
                id: "L3".into(),
                direction: Direction::East,
                points: [0.1, 0.7],
            },
            MenuAction::MoveIgnoring {
                direction: Direction::West,
            },
        ]);

        let score = score_turn(&menu, &menu.entries[3].action);
        // Max of 0.4, 0.3, 0.7 — not their sum.
        assert_eq!(score.actual, 0.7);
        assert_eq!(score.expected, 0.7);
    }

    #[test]
    fn sensed_explore_earns_its_engage_value() {
        let menu = menu_of(vec![
            MenuAction::SensedEncounter {
                id: "RE3".into(),
                direction: Direction::South,
                points: [0.8, 0.2],
            },
            MenuAction::MoveIgnoring {
                direction: Direction::North,
            },
        ]);
        let score = score_turn(&menu, &menu.entries[0].action);
        assert_eq!(score.actual, 0.8);
        assert_eq!(score.expected, 0.8);
    }

    #[test]
    fn plain_movement_scores_zero_both_ways() {
        let menu = menu_of(vec![
            MenuAction::Move {
                direction: Direction::North,
            },
            MenuAction::Move {
                direction: Direction::East,
            },
        ]);
        let score = score_turn(&menu, &menu.entries[0].action);
        assert_eq!(score, TurnScore::default());
    }
}
