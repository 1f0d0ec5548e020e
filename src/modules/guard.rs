use std::collections::VecDeque;

use crate::modules::assistant::{Assistant, TurnReply};
use crate::modules::grid::Direction;
use crate::modules::menu::{MapHint, TurnMenu};

/// Rejections tolerated per turn before the run terminates. Applies to the
/// hallucination counter and the loop counter independently.
pub const REJECTION_BOUND: u32 = 10;

/// Moves remembered for cycle detection.
const MOVE_MEMORY: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// The 1-based menu number of the accepted entry.
    Accepted(usize),
    /// Hallucination bound exhausted.
    InvalidAction,
    /// Loop bound exhausted.
    Stuck,
}

/// Wraps one agent round-trip: answer integrity first, then movement-cycle
/// detection with a synthetic barrier re-ask. Keeps the accepted movement
/// history across turns; retry counters are per turn.
pub struct ResponseGuard {
    recent_moves: VecDeque<Direction>,
}

impl Default for ResponseGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseGuard {
    pub fn new() -> Self {
        Self {
            recent_moves: VecDeque::with_capacity(MOVE_MEMORY),
        }
    }

    pub fn resolve(
        &mut self,
        assistant: &mut dyn Assistant,
        menu: &TurnMenu,
        context: Option<&MapHint>,
    ) -> Result<GuardOutcome, String> {
        let mut hallucinations = 0u32;
        let mut loops = 0u32;
        let mut prompt = menu.prompt.clone();

        loop {
            let reply = assistant.submit_turn(&prompt, context)?;
            match vet(menu, &reply) {
                Ok(number) => {
                    let entry = &menu.entries[number - 1];
                    if let Some(direction) = entry.action.movement() {
                        if entry.action.is_plain_move() && self.matches_pattern(direction) {
                            loops += 1;
                            if loops > REJECTION_BOUND {
                                return Ok(GuardOutcome::Stuck);
                            }
                            prompt = barrier_prompt(&menu.prompt, direction);
                            continue;
                        }
                        self.record(direction);
                    }
                    return Ok(GuardOutcome::Accepted(number));
                }
                Err(reason) => {
                    hallucinations += 1;
                    if hallucinations > REJECTION_BOUND {
                        return Ok(GuardOutcome::InvalidAction);
                    }
                    prompt = correction_prompt(menu, &reply, &reason);
                }
            }
        }
    }

    fn record(&mut self, direction: Direction) {
        self.recent_moves.push_back(direction);
        while self.recent_moves.len() > MOVE_MEMORY {
            self.recent_moves.pop_front();
        }
    }

    fn matches_pattern(&self, candidate: Direction) -> bool {
        if self.recent_moves.len() < MOVE_MEMORY {
            return false;
        }
        let recent: Vec<Direction> = self.recent_moves.iter().copied().collect();
        patterns(candidate).iter().any(|pattern| recent == pattern)
    }
}

/// Integrity check: the number must be on the menu, and a plain movement
/// entry must be accompanied by its own compass direction. Interactions and
/// sensed options carry no direction check.
fn vet(menu: &TurnMenu, reply: &TurnReply) -> Result<usize, String> {
    if reply.choice < 1 || reply.choice as usize > menu.len() {
        return Err(format!(
            "answer {} is not on the list of 1..={}",
            reply.choice,
            menu.len()
        ));
    }
    let number = reply.choice as usize;
    let entry = &menu.entries[number - 1];
    if entry.action.is_plain_move() && reply.direction != entry.action.movement() {
        let stated = reply
            .direction
            .map(|d| d.name().to_string())
            .unwrap_or_else(|| "N/A".into());
        return Err(format!(
            "stated direction {} does not match option {}",
            stated, number
        ));
    }
    Ok(number)
}

/// Short cyclic movement patterns per proposed direction. A proposal matches
/// when the last four accepted moves equal one of its patterns.
fn patterns(candidate: Direction) -> &'static [[Direction; 4]] {
    use Direction::*;
    match candidate {
        North => &[
            [North, South, North, South],
            [North, West, East, South],
            [North, East, West, South],
        ],
        South => &[
            [South, North, South, North],
            [South, East, West, North],
            [South, West, East, North],
        ],
        East => &[
            [East, West, East, West],
            [East, North, South, West],
            [East, South, North, West],
            [East, South, West, North],
        ],
        West => &[
            [West, East, West, East],
            [West, South, North, East],
            [West, North, South, East],
            [West, South, East, North],
        ],
    }
}

fn correction_prompt(menu: &TurnMenu, reply: &TurnReply, reason: &str) -> String {
    let stated = reply
        .direction
        .map(|d| d.name().to_string())
        .unwrap_or_else(|| "N/A".into());
    format!(
        "Your last response of ({}) {} was invalid: {}.\n\
         YOUR NEXT RESPONSE MUST BE A DIFFERENT SELECTION.\n\n{}\n\nSELECT ONE OF THE FOLLOWING ACTIONS\n{}",
        reply.choice,
        stated,
        reason,
        menu.prompt,
        menu.listing()
    )
}

fn barrier_prompt(prompt: &str, direction: Direction) -> String {
    format!(
        "A magical barrier appeared blocking movement to {}. Choose another direction.\n{}",
        direction, prompt
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::menu::{MenuAction, MenuEntry};

    struct FakeAssistant {
        replies: Vec<TurnReply>,
        cursor: usize,
        prompts: Vec<String>,
    }

    impl FakeAssistant {
        fn new(replies: Vec<TurnReply>) -> Self {
            Self {
                replies,
                cursor: 0,
                prompts: Vec::new(),
            }
        }

        fn asked(&self) -> usize {
            self.prompts.len()
        }
    }

    impl Assistant for FakeAssistant {
        fn submit_turn(
            &mut self,
            prompt: &str,
            _context: Option<&MapHint>,
        ) -> Result<TurnReply, String> {
            self.prompts.push(prompt.to_string());
            let reply = self
                .replies
                .get(self.cursor)
                .or_else(|| self.replies.last())
                .cloned()
                .expect("fake assistant needs at least one reply");
            if self.cursor < self.replies.len() {
                self.cursor += 1;
            }
            Ok(reply)
        }
    }

    fn move_reply(choice: i64, direction: Direction) -> TurnReply {
        TurnReply {
            choice,
            direction: Some(direction),
            justification: String::new(),
        }
    }

    fn moves_menu() -> TurnMenu {
        use Direction::*;
        let entries = [North, South, East]
            .into_iter()
            .enumerate()
            .map(|(i, direction)| MenuEntry {
                index: i + 1,
                text: direction.name().to_string(),
                action: MenuAction::Move { direction },
            })
            .collect();
        TurnMenu {
            prompt: "A bare room.\n(1) North\n(2) South\n(3) East".into(),
            entries,
        }
    }

    #[test]
    fn eleven_out_of_range_answers_terminate_the_turn() {
        let menu = moves_menu();
        let mut guard = ResponseGuard::new();
        let mut fake = FakeAssistant::new(vec![TurnReply {
            choice: 99,
            direction: None,
            justification: String::new(),
        }]);

        let outcome = guard.resolve(&mut fake, &menu, None).unwrap();
        assert_eq!(outcome, GuardOutcome::InvalidAction);
        // 11 bad answers, no 12th retry.
        assert_eq!(fake.asked(), 11);
        assert!(fake.prompts[1].contains("MUST BE A DIFFERENT SELECTION"));
    }

    #[test]
    fn direction_mismatch_is_never_accepted() {
        let menu = moves_menu();
        let mut guard = ResponseGuard::new();
        // Claims option 1 (North) while stating South, then corrects itself.
        let mut fake = FakeAssistant::new(vec![
            move_reply(1, Direction::South),
            move_reply(1, Direction::North),
        ]);

        let outcome = guard.resolve(&mut fake, &menu, None).unwrap();
        assert_eq!(outcome, GuardOutcome::Accepted(1));
        assert_eq!(fake.asked(), 2);
    }

    #[test]
    fn missing_direction_on_a_move_is_rejected() {
        let menu = moves_menu();
        let mut guard = ResponseGuard::new();
        let mut fake = FakeAssistant::new(vec![
            TurnReply {
                choice: 2,
                direction: None,
                justification: String::new(),
            },
            move_reply(2, Direction::South),
        ]);

        let outcome = guard.resolve(&mut fake, &menu, None).unwrap();
        assert_eq!(outcome, GuardOutcome::Accepted(2));
        assert_eq!(fake.asked(), 2);
    }

    #[test]
    fn interactions_bypass_the_direction_check() {
        let menu = TurnMenu {
            prompt: "(1) Take the idol".into(),
            entries: vec![MenuEntry {
                index: 1,
                text: "Take the idol".into(),
                action: MenuAction::Loot {
                    id: "L1".into(),
                    points: [1.0, 0.0],
                    special: None,
                },
            }],
        };
        let mut guard = ResponseGuard::new();
        let mut fake = FakeAssistant::new(vec![TurnReply {
            choice: 1,
            direction: None,
            justification: String::new(),
        }]);

        let outcome = guard.resolve(&mut fake, &menu, None).unwrap();
        assert_eq!(outcome, GuardOutcome::Accepted(1));
    }

    #[test]
    fn the_fifth_repeat_hits_a_barrier_before_committing() {
        let menu = moves_menu();
        let mut guard = ResponseGuard::new();

        // Four accepted moves: North, South, North, South.
        for (choice, direction) in [
            (1, Direction::North),
            (2, Direction::South),
            (1, Direction::North),
            (2, Direction::South),
        ] {
            let mut fake = FakeAssistant::new(vec![move_reply(choice, direction)]);
            let outcome = guard.resolve(&mut fake, &menu, None).unwrap();
            assert_eq!(outcome, GuardOutcome::Accepted(choice as usize));
        }

        // The fifth North is not committed; after the barrier the agent
        // picks East instead.
        let mut fake = FakeAssistant::new(vec![
            move_reply(1, Direction::North),
            move_reply(3, Direction::East),
        ]);
        let outcome = guard.resolve(&mut fake, &menu, None).unwrap();
        assert_eq!(outcome, GuardOutcome::Accepted(3));
        assert_eq!(fake.asked(), 2);
        assert!(fake.prompts[1].contains("magical barrier"));
        assert!(fake.prompts[1].contains("North"));
    }

    #[test]
    fn insisting_on_the_loop_ends_in_stuck() {
        let menu = moves_menu();
        let mut guard = ResponseGuard::new();
        for (choice, direction) in [
            (1, Direction::North),
            (2, Direction::South),
            (1, Direction::North),
            (2, Direction::South),
        ] {
            let mut fake = FakeAssistant::new(vec![move_reply(choice, direction)]);
            guard.resolve(&mut fake, &menu, None).unwrap();
        }

        let mut fake = FakeAssistant::new(vec![move_reply(1, Direction::North)]);
        let outcome = guard.resolve(&mut fake, &menu, None).unwrap();
        assert_eq!(outcome, GuardOutcome::Stuck);
        assert_eq!(fake.asked(), 11);
    }

    #[test]
    fn three_direction_rotations_are_detected() {
        use Direction::*;
        let menu = moves_menu();
        let mut guard = ResponseGuard::new();
        for direction in [North, West, East, South] {
            guard.record(direction);
        }
        assert!(guard.matches_pattern(North));
        assert!(!guard.matches_pattern(East));
    }

    #[test]
    fn sensed_moves_bypass_loop_detection() {
        let mut guard = ResponseGuard::new();
        for direction in [
            Direction::North,
            Direction::South,
            Direction::North,
            Direction::South,
        ] {
            guard.record(direction);
        }
        let menu = TurnMenu {
            prompt: "(1) Explore the glint to the North.".into(),
            entries: vec![MenuEntry {
                index: 1,
                text: "Explore the glint to the North.".into(),
                action: MenuAction::SensedLoot {
                    id: "L1".into(),
                    direction: Direction::North,
                    points: [0.9, 0.1],
                },
            }],
        };
        let mut fake = FakeAssistant::new(vec![TurnReply {
            choice: 1,
            direction: None,
            justification: String::new(),
        }]);
        let outcome = guard.resolve(&mut fake, &menu, None).unwrap();
        assert_eq!(outcome, GuardOutcome::Accepted(1));
        assert_eq!(fake.asked(), 1);
    }
}
