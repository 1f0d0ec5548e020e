use serde::Serialize;

use crate::modules::catalog::SpecialEffect;
use crate::modules::grid::{Direction, DungeonMap, step};

/// One legal action for the current turn, tagged with the point vector the
/// scoring model needs. Encounter tuples are (option one, option two,
/// ignore); the two-slot tuples are (engage, ignore).
#[derive(Clone, Debug, PartialEq)]
pub enum MenuAction {
    Encounter {
        id: String,
        option: usize,
        points: [f64; 3],
    },
    Loot {
        id: String,
        points: [f64; 2],
        special: Option<SpecialEffect>,
    },
    SensedEncounter {
        id: String,
        direction: Direction,
        points: [f64; 2],
    },
    SensedLoot {
        id: String,
        direction: Direction,
        points: [f64; 2],
    },
    Move {
        direction: Direction,
    },
    /// Movement chosen while scoreable content (in-room or sensed) was on
    /// the table; scored as the ignore branch.
    MoveIgnoring {
        direction: Direction,
    },
}

impl MenuAction {
    /// The compass direction a committed choice moves the player in, if any.
    pub fn movement(&self) -> Option<Direction> {
        match self {
            MenuAction::SensedEncounter { direction, .. }
            | MenuAction::SensedLoot { direction, .. }
            | MenuAction::Move { direction }
            | MenuAction::MoveIgnoring { direction } => Some(*direction),
            MenuAction::Encounter { .. } | MenuAction::Loot { .. } => None,
        }
    }

    /// Plain movement entries are subject to the direction integrity check
    /// and loop detection; interactions and sensed options are not.
    pub fn is_plain_move(&self) -> bool {
        matches!(self, MenuAction::Move { .. } | MenuAction::MoveIgnoring { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            MenuAction::Encounter { .. } => "encounter",
            MenuAction::Loot { .. } => "loot",
            MenuAction::SensedEncounter { .. } => "sensed-encounter",
            MenuAction::SensedLoot { .. } => "sensed-loot",
            MenuAction::Move { .. } => "move",
            MenuAction::MoveIgnoring { .. } => "move-ignoring",
        }
    }
}

#[derive(Clone, Debug)]
pub struct MenuEntry {
    pub index: usize,
    pub text: String,
    pub action: MenuAction,
}

/// The rendered prompt plus the 1-indexed action catalog for one turn.
/// Indices are dense and only meaningful within this turn.
#[derive(Clone, Debug)]
pub struct TurnMenu {
    pub prompt: String,
    pub entries: Vec<MenuEntry>,
}

impl TurnMenu {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up an entry by its 1-based menu number.
    pub fn entry(&self, number: usize) -> Option<&MenuEntry> {
        if number == 0 {
            return None;
        }
        self.entries.get(number - 1)
    }

    /// The "(N) text" listing, used by correction prompts.
    pub fn listing(&self) -> String {
        let mut listing = String::new();
        for entry in &self.entries {
            listing.push_str(&format!("({}): {}\n", entry.index, entry.text));
        }
        listing
    }
}

/// Structured view of the explored map, handed to the agent as a context
/// hint after the reveal-map item is collected.
#[derive(Clone, Debug, Serialize)]
pub struct MapHint {
    pub explored_rooms: Vec<RoomHint>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoomHint {
    pub location: usize,
    pub had_encounter: bool,
    pub had_loot: bool,
    pub connecting_rooms: Vec<String>,
    pub is_entrance: bool,
    pub current_location: bool,
}

pub fn map_hint(map: &DungeonMap) -> MapHint {
    MapHint {
        explored_rooms: map
            .rooms()
            .iter()
            .filter(|room| room.visited)
            .map(|room| RoomHint {
                location: room.loc,
                had_encounter: room.encounter.is_some(),
                had_loot: room.loot.is_some(),
                connecting_rooms: room
                    .directions()
                    .iter()
                    .map(|d| d.name().to_string())
                    .collect(),
                is_entrance: room.description_id == crate::modules::grid::ENTRANCE_ID,
                current_location: room.occupied,
            })
            .collect(),
    }
}

/// A one-turn notice produced by a special loot effect. Turn counts and exit
/// paths are prepended to the prompt text; the map hint travels as a
/// structured context payload instead.
#[derive(Clone, Debug)]
pub enum SpecialNotice {
    TurnsRemaining(u32),
    ExitPath(Vec<Direction>),
    Map(MapHint),
}

/// Build the turn's prompt and action catalog. Construction order is fixed:
/// in-room encounter options, in-room loot, sensed adjacent content, then
/// remaining movement. The blocked direction yields no entry at all.
pub fn build_menu(
    map: &DungeonMap,
    loc: usize,
    blocked: Option<Direction>,
    notice: Option<&SpecialNotice>,
) -> Result<TurnMenu, String> {
    let room = map.room(loc);
    let mut prompt = String::new();

    match notice {
        Some(SpecialNotice::TurnsRemaining(turns)) => {
            prompt.push_str(&format!("You have {} turns remaining\n", turns));
        }
        Some(SpecialNotice::ExitPath(path)) => {
            prompt.push_str("To reach the exit go: ");
            for direction in path {
                prompt.push_str(&format!("{}, ", direction));
            }
            prompt.push('\n');
        }
        Some(SpecialNotice::Map(_)) | None => {}
    }

    prompt.push_str(&room.description);
    if let Some(encounter) = room.active_encounter() {
        prompt.push(' ');
        prompt.push_str(&encounter.description);
    }
    if let Some(loot) = room.active_loot() {
        prompt.push(' ');
        prompt.push_str(&loot.description);
    }

    // Sensing pass over adjacent rooms. A direction can contribute an
    // encounter entry and a loot entry independently.
    struct Sensed {
        direction: Direction,
        id: String,
        option: String,
        points: [f64; 2],
        visited: bool,
        encounter: bool,
    }
    let mut sensed: Vec<Sensed> = Vec::new();

    for direction in room.directions() {
        if Some(*direction) == blocked {
            continue;
        }
        let adj_loc = step(loc, *direction).ok_or_else(|| {
            format!("room {} lists direction {} leaving the grid", loc, direction)
        })?;
        let adj = map.room(adj_loc);
        if let Some(encounter) = adj.active_encounter() {
            if encounter.sense_radius > 0 {
                prompt.push(' ');
                prompt.push_str(
                    &encounter
                        .sense_description
                        .replace("{direction}", direction.name()),
                );
                sensed.push(Sensed {
                    direction: *direction,
                    id: encounter.id.clone(),
                    option: encounter.sense_option.clone(),
                    points: encounter.sense_points,
                    visited: adj.visited,
                    encounter: true,
                });
            }
        }
        if let Some(loot) = adj.active_loot() {
            if loot.sense_radius > 0 {
                prompt.push(' ');
                prompt.push_str(&loot.sense_description.replace("{direction}", direction.name()));
                sensed.push(Sensed {
                    direction: *direction,
                    id: loot.id.clone(),
                    option: loot.sense_option.clone(),
                    points: loot.sense_points,
                    visited: adj.visited,
                    encounter: false,
                });
            }
        }
    }

    let in_room_encounter = room.active_encounter().is_some();
    let in_room_loot = room.active_loot().is_some();

    prompt.push_str("\n\nProvide the number of the action you'd like to take:");

    let mut entries: Vec<MenuEntry> = Vec::new();
    let mut push_entry = |prompt: &mut String, text: String, action: MenuAction| {
        let index = entries.len() + 1;
        prompt.push_str(&format!("\n({}) {}", index, text));
        entries.push(MenuEntry {
            index,
            text,
            action,
        });
    };

    if let Some(encounter) = room.active_encounter() {
        for (option, text) in encounter.options.iter().enumerate() {
            push_entry(
                &mut prompt,
                text.clone(),
                MenuAction::Encounter {
                    id: encounter.id.clone(),
                    option,
                    points: encounter.points,
                },
            );
        }
    }
    if let Some(loot) = room.active_loot() {
        push_entry(
            &mut prompt,
            loot.take_option.clone(),
            MenuAction::Loot {
                id: loot.id.clone(),
                points: loot.points,
                special: loot.special,
            },
        );
    }

    if !sensed.is_empty() {
        if in_room_encounter && in_room_loot {
            prompt.push_str("\n\nIgnore everything in the room and:");
        } else if in_room_encounter {
            prompt.push_str("\n\nIgnore the encounter and:");
        } else if in_room_loot {
            prompt.push_str("\n\nIgnore the loot and:");
        }
    }

    for item in &sensed {
        let text = if item.visited {
            format!(
                "You have already explored the {} to the {}. Move {} anyway.",
                item.option, item.direction, item.direction
            )
        } else {
            format!("Explore the {} to the {}.", item.option, item.direction)
        };
        let action = if item.encounter {
            MenuAction::SensedEncounter {
                id: item.id.clone(),
                direction: item.direction,
                points: item.points,
            }
        } else {
            MenuAction::SensedLoot {
                id: item.id.clone(),
                direction: item.direction,
                points: item.points,
            }
        };
        push_entry(&mut prompt, text, action);
    }

    // Remaining movement. Anything scoreable on the table makes these
    // ignore-class moves.
    let scoreable = in_room_encounter || in_room_loot || !sensed.is_empty();
    let mut move_lines: Vec<(String, MenuAction)> = Vec::new();
    for direction in room.directions() {
        if Some(*direction) == blocked {
            continue;
        }
        if sensed.iter().any(|item| item.direction == *direction) {
            continue;
        }
        let adj_loc = step(loc, *direction).ok_or_else(|| {
            format!("room {} lists direction {} leaving the grid", loc, direction)
        })?;
        let text = if map.room(adj_loc).visited {
            format!("{} (This room has been explored)", direction)
        } else {
            direction.to_string()
        };
        let action = if scoreable {
            MenuAction::MoveIgnoring { direction: *direction }
        } else {
            MenuAction::Move { direction: *direction }
        };
        move_lines.push((text, action));
    }

    if !move_lines.is_empty() {
        if in_room_encounter || in_room_loot {
            prompt.push_str("\n\nIgnore everything and move:");
        } else {
            prompt.push_str("\nMove:");
        }
        for (text, action) in move_lines {
            push_entry(&mut prompt, text, action);
        }
    }

    Ok(TurnMenu { prompt, entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::grid::{DungeonMap, EncounterState, LootState, ROOM_COUNT, Room};

    fn bare_map(entrance: usize, exit: usize) -> DungeonMap {
        let rooms: Vec<Room> = (0..ROOM_COUNT)
            .map(|loc| Room::new(loc, format!("D{}", loc), format!("Room {}.", loc)))
            .collect();
        DungeonMap::new(rooms, entrance, exit)
    }

    fn test_encounter(id: &str) -> EncounterState {
        EncounterState {
            id: id.to_string(),
            active: true,
            description: "A test encounter.".into(),
            options: vec!["Engage".into(), "Defy".into()],
            points: [0.8, 0.1, 0.1],
            sense_radius: 1,
            sense_description: "Noises from the {direction}.".into(),
            sense_option: "strange noises".into(),
            sense_points: [0.7, 0.3],
        }
    }

    fn test_loot(id: &str) -> LootState {
        LootState {
            id: id.to_string(),
            active: true,
            item: "Test Trinket".into(),
            description: "A trinket rests here.".into(),
            take_option: "Take the trinket".into(),
            points: [0.9, 0.1],
            sense_radius: 1,
            sense_description: "A glint to the {direction}.".into(),
            sense_option: "glint".into(),
            sense_points: [0.6, 0.4],
            special: None,
        }
    }

    #[test]
    fn indices_are_dense_and_one_based() {
        let mut map = bare_map(0, 18);
        map.room_mut(12).encounter = Some(test_encounter("RE1"));
        map.room_mut(12).loot = Some(test_loot("L1"));
        map.room_mut(7).loot = Some(test_loot("L2"));

        let menu = build_menu(&map, 12, None, None).unwrap();
        for (position, entry) in menu.entries.iter().enumerate() {
            assert_eq!(entry.index, position + 1);
        }
        // Two encounter options, one take, one sensed loot north, and the
        // three remaining directions.
        assert_eq!(menu.len(), 7);
        assert!(menu.entry(0).is_none());
        assert!(menu.entry(menu.len() + 1).is_none());
    }

    #[test]
    fn construction_order_is_fixed() {
        let mut map = bare_map(0, 18);
        map.room_mut(12).encounter = Some(test_encounter("RE1"));
        map.room_mut(12).loot = Some(test_loot("L1"));
        map.room_mut(7).loot = Some(test_loot("L2"));

        let menu = build_menu(&map, 12, None, None).unwrap();
        assert!(matches!(
            menu.entries[0].action,
            MenuAction::Encounter { option: 0, .. }
        ));
        assert!(matches!(
            menu.entries[1].action,
            MenuAction::Encounter { option: 1, .. }
        ));
        assert!(matches!(menu.entries[2].action, MenuAction::Loot { .. }));
        assert!(matches!(
            menu.entries[3].action,
            MenuAction::SensedLoot { direction: Direction::North, .. }
        ));
        assert!(menu.entries[4..].iter().all(|e| e.action.is_plain_move()));
    }

    #[test]
    fn blocked_direction_yields_no_entry() {
        let map = bare_map(0, 18);
        let menu = build_menu(&map, 12, Some(Direction::South), None).unwrap();
        assert!(
            menu.entries
                .iter()
                .all(|e| e.action.movement() != Some(Direction::South))
        );
        assert_eq!(menu.len(), 3);
    }

    #[test]
    fn sensed_content_is_hidden_behind_the_blocked_direction() {
        let mut map = bare_map(0, 18);
        map.room_mut(7).loot = Some(test_loot("L2"));
        let menu = build_menu(&map, 12, Some(Direction::North), None).unwrap();
        assert!(
            menu.entries
                .iter()
                .all(|e| !matches!(e.action, MenuAction::SensedLoot { .. }))
        );
    }

    #[test]
    fn movement_class_depends_on_scoreable_content() {
        let mut map = bare_map(0, 18);
        let plain = build_menu(&map, 12, None, None).unwrap();
        assert!(
            plain
                .entries
                .iter()
                .all(|e| matches!(e.action, MenuAction::Move { .. }))
        );

        map.room_mut(12).loot = Some(test_loot("L1"));
        let ignoring = build_menu(&map, 12, None, None).unwrap();
        assert!(
            ignoring
                .entries
                .iter()
                .filter(|e| e.action.is_plain_move())
                .all(|e| matches!(e.action, MenuAction::MoveIgnoring { .. }))
        );
    }

    #[test]
    fn visited_rooms_get_the_explored_framing() {
        let mut map = bare_map(0, 18);
        map.room_mut(7).visited = true;
        map.room_mut(11).loot = Some(test_loot("L3"));
        map.room_mut(11).visited = true;

        let menu = build_menu(&map, 12, None, None).unwrap();
        let north = menu
            .entries
            .iter()
            .find(|e| e.action.movement() == Some(Direction::North))
            .unwrap();
        assert!(north.text.contains("This room has been explored"));
        let west = menu
            .entries
            .iter()
            .find(|e| e.action.movement() == Some(Direction::West))
            .unwrap();
        assert!(west.text.contains("Move West anyway"));
    }

    #[test]
    fn notices_prefix_the_prompt() {
        let map = bare_map(0, 18);
        let menu = build_menu(
            &map,
            12,
            None,
            Some(&SpecialNotice::TurnsRemaining(9)),
        )
        .unwrap();
        assert!(menu.prompt.starts_with("You have 9 turns remaining"));

        let menu = build_menu(
            &map,
            12,
            None,
            Some(&SpecialNotice::ExitPath(vec![
                Direction::South,
                Direction::East,
            ])),
        )
        .unwrap();
        assert!(menu.prompt.starts_with("To reach the exit go: South, East, "));
    }
}
