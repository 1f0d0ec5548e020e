use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::modules::catalog::SpecialEffect;

/// Rooms per side of the dungeon grid.
pub const GRID_SIDE: usize = 5;
/// Total rooms in the grid.
pub const ROOM_COUNT: usize = GRID_SIDE * GRID_SIDE;
/// Encounter ids sprinkled across a generated map (RE1..RE9).
pub const ENCOUNTER_COUNT: usize = 9;
/// Loot ids sprinkled across a generated map (L1..L12).
pub const LOOT_COUNT: usize = 12;

pub const ENTRANCE_ID: &str = "entrance";
pub const EXIT_ID: &str = "exit";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        for direction in Direction::ALL {
            if input.trim().eq_ignore_ascii_case(direction.name()) {
                return Ok(direction);
            }
        }
        Err(format!("unknown direction '{}'", input))
    }
}

/// Legal movement directions for a grid index, derived once from position:
/// corners have 2, edges 3, interior rooms 4.
pub fn directions_for(loc: usize) -> Vec<Direction> {
    use Direction::*;
    match loc {
        0 => vec![East, South],
        4 => vec![West, South],
        20 => vec![North, East],
        24 => vec![North, West],
        l if l < 4 => vec![South, East, West],
        l if l > 20 => vec![North, East, West],
        l if l % GRID_SIDE == 0 => vec![North, South, East],
        l if l % GRID_SIDE == 4 => vec![North, South, West],
        _ => vec![North, South, East, West],
    }
}

/// Neighboring index in a direction, or None when the step leaves the grid.
pub fn step(loc: usize, direction: Direction) -> Option<usize> {
    match direction {
        Direction::North => loc.checked_sub(GRID_SIDE),
        Direction::South => {
            let next = loc + GRID_SIDE;
            (next < ROOM_COUNT).then_some(next)
        }
        Direction::East => (loc % GRID_SIDE != GRID_SIDE - 1).then_some(loc + 1),
        Direction::West => (loc % GRID_SIDE != 0).then(|| loc - 1),
    }
}

/// All in-bounds neighbors of a grid index.
pub fn adjacent(loc: usize) -> Vec<usize> {
    directions_for(loc)
        .into_iter()
        .filter_map(|direction| step(loc, direction))
        .collect()
}

/// A generated but not yet content-populated map: description ids plus
/// encounter/loot id assignments per cell.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapLayout {
    pub descriptions: Vec<String>,
    pub encounters: Vec<Option<String>>,
    pub loot: Vec<Option<String>>,
    pub entrance: usize,
    pub exit: usize,
}

/// Generate a fresh layout: entrance uniformly at random, exit uniformly from
/// the cells that are neither the entrance nor adjacent to it, the 23
/// remaining description ids shuffled across the rest.
pub fn generate_layout(rng: &mut StdRng) -> MapLayout {
    let entrance = rng.gen_range(0..ROOM_COUNT);
    let blocked = adjacent(entrance);
    let valid_exits: Vec<usize> = (0..ROOM_COUNT)
        .filter(|pos| *pos != entrance && !blocked.contains(pos))
        .collect();
    let exit = *valid_exits
        .choose(rng)
        .unwrap_or(&((entrance + 2 * GRID_SIDE) % ROOM_COUNT));

    let mut remaining: Vec<String> = (1..ROOM_COUNT - 1).map(|i| format!("D{}", i)).collect();
    remaining.shuffle(rng);

    let mut descriptions = Vec::with_capacity(ROOM_COUNT);
    for pos in 0..ROOM_COUNT {
        if pos == entrance {
            descriptions.push(ENTRANCE_ID.to_string());
        } else if pos == exit {
            descriptions.push(EXIT_ID.to_string());
        } else {
            descriptions.push(remaining.pop().unwrap_or_default());
        }
    }

    MapLayout {
        descriptions,
        encounters: vec![None; ROOM_COUNT],
        loot: vec![None; ROOM_COUNT],
        entrance,
        exit,
    }
}

/// Place the nine encounter ids on distinct non-entrance/exit cells.
pub fn assign_encounters(layout: &mut MapLayout, rng: &mut StdRng) {
    let ids: Vec<String> = (1..=ENCOUNTER_COUNT).map(|i| format!("RE{}", i)).collect();
    for (pos, id) in pick_cells(layout, ids.len(), rng).into_iter().zip(ids) {
        layout.encounters[pos] = Some(id);
    }
}

/// Place the twelve loot ids on distinct non-entrance/exit cells. A cell may
/// hold both an encounter and a loot item.
pub fn assign_loot(layout: &mut MapLayout, rng: &mut StdRng) {
    let ids: Vec<String> = (1..=LOOT_COUNT).map(|i| format!("L{}", i)).collect();
    for (pos, id) in pick_cells(layout, ids.len(), rng).into_iter().zip(ids) {
        layout.loot[pos] = Some(id);
    }
}

fn pick_cells(layout: &MapLayout, count: usize, rng: &mut StdRng) -> Vec<usize> {
    let mut candidates: Vec<usize> = (0..ROOM_COUNT)
        .filter(|pos| *pos != layout.entrance && *pos != layout.exit)
        .collect();
    candidates.shuffle(rng);
    candidates.truncate(count);
    candidates
}

/// Per-room encounter content and state.
#[derive(Clone, Debug)]
pub struct EncounterState {
    pub id: String,
    pub active: bool,
    pub description: String,
    pub options: Vec<String>,
    pub points: [f64; 3],
    pub sense_radius: u32,
    pub sense_description: String,
    pub sense_option: String,
    pub sense_points: [f64; 2],
}

/// Per-room loot content and state.
#[derive(Clone, Debug)]
pub struct LootState {
    pub id: String,
    pub active: bool,
    pub item: String,
    pub description: String,
    pub take_option: String,
    pub points: [f64; 2],
    pub sense_radius: u32,
    pub sense_description: String,
    pub sense_option: String,
    pub sense_points: [f64; 2],
    pub special: Option<SpecialEffect>,
}

#[derive(Clone, Debug)]
pub struct Room {
    pub loc: usize,
    pub description_id: String,
    pub description: String,
    pub encounter: Option<EncounterState>,
    pub loot: Option<LootState>,
    pub visited: bool,
    pub occupied: bool,
    pub exit_hint: Option<Direction>,
    directions: Vec<Direction>,
}

impl Room {
    pub fn new(loc: usize, description_id: String, description: String) -> Self {
        Self {
            loc,
            description_id,
            description,
            encounter: None,
            loot: None,
            visited: false,
            occupied: false,
            exit_hint: None,
            directions: directions_for(loc),
        }
    }

    /// The legal movement directions; fixed at construction.
    pub fn directions(&self) -> &[Direction] {
        &self.directions
    }

    pub fn active_encounter(&self) -> Option<&EncounterState> {
        self.encounter.as_ref().filter(|e| e.active)
    }

    pub fn active_loot(&self) -> Option<&LootState> {
        self.loot.as_ref().filter(|l| l.active)
    }

    pub fn enter(&mut self) {
        self.visited = true;
        self.occupied = true;
    }

    pub fn leave(&mut self) {
        self.occupied = false;
    }

    pub fn deactivate_encounter(&mut self) {
        if let Some(encounter) = self.encounter.as_mut() {
            encounter.active = false;
        }
    }

    pub fn deactivate_loot(&mut self) {
        if let Some(loot) = self.loot.as_mut() {
            loot.active = false;
        }
    }
}

/// The populated 25-room dungeon. Exactly one entrance, exactly one exit,
/// never adjacent to each other.
#[derive(Clone, Debug)]
pub struct DungeonMap {
    rooms: Vec<Room>,
    entrance: usize,
    exit: usize,
}

impl DungeonMap {
    pub fn new(mut rooms: Vec<Room>, entrance: usize, exit: usize) -> Self {
        for room in rooms.iter_mut() {
            room.exit_hint = exit_hint_for(room.loc, exit);
        }
        Self {
            rooms,
            entrance,
            exit,
        }
    }

    pub fn entrance(&self) -> usize {
        self.entrance
    }

    pub fn exit(&self) -> usize {
        self.exit
    }

    pub fn room(&self, loc: usize) -> &Room {
        &self.rooms[loc]
    }

    pub fn room_mut(&mut self, loc: usize) -> &mut Room {
        &mut self.rooms[loc]
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn rooms_mut(&mut self) -> &mut [Room] {
        &mut self.rooms
    }

    /// Walk the precomputed per-room hints from `loc` to the exit. An
    /// explicit loop; the path length is bounded by the walked cells, so a
    /// malformed hint table cannot spin forever.
    pub fn exit_path_from(&self, loc: usize) -> Vec<Direction> {
        let mut path = Vec::new();
        let mut current = loc;
        while current != self.exit && path.len() < ROOM_COUNT {
            let Some(direction) = self.rooms[current].exit_hint else {
                break;
            };
            path.push(direction);
            match step(current, direction) {
                Some(next) => current = next,
                None => break,
            }
        }
        path
    }

    pub fn snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            entrance: self.entrance,
            exit: self.exit,
            rooms: self
                .rooms
                .iter()
                .map(|room| RoomSnapshot {
                    loc: room.loc,
                    description_id: room.description_id.clone(),
                    encounter_id: room.encounter.as_ref().map(|e| e.id.clone()),
                    encounter_active: room.active_encounter().is_some(),
                    loot_id: room.loot.as_ref().map(|l| l.id.clone()),
                    loot_active: room.active_loot().is_some(),
                    visited: room.visited,
                    occupied: room.occupied,
                })
                .collect(),
        }
    }
}

/// Row difference first, then column difference, mirroring how the shortest
/// path is described to the player.
fn exit_hint_for(loc: usize, exit: usize) -> Option<Direction> {
    if loc == exit {
        return None;
    }
    let (row, exit_row) = (loc / GRID_SIDE, exit / GRID_SIDE);
    if row > exit_row {
        return Some(Direction::North);
    }
    if row < exit_row {
        return Some(Direction::South);
    }
    let (col, exit_col) = (loc % GRID_SIDE, exit % GRID_SIDE);
    if col > exit_col {
        Some(Direction::West)
    } else {
        Some(Direction::East)
    }
}

/// Read-only view of the map for recording and rendering.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub entrance: usize,
    pub exit: usize,
    pub rooms: Vec<RoomSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub loc: usize,
    pub description_id: String,
    pub encounter_id: Option<String>,
    pub encounter_active: bool,
    pub loot_id: Option<String>,
    pub loot_active: bool,
    pub visited: bool,
    pub occupied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn direction_counts_match_grid_position() {
        for loc in 0..ROOM_COUNT {
            let count = directions_for(loc).len();
            let row = loc / GRID_SIDE;
            let col = loc % GRID_SIDE;
            let on_edge_rows = row == 0 || row == GRID_SIDE - 1;
            let on_edge_cols = col == 0 || col == GRID_SIDE - 1;
            let expected = match (on_edge_rows, on_edge_cols) {
                (true, true) => 2,
                (false, false) => 4,
                _ => 3,
            };
            assert_eq!(count, expected, "room {}", loc);
        }
    }

    #[test]
    fn step_respects_grid_bounds() {
        assert_eq!(step(0, Direction::North), None);
        assert_eq!(step(0, Direction::West), None);
        assert_eq!(step(4, Direction::East), None);
        assert_eq!(step(24, Direction::South), None);
        assert_eq!(step(12, Direction::North), Some(7));
        assert_eq!(step(12, Direction::East), Some(13));
        // West from a left-column room must not wrap to the previous row.
        assert_eq!(step(5, Direction::West), None);
    }

    #[test]
    fn generated_layouts_respect_placement_constraints() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let layout = generate_layout(&mut rng);
            assert_ne!(layout.entrance, layout.exit);
            assert!(
                !adjacent(layout.entrance).contains(&layout.exit),
                "seed {}: exit adjacent to entrance",
                seed
            );
            let mut ids: Vec<&String> = layout
                .descriptions
                .iter()
                .filter(|id| *id != ENTRANCE_ID && *id != EXIT_ID)
                .collect();
            assert_eq!(ids.len(), ROOM_COUNT - 2);
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), ROOM_COUNT - 2, "seed {}: duplicate ids", seed);
        }
    }

    #[test]
    fn content_assignment_avoids_entrance_and_exit() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut layout = generate_layout(&mut rng);
        assign_encounters(&mut layout, &mut rng);
        assign_loot(&mut layout, &mut rng);
        assert!(layout.encounters[layout.entrance].is_none());
        assert!(layout.encounters[layout.exit].is_none());
        assert!(layout.loot[layout.entrance].is_none());
        assert!(layout.loot[layout.exit].is_none());
        assert_eq!(
            layout.encounters.iter().filter(|e| e.is_some()).count(),
            ENCOUNTER_COUNT
        );
        assert_eq!(layout.loot.iter().filter(|l| l.is_some()).count(), LOOT_COUNT);
    }

    #[test]
    fn exit_path_walks_to_the_exit() {
        let rooms: Vec<Room> = (0..ROOM_COUNT)
            .map(|loc| Room::new(loc, format!("D{}", loc), String::new()))
            .collect();
        let map = DungeonMap::new(rooms, 0, 18);
        let path = map.exit_path_from(0);
        assert!(!path.is_empty());
        let mut current = 0;
        for direction in &path {
            current = step(current, *direction).expect("path step stays in bounds");
        }
        assert_eq!(current, 18);
        // Grid diameter bounds the path.
        assert!(path.len() <= 2 * (GRID_SIDE - 1));
        assert!(map.exit_path_from(18).is_empty());
    }
}
