use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::modules::grid::{
    DungeonMap, EncounterState, ENTRANCE_ID, LootState, MapLayout, Room,
};
use crate::modules::profile::{Alignment, Motivation, Profile};

/// Special behaviors a loot item can trigger when collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialEffect {
    EndGame,
    RevealMap,
    RevealTurnsRemaining,
    ResetProgress,
    RevealShortestPath,
    TeleportNearExit,
    RefundTurns,
    SuppressEncounters,
}

/// An authored encounter: text, options, and the per-alignment point tables.
/// `points` tuples are (option one, option two, ignore); `sense_points` are
/// (explore, ignore).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncounterRecord {
    pub id: String,
    pub alignment: Alignment,
    pub room_description: String,
    pub description: String,
    pub options: Vec<String>,
    pub points: BTreeMap<Alignment, [f64; 3]>,
    pub sense_radius: u32,
    pub sense_description: String,
    pub sense_option: String,
    pub sense_points: BTreeMap<Alignment, [f64; 2]>,
}

/// An authored loot item. `points` tuples are (take, leave); `sense_points`
/// are (explore, ignore).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LootRecord {
    pub id: String,
    pub motivation: Motivation,
    pub item: String,
    pub description: String,
    pub take_option: String,
    pub points: BTreeMap<Motivation, [f64; 2]>,
    pub sense_radius: u32,
    pub sense_description: String,
    pub sense_option: String,
    pub sense_points: BTreeMap<Motivation, [f64; 2]>,
    #[serde(default)]
    pub special: Option<SpecialEffect>,
}

#[derive(Debug)]
pub enum CatalogError {
    Io(io::Error),
    Parse(serde_json::Error),
    MissingDescription(String),
    MissingEncounter(String),
    MissingLoot(String),
    MissingPointTable { id: String, profile: String },
    BadRecord { id: String, reason: String },
    ProfileMismatch(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "catalog io error: {}", err),
            CatalogError::Parse(err) => write!(f, "catalog parse error: {}", err),
            CatalogError::MissingDescription(id) => {
                write!(f, "no description record for id '{}'", id)
            }
            CatalogError::MissingEncounter(id) => {
                write!(f, "no encounter record for id '{}'", id)
            }
            CatalogError::MissingLoot(id) => write!(f, "no loot record for id '{}'", id),
            CatalogError::MissingPointTable { id, profile } => {
                write!(f, "record '{}' has no point table for profile '{}'", id, profile)
            }
            CatalogError::BadRecord { id, reason } => {
                write!(f, "record '{}' is malformed: {}", id, reason)
            }
            CatalogError::ProfileMismatch(reason) => {
                write!(f, "profile does not fit the map content: {}", reason)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<io::Error> for CatalogError {
    fn from(err: io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Parse(err)
    }
}

/// Read-only source of room descriptions, encounters, and loot. Queried once
/// per content id per run.
pub trait Catalog {
    fn description(&self, id: &str) -> Result<&str, CatalogError>;
    fn encounter(&self, id: &str) -> Result<&EncounterRecord, CatalogError>;
    fn loot(&self, id: &str) -> Result<&LootRecord, CatalogError>;
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CatalogData {
    descriptions: BTreeMap<String, String>,
    encounters: Vec<EncounterRecord>,
    loot: Vec<LootRecord>,
}

/// Catalog backed by a JSON file; the default data set ships embedded.
#[derive(Clone, Debug)]
pub struct JsonCatalog {
    data: CatalogData,
}

const DEFAULT_CATALOG: &str = include_str!("../../data/catalog.json");

impl JsonCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// The embedded default content set.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::parse(DEFAULT_CATALOG)
    }

    fn parse(raw: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(raw)?;
        let catalog = Self { data };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Structural checks: option/point arities line up and every record
    /// carries a table for every profile it can be scored against.
    fn validate(&self) -> Result<(), CatalogError> {
        for record in &self.data.encounters {
            if record.points.len() != Alignment::ALL.len()
                || record.sense_points.len() != Alignment::ALL.len()
            {
                return Err(CatalogError::BadRecord {
                    id: record.id.clone(),
                    reason: "point tables must cover all nine alignments".into(),
                });
            }
            if record.options.len() + 1 != 3 {
                return Err(CatalogError::BadRecord {
                    id: record.id.clone(),
                    reason: format!(
                        "expected two options plus an ignore slot, found {} options",
                        record.options.len()
                    ),
                });
            }
        }
        for record in &self.data.loot {
            if record.points.len() != Motivation::ALL.len()
                || record.sense_points.len() != Motivation::ALL.len()
            {
                return Err(CatalogError::BadRecord {
                    id: record.id.clone(),
                    reason: "point tables must cover all four motivations".into(),
                });
            }
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "{} descriptions, {} encounters, {} loot items",
            self.data.descriptions.len(),
            self.data.encounters.len(),
            self.data.loot.len()
        )
    }
}

impl Catalog for JsonCatalog {
    fn description(&self, id: &str) -> Result<&str, CatalogError> {
        self.data
            .descriptions
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| CatalogError::MissingDescription(id.to_string()))
    }

    fn encounter(&self, id: &str) -> Result<&EncounterRecord, CatalogError> {
        self.data
            .encounters
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| CatalogError::MissingEncounter(id.to_string()))
    }

    fn loot(&self, id: &str) -> Result<&LootRecord, CatalogError> {
        self.data
            .loot
            .iter()
            .find(|record| record.id == id)
            .ok_or_else(|| CatalogError::MissingLoot(id.to_string()))
    }
}

/// Join catalog content onto a generated layout, producing the playable map.
/// A pure lookup: rooms without an assigned id stay inactive for that content
/// type. A missing record or point table is a fatal configuration error.
pub fn populate(
    layout: &MapLayout,
    catalog: &dyn Catalog,
    profile: Profile,
) -> Result<DungeonMap, CatalogError> {
    let mut rooms = Vec::with_capacity(layout.descriptions.len());

    for (loc, description_id) in layout.descriptions.iter().enumerate() {
        let description = catalog.description(description_id)?.to_string();
        let mut room = Room::new(loc, description_id.clone(), description);
        if description_id == ENTRANCE_ID {
            room.enter();
        }

        if let Some(encounter_id) = &layout.encounters[loc] {
            let alignment = profile.alignment.ok_or_else(|| {
                CatalogError::ProfileMismatch(format!(
                    "encounter '{}' assigned but the run has no alignment",
                    encounter_id
                ))
            })?;
            let record = catalog.encounter(encounter_id)?;
            let points = lookup_points(&record.points, alignment, encounter_id)?;
            let sense_points = lookup_points(&record.sense_points, alignment, encounter_id)?;
            // Encounter rooms get themed descriptions.
            room.description = record.room_description.clone();
            room.encounter = Some(EncounterState {
                id: encounter_id.clone(),
                active: true,
                description: record.description.clone(),
                options: record.options.clone(),
                points,
                sense_radius: record.sense_radius,
                sense_description: record.sense_description.clone(),
                sense_option: record.sense_option.clone(),
                sense_points,
            });
        }

        if let Some(loot_id) = &layout.loot[loc] {
            let motivation = profile.motivation.ok_or_else(|| {
                CatalogError::ProfileMismatch(format!(
                    "loot '{}' assigned but the run has no motivation",
                    loot_id
                ))
            })?;
            let record = catalog.loot(loot_id)?;
            let points = lookup_points(&record.points, motivation, loot_id)?;
            let sense_points = lookup_points(&record.sense_points, motivation, loot_id)?;
            room.loot = Some(LootState {
                id: loot_id.clone(),
                active: true,
                item: record.item.clone(),
                description: record.description.clone(),
                take_option: record.take_option.clone(),
                points,
                sense_radius: record.sense_radius,
                sense_description: record.sense_description.clone(),
                sense_option: record.sense_option.clone(),
                sense_points,
                special: record.special,
            });
        }

        rooms.push(room);
    }

    Ok(DungeonMap::new(rooms, layout.entrance, layout.exit))
}

fn lookup_points<K: Ord + fmt::Display + Copy, const N: usize>(
    table: &BTreeMap<K, [f64; N]>,
    key: K,
    id: &str,
) -> Result<[f64; N], CatalogError> {
    table
        .get(&key)
        .copied()
        .ok_or_else(|| CatalogError::MissingPointTable {
            id: id.to_string(),
            profile: key.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::grid;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn builtin_catalog_loads_and_validates() {
        let catalog = JsonCatalog::builtin().expect("embedded catalog is valid");
        assert!(catalog.description("entrance").is_ok());
        assert!(catalog.description("exit").is_ok());
        for i in 1..=grid::ROOM_COUNT - 2 {
            assert!(catalog.description(&format!("D{}", i)).is_ok(), "D{}", i);
        }
        for i in 1..=grid::ENCOUNTER_COUNT {
            assert!(catalog.encounter(&format!("RE{}", i)).is_ok(), "RE{}", i);
        }
        for i in 1..=grid::LOOT_COUNT {
            assert!(catalog.loot(&format!("L{}", i)).is_ok(), "L{}", i);
        }
    }

    #[test]
    fn unknown_ids_are_reported() {
        let catalog = JsonCatalog::builtin().unwrap();
        assert!(matches!(
            catalog.encounter("RE99"),
            Err(CatalogError::MissingEncounter(_))
        ));
        assert!(matches!(catalog.loot("L99"), Err(CatalogError::MissingLoot(_))));
    }

    #[test]
    fn populate_joins_content_for_a_full_profile() {
        let catalog = JsonCatalog::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let mut layout = grid::generate_layout(&mut rng);
        grid::assign_encounters(&mut layout, &mut rng);
        grid::assign_loot(&mut layout, &mut rng);

        let profile = "LG-Wealth".parse().unwrap();
        let map = populate(&layout, &catalog, profile).unwrap();

        let encounters = map
            .rooms()
            .iter()
            .filter(|room| room.active_encounter().is_some())
            .count();
        let loot = map
            .rooms()
            .iter()
            .filter(|room| room.active_loot().is_some())
            .count();
        assert_eq!(encounters, grid::ENCOUNTER_COUNT);
        assert_eq!(loot, grid::LOOT_COUNT);
        assert!(map.room(map.entrance()).visited);
        assert!(map.room(map.entrance()).occupied);
    }

    #[test]
    fn populate_rejects_a_profile_without_the_needed_axis() {
        let catalog = JsonCatalog::builtin().unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut layout = grid::generate_layout(&mut rng);
        grid::assign_encounters(&mut layout, &mut rng);

        let profile = "Wealth".parse().unwrap();
        assert!(matches!(
            populate(&layout, &catalog, profile),
            Err(CatalogError::ProfileMismatch(_))
        ));
    }

    #[test]
    fn special_effect_tags_parse_from_snake_case() {
        let effect: SpecialEffect = serde_json::from_str("\"reset_progress\"").unwrap();
        assert_eq!(effect, SpecialEffect::ResetProgress);
        let catalog = JsonCatalog::builtin().unwrap();
        let specials: Vec<SpecialEffect> = (1..=grid::LOOT_COUNT)
            .filter_map(|i| catalog.loot(&format!("L{}", i)).unwrap().special)
            .collect();
        assert_eq!(specials.len(), 8);
    }
}
