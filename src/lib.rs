pub mod modules;

pub use modules::assistant::{
    Assistant, LlmAssistant, LlmConfig, LlmProvider, ScriptedAssistant, TurnReply, parse_reply,
};
pub use modules::catalog::{
    Catalog, CatalogError, EncounterRecord, JsonCatalog, LootRecord, SpecialEffect, populate,
};
pub use modules::engine::{Engine, GameError, RunReport, TURN_LIMIT, TurnContext};
pub use modules::grid::{
    Direction, DungeonMap, ENCOUNTER_COUNT, ENTRANCE_ID, EXIT_ID, EncounterState, GRID_SIDE,
    LOOT_COUNT, LootState, MapLayout, MapSnapshot, ROOM_COUNT, Room, RoomSnapshot, adjacent,
    assign_encounters, assign_loot, directions_for, generate_layout, step,
};
pub use modules::guard::{GuardOutcome, REJECTION_BOUND, ResponseGuard};
pub use modules::menu::{
    MapHint, MenuAction, MenuEntry, RoomHint, SpecialNotice, TurnMenu, build_menu, map_hint,
};
pub use modules::player::{Decision, Player, RunStatus};
pub use modules::profile::{
    Alignment, BatchMode, Motivation, Profile, alignment_group, batch_profiles,
};
pub use modules::recorder::{JsonRecorder, NullRecorder, Recorder, RunRecord};
pub use modules::render::{render_layout, render_progress};
pub use modules::scoring::{TurnScore, score_turn};
