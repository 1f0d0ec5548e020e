use std::fmt;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::modules::assistant::Assistant;
use crate::modules::catalog::{CatalogError, SpecialEffect};
use crate::modules::grid::{Direction, DungeonMap, adjacent, step};
use crate::modules::guard::{GuardOutcome, ResponseGuard};
use crate::modules::menu::{MenuAction, SpecialNotice, build_menu, map_hint};
use crate::modules::player::{Player, RunStatus};
use crate::modules::recorder::{Recorder, RunRecord};
use crate::modules::scoring::score_turn;

/// A run ends in `TurnsExceeded` once the turn counter passes this many
/// committed moves.
pub const TURN_LIMIT: u32 = 35;

/// Steps refunded by the wheel-of-time item.
const TURN_REFUND: u32 = 5;

/// Fatal run errors: configuration and invariant violations, or collaborator
/// transport failures that survived their own retries. Never retried here;
/// the run aborts with status `Error`.
#[derive(Debug)]
pub enum GameError {
    Catalog(CatalogError),
    Transport(String),
    Config(String),
}

impl fmt::Display for GameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameError::Catalog(err) => write!(f, "catalog error: {}", err),
            GameError::Transport(err) => write!(f, "assistant transport error: {}", err),
            GameError::Config(err) => write!(f, "configuration error: {}", err),
        }
    }
}

impl std::error::Error for GameError {}

impl From<CatalogError> for GameError {
    fn from(err: CatalogError) -> Self {
        GameError::Catalog(err)
    }
}

/// Explicit per-step turn state: the direction the player may not retrace
/// and the pending one-turn notice from a special item.
#[derive(Clone, Debug, Default)]
pub struct TurnContext {
    pub blocked: Option<Direction>,
    pub notice: Option<SpecialNotice>,
}

impl TurnContext {
    /// The blocked direction as the menu should see it. A shortest-path
    /// notice whose first step retraces the block lifts it for that turn.
    pub fn effective_blocked(&self) -> Option<Direction> {
        match (&self.notice, self.blocked) {
            (Some(SpecialNotice::ExitPath(path)), Some(blocked))
                if path.first() == Some(&blocked) =>
            {
                None
            }
            _ => self.blocked,
        }
    }
}

enum RoomOutcome {
    Move(Direction),
    GoToExit,
    TeleportNearExit,
    Terminal(RunStatus),
}

/// The final state of a finished run.
pub struct RunReport {
    pub player: Player,
    pub map: DungeonMap,
}

/// Drives one play-through from entrance to exit: build the menu, resolve a
/// choice through the guard, apply it, repeat. Strictly sequential; one
/// outstanding assistant request at a time.
pub struct Engine<'a> {
    map: DungeonMap,
    player: Player,
    assistant: &'a mut dyn Assistant,
    recorder: &'a mut dyn Recorder,
    guard: ResponseGuard,
    rng: StdRng,
    ctx: TurnContext,
    loc: usize,
    prev: usize,
    started: bool,
}

impl<'a> Engine<'a> {
    pub fn new(
        map: DungeonMap,
        player: Player,
        assistant: &'a mut dyn Assistant,
        recorder: &'a mut dyn Recorder,
        rng: StdRng,
    ) -> Self {
        let entrance = map.entrance();
        Self {
            map,
            player,
            assistant,
            recorder,
            guard: ResponseGuard::new(),
            rng,
            ctx: TurnContext::default(),
            loc: entrance,
            prev: entrance,
            started: false,
        }
    }

    /// Run to a terminal status. Engine-side errors become status `Error`
    /// with the failure recorded verbatim; the partial ledger is still
    /// recorded.
    pub fn run(mut self) -> RunReport {
        let start = RunRecord::capture(&self.player, &self.map);
        if let Err(err) = self.recorder.record_start(&start) {
            eprintln!("warn: failed to record run start: {}", err);
        }

        if let Err(err) = self.drive() {
            self.player.status = RunStatus::Error(err.to_string());
        }

        let end = RunRecord::capture(&self.player, &self.map);
        if let Err(err) = self.recorder.record_end(&end) {
            eprintln!("warn: failed to record run end: {}", err);
        }

        RunReport {
            player: self.player,
            map: self.map,
        }
    }

    fn drive(&mut self) -> Result<(), GameError> {
        loop {
            self.player.room_visit(self.loc);
            if self.started {
                self.map.room_mut(self.loc).enter();
                self.map.room_mut(self.prev).leave();
            }

            if self.player.turns >= TURN_LIMIT {
                self.player.status = RunStatus::TurnsExceeded;
                return Ok(());
            }

            let destination = match self.process_room()? {
                RoomOutcome::Terminal(status) => {
                    self.player.status = status;
                    return Ok(());
                }
                RoomOutcome::Move(direction) => {
                    let dest = step(self.loc, direction).ok_or_else(|| {
                        GameError::Config(format!(
                            "move {} leaves the grid from room {}",
                            direction, self.loc
                        ))
                    })?;
                    self.ctx.blocked = Some(direction.opposite());
                    self.player.turns += 1;
                    dest
                }
                RoomOutcome::GoToExit => {
                    self.ctx.blocked = None;
                    self.map.exit()
                }
                RoomOutcome::TeleportNearExit => {
                    let neighbors = adjacent(self.map.exit());
                    let dest = *neighbors.choose(&mut self.rng).ok_or_else(|| {
                        GameError::Config("exit cell has no neighbors".into())
                    })?;
                    self.ctx.blocked = None;
                    self.player.turns += 1;
                    dest
                }
            };

            self.started = true;
            self.prev = self.loc;
            self.loc = destination;
            self.checkpoint();

            if self.loc == self.map.exit() {
                self.player.room_visit(self.loc);
                self.map.room_mut(self.loc).enter();
                self.map.room_mut(self.prev).leave();
                self.player.status = RunStatus::Complete;
                return Ok(());
            }
        }
    }

    /// Interact until the player leaves the room (or the run terminates).
    /// Interactions do not consume a turn; the player is re-prompted with
    /// the cleared content gone.
    fn process_room(&mut self) -> Result<RoomOutcome, GameError> {
        loop {
            let blocked = self.ctx.effective_blocked();
            let notice = self.ctx.notice.take();
            let menu = build_menu(&self.map, self.loc, blocked, notice.as_ref())
                .map_err(GameError::Config)?;
            let hint = match &notice {
                Some(SpecialNotice::Map(hint)) => Some(hint),
                _ => None,
            };

            let number = match self
                .guard
                .resolve(self.assistant, &menu, hint)
                .map_err(GameError::Transport)?
            {
                GuardOutcome::Accepted(number) => number,
                GuardOutcome::InvalidAction => {
                    return Ok(RoomOutcome::Terminal(RunStatus::InvalidAction));
                }
                GuardOutcome::Stuck => return Ok(RoomOutcome::Terminal(RunStatus::Stuck)),
            };

            let action = menu
                .entry(number)
                .map(|entry| entry.action.clone())
                .ok_or_else(|| {
                    GameError::Config(format!("accepted number {} missing from the menu", number))
                })?;

            self.player.add_score(score_turn(&menu, &action));
            let label = action.label();

            match action {
                MenuAction::Encounter { id, .. } => {
                    self.player.record_encounter(&id);
                    self.map.room_mut(self.loc).deactivate_encounter();
                }
                MenuAction::Loot { id, special, .. } => {
                    self.player.record_loot(&id);
                    self.map.room_mut(self.loc).deactivate_loot();
                    if let Some(effect) = special {
                        if let Some(outcome) = self.apply_special(effect, &id) {
                            return Ok(outcome);
                        }
                    }
                }
                MenuAction::SensedEncounter { id, direction, .. }
                | MenuAction::SensedLoot { id, direction, .. } => {
                    self.player.decide(label, &id);
                    return Ok(RoomOutcome::Move(direction));
                }
                MenuAction::Move { direction } | MenuAction::MoveIgnoring { direction } => {
                    return Ok(RoomOutcome::Move(direction));
                }
            }
        }
    }

    /// Exhaustive dispatch over the special loot effects. Returns the room
    /// outcome the effect forces, if any.
    fn apply_special(&mut self, effect: SpecialEffect, loot_id: &str) -> Option<RoomOutcome> {
        match effect {
            SpecialEffect::EndGame => Some(RoomOutcome::GoToExit),
            SpecialEffect::TeleportNearExit => Some(RoomOutcome::TeleportNearExit),
            SpecialEffect::RevealMap => {
                self.ctx.notice = Some(SpecialNotice::Map(map_hint(&self.map)));
                None
            }
            SpecialEffect::RevealTurnsRemaining => {
                self.ctx.notice = Some(SpecialNotice::TurnsRemaining(
                    TURN_LIMIT.saturating_sub(self.player.turns),
                ));
                None
            }
            SpecialEffect::RevealShortestPath => {
                self.ctx.notice =
                    Some(SpecialNotice::ExitPath(self.map.exit_path_from(self.loc)));
                None
            }
            SpecialEffect::ResetProgress => {
                // The trigger item itself stays collected; everything else
                // becomes new again. The score ledger is untouched.
                self.player.turns = 0;
                for room in self.map.rooms_mut() {
                    if let Some(encounter) = room.encounter.as_mut() {
                        encounter.active = true;
                    }
                    if let Some(loot) = room.loot.as_mut() {
                        if loot.id != loot_id {
                            loot.active = true;
                        }
                    }
                    room.visited = false;
                }
                None
            }
            SpecialEffect::RefundTurns => {
                self.player.turns = self.player.turns.saturating_sub(TURN_REFUND);
                None
            }
            SpecialEffect::SuppressEncounters => {
                if self.player.profile.alignment.is_some() {
                    for room in self.map.rooms_mut() {
                        room.deactivate_encounter();
                    }
                }
                None
            }
        }
    }

    fn checkpoint(&mut self) {
        let record = RunRecord::capture(&self.player, &self.map);
        if let Err(err) = self.recorder.checkpoint(&record) {
            eprintln!("warn: failed to checkpoint run record: {}", err);
        }
    }
}
