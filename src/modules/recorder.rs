use std::fs;
use std::io;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::modules::grid::{DungeonMap, MapSnapshot};
use crate::modules::player::Player;

/// Everything worth persisting about a run at a point in time: the full
/// player ledger plus a map snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub recorded_at: String,
    pub run_name: String,
    pub player: Player,
    pub map: MapSnapshot,
}

impl RunRecord {
    pub fn capture(player: &Player, map: &DungeonMap) -> Self {
        Self {
            recorded_at: Utc::now().to_rfc3339(),
            run_name: player.run_name.clone(),
            player: player.clone(),
            map: map.snapshot(),
        }
    }
}

/// Write-mostly sink for run records: once at start, after every committed
/// move, and once at the end. Rewrites must be idempotent per run id so a
/// crash between steps never leaves a partial run unrecorded.
pub trait Recorder {
    fn record_start(&mut self, record: &RunRecord) -> io::Result<()>;
    fn checkpoint(&mut self, record: &RunRecord) -> io::Result<()>;
    fn record_end(&mut self, record: &RunRecord) -> io::Result<()>;
}

/// Discards everything.
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn record_start(&mut self, _record: &RunRecord) -> io::Result<()> {
        Ok(())
    }

    fn checkpoint(&mut self, _record: &RunRecord) -> io::Result<()> {
        Ok(())
    }

    fn record_end(&mut self, _record: &RunRecord) -> io::Result<()> {
        Ok(())
    }
}

/// File-backed recorder: one JSON file per run under
/// `<root>/<run_name>/<run_id>.json`, rewritten whole at every step.
pub struct JsonRecorder {
    dir: PathBuf,
    run_id: String,
}

impl JsonRecorder {
    pub fn new(root: impl Into<PathBuf>, run_name: &str, run_id: impl Into<String>) -> Self {
        Self {
            dir: root.into().join(run_name),
            run_id: run_id.into(),
        }
    }

    pub fn file_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.run_id))
    }

    fn write(&self, record: &RunRecord) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(record)?;
        fs::write(self.file_path(), json)?;
        Ok(())
    }
}

impl Recorder for JsonRecorder {
    fn record_start(&mut self, record: &RunRecord) -> io::Result<()> {
        self.write(record)
    }

    fn checkpoint(&mut self, record: &RunRecord) -> io::Result<()> {
        self.write(record)
    }

    fn record_end(&mut self, record: &RunRecord) -> io::Result<()> {
        self.write(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::grid::{ROOM_COUNT, Room};
    use crate::modules::player::RunStatus;

    fn sample_record() -> RunRecord {
        let rooms: Vec<Room> = (0..ROOM_COUNT)
            .map(|loc| Room::new(loc, format!("D{}", loc), String::new()))
            .collect();
        let map = DungeonMap::new(rooms, 0, 18);
        let player = Player::new(
            "Tester".into(),
            "TN-Speed".parse().unwrap(),
            "RECORDER_TEST".into(),
            0,
        );
        RunRecord::capture(&player, &map)
    }

    #[test]
    fn json_recorder_rewrites_the_same_file_idempotently() {
        let root = std::env::temp_dir().join("delver_recorder_test");
        let _ = fs::remove_dir_all(&root);
        let mut recorder = JsonRecorder::new(&root, "RECORDER_TEST", "run_0");

        let mut record = sample_record();
        recorder.record_start(&record).unwrap();
        record.player.turns = 3;
        recorder.checkpoint(&record).unwrap();
        record.player.status = RunStatus::Complete;
        recorder.record_end(&record).unwrap();

        let raw = fs::read_to_string(recorder.file_path()).unwrap();
        let parsed: RunRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.player.turns, 3);
        assert_eq!(parsed.player.status, RunStatus::Complete);
        assert_eq!(parsed.map.rooms.len(), ROOM_COUNT);

        let _ = fs::remove_dir_all(&root);
    }
}
