//! # Game State Module
//!
//! The player model, message log, statistics, and the persistence
//! boundary. Save payloads are versioned; a payload newer than the
//! supported version is rejected outright rather than partially loaded,
//! and a corrupted save is deleted rather than retried.

pub mod transient;

pub use transient::*;

use crate::config::SAVE_VERSION;
use crate::{Enemy, Grid, Position, WarrenError, WarrenResult, Zone, ZoneKey};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// The player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub position: Position,
    pub health: i32,
    pub max_health: i32,
}

impl Player {
    pub fn new(position: Position) -> Self {
        Self {
            position,
            health: 10,
            max_health: 10,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

/// How loudly a log message should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageImportance {
    Info,
    Notice,
    Critical,
}

/// One entry in the player-facing message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessage {
    pub text: String,
    pub importance: MessageImportance,
}

/// Bounded player-facing message history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLog {
    entries: Vec<LogMessage>,
}

impl MessageLog {
    const MAX_ENTRIES: usize = 200;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>, importance: MessageImportance) {
        self.entries.push(LogMessage {
            text: text.into(),
            importance,
        });
        if self.entries.len() > Self::MAX_ENTRIES {
            let overflow = self.entries.len() - Self::MAX_ENTRIES;
            self.entries.drain(..overflow);
        }
    }

    pub fn entries(&self) -> &[LogMessage] {
        &self.entries
    }

    pub fn recent(&self, count: usize) -> &[LogMessage] {
        let start = self.entries.len().saturating_sub(count);
        &self.entries[start..]
    }
}

/// Player progress counters, persisted in the save payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameStatistics {
    pub turns_survived: u64,
    pub enemies_defeated: u32,
    pub zones_discovered: u32,
    pub items_collected: u32,
    pub damage_taken: u64,
}

impl GameStatistics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Generation bookkeeping that must survive a save/load cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneGenerationStats {
    pub zones_visited: u32,
}

/// The persisted world snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedState {
    pub player: Player,
    pub player_stats: GameStatistics,
    pub zones: Vec<(ZoneKey, Zone)>,
    /// Current zone's grid, duplicated for fast resume rendering
    pub grid: Grid,
    /// Current zone's enemies, duplicated alongside the grid
    pub enemies: Vec<Enemy>,
    pub defeated_enemies: u32,
    pub special_zones: Vec<ZoneKey>,
    pub message_log: MessageLog,
    pub current_region: ZoneKey,
    pub zone_generation: ZoneGenerationStats,
}

/// Versioned save payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveGame {
    pub version: u32,
    pub last_saved: u64,
    pub state: SavedState,
}

impl SaveGame {
    pub fn new(state: SavedState) -> Self {
        let last_saved = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            version: SAVE_VERSION,
            last_saved,
            state,
        }
    }
}

/// Owns the save file path and the load/save contract.
///
/// Frozen-enemy and grace-period flags are deliberately absent from the
/// payload: they reset on load along with the rest of the transient
/// state.
#[derive(Debug, Clone)]
pub struct GameStateManager {
    path: PathBuf,
}

impl GameStateManager {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the save payload.
    pub fn save(&self, save: &SaveGame) -> WarrenResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(save)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Loads the save payload if one exists.
    ///
    /// A corrupted file is deleted and reported as absent. A payload
    /// whose version exceeds the supported one is rejected without
    /// touching the file, and never partially loaded.
    pub fn load(&self) -> WarrenResult<Option<SaveGame>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let save: SaveGame = match serde_json::from_str(&raw) {
            Ok(save) => save,
            Err(e) => {
                warn!(
                    "save {} is corrupted ({}), deleting it",
                    self.path.display(),
                    e
                );
                let _ = std::fs::remove_file(&self.path);
                return Ok(None);
            }
        };

        if save.version > SAVE_VERSION {
            return Err(WarrenError::SaveRejected(format!(
                "save version {} exceeds supported version {}",
                save.version, SAVE_VERSION
            )));
        }

        Ok(Some(save))
    }

    /// Deletes the save file if present.
    pub fn delete(&self) -> WarrenResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Grid, Tile};

    fn sample_state() -> SavedState {
        let zone = Zone::new(ZoneKey::home(), Grid::square(Tile::Floor));
        SavedState {
            player: Player::new(Position::new(8, 8)),
            player_stats: GameStatistics::new(),
            zones: vec![(zone.key, zone.clone())],
            grid: zone.grid.clone(),
            enemies: Vec::new(),
            defeated_enemies: 0,
            special_zones: Vec::new(),
            message_log: MessageLog::new(),
            current_region: ZoneKey::home(),
            zone_generation: ZoneGenerationStats { zones_visited: 1 },
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = GameStateManager::new(dir.path().join("save.json"));

        let save = SaveGame::new(sample_state());
        manager.save(&save).unwrap();

        let loaded = manager.load().unwrap().unwrap();
        assert_eq!(loaded.version, SAVE_VERSION);
        assert_eq!(loaded.state.current_region, ZoneKey::home());
        assert_eq!(loaded.state.zones.len(), 1);
        assert_eq!(loaded.state.player.position, Position::new(8, 8));
    }

    #[test]
    fn test_missing_save_is_absent_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = GameStateManager::new(dir.path().join("save.json"));
        assert!(manager.load().unwrap().is_none());
    }

    #[test]
    fn test_corrupted_save_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        std::fs::write(&path, "{ broken").unwrap();

        let manager = GameStateManager::new(&path);
        assert!(manager.load().unwrap().is_none());
        assert!(!path.exists(), "corrupted save should have been deleted");
    }

    #[test]
    fn test_newer_version_rejected_without_deletion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("save.json");
        let manager = GameStateManager::new(&path);

        let mut save = SaveGame::new(sample_state());
        save.version = SAVE_VERSION + 1;
        manager.save(&save).unwrap();

        let result = manager.load();
        assert!(matches!(result, Err(WarrenError::SaveRejected(_))));
        assert!(path.exists(), "a too-new save must not be destroyed");
    }

    #[test]
    fn test_message_log_bounded() {
        let mut log = MessageLog::new();
        for i in 0..250 {
            log.push(format!("message {}", i), MessageImportance::Info);
        }
        assert_eq!(log.entries().len(), 200);
        assert_eq!(log.entries()[0].text, "message 50");
        assert_eq!(log.recent(2)[1].text, "message 249");
    }
}
