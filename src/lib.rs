//! # Warren
//!
//! A turn-based grid roguelike engine: procedural zone generation, strict
//! turn/combat ordering, authored-board loading, and persistence.
//!
//! ## Architecture Overview
//!
//! Warren is organized around a small number of tightly specified subsystems:
//!
//! - **Grid primitives**: coordinate math, tiles, and the zone grid
//! - **Animation scheduler**: a cancellable step-sequence interpreter that
//!   paces everything with a visual consequence
//! - **Zone generation**: per-dimension handler strategies that populate
//!   grids, exits, enemies, and items
//! - **Turn manager**: the player-turn/enemy-phase state machine with
//!   freeze and grace-period invariants
//! - **Persistence**: versioned save payloads with strict version gating
//!
//! Rendering, audio, and input gestures are external collaborators; the
//! engine exposes the narrow interfaces they consume and nothing more.

pub mod board;
pub mod content;
pub mod grid;
pub mod report;
pub mod schedule;
pub mod state;
pub mod turn;
pub mod zone;

// Core module re-exports
pub use board::*;
pub use content::*;
pub use grid::*;
pub use report::*;
pub use schedule::*;
pub use state::*;
pub use turn::*;
pub use zone::*;

/// Core error type for the Warren game engine.
#[derive(thiserror::Error, Debug)]
pub enum WarrenError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Game state is invalid
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Action cannot be performed
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Generation failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Authored board failed structural validation
    #[error("Board rejected: {0}")]
    BoardRejected(String),

    /// Save payload cannot be loaded
    #[error("Save rejected: {0}")]
    SaveRejected(String),

    /// An animation sequence was cancelled before completing
    #[error("Sequence cancelled")]
    Cancelled,
}

/// Result type used throughout the Warren codebase.
pub type WarrenResult<T> = Result<T, WarrenError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Game configuration constants.
pub mod config {
    /// Side length of every procedurally generated zone grid
    pub const GRID_SIZE: usize = 16;

    /// Current save payload version
    pub const SAVE_VERSION: u32 = 3;

    /// Base enemy spawn probability at zone level 0
    pub const BASE_ENEMY_SPAWN_CHANCE: f64 = 0.04;

    /// Additional spawn probability per zone level
    pub const SPAWN_CHANCE_PER_LEVEL: f64 = 0.02;

    /// Spawn probability added for every 10 zones visited
    pub const SPAWN_RAMP_STEP: f64 = 0.01;

    /// Spawn multiplier for zones entered through a pitfall
    pub const PITFALL_SPAWN_MULTIPLIER: f64 = 2.0;

    /// Maximum enemies placed in a single zone
    pub const MAX_ENEMIES_PER_ZONE: usize = 8;

    /// Chance of an extra stairdown in an underground zone
    pub const EXTRA_STAIRDOWN_CHANCE: f64 = 0.12;

    /// Chance for an underground zone to drop one of its connections
    pub const CONNECTION_DROP_CHANCE: f64 = 0.35;
}
