//! # Board Loader
//!
//! Parses authored JSON boards into grids with strict structural
//! validation. A board that fails validation is rejected whole and
//! treated as "not available" and never partially applied; callers
//! fall back to procedural generation.
//!
//! Terrain names are folder-prefixed (`walls/…`, `floors/…`); walkability
//! classifies by folder with one explicit exception (`floors/aqua` is
//! water) and a legacy lookup table for old non-prefixed names.

use crate::{
    ContentRegistry, Dimension, Enemy, Grid, PortKind, Position, Team, Tile, WarrenError,
    WarrenResult,
};
use log::warn;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Default message substituted when a sign has no authored text.
pub const BLANK_SIGN_MESSAGE: &str = "The sign is blank.";

/// Rendering rotation applied to a tile's texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    Quarter,
    Half,
    ThreeQuarter,
}

impl Rotation {
    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Quarter => 90,
            Rotation::Half => 180,
            Rotation::ThreeQuarter => 270,
        }
    }

    pub fn from_degrees(degrees: u32) -> Option<Rotation> {
        match degrees {
            90 => Some(Rotation::Quarter),
            180 => Some(Rotation::Half),
            270 => Some(Rotation::ThreeQuarter),
            _ => None,
        }
    }
}

/// Authored board payload as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    /// Declared `[width, height]`
    pub size: [u32; 2],
    /// Row-major terrain names; length must equal `width * height`
    pub terrain: Vec<String>,
    /// Feature tokens keyed by "x,y"
    #[serde(default)]
    pub features: HashMap<String, String>,
    /// Overlay texture names keyed by "x,y"
    #[serde(default)]
    pub overlays: HashMap<String, String>,
    /// Explicit rotation overrides (degrees) keyed by "x,y"
    #[serde(default)]
    pub rotations: HashMap<String, u32>,
    /// Sign texts keyed by the sign feature's "x,y"
    #[serde(default)]
    pub sign_messages: HashMap<String, String>,
    #[serde(default)]
    pub metadata: Option<BoardMetadata>,
}

/// Optional authored metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoardMetadata {
    /// Explicit player spawn; wins over every other spawn rule
    pub spawn: Option<[i32; 2]>,
    pub name: Option<String>,
}

/// Context the converter needs beyond the board itself.
#[derive(Debug, Clone, Copy)]
pub struct BoardContext {
    pub dimension: Dimension,
    pub level: u32,
    /// Home-dimension-zero boards spawn the player on a random exit tile
    pub home_zone: bool,
}

/// Everything a successful conversion produces.
#[derive(Debug)]
pub struct LoadedBoard {
    pub grid: Grid,
    pub enemies: Vec<Enemy>,
    pub spawn: Position,
    pub terrain_names: HashMap<String, String>,
    pub overlays: HashMap<String, String>,
    pub rotations: HashMap<String, Rotation>,
    pub name: Option<String>,
}

/// Parses an "x,y" coordinate key.
pub fn parse_coord(key: &str) -> Option<Position> {
    let (x, y) = key.split_once(',')?;
    Some(Position::new(
        x.trim().parse().ok()?,
        y.trim().parse().ok()?,
    ))
}

/// Structural validation. Declared size must match the terrain array and
/// every coordinate key must be in bounds.
pub fn validate_board(board: &Board) -> WarrenResult<()> {
    let [width, height] = board.size;
    if width == 0 || height == 0 {
        return Err(WarrenError::BoardRejected(format!(
            "degenerate size {}x{}",
            width, height
        )));
    }
    let expected = (width * height) as usize;
    if board.terrain.len() != expected {
        return Err(WarrenError::BoardRejected(format!(
            "terrain length {} does not match declared {}x{} ({} tiles)",
            board.terrain.len(),
            width,
            height,
            expected
        )));
    }

    let in_bounds = |pos: Position| {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < width && (pos.y as u32) < height
    };
    for (label, keys) in [
        ("feature", board.features.keys()),
        ("overlay", board.overlays.keys()),
        ("sign message", board.sign_messages.keys()),
    ] {
        for key in keys {
            match parse_coord(key) {
                Some(pos) if in_bounds(pos) => {}
                _ => {
                    return Err(WarrenError::BoardRejected(format!(
                        "{} coordinate '{}' is invalid or out of bounds",
                        label, key
                    )));
                }
            }
        }
    }
    for (key, degrees) in &board.rotations {
        match parse_coord(key) {
            Some(pos) if in_bounds(pos) => {}
            _ => {
                return Err(WarrenError::BoardRejected(format!(
                    "rotation coordinate '{}' is invalid or out of bounds",
                    key
                )));
            }
        }
        if Rotation::from_degrees(*degrees).is_none() {
            return Err(WarrenError::BoardRejected(format!(
                "rotation at '{}' has unsupported angle {}",
                key, degrees
            )));
        }
    }

    Ok(())
}

/// Whether a terrain name blocks movement.
///
/// Folder-prefixed names classify by folder; `floors/aqua` is the one
/// explicit exception (water). Non-prefixed names fall back to the
/// legacy table; unknown names default to open ground so classification
/// stays total.
pub fn is_wall_terrain(name: &str) -> bool {
    if name == "floors/aqua" {
        return true;
    }
    if let Some((folder, _)) = name.split_once('/') {
        return matches!(folder, "walls" | "obstacles");
    }
    // Legacy non-prefixed names kept for old boards
    matches!(name, "wall" | "rock" | "water" | "tree" | "shrub")
}

/// Maps a terrain name to its tile.
pub fn terrain_to_tile(name: &str) -> Tile {
    if name == "floors/aqua" {
        return Tile::Water;
    }
    if let Some((folder, _)) = name.split_once('/') {
        return match folder {
            "walls" => Tile::Wall,
            "obstacles" => Tile::Shrub,
            _ => Tile::Floor,
        };
    }
    match name {
        "wall" | "rock" => Tile::Wall,
        "water" => Tile::Water,
        "tree" | "shrub" => Tile::Shrub,
        _ => Tile::Floor,
    }
}

/// Grid corners, clockwise from the piece-native top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Corner {
    NorthWest,
    NorthEast,
    SouthEast,
    SouthWest,
}

impl Corner {
    fn clockwise_index(self) -> u32 {
        match self {
            Corner::NorthWest => 0,
            Corner::NorthEast => 1,
            Corner::SouthEast => 2,
            Corner::SouthWest => 3,
        }
    }
}

/// Wall pieces whose art is drawn for one specific corner.
const CORNER_PIECES: &[(&str, Corner)] = &[
    ("walls/corner_nw", Corner::NorthWest),
    ("walls/corner_ne", Corner::NorthEast),
    ("walls/corner_se", Corner::SouthEast),
    ("walls/corner_sw", Corner::SouthWest),
    ("walls/cobble_corner", Corner::NorthWest),
];

fn corner_of(pos: Position, width: u32, height: u32) -> Option<Corner> {
    let max_x = width as i32 - 1;
    let max_y = height as i32 - 1;
    match (pos.x, pos.y) {
        (0, 0) => Some(Corner::NorthWest),
        (x, 0) if x == max_x => Some(Corner::NorthEast),
        (x, y) if x == max_x && y == max_y => Some(Corner::SouthEast),
        (0, y) if y == max_y => Some(Corner::SouthWest),
        _ => None,
    }
}

/// Rotation needed when a corner wall piece lands in a grid corner other
/// than its native one. Returns `None` for non-corner pieces, non-corner
/// positions, and pieces already in their native corner.
pub fn auto_corner_rotation(name: &str, pos: Position, width: u32, height: u32) -> Option<Rotation> {
    let native = CORNER_PIECES
        .iter()
        .find(|(piece, _)| *piece == name)
        .map(|(_, corner)| *corner)?;
    let actual = corner_of(pos, width, height)?;
    let turns = (actual.clockwise_index() + 4 - native.clockwise_index()) % 4;
    match turns {
        1 => Some(Rotation::Quarter),
        2 => Some(Rotation::Half),
        3 => Some(Rotation::ThreeQuarter),
        _ => None,
    }
}

/// Converts a validated board into a grid plus its enemy list and spawn.
///
/// Enemy-type feature tokens are separated into the enemy list rather
/// than placed on the grid; chess boards assign team membership from the
/// `black_` naming prefix.
pub fn convert_board_to_grid(
    board: &Board,
    registry: &ContentRegistry,
    ctx: BoardContext,
    rng: &mut StdRng,
) -> WarrenResult<LoadedBoard> {
    validate_board(board)?;

    let [width, height] = board.size;
    let mut grid = Grid::filled(width as usize, height as usize, Tile::Floor);
    let mut terrain_names = HashMap::new();
    let mut rotations: HashMap<String, Rotation> = HashMap::new();

    for (index, name) in board.terrain.iter().enumerate() {
        let pos = Position::new(
            (index as u32 % width) as i32,
            (index as u32 / width) as i32,
        );
        grid.set(pos, terrain_to_tile(name))?;
        terrain_names.insert(pos.to_string(), name.clone());

        // Explicit rotation overrides always win over the automatic
        // corner rule.
        if !board.rotations.contains_key(&pos.to_string()) {
            if let Some(rotation) = auto_corner_rotation(name, pos, width, height) {
                rotations.insert(pos.to_string(), rotation);
            }
        }
    }
    for (key, degrees) in &board.rotations {
        if let Some(rotation) = Rotation::from_degrees(*degrees) {
            rotations.insert(key.clone(), rotation);
        }
    }

    let mut enemies = Vec::new();

    // Sorted key order keeps random draws reproducible for a given seed.
    let mut feature_keys: Vec<&String> = board.features.keys().collect();
    feature_keys.sort();

    for key in feature_keys {
        let token = &board.features[key];
        let pos = match parse_coord(key) {
            Some(pos) => pos,
            None => continue, // validation already rejected bad keys
        };

        if registry.is_enemy_token(token) {
            let type_name = token.strip_prefix("black_").unwrap_or(token);
            let health = registry
                .enemy_def(token)
                .map(|def| def.base_health)
                .unwrap_or(1);
            let mut enemy = Enemy::new(type_name, pos, health);
            if ctx.dimension == Dimension::Chess {
                enemy.team = Some(if token.starts_with("black_") {
                    Team::Black
                } else {
                    Team::White
                });
            }
            enemies.push(enemy);
            continue;
        }

        match token.as_str() {
            "random_item" => {
                if let Some(def) = registry.random_item(rng) {
                    grid.set(
                        pos,
                        Tile::Item {
                            token: def.token.clone(),
                            uses: def.uses,
                        },
                    )?;
                }
            }
            "random_radial_item" => {
                if let Some(def) = registry.random_radial_item(rng) {
                    grid.set(
                        pos,
                        Tile::Item {
                            token: def.token.clone(),
                            uses: def.uses,
                        },
                    )?;
                }
            }
            "random_food_water" => {
                let def = registry.food_or_water(rng);
                grid.set(
                    pos,
                    Tile::Item {
                        token: def.token,
                        uses: def.uses,
                    },
                )?;
            }
            "random_merchant" => {
                let pool = registry.merchants(ctx.dimension, ctx.level);
                if pool.is_empty() {
                    warn!("no merchant eligible for {:?} level {}", ctx.dimension, ctx.level);
                } else {
                    let picked = pool[rng.gen_range(0..pool.len())];
                    grid.set(pos, Tile::Npc {
                        id: picked.id.clone(),
                    })?;
                }
            }
            "random_gossip_npc" => {
                let pool = registry.gossip_npcs(ctx.dimension, ctx.level);
                if pool.is_empty() {
                    warn!("no gossip NPC eligible for {:?} level {}", ctx.dimension, ctx.level);
                } else {
                    let picked = pool[rng.gen_range(0..pool.len())];
                    grid.set(pos, Tile::Npc {
                        id: picked.id.clone(),
                    })?;
                }
            }
            "sign" => {
                let message = board.sign_messages.get(key).cloned().unwrap_or_else(|| {
                    warn!("sign at {} has no message, substituting default", key);
                    BLANK_SIGN_MESSAGE.to_string()
                });
                grid.set(pos, Tile::Sign { message })?;
            }
            other if other.starts_with("port_") => {
                match PortKind::from_token(&other["port_".len()..]) {
                    Some(kind) => grid.set(pos, Tile::Port { kind })?,
                    None => warn!("unknown port token '{}' at {}", other, key),
                }
            }
            other if other.starts_with("exit_") => {
                grid.set(pos, Tile::Exit)?;
            }
            other => {
                warn!("unknown feature token '{}' at {}, skipping", other, key);
            }
        }
    }

    let spawn = resolve_spawn(board, &grid, ctx, rng);

    Ok(LoadedBoard {
        grid,
        enemies,
        spawn,
        terrain_names,
        overlays: board.overlays.clone(),
        rotations,
        name: board.metadata.as_ref().and_then(|m| m.name.clone()),
    })
}

/// Spawn precedence: explicit metadata > home-zone random exit tile >
/// grid center.
fn resolve_spawn(board: &Board, grid: &Grid, ctx: BoardContext, rng: &mut StdRng) -> Position {
    if let Some(spawn) = board.metadata.as_ref().and_then(|m| m.spawn) {
        let pos = Position::new(spawn[0], spawn[1]);
        if grid.in_bounds(pos) {
            return pos;
        }
        warn!("metadata spawn {} out of bounds, falling back", pos);
    }
    if ctx.home_zone {
        let exits = grid.exit_positions();
        if !exits.is_empty() {
            return exits[rng.gen_range(0..exits.len())];
        }
    }
    grid.center()
}

/// Fetches and validates `boards/<board_type>/<name>.json`. Any failure
/// logs a diagnostic and yields `None`: the board is simply not
/// available and the caller degrades to procedural generation.
pub fn fetch_board(assets_dir: &Path, board_type: &str, name: &str) -> Option<Board> {
    let path = assets_dir
        .join("boards")
        .join(board_type)
        .join(format!("{}.json", name));
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("board {} unavailable: {}", path.display(), e);
            return None;
        }
    };
    let board: Board = match serde_json::from_str(&raw) {
        Ok(board) => board,
        Err(e) => {
            warn!("board {} failed to parse: {}", path.display(), e);
            return None;
        }
    };
    if let Err(e) = validate_board(&board) {
        warn!("board {} rejected: {}", path.display(), e);
        return None;
    }
    Some(board)
}
