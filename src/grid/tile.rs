//! # Tiles and the Zone Grid
//!
//! A tile is either a bare kind (wall, floor, exit, water) or carries
//! extra data (a port kind, a sign message, an item with remaining uses).
//! Helper predicates unwrap both forms transparently so callers never
//! match on the variant shape themselves.

use crate::config::GRID_SIZE;
use crate::{Position, WarrenError, WarrenResult};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Typed transition tiles linking zones and dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    StairUp,
    StairDown,
    Hole,
    Cistern,
    InteriorDoor,
}

impl PortKind {
    /// Parses the `port_<kind>` structural token suffix used by authored
    /// boards.
    pub fn from_token(token: &str) -> Option<PortKind> {
        match token {
            "stairup" => Some(PortKind::StairUp),
            "stairdown" => Some(PortKind::StairDown),
            "hole" => Some(PortKind::Hole),
            "cistern" => Some(PortKind::Cistern),
            "door" => Some(PortKind::InteriorDoor),
            _ => None,
        }
    }
}

/// A single grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tile {
    Wall,
    Floor,
    Exit,
    Water,
    Shrub,
    Structure,
    /// Typed transition tile (stairs, holes, interior doors)
    Port { kind: PortKind },
    /// Readable sign; the message is resolved at board-load time
    Sign { message: String },
    /// Pickup with a remaining-use count
    Item { token: String, uses: u32 },
    /// Stationary NPC occupying its tile
    Npc { id: String },
}

impl Tile {
    /// Whether an entity can occupy this tile.
    pub fn is_walkable(&self) -> bool {
        match self {
            Tile::Floor | Tile::Exit | Tile::Port { .. } | Tile::Item { .. } => true,
            Tile::Wall
            | Tile::Water
            | Tile::Shrub
            | Tile::Structure
            | Tile::Sign { .. }
            | Tile::Npc { .. } => false,
        }
    }

    /// Whether this is a zone-border exit tile.
    pub fn is_exit(&self) -> bool {
        matches!(self, Tile::Exit)
    }

    /// Whether this is a port of any kind.
    pub fn is_port(&self) -> bool {
        matches!(self, Tile::Port { .. })
    }

    /// The port kind, if this tile is a port.
    pub fn port_kind(&self) -> Option<PortKind> {
        match self {
            Tile::Port { kind } => Some(*kind),
            _ => None,
        }
    }

    /// Plain floor with nothing on it. Placement helpers use this to find
    /// unclaimed tiles.
    pub fn is_plain_floor(&self) -> bool {
        matches!(self, Tile::Floor)
    }

    /// Whether generation may overwrite this tile with scattered features.
    pub fn is_feature_candidate(&self) -> bool {
        self.is_plain_floor()
    }
}

/// Row-major 2D tile matrix.
///
/// Procedural zones are always [`GRID_SIZE`]-square; authored boards may
/// declare other dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
    tiles: Vec<Vec<Tile>>,
}

impl Grid {
    /// Creates a grid of the given size filled with one tile kind.
    pub fn filled(width: usize, height: usize, tile: Tile) -> Self {
        Self {
            width,
            height,
            tiles: vec![vec![tile; width]; height],
        }
    }

    /// Creates the standard square zone grid filled with one tile kind.
    pub fn square(tile: Tile) -> Self {
        Self::filled(GRID_SIZE, GRID_SIZE, tile)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Checks whether a position lies inside the grid.
    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// Gets the tile at a position, if in bounds.
    pub fn get(&self, pos: Position) -> Option<&Tile> {
        if self.in_bounds(pos) {
            Some(&self.tiles[pos.y as usize][pos.x as usize])
        } else {
            None
        }
    }

    /// Replaces the tile at a position.
    pub fn set(&mut self, pos: Position, tile: Tile) -> WarrenResult<()> {
        if !self.in_bounds(pos) {
            return Err(WarrenError::InvalidState(format!(
                "Position {} out of bounds for {}x{} grid",
                pos, self.width, self.height
            )));
        }
        self.tiles[pos.y as usize][pos.x as usize] = tile;
        Ok(())
    }

    /// The center position of the grid.
    pub fn center(&self) -> Position {
        Position::new(self.width as i32 / 2, self.height as i32 / 2)
    }

    /// Iterates every position in the grid, row by row.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        let width = self.width as i32;
        let height = self.height as i32;
        (0..height).flat_map(move |y| (0..width).map(move |x| Position::new(x, y)))
    }

    /// All positions whose tile satisfies the predicate.
    pub fn positions_where<F>(&self, pred: F) -> Vec<Position>
    where
        F: Fn(&Tile) -> bool,
    {
        self.positions()
            .filter(|pos| self.get(*pos).map(&pred).unwrap_or(false))
            .collect()
    }

    /// All exit positions.
    pub fn exit_positions(&self) -> Vec<Position> {
        self.positions_where(Tile::is_exit)
    }

    /// Picks a random plain floor tile not in `exclude`. Returns `None`
    /// when the grid has no eligible tile left.
    pub fn random_plain_floor(
        &self,
        rng: &mut StdRng,
        exclude: &HashSet<Position>,
    ) -> Option<Position> {
        let candidates: Vec<Position> = self
            .positions_where(Tile::is_plain_floor)
            .into_iter()
            .filter(|pos| !exclude.contains(pos))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        Some(candidates[rng.gen_range(0..candidates.len())])
    }

    /// Whether a position is one of the four grid corners.
    pub fn is_corner(&self, pos: Position) -> bool {
        let max_x = self.width as i32 - 1;
        let max_y = self.height as i32 - 1;
        (pos.x == 0 || pos.x == max_x) && (pos.y == 0 || pos.y == max_y)
    }
}
