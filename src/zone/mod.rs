//! # Zone Module
//!
//! The zone model: one grid-sized playable area addressed by
//! `(x, y, dimension, depth)`, its enemy population, and the repository
//! that caches zones across visits.
//!
//! Zones are created by the generation handlers, mutated by gameplay
//! (tile edits on pickup and breakage), persisted by the game state
//! manager, and replaced wholesale on transition.

pub mod generator;
pub mod handlers;

pub use generator::*;
pub use handlers::*;

use crate::board::Rotation;
use crate::{Grid, Position, Tile};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Selects which handler strategy generates a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Surface,
    Interior,
    Underground,
    Chess,
}

/// Chess-mode team membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    White,
    Black,
}

impl Team {
    pub fn opponent(self) -> Team {
        match self {
            Team::White => Team::Black,
            Team::Black => Team::White,
        }
    }
}

/// Composite key identifying a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneKey {
    pub zone_x: i32,
    pub zone_y: i32,
    pub dimension: Dimension,
    pub depth: i32,
}

impl ZoneKey {
    pub fn new(zone_x: i32, zone_y: i32, dimension: Dimension, depth: i32) -> Self {
        Self {
            zone_x,
            zone_y,
            dimension,
            depth,
        }
    }

    /// Surface zone at the given world coordinates.
    pub fn surface(zone_x: i32, zone_y: i32) -> Self {
        Self::new(zone_x, zone_y, Dimension::Surface, 0)
    }

    /// Underground zone below the given coordinates.
    pub fn underground(zone_x: i32, zone_y: i32, depth: i32) -> Self {
        Self::new(zone_x, zone_y, Dimension::Underground, depth)
    }

    /// The home zone: surface origin. Treated specially by every
    /// generation handler (no random features, reduced hazards).
    pub fn home() -> Self {
        Self::surface(0, 0)
    }

    pub fn is_home(&self) -> bool {
        *self == Self::home()
    }

    /// Difficulty tier: king-move distance from the origin. The home zone
    /// is always tier 0.
    pub fn zone_level(&self) -> u32 {
        Position::new(self.zone_x, self.zone_y).chebyshev_distance(Position::origin())
    }
}

impl std::fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{:?},{}",
            self.zone_x, self.zone_y, self.dimension, self.depth
        )
    }
}

/// Which edges of a zone connect to a neighboring zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneConnections {
    pub north: bool,
    pub south: bool,
    pub east: bool,
    pub west: bool,
}

impl ZoneConnections {
    pub fn all() -> Self {
        Self {
            north: true,
            south: true,
            east: true,
            west: true,
        }
    }

    pub fn count(&self) -> usize {
        [self.north, self.south, self.east, self.west]
            .iter()
            .filter(|c| **c)
            .count()
    }
}

/// How the player arrived in a zone through a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortEntry {
    Hole,
    Pitfall,
    Stairway,
    Door,
}

/// Port-transition context handed to generation so the arrival zone can
/// place the matching counterpart port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortTransition {
    pub from: PortEntry,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

impl PortTransition {
    pub fn new(from: PortEntry, x: Option<i32>, y: Option<i32>) -> Self {
        Self { from, x, y }
    }

    /// The exact arrival tile, when the transition carried one.
    pub fn arrival_position(&self) -> Option<Position> {
        match (self.x, self.y) {
            (Some(x), Some(y)) => Some(Position::new(x, y)),
            _ => None,
        }
    }
}

/// A single enemy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: Uuid,
    pub position: Position,
    pub enemy_type: String,
    pub health: i32,
    pub team: Option<Team>,
    pub is_frozen: bool,
    pub show_frozen_visual: bool,
}

impl Enemy {
    pub fn new(enemy_type: impl Into<String>, position: Position, health: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            enemy_type: enemy_type.into(),
            health,
            team: None,
            is_frozen: false,
            show_frozen_visual: false,
        }
    }

    pub fn with_team(mut self, team: Team) -> Self {
        self.team = Some(team);
        self
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

/// Facade over a zone's enemy array.
///
/// Turn logic never touches the backing vector directly: the collection
/// hands out order-preserving id snapshots, position sets for
/// collision baselines, and a lazy dead sweep that runs after death
/// animations complete.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnemyCollection {
    enemies: Vec<Enemy>,
}

impl EnemyCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, enemy: Enemy) {
        self.enemies.push(enemy);
    }

    pub fn len(&self) -> usize {
        self.enemies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enemies.is_empty()
    }

    pub fn get_all(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn get(&self, id: Uuid) -> Option<&Enemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Enemy> {
        self.enemies.iter_mut().find(|e| e.id == id)
    }

    /// Whether the enemy is still present in the authoritative collection.
    pub fn contains(&self, id: Uuid) -> bool {
        self.enemies.iter().any(|e| e.id == id)
    }

    /// Enemy ids in collection order, for queue snapshots.
    pub fn ids_in_order(&self) -> Vec<Uuid> {
        self.enemies.iter().map(|e| e.id).collect()
    }

    /// Set of every occupied tile.
    pub fn positions_set(&self) -> HashSet<Position> {
        self.enemies.iter().map(|e| e.position).collect()
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&Enemy),
    {
        self.enemies.iter().for_each(f);
    }

    /// Marks every enemy frozen. The visual indicator is tracked
    /// separately so the grace period can suppress movement without it.
    pub fn freeze_all(&mut self, show_visual: bool) {
        for enemy in &mut self.enemies {
            enemy.is_frozen = true;
            enemy.show_frozen_visual = show_visual;
        }
    }

    pub fn thaw_all(&mut self) {
        for enemy in &mut self.enemies {
            enemy.is_frozen = false;
            enemy.show_frozen_visual = false;
        }
    }

    /// Removes dead enemies. Returns how many were swept.
    pub fn sweep_dead(&mut self) -> usize {
        let before = self.enemies.len();
        self.enemies.retain(|e| !e.is_dead());
        before - self.enemies.len()
    }
}

/// One playable area: its grid, enemies, and presentation metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub key: ZoneKey,
    pub grid: Grid,
    pub enemies: EnemyCollection,
    pub discovered: bool,
    pub spawn: Position,
    pub connections: ZoneConnections,
    /// Terrain texture names keyed by "x,y"
    pub terrain_names: HashMap<String, String>,
    /// Overlay texture names keyed by "x,y"
    pub overlays: HashMap<String, String>,
    /// Rotation metadata keyed by "x,y"
    pub rotations: HashMap<String, Rotation>,
    /// Arrival tile recorded for hole/pitfall entries, for the return trip
    pub return_to_surface: Option<Position>,
    pub name: Option<String>,
}

impl Zone {
    /// Creates an undiscovered zone around an existing grid.
    pub fn new(key: ZoneKey, grid: Grid) -> Self {
        let spawn = grid.center();
        Self {
            key,
            grid,
            enemies: EnemyCollection::new(),
            discovered: false,
            spawn,
            connections: ZoneConnections::default(),
            terrain_names: HashMap::new(),
            overlays: HashMap::new(),
            rotations: HashMap::new(),
            return_to_surface: None,
            name: None,
        }
    }

    /// Formats a position into the "x,y" metadata map key.
    pub fn pos_key(pos: Position) -> String {
        pos.to_string()
    }

    /// Whether the tile under `pos` is an exit.
    pub fn is_exit_at(&self, pos: Position) -> bool {
        self.grid.get(pos).map(Tile::is_exit).unwrap_or(false)
    }
}

/// Caches zones across visits, keyed by their composite key.
///
/// Not serialized directly: the save payload carries zones as sorted
/// `(key, zone)` entries, rebuilt via [`ZoneRepository::from_entries`].
#[derive(Debug, Default)]
pub struct ZoneRepository {
    zones: HashMap<ZoneKey, Zone>,
    /// Total distinct zones ever visited; drives the slow difficulty ramp
    pub zones_visited: u32,
}

impl ZoneRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &ZoneKey) -> bool {
        self.zones.contains_key(key)
    }

    pub fn get(&self, key: &ZoneKey) -> Option<&Zone> {
        self.zones.get(key)
    }

    pub fn get_mut(&mut self, key: &ZoneKey) -> Option<&mut Zone> {
        self.zones.get_mut(key)
    }

    /// Stores a freshly generated zone and counts the visit.
    pub fn insert(&mut self, zone: Zone) {
        self.zones_visited += 1;
        self.zones.insert(zone.key, zone);
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Keys of every discovered zone.
    pub fn discovered_keys(&self) -> Vec<ZoneKey> {
        self.zones
            .values()
            .filter(|z| z.discovered)
            .map(|z| z.key)
            .collect()
    }

    /// Drains the repository into a serializable list, sorted for
    /// deterministic save payloads.
    pub fn to_entries(&self) -> Vec<(ZoneKey, Zone)> {
        let mut entries: Vec<(ZoneKey, Zone)> =
            self.zones.iter().map(|(k, z)| (*k, z.clone())).collect();
        entries.sort_by_key(|(k, _)| (k.zone_x, k.zone_y, k.depth));
        entries
    }

    /// Rebuilds a repository from persisted entries.
    pub fn from_entries(entries: Vec<(ZoneKey, Zone)>, zones_visited: u32) -> Self {
        Self {
            zones: entries.into_iter().collect(),
            zones_visited,
        }
    }
}
