//! # Dimension Handlers
//!
//! Surface, interior, underground, and chess generation strategies.
//! Each handler composes the shared base steps with its own placement
//! policies; interiors prefer authored boards and fall back to a
//! deprecated procedural room only when the asset is missing.

use crate::base;
use crate::config::{CONNECTION_DROP_CHANCE, EXTRA_STAIRDOWN_CHANCE};
use crate::{
    convert_board_to_grid, fetch_board, BoardContext, Dimension, Direction, Enemy,
    GenerationContext, LoadedBoard, PortEntry, PortKind, Position, Team, Tile, WarrenResult, Zone,
    ZoneHandler, ZoneRequest,
};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashSet;

/// Builds a zone around a successfully loaded authored board.
fn zone_from_loaded(req: &ZoneRequest, loaded: LoadedBoard) -> Zone {
    let mut zone = Zone::new(req.key, loaded.grid);
    zone.spawn = loaded.spawn;
    zone.connections = req.connections;
    zone.terrain_names = loaded.terrain_names;
    zone.overlays = loaded.overlays;
    zone.rotations = loaded.rotations;
    zone.name = loaded.name;
    for enemy in loaded.enemies {
        zone.enemies.push(enemy);
    }
    zone
}

/// Open-air zones: the default full pipeline, with a fixed homestead
/// layout at the origin.
pub struct SurfaceHandler;

impl ZoneHandler for SurfaceHandler {
    fn generate(
        &self,
        req: &ZoneRequest,
        ctx: &GenerationContext,
        rng: &mut StdRng,
    ) -> WarrenResult<Zone> {
        let mut zone = base::floor_shell(req.key);
        base::place_border_and_exits(&mut zone, req.connections);

        if req.key.is_home() {
            place_homestead(&mut zone)?;
        } else {
            base::place_structures(&mut zone, rng);
            base::scatter_terrain_features(&mut zone, ctx.world_seed, rng);
            base::place_items(&mut zone, ctx, rng);
            base::populate_enemies(&mut zone, req, ctx, rng);
            base::spawn_gossip_npc(&mut zone, ctx, rng);
        }

        zone.spawn = zone.grid.center();
        base::settle_spawn(&mut zone, rng);
        Ok(zone)
    }

    fn handler_type(&self) -> &'static str {
        "surface"
    }
}

/// The fixed home structure: a solid house with an interior door on its
/// south face.
fn place_homestead(zone: &mut Zone) -> WarrenResult<()> {
    let center = zone.grid.center();
    let top_left = Position::new(center.x - 3, center.y - 4);
    let bottom_right = Position::new(center.x + 1, center.y - 1);
    for pos in top_left.rectangle(bottom_right) {
        zone.grid.set(pos, Tile::Structure)?;
    }
    let door = Position::new(center.x - 1, bottom_right.y);
    zone.grid.set(
        door,
        Tile::Port {
            kind: PortKind::InteriorDoor,
        },
    )?;
    Ok(())
}

/// Cave zones entered through ports. Resolves the arrival context,
/// prunes connections to reduce maze branching, and gates the pruned
/// exits with shrubbery.
pub struct UndergroundHandler;

impl ZoneHandler for UndergroundHandler {
    fn generate(
        &self,
        req: &ZoneRequest,
        ctx: &GenerationContext,
        rng: &mut StdRng,
    ) -> WarrenResult<Zone> {
        let mut connections = req.connections;
        let mut dropped: Vec<Direction> = Vec::new();
        for direction in Direction::cardinal() {
            let connected = match direction {
                Direction::North => connections.north,
                Direction::South => connections.south,
                Direction::East => connections.east,
                _ => connections.west,
            };
            // Keep at least one way out of the maze.
            if connected && connections.count() > 1 && rng.gen_bool(CONNECTION_DROP_CHANCE) {
                match direction {
                    Direction::North => connections.north = false,
                    Direction::South => connections.south = false,
                    Direction::East => connections.east = false,
                    _ => connections.west = false,
                }
                dropped.push(direction);
            }
        }

        let mut zone = base::floor_shell(req.key);
        base::place_border_and_exits(&mut zone, connections);

        for direction in dropped {
            let gate = base::exit_position(&zone.grid, direction) + direction.opposite().to_delta();
            if zone
                .grid
                .get(gate)
                .map(Tile::is_plain_floor)
                .unwrap_or(false)
            {
                zone.grid.set(gate, Tile::Shrub)?;
            }
        }

        // Counterpart port at the arrival tile: the way back up.
        let arrival = req
            .port_transition
            .and_then(|t| t.arrival_position())
            .filter(|pos| zone.grid.in_bounds(*pos) && !zone.grid.is_corner(*pos))
            .unwrap_or_else(|| zone.grid.center());
        zone.grid.set(
            arrival,
            Tile::Port {
                kind: PortKind::StairUp,
            },
        )?;
        zone.spawn = arrival;

        if matches!(
            req.port_transition.map(|t| t.from),
            Some(PortEntry::Hole) | Some(PortEntry::Pitfall)
        ) {
            zone.return_to_surface = Some(arrival);
        }

        // Occasional extra way down, never on the arrival tile.
        if rng.gen_bool(EXTRA_STAIRDOWN_CHANCE) {
            let mut exclude = HashSet::new();
            exclude.insert(arrival);
            if let Some(pos) = zone.grid.random_plain_floor(rng, &exclude) {
                zone.grid.set(
                    pos,
                    Tile::Port {
                        kind: PortKind::StairDown,
                    },
                )?;
                debug!("extra stairdown at {} in {}", pos, zone.key);
            }
        }

        base::scatter_terrain_features(&mut zone, ctx.world_seed.wrapping_add(1), rng);
        base::place_items(&mut zone, ctx, rng);
        base::populate_enemies(&mut zone, req, ctx, rng);
        base::spawn_gossip_npc(&mut zone, ctx, rng);
        Ok(zone)
    }

    fn handler_type(&self) -> &'static str {
        "underground"
    }
}

/// Home and shack interiors are authored boards; the procedural room is
/// a deprecated fallback kept only for missing assets.
pub struct InteriorHandler;

impl ZoneHandler for InteriorHandler {
    fn generate(
        &self,
        req: &ZoneRequest,
        ctx: &GenerationContext,
        rng: &mut StdRng,
    ) -> WarrenResult<Zone> {
        let board_name = if req.key.zone_x == 0 && req.key.zone_y == 0 {
            "home"
        } else {
            "shack"
        };

        if let Some(assets_dir) = ctx.registry.assets_dir() {
            if let Some(board) = fetch_board(assets_dir, "interior", board_name) {
                let board_ctx = BoardContext {
                    dimension: Dimension::Interior,
                    level: req.key.zone_level(),
                    home_zone: false,
                };
                let loaded = convert_board_to_grid(&board, ctx.registry, board_ctx, rng)?;
                return Ok(zone_from_loaded(req, loaded));
            }
        }

        warn!(
            "interior board '{}' unavailable for {}, using deprecated procedural fallback",
            board_name, req.key
        );
        Ok(procedural_interior(req))
    }

    fn handler_type(&self) -> &'static str {
        "interior"
    }
}

/// Deprecated: a bare walled room with a door back out.
fn procedural_interior(req: &ZoneRequest) -> Zone {
    let mut zone = base::floor_shell(req.key);
    base::place_border_and_exits(&mut zone, Default::default());
    let height = zone.grid.height() as i32;
    let door = Position::new(zone.grid.width() as i32 / 2, height - 1);
    let _ = zone.grid.set(
        door,
        Tile::Port {
            kind: PortKind::InteriorDoor,
        },
    );
    zone.spawn = zone.grid.center();
    zone
}

/// Chess arenas: authored boards when available, otherwise two facing
/// ranks laid out from the registry's chess set.
pub struct ChessHandler;

impl ZoneHandler for ChessHandler {
    fn generate(
        &self,
        req: &ZoneRequest,
        ctx: &GenerationContext,
        rng: &mut StdRng,
    ) -> WarrenResult<Zone> {
        if let Some(assets_dir) = ctx.registry.assets_dir() {
            if let Some(board) = fetch_board(assets_dir, "chess", "arena") {
                let board_ctx = BoardContext {
                    dimension: Dimension::Chess,
                    level: req.key.zone_level(),
                    home_zone: false,
                };
                let loaded = convert_board_to_grid(&board, ctx.registry, board_ctx, rng)?;
                return Ok(zone_from_loaded(req, loaded));
            }
        }

        let mut zone = base::floor_shell(req.key);
        base::place_border_and_exits(&mut zone, req.connections);
        place_chess_ranks(&mut zone, ctx);
        zone.spawn = zone.grid.center();
        base::settle_spawn(&mut zone, rng);
        Ok(zone)
    }

    fn handler_type(&self) -> &'static str {
        "chess"
    }
}

/// Standard back-rank order, mirrored for both teams.
const BACK_RANK: [&str; 8] = [
    "chess_rook",
    "chess_knight",
    "chess_bishop",
    "chess_queen",
    "chess_king",
    "chess_bishop",
    "chess_knight",
    "chess_rook",
];

fn place_chess_ranks(zone: &mut Zone, ctx: &GenerationContext) {
    let width = zone.grid.width() as i32;
    let height = zone.grid.height() as i32;
    let start_x = (width - 8) / 2;

    let mut place = |enemy_type: &str, pos: Position, team: Team| {
        let health = ctx
            .registry
            .enemy_def(enemy_type)
            .map(|def| def.base_health)
            .unwrap_or(1);
        zone.enemies
            .push(Enemy::new(enemy_type, pos, health).with_team(team));
    };

    for (offset, piece) in BACK_RANK.iter().enumerate() {
        let x = start_x + offset as i32;
        place(piece, Position::new(x, 1), Team::Black);
        place("chess_pawn", Position::new(x, 2), Team::Black);
        place("chess_pawn", Position::new(x, height - 3), Team::White);
        place(piece, Position::new(x, height - 2), Team::White);
    }
}
