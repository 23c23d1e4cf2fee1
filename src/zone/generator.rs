//! # Zone Generation Pipeline
//!
//! Given zone coordinates, dimension, and depth, produce a fully
//! populated grid, enemy list, and spawn point, procedurally or from an
//! authored board. Dimension handlers are polymorphic strategies over a
//! common `generate()` contract; the composable steps they share live in
//! [`base`].

use crate::config::{
    BASE_ENEMY_SPAWN_CHANCE, MAX_ENEMIES_PER_ZONE, PITFALL_SPAWN_MULTIPLIER,
    SPAWN_CHANCE_PER_LEVEL, SPAWN_RAMP_STEP,
};
use crate::{
    ContentRegistry, Dimension, PortEntry, PortTransition, WarrenError, WarrenResult, Zone,
    ZoneConnections, ZoneKey,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;

/// Everything a handler may consult while generating. Read-only.
pub struct GenerationContext<'a> {
    pub registry: &'a ContentRegistry,
    pub world_seed: u64,
    /// Total zones visited so far; drives the slow difficulty ramp
    pub zones_visited: u32,
}

/// One generation request.
#[derive(Debug, Clone)]
pub struct ZoneRequest {
    pub key: ZoneKey,
    pub connections: ZoneConnections,
    /// How the player arrived, when the entry came through a port
    pub port_transition: Option<PortTransition>,
}

impl ZoneRequest {
    pub fn new(key: ZoneKey, connections: ZoneConnections) -> Self {
        Self {
            key,
            connections,
            port_transition: None,
        }
    }

    pub fn with_port_transition(mut self, transition: PortTransition) -> Self {
        self.port_transition = Some(transition);
        self
    }

    /// Whether this zone is being entered through a pitfall.
    pub fn via_pitfall(&self) -> bool {
        matches!(
            self.port_transition,
            Some(PortTransition {
                from: PortEntry::Pitfall,
                ..
            })
        )
    }
}

/// Per-dimension generation strategy.
pub trait ZoneHandler: Send + Sync {
    /// Generates a fully populated zone.
    fn generate(
        &self,
        req: &ZoneRequest,
        ctx: &GenerationContext,
        rng: &mut StdRng,
    ) -> WarrenResult<Zone>;

    /// Handler name for logging and diagnostics.
    fn handler_type(&self) -> &'static str;
}

/// Explicit handler table keyed by dimension.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<Dimension, Box<dyn ZoneHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard four-dimension handler set.
    pub fn standard() -> Self {
        use crate::handlers::{ChessHandler, InteriorHandler, SurfaceHandler, UndergroundHandler};
        let mut registry = Self::new();
        registry.register(Dimension::Surface, Box::new(SurfaceHandler));
        registry.register(Dimension::Interior, Box::new(InteriorHandler));
        registry.register(Dimension::Underground, Box::new(UndergroundHandler));
        registry.register(Dimension::Chess, Box::new(ChessHandler));
        registry
    }

    pub fn register(&mut self, dimension: Dimension, handler: Box<dyn ZoneHandler>) {
        self.handlers.insert(dimension, handler);
    }

    pub fn get(&self, dimension: Dimension) -> Option<&dyn ZoneHandler> {
        self.handlers.get(&dimension).map(|h| h.as_ref())
    }
}

/// Front door for zone generation: picks the handler, derives the
/// per-zone seed, and applies the shared post-passes.
pub struct ZoneGenerator {
    handlers: HandlerRegistry,
}

impl ZoneGenerator {
    pub fn new(handlers: HandlerRegistry) -> Self {
        Self { handlers }
    }

    pub fn standard() -> Self {
        Self::new(HandlerRegistry::standard())
    }

    /// Generates the requested zone. Exit accessibility is repaired after
    /// the handler runs so every strategy gets the same guarantee.
    pub fn generate(&self, req: &ZoneRequest, ctx: &GenerationContext) -> WarrenResult<Zone> {
        let handler = self.handlers.get(req.key.dimension).ok_or_else(|| {
            WarrenError::GenerationFailed(format!(
                "no handler registered for {:?}",
                req.key.dimension
            ))
        })?;

        let mut rng = StdRng::seed_from_u64(zone_seed(ctx.world_seed, &req.key));
        let mut zone = handler.generate(req, ctx, &mut rng)?;
        base::repair_exit_access(&mut zone);
        base::validate_zone(&zone)?;
        Ok(zone)
    }
}

/// Deterministic per-zone seed derived from the world seed and the key.
pub fn zone_seed(world_seed: u64, key: &ZoneKey) -> u64 {
    let dim = match key.dimension {
        Dimension::Surface => 1u64,
        Dimension::Interior => 2,
        Dimension::Underground => 3,
        Dimension::Chess => 4,
    };
    world_seed
        .wrapping_add((key.zone_x as i64 as u64).wrapping_mul(73_856_093))
        .wrapping_add((key.zone_y as i64 as u64).wrapping_mul(19_349_663))
        .wrapping_add((key.depth as i64 as u64).wrapping_mul(83_492_791))
        .wrapping_add(dim.wrapping_mul(1_000_003))
}

/// Composable generation steps shared by every handler.
pub mod base {
    use super::*;
    use crate::{Enemy, Grid, Position, Tile};
    use log::{debug, warn};
    use noise::{NoiseFn, Perlin};
    use pathfinding::prelude::bfs;
    use rand::Rng;
    use std::collections::HashSet;

    /// Fills the border with walls and opens an exit at the midpoint of
    /// every connected edge.
    pub fn place_border_and_exits(zone: &mut Zone, connections: ZoneConnections) {
        let width = zone.grid.width() as i32;
        let height = zone.grid.height() as i32;

        for pos in zone.grid.positions().collect::<Vec<_>>() {
            if pos.x == 0 || pos.y == 0 || pos.x == width - 1 || pos.y == height - 1 {
                let _ = zone.grid.set(pos, Tile::Wall);
            }
        }

        let mid_x = width / 2;
        let mid_y = height / 2;
        let mut open = |pos: Position, grid: &mut Grid| {
            let _ = grid.set(pos, Tile::Exit);
        };
        if connections.north {
            open(Position::new(mid_x, 0), &mut zone.grid);
        }
        if connections.south {
            open(Position::new(mid_x, height - 1), &mut zone.grid);
        }
        if connections.west {
            open(Position::new(0, mid_y), &mut zone.grid);
        }
        if connections.east {
            open(Position::new(width - 1, mid_y), &mut zone.grid);
        }
        zone.connections = connections;
    }

    /// The border tile an exit occupies for a given edge.
    pub fn exit_position(grid: &Grid, direction: crate::Direction) -> Position {
        let width = grid.width() as i32;
        let height = grid.height() as i32;
        match direction {
            crate::Direction::North => Position::new(width / 2, 0),
            crate::Direction::South => Position::new(width / 2, height - 1),
            crate::Direction::West => Position::new(0, height / 2),
            _ => Position::new(width - 1, height / 2),
        }
    }

    /// Enemy spawn probability for a zone.
    ///
    /// Base rate per zone level, plus a small ramp every 10 zones
    /// visited, then multiplied for pitfall-sourced entries.
    pub fn enemy_spawn_chance(level: u32, zones_visited: u32, via_pitfall: bool) -> f64 {
        let ramp = (zones_visited / 10) as f64 * SPAWN_RAMP_STEP;
        let mut chance = BASE_ENEMY_SPAWN_CHANCE + level as f64 * SPAWN_CHANCE_PER_LEVEL + ramp;
        if via_pitfall {
            chance *= PITFALL_SPAWN_MULTIPLIER;
        }
        chance.min(0.9)
    }

    /// Populates the zone's enemy list from the registry's eligible set.
    pub fn populate_enemies(
        zone: &mut Zone,
        req: &ZoneRequest,
        ctx: &GenerationContext,
        rng: &mut StdRng,
    ) {
        let level = req.key.zone_level();
        if req.key.is_home() {
            return; // reduced hazards: the home zone never spawns enemies
        }

        let candidates = ctx.registry.eligible_enemies(req.key.dimension, level);
        if candidates.is_empty() {
            return;
        }

        let chance = enemy_spawn_chance(level, ctx.zones_visited, req.via_pitfall());
        let mut occupied: HashSet<Position> = zone.enemies.positions_set();
        occupied.insert(zone.spawn);

        for _ in 0..MAX_ENEMIES_PER_ZONE {
            if !rng.gen_bool(chance) {
                continue;
            }
            let def = candidates[rng.gen_range(0..candidates.len())];
            if let Some(pos) = zone.grid.random_plain_floor(rng, &occupied) {
                occupied.insert(pos);
                zone.enemies
                    .push(Enemy::new(def.enemy_type.clone(), pos, def.base_health));
            }
        }
    }

    /// Scatters shrubs and pools over plain floor using Perlin noise so
    /// features clump organically. The home zone gets none.
    pub fn scatter_terrain_features(zone: &mut Zone, seed: u64, rng: &mut StdRng) {
        if zone.key.is_home() {
            return;
        }
        let perlin = Perlin::new(seed as u32);
        let width = zone.grid.width() as i32;
        let height = zone.grid.height() as i32;

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let pos = Position::new(x, y);
                let is_candidate = zone
                    .grid
                    .get(pos)
                    .map(Tile::is_feature_candidate)
                    .unwrap_or(false);
                if !is_candidate {
                    continue;
                }
                let sample = perlin.get([x as f64 / 5.0, y as f64 / 5.0]);
                if sample > 0.45 && rng.gen_bool(0.7) {
                    let _ = zone.grid.set(pos, Tile::Shrub);
                } else if sample < -0.55 && rng.gen_bool(0.5) {
                    let _ = zone.grid.set(pos, Tile::Water);
                }
            }
        }
    }

    /// Occasionally drops a solid structure block into the interior.
    pub fn place_structures(zone: &mut Zone, rng: &mut StdRng) {
        if zone.key.is_home() || !rng.gen_bool(0.25) {
            return;
        }
        let width = zone.grid.width() as i32;
        let height = zone.grid.height() as i32;
        let w = rng.gen_range(2..=3);
        let h = rng.gen_range(2..=3);
        if width <= w + 4 || height <= h + 4 {
            return;
        }
        let x = rng.gen_range(2..width - w - 2);
        let y = rng.gen_range(2..height - h - 2);

        for pos in Position::new(x, y).rectangle(Position::new(x + w - 1, y + h - 1)) {
            if zone
                .grid
                .get(pos)
                .map(Tile::is_plain_floor)
                .unwrap_or(false)
            {
                let _ = zone.grid.set(pos, Tile::Structure);
            }
        }
    }

    /// Places a handful of items from the registry pools.
    pub fn place_items(zone: &mut Zone, ctx: &GenerationContext, rng: &mut StdRng) {
        if zone.key.is_home() {
            return;
        }
        let mut exclude = HashSet::new();
        exclude.insert(zone.spawn);

        if rng.gen_bool(0.3) {
            if let (Some(def), Some(pos)) = (
                ctx.registry.random_item(rng).cloned(),
                zone.grid.random_plain_floor(rng, &exclude),
            ) {
                exclude.insert(pos);
                let _ = zone.grid.set(
                    pos,
                    Tile::Item {
                        token: def.token,
                        uses: def.uses,
                    },
                );
            }
        }
        if rng.gen_bool(0.15) {
            let def = ctx.registry.food_or_water(rng);
            if let Some(pos) = zone.grid.random_plain_floor(rng, &exclude) {
                let _ = zone.grid.set(
                    pos,
                    Tile::Item {
                        token: def.token,
                        uses: def.uses,
                    },
                );
            }
        }
    }

    /// Rolls each eligible gossip NPC against its own spawn weight and
    /// places at most one on a random plain floor tile.
    pub fn spawn_gossip_npc(zone: &mut Zone, ctx: &GenerationContext, rng: &mut StdRng) {
        let level = zone.key.zone_level();
        let eligible = ctx.registry.gossip_npcs(zone.key.dimension, level);
        let mut exclude = HashSet::new();
        exclude.insert(zone.spawn);

        for npc in eligible {
            if !rng.gen_bool(npc.spawn_weight) {
                continue;
            }
            if let Some(pos) = zone.grid.random_plain_floor(rng, &exclude) {
                let _ = zone.grid.set(pos, Tile::Npc { id: npc.id.clone() });
                debug!("gossip NPC {} placed in {}", npc.id, zone.key);
            }
            break; // at most one gossip NPC per zone
        }
    }

    /// Ensures every exit can reach the zone interior. Unreachable exits
    /// get obstacles cleared along a straight approach toward the center.
    pub fn repair_exit_access(zone: &mut Zone) {
        let center = zone.grid.center();
        let exits = zone.grid.exit_positions();

        for exit in exits {
            let reachable = bfs(
                &exit,
                |pos| {
                    pos.cardinal_adjacent_positions()
                        .into_iter()
                        .filter(|next| {
                            zone.grid
                                .get(*next)
                                .map(Tile::is_walkable)
                                .unwrap_or(false)
                        })
                        .collect::<Vec<_>>()
                },
                |pos| *pos == center,
            )
            .is_some();
            if reachable {
                continue;
            }

            debug!("exit {} blocked in {}, clearing approach", exit, zone.key);
            let width = zone.grid.width() as i32;
            let height = zone.grid.height() as i32;
            for pos in exit.line_to(center).into_iter().skip(1) {
                // Never breach the zone border itself.
                if pos.x == 0 || pos.y == 0 || pos.x == width - 1 || pos.y == height - 1 {
                    continue;
                }
                let blocked = zone
                    .grid
                    .get(pos)
                    .map(|t| !t.is_walkable())
                    .unwrap_or(false);
                if blocked {
                    let _ = zone.grid.set(pos, Tile::Floor);
                }
            }
        }
    }

    /// Minimal sanity pass over a generated zone.
    pub fn validate_zone(zone: &Zone) -> WarrenResult<()> {
        let has_floor = zone
            .grid
            .positions()
            .any(|pos| zone.grid.get(pos).map(Tile::is_walkable).unwrap_or(false));
        if !has_floor {
            return Err(WarrenError::GenerationFailed(format!(
                "zone {} has no walkable tiles",
                zone.key
            )));
        }
        if !zone.grid.in_bounds(zone.spawn) {
            return Err(WarrenError::GenerationFailed(format!(
                "zone {} spawn {} out of bounds",
                zone.key, zone.spawn
            )));
        }
        Ok(())
    }

    /// Moves the spawn to a nearby walkable tile when generation left it
    /// on something solid.
    pub fn settle_spawn(zone: &mut Zone, rng: &mut StdRng) {
        let walkable = zone
            .grid
            .get(zone.spawn)
            .map(Tile::is_walkable)
            .unwrap_or(false);
        if walkable {
            return;
        }
        if let Some(pos) = zone.grid.random_plain_floor(rng, &HashSet::new()) {
            zone.spawn = pos;
        } else {
            warn!("zone {} has no plain floor for spawn", zone.key);
            zone.spawn = zone.grid.center();
        }
    }

    /// Standard empty shell every procedural handler starts from.
    pub fn floor_shell(key: ZoneKey) -> Zone {
        Zone::new(key, Grid::square(Tile::Floor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Position, Tile};

    fn ctx(registry: &ContentRegistry) -> GenerationContext<'_> {
        GenerationContext {
            registry,
            world_seed: 1234,
            zones_visited: 0,
        }
    }

    #[test]
    fn test_zone_seed_is_deterministic_and_key_sensitive() {
        let a = zone_seed(42, &ZoneKey::surface(3, 4));
        let b = zone_seed(42, &ZoneKey::surface(3, 4));
        let c = zone_seed(42, &ZoneKey::surface(4, 3));
        let d = zone_seed(42, &ZoneKey::underground(3, 4, 1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_spawn_chance_ramp_and_pitfall_multiplier() {
        let base = base::enemy_spawn_chance(0, 0, false);
        assert!((base - BASE_ENEMY_SPAWN_CHANCE).abs() < f64::EPSILON);

        // +0.01 for every 10 zones visited, independent of level
        let ramped = base::enemy_spawn_chance(0, 30, false);
        assert!((ramped - (base + 3.0 * SPAWN_RAMP_STEP)).abs() < 1e-9);

        // Ten more visits within the same bucket change nothing
        assert_eq!(
            base::enemy_spawn_chance(0, 30, false),
            base::enemy_spawn_chance(0, 39, false)
        );

        // Pitfall entries multiply the final rate
        let pitfall = base::enemy_spawn_chance(2, 0, true);
        let normal = base::enemy_spawn_chance(2, 0, false);
        assert!((pitfall - normal * PITFALL_SPAWN_MULTIPLIER).abs() < 1e-9);
    }

    #[test]
    fn test_border_and_exits_follow_connections() {
        let mut zone = base::floor_shell(ZoneKey::surface(1, 0));
        let connections = ZoneConnections {
            north: true,
            south: false,
            east: true,
            west: false,
        };
        base::place_border_and_exits(&mut zone, connections);

        let width = zone.grid.width() as i32;
        let height = zone.grid.height() as i32;
        assert_eq!(
            zone.grid.get(Position::new(width / 2, 0)),
            Some(&Tile::Exit)
        );
        assert_eq!(
            zone.grid.get(Position::new(width - 1, height / 2)),
            Some(&Tile::Exit)
        );
        // Unconnected edges stay walled
        assert_eq!(
            zone.grid.get(Position::new(width / 2, height - 1)),
            Some(&Tile::Wall)
        );
        assert_eq!(
            zone.grid.get(Position::new(0, height / 2)),
            Some(&Tile::Wall)
        );
    }

    #[test]
    fn test_repair_clears_a_blocked_exit_approach() {
        let mut zone = base::floor_shell(ZoneKey::surface(2, 0));
        base::place_border_and_exits(&mut zone, ZoneConnections::all());

        // Wall off the north exit completely.
        let width = zone.grid.width() as i32;
        let exit = Position::new(width / 2, 0);
        for neighbor in exit.cardinal_adjacent_positions() {
            if zone.grid.in_bounds(neighbor) && neighbor.y > 0 {
                zone.grid.set(neighbor, Tile::Structure).unwrap();
            }
        }

        base::repair_exit_access(&mut zone);

        // The straight approach toward center is now open.
        let below = Position::new(width / 2, 1);
        assert!(zone.grid.get(below).unwrap().is_walkable());
    }

    #[test]
    fn test_home_zone_never_spawns_enemies_or_features() {
        let registry = ContentRegistry::builtin();
        let ctx = ctx(&registry);
        let mut rng = StdRng::seed_from_u64(5);

        let mut zone = base::floor_shell(ZoneKey::home());
        base::place_border_and_exits(&mut zone, ZoneConnections::all());
        let req = ZoneRequest::new(ZoneKey::home(), ZoneConnections::all());

        base::populate_enemies(&mut zone, &req, &ctx, &mut rng);
        base::scatter_terrain_features(&mut zone, 99, &mut rng);
        assert!(zone.enemies.is_empty());
        let shrubs = zone
            .grid
            .positions()
            .filter(|p| zone.grid.get(*p) == Some(&Tile::Shrub))
            .count();
        assert_eq!(shrubs, 0);
    }

    #[test]
    fn test_gossip_spawns_at_most_one() {
        let registry = ContentRegistry::builtin();
        let ctx = ctx(&registry);

        // Across many seeds, no zone ever has more than one gossip NPC.
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut zone = base::floor_shell(ZoneKey::surface(1, 1));
            base::place_border_and_exits(&mut zone, ZoneConnections::all());
            base::spawn_gossip_npc(&mut zone, &ctx, &mut rng);

            let npcs = zone
                .grid
                .positions()
                .filter(|p| matches!(zone.grid.get(*p), Some(Tile::Npc { .. })))
                .count();
            assert!(npcs <= 1, "seed {} produced {} gossip NPCs", seed, npcs);
        }
    }

    #[test]
    fn test_generator_rejects_unregistered_dimension() {
        let registry = ContentRegistry::builtin();
        let generator = ZoneGenerator::new(HandlerRegistry::new());
        let req = ZoneRequest::new(ZoneKey::surface(0, 1), ZoneConnections::all());
        let result = generator.generate(&req, &ctx(&registry));
        assert!(matches!(result, Err(WarrenError::GenerationFailed(_))));
    }

    #[test]
    fn test_generation_is_reproducible_for_a_key() {
        let registry = ContentRegistry::builtin();
        let generator = ZoneGenerator::standard();
        let req = ZoneRequest::new(ZoneKey::surface(2, -1), ZoneConnections::all());

        let a = generator.generate(&req, &ctx(&registry)).unwrap();
        let b = generator.generate(&req, &ctx(&registry)).unwrap();
        assert_eq!(a.grid, b.grid);
        assert_eq!(a.enemies.len(), b.enemies.len());
        assert_eq!(a.spawn, b.spawn);
    }

    #[test]
    fn test_settle_spawn_moves_off_solid_tiles() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut zone = base::floor_shell(ZoneKey::surface(1, 0));
        let spawn = zone.spawn;
        zone.grid.set(spawn, Tile::Structure).unwrap();

        base::settle_spawn(&mut zone, &mut rng);
        assert_ne!(zone.spawn, spawn);
        assert!(zone.grid.get(zone.spawn).unwrap().is_walkable());
    }
}
