//! Integration tests for zone generation across dimension handlers.

use pathfinding::prelude::bfs;
use warren::config::PITFALL_SPAWN_MULTIPLIER;
use warren::{
    base, ContentRegistry, Dimension, GenerationContext, Grid, PortEntry, PortKind, PortTransition,
    Position, Tile, Zone, ZoneConnections, ZoneGenerator, ZoneKey, ZoneRepository, ZoneRequest,
};

fn ctx(registry: &ContentRegistry) -> GenerationContext<'_> {
    GenerationContext {
        registry,
        world_seed: 777,
        zones_visited: 0,
    }
}

/// A zone reached via a pitfall places a stairup port at the pitfall's
/// exact coordinates, and its enemy spawn probability is the base rate
/// times the pitfall multiplier.
#[test]
fn test_underground_pitfall_end_to_end() {
    let registry = ContentRegistry::builtin();
    let generator = ZoneGenerator::standard();

    let key = ZoneKey::underground(2, 0, 1);
    let req = ZoneRequest::new(key, ZoneConnections::all())
        .with_port_transition(PortTransition::new(PortEntry::Pitfall, Some(6), Some(9)));
    let zone = generator.generate(&req, &ctx(&registry)).unwrap();

    let arrival = Position::new(6, 9);
    assert_eq!(
        zone.grid.get(arrival).and_then(Tile::port_kind),
        Some(PortKind::StairUp)
    );
    assert_eq!(zone.spawn, arrival);
    assert_eq!(zone.return_to_surface, Some(arrival));

    let level = key.zone_level();
    let normal = base::enemy_spawn_chance(level, 0, false);
    let via_pitfall = base::enemy_spawn_chance(level, 0, true);
    assert!((via_pitfall - normal * PITFALL_SPAWN_MULTIPLIER).abs() < 1e-9);
}

/// Every exit of a generated surface zone can reach the zone center
/// through walkable tiles.
#[test]
fn test_generated_exits_are_reachable() {
    let registry = ContentRegistry::builtin();
    let generator = ZoneGenerator::standard();

    for (x, y) in [(1, 0), (0, 1), (-2, 3), (4, -4), (5, 5)] {
        let req = ZoneRequest::new(ZoneKey::surface(x, y), ZoneConnections::all());
        let zone = generator.generate(&req, &ctx(&registry)).unwrap();
        let center = zone.grid.center();

        for exit in zone.grid.exit_positions() {
            let path = bfs(
                &exit,
                |pos: &Position| {
                    pos.cardinal_adjacent_positions()
                        .into_iter()
                        .filter(|next| {
                            zone.grid
                                .get(*next)
                                .map(|tile| tile.is_walkable())
                                .unwrap_or(false)
                        })
                        .collect::<Vec<_>>()
                },
                |pos| *pos == center,
            );
            assert!(
                path.is_some(),
                "exit {} unreachable in zone ({}, {})",
                exit,
                x,
                y
            );
        }
    }
}

/// The home zone is special: no enemies, no random hazards, and the
/// homestead door leading inside.
#[test]
fn test_home_zone_is_safe() {
    let registry = ContentRegistry::builtin();
    let generator = ZoneGenerator::standard();

    let req = ZoneRequest::new(ZoneKey::home(), ZoneConnections::all());
    let zone = generator.generate(&req, &ctx(&registry)).unwrap();

    assert!(zone.enemies.is_empty());
    let has_door = zone.grid.positions().any(|pos| {
        zone.grid.get(pos).and_then(Tile::port_kind) == Some(PortKind::InteriorDoor)
    });
    assert!(has_door);
}

/// The repository caches zones by composite key: a revisit restores the
/// mutated zone instead of regenerating it.
#[test]
fn test_repository_restores_mutated_zones() {
    let registry = ContentRegistry::builtin();
    let generator = ZoneGenerator::standard();
    let mut repository = ZoneRepository::new();

    let key = ZoneKey::surface(3, 1);
    let req = ZoneRequest::new(key, ZoneConnections::all());
    let zone = generator.generate(&req, &ctx(&registry)).unwrap();
    repository.insert(zone);

    // Mutate: break a shrub somewhere.
    let edit = Position::new(3, 3);
    repository
        .get_mut(&key)
        .unwrap()
        .grid
        .set(edit, Tile::Floor)
        .unwrap();

    let restored = repository.get(&key).unwrap();
    assert_eq!(restored.grid.get(edit), Some(&Tile::Floor));
    assert_eq!(repository.zones_visited, 1);
}

/// Distinct dimensions at the same coordinates are distinct zones.
#[test]
fn test_dimension_distinguishes_zone_keys() {
    let mut repository = ZoneRepository::new();
    repository.insert(Zone::new(
        ZoneKey::surface(1, 1),
        Grid::square(Tile::Floor),
    ));
    repository.insert(Zone::new(
        ZoneKey::new(1, 1, Dimension::Underground, 1),
        Grid::square(Tile::Wall),
    ));

    assert_eq!(repository.len(), 2);
    assert!(repository.get(&ZoneKey::surface(1, 1)).is_some());
    assert!(repository
        .get(&ZoneKey::new(1, 1, Dimension::Chess, 0))
        .is_none());
}
