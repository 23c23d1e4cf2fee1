//! # Warren Main Entry Point
//!
//! Headless engine harness: generates zones, drives the turn manager
//! with a scripted wanderer, and exercises persistence. Rendering and
//! input are external collaborators and live elsewhere.

use clap::Parser;
use log::{info, warn, LevelFilter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use warren::{
    ContentRegistry, Dimension, ErrorReporter, GameStateManager, GameStatistics, GenerationContext,
    MessageImportance, MessageLog, Player, PortEntry, PortKind, PortTransition, Position, SaveGame,
    SavedState, Scheduler, SimpleCombat, Tile, TransientState, TurnManager, TurnTiming,
    WarrenResult, Zone, ZoneConnections, ZoneGenerationStats, ZoneGenerator, ZoneKey,
    ZoneRepository, ZoneRequest,
};

/// Command line arguments for the Warren engine harness.
#[derive(Parser, Debug)]
#[command(name = "warren")]
#[command(about = "A turn-based grid roguelike engine")]
#[command(version)]
struct Args {
    /// Random seed for zone generation
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of player turns to simulate
    #[arg(long, default_value_t = 40)]
    turns: u32,

    /// Assets directory holding boards and content definitions
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Save file written when the simulation ends
    #[arg(long)]
    save: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> WarrenResult<()> {
    let args = Args::parse();
    initialize_logging(&args.log_level);

    info!("Starting Warren v{}", warren::VERSION);
    run_simulation(&args).await
}

/// Initializes the logging system based on the specified log level.
fn initialize_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Drives the engine for the requested number of turns.
async fn run_simulation(args: &Args) -> WarrenResult<()> {
    let seed = args.seed.unwrap_or(12345);
    info!("world seed: {}", seed);

    let registry = match &args.assets {
        Some(dir) => ContentRegistry::load_or_builtin(dir),
        None => ContentRegistry::builtin(),
    };
    let generator = ZoneGenerator::standard();
    let mut repository = ZoneRepository::new();
    let mut transient = TransientState::new();
    let mut turn_manager = TurnManager::new(TurnTiming::default());
    let mut combat = SimpleCombat::default();
    let scheduler = Scheduler::new();
    let mut reporter = ErrorReporter::default();
    let mut message_log = MessageLog::new();
    let mut stats = GameStatistics::new();
    let mut walk_rng = StdRng::seed_from_u64(seed.wrapping_add(1));

    let mut current_key = ZoneKey::home();
    enter_zone(
        current_key,
        None,
        &generator,
        &registry,
        seed,
        &mut repository,
        &mut transient,
        &mut turn_manager,
    )?;
    let spawn = repository
        .get(&current_key)
        .map(|zone| zone.spawn)
        .unwrap_or_else(Position::origin);
    let mut player = Player::new(spawn);

    message_log.push("You arrive at the warren.", MessageImportance::Notice);

    for turn in 0..args.turns {
        if player.is_dead() {
            message_log.push("You have fallen.", MessageImportance::Critical);
            break;
        }

        let transition = match repository.get(&current_key) {
            Some(zone) => wander(zone, &mut player, &mut walk_rng),
            None => {
                warn!("current zone {} missing, stopping", current_key);
                break;
            }
        };

        if let Some((next_key, port_transition)) = transition {
            info!("turn {}: transition {} -> {}", turn, current_key, next_key);
            current_key = next_key;
            enter_zone(
                current_key,
                port_transition,
                &generator,
                &registry,
                seed,
                &mut repository,
                &mut transient,
                &mut turn_manager,
            )?;
            if let Some(zone) = repository.get(&current_key) {
                player.position = zone.spawn;
            }
            stats.zones_discovered += 1;
            continue;
        }

        let Some(zone) = repository.get_mut(&current_key) else {
            warn!("current zone {} missing, stopping", current_key);
            break;
        };
        let before = zone.enemies.len();
        match turn_manager
            .handle_turn_completion(zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
        {
            Ok(_) => {
                stats.turns_survived += 1;
                let swept = before.saturating_sub(zone.enemies.len());
                stats.enemies_defeated += swept as u32;
            }
            Err(e) => {
                let notice = reporter.capture(&e);
                let importance = if notice.insistent {
                    MessageImportance::Critical
                } else {
                    MessageImportance::Notice
                };
                message_log.push(notice.message, importance);
            }
        }
    }

    info!(
        "simulation ended: {} turns survived, {} zones visited, player health {}",
        stats.turns_survived, repository.zones_visited, player.health
    );

    if let Some(path) = &args.save {
        save_world(path, &player, &stats, &repository, current_key, &message_log)?;
        info!("saved to {}", path.display());
    }

    Ok(())
}

/// Generates or restores a zone, then resets per-zone turn state.
#[allow(clippy::too_many_arguments)]
fn enter_zone(
    key: ZoneKey,
    port_transition: Option<PortTransition>,
    generator: &ZoneGenerator,
    registry: &ContentRegistry,
    world_seed: u64,
    repository: &mut ZoneRepository,
    transient: &mut TransientState,
    turn_manager: &mut TurnManager,
) -> WarrenResult<()> {
    if !repository.contains(&key) {
        let ctx = GenerationContext {
            registry,
            world_seed,
            zones_visited: repository.zones_visited,
        };
        let mut req = ZoneRequest::new(key, ZoneConnections::all());
        if let Some(transition) = port_transition {
            req = req.with_port_transition(transition);
            if transition.from == PortEntry::Pitfall {
                transient.enter_pitfall_zone(key);
            }
        }
        let zone = generator.generate(&req, &ctx)?;
        if let Some(return_pos) = zone.return_to_surface {
            transient.record_return_to_surface(key, return_pos);
        }
        repository.insert(zone);
    }
    if let Some(zone) = repository.get_mut(&key) {
        zone.discovered = true;
    }
    transient.on_zone_entered(key);
    turn_manager.reset_for_zone();
    Ok(())
}

/// Takes one random walkable step. Returns the transition to perform
/// when the step landed on an exit or a port.
fn wander(
    zone: &Zone,
    player: &mut Player,
    rng: &mut StdRng,
) -> Option<(ZoneKey, Option<PortTransition>)> {
    let options: Vec<_> = player
        .position
        .cardinal_adjacent_positions()
        .into_iter()
        .filter(|pos| {
            zone.grid
                .get(*pos)
                .map(|tile| tile.is_walkable())
                .unwrap_or(false)
        })
        .collect();
    if options.is_empty() {
        return None;
    }
    player.position = options[rng.gen_range(0..options.len())];

    match zone.grid.get(player.position) {
        Some(Tile::Exit) => Some((neighbor_key(zone, player.position), None)),
        Some(Tile::Port { kind }) => port_destination(zone, *kind, player.position),
        _ => None,
    }
}

/// The neighboring zone an edge exit leads to.
fn neighbor_key(zone: &Zone, exit: Position) -> ZoneKey {
    let key = zone.key;
    let height = zone.grid.height() as i32;
    let (dx, dy) = if exit.y == 0 {
        (0, -1)
    } else if exit.y == height - 1 {
        (0, 1)
    } else if exit.x == 0 {
        (-1, 0)
    } else {
        (1, 0)
    };
    ZoneKey::new(key.zone_x + dx, key.zone_y + dy, key.dimension, key.depth)
}

/// Where a port leads, with the transition context generation needs.
fn port_destination(
    zone: &Zone,
    kind: PortKind,
    pos: Position,
) -> Option<(ZoneKey, Option<PortTransition>)> {
    let key = zone.key;
    match kind {
        PortKind::StairDown | PortKind::Hole | PortKind::Cistern => {
            let entry = if kind == PortKind::StairDown {
                PortEntry::Stairway
            } else {
                PortEntry::Hole
            };
            let below = ZoneKey::new(key.zone_x, key.zone_y, Dimension::Underground, key.depth + 1);
            Some((
                below,
                Some(PortTransition::new(entry, Some(pos.x), Some(pos.y))),
            ))
        }
        PortKind::StairUp => {
            if key.dimension == Dimension::Underground {
                let above = if key.depth <= 1 {
                    ZoneKey::surface(key.zone_x, key.zone_y)
                } else {
                    ZoneKey::new(key.zone_x, key.zone_y, Dimension::Underground, key.depth - 1)
                };
                Some((above, None))
            } else {
                None
            }
        }
        PortKind::InteriorDoor => {
            if key.dimension == Dimension::Interior {
                Some((ZoneKey::surface(key.zone_x, key.zone_y), None))
            } else {
                Some((
                    ZoneKey::new(key.zone_x, key.zone_y, Dimension::Interior, 0),
                    Some(PortTransition::new(PortEntry::Door, None, None)),
                ))
            }
        }
    }
}

/// Snapshots the world into the persistence payload.
fn save_world(
    path: &PathBuf,
    player: &Player,
    stats: &GameStatistics,
    repository: &ZoneRepository,
    current_key: ZoneKey,
    message_log: &MessageLog,
) -> WarrenResult<()> {
    let current = repository.get(&current_key);
    let (grid, enemies) = match current {
        Some(zone) => (zone.grid.clone(), zone.enemies.get_all().to_vec()),
        None => {
            warn!("current zone missing at save time");
            return Ok(());
        }
    };

    let state = SavedState {
        player: player.clone(),
        player_stats: stats.clone(),
        zones: repository.to_entries(),
        grid,
        enemies,
        defeated_enemies: stats.enemies_defeated,
        special_zones: repository.discovered_keys(),
        message_log: message_log.clone(),
        current_region: current_key,
        zone_generation: ZoneGenerationStats {
            zones_visited: repository.zones_visited,
        },
    };

    let manager = GameStateManager::new(path);
    manager.save(&SaveGame::new(state))?;
    Ok(())
}
