//! # Turn Manager
//!
//! The turn-resolution state machine: `PlayerTurn` (input accepted) to
//! `EnemyPhase` (input locked, queue draining) and back. Exactly one
//! enemy phase may be in flight; the `is_player_turn` flag plus
//! cancellation of pending input timers is the mutual-exclusion
//! mechanism, and the flag is always flipped before any other mutation.
//!
//! The enemy queue drains through an explicit loop paced by the
//! animation scheduler. Stale queue entries (enemies dead or removed
//! since phase start) are silently skipped; the phase always terminates
//! and every path through it re-enables input as its very last action.

pub mod chess;
pub mod combat;

pub use chess::*;
pub use combat::*;

use crate::{
    Dimension, Player, Position, Scheduler, SequenceHandle, Team, TransientState, WarrenResult,
    Zone,
};
use log::{debug, warn};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use uuid::Uuid;

/// Pacing for the enemy phase.
#[derive(Debug, Clone)]
pub struct TurnTiming {
    /// Wait after an enemy that actually acted
    pub enemy_step: Duration,
    /// Shorter wait after a frozen enemy (it did nothing)
    pub frozen_step: Duration,
    /// Pause before input returns
    pub turn_end_pause: Duration,
    /// Longer dramatic pause when the player was attacked
    pub player_hit_pause: Duration,
}

impl Default for TurnTiming {
    fn default() -> Self {
        Self {
            enemy_step: Duration::from_millis(180),
            frozen_step: Duration::from_millis(60),
            turn_end_pause: Duration::from_millis(250),
            player_hit_pause: Duration::from_millis(600),
        }
    }
}

impl TurnTiming {
    /// Near-zero pacing for tests.
    pub fn for_testing() -> Self {
        Self {
            enemy_step: Duration::from_millis(1),
            frozen_step: Duration::from_millis(1),
            turn_end_pause: Duration::from_millis(1),
            player_hit_pause: Duration::from_millis(2),
        }
    }
}

/// Combat and interaction resolution consulted during the queue drain.
/// Failures must not escape the phase; the turn manager logs and skips.
pub trait CombatResolver {
    /// Resolves one enemy's movement or attack for this phase. Blocking
    /// is judged against the tile baseline captured at phase start.
    fn handle_single_enemy_movement(
        &mut self,
        zone: &mut Zone,
        player: &Player,
        enemy_id: Uuid,
        occupied_baseline: &HashSet<Position>,
    ) -> WarrenResult<()>;

    /// Resolves end-of-phase collisions. Returns true if the player was
    /// attacked.
    fn check_collisions(&mut self, zone: &mut Zone, player: &mut Player) -> WarrenResult<bool>;

    /// Resolves item pickup under the player.
    fn check_item_pickup(&mut self, zone: &mut Zone, player: &mut Player) -> WarrenResult<()>;
}

/// Outcome of a resolved player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnSignal {
    /// Already mid-phase: duplicate sweeps from rapid input are no-ops
    Rejected,
    /// Entrance animation lock active; enemy turns deferred entirely
    Deferred,
    /// Enemy phase ran to completion
    Completed,
}

/// What an enemy phase actually did.
#[derive(Debug, Clone, Default)]
pub struct PhaseReport {
    /// Whether the phase ran at all (guards may short-circuit it)
    pub ran: bool,
    pub processed: usize,
    pub skipped: usize,
    /// Every enemy was frozen this phase (exit tile or grace period)
    pub frozen_phase: bool,
    pub player_attacked: bool,
    /// Chess mode found no legal move
    pub stalemate: bool,
}

/// One-phase movement suppression after the player leaves an exit tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GracePeriod {
    Idle,
    Armed,
}

/// Orchestrates whose turn it is.
pub struct TurnManager {
    is_player_turn: bool,
    entrance_locked: bool,
    was_on_exit: bool,
    grace: GracePeriod,
    initial_enemy_tiles: HashSet<Position>,
    input_timers: Vec<SequenceHandle>,
    timing: TurnTiming,
    chess_ai_team: Team,
}

impl Default for TurnManager {
    fn default() -> Self {
        Self::new(TurnTiming::default())
    }
}

impl TurnManager {
    pub fn new(timing: TurnTiming) -> Self {
        Self {
            is_player_turn: true,
            entrance_locked: false,
            was_on_exit: false,
            grace: GracePeriod::Idle,
            initial_enemy_tiles: HashSet::new(),
            input_timers: Vec::new(),
            timing,
            chess_ai_team: Team::Black,
        }
    }

    /// Whether player input is currently accepted.
    pub fn is_player_turn(&self) -> bool {
        self.is_player_turn
    }

    /// Tile baseline captured at the start of the current phase.
    pub fn initial_enemy_tiles(&self) -> &HashSet<Position> {
        &self.initial_enemy_tiles
    }

    /// Locks out enemy turns while an entrance animation plays.
    pub fn lock_for_entrance(&mut self) {
        self.entrance_locked = true;
    }

    pub fn release_entrance_lock(&mut self) {
        self.entrance_locked = false;
    }

    pub fn is_entrance_locked(&self) -> bool {
        self.entrance_locked
    }

    /// Registers a pending input-gesture timer to be cancelled the moment
    /// an enemy phase begins.
    pub fn register_input_timer(&mut self, handle: SequenceHandle) {
        self.input_timers.push(handle);
    }

    fn cancel_input_timers(&mut self) {
        for timer in self.input_timers.drain(..) {
            timer.cancel();
        }
    }

    /// Resets per-zone turn state. Called on zone transition, after the
    /// generator replaced the grid and enemy collection.
    pub fn reset_for_zone(&mut self) {
        self.was_on_exit = false;
        self.grace = GracePeriod::Idle;
        self.initial_enemy_tiles.clear();
        self.cancel_input_timers();
        self.entrance_locked = false;
        self.is_player_turn = true;
    }

    /// Entry point called once per resolved player action.
    ///
    /// A call that lands mid-phase is rejected so rapid input cannot
    /// trigger duplicate enemy sweeps.
    pub async fn handle_turn_completion<C: CombatResolver>(
        &mut self,
        zone: &mut Zone,
        player: &mut Player,
        transient: &mut TransientState,
        combat: &mut C,
        scheduler: &Scheduler,
    ) -> WarrenResult<TurnSignal> {
        if !self.is_player_turn {
            return Ok(TurnSignal::Rejected);
        }

        if transient.is_in_pitfall_zone() {
            transient.increment_pitfall_turns_survived();
        }

        if self.entrance_locked {
            debug!("entrance animation active, deferring enemy turns");
            return Ok(TurnSignal::Deferred);
        }

        self.run_enemy_phase(zone, player, transient, combat, scheduler)
            .await?;
        Ok(TurnSignal::Completed)
    }

    /// Runs one enemy phase.
    ///
    /// Ordering contract: `is_player_turn` flips false before any other
    /// mutation, pending input timers are cancelled at the same moment,
    /// and the flag is restored as the phase's very last action, on
    /// every path, including collaborator failures and cancelled pacing.
    pub async fn run_enemy_phase<C: CombatResolver>(
        &mut self,
        zone: &mut Zone,
        player: &mut Player,
        transient: &mut TransientState,
        combat: &mut C,
        scheduler: &Scheduler,
    ) -> WarrenResult<PhaseReport> {
        let mut report = PhaseReport::default();

        if !self.is_player_turn {
            debug!("enemy phase requested while one is already in flight");
            return Ok(report);
        }
        if transient.is_attack_resolution_pending() {
            debug!("player attack resolution pending, skipping enemy phase");
            return Ok(report);
        }
        report.ran = true;

        let player_on_exit = zone.is_exit_at(player.position);

        // Close the input window before any other mutation.
        self.is_player_turn = false;
        self.cancel_input_timers();

        // Baseline for every blocking judgment this phase: enemy tiles at
        // phase start plus the player's own tile.
        self.initial_enemy_tiles = zone.enemies.positions_set();
        self.initial_enemy_tiles.insert(player.position);

        // Freeze policy. The grace flag arms exactly once, on the
        // transition from "on exit" to "off exit", and is consumed after
        // one phase. The visual cue shows only while literally on the
        // exit tile.
        if self.was_on_exit && !player_on_exit {
            self.grace = GracePeriod::Armed;
        }
        let grace_active = self.grace == GracePeriod::Armed;
        if player_on_exit {
            zone.enemies.freeze_all(true);
        } else if grace_active {
            zone.enemies.freeze_all(false);
        } else {
            zone.enemies.thaw_all();
        }
        self.was_on_exit = player_on_exit;
        report.frozen_phase = player_on_exit || grace_active;

        if zone.key.dimension == Dimension::Chess && !report.frozen_phase {
            self.run_chess_phase(zone, player, scheduler, &mut report)
                .await;
        } else {
            self.drain_queue(zone, player, combat, scheduler, &mut report)
                .await;
        }

        // Base case: resolve consequences, then re-arm input last.
        transient.clear_player_just_attacked();
        match combat.check_collisions(zone, player) {
            Ok(attacked) => report.player_attacked = attacked,
            Err(e) => warn!("collision check failed: {}", e),
        }
        if let Err(e) = combat.check_item_pickup(zone, player) {
            warn!("pickup check failed: {}", e);
        }
        zone.enemies.sweep_dead();
        if grace_active {
            self.grace = GracePeriod::Idle;
        }

        let pause = if report.player_attacked {
            self.timing.player_hit_pause
        } else {
            self.timing.turn_end_pause
        };
        if scheduler.pause(pause).await.is_err() {
            debug!("post-phase pause cancelled");
        }

        // The very last action of the phase.
        self.is_player_turn = true;
        Ok(report)
    }

    /// Explicit queue drain: enemies are processed in the order captured
    /// at phase start; stale entries are skipped without stopping the
    /// drain.
    async fn drain_queue<C: CombatResolver>(
        &mut self,
        zone: &mut Zone,
        player: &Player,
        combat: &mut C,
        scheduler: &Scheduler,
        report: &mut PhaseReport,
    ) {
        let mut queue: VecDeque<Uuid> = zone.enemies.ids_in_order().into();
        while let Some(enemy_id) = queue.pop_front() {
            let frozen = match zone.enemies.get(enemy_id).filter(|e| !e.is_dead()) {
                None => {
                    debug!("enemy {} gone before its move, skipping", enemy_id);
                    report.skipped += 1;
                    continue;
                }
                Some(enemy) => enemy.is_frozen,
            };

            if !frozen {
                match combat.handle_single_enemy_movement(
                    zone,
                    player,
                    enemy_id,
                    &self.initial_enemy_tiles,
                ) {
                    Ok(()) => report.processed += 1,
                    Err(e) => {
                        warn!("enemy {} movement failed, skipping: {}", enemy_id, e);
                        report.skipped += 1;
                    }
                }
            }

            // Frozen enemies did nothing, so less visual pacing is needed.
            let wait = if frozen {
                self.timing.frozen_step
            } else {
                self.timing.enemy_step
            };
            if scheduler.pause(wait).await.is_err() {
                debug!("enemy queue pacing cancelled");
                break;
            }
        }
    }

    /// Chess-mode variant: a single best unit moves, chosen by minimax
    /// run off the game task so it never blocks rendering.
    async fn run_chess_phase(
        &mut self,
        zone: &mut Zone,
        player: &Player,
        scheduler: &Scheduler,
        report: &mut PhaseReport,
    ) {
        let snapshot = ChessSnapshot::from_zone(zone, player.position, self.chess_ai_team);
        let chosen =
            match tokio::task::spawn_blocking(move || choose_move(&snapshot, SEARCH_DEPTH)).await
            {
                Ok(chosen) => chosen,
                Err(e) => {
                    warn!("chess search task failed: {}", e);
                    None
                }
            };

        match chosen {
            None => {
                debug!("no legal chess move, stalemate ends the phase");
                report.stalemate = true;
            }
            Some(chess_move) => {
                if let Some(captured) = chess_move.captures {
                    if let Some(enemy) = zone.enemies.get_mut(captured) {
                        enemy.health = 0;
                    }
                }
                if let Some(enemy) = zone.enemies.get_mut(chess_move.piece) {
                    enemy.position = chess_move.to;
                }
                report.processed = 1;
                if scheduler.pause(self.timing.enemy_step).await.is_err() {
                    debug!("chess pacing cancelled");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Enemy, Grid, Tile, ZoneKey};

    fn open_zone(key: ZoneKey) -> Zone {
        Zone::new(key, Grid::square(Tile::Floor))
    }

    fn manager() -> TurnManager {
        TurnManager::new(TurnTiming::for_testing())
    }

    /// Records the order enemies were handed to the resolver, optionally
    /// killing a victim when the trigger enemy acts.
    #[derive(Default)]
    struct RecordingCombat {
        order: Vec<Uuid>,
        kill_on: Option<(Uuid, Uuid)>,
    }

    impl CombatResolver for RecordingCombat {
        fn handle_single_enemy_movement(
            &mut self,
            zone: &mut Zone,
            _player: &Player,
            enemy_id: Uuid,
            _occupied_baseline: &HashSet<Position>,
        ) -> WarrenResult<()> {
            self.order.push(enemy_id);
            if let Some((trigger, victim)) = self.kill_on {
                if enemy_id == trigger {
                    if let Some(enemy) = zone.enemies.get_mut(victim) {
                        enemy.health = 0;
                    }
                }
            }
            Ok(())
        }

        fn check_collisions(
            &mut self,
            _zone: &mut Zone,
            _player: &mut Player,
        ) -> WarrenResult<bool> {
            Ok(false)
        }

        fn check_item_pickup(&mut self, _zone: &mut Zone, _player: &mut Player) -> WarrenResult<()> {
            Ok(())
        }
    }

    /// Fails every collaborator call.
    struct FailingCombat;

    impl CombatResolver for FailingCombat {
        fn handle_single_enemy_movement(
            &mut self,
            _zone: &mut Zone,
            _player: &Player,
            _enemy_id: Uuid,
            _occupied_baseline: &HashSet<Position>,
        ) -> WarrenResult<()> {
            Err(crate::WarrenError::InvalidState("boom".to_string()))
        }

        fn check_collisions(
            &mut self,
            _zone: &mut Zone,
            _player: &mut Player,
        ) -> WarrenResult<bool> {
            Err(crate::WarrenError::InvalidState("boom".to_string()))
        }

        fn check_item_pickup(&mut self, _zone: &mut Zone, _player: &mut Player) -> WarrenResult<()> {
            Err(crate::WarrenError::InvalidState("boom".to_string()))
        }
    }

    fn spawn_enemies(zone: &mut Zone, count: usize) -> Vec<Uuid> {
        (0..count)
            .map(|i| {
                let enemy = Enemy::new("stalker", Position::new(2 + i as i32, 2), 2);
                let id = enemy.id;
                zone.enemies.push(enemy);
                id
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_phase_completes_and_restores_input() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        let ids = spawn_enemies(&mut zone, 3);
        let mut player = Player::new(Position::new(10, 10));
        let mut transient = TransientState::new();
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();

        assert!(report.ran);
        assert_eq!(report.processed, 3);
        assert_eq!(combat.order, ids);
        assert!(manager.is_player_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_while_mid_phase() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        let mut player = Player::new(Position::new(10, 10));
        let mut transient = TransientState::new();
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        manager.is_player_turn = false; // simulate an in-flight phase
        let signal = manager
            .handle_turn_completion(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert_eq!(signal, TurnSignal::Rejected);

        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(!report.ran);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entrance_lock_defers_enemy_turns() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        spawn_enemies(&mut zone, 2);
        let mut player = Player::new(Position::new(10, 10));
        let mut transient = TransientState::new();
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        manager.lock_for_entrance();
        let signal = manager
            .handle_turn_completion(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert_eq!(signal, TurnSignal::Deferred);
        assert!(combat.order.is_empty());
        assert!(manager.is_player_turn());

        manager.release_entrance_lock();
        let signal = manager
            .handle_turn_completion(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert_eq!(signal, TurnSignal::Completed);
        assert_eq!(combat.order.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attack_resolution_pending_short_circuits() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        spawn_enemies(&mut zone, 2);
        let mut player = Player::new(Position::new(10, 10));
        let mut transient = TransientState::new();
        transient.set_attack_resolution_pending(true);
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(!report.ran);
        assert!(combat.order.is_empty());
        assert!(manager.is_player_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn test_freeze_and_grace_timeline() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        spawn_enemies(&mut zone, 2);
        let exit = Position::new(8, 0);
        zone.grid.set(exit, Tile::Exit).unwrap();

        let mut player = Player::new(exit);
        let mut transient = TransientState::new();
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        // Phase 1: player on the exit tile. Everyone frozen, visual shown.
        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(report.frozen_phase);
        zone.enemies.for_each(|e| {
            assert!(e.is_frozen);
            assert!(e.show_frozen_visual);
        });
        assert!(combat.order.is_empty());

        // Phase 2: player stepped off. Grace period: still frozen, but the
        // visual cue is already gone.
        player.position = Position::new(8, 2);
        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(report.frozen_phase);
        zone.enemies.for_each(|e| {
            assert!(e.is_frozen);
            assert!(!e.show_frozen_visual);
        });
        assert!(combat.order.is_empty());

        // Phase 3: grace consumed, enemies move again.
        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(!report.frozen_phase);
        assert_eq!(combat.order.len(), 2);
        zone.enemies.for_each(|e| assert!(!e.is_frozen));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_skips_mid_phase_deaths_without_stopping() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        let ids = spawn_enemies(&mut zone, 3);
        let mut player = Player::new(Position::new(10, 10));
        let mut transient = TransientState::new();
        // The first enemy's action kills the second before its turn.
        let mut combat = RecordingCombat {
            order: Vec::new(),
            kill_on: Some((ids[0], ids[1])),
        };
        let scheduler = Scheduler::new();
        let mut manager = manager();

        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();

        assert_eq!(combat.order, vec![ids[0], ids[2]]);
        assert_eq!(report.processed, 2);
        assert_eq!(report.skipped, 1);
        // The dead enemy was swept at phase end.
        assert!(!zone.enemies.contains(ids[1]));
        assert!(manager.is_player_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_restored_even_when_every_collaborator_fails() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        spawn_enemies(&mut zone, 2);
        let mut player = Player::new(Position::new(10, 10));
        let mut transient = TransientState::new();
        let mut combat = FailingCombat;
        let scheduler = Scheduler::new();
        let mut manager = manager();

        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(report.ran);
        assert_eq!(report.skipped, 2);
        assert!(manager.is_player_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_timers_cancelled_at_phase_start() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        let mut player = Player::new(Position::new(10, 10));
        let mut transient = TransientState::new();
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        let timer = scheduler.create_sequence().wait(Duration::from_secs(300));
        let handle = timer.handle();
        manager.register_input_timer(handle.clone());

        manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(handle.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pitfall_turn_counter_increments() {
        let key = ZoneKey::underground(1, 1, 1);
        let mut zone = open_zone(key);
        let mut player = Player::new(Position::new(10, 10));
        let mut transient = TransientState::new();
        transient.enter_pitfall_zone(key);
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        for expected in 1..=3u32 {
            manager
                .handle_turn_completion(
                    &mut zone,
                    &mut player,
                    &mut transient,
                    &mut combat,
                    &scheduler,
                )
                .await
                .unwrap();
            assert_eq!(transient.pitfall_turns_survived(), expected);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_chess_phase_moves_single_unit() {
        let mut zone = open_zone(ZoneKey::new(0, 0, Dimension::Chess, 0));
        let rook = Enemy::new("chess_rook", Position::new(3, 3), 4).with_team(Team::Black);
        let rook_id = rook.id;
        let pawn = Enemy::new("chess_pawn", Position::new(12, 12), 1).with_team(Team::Black);
        let pawn_pos = pawn.position;
        zone.enemies.push(rook);
        zone.enemies.push(pawn);

        let mut player = Player::new(Position::new(3, 10));
        let mut transient = TransientState::new();
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();

        assert_eq!(report.processed, 1);
        // The queue drain was bypassed: the resolver never ran.
        assert!(combat.order.is_empty());
        // Exactly one of the two pieces moved.
        let rook_moved = zone.enemies.get(rook_id).unwrap().position != Position::new(3, 3);
        let pawn_moved = zone
            .enemies
            .get_all()
            .iter()
            .any(|e| e.enemy_type == "chess_pawn" && e.position != pawn_pos);
        assert!(rook_moved ^ pawn_moved);
        assert!(manager.is_player_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn test_chess_stalemate_ends_phase_immediately() {
        let mut zone = open_zone(ZoneKey::new(0, 0, Dimension::Chess, 0));
        // Only white pieces: the AI (black) has no legal move.
        zone.enemies
            .push(Enemy::new("chess_pawn", Position::new(4, 12), 1).with_team(Team::White));

        let mut player = Player::new(Position::new(8, 8));
        let mut transient = TransientState::new();
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        let report = manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(report.stalemate);
        assert_eq!(report.processed, 0);
        assert!(manager.is_player_turn());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_for_zone_clears_freeze_state() {
        let mut zone = open_zone(ZoneKey::surface(1, 0));
        spawn_enemies(&mut zone, 1);
        let exit = Position::new(8, 0);
        zone.grid.set(exit, Tile::Exit).unwrap();

        let mut player = Player::new(exit);
        let mut transient = TransientState::new();
        let mut combat = RecordingCombat::default();
        let scheduler = Scheduler::new();
        let mut manager = manager();

        manager
            .run_enemy_phase(&mut zone, &mut player, &mut transient, &mut combat, &scheduler)
            .await
            .unwrap();
        assert!(manager.was_on_exit);

        manager.reset_for_zone();
        assert!(!manager.was_on_exit);
        assert!(manager.is_player_turn());
        assert!(manager.initial_enemy_tiles().is_empty());
    }
}
