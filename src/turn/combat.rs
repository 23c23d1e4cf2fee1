//! Reference combat resolver.
//!
//! Collision, pickup, and single-enemy movement resolution are
//! collaborator concerns; this implementation is the minimal one the
//! harness and tests run against. Enemies step toward the player, with
//! blocking judged against the phase-start tile baseline.

use super::CombatResolver;
use crate::{Player, Position, Tile, WarrenError, WarrenResult, Zone};
use std::collections::HashSet;
use uuid::Uuid;

/// Straight-line chaser combat.
pub struct SimpleCombat {
    pub enemy_damage: i32,
}

impl Default for SimpleCombat {
    fn default() -> Self {
        Self { enemy_damage: 1 }
    }
}

impl CombatResolver for SimpleCombat {
    fn handle_single_enemy_movement(
        &mut self,
        zone: &mut Zone,
        player: &Player,
        enemy_id: Uuid,
        occupied_baseline: &HashSet<Position>,
    ) -> WarrenResult<()> {
        let current = match zone.enemies.get(enemy_id) {
            Some(enemy) if !enemy.is_dead() => enemy.position,
            _ => {
                return Err(WarrenError::InvalidAction(format!(
                    "enemy {} is gone",
                    enemy_id
                )))
            }
        };

        let next = current.step_toward(player.position);
        if next == current {
            return Ok(());
        }

        let walkable = zone.grid.get(next).map(Tile::is_walkable).unwrap_or(false);
        // The player's own tile stays enterable: stepping onto it is the
        // attack. Everything else in the baseline blocks.
        let blocked = occupied_baseline.contains(&next) && next != player.position;
        if walkable && !blocked {
            if let Some(enemy) = zone.enemies.get_mut(enemy_id) {
                enemy.position = next;
            }
        }
        Ok(())
    }

    fn check_collisions(&mut self, zone: &mut Zone, player: &mut Player) -> WarrenResult<bool> {
        let attackers = zone
            .enemies
            .get_all()
            .iter()
            .filter(|enemy| !enemy.is_dead() && enemy.position == player.position)
            .count() as i32;
        if attackers > 0 {
            player.health -= attackers * self.enemy_damage;
            return Ok(true);
        }
        Ok(false)
    }

    fn check_item_pickup(&mut self, zone: &mut Zone, player: &mut Player) -> WarrenResult<()> {
        if matches!(zone.grid.get(player.position), Some(Tile::Item { .. })) {
            zone.grid.set(player.position, Tile::Floor)?;
        }
        Ok(())
    }
}
