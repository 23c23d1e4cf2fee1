//! # Transient Session State
//!
//! Turn- and session-only flags: pitfall-zone tracking, the
//! player-just-attacked marker, and pending port-transition data. None
//! of this is part of the persisted save; it resets on load and on zone
//! entry.

use crate::{PortTransition, Position, ZoneKey};

/// Session-only flags consulted by the turn manager and zone generation.
#[derive(Debug, Default)]
pub struct TransientState {
    player_just_attacked: bool,
    attack_resolution_pending: bool,
    pitfall_zone: Option<ZoneKey>,
    pitfall_turns_survived: u32,
    port_transition: Option<PortTransition>,
    return_to_surface: Option<(ZoneKey, Position)>,
}

impl TransientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears everything. Called on load and on starting a new game.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Called when the player enters a zone. Pitfall tracking is keyed to
    /// the zone it started in, so entering any other zone ends it.
    pub fn on_zone_entered(&mut self, key: ZoneKey) {
        if self.pitfall_zone != Some(key) {
            self.pitfall_zone = None;
            self.pitfall_turns_survived = 0;
        }
    }

    pub fn did_player_just_attack(&self) -> bool {
        self.player_just_attacked
    }

    pub fn mark_player_attacked(&mut self) {
        self.player_just_attacked = true;
    }

    pub fn clear_player_just_attacked(&mut self) {
        self.player_just_attacked = false;
    }

    /// Whether the player's own attack has a deferred resolution already
    /// scheduled elsewhere.
    pub fn is_attack_resolution_pending(&self) -> bool {
        self.attack_resolution_pending
    }

    pub fn set_attack_resolution_pending(&mut self, pending: bool) {
        self.attack_resolution_pending = pending;
    }

    pub fn is_in_pitfall_zone(&self) -> bool {
        self.pitfall_zone.is_some()
    }

    pub fn enter_pitfall_zone(&mut self, key: ZoneKey) {
        self.pitfall_zone = Some(key);
        self.pitfall_turns_survived = 0;
    }

    pub fn increment_pitfall_turns_survived(&mut self) {
        self.pitfall_turns_survived += 1;
    }

    pub fn pitfall_turns_survived(&self) -> u32 {
        self.pitfall_turns_survived
    }

    pub fn get_port_transition(&self) -> Option<PortTransition> {
        self.port_transition
    }

    pub fn set_port_transition(&mut self, transition: PortTransition) {
        self.port_transition = Some(transition);
    }

    /// Consumes the pending port transition.
    pub fn take_port_transition(&mut self) -> Option<PortTransition> {
        self.port_transition.take()
    }

    pub fn return_to_surface(&self) -> Option<(ZoneKey, Position)> {
        self.return_to_surface
    }

    pub fn record_return_to_surface(&mut self, key: ZoneKey, position: Position) {
        self.return_to_surface = Some((key, position));
    }

    pub fn take_return_to_surface(&mut self) -> Option<(ZoneKey, Position)> {
        self.return_to_surface.take()
    }
}
