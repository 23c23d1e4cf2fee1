//! # Chess-Mode Move Search
//!
//! In chess zones a single best enemy unit moves per phase, chosen by a
//! fixed-depth minimax over legal chess-template moves. Piece templates
//! are bound to named enemy archetypes; pawn direction depends on team.
//! The search operates on an owned snapshot so the turn manager can run
//! it off the game task without blocking.
//!
//! `SEARCH_DEPTH` is a tunable, not a correctness contract.

use crate::{ChessArchetype, Position, Team, Zone};
use std::collections::HashSet;
use uuid::Uuid;

/// Minimax lookahead in plies.
pub const SEARCH_DEPTH: u32 = 3;

const SCORE_BOUND: i32 = 100_000;
const PLAYER_CAPTURE_BONUS: i32 = 200;

/// One piece in the search snapshot.
#[derive(Debug, Clone)]
pub struct ChessPiece {
    pub id: Uuid,
    pub position: Position,
    pub archetype: ChessArchetype,
    pub team: Team,
}

/// Owned board snapshot the search runs against.
#[derive(Debug, Clone)]
pub struct ChessSnapshot {
    width: i32,
    height: i32,
    blocked: HashSet<Position>,
    pieces: Vec<ChessPiece>,
    player: Position,
    ai_team: Team,
    player_taken: bool,
}

/// The move the search settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChessMove {
    pub piece: Uuid,
    pub from: Position,
    pub to: Position,
    /// Captured piece, when the target square held one
    pub captures: Option<Uuid>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    piece: usize,
    to: Position,
    captures: Option<usize>,
}

impl ChessSnapshot {
    /// Builds a snapshot from the zone's living chess pieces.
    pub fn from_zone(zone: &Zone, player: Position, ai_team: Team) -> Self {
        let blocked = zone
            .grid
            .positions()
            .filter(|pos| {
                zone.grid
                    .get(*pos)
                    .map(|tile| !tile.is_walkable())
                    .unwrap_or(true)
            })
            .collect();
        let pieces = zone
            .enemies
            .get_all()
            .iter()
            .filter(|enemy| !enemy.is_dead())
            .filter_map(|enemy| {
                Some(ChessPiece {
                    id: enemy.id,
                    position: enemy.position,
                    archetype: ChessArchetype::from_enemy_type(&enemy.enemy_type)?,
                    team: enemy.team?,
                })
            })
            .collect();
        Self {
            width: zone.grid.width() as i32,
            height: zone.grid.height() as i32,
            blocked,
            pieces,
            player,
            ai_team,
            player_taken: false,
        }
    }

    pub fn ai_team(&self) -> Team {
        self.ai_team
    }

    pub fn piece_count(&self, team: Team) -> usize {
        self.pieces.iter().filter(|p| p.team == team).count()
    }

    fn open(&self, pos: Position) -> bool {
        pos.x >= 0
            && pos.y >= 0
            && pos.x < self.width
            && pos.y < self.height
            && !self.blocked.contains(&pos)
    }

    fn piece_at(&self, pos: Position) -> Option<usize> {
        self.pieces.iter().position(|p| p.position == pos)
    }

    /// Which team occupies a square. The player counts as a piece of the
    /// AI's opponent until taken.
    fn occupant(&self, pos: Position) -> Option<Team> {
        if let Some(index) = self.piece_at(pos) {
            return Some(self.pieces[index].team);
        }
        if !self.player_taken && pos == self.player {
            return Some(self.ai_team.opponent());
        }
        None
    }

    fn apply(&self, candidate: Candidate) -> ChessSnapshot {
        let mut next = self.clone();
        if let Some(captured) = candidate.captures {
            next.pieces.remove(captured);
        }
        // Indices shift after removal; re-find the mover by id.
        let mover_id = self.pieces[candidate.piece].id;
        if let Some(index) = next.pieces.iter().position(|p| p.id == mover_id) {
            next.pieces[index].position = candidate.to;
        }
        if candidate.to == next.player && !next.player_taken {
            next.player_taken = true;
        }
        next
    }
}

/// Forward direction for pawns: black advances down the board, white up.
fn pawn_forward(team: Team) -> i32 {
    match team {
        Team::Black => 1,
        Team::White => -1,
    }
}

fn step_targets(snapshot: &ChessSnapshot, index: usize, deltas: &[(i32, i32)]) -> Vec<Candidate> {
    let piece = &snapshot.pieces[index];
    let mut moves = Vec::new();
    for (dx, dy) in deltas {
        let to = Position::new(piece.position.x + dx, piece.position.y + dy);
        if !snapshot.open(to) {
            continue;
        }
        match snapshot.occupant(to) {
            None => moves.push(Candidate {
                piece: index,
                to,
                captures: None,
            }),
            Some(team) if team != piece.team => moves.push(Candidate {
                piece: index,
                to,
                captures: snapshot.piece_at(to),
            }),
            Some(_) => {}
        }
    }
    moves
}

fn sliding_targets(
    snapshot: &ChessSnapshot,
    index: usize,
    rays: &[(i32, i32)],
) -> Vec<Candidate> {
    let piece = &snapshot.pieces[index];
    let mut moves = Vec::new();
    for (dx, dy) in rays {
        let mut to = piece.position;
        loop {
            to = Position::new(to.x + dx, to.y + dy);
            if !snapshot.open(to) {
                break;
            }
            match snapshot.occupant(to) {
                None => moves.push(Candidate {
                    piece: index,
                    to,
                    captures: None,
                }),
                Some(team) => {
                    if team != piece.team {
                        moves.push(Candidate {
                            piece: index,
                            to,
                            captures: snapshot.piece_at(to),
                        });
                    }
                    break;
                }
            }
        }
    }
    moves
}

const ROOK_RAYS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];
const BISHOP_RAYS: [(i32, i32); 4] = [(-1, -1), (1, -1), (-1, 1), (1, 1)];
const KING_STEPS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];
const KNIGHT_STEPS: [(i32, i32); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, -2),
    (-1, 2),
    (1, -2),
    (1, 2),
    (2, -1),
    (2, 1),
];

/// Legal moves for one piece, following the standard templates.
fn moves_for_piece(snapshot: &ChessSnapshot, index: usize) -> Vec<Candidate> {
    let piece = &snapshot.pieces[index];
    match piece.archetype {
        ChessArchetype::Knight => step_targets(snapshot, index, &KNIGHT_STEPS),
        ChessArchetype::King => step_targets(snapshot, index, &KING_STEPS),
        ChessArchetype::Rook => sliding_targets(snapshot, index, &ROOK_RAYS),
        ChessArchetype::Bishop => sliding_targets(snapshot, index, &BISHOP_RAYS),
        ChessArchetype::Queen => {
            let mut moves = sliding_targets(snapshot, index, &ROOK_RAYS);
            moves.extend(sliding_targets(snapshot, index, &BISHOP_RAYS));
            moves
        }
        ChessArchetype::Pawn => {
            let forward = pawn_forward(piece.team);
            let mut moves = Vec::new();
            let ahead = Position::new(piece.position.x, piece.position.y + forward);
            if snapshot.open(ahead) && snapshot.occupant(ahead).is_none() {
                moves.push(Candidate {
                    piece: index,
                    to: ahead,
                    captures: None,
                });
            }
            for dx in [-1, 1] {
                let diagonal = Position::new(piece.position.x + dx, piece.position.y + forward);
                if !snapshot.open(diagonal) {
                    continue;
                }
                if let Some(team) = snapshot.occupant(diagonal) {
                    if team != piece.team {
                        moves.push(Candidate {
                            piece: index,
                            to: diagonal,
                            captures: snapshot.piece_at(diagonal),
                        });
                    }
                }
            }
            moves
        }
    }
}

fn all_moves(snapshot: &ChessSnapshot, team: Team) -> Vec<Candidate> {
    (0..snapshot.pieces.len())
        .filter(|index| snapshot.pieces[*index].team == team)
        .flat_map(|index| moves_for_piece(snapshot, index))
        .collect()
}

/// Static evaluation from the AI team's perspective: material balance
/// plus pressure toward the player.
fn evaluate(snapshot: &ChessSnapshot) -> i32 {
    let mut score = 0;
    let mut closest = i32::MAX;
    for piece in &snapshot.pieces {
        let value = piece.archetype.material_value();
        if piece.team == snapshot.ai_team {
            score += value;
            let distance = piece.position.manhattan_distance(snapshot.player) as i32;
            closest = closest.min(distance);
        } else {
            score -= value;
        }
    }
    if snapshot.player_taken {
        score += PLAYER_CAPTURE_BONUS;
    } else if closest != i32::MAX {
        score -= closest;
    }
    score
}

fn search(snapshot: &ChessSnapshot, depth: u32, to_move: Team, mut alpha: i32, mut beta: i32) -> i32 {
    if depth == 0 || snapshot.player_taken {
        return evaluate(snapshot);
    }
    let moves = all_moves(snapshot, to_move);
    if moves.is_empty() {
        return evaluate(snapshot);
    }

    if to_move == snapshot.ai_team {
        let mut best = -SCORE_BOUND;
        for candidate in moves {
            let next = snapshot.apply(candidate);
            let value = search(&next, depth - 1, to_move.opponent(), alpha, beta);
            best = best.max(value);
            alpha = alpha.max(value);
            if beta <= alpha {
                break;
            }
        }
        best
    } else {
        let mut best = SCORE_BOUND;
        for candidate in moves {
            let next = snapshot.apply(candidate);
            let value = search(&next, depth - 1, to_move.opponent(), alpha, beta);
            best = best.min(value);
            beta = beta.min(value);
            if beta <= alpha {
                break;
            }
        }
        best
    }
}

/// Picks the AI team's best move, or `None` when it has no legal move
/// (stalemate; the phase ends immediately).
pub fn choose_move(snapshot: &ChessSnapshot, depth: u32) -> Option<ChessMove> {
    let moves = all_moves(snapshot, snapshot.ai_team);
    let mut best: Option<(i32, Candidate)> = None;

    for candidate in moves {
        let next = snapshot.apply(candidate);
        let value = search(
            &next,
            depth.saturating_sub(1),
            snapshot.ai_team.opponent(),
            -SCORE_BOUND,
            SCORE_BOUND,
        );
        let better = match best {
            None => true,
            Some((best_value, _)) => value > best_value,
        };
        if better {
            best = Some((value, candidate));
        }
    }

    best.map(|(_, candidate)| {
        let piece = &snapshot.pieces[candidate.piece];
        ChessMove {
            piece: piece.id,
            from: piece.position,
            to: candidate.to,
            captures: candidate.captures.map(|index| snapshot.pieces[index].id),
        }
    })
}

/// Snapshot sanity check used by the turn manager: whether any tile in
/// the zone is a chess piece the AI can move.
pub fn has_ai_pieces(snapshot: &ChessSnapshot) -> bool {
    snapshot.piece_count(snapshot.ai_team) > 0
}
