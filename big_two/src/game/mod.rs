//! Big Two rules engine.
//!
//! This module provides:
//! - Cards, combinations and the other table entities
//! - Combination classification and comparison
//! - The recommended-play solver
//! - Detection of provably unbeatable plays
//! - The game state and its pure transitions

pub mod constants;
pub mod entities;
pub mod functional;
pub mod highest;
pub mod solver;
pub mod state_machine;

pub use state_machine::{
    GameError, GamePhase, GameResult, GameState, PassOutcome, PlayOutcome, PlayResult, next_seat,
    points_for_cards_left,
};
