//! Fixed table and rule constants.

use super::entities::{Card, Rank, Suit};

/// Seats at a Big Two table.
pub const NUM_PLAYERS: usize = 4;

/// Cards dealt to every seat at the start of a match.
pub const CARDS_PER_HAND: usize = 13;

pub const DECK_SIZE: usize = 52;

/// The card whose holder must lead the very first play of match 1.
pub const OPENING_CARD: Card = Card::new(Rank::Three, Suit::Diamond);

/// Consecutive passes after which a trick closes and the table is led again.
pub const TRICK_CLOSING_PASSES: u8 = 3;

/// Cumulative score at (or above) which the game is over.
pub const DEFAULT_SCORE_LIMIT: u32 = 101;

/// Countdown length once a play is proven unbeatable.
pub const AUTO_PASS_DURATION_MS: u64 = 10_000;

/// Period of the countdown scheduler's tick.
pub const TICK_INTERVAL_MS: u64 = 100;

/// Key the whole-game snapshot lives under in the injected store.
pub const STATE_STORAGE_KEY: &str = "big_two_game_state";

/// Timer id of the auto-pass countdown in the scheduler registry.
pub const AUTO_PASS_TIMER_ID: &str = "auto_pass";

pub const MAX_PLAYER_NAME_LENGTH: usize = 24;
