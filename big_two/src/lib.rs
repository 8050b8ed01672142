//! # Big Two
//!
//! A rules engine and turn orchestrator for Big Two (Dai Di), the four-player
//! climbing card game.
//!
//! Players take turns beating the combination on the table with a stronger
//! combination of the same size, or passing. Three consecutive passes close
//! the trick and hand the lead back to the last player who played. The first
//! player to empty their hand wins the match; everyone else is charged
//! points for the cards they still hold, and the game ends once someone
//! reaches the score limit.
//!
//! ## Core Modules
//!
//! - [`game`]: Cards, combination rules, the solver, unbeatable-play
//!   detection and the game state machine
//! - [`bot`]: Computer opponents with difficulty presets
//! - [`timer`]: The auto-pass countdown state and its scheduler
//! - [`table`]: Configuration, persistence and the async [`GameStateManager`]
//!
//! ## Example
//!
//! ```
//! use big_two::{can_beat, classify_cards, entities::{Card, ComboType}};
//!
//! let pair: Vec<Card> = ["9D", "9S"].iter().map(|id| id.parse().unwrap()).collect();
//! let higher: Vec<Card> = ["10C", "10H"].iter().map(|id| id.parse().unwrap()).collect();
//! assert_eq!(classify_cards(&pair), ComboType::Pair);
//! assert!(can_beat(&higher, &pair));
//! ```

/// Computer opponents.
pub mod bot;

/// Rules engine: entities, combinations, solver and state machine.
pub mod game;

/// Configuration, persistence and orchestration.
pub mod table;

/// Auto-pass countdown.
pub mod timer;

pub use bot::{BotAi, BotPlay, BotPlayOptions};
pub use game::{
    GameError, GamePhase, GameResult, GameState, PlayResult,
    constants::{self, DEFAULT_SCORE_LIMIT, NUM_PLAYERS, OPENING_CARD},
    entities,
    functional::{self, can_beat, can_beat_play, classify_and_sort_cards, classify_cards},
    highest::{is_highest_possible_play, should_trigger_auto_pass_timer},
    solver::{find_recommended_play, find_recommended_play_with_opening},
};
pub use table::{
    BotDifficulty, EngineSettings, GameConfig, GameStateManager, MemoryStore, StateStore,
    Subscription,
};
