//! Computer opponents for the empty seats.
//!
//! Each bot seat owns a [`BotAi`] that picks a play from the public table
//! state and its own hand. Difficulty presets differ in how readily they
//! pass a beatable table and in how carefully they spend strong cards:
//!
//! - **Easy**: cheapest legal play, passes a beatable table 40% of the time
//! - **Medium**: cheapest legal play, passes 15% of the time
//! - **Hard**: leads with low combinations instead of breaking them, never
//!   passes while an opponent is close to going out, otherwise sometimes
//!   holds back its 2s and big five-card combos
//!
//! ## Example
//!
//! ```
//! use big_two::bot::{BotAi, BotPlayOptions};
//! use big_two::game::entities::Card;
//! use big_two::table::config::BotDifficulty;
//!
//! let hand: Vec<Card> = ["3D", "7C", "KS"].iter().map(|id| id.parse().unwrap()).collect();
//! let mut bot = BotAi::with_seed(BotDifficulty::Medium, 7);
//! let play = bot.get_play(&BotPlayOptions {
//!     hand: &hand,
//!     last_play: None,
//!     is_first_play_of_game: true,
//!     match_number: 1,
//!     player_card_counts: &[3, 13, 13, 13],
//!     current_player_index: 0,
//! });
//! assert_eq!(play.cards, Some(vec!["3D".parse().unwrap()]));
//! ```

pub mod decision;
pub mod models;

pub use decision::{BotAi, BotDecisionConfig};
pub use models::{BotPlay, BotPlayOptions, DifficultyParams};
