//! Bot difficulty parameters and the decision input/output types.

use serde::{Deserialize, Serialize};

use crate::game::entities::{Card, LastPlay, SeatIndex};
use crate::table::config::BotDifficulty;

/// Bot difficulty parameters
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyParams {
    /// Chance of passing a table the bot could beat
    pub pass_probability: f64,

    /// Reads opponents' hand sizes and keeps strong cards back
    pub strategic: bool,

    /// Opponent hand size at or below which a strategic bot never passes
    pub defensive_card_threshold: usize,

    /// Chance of holding back a 2 or a strong five-card combo (strategic only)
    pub holding_pass_probability: f64,
}

impl DifficultyParams {
    /// Plays the cheapest card it can, passes often
    pub fn easy() -> Self {
        Self {
            pass_probability: 0.40,
            strategic: false,
            defensive_card_threshold: 0,
            holding_pass_probability: 0.0,
        }
    }

    /// Plays the cheapest card it can, passes now and then
    pub fn medium() -> Self {
        Self {
            pass_probability: 0.15,
            strategic: false,
            defensive_card_threshold: 0,
            holding_pass_probability: 0.0,
        }
    }

    /// Keeps combinations intact, blocks opponents close to going out
    pub fn hard() -> Self {
        Self {
            pass_probability: 0.0,
            strategic: true,
            defensive_card_threshold: 3,
            holding_pass_probability: 0.30,
        }
    }

    /// Get parameters for a given difficulty
    pub fn from_difficulty(difficulty: BotDifficulty) -> Self {
        match difficulty {
            BotDifficulty::Easy => Self::easy(),
            BotDifficulty::Medium => Self::medium(),
            BotDifficulty::Hard => Self::hard(),
        }
    }
}

/// What the bot can see when it is asked to act.
#[derive(Debug, Clone)]
pub struct BotPlayOptions<'a> {
    /// The bot's own hand
    pub hand: &'a [Card],

    /// Play to beat, `None` when leading
    pub last_play: Option<&'a LastPlay>,

    pub is_first_play_of_game: bool,

    /// 1-based match number; the opening card is only required in match 1
    pub match_number: u32,

    /// Hand size of every seat, in seat order
    pub player_card_counts: &'a [usize],

    /// The bot's own seat
    pub current_player_index: SeatIndex,
}

/// A bot decision. `cards: None` is a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotPlay {
    pub cards: Option<Vec<Card>>,
    pub reasoning: String,
}

impl BotPlay {
    pub fn play(cards: Vec<Card>, reasoning: impl Into<String>) -> Self {
        Self {
            cards: Some(cards),
            reasoning: reasoning.into(),
        }
    }

    pub fn pass(reasoning: impl Into<String>) -> Self {
        Self {
            cards: None,
            reasoning: reasoning.into(),
        }
    }

    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.cards.is_none()
    }
}
