//! Bot decision-making logic with difficulty-based behavior.

use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::models::{BotPlay, BotPlayOptions, DifficultyParams};
use crate::game::{
    constants::OPENING_CARD,
    entities::{Card, ComboType, LastPlay, Rank},
    functional::{classify_cards, straight_label},
    solver::{enumerate_plays, find_recommended_play_with_opening},
    state_machine::next_seat,
};
use crate::table::config::BotDifficulty;

/// Thresholds shared by every difficulty.
///
/// # Examples
///
/// ```
/// use big_two::bot::BotDecisionConfig;
/// use big_two::game::entities::{ComboType, Rank};
///
/// let config = BotDecisionConfig::default();
/// assert_eq!(config.power_rank, Rank::Two);
/// assert_eq!(config.power_combo, ComboType::FullHouse);
/// ```
#[derive(Debug, Clone)]
pub struct BotDecisionConfig {
    /// Cards of this rank or above are power cards a strategic bot may hold
    /// back.
    pub power_rank: Rank,

    /// Five-card combos of this type or stronger count as power plays.
    pub power_combo: ComboType,

    /// Strategic leads only use cards strictly below this rank.
    pub lead_rank_ceiling: Rank,

    /// Combination sizes a strategic bot tries to lead with, in order.
    pub lead_sizes: Vec<usize>,

    /// Hand size of the next seat that forces a bot to play when it can.
    pub must_play_card_count: usize,
}

impl Default for BotDecisionConfig {
    fn default() -> Self {
        Self {
            power_rank: Rank::Two,
            power_combo: ComboType::FullHouse,
            lead_rank_ceiling: Rank::Ace,
            lead_sizes: vec![5, 3, 2],
            must_play_card_count: 1,
        }
    }
}

fn describe(cards: &[Card]) -> String {
    let combo = classify_cards(cards);
    let listed = cards
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    match straight_label(cards) {
        Some(label) if matches!(combo, ComboType::Straight | ComboType::StraightFlush) => {
            format!("{label} {combo} [{listed}]")
        }
        _ => format!("{combo} [{listed}]"),
    }
}

/// Decision maker for one bot seat
pub struct BotAi {
    difficulty: BotDifficulty,
    params: DifficultyParams,
    config: BotDecisionConfig,
    rng: StdRng,
}

impl BotAi {
    pub fn new(difficulty: BotDifficulty) -> Self {
        Self::with_rng(difficulty, StdRng::from_rng(&mut rand::rng()))
    }

    /// Deterministic bot for reproducible games and tests
    pub fn with_seed(difficulty: BotDifficulty, seed: u64) -> Self {
        Self::with_rng(difficulty, StdRng::seed_from_u64(seed))
    }

    fn with_rng(difficulty: BotDifficulty, rng: StdRng) -> Self {
        Self {
            difficulty,
            params: DifficultyParams::from_difficulty(difficulty),
            config: BotDecisionConfig::default(),
            rng,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: BotDecisionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: DifficultyParams) -> Self {
        self.params = params;
        self
    }

    pub fn difficulty(&self) -> BotDifficulty {
        self.difficulty
    }

    /// Choose a play (or a pass) for the seat described by `options`.
    pub fn get_play(&mut self, options: &BotPlayOptions) -> BotPlay {
        let decision = self.decide(options);
        debug!(
            "{} bot in seat {}: {}",
            self.difficulty, options.current_player_index, decision.reasoning
        );
        decision
    }

    fn decide(&mut self, options: &BotPlayOptions) -> BotPlay {
        let hand = options.hand;
        if hand.is_empty() {
            return BotPlay::pass("No cards left to play");
        }

        let opening_required = options.is_first_play_of_game && options.match_number.max(1) == 1;
        if opening_required && hand.contains(&OPENING_CARD) {
            let cards = match options.last_play {
                // The opening card is the lowest in the deck, so every
                // strategic lead already contains it.
                None if self.params.strategic => self.strategic_lead(hand),
                None => vec![OPENING_CARD],
                Some(last) => {
                    match find_recommended_play_with_opening(hand, Some(last), Some(OPENING_CARD))
                    {
                        Some(cards) => cards,
                        None => return BotPlay::pass(format!("No play with the {OPENING_CARD}")),
                    }
                }
            };
            let reasoning = format!("Opening with the {OPENING_CARD}: {}", describe(&cards));
            return BotPlay::play(cards, reasoning);
        }

        match options.last_play {
            None => self.lead(hand),
            Some(last) => self.follow(options, last),
        }
    }

    fn lead(&self, hand: &[Card]) -> BotPlay {
        let cards = if self.params.strategic {
            self.strategic_lead(hand)
        } else {
            hand.iter().min().map(|card| vec![*card]).unwrap_or_default()
        };
        let reasoning = format!("Leading with the lowest {}", describe(&cards));
        BotPlay::play(cards, reasoning)
    }

    /// Lowest combination that contains the lowest card without touching
    /// high ranks; the lowest single when there is none.
    fn strategic_lead(&self, hand: &[Card]) -> Vec<Card> {
        let Some(lowest) = hand.iter().min().copied() else {
            return Vec::new();
        };
        let ceiling = self.config.lead_rank_ceiling;
        self.config
            .lead_sizes
            .iter()
            .find_map(|size| {
                enumerate_plays(hand, *size)
                    .into_iter()
                    .map(|(_, cards)| cards)
                    .find(|cards| {
                        cards.contains(&lowest) && cards.iter().all(|card| card.rank < ceiling)
                    })
            })
            .unwrap_or_else(|| vec![lowest])
    }

    fn follow(&mut self, options: &BotPlayOptions, last: &LastPlay) -> BotPlay {
        let Some(cards) = find_recommended_play_with_opening(options.hand, Some(last), None) else {
            return BotPlay::pass(format!("Nothing beats the {}", last.combo_type));
        };

        let next = next_seat(options.current_player_index);
        if options.player_card_counts.get(next) == Some(&self.config.must_play_card_count) {
            let reasoning = format!(
                "Next player has {} card left, must play {}",
                self.config.must_play_card_count,
                describe(&cards)
            );
            return BotPlay::play(cards, reasoning);
        }

        let probability = self.pass_probability(options, &cards);
        if probability > 0.0 && self.rng.random_bool(probability.min(1.0)) {
            return BotPlay::pass(format!("Holding back {}", describe(&cards)));
        }

        let reasoning = format!("Beating the {} with {}", last.combo_type, describe(&cards));
        BotPlay::play(cards, reasoning)
    }

    fn pass_probability(&self, options: &BotPlayOptions, cards: &[Card]) -> f64 {
        if !self.params.strategic {
            return self.params.pass_probability;
        }
        let opponent_close = options
            .player_card_counts
            .iter()
            .enumerate()
            .any(|(seat, count)| {
                seat != options.current_player_index
                    && *count <= self.params.defensive_card_threshold
            });
        if opponent_close {
            0.0
        } else if self.spends_power(cards) {
            self.params.holding_pass_probability
        } else {
            self.params.pass_probability
        }
    }

    fn spends_power(&self, cards: &[Card]) -> bool {
        let power_card = cards.iter().any(|card| card.rank >= self.config.power_rank);
        let power_combo = self.config.power_combo.five_card_ladder().is_some_and(|floor| {
            classify_cards(cards)
                .five_card_ladder()
                .is_some_and(|ladder| ladder >= floor)
        });
        power_card || power_combo
    }
}
