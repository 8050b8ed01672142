//! Big Two game state and its pure transitions.
//!
//! `GameState` is the single serializable snapshot of a game. Every rule of
//! the table (dealing, plays, passes, trick closing, scoring, match rollover)
//! is a synchronous method here; the async manager wraps these with locking,
//! persistence, timers and notification.

use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};
use thiserror::Error;
use uuid::Uuid;

use super::{
    constants::{DECK_SIZE, NUM_PLAYERS, OPENING_CARD, TRICK_CLOSING_PASSES},
    entities::{
        Card, ComboType, Deck, LastPlay, MatchResult, Player, PlayerScore, RoundEntry, SeatIndex,
        TurnAction,
    },
    functional::{can_beat_play, classify_and_sort_cards},
    highest::should_trigger_auto_pass_timer,
    solver::find_recommended_play,
};
use crate::{table::config::GameConfig, timer::AutoPassTimerState};

/// Errors that can occur while acting on the table
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("Invalid card selection: {0}")]
    InvalidCardSelection(String),
    #[error("Game is not in progress")]
    GameNotInProgress,
    #[error("Cannot pass when leading: you must play a card")]
    CannotPassWhenLeading,
    #[error("Cannot pass: {player} has 1 card left, you must play a beating combination")]
    CannotPassOneCardLeft { player: String },
    #[error("Invalid play: {0}")]
    InvalidPlay(String),
    #[error("The current match is still being played")]
    MatchInProgress,
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Inconsistent game state: {0}")]
    InconsistentState(String),
}

pub type GameResult<T> = Result<T, GameError>;

/// Uniform result of a table action at the manager boundary.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PlayResult {
    pub success: bool,
    pub error: Option<String>,
}

impl PlayResult {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }
}

impl From<GameError> for PlayResult {
    fn from(error: GameError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
        }
    }
}

impl<T> From<GameResult<T>> for PlayResult {
    fn from(result: GameResult<T>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(error) => error.into(),
        }
    }
}

/// Coarse lifecycle of a game, derived from the state flags.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum GamePhase {
    Uninitialized,
    InProgress,
    MatchEnded,
    GameOver,
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Uninitialized => "uninitialized",
            Self::InProgress => "in progress",
            Self::MatchEnded => "match ended",
            Self::GameOver => "game over",
        };
        write!(f, "{repr}")
    }
}

/// What a successful play did to the table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PlayOutcome {
    pub combo_type: ComboType,
    /// The player emptied their hand.
    pub match_won: bool,
    pub game_over: bool,
    /// No unseen combination can beat the play; the auto-pass countdown
    /// should start. Never set on a winning play.
    pub unbeatable: bool,
}

/// What a successful pass did to the table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PassOutcome {
    pub trick_closed: bool,
    /// Seat that acts next.
    pub next_player: SeatIndex,
}

/// Next seat in turn order.
#[must_use]
pub const fn next_seat(seat: SeatIndex) -> SeatIndex {
    (seat + 1) % NUM_PLAYERS
}

/// Penalty for the cards a losing seat still holds when a match ends.
#[must_use]
pub fn points_for_cards_left(cards_left: usize) -> u32 {
    let per_card = match cards_left {
        0 => 0,
        1..=4 => 1,
        5..=9 => 2,
        _ => 3,
    };
    u32::try_from(cards_left).unwrap_or(u32::MAX).saturating_mul(per_card)
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GameState {
    pub id: Uuid,
    pub players: Vec<Player>,
    pub current_player_index: SeatIndex,
    pub last_play: Option<LastPlay>,
    pub last_play_player_index: Option<SeatIndex>,
    pub consecutive_passes: u8,
    pub is_first_play_of_game: bool,
    pub game_started: bool,
    /// The current match has a winner.
    pub game_ended: bool,
    /// Winner of the current match.
    pub winner_id: Option<String>,
    /// Per-turn log of the current match.
    pub round_history: Vec<RoundEntry>,
    /// Results of every finished match.
    pub game_round_history: Vec<MatchResult>,
    pub current_match: u32,
    pub match_scores: Vec<PlayerScore>,
    pub last_match_winner_id: Option<String>,
    pub game_over: bool,
    pub final_winner_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub auto_pass_timer: Option<AutoPassTimerState>,
    /// Every card played face-up this match, including the cards of
    /// `last_play`.
    pub played_cards: Vec<Card>,
    pub score_limit: u32,
}

fn seat_players(config: &GameConfig) -> Vec<Player> {
    let bots = usize::from(config.bot_count);
    (0..NUM_PLAYERS)
        .map(|seat| match seat {
            0 => Player::human("player", config.player_name.trim()),
            seat if seat <= bots => Player::bot(
                &format!("bot_{seat}"),
                &format!("Bot {seat}"),
                config.bot_difficulty,
            ),
            seat => Player::human(&format!("guest_{seat}"), &format!("Guest {seat}")),
        })
        .collect()
}

fn deal_hands<R: Rng + ?Sized>(players: &mut [Player], rng: &mut R) {
    let mut deck = Deck::default();
    deck.shuffle(rng);
    for player in players.iter_mut() {
        player.hand = deck.deal_hand();
    }
}

fn opening_seat(players: &[Player]) -> SeatIndex {
    players
        .iter()
        .position(|player| player.holds(&OPENING_CARD))
        .unwrap_or(0)
}

impl GameState {
    /// Seat four players, shuffle and deal match 1.
    ///
    /// The holder of the opening card acts first.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] when the configuration is rejected.
    pub fn deal<R: Rng + ?Sized>(
        config: &GameConfig,
        score_limit: u32,
        rng: &mut R,
    ) -> GameResult<Self> {
        config.validate()?;
        if score_limit == 0 {
            return Err(GameError::InvalidConfig(
                "Score limit must be greater than 0".to_string(),
            ));
        }

        let mut players = seat_players(config);
        deal_hands(&mut players, rng);
        let current_player_index = opening_seat(&players);
        let match_scores = players.iter().map(PlayerScore::new).collect();

        let state = Self {
            id: Uuid::new_v4(),
            players,
            current_player_index,
            last_play: None,
            last_play_player_index: None,
            consecutive_passes: 0,
            is_first_play_of_game: true,
            game_started: true,
            game_ended: false,
            winner_id: None,
            round_history: Vec::new(),
            game_round_history: Vec::new(),
            current_match: 1,
            match_scores,
            last_match_winner_id: None,
            game_over: false,
            final_winner_id: None,
            started_at: Utc::now(),
            auto_pass_timer: None,
            played_cards: Vec::with_capacity(DECK_SIZE),
            score_limit,
        };
        info!(
            "Game {} dealt, {} leads with {OPENING_CARD}",
            state.id, state.players[current_player_index].name
        );
        Ok(state)
    }

    #[must_use]
    pub fn phase(&self) -> GamePhase {
        if self.game_over {
            GamePhase::GameOver
        } else if self.game_ended {
            GamePhase::MatchEnded
        } else if self.game_started {
            GamePhase::InProgress
        } else {
            GamePhase::Uninitialized
        }
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.phase() == GamePhase::InProgress
    }

    #[must_use]
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_player_index)
    }

    /// Hand size of every seat, in seat order.
    #[must_use]
    pub fn card_counts(&self) -> Vec<usize> {
        self.players.iter().map(Player::card_count).collect()
    }

    /// The opening card is only compulsory on the first play of match 1.
    #[must_use]
    pub fn requires_opening_card(&self) -> bool {
        self.is_first_play_of_game && self.current_match <= 1
    }

    /// Hands and played cards together hold every card of the deck exactly
    /// once.
    #[must_use]
    pub fn cards_partition_deck(&self) -> bool {
        let mut seen = HashSet::with_capacity(DECK_SIZE);
        let all_unique = self
            .players
            .iter()
            .flat_map(|player| player.hand.iter())
            .chain(self.played_cards.iter())
            .all(|card| seen.insert(*card));
        all_unique && seen.len() == DECK_SIZE
    }

    /// Check the structural invariants a snapshot from outside must hold
    /// before it can be played on.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InconsistentState`] naming the first broken
    /// invariant.
    pub fn validate(&self) -> GameResult<()> {
        let broken = |reason: String| Err(GameError::InconsistentState(reason));
        if self.players.len() != NUM_PLAYERS || self.match_scores.len() != NUM_PLAYERS {
            return broken(format!(
                "{} players and {} scores, expected {NUM_PLAYERS}",
                self.players.len(),
                self.match_scores.len()
            ));
        }
        if self.current_player_index >= NUM_PLAYERS {
            return broken(format!("current seat {}", self.current_player_index));
        }
        let seats = self
            .last_play
            .iter()
            .map(|last| last.position)
            .chain(self.last_play_player_index);
        for seat in seats {
            if seat >= NUM_PLAYERS {
                return broken(format!("last play seat {seat}"));
            }
        }
        if self.consecutive_passes >= TRICK_CLOSING_PASSES {
            return broken(format!("{} consecutive passes", self.consecutive_passes));
        }
        if !self.cards_partition_deck() {
            return broken("hands and played cards do not form one deck".to_string());
        }
        Ok(())
    }

    fn ensure_in_progress(&self) -> GameResult<()> {
        if self.is_in_progress() {
            Ok(())
        } else {
            Err(GameError::GameNotInProgress)
        }
    }

    fn record(&mut self, seat: SeatIndex, action: TurnAction) {
        let player_id = self.players[seat].id.clone();
        debug!("{} {action}", self.players[seat].name);
        self.round_history.push(RoundEntry {
            match_number: self.current_match,
            player_index: seat,
            player_id,
            action,
            at: Utc::now(),
        });
    }

    fn parse_selection<S: AsRef<str>>(&self, card_ids: &[S]) -> GameResult<Vec<Card>> {
        if card_ids.is_empty() {
            return Err(GameError::InvalidCardSelection(
                "No cards selected".to_string(),
            ));
        }
        let player = &self.players[self.current_player_index];
        let mut cards = Vec::with_capacity(card_ids.len());
        for id in card_ids {
            let id = id.as_ref();
            let card: Card = id.parse().map_err(|_| {
                GameError::InvalidCardSelection(format!("Unknown card id {id}"))
            })?;
            if cards.contains(&card) {
                return Err(GameError::InvalidCardSelection(format!(
                    "{card} selected more than once"
                )));
            }
            if !player.holds(&card) {
                return Err(GameError::InvalidCardSelection(format!(
                    "{card} is not in your hand"
                )));
            }
            cards.push(card);
        }
        Ok(cards)
    }

    /// Play the given cards from the current player's hand.
    ///
    /// # Errors
    ///
    /// - [`GameError::GameNotInProgress`] outside a running match.
    /// - [`GameError::InvalidCardSelection`] for empty, malformed, duplicate
    ///   or unheld ids.
    /// - [`GameError::InvalidPlay`] for invalid combinations, a missing
    ///   opening card, or a play that does not beat the table.
    pub fn play<S: AsRef<str>>(&mut self, card_ids: &[S]) -> GameResult<PlayOutcome> {
        self.ensure_in_progress()?;
        let cards = self.parse_selection(card_ids)?;
        let classified = classify_and_sort_cards(&cards);
        let combo_type = classified.combo_type;

        if !combo_type.is_valid() {
            return Err(GameError::InvalidPlay(format!(
                "{} cards do not form a valid combination",
                cards.len()
            )));
        }
        if self.requires_opening_card() && !cards.contains(&OPENING_CARD) {
            return Err(GameError::InvalidPlay(format!(
                "The first play must include the {OPENING_CARD}"
            )));
        }
        if let Some(last) = &self.last_play {
            if last.cards.len() != cards.len() {
                return Err(GameError::InvalidPlay(format!(
                    "Must play {} cards to follow the {}",
                    last.cards.len(),
                    last.combo_type
                )));
            }
            if !can_beat_play(&cards, last) {
                return Err(GameError::InvalidPlay(format!(
                    "Your {combo_type} does not beat the {} on the table",
                    last.combo_type
                )));
            }
        }

        let seat = self.current_player_index;
        let unbeatable = should_trigger_auto_pass_timer(&cards, &self.played_cards);
        self.players[seat].hand.retain(|card| !cards.contains(card));
        self.played_cards.extend_from_slice(&cards);
        self.last_play = Some(LastPlay {
            position: seat,
            cards: classified.sorted_cards.clone(),
            combo_type,
        });
        self.last_play_player_index = Some(seat);
        self.consecutive_passes = 0;
        self.is_first_play_of_game = false;
        self.auto_pass_timer = None;
        self.record(
            seat,
            TurnAction::Play {
                cards: classified.sorted_cards,
                combo_type,
            },
        );

        if self.players[seat].hand.is_empty() {
            self.finish_match(seat);
            return Ok(PlayOutcome {
                combo_type,
                match_won: true,
                game_over: self.game_over,
                unbeatable: false,
            });
        }

        self.current_player_index = next_seat(seat);
        Ok(PlayOutcome {
            combo_type,
            match_won: false,
            game_over: false,
            unbeatable,
        })
    }

    /// Pass the current player's turn.
    ///
    /// # Errors
    ///
    /// - [`GameError::GameNotInProgress`] outside a running match.
    /// - [`GameError::CannotPassWhenLeading`] with an empty table.
    /// - [`GameError::CannotPassOneCardLeft`] when the next seat holds one
    ///   card and the current player could beat the table.
    pub fn pass(&mut self) -> GameResult<PassOutcome> {
        self.ensure_in_progress()?;
        let Some(last) = &self.last_play else {
            return Err(GameError::CannotPassWhenLeading);
        };

        let seat = self.current_player_index;
        let next = next_seat(seat);
        if self.players[next].card_count() == 1
            && find_recommended_play(&self.players[seat].hand, Some(last), false).is_some()
        {
            return Err(GameError::CannotPassOneCardLeft {
                player: self.players[next].name.clone(),
            });
        }

        self.consecutive_passes = self.consecutive_passes.saturating_add(1);
        self.record(seat, TurnAction::Pass);

        if self.consecutive_passes >= TRICK_CLOSING_PASSES {
            let leader = self.close_trick();
            return Ok(PassOutcome {
                trick_closed: true,
                next_player: leader,
            });
        }

        self.current_player_index = next;
        Ok(PassOutcome {
            trick_closed: false,
            next_player: next,
        })
    }

    /// Clear the table and hand the lead back to the owner of the last play.
    fn close_trick(&mut self) -> SeatIndex {
        let leader = self
            .last_play_player_index
            .or_else(|| self.last_play.as_ref().map(|last| last.position))
            .unwrap_or(self.current_player_index);
        self.last_play = None;
        self.consecutive_passes = 0;
        self.auto_pass_timer = None;
        self.current_player_index = leader;
        debug!("Trick closed, {} leads", self.players[leader].name);
        leader
    }

    /// The auto-pass countdown ran out: every seat still to act passes, the
    /// trick closes and the player who made the unbeatable play leads again.
    ///
    /// Returns false (after dropping any stale countdown) when there is no
    /// countdown to honour.
    pub fn expire_auto_pass(&mut self) -> bool {
        let armed = self.auto_pass_timer.is_some() && self.is_in_progress();
        let Some(leader) = self
            .last_play
            .as_ref()
            .map(|last| last.position)
            .filter(|seat| {
                armed
                    && *seat < self.players.len()
                    && self.current_player_index < self.players.len()
            })
        else {
            self.auto_pass_timer = None;
            return false;
        };

        let mut seat = self.current_player_index;
        while seat != leader {
            self.record(seat, TurnAction::AutoPass);
            seat = next_seat(seat);
        }
        self.close_trick();
        true
    }

    fn finish_match(&mut self, winner: SeatIndex) {
        let winner_id = self.players[winner].id.clone();
        let cards_left = self.card_counts();
        let points: Vec<u32> = cards_left
            .iter()
            .map(|count| points_for_cards_left(*count))
            .collect();

        for (score, points) in self.match_scores.iter_mut().zip(&points) {
            score.score = score.score.saturating_add(*points);
            score.match_points.push(*points);
        }
        self.game_round_history.push(MatchResult {
            match_number: self.current_match,
            winner_id: winner_id.clone(),
            points,
            cards_left,
        });

        self.game_ended = true;
        self.winner_id = Some(winner_id.clone());
        self.last_match_winner_id = Some(winner_id);
        self.auto_pass_timer = None;
        info!(
            "Match {} won by {}",
            self.current_match, self.players[winner].name
        );

        if self
            .match_scores
            .iter()
            .any(|score| score.score >= self.score_limit)
        {
            self.game_over = true;
            // min_by_key keeps the first minimum, so ties go to the lowest seat.
            self.final_winner_id = self
                .match_scores
                .iter()
                .min_by_key(|score| score.score)
                .map(|score| score.player_id.clone());
            info!(
                "Game {} over after {} matches, winner {:?}",
                self.id, self.current_match, self.final_winner_id
            );
        }
    }

    /// Redeal for the next match. The previous match winner leads with any
    /// card.
    ///
    /// # Errors
    ///
    /// - [`GameError::GameNotInProgress`] before a game starts or after it
    ///   is over.
    /// - [`GameError::MatchInProgress`] while the current match is running.
    pub fn start_next_match<R: Rng + ?Sized>(&mut self, rng: &mut R) -> GameResult<()> {
        match self.phase() {
            GamePhase::MatchEnded => {}
            GamePhase::InProgress => return Err(GameError::MatchInProgress),
            GamePhase::Uninitialized | GamePhase::GameOver => {
                return Err(GameError::GameNotInProgress);
            }
        }

        deal_hands(&mut self.players, rng);
        self.current_match += 1;
        self.current_player_index = self
            .last_match_winner_id
            .as_ref()
            .and_then(|id| self.players.iter().position(|player| &player.id == id))
            .unwrap_or_else(|| opening_seat(&self.players));
        self.last_play = None;
        self.last_play_player_index = None;
        self.consecutive_passes = 0;
        self.is_first_play_of_game = true;
        self.game_ended = false;
        self.winner_id = None;
        self.round_history.clear();
        self.auto_pass_timer = None;
        self.played_cards.clear();
        info!(
            "Match {} dealt, {} leads",
            self.current_match, self.players[self.current_player_index].name
        );
        Ok(())
    }
}
