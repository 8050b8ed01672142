//! Drives whole games through a [`GameStateManager`] with every seat
//! automated.

use anyhow::{Result, bail};
use big_two::{
    BotAi, BotPlayOptions, GamePhase, GameState, GameStateManager, OPENING_CARD, PlayResult,
    entities::Card, find_recommended_play_with_opening,
};
use log::{debug, info};
use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicBool, Ordering},
};

/// Upper bound on actions in one game before the run is declared stuck.
const MAX_ACTIONS_PER_GAME: usize = 100_000;

/// How one simulated game ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub winner_id: String,
    pub matches: u32,
    pub scores: Vec<(String, u32)>,
}

/// Wins per player id across a run
#[derive(Debug, Default)]
pub struct Tally {
    pub games: u32,
    pub wins: BTreeMap<String, u32>,
}

impl Tally {
    pub fn record(&mut self, summary: &GameSummary) {
        self.games += 1;
        *self.wins.entry(summary.winner_id.clone()).or_default() += 1;
    }
}

fn ids(cards: &[Card]) -> Vec<String> {
    cards.iter().map(Card::id).collect()
}

/// Act for a seat the manager does not control.
///
/// The autopilot brain decides first; a move the rules reject is replaced
/// by the solver's minimal play, or a pass when nothing beats the table.
async fn act_for_seat(
    manager: &GameStateManager,
    state: &GameState,
    autopilot: &mut BotAi,
) -> PlayResult {
    let seat = state.current_player_index;
    let hand = &state.players[seat].hand;
    let counts = state.card_counts();
    let choice = autopilot.get_play(&BotPlayOptions {
        hand,
        last_play: state.last_play.as_ref(),
        is_first_play_of_game: state.is_first_play_of_game,
        match_number: state.current_match,
        player_card_counts: &counts,
        current_player_index: seat,
    });
    debug!("Autopilot for seat {seat}: {}", choice.reasoning);

    let result = match &choice.cards {
        Some(cards) => manager.play_cards(&ids(cards)).await,
        None => manager.pass().await,
    };
    if result.success {
        return result;
    }

    let opening = state.requires_opening_card().then_some(OPENING_CARD);
    match find_recommended_play_with_opening(hand, state.last_play.as_ref(), opening) {
        Some(cards) => manager.play_cards(&ids(&cards)).await,
        None => manager.pass().await,
    }
}

/// Play the manager's current game until it is over.
///
/// Returns `Ok(None)` when `stop` is raised first.
///
/// # Errors
///
/// Fails when no game is initialized, when an action is rejected even after
/// the solver fallback, or when the game never finishes.
pub async fn play_game(
    manager: &GameStateManager,
    autopilot: &mut BotAi,
    stop: &AtomicBool,
) -> Result<Option<GameSummary>> {
    for _ in 0..MAX_ACTIONS_PER_GAME {
        if stop.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let Some(state) = manager.state() else {
            bail!("No game to play");
        };

        let result = match state.phase() {
            GamePhase::Uninitialized => bail!("No game to play"),
            GamePhase::GameOver => return Ok(Some(summarize(&state))),
            GamePhase::MatchEnded => {
                info!(
                    "Match {} won by {}",
                    state.current_match,
                    state.winner_id.as_deref().unwrap_or("nobody")
                );
                manager.start_next_match().await
            }
            GamePhase::InProgress => match manager.execute_bot_turn().await {
                Some(result) => result,
                None => act_for_seat(manager, &state, autopilot).await,
            },
        };
        if let Some(error) = result.error {
            bail!("Action rejected: {error}");
        }
    }
    bail!("Game did not finish within {MAX_ACTIONS_PER_GAME} actions")
}

fn summarize(state: &GameState) -> GameSummary {
    GameSummary {
        winner_id: state.final_winner_id.clone().unwrap_or_default(),
        matches: state.current_match,
        scores: state
            .match_scores
            .iter()
            .map(|score| (score.player_id.clone(), score.score))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use big_two::{
        GameConfig, MemoryStore,
        table::{BotDifficulty, EngineSettings},
    };
    use std::sync::Arc;

    fn manager(score_limit: u32) -> GameStateManager {
        let settings = EngineSettings {
            score_limit,
            ..EngineSettings::default()
        };
        GameStateManager::new(Arc::new(MemoryStore::new()), settings)
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_a_game_to_the_end() {
        let manager = manager(30);
        manager
            .initialize_game(GameConfig {
                seed: Some(11),
                ..GameConfig::default()
            })
            .await
            .unwrap();
        let mut autopilot = BotAi::with_seed(BotDifficulty::Hard, 11);

        let summary = play_game(&manager, &mut autopilot, &AtomicBool::new(false))
            .await
            .unwrap()
            .unwrap();
        assert!(summary.matches >= 1);
        assert!(summary.scores.iter().any(|(_, score)| *score >= 30));
        let lowest = summary.scores.iter().map(|(_, s)| *s).min().unwrap();
        assert!(
            summary
                .scores
                .iter()
                .any(|(id, s)| *id == summary.winner_id && *s == lowest)
        );
    }

    #[tokio::test]
    async fn test_stop_flag_ends_early() {
        let manager = manager(101);
        manager.initialize_game(GameConfig::default()).await.unwrap();
        let mut autopilot = BotAi::new(BotDifficulty::Easy);

        let outcome = play_game(&manager, &mut autopilot, &AtomicBool::new(true)).await;
        assert_eq!(outcome.unwrap(), None);
    }

    #[tokio::test]
    async fn test_requires_a_game() {
        let manager = manager(101);
        let mut autopilot = BotAi::new(BotDifficulty::Easy);
        assert!(
            play_game(&manager, &mut autopilot, &AtomicBool::new(false))
                .await
                .is_err()
        );
    }

    #[test]
    fn test_tally_counts_wins() {
        let mut tally = Tally::default();
        for winner in ["bot_1", "player", "bot_1"] {
            tally.record(&GameSummary {
                winner_id: winner.to_string(),
                matches: 3,
                scores: Vec::new(),
            });
        }
        assert_eq!(tally.games, 3);
        assert_eq!(tally.wins["bot_1"], 2);
        assert_eq!(tally.wins["player"], 1);
    }
}
