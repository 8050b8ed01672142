/// Integration tests for whole-game flows through the state manager
///
/// These tests drive games end to end: bots and a scripted human seat play
/// full matches until the score limit ends the game.
use big_two::{
    BotAi, BotPlayOptions, GameConfig, GamePhase, GameState, GameStateManager, MemoryStore,
    OPENING_CARD,
    bot::BotPlay,
    entities::{Card, TurnAction},
    find_recommended_play_with_opening,
    table::{BotDifficulty, EngineSettings},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

fn manager() -> GameStateManager {
    GameStateManager::new(Arc::new(MemoryStore::new()), EngineSettings::default())
}

fn config(bot_count: u8, difficulty: BotDifficulty, seed: u64) -> GameConfig {
    GameConfig {
        player_name: "Alice".to_string(),
        bot_count,
        bot_difficulty: difficulty,
        seed: Some(seed),
    }
}

fn ids(cards: &[Card]) -> Vec<String> {
    cards.iter().map(Card::id).collect()
}

/// Act for a non-bot seat with a bot brain, falling back to the solver.
async fn act_for_human(manager: &GameStateManager, state: &GameState, brain: &mut BotAi) {
    let seat = state.current_player_index;
    let hand = &state.players[seat].hand;
    let counts = state.card_counts();
    let play: BotPlay = brain.get_play(&BotPlayOptions {
        hand,
        last_play: state.last_play.as_ref(),
        is_first_play_of_game: state.is_first_play_of_game,
        match_number: state.current_match,
        player_card_counts: &counts,
        current_player_index: seat,
    });
    let result = match &play.cards {
        Some(cards) => manager.play_cards(&ids(cards)).await,
        None => manager.pass().await,
    };
    if result.success {
        return;
    }
    let opening = state.requires_opening_card().then_some(OPENING_CARD);
    let fallback = match find_recommended_play_with_opening(hand, state.last_play.as_ref(), opening) {
        Some(cards) => manager.play_cards(&ids(&cards)).await,
        None => manager.pass().await,
    };
    assert!(fallback.success, "fallback failed: {:?}", fallback.error);
}

async fn play_to_game_over(manager: &GameStateManager, seed: u64) -> GameState {
    let mut brain = BotAi::with_seed(BotDifficulty::Medium, seed);
    for _ in 0..50_000 {
        let state = manager.state().expect("game initialized");
        match state.phase() {
            GamePhase::GameOver => return state,
            GamePhase::MatchEnded => {
                let result = manager.start_next_match().await;
                assert!(result.success, "{:?}", result.error);
                continue;
            }
            GamePhase::InProgress | GamePhase::Uninitialized => {}
        }
        match manager.execute_bot_turn().await {
            Some(result) => assert!(result.success, "bot turn failed: {:?}", result.error),
            None => act_for_human(manager, &state, &mut brain).await,
        }
    }
    panic!("game did not finish");
}

fn assert_finished_game(state: &GameState) {
    assert!(state.game_over);
    assert_eq!(state.game_round_history.len() as u32, state.current_match);
    assert!(state.match_scores.iter().any(|s| s.score >= state.score_limit));

    let lowest = state.match_scores.iter().map(|s| s.score).min().unwrap();
    let winner = state
        .match_scores
        .iter()
        .find(|s| s.score == lowest)
        .map(|s| s.player_id.clone());
    assert_eq!(state.final_winner_id, winner);

    for result in &state.game_round_history {
        let winner_seat = state
            .players
            .iter()
            .position(|p| p.id == result.winner_id)
            .unwrap();
        assert_eq!(result.cards_left[winner_seat], 0);
        assert_eq!(result.points[winner_seat], 0);
        assert!(result.cards_left.iter().filter(|c| **c == 0).count() == 1);
    }
    for score in &state.match_scores {
        assert_eq!(score.score, score.match_points.iter().sum::<u32>());
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_game_with_each_difficulty() {
    for (seed, difficulty) in [
        (1, BotDifficulty::Easy),
        (2, BotDifficulty::Medium),
        (3, BotDifficulty::Hard),
    ] {
        let manager = manager();
        manager.initialize_game(config(3, difficulty, seed)).await.unwrap();
        let state = play_to_game_over(&manager, seed).await;
        assert_finished_game(&state);
        manager.destroy();
    }
}

#[tokio::test(start_paused = true)]
async fn test_full_game_with_guest_seats() {
    let manager = manager();
    manager
        .initialize_game(config(1, BotDifficulty::Hard, 9))
        .await
        .unwrap();
    let state = manager.state().unwrap();
    assert_eq!(state.players.iter().filter(|p| p.is_bot).count(), 1);

    let state = play_to_game_over(&manager, 9).await;
    assert_finished_game(&state);
}

#[tokio::test(start_paused = true)]
async fn test_bots_act_until_a_human_turn() {
    let manager = manager();
    manager
        .initialize_game(config(3, BotDifficulty::Medium, 4))
        .await
        .unwrap();

    // Play the opening for the human seat if it holds the 3♦.
    let state = manager.state().unwrap();
    if state.current_player_index == 0 {
        assert!(manager.play_cards(&[OPENING_CARD.id()]).await.success);
    }
    let mut bot_turns = 0;
    while let Some(result) = manager.execute_bot_turn().await {
        assert!(result.success);
        bot_turns += 1;
        assert!(bot_turns < 200);
    }
    let state = manager.state().unwrap();
    assert!(state.current_player_index == 0 || state.phase() != GamePhase::InProgress);
    assert!(state.cards_partition_deck());

    let first = &state.round_history[0];
    match &first.action {
        TurnAction::Play { cards, .. } => assert!(cards.contains(&OPENING_CARD)),
        other => panic!("first action was {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_listener_sees_every_action() {
    let manager = manager();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let subscription = manager.subscribe(move |state: &GameState| {
        counter.fetch_add(1, Ordering::SeqCst);
        sink.lock().unwrap().push(state.round_history.len());
    });

    manager
        .initialize_game(config(3, BotDifficulty::Easy, 5))
        .await
        .unwrap();
    if manager.state().unwrap().current_player_index == 0 {
        assert!(manager.play_cards(&["3D"]).await.success);
    }
    while manager.execute_bot_turn().await.is_some() {}
    subscription.unsubscribe();

    let seen = seen.lock().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), seen.len());
    assert_eq!(seen[0], 0);
    let actions = manager.state().unwrap().round_history.len();
    assert_eq!(*seen.last().unwrap(), actions);
}

#[tokio::test]
async fn test_same_seed_same_deal() {
    let first = manager();
    let second = manager();
    let a = first
        .initialize_game(config(3, BotDifficulty::Hard, 77))
        .await
        .unwrap();
    let b = second
        .initialize_game(config(3, BotDifficulty::Hard, 77))
        .await
        .unwrap();
    let hands = |state: &GameState| state.players.iter().map(|p| p.hand.clone()).collect::<Vec<_>>();
    assert_eq!(hands(&a), hands(&b));
    assert_eq!(a.current_player_index, b.current_player_index);
    assert_ne!(a.id, b.id);
}
