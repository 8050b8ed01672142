//! Game state manager: the single owner of the authoritative `GameState`.
//!
//! Every public mutation takes an async operation lock for its whole
//! duration (transition, persistence, notification), so mutations never
//! interleave. The state itself sits behind a short-lived synchronous mutex
//! that the auto-pass timer's tick callback can use without awaiting.

use chrono::Utc;
use log::{debug, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        Arc, Mutex, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use super::{
    config::{EngineSettings, GameConfig},
    storage::{StateStore, StorageResult},
};
use crate::{
    bot::{BotAi, BotPlayOptions},
    game::{
        constants::{AUTO_PASS_TIMER_ID, OPENING_CARD},
        entities::{Card, SeatIndex},
        solver::find_recommended_play_with_opening,
        state_machine::{GameError, GamePhase, GameResult, GameState, PlayResult},
    },
    table::config::BotDifficulty,
    timer::{
        TimerScheduler, create_auto_pass_timer_state_at, scheduler::lock, update_timer_state,
    },
};

/// State change callback
pub type Listener = Arc<dyn Fn(&GameState) + Send + Sync>;

struct Shared {
    state: Mutex<Option<GameState>>,
    ops: tokio::sync::Mutex<()>,
    listeners: Mutex<BTreeMap<u64, Listener>>,
    next_listener_id: AtomicU64,
    /// Bumped whenever the auto-pass countdown starts or is cancelled; stale
    /// callbacks compare against it and bail out.
    auto_pass_epoch: AtomicU64,
    timers: TimerScheduler,
    store: Arc<dyn StateStore>,
    settings: EngineSettings,
    rng: Mutex<StdRng>,
    bots: Mutex<HashMap<SeatIndex, BotAi>>,
}

/// Handle returned by [`GameStateManager::subscribe`].
///
/// Dropping the handle keeps the listener registered; call
/// [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    id: u64,
    shared: Weak<Shared>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(shared) = self.shared.upgrade() {
            lock(&shared.listeners).remove(&self.id);
        }
    }
}

/// Cloneable handle to one game.
#[derive(Clone)]
pub struct GameStateManager {
    shared: Arc<Shared>,
}

impl Shared {
    fn snapshot(&self) -> Option<GameState> {
        lock(&self.state).clone()
    }

    fn notify(&self, state: &GameState) {
        let listeners: Vec<Listener> = lock(&self.listeners).values().cloned().collect();
        for listener in listeners {
            listener(state);
        }
    }

    async fn try_persist(&self, state: &GameState) -> StorageResult<()> {
        let payload = serde_json::to_string(state)?;
        self.store.set(&self.settings.storage_key, payload).await
    }

    async fn persist(&self, state: &GameState) {
        if let Err(e) = self.try_persist(state).await {
            warn!("Failed to save game {}: {e}", state.id);
        }
    }

    /// Read and check the saved game. A snapshot that parses but breaks the
    /// table invariants is rejected rather than adopted.
    async fn try_load(&self) -> StorageResult<Option<GameState>> {
        let Some(payload) = self.store.get(&self.settings.storage_key).await? else {
            return Ok(None);
        };
        let state: GameState = serde_json::from_str(&payload)?;
        state.validate()?;
        Ok(Some(state))
    }

    async fn commit(&self, state: GameState) {
        self.persist(&state).await;
        self.notify(&state);
    }

    fn cancel_auto_pass_timer(&self) {
        self.auto_pass_epoch.fetch_add(1, Ordering::SeqCst);
        self.timers.cancel_timer(AUTO_PASS_TIMER_ID);
    }

    fn start_auto_pass_timer(self: &Arc<Self>, duration: Duration) {
        let epoch = self.auto_pass_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let on_tick = {
            let shared = Arc::downgrade(self);
            move |remaining: Duration| {
                if let Some(shared) = shared.upgrade() {
                    shared.on_auto_pass_tick(epoch, remaining);
                }
            }
        };
        let on_complete = {
            let shared = Arc::downgrade(self);
            move || {
                if let Some(shared) = shared.upgrade() {
                    tokio::spawn(async move { shared.expire_auto_pass(epoch).await });
                }
            }
        };
        self.timers
            .start_timer(AUTO_PASS_TIMER_ID, duration, on_tick, on_complete);
    }

    fn on_auto_pass_tick(&self, epoch: u64, remaining: Duration) {
        let snapshot = {
            let mut guard = lock(&self.state);
            let Some(state) = guard.as_mut() else {
                return;
            };
            if self.auto_pass_epoch.load(Ordering::SeqCst) != epoch {
                return;
            }
            if state.game_ended || state.game_over {
                state.auto_pass_timer = None;
                self.cancel_auto_pass_timer();
                state.clone()
            } else {
                let Some(timer) = state.auto_pass_timer.as_mut() else {
                    return;
                };
                timer.remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
                timer.active = timer.remaining_ms > 0;
                state.clone()
            }
        };
        self.notify(&snapshot);
    }

    async fn expire_auto_pass(&self, epoch: u64) {
        let _ops = self.ops.lock().await;
        let snapshot = {
            let mut guard = lock(&self.state);
            let Some(state) = guard.as_mut() else {
                return;
            };
            if self.auto_pass_epoch.load(Ordering::SeqCst) != epoch || !state.expire_auto_pass() {
                return;
            }
            state.clone()
        };
        if let Some(leader) = snapshot.current_player() {
            info!("Auto-pass expired, {} leads again", leader.name);
        }
        self.commit(snapshot).await;
    }

    async fn play_locked<S: AsRef<str>>(self: &Arc<Self>, card_ids: &[S]) -> GameResult<()> {
        let (snapshot, countdown) = {
            let mut guard = lock(&self.state);
            let state = guard.as_mut().ok_or(GameError::GameNotInProgress)?;
            let outcome = state.play(card_ids)?;
            // Any new play supersedes a running countdown.
            self.cancel_auto_pass_timer();

            let mut countdown = None;
            if outcome.unbeatable
                && let Some(last) = state.last_play.clone()
            {
                let player_id = state.players[last.position].id.clone();
                state.auto_pass_timer = Some(create_auto_pass_timer_state_at(
                    last,
                    &player_id,
                    Utc::now().timestamp_millis(),
                    self.settings.auto_pass_duration_ms,
                ));
                countdown = Some(self.settings.auto_pass_duration());
                debug!("Unbeatable play by {player_id}, auto-pass countdown started");
            }
            (state.clone(), countdown)
        };
        if let Some(duration) = countdown {
            self.start_auto_pass_timer(duration);
        }
        self.commit(snapshot).await;
        Ok(())
    }

    async fn pass_locked(&self) -> GameResult<()> {
        let snapshot = {
            let mut guard = lock(&self.state);
            let state = guard.as_mut().ok_or(GameError::GameNotInProgress)?;
            let outcome = state.pass()?;
            if outcome.trick_closed {
                self.cancel_auto_pass_timer();
            }
            state.clone()
        };
        self.commit(snapshot).await;
        Ok(())
    }

    /// Minimal legal play for the current seat, as card ids.
    fn solver_play(&self) -> Option<Vec<String>> {
        let guard = lock(&self.state);
        let state = guard.as_ref()?;
        let player = state.current_player()?;
        let opening = state.requires_opening_card().then_some(OPENING_CARD);
        find_recommended_play_with_opening(&player.hand, state.last_play.as_ref(), opening)
            .map(|cards| cards.iter().map(Card::id).collect())
    }

    fn new_bot(&self, difficulty: BotDifficulty) -> BotAi {
        let seed: u64 = lock(&self.rng).random();
        BotAi::with_seed(difficulty, seed)
    }

    fn decide_bot_move(&self) -> Option<Option<Vec<String>>> {
        let guard = lock(&self.state);
        let state = guard.as_ref()?;
        if !state.is_in_progress() {
            return None;
        }
        let seat = state.current_player_index;
        let player = state.current_player()?;
        if !player.is_bot {
            return None;
        }
        let difficulty = player.bot_difficulty.unwrap_or(BotDifficulty::Medium);
        let counts = state.card_counts();

        let mut bots = lock(&self.bots);
        let bot = bots
            .entry(seat)
            .or_insert_with(|| self.new_bot(difficulty));
        let play = bot.get_play(&BotPlayOptions {
            hand: &player.hand,
            last_play: state.last_play.as_ref(),
            is_first_play_of_game: state.is_first_play_of_game,
            match_number: state.current_match,
            player_card_counts: &counts,
            current_player_index: seat,
        });
        Some(play.cards.map(|cards| cards.iter().map(Card::id).collect()))
    }
}

impl GameStateManager {
    pub fn new(store: Arc<dyn StateStore>, settings: EngineSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(None),
                ops: tokio::sync::Mutex::new(()),
                listeners: Mutex::new(BTreeMap::new()),
                next_listener_id: AtomicU64::new(0),
                auto_pass_epoch: AtomicU64::new(0),
                timers: TimerScheduler::new(settings.tick_interval()),
                store,
                settings,
                rng: Mutex::new(StdRng::from_rng(&mut rand::rng())),
                bots: Mutex::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.shared.settings
    }

    /// Seat, shuffle and deal a new game, replacing any current one.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] for a rejected configuration; the
    /// current game (if any) is left untouched.
    pub async fn initialize_game(&self, config: GameConfig) -> GameResult<GameState> {
        let _ops = self.shared.ops.lock().await;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        let state = GameState::deal(&config, self.shared.settings.score_limit, &mut rng)?;

        self.shared.cancel_auto_pass_timer();
        self.shared.timers.cancel_all_timers();
        lock(&self.shared.bots).clear();
        *lock(&self.shared.rng) = rng;
        *lock(&self.shared.state) = Some(state.clone());
        info!(
            "Game {} initialized for {} with {} {} bots",
            state.id, config.player_name, config.bot_count, config.bot_difficulty
        );

        self.shared.commit(state.clone()).await;
        Ok(state)
    }

    /// Play the given card ids for the current seat.
    pub async fn play_cards<S: AsRef<str>>(&self, card_ids: &[S]) -> PlayResult {
        let _ops = self.shared.ops.lock().await;
        let result = self.shared.play_locked(card_ids).await;
        if let Err(e) = &result {
            debug!("Play rejected: {e}");
        }
        result.into()
    }

    /// Pass the current seat's turn.
    pub async fn pass(&self) -> PlayResult {
        let _ops = self.shared.ops.lock().await;
        let result = self.shared.pass_locked().await;
        if let Err(e) = &result {
            debug!("Pass rejected: {e}");
        }
        result.into()
    }

    /// Let the bot in the current seat act.
    ///
    /// Returns `None` when there is no running game or the current seat is
    /// not a bot. A bot move the rules reject is replaced by the solver's
    /// minimal play (or a pass when nothing beats the table).
    pub async fn execute_bot_turn(&self) -> Option<PlayResult> {
        let _ops = self.shared.ops.lock().await;
        let decision = self.shared.decide_bot_move()?;

        let result = match &decision {
            Some(ids) => self.shared.play_locked(ids).await,
            None => self.shared.pass_locked().await,
        };
        let result = match result {
            Err(e) => {
                warn!("Bot move rejected ({e}), falling back to the minimal play");
                match self.shared.solver_play() {
                    Some(ids) => self.shared.play_locked(&ids).await,
                    None => self.shared.pass_locked().await,
                }
            }
            ok => ok,
        };
        Some(result.into())
    }

    /// Deal the next match once the current one has a winner.
    pub async fn start_next_match(&self) -> PlayResult {
        let _ops = self.shared.ops.lock().await;
        let result = {
            let mut guard = lock(&self.shared.state);
            match guard.as_mut() {
                None => Err(GameError::GameNotInProgress),
                Some(state) => {
                    let mut rng = lock(&self.shared.rng);
                    state.start_next_match(&mut *rng).map(|()| state.clone())
                }
            }
        };
        match result {
            Ok(snapshot) => {
                self.shared.cancel_auto_pass_timer();
                self.shared.commit(snapshot).await;
                PlayResult::ok()
            }
            Err(e) => e.into(),
        }
    }

    /// Snapshot of the current game.
    #[must_use]
    pub fn state(&self) -> Option<GameState> {
        self.shared.snapshot()
    }

    #[must_use]
    pub fn phase(&self) -> GamePhase {
        lock(&self.shared.state)
            .as_ref()
            .map_or(GamePhase::Uninitialized, GameState::phase)
    }

    #[must_use]
    pub fn is_auto_pass_running(&self) -> bool {
        self.shared.timers.is_timer_active(AUTO_PASS_TIMER_ID)
    }

    /// Register a listener called with a snapshot after every change.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&GameState) + Send + Sync + 'static,
    {
        let id = self.shared.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.shared.listeners).insert(id, Arc::new(listener));
        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Persist the current game. Storage failures are logged and ignored.
    pub async fn save_state(&self) {
        if let Some(state) = self.shared.snapshot() {
            self.shared.persist(&state).await;
        }
    }

    /// Read the persisted game, if there is a readable and consistent one.
    pub async fn load_state(&self) -> Option<GameState> {
        self.shared
            .try_load()
            .await
            .inspect_err(|e| warn!("Discarding saved game: {e}"))
            .ok()
            .flatten()
    }

    pub async fn clear_state(&self) {
        if let Err(e) = self.shared.store.remove(&self.shared.settings.storage_key).await {
            warn!("Failed to clear saved game: {e}");
        }
    }

    /// Adopt the persisted game as the current one. A countdown that was
    /// still running when the game was saved resumes with its remaining time.
    ///
    /// Returns false when there is nothing to restore.
    pub async fn restore(&self) -> bool {
        let _ops = self.shared.ops.lock().await;
        let Some(mut state) = self.load_state().await else {
            return false;
        };

        self.shared.cancel_auto_pass_timer();
        self.shared.timers.cancel_all_timers();
        lock(&self.shared.bots).clear();

        let mut countdown = None;
        if let Some(timer) = state.auto_pass_timer.take()
            && state.is_in_progress()
        {
            let timer = update_timer_state(&timer);
            countdown = Some(Duration::from_millis(
                timer.remaining_ms.max(self.shared.settings.tick_interval_ms),
            ));
            state.auto_pass_timer = Some(timer);
        }

        *lock(&self.shared.state) = Some(state.clone());
        if let Some(duration) = countdown {
            self.shared.start_auto_pass_timer(duration);
        }
        info!("Game {} restored at match {}", state.id, state.current_match);
        self.shared.notify(&state);
        true
    }

    /// Stop every timer and drop every listener. The game state and the
    /// persisted snapshot are kept.
    pub fn destroy(&self) {
        self.shared.cancel_auto_pass_timer();
        self.shared.timers.cancel_all_timers();
        lock(&self.shared.listeners).clear();
        debug!("Game state manager destroyed");
    }
}
