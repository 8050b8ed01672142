//! Auto-pass countdown state carried inside the game snapshot.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::game::{constants::AUTO_PASS_DURATION_MS, entities::LastPlay};

/// Countdown started when a play is proven unbeatable.
///
/// Timestamps are Unix epoch milliseconds so the state survives a
/// persistence round trip unchanged.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AutoPassTimerState {
    pub active: bool,
    /// Seat id of the player whose play started the countdown.
    pub player_id: String,
    pub started_at: i64,
    pub duration_ms: u64,
    pub remaining_ms: u64,
    pub triggering_play: LastPlay,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Fresh countdown of the standard length, started now.
#[must_use]
pub fn create_auto_pass_timer_state(triggering_play: LastPlay, player_id: &str) -> AutoPassTimerState {
    create_auto_pass_timer_state_at(triggering_play, player_id, now_ms(), AUTO_PASS_DURATION_MS)
}

#[must_use]
pub fn create_auto_pass_timer_state_at(
    triggering_play: LastPlay,
    player_id: &str,
    started_at: i64,
    duration_ms: u64,
) -> AutoPassTimerState {
    AutoPassTimerState {
        active: true,
        player_id: player_id.to_string(),
        started_at,
        duration_ms,
        remaining_ms: duration_ms,
        triggering_play,
    }
}

/// Recompute the remaining time against the wall clock.
#[must_use]
pub fn update_timer_state(state: &AutoPassTimerState) -> AutoPassTimerState {
    update_timer_state_at(state, now_ms())
}

/// Recompute the remaining time as of `now` (epoch ms). The countdown
/// deactivates once it reaches zero.
#[must_use]
pub fn update_timer_state_at(state: &AutoPassTimerState, now: i64) -> AutoPassTimerState {
    let elapsed = u64::try_from(now.saturating_sub(state.started_at)).unwrap_or(0);
    let remaining_ms = state.duration_ms.saturating_sub(elapsed);
    AutoPassTimerState {
        remaining_ms,
        active: state.active && remaining_ms > 0,
        ..state.clone()
    }
}
