//! Auto-pass countdown: the serializable state carried in the game snapshot
//! and the tokio-backed scheduler that drives it.

pub mod scheduler;
pub mod state;

pub use scheduler::TimerScheduler;
pub use state::{
    AutoPassTimerState, create_auto_pass_timer_state, create_auto_pass_timer_state_at,
    update_timer_state, update_timer_state_at,
};
