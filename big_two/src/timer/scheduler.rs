//! Named countdown registry on top of tokio's clock.
//!
//! Each running timer is a spawned task that ticks on a fixed period. The
//! registry maps a timer id to the task's generation and join handle; a task
//! only invokes its callbacks while it is still the registered generation for
//! its id, so a cancelled or replaced timer goes quiet even if it was already
//! mid-flight.
//!
//! Each entry also carries a cancelled flag that the task reads right before
//! every callback. On a multi-threaded runtime a callback that has already
//! passed that read when `cancel_timer` returns still runs to the end; none
//! starts afterwards.

use log::debug;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

use crate::game::constants::TICK_INTERVAL_MS;

struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
}

impl TimerEntry {
    fn stop(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.abort();
    }
}

struct Registry {
    timers: Mutex<HashMap<String, TimerEntry>>,
    next_generation: AtomicU64,
    tick_interval: Duration,
}

/// Lock a std mutex, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Registry {
    fn is_current(&self, id: &str, generation: u64) -> bool {
        lock(&self.timers)
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
    }

    /// Deregister a timer that ran to completion. Returns false when the
    /// timer was cancelled or replaced in the meantime.
    fn finish(&self, id: &str, generation: u64) -> bool {
        let mut timers = lock(&self.timers);
        if timers
            .get(id)
            .is_some_and(|entry| entry.generation == generation)
        {
            timers.remove(id);
            return true;
        }
        false
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        let timers = self
            .timers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, entry) in timers.drain() {
            entry.stop();
        }
    }
}

/// Cloneable handle to a shared timer registry.
///
/// Starting a timer spawns onto the current tokio runtime, so
/// [`TimerScheduler::start_timer`] must be called from within one.
#[derive(Clone)]
pub struct TimerScheduler {
    inner: Arc<Registry>,
}

impl Default for TimerScheduler {
    fn default() -> Self {
        Self::new(Duration::from_millis(TICK_INTERVAL_MS))
    }
}

impl TimerScheduler {
    #[must_use]
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Registry {
                timers: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                tick_interval: tick_interval.max(Duration::from_millis(1)),
            }),
        }
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.inner.tick_interval
    }

    /// Start (or restart) the countdown `id`.
    ///
    /// `on_tick` receives the remaining time on every tick before expiry;
    /// `on_complete` fires once when the countdown reaches zero. A timer
    /// already registered under `id` is cancelled first and none of its
    /// callbacks fire afterwards.
    pub fn start_timer<T, C>(&self, id: &str, duration: Duration, mut on_tick: T, on_complete: C)
    where
        T: FnMut(Duration) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::downgrade(&self.inner);
        let period = self.inner.tick_interval;
        let key = id.to_string();
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        // The entry is inserted before the lock is released, so the task
        // never observes the registry without its own entry.
        let mut timers = lock(&self.inner.timers);
        if let Some(previous) = timers.remove(id) {
            previous.stop();
            debug!("Timer {id} restarted");
        }
        let handle = tokio::spawn(async move {
            let deadline = Instant::now() + duration;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let remaining = deadline.saturating_duration_since(Instant::now());
                let Some(registry) = registry.upgrade() else {
                    return;
                };
                if remaining.is_zero() {
                    if registry.finish(&key, generation) {
                        drop(registry);
                        if !flag.load(Ordering::SeqCst) {
                            on_complete();
                        }
                    }
                    return;
                }
                if !registry.is_current(&key, generation) {
                    return;
                }
                drop(registry);
                if flag.load(Ordering::SeqCst) {
                    return;
                }
                on_tick(remaining);
            }
        });
        timers.insert(
            id.to_string(),
            TimerEntry {
                generation,
                handle,
                cancelled,
            },
        );
    }

    /// Stop `id` without firing its completion. Unknown ids are ignored.
    pub fn cancel_timer(&self, id: &str) {
        let removed = lock(&self.inner.timers).remove(id);
        if let Some(entry) = removed {
            entry.stop();
            debug!("Timer {id} cancelled");
        }
    }

    pub fn cancel_all_timers(&self) {
        let drained: Vec<TimerEntry> = lock(&self.inner.timers)
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in drained {
            entry.stop();
        }
    }

    #[must_use]
    pub fn is_timer_active(&self, id: &str) -> bool {
        lock(&self.inner.timers)
            .get(id)
            .is_some_and(|entry| !entry.handle.is_finished())
    }

    #[must_use]
    pub fn active_timer_count(&self) -> usize {
        lock(&self.inner.timers)
            .values()
            .filter(|entry| !entry.handle.is_finished())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counters() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        (Arc::new(AtomicUsize::new(0)), Arc::new(AtomicUsize::new(0)))
    }

    fn start_counting(
        scheduler: &TimerScheduler,
        id: &str,
        duration: Duration,
        ticks: &Arc<AtomicUsize>,
        completions: &Arc<AtomicUsize>,
    ) {
        let ticks = Arc::clone(ticks);
        let completions = Arc::clone(completions);
        scheduler.start_timer(
            id,
            duration,
            move |_| {
                ticks.fetch_add(1, Ordering::SeqCst);
            },
            move || {
                completions.fetch_add(1, Ordering::SeqCst);
            },
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_then_completes_once() {
        let scheduler = TimerScheduler::new(Duration::from_millis(100));
        let (ticks, completions) = counters();
        start_counting(&scheduler, "t", Duration::from_secs(1), &ticks, &completions);
        assert!(scheduler.is_timer_active("t"));

        tokio::time::sleep(Duration::from_millis(1_050)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 9);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_timer_active("t"));
        assert_eq!(scheduler.active_timer_count(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_reports_remaining_time() {
        let scheduler = TimerScheduler::new(Duration::from_millis(100));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        scheduler.start_timer(
            "t",
            Duration::from_millis(300),
            move |remaining| lock(&sink).push(remaining),
            || {},
        );
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert_eq!(
            *lock(&seen),
            vec![Duration::from_millis(200), Duration::from_millis(100)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_suppresses_completion() {
        let scheduler = TimerScheduler::new(Duration::from_millis(100));
        let (ticks, completions) = counters();
        start_counting(&scheduler, "t", Duration::from_secs(1), &ticks, &completions);

        tokio::time::sleep(Duration::from_millis(250)).await;
        scheduler.cancel_timer("t");
        scheduler.cancel_timer("t");
        let ticked = ticks.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), ticked);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
        assert!(!scheduler.is_timer_active("t"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_flag_silences_a_task_that_is_still_running() {
        let scheduler = TimerScheduler::new(Duration::from_millis(100));
        let (ticks, completions) = counters();
        start_counting(&scheduler, "t", Duration::from_millis(500), &ticks, &completions);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);

        // The task is neither aborted nor deregistered, as when a cancel lands
        // between its registry check and its callback.
        lock(&scheduler.inner.timers)["t"]
            .cancelled
            .store(true, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_fires_only_new_callbacks() {
        let scheduler = TimerScheduler::new(Duration::from_millis(100));
        let (old_ticks, old_done) = counters();
        let (new_ticks, new_done) = counters();
        start_counting(&scheduler, "t", Duration::from_millis(500), &old_ticks, &old_done);
        tokio::time::sleep(Duration::from_millis(150)).await;
        start_counting(&scheduler, "t", Duration::from_millis(500), &new_ticks, &new_done);
        let old_seen = old_ticks.load(Ordering::SeqCst);
        assert_eq!(scheduler.active_timer_count(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(old_ticks.load(Ordering::SeqCst), old_seen);
        assert_eq!(old_done.load(Ordering::SeqCst), 0);
        assert_eq!(new_done.load(Ordering::SeqCst), 1);
        assert!(new_ticks.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let scheduler = TimerScheduler::default();
        let (ticks, completions) = counters();
        start_counting(&scheduler, "a", Duration::from_secs(1), &ticks, &completions);
        start_counting(&scheduler, "b", Duration::from_secs(2), &ticks, &completions);
        assert_eq!(scheduler.active_timer_count(), 2);

        scheduler.cancel_all_timers();
        scheduler.cancel_all_timers();
        assert_eq!(scheduler.active_timer_count(), 0);

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_callback_may_cancel_its_own_timer() {
        let scheduler = TimerScheduler::new(Duration::from_millis(100));
        let completions = Arc::new(AtomicUsize::new(0));
        let ticks = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.clone();
        let tick_count = Arc::clone(&ticks);
        let done = Arc::clone(&completions);
        scheduler.start_timer(
            "self",
            Duration::from_secs(1),
            move |_| {
                tick_count.fetch_add(1, Ordering::SeqCst);
                handle.cancel_timer("self");
            },
            move || {
                done.fetch_add(1, Ordering::SeqCst);
            },
        );
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }
}
