//! Tick Scheduler
//!
//! Runs a caller-supplied [`Hook`] on a fixed wall-clock interval on its own thread. A single
//! thread runs every invocation, so two ticks never overlap. Each tick holds the shared state
//! lock for the whole callback plus the health-effect and timed-effect passes, which orders it
//! cleanly against choice-driven mutations. The first tick fires one interval after start.
//!
//! [`TickScheduler::stop`] wakes the thread, waits for any in-flight tick to finish and joins
//! it. Dropping the scheduler does the same.
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::hook::Hook;
use crate::save_files::{SaveFormat, to_save_doc, write_doc};
use crate::shared::SharedState;

/// Where and how to write the state after each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Autosave {
    pub path: PathBuf,
    pub format: SaveFormat,
    pub session: Option<Uuid>,
}

impl Autosave {
    fn write(&self, shared: &SharedState) {
        // serialize from a copy so the lock isn't held during file IO
        let doc = shared.read(|state| to_save_doc(state, self.session));
        if let Err(e) = write_doc(&self.path, &doc, self.format) {
            warn!("autosave to {} failed: {e:#}", self.path.display());
        }
    }
}

#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

#[derive(Debug)]
pub struct TickScheduler {
    interval: Duration,
    signal: Arc<StopSignal>,
    handle: Option<JoinHandle<()>>,
}

impl TickScheduler {
    /// Spawn the tick thread.
    ///
    /// # Errors
    /// - if the OS refuses to spawn the thread
    pub fn start(shared: SharedState, tick: Hook, interval: Duration, autosave: Option<Autosave>) -> Result<Self> {
        let signal = Arc::new(StopSignal::default());
        let thread_signal = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("story-tick".into())
            .spawn(move || run_ticks(&shared, &tick, interval, &thread_signal, autosave.as_ref()))
            .context("spawning tick thread")?;
        info!("tick scheduler started (every {interval:?})");
        Ok(Self {
            interval,
            signal,
            handle: Some(handle),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop ticking and wait for the thread to exit. Calling it again does nothing.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        *self.signal.stopped.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.signal.wake.notify_all();
        if handle.join().is_err() {
            error!("tick thread panicked");
        }
        info!("tick scheduler stopped");
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_ticks(shared: &SharedState, tick: &Hook, interval: Duration, signal: &StopSignal, autosave: Option<&Autosave>) {
    loop {
        let stopped = signal.stopped.lock().unwrap_or_else(PoisonError::into_inner);
        let (stopped, _) = signal
            .wake
            .wait_timeout_while(stopped, interval, |stopped| !*stopped)
            .unwrap_or_else(PoisonError::into_inner);
        if *stopped {
            break;
        }
        drop(stopped);

        let count = shared.update(|state| {
            tick.call(state);
            let result = state.tick_health_effects();
            if let Some(cause) = result.depleted_by {
                info!("health depleted by '{cause}' during tick");
            }
            let expired = state.tick_timed_effects();
            if !expired.is_empty() {
                debug!("effects expired: {}", expired.join(", "));
            }
            state.record_tick()
        });
        debug!("tick {count} done");

        if let Some(autosave) = autosave {
            autosave.write(shared);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;
    use crate::health::HealthEffect;
    use crate::state::GameState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;
    use tempfile::tempdir;

    fn wait_until(shared: &SharedState, pred: impl Fn(&GameState) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut seen = shared.revision();
        while Instant::now() < deadline {
            if shared.read(&pred) {
                return true;
            }
            seen = shared.wait_for_change(seen, Duration::from_millis(50));
        }
        false
    }

    #[test]
    fn ticks_until_stopped() {
        let shared = SharedState::new(GameState::new(10));
        let hook = Hook::new("drain", |s: &mut GameState| {
            s.modify_hp(-1);
        });
        let mut ticker = TickScheduler::start(shared.clone(), hook, Duration::from_millis(5), None).unwrap();
        assert!(wait_until(&shared, |s| s.ticks() >= 3));
        ticker.stop();
        assert!(!ticker.is_running());

        let (ticks, hp) = shared.read(|s| (s.ticks(), s.health()));
        assert_eq!(hp, 10 - ticks as i64);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(shared.read(GameState::ticks), ticks);
    }

    #[test]
    fn ticks_never_overlap() {
        let shared = SharedState::new(GameState::new(10));
        let running = Arc::new(AtomicUsize::new(0));
        let overlaps = Arc::new(AtomicUsize::new(0));
        let (r, o) = (Arc::clone(&running), Arc::clone(&overlaps));
        let hook = Hook::new("slow", move |_: &mut GameState| {
            if r.fetch_add(1, Ordering::SeqCst) > 0 {
                o.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(10));
            r.fetch_sub(1, Ordering::SeqCst);
        });
        let mut ticker = TickScheduler::start(shared.clone(), hook, Duration::from_millis(1), None).unwrap();
        assert!(wait_until(&shared, |s| s.ticks() >= 3));
        ticker.stop();
        assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn stop_waits_for_in_flight_tick() {
        let shared = SharedState::new(GameState::new(10));
        let hook = Hook::new("slow", |s: &mut GameState| {
            thread::sleep(Duration::from_millis(40));
            s.print("tick finished");
        });
        let mut ticker = TickScheduler::start(shared.clone(), hook, Duration::from_millis(1), None).unwrap();
        thread::sleep(Duration::from_millis(10));
        ticker.stop();

        // every started tick completed: one message per counted tick
        let (ticks, messages) = shared.update(|s| (s.ticks(), s.drain_messages().len()));
        assert_eq!(ticks as usize, messages);
    }

    #[test]
    fn health_effects_advance_each_tick() {
        let mut state = GameState::new(10);
        state.add_health_effect(HealthEffect::DamageOverTime {
            cause: "poison".into(),
            amount: 2,
            times: 2,
        });
        let shared = SharedState::new(state);
        let mut ticker =
            TickScheduler::start(shared.clone(), Hook::new("noop", |_: &mut GameState| {}), Duration::from_millis(5), None)
                .unwrap();
        assert!(wait_until(&shared, |s| s.ticks() >= 3));
        ticker.stop();
        assert_eq!(shared.read(GameState::health), 6);
    }

    #[test]
    fn timed_effects_expire_on_schedule() {
        let mut state = GameState::new(10);
        state.apply_effect(Effect::new("Torchlight", 2).on_expire(Hook::new("dark", |s: &mut GameState| {
            s.set_value("dark", true);
        })));
        let shared = SharedState::new(state);
        let mut ticker =
            TickScheduler::start(shared.clone(), Hook::new("noop", |_: &mut GameState| {}), Duration::from_millis(5), None)
                .unwrap();
        assert!(wait_until(&shared, |s| s.value("dark").is_some()));
        ticker.stop();
        let (ticks, remaining) = shared.read(|s| (s.ticks(), s.effects().len()));
        assert!(ticks >= 2);
        assert_eq!(remaining, 0);
    }

    #[test]
    fn autosave_writes_after_tick() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("auto.json");
        let shared = SharedState::new(GameState::new(10));
        let autosave = Autosave {
            path: path.clone(),
            format: SaveFormat::Json,
            session: None,
        };
        let hook = Hook::new("hurt", |s: &mut GameState| {
            s.modify_hp(-1);
        });
        let mut ticker = TickScheduler::start(shared.clone(), hook, Duration::from_millis(5), Some(autosave)).unwrap();
        assert!(wait_until(&shared, |s| s.ticks() >= 2));
        ticker.stop();

        let saved = crate::save_files::load_save_file(&path).unwrap();
        assert_eq!(saved.health(), shared.read(GameState::health));
    }
}
