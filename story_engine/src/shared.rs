//! Lock-guarded game state shared between the player's turn and the tick thread.
//!
//! All mutation goes through [`SharedState::update`], which holds the one state lock for the
//! whole closure and bumps the revision counter afterwards. Presenters can block on
//! [`SharedState::wait_for_change`] instead of polling.
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::state::GameState;

#[derive(Debug)]
struct Inner {
    state: Mutex<GameState>,
    revision: Mutex<u64>,
    changed: Condvar,
}

/// Cheaply cloneable handle to a session's game state.
#[derive(Debug, Clone)]
pub struct SharedState {
    inner: Arc<Inner>,
}

impl SharedState {
    pub fn new(state: GameState) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                revision: Mutex::new(0),
                changed: Condvar::new(),
            }),
        }
    }

    /// Run `f` with exclusive access to the state, then signal a change.
    ///
    /// The guard is dropped on every exit path, unwinding included; a lock poisoned by a
    /// panicking hook is recovered rather than propagated.
    pub fn update<R>(&self, f: impl FnOnce(&mut GameState) -> R) -> R {
        let result = {
            let mut guard = self.lock();
            f(&mut *guard)
        };
        self.bump();
        result
    }

    /// Like [`SharedState::update`], but a change is only signalled when `f` succeeds.
    pub fn try_update<R, E>(&self, f: impl FnOnce(&mut GameState) -> Result<R, E>) -> Result<R, E> {
        let result = {
            let mut guard = self.lock();
            f(&mut *guard)
        };
        if result.is_ok() {
            self.bump();
        }
        result
    }

    /// Run `f` with read access to the state. No change is signalled.
    pub fn read<R>(&self, f: impl FnOnce(&GameState) -> R) -> R {
        let guard = self.lock();
        f(&*guard)
    }

    /// Clone the whole state under the lock.
    pub fn snapshot(&self) -> GameState {
        self.read(GameState::clone)
    }

    /// Swap in a complete new state.
    pub fn replace(&self, state: GameState) {
        self.update(|current| *current = state);
    }

    /// Number of committed updates so far.
    pub fn revision(&self) -> u64 {
        *self.inner.revision.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the revision moves past `seen` or `timeout` elapses. Returns the current
    /// revision either way.
    pub fn wait_for_change(&self, seen: u64, timeout: Duration) -> u64 {
        let guard = self.inner.revision.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = self
            .inner
            .changed
            .wait_timeout_while(guard, timeout, |rev| *rev <= seen)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    fn lock(&self) -> MutexGuard<'_, GameState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self) {
        let mut rev = self.inner.revision.lock().unwrap_or_else(PoisonError::into_inner);
        *rev += 1;
        self.inner.changed.notify_all();
    }
}
