//! Per-key repeat state shared by the classifier and the repeat tasks.
//!
//! The table is the only source of truth for "this key is being repeated by
//! us". A single lock guards every entry; contention is bounded by the
//! handful of keys a person can hold at once.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::KeyCode;

/// Repeat state for one physical key.
#[derive(Debug, Clone)]
pub struct KeyState {
    /// True from a tracked press until its release (or a forced stop).
    pub held: bool,
    /// Synthetic repeats emitted during the current hold.
    pub hold_count: u32,
    /// Cancellation for the repeat task of the current hold.
    pub cancel: CancellationToken,
    /// When the key was last released or force-stopped.
    pub last_release: Option<Instant>,
}

impl KeyState {
    /// True if the key was released less than `window` before `now`.
    pub fn released_within(&self, now: Instant, window: Duration) -> bool {
        !self.held
            && self
                .last_release
                .is_some_and(|at| now.saturating_duration_since(at) < window)
    }

    /// Mark released at `now` and cancel the repeat task.
    ///
    /// Returns false if the token had already been cancelled.
    fn release(&mut self, now: Instant) -> bool {
        self.held = false;
        self.last_release = Some(now);
        close(&self.cancel)
    }
}

/// Cancel `token` unless it is already cancelled. Returns true if this call closed it.
fn close(token: &CancellationToken) -> bool {
    if token.is_cancelled() {
        return false;
    }
    token.cancel();
    true
}

/// Concurrent map from key code to [`KeyState`].
#[derive(Clone, Default)]
pub struct KeyStateTable {
    /// All tracked keys.
    keys: Arc<RwLock<HashMap<KeyCode, KeyState>>>,
}

impl KeyStateTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the state for `key`, if it has ever been tracked.
    pub fn get(&self, key: KeyCode) -> Option<KeyState> {
        self.keys.read().get(&key).cloned()
    }

    /// True if `key` is currently held under our control.
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.keys.read().get(&key).is_some_and(|s| s.held)
    }

    /// Number of keys currently held.
    pub fn held_count(&self) -> usize {
        self.keys.read().values().filter(|s| s.held).count()
    }

    /// True if no key has any state.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Begin a new hold cycle for `key` and return its cancellation token.
    ///
    /// Any previous cycle's token is cancelled first, and the hold count resets.
    pub fn create_or_reset(&self, key: KeyCode) -> CancellationToken {
        let token = CancellationToken::new();
        let mut keys = self.keys.write();
        match keys.get_mut(&key) {
            Some(state) => {
                close(&state.cancel);
                state.held = true;
                state.hold_count = 0;
                state.cancel = token.clone();
            }
            None => {
                keys.insert(
                    key,
                    KeyState {
                        held: true,
                        hold_count: 0,
                        cancel: token.clone(),
                        last_release: None,
                    },
                );
            }
        }
        token
    }

    /// Record a release of `key` at `now`. Returns false if the key was never tracked.
    pub fn mark_released(&self, key: KeyCode, now: Instant) -> bool {
        let mut keys = self.keys.write();
        let Some(state) = keys.get_mut(&key) else {
            return false;
        };
        let closed = state.release(now);
        trace!(key, closed, "stop_key");
        true
    }

    /// Release every held key other than `except`. Returns the keys stopped.
    pub fn stop_all(&self, except: KeyCode, now: Instant) -> Vec<KeyCode> {
        let mut keys = self.keys.write();
        let mut stopped = Vec::new();
        for (&key, state) in keys.iter_mut() {
            if key != except && state.held {
                state.release(now);
                stopped.push(key);
                trace!(key, new_key = except, "stop_other_key");
            }
        }
        stopped
    }

    /// Cancel every repeat task and forget all keys.
    pub fn clear(&self) {
        let mut keys = self.keys.write();
        for state in keys.values() {
            close(&state.cancel);
        }
        keys.clear();
    }

    /// Drop the hold cycle owned by `token` as if it never started.
    ///
    /// The entry is removed without stamping a release time, so the next
    /// press of `key` is tracked normally. A newer cycle is left untouched.
    /// Returns true if an entry was removed.
    pub(crate) fn forget(&self, key: KeyCode, token: &CancellationToken) -> bool {
        let mut keys = self.keys.write();
        close(token);
        // A held entry with a cancelled token can only be the cycle we just
        // closed; newer cycles carry a live token.
        let owned = keys
            .get(&key)
            .is_some_and(|s| s.held && s.cancel.is_cancelled());
        if owned {
            keys.remove(&key);
        }
        owned
    }

    /// Count one more synthetic repeat for the hold owning `token`.
    ///
    /// Returns the new hold count, or `None` if the key is no longer held or
    /// `token` belongs to a finished hold cycle.
    pub(crate) fn advance(&self, key: KeyCode, token: &CancellationToken) -> Option<u32> {
        let mut keys = self.keys.write();
        let state = keys.get_mut(&key)?;
        if !state.held || token.is_cancelled() {
            return None;
        }
        state.hold_count += 1;
        Some(state.hold_count)
    }
}
