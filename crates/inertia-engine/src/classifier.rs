//! Event classification: decide what happens to each raw key event.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::{EventKind, KeyEvent, KeyStateTable, Verdict};

/// Window after a release during which a key-down is taken to be a late
/// synthetic event rather than a new press.
pub const GRACE_WINDOW: Duration = Duration::from_millis(50);

/// Outcome of classifying one raw key event.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Drop the event: native auto-repeat for a key we repeat ourselves.
    Suppress,
    /// Let the event through unchanged.
    PassThrough,
    /// Drop the event: a stale synthetic key-down racing its key's release.
    Ignore,
    /// A genuine new press. Other held keys were stopped and a new hold
    /// cycle was opened; the caller must start its repeat task.
    BeginTracking {
        /// Cancellation for the new hold cycle.
        cancel: CancellationToken,
    },
}

impl Decision {
    /// How the event source should treat the original event.
    pub fn verdict(&self) -> Verdict {
        match self {
            Self::Suppress | Self::Ignore => Verdict::Swallow,
            Self::PassThrough | Self::BeginTracking { .. } => Verdict::Forward,
        }
    }
}

/// Classify `event` against the key table, applying the table updates the
/// decision implies.
///
/// Runs on the platform's event delivery thread, in delivery order. Only
/// takes the table lock; never waits.
///
/// - key-up: mark released, stamp the release time, cancel the repeat task.
/// - auto-repeat of a held key: suppress (we generate our own repeats).
/// - auto-repeat of an untracked key: pass through.
/// - key-down of a held key: our own synthetic repeat echoing back, pass
///   through without restarting.
/// - key-down within [`GRACE_WINDOW`] of its release: ignore.
/// - otherwise: stop every other held key, then open a new hold cycle.
pub fn classify(table: &KeyStateTable, event: KeyEvent, now: Instant) -> Decision {
    let key = event.key;
    if event.kind == EventKind::KeyUp {
        trace!(key, "event_keyup");
        table.mark_released(key, now);
        return Decision::PassThrough;
    }

    let state = table.get(key);
    let held = state.as_ref().is_some_and(|s| s.held);
    let recently_released = state
        .as_ref()
        .is_some_and(|s| s.released_within(now, GRACE_WINDOW));
    trace!(
        key,
        autorepeat = event.autorepeat,
        held,
        recently_released,
        "event_keydown"
    );

    if event.autorepeat {
        if held {
            trace!(key, "suppress_autorepeat");
            return Decision::Suppress;
        }
        trace!(key, "passthrough_untracked_autorepeat");
        return Decision::PassThrough;
    }
    if held {
        trace!(key, "passthrough_synthetic");
        return Decision::PassThrough;
    }
    if recently_released {
        trace!(key, "ignore_late_synthetic");
        return Decision::Ignore;
    }

    table.stop_all(key, now);
    let cancel = table.create_or_reset(key);
    trace!(key, "start_tracking");
    Decision::BeginTracking { cancel }
}
