//! Inertia Engine
//!
//! Replaces the platform's fixed-rate key auto-repeat with an accelerating
//! one: the longer a key is held, the faster synthetic key-downs are posted,
//! up to a configurable cap.
//!
//! The engine sits between two platform ports. Raw key events arrive through
//! an [`EventSource`] and are classified synchronously against a shared
//! [`KeyStateTable`]; each genuine press spawns a repeat task that posts
//! key-downs through a [`Synthesizer`]. Those synthetic events come back
//! through the same event source, where the table recognizes them as our
//! own and lets them pass without restarting the hold.
//!
//! - [`InertiaEngine`]: the type you construct and drive (`start`, `stop`,
//!   `update_config`)
//! - [`Deps`]: the ports the engine is built from
//! - [`accel`]: the pure acceleration curve
use std::{
    mem,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

pub mod accel;
mod classifier;
mod config;
mod deps;
mod error;
mod event;
mod key_state;
mod scheduler;
pub mod test_support;

use parking_lot::{Mutex, RwLock};
use tokio::{runtime::Handle, time::Instant};
use tracing::{debug, info, trace, warn};

pub use classifier::{Decision, GRACE_WINDOW, classify};
pub use config::{Config, ConfigError, DEFAULT_ACCEL_RATE, DEFAULT_THRESHOLD_MS, MaxSpeed};
#[cfg(target_os = "macos")]
pub use deps::{MacPermissions, MacSynthesizer, MacTapSource};
pub use deps::{Deps, EventHandler, EventSource, PermissionCheck, Subscription, Synthesizer};
pub use error::{Error, Result};
pub use event::{EventKind, KeyCode, KeyEvent, Verdict};
pub use key_state::{KeyState, KeyStateTable};
pub use scheduler::STOP_WAIT_TIMEOUT_MS;

use scheduler::{ConfigCell, RepeatScheduler};

/// State shared between the engine handle and the event handler closure.
struct Core {
    /// Per-key repeat state.
    table: KeyStateTable,
    /// Active configuration snapshot.
    config: ConfigCell,
    /// Repeat task spawner.
    scheduler: RepeatScheduler,
    /// False once `stop` begins; the handler then forwards everything.
    active: AtomicBool,
}

impl Core {
    /// Classify one event and start a repeat task if it opens a new hold.
    fn handle(&self, event: KeyEvent) -> Verdict {
        if !self.active.load(Ordering::SeqCst) {
            return Verdict::Forward;
        }
        let config = self.config.read().clone();
        if !config.enabled {
            return Verdict::Forward;
        }
        self.track(event, &config)
    }

    /// Classify `event` under the `config` snapshot it was admitted with.
    ///
    /// A disable or stop can land between admission and classification. The
    /// live state is re-checked after the table update, and a hold opened
    /// under a stale snapshot is dropped again instead of being left held.
    fn track(&self, event: KeyEvent, config: &Config) -> Verdict {
        let decision = classify(&self.table, event, Instant::now());
        let verdict = decision.verdict();
        if let Decision::BeginTracking { cancel } = decision {
            if !self.active.load(Ordering::SeqCst) || !self.config.read().enabled {
                self.table.forget(event.key, &cancel);
                debug!(key = event.key, "inertia_stale_hold_dropped");
                return Verdict::Forward;
            }
            self.scheduler.spawn(
                event.key,
                Duration::from_millis(config.threshold_ms),
                cancel,
            );
        }
        verdict
    }
}

/// Running/stopped lifecycle.
enum Lifecycle {
    /// No subscription, table empty.
    Stopped,
    /// Subscribed to the platform event source.
    Running(Box<dyn Subscription>),
}

/// Accelerating key repeat engine.
///
/// One engine per process is the expected usage; nothing here is global, so
/// tests can build as many as they like.
pub struct InertiaEngine {
    /// Shared state reachable from the event handler.
    core: Arc<Core>,
    /// Platform ports.
    deps: Deps,
    /// Current lifecycle state.
    lifecycle: Mutex<Lifecycle>,
}

impl InertiaEngine {
    /// Create a stopped engine whose repeat tasks run on `runtime`.
    pub fn with_runtime(deps: Deps, runtime: Handle) -> Self {
        let table = KeyStateTable::new();
        let config: ConfigCell = Arc::new(RwLock::new(Arc::new(Config::default())));
        let scheduler =
            RepeatScheduler::new(runtime, table.clone(), config.clone(), deps.synth.clone());
        Self {
            core: Arc::new(Core {
                table,
                config,
                scheduler,
                active: AtomicBool::new(false),
            }),
            deps,
            lifecycle: Mutex::new(Lifecycle::Stopped),
        }
    }

    /// Create a stopped engine on the current Tokio runtime.
    pub fn new(deps: Deps) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        Ok(Self::with_runtime(deps, runtime))
    }

    /// Install `config` and, if it is enabled, subscribe to the event source.
    ///
    /// Returns false (and stays stopped) when the config is disabled, the
    /// permission check fails, or the subscription cannot be created. Calling
    /// `start` on a running engine is a no-op that returns true.
    pub fn start(&self, config: Config) -> bool {
        let mut lifecycle = self.lifecycle.lock();
        if matches!(*lifecycle, Lifecycle::Running(_)) {
            debug!("inertia_already_running");
            return true;
        }

        let enabled = config.enabled;
        *self.core.config.write() = Arc::new(config);
        if !enabled {
            debug!("inertia_start_skipped_disabled");
            return false;
        }

        if !self.deps.permissions.input_access_ok() {
            warn!("inertia_permission_missing");
            return false;
        }

        self.core.active.store(true, Ordering::SeqCst);
        let core = self.core.clone();
        let handler: EventHandler = Arc::new(move |event| core.handle(event));
        match self.deps.source.subscribe(handler) {
            Ok(sub) => {
                *lifecycle = Lifecycle::Running(sub);
                info!("inertia_started");
                true
            }
            Err(e) => {
                self.core.active.store(false, Ordering::SeqCst);
                warn!(error = %e, "inertia_subscribe_failed");
                false
            }
        }
    }

    /// Unsubscribe, cancel every repeat and clear the table. Idempotent.
    ///
    /// The subscription is torn down first: events still in flight on the
    /// delivery thread are forwarded untouched, and anything they managed to
    /// track before the handler went inactive is cleared afterwards.
    pub fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock();
        let Lifecycle::Running(sub) = mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        else {
            return;
        };
        self.core.active.store(false, Ordering::SeqCst);
        sub.unsubscribe();
        self.core.table.clear();
        info!("inertia_stopped");
    }

    /// [`stop`](Self::stop), then wait (bounded) for repeat tasks to exit.
    pub async fn shutdown(&self) {
        self.stop();
        self.core.table.clear();
        self.core.scheduler.drain().await;
    }

    /// Replace the active configuration.
    ///
    /// Disabling cancels every repeat and clears the table but keeps the event
    /// subscription: a disabled engine forwards everything untouched, and
    /// re-enabling needs no new subscription. Enabling a stopped engine does
    /// not start it; call [`start`](Self::start).
    pub fn update_config(&self, config: Config) {
        let enabled = config.enabled;
        *self.core.config.write() = Arc::new(config);
        if !enabled {
            self.core.table.clear();
            debug!("inertia_disabled_repeats_cleared");
        }
        trace!(enabled, "inertia_config_updated");
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> Arc<Config> {
        self.core.config.read().clone()
    }

    /// True when subscribed and the active config is enabled.
    pub fn is_running(&self) -> bool {
        matches!(*self.lifecycle.lock(), Lifecycle::Running(_)) && self.core.config.read().enabled
    }

    /// Classify one raw key event. This is the subscription handler; hosts
    /// that own their own event loop can call it directly.
    pub fn handle_event(&self, event: KeyEvent) -> Verdict {
        self.core.handle(event)
    }

    /// The key table, for inspection.
    pub fn key_table(&self) -> &KeyStateTable {
        &self.core.table
    }

    /// Number of repeat tasks that have not yet exited.
    pub fn live_repeat_tasks(&self) -> usize {
        self.core.scheduler.live_tasks()
    }
}

impl Drop for InertiaEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
