//! Repeat scheduler: one cancellable task per held key.
//!
//! Each hold cycle gets a task that waits out the threshold, then loops:
//! check the key is still ours and the engine enabled, bump the hold count,
//! ask the acceleration curve for the next interval, post a synthetic
//! key-down, and sleep. Every wait races the hold's cancellation token, so
//! a release is observed no later than the end of the current wait.
//!
//! Only key-downs are ever posted. A synthetic key-up would come back
//! through the event tap as a release and end the hold.

use std::{collections::HashMap, sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
use tokio::{runtime::Handle, task::JoinHandle, time};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::{Config, KeyCode, KeyStateTable, Synthesizer, accel};

/// Maximum time to wait for a repeat task to acknowledge cancellation.
pub const STOP_WAIT_TIMEOUT_MS: u64 = 50;

/// Shared, swappable configuration snapshot.
pub(crate) type ConfigCell = Arc<RwLock<Arc<Config>>>;

/// Spawns and tracks repeat tasks.
#[derive(Clone)]
pub(crate) struct RepeatScheduler {
    /// Runtime the tasks run on. Spawns arrive from the event tap thread.
    runtime: Handle,
    /// Key table shared with the classifier.
    table: KeyStateTable,
    /// Live configuration.
    config: ConfigCell,
    /// Where synthetic key-downs go.
    synth: Arc<dyn Synthesizer>,
    /// Latest task per key. Replaced tasks finish on their own once cancelled.
    tasks: Arc<Mutex<HashMap<KeyCode, JoinHandle<()>>>>,
}

impl RepeatScheduler {
    /// Create a scheduler spawning onto `runtime`.
    pub(crate) fn new(
        runtime: Handle,
        table: KeyStateTable,
        config: ConfigCell,
        synth: Arc<dyn Synthesizer>,
    ) -> Self {
        Self {
            runtime,
            table,
            config,
            synth,
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start the repeat task for a new hold of `key`.
    pub(crate) fn spawn(&self, key: KeyCode, initial_delay: Duration, cancel: CancellationToken) {
        let task = RepeatTask {
            key,
            initial_delay,
            cancel,
            table: self.table.clone(),
            config: self.config.clone(),
            synth: self.synth.clone(),
        };
        let handle = self.runtime.spawn(task.run());
        let mut tasks = self.tasks.lock();
        tasks.retain(|_, h| !h.is_finished());
        tasks.insert(key, handle);
    }

    /// Number of repeat tasks that have not yet exited.
    pub(crate) fn live_tasks(&self) -> usize {
        self.tasks
            .lock()
            .values()
            .filter(|h| !h.is_finished())
            .count()
    }

    /// Wait (bounded) for every tracked task to exit. Tasks must already be cancelled.
    pub(crate) async fn drain(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut tasks = self.tasks.lock();
            tasks.drain().map(|(_, h)| h).collect()
        };
        for handle in handles {
            if time::timeout(Duration::from_millis(STOP_WAIT_TIMEOUT_MS), handle)
                .await
                .is_err()
            {
                warn!("repeat_task_stop_timeout");
            }
        }
        trace!("scheduler_drained");
    }
}

/// State moved into one repeat task.
struct RepeatTask {
    /// Key being repeated.
    key: KeyCode,
    /// Threshold before the first repeat.
    initial_delay: Duration,
    /// Cancellation for this hold cycle.
    cancel: CancellationToken,
    /// Shared key table.
    table: KeyStateTable,
    /// Live configuration.
    config: ConfigCell,
    /// Output port.
    synth: Arc<dyn Synthesizer>,
}

impl RepeatTask {
    /// Sleep for `dur` unless cancelled first. Returns false on cancellation.
    async fn wait(&self, dur: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = time::sleep(dur) => true,
        }
    }

    /// Drive the hold until release, cancellation or disable.
    async fn run(self) {
        let key = self.key;
        trace!(
            key,
            initial_delay_ms = self.initial_delay.as_millis() as u64,
            "repeat_start"
        );
        if !self.wait(self.initial_delay).await {
            trace!(key, "repeat_cancelled_early");
            return;
        }
        trace!(key, "repeat_delay_done");

        loop {
            let config = self.config.read().clone();
            if !config.enabled {
                trace!(key, "repeat_stopped_disabled");
                return;
            }
            let Some(hold_count) = self.table.advance(key, &self.cancel) else {
                trace!(key, "repeat_stopped_released");
                return;
            };
            let interval = accel::next_interval(hold_count, &config);
            trace!(
                key,
                hold_count,
                interval_ms = interval.as_millis() as u64,
                "repeat_post"
            );

            if let Err(e) = self.synth.emit_key_down(key) {
                warn!(key, error = %e, "repeat_post_failed");
            }

            if !self.wait(interval).await {
                trace!(key, "repeat_stopped_signal");
                return;
            }
        }
    }
}
