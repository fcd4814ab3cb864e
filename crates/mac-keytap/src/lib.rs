//! macOS keyboard event tap.
//!
//! [`KeyTap::start`] installs a CoreGraphics session event tap for KeyDown
//! and KeyUp on a dedicated run-loop thread and invokes a callback for every
//! event, in delivery order. The callback decides whether the event is kept
//! or dropped. Synthetic events posted by this process are delivered like any
//! other event; filtering them is the caller's business.
//!
//! On other platforms this crate only exports its types.
#![warn(unsafe_op_in_unsafe_fn)]

mod error;
#[cfg(target_os = "macos")]
mod sys;

pub use error::{Error, Result};

/// A key event observed by the tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapEvent {
    /// Hardware virtual keycode (`kVK_*`).
    pub keycode: u16,
    /// True for KeyDown, false for KeyUp.
    pub down: bool,
    /// The OS marked this KeyDown as native auto-repeat.
    pub autorepeat: bool,
}

/// What the tap should do with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    /// Let the event continue to applications.
    Keep,
    /// Swallow the event.
    Drop,
}

#[cfg(target_os = "macos")]
pub use self::tap::KeyTap;

/// Thread management for the tap.
#[cfg(target_os = "macos")]
mod tap {
    use std::{
        sync::Arc,
        thread::{self, JoinHandle},
    };

    use crossbeam_channel::bounded;
    use tracing::{debug, warn};

    use crate::{
        Error, Result, TapAction, TapEvent,
        sys::{self, SysControl},
    };

    /// A running event tap. Stops and joins its thread on [`KeyTap::stop`] or drop.
    pub struct KeyTap {
        /// Handle used to stop the tap's run loop.
        ctrl: Arc<SysControl>,
        /// Run-loop thread.
        thread: Option<JoinHandle<()>>,
    }

    impl KeyTap {
        /// Install the tap and block until it is live (or failed to start).
        pub fn start<F>(callback: F) -> Result<Self>
        where
            F: Fn(TapEvent) -> TapAction + Send + Sync + 'static,
        {
            let ctrl = Arc::new(SysControl::new());
            let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
            let ctrl_thread = ctrl.clone();
            let thread = thread::Builder::new()
                .name("mac-keytap".into())
                .spawn(move || {
                    if let Err(e) = sys::run_event_loop(callback, &ready_tx, &ctrl_thread) {
                        warn!(error = %e, "event_tap_loop_failed");
                    }
                })
                .map_err(|e| Error::Thread(e.to_string()))?;

            match ready_rx.recv() {
                Ok(Ok(())) => {
                    debug!("key_tap_ready");
                    Ok(Self {
                        ctrl,
                        thread: Some(thread),
                    })
                }
                Ok(Err(e)) => {
                    let _ = thread.join();
                    Err(e)
                }
                Err(_) => {
                    let _ = thread.join();
                    Err(Error::Thread("tap thread exited before ready".into()))
                }
            }
        }

        /// Disable the tap, stop its run loop and join the thread.
        pub fn stop(mut self) {
            self.shutdown();
        }

        /// Idempotent stop used by `stop` and `Drop`.
        fn shutdown(&mut self) {
            let Some(thread) = self.thread.take() else {
                return;
            };
            self.ctrl.stop();
            if thread.join().is_err() {
                warn!("key_tap_thread_panicked");
            }
            debug!("key_tap_stopped");
        }
    }

    impl Drop for KeyTap {
        fn drop(&mut self) {
            self.shutdown();
        }
    }
}
