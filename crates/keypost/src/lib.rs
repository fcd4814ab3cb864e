//! Posts synthetic KeyDown events into the macOS HID event stream.
//!
//! Each call to [`KeyPoster::key_down`] produces exactly one plain key-down
//! for the given virtual keycode. No key-up is ever posted and the
//! auto-repeat field is left clear, so the event is indistinguishable from a
//! fresh physical press to downstream applications and event taps.
#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]
use std::sync::Arc;

use tracing::trace;

mod error;

pub use error::{Error, Result};

/// Low-level event posting seam.
pub(crate) trait Poster: Send + Sync {
    /// Post one key-down for `keycode`.
    fn post_down(&self, keycode: u16) -> Result<()>;
}

#[cfg(target_os = "macos")]
mod mac {
    use core_graphics::{
        event as cge,
        event_source::{CGEventSource, CGEventSourceStateID},
    };
    use tracing::{debug, warn};

    use crate::{Error, Poster, Result};

    /// Map a CoreGraphics construction failure to a permission error when
    /// Accessibility is missing.
    fn creation_error(fallback: Error, event: &'static str) -> Error {
        if permissions::accessibility_ok() {
            fallback
        } else {
            warn!(stage = event, "accessibility_permission_missing");
            Error::PermissionDenied("Accessibility")
        }
    }

    /// Posts through a fresh HID-state event source per event.
    pub(crate) struct MacPoster;

    impl Poster for MacPoster {
        fn post_down(&self, keycode: u16) -> Result<()> {
            let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState)
                .map_err(|_| creation_error(Error::EventSource, "event_source"))?;
            let e = cge::CGEvent::new_keyboard_event(source, cge::CGKeyCode::from(keycode), true)
                .map_err(|_| creation_error(Error::EventCreate, "event_create"))?;
            e.post(cge::CGEventTapLocation::HID);
            debug!(keycode, "posted_key_down");
            Ok(())
        }
    }
}

/// Posts synthetic key-downs to the focused application.
#[derive(Clone)]
pub struct KeyPoster {
    /// Posting backend.
    poster: Arc<dyn Poster>,
}

#[cfg(target_os = "macos")]
impl Default for KeyPoster {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyPoster {
    /// Create a poster backed by CoreGraphics.
    #[cfg(target_os = "macos")]
    pub fn new() -> Self {
        Self {
            poster: Arc::new(mac::MacPoster),
        }
    }

    /// Test helper to inject a custom poster.
    #[cfg(test)]
    pub(crate) fn with_poster(poster: Arc<dyn Poster>) -> Self {
        Self { poster }
    }

    /// Post a single key-down for `keycode`.
    pub fn key_down(&self, keycode: u16) -> Result<()> {
        trace!(keycode, "key_down");
        self.poster.post_down(keycode)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    };

    use super::*;

    struct CountingPoster {
        codes: Mutex<Vec<u16>>,
        deny: AtomicBool,
    }

    impl CountingPoster {
        fn new() -> Self {
            Self {
                codes: Mutex::new(Vec::new()),
                deny: AtomicBool::new(false),
            }
        }
        fn codes(&self) -> Vec<u16> {
            self.codes.lock().unwrap().clone()
        }
    }

    impl Poster for CountingPoster {
        fn post_down(&self, keycode: u16) -> Result<()> {
            if self.deny.load(Ordering::SeqCst) {
                return Err(Error::PermissionDenied("Accessibility"));
            }
            self.codes.lock().unwrap().push(keycode);
            Ok(())
        }
    }

    #[test]
    fn each_call_posts_one_down() {
        let poster = Arc::new(CountingPoster::new());
        let kp = KeyPoster::with_poster(poster.clone());
        kp.key_down(7).unwrap();
        kp.key_down(7).unwrap();
        kp.key_down(11).unwrap();
        assert_eq!(poster.codes(), vec![7, 7, 11]);
    }

    #[test]
    fn clones_share_the_backend() {
        let poster = Arc::new(CountingPoster::new());
        let kp = KeyPoster::with_poster(poster.clone());
        let other = kp.clone();
        kp.key_down(1).unwrap();
        other.key_down(2).unwrap();
        assert_eq!(poster.codes(), vec![1, 2]);
    }

    #[test]
    fn errors_propagate() {
        let poster = Arc::new(CountingPoster::new());
        poster.deny.store(true, Ordering::SeqCst);
        let kp = KeyPoster::with_poster(poster.clone());
        assert_eq!(
            kp.key_down(7),
            Err(Error::PermissionDenied("Accessibility"))
        );
        assert!(poster.codes().is_empty());
    }
}
