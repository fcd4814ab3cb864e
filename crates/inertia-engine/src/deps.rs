//! Platform capabilities the engine depends on.
//!
//! The engine never talks to the OS directly. Hosts hand it three narrow
//! ports: a permission check, an input event source it can subscribe to,
//! and a synthesizer that injects key-downs. The macOS implementations live
//! at the bottom of this file; test doubles are in [`crate::test_support`].

use std::sync::Arc;

use crate::{KeyCode, KeyEvent, Result, Verdict};

/// Handler invoked synchronously for each raw key event. Must not block.
pub type EventHandler = Arc<dyn Fn(KeyEvent) -> Verdict + Send + Sync>;

/// Answers whether the process may intercept keyboard input.
pub trait PermissionCheck: Send + Sync {
    /// True if input interception is permitted.
    fn input_access_ok(&self) -> bool;
}

/// A live subscription to an [`EventSource`]. Dropping it must also tear it down.
pub trait Subscription: Send {
    /// Stop delivering events.
    fn unsubscribe(self: Box<Self>);
}

/// Delivers raw key-down/key-up events in platform order.
pub trait EventSource: Send + Sync {
    /// Start delivering events to `handler` until the subscription is torn down.
    fn subscribe(&self, handler: EventHandler) -> Result<Box<dyn Subscription>>;
}

/// Injects synthetic key events into the OS input stream.
pub trait Synthesizer: Send + Sync {
    /// Post one synthetic key-down for `key`.
    fn emit_key_down(&self, key: KeyCode) -> Result<()>;
}

/// The set of ports an engine is built from.
#[derive(Clone)]
pub struct Deps {
    /// Permission preflight.
    pub permissions: Arc<dyn PermissionCheck>,
    /// Raw keyboard event source.
    pub source: Arc<dyn EventSource>,
    /// Synthetic key-down injection.
    pub synth: Arc<dyn Synthesizer>,
}

#[cfg(target_os = "macos")]
pub use self::mac::{MacPermissions, MacSynthesizer, MacTapSource};

/// macOS ports backed by the `permissions`, `mac-keytap` and `keypost` crates.
#[cfg(target_os = "macos")]
mod mac {
    use std::sync::Arc;

    use super::{Deps, EventHandler, EventSource, PermissionCheck, Subscription, Synthesizer};
    use crate::{Error, EventKind, KeyCode, KeyEvent, Result, Verdict};

    /// Accessibility + Input Monitoring preflight.
    pub struct MacPermissions;

    impl PermissionCheck for MacPermissions {
        fn input_access_ok(&self) -> bool {
            permissions::check_permissions().all_granted()
        }
    }

    /// CoreGraphics session event tap.
    pub struct MacTapSource;

    /// Running tap. `KeyTap` stops its thread on drop as well.
    struct TapSubscription(mac_keytap::KeyTap);

    impl Subscription for TapSubscription {
        fn unsubscribe(self: Box<Self>) {
            self.0.stop();
        }
    }

    impl EventSource for MacTapSource {
        fn subscribe(&self, handler: EventHandler) -> Result<Box<dyn Subscription>> {
            let tap = mac_keytap::KeyTap::start(move |ev: mac_keytap::TapEvent| {
                let event = KeyEvent {
                    key: ev.keycode,
                    kind: if ev.down {
                        EventKind::KeyDown
                    } else {
                        EventKind::KeyUp
                    },
                    autorepeat: ev.autorepeat,
                };
                match handler(event) {
                    Verdict::Forward => mac_keytap::TapAction::Keep,
                    Verdict::Swallow => mac_keytap::TapAction::Drop,
                }
            })
            .map_err(|e| match e {
                mac_keytap::Error::PermissionDenied(what) => Error::PermissionDenied(what),
                other => Error::Subscribe(other.to_string()),
            })?;
            Ok(Box::new(TapSubscription(tap)))
        }
    }

    /// Posts key-downs at the HID level.
    #[derive(Default)]
    pub struct MacSynthesizer {
        /// Underlying poster.
        poster: keypost::KeyPoster,
    }

    impl Synthesizer for MacSynthesizer {
        fn emit_key_down(&self, key: KeyCode) -> Result<()> {
            self.poster
                .key_down(key)
                .map_err(|e| Error::Synthesize(e.to_string()))
        }
    }

    impl Deps {
        /// Ports for the current macOS session.
        pub fn macos() -> Self {
            Self {
                permissions: Arc::new(MacPermissions),
                source: Arc::new(MacTapSource),
                synth: Arc::new(MacSynthesizer::default()),
            }
        }
    }
}
