//! In-process port implementations for tests and tools.
//! Nothing here touches the OS.

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::{
    Deps, Error, EventHandler, EventSource, KeyCode, KeyEvent, PermissionCheck, Result,
    Subscription, Synthesizer, Verdict,
};

/// Permission check with a fixed answer.
pub struct StaticPermissions(pub bool);

impl PermissionCheck for StaticPermissions {
    fn input_access_ok(&self) -> bool {
        self.0
    }
}

/// Event source driven by the test. Holds at most one subscriber.
#[derive(Default)]
pub struct FakeEventSource {
    /// Current subscriber.
    handler: Arc<Mutex<Option<EventHandler>>>,
    /// When set, `subscribe` fails.
    fail: AtomicBool,
    /// Successful subscriptions so far.
    subscribes: AtomicUsize,
}

/// Clears the fake source's handler when torn down.
struct FakeSubscription {
    /// Slot shared with the source.
    handler: Arc<Mutex<Option<EventHandler>>>,
}

impl Subscription for FakeSubscription {
    fn unsubscribe(self: Box<Self>) {
        self.handler.lock().take();
    }
}

impl FakeEventSource {
    /// A source whose subscriptions succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `subscribe` calls fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// True while a subscriber is attached.
    pub fn is_subscribed(&self) -> bool {
        self.handler.lock().is_some()
    }

    /// Successful subscriptions so far.
    pub fn subscribe_count(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    /// Deliver `event` to the subscriber. Without one the event is forwarded untouched.
    pub fn deliver(&self, event: KeyEvent) -> Verdict {
        let handler = self.handler.lock().clone();
        match handler {
            Some(h) => h(event),
            None => Verdict::Forward,
        }
    }

    /// Physical press of `key`.
    pub fn press(&self, key: KeyCode) -> Verdict {
        self.deliver(KeyEvent::down(key))
    }

    /// Native auto-repeat of `key`.
    pub fn autorepeat(&self, key: KeyCode) -> Verdict {
        self.deliver(KeyEvent::autorepeat(key))
    }

    /// Release of `key`.
    pub fn release(&self, key: KeyCode) -> Verdict {
        self.deliver(KeyEvent::up(key))
    }
}

impl EventSource for FakeEventSource {
    fn subscribe(&self, handler: EventHandler) -> Result<Box<dyn Subscription>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Subscribe("fake source set to fail".into()));
        }
        *self.handler.lock() = Some(handler);
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSubscription {
            handler: self.handler.clone(),
        }))
    }
}

/// One synthetic key-down seen by [`RecordingSynthesizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Emitted {
    /// Key posted.
    pub key: KeyCode,
    /// Virtual-clock time of the post.
    pub at: Instant,
    /// What the event source answered for the echoed event, if echoing.
    pub echo: Option<Verdict>,
}

/// Synthesizer that records every post and can loop it back into a source.
#[derive(Default)]
pub struct RecordingSynthesizer {
    /// Everything emitted, in order.
    emitted: Mutex<Vec<Emitted>>,
    /// Source to re-inject posted events into, mimicking the OS loopback.
    echo: Option<Arc<FakeEventSource>>,
}

impl RecordingSynthesizer {
    /// Record only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and feed each post back into `source` as a key-down.
    pub fn echoing(source: Arc<FakeEventSource>) -> Self {
        Self {
            emitted: Mutex::new(Vec::new()),
            echo: Some(source),
        }
    }

    /// All posts so far.
    pub fn emitted(&self) -> Vec<Emitted> {
        self.emitted.lock().clone()
    }

    /// Posts for `key`.
    pub fn emitted_for(&self, key: KeyCode) -> Vec<Emitted> {
        self.emitted
            .lock()
            .iter()
            .filter(|e| e.key == key)
            .copied()
            .collect()
    }

    /// Number of posts for `key`.
    pub fn count_for(&self, key: KeyCode) -> usize {
        self.emitted.lock().iter().filter(|e| e.key == key).count()
    }
}

impl Synthesizer for RecordingSynthesizer {
    fn emit_key_down(&self, key: KeyCode) -> Result<()> {
        let at = Instant::now();
        let echo = self.echo.as_ref().map(|src| src.press(key));
        self.emitted.lock().push(Emitted { key, at, echo });
        Ok(())
    }
}

/// A [`Deps`] bundle of fakes plus handles to drive and inspect them.
pub struct FakePlatform {
    /// Ports to build the engine from.
    pub deps: Deps,
    /// Test-driven event source.
    pub source: Arc<FakeEventSource>,
    /// Recorder for synthetic posts (echoing into `source`).
    pub synth: Arc<RecordingSynthesizer>,
}

impl FakePlatform {
    /// Fakes with permission granted and synthetic posts echoed back.
    pub fn new() -> Self {
        Self::with_permission(true)
    }

    /// Fakes with the given permission answer.
    pub fn with_permission(granted: bool) -> Self {
        let source = Arc::new(FakeEventSource::new());
        let synth = Arc::new(RecordingSynthesizer::echoing(source.clone()));
        let deps = Deps {
            permissions: Arc::new(StaticPermissions(granted)),
            source: source.clone(),
            synth: synth.clone(),
        };
        Self {
            deps,
            source,
            synth,
        }
    }
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self::new()
    }
}
