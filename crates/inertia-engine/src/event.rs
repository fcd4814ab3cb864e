//! Keyboard events as seen by the engine.

/// Platform virtual key code (on macOS, the `kVK_*` hardware keycode).
pub type KeyCode = u16;

/// Press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Key pressed (including platform auto-repeat and our own synthetic repeats).
    KeyDown,
    /// Key released.
    KeyUp,
}

/// One raw keyboard event delivered by the platform event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    /// Which key.
    pub key: KeyCode,
    /// Press or release.
    pub kind: EventKind,
    /// The platform flagged this key-down as its own native auto-repeat.
    pub autorepeat: bool,
}

impl KeyEvent {
    /// A physical (non-repeat) key-down.
    pub const fn down(key: KeyCode) -> Self {
        Self {
            key,
            kind: EventKind::KeyDown,
            autorepeat: false,
        }
    }

    /// A key-down the platform marked as auto-repeat.
    pub const fn autorepeat(key: KeyCode) -> Self {
        Self {
            key,
            kind: EventKind::KeyDown,
            autorepeat: true,
        }
    }

    /// A key-up.
    pub const fn up(key: KeyCode) -> Self {
        Self {
            key,
            kind: EventKind::KeyUp,
            autorepeat: false,
        }
    }
}

/// What the event source should do with the event after classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Deliver the event to applications.
    Forward,
    /// Drop the event.
    Swallow,
}
