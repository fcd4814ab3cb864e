//! Simple permission checks for the inertia key-repeat tools.
//!
//! This crate exposes a minimal API to query whether the process has the
//! Accessibility and Input Monitoring permissions needed to observe keyboard
//! events and post synthetic ones. There is no prompting logic here: the host
//! is responsible for guiding the user to System Settings if permissions are
//! missing.
//!
//! On platforms other than macOS every check reports `false`.
//!
//! All calls are fast and side-effect free.

#[cfg(target_os = "macos")]
#[link(name = "ApplicationServices", kind = "framework")]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn CGPreflightListenEventAccess() -> bool;
}

/// Check if the application is trusted for Accessibility (needed to post events).
pub fn accessibility_ok() -> bool {
    #[cfg(target_os = "macos")]
    {
        unsafe { AXIsProcessTrusted() }
    }
    #[cfg(not(target_os = "macos"))]
    {
        false
    }
}

/// Check if the application has the "Input Monitoring" permission.
///
/// Returns `true` when the process is allowed to listen for keyboard events
/// (CGEvent tap), and `false` otherwise.
pub fn input_monitoring_ok() -> bool {
    #[cfg(target_os = "macos")]
    {
        unsafe { CGPreflightListenEventAccess() }
    }
    #[cfg(not(target_os = "macos"))]
    {
        false
    }
}

/// Current permission status for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionsStatus {
    /// Accessibility (AX) permission; `true` if granted.
    pub accessibility_ok: bool,
    /// Input Monitoring permission; `true` if granted.
    pub input_ok: bool,
}

impl PermissionsStatus {
    /// True when both permissions are granted.
    pub fn all_granted(&self) -> bool {
        self.accessibility_ok && self.input_ok
    }

    /// Human-readable names of the permissions that are missing.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if !self.accessibility_ok {
            out.push("Accessibility");
        }
        if !self.input_ok {
            out.push("Input Monitoring");
        }
        out
    }
}

/// Query both Accessibility and Input Monitoring permissions.
///
/// This is a convenience wrapper over [`accessibility_ok`] and
/// [`input_monitoring_ok`]. The function performs no prompting and has no
/// side effects.
pub fn check_permissions() -> PermissionsStatus {
    PermissionsStatus {
        accessibility_ok: accessibility_ok(),
        input_ok: input_monitoring_ok(),
    }
}
