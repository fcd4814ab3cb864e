//! CoreGraphics event tap on the current thread's run loop.
//!
//! We use `core-graphics` for the tap because its `CallbackResult::Drop` maps
//! to a NULL `CGEventRef` at the C boundary, which is the only return value
//! CoreGraphics treats as "swallow this event".

use std::{
    ffi::c_void,
    ptr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicPtr, Ordering},
    },
    time::Duration,
};

use core_foundation::{
    base::TCFType,
    mach_port::CFMachPortRef,
    runloop::{CFRunLoop, kCFRunLoopCommonModes, kCFRunLoopDefaultMode},
};
use core_graphics::event::{self as cge, CallbackResult};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{Error, Result, TapAction, TapEvent};

#[link(name = "CoreGraphics", kind = "framework")]
unsafe extern "C" {
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
}

// Minimal subset of CGEventField constants used by this module.
const FIELD_KEYBOARD_EVENT_AUTOREPEAT: u32 = 8;
const FIELD_KEYBOARD_EVENT_KEYCODE: u32 = 9;

/// How long one run-loop slice lasts before the stop flag is rechecked.
const RUN_SLICE: Duration = Duration::from_millis(250);

/// Shared control handle to stop the run loop from other threads.
pub(crate) struct SysControl {
    /// Run loop of the tap thread, once it is running.
    rl: Mutex<Option<CFRunLoop>>,
    /// Set once a stop has been requested.
    stopped: AtomicBool,
}

impl SysControl {
    /// Create a control handle with no run loop attached.
    pub(crate) fn new() -> Self {
        Self {
            rl: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    /// Record the tap thread's run loop.
    fn set_rl(&self, rl: CFRunLoop) {
        *self.rl.lock() = Some(rl);
    }

    /// True once [`SysControl::stop`] has been called.
    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Ask the tap thread to exit. Safe to call before the loop starts running.
    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(rl) = self.rl.lock().take() {
            rl.stop();
        }
    }
}

/// Enable or disable the tap behind `port`, if any.
fn set_tap_enabled(port: &AtomicPtr<c_void>, enable: bool) {
    let p = port.load(Ordering::SeqCst) as CFMachPortRef;
    if !p.is_null() {
        unsafe { CGEventTapEnable(p, enable) };
    }
}

/// Create the tap, report readiness on `ready`, and run until `ctrl` is stopped.
pub(crate) fn run_event_loop<F>(
    callback: F,
    ready: &Sender<Result<()>>,
    ctrl: &Arc<SysControl>,
) -> Result<()>
where
    F: Fn(TapEvent) -> TapAction + Send + Sync + 'static,
{
    // Preflight Input Monitoring permission.
    if !permissions::input_monitoring_ok() {
        warn!("input_monitoring_permission_missing");
        let _ = ready.send(Err(Error::PermissionDenied("Input Monitoring")));
        return Err(Error::PermissionDenied("Input Monitoring"));
    }

    // Capture for re-enabling the tap from inside the closure.
    let tap_port_ptr: Arc<AtomicPtr<c_void>> = Arc::new(AtomicPtr::new(ptr::null_mut()));

    debug!("creating_event_tap");
    let tap_port_ptr_cb = tap_port_ptr.clone();
    let tap = match cge::CGEventTap::new(
        cge::CGEventTapLocation::Session,
        cge::CGEventTapPlacement::HeadInsertEventTap,
        cge::CGEventTapOptions::Default,
        vec![cge::CGEventType::KeyDown, cge::CGEventType::KeyUp],
        move |_proxy, etype, event| match etype {
            cge::CGEventType::KeyDown | cge::CGEventType::KeyUp => {
                let down = matches!(etype, cge::CGEventType::KeyDown);
                let ev = TapEvent {
                    keycode: event.get_integer_value_field(FIELD_KEYBOARD_EVENT_KEYCODE) as u16,
                    down,
                    autorepeat: down
                        && event.get_integer_value_field(FIELD_KEYBOARD_EVENT_AUTOREPEAT) != 0,
                };
                match callback(ev) {
                    TapAction::Keep => CallbackResult::Keep,
                    TapAction::Drop => {
                        trace!(keycode = ev.keycode, "tap_drop_event");
                        CallbackResult::Drop
                    }
                }
            }
            cge::CGEventType::TapDisabledByTimeout | cge::CGEventType::TapDisabledByUserInput => {
                warn!("tap_disabled_by_os_reenabling");
                set_tap_enabled(&tap_port_ptr_cb, true);
                CallbackResult::Keep
            }
            _ => CallbackResult::Keep,
        },
    ) {
        Ok(t) => t,
        Err(_) => {
            warn!("event_tap_create_failed");
            let _ = ready.send(Err(Error::EventTapStart));
            return Err(Error::EventTapStart);
        }
    };

    // Share the CFMachPort for re-enabling inside the callback.
    tap_port_ptr.store(
        tap.mach_port().as_concrete_TypeRef() as *mut c_void,
        Ordering::SeqCst,
    );

    // Create a runloop source and start the tap on this thread's runloop.
    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(s) => s,
        Err(_) => {
            warn!("run_loop_source_create_failed");
            let _ = ready.send(Err(Error::EventTapStart));
            return Err(Error::EventTapStart);
        }
    };

    let rl = CFRunLoop::get_current();
    ctrl.set_rl(rl.clone());
    let mode = unsafe { kCFRunLoopCommonModes };
    rl.add_source(&source, mode);

    tap.enable();
    let _ = ready.send(Ok(()));
    debug!("event_tap_started_run_loop");

    // Run in slices so a stop requested before the loop spins up is not lost.
    while !ctrl.is_stopped() {
        let _ = CFRunLoop::run_in_mode(unsafe { kCFRunLoopDefaultMode }, RUN_SLICE, false);
    }

    set_tap_enabled(&tap_port_ptr, false);
    rl.remove_source(&source, mode);
    debug!("event_tap_exited");
    Ok(())
}
