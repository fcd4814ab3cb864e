//! End-to-end engine behaviour against the in-process fake platform.
//!
//! All tests run on Tokio's paused clock, so sleeps advance virtual time
//! deterministically and repeat timings can be checked to the millisecond.

use std::{sync::Arc, time::Duration};

use inertia_engine::{
    Config, Deps, EventHandler, EventSource, InertiaEngine, KeyCode, KeyEvent, MaxSpeed,
    Result, Subscription, Verdict,
    test_support::{Emitted, FakePlatform, RecordingSynthesizer, StaticPermissions},
};
use tokio::time::{Instant, sleep};

const X: KeyCode = 7;
const A: KeyCode = 0;
const B: KeyCode = 11;

/// Scheduling slack allowed on virtual-clock gaps.
const SLACK_MS: u64 = 2;

fn fast_config() -> Config {
    Config {
        enabled: true,
        max_speed: MaxSpeed::Fast,
        threshold_ms: 200,
        accel_rate: 1.0,
    }
}

fn started(config: Config) -> (InertiaEngine, FakePlatform) {
    let platform = FakePlatform::new();
    let engine = InertiaEngine::new(platform.deps.clone()).expect("runtime");
    assert!(engine.start(config), "engine should start");
    (engine, platform)
}

fn gaps_ms(emits: &[Emitted]) -> Vec<u64> {
    emits
        .windows(2)
        .map(|w| (w[1].at - w[0].at).as_millis() as u64)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn held_key_accelerates_toward_fast_floor() {
    let (engine, p) = started(fast_config());
    let t0 = Instant::now();
    assert_eq!(p.source.press(X), Verdict::Forward);
    sleep(Duration::from_millis(1000)).await;
    p.source.release(X);

    let emits = p.synth.emitted_for(X);
    assert!(!emits.is_empty(), "expected synthetic repeats");
    assert!(
        emits[0].at - t0 >= Duration::from_millis(200),
        "first repeat before threshold"
    );

    let gaps = gaps_ms(&emits);
    assert!(gaps.len() > 20, "expected a sustained repeat, got {gaps:?}");
    let first = gaps[0];
    let last = *gaps.last().unwrap();
    assert!((35..=35 + SLACK_MS).contains(&first), "first gap {first}");
    assert!((12..=12 + SLACK_MS).contains(&last), "last gap {last}");
    assert!(gaps.iter().all(|&g| g >= 12), "gap below floor: {gaps:?}");
    assert!(
        gaps.windows(2).all(|w| w[1] <= w[0] + SLACK_MS),
        "gaps must shrink stepwise: {gaps:?}"
    );

    // Our own key-downs echo back and are let through without restarting.
    assert!(emits.iter().all(|e| e.echo == Some(Verdict::Forward)));
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn no_repeat_before_threshold() {
    let (engine, p) = started(fast_config());
    p.source.press(X);
    sleep(Duration::from_millis(199)).await;
    assert_eq!(p.synth.count_for(X), 0);
    sleep(Duration::from_millis(2)).await;
    assert_eq!(p.synth.count_for(X), 1);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn release_during_threshold_emits_nothing() {
    let (engine, p) = started(fast_config());
    p.source.press(X);
    sleep(Duration::from_millis(100)).await;
    p.source.release(X);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(p.synth.count_for(X), 0);
    assert_eq!(engine.live_repeat_tasks(), 0);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn release_stops_repeats_mid_wait() {
    let (engine, p) = started(fast_config());
    p.source.press(X);
    sleep(Duration::from_millis(300)).await;
    let before = p.synth.count_for(X);
    assert!(before > 0);

    p.source.release(X);
    sleep(Duration::from_millis(500)).await;
    assert_eq!(p.synth.count_for(X), before, "repeats after release");
    assert_eq!(engine.live_repeat_tasks(), 0);
    assert!(!engine.key_table().is_held(X));
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn native_autorepeat_is_suppressed_only_while_tracked() {
    let (engine, p) = started(fast_config());
    assert_eq!(p.source.autorepeat(X), Verdict::Forward);
    p.source.press(X);
    assert_eq!(p.source.autorepeat(X), Verdict::Swallow);
    p.source.release(X);
    sleep(Duration::from_millis(100)).await;
    assert_eq!(p.source.autorepeat(X), Verdict::Forward);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn late_synthetic_after_release_is_ignored() {
    let (engine, p) = started(fast_config());
    p.source.press(X);
    sleep(Duration::from_millis(250)).await;
    p.source.release(X);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(p.source.deliver(KeyEvent::down(X)), Verdict::Swallow);
    assert!(!engine.key_table().is_held(X), "late event must not restart");

    sleep(Duration::from_millis(60)).await;
    assert_eq!(p.source.press(X), Verdict::Forward);
    assert!(engine.key_table().is_held(X), "a real press after the window tracks");
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn pressing_another_key_stops_the_first() {
    let (engine, p) = started(fast_config());
    p.source.press(A);
    sleep(Duration::from_millis(300)).await;
    assert!(p.synth.count_for(A) > 0);

    p.source.press(B);
    assert!(!engine.key_table().is_held(A));
    assert!(engine.key_table().is_held(B));
    let a_count = p.synth.count_for(A);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(p.synth.count_for(A), a_count, "A kept repeating");
    assert!(p.synth.count_for(B) > 0);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn new_press_resets_hold_count() {
    let (engine, p) = started(fast_config());
    p.source.press(X);
    sleep(Duration::from_millis(600)).await;
    p.source.release(X);
    assert!(engine.key_table().get(X).unwrap().hold_count > 12);

    sleep(Duration::from_millis(100)).await;
    p.source.press(X);
    assert_eq!(engine.key_table().get(X).unwrap().hold_count, 0);
    let before = p.synth.count_for(X);
    sleep(Duration::from_millis(300)).await;
    let emits = p.synth.emitted_for(X);
    let gaps = gaps_ms(&emits[before..]);
    assert!(
        (35..=35 + SLACK_MS).contains(&gaps[0]),
        "acceleration restarts from step one: {gaps:?}"
    );
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn stop_with_two_keys_down_clears_everything() {
    let (engine, p) = started(fast_config());
    p.source.press(A);
    sleep(Duration::from_millis(250)).await;
    p.source.press(B);
    sleep(Duration::from_millis(250)).await;

    engine.stop();
    assert!(engine.key_table().is_empty());
    assert!(!p.source.is_subscribed());
    assert!(!engine.is_running());
    let (a, b) = (p.synth.count_for(A), p.synth.count_for(B));

    sleep(Duration::from_millis(100)).await;
    assert_eq!(p.synth.count_for(A), a);
    assert_eq!(p.synth.count_for(B), b);
    assert_eq!(engine.live_repeat_tasks(), 0);

    // Idempotent.
    engine.stop();
    engine.shutdown().await;
}

/// Event source whose teardown still delivers one last key-down, the way a
/// tap run loop can drain an event while it is being stopped.
struct DrainingSource {
    /// Event delivered from inside `unsubscribe`.
    last: KeyEvent,
}

/// Subscription that hands its final event to the handler before detaching.
struct DrainingSubscription {
    /// Engine handler.
    handler: EventHandler,
    /// Event delivered on teardown.
    last: KeyEvent,
}

impl Subscription for DrainingSubscription {
    fn unsubscribe(self: Box<Self>) {
        (self.handler)(self.last);
    }
}

impl EventSource for DrainingSource {
    fn subscribe(&self, handler: EventHandler) -> Result<Box<dyn Subscription>> {
        Ok(Box::new(DrainingSubscription {
            handler,
            last: self.last,
        }))
    }
}

#[tokio::test(start_paused = true)]
async fn press_arriving_during_stop_never_repeats() {
    let synth = Arc::new(RecordingSynthesizer::new());
    let deps = Deps {
        permissions: Arc::new(StaticPermissions(true)),
        source: Arc::new(DrainingSource {
            last: KeyEvent::down(9),
        }),
        synth: synth.clone(),
    };
    let engine = InertiaEngine::new(deps).unwrap();
    assert!(engine.start(fast_config()));

    engine.stop();
    assert!(!engine.is_running());
    assert!(engine.key_table().is_empty(), "table must be empty after stop");

    sleep(Duration::from_millis(2000)).await;
    assert_eq!(synth.count_for(9), 0, "repeats after stop");
    assert_eq!(engine.live_repeat_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn press_while_disabled_is_not_stuck_after_reenable() {
    let (engine, p) = started(fast_config());
    engine.update_config(Config {
        enabled: false,
        ..fast_config()
    });
    assert_eq!(p.source.press(X), Verdict::Forward);
    assert!(!engine.key_table().is_held(X));

    engine.update_config(fast_config());
    // The key is not mistaken for one of our own echoes.
    assert_eq!(p.source.autorepeat(X), Verdict::Forward);
    assert_eq!(p.source.press(X), Verdict::Forward);
    assert!(engine.key_table().is_held(X));
    sleep(Duration::from_millis(250)).await;
    assert!(p.synth.count_for(X) > 0);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn start_refuses_disabled_config_and_missing_permission() {
    let p = FakePlatform::new();
    let engine = InertiaEngine::new(p.deps.clone()).unwrap();
    assert!(!engine.start(Config::default()));
    assert!(!p.source.is_subscribed());
    assert!(!engine.is_running());

    let denied = FakePlatform::with_permission(false);
    let engine = InertiaEngine::new(denied.deps.clone()).unwrap();
    assert!(!engine.start(fast_config()));
    assert!(!denied.source.is_subscribed());

    let failing = FakePlatform::new();
    failing.source.set_failing(true);
    let engine = InertiaEngine::new(failing.deps.clone()).unwrap();
    assert!(!engine.start(fast_config()));
    assert!(!engine.is_running());

    // Retry after the platform recovers.
    failing.source.set_failing(false);
    assert!(engine.start(fast_config()));
    assert!(engine.is_running());
}

#[tokio::test(start_paused = true)]
async fn start_twice_subscribes_once() {
    let (engine, p) = started(fast_config());
    assert!(engine.start(fast_config()));
    assert_eq!(p.source.subscribe_count(), 1);
    engine.stop();
    assert!(engine.start(fast_config()));
    assert_eq!(p.source.subscribe_count(), 2);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn disabling_via_update_keeps_subscription_and_stops_repeats() {
    let (engine, p) = started(fast_config());
    p.source.press(X);
    sleep(Duration::from_millis(300)).await;

    engine.update_config(Config {
        enabled: false,
        ..fast_config()
    });
    assert!(engine.key_table().is_empty());
    assert!(p.source.is_subscribed());
    assert!(!engine.is_running());
    let frozen = p.synth.count_for(X);

    sleep(Duration::from_millis(300)).await;
    assert_eq!(p.synth.count_for(X), frozen);
    // Disabled: everything passes through, nothing is tracked.
    assert_eq!(p.source.press(B), Verdict::Forward);
    assert_eq!(p.source.autorepeat(B), Verdict::Forward);
    assert!(!engine.key_table().is_held(B));

    engine.update_config(fast_config());
    assert!(engine.is_running());
    p.source.press(B);
    sleep(Duration::from_millis(250)).await;
    assert!(p.synth.count_for(B) > 0);
    assert_eq!(p.source.subscribe_count(), 1);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn speed_change_applies_to_a_hold_in_progress() {
    let slow = Config {
        max_speed: MaxSpeed::Slow,
        ..fast_config()
    };
    let (engine, p) = started(slow);
    p.source.press(X);
    sleep(Duration::from_millis(700)).await;
    let slow_gaps = gaps_ms(&p.synth.emitted_for(X));
    assert!(slow_gaps.iter().all(|&g| g >= 50), "{slow_gaps:?}");

    engine.update_config(Config {
        max_speed: MaxSpeed::UltraFast,
        ..fast_config()
    });
    sleep(Duration::from_millis(400)).await;
    let gaps = gaps_ms(&p.synth.emitted_for(X));
    let last = *gaps.last().unwrap();
    assert!(last <= 7 + SLACK_MS, "last gap {last}");
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn zero_accel_rate_emits_once_then_waits_until_release() {
    let (engine, p) = started(Config {
        accel_rate: 0.0,
        ..fast_config()
    });
    p.source.press(X);
    sleep(Duration::from_millis(1000)).await;
    assert_eq!(p.synth.count_for(X), 1);

    p.source.release(X);
    sleep(Duration::from_millis(1)).await;
    assert_eq!(engine.live_repeat_tasks(), 0);
    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn dropping_the_engine_unsubscribes() {
    let (engine, p) = started(fast_config());
    assert!(p.source.is_subscribed());
    drop(engine);
    assert!(!p.source.is_subscribed());
    assert_eq!(p.source.press(X), Verdict::Forward);
}
