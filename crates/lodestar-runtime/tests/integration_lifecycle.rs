//! Boot deferral, stop coalescing, frame handoff and teardown driven through
//! the public adapter API.

mod common;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use common::{FakeFrontend, FakeHost, adapter, game, running_adapter};
use lodestar_runtime::{BootOrigin, BootRequest, BootStatus};
use proptest::prelude::*;

#[test]
fn boot_waits_for_context_and_runs_once() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = adapter();

    assert!(adapter.load_game(&frontend, Some(game()), true));
    assert!(!adapter.is_running());
    adapter.tick(&frontend);
    adapter.tick(&frontend);
    assert!(log.lock().boots.is_empty());
    assert_eq!(frontend.log.lock().placeholders, 2);

    adapter.context_reset(Arc::new(FakeHost));
    adapter.tick(&frontend);
    adapter.tick(&frontend);

    let log = log.lock();
    assert_eq!(log.boots.len(), 1);
    assert_eq!(log.boots[0].origin, BootOrigin::Plain);
    assert_eq!(log.boots[0].target, game());
    assert!(adapter.is_running());
    assert!(log.pumps >= 1);
}

#[test]
fn boot_is_immediate_when_ready() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = adapter();
    adapter.context_reset(Arc::new(FakeHost));

    assert_eq!(
        adapter.request_boot(BootRequest::plain(game())),
        Ok(BootStatus::Booted)
    );
    assert_eq!(
        adapter.request_boot(BootRequest::plain("/games/other.iso")),
        Ok(BootStatus::Deferred)
    );
    adapter.tick(&frontend);
    assert_eq!(log.lock().boots.len(), 1);
}

#[test]
fn load_requires_path_and_hardware_rendering() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = adapter();
    adapter.context_reset(Arc::new(FakeHost));

    assert!(!adapter.load_game(&frontend, None, true));
    assert!(!adapter.load_game(&frontend, Some(game()), false));
    assert!(log.lock().boots.is_empty());

    adapter.tick(&frontend);
    assert_eq!(frontend.log.lock().placeholders, 1);
}

#[test]
fn stop_requests_coalesce() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = running_adapter(&frontend);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let stop = adapter.stop_handle();
            thread::spawn(move || {
                for _ in 0..10 {
                    stop.request_stop();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    adapter.tick(&frontend);
    adapter.tick(&frontend);
    assert_eq!(log.lock().stops, 1);
    assert!(!adapter.is_running());
}

#[test]
fn boot_failure_leaves_adapter_idle() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = adapter();
    log.lock().fail_boot = true;
    adapter.context_reset(Arc::new(FakeHost));

    assert!(!adapter.load_game(&frontend, Some(game()), true));
    assert!(!adapter.is_running());
    adapter.tick(&frontend);
    assert_eq!(log.lock().boots.len(), 1);
    assert_eq!(frontend.log.lock().placeholders, 1);
}

#[test]
fn presented_frames_reach_the_host_only_while_ready() {
    let frontend = FakeFrontend::default();
    let (mut adapter, _log) = running_adapter(&frontend);

    let capabilities = adapter.gate().capabilities();
    assert!(capabilities.present(1280, 960));
    assert!(capabilities.present(1920, 1584));
    adapter.tick(&frontend);
    assert_eq!(frontend.log.lock().hw_frames, [(1920, 1584)]);

    adapter.context_destroy();
    assert!(!capabilities.present(640, 528));
    assert!(!adapter.gate().capabilities().present(640, 528));
    adapter.tick(&frontend);
    assert_eq!(frontend.log.lock().hw_frames.len(), 1);
    assert_eq!(frontend.log.lock().placeholders, 0);
}

#[test]
fn frames_from_a_destroyed_context_are_never_submitted() {
    let frontend = FakeFrontend::default();
    let (mut adapter, _log) = running_adapter(&frontend);

    let held = adapter.gate().capabilities();
    let stop = Arc::new(AtomicBool::new(false));
    let renderer = {
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Acquire) {
                held.present(111, 111);
            }
        })
    };

    for _ in 0..100 {
        adapter.context_destroy();
        adapter.tick(&frontend);
        adapter.context_reset(Arc::new(FakeHost));
        adapter.tick(&frontend);
    }
    stop.store(true, Ordering::Release);
    renderer.join().unwrap();

    let frames = frontend.log.lock().hw_frames.clone();
    assert!(frames.is_empty(), "stale frames submitted: {frames:?}");

    assert!(adapter.gate().capabilities().present(640, 528));
    adapter.tick(&frontend);
    assert_eq!(frontend.log.lock().hw_frames.last(), Some(&(640, 528)));
}

#[test]
fn pads_reach_the_core_while_running() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = running_adapter(&frontend);
    adapter.tick(&frontend);
    adapter.tick(&frontend);
    assert_eq!(log.lock().pads, 2);
    assert_eq!(frontend.log.lock().polls, 2);
}

#[test]
fn option_changes_reach_the_core() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = running_adapter(&frontend);
    let before = log.lock().settings.len();

    frontend.set("lodestar_internal_resolution", "2x");
    adapter.tick(&frontend);
    let log = log.lock();
    assert_eq!(log.settings.len(), before + 1);
    assert_eq!(log.settings.last().unwrap().internal_resolution, 2);
}

#[test]
fn enabled_cheat_forces_cheats_on() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = running_adapter(&frontend);
    assert!(!adapter.options().core().cheats);

    adapter.cheat_set(2, true, "04001234 00000063").unwrap();
    assert!(adapter.cheat_set(0, true, "garbage").is_err());
    assert!(adapter.options().core().cheats);

    let guard = log.lock();
    assert!(guard.settings.last().unwrap().cheats);
    assert_eq!(guard.cheats.last().unwrap().len(), 1);
    drop(guard);

    adapter.cheat_reset();
    assert!(log.lock().cheats.last().unwrap().is_empty());
}

#[test]
fn unload_returns_to_idle() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = running_adapter(&frontend);
    adapter.unload_game();
    assert!(!adapter.is_running());
    assert_eq!(log.lock().stops, 1);
    adapter.tick(&frontend);
    assert_eq!(log.lock().boots.len(), 1);
}

#[test]
fn teardown_is_idempotent() {
    let frontend = FakeFrontend::default();
    let (mut adapter, log) = running_adapter(&frontend);
    assert!(adapter.is_audio_alive());

    adapter.teardown();
    adapter.teardown();
    assert!(!adapter.is_audio_alive());
    assert!(!adapter.gate().is_ready());
    assert!(!adapter.is_running());
    assert_eq!(log.lock().stops, 1);
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Reset,
    Destroy,
    Tick,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Reset), Just(Step::Destroy), Just(Step::Tick)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn deferred_boot_happens_at_first_ready_tick(steps in prop::collection::vec(step(), 0..24)) {
        let frontend = FakeFrontend::default();
        let (mut adapter, log) = adapter();
        prop_assert!(adapter.load_game(&frontend, Some(game()), true));

        let mut ready = false;
        let mut expect_boot = false;
        for step in steps {
            match step {
                Step::Reset => {
                    adapter.context_reset(Arc::new(FakeHost));
                    ready = true;
                }
                Step::Destroy => {
                    adapter.context_destroy();
                    ready = false;
                }
                Step::Tick => {
                    adapter.tick(&frontend);
                    expect_boot |= ready;
                }
            }
            prop_assert_eq!(adapter.gate().is_ready(), ready);
        }
        prop_assert_eq!(log.lock().boots.len(), usize::from(expect_boot));
        prop_assert_eq!(adapter.is_running(), expect_boot);
    }
}
