//! Integration tests for the scheduler, clock and reactive values
//!
//! These tests verify that:
//! - Values set from inside phase jobs see the frame timestamp as "now"
//! - Velocity survives across ticks and decays after the tracking window
//! - Completion futures resolve from scheduled work
//! - Config loaded from TOML changes runtime behavior

use motio_core::{
    AnimationControls, AnimationOutcome, Completion, ManualTime, MotionConfig, Phase,
    ReactiveValue, SchedulerHandle, Value, ValueEvent,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// A value moved 0 -> 10 sixteen milliseconds ago reports 625 units/sec
#[test]
fn test_velocity_after_sixteen_ms() {
    let time = ManualTime::new(0.0);
    let scheduler = SchedulerHandle::with_time(time.clone());
    let value = ReactiveValue::new(&scheduler, 0.0);

    time.set(16.0);
    scheduler.end_turn();
    value.set(10.0);
    assert!((value.velocity() - 625.0).abs() < 1e-6);

    time.set(56.0);
    scheduler.end_turn();
    assert_eq!(value.velocity(), 0.0);
}

/// Updates driven from update-phase jobs use frame timestamps
#[test]
fn test_frame_driven_updates_track_velocity() {
    let scheduler = SchedulerHandle::with_time(ManualTime::new(0.0));
    let value = ReactiveValue::new(&scheduler, 0.0);

    let driven = value.clone();
    scheduler.schedule(
        Phase::Update,
        motio_core::Job::new(move |frame| driven.set(frame.timestamp / 2.0)),
        true,
        false,
    );

    scheduler.tick(16.0);
    scheduler.tick(32.0);

    assert_eq!(value.get(), Value::Number(16.0));
    assert_eq!(value.updated_at(), 32.0);
    // 8 units over 16ms
    let velocity = Rc::new(Cell::new(0.0));
    let velocity_clone = velocity.clone();
    let reader = value.clone();
    scheduler.schedule_fn(Phase::Read, move |_| velocity_clone.set(reader.velocity()));
    scheduler.tick(48.0);
    // The read phase runs before this tick's update, 16ms after the last set
    assert!((velocity.get() - 500.0).abs() < 1e-6);
}

/// Render listeners fire for every set, change listeners only on change
#[test]
fn test_render_requests_from_jobs() {
    let scheduler = SchedulerHandle::with_time(ManualTime::new(0.0));
    let value = ReactiveValue::new(&scheduler, "0px");
    let rendered = Rc::new(RefCell::new(Vec::new()));

    let rendered_clone = rendered.clone();
    let _sub = value.on(ValueEvent::RenderRequest, move |v| {
        rendered_clone.borrow_mut().push(v.to_string());
    });

    let target = value.clone();
    scheduler.schedule_fn(Phase::Update, move |_| target.set("10px"));
    scheduler.tick(16.0);

    assert_eq!(*rendered.borrow(), vec!["10px".to_string()]);
}

struct ScheduledFinish {
    completion: Completion,
}

impl AnimationControls for ScheduledFinish {
    fn stop(&self) {
        self.completion.resolve(AnimationOutcome::Cancelled);
    }
    fn cancel(&self) {
        self.stop();
    }
    fn complete(&self) {
        self.completion.resolve(AnimationOutcome::Finished);
    }
    fn finished(&self) -> Completion {
        self.completion.clone()
    }
}

/// A completion resolved in a later tick can be awaited afterwards
#[test]
fn test_completion_resolved_by_scheduler() {
    let scheduler = SchedulerHandle::with_time(ManualTime::new(0.0));
    let value = ReactiveValue::new(&scheduler, 0.0);

    let handle = scheduler.clone();
    let finished = value.start_animation(move |completion| {
        let controls = Rc::new(ScheduledFinish { completion });
        let finisher = controls.clone();
        handle.schedule_fn(Phase::PostRender, move |_| finisher.complete());
        controls
    });

    assert!(value.is_animating());
    scheduler.tick(16.0);

    assert_eq!(pollster::block_on(finished.wait()), AnimationOutcome::Finished);
    assert!(!value.is_animating());
}

/// Config from TOML narrows the velocity window
#[test]
fn test_config_changes_velocity_window() {
    let config = MotionConfig::from_toml_str("max_velocity_delta_ms = 10.0").unwrap();
    let time = ManualTime::new(0.0);
    let scheduler = SchedulerHandle::new(config, Rc::new(time.clone()));
    let value = ReactiveValue::new(&scheduler, 0.0);

    time.set(8.0);
    scheduler.end_turn();
    value.set(4.0);
    assert!((value.velocity() - 500.0).abs() < 1e-6);

    time.set(20.0);
    scheduler.end_turn();
    assert_eq!(value.velocity(), 0.0);
}

/// Clock stays put within a turn even as the host advances
#[test]
fn test_clock_stable_within_turn() {
    let time = ManualTime::new(5.0);
    let scheduler = SchedulerHandle::with_time(time.clone());

    let first = scheduler.now();
    time.set(9.0);
    assert_eq!(scheduler.now(), first);

    scheduler.end_turn();
    assert_eq!(scheduler.now(), 9.0);
}
