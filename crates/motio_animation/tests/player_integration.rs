//! Integration tests for players bound to elements and values
//!
//! These tests verify that:
//! - Compositor-eligible animations are handed off natively, everything else ticks in software
//! - Native failures either fall back to software or abort cleanly
//! - Stopping native playback hands its velocity back to the value
//! - Start times follow the resolution budget on both paths
//! - Interrupting an animation carries its velocity into the next one
//! - Stopping from a change listener on the final frame skips completion

mod support;

use motio_animation::player::{NativeEasing, PlaybackDirection};
use motio_animation::{
    animate_element, animate_value, AnimationOptions, AnimationType, Easing, PlayState, PlaybackPath, RepeatType,
    SpringOptions,
};
use motio_core::{AnimationOutcome, ElementAdapter, ReactiveValue, ValueEvent};
use std::cell::Cell;
use std::rc::Rc;
use support::{Harness, MockCompositor, TestElement};

fn element(opacity: f64) -> Rc<dyn ElementAdapter> {
    TestElement::new().with_style("opacity", opacity)
}

#[test]
fn test_opacity_runs_on_compositor() {
    let compositor = MockCompositor::new();
    let harness = Harness::with_compositor(&compositor);
    let target = element(0.0);

    let animation = animate_element(
        &harness.ctx,
        &target,
        "opacity",
        AnimationOptions::to(1.0).duration(400.0).ease(Easing::EaseIn),
    );
    let player = animation.player().expect("player").clone();
    assert_eq!(player.path(), PlaybackPath::Pending);

    harness.frame(0.0);
    assert_eq!(player.path(), PlaybackPath::Native);
    assert_eq!(player.state(), PlayState::Running);

    let native = compositor.last().expect("native animation");
    assert_eq!(native.name, "opacity");
    assert_eq!(native.keyframes.len(), 2);
    assert_eq!(native.options.duration, 400.0);
    assert_eq!(native.options.easing, NativeEasing::EaseIn);
    assert_eq!(native.options.iterations, 1.0);
    assert_eq!(native.start_time(), Some(0.0));

    compositor.advance_to(400.0);
    let value = target.get_value("opacity").expect("value");
    assert_eq!(value.get_number(), Some(1.0));
    assert!(native.is_cancelled());
    assert_eq!(
        pollster::block_on(animation.finished().wait()),
        AnimationOutcome::Finished
    );
    assert!(!value.is_animating());
}

#[test]
fn test_spring_is_baked_for_compositor() {
    let compositor = MockCompositor::new();
    let harness = Harness::with_compositor(&compositor);
    let target = element(0.0);

    animate_element(
        &harness.ctx,
        &target,
        "opacity",
        AnimationOptions::to(1.0).spring(SpringOptions::physics(400.0, 30.0, 1.0)),
    );
    harness.frame(0.0);

    let native = compositor.last().expect("native animation");
    assert!(native.keyframes.len() > 2);
    assert_eq!(native.options.easing, NativeEasing::Linear);
    let last = native.keyframes.last().and_then(|k| k.as_number()).expect("number");
    assert!((last - 1.0).abs() < 0.02);
    // Sampled every 10ms
    assert_eq!(
        native.options.duration,
        (native.keyframes.len() - 1) as f64 * 10.0
    );
}

#[test]
fn test_reverse_repeat_maps_to_alternate() {
    let compositor = MockCompositor::new();
    let harness = Harness::with_compositor(&compositor);
    let target = element(0.0);

    animate_element(
        &harness.ctx,
        &target,
        "opacity",
        AnimationOptions::to(1.0)
            .duration(100.0)
            .repeat(3, RepeatType::Reverse),
    );
    harness.frame(0.0);

    let native = compositor.last().expect("native animation");
    assert_eq!(native.options.iterations, 4.0);
    assert_eq!(native.options.direction, PlaybackDirection::Alternate);

    compositor.advance_to(400.0);
    assert_eq!(target.get_value("opacity").and_then(|v| v.get_number()), Some(0.0));
}

#[test]
fn test_ineligible_animations_tick_in_software() {
    let compositor = MockCompositor::new();
    let harness = Harness::with_compositor(&compositor);

    // Not on the allow-list
    let target = element(0.0);
    let x = animate_element(&harness.ctx, &target, "x", AnimationOptions::to(10.0).duration(100.0));

    // Per-frame hook requested
    let updates = Rc::new(Cell::new(0));
    let counter = updates.clone();
    let faded = element(0.0);
    let opacity = animate_element(
        &harness.ctx,
        &faded,
        "opacity",
        AnimationOptions::to(1.0)
            .duration(100.0)
            .on_update(move |_| counter.set(counter.get() + 1)),
    );

    // Mirrored repeats
    let mirrored = element(0.0);
    let mirror = animate_element(
        &harness.ctx,
        &mirrored,
        "opacity",
        AnimationOptions::to(1.0).duration(100.0).repeat(1, RepeatType::Mirror),
    );

    harness.frame(0.0);
    for animation in [&x, &opacity, &mirror] {
        assert_eq!(animation.player().map(|p| p.path()), Some(PlaybackPath::Software));
    }
    assert!(compositor.animations().is_empty());

    harness.frames(16.0, 208.0);
    assert_eq!(target.get_value("x").and_then(|v| v.get_number()), Some(10.0));
    assert!(updates.get() > 5);
    assert_eq!(mirrored.get_value("opacity").and_then(|v| v.get_number()), Some(0.0));
}

#[test]
fn test_unsupported_host_falls_back() {
    let compositor = MockCompositor::new();
    compositor.disable("filter");
    let harness = Harness::with_compositor(&compositor);

    let target: Rc<dyn ElementAdapter> = TestElement::new().with_style("filter", "blur(0px)");
    let blur = animate_element(
        &harness.ctx,
        &target,
        "filter",
        AnimationOptions::to("blur(10px)").duration(100.0),
    );

    compositor.refuse.set(true);
    let faded = element(0.0);
    let opacity = animate_element(&harness.ctx, &faded, "opacity", AnimationOptions::to(1.0).duration(100.0));

    harness.frame(0.0);
    assert_eq!(blur.player().map(|p| p.path()), Some(PlaybackPath::Software));
    assert_eq!(opacity.player().map(|p| p.path()), Some(PlaybackPath::Software));

    harness.frames(16.0, 112.0);
    let filter = target.get_value("filter").expect("filter").get();
    assert_eq!(filter.as_text(), Some("blur(10px)"));
    assert_eq!(opacity.finished().outcome(), Some(AnimationOutcome::Finished));
}

#[test]
fn test_detached_element_cancels() {
    let compositor = MockCompositor::new();
    compositor.detached.set(true);
    let harness = Harness::with_compositor(&compositor);
    let target = element(0.5);

    let animation = animate_element(&harness.ctx, &target, "opacity", AnimationOptions::to(1.0).duration(100.0));
    harness.frame(0.0);

    let player = animation.player().expect("player");
    assert_eq!(player.path(), PlaybackPath::Settled);
    assert_eq!(player.state(), PlayState::Idle);
    assert_eq!(animation.finished().outcome(), Some(AnimationOutcome::Cancelled));
    assert_eq!(target.get_value("opacity").and_then(|v| v.get_number()), Some(0.5));
}

#[test]
fn test_stopping_native_recovers_velocity() {
    let compositor = MockCompositor::new();
    let harness = Harness::with_compositor(&compositor);
    let target = element(0.0);

    let animation = animate_element(
        &harness.ctx,
        &target,
        "opacity",
        AnimationOptions::to(1.0).duration(1000.0).ease(Easing::Linear),
    );
    harness.frame(0.0);
    assert_eq!(animation.player().map(|p| p.path()), Some(PlaybackPath::Native));

    harness.time.set(500.0);
    harness.scheduler.end_turn();
    compositor.advance_to(500.0);

    let value = target.get_value("opacity").expect("value");
    value.stop();

    // Two samples 5ms apart on a linear 0..1 over 1000ms
    assert!((value.get_number().unwrap_or_default() - 0.5).abs() < 1e-9);
    assert!((value.velocity() - 1.0).abs() < 1e-6);
    assert!(compositor.last().expect("native").is_cancelled());
    assert_eq!(animation.finished().outcome(), Some(AnimationOutcome::Cancelled));
}

#[test]
fn test_start_time_follows_resolution_budget() {
    let compositor = MockCompositor::new();
    let harness = Harness::with_compositor(&compositor);

    let fast = element(0.0);
    animate_element(&harness.ctx, &fast, "opacity", AnimationOptions::to(1.0).duration(300.0));
    harness.frame(16.0);
    assert_eq!(compositor.last().and_then(|a| a.start_time()), Some(0.0));

    let slow = element(0.0);
    animate_element(&harness.ctx, &slow, "opacity", AnimationOptions::to(1.0).duration(300.0));
    harness.frame(116.0);
    assert_eq!(compositor.last().and_then(|a| a.start_time()), Some(116.0));
}

#[test]
fn test_reverse_repeat_ends_at_origin() {
    let harness = Harness::new();
    let x = ReactiveValue::new(&harness.scheduler, 0.0);

    let animation = animate_value(
        &harness.ctx,
        &x,
        AnimationOptions::new([0.0, 100.0])
            .duration(100.0)
            .ease(Easing::Linear)
            .repeat(3, RepeatType::Reverse),
    );

    harness.frame(0.0);
    harness.frame(150.0);
    // Second play runs backwards
    assert_eq!(x.get_number(), Some(50.0));

    harness.frames(160.0, 416.0);
    assert_eq!(x.get_number(), Some(0.0));
    assert_eq!(animation.finished().outcome(), Some(AnimationOutcome::Finished));
}

#[test]
fn test_interruption_inherits_velocity() {
    let harness = Harness::new();
    let x = ReactiveValue::new(&harness.scheduler, 0.0);

    animate_value(&harness.ctx, &x, AnimationOptions::to(100.0).kind(AnimationType::spring()));
    harness.frames(0.0, 96.0);
    let moving_from = x.get_number().expect("number");
    assert!(x.velocity() > 0.0);

    let y = ReactiveValue::new(&harness.scheduler, moving_from);
    let spring = AnimationType::Spring(SpringOptions::physics(100.0, 10.0, 1.0));
    animate_value(&harness.ctx, &x, AnimationOptions::to(0.0).kind(spring.clone()));
    animate_value(&harness.ctx, &y, AnimationOptions::to(0.0).kind(spring));

    harness.frame(112.0);
    harness.frame(128.0);
    let carried = x.get_number().expect("number");
    let rested = y.get_number().expect("number");
    assert!(carried > rested, "{carried} should lead {rested}");
}

#[test]
fn test_sample_and_seek_while_paused() {
    let harness = Harness::new();
    let x = ReactiveValue::new(&harness.scheduler, 0.0);

    let animation = animate_value(
        &harness.ctx,
        &x,
        AnimationOptions::new([0.0, 200.0])
            .duration(200.0)
            .ease(Easing::Linear)
            .autoplay(false),
    );
    let player = animation.player().expect("player");

    harness.frame(0.0);
    assert_eq!(player.state(), PlayState::Idle);
    assert_eq!(player.sample(50.0).and_then(|v| v.as_number()), Some(50.0));

    player.set_time(120.0);
    assert_eq!(x.get_number(), Some(120.0));

    player.play();
    harness.frame(16.0);
    harness.frame(48.0);
    // Resumes from the seeked 120ms
    assert_eq!(x.get_number(), Some(168.0));
}

#[test]
fn test_stop_from_listener_on_final_frame_skips_completion() {
    let harness = Harness::new();
    let x = ReactiveValue::new(&harness.scheduler, 0.0);

    let completions = Rc::new(Cell::new(0));
    let counter = completions.clone();
    let animation = animate_value(
        &harness.ctx,
        &x,
        AnimationOptions::to(100.0)
            .duration(100.0)
            .ease(Easing::Linear)
            .on_complete(move || counter.set(counter.get() + 1)),
    );

    let stopper = x.clone();
    let _subscription = x.on(ValueEvent::Change, move |value| {
        if value.as_number() == Some(100.0) {
            stopper.stop();
        }
    });

    harness.frames(0.0, 160.0);
    assert_eq!(x.get_number(), Some(100.0));
    assert_eq!(animation.finished().outcome(), Some(AnimationOutcome::Cancelled));
    assert_eq!(completions.get(), 0);
}
