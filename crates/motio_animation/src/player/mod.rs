//! Animation player
//!
//! An [`AnimationPlayer`] resolves its keyframes, then drives them on one of
//! two paths:
//!
//! - software: a keep-alive `Update` job ticks a [`SoftwarePlayback`]
//! - native: eligible properties are handed to a [`NativeAnimationHost`]
//!   and only report back when they finish
//!
//! Control calls made before resolution force the pending resolver batch to
//! resolve synchronously.
//!
//! # Example
//!
//! ```ignore
//! use motio_animation::{AnimationOptions, AnimationPlayer, MotionContext};
//!
//! let player = AnimationPlayer::new(&ctx, AnimationOptions::new([0.0, 100.0]).duration(400.0).value(&x));
//! player.pause();
//! player.set_time(200.0);
//! ```

pub mod native;
pub mod options;
pub mod software;

pub use native::{
    NativeAnimation, NativeAnimationHost, NativeEasing, NativeError, NativeKeyframeOptions, NativePlayState,
    PlaybackDirection,
};
pub use options::{get_final_keyframe, AnimationOptions, Keyframe, RepeatType, REPEAT_FOREVER};
pub use software::{SoftwarePlayback, TickOutput};

use crate::context::MotionContext;
use crate::generators::AnimationType;
use crate::mix::ComplexValue;
use crate::resolver::KeyframeResolver;
use motio_core::{AnimationControls, AnimationOutcome, Completion, Job, Phase, Value};
use native::NativePlan;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Playback state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    #[default]
    Idle,
    Running,
    Paused,
    Finished,
}

impl From<NativePlayState> for PlayState {
    fn from(state: NativePlayState) -> Self {
        match state {
            NativePlayState::Idle => PlayState::Idle,
            NativePlayState::Running => PlayState::Running,
            NativePlayState::Paused => PlayState::Paused,
            NativePlayState::Finished => PlayState::Finished,
        }
    }
}

/// Which path a player runs on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackPath {
    /// Keyframes not resolved yet
    Pending,
    Software,
    Native,
    /// Settled without running: finished instantly, stopped or aborted
    Settled,
}

struct NativeBackend {
    animation: Rc<dyn NativeAnimation>,
    plan: NativePlan,
    final_value: Option<Value>,
}

enum Backend {
    Pending,
    Software {
        playback: SoftwarePlayback,
        driver: Option<Job>,
    },
    Native(NativeBackend),
    Settled(PlayState),
}

struct PlayerState {
    ctx: MotionContext,
    options: AnimationOptions,
    backend: Backend,
    resolver: Option<KeyframeResolver>,
    completion: Completion,
    keyframes: Vec<Value>,
    final_keyframe: Option<Value>,
    created_at: f64,
    resolved_at: Option<f64>,
    is_stopped: bool,
    speed: f64,
}

impl PlayerState {
    /// Creation time, unless resolution took longer than the configured
    /// budget, in which case starting from creation would visibly jump
    fn calc_start_time(&self) -> f64 {
        match self.resolved_at {
            Some(resolved_at) if resolved_at - self.created_at > self.ctx.config().max_resolve_delay_ms => resolved_at,
            _ => self.created_at,
        }
    }

    fn default_start(&self) -> f64 {
        self.options.start_time.unwrap_or_else(|| self.calc_start_time())
    }

    /// Renew the completion if a previous run already settled it
    fn renew_completion(&mut self) {
        if self.completion.is_settled() {
            self.completion = Completion::new();
        }
    }
}

/// Whether `value` can be interpolated at all
fn is_animatable(value: &Value, name: Option<&str>) -> bool {
    if name == Some("zIndex") {
        return false;
    }
    match value {
        Value::Number(_) => true,
        Value::Text(text) => {
            (text == "0" || !ComplexValue::parse(text).is_empty()) && !text.starts_with("url(")
        }
    }
}

/// Whether resolved keyframes describe any motion worth running
fn can_animate(keyframes: &[Value], options: &AnimationOptions) -> bool {
    let Some(origin) = keyframes.first() else {
        return false;
    };
    let name = options.name.as_deref();
    if matches!(name, Some("display") | Some("visibility")) {
        return true;
    }

    let target = &keyframes[keyframes.len() - 1];
    let origin_animatable = is_animatable(origin, name);
    let target_animatable = is_animatable(target, name);
    if !origin_animatable || !target_animatable {
        tracing::warn!(?name, ?origin, ?target, "keyframes are not animatable; jumping to the end");
        return false;
    }

    let changed = keyframes.iter().any(|keyframe| keyframe != origin);
    let physics = matches!(options.kind, AnimationType::Spring(_) | AnimationType::Custom(_));
    changed || (physics && options.velocity != 0.0)
}

/// A hybrid software/native animation
#[derive(Clone)]
pub struct AnimationPlayer {
    state: Rc<RefCell<PlayerState>>,
}

impl AnimationPlayer {
    pub fn new(ctx: &MotionContext, options: AnimationOptions) -> Self {
        Self::with_completion(ctx, options, Completion::new())
    }

    /// Build a player that settles `completion`
    pub fn with_completion(ctx: &MotionContext, options: AnimationOptions, completion: Completion) -> Self {
        let deferred = !options.resolve_sync;
        let player = Self {
            state: Rc::new(RefCell::new(PlayerState {
                ctx: ctx.clone(),
                created_at: ctx.now(),
                options,
                backend: Backend::Pending,
                resolver: None,
                completion,
                keyframes: Vec::new(),
                final_keyframe: None,
                resolved_at: None,
                is_stopped: false,
                speed: 1.0,
            })),
        };

        let resolver = {
            let state = player.state.borrow();
            let handle = player.clone();
            KeyframeResolver::new(
                state.options.keyframes.clone(),
                state.options.name.clone(),
                state.options.value.clone(),
                state.options.element.clone(),
                move |keyframes, final_keyframe| handle.on_resolved(keyframes, final_keyframe),
            )
        };
        player.state.borrow_mut().resolver = Some(resolver.clone());
        resolver.schedule(ctx.resolvers(), deferred);
        player
    }

    fn on_resolved(&self, keyframes: Vec<Value>, final_keyframe: Option<Value>) {
        let host = {
            let mut state = self.state.borrow_mut();
            state.resolver = None;
            if state.is_stopped {
                return;
            }
            state.resolved_at = Some(state.ctx.now());
            state.keyframes = keyframes.clone();
            state.final_keyframe = final_keyframe.clone();

            if !can_animate(&keyframes, &state.options) {
                if state.ctx.config().instant_animations || state.options.delay == 0.0 {
                    let options = &state.options;
                    let end = get_final_keyframe(
                        &keyframes,
                        options.repeat,
                        options.repeat_type,
                        final_keyframe.as_ref(),
                        1.0,
                    );
                    state.backend = Backend::Settled(PlayState::Finished);
                    drop(state);
                    if let Some(end) = end {
                        self.emit(&end);
                    }
                    self.finish();
                    return;
                }
                state.options.duration = Some(0.0);
            }

            state
                .ctx
                .native_host()
                .filter(|host| native::supports_native(&state.options, host.as_ref()))
                .cloned()
        };

        if let Some(host) = host {
            match self.start_native(host.as_ref(), keyframes.clone(), final_keyframe.clone()) {
                Ok(backend) => {
                    tracing::debug!(name = ?self.state.borrow().options.name, baked = backend.plan.baked, "player resolved on native path");
                    let animation = backend.animation.clone();
                    let autoplay = {
                        let mut state = self.state.borrow_mut();
                        if state.speed != 1.0 {
                            animation.set_playback_rate(state.speed);
                        }
                        state.backend = Backend::Native(backend);
                        state.options.autoplay
                    };
                    if autoplay {
                        self.play();
                    } else {
                        animation.pause();
                    }
                    return;
                }
                Err(NativeError::Detached) => {
                    tracing::debug!("element detached before native handoff; aborting");
                    self.state.borrow_mut().backend = Backend::Settled(PlayState::Idle);
                    self.settle(AnimationOutcome::Cancelled);
                    return;
                }
                Err(NativeError::Unsupported(reason)) => {
                    tracing::debug!(%reason, "native handoff unsupported; falling back to software");
                }
            }
        }

        let autoplay = {
            let mut state = self.state.borrow_mut();
            let now = state.ctx.now();
            let speed = state.speed;
            let mut playback = SoftwarePlayback::new(&state.options, keyframes, final_keyframe);
            if speed != 1.0 {
                playback.set_speed(speed, now);
            }
            tracing::debug!(
                name = ?state.options.name,
                kind = state.options.kind.name(),
                duration = playback.calculated_duration(),
                "player resolved on software path"
            );
            state.backend = Backend::Software {
                playback,
                driver: None,
            };
            state.options.autoplay
        };
        if autoplay {
            self.play();
        }
    }

    fn start_native(
        &self,
        host: &dyn NativeAnimationHost,
        keyframes: Vec<Value>,
        final_keyframe: Option<Value>,
    ) -> Result<NativeBackend, NativeError> {
        let (options, start_time, resolution) = {
            let state = self.state.borrow();
            (state.options.clone(), state.default_start(), state.ctx.config().native_sample_resolution_ms)
        };
        let (Some(element), Some(name)) = (options.element.clone(), options.name.clone()) else {
            return Err(NativeError::Unsupported("no element to animate".into()));
        };

        let plan = native::plan(&options, keyframes, host, resolution);
        let linear_points = host.supports_linear_easing().then_some(resolution);
        let native_options = native::keyframe_options(&options, &plan, linear_points);

        let animation = host.animate(&element, &name, &plan.keyframes, &native_options)?;
        animation.set_start_time(start_time);

        let handle = self.clone();
        animation.set_on_finish(Box::new(move || handle.on_native_finish()));

        let final_value = get_final_keyframe(
            &plan.keyframes,
            options.repeat,
            options.repeat_type,
            if plan.baked { None } else { final_keyframe.as_ref() },
            1.0,
        );
        Ok(NativeBackend {
            animation,
            plan,
            final_value,
        })
    }

    fn on_native_finish(&self) {
        let (animation, end) = {
            let mut state = self.state.borrow_mut();
            let Backend::Native(native) = &state.backend else {
                return;
            };
            let taken = (native.animation.clone(), native.final_value.clone());
            state.backend = Backend::Settled(PlayState::Finished);
            taken
        };

        let value = self.state.borrow().options.value.clone();
        if let (Some(value), Some(end)) = (value, end) {
            value.set(end);
        }
        animation.cancel();
        self.finish();
    }

    /// Resolve now if resolution is still pending
    fn ensure_resolved(&self) {
        let ctx = {
            let state = self.state.borrow();
            if !matches!(state.backend, Backend::Pending) || state.resolver.is_none() || state.is_stopped {
                return;
            }
            state.ctx.clone()
        };
        ctx.resolvers().flush();
    }

    /// Write a frame value to the bound value and the update hook
    fn emit(&self, frame_value: &Value) {
        let (value, on_update) = {
            let state = self.state.borrow();
            (state.options.value.clone(), state.options.on_update.clone())
        };
        if let Some(value) = value {
            value.set(frame_value.clone());
        }
        if let Some(on_update) = on_update {
            on_update(frame_value);
        }
    }

    fn settle(&self, outcome: AnimationOutcome) {
        let completion = self.state.borrow().completion.clone();
        completion.resolve(outcome);
    }

    fn finish(&self) {
        self.stop_driver();
        let on_complete = {
            let state = self.state.borrow();
            // Stopped or cancelled from inside the final emit
            if state.is_stopped || state.completion.is_settled() {
                return;
            }
            state.options.on_complete.clone()
        };
        if let Some(on_complete) = on_complete {
            on_complete();
        }
        self.settle(AnimationOutcome::Finished);
    }

    fn start_driver(&self) {
        let mut state = self.state.borrow_mut();
        let scheduler = state.ctx.scheduler().clone();
        let Backend::Software { driver, .. } = &mut state.backend else {
            return;
        };
        if driver.is_some() {
            return;
        }
        let handle = self.clone();
        let job = Job::new(move |frame| handle.tick(frame.timestamp));
        *driver = Some(scheduler.schedule(Phase::Update, job, true, false));
    }

    fn stop_driver(&self) {
        let (scheduler, job) = {
            let mut state = self.state.borrow_mut();
            let scheduler = state.ctx.scheduler().clone();
            match &mut state.backend {
                Backend::Software { driver, .. } => (scheduler, driver.take()),
                _ => return,
            }
        };
        if let Some(job) = job {
            scheduler.cancel(&job);
        }
    }

    fn tick(&self, timestamp: f64) {
        let output = {
            let mut state = self.state.borrow_mut();
            let Backend::Software { playback, .. } = &mut state.backend else {
                return;
            };
            playback.tick(timestamp, false)
        };
        self.emit(&output.value);
        if output.finished {
            self.finish();
        }
    }

    /// Start or resume playback
    pub fn play(&self) {
        self.ensure_resolved();

        let (on_play, native) = {
            let mut state = self.state.borrow_mut();
            if state.is_stopped {
                return;
            }
            let now = state.ctx.now();
            let default_start = state.default_start();
            let on_play = state.options.on_play.clone();

            let replaying = matches!(
                &state.backend,
                Backend::Software { playback, .. } if playback.state() == PlayState::Finished
            );
            if replaying {
                state.renew_completion();
            }

            let native = match &mut state.backend {
                Backend::Software { playback, .. } => {
                    playback.play(now, default_start);
                    None
                }
                Backend::Native(native) => Some(native.animation.clone()),
                Backend::Pending | Backend::Settled(_) => return,
            };
            (on_play, native)
        };

        if let Some(on_play) = on_play {
            on_play();
        }
        match native {
            Some(animation) => animation.play(),
            None => self.start_driver(),
        }
    }

    /// Hold at the current time
    pub fn pause(&self) {
        self.ensure_resolved();
        let native = {
            let mut state = self.state.borrow_mut();
            let now = state.ctx.now();
            match &mut state.backend {
                Backend::Software { playback, .. } => {
                    playback.pause(now);
                    None
                }
                Backend::Native(native) => Some(native.animation.clone()),
                Backend::Pending | Backend::Settled(_) => return,
            }
        };
        match native {
            Some(animation) => animation.pause(),
            None => self.stop_driver(),
        }
    }

    /// Jump to the end, honoring repeat parity
    pub fn complete(&self) {
        self.ensure_resolved();
        let is_native = {
            let mut state = self.state.borrow_mut();
            let now = state.ctx.now();
            let default_start = state.default_start();
            match &mut state.backend {
                Backend::Software { playback, .. } => {
                    playback.complete(now, default_start);
                    false
                }
                Backend::Native(_) => true,
                Backend::Pending | Backend::Settled(_) => return,
            }
        };

        if is_native {
            self.on_native_finish();
        } else {
            let now = self.state.borrow().ctx.now();
            self.tick(now);
        }
    }

    /// Abandon playback at the current value without completing
    pub fn cancel(&self) {
        let (resolver, ctx, on_cancel, native, sampled) = {
            let mut state = self.state.borrow_mut();
            let now = state.ctx.now();
            let backend = std::mem::replace(&mut state.backend, Backend::Settled(PlayState::Idle));
            let (native, sampled, driver) = match backend {
                Backend::Software { mut playback, driver } => {
                    let sampled = (playback.state() == PlayState::Running).then(|| playback.tick(now, false).value);
                    playback.teardown();
                    state.backend = Backend::Software {
                        playback,
                        driver: None,
                    };
                    (None, sampled, driver)
                }
                Backend::Native(native) => (Some(native.animation), None, None),
                Backend::Pending => (None, None, None),
                other => {
                    state.backend = other;
                    (None, None, None)
                }
            };
            if let Some(job) = driver {
                state.ctx.scheduler().cancel(&job);
            }
            (
                state.resolver.take(),
                state.ctx.clone(),
                state.options.on_cancel.clone(),
                native,
                sampled,
            )
        };

        if let Some(resolver) = resolver {
            resolver.cancel(ctx.resolvers());
        }
        if let Some(animation) = native {
            animation.cancel();
        }
        if let Some(sampled) = sampled {
            self.emit(&sampled);
        }
        if let Some(on_cancel) = on_cancel {
            on_cancel();
        }
        self.settle(AnimationOutcome::Cancelled);
    }

    /// Stop for good. Native playback first hands its velocity back to the
    /// bound value by sampling the equivalent software curve twice.
    pub fn stop(&self) {
        let (resolver, ctx, native, on_stop) = {
            let mut state = self.state.borrow_mut();
            if state.is_stopped {
                return;
            }
            state.is_stopped = true;
            let native = match &state.backend {
                Backend::Native(native) => Some((native.animation.clone(), native.plan.clone())),
                _ => None,
            };
            (
                state.resolver.take(),
                state.ctx.clone(),
                native,
                state.options.on_stop.clone(),
            )
        };

        if let Some(resolver) = resolver {
            resolver.cancel(ctx.resolvers());
        }

        if let Some((animation, plan)) = native {
            let running = matches!(animation.play_state(), NativePlayState::Running | NativePlayState::Paused);
            if let (true, Some(time)) = (running, animation.current_time()) {
                self.recover_velocity(&plan, time);
            }
            animation.cancel();
            self.state.borrow_mut().backend = Backend::Settled(PlayState::Idle);
        } else {
            self.stop_driver();
            let mut state = self.state.borrow_mut();
            match &mut state.backend {
                Backend::Software { playback, .. } => playback.teardown(),
                backend @ Backend::Pending => *backend = Backend::Settled(PlayState::Idle),
                _ => {}
            }
        }

        if let Some(on_stop) = on_stop {
            on_stop();
        }
        self.settle(AnimationOutcome::Cancelled);
    }

    fn recover_velocity(&self, plan: &NativePlan, time: f64) {
        let (options, delta) = {
            let state = self.state.borrow();
            (state.options.clone(), state.ctx.config().velocity_sample_delta_ms)
        };
        let Some(value) = options.value.clone() else {
            return;
        };
        if time <= 0.0 {
            return;
        }

        let sampling = AnimationOptions {
            duration: Some(plan.duration),
            ease: plan.ease.clone(),
            times: plan.times.clone(),
            kind: AnimationType::Tween,
            ..options
        };
        let mut playback = SoftwarePlayback::new(&sampling, plan.keyframes.clone(), None);
        let previous = playback.sample(time - delta);
        let current = playback.sample(time);
        tracing::trace!(time, delta, "recovering velocity from native playback");
        value.set_with_velocity(previous, current, delta);
    }

    pub fn state(&self) -> PlayState {
        match &self.state.borrow().backend {
            Backend::Pending => PlayState::Idle,
            Backend::Software { playback, .. } => playback.state(),
            Backend::Native(native) => native.animation.play_state().into(),
            Backend::Settled(state) => *state,
        }
    }

    pub fn path(&self) -> PlaybackPath {
        match &self.state.borrow().backend {
            Backend::Pending => PlaybackPath::Pending,
            Backend::Software { .. } => PlaybackPath::Software,
            Backend::Native(_) => PlaybackPath::Native,
            Backend::Settled(_) => PlaybackPath::Settled,
        }
    }

    /// Playback time in milliseconds
    pub fn time(&self) -> f64 {
        self.ensure_resolved();
        match &self.state.borrow().backend {
            Backend::Software { playback, .. } => playback.time(),
            Backend::Native(native) => native.animation.current_time().unwrap_or(0.0),
            Backend::Pending | Backend::Settled(_) => 0.0,
        }
    }

    /// Seek to `t` milliseconds
    pub fn set_time(&self, t: f64) {
        self.ensure_resolved();
        let (native, render) = {
            let mut state = self.state.borrow_mut();
            let now = state.ctx.now();
            match &mut state.backend {
                Backend::Software { playback, driver } => {
                    playback.set_time(t, now);
                    (None, driver.is_none())
                }
                Backend::Native(native) => (Some(native.animation.clone()), false),
                Backend::Pending | Backend::Settled(_) => return,
            }
        };
        if let Some(animation) = native {
            animation.set_current_time(t);
        }
        // Nothing ticks a held player, so show the new position now
        if render {
            if let Some(value) = self.sample(t) {
                self.emit(&value);
            }
        }
    }

    pub fn speed(&self) -> f64 {
        self.state.borrow().speed
    }

    /// Playback rate; negative plays backwards
    pub fn set_speed(&self, speed: f64) {
        let native = {
            let mut state = self.state.borrow_mut();
            state.speed = speed;
            let now = state.ctx.now();
            match &mut state.backend {
                Backend::Software { playback, .. } => {
                    playback.set_speed(speed, now);
                    None
                }
                Backend::Native(native) => Some(native.animation.clone()),
                Backend::Pending | Backend::Settled(_) => None,
            }
        };
        if let Some(animation) = native {
            animation.set_playback_rate(speed);
        }
    }

    /// The value at playback time `t`, without moving playback
    pub fn sample(&self, t: f64) -> Option<Value> {
        self.ensure_resolved();
        let state = self.state.borrow();
        let mut playback = match &state.backend {
            Backend::Native(native) => {
                let options = AnimationOptions {
                    duration: Some(native.plan.duration),
                    ease: native.plan.ease.clone(),
                    times: native.plan.times.clone(),
                    kind: AnimationType::Tween,
                    ..state.options.clone()
                };
                SoftwarePlayback::new(&options, native.plan.keyframes.clone(), None)
            }
            Backend::Software { .. } => {
                SoftwarePlayback::new(&state.options, state.keyframes.clone(), state.final_keyframe.clone())
            }
            Backend::Pending | Backend::Settled(_) => return None,
        };
        Some(playback.sample(t))
    }

    /// One iteration's duration in milliseconds, once resolved
    pub fn duration(&self) -> Option<f64> {
        self.ensure_resolved();
        match &self.state.borrow().backend {
            Backend::Software { playback, .. } => Some(playback.calculated_duration()),
            Backend::Native(native) => Some(native.plan.duration),
            Backend::Pending | Backend::Settled(_) => None,
        }
    }

    /// Resolved keyframes, empty until resolution
    pub fn keyframes(&self) -> Vec<Value> {
        self.state.borrow().keyframes.clone()
    }

    /// Time playback started from, once playing
    pub fn start_time(&self) -> Option<f64> {
        let state = self.state.borrow();
        match &state.backend {
            Backend::Software { playback, .. } => playback.start_time(),
            Backend::Native(_) => Some(state.default_start()),
            Backend::Pending | Backend::Settled(_) => None,
        }
    }

    /// Completion of the current run
    pub fn finished(&self) -> Completion {
        self.state.borrow().completion.clone()
    }
}

impl AnimationControls for AnimationPlayer {
    fn stop(&self) {
        AnimationPlayer::stop(self);
    }

    fn cancel(&self) {
        AnimationPlayer::cancel(self);
    }

    fn complete(&self) {
        AnimationPlayer::complete(self);
    }

    fn finished(&self) -> Completion {
        AnimationPlayer::finished(self)
    }
}

impl fmt::Debug for AnimationPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationPlayer")
            .field("path", &self.path())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::easing::Easing;
    use motio_core::{ManualTime, ReactiveValue, SchedulerHandle};
    use std::cell::Cell;

    fn setup() -> (ManualTime, SchedulerHandle, MotionContext) {
        let time = ManualTime::new(0.0);
        let scheduler = SchedulerHandle::with_time(time.clone());
        let ctx = MotionContext::new(&scheduler);
        (time, scheduler, ctx)
    }

    fn frame(time: &ManualTime, scheduler: &SchedulerHandle, at: f64) {
        time.set(at);
        scheduler.tick(at);
    }

    #[test]
    fn test_resolves_in_next_frame_then_plays() {
        let (time, scheduler, ctx) = setup();
        let x = ReactiveValue::new(&scheduler, 0.0);
        let player = AnimationPlayer::new(
            &ctx,
            AnimationOptions::to(100.0).duration(100.0).ease(Easing::Linear).value(&x),
        );
        assert_eq!(player.path(), PlaybackPath::Pending);

        frame(&time, &scheduler, 16.0);
        assert_eq!(player.path(), PlaybackPath::Software);
        assert_eq!(player.state(), PlayState::Running);
        assert_eq!(player.keyframes(), vec![Value::Number(0.0), Value::Number(100.0)]);
        assert_eq!(x.get_number(), Some(16.0));

        frame(&time, &scheduler, 100.0);
        assert_eq!(x.get_number(), Some(100.0));
        assert_eq!(player.state(), PlayState::Finished);
        assert_eq!(player.finished().outcome(), Some(AnimationOutcome::Finished));
        assert!(!scheduler.needs_frame());
    }

    #[test]
    fn test_slow_resolution_starts_at_resolution_time() {
        let (time, scheduler, ctx) = setup();
        let fast = AnimationPlayer::new(&ctx, AnimationOptions::new([0.0, 1.0]));
        frame(&time, &scheduler, 30.0);
        assert_eq!(fast.start_time(), Some(0.0));

        let slow = AnimationPlayer::new(&ctx, AnimationOptions::new([0.0, 1.0]));
        frame(&time, &scheduler, 100.0);
        assert_eq!(slow.start_time(), Some(100.0));
    }

    #[test]
    fn test_control_before_resolution_forces_it() {
        let (_time, scheduler, ctx) = setup();
        let x = ReactiveValue::new(&scheduler, 0.0);
        let player = AnimationPlayer::new(&ctx, AnimationOptions::to(10.0).duration(100.0).value(&x));
        player.pause();
        assert_eq!(player.path(), PlaybackPath::Software);
        assert_eq!(player.state(), PlayState::Paused);
        assert!(ctx.resolvers().is_empty());
    }

    #[test]
    fn test_unchanged_keyframes_finish_instantly() {
        let (_time, scheduler, ctx) = setup();
        let completed = Rc::new(Cell::new(false));
        let completed_clone = completed.clone();
        let x = ReactiveValue::new(&scheduler, 5.0);
        let player = AnimationPlayer::new(
            &ctx,
            AnimationOptions::to(5.0)
                .value(&x)
                .resolve_sync()
                .on_complete(move || completed_clone.set(true)),
        );
        assert!(completed.get());
        assert_eq!(player.path(), PlaybackPath::Settled);
        assert_eq!(player.state(), PlayState::Finished);
    }

    #[test]
    fn test_non_animatable_jumps_to_end() {
        let (_time, scheduler, ctx) = setup();
        let display = ReactiveValue::new(&scheduler, "block");
        AnimationPlayer::new(
            &ctx,
            AnimationOptions::to("url(a.png)").name("backgroundImage").value(&display).resolve_sync(),
        );
        assert_eq!(display.get(), Value::from("url(a.png)"));
    }

    #[test]
    fn test_cancel_does_not_complete() {
        let (time, scheduler, ctx) = setup();
        let completed = Rc::new(Cell::new(false));
        let cancelled = Rc::new(Cell::new(false));
        let (c1, c2) = (completed.clone(), cancelled.clone());
        let x = ReactiveValue::new(&scheduler, 0.0);
        let player = AnimationPlayer::new(
            &ctx,
            AnimationOptions::to(100.0)
                .duration(100.0)
                .ease(Easing::Linear)
                .value(&x)
                .on_complete(move || c1.set(true))
                .on_cancel(move || c2.set(true)),
        );
        frame(&time, &scheduler, 16.0);
        time.set(50.0);
        player.cancel();

        assert_eq!(x.get_number(), Some(50.0));
        assert!(cancelled.get());
        assert!(!completed.get());
        assert_eq!(player.finished().outcome(), Some(AnimationOutcome::Cancelled));
        assert!(!scheduler.needs_frame());
    }

    #[test]
    fn test_complete_honors_repeat_parity() {
        let (_time, scheduler, ctx) = setup();
        let x = ReactiveValue::new(&scheduler, 0.0);
        let player = AnimationPlayer::new(
            &ctx,
            AnimationOptions::new([0.0, 100.0])
                .duration(100.0)
                .repeat(3, RepeatType::Reverse)
                .value(&x),
        );
        player.complete();
        assert_eq!(x.get_number(), Some(0.0));
        assert_eq!(player.finished().outcome(), Some(AnimationOutcome::Finished));
    }

    #[test]
    fn test_replay_renews_completion() {
        let (time, scheduler, ctx) = setup();
        let player = AnimationPlayer::new(&ctx, AnimationOptions::new([0.0, 1.0]).duration(50.0));
        frame(&time, &scheduler, 16.0);
        frame(&time, &scheduler, 60.0);
        let first = player.finished();
        assert!(first.is_settled());

        player.play();
        let second = player.finished();
        assert!(!second.ptr_eq(&first));
        assert!(!second.is_settled());
        assert_eq!(player.state(), PlayState::Running);
    }

    #[test]
    fn test_autoplay_off_and_seek() {
        let (_time, scheduler, ctx) = setup();
        let x = ReactiveValue::new(&scheduler, 0.0);
        let player = AnimationPlayer::new(
            &ctx,
            AnimationOptions::to(100.0)
                .duration(200.0)
                .ease(Easing::Linear)
                .value(&x)
                .autoplay(false),
        );
        player.set_time(50.0);
        assert_eq!(player.state(), PlayState::Idle);
        assert_eq!(x.get_number(), Some(25.0));
        assert_eq!(player.sample(100.0), Some(Value::Number(50.0)));
        assert!(!scheduler.needs_frame());
    }

    #[test]
    fn test_stop_settles_cancelled() {
        let (time, scheduler, ctx) = setup();
        let stops = Rc::new(Cell::new(0));
        let stops_clone = stops.clone();
        let player = AnimationPlayer::new(
            &ctx,
            AnimationOptions::new([0.0, 1.0])
                .duration(500.0)
                .on_stop(move || stops_clone.set(stops_clone.get() + 1)),
        );
        frame(&time, &scheduler, 16.0);
        player.stop();
        player.stop();
        player.play();

        assert_eq!(stops.get(), 1);
        assert_eq!(player.state(), PlayState::Idle);
        assert_eq!(player.finished().outcome(), Some(AnimationOutcome::Cancelled));
        assert!(!scheduler.needs_frame());
    }
}
