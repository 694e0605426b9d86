//! Animating reactive values
//!
//! [`animate_value`] is the usual way to start an animation: it fills in
//! the transition a value name calls for, inherits the value's velocity and
//! registers the player as the value's single active animation.

use crate::context::MotionContext;
use crate::easing::Easing;
use crate::player::{get_final_keyframe, AnimationOptions, AnimationPlayer};
use crate::transition::apply_default_transition;
use motio_core::{
    AnimationControls, AnimationOutcome, Completion, ElementAdapter, Job, Phase, ReactiveValue, SchedulerHandle,
    Value,
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A started value animation
#[derive(Clone)]
pub struct ValueAnimation {
    completion: Completion,
    controls: Option<Rc<dyn AnimationControls>>,
    player: Option<AnimationPlayer>,
}

impl ValueAnimation {
    /// Settles when the animation ends
    pub fn finished(&self) -> Completion {
        self.completion.clone()
    }

    /// The player, unless the animation was skipped straight to its end
    pub fn player(&self) -> Option<&AnimationPlayer> {
        self.player.as_ref()
    }

    pub fn is_instant(&self) -> bool {
        self.player.is_none()
    }

    pub fn stop(&self) {
        if let Some(controls) = &self.controls {
            controls.stop();
        }
    }

    pub fn cancel(&self) {
        if let Some(controls) = &self.controls {
            controls.cancel();
        }
    }

    pub fn complete(&self) {
        if let Some(controls) = &self.controls {
            controls.complete();
        }
    }
}

impl fmt::Debug for ValueAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueAnimation")
            .field("completion", &self.completion)
            .field("player", &self.player)
            .finish_non_exhaustive()
    }
}

/// Animate `value` with `options`, replacing its running animation.
///
/// A single keyframe is treated as a target to animate to from the current
/// value. With no transition configured the default for the value name is
/// used, and tweens ease out unless told otherwise.
pub fn animate_value(ctx: &MotionContext, value: &ReactiveValue, mut options: AnimationOptions) -> ValueAnimation {
    if options.keyframes.is_empty() {
        options.keyframes.push(Some(value.get()));
    }
    if options.keyframes.len() == 1 {
        options.keyframes.insert(0, None);
    }
    if options.velocity == 0.0 {
        options.velocity = value.velocity();
    }
    options.value = Some(value.clone());

    apply_default_transition(&mut options);
    if options.ease.is_empty() {
        options.ease = vec![Easing::EaseOut];
    }

    let mut should_skip = false;
    if options.duration == Some(0.0) && options.repeat_delay == 0.0 {
        should_skip = options.delay == 0.0;
    }
    if ctx.config().instant_animations {
        should_skip = true;
        options.duration = Some(0.0);
        options.delay = 0.0;
    }

    if should_skip {
        let authored: Vec<Value> = options.keyframes.iter().flatten().cloned().collect();
        let target = get_final_keyframe(&authored, options.repeat, options.repeat_type, None, 1.0);
        if let Some(target) = target {
            tracing::trace!(name = ?options.name, "skipping animation to its final keyframe");
            let scheduler = ctx.scheduler().clone();
            let mut controls: Option<Rc<dyn AnimationControls>> = None;
            let completion = value.start_animation(|completion| {
                let instant: Rc<dyn AnimationControls> =
                    Rc::new(InstantAnimation::schedule(&scheduler, value.clone(), target, options, completion));
                controls = Some(instant.clone());
                instant
            });
            return ValueAnimation {
                completion,
                controls,
                player: None,
            };
        }
    }

    let mut player = None;
    let mut controls: Option<Rc<dyn AnimationControls>> = None;
    let completion = value.start_animation(|completion| {
        let started = AnimationPlayer::with_completion(ctx, options, completion);
        player = Some(started.clone());
        let started: Rc<dyn AnimationControls> = Rc::new(started);
        controls = Some(started.clone());
        started
    });

    ValueAnimation {
        completion,
        controls,
        player,
    }
}

/// Animate the value `name` of `element`, creating the value from the
/// element's current state if it has none yet.
pub fn animate_element(
    ctx: &MotionContext,
    element: &Rc<dyn ElementAdapter>,
    name: &str,
    options: AnimationOptions,
) -> ValueAnimation {
    let value = match element.get_value(name) {
        Some(value) => value,
        None => {
            let initial = element.read_value(name).unwrap_or(Value::Number(0.0));
            let value = ReactiveValue::new(ctx.scheduler(), initial);
            element.add_value(name, value.clone());
            value
        }
    };

    animate_value(ctx, &value, options.name(name).element(element.clone()))
}

struct InstantState {
    scheduler: SchedulerHandle,
    job: Option<Job>,
    completion: Completion,
}

/// Jumps a value to its target on the next update phase
struct InstantAnimation {
    state: Rc<RefCell<InstantState>>,
    target: Value,
    value: ReactiveValue,
    options: Rc<AnimationOptions>,
}

impl InstantAnimation {
    fn schedule(
        scheduler: &SchedulerHandle,
        value: ReactiveValue,
        target: Value,
        options: AnimationOptions,
        completion: Completion,
    ) -> Self {
        let animation = Self {
            state: Rc::new(RefCell::new(InstantState {
                scheduler: scheduler.clone(),
                job: None,
                completion,
            })),
            target,
            value,
            options: Rc::new(options),
        };

        let runner = animation.runner();
        let job = scheduler.schedule_fn(Phase::Update, move |_| runner());
        animation.state.borrow_mut().job = Some(job);
        animation
    }

    fn runner(&self) -> impl Fn() + 'static {
        let state = self.state.clone();
        let target = self.target.clone();
        let value = self.value.clone();
        let options = self.options.clone();
        move || {
            let completion = {
                let mut state = state.borrow_mut();
                state.job = None;
                state.completion.clone()
            };
            if completion.is_settled() {
                return;
            }

            value.set(target.clone());
            if let Some(on_update) = &options.on_update {
                on_update(&target);
            }
            if let Some(on_complete) = &options.on_complete {
                on_complete();
            }
            completion.resolve(AnimationOutcome::Finished);
        }
    }

    fn abort(&self) -> Completion {
        let mut state = self.state.borrow_mut();
        if let Some(job) = state.job.take() {
            state.scheduler.cancel(&job);
        }
        state.completion.clone()
    }
}

impl AnimationControls for InstantAnimation {
    fn stop(&self) {
        let completion = self.abort();
        if completion.resolve(AnimationOutcome::Cancelled) {
            if let Some(on_stop) = &self.options.on_stop {
                on_stop();
            }
        }
    }

    fn cancel(&self) {
        let completion = self.abort();
        if completion.resolve(AnimationOutcome::Cancelled) {
            if let Some(on_cancel) = &self.options.on_cancel {
                on_cancel();
            }
        }
    }

    fn complete(&self) {
        self.abort();
        (self.runner())();
    }

    fn finished(&self) -> Completion {
        self.state.borrow().completion.clone()
    }
}
