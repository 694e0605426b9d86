//! Reactive values
//!
//! A [`ReactiveValue`] holds the current state of one animatable property,
//! remembers enough history to report velocity, and owns at most one active
//! animation at a time.
//!
//! # Example
//!
//! ```rust
//! use motio_core::{ManualTime, ReactiveValue, SchedulerHandle};
//!
//! let time = ManualTime::new(0.0);
//! let scheduler = SchedulerHandle::with_time(time.clone());
//! let x = ReactiveValue::new(&scheduler, 0.0);
//!
//! time.set(16.0);
//! scheduler.end_turn();
//! x.set(10.0);
//!
//! assert_eq!(x.velocity(), 625.0);
//! ```

use crate::completion::{AnimationOutcome, Completion};
use crate::frame::Phase;
use crate::scheduler::SchedulerHandle;
use crate::subscription::{HandlerId, SubscriptionManager};
use crate::value::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Convert a per-frame change into units per second
pub fn velocity_per_second(change: f64, frame_duration_ms: f64) -> f64 {
    if frame_duration_ms != 0.0 {
        change * (1000.0 / frame_duration_ms)
    } else {
        0.0
    }
}

/// Control surface a value needs over the animation driving it
pub trait AnimationControls {
    /// Stop at the current value, keeping velocity recoverable
    fn stop(&self);
    /// Abort without committing a final value
    fn cancel(&self);
    /// Jump to the end state
    fn complete(&self);
    /// The signal settled when the animation ends
    fn finished(&self) -> Completion;
}

/// Events a value dispatches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueEvent {
    /// The value changed
    Change,
    /// The value was set and wants to be rendered
    RenderRequest,
    AnimationStart,
    AnimationComplete,
    AnimationCancel,
}

impl ValueEvent {
    fn index(self) -> usize {
        self as usize
    }
}

struct ValueState {
    current: Value,
    previous: Option<Value>,
    previous_frame_value: Option<Value>,
    updated_at: f64,
    previous_updated_at: Option<f64>,
    can_track_velocity: bool,
}

struct ActiveAnimation {
    controls: Rc<dyn AnimationControls>,
    completion: Completion,
}

struct ValueShared {
    state: RefCell<ValueState>,
    animation: RefCell<Option<ActiveAnimation>>,
    events: [SubscriptionManager<Value>; 5],
    scheduler: SchedulerHandle,
}

/// A shared, observable animatable value.
///
/// Clones refer to the same value.
#[derive(Clone)]
pub struct ReactiveValue {
    shared: Rc<ValueShared>,
}

impl ReactiveValue {
    pub fn new(scheduler: &SchedulerHandle, initial: impl Into<Value>) -> Self {
        let current = initial.into();
        let can_track_velocity = current.is_numeric();

        Self {
            shared: Rc::new(ValueShared {
                state: RefCell::new(ValueState {
                    current,
                    previous: None,
                    previous_frame_value: None,
                    updated_at: scheduler.now(),
                    previous_updated_at: None,
                    can_track_velocity,
                }),
                animation: RefCell::new(None),
                events: Default::default(),
                scheduler: scheduler.clone(),
            }),
        }
    }

    pub fn get(&self) -> Value {
        self.shared.state.borrow().current.clone()
    }

    /// The current value as a number, if it is numeric
    pub fn get_number(&self) -> Option<f64> {
        self.shared.state.borrow().current.as_number()
    }

    /// The value before the latest `set`
    pub fn previous(&self) -> Option<Value> {
        self.shared.state.borrow().previous.clone()
    }

    /// Time of the latest update, in clock milliseconds
    pub fn updated_at(&self) -> f64 {
        self.shared.state.borrow().updated_at
    }

    /// Set the value and request a render
    pub fn set(&self, value: impl Into<Value>) {
        self.update_and_notify(value.into(), true);
    }

    /// Set the value, notifying change listeners but not render listeners
    pub fn set_quiet(&self, value: impl Into<Value>) {
        self.update_and_notify(value.into(), false);
    }

    /// Set `current` while seeding the velocity history with `previous`,
    /// as if `previous` had been set `delta_ms` earlier
    pub fn set_with_velocity(&self, previous: impl Into<Value>, current: impl Into<Value>, delta_ms: f64) {
        self.set(current);
        let mut state = self.shared.state.borrow_mut();
        state.previous = None;
        state.previous_frame_value = Some(previous.into());
        state.previous_updated_at = Some(state.updated_at - delta_ms);
    }

    /// Set the value without velocity, optionally stopping any animation
    pub fn jump(&self, value: impl Into<Value>, end_animation: bool) {
        let value = value.into();
        self.update_and_notify(value.clone(), true);
        {
            let mut state = self.shared.state.borrow_mut();
            state.previous = Some(value);
            state.previous_frame_value = None;
            state.previous_updated_at = None;
        }
        if end_animation {
            self.stop();
        }
    }

    fn update_and_notify(&self, value: Value, render: bool) {
        let now = self.shared.scheduler.now();
        let (changed, current) = {
            let mut state = self.shared.state.borrow_mut();

            // Frame history only advances once per distinct time
            if state.updated_at != now {
                state.previous_frame_value = Some(state.current.clone());
                state.previous_updated_at = Some(state.updated_at);
            }

            let previous = std::mem::replace(&mut state.current, value);
            state.updated_at = now;
            let changed = state.current != previous;
            state.previous = Some(previous);
            (changed, state.current.clone())
        };

        if changed {
            self.notify(ValueEvent::Change, &current);
        }
        if render {
            self.notify(ValueEvent::RenderRequest, &current);
        }
    }

    /// Velocity in units per second.
    ///
    /// Zero unless the value is numeric and was updated within the
    /// configured velocity window.
    pub fn velocity(&self) -> f64 {
        let now = self.shared.scheduler.now();
        let max_delta = self.shared.scheduler.config().max_velocity_delta_ms;
        let state = self.shared.state.borrow();

        let (Some(previous), Some(previous_updated_at)) =
            (&state.previous_frame_value, state.previous_updated_at)
        else {
            return 0.0;
        };

        if !state.can_track_velocity || now - state.updated_at > max_delta {
            return 0.0;
        }

        let (Some(current), Some(previous)) = (state.current.as_number(), previous.as_number()) else {
            return 0.0;
        };

        let delta = (state.updated_at - previous_updated_at).min(max_delta);
        velocity_per_second(current - previous, delta)
    }

    /// Subscribe to `event`.
    ///
    /// Dropping the returned [`Subscription`] keeps the handler registered;
    /// call [`Subscription::unsubscribe`] to remove it.
    pub fn on<F: Fn(&Value) + 'static>(&self, event: ValueEvent, handler: F) -> Subscription {
        let id = self.shared.events[event.index()].add(handler);
        Subscription {
            value: Rc::downgrade(&self.shared),
            event,
            id,
        }
    }

    pub fn listener_count(&self, event: ValueEvent) -> usize {
        self.shared.events[event.index()].len()
    }

    fn notify(&self, event: ValueEvent, value: &Value) {
        self.shared.events[event.index()].notify(value);
    }

    /// Start an animation built by `factory`, stopping any running one.
    ///
    /// The factory receives the completion signal it must settle. The
    /// animation is released once that signal settles.
    pub fn start_animation<F>(&self, factory: F) -> Completion
    where
        F: FnOnce(Completion) -> Rc<dyn AnimationControls>,
    {
        self.stop();

        let completion = Completion::new();
        let controls = factory(completion.clone());
        *self.shared.animation.borrow_mut() = Some(ActiveAnimation {
            controls,
            completion: completion.clone(),
        });
        self.notify(ValueEvent::AnimationStart, &self.get());

        let weak = Rc::downgrade(&self.shared);
        let tracked = completion.clone();
        completion.on_settled(move |outcome| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let value = ReactiveValue { shared };
            if outcome == AnimationOutcome::Finished {
                value.notify(ValueEvent::AnimationComplete, &value.get());
            }
            value.clear_animation(&tracked);
        });

        completion
    }

    fn clear_animation(&self, completion: &Completion) {
        let mut animation = self.shared.animation.borrow_mut();
        if animation
            .as_ref()
            .is_some_and(|active| active.completion.ptr_eq(completion))
        {
            *animation = None;
        }
    }

    /// Stop the active animation, if any
    pub fn stop(&self) {
        let active = self.shared.animation.borrow_mut().take();
        if let Some(active) = active {
            tracing::trace!("stopping value animation");
            active.controls.stop();
            self.notify(ValueEvent::AnimationCancel, &self.get());
        }
    }

    pub fn is_animating(&self) -> bool {
        self.shared.animation.borrow().is_some()
    }

    /// The active animation's controls
    pub fn animation(&self) -> Option<Rc<dyn AnimationControls>> {
        self.shared
            .animation
            .borrow()
            .as_ref()
            .map(|active| active.controls.clone())
    }

    /// Remove every listener and stop the active animation
    pub fn destroy(&self) {
        for manager in &self.shared.events {
            manager.clear();
        }
        self.stop();
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.shared.scheduler
    }

    /// Stable identity of this value
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.shared) as usize
    }

    pub fn ptr_eq(&self, other: &ReactiveValue) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for ReactiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("ReactiveValue")
            .field("current", &state.current)
            .field("updated_at", &state.updated_at)
            .field("animating", &self.shared.animation.borrow().is_some())
            .finish()
    }
}

/// Handle for removing an event handler
#[must_use = "dropping a Subscription keeps the handler; call unsubscribe() to remove it"]
pub struct Subscription {
    value: Weak<ValueShared>,
    event: ValueEvent,
    id: HandlerId,
}

impl Subscription {
    /// Remove the handler.
    ///
    /// Removing the last `Change` handler stops the value's animation on the
    /// next read phase, unless a new handler shows up first.
    pub fn unsubscribe(self) {
        let Some(shared) = self.value.upgrade() else {
            return;
        };
        shared.events[self.event.index()].remove(self.id);

        if self.event == ValueEvent::Change {
            let weak = self.value.clone();
            shared.scheduler.schedule_fn(Phase::Read, move |_| {
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                if shared.events[ValueEvent::Change.index()].is_empty() {
                    ReactiveValue { shared }.stop();
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTime;
    use std::cell::Cell;

    fn setup() -> (ManualTime, SchedulerHandle) {
        let time = ManualTime::new(0.0);
        let scheduler = SchedulerHandle::with_time(time.clone());
        (time, scheduler)
    }

    fn advance(time: &ManualTime, scheduler: &SchedulerHandle, to: f64) {
        time.set(to);
        scheduler.end_turn();
    }

    struct CountingControls {
        stops: Rc<Cell<u32>>,
        completion: Completion,
    }

    impl AnimationControls for CountingControls {
        fn stop(&self) {
            self.stops.set(self.stops.get() + 1);
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

    fn start_counting(value: &ReactiveValue, stops: &Rc<Cell<u32>>) -> Completion {
        let stops = stops.clone();
        value.start_animation(move |completion| {
            Rc::new(CountingControls { stops, completion })
        })
    }

    #[test]
    fn test_velocity_from_recent_update() {
        let (time, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, 0.0);

        advance(&time, &scheduler, 16.0);
        value.set(10.0);
        assert!((value.velocity() - 625.0).abs() < 1e-9);

        advance(&time, &scheduler, 56.0);
        assert_eq!(value.velocity(), 0.0);
    }

    #[test]
    fn test_velocity_zero_for_non_numeric() {
        let (time, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, "auto");

        advance(&time, &scheduler, 16.0);
        value.set("10px");
        assert_eq!(value.velocity(), 0.0);
    }

    #[test]
    fn test_history_advances_once_per_time() {
        let (time, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, 0.0);

        advance(&time, &scheduler, 10.0);
        value.set(5.0);
        value.set(20.0);

        // Both sets share one timestamp: velocity measures from 0, not 5
        assert!((value.velocity() - 2000.0).abs() < 1e-9);
        assert_eq!(value.previous(), Some(Value::Number(5.0)));
    }

    #[test]
    fn test_change_and_render_notifications() {
        let (_, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, 1.0);
        let changes = Rc::new(Cell::new(0));
        let renders = Rc::new(Cell::new(0));

        let changes_clone = changes.clone();
        let _change = value.on(ValueEvent::Change, move |_| changes_clone.set(changes_clone.get() + 1));
        let renders_clone = renders.clone();
        let _render = value.on(ValueEvent::RenderRequest, move |_| renders_clone.set(renders_clone.get() + 1));

        value.set(1.0);
        assert_eq!(changes.get(), 0);
        assert_eq!(renders.get(), 1);

        value.set(2.0);
        assert_eq!(changes.get(), 1);
        assert_eq!(renders.get(), 2);

        value.set_quiet(3.0);
        assert_eq!(changes.get(), 2);
        assert_eq!(renders.get(), 2);
    }

    #[test]
    fn test_set_with_velocity() {
        let (time, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, 0.0);
        advance(&time, &scheduler, 100.0);

        value.set_with_velocity(90.0, 100.0, 5.0);
        assert!((value.velocity() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_jump_clears_velocity() {
        let (time, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, 0.0);
        advance(&time, &scheduler, 16.0);
        value.set(10.0);
        value.jump(50.0, true);
        assert_eq!(value.velocity(), 0.0);
        assert_eq!(value.get(), Value::Number(50.0));
    }

    #[test]
    fn test_start_animation_stops_previous() {
        let (_, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, 0.0);
        let stops = Rc::new(Cell::new(0));

        let first = start_counting(&value, &stops);
        assert!(value.is_animating());

        let second = start_counting(&value, &stops);
        assert_eq!(stops.get(), 1);
        assert_eq!(first.outcome(), Some(AnimationOutcome::Cancelled));
        assert!(!second.is_settled());
        assert!(value.is_animating());
    }

    #[test]
    fn test_completion_releases_animation() {
        let (_, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, 0.0);
        let stops = Rc::new(Cell::new(0));
        let completed = Rc::new(Cell::new(false));

        let completed_clone = completed.clone();
        let _sub = value.on(ValueEvent::AnimationComplete, move |_| completed_clone.set(true));

        start_counting(&value, &stops);
        value.animation().unwrap().complete();

        assert!(completed.get());
        assert!(!value.is_animating());
        assert_eq!(stops.get(), 0);
    }

    #[test]
    fn test_last_change_unsubscribe_stops_animation() {
        let (_, scheduler) = setup();
        let value = ReactiveValue::new(&scheduler, 0.0);
        let stops = Rc::new(Cell::new(0));

        let first = value.on(ValueEvent::Change, |_| {});
        let second = value.on(ValueEvent::Change, |_| {});
        start_counting(&value, &stops);

        first.unsubscribe();
        scheduler.tick(16.0);
        assert_eq!(stops.get(), 0);

        second.unsubscribe();
        assert!(value.is_animating());
        scheduler.tick(32.0);
        assert_eq!(stops.get(), 1);
        assert!(!value.is_animating());
    }
}
