//! Test doubles: an element adapter and a native compositor
#![allow(dead_code)]

use motio_animation::player::{NativeAnimation, NativeAnimationHost, NativeError, NativeKeyframeOptions, NativePlayState};
use motio_animation::MotionContext;
use motio_core::{Axis, BoundingBox, ElementAdapter, ManualTime, ReactiveValue, SchedulerHandle, Value};
use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub struct Harness {
    pub time: ManualTime,
    pub scheduler: SchedulerHandle,
    pub ctx: MotionContext,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let time = ManualTime::new(0.0);
        let scheduler = SchedulerHandle::with_time(time.clone());
        let ctx = MotionContext::new(&scheduler);
        Self { time, scheduler, ctx }
    }

    pub fn with_compositor(compositor: &Rc<MockCompositor>) -> Self {
        let mut harness = Self::new();
        harness.ctx = harness.ctx.with_native_host(compositor.clone());
        harness
    }

    /// Move the clock and run one frame at `ms`
    pub fn frame(&self, ms: f64) {
        self.time.set(ms);
        self.scheduler.end_turn();
        self.scheduler.tick(ms);
    }

    /// Run 16ms frames from `from` up to and including `to`
    pub fn frames(&self, from: f64, to: f64) {
        let mut t = from;
        while t <= to {
            self.frame(t);
            t += 16.0;
        }
    }
}

/// Route engine logs through the test writer; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An element whose values and styles live in maps
#[derive(Default)]
pub struct TestElement {
    styles: RefCell<FxHashMap<String, Value>>,
    values: RefCell<FxHashMap<String, ReactiveValue>>,
    bounds: Cell<BoundingBox>,
    renders: Cell<usize>,
}

impl TestElement {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_style(self: Rc<Self>, key: &str, value: impl Into<Value>) -> Rc<Self> {
        self.styles.borrow_mut().insert(key.to_string(), value.into());
        self
    }

    pub fn set_bounds(&self, width: f64, height: f64) {
        self.bounds
            .set(BoundingBox::new(Axis::new(0.0, width), Axis::new(0.0, height)));
    }

    pub fn value(&self, key: &str) -> Option<ReactiveValue> {
        self.values.borrow().get(key).cloned()
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.value(key).and_then(|value| value.get_number())
    }

    pub fn renders(&self) -> usize {
        self.renders.get()
    }
}

impl ElementAdapter for TestElement {
    fn read_value(&self, key: &str) -> Option<Value> {
        self.styles.borrow().get(key).cloned()
    }

    fn render(&self) {
        self.renders.set(self.renders.get() + 1);
    }

    fn measure_viewport_box(&self) -> BoundingBox {
        self.bounds.get()
    }

    fn get_value(&self, key: &str) -> Option<ReactiveValue> {
        self.value(key)
    }

    fn add_value(&self, key: &str, value: ReactiveValue) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }
}

/// One animation handed to the mock compositor
pub struct MockAnimation {
    pub name: String,
    pub keyframes: Vec<Value>,
    pub options: NativeKeyframeOptions,
    state: Cell<NativePlayState>,
    current_time: Cell<Option<f64>>,
    start_time: Cell<Option<f64>>,
    rate: Cell<f64>,
    cancelled: Cell<bool>,
    on_finish: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl MockAnimation {
    fn new(name: &str, keyframes: &[Value], options: &NativeKeyframeOptions) -> Self {
        Self {
            name: name.to_string(),
            keyframes: keyframes.to_vec(),
            options: options.clone(),
            state: Cell::new(NativePlayState::Idle),
            current_time: Cell::new(None),
            start_time: Cell::new(None),
            rate: Cell::new(1.0),
            cancelled: Cell::new(false),
            on_finish: RefCell::new(None),
        }
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time.get()
    }

    pub fn rate(&self) -> f64 {
        self.rate.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    fn active_duration(&self) -> f64 {
        self.options.delay + self.options.duration * self.options.iterations
    }

    /// Advance the compositor's timeline to `now`, finishing if past the end
    pub fn advance_to(&self, now: f64) {
        if self.state.get() != NativePlayState::Running {
            return;
        }
        let start = self.start_time.get().unwrap_or(0.0);
        let time = (now - start) * self.rate.get();
        self.current_time.set(Some(time));
        if time >= self.active_duration() {
            self.finish();
        }
    }
}

impl NativeAnimation for MockAnimation {
    fn play(&self) {
        self.state.set(NativePlayState::Running);
    }

    fn pause(&self) {
        self.state.set(NativePlayState::Paused);
    }

    fn cancel(&self) {
        self.cancelled.set(true);
        self.state.set(NativePlayState::Idle);
        self.current_time.set(None);
    }

    fn finish(&self) {
        self.state.set(NativePlayState::Finished);
        self.current_time.set(Some(self.active_duration()));
        let callback = self.on_finish.borrow_mut().take();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn play_state(&self) -> NativePlayState {
        self.state.get()
    }

    fn current_time(&self) -> Option<f64> {
        self.current_time.get()
    }

    fn set_current_time(&self, ms: f64) {
        self.current_time.set(Some(ms));
    }

    fn set_start_time(&self, ms: f64) {
        self.start_time.set(Some(ms));
    }

    fn set_playback_rate(&self, rate: f64) {
        self.rate.set(rate);
    }

    fn set_on_finish(&self, callback: Box<dyn FnOnce()>) {
        *self.on_finish.borrow_mut() = Some(callback);
    }
}

/// A compositor that records what it is asked to run
#[derive(Default)]
pub struct MockCompositor {
    pub linear_easing: bool,
    pub detached: Cell<bool>,
    pub refuse: Cell<bool>,
    unsupported: RefCell<Vec<String>>,
    animations: RefCell<Vec<Rc<MockAnimation>>>,
}

impl MockCompositor {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_linear_easing() -> Rc<Self> {
        Rc::new(Self {
            linear_easing: true,
            ..Default::default()
        })
    }

    pub fn disable(&self, name: &str) {
        self.unsupported.borrow_mut().push(name.to_string());
    }

    pub fn animations(&self) -> Vec<Rc<MockAnimation>> {
        self.animations.borrow().clone()
    }

    pub fn last(&self) -> Option<Rc<MockAnimation>> {
        self.animations.borrow().last().cloned()
    }

    /// Advance every running animation to `now`
    pub fn advance_to(&self, now: f64) {
        for animation in self.animations() {
            animation.advance_to(now);
        }
    }
}

impl NativeAnimationHost for MockCompositor {
    fn supports(&self, name: &str) -> bool {
        !self.unsupported.borrow().iter().any(|disabled| disabled == name)
    }

    fn supports_linear_easing(&self) -> bool {
        self.linear_easing
    }

    fn animate(
        &self,
        _element: &Rc<dyn ElementAdapter>,
        name: &str,
        keyframes: &[Value],
        options: &NativeKeyframeOptions,
    ) -> Result<Rc<dyn NativeAnimation>, NativeError> {
        if self.detached.get() {
            return Err(NativeError::Detached);
        }
        if self.refuse.get() {
            return Err(NativeError::Unsupported(format!("{name} refused")));
        }
        let animation = Rc::new(MockAnimation::new(name, keyframes, options));
        self.animations.borrow_mut().push(animation.clone());
        Ok(animation)
    }
}
