//! Keyframe resolution
//!
//! Turns keyframes that may hold wildcards, CSS variables, `none` or
//! unit-mismatched layout values into concrete values. Deferred resolvers
//! are batched: every pending resolver reads in the `Read` phase, then
//! elements needing layout measurement are measured together in
//! `ResolveKeyframes` so the host lays out at most twice per frame.

use crate::mix::ComplexValue;
use crate::player::Keyframe;
use crate::transition::TRANSFORM_PROPERTIES;
use motio_core::{parse_float, BoundingBox, ElementAdapter, Job, Phase, ReactiveValue, SchedulerHandle, Value};
use regex::Regex;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::OnceLock;

/// Layout properties that may need measuring to convert between units
pub const POSITIONAL_KEYS: [&str; 6] = ["width", "height", "top", "left", "right", "bottom"];

/// Transform keys that survive measurement
const TRANSLATION_KEYS: [&str; 6] = ["x", "y", "z", "translateX", "translateY", "translateZ"];

const MAX_VARIABLE_DEPTH: usize = 4;

static VARIABLE_TOKEN: OnceLock<Regex> = OnceLock::new();
static DIMENSION: OnceLock<Regex> = OnceLock::new();
static ZERO_VALUE: OnceLock<Regex> = OnceLock::new();

fn variable_token() -> &'static Regex {
    VARIABLE_TOKEN.get_or_init(|| {
        Regex::new(r"^var\(\s*(--[\w-]+)\s*(?:,\s*(.+?))?\s*\)$").expect("Invalid variable token regex")
    })
}

fn dimension() -> &'static Regex {
    DIMENSION.get_or_init(|| {
        Regex::new(r"^([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)([a-z%]*)$").expect("Invalid dimension regex")
    })
}

fn zero_value() -> &'static Regex {
    ZERO_VALUE.get_or_init(|| Regex::new(r"^0[^.\s]+$").expect("Invalid zero value regex"))
}

/// Called with the resolved keyframes and the unresolved final keyframe,
/// if it differs from what was resolved
pub type ResolvedCallback = Box<dyn FnOnce(Vec<Value>, Option<Value>)>;

/// Unit class of a keyframe, for deciding whether layout must be measured
#[derive(Clone, Debug, PartialEq)]
enum Dimension {
    Number,
    Px,
    Auto,
    Unit(String),
    Unknown,
}

impl Dimension {
    fn of(value: &Value) -> Self {
        let text = match value {
            Value::Number(_) => return Dimension::Number,
            Value::Text(text) => text.trim(),
        };
        if text == "auto" {
            return Dimension::Auto;
        }
        match dimension().captures(text) {
            Some(captures) => match captures.get(2).map(|unit| unit.as_str()) {
                None | Some("") => Dimension::Number,
                Some("px") => Dimension::Px,
                Some(unit) => Dimension::Unit(unit.to_string()),
            },
            None => Dimension::Unknown,
        }
    }

    fn is_number_or_px(&self) -> bool {
        matches!(self, Dimension::Number | Dimension::Px)
    }
}

/// Whether a keyframe should take the zero of its siblings' template
fn is_none(keyframe: &Keyframe) -> bool {
    match keyframe {
        None => true,
        Some(Value::Number(n)) => *n == 0.0,
        Some(Value::Text(text)) => text == "none" || text == "0" || zero_value().is_match(text),
    }
}

/// Resolve `var(--name, fallback)` against `element`
fn resolve_variable(token: &str, element: &dyn ElementAdapter, depth: usize) -> Option<Value> {
    if depth > MAX_VARIABLE_DEPTH {
        tracing::warn!(token, "variable nesting too deep");
        return None;
    }
    let captures = variable_token().captures(token)?;
    let name = captures.get(1)?.as_str();
    let fallback = captures.get(2).map(|fallback| fallback.as_str());

    if let Some(resolved) = element.read_value(name) {
        return match resolved {
            Value::Text(text) => {
                let text = text.trim();
                if variable_token().is_match(text) {
                    resolve_variable(text, element, depth + 1)
                } else if let Ok(number) = text.parse::<f64>() {
                    Some(Value::Number(number))
                } else {
                    Some(Value::Text(text.to_string()))
                }
            }
            number => Some(number),
        };
    }

    match fallback {
        Some(fallback) if variable_token().is_match(fallback) => resolve_variable(fallback, element, depth + 1),
        Some(fallback) => Some(Value::from(fallback)),
        None => None,
    }
}

fn read_number(element: &dyn ElementAdapter, key: &str) -> f64 {
    element
        .read_value(key)
        .and_then(|value| value.as_number())
        .unwrap_or(0.0)
}

/// Measured value of a positional key
fn positional_value(name: &str, bounds: &BoundingBox, element: &dyn ElementAdapter) -> Option<f64> {
    let value = match name {
        "width" => bounds.width() - read_number(element, "paddingLeft") - read_number(element, "paddingRight"),
        "height" => bounds.height() - read_number(element, "paddingTop") - read_number(element, "paddingBottom"),
        "top" => read_number(element, "top"),
        "left" => read_number(element, "left"),
        "bottom" => read_number(element, "top") + bounds.height(),
        "right" => read_number(element, "left") + bounds.width(),
        _ => return None,
    };
    Some(value)
}

struct ResolverState {
    keyframes: Vec<Keyframe>,
    name: Option<String>,
    value: Option<ReactiveValue>,
    element: Option<Rc<dyn ElementAdapter>>,
    on_resolved: Option<ResolvedCallback>,
    final_keyframe: Option<Value>,
    measured_origin: Option<f64>,
    needs_measurement: bool,
    is_scheduled: bool,
    is_complete: bool,
}

/// Resolves one animation's keyframes
#[derive(Clone)]
pub struct KeyframeResolver {
    state: Rc<RefCell<ResolverState>>,
}

impl KeyframeResolver {
    pub fn new<F>(
        keyframes: Vec<Keyframe>,
        name: Option<String>,
        value: Option<ReactiveValue>,
        element: Option<Rc<dyn ElementAdapter>>,
        on_resolved: F,
    ) -> Self
    where
        F: FnOnce(Vec<Value>, Option<Value>) + 'static,
    {
        Self {
            state: Rc::new(RefCell::new(ResolverState {
                keyframes,
                name,
                value,
                element,
                on_resolved: Some(Box::new(on_resolved)),
                final_keyframe: None,
                measured_origin: None,
                needs_measurement: false,
                is_scheduled: false,
                is_complete: false,
            })),
        }
    }

    /// Resolve now, or queue for the next frame when `deferred`
    pub fn schedule(&self, queue: &ResolverQueue, deferred: bool) {
        self.state.borrow_mut().is_scheduled = true;
        if deferred {
            queue.add(self.clone());
        } else {
            self.read_keyframes();
            if self.needs_measurement() {
                measure(std::slice::from_ref(self));
            }
            self.complete();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state.borrow().is_complete
    }

    pub fn is_scheduled(&self) -> bool {
        self.state.borrow().is_scheduled
    }

    pub fn needs_measurement(&self) -> bool {
        self.state.borrow().needs_measurement
    }

    /// Current keyframes, resolved or not
    pub fn keyframes(&self) -> Vec<Keyframe> {
        self.state.borrow().keyframes.clone()
    }

    fn element(&self) -> Option<Rc<dyn ElementAdapter>> {
        self.state.borrow().element.clone()
    }

    /// Fill wildcards, resolve variables and `none`, and flag layout
    /// measurement for unit-mismatched positional keys
    pub fn read_keyframes(&self) {
        let mut state = self.state.borrow_mut();
        let state = &mut *state;

        fill_wildcards(state);

        if let Some(element) = state.element.clone() {
            let last = state.keyframes.len().saturating_sub(1);
            for index in 0..state.keyframes.len() {
                let Some(Value::Text(text)) = &state.keyframes[index] else {
                    continue;
                };
                let token = text.trim().to_string();
                if !variable_token().is_match(&token) {
                    continue;
                }
                if let Some(resolved) = resolve_variable(&token, element.as_ref(), 1) {
                    state.keyframes[index] = Some(resolved);
                }
                if index == last {
                    state.final_keyframe = Some(Value::Text(token));
                }
            }
        }

        resolve_none_keyframes(state);

        let positional = state
            .name
            .as_deref()
            .is_some_and(|name| POSITIONAL_KEYS.contains(&name));
        if !positional || state.element.is_none() || state.keyframes.len() != 2 {
            return;
        }

        let (Some(origin), Some(target)) = (&state.keyframes[0], &state.keyframes[1]) else {
            return;
        };
        let origin_dimension = Dimension::of(origin);
        let target_dimension = Dimension::of(target);
        if origin_dimension == target_dimension {
            return;
        }

        if origin_dimension.is_number_or_px() && target_dimension.is_number_or_px() {
            for keyframe in state.keyframes.iter_mut() {
                if let Some(Value::Text(text)) = keyframe {
                    if let Some(number) = parse_float(text) {
                        *keyframe = Some(Value::Number(number));
                    }
                }
            }
        } else {
            tracing::debug!(name = ?state.name, "keyframes need layout measurement");
            state.needs_measurement = true;
        }
    }

    fn measure_initial_state(&self) {
        let Some(element) = self.element() else {
            return;
        };
        let bounds = element.measure_viewport_box();

        let (name, target) = {
            let mut state = self.state.borrow_mut();
            let Some(name) = state.name.clone() else {
                return;
            };
            let origin = positional_value(&name, &bounds, element.as_ref());
            state.measured_origin = origin;
            if let (Some(origin), Some(first)) = (origin, state.keyframes.first_mut()) {
                *first = Some(Value::Number(origin));
            }
            (name, state.keyframes.last().cloned().flatten())
        };

        if let (Some(target), Some(value)) = (target, element.get_value(&name)) {
            value.jump(target, false);
        }
    }

    fn measure_end_state(&self) {
        let Some(element) = self.element() else {
            return;
        };
        let (name, origin) = {
            let state = self.state.borrow();
            let Some(name) = state.name.clone() else {
                return;
            };
            (name, state.measured_origin)
        };

        if let (Some(value), Some(origin)) = (element.get_value(&name), origin) {
            value.jump(origin, false);
        }

        let bounds = element.measure_viewport_box();
        let mut state = self.state.borrow_mut();
        let Some(last) = state.keyframes.len().checked_sub(1) else {
            return;
        };
        let target = state.keyframes[last].clone();
        if let Some(measured) = positional_value(&name, &bounds, element.as_ref()) {
            state.keyframes[last] = Some(Value::Number(measured));
        }
        if target.is_some() && state.final_keyframe.is_none() {
            state.final_keyframe = target;
        }
        resolve_none_keyframes(&mut state);
    }

    fn complete(&self) {
        let (keyframes, final_keyframe, callback) = {
            let mut state = self.state.borrow_mut();
            if state.is_complete {
                return;
            }
            state.is_complete = true;
            fill_wildcards(&mut state);
            let keyframes: Vec<Value> = state.keyframes.iter().flatten().cloned().collect();
            (keyframes, state.final_keyframe.clone(), state.on_resolved.take())
        };

        if let Some(callback) = callback {
            callback(keyframes, final_keyframe);
        }
    }

    /// Drop out of the queue without resolving
    pub fn cancel(&self, queue: &ResolverQueue) {
        let mut state = self.state.borrow_mut();
        if !state.is_complete {
            state.is_scheduled = false;
            drop(state);
            queue.remove(self);
        }
    }

    pub fn ptr_eq(&self, other: &KeyframeResolver) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for KeyframeResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("KeyframeResolver")
            .field("keyframes", &state.keyframes)
            .field("name", &state.name)
            .field("is_complete", &state.is_complete)
            .finish()
    }
}

/// Fill a missing origin from the value, the element, or the target, then
/// copy each remaining wildcard from its predecessor
fn fill_wildcards(state: &mut ResolverState) {
    let final_keyframe = state.keyframes.last().cloned().flatten();

    for index in 0..state.keyframes.len() {
        if state.keyframes[index].is_some() {
            continue;
        }
        if index == 0 {
            let current = state.value.as_ref().map(|value| value.get());
            let read = match (&state.element, state.name.as_deref()) {
                (Some(element), Some(name)) if current.is_none() => element.read_value(name),
                _ => None,
            };
            let origin = current.or(read).or_else(|| final_keyframe.clone());
            state.keyframes[0] = origin;
        } else {
            state.keyframes[index] = state.keyframes[index - 1].clone();
        }
    }
}

/// Give `none` keyframes the zero of the first animatable sibling template
fn resolve_none_keyframes(state: &mut ResolverState) {
    let none_indexes: Vec<usize> = state
        .keyframes
        .iter()
        .enumerate()
        .filter(|(_, keyframe)| is_none(keyframe))
        .map(|(index, _)| index)
        .collect();
    if none_indexes.is_empty() || state.name.is_none() {
        return;
    }

    let template = state.keyframes.iter().find_map(|keyframe| match keyframe {
        Some(Value::Text(text)) if !matches!(text.as_str(), "auto" | "none" | "0") => {
            let parsed = ComplexValue::parse(text);
            (!parsed.is_empty()).then_some(parsed)
        }
        _ => None,
    });

    if let Some(template) = template {
        let zero = template.zero();
        for index in none_indexes {
            state.keyframes[index] = Some(Value::Text(zero.clone()));
        }
    }
}

/// Remove non-translation transforms from `element`, returning what to restore
fn remove_non_translation_transforms(element: &dyn ElementAdapter) -> Vec<(ReactiveValue, Value)> {
    TRANSFORM_PROPERTIES
        .iter()
        .filter(|key| !TRANSLATION_KEYS.contains(key))
        .filter_map(|key| {
            let value = element.get_value(key)?;
            let original = value.get();
            value.set(if key.starts_with("scale") { 1.0 } else { 0.0 });
            Some((value, original))
        })
        .collect()
}

fn element_key(element: &Rc<dyn ElementAdapter>) -> *const () {
    Rc::as_ptr(element) as *const ()
}

/// Measure every resolver in `resolvers` that needs it, rendering each
/// element at most twice
fn measure(resolvers: &[KeyframeResolver]) {
    let measuring: Vec<&KeyframeResolver> = resolvers.iter().filter(|r| r.needs_measurement()).collect();
    if measuring.is_empty() {
        return;
    }

    let mut elements: Vec<Rc<dyn ElementAdapter>> = Vec::new();
    for resolver in &measuring {
        if let Some(element) = resolver.element() {
            if !elements.iter().any(|seen| element_key(seen) == element_key(&element)) {
                elements.push(element);
            }
        }
    }
    tracing::debug!(resolvers = measuring.len(), elements = elements.len(), "measuring keyframes");

    let mut restore = Vec::new();
    for element in &elements {
        let removed = remove_non_translation_transforms(element.as_ref());
        if !removed.is_empty() {
            element.render();
            restore.push(removed);
        }
    }

    for resolver in &measuring {
        resolver.measure_initial_state();
    }

    for element in &elements {
        element.render();
    }
    for (value, original) in restore.into_iter().flatten() {
        value.set(original);
    }

    for resolver in &measuring {
        resolver.measure_end_state();
    }
}

struct QueueState {
    scheduler: SchedulerHandle,
    pending: RefCell<Vec<KeyframeResolver>>,
    read: RefCell<Vec<KeyframeResolver>>,
    any_needs_measurement: Cell<bool>,
    jobs: RefCell<Option<(Job, Job)>>,
}

/// Batches deferred resolvers into the scheduler's read phases
#[derive(Clone)]
pub struct ResolverQueue {
    state: Rc<QueueState>,
}

impl ResolverQueue {
    pub fn new(scheduler: &SchedulerHandle) -> Self {
        Self {
            state: Rc::new(QueueState {
                scheduler: scheduler.clone(),
                pending: RefCell::new(Vec::new()),
                read: RefCell::new(Vec::new()),
                any_needs_measurement: Cell::new(false),
                jobs: RefCell::new(None),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.state.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn add(&self, resolver: KeyframeResolver) {
        {
            let mut pending = self.state.pending.borrow_mut();
            if pending.iter().any(|queued| queued.ptr_eq(&resolver)) {
                return;
            }
            pending.push(resolver);
        }

        if self.state.jobs.borrow().is_some() {
            return;
        }
        let reader = self.clone();
        let measurer = self.clone();
        let scheduler = &self.state.scheduler;
        let read = scheduler.schedule_fn(Phase::Read, move |_| reader.read_all());
        let resolve = scheduler.schedule_fn(Phase::ResolveKeyframes, move |_| measurer.measure_all());
        *self.state.jobs.borrow_mut() = Some((read, resolve));
    }

    fn remove(&self, resolver: &KeyframeResolver) {
        self.state.pending.borrow_mut().retain(|queued| !queued.ptr_eq(resolver));
        self.state.read.borrow_mut().retain(|read| !read.ptr_eq(resolver));
    }

    fn read_all(&self) {
        let pending = self.state.pending.borrow().clone();
        for resolver in pending {
            self.read_once(&resolver);
        }
    }

    fn read_once(&self, resolver: &KeyframeResolver) {
        if self.state.read.borrow().iter().any(|read| read.ptr_eq(resolver)) {
            return;
        }
        resolver.read_keyframes();
        if resolver.needs_measurement() {
            self.state.any_needs_measurement.set(true);
        }
        self.state.read.borrow_mut().push(resolver.clone());
    }

    fn measure_all(&self) {
        let pending = self.state.pending.borrow().clone();
        // Added after the read pass ran
        for resolver in &pending {
            self.read_once(resolver);
        }
        if self.state.any_needs_measurement.get() {
            measure(&pending);
        }
        self.state.any_needs_measurement.set(false);
        self.state.jobs.borrow_mut().take();

        self.state.pending.borrow_mut().clear();
        self.state.read.borrow_mut().clear();
        for resolver in pending {
            resolver.complete();
        }
    }

    /// Resolve everything pending right now
    pub fn flush(&self) {
        if let Some((read, resolve)) = self.state.jobs.borrow_mut().take() {
            self.state.scheduler.cancel(&read);
            self.state.scheduler.cancel(&resolve);
        }
        self.read_all();
        self.measure_all();
    }
}

impl fmt::Debug for ResolverQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverQueue").field("pending", &self.len()).finish()
    }
}
