//! Timeline sequences
//!
//! A sequence is an ordered list of [`Segment`]s: labels, and animations of
//! one or more targets. [`compile_sequence`] lays the segments out on one
//! timeline and flattens them into a single keyframe track per target value,
//! with offsets scaled to `0..=1` of the total duration. [`play_sequence`]
//! then runs every track as an ordinary value animation.
//!
//! # Example
//!
//! ```ignore
//! let sequence: Vec<Segment> = vec![
//!     Segment::animate(Target::Element(a)).key("x", [0.0, 100.0]).into(),
//!     Segment::label("settled"),
//!     Segment::animate(Target::Element(b))
//!         .key("opacity", [1.0])
//!         .transition(SegmentTransition::new().at("<"))
//!         .into(),
//! ];
//! let compiled = compile_sequence(&sequence, &SequenceOptions::default());
//! ```

use crate::animate::{animate_element, animate_value, ValueAnimation};
use crate::context::MotionContext;
use crate::easing::Easing;
use crate::generators::keyframes::default_offsets;
use crate::generators::{generator_easing, AnimationType, GeneratorOptions};
use crate::interpolate::progress;
use crate::mix::mix_number;
use crate::player::{AnimationOptions, AnimationPlayer, Keyframe, RepeatType};
use indexmap::IndexMap;
use motio_core::{parse_float, AnimationOutcome, Completion, ElementId, ElementRegistry, ReactiveValue, Value};
use rustc_hash::FxHashMap;
use std::cell::Cell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Segment repeats above this are clamped
pub const MAX_REPEAT: u32 = 20;

/// Track key used for bare reactive values
pub const DEFAULT_TRACK: &str = "default";

/// Where a segment starts
#[derive(Clone, Debug, PartialEq)]
pub enum At {
    /// Milliseconds from the start of the sequence
    Absolute(f64),
    /// Offset from the end of the previous segment (`"+100"`, `"-100"`)
    Relative(f64),
    /// Same start as the previous segment (`"<"`)
    Previous,
    /// Offset from the start of the previous segment (`"<+100"`)
    PreviousOffset(f64),
    /// A named label
    Label(String),
}

impl At {
    /// Parse the string form: `"+n"`, `"-n"`, `"<"`, `"<±n"` or a label name
    pub fn parse(text: &str) -> At {
        if text.starts_with('+') || text.starts_with('-') {
            if let Some(offset) = parse_float(text) {
                return At::Relative(offset);
            }
        }
        if text == "<" {
            return At::Previous;
        }
        if let Some(rest) = text.strip_prefix('<') {
            return At::PreviousOffset(parse_float(rest).unwrap_or(0.0));
        }
        At::Label(text.to_string())
    }

    /// Resolve against the timeline cursors
    fn resolve(&self, current: f64, previous: f64, labels: &FxHashMap<String, f64>) -> f64 {
        match self {
            At::Absolute(time) => *time,
            At::Relative(offset) => (current + offset).max(0.0),
            At::Previous => previous,
            At::PreviousOffset(offset) => (previous + offset).max(0.0),
            At::Label(name) => labels.get(name).copied().unwrap_or(current),
        }
    }
}

impl From<f64> for At {
    fn from(time: f64) -> Self {
        At::Absolute(time)
    }
}

impl From<&str> for At {
    fn from(text: &str) -> Self {
        At::parse(text)
    }
}

/// Element index a stagger counts distance from
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum StaggerFrom {
    #[default]
    First,
    Last,
    Center,
    Index(usize),
}

/// Delays spread over a segment's targets
#[derive(Clone, Debug)]
pub struct Stagger {
    pub each: f64,
    pub start: f64,
    pub from: StaggerFrom,
    pub ease: Option<Easing>,
}

impl Stagger {
    pub fn new(each_ms: f64) -> Self {
        Self {
            each: each_ms,
            start: 0.0,
            from: StaggerFrom::First,
            ease: None,
        }
    }

    pub fn start(mut self, start_ms: f64) -> Self {
        self.start = start_ms;
        self
    }

    pub fn origin(mut self, from: StaggerFrom) -> Self {
        self.from = from;
        self
    }

    pub fn ease(mut self, easing: Easing) -> Self {
        self.ease = Some(easing);
        self
    }

    /// Delay for target `index` of `total`
    pub fn delay(&self, index: usize, total: usize) -> f64 {
        let last = total.saturating_sub(1) as f64;
        let origin = match self.from {
            StaggerFrom::First => 0.0,
            StaggerFrom::Last => last,
            StaggerFrom::Center => last / 2.0,
            StaggerFrom::Index(i) => i as f64,
        };
        let mut delay = self.each * (origin - index as f64).abs();

        if let Some(ease) = &self.ease {
            let max_delay = total as f64 * self.each;
            if max_delay > 0.0 {
                delay = ease.apply(delay / max_delay) * max_delay;
            }
        }
        self.start + delay
    }
}

/// Delay before a segment's values start
#[derive(Clone, Debug)]
pub enum Delay {
    Fixed(f64),
    Stagger(Stagger),
}

impl Default for Delay {
    fn default() -> Self {
        Delay::Fixed(0.0)
    }
}

impl Delay {
    fn resolve(&self, index: usize, total: usize) -> f64 {
        match self {
            Delay::Fixed(delay) => *delay,
            Delay::Stagger(stagger) => stagger.delay(index, total),
        }
    }
}

/// Timing of one segment, optionally overridden per value
#[derive(Clone, Debug, Default)]
pub struct SegmentTransition {
    pub at: Option<At>,
    pub delay: Delay,
    pub duration: Option<f64>,
    pub ease: Vec<Easing>,
    pub times: Option<Vec<f64>>,
    pub kind: AnimationType,
    pub repeat: u32,
    pub overrides: IndexMap<String, SegmentTransition>,
}

impl SegmentTransition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, at: impl Into<At>) -> Self {
        self.at = Some(at.into());
        self
    }

    pub fn delay(mut self, delay_ms: f64) -> Self {
        self.delay = Delay::Fixed(delay_ms);
        self
    }

    pub fn stagger(mut self, stagger: Stagger) -> Self {
        self.delay = Delay::Stagger(stagger);
        self
    }

    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn ease(mut self, easing: Easing) -> Self {
        self.ease = vec![easing];
        self
    }

    pub fn ease_segments(mut self, easings: Vec<Easing>) -> Self {
        self.ease = easings;
        self
    }

    pub fn times(mut self, times: Vec<f64>) -> Self {
        self.times = Some(times);
        self
    }

    pub fn kind(mut self, kind: AnimationType) -> Self {
        self.kind = kind;
        self
    }

    pub fn repeat(mut self, count: u32) -> Self {
        self.repeat = count;
        self
    }

    /// Replace the whole transition for value `name`
    pub fn for_key(mut self, name: impl Into<String>, transition: SegmentTransition) -> Self {
        self.overrides.insert(name.into(), transition);
        self
    }

    fn for_value(&self, name: &str) -> &SegmentTransition {
        self.overrides
            .get(name)
            .or_else(|| self.overrides.get(DEFAULT_TRACK))
            .unwrap_or(self)
    }
}

/// What a segment animates
#[derive(Clone)]
pub enum Target {
    Element(ElementId),
    Value(ReactiveValue),
}

impl Target {
    pub fn key(&self) -> TargetKey {
        match self {
            Target::Element(id) => TargetKey::Element(*id),
            Target::Value(value) => TargetKey::Value(value.id()),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Element(id) => f.debug_tuple("Element").field(id).finish(),
            Target::Value(value) => f.debug_tuple("Value").field(&value.id()).finish(),
        }
    }
}

/// Identity of a target in a compiled sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetKey {
    Element(ElementId),
    Value(usize),
}

/// Keyframes for one or more targets
#[derive(Clone, Debug)]
pub struct AnimateSegment {
    pub targets: Vec<Target>,
    pub keyframes: IndexMap<String, Vec<Keyframe>>,
    pub transition: SegmentTransition,
}

impl AnimateSegment {
    /// Animate `values` of the segment's targets under `name`
    pub fn key<I, K>(self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Value>,
    {
        self.keyframes(name, values.into_iter().map(|v| Some(v.into())).collect())
    }

    /// Like [`AnimateSegment::key`], allowing `None` wildcards
    pub fn keyframes(mut self, name: impl Into<String>, keyframes: Vec<Keyframe>) -> Self {
        self.keyframes.insert(name.into(), keyframes);
        self
    }

    pub fn transition(mut self, transition: SegmentTransition) -> Self {
        self.transition = transition;
        self
    }
}

impl From<AnimateSegment> for Segment {
    fn from(segment: AnimateSegment) -> Self {
        Segment::Animate(segment)
    }
}

/// One step of a sequence
#[derive(Clone, Debug)]
pub enum Segment {
    /// Name the current time
    Label(String),
    /// Name a resolved time without moving the cursor
    LabelAt { name: String, at: At },
    Animate(AnimateSegment),
}

impl Segment {
    pub fn label(name: impl Into<String>) -> Self {
        Segment::Label(name.into())
    }

    pub fn label_at(name: impl Into<String>, at: impl Into<At>) -> Self {
        Segment::LabelAt {
            name: name.into(),
            at: at.into(),
        }
    }

    pub fn animate(target: Target) -> AnimateSegment {
        Self::animate_all(vec![target])
    }

    /// Animate several targets with the same keyframes, e.g. to stagger them
    pub fn animate_all(targets: Vec<Target>) -> AnimateSegment {
        AnimateSegment {
            targets,
            keyframes: IndexMap::new(),
            transition: SegmentTransition::default(),
        }
    }

    /// Animate a bare reactive value through `values`
    pub fn value<I, K>(value: &ReactiveValue, values: I) -> AnimateSegment
    where
        I: IntoIterator<Item = K>,
        K: Into<Value>,
    {
        Self::animate(Target::Value(value.clone())).key(DEFAULT_TRACK, values)
    }
}

/// Timing shared by every track of a sequence
#[derive(Clone, Debug)]
pub struct SequenceOptions {
    /// Duration of segments that set none
    pub default_duration: f64,
    /// Easing of segments that set none
    pub default_ease: Easing,
    pub delay: f64,
    pub repeat: u32,
    pub repeat_type: RepeatType,
    pub repeat_delay: f64,
}

impl Default for SequenceOptions {
    fn default() -> Self {
        Self {
            default_duration: 300.0,
            default_ease: Easing::EaseOut,
            delay: 0.0,
            repeat: 0,
            repeat_type: RepeatType::Loop,
            repeat_delay: 0.0,
        }
    }
}

/// A keyframe placed at an absolute time
#[derive(Clone, Debug)]
pub struct TimelineEntry {
    pub value: Keyframe,
    /// Milliseconds from the start of the sequence
    pub at: f64,
    /// Easing of the segment leading away from this keyframe
    pub easing: Easing,
}

/// The flattened keyframes of one value
#[derive(Clone, Debug)]
pub struct CompiledTrack {
    pub keyframes: Vec<Keyframe>,
    /// Offsets in `0..=1`, one per keyframe
    pub times: Vec<f64>,
    /// One easing per keyframe segment
    pub ease: Vec<Easing>,
}

impl CompiledTrack {
    /// Player options running this track over `duration` milliseconds
    pub fn options(&self, duration: f64, sequence: &SequenceOptions) -> AnimationOptions {
        AnimationOptions::with_keyframes(self.keyframes.clone())
            .duration(duration)
            .ease_segments(self.ease.clone())
            .times(self.times.clone())
            .delay(sequence.delay)
            .repeat(sequence.repeat, sequence.repeat_type)
            .repeat_delay(sequence.repeat_delay)
    }
}

/// Every track of one target
#[derive(Clone, Debug)]
pub struct CompiledTarget {
    pub target: Target,
    pub tracks: IndexMap<String, CompiledTrack>,
}

/// A sequence laid out on one timeline
#[derive(Clone, Debug, Default)]
pub struct CompiledSequence {
    pub targets: IndexMap<TargetKey, CompiledTarget>,
    /// Milliseconds
    pub total_duration: f64,
    pub labels: FxHashMap<String, f64>,
}

impl CompiledSequence {
    pub fn track(&self, target: TargetKey, name: &str) -> Option<&CompiledTrack> {
        self.targets.get(&target)?.tracks.get(name)
    }
}

fn segment_easing(easings: &[Easing], index: usize) -> Easing {
    match easings.len() {
        0 => Easing::EaseOut,
        n => easings[index % n].clone(),
    }
}

/// Offsets for `count` keyframes: authored times, padded evenly up to 1
fn keyframe_times(authored: Option<&Vec<f64>>, count: usize) -> Vec<f64> {
    let Some(authored) = authored.filter(|times| !times.is_empty()) else {
        return default_offsets(count);
    };
    let mut times = authored.clone();
    if times.len() == 1 && times[0] == 0.0 {
        times.push(1.0);
    }
    if times.len() > count {
        times.truncate(count.max(2));
    }
    let remaining = count.saturating_sub(times.len());
    if remaining > 0 {
        let last = times[times.len() - 1];
        for i in 1..=remaining {
            times.push(mix_number(last, 1.0, progress(0.0, remaining as f64, i as f64)));
        }
    }
    times
}

struct TimelineBuilder<'a> {
    options: &'a SequenceOptions,
    tracks: IndexMap<TargetKey, (Target, IndexMap<String, Vec<TimelineEntry>>)>,
    labels: FxHashMap<String, f64>,
    current: f64,
    previous: f64,
    total: f64,
}

impl<'a> TimelineBuilder<'a> {
    fn new(options: &'a SequenceOptions) -> Self {
        Self {
            options,
            tracks: IndexMap::new(),
            labels: FxHashMap::default(),
            current: 0.0,
            previous: 0.0,
            total: 0.0,
        }
    }

    fn push(&mut self, segment: &Segment) {
        match segment {
            Segment::Label(name) => {
                self.labels.insert(name.clone(), self.current);
            }
            Segment::LabelAt { name, at } => {
                let time = at.resolve(self.current, self.previous, &self.labels);
                self.labels.insert(name.clone(), time);
            }
            Segment::Animate(segment) => self.push_animation(segment),
        }
    }

    fn push_animation(&mut self, segment: &AnimateSegment) {
        if let Some(at) = &segment.transition.at {
            self.current = at.resolve(self.current, self.previous, &self.labels);
        }

        let total_targets = segment.targets.len();
        let mut max_duration: f64 = 0.0;
        for (index, target) in segment.targets.iter().enumerate() {
            for (name, keyframes) in &segment.keyframes {
                let transition = segment.transition.for_value(name);
                let span = self.push_value(target, name, keyframes, transition, index, total_targets);
                max_duration = max_duration.max(span);
            }
        }

        self.previous = self.current;
        self.current += max_duration;
    }

    /// Place one value's keyframes, returning delay plus duration
    fn push_value(
        &mut self,
        target: &Target,
        name: &str,
        authored: &[Keyframe],
        transition: &SegmentTransition,
        index: usize,
        total_targets: usize,
    ) -> f64 {
        let mut keyframes = authored.to_vec();
        let delay = transition.delay.resolve(index, total_targets);
        let mut ease = if transition.ease.is_empty() {
            vec![self.options.default_ease.clone()]
        } else {
            transition.ease.clone()
        };
        let mut duration = transition.duration;

        let physics = matches!(transition.kind, AnimationType::Spring(_) | AnimationType::Custom(_));
        if keyframes.len() <= 2 && physics {
            let scale = match keyframes.as_slice() {
                [Some(Value::Number(from)), Some(Value::Number(to))] if from != to => (to - from).abs(),
                _ => 100.0,
            };
            let generator = GeneratorOptions {
                duration,
                ..Default::default()
            };
            let (easing, generated) = generator_easing(&transition.kind, &generator, scale);
            ease = vec![easing];
            duration = Some(generated);
        }
        let mut duration = duration.unwrap_or(self.options.default_duration);

        let start = self.current + delay;
        let mut times = keyframe_times(transition.times.as_ref(), keyframes.len());
        if keyframes.len() == 1 {
            keyframes.insert(0, None);
            if times.len() < 2 {
                times = vec![0.0, 1.0];
            }
        }

        let segments = keyframes.len().saturating_sub(1);
        ease = (0..segments).map(|i| segment_easing(&ease, i)).collect();

        let mut repeat = transition.repeat;
        if repeat > MAX_REPEAT {
            tracing::warn!(repeat, max = MAX_REPEAT, "timeline segment repeat clamped");
            repeat = MAX_REPEAT;
        }
        if repeat > 0 {
            duration *= (repeat + 1) as f64;
            let original_keyframes = keyframes.clone();
            let original_times = times.clone();
            let original_ease = ease.clone();
            for iteration in 1..=repeat {
                keyframes.extend(original_keyframes.iter().cloned());
                for (i, time) in original_times.iter().enumerate() {
                    times.push(time + iteration as f64);
                    ease.push(if i == 0 {
                        Easing::Linear
                    } else {
                        segment_easing(&original_ease, i - 1)
                    });
                }
            }
            let count = (repeat + 1) as f64;
            for time in &mut times {
                *time /= count;
            }
        }

        let end = start + duration;
        let track = self.track(target, name);
        track.retain(|entry| entry.at <= start || entry.at >= end);
        for (i, (value, offset)) in keyframes.into_iter().zip(&times).enumerate() {
            track.push(TimelineEntry {
                value,
                at: mix_number(start, end, *offset),
                easing: segment_easing(&ease, i),
            });
        }

        self.total = self.total.max(end);
        delay + duration
    }

    fn track(&mut self, target: &Target, name: &str) -> &mut Vec<TimelineEntry> {
        let (_, tracks) = self
            .tracks
            .entry(target.key())
            .or_insert_with(|| (target.clone(), IndexMap::new()));
        tracks.entry(name.to_string()).or_default()
    }

    fn finish(self) -> CompiledSequence {
        let total = self.total;
        let targets = self
            .tracks
            .into_iter()
            .map(|(key, (target, tracks))| {
                let tracks = tracks
                    .into_iter()
                    .map(|(name, entries)| (name, flatten_track(entries, total)))
                    .collect();
                (key, CompiledTarget { target, tracks })
            })
            .collect();

        CompiledSequence {
            targets,
            total_duration: total,
            labels: self.labels,
        }
    }
}

/// Earlier time first; at equal times a `None` keyframe sorts last
fn compare_entries(a: &TimelineEntry, b: &TimelineEntry) -> Ordering {
    match a.at.partial_cmp(&b.at) {
        Some(Ordering::Equal) | None => match (&a.value, &b.value) {
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            _ => Ordering::Equal,
        },
        Some(order) => order,
    }
}

fn flatten_track(mut entries: Vec<TimelineEntry>, total: f64) -> CompiledTrack {
    entries.sort_by(compare_entries);

    let mut keyframes = Vec::with_capacity(entries.len() + 2);
    let mut times = Vec::with_capacity(entries.len() + 2);
    let mut ease = Vec::with_capacity(entries.len() + 1);
    for entry in entries {
        keyframes.push(entry.value);
        times.push(progress(0.0, total, entry.at));
        ease.push(entry.easing);
    }

    if times.first().is_some_and(|first| *first != 0.0) {
        times.insert(0, 0.0);
        keyframes.insert(0, keyframes[0].clone());
        ease.insert(0, Easing::EaseInOut);
    }
    if times.last().is_some_and(|last| *last != 1.0) {
        times.push(1.0);
        keyframes.push(None);
    }
    ease.truncate(keyframes.len().saturating_sub(1));

    CompiledTrack { keyframes, times, ease }
}

/// Lay `segments` out on one timeline
pub fn compile_sequence(segments: &[Segment], options: &SequenceOptions) -> CompiledSequence {
    let mut builder = TimelineBuilder::new(options);
    for segment in segments {
        builder.push(segment);
    }
    let compiled = builder.finish();
    tracing::debug!(
        targets = compiled.targets.len(),
        total_duration = compiled.total_duration,
        "compiled sequence"
    );
    compiled
}

/// The running tracks of a sequence
#[derive(Clone, Debug)]
pub struct SequenceAnimation {
    animations: Vec<ValueAnimation>,
    completion: Completion,
}

impl SequenceAnimation {
    fn new(animations: Vec<ValueAnimation>) -> Self {
        let completion = Completion::new();
        if animations.is_empty() {
            completion.resolve(AnimationOutcome::Finished);
            return Self {
                animations,
                completion,
            };
        }

        let pending = Rc::new(Cell::new(animations.len()));
        let cancelled = Rc::new(Cell::new(false));
        for animation in &animations {
            let pending = pending.clone();
            let cancelled = cancelled.clone();
            let group = completion.clone();
            animation.finished().on_settled(move |outcome| {
                if outcome == AnimationOutcome::Cancelled {
                    cancelled.set(true);
                }
                pending.set(pending.get() - 1);
                if pending.get() == 0 {
                    group.resolve(if cancelled.get() {
                        AnimationOutcome::Cancelled
                    } else {
                        AnimationOutcome::Finished
                    });
                }
            });
        }

        Self {
            animations,
            completion,
        }
    }

    /// Settles once every track has; `Cancelled` if any track was
    pub fn finished(&self) -> Completion {
        self.completion.clone()
    }

    pub fn animations(&self) -> &[ValueAnimation] {
        &self.animations
    }

    pub fn play(&self) {
        self.players().for_each(|player| player.play());
    }

    pub fn pause(&self) {
        self.players().for_each(|player| player.pause());
    }

    pub fn set_time(&self, t: f64) {
        self.players().for_each(|player| player.set_time(t));
    }

    pub fn set_speed(&self, speed: f64) {
        self.players().for_each(|player| player.set_speed(speed));
    }

    pub fn stop(&self) {
        self.animations.iter().for_each(ValueAnimation::stop);
    }

    pub fn cancel(&self) {
        self.animations.iter().for_each(ValueAnimation::cancel);
    }

    pub fn complete(&self) {
        self.animations.iter().for_each(ValueAnimation::complete);
    }

    fn players(&self) -> impl Iterator<Item = &AnimationPlayer> {
        self.animations.iter().filter_map(ValueAnimation::player)
    }
}

/// Run every track of `compiled`. Element targets missing from `registry`
/// are skipped.
pub fn play_sequence(
    ctx: &MotionContext,
    registry: &ElementRegistry,
    compiled: &CompiledSequence,
    options: &SequenceOptions,
) -> SequenceAnimation {
    let duration = compiled.total_duration;
    let mut animations = Vec::new();

    for compiled_target in compiled.targets.values() {
        match &compiled_target.target {
            Target::Element(id) => {
                let Some(element) = registry.get(*id) else {
                    tracing::warn!(?id, "sequence target is not registered; skipping");
                    continue;
                };
                for (name, track) in &compiled_target.tracks {
                    animations.push(animate_element(ctx, &element, name, track.options(duration, options)));
                }
            }
            Target::Value(value) => {
                for track in compiled_target.tracks.values() {
                    animations.push(animate_value(ctx, value, track.options(duration, options)));
                }
            }
        }
    }

    SequenceAnimation::new(animations)
}

/// Compile `segments` and run them
pub fn animate_sequence(
    ctx: &MotionContext,
    registry: &ElementRegistry,
    segments: &[Segment],
    options: &SequenceOptions,
) -> SequenceAnimation {
    let compiled = compile_sequence(segments, options);
    play_sequence(ctx, registry, &compiled, options)
}
