//! Animation options
//!
//! Durations and delays are in milliseconds, velocities in units per second.

use crate::easing::Easing;
use crate::generators::{AnimationType, GeneratorOptions, SpringOptions, TweenOptions};
use motio_core::{ElementAdapter, ReactiveValue, Value};
use std::fmt;
use std::rc::Rc;

/// A keyframe that may still need resolving; `None` is a wildcard
pub type Keyframe = Option<Value>;

/// Repeat forever
pub const REPEAT_FOREVER: u32 = u32::MAX;

/// How repeated iterations play
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RepeatType {
    /// Restart from the first keyframe
    #[default]
    Loop,
    /// Alternate direction each iteration
    Reverse,
    /// Alternate direction using a generator built from reversed keyframes
    Mirror,
}

pub type UpdateCallback = Rc<dyn Fn(&Value)>;
pub type Hook = Rc<dyn Fn()>;

/// Everything needed to build an [`AnimationPlayer`](super::AnimationPlayer)
#[derive(Clone)]
pub struct AnimationOptions {
    pub keyframes: Vec<Keyframe>,
    /// Animated property, e.g. `"opacity"`
    pub name: Option<String>,
    pub delay: f64,
    pub duration: Option<f64>,
    pub repeat: u32,
    pub repeat_type: RepeatType,
    pub repeat_delay: f64,
    pub ease: Vec<Easing>,
    pub times: Option<Vec<f64>>,
    pub kind: AnimationType,
    pub velocity: f64,
    pub autoplay: bool,
    /// Explicit start time, overriding the creation/resolution rule
    pub start_time: Option<f64>,
    /// Resolve keyframes immediately instead of in the next frame
    pub resolve_sync: bool,
    /// The element renders this value through a custom template
    pub has_value_template: bool,
    /// Value written on every frame
    pub value: Option<ReactiveValue>,
    pub element: Option<Rc<dyn ElementAdapter>>,
    pub on_update: Option<UpdateCallback>,
    pub on_complete: Option<Hook>,
    pub on_play: Option<Hook>,
    pub on_cancel: Option<Hook>,
    pub on_stop: Option<Hook>,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            keyframes: Vec::new(),
            name: None,
            delay: 0.0,
            duration: None,
            repeat: 0,
            repeat_type: RepeatType::Loop,
            repeat_delay: 0.0,
            ease: Vec::new(),
            times: None,
            kind: AnimationType::Tween,
            velocity: 0.0,
            autoplay: true,
            start_time: None,
            resolve_sync: false,
            has_value_template: false,
            value: None,
            element: None,
            on_update: None,
            on_complete: None,
            on_play: None,
            on_cancel: None,
            on_stop: None,
        }
    }
}

impl AnimationOptions {
    /// Animate through explicit keyframes
    pub fn new<I, K>(keyframes: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Value>,
    {
        Self {
            keyframes: keyframes.into_iter().map(|k| Some(k.into())).collect(),
            ..Default::default()
        }
    }

    /// Animate from the current value to `target`
    pub fn to(target: impl Into<Value>) -> Self {
        Self {
            keyframes: vec![None, Some(target.into())],
            ..Default::default()
        }
    }

    /// Animate through keyframes that may contain wildcards
    pub fn with_keyframes(keyframes: Vec<Keyframe>) -> Self {
        Self {
            keyframes,
            ..Default::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn delay(mut self, delay_ms: f64) -> Self {
        self.delay = delay_ms;
        self
    }

    pub fn duration(mut self, duration_ms: f64) -> Self {
        self.duration = Some(duration_ms);
        self
    }

    pub fn repeat(mut self, count: u32, repeat_type: RepeatType) -> Self {
        self.repeat = count;
        self.repeat_type = repeat_type;
        self
    }

    pub fn repeat_delay(mut self, delay_ms: f64) -> Self {
        self.repeat_delay = delay_ms;
        self
    }

    pub fn ease(mut self, easing: Easing) -> Self {
        self.ease = vec![easing];
        self
    }

    /// One easing per keyframe segment
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

    pub fn spring(self, spring: SpringOptions) -> Self {
        self.kind(AnimationType::Spring(spring))
    }

    pub fn velocity(mut self, velocity: f64) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn start_time(mut self, start_ms: f64) -> Self {
        self.start_time = Some(start_ms);
        self
    }

    pub fn resolve_sync(mut self) -> Self {
        self.resolve_sync = true;
        self
    }

    pub fn value(mut self, value: &ReactiveValue) -> Self {
        self.value = Some(value.clone());
        self
    }

    pub fn element(mut self, element: Rc<dyn ElementAdapter>) -> Self {
        self.element = Some(element);
        self
    }

    pub fn on_update<F: Fn(&Value) + 'static>(mut self, f: F) -> Self {
        self.on_update = Some(Rc::new(f));
        self
    }

    pub fn on_complete<F: Fn() + 'static>(mut self, f: F) -> Self {
        self.on_complete = Some(Rc::new(f));
        self
    }

    pub fn on_play<F: Fn() + 'static>(mut self, f: F) -> Self {
        self.on_play = Some(Rc::new(f));
        self
    }

    pub fn on_cancel<F: Fn() + 'static>(mut self, f: F) -> Self {
        self.on_cancel = Some(Rc::new(f));
        self
    }

    pub fn on_stop<F: Fn() + 'static>(mut self, f: F) -> Self {
        self.on_stop = Some(Rc::new(f));
        self
    }

    /// Whether anything beyond timing offsets was configured
    pub fn is_transition_defined(&self) -> bool {
        self.duration.is_some() || !self.kind.is_tween() || !self.ease.is_empty() || self.times.is_some()
    }

    /// Repeat count as a float, infinite for [`REPEAT_FOREVER`]
    pub fn repeat_count(&self) -> f64 {
        if self.repeat == REPEAT_FOREVER {
            f64::INFINITY
        } else {
            self.repeat as f64
        }
    }

    /// Spring damping, if this is a spring with damping set
    pub fn spring_damping(&self) -> Option<f64> {
        match &self.kind {
            AnimationType::Spring(spring) => spring.damping,
            _ => None,
        }
    }

    /// Generator inputs for resolved `keyframes`
    pub fn generator_options(&self, keyframes: Vec<Value>) -> GeneratorOptions {
        GeneratorOptions {
            keyframes,
            velocity: self.velocity,
            duration: self.duration,
            tween: TweenOptions {
                ease: self.ease.clone(),
                times: self.times.clone(),
            },
        }
    }
}

impl fmt::Debug for AnimationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnimationOptions")
            .field("keyframes", &self.keyframes)
            .field("name", &self.name)
            .field("delay", &self.delay)
            .field("duration", &self.duration)
            .field("repeat", &self.repeat)
            .field("repeat_type", &self.repeat_type)
            .field("repeat_delay", &self.repeat_delay)
            .field("ease", &self.ease)
            .field("kind", &self.kind)
            .field("velocity", &self.velocity)
            .field("autoplay", &self.autoplay)
            .finish_non_exhaustive()
    }
}

/// The keyframe an animation settles on.
///
/// Negative speed, or an odd number of repeats with alternating direction,
/// ends on the first keyframe. `final_keyframe` overrides the last one.
pub fn get_final_keyframe(
    keyframes: &[Value],
    repeat: u32,
    repeat_type: RepeatType,
    final_keyframe: Option<&Value>,
    speed: f64,
) -> Option<Value> {
    let odd_repeats = repeat > 0 && repeat != REPEAT_FOREVER && repeat % 2 == 1;
    let use_first = speed < 0.0 || (odd_repeats && repeat_type != RepeatType::Loop);

    if use_first {
        return keyframes.first().cloned();
    }
    match final_keyframe {
        Some(keyframe) if keyframes.len() > 1 => Some(keyframe.clone()),
        _ => keyframes.last().cloned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames() -> Vec<Value> {
        vec![Value::Number(0.0), Value::Number(50.0), Value::Number(100.0)]
    }

    #[test]
    fn test_final_keyframe_parity() {
        let keyframes = frames();
        assert_eq!(
            get_final_keyframe(&keyframes, 0, RepeatType::Loop, None, 1.0),
            Some(Value::Number(100.0))
        );
        assert_eq!(
            get_final_keyframe(&keyframes, 3, RepeatType::Reverse, None, 1.0),
            Some(Value::Number(0.0))
        );
        assert_eq!(
            get_final_keyframe(&keyframes, 2, RepeatType::Mirror, None, 1.0),
            Some(Value::Number(100.0))
        );
        assert_eq!(
            get_final_keyframe(&keyframes, 3, RepeatType::Loop, None, 1.0),
            Some(Value::Number(100.0))
        );
        assert_eq!(
            get_final_keyframe(&keyframes, 0, RepeatType::Loop, None, -1.0),
            Some(Value::Number(0.0))
        );
    }

    #[test]
    fn test_endless_reverse_ends_on_last_keyframe() {
        assert_eq!(
            get_final_keyframe(&frames(), REPEAT_FOREVER, RepeatType::Reverse, None, 1.0),
            Some(Value::Number(100.0))
        );
    }

    #[test]
    fn test_final_keyframe_override() {
        let unresolved = Value::from("var(--target)");
        assert_eq!(
            get_final_keyframe(&frames(), 0, RepeatType::Loop, Some(&unresolved), 1.0),
            Some(unresolved)
        );
    }

    #[test]
    fn test_builder() {
        let options = AnimationOptions::to(1.0).duration(500.0).repeat(2, RepeatType::Mirror);
        assert_eq!(options.keyframes, vec![None, Some(Value::Number(1.0))]);
        assert!(options.is_transition_defined());
        assert!(!AnimationOptions::to(1.0).delay(100.0).is_transition_defined());
        assert_eq!(AnimationOptions::default().repeat(REPEAT_FOREVER, RepeatType::Loop).repeat_count(), f64::INFINITY);
    }
}
