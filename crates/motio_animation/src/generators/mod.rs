//! Animation generators
//!
//! A generator maps elapsed milliseconds to a sample and a completion flag.
//! The kind is chosen once, when the animation is built:
//!
//! - [`spring`]: closed-form damped oscillator
//! - [`inertia`]: exponential decay with optional boundary springs
//! - [`keyframes`]: eased tween across explicit keyframes
//! - custom: anything implementing [`KeyframeGenerator`]

pub mod duration;
pub mod inertia;
pub mod keyframes;
pub mod spring;

pub use duration::{calc_generator_duration, generator_easing, GENERATOR_STEP_MS, MAX_GENERATOR_DURATION_MS};
pub use inertia::{InertiaGenerator, InertiaOptions};
pub use keyframes::{KeyframesGenerator, TweenOptions};
pub use spring::{SpringGenerator, SpringOptions};

use crate::mix::{get_mixer, Mixer};
use motio_core::Value;
use std::fmt;
use std::rc::Rc;

/// One generator sample
#[derive(Clone, Debug, PartialEq)]
pub struct AnimationState<V> {
    pub value: V,
    pub done: bool,
}

impl<V> AnimationState<V> {
    pub fn new(value: V, done: bool) -> Self {
        Self { value, done }
    }
}

/// A caller-supplied generator
pub trait KeyframeGenerator {
    /// Sample at `t` milliseconds
    fn next(&mut self, t: f64) -> AnimationState<Value>;

    /// Known total duration in milliseconds, or `None` if open-ended
    fn calculated_duration(&self) -> Option<f64> {
        None
    }
}

/// Builds a custom generator from the animation's resolved options
pub type GeneratorFactory = Rc<dyn Fn(&GeneratorOptions) -> Box<dyn KeyframeGenerator>>;

/// Which generator drives an animation
#[derive(Clone, Default)]
pub enum AnimationType {
    #[default]
    Tween,
    Spring(SpringOptions),
    Inertia(InertiaOptions),
    Custom(GeneratorFactory),
}

impl AnimationType {
    pub fn spring() -> Self {
        AnimationType::Spring(SpringOptions::default())
    }

    pub fn inertia() -> Self {
        AnimationType::Inertia(InertiaOptions::default())
    }

    pub fn is_tween(&self) -> bool {
        matches!(self, AnimationType::Tween)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnimationType::Tween => "tween",
            AnimationType::Spring(_) => "spring",
            AnimationType::Inertia(_) => "inertia",
            AnimationType::Custom(_) => "custom",
        }
    }
}

impl fmt::Debug for AnimationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationType::Tween => f.write_str("Tween"),
            AnimationType::Spring(options) => f.debug_tuple("Spring").field(options).finish(),
            AnimationType::Inertia(options) => f.debug_tuple("Inertia").field(options).finish(),
            AnimationType::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Everything a generator is built from
#[derive(Clone, Debug, Default)]
pub struct GeneratorOptions {
    pub keyframes: Vec<Value>,
    /// Initial velocity in units per second
    pub velocity: f64,
    /// Duration in milliseconds
    pub duration: Option<f64>,
    pub tween: TweenOptions,
}

/// A generator chosen once at construction
pub enum Generator {
    Spring(SpringGenerator),
    Inertia(InertiaGenerator),
    Keyframes(KeyframesGenerator),
    Custom(Box<dyn KeyframeGenerator>),
    /// A numeric generator running 0..100 mapped through a value mixer
    Mapped { inner: Box<Generator>, mixer: Mixer },
}

impl Generator {
    /// Build the generator for `kind`.
    ///
    /// Physics generators need numbers: non-numeric keyframes run a 0..100
    /// generator and mix the first two keyframes by its progress.
    pub fn build(kind: &AnimationType, options: &GeneratorOptions) -> Generator {
        let numeric: Option<Vec<f64>> = options
            .keyframes
            .iter()
            .map(|keyframe| match keyframe {
                Value::Number(n) => Some(*n),
                Value::Text(_) => None,
            })
            .collect();

        match (kind, numeric) {
            (AnimationType::Tween, _) => Generator::Keyframes(KeyframesGenerator::new(
                options.keyframes.clone(),
                options.duration,
                &options.tween,
            )),
            (AnimationType::Custom(factory), _) => Generator::Custom(factory(options)),
            (_, Some(numbers)) if !numbers.is_empty() => Self::build_physics(kind, &numbers, options),
            (_, _) => {
                let mixer = match options.keyframes.as_slice() {
                    [from, to, ..] => get_mixer(from, to),
                    [only] => get_mixer(only, only),
                    [] => get_mixer(&Value::default(), &Value::default()),
                };
                let inner = Self::build_physics(kind, &[0.0, 100.0], options);
                Generator::Mapped {
                    inner: Box::new(inner),
                    mixer,
                }
            }
        }
    }

    fn build_physics(kind: &AnimationType, numbers: &[f64], options: &GeneratorOptions) -> Generator {
        let origin = numbers[0];
        let target = numbers[numbers.len() - 1];
        match kind {
            AnimationType::Inertia(inertia) => {
                let inertia = InertiaOptions {
                    velocity: options.velocity,
                    ..inertia.clone()
                };
                Generator::Inertia(InertiaGenerator::new(origin, &inertia))
            }
            AnimationType::Spring(spring) => {
                let spring = SpringOptions {
                    velocity: options.velocity,
                    duration: spring.duration.or(options.duration),
                    ..spring.clone()
                };
                Generator::Spring(SpringGenerator::new(origin, target, &spring))
            }
            _ => Generator::Spring(SpringGenerator::new(origin, target, &SpringOptions::default())),
        }
    }

    /// Sample at `t` milliseconds
    pub fn next(&mut self, t: f64) -> AnimationState<Value> {
        match self {
            Generator::Spring(spring) => {
                let state = spring.next(t);
                AnimationState::new(Value::Number(state.value), state.done)
            }
            Generator::Inertia(inertia) => {
                let state = inertia.next(t);
                AnimationState::new(Value::Number(state.value), state.done)
            }
            Generator::Keyframes(keyframes) => keyframes.next(t),
            Generator::Custom(custom) => custom.next(t),
            Generator::Mapped { inner, mixer } => {
                let state = inner.next(t);
                let percent = state.value.as_number().unwrap_or(0.0);
                AnimationState::new(mixer(percent / 100.0), state.done)
            }
        }
    }

    /// Known duration in milliseconds, `None` when it must be discovered
    pub fn calculated_duration(&self) -> Option<f64> {
        match self {
            Generator::Spring(spring) => spring.calculated_duration(),
            Generator::Inertia(_) => None,
            Generator::Keyframes(keyframes) => Some(keyframes.duration()),
            Generator::Custom(custom) => custom.calculated_duration(),
            Generator::Mapped { inner, .. } => inner.calculated_duration(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Generator::Spring(_) => "spring",
            Generator::Inertia(_) => "inertia",
            Generator::Keyframes(_) => "keyframes",
            Generator::Custom(_) => "custom",
            Generator::Mapped { inner, .. } => inner.kind_name(),
        }
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator")
            .field("kind", &self.kind_name())
            .field("calculated_duration", &self.calculated_duration())
            .finish()
    }
}
