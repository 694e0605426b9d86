//! Inertia (decay) generator
//!
//! Decays exponentially from the origin towards `origin + power * velocity`.
//! When `min`/`max` are set and the decay crosses one, the rest of the motion
//! is handed to a spring pulling back to that boundary, seeded with the
//! decay's velocity at the crossing.

use super::spring::{SpringGenerator, SpringOptions, VELOCITY_SAMPLE_MS};
use super::AnimationState;
use motio_core::velocity_per_second;
use std::fmt;
use std::rc::Rc;

pub const DEFAULT_POWER: f64 = 0.8;
pub const DEFAULT_TIME_CONSTANT_MS: f64 = 325.0;
pub const DEFAULT_BOUNCE_STIFFNESS: f64 = 500.0;
pub const DEFAULT_BOUNCE_DAMPING: f64 = 10.0;
pub const DEFAULT_REST_DELTA: f64 = 0.5;

/// Decay configuration
#[derive(Clone)]
pub struct InertiaOptions {
    /// Initial velocity in units per second
    pub velocity: f64,
    /// Scales how far the velocity carries
    pub power: f64,
    /// Decay time constant in milliseconds
    pub time_constant: f64,
    pub bounce_stiffness: f64,
    pub bounce_damping: f64,
    pub rest_delta: f64,
    pub rest_speed: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Adjust the computed resting point, e.g. to snap to a grid
    pub modify_target: Option<Rc<dyn Fn(f64) -> f64>>,
}

impl Default for InertiaOptions {
    fn default() -> Self {
        Self {
            velocity: 0.0,
            power: DEFAULT_POWER,
            time_constant: DEFAULT_TIME_CONSTANT_MS,
            bounce_stiffness: DEFAULT_BOUNCE_STIFFNESS,
            bounce_damping: DEFAULT_BOUNCE_DAMPING,
            rest_delta: DEFAULT_REST_DELTA,
            rest_speed: None,
            min: None,
            max: None,
            modify_target: None,
        }
    }
}

impl fmt::Debug for InertiaOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InertiaOptions")
            .field("velocity", &self.velocity)
            .field("power", &self.power)
            .field("time_constant", &self.time_constant)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("modify_target", &self.modify_target.is_some())
            .finish()
    }
}

/// Decay with optional boundary springs
#[derive(Clone, Debug)]
pub struct InertiaGenerator {
    amplitude: f64,
    target: f64,
    time_constant: f64,
    rest_delta: f64,
    rest_speed: Option<f64>,
    bounce_stiffness: f64,
    bounce_damping: f64,
    min: Option<f64>,
    max: Option<f64>,
    state: AnimationState<f64>,
    /// Time the decay crossed a boundary, and the spring taking over
    boundary: Option<(f64, SpringGenerator)>,
}

impl InertiaGenerator {
    pub fn new(origin: f64, options: &InertiaOptions) -> Self {
        let mut amplitude = options.power * options.velocity;
        let ideal = origin + amplitude;
        let target = match &options.modify_target {
            Some(modify) => modify(ideal),
            None => ideal,
        };
        if target != ideal {
            amplitude = target - origin;
        }

        let mut generator = Self {
            amplitude,
            target,
            time_constant: options.time_constant,
            rest_delta: options.rest_delta,
            rest_speed: options.rest_speed,
            bounce_stiffness: options.bounce_stiffness,
            bounce_damping: options.bounce_damping,
            min: options.min,
            max: options.max,
            state: AnimationState::new(origin, false),
            boundary: None,
        };
        generator.check_boundary(0.0);
        generator
    }

    /// Where the decay comes to rest, ignoring boundaries
    pub fn target(&self) -> f64 {
        self.target
    }

    fn is_out_of_bounds(&self, value: f64) -> bool {
        self.min.is_some_and(|min| value < min) || self.max.is_some_and(|max| value > max)
    }

    fn nearest_boundary(&self, value: f64) -> f64 {
        match (self.min, self.max) {
            (None, Some(max)) => max,
            (Some(min), None) => min,
            (Some(min), Some(max)) => {
                if (min - value).abs() < (max - value).abs() {
                    min
                } else {
                    max
                }
            }
            (None, None) => value,
        }
    }

    fn delta(&self, t: f64) -> f64 {
        -self.amplitude * (-t / self.time_constant).exp()
    }

    fn latest(&self, t: f64) -> f64 {
        self.target + self.delta(t)
    }

    fn apply_friction(&mut self, t: f64) {
        let delta = self.delta(t);
        let done = delta.abs() <= self.rest_delta;
        self.state = AnimationState::new(if done { self.target } else { self.latest(t) }, done);
    }

    fn check_boundary(&mut self, t: f64) {
        let value = self.state.value;
        if !self.is_out_of_bounds(value) {
            return;
        }

        let previous_t = (t - VELOCITY_SAMPLE_MS).max(0.0);
        let velocity = velocity_per_second(value - self.latest(previous_t), t - previous_t);
        let spring = SpringGenerator::new(
            value,
            self.nearest_boundary(value),
            &SpringOptions {
                velocity,
                rest_delta: Some(self.rest_delta),
                rest_speed: self.rest_speed,
                ..SpringOptions::physics(self.bounce_stiffness, self.bounce_damping, 1.0)
            },
        );
        tracing::trace!(t, value, "inertia crossed boundary; switching to spring");
        self.boundary = Some((t, spring));
    }

    /// Sample at `t` milliseconds
    pub fn next(&mut self, t: f64) -> AnimationState<f64> {
        let mut updated = false;
        if self.boundary.is_none() {
            updated = true;
            self.apply_friction(t);
            self.check_boundary(t);
        }

        if let Some((reached, spring)) = &self.boundary {
            if t >= *reached {
                return spring.next(t - reached);
            }
        }

        if !updated {
            self.apply_friction(t);
        }
        self.state.clone()
    }
}
