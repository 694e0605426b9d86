//! Spring generator
//!
//! Evaluates the analytic solution of a damped harmonic oscillator, so any
//! time can be sampled directly without integrating frame by frame.
//!
//! A spring is described either physically (`stiffness`, `damping`, `mass`)
//! or perceptually (`duration` + `bounce`, or `visual_duration` + `bounce`).
//! The perceptual forms are converted to physical parameters up front.

use super::AnimationState;
use motio_core::velocity_per_second;
use std::f64::consts::PI;

pub const DEFAULT_STIFFNESS: f64 = 100.0;
pub const DEFAULT_DAMPING: f64 = 10.0;
pub const DEFAULT_MASS: f64 = 1.0;
/// Default duration (ms) for duration-based springs
pub const DEFAULT_DURATION_MS: f64 = 800.0;
pub const DEFAULT_BOUNCE: f64 = 0.3;

const MIN_DAMPING_RATIO: f64 = 0.05;
const MAX_DAMPING_RATIO: f64 = 1.0;
const MIN_DURATION_S: f64 = 0.01;
const MAX_DURATION_S: f64 = 10.0;
const SAFE_MIN: f64 = 0.001;
const ROOT_ITERATIONS: usize = 12;

/// Springs moving less than this use the granular rest thresholds
const GRANULAR_SCALE: f64 = 5.0;
const REST_SPEED_GRANULAR: f64 = 0.01;
const REST_SPEED_DEFAULT: f64 = 2.0;
const REST_DELTA_GRANULAR: f64 = 0.005;
const REST_DELTA_DEFAULT: f64 = 0.5;

/// Window (ms) used to estimate velocity from two samples
pub const VELOCITY_SAMPLE_MS: f64 = 5.0;

/// Spring configuration. Unset fields take the defaults above.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpringOptions {
    pub stiffness: Option<f64>,
    pub damping: Option<f64>,
    pub mass: Option<f64>,
    /// Settling duration in milliseconds
    pub duration: Option<f64>,
    /// 0 for no bounce, towards 1 for very bouncy
    pub bounce: Option<f64>,
    /// Perceived duration in seconds, ignoring the bouncy tail
    pub visual_duration: Option<f64>,
    /// Initial velocity in units per second
    pub velocity: f64,
    pub rest_delta: Option<f64>,
    pub rest_speed: Option<f64>,
}

impl SpringOptions {
    /// A physical spring
    pub fn physics(stiffness: f64, damping: f64, mass: f64) -> Self {
        Self {
            stiffness: Some(stiffness),
            damping: Some(damping),
            mass: Some(mass),
            ..Default::default()
        }
    }

    /// A spring settling in `duration_ms` with the given bounce
    pub fn with_duration(duration_ms: f64, bounce: f64) -> Self {
        Self {
            duration: Some(duration_ms),
            bounce: Some(bounce),
            ..Default::default()
        }
    }

    /// A spring that looks done after `seconds`, with the given bounce
    pub fn visual(seconds: f64, bounce: f64) -> Self {
        Self {
            visual_duration: Some(seconds),
            bounce: Some(bounce),
            ..Default::default()
        }
    }

    fn has_physics(&self) -> bool {
        self.stiffness.is_some() || self.damping.is_some() || self.mass.is_some()
    }

    fn has_duration(&self) -> bool {
        self.duration.is_some() || self.bounce.is_some() || self.visual_duration.is_some()
    }
}

/// Physical parameters derived from a duration and bounce
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DerivedSpring {
    pub stiffness: f64,
    pub damping: f64,
    /// Clamped duration in milliseconds
    pub duration: f64,
}

fn angular_freq(undamped: f64, damping_ratio: f64) -> f64 {
    undamped * (1.0 - damping_ratio * damping_ratio).sqrt()
}

/// Find stiffness and damping for a unit-mass spring that settles in
/// `duration_ms` with the given bounce.
///
/// `velocity` is the internal form: negated, in units per millisecond.
/// Falls back to the default stiffness/damping if root finding diverges.
pub fn find_spring(duration_ms: f64, bounce: f64, velocity: f64, mass: f64) -> DerivedSpring {
    if duration_ms > MAX_DURATION_S * 1000.0 {
        tracing::warn!(duration_ms, "spring duration above 10s; clamped");
    }

    let damping_ratio = (1.0 - bounce).clamp(MIN_DAMPING_RATIO, MAX_DAMPING_RATIO);
    let duration = (duration_ms / 1000.0).clamp(MIN_DURATION_S, MAX_DURATION_S);

    let envelope = |undamped: f64| -> f64 {
        if damping_ratio < 1.0 {
            let decay = undamped * damping_ratio;
            let delta = decay * duration;
            let a = decay - velocity;
            let b = angular_freq(undamped, damping_ratio);
            let c = (-delta).exp();
            SAFE_MIN - (a / b) * c
        } else {
            let a = (-undamped * duration).exp();
            let b = (undamped - velocity) * duration + 1.0;
            -SAFE_MIN + a * b
        }
    };

    let derivative = |undamped: f64| -> f64 {
        if damping_ratio < 1.0 {
            let decay = undamped * damping_ratio;
            let delta = decay * duration;
            let d = delta * velocity + velocity;
            let e = damping_ratio.powi(2) * undamped.powi(2) * duration;
            let f = (-delta).exp();
            let g = angular_freq(undamped.powi(2), damping_ratio);
            let factor = if -envelope(undamped) + SAFE_MIN > 0.0 { -1.0 } else { 1.0 };
            (factor * ((d - e) * f)) / g
        } else {
            let a = (-undamped * duration).exp();
            let b = (velocity - undamped) * (duration * duration);
            a * b
        }
    };

    let mut undamped = 5.0 / duration;
    for _ in 1..ROOT_ITERATIONS {
        undamped -= envelope(undamped) / derivative(undamped);
    }

    let duration = duration * 1000.0;
    if undamped.is_nan() {
        tracing::warn!(duration_ms, bounce, "spring root finding diverged; using default stiffness/damping");
        return DerivedSpring {
            stiffness: DEFAULT_STIFFNESS,
            damping: DEFAULT_DAMPING,
            duration,
        };
    }

    let stiffness = undamped.powi(2) * mass;
    DerivedSpring {
        stiffness,
        damping: damping_ratio * 2.0 * (mass * stiffness).sqrt(),
        duration,
    }
}

/// Resolved spring motion between two numbers
#[derive(Clone, Debug)]
pub struct SpringGenerator {
    origin: f64,
    target: f64,
    /// Negated initial velocity in units per millisecond
    initial_velocity: f64,
    damping_ratio: f64,
    /// Undamped angular frequency in radians per millisecond
    undamped: f64,
    rest_speed: f64,
    rest_delta: f64,
    /// Set when the spring was derived from a duration: done means `t >= duration`
    resolved_duration: Option<f64>,
    stiffness: f64,
    damping: f64,
    mass: f64,
}

impl SpringGenerator {
    pub fn new(origin: f64, target: f64, options: &SpringOptions) -> Self {
        let velocity = -(options.velocity / 1000.0);

        let mut stiffness = options.stiffness.unwrap_or(DEFAULT_STIFFNESS);
        let mut damping = options.damping.unwrap_or(DEFAULT_DAMPING);
        let mut mass = options.mass.unwrap_or(DEFAULT_MASS);
        let mut resolved_duration = None;

        if !options.has_physics() && options.has_duration() {
            let bounce = options.bounce.unwrap_or(DEFAULT_BOUNCE);
            mass = 1.0;
            if let Some(visual) = options.visual_duration {
                let root = (2.0 * PI) / (visual * 1.2);
                stiffness = root * root;
                damping = 2.0 * (1.0 - bounce).clamp(MIN_DAMPING_RATIO, MAX_DAMPING_RATIO) * stiffness.sqrt();
            } else {
                let derived = find_spring(
                    options.duration.unwrap_or(DEFAULT_DURATION_MS),
                    bounce,
                    velocity,
                    mass,
                );
                stiffness = derived.stiffness;
                damping = derived.damping;
                resolved_duration = Some(derived.duration);
            }
        }

        let initial_delta = target - origin;
        let granular = initial_delta.abs() < GRANULAR_SCALE;

        Self {
            origin,
            target,
            initial_velocity: velocity,
            damping_ratio: damping / (2.0 * (stiffness * mass).sqrt()),
            undamped: (stiffness / mass).sqrt() / 1000.0,
            rest_speed: options.rest_speed.unwrap_or(if granular {
                REST_SPEED_GRANULAR
            } else {
                REST_SPEED_DEFAULT
            }),
            rest_delta: options.rest_delta.unwrap_or(if granular {
                REST_DELTA_GRANULAR
            } else {
                REST_DELTA_DEFAULT
            }),
            resolved_duration,
            stiffness,
            damping,
            mass,
        }
    }

    pub fn stiffness(&self) -> f64 {
        self.stiffness
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn damping_ratio(&self) -> f64 {
        self.damping_ratio
    }

    /// Position at `t` milliseconds
    pub fn position(&self, t: f64) -> f64 {
        let delta = self.target - self.origin;
        let zeta = self.damping_ratio;
        let omega = self.undamped;
        let v0 = self.initial_velocity;

        if zeta < 1.0 {
            let angular = angular_freq(omega, zeta);
            let envelope = (-zeta * omega * t).exp();
            self.target
                - envelope
                    * (((v0 + zeta * omega * delta) / angular) * (angular * t).sin()
                        + delta * (angular * t).cos())
        } else if zeta == 1.0 {
            self.target - (-omega * t).exp() * (delta + (v0 + omega * delta) * t)
        } else {
            let damped = omega * (zeta * zeta - 1.0).sqrt();
            let envelope = (-zeta * omega * t).exp();
            // sinh/cosh overflow past this
            let freq = (damped * t).min(300.0);
            self.target
                - (envelope * ((v0 + zeta * omega * delta) * freq.sinh() + damped * delta * freq.cosh()))
                    / damped
        }
    }

    /// Sample at `t` milliseconds
    pub fn next(&self, t: f64) -> AnimationState<f64> {
        let current = self.position(t);

        let done = match self.resolved_duration {
            Some(duration) => t >= duration,
            None => {
                let velocity = if self.damping_ratio < 1.0 {
                    if t == 0.0 {
                        self.initial_velocity * 1000.0
                    } else {
                        self.velocity_at(t, current)
                    }
                } else {
                    0.0
                };
                velocity.abs() <= self.rest_speed && (self.target - current).abs() <= self.rest_delta
            }
        };

        AnimationState::new(if done { self.target } else { current }, done)
    }

    fn velocity_at(&self, t: f64, current: f64) -> f64 {
        let previous_t = (t - VELOCITY_SAMPLE_MS).max(0.0);
        velocity_per_second(current - self.position(previous_t), t - previous_t)
    }

    /// Duration in milliseconds when derived from a duration
    pub fn calculated_duration(&self) -> Option<f64> {
        self.resolved_duration.filter(|duration| *duration > 0.0)
    }
}
