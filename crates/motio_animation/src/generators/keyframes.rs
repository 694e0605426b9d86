//! Keyframe tween generator

use super::AnimationState;
use crate::easing::Easing;
use crate::interpolate::{interpolate, InterpolateOptions, Interpolator};
use motio_core::Value;

pub const DEFAULT_TWEEN_DURATION_MS: f64 = 300.0;

/// Tween shaping options
#[derive(Clone, Debug, Default)]
pub struct TweenOptions {
    /// One easing for every segment, or one per segment. Defaults to
    /// `easeInOut` for every segment.
    pub ease: Vec<Easing>,
    /// Keyframe offsets in `0..=1`, one per keyframe. Evenly spaced if unset
    /// or of the wrong length.
    pub times: Option<Vec<f64>>,
}

/// Evenly spaced offsets for `count` keyframes
pub fn default_offsets(count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..count).map(|i| i as f64 / (count - 1) as f64).collect(),
    }
}

/// Eased interpolation across keyframes over a fixed duration
#[derive(Clone, Debug)]
pub struct KeyframesGenerator {
    duration: f64,
    first: Value,
    interpolator: Option<Interpolator>,
}

impl KeyframesGenerator {
    pub fn new(keyframes: Vec<Value>, duration: Option<f64>, options: &TweenOptions) -> Self {
        let duration = duration.unwrap_or(DEFAULT_TWEEN_DURATION_MS);
        let first = keyframes.first().cloned().unwrap_or_default();

        let offsets = match &options.times {
            Some(times) if times.len() == keyframes.len() => times.clone(),
            _ => default_offsets(keyframes.len()),
        };
        let absolute: Vec<f64> = offsets.iter().map(|offset| offset * duration).collect();

        let segments = keyframes.len().saturating_sub(1);
        let ease = match options.ease.len() {
            0 => vec![Easing::EaseInOut; segments],
            1 => vec![options.ease[0].clone(); segments],
            n if n == segments => options.ease.clone(),
            n => {
                tracing::warn!(eases = n, segments, "easing count does not match keyframe segments");
                let mut ease = options.ease.clone();
                ease.resize(segments, Easing::EaseInOut);
                ease
            }
        };

        // Lengths are equal by construction; an empty list yields no interpolator
        let interpolator = interpolate(
            &absolute,
            &keyframes,
            InterpolateOptions {
                clamp: true,
                ease,
            },
        )
        .ok();

        Self {
            duration,
            first,
            interpolator,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Sample at `t` milliseconds
    pub fn next(&self, t: f64) -> AnimationState<Value> {
        let value = match &self.interpolator {
            Some(interpolator) => interpolator.at(t),
            None => self.first.clone(),
        };
        AnimationState::new(value, t >= self.duration)
    }
}
