//! Native compositor handoff
//!
//! A host that can run keyframe animations off the frame loop implements
//! [`NativeAnimationHost`]. The player hands eligible animations to it and
//! only hears back through the finish callback.

use super::options::{AnimationOptions, RepeatType};
use super::software::SoftwarePlayback;
use crate::easing::Easing;
use crate::generators::{AnimationType, MAX_GENERATOR_DURATION_MS};
use motio_core::{ElementAdapter, Value};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Properties a compositor can animate without layout or paint
pub const ACCELERATED_PROPERTIES: [&str; 4] = ["opacity", "transform", "filter", "clipPath"];

/// Default native duration when none is given
pub const DEFAULT_NATIVE_DURATION_MS: f64 = 300.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NativeError {
    #[error("element is no longer attached")]
    Detached,

    #[error("native animation unsupported: {0}")]
    Unsupported(String),
}

/// Playback state reported by a native animation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NativePlayState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// Iteration direction
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlaybackDirection {
    #[default]
    Normal,
    Alternate,
}

/// Whether the first/last keyframe applies outside the active interval
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FillMode {
    None,
    Forwards,
    Backwards,
    #[default]
    Both,
}

/// Timing function in the form compositors accept
#[derive(Clone, Debug, PartialEq)]
pub enum NativeEasing {
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    CubicBezier(f64, f64, f64, f64),
    /// Piecewise-linear curve through evenly spaced points
    Points(Vec<f64>),
}

impl NativeEasing {
    /// CSS timing-function syntax
    pub fn to_css(&self) -> String {
        match self {
            NativeEasing::Linear => "linear".to_string(),
            NativeEasing::Ease => "ease".to_string(),
            NativeEasing::EaseIn => "ease-in".to_string(),
            NativeEasing::EaseOut => "ease-out".to_string(),
            NativeEasing::EaseInOut => "ease-in-out".to_string(),
            NativeEasing::CubicBezier(x1, y1, x2, y2) => format!("cubic-bezier({x1}, {y1}, {x2}, {y2})"),
            NativeEasing::Points(points) => {
                let points: Vec<String> = points.iter().map(|p| p.to_string()).collect();
                format!("linear({})", points.join(", "))
            }
        }
    }
}

/// Sample `easing` into points spaced `resolution` ms apart over `duration`.
///
/// Durations past the generator cap, infinite ones included, sample as the cap.
pub fn generate_linear_easing(easing: &Easing, duration: f64, resolution: f64) -> NativeEasing {
    let span = if duration.is_finite() {
        duration.clamp(0.0, MAX_GENERATOR_DURATION_MS)
    } else {
        MAX_GENERATOR_DURATION_MS
    };
    let count = ((span / resolution.max(1.0)).round() as usize).max(2);
    let points = (0..count)
        .map(|i| {
            let progress = i as f64 / (count - 1) as f64;
            (easing.apply(progress) * 10_000.0).round() / 10_000.0
        })
        .collect();
    NativeEasing::Points(points)
}

/// Native form of `easing`, or `None` if the compositor cannot express it
pub fn map_easing(easing: &Easing, duration: f64, linear_points: Option<f64>) -> Option<NativeEasing> {
    match easing {
        Easing::Linear => Some(NativeEasing::Linear),
        Easing::EaseIn => Some(NativeEasing::EaseIn),
        Easing::EaseOut => Some(NativeEasing::EaseOut),
        Easing::EaseInOut => Some(NativeEasing::EaseInOut),
        Easing::CircIn => Some(NativeEasing::CubicBezier(0.0, 0.65, 0.55, 1.0)),
        Easing::CircOut => Some(NativeEasing::CubicBezier(0.55, 0.0, 1.0, 0.45)),
        Easing::BackIn => Some(NativeEasing::CubicBezier(0.31, 0.01, 0.66, -0.59)),
        Easing::BackOut => Some(NativeEasing::CubicBezier(0.33, 1.53, 0.69, 0.99)),
        Easing::CubicBezier(x1, y1, x2, y2) => Some(NativeEasing::CubicBezier(*x1, *y1, *x2, *y2)),
        other => linear_points.map(|resolution| generate_linear_easing(other, duration, resolution)),
    }
}

/// Options handed to the host alongside the keyframes
#[derive(Clone, Debug, PartialEq)]
pub struct NativeKeyframeOptions {
    pub delay: f64,
    pub duration: f64,
    /// Whole-animation timing, `Linear` when per-segment easings are set
    pub easing: NativeEasing,
    pub segment_easing: Option<Vec<NativeEasing>>,
    pub offsets: Option<Vec<f64>>,
    /// `repeat + 1`, infinite when repeating forever
    pub iterations: f64,
    pub direction: PlaybackDirection,
    pub fill: FillMode,
}

/// A running native animation.
///
/// Methods take `&self`: hosts hold these as shared handles.
pub trait NativeAnimation {
    fn play(&self);
    fn pause(&self);
    fn cancel(&self);
    fn finish(&self);
    fn play_state(&self) -> NativePlayState;
    /// Playback time in milliseconds, `None` before it starts
    fn current_time(&self) -> Option<f64>;
    fn set_current_time(&self, ms: f64);
    fn set_start_time(&self, ms: f64);
    fn set_playback_rate(&self, rate: f64);
    /// Called once when playback reaches its end
    fn set_on_finish(&self, callback: Box<dyn FnOnce()>);
}

/// A compositor able to run keyframe animations
pub trait NativeAnimationHost {
    /// Whether `name` can be animated natively on this host
    fn supports(&self, name: &str) -> bool;

    /// Whether piecewise-linear easing curves are accepted
    fn supports_linear_easing(&self) -> bool {
        false
    }

    fn animate(
        &self,
        element: &Rc<dyn ElementAdapter>,
        name: &str,
        keyframes: &[Value],
        options: &NativeKeyframeOptions,
    ) -> Result<Rc<dyn NativeAnimation>, NativeError>;
}

/// Whether `options` can run on `host`
pub fn supports_native(options: &AnimationOptions, host: &dyn NativeAnimationHost) -> bool {
    let Some(name) = options.name.as_deref() else {
        return false;
    };

    options.element.is_some()
        && ACCELERATED_PROPERTIES.contains(&name)
        && host.supports(name)
        && !options.has_value_template
        && options.on_update.is_none()
        && options.repeat_delay == 0.0
        && options.repeat_type != RepeatType::Mirror
        && options.spring_damping() != Some(0.0)
        && !matches!(options.kind, AnimationType::Inertia(_))
}

/// Keyframes and timing after any pre-baking
#[derive(Clone, Debug)]
pub struct NativePlan {
    pub keyframes: Vec<Value>,
    pub duration: f64,
    pub ease: Vec<Easing>,
    pub times: Option<Vec<f64>>,
    pub baked: bool,
}

/// Sample the software generator every `resolution` ms into linear keyframes
pub fn prebake(options: &AnimationOptions, keyframes: Vec<Value>, resolution: f64) -> NativePlan {
    let sampling = AnimationOptions {
        repeat: 0,
        delay: 0.0,
        ..options.clone()
    };
    let mut playback = SoftwarePlayback::new(&sampling, keyframes, None);
    let total = playback.total_duration();

    let mut samples = Vec::new();
    let mut t = 0.0;
    let mut done = false;
    while !done && t < MAX_GENERATOR_DURATION_MS {
        samples.push(playback.sample(t));
        done = t >= total;
        t += resolution;
    }
    if samples.len() == 1 {
        samples.push(samples[0].clone());
    }

    tracing::debug!(points = samples.len(), "pre-baked generator for native playback");
    NativePlan {
        keyframes: samples,
        duration: t - resolution,
        ease: vec![Easing::Linear],
        times: None,
        baked: true,
    }
}

/// Decide how `keyframes` will be handed to `host`
pub fn plan(options: &AnimationOptions, keyframes: Vec<Value>, host: &dyn NativeAnimationHost, resolution: f64) -> NativePlan {
    let duration = options.duration.unwrap_or(DEFAULT_NATIVE_DURATION_MS);
    let linear_points = host.supports_linear_easing().then_some(resolution);
    let easing_supported = options
        .ease
        .iter()
        .all(|ease| map_easing(ease, duration, linear_points).is_some());

    if !options.kind.is_tween() || !easing_supported {
        return prebake(options, keyframes, resolution);
    }

    NativePlan {
        keyframes,
        duration,
        ease: options.ease.clone(),
        times: options.times.clone(),
        baked: false,
    }
}

/// Host options for a plan
pub fn keyframe_options(options: &AnimationOptions, plan: &NativePlan, linear_points: Option<f64>) -> NativeKeyframeOptions {
    let map = |ease: &Easing| map_easing(ease, plan.duration, linear_points).unwrap_or(NativeEasing::EaseOut);

    let (easing, segment_easing) = match plan.ease.as_slice() {
        [] => (NativeEasing::EaseInOut, None),
        [single] => (map(single), None),
        many => (NativeEasing::Linear, Some(many.iter().map(map).collect())),
    };

    NativeKeyframeOptions {
        delay: options.delay,
        duration: plan.duration,
        easing,
        segment_easing,
        offsets: plan.times.clone(),
        iterations: options.repeat_count() + 1.0,
        direction: if options.repeat_type == RepeatType::Reverse {
            PlaybackDirection::Alternate
        } else {
            PlaybackDirection::Normal
        },
        fill: FillMode::Both,
    }
}

impl fmt::Debug for dyn NativeAnimation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeAnimation")
            .field("play_state", &self.play_state())
            .field("current_time", &self.current_time())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::SpringOptions;

    struct Host {
        linear: bool,
    }

    impl NativeAnimationHost for Host {
        fn supports(&self, _name: &str) -> bool {
            true
        }

        fn supports_linear_easing(&self) -> bool {
            self.linear
        }

        fn animate(
            &self,
            _element: &Rc<dyn ElementAdapter>,
            _name: &str,
            _keyframes: &[Value],
            _options: &NativeKeyframeOptions,
        ) -> Result<Rc<dyn NativeAnimation>, NativeError> {
            Err(NativeError::Detached)
        }
    }

    #[test]
    fn test_easing_names() {
        assert_eq!(map_easing(&Easing::EaseOut, 300.0, None).map(|e| e.to_css()), Some("ease-out".into()));
        assert_eq!(
            map_easing(&Easing::CircIn, 300.0, None).map(|e| e.to_css()),
            Some("cubic-bezier(0, 0.65, 0.55, 1)".into())
        );
        assert_eq!(
            map_easing(&Easing::BackOut, 300.0, None).map(|e| e.to_css()),
            Some("cubic-bezier(0.33, 1.53, 0.69, 0.99)".into())
        );
        assert!(map_easing(&Easing::Anticipate, 300.0, None).is_none());
    }

    #[test]
    fn test_linear_easing_points() {
        let NativeEasing::Points(points) = generate_linear_easing(&Easing::Linear, 100.0, 10.0) else {
            panic!("expected points");
        };
        assert_eq!(points.len(), 10);
        assert_eq!(points[0], 0.0);
        assert_eq!(points[9], 1.0);

        let NativeEasing::Points(points) = generate_linear_easing(&Easing::Linear, 5.0, 10.0) else {
            panic!("expected points");
        };
        assert_eq!(points, vec![0.0, 1.0]);
        assert_eq!(NativeEasing::Points(points).to_css(), "linear(0, 1)");
    }

    #[test]
    fn test_linear_easing_points_are_capped() {
        let cap = (MAX_GENERATOR_DURATION_MS / 10.0) as usize;
        for duration in [f64::INFINITY, 1e12] {
            let NativeEasing::Points(points) = generate_linear_easing(&Easing::EaseOut, duration, 10.0) else {
                panic!("expected points");
            };
            assert_eq!(points.len(), cap);
        }
    }

    #[test]
    fn test_plan_keeps_supported_tween() {
        let options = AnimationOptions::new([0.0, 1.0]).duration(400.0).ease(Easing::EaseIn);
        let plan = plan(&options, vec![0.0.into(), 1.0.into()], &Host { linear: false }, 10.0);
        assert!(!plan.baked);
        assert_eq!(plan.duration, 400.0);
    }

    #[test]
    fn test_plan_uses_linear_points_when_available() {
        let options = AnimationOptions::new([0.0, 1.0]).ease(Easing::Anticipate);
        let keyframes = vec![0.0.into(), 1.0.into()];
        assert!(!plan(&options, keyframes.clone(), &Host { linear: true }, 10.0).baked);
        assert!(plan(&options, keyframes, &Host { linear: false }, 10.0).baked);
    }

    #[test]
    fn test_spring_is_prebaked() {
        let options = AnimationOptions::new([0.0, 1.0]).spring(SpringOptions::physics(400.0, 30.0, 1.0));
        let plan = plan(&options, vec![0.0.into(), 1.0.into()], &Host { linear: true }, 10.0);

        assert!(plan.baked);
        assert_eq!(plan.ease.len(), 1);
        assert_eq!(plan.keyframes.first(), Some(&Value::Number(0.0)));
        assert_eq!(plan.keyframes.last(), Some(&Value::Number(1.0)));
        assert_eq!(plan.duration, (plan.keyframes.len() - 1) as f64 * 10.0);
    }

    #[test]
    fn test_keyframe_options() {
        let options = AnimationOptions::new([0.0, 1.0])
            .duration(200.0)
            .delay(50.0)
            .repeat(2, RepeatType::Reverse);
        let plan = plan(&options, vec![0.0.into(), 1.0.into()], &Host { linear: false }, 10.0);
        let native = keyframe_options(&options, &plan, None);

        assert_eq!(native.iterations, 3.0);
        assert_eq!(native.direction, PlaybackDirection::Alternate);
        assert_eq!(native.fill, FillMode::Both);
        assert_eq!(native.delay, 50.0);
        assert_eq!(native.easing, NativeEasing::EaseInOut);
    }
}
