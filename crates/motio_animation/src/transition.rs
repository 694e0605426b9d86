//! Default transitions by value name

use crate::easing::Easing;
use crate::generators::{AnimationType, SpringOptions};
use crate::player::AnimationOptions;
use motio_core::Value;

/// Transform properties, in application order
pub const TRANSFORM_PROPERTIES: [&str; 17] = [
    "transformPerspective",
    "x",
    "y",
    "z",
    "translateX",
    "translateY",
    "translateZ",
    "scale",
    "scaleX",
    "scaleY",
    "rotate",
    "rotateX",
    "rotateY",
    "rotateZ",
    "skew",
    "skewX",
    "skewY",
];

/// Duration of multi-keyframe defaults
pub const KEYFRAMES_DURATION_MS: f64 = 800.0;

/// Duration of the default tween
pub const EASE_DURATION_MS: f64 = 300.0;

pub fn is_transform_property(name: &str) -> bool {
    TRANSFORM_PROPERTIES.contains(&name)
}

fn under_damped_spring() -> SpringOptions {
    SpringOptions {
        rest_speed: Some(10.0),
        ..SpringOptions::physics(500.0, 25.0, 1.0)
    }
}

fn critically_damped_spring(target: Option<&Value>) -> SpringOptions {
    let stiffness: f64 = 550.0;
    let damping = if target.and_then(Value::as_number) == Some(0.0) {
        2.0 * stiffness.sqrt()
    } else {
        30.0
    };
    SpringOptions {
        rest_speed: Some(10.0),
        ..SpringOptions::physics(stiffness, damping, 1.0)
    }
}

/// Fill in the transition for `options` when the caller configured none.
///
/// Multi-keyframe arrays get an 800ms tween, transforms a snappy spring
/// (critically damped for scale), everything else a 300ms ease.
pub fn apply_default_transition(options: &mut AnimationOptions) {
    if options.is_transition_defined() {
        return;
    }

    if options.keyframes.len() > 2 {
        options.duration = Some(KEYFRAMES_DURATION_MS);
        return;
    }

    match options.name.as_deref() {
        Some(name) if is_transform_property(name) => {
            let spring = if name.starts_with("scale") {
                critically_damped_spring(options.keyframes.get(1).and_then(Option::as_ref))
            } else {
                under_damped_spring()
            };
            options.kind = AnimationType::Spring(spring);
        }
        _ => {
            options.ease = vec![Easing::CubicBezier(0.25, 0.1, 0.35, 1.0)];
            options.duration = Some(EASE_DURATION_MS);
        }
    }
}
