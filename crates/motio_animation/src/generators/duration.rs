//! Duration discovery for open-ended generators

use super::{AnimationType, Generator, GeneratorOptions};
use crate::easing::Easing;
use std::cell::RefCell;
use std::rc::Rc;

/// Sampling step when searching for a generator's end
pub const GENERATOR_STEP_MS: f64 = 50.0;

/// Generators still running after this long are treated as infinite
pub const MAX_GENERATOR_DURATION_MS: f64 = 20_000.0;

/// Sample `generator` every 50ms until it reports done.
///
/// Returns `f64::INFINITY` if it is still running at the 20s cap, which
/// bounds the search at 400 steps.
pub fn calc_generator_duration(generator: &mut Generator) -> f64 {
    let mut duration = 0.0;
    let mut state = generator.next(duration);

    while !state.done && duration < MAX_GENERATOR_DURATION_MS {
        duration += GENERATOR_STEP_MS;
        state = generator.next(duration);
    }

    if duration >= MAX_GENERATOR_DURATION_MS {
        f64::INFINITY
    } else {
        duration
    }
}

/// Turn a generator into an easing curve plus the duration it needs.
///
/// The generator runs from 0 to `scale`, and the easing samples it at
/// `progress * duration`, so a spring can shape a plain tween segment.
pub fn generator_easing(kind: &AnimationType, options: &GeneratorOptions, scale: f64) -> (Easing, f64) {
    let options = GeneratorOptions {
        keyframes: vec![0.0.into(), scale.into()],
        ..options.clone()
    };
    let mut generator = Generator::build(kind, &options);
    let duration = calc_generator_duration(&mut generator).min(MAX_GENERATOR_DURATION_MS);

    let generator = Rc::new(RefCell::new(generator));
    let easing = Easing::custom(move |progress| {
        let value = generator.borrow_mut().next(duration * progress).value;
        value.as_number().unwrap_or(0.0) / scale
    });

    (easing, duration)
}
