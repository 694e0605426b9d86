//! Piecewise interpolation across value ranges
//!
//! Maps a number in `input` space onto `output` values, mixing between the
//! surrounding pair with the mixer their types call for.

use crate::easing::Easing;
use crate::mix::{get_mixer, Mixer};
use motio_core::{MotionError, Result, Value};
use std::fmt;
use std::rc::Rc;

/// Options for [`interpolate`]
#[derive(Clone, Debug)]
pub struct InterpolateOptions {
    /// Clamp input to the input range
    pub clamp: bool,
    /// One easing for every segment, or one per segment
    pub ease: Vec<Easing>,
}

impl Default for InterpolateOptions {
    fn default() -> Self {
        Self {
            clamp: true,
            ease: Vec::new(),
        }
    }
}

/// Fraction of the way `value` sits between `from` and `to`.
///
/// A zero-length range reports 1.
pub fn progress(from: f64, to: f64, value: f64) -> f64 {
    let range = to - from;
    if range == 0.0 {
        1.0
    } else {
        (value - from) / range
    }
}

/// A compiled interpolation
#[derive(Clone)]
pub struct Interpolator {
    input: Vec<f64>,
    mixers: Vec<Mixer>,
    first: Value,
    constant: Option<Value>,
    zero_delta: bool,
    clamp: bool,
}

/// Build an interpolator from `input` to `output`.
///
/// `input` must be non-empty and as long as `output`. A descending input
/// range is accepted.
pub fn interpolate(input: &[f64], output: &[Value], options: InterpolateOptions) -> Result<Interpolator> {
    if input.len() != output.len() {
        return Err(MotionError::InterpolationLength {
            input: input.len(),
            output: output.len(),
        });
    }
    let Some(first) = output.first() else {
        return Err(MotionError::EmptyInput("interpolate input"));
    };

    if input.len() == 1 || (input.len() == 2 && output[0] == output[1]) {
        return Ok(Interpolator {
            input: input.to_vec(),
            mixers: Vec::new(),
            first: first.clone(),
            constant: output.last().cloned(),
            zero_delta: false,
            clamp: options.clamp,
        });
    }

    let mut input = input.to_vec();
    let mut output = output.to_vec();
    let ease = options.ease;
    let zero_delta = input[0] == input[1];

    if input[0] > input[input.len() - 1] {
        input.reverse();
        output.reverse();
    }

    let mixers = output
        .windows(2)
        .enumerate()
        .map(|(index, pair)| {
            let mixer = get_mixer(&pair[0], &pair[1]);
            let easing = if ease.len() == 1 {
                ease.first()
            } else {
                ease.get(index)
            };
            match easing {
                Some(easing) if !easing.is_linear() => {
                    let easing = easing.clone();
                    Rc::new(move |p: f64| mixer(easing.apply(p))) as Mixer
                }
                _ => mixer,
            }
        })
        .collect();

    Ok(Interpolator {
        first: output[0].clone(),
        input,
        mixers,
        constant: None,
        zero_delta,
        clamp: options.clamp,
    })
}

impl Interpolator {
    /// Sample at `v` in input space
    pub fn at(&self, v: f64) -> Value {
        if let Some(constant) = &self.constant {
            return constant.clone();
        }

        let last = self.input.len() - 1;
        let v = if self.clamp {
            v.clamp(self.input[0], self.input[last])
        } else {
            v
        };

        if self.zero_delta && v < self.input[0] {
            return self.first.clone();
        }

        let mut index = 0;
        if self.mixers.len() > 1 {
            while index < self.input.len() - 2 {
                if v < self.input[index + 1] {
                    break;
                }
                index += 1;
            }
        }

        let p = progress(self.input[index], self.input[index + 1], v);
        (self.mixers[index])(p)
    }

    /// Sample and coerce to a number, if numeric
    pub fn number_at(&self, v: f64) -> Option<f64> {
        self.at(v).as_number()
    }
}

impl fmt::Debug for Interpolator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpolator")
            .field("input", &self.input)
            .field("segments", &self.mixers.len())
            .field("clamp", &self.clamp)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbers(values: &[f64]) -> Vec<Value> {
        values.iter().map(|v| Value::Number(*v)).collect()
    }

    #[test]
    fn test_linear_segments() {
        let interp = interpolate(&[0.0, 1.0, 2.0], &numbers(&[0.0, 10.0, 0.0]), Default::default()).unwrap();
        assert_eq!(interp.at(0.5), Value::Number(5.0));
        assert_eq!(interp.at(1.5), Value::Number(5.0));
        assert_eq!(interp.at(3.0), Value::Number(0.0));
    }

    #[test]
    fn test_unclamped_extrapolates() {
        let options = InterpolateOptions {
            clamp: false,
            ..Default::default()
        };
        let interp = interpolate(&[0.0, 100.0], &numbers(&[0.0, 1.0]), options).unwrap();
        assert_eq!(interp.at(200.0), Value::Number(2.0));
        assert_eq!(interp.at(-100.0), Value::Number(-1.0));
    }

    #[test]
    fn test_reversed_input() {
        let interp = interpolate(&[100.0, 0.0], &numbers(&[0.0, 1.0]), Default::default()).unwrap();
        assert_eq!(interp.at(25.0), Value::Number(0.75));
    }

    #[test]
    fn test_reversed_input_keeps_ease_order() {
        let options = InterpolateOptions {
            ease: vec![Easing::EaseIn, Easing::Linear],
            ..Default::default()
        };
        let interp = interpolate(&[2.0, 1.0, 0.0], &numbers(&[0.0, 10.0, 20.0]), options).unwrap();
        // Second segment of the ascending range stays linear
        assert_eq!(interp.at(1.5), Value::Number(5.0));
        assert_ne!(interp.at(0.5), Value::Number(15.0));
    }

    #[test]
    fn test_zero_delta_range() {
        let interp = interpolate(&[0.0, 0.0, 1.0], &numbers(&[5.0, 0.0, 10.0]), InterpolateOptions {
            clamp: false,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(interp.at(-1.0), Value::Number(5.0));
        assert_eq!(interp.at(0.5), Value::Number(5.0));
    }

    #[test]
    fn test_per_segment_easing() {
        let options = InterpolateOptions {
            clamp: true,
            ease: vec![Easing::custom(|t| t * t), Easing::Linear],
        };
        let interp = interpolate(&[0.0, 1.0, 2.0], &numbers(&[0.0, 1.0, 2.0]), options).unwrap();
        assert_eq!(interp.at(0.5), Value::Number(0.25));
        assert_eq!(interp.at(1.5), Value::Number(1.5));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            interpolate(&[0.0, 1.0], &numbers(&[0.0]), Default::default()),
            Err(MotionError::InterpolationLength { input: 2, output: 1 })
        ));
        assert!(matches!(
            interpolate(&[], &[], Default::default()),
            Err(MotionError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_strings_and_constants() {
        let interp = interpolate(&[0.0, 1.0], &["0px".into(), "20px".into()], Default::default()).unwrap();
        assert_eq!(interp.at(0.5), Value::from("10px"));

        let constant = interpolate(&[0.0, 1.0], &numbers(&[3.0, 3.0]), Default::default()).unwrap();
        assert_eq!(constant.at(0.7), Value::Number(3.0));
    }
}
