//! Two-value mixers
//!
//! A mixer blends a pair of values at progress `p`. Which mixer applies is
//! decided once from the value types:
//!
//! - two numbers mix linearly
//! - two colors mix in linear light ([`color`])
//! - strings with embedded numbers/colors mix token by token ([`complex`])
//! - anything else switches from the first value to the second halfway

pub mod color;
pub mod complex;

pub use color::Rgba;
pub use complex::ComplexValue;
use motio_core::Value;
use std::rc::Rc;

/// Blend function for one pair of values
pub type Mixer = Rc<dyn Fn(f64) -> Value>;

pub fn mix_number(from: f64, to: f64, p: f64) -> f64 {
    from + (to - from) * p
}

/// Round to five decimals, trimming float noise from serialized values
pub fn sanitize(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}

/// Serialize a sanitized number the way it appears inside CSS text
pub fn format_number(value: f64) -> String {
    // Adding zero folds -0 into 0
    format!("{}", sanitize(value) + 0.0)
}

/// A mixer that holds `from` until halfway, then switches to `to`
pub fn mix_immediate(from: Value, to: Value) -> Mixer {
    Rc::new(move |p: f64| if p > 0.5 { to.clone() } else { from.clone() })
}

/// Pick the mixer for `from` and `to`
pub fn get_mixer(from: &Value, to: &Value) -> Mixer {
    match (from, to) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, b) = (*a, *b);
            Rc::new(move |p: f64| Value::Number(mix_number(a, b, p))) as Mixer
        }
        (Value::Text(a), Value::Text(b)) => text_mixer(a, b),
        (Value::Number(n), Value::Text(text)) => {
            number_text_mixer(*n, text, false).unwrap_or_else(|| mix_immediate(from.clone(), to.clone()))
        }
        (Value::Text(text), Value::Number(n)) => {
            number_text_mixer(*n, text, true).unwrap_or_else(|| mix_immediate(from.clone(), to.clone()))
        }
    }
}

fn text_mixer(from: &str, to: &str) -> Mixer {
    if from.contains("var(") || to.contains("var(") {
        return mix_immediate(from.into(), to.into());
    }

    if let (Some(a), Some(b)) = (color::Rgba::parse(from), color::Rgba::parse(to)) {
        return Rc::new(move |p: f64| Value::Text(color::mix_rgba(&a, &b, p).to_css()));
    }

    let origin = ComplexValue::parse(from);
    let target = ComplexValue::parse(to);

    // Plain keywords such as "block" and "none" are discrete
    if origin.is_empty() && target.is_empty() {
        return mix_immediate(from.into(), to.into());
    }

    match complex::mix_complex(origin, target) {
        Some(mix) => Rc::new(move |p: f64| Value::Text(mix(p))) as Mixer,
        None => {
            tracing::warn!(
                from,
                to,
                "complex values too different to mix; falling back to an instant switch"
            );
            mix_immediate(from.into(), to.into())
        }
    }
}

/// Mix a bare number against a single-number string such as `"100px"`,
/// keeping the string's units
fn number_text_mixer(number: f64, text: &str, text_first: bool) -> Option<Mixer> {
    let parsed = ComplexValue::parse(text);
    let single = match parsed.numbers().as_slice() {
        [single] if parsed.color_count() == 0 => *single,
        _ => return None,
    };

    let (from, to) = if text_first {
        (single, number)
    } else {
        (number, single)
    };
    let mixer: Mixer = Rc::new(move |p: f64| Value::Text(parsed.render_numbers(&[mix_number(from, to, p)])));
    Some(mixer)
}
