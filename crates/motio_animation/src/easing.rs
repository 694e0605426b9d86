//! Easing functions for animations
//!
//! Every easing maps progress in `0.0..=1.0` to eased progress. Named curves
//! are fixed cubic beziers or closed forms; `Mirrored` and `Reversed` derive
//! in-out and out variants from an in curve.

use std::fmt;
use std::rc::Rc;

/// Which end of each interval a [`Easing::Steps`] jump happens at
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepPosition {
    Start,
    #[default]
    End,
}

/// Easing function type
#[derive(Clone, Default)]
pub enum Easing {
    #[default]
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
    CircIn,
    CircOut,
    CircInOut,
    BackIn,
    BackOut,
    BackInOut,
    Anticipate,
    Steps(u32, StepPosition),
    CubicBezier(f64, f64, f64, f64),
    /// In-out variant of the wrapped curve
    Mirrored(Box<Easing>),
    /// Out variant of the wrapped in curve
    Reversed(Box<Easing>),
    Custom(Rc<dyn Fn(f64) -> f64>),
}

impl Easing {
    /// Wrap a closure as an easing
    pub fn custom<F: Fn(f64) -> f64 + 'static>(f: F) -> Self {
        Easing::Custom(Rc::new(f))
    }

    pub fn mirrored(self) -> Self {
        Easing::Mirrored(Box::new(self))
    }

    pub fn reversed(self) -> Self {
        Easing::Reversed(Box::new(self))
    }

    /// Look up a named curve, e.g. `"easeInOut"` or `"backOut"`
    pub fn from_name(name: &str) -> Option<Self> {
        let easing = match name {
            "linear" => Easing::Linear,
            "easeIn" => Easing::EaseIn,
            "easeOut" => Easing::EaseOut,
            "easeInOut" => Easing::EaseInOut,
            "circIn" => Easing::CircIn,
            "circOut" => Easing::CircOut,
            "circInOut" => Easing::CircInOut,
            "backIn" => Easing::BackIn,
            "backOut" => Easing::BackOut,
            "backInOut" => Easing::BackInOut,
            "anticipate" => Easing::Anticipate,
            _ => return None,
        };
        Some(easing)
    }

    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f64) -> f64 {
        match self {
            Easing::Linear => t,
            Easing::EaseIn => cubic_bezier_ease(t, 0.42, 0.0, 1.0, 1.0),
            Easing::EaseOut => cubic_bezier_ease(t, 0.0, 0.0, 0.58, 1.0),
            Easing::EaseInOut => cubic_bezier_ease(t, 0.42, 0.0, 0.58, 1.0),
            Easing::CircIn => circ_in(t),
            Easing::CircOut => reverse(circ_in, t),
            Easing::CircInOut => mirror(circ_in, t),
            Easing::BackIn => reverse(back_out, t),
            Easing::BackOut => back_out(t),
            Easing::BackInOut => mirror(back_in, t),
            Easing::Anticipate => {
                let t = t * 2.0;
                if t < 1.0 {
                    0.5 * back_in(t)
                } else {
                    0.5 * (2.0 - 2f64.powf(-10.0 * (t - 1.0)))
                }
            }
            Easing::Steps(count, position) => steps(t, *count, *position),
            Easing::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, *x1, *y1, *x2, *y2),
            Easing::Mirrored(inner) => mirror(|p| inner.apply(p), t),
            Easing::Reversed(inner) => reverse(|p| inner.apply(p), t),
            Easing::Custom(f) => f(t),
        }
    }

    pub fn is_linear(&self) -> bool {
        match self {
            Easing::Linear => true,
            Easing::CubicBezier(x1, y1, x2, y2) => x1 == y1 && x2 == y2,
            _ => false,
        }
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Easing::Linear => f.write_str("Linear"),
            Easing::EaseIn => f.write_str("EaseIn"),
            Easing::EaseOut => f.write_str("EaseOut"),
            Easing::EaseInOut => f.write_str("EaseInOut"),
            Easing::CircIn => f.write_str("CircIn"),
            Easing::CircOut => f.write_str("CircOut"),
            Easing::CircInOut => f.write_str("CircInOut"),
            Easing::BackIn => f.write_str("BackIn"),
            Easing::BackOut => f.write_str("BackOut"),
            Easing::BackInOut => f.write_str("BackInOut"),
            Easing::Anticipate => f.write_str("Anticipate"),
            Easing::Steps(n, position) => f.debug_tuple("Steps").field(n).field(position).finish(),
            Easing::CubicBezier(x1, y1, x2, y2) => f
                .debug_tuple("CubicBezier")
                .field(x1)
                .field(y1)
                .field(x2)
                .field(y2)
                .finish(),
            Easing::Mirrored(inner) => f.debug_tuple("Mirrored").field(inner).finish(),
            Easing::Reversed(inner) => f.debug_tuple("Reversed").field(inner).finish(),
            Easing::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<[f64; 4]> for Easing {
    fn from([x1, y1, x2, y2]: [f64; 4]) -> Self {
        Easing::CubicBezier(x1, y1, x2, y2)
    }
}

fn circ_in(t: f64) -> f64 {
    1.0 - t.acos().sin()
}

fn back_out(t: f64) -> f64 {
    cubic_bezier_ease(t, 0.33, 1.53, 0.69, 0.99)
}

fn back_in(t: f64) -> f64 {
    reverse(back_out, t)
}

/// Run `ease` forwards over the first half and backwards over the second
fn mirror(ease: impl Fn(f64) -> f64, t: f64) -> f64 {
    if t <= 0.5 {
        ease(2.0 * t) / 2.0
    } else {
        (2.0 - ease(2.0 * (1.0 - t))) / 2.0
    }
}

/// Turn an in curve into the matching out curve
fn reverse(ease: impl Fn(f64) -> f64, t: f64) -> f64 {
    1.0 - ease(1.0 - t)
}

fn steps(t: f64, count: u32, position: StepPosition) -> f64 {
    let count = count.max(1) as f64;
    let rounded = match position {
        StepPosition::End => (t.min(0.999) * count).floor(),
        StepPosition::Start => (t.max(0.001) * count).ceil(),
    };
    (rounded / count).clamp(0.0, 1.0)
}

/// Cubic bezier easing with fixed endpoints (0,0) and (1,1); solves x for t, then returns y.
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
pub fn cubic_bezier_ease(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    // Endpoints are always exact
    if t <= 0.0 || t >= 1.0 {
        return t;
    }
    if x1 == y1 && x2 == y2 {
        return t;
    }

    // Solve for parameter `p` where bezier_x(p) == t using Newton-Raphson,
    // falling back to binary search if the slope is too flat.
    let mut p = t;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - t;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2);
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = t;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - t).abs() < 1e-7 {
            break;
        }
        if val < t {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2)
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    // Horner form: ((1-3p2+3p1)t + 3p2-6p1)t + 3p1) * t
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier: B'(t) = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_endpoints_exact() {
        let curves = [
            Easing::Linear,
            Easing::EaseIn,
            Easing::EaseOut,
            Easing::EaseInOut,
            Easing::CircIn,
            Easing::CircOut,
            Easing::CircInOut,
            Easing::BackIn,
            Easing::BackOut,
            Easing::BackInOut,
        ];
        for easing in curves {
            assert!(close(easing.apply(0.0), 0.0), "{:?} at 0", easing);
            assert!(close(easing.apply(1.0), 1.0), "{:?} at 1", easing);
        }
        // Anticipate settles exponentially and stops just short of 1
        assert!((Easing::Anticipate.apply(1.0) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_ease_in_out_symmetric() {
        let easing = Easing::EaseInOut;
        assert!(close(easing.apply(0.5), 0.5));
        for t in [0.1, 0.25, 0.4] {
            assert!(close(easing.apply(t) + easing.apply(1.0 - t), 1.0));
        }
    }

    #[test]
    fn test_back_overshoots() {
        assert!(Easing::BackOut.apply(0.6) > 1.0);
        assert!(Easing::BackIn.apply(0.3) < 0.0);
        assert!(Easing::Anticipate.apply(0.2) < 0.0);
    }

    #[test]
    fn test_modifiers() {
        let custom = Easing::custom(|t| t * t);
        assert!(close(custom.apply(0.5), 0.25));
        assert!(close(custom.clone().reversed().apply(0.5), 0.75));
        assert!(close(custom.mirrored().apply(0.25), 0.125));
    }

    #[test]
    fn test_steps() {
        let end = Easing::Steps(4, StepPosition::End);
        assert_eq!(end.apply(0.0), 0.0);
        assert_eq!(end.apply(0.3), 0.25);
        assert_eq!(end.apply(1.0), 0.75);

        let start = Easing::Steps(4, StepPosition::Start);
        assert_eq!(start.apply(0.0), 0.25);
        assert_eq!(start.apply(0.3), 0.5);
        assert_eq!(start.apply(1.0), 1.0);
    }

    #[test]
    fn test_linear_bezier_detected() {
        assert!(Easing::CubicBezier(0.2, 0.2, 0.8, 0.8).is_linear());
        assert!(!Easing::from([0.42, 0.0, 0.58, 1.0]).is_linear());
        assert!(Easing::from_name("circInOut").is_some());
        assert!(Easing::from_name("bouncy").is_none());
    }
}
