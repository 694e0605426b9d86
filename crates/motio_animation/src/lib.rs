//! Motio Animation Engine
//!
//! Physics generators, hybrid players, keyframe resolution and timelines on
//! top of [`motio_core`].
//!
//! # Features
//!
//! - **Generators**: closed-form springs, inertia with boundary springs, eased keyframe tweens
//! - **Players**: software ticking through the frame scheduler, or handoff to a native compositor
//! - **Keyframe Resolution**: wildcards, CSS variables, `none` and unit conversion by measurement
//! - **Timelines**: multi-track sequences flattened into one keyframe track per value
//! - **Interruptible**: new animations inherit the velocity of the one they replace
//!
//! # Example
//!
//! ```rust
//! use motio_animation::{animate_value, AnimationOptions, MotionContext};
//! use motio_core::{ManualTime, ReactiveValue, SchedulerHandle};
//!
//! let scheduler = SchedulerHandle::with_time(ManualTime::new(0.0));
//! let ctx = MotionContext::new(&scheduler);
//! let x = ReactiveValue::new(&scheduler, 0.0);
//!
//! animate_value(&ctx, &x, AnimationOptions::to(100.0).duration(200.0));
//! for frame in 0..=15 {
//!     scheduler.tick(frame as f64 * 16.0);
//! }
//! assert_eq!(x.get_number(), Some(100.0));
//! ```

pub mod animate;
pub mod context;
pub mod easing;
pub mod generators;
pub mod interpolate;
pub mod mix;
pub mod player;
pub mod resolver;
pub mod timeline;
pub mod transition;

pub use animate::{animate_element, animate_value, ValueAnimation};
pub use context::MotionContext;
pub use easing::{Easing, StepPosition};
pub use generators::{AnimationType, Generator, InertiaOptions, KeyframeGenerator, SpringOptions};
pub use interpolate::{interpolate, InterpolateOptions, Interpolator};
pub use player::{
    AnimationOptions, AnimationPlayer, NativeAnimation, NativeAnimationHost, NativeError, PlayState, PlaybackPath,
    RepeatType,
};
pub use resolver::{KeyframeResolver, ResolverQueue};
pub use timeline::{
    animate_sequence, compile_sequence, play_sequence, At, CompiledSequence, Segment, SegmentTransition,
    SequenceAnimation, SequenceOptions, Stagger, Target,
};
pub use transition::apply_default_transition;
