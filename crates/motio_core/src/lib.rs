//! Motio Core Runtime
//!
//! Foundational primitives for the Motio animation engine:
//!
//! - **Frame Scheduler**: six fixed phases per tick with double-buffered queues
//! - **Clock**: a "now" that stays stable within one synchronous turn
//! - **Reactive Values**: observable values with velocity tracking
//! - **Element Adapters**: the capability set the engine needs from a render target
//!
//! Everything here is single-threaded. Shared state lives behind `Rc` and
//! interior mutability, and the host drives time by calling
//! [`SchedulerHandle::tick`].
//!
//! # Example
//!
//! ```rust
//! use motio_core::{ManualTime, Phase, SchedulerHandle};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let scheduler = SchedulerHandle::with_time(ManualTime::new(0.0));
//! let ran = Rc::new(Cell::new(false));
//!
//! let ran_clone = ran.clone();
//! scheduler.schedule_fn(Phase::Update, move |_| ran_clone.set(true));
//! scheduler.tick(16.0);
//!
//! assert!(ran.get());
//! ```

pub mod clock;
pub mod completion;
pub mod config;
pub mod element;
pub mod error;
pub mod frame;
pub mod reactive;
pub mod scheduler;
pub mod subscription;
pub mod value;

pub use clock::{Clock, ManualTime, MonotonicTime, TimeSource};
pub use completion::{AnimationOutcome, Completion, CompletionFuture};
pub use config::MotionConfig;
pub use element::{Axis, BoundingBox, ElementAdapter, ElementId, ElementRegistry};
pub use error::{MotionError, Result};
pub use frame::{FrameData, Phase};
pub use reactive::{velocity_per_second, AnimationControls, ReactiveValue, Subscription, ValueEvent};
pub use scheduler::{Job, SchedulerHandle};
pub use subscription::{HandlerId, SubscriptionManager};
pub use value::{parse_float, Value};
