//! Shared animation context

use crate::player::NativeAnimationHost;
use crate::resolver::ResolverQueue;
use motio_core::{MotionConfig, SchedulerHandle};
use std::fmt;
use std::rc::Rc;

/// Everything players share: the scheduler, the resolver batch and the
/// optional native compositor.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MotionContext {
    scheduler: SchedulerHandle,
    resolvers: ResolverQueue,
    native: Option<Rc<dyn NativeAnimationHost>>,
}

impl MotionContext {
    pub fn new(scheduler: &SchedulerHandle) -> Self {
        Self {
            scheduler: scheduler.clone(),
            resolvers: ResolverQueue::new(scheduler),
            native: None,
        }
    }

    /// Hand eligible animations to `host`
    pub fn with_native_host(mut self, host: Rc<dyn NativeAnimationHost>) -> Self {
        self.native = Some(host);
        self
    }

    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.scheduler
    }

    pub fn config(&self) -> &MotionConfig {
        self.scheduler.config()
    }

    pub fn resolvers(&self) -> &ResolverQueue {
        &self.resolvers
    }

    pub fn native_host(&self) -> Option<&Rc<dyn NativeAnimationHost>> {
        self.native.as_ref()
    }

    /// Current frame time, or the clock outside a frame
    pub fn now(&self) -> f64 {
        let frame = self.scheduler.frame_data();
        if frame.is_processing {
            frame.timestamp
        } else {
            self.scheduler.now()
        }
    }
}

impl fmt::Debug for MotionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionContext")
            .field("scheduler", &self.scheduler)
            .field("resolvers", &self.resolvers)
            .field("native", &self.native.is_some())
            .finish()
    }
}
