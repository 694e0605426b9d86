//! Frame scheduler
//!
//! Orders jobs into the six [`Phase`]s of a tick. Each phase keeps two
//! queues: the one being drained this tick and the one collecting jobs for
//! the next tick, so scheduling from inside a job never disturbs iteration.
//!
//! The scheduler does not own a run loop. The host calls
//! [`SchedulerHandle::tick`] once per display frame while
//! [`SchedulerHandle::needs_frame`] reports pending work.

use crate::clock::{Clock, MonotonicTime, TimeSource};
use crate::config::{MotionConfig, DEFAULT_FRAME_DELTA_MS};
use crate::frame::{FrameData, Phase};
use indexmap::IndexMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type JobKey = usize;

/// A schedulable callback.
///
/// Identity is the allocation: clones of a `Job` are the same job, so
/// scheduling a clone of an already queued job is a no-op.
#[derive(Clone)]
pub struct Job {
    callback: Rc<RefCell<dyn FnMut(&FrameData)>>,
}

impl Job {
    pub fn new<F>(callback: F) -> Self
    where
        F: FnMut(&FrameData) + 'static,
    {
        Self {
            callback: Rc::new(RefCell::new(callback)),
        }
    }

    fn key(&self) -> JobKey {
        Rc::as_ptr(&self.callback) as *const () as usize
    }

    fn run(&self, frame: &FrameData) {
        match self.callback.try_borrow_mut() {
            Ok(mut callback) => callback(frame),
            Err(_) => tracing::warn!("job re-entered while running; skipped"),
        }
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Job {}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Job").field(&self.key()).finish()
    }
}

type JobQueue = IndexMap<JobKey, Job, FxBuildHasher>;

/// Double-buffered queue for one phase
#[derive(Default)]
struct Step {
    this_frame: JobQueue,
    next_frame: JobQueue,
    keep_alive: FxHashSet<JobKey>,
    processing: bool,
    /// Index of the next job to run in `this_frame`
    cursor: usize,
}

impl Step {
    fn schedule(&mut self, job: Job, keep_alive: bool, immediate: bool) {
        let key = job.key();
        if keep_alive {
            self.keep_alive.insert(key);
        }

        let queue = if immediate && self.processing {
            &mut self.this_frame
        } else {
            &mut self.next_frame
        };
        queue.entry(key).or_insert(job);
    }

    fn cancel(&mut self, key: JobKey) {
        self.next_frame.shift_remove(&key);
        self.keep_alive.remove(&key);

        if let Some(index) = self.this_frame.get_index_of(&key) {
            self.this_frame.shift_remove_index(index);
            if index < self.cursor {
                self.cursor -= 1;
            }
        }
    }

    fn has_pending(&self) -> bool {
        !self.next_frame.is_empty()
    }
}

struct SchedulerInner {
    steps: RefCell<[Step; 6]>,
    frame: Rc<Cell<FrameData>>,
    clock: Clock,
    config: MotionConfig,
    processing: Cell<bool>,
    deferred: Cell<Option<FrameData>>,
    run_next_frame: Cell<bool>,
    use_default_elapsed: Cell<bool>,
    wake: RefCell<Option<Rc<dyn Fn()>>>,
}

/// Shared handle to the frame scheduler.
///
/// Construct one per process (or per test) and pass it wherever jobs are
/// scheduled. Clones share the same queues and frame data.
#[derive(Clone)]
pub struct SchedulerHandle {
    inner: Rc<SchedulerInner>,
}

impl SchedulerHandle {
    /// Create a scheduler driven by the given time source
    pub fn new(config: MotionConfig, source: Rc<dyn TimeSource>) -> Self {
        let frame = Rc::new(Cell::new(FrameData::default()));
        let clock = Clock::new(source, frame.clone());

        Self {
            inner: Rc::new(SchedulerInner {
                steps: RefCell::new(Default::default()),
                frame,
                clock,
                config,
                processing: Cell::new(false),
                deferred: Cell::new(None),
                run_next_frame: Cell::new(false),
                use_default_elapsed: Cell::new(true),
                wake: RefCell::new(None),
            }),
        }
    }

    /// Create a scheduler with default configuration on the given time source
    pub fn with_time(source: impl TimeSource + 'static) -> Self {
        Self::new(MotionConfig::default(), Rc::new(source))
    }

    pub fn config(&self) -> &MotionConfig {
        &self.inner.config
    }

    pub fn clock(&self) -> &Clock {
        &self.inner.clock
    }

    /// Shorthand for `clock().now()`
    pub fn now(&self) -> f64 {
        self.inner.clock.now()
    }

    /// Mark the end of the current synchronous turn
    pub fn end_turn(&self) {
        self.inner.clock.end_turn();
    }

    /// Copy of the latest frame data
    pub fn frame_data(&self) -> FrameData {
        self.inner.frame.get()
    }

    /// Register a callback invoked whenever the scheduler goes from idle to
    /// wanting a frame
    pub fn set_wake_callback<F: Fn() + 'static>(&self, callback: F) {
        *self.inner.wake.borrow_mut() = Some(Rc::new(callback));
    }

    /// Whether the host should deliver another tick
    pub fn needs_frame(&self) -> bool {
        self.inner.steps.borrow().iter().any(Step::has_pending)
    }

    /// Queue `job` in `phase`.
    ///
    /// Lands in the next tick unless `immediate` is set and that phase is
    /// being processed right now. `keep_alive` jobs are re-queued every tick
    /// until cancelled.
    pub fn schedule(&self, phase: Phase, job: Job, keep_alive: bool, immediate: bool) -> Job {
        if !self.inner.run_next_frame.get() {
            self.wake();
        }

        self.inner.steps.borrow_mut()[phase.index()].schedule(job.clone(), keep_alive, immediate);
        job
    }

    /// Wrap a closure in a [`Job`] and queue it for the next tick
    pub fn schedule_fn<F>(&self, phase: Phase, callback: F) -> Job
    where
        F: FnMut(&FrameData) + 'static,
    {
        self.schedule(phase, Job::new(callback), false, false)
    }

    /// Remove `job` from every phase and from the keep-alive set
    pub fn cancel(&self, job: &Job) {
        let key = job.key();
        for step in self.inner.steps.borrow_mut().iter_mut() {
            step.cancel(key);
        }
    }

    /// Derive frame data for a host timestamp and process it
    pub fn tick(&self, timestamp: f64) {
        let previous = self.inner.frame.get();
        let delta = if self.inner.use_default_elapsed.get() || self.inner.config.manual_timing {
            DEFAULT_FRAME_DELTA_MS
        } else {
            (timestamp - previous.timestamp).clamp(1.0, self.inner.config.max_frame_delta_ms)
        };

        self.inner.run_next_frame.set(false);
        self.process(FrameData {
            delta,
            timestamp,
            is_processing: true,
        });

        if self.inner.run_next_frame.get() {
            self.inner.use_default_elapsed.set(false);
        }
    }

    /// Run every phase for `frame`.
    ///
    /// A call made from inside a job is deferred and drained once after the
    /// current pass; further nested calls leave their work for the next tick.
    pub fn process(&self, frame: FrameData) {
        if self.inner.processing.get() {
            tracing::trace!(timestamp = frame.timestamp, "deferring nested process call");
            self.inner.deferred.set(Some(frame));
            return;
        }

        self.inner.processing.set(true);
        self.run_pass(frame);

        if let Some(deferred) = self.inner.deferred.take() {
            self.run_pass(deferred);
            if self.inner.deferred.take().is_some() {
                tracing::trace!("nested process call after drain pass; left for next tick");
            }
        }

        self.inner.processing.set(false);
    }

    fn run_pass(&self, frame: FrameData) {
        let frame = FrameData {
            is_processing: true,
            ..frame
        };
        self.inner.frame.set(frame);
        tracing::trace!(timestamp = frame.timestamp, delta = frame.delta, "frame pass");

        for phase in Phase::ALL {
            self.process_step(phase, &frame);
        }

        self.inner.frame.set(FrameData {
            is_processing: false,
            ..frame
        });
        self.inner.clock.end_turn();
    }

    fn process_step(&self, phase: Phase, frame: &FrameData) {
        let index = phase.index();
        {
            let mut steps = self.inner.steps.borrow_mut();
            let step = &mut steps[index];
            std::mem::swap(&mut step.this_frame, &mut step.next_frame);
            step.processing = true;
            step.cursor = 0;
        }

        loop {
            // The borrow must be released before the job runs: jobs schedule
            // and cancel freely.
            let (job, kept_alive) = {
                let mut steps = self.inner.steps.borrow_mut();
                let step = &mut steps[index];
                let Some((&key, job)) = step.this_frame.get_index(step.cursor) else {
                    break;
                };
                let job = job.clone();
                step.cursor += 1;

                let kept_alive = step.keep_alive.contains(&key);
                if kept_alive {
                    step.next_frame.entry(key).or_insert_with(|| job.clone());
                }
                (job, kept_alive)
            };

            if kept_alive {
                self.inner.run_next_frame.set(true);
            }
            job.run(frame);
        }

        let mut steps = self.inner.steps.borrow_mut();
        let step = &mut steps[index];
        step.this_frame.clear();
        step.processing = false;
        step.cursor = 0;
    }

    fn wake(&self) {
        self.inner.run_next_frame.set(true);
        self.inner.use_default_elapsed.set(true);

        let wake = self.inner.wake.borrow().clone();
        if let Some(wake) = wake {
            wake();
        }
    }
}

impl Default for SchedulerHandle {
    fn default() -> Self {
        Self::with_time(MonotonicTime::new())
    }
}

impl fmt::Debug for SchedulerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerHandle")
            .field("frame", &self.inner.frame.get())
            .field("processing", &self.inner.processing.get())
            .finish()
    }
}
