//! Frame-driven playback of a generator
//!
//! Owns the timing state machine: start/hold times, speed, delay, repeats.
//! It never touches a scheduler; the player feeds it timestamps.

use super::options::{get_final_keyframe, AnimationOptions, RepeatType};
use super::PlayState;
use crate::generators::{calc_generator_duration, AnimationType, Generator};
use motio_core::Value;

/// Result of one tick
#[derive(Clone, Debug, PartialEq)]
pub struct TickOutput {
    pub value: Value,
    pub done: bool,
    /// Playback reached its end on this tick
    pub finished: bool,
}

/// Generator playback with delay, repeats and speed
#[derive(Debug)]
pub struct SoftwarePlayback {
    generator: Generator,
    mirrored: Option<Generator>,
    keyframes: Vec<Value>,
    final_keyframe: Option<Value>,
    is_inertia: bool,
    delay: f64,
    repeat: u32,
    repeat_count: f64,
    repeat_type: RepeatType,
    repeat_delay: f64,
    calculated_duration: f64,
    resolved_duration: f64,
    total_duration: f64,
    state: PlayState,
    start_time: Option<f64>,
    hold_time: Option<f64>,
    current_time: f64,
    speed: f64,
}

impl SoftwarePlayback {
    pub fn new(options: &AnimationOptions, keyframes: Vec<Value>, final_keyframe: Option<Value>) -> Self {
        Self::with_kind(&options.kind, options, keyframes, final_keyframe)
    }

    /// Build with a generator kind other than the one in `options`
    pub fn with_kind(
        kind: &AnimationType,
        options: &AnimationOptions,
        keyframes: Vec<Value>,
        final_keyframe: Option<Value>,
    ) -> Self {
        let mut generator = Generator::build(kind, &options.generator_options(keyframes.clone()));

        let mirrored = (options.repeat_type == RepeatType::Mirror).then(|| {
            let mut reversed = options.generator_options(keyframes.iter().rev().cloned().collect());
            reversed.velocity = -options.velocity;
            Generator::build(kind, &reversed)
        });

        let calculated_duration = match generator.calculated_duration() {
            Some(duration) => duration,
            None => calc_generator_duration(&mut generator),
        };
        let repeat_count = options.repeat_count();
        let resolved_duration = calculated_duration + options.repeat_delay;
        let total_duration = resolved_duration * (repeat_count + 1.0) - options.repeat_delay;

        tracing::trace!(
            kind = generator.kind_name(),
            calculated_duration,
            total_duration,
            "software playback built"
        );

        Self {
            generator,
            mirrored,
            keyframes,
            final_keyframe,
            is_inertia: matches!(kind, AnimationType::Inertia(_)),
            delay: options.delay,
            repeat: options.repeat,
            repeat_count,
            repeat_type: options.repeat_type,
            repeat_delay: options.repeat_delay,
            calculated_duration,
            resolved_duration,
            total_duration,
            state: PlayState::Idle,
            start_time: None,
            hold_time: None,
            current_time: 0.0,
            speed: 1.0,
        }
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn keyframes(&self) -> &[Value] {
        &self.keyframes
    }

    /// One iteration, excluding delays
    pub fn calculated_duration(&self) -> f64 {
        self.calculated_duration
    }

    /// All iterations and repeat delays, excluding the initial delay
    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn start_time(&self) -> Option<f64> {
        self.start_time
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The keyframe playback settles on
    pub fn final_value(&self) -> Option<Value> {
        get_final_keyframe(
            &self.keyframes,
            self.repeat,
            self.repeat_type,
            self.final_keyframe.as_ref(),
            self.speed,
        )
    }

    fn update_time(&mut self, timestamp: f64) {
        match (self.hold_time, self.start_time) {
            (Some(hold), _) => self.current_time = hold,
            (None, Some(start)) => self.current_time = (timestamp - start).round() * self.speed,
            (None, None) => {}
        }
    }

    /// Advance to `timestamp`. With `sample`, `timestamp` is the playback
    /// time itself rather than a clock reading.
    pub fn tick(&mut self, timestamp: f64, sample: bool) -> TickOutput {
        let Some(mut start) = self.start_time else {
            let state = self.generator.next(0.0);
            return TickOutput {
                value: state.value,
                done: state.done,
                finished: false,
            };
        };

        if self.speed > 0.0 {
            start = start.min(timestamp);
        } else if self.speed < 0.0 {
            start = start.min(timestamp - self.total_duration / self.speed);
        }
        self.start_time = Some(start);

        if sample {
            self.current_time = timestamp;
        } else {
            self.update_time(timestamp);
        }

        let direction = if self.speed >= 0.0 { 1.0 } else { -1.0 };
        let time_without_delay = self.current_time - self.delay * direction;
        let in_delay = if self.speed >= 0.0 {
            time_without_delay < 0.0
        } else {
            time_without_delay > self.total_duration
        };
        self.current_time = time_without_delay.max(0.0);

        if self.state == PlayState::Finished && self.hold_time.is_none() {
            self.current_time = self.total_duration;
        }

        let mut elapsed = self.current_time;
        let mut use_mirrored = false;

        if self.repeat > 0 {
            let progress = self.current_time.min(self.total_duration) / self.resolved_duration;
            let mut iteration = progress.floor();
            let mut iteration_progress = progress % 1.0;

            if iteration_progress == 0.0 && progress >= 1.0 {
                iteration_progress = 1.0;
            }
            if iteration_progress == 1.0 {
                iteration -= 1.0;
            }
            iteration = iteration.min(self.repeat_count + 1.0);

            if iteration % 2.0 == 1.0 {
                match self.repeat_type {
                    RepeatType::Reverse => {
                        iteration_progress = 1.0 - iteration_progress;
                        if self.repeat_delay > 0.0 {
                            iteration_progress -= self.repeat_delay / self.resolved_duration;
                        }
                    }
                    RepeatType::Mirror => use_mirrored = self.mirrored.is_some(),
                    RepeatType::Loop => {}
                }
            }

            elapsed = iteration_progress.clamp(0.0, 1.0) * self.resolved_duration;
        }

        let (mut value, mut done) = if in_delay {
            (self.keyframes.first().cloned().unwrap_or_default(), false)
        } else {
            let generator = match (&mut self.mirrored, use_mirrored) {
                (Some(mirrored), true) => mirrored,
                _ => &mut self.generator,
            };
            let state = generator.next(elapsed);
            (state.value, state.done)
        };

        if !in_delay {
            done = if self.speed >= 0.0 {
                self.current_time >= self.total_duration
            } else {
                self.current_time <= 0.0
            };
        }

        let finished = self.hold_time.is_none()
            && (self.state == PlayState::Finished || (self.state == PlayState::Running && done));

        if finished {
            if !self.is_inertia {
                if let Some(end) = self.final_value() {
                    value = end;
                }
            }
            self.teardown();
            self.state = PlayState::Finished;
        }

        TickOutput { value, done, finished }
    }

    /// Sample at playback time `t` without a clock
    pub fn sample(&mut self, t: f64) -> Value {
        self.start_time = Some(0.0);
        self.tick(t, true).value
    }

    /// Start or resume at clock time `now`.
    ///
    /// `default_start` is used when playback has never started.
    pub fn play(&mut self, now: f64, default_start: f64) {
        let was_finished = self.state == PlayState::Finished;

        if was_finished {
            self.start_time = Some(now);
        } else if let Some(hold) = self.hold_time {
            let scaled = if self.speed == 0.0 { hold } else { hold / self.speed };
            self.start_time = Some(now - scaled);
        } else if self.start_time.is_none() {
            self.start_time = Some(default_start);
        }

        if was_finished && self.speed < 0.0 {
            if let Some(start) = self.start_time.as_mut() {
                *start += self.calculated_duration;
            }
        }

        self.hold_time = None;
        self.state = PlayState::Running;
    }

    pub fn pause(&mut self, now: f64) {
        self.state = PlayState::Paused;
        self.update_time(now);
        self.hold_time = Some(self.current_time);
    }

    /// Jump to the end; the next tick finishes
    pub fn complete(&mut self, now: f64, default_start: f64) {
        if self.state != PlayState::Running {
            self.play(now, default_start);
        }
        self.state = PlayState::Finished;
        self.hold_time = None;
    }

    /// Current playback time in milliseconds
    pub fn time(&self) -> f64 {
        self.current_time
    }

    /// Seek to `t` milliseconds
    pub fn set_time(&mut self, t: f64, now: f64) {
        self.current_time = t;
        if self.start_time.is_none() || self.hold_time.is_some() || self.speed == 0.0 {
            self.hold_time = Some(t);
        } else {
            self.start_time = Some(now - t / self.speed);
        }
    }

    pub fn set_speed(&mut self, speed: f64, now: f64) {
        self.update_time(now);
        let changed = self.speed != speed;
        self.speed = speed;
        if changed {
            self.set_time(self.current_time, now);
        }
    }

    /// Back to idle, forgetting start and hold times
    pub fn teardown(&mut self) {
        self.state = PlayState::Idle;
        self.start_time = None;
        self.hold_time = None;
    }
}
