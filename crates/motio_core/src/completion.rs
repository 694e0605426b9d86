//! Single-resolution completion signal for animations
//!
//! A [`Completion`] settles exactly once, either `Finished` or `Cancelled`.
//! It can be observed with callbacks or awaited as a future; since the engine
//! is frame-driven the future resolves during a scheduler tick, so blocking
//! on it only makes sense once the animation is known to be done.

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

/// How an animation ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationOutcome {
    /// Ran to its natural end (or was completed early)
    Finished,
    /// Cancelled or stopped before finishing
    Cancelled,
}

type Listener = Box<dyn FnOnce(AnimationOutcome)>;

#[derive(Default)]
struct CompletionState {
    outcome: Option<AnimationOutcome>,
    listeners: Vec<Listener>,
    wakers: Vec<Waker>,
}

/// Shared completion signal. Clones observe the same resolution.
#[derive(Clone, Default)]
pub struct Completion {
    state: Rc<RefCell<CompletionState>>,
}

impl Completion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settle with `outcome`. Returns `false` if already settled.
    pub fn resolve(&self, outcome: AnimationOutcome) -> bool {
        let (listeners, wakers) = {
            let mut state = self.state.borrow_mut();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome);
            (
                std::mem::take(&mut state.listeners),
                std::mem::take(&mut state.wakers),
            )
        };

        for listener in listeners {
            listener(outcome);
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }

    pub fn outcome(&self) -> Option<AnimationOutcome> {
        self.state.borrow().outcome
    }

    pub fn is_settled(&self) -> bool {
        self.outcome().is_some()
    }

    /// Run `listener` once settled (immediately if already settled)
    pub fn on_settled<F: FnOnce(AnimationOutcome) + 'static>(&self, listener: F) {
        let settled = self.state.borrow().outcome;
        match settled {
            Some(outcome) => listener(outcome),
            None => self.state.borrow_mut().listeners.push(Box::new(listener)),
        }
    }

    /// A future resolving to the outcome
    pub fn wait(&self) -> CompletionFuture {
        CompletionFuture {
            completion: self.clone(),
        }
    }

    pub fn ptr_eq(&self, other: &Completion) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("outcome", &self.outcome())
            .finish()
    }
}

/// Future returned by [`Completion::wait`]
pub struct CompletionFuture {
    completion: Completion,
}

impl Future for CompletionFuture {
    type Output = AnimationOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.completion.state.borrow_mut();
        match state.outcome {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                state.wakers.push(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}
