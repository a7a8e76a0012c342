//! Deferred: a future whose completion is decided by someone else.
//!
//! A [`Deferred`] separates *who observes completion* from *who decides it*.
//! The reader holds the `Deferred` (awaiting it or registering
//! continuations); any number of [`Settler`] handles may race to resolve or
//! reject it. The first settlement wins, later ones are ignored and
//! reported back as `false`.
//!
//! Continuations run synchronously on the thread that settles the deferred,
//! in registration order, whether or not anybody ever polls the future. The
//! engine relies on that to announce terminal states without owning an
//! executor.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use parking_lot::Mutex;

type Continuation<T, E> = Box<dyn FnOnce(&Result<T, E>) + Send>;

/// Observable state of a [`Deferred`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredState {
    /// Not settled yet.
    Pending,
    /// Settled successfully.
    Resolved,
    /// Settled with a failure.
    Rejected,
}

struct Shared<T, E> {
    outcome: Option<Result<T, E>>,
    continuations: Vec<Continuation<T, E>>,
    wakers: Vec<Waker>,
}

impl<T, E> Shared<T, E> {
    fn state(&self) -> DeferredState {
        match &self.outcome {
            None => DeferredState::Pending,
            Some(Ok(_)) => DeferredState::Resolved,
            Some(Err(_)) => DeferredState::Rejected,
        }
    }
}

/// Reading side: a future plus continuation registration.
///
/// Clones observe the same settlement.
///
/// # Examples
///
/// ```
/// use formguard_validator::deferred::{Deferred, DeferredState};
///
/// let deferred: Deferred<u32, String> = Deferred::new();
/// let settler = deferred.settler();
///
/// assert!(settler.resolve(7));
/// assert!(!settler.reject("too late".into()));
/// assert_eq!(deferred.state(), DeferredState::Resolved);
/// ```
pub struct Deferred<T, E> {
    shared: Arc<Mutex<Shared<T, E>>>,
}

/// Writing side: resolve / reject capability for a [`Deferred`].
pub struct Settler<T, E> {
    shared: Arc<Mutex<Shared<T, E>>>,
}

impl<T, E> Deferred<T, E> {
    /// Creates a pending deferred.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                outcome: None,
                continuations: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// Returns a handle that can settle this deferred.
    #[must_use]
    pub fn settler(&self) -> Settler<T, E> {
        Settler {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> DeferredState {
        self.shared.lock().state()
    }

    /// Returns true until the deferred is settled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.state() == DeferredState::Pending
    }
}

impl<T: Clone, E: Clone> Deferred<T, E> {
    /// Creates a deferred that is already rejected.
    #[must_use]
    pub fn rejected(error: E) -> Self {
        let deferred = Self::new();
        deferred.settler().reject(error);
        deferred
    }

    /// Registers a continuation to run once the deferred settles.
    ///
    /// Runs immediately, on the calling thread, if it already has.
    pub fn on_settle<F>(&self, continuation: F)
    where
        F: FnOnce(&Result<T, E>) + Send + 'static,
    {
        let settled = {
            let mut shared = self.shared.lock();
            match &shared.outcome {
                Some(outcome) => outcome.clone(),
                None => {
                    shared.continuations.push(Box::new(continuation));
                    return;
                }
            }
        };
        continuation(&settled);
    }

    /// Returns the outcome if settled.
    #[must_use]
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.shared.lock().outcome.clone()
    }
}

impl<T, E> Clone for Deferred<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, E: Clone> Future for Deferred<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut shared = self.shared.lock();
        if let Some(outcome) = &shared.outcome {
            return Poll::Ready(outcome.clone());
        }
        if !shared.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            shared.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<T: Clone, E: Clone> Settler<T, E> {
    /// Resolves the deferred. Returns `false` if it was already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects the deferred. Returns `false` if it was already settled.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    /// Returns true once the deferred has been settled by any handle.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.shared.lock().outcome.is_some()
    }

    fn settle(&self, outcome: Result<T, E>) -> bool {
        let (continuations, wakers) = {
            let mut shared = self.shared.lock();
            if shared.outcome.is_some() {
                return false;
            }
            shared.outcome = Some(outcome.clone());
            (
                std::mem::take(&mut shared.continuations),
                std::mem::take(&mut shared.wakers),
            )
        };
        for continuation in continuations {
            continuation(&outcome);
        }
        for waker in wakers {
            waker.wake();
        }
        true
    }
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Settler<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settler")
            .field("state", &self.shared.lock().state())
            .finish()
    }
}
