//! Single-assignment futures and promises.
//!
//! A [`Promise`] is the write side: it is completed at most once, from any thread.
//! A [`Future`] is the read side: it can be cloned freely, awaited, and observed with
//! callbacks. Every observer receives the result exactly once, whether it was
//! registered before or after completion.
//!
//! # Examples
//!
//! ```
//! use hyperspace::future::Promise;
//! use std::sync::mpsc;
//!
//! let promise = Promise::<u32, String>::new();
//! let future = promise.future();
//!
//! let (tx, rx) = mpsc::channel();
//! future.on_complete(move |result| tx.send(result.clone()).unwrap());
//!
//! std::thread::spawn(move || {
//!     promise.complete(Ok(7));
//! });
//!
//! assert_eq!(rx.recv().unwrap(), Ok(7));
//! ```

use std::fmt;
use std::future::Future as StdFuture;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll, Waker};

type Observer<T, E> = Box<dyn FnOnce(&Result<T, E>) + Send>;

struct Shared<T, E> {
    state: Mutex<State<T, E>>,
}

struct State<T, E> {
    result: Option<Arc<Result<T, E>>>,
    observers: Vec<Observer<T, E>>,
    wakers: Vec<Waker>,
}

impl<T, E> Shared<T, E> {
    fn lock(&self) -> MutexGuard<'_, State<T, E>> {
        // Observers never run under the lock, so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The write side of a single-assignment result.
///
/// Completing a promise a second time is ignored and logged; observers never fire
/// twice. Dropping a promise without completing it leaves its futures pending.
pub struct Promise<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Promise<T, E> {
    /// Creates a new, uncompleted promise.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    result: None,
                    observers: Vec::new(),
                    wakers: Vec::new(),
                }),
            }),
        }
    }

    /// Returns a future that resolves when this promise is completed.
    pub fn future(&self) -> Future<T, E> {
        Future {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Completes the promise with `result`.
    ///
    /// Returns `true` if this call completed the promise and `false` if it had
    /// already been completed, in which case `result` is discarded.
    pub fn complete(&self, result: Result<T, E>) -> bool {
        let mut state = self.shared.lock();
        if state.result.is_some() {
            drop(state);
            tracing::warn!("Promise already completed; ignoring repeated completion");
            return false;
        }

        let result = Arc::new(result);
        state.result = Some(Arc::clone(&result));
        let observers = mem::take(&mut state.observers);
        let wakers = mem::take(&mut state.wakers);
        drop(state);

        for waker in wakers {
            waker.wake();
        }
        for observer in observers {
            observer(&result);
        }
        true
    }

    /// Completes the promise with a success value.
    pub fn success(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    /// Completes the promise with a failure.
    pub fn failure(&self, error: E) -> bool {
        self.complete(Err(error))
    }

    /// Returns `true` if the promise has been completed.
    pub fn is_completed(&self) -> bool {
        self.shared.lock().result.is_some()
    }
}

impl<T, E> Default for Promise<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("completed", &self.is_completed())
            .finish()
    }
}

/// The read side of a single-assignment result.
///
/// Await it to get a clone of the result, or register callbacks with
/// [`on_complete`](Future::on_complete). Clones share the same result.
pub struct Future<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Future<T, E> {
    /// Returns `true` if the result is available.
    pub fn is_completed(&self) -> bool {
        self.shared.lock().result.is_some()
    }

    /// Registers an observer for the result.
    ///
    /// If the future is already resolved the observer runs immediately on the
    /// calling thread; otherwise it runs on the thread that completes the promise.
    pub fn on_complete<F>(&self, observer: F)
    where
        F: FnOnce(&Result<T, E>) + Send + 'static,
    {
        let mut state = self.shared.lock();
        match &state.result {
            Some(result) => {
                let result = Arc::clone(result);
                drop(state);
                observer(&result);
            }
            None => state.observers.push(Box::new(observer)),
        }
    }

    /// Registers an observer that only runs on success.
    pub fn on_success<F>(&self, observer: F)
    where
        F: FnOnce(&T) + Send + 'static,
    {
        self.on_complete(move |result| {
            if let Ok(value) = result {
                observer(value);
            }
        });
    }

    /// Registers an observer that only runs on failure.
    pub fn on_failure<F>(&self, observer: F)
    where
        F: FnOnce(&E) + Send + 'static,
    {
        self.on_complete(move |result| {
            if let Err(error) = result {
                observer(error);
            }
        });
    }
}

impl<T: Clone, E: Clone> Future<T, E> {
    /// Returns a clone of the result if it is available.
    pub fn result(&self) -> Option<Result<T, E>> {
        self.shared.lock().result.as_deref().cloned()
    }
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> fmt::Debug for Future<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl<T: Clone, E: Clone> StdFuture for Future<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.lock();
        if let Some(result) = &state.result {
            return Poll::Ready(Result::clone(result));
        }

        if !state.wakers.iter().any(|w| w.will_wake(cx.waker())) {
            state.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
