//! Single-fire, replay-safe completion signal.
//!
//! A [`CompletionHandle`] is resolved at most once with either a success payload or a
//! failure cause. Observers registered before resolution are notified when it happens;
//! observers registered afterwards are invoked immediately with the stored result, so
//! no outcome is ever missed. Further attempts to resolve the handle are ignored and
//! logged once.
//!
//! The same type backs both per-write tokens returned by a
//! [`Channel`](crate::connection::Channel) and the per-exchange response status.

use std::fmt;
use std::future::Future;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;
use tracing::warn;

type Observer<T, E> = Box<dyn FnOnce(Result<T, E>) + Send>;

enum State<T, E> {
    Pending(Vec<Observer<T, E>>),
    Done(Result<T, E>),
}

struct Inner<T, E> {
    state: State<T, E>,
    duplicate_logged: bool,
}

pub struct CompletionHandle<T, E> {
    inner: Arc<Mutex<Inner<T, E>>>,
}

impl<T, E> CompletionHandle<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Inner { state: State::Pending(Vec::new()), duplicate_logged: false })) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T, E>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves the handle. Returns false if it had already been resolved.
    pub fn complete(&self, result: Result<T, E>) -> bool {
        let observers = {
            let mut inner = self.lock();
            match mem::replace(&mut inner.state, State::Done(result.clone())) {
                State::Pending(observers) => observers,
                done @ State::Done(_) => {
                    inner.state = done;
                    if !inner.duplicate_logged {
                        inner.duplicate_logged = true;
                        warn!(success = result.is_ok(), "completion handle already fired, ignore duplicate result");
                    }
                    return false;
                }
            }
        };

        // observers run outside the lock so they may register further observers
        for observer in observers {
            observer(result.clone());
        }
        true
    }

    #[inline]
    pub fn succeed(&self, value: T) -> bool {
        self.complete(Ok(value))
    }

    #[inline]
    pub fn fail(&self, cause: E) -> bool {
        self.complete(Err(cause))
    }

    /// Registers an observer, invoking it right away if the handle is already resolved.
    pub fn on_complete<F>(&self, observer: F)
    where
        F: FnOnce(Result<T, E>) + Send + 'static,
    {
        let mut inner = self.lock();
        match &mut inner.state {
            State::Pending(observers) => observers.push(Box::new(observer)),
            State::Done(result) => {
                let result = result.clone();
                drop(inner);
                observer(result);
            }
        }
    }

    /// Returns the stored result, if any.
    pub fn result(&self) -> Option<Result<T, E>> {
        match &self.lock().state {
            State::Pending(_) => None,
            State::Done(result) => Some(result.clone()),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.lock().state, State::Done(_))
    }

    /// Waits for the result.
    ///
    /// Resolves to `None` when every handle is dropped without the result ever being set.
    pub fn wait(&self) -> impl Future<Output = Option<Result<T, E>>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.on_complete(move |result| {
            // the waiter may have been dropped
            let _ = tx.send(result);
        });
        async move { rx.await.ok() }
    }
}

impl<T, E> Default for CompletionHandle<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Clone for CompletionHandle<T, E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T, E> fmt::Debug for CompletionHandle<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let state = match &inner.state {
            State::Pending(observers) => format!("Pending({} observers)", observers.len()),
            State::Done(Ok(_)) => "Succeeded".to_string(),
            State::Done(Err(_)) => "Failed".to_string(),
        };
        f.debug_struct("CompletionHandle").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Handle = CompletionHandle<u32, String>;

    #[test]
    fn fires_exactly_once() {
        let handle = Handle::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        handle.on_complete(move |result| {
            assert_eq!(result, Err("boom".to_string()));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(handle.fail("boom".to_string()));
        assert!(!handle.succeed(7));
        assert!(!handle.fail("again".to_string()));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.result(), Some(Err("boom".to_string())));
    }

    #[test]
    fn late_observer_gets_replayed_result() {
        let handle = Handle::new();
        handle.succeed(42);

        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        handle.on_complete(move |result| *slot.lock().unwrap() = Some(result));

        assert_eq!(*seen.lock().unwrap(), Some(Ok(42)));
    }

    #[test]
    fn clones_share_the_result() {
        let handle = Handle::new();
        let other = handle.clone();
        assert!(!other.is_done());

        handle.succeed(1);
        assert!(other.is_done());
        assert!(!other.succeed(2));
        assert_eq!(other.result(), Some(Ok(1)));
    }

    #[test]
    fn observer_may_register_another_observer() {
        let handle = Handle::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let inner_handle = handle.clone();
        let counter = Arc::clone(&calls);
        handle.on_complete(move |_| {
            let counter = Arc::clone(&counter);
            inner_handle.on_complete(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        });

        handle.succeed(3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wait_resolves_after_completion() {
        let handle = Handle::new();
        let waiting = handle.wait();

        let completer = handle.clone();
        tokio::spawn(async move {
            completer.succeed(9);
        });

        assert_eq!(waiting.await, Some(Ok(9)));
        assert_eq!(handle.wait().now_or_never(), Some(Some(Ok(9))));
    }

    #[tokio::test]
    async fn wait_on_abandoned_handle_resolves_to_none() {
        let waiting = {
            let handle = Handle::new();
            handle.wait()
        };
        assert_eq!(waiting.await, None);
    }
}
