//! Abort/Cancel Core (`spec.md` §2, §5 "Cancellation").
//!
//! A single externally-controlled token whose firing cancels every in-flight
//! future and async-iterator `next()` registered against an operation, with
//! one reason value shared across all of them. Cancellation is idempotent:
//! firing an already-fired signal is a no-op.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use std::sync::Mutex;

use futures::future::{self, Either};

/// The reason an operation was aborted.
#[derive(Debug, Clone)]
pub struct AbortReason(pub Arc<str>);

impl AbortReason {
    pub fn new(reason: impl Into<Arc<str>>) -> Self {
        Self(reason.into())
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A shared, cloneable abort signal.
///
/// Internally backed by a one-shot `futures::channel::oneshot` receiver
/// wrapped so it can be polled repeatedly and cloned freely (a oneshot
/// receiver is neither `Clone` nor safely pollable after completion on its
/// own), matching how the teacher threads a single `&'a CtxT` through the
/// whole `Executor` tree without re-plumbing ownership at every recursive
/// call.
#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    reason: Option<AbortReason>,
    wakers: Vec<std::task::Waker>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner { reason: None, wakers: Vec::new() })),
        }
    }

    /// Fires the signal. Idempotent: a second call with a different reason
    /// does not overwrite the first (`spec.md` §8 "Cancellation
    /// idempotence").
    pub fn abort(&self, reason: AbortReason) {
        let mut guard = self.inner.lock().expect("abort signal mutex poisoned");
        if guard.reason.is_none() {
            crate::__exec_trace_debug!("abort signal firing", reason = %reason);
            guard.reason = Some(reason);
            for waker in guard.wakers.drain(..) {
                waker.wake();
            }
        }
    }

    pub fn reason(&self) -> Option<AbortReason> {
        self.inner.lock().expect("abort signal mutex poisoned").reason.clone()
    }

    pub fn is_aborted(&self) -> bool {
        self.reason().is_some()
    }

    /// Races `fut` against this signal firing. If the signal fires first,
    /// returns `Err(reason)`; the loser is dropped, which is how async
    /// resources observe cancellation in this model (`spec.md` §9 "Async
    /// iterable as a first-class resource": implementors must ensure
    /// `return` runs on early drop).
    pub async fn race<F, T>(&self, fut: F) -> Result<T, AbortReason>
    where
        F: Future<Output = T>,
    {
        if let Some(r) = self.reason() {
            return Err(r);
        }
        match future::select(Box::pin(fut), WaitForAbort { signal: self.clone() }).await {
            Either::Left((value, _)) => Ok(value),
            Either::Right((reason, _)) => Err(reason),
        }
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

struct WaitForAbort {
    signal: AbortSignal,
}

impl Future for WaitForAbort {
    type Output = AbortReason;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
        let mut guard = self.signal.inner.lock().expect("abort signal mutex poisoned");
        if let Some(reason) = guard.reason.clone() {
            return Poll::Ready(reason);
        }
        guard.wakers.push(cx.waker().clone());
        Poll::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abort_is_idempotent() {
        let signal = AbortSignal::new();
        signal.abort(AbortReason::new("first"));
        signal.abort(AbortReason::new("second"));
        assert_eq!(signal.reason().unwrap().0.as_ref(), "first");
    }

    #[test]
    fn race_returns_reason_when_already_aborted() {
        let signal = AbortSignal::new();
        signal.abort(AbortReason::new("stop"));
        let result = futures::executor::block_on(signal.race(future::ready(1)));
        assert!(result.is_err());
    }
}
