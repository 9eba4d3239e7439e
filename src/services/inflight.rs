//! Single in-flight call tracking
//!
//! A slot owns at most one spawned network call. Starting a new call aborts
//! the previous one, and a generation counter makes sure a late result from
//! a superseded call is discarded instead of applied.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::task::{AbortHandle, JoinHandle};

use crate::error::{Error, Result};

#[derive(Debug)]
struct Active<K> {
    generation: u64,
    key: K,
    abort: AbortHandle,
}

#[derive(Debug)]
struct SlotState<K> {
    next_generation: u64,
    active: Option<Active<K>>,
}

/// Holds the single in-flight call of a service, keyed by `K`
#[derive(Debug)]
pub(crate) struct InFlightSlot<K> {
    state: Mutex<SlotState<K>>,
}

impl<K> Default for InFlightSlot<K> {
    fn default() -> Self {
        Self {
            state: Mutex::new(SlotState {
                next_generation: 0,
                active: None,
            }),
        }
    }
}

impl<K: PartialEq> InFlightSlot<K> {
    fn lock(&self) -> MutexGuard<'_, SlotState<K>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a call for `key` is currently in flight
    pub(crate) fn is_active_for(&self, key: &K) -> bool {
        self.lock().active.as_ref().is_some_and(|a| &a.key == key)
    }

    /// Whether any call is in flight
    pub(crate) fn is_busy(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Abort the in-flight call, if any. Its caller receives [`Error::Cancelled`].
    pub(crate) fn cancel(&self) {
        if let Some(active) = self.lock().active.take() {
            active.abort.abort();
        }
    }

    /// Spawn `call` as the current call, aborting whatever was in flight.
    pub(crate) fn replace<T, F>(&self, key: K, call: F) -> Pending<'_, K, T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let mut state = self.lock();
        Self::spawn_locked(self, &mut state, key, call)
    }

    /// Like [`replace`](Self::replace), but reject with [`Error::DuplicateRequest`]
    /// when a call for the same key is already in flight.
    pub(crate) fn start_unique<T, F>(&self, key: K, call: F) -> Result<Pending<'_, K, T>>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let mut state = self.lock();
        if state.active.as_ref().is_some_and(|a| a.key == key) {
            return Err(Error::DuplicateRequest);
        }
        Ok(Self::spawn_locked(self, &mut state, key, call))
    }

    fn spawn_locked<'a, T, F>(
        slot: &'a Self,
        state: &mut SlotState<K>,
        key: K,
        call: F,
    ) -> Pending<'a, K, T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(previous) = state.active.take() {
            tracing::debug!(generation = previous.generation, "Cancelling superseded call");
            previous.abort.abort();
        }

        let generation = state.next_generation;
        state.next_generation += 1;

        let handle = tokio::spawn(call);
        state.active = Some(Active {
            generation,
            key,
            abort: handle.abort_handle(),
        });

        Pending {
            slot,
            generation,
            handle: Some(handle),
        }
    }

    fn release(&self, generation: u64) {
        let mut state = self.lock();
        if state.active.as_ref().is_some_and(|a| a.generation == generation) {
            state.active = None;
        }
    }
}

/// A spawned call registered in an [`InFlightSlot`].
///
/// Dropping it without awaiting [`finish`](Self::finish) frees the slot.
#[derive(Debug)]
pub(crate) struct Pending<'a, K: PartialEq, T> {
    slot: &'a InFlightSlot<K>,
    generation: u64,
    handle: Option<JoinHandle<Result<T>>>,
}

impl<K: PartialEq, T> Pending<'_, K, T> {
    /// Wait for the call and, if it is still the current one, pass its
    /// successful value to `commit` while the slot is locked.
    ///
    /// A superseded call always resolves to [`Error::Cancelled`], whatever the
    /// network said, and `commit` is not run for it.
    pub(crate) async fn finish<R>(mut self, commit: impl FnOnce(T) -> Result<R>) -> Result<R> {
        let Some(handle) = self.handle.take() else {
            return Err(Error::Cancelled);
        };

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => return Err(Error::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        };

        let mut state = self.slot.lock();
        let current = state
            .active
            .as_ref()
            .is_some_and(|a| a.generation == self.generation);
        if !current {
            tracing::debug!(generation = self.generation, "Discarding late result");
            return Err(Error::Cancelled);
        }

        let result = outcome.and_then(commit);
        state.active = None;
        result
    }
}

impl<K: PartialEq, T> Drop for Pending<'_, K, T> {
    fn drop(&mut self) {
        self.slot.release(self.generation);
    }
}
