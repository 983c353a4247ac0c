//! Lazily established per-driver resource (mount point, remote session).
//!
//! Establishment is single-flight: only one attempt runs at a time, and
//! callers that queued behind a failed attempt receive that attempt's error
//! instead of immediately starting another one. The handle never assumes
//! permanence; `invalidate` returns it to `Unestablished`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use crate::error::StorageError;

/// Observable lifecycle of a [`ResourceHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleState {
    Unestablished,
    Establishing,
    Established,
    Failed(String),
}

struct Slot<T> {
    value: Option<T>,
    last_error: Option<StorageError>,
    /// Attempt number that produced `value` / `last_error`.
    attempt: u64,
}

pub struct ResourceHandle<T> {
    name: String,
    slot: Mutex<Slot<T>>,
    attempts: AtomicU64,
    state: watch::Sender<HandleState>,
}

impl<T: Clone + Send> ResourceHandle<T> {
    pub fn new(name: impl Into<String>) -> Self {
        let (state, _) = watch::channel(HandleState::Unestablished);
        Self {
            name: name.into(),
            slot: Mutex::new(Slot {
                value: None,
                last_error: None,
                attempt: 0,
            }),
            attempts: AtomicU64::new(0),
            state,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> HandleState {
        self.state.borrow().clone()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<HandleState> {
        self.state.subscribe()
    }

    /// Return the established resource, establishing it first if needed.
    pub async fn get_or_establish<F, Fut>(&self, establish: F) -> Result<T, StorageError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, StorageError>>,
    {
        let seen = self.attempts.load(Ordering::Acquire);
        let mut slot = self.slot.lock().await;

        if let Some(value) = slot.value.as_ref() {
            return Ok(value.clone());
        }

        // Someone else's attempt finished while we were queued on the lock.
        if slot.attempt > seen {
            if let Some(err) = slot.last_error.clone() {
                debug!("{}: sharing result of in-flight attempt {}", self.name, slot.attempt);
                return Err(err);
            }
        }

        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.send_replace(HandleState::Establishing);
        debug!("{}: establishing (attempt {})", self.name, attempt);

        let outcome = establish().await;
        slot.attempt = attempt;
        match outcome {
            Ok(value) => {
                slot.value = Some(value.clone());
                slot.last_error = None;
                self.state.send_replace(HandleState::Established);
                debug!("{}: established", self.name);
                Ok(value)
            }
            Err(err) => {
                warn!("{}: establishment failed: {}", self.name, err);
                slot.last_error = Some(err.clone());
                self.state.send_replace(HandleState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Forget the established resource so the next call re-establishes it.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        slot.value = None;
        slot.last_error = None;
        self.state.send_replace(HandleState::Unestablished);
        debug!("{}: invalidated", self.name);
    }
}
