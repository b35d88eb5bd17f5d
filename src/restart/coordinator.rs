//! Restart coordinator
//!
//! The coordinator owns the restart state machine
//! `Idle -> Draining -> Waiting -> Rebinding -> Idle`.
//!
//! - Connection handlers call `request()`; only the call that finds the
//!   machine `Idle` starts a restart, every other call is a no-op.
//! - The listener supervisor waits for `Draining`, then walks the remaining
//!   phases with `transition()` as it drains, waits and rebinds.
//! - There is no cancel: once `Draining` is entered the cycle always runs.
//!
//! State lives in a `tokio::sync::watch` channel so the check-and-set in
//! `request()` is atomic and observers can await phase changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::utils::{GatewayError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RestartPhase {
    Idle,
    Draining,
    Waiting,
    Rebinding,
}

impl RestartPhase {
    /// The only phase this one may move to.
    pub fn next(self) -> RestartPhase {
        match self {
            RestartPhase::Idle => RestartPhase::Draining,
            RestartPhase::Draining => RestartPhase::Waiting,
            RestartPhase::Waiting => RestartPhase::Rebinding,
            RestartPhase::Rebinding => RestartPhase::Idle,
        }
    }

    pub fn in_progress(self) -> bool {
        self != RestartPhase::Idle
    }
}

#[derive(Debug)]
struct Inner {
    phase: watch::Sender<RestartPhase>,
    completed: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct RestartCoordinator {
    inner: Arc<Inner>,
}

impl Default for RestartCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl RestartCoordinator {
    pub fn new() -> Self {
        let (phase, _) = watch::channel(RestartPhase::Idle);
        Self {
            inner: Arc::new(Inner {
                phase,
                completed: AtomicU64::new(0),
            }),
        }
    }

    pub fn phase(&self) -> RestartPhase {
        *self.inner.phase.borrow()
    }

    /// Starts a restart if none is running. Returns whether this call did.
    pub fn request(&self) -> bool {
        self.inner.phase.send_if_modified(|phase| {
            if *phase == RestartPhase::Idle {
                *phase = RestartPhase::Draining;
                true
            } else {
                false
            }
        })
    }

    /// Moves `from -> to`. Fails unless the machine is currently in `from`
    /// and `to` is the successor of `from`.
    pub fn transition(&self, from: RestartPhase, to: RestartPhase) -> Result<()> {
        let mut current = from;
        let completed = &self.inner.completed;

        let moved = self.inner.phase.send_if_modified(|phase| {
            current = *phase;
            if *phase != from || from.next() != to {
                return false;
            }
            *phase = to;
            if to == RestartPhase::Idle {
                completed.fetch_add(1, Ordering::SeqCst);
            }
            true
        });

        if moved {
            Ok(())
        } else {
            Err(GatewayError::InvalidTransition { from, to, current })
        }
    }

    /// Number of restarts that went all the way back to `Idle`.
    pub fn completed_restarts(&self) -> u64 {
        self.inner.completed.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> watch::Receiver<RestartPhase> {
        self.inner.phase.subscribe()
    }
}
