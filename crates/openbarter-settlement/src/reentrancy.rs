//! Reentrancy latch held for the duration of every settlement entry point.
//!
//! A nested entry from the thread already inside the engine (for example a
//! native-payment hook calling back in) fails with
//! [`OpenbarterError::NoReentrantCalls`]. Calls from other threads wait
//! their turn, so independent calls still run one at a time.

use std::{
    sync::{Mutex, MutexGuard},
    thread::{self, ThreadId},
};

use openbarter_types::{OpenbarterError, Result};
use tracing::warn;

#[derive(Debug, Default)]
pub struct ReentrancyLatch {
    holder: Mutex<Option<ThreadId>>,
    turn: Mutex<()>,
}

impl ReentrancyLatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the current thread is inside an entry point.
    pub fn is_entered(&self) -> Result<bool> {
        Ok(*self.holder.lock().map_err(|_| poisoned())? == Some(thread::current().id()))
    }

    /// Acquire the latch. Released when the guard drops.
    pub fn enter(&self) -> Result<LatchGuard<'_>> {
        if self.is_entered()? {
            warn!("Rejected reentrant call");
            return Err(OpenbarterError::NoReentrantCalls);
        }
        let turn = self.turn.lock().map_err(|_| poisoned())?;
        *self.holder.lock().map_err(|_| poisoned())? = Some(thread::current().id());
        Ok(LatchGuard {
            latch: self,
            _turn: turn,
        })
    }
}

fn poisoned() -> OpenbarterError {
    OpenbarterError::Internal("reentrancy latch poisoned".into())
}

/// Holds the latch; the holder is cleared before the turn is released.
#[derive(Debug)]
pub struct LatchGuard<'a> {
    latch: &'a ReentrancyLatch,
    _turn: MutexGuard<'a, ()>,
}

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut holder) = self.latch.holder.lock() {
            *holder = None;
        }
    }
}
