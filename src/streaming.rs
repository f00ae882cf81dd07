//! Session-wide exclusivity of streaming result sets.
//!
//! While a streaming result set is open its rows are still on the wire, so the session
//! cannot read another result. The session owns a [`StreamingToken`]; a streaming
//! result set holds the [`StreamingGuard`] taken from it until it is drained or closed.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct StreamingToken {
    active: Arc<AtomicBool>,
}

impl StreamingToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a streaming result set currently holds the token
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Take the token, failing if another streaming result set holds it.
    pub fn acquire(&self) -> Result<StreamingGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_held| Error::StreamingResultSetActive)?;
        Ok(StreamingGuard {
            release: StreamingRelease {
                active: Arc::clone(&self.active),
                held: Arc::new(AtomicBool::new(true)),
            },
        })
    }
}

/// Releases the token on drop.
#[derive(Debug)]
pub struct StreamingGuard {
    release: StreamingRelease,
}

impl StreamingGuard {
    /// A handle that can give the token back from another thread
    pub fn release_handle(&self) -> StreamingRelease {
        self.release.clone()
    }

    pub fn release(&self) {
        self.release.release();
    }

    pub fn is_held(&self) -> bool {
        self.release.is_held()
    }
}

impl Drop for StreamingGuard {
    fn drop(&mut self) {
        self.release.release();
    }
}

/// Gives the token back at most once, however many copies call it.
#[derive(Debug, Clone)]
pub struct StreamingRelease {
    active: Arc<AtomicBool>,
    held: Arc<AtomicBool>,
}

impl StreamingRelease {
    pub fn release(&self) {
        if self.held.swap(false, Ordering::AcqRel) {
            self.active.store(false, Ordering::Release);
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}
