//! Lock-free FIFO pool of idle sessions.

use std::sync::Arc;

use crossbeam::queue::SegQueue;

/// Unbounded multi-producer/multi-consumer queue of idle sessions.
///
/// Callers take no locks. Sessions come back out in the order they went in,
/// so the longest-idle session is reused first.
pub struct SessionPool<S> {
    idle: SegQueue<Arc<S>>,
}

impl<S> SessionPool<S> {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self {
            idle: SegQueue::new(),
        }
    }

    /// Queue an idle session behind those already pooled.
    pub fn push(&self, session: Arc<S>) {
        self.idle.push(session);
    }

    /// Take the oldest idle session, if any. Never blocks.
    pub fn pop(&self) -> Option<Arc<S>> {
        self.idle.pop()
    }

    /// Instantaneous depth; may be stale by the time it is read.
    pub fn len(&self) -> usize {
        self.idle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idle.is_empty()
    }

    /// Pop everything currently queued.
    pub fn drain(&self) -> impl Iterator<Item = Arc<S>> + '_ {
        std::iter::from_fn(move || self.idle.pop())
    }
}

impl<S> Default for SessionPool<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for SessionPool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("idle", &self.idle.len())
            .finish()
    }
}
