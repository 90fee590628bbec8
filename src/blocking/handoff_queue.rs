// Unbounded FIFO blocking queue with direct producer -> waiter hand-off.
//
// One lock guards the item buffer and the waiter list. The two are never both
// non-empty: a producer that finds a parked consumer writes straight into that
// consumer's slot, and a consumer that finds buffered items never parks. Each
// parked consumer owns its own condvar, so a hand-off wakes exactly one thread.
use std::collections::VecDeque;
use std::fmt;
use std::pin::{pin, Pin};

use crossbeam_utils::CachePadded;
use tracing::{debug, trace, warn};

use super::waiter::{Delivery, Waiter, WaiterPtr};
use crate::error::{DequeueError, EnqueueError};
use crate::sync::{AtomicUsize, Mutex, MutexGuard, Ordering};
use crate::BlockingQueue;

struct State<T> {
    items: VecDeque<T>,
    waiters: VecDeque<WaiterPtr<T>>,
    closed: bool,
}

pub struct HandoffQueue<T> {
    state: Mutex<State<T>>,
    // Written under the lock, read without it.
    pending: CachePadded<AtomicUsize>,
    blocked: CachePadded<AtomicUsize>,
    visited: CachePadded<AtomicUsize>,
}

/// Counter snapshot. Fields are read independently, not as one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueStats {
    pub pending: usize,
    pub blocked: usize,
    pub visited: usize,
}

impl<T> HandoffQueue<T> {
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Creates a queue with room for `items` buffered items and `waiters`
    /// parked consumers before either list has to grow.
    pub fn with_capacity(items: usize, waiters: usize) -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(items),
                waiters: VecDeque::with_capacity(waiters),
                closed: false,
            }),
            pending: CachePadded::new(AtomicUsize::new(0)),
            blocked: CachePadded::new(AtomicUsize::new(0)),
            visited: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Hands `item` to the longest-parked consumer, or buffers it.
    pub fn enqueue(&self, item: T) -> Result<(), EnqueueError<T>> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(EnqueueError::Closed(item));
        }

        if let Some(waiter) = state.waiters.pop_front() {
            trace!(remaining_waiters = state.waiters.len(), "handing item to parked consumer");
            // SAFETY: lock held, pointer unlinked just above.
            unsafe { waiter.deliver(item) };
        } else {
            if let Err(err) = state.items.try_reserve(1) {
                warn!(%err, buffered = state.items.len(), "could not grow item buffer");
                return Err(EnqueueError::Alloc(item));
            }
            state.items.push_back(item);
        }

        self.pending.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Removes the oldest item, parking until one is produced.
    pub fn dequeue(&self) -> Result<T, DequeueError> {
        let mut state = self.state.lock();
        if let Some(item) = state.items.pop_front() {
            self.record_retrieval();
            return Ok(item);
        }
        if state.closed {
            return Err(DequeueError::Closed);
        }

        if let Err(err) = state.waiters.try_reserve(1) {
            warn!(%err, waiters = state.waiters.len(), "could not grow waiter list");
            return Err(DequeueError::Alloc);
        }
        let waiter = pin!(Waiter::new());
        let parked = Parked::link(&mut state, waiter.as_ref(), &self.blocked);
        trace!(position = parked.state.waiters.len(), "parking consumer");

        match parked.wait() {
            Delivery::Item(item) => {
                self.record_retrieval();
                trace!("parked consumer received item");
                Ok(item)
            }
            Delivery::Closed => Err(DequeueError::Closed),
        }
    }

    pub fn try_dequeue(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.items.pop_front()?;
        self.record_retrieval();
        Some(item)
    }

    /// Wakes every parked consumer with [`DequeueError::Closed`] and rejects
    /// further enqueues. Returns how many consumers were woken.
    pub fn close(&self) -> usize {
        let mut state = self.state.lock();
        state.closed = true;

        let mut cancelled = 0;
        while let Some(waiter) = state.waiters.pop_front() {
            // SAFETY: lock held, pointer unlinked just above.
            unsafe { waiter.cancel() };
            cancelled += 1;
        }
        debug!(cancelled, buffered = state.items.len(), "queue closed");
        cancelled
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Includes items handed to a consumer that has not resumed yet.
    #[inline]
    pub fn size(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn waiting(&self) -> usize {
        self.blocked.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.size(),
            blocked: self.waiting(),
            visited: self.visited(),
        }
    }

    // Caller holds the lock.
    fn record_retrieval(&self) {
        self.pending.fetch_sub(1, Ordering::Relaxed);
        self.visited.fetch_add(1, Ordering::Relaxed);
    }
}

// A waiter linked into the queue. Dropping it before the waiter was served
// (an unwind between linking and wake-up) unlinks the waiter again, so the
// list never points at a dead stack frame.
struct Parked<'a, 'g, T> {
    state: &'a mut MutexGuard<'g, State<T>>,
    waiter: Pin<&'a Waiter<T>>,
    blocked: &'a AtomicUsize,
    served: bool,
}

impl<'a, 'g, T> Parked<'a, 'g, T> {
    fn link(
        state: &'a mut MutexGuard<'g, State<T>>,
        waiter: Pin<&'a Waiter<T>>,
        blocked: &'a AtomicUsize,
    ) -> Self {
        blocked.fetch_add(1, Ordering::Relaxed);
        let mut parked = Self {
            state,
            waiter,
            blocked,
            served: false,
        };
        parked.state.waiters.push_back(WaiterPtr::new(waiter));
        parked
    }

    fn wait(mut self) -> Delivery<T> {
        let delivery = self.waiter.park(&mut *self.state);
        // `park` only returns once a producer or `close` unlinked us.
        self.served = true;
        delivery
    }
}

impl<T> Drop for Parked<'_, '_, T> {
    fn drop(&mut self) {
        self.blocked.fetch_sub(1, Ordering::Relaxed);
        if !self.served {
            let waiter = self.waiter;
            if let Some(pos) = self.state.waiters.iter().position(|w| w.points_to(waiter)) {
                self.state.waiters.remove(pos);
            }
        }
    }
}

impl<T> Default for HandoffQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandoffQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandoffQueue")
            .field("pending", &self.size())
            .field("blocked", &self.waiting())
            .field("visited", &self.visited())
            .finish()
    }
}

impl<T: Send + 'static> BlockingQueue<T> for HandoffQueue<T> {
    type PushError = EnqueueError<T>;
    type PopError = DequeueError;

    fn push(&self, item: T) -> Result<(), Self::PushError> {
        self.enqueue(item)
    }

    fn pop(&self) -> Result<T, Self::PopError> {
        self.dequeue()
    }

    fn try_pop(&self) -> Option<T> {
        self.try_dequeue()
    }

    fn len(&self) -> usize {
        self.size()
    }

    fn is_empty(&self) -> bool {
        HandoffQueue::is_empty(self)
    }

    fn waiting(&self) -> usize {
        HandoffQueue::waiting(self)
    }
}
