//! Process-wide hand-off queue of opaque handles, with an explicit
//! [`init`] / [`destroy`] lifecycle. Any call outside that window panics.
use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock};
use tracing::debug;

use crate::blocking::HandoffQueue;
use crate::error::{DequeueError, EnqueueError};

/// Pointer-sized opaque item.
pub type Handle = usize;

static QUEUE: RwLock<Option<Arc<HandoffQueue<Handle>>>> = const_rwlock(None);

const NOT_INITIALIZED: &str = "global handoff queue used before init() or after destroy()";

fn with_queue<R>(f: impl FnOnce(&HandoffQueue<Handle>) -> R) -> R {
    let guard = QUEUE.read();
    f(guard.as_deref().expect(NOT_INITIALIZED))
}

/// Creates the global queue.
///
/// # Panics
/// If the queue is already initialized.
pub fn init() {
    let mut slot = QUEUE.write();
    assert!(slot.is_none(), "global handoff queue initialized twice");
    *slot = Some(Arc::new(HandoffQueue::new()));
    debug!("global handoff queue initialized");
}

/// Wakes parked consumers with [`DequeueError::Closed`] and abandons any
/// buffered handles.
///
/// # Panics
/// If the queue is not initialized.
pub fn destroy() {
    let queue = QUEUE.write().take().expect(NOT_INITIALIZED);
    let cancelled = queue.close();
    debug!(
        cancelled,
        abandoned = queue.size(),
        visited = queue.visited(),
        "global handoff queue destroyed"
    );
}

pub fn enqueue(handle: Handle) -> Result<(), EnqueueError<Handle>> {
    with_queue(|queue| queue.enqueue(handle))
}

/// Blocks until a handle is available.
pub fn dequeue() -> Result<Handle, DequeueError> {
    // Clone out of the registry so a parked consumer never holds the registry
    // lock; `destroy` has to be able to take it and close the queue.
    let queue = QUEUE.read().as_ref().map(Arc::clone).expect(NOT_INITIALIZED);
    queue.dequeue()
}

pub fn try_dequeue() -> Option<Handle> {
    with_queue(HandoffQueue::try_dequeue)
}

pub fn size() -> usize {
    with_queue(HandoffQueue::size)
}

pub fn waiting() -> usize {
    with_queue(HandoffQueue::waiting)
}

pub fn visited() -> usize {
    with_queue(HandoffQueue::visited)
}
