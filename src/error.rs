use thiserror::Error;

/// Reasons an `enqueue` can be refused. The rejected item is handed back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnqueueError<T> {
    #[error("failed to allocate space for a buffered item")]
    Alloc(T),
    #[error("queue is closed")]
    Closed(T),
}

impl<T> EnqueueError<T> {
    /// Recovers the item that could not be enqueued.
    pub fn into_inner(self) -> T {
        match self {
            EnqueueError::Alloc(item) | EnqueueError::Closed(item) => item,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, EnqueueError::Closed(_))
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DequeueError {
    #[error("failed to allocate a waiter slot")]
    Alloc,
    #[error("queue was closed while waiting for an item")]
    Closed,
}
