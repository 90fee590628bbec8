pub mod blocking;
pub mod error;
#[cfg(not(loom))]
pub mod global;
mod sync;

pub use blocking::HandoffQueue;
pub use blocking::QueueStats;

pub use error::DequeueError;
pub use error::EnqueueError;

// Common interface for all blocking queues.
pub trait BlockingQueue<T: Send>: Send + Sync + 'static {
    type PushError;
    type PopError;

    fn push(&self, item: T) -> Result<(), Self::PushError>;
    // Parks the caller until an item is available.
    fn pop(&self) -> Result<T, Self::PopError>;
    fn try_pop(&self) -> Option<T>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn waiting(&self) -> usize;
}
