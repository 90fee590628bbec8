pub mod handoff_queue;
mod waiter;

pub use handoff_queue::{HandoffQueue, QueueStats};
