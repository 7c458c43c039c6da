//! Batch intake from the input queue.

mod drain;
mod queue;

pub use drain::{BatchIntake, IntakeStats};
pub use queue::{FileTopic, MemoryQueue, MessageQueue};
