//! Execution history for the Orca orchestrator.
//!
//! Every finished agent invocation is appended here as an [`ExecutionRecord`].
//! The monitor reads the history back through range queries; nothing in this
//! crate mutates orchestration state.

pub mod record;
pub mod store;

pub use record::{ExecutionOutcome, ExecutionRecord};
pub use store::{ExecutionLogStore, FileLogStore, MemoryLogStore};
