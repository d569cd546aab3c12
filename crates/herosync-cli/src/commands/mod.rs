pub mod clear;
pub mod common;
pub mod completions;
pub mod conflicts;
pub mod dismiss;
pub mod enqueue;
pub mod queue;
pub mod resolve;
pub mod status;
pub mod sync;
