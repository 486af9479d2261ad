//! Shared worker primitives: task classification and spawn entrypoints.
//!
//! Every background future in the console (debounce timers, searches,
//! persistence calls, autosave writes) goes through [`WorkerRuntime`], so
//! spawns are traced with their [`TaskClass`] and fall back to a private
//! runtime when called outside of one.

mod class;
mod runtime;
mod spawn;

pub use class::TaskClass;
pub use runtime::{Delayed, WorkerRuntime};
pub use spawn::spawn;
