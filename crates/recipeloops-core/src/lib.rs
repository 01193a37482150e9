mod context;
mod error;
mod loop_runner;
mod outcome;

pub use context::{AttemptRecord, LoopContext, DEFAULT_MAX_ATTEMPTS};
pub use error::LoopError;
pub use loop_runner::{DebugChannels, FailurePolicy, LoopConfig, LoopRunner};
pub use outcome::LoopOutcome;
