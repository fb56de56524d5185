pub mod job;
pub mod progress;
pub mod queue;
pub mod scheduler;
#[cfg(test)]
pub mod integration_tests;

pub use job::Job;
pub use progress::{ProgressBar, ProgressHandle, ProgressMessage};
pub use queue::{QueueOutcome, RunQueue};
pub use scheduler::{RunHandle, RunReport, Runner};
