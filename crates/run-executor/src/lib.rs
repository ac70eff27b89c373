//! The run executor.
//!
//! Takes a parsed plan through the full pipeline: validation, dry-run,
//! implicit-wait augmentation, then strictly sequential execution with
//! per-step stabilization, catalog refresh/rebind, retry with exponential
//! backoff, screenshots and append-only structured events.

pub mod config;
pub mod events;
pub mod executor;
pub mod outcome;
pub mod retry;

pub use config::RunConfig;
pub use events::{EventWriter, StructuredEvent};
pub use executor::{RunExecutor, RunSummary, StepObserver};
pub use outcome::{ActionOutcome, ResolvedSummary, StepError};
pub use retry::backoff_delay;
