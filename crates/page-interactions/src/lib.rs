//! Stability waits and safe interaction primitives.
//!
//! Every primitive wraps one browser interaction in layered fallbacks: the
//! native path first, then progressively blunter instruments, recording the
//! fallback path taken as warnings for the enclosing step.

pub mod errors;
pub mod primitives;
pub mod stability;

pub use errors::ActionError;
pub use stability::{safe_page_content, stabilize_page, wait_page_ready, StabilityBudget};
