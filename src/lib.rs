//! webpilot: a browser automation broker.
//!
//! Accepts structured action plans (and planner-mediated natural-language
//! commands) over HTTP and drives one shared Chromium through CDP. The heavy
//! lifting lives in the workspace crates; this crate wires configuration,
//! the session manager and the two HTTP surfaces together.

pub mod collaborators;
pub mod config;
pub mod errors;
pub mod server;
pub mod session;

pub use config::Config;
pub use errors::ApiError;
pub use session::{InstructionOutcome, SessionManager, SessionSnapshot, SessionStatus};
