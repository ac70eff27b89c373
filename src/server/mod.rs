//! HTTP surfaces.
//!
//! Two listeners share one process: the session service (lifecycle, shared
//! browser warmup) and the automation service (page introspection and plan
//! execution). The split mirrors how the services are deployed, not how
//! they are designed; both routers hang off the same [`ServeState`].

mod automation_routes;
mod session_routes;
mod state;

pub use automation_routes::automation_router;
pub use session_routes::session_router;
pub use state::ServeState;
