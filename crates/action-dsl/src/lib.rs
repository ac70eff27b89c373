//! The action plan language.
//!
//! Plans arrive either in the canonical tagged form (`{"type": "click", …}`)
//! or in the legacy form older clients still emit (`{"action": "click",
//! "target": "#buy"}`). Both parse into the same typed model; every action
//! serializes back out in both forms and the two round-trip.

pub mod actions;
pub mod registry;
pub mod selector;
pub mod validate;

pub use actions::{
    Action, AssertState, ExtractAttr, FrameTarget, KeyScope, MouseButton, ScreenshotMode,
    ScrollDirection, ScrollEdge, ScrollTarget, ScrollTo, TabTarget, WaitCondition,
};
pub use registry::{ActionSpec, Registry, RunRequest};
pub use selector::{Selector, Strategy};
pub use validate::{validate_plan, DslError, PlanReport};
