//! Safe interaction primitives.
//!
//! One module per interaction; each applies its fallback ladder and records
//! the path taken into the step's warning list.

pub mod click;
pub mod fill;
pub mod hover;
pub mod press;
pub mod scroll;
pub mod select;

pub use click::click;
pub use fill::fill;
pub use hover::hover;
pub use press::{press_key, KeyPressScope};
pub use scroll::{scroll_by_amount, scroll_container, scroll_to_edge, scroll_to_selector, scroll_to_text};
pub use select::select_option;

pub(crate) fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "\"\"".to_string())
}
