//! The element catalog.
//!
//! One in-page script enumerates every interactable element in document
//! order into a compact, densely indexed list. The catalog version is a
//! content hash of the structural fingerprint: two catalogs with the same
//! version resolve every index to the same logical element.

pub mod catalog;
pub mod errors;
pub mod model;
pub mod rebind;
pub mod script;

pub use catalog::CatalogBuilder;
pub use errors::CatalogError;
pub use model::{CatalogEntry, ElementCatalog, ABBREVIATED_LIMIT};
pub use rebind::{rebind_index, RebindOutcome, REBIND_THRESHOLD};
