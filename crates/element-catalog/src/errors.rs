//! Catalog error types.

use cdp_bridge::DriverError;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CatalogError {
    /// An index refers to a stale catalog version and rebind found no
    /// confident match in the live catalog.
    #[error("element catalog is outdated (expected {expected}, current {current})")]
    CatalogOutdated { expected: String, current: String },

    #[error("element with index {index} not found in catalog")]
    IndexNotFound { index: u32 },

    #[error("element at index {index} is disabled: {label}")]
    NotInteractable { index: u32, label: String },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl CatalogError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CatalogOutdated { .. } => "CATALOG_OUTDATED",
            Self::IndexNotFound { .. } => "ELEMENT_NOT_FOUND",
            Self::NotInteractable { .. } => "ELEMENT_NOT_INTERACTABLE",
            Self::Driver(DriverError::Timeout(_)) => "ACTION_TIMEOUT",
            Self::Driver(_) => "EXECUTION_ERROR",
        }
    }
}
