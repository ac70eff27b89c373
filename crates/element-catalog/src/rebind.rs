//! Stale-index rebinding.
//!
//! When a plan references ordinal indices against an out-of-date catalog
//! version, the executor may rebind: the old entry is matched against the
//! live catalog by weighted similarity, and a confident match rewrites the
//! action's index instead of failing the step.

use similar::TextDiff;
use tracing::debug;

use crate::errors::CatalogError;
use crate::model::{CatalogEntry, ElementCatalog};

const DOM_PATH_WEIGHT: f64 = 0.5;
const LABEL_WEIGHT: f64 = 0.3;
const NEAREST_TEXTS_WEIGHT: f64 = 0.2;

/// Minimum weighted similarity for a rebind to be accepted.
pub const REBIND_THRESHOLD: f64 = 0.6;

/// A successful rebind: the replacement index plus the informational
/// warning attached to the step.
#[derive(Clone, Debug)]
pub struct RebindOutcome {
    pub new_index: u32,
    pub similarity: f64,
    pub warning: String,
}

/// Match `old_entry` (from the plan's referenced catalog) against the live
/// catalog.
pub fn rebind_index(
    old_entry: &CatalogEntry,
    live: &ElementCatalog,
    expected_version: &str,
) -> Result<RebindOutcome, CatalogError> {
    let mut best: Option<(f64, &CatalogEntry)> = None;
    for candidate in &live.entries {
        let score = similarity(old_entry, candidate);
        match best {
            Some((best_score, _)) if score <= best_score => {}
            _ => best = Some((score, candidate)),
        }
    }

    match best {
        Some((score, candidate)) if score > REBIND_THRESHOLD => {
            let warning = format!(
                "Catalog index {} rebound to {} (similarity {:.2}, label '{}')",
                old_entry.index, candidate.index, score, candidate.primary_label
            );
            debug!(target: "element-catalog", %warning);
            Ok(RebindOutcome {
                new_index: candidate.index,
                similarity: score,
                warning,
            })
        }
        _ => Err(CatalogError::CatalogOutdated {
            expected: expected_version.to_string(),
            current: live.catalog_version.clone(),
        }),
    }
}

fn similarity(old: &CatalogEntry, new: &CatalogEntry) -> f64 {
    let path_part = if !old.dom_path_hash.is_empty() && old.dom_path_hash == new.dom_path_hash {
        DOM_PATH_WEIGHT
    } else {
        0.0
    };

    let label_part = LABEL_WEIGHT * label_ratio(&old.primary_label, &new.primary_label);
    let texts_part = NEAREST_TEXTS_WEIGHT * overlap(&old.nearest_texts, &new.nearest_texts);

    path_part + label_part + texts_part
}

fn label_ratio(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio() as f64
}

/// Jaccard-style overlap of the nearby text snippets.
fn overlap(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let matches = a.iter().filter(|text| b.contains(text)).count();
    let union = a.len() + b.len() - matches;
    matches as f64 / union as f64
}
