//! The additive candidate scoring model.

use action_dsl::Selector;
use similar::TextDiff;

use crate::metrics::CandidateMetrics;

const VISIBLE_BONUS: f64 = 2.0;
const CLICKABLE_BONUS: f64 = 1.0;
const VIEWPORT_BONUS: f64 = 0.5;
const TEXT_WEIGHT: f64 = 2.0;
const ARIA_WEIGHT: f64 = 1.5;
const ROLE_BONUS: f64 = 1.0;
const ORDINAL_STEP_PENALTY: f64 = 0.5;
const ORDINAL_PENALTY_CAP: f64 = 2.0;
const PROXIMITY_MAX: f64 = 1.5;
/// Distance (px) beyond which a near-text anchor stops contributing.
const PROXIMITY_RANGE: f64 = 800.0;

/// Ratcliff/Obershelp similarity of two strings, case-insensitive, in 0..=1.
pub fn text_ratio(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio() as f64
}

/// Score one candidate against the selector. Higher is better.
pub fn score_candidate(
    selector: &Selector,
    metrics: &CandidateMetrics,
    anchor: Option<[f64; 2]>,
) -> f64 {
    let mut score = 0.0;

    if metrics.visible {
        score += VISIBLE_BONUS;
    }
    if metrics.clickable {
        score += CLICKABLE_BONUS;
    }
    if metrics.in_viewport {
        score += VIEWPORT_BONUS;
    }

    if let Some(wanted_text) = &selector.text {
        score += TEXT_WEIGHT * text_ratio(wanted_text, &metrics.text);
    }
    if let Some(wanted_aria) = &selector.aria_label {
        score += ARIA_WEIGHT * text_ratio(wanted_aria, &metrics.aria_label);
    }
    if let Some(wanted_role) = &selector.role {
        if wanted_role == &metrics.role {
            score += ROLE_BONUS;
        }
    }

    if let Some(wanted_index) = selector.index {
        let penalty = if metrics.ordinal >= 0 {
            let distance = (i64::from(wanted_index) - metrics.ordinal).unsigned_abs() as f64;
            (ORDINAL_STEP_PENALTY * distance).min(ORDINAL_PENALTY_CAP)
        } else {
            ORDINAL_PENALTY_CAP
        };
        score -= penalty;
    }

    if selector.near_text.is_some() {
        if let Some([ax, ay]) = anchor {
            let (cx, cy) = metrics.bbox_center();
            let distance = ((cx - ax).powi(2) + (cy - ay).powi(2)).sqrt();
            let clamped = distance.min(PROXIMITY_RANGE);
            score += PROXIMITY_MAX * (1.0 - clamped / PROXIMITY_RANGE);
        }
    }

    score
}
