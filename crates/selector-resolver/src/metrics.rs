//! Candidate metrics reported by the in-page probe.

use serde::{Deserialize, Serialize};

/// One candidate element as observed in the page.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CandidateMetrics {
    pub dom_path: String,
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub clickable: bool,
    #[serde(default)]
    pub in_viewport: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub aria_label: String,
    #[serde(default)]
    pub role: String,
    /// `[x, y, width, height]` in CSS pixels.
    #[serde(default)]
    pub bbox: [f64; 4],
    /// Position among the page's interactable elements in document order,
    /// or -1 when the candidate is not interactable.
    #[serde(default = "default_ordinal")]
    pub ordinal: i64,
}

fn default_ordinal() -> i64 {
    -1
}

impl CandidateMetrics {
    pub fn bbox_center(&self) -> (f64, f64) {
        (
            self.bbox[0] + self.bbox[2] / 2.0,
            self.bbox[1] + self.bbox[3] / 2.0,
        )
    }
}

/// Full probe response: the candidates one strategy collected, plus the
/// near-text anchor center when an anchor was requested and found.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProbeReport {
    #[serde(default)]
    pub candidates: Vec<CandidateMetrics>,
    #[serde(default)]
    pub anchor: Option<[f64; 2]>,
}
