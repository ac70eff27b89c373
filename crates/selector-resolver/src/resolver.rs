//! Strategy orchestration.

use std::sync::Arc;

use action_dsl::{Selector, Strategy};
use cdp_bridge::PageDriver;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::ResolverError;
use crate::metrics::{CandidateMetrics, ProbeReport};
use crate::score::score_candidate;
use crate::script::{probe_script, reconstruct_script};
use crate::store::StableNodeStore;

/// Score assigned when a stable id reconstructs directly, bypassing the
/// scoring model.
const RECONSTRUCT_SCORE: f64 = 100.0;

/// The single node a resolution settled on.
#[derive(Clone, Debug)]
pub struct ResolvedNode {
    /// The selector that was resolved.
    pub selector: Selector,
    /// Minted stable id; also recorded in the session's store.
    pub stable_id: String,
    pub score: f64,
    /// Structured CSS path with nth-of-type steps; doubles as the element
    /// handle for the interaction layer.
    pub dom_path: String,
    pub text_digest: String,
    /// Name of the priority branch that won.
    pub strategy: String,
}

/// Resolves selectors against the live page. The resolver itself never
/// retries; callers own the retry loop and resolution is idempotent.
pub struct SelectorResolver {
    driver: Arc<dyn PageDriver>,
    store: Arc<StableNodeStore>,
}

impl SelectorResolver {
    pub fn new(driver: Arc<dyn PageDriver>, store: Arc<StableNodeStore>) -> Self {
        Self { driver, store }
    }

    pub fn store(&self) -> &Arc<StableNodeStore> {
        &self.store
    }

    /// Resolve to exactly one node.
    pub async fn resolve(&self, selector: &Selector) -> Result<ResolvedNode, ResolverError> {
        // A stored stable id short-circuits the strategies entirely when the
        // recorded CSS path still finds an element.
        if let Some(stable_id) = &selector.stable_id {
            if let Some(stored) = self.store.get(stable_id) {
                match self.reconstruct(selector, &stored.dom_path).await {
                    Ok(Some(node)) => return Ok(node),
                    Ok(None) => {
                        debug!(
                            target: "selector-resolver",
                            stable_id = %stable_id,
                            "stored path no longer matches; falling back to strategies"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        let mut attempted = Vec::new();
        for strategy in selector.effective_priority() {
            let script = match probe_script(strategy, selector) {
                Some(script) => script,
                None => continue,
            };
            attempted.push(strategy.name().to_string());

            let report = self.run_probe(&script).await?;
            if report.candidates.is_empty() {
                debug!(
                    target: "selector-resolver",
                    strategy = strategy.name(),
                    "strategy returned no candidates"
                );
                continue;
            }

            // First non-empty strategy wins; later ones never run.
            let node = self.pick_best(selector, strategy, report);
            return Ok(node);
        }

        warn!(
            target: "selector-resolver",
            selector = %selector.describe(),
            attempted = ?attempted,
            "all strategies exhausted"
        );
        Err(ResolverError::ResolutionFailed {
            selector: selector.describe(),
            attempted,
            best_score: None,
        })
    }

    async fn run_probe(&self, script: &str) -> Result<ProbeReport, ResolverError> {
        let value = self.driver.evaluate(script).await?;
        Ok(parse_report(value))
    }

    async fn reconstruct(
        &self,
        selector: &Selector,
        dom_path: &str,
    ) -> Result<Option<ResolvedNode>, ResolverError> {
        let value = self.driver.evaluate(&reconstruct_script(dom_path)).await?;
        let report = parse_report(value);
        let metrics = match report.candidates.into_iter().next() {
            Some(metrics) => metrics,
            None => return Ok(None),
        };
        Ok(Some(self.mint(
            selector,
            "stable_id",
            RECONSTRUCT_SCORE,
            &metrics,
        )))
    }

    fn pick_best(
        &self,
        selector: &Selector,
        strategy: Strategy,
        report: ProbeReport,
    ) -> ResolvedNode {
        let mut best: Option<(f64, &CandidateMetrics)> = None;
        for metrics in &report.candidates {
            let score = score_candidate(selector, metrics, report.anchor);
            match best {
                Some((best_score, _)) if score <= best_score => {}
                _ => best = Some((score, metrics)),
            }
        }
        // report.candidates is non-empty when we get here.
        let (score, metrics) = best.expect("non-empty candidate list");
        self.mint(selector, strategy.name(), score, metrics)
    }

    fn mint(
        &self,
        selector: &Selector,
        strategy: &str,
        score: f64,
        metrics: &CandidateMetrics,
    ) -> ResolvedNode {
        let text_digest = StableNodeStore::text_digest(&metrics.text);
        let stable_id = self.store.record(&metrics.dom_path, &text_digest);
        ResolvedNode {
            selector: selector.clone(),
            stable_id,
            score,
            dom_path: metrics.dom_path.clone(),
            text_digest,
            strategy: strategy.to_string(),
        }
    }
}

fn parse_report(value: Value) -> ProbeReport {
    if value.is_null() {
        return ProbeReport::default();
    }
    serde_json::from_value(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_bridge::testing::FakePageDriver;
    use serde_json::json;

    fn candidate(dom_path: &str, text: &str, ordinal: i64) -> Value {
        json!({
            "dom_path": dom_path,
            "visible": true,
            "clickable": true,
            "in_viewport": true,
            "text": text,
            "aria_label": "",
            "role": "button",
            "bbox": [0.0, 0.0, 80.0, 20.0],
            "ordinal": ordinal,
        })
    }

    fn resolver_with(
        handler: impl FnMut(&str) -> Option<Result<Value, cdp_bridge::DriverError>> + Send + 'static,
    ) -> (SelectorResolver, Arc<StableNodeStore>) {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(handler);
        let store = Arc::new(StableNodeStore::new());
        (
            SelectorResolver::new(Arc::new(fake), store.clone()),
            store,
        )
    }

    #[tokio::test]
    async fn resolves_css_and_mints_stable_id() {
        let (resolver, store) = resolver_with(|script| {
            script.contains("querySelectorAll(\"#buy\")").then(|| {
                Ok(json!({
                    "candidates": [candidate("body > button:nth-of-type(1)", "Buy", 0)],
                    "anchor": null,
                }))
            })
        });

        let node = resolver.resolve(&Selector::css("#buy")).await.unwrap();
        assert_eq!(node.strategy, "css");
        assert_eq!(node.dom_path, "body > button:nth-of-type(1)");
        assert_eq!(node.stable_id.len(), 24);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn resolution_is_deterministic_without_mutation() {
        let make_handler = || {
            |script: &str| {
                script.contains("querySelectorAll(\"#q\")").then(|| {
                    Ok(json!({
                        "candidates": [
                            candidate("body > input:nth-of-type(1)", "", 0),
                            candidate("body > input:nth-of-type(2)", "", 1),
                        ],
                        "anchor": null,
                    }))
                })
            }
        };
        let (resolver, _) = resolver_with(make_handler());
        let first = resolver.resolve(&Selector::css("#q")).await.unwrap();
        let second = resolver.resolve(&Selector::css("#q")).await.unwrap();
        assert_eq!(first.stable_id, second.stable_id);
        assert_eq!(first.dom_path, second.dom_path);
    }

    #[tokio::test]
    async fn ordinal_index_reaches_beyond_first_six() {
        let (resolver, _) = resolver_with(|script| {
            script.contains("wantedOrdinal = 13").then(|| {
                let mut candidates: Vec<Value> = (0..6)
                    .map(|i| candidate(&format!("body > a:nth-of-type({})", i + 1), "link", i))
                    .collect();
                candidates.push(candidate("body > a:nth-of-type(14)", "deep link", 13));
                Ok(json!({ "candidates": candidates, "anchor": null }))
            })
        });

        let node = resolver.resolve(&Selector::ordinal(13)).await.unwrap();
        assert_eq!(node.dom_path, "body > a:nth-of-type(14)");
        assert_eq!(node.strategy, "index");
    }

    #[tokio::test]
    async fn falls_through_empty_strategies_in_priority_order() {
        let (resolver, _) = resolver_with(|script| {
            if script.contains("querySelectorAll(\"#missing\")") {
                Some(Ok(json!({ "candidates": [], "anchor": null })))
            } else if script.contains("toLowerCase().includes(needle)") {
                Some(Ok(json!({
                    "candidates": [candidate("body > span:nth-of-type(3)", "購入", 2)],
                    "anchor": null,
                })))
            } else {
                None
            }
        });

        let selector = Selector {
            css: Some("#missing".into()),
            text: Some("購入".into()),
            ..Selector::default()
        };
        let node = resolver.resolve(&selector).await.unwrap();
        assert_eq!(node.strategy, "text");
    }

    #[tokio::test]
    async fn stable_id_reconstruction_short_circuits() {
        let store = Arc::new(StableNodeStore::new());
        let stable_id = store.record("body > button:nth-of-type(7)", "Pay");

        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            script
                .contains("button:nth-of-type(7)")
                .then(|| {
                    Ok(json!({
                        "candidates": [candidate("body > button:nth-of-type(7)", "Pay", 6)],
                        "anchor": null,
                    }))
                })
        });
        let resolver = SelectorResolver::new(Arc::new(fake), store);

        let selector = Selector {
            stable_id: Some(stable_id),
            css: Some("#never-used".into()),
            ..Selector::default()
        };
        let node = resolver.resolve(&selector).await.unwrap();
        assert_eq!(node.strategy, "stable_id");
        assert!(node.score >= 100.0);
    }

    #[tokio::test]
    async fn exhausted_strategies_is_a_typed_failure() {
        let (resolver, _) = resolver_with(|_| Some(Ok(json!({ "candidates": [], "anchor": null }))));
        let err = resolver.resolve(&Selector::css("#ghost")).await.unwrap_err();
        match &err {
            ResolverError::ResolutionFailed { attempted, .. } => {
                assert_eq!(attempted, &vec!["css".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(err.code(), "ELEMENT_NOT_FOUND");
    }
}
