//! Catalog collection over the page driver.

use std::sync::Arc;

use cdp_bridge::PageDriver;
use selector_resolver::StableNodeStore;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::errors::CatalogError;
use crate::model::{CatalogEntry, ElementCatalog};
use crate::script::collection_script;

#[derive(Deserialize)]
struct RawCollection {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

/// Builds catalogs from the live page.
pub struct CatalogBuilder {
    driver: Arc<dyn PageDriver>,
}

impl CatalogBuilder {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self { driver }
    }

    /// Run the collection script and assemble a versioned catalog.
    ///
    /// When a stable-node store is supplied, entries whose CSS path already
    /// has a minted id get a `stable_id=` selector prepended, keeping the
    /// robust-selector ordering most-stable-first.
    pub async fn collect(
        &self,
        store: Option<&StableNodeStore>,
    ) -> Result<ElementCatalog, CatalogError> {
        let value = self.driver.evaluate(&collection_script()).await?;
        let raw = parse_collection(value);
        debug!(
            target: "element-catalog",
            url = %raw.url,
            count = raw.entries.len(),
            "collected interactable elements"
        );

        let mut entries = raw.entries;
        if let Some(store) = store {
            for entry in &mut entries {
                let digest = StableNodeStore::text_digest(&entry.primary_label);
                let candidate_id = StableNodeStore::make_id(&entry.dom_path, &digest);
                if store.get(&candidate_id).is_some() {
                    entry
                        .robust_selectors
                        .insert(0, format!("stable_id={candidate_id}"));
                    entry.robust_selectors.truncate(crate::script::ROBUST_SELECTOR_LIMIT);
                }
            }
        }

        Ok(ElementCatalog::assemble(raw.url, raw.title, entries))
    }

    /// Resolve an ordinal index against a catalog, checking interactability.
    pub fn lookup<'a>(
        catalog: &'a ElementCatalog,
        index: u32,
    ) -> Result<&'a CatalogEntry, CatalogError> {
        let entry = catalog
            .get(index)
            .ok_or(CatalogError::IndexNotFound { index })?;
        if entry.disabled {
            return Err(CatalogError::NotInteractable {
                index,
                label: entry.primary_label.clone(),
            });
        }
        Ok(entry)
    }
}

fn parse_collection(value: Value) -> RawCollection {
    serde_json::from_value(value).unwrap_or(RawCollection {
        url: String::new(),
        title: String::new(),
        entries: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_bridge::testing::FakePageDriver;
    use serde_json::json;

    fn page_payload() -> Value {
        json!({
            "url": "https://example.com/list",
            "title": "Listing",
            "entries": [
                {
                    "tag": "a", "role": "link", "primary_label": "Home",
                    "dom_path": "body > nav:nth-of-type(1) > a:nth-of-type(1)",
                    "robust_selectors": ["css=#home", "css=body > nav > a"],
                    "bbox": [0.0, 0.0, 40.0, 20.0],
                    "visible": true, "in_viewport": true, "disabled": false
                },
                {
                    "tag": "button", "role": "button", "primary_label": "購入",
                    "dom_path": "body > main:nth-of-type(1) > button:nth-of-type(1)",
                    "robust_selectors": ["css=#buy"],
                    "bbox": [0.0, 40.0, 80.0, 24.0],
                    "visible": true, "in_viewport": true, "disabled": true
                },
                // Scrolled below the fold: still visible per computed style.
                {
                    "tag": "a", "role": "link", "primary_label": "会社概要",
                    "dom_path": "body > footer:nth-of-type(1) > a:nth-of-type(1)",
                    "robust_selectors": ["css=footer a"],
                    "bbox": [0.0, 2400.0, 60.0, 20.0],
                    "visible": true, "in_viewport": false, "disabled": false
                },
            ],
        })
    }

    #[tokio::test]
    async fn collects_and_assembles_dense_indices() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            script.contains("isInteractive").then(|| Ok(page_payload()))
        });
        let builder = CatalogBuilder::new(Arc::new(fake));

        let catalog = builder.collect(None).await.unwrap();
        assert_eq!(catalog.url, "https://example.com/list");
        assert_eq!(catalog.entries.len(), 3);
        for (position, entry) in catalog.entries.iter().enumerate() {
            assert_eq!(entry.index as usize, position);
        }
        assert!(!catalog.catalog_version.is_empty());
        assert!(!catalog.entries[0].dom_path_hash.is_empty());

        // Off-viewport interactables stay listed and visible; only the
        // viewport flag differs.
        let below_fold = &catalog.entries[2];
        assert!(below_fold.visible);
        assert!(!below_fold.in_viewport);
    }

    #[tokio::test]
    async fn lookup_rejects_disabled_entries() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            script.contains("isInteractive").then(|| Ok(page_payload()))
        });
        let builder = CatalogBuilder::new(Arc::new(fake));
        let catalog = builder.collect(None).await.unwrap();

        assert!(CatalogBuilder::lookup(&catalog, 0).is_ok());
        let err = CatalogBuilder::lookup(&catalog, 1).unwrap_err();
        assert_eq!(err.code(), "ELEMENT_NOT_INTERACTABLE");
        let err = CatalogBuilder::lookup(&catalog, 9).unwrap_err();
        assert_eq!(err.code(), "ELEMENT_NOT_FOUND");
    }

    #[tokio::test]
    async fn known_stable_ids_lead_the_robust_selectors() {
        let fake = FakePageDriver::new();
        fake.set_eval_handler(|script| {
            script.contains("isInteractive").then(|| Ok(page_payload()))
        });
        let builder = CatalogBuilder::new(Arc::new(fake));

        let store = StableNodeStore::new();
        let digest = StableNodeStore::text_digest("Home");
        let id = store.record("body > nav:nth-of-type(1) > a:nth-of-type(1)", &digest);

        let catalog = builder.collect(Some(&store)).await.unwrap();
        assert_eq!(
            catalog.entries[0].robust_selectors[0],
            format!("stable_id={id}")
        );
        // Entries without a minted id keep their original ordering.
        assert_eq!(catalog.entries[1].robust_selectors[0], "css=#buy");
    }
}
