//! Catalog data model and version hashing.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// Entries exposed in the abbreviated view handed to planners.
pub const ABBREVIATED_LIMIT: usize = 25;

/// Hex length of `catalog_version` and `dom_path_hash`.
const VERSION_LEN: usize = 16;

/// One interactable element.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Dense ordinal, equal to the entry's position in `entries`.
    #[serde(default)]
    pub index: u32,
    pub tag: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub primary_label: String,
    #[serde(default)]
    pub secondary_label: String,
    #[serde(default)]
    pub section_hint: String,
    #[serde(default)]
    pub state_hint: String,
    #[serde(default)]
    pub href_short: String,
    /// Most-stable-first selector strings in the legacy grammar.
    #[serde(default)]
    pub robust_selectors: Vec<String>,
    #[serde(default)]
    pub nearest_texts: Vec<String>,
    #[serde(default)]
    pub dom_path: String,
    #[serde(default)]
    pub dom_path_hash: String,
    /// `[x, y, width, height]`.
    #[serde(default)]
    pub bbox: [f64; 4],
    /// Computed-style visibility. Membership already excludes
    /// `display:none`/`visibility:hidden` elements, so listed entries are
    /// visible even when scrolled out of the viewport.
    #[serde(default)]
    pub visible: bool,
    /// Whether the bounding box intersects the current viewport.
    #[serde(default)]
    pub in_viewport: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl CatalogEntry {
    pub fn hash_dom_path(dom_path: &str) -> String {
        let digest = hex::encode(Sha256::digest(dom_path.as_bytes()));
        digest[..VERSION_LEN].to_string()
    }

    /// Compact single-line form used by the abbreviated view.
    pub fn abbreviated(&self) -> Value {
        json!({
            "index": self.index,
            "tag": self.tag,
            "role": self.role,
            "primary_label": self.primary_label,
            "secondary_label": self.secondary_label,
            "section_hint": self.section_hint,
            "state_hint": self.state_hint,
            "href_short": self.href_short,
        })
    }
}

/// Snapshot of the page's interactable elements.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ElementCatalog {
    pub catalog_version: String,
    pub url: String,
    pub title: String,
    pub entries: Vec<CatalogEntry>,
}

impl ElementCatalog {
    /// Assemble a catalog: assign dense indices in traversal order, fill the
    /// path hashes and compute the content version.
    pub fn assemble(url: String, title: String, mut entries: Vec<CatalogEntry>) -> Self {
        for (position, entry) in entries.iter_mut().enumerate() {
            entry.index = position as u32;
            if entry.dom_path_hash.is_empty() {
                entry.dom_path_hash = CatalogEntry::hash_dom_path(&entry.dom_path);
            }
        }
        let catalog_version = Self::version_of(&url, &entries);
        Self {
            catalog_version,
            url,
            title,
            entries,
        }
    }

    /// Content hash over the structural fingerprint. The fingerprint triples
    /// are sorted so the version depends on content, not entry order; a
    /// positional move still changes it through the dom path hash.
    pub fn version_of(url: &str, entries: &[CatalogEntry]) -> String {
        let mut fingerprint: Vec<String> = entries
            .iter()
            .map(|e| format!("{}|{}|{}", e.dom_path_hash, e.primary_label, e.state_hint))
            .collect();
        fingerprint.sort();

        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        for line in &fingerprint {
            hasher.update(b"\n");
            hasher.update(line.as_bytes());
        }
        let digest = hex::encode(hasher.finalize());
        digest[..VERSION_LEN].to_string()
    }

    pub fn get(&self, index: u32) -> Option<&CatalogEntry> {
        self.entries.get(index as usize)
    }

    pub fn abbreviated(&self) -> Vec<Value> {
        self.entries
            .iter()
            .take(ABBREVIATED_LIMIT)
            .map(CatalogEntry::abbreviated)
            .collect()
    }

    /// Render the abbreviated view as the indexed text block planners see.
    pub fn format_for_prompt(&self) -> String {
        if self.entries.is_empty() {
            return "(No interactive elements detected in the current viewport)".to_string();
        }
        let mut lines = Vec::new();
        for entry in self.entries.iter().take(ABBREVIATED_LIMIT) {
            let role = if entry.role.is_empty() {
                entry.tag.as_str()
            } else {
                entry.role.as_str()
            };
            let label = if entry.primary_label.is_empty() {
                "(no label)"
            } else {
                entry.primary_label.as_str()
            };
            let mut hints = Vec::new();
            if !entry.section_hint.is_empty() {
                hints.push(format!("section: {}", entry.section_hint));
            }
            if !entry.state_hint.is_empty() {
                hints.push(entry.state_hint.clone());
            }
            if !entry.href_short.is_empty() {
                hints.push(entry.href_short.clone());
            }
            let suffix = if hints.is_empty() {
                String::new()
            } else {
                format!(" ({})", hints.join("; "))
            };
            lines.push(format!("[{}] {}: {}{}", entry.index, role, label, suffix));
        }
        lines.join("\n")
    }

    /// Full wire form served by the catalog endpoint.
    pub fn to_payload(&self) -> Value {
        json!({
            "abbreviated": self.abbreviated(),
            "full": self.entries,
            "catalog_version": self.catalog_version,
            "index_mode_enabled": !self.entries.is_empty(),
            "metadata": { "url": self.url, "title": self.title },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dom_path: &str, label: &str, state: &str) -> CatalogEntry {
        CatalogEntry {
            tag: "button".into(),
            primary_label: label.into(),
            state_hint: state.into(),
            dom_path: dom_path.into(),
            visible: true,
            ..CatalogEntry::default()
        }
    }

    #[test]
    fn indices_are_dense_and_positional() {
        let catalog = ElementCatalog::assemble(
            "https://example.com".into(),
            "Example".into(),
            vec![entry("body > a", "Home", ""), entry("body > button", "Go", "")],
        );
        for (position, entry) in catalog.entries.iter().enumerate() {
            assert_eq!(entry.index as usize, position);
        }
    }

    #[test]
    fn version_is_content_addressed() {
        let make = |label: &str| {
            ElementCatalog::assemble(
                "https://example.com".into(),
                "Example".into(),
                vec![entry("body > button", label, "")],
            )
        };
        assert_eq!(make("Go").catalog_version, make("Go").catalog_version);
        assert_ne!(make("Go").catalog_version, make("Stop").catalog_version);
    }

    #[test]
    fn version_changes_with_state_hint() {
        let with_state = ElementCatalog::assemble(
            "u".into(),
            "t".into(),
            vec![entry("body > input", "Agree", "checked")],
        );
        let without = ElementCatalog::assemble(
            "u".into(),
            "t".into(),
            vec![entry("body > input", "Agree", "")],
        );
        assert_ne!(with_state.catalog_version, without.catalog_version);
    }

    #[test]
    fn abbreviated_view_caps_at_limit() {
        let entries = (0..40)
            .map(|i| entry(&format!("body > a:nth-of-type({i})"), "x", ""))
            .collect();
        let catalog = ElementCatalog::assemble("u".into(), "t".into(), entries);
        assert_eq!(catalog.abbreviated().len(), ABBREVIATED_LIMIT);
        assert_eq!(catalog.entries.len(), 40);
    }
}
