//! Per-session store of stable element ids.
//!
//! An entry is created or refreshed on every successful resolution and never
//! auto-evicted within a session. A fresh catalog generation does not
//! invalidate entries, though it may refresh their recorded CSS path.

use std::collections::HashMap;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};

/// Length of the minted id, in hex characters.
const STABLE_ID_LEN: usize = 24;

/// How much inner text goes into the digest.
pub const TEXT_DIGEST_LEN: usize = 80;

/// What a stable id points back to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredNode {
    pub dom_path: String,
    pub text_digest: String,
}

#[derive(Default)]
pub struct StableNodeStore {
    entries: RwLock<HashMap<String, StoredNode>>,
}

impl StableNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic id for a (dom_path, text_digest) pair.
    pub fn make_id(dom_path: &str, text_digest: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(dom_path.as_bytes());
        hasher.update(b"|");
        hasher.update(text_digest.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..STABLE_ID_LEN].to_string()
    }

    /// First `TEXT_DIGEST_LEN` chars of the trimmed inner text.
    pub fn text_digest(inner_text: &str) -> String {
        inner_text.trim().chars().take(TEXT_DIGEST_LEN).collect()
    }

    /// Record (or refresh) a resolution and return its id.
    pub fn record(&self, dom_path: &str, text_digest: &str) -> String {
        let id = Self::make_id(dom_path, text_digest);
        self.entries.write().insert(
            id.clone(),
            StoredNode {
                dom_path: dom_path.to_string(),
                text_digest: text_digest.to_string(),
            },
        );
        id
    }

    pub fn get(&self, stable_id: &str) -> Option<StoredNode> {
        self.entries.read().get(stable_id).cloned()
    }

    /// Refresh the CSS path of an existing entry without changing its id.
    pub fn refresh_path(&self, stable_id: &str, dom_path: &str) {
        if let Some(entry) = self.entries.write().get_mut(stable_id) {
            entry.dom_path = dom_path.to_string();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
