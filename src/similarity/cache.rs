//! Fingerprint cache keyed by riff id
//!
//! Memoizes extraction results so a similarity query does not re-decode the
//! whole catalog. Entries are invalidated when the underlying audio is
//! replaced or deleted; with an empty cache behavior is identical, just
//! slower.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::analysis::Fingerprint;

/// Cached extraction result for one riff.
#[derive(Debug, Clone)]
pub struct CachedAnalysis {
    pub fingerprint: Fingerprint,
    pub duration: f64,
}

/// Shared id -> analysis cache.
#[derive(Clone, Default)]
pub struct FingerprintCache {
    entries: Arc<RwLock<HashMap<String, CachedAnalysis>>>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &str) -> Option<CachedAnalysis> {
        self.entries.read().await.get(id).cloned()
    }

    pub async fn insert(&self, id: String, analysis: CachedAnalysis) {
        self.entries.write().await.insert(id, analysis);
    }

    /// Drop the entry for `id`, if cached. Called when the riff's audio is
    /// deleted or replaced.
    pub async fn invalidate(&self, id: &str) {
        self.entries.write().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
