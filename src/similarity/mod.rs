//! Similarity queries over the riff catalog
//!
//! Orchestrates the core pipeline: fingerprint the target, fingerprint every
//! candidate (cache-first, blocking pool, per-extraction timeout), then rank
//! by Euclidean distance. A candidate that fails extraction is logged and
//! skipped; a target that fails extraction fails the whole query.

pub mod cache;
pub mod ranker;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::{AnalysisError, FeatureExtractor};
use crate::store::AudioCatalog;
use cache::{CachedAnalysis, FingerprintCache};
use ranker::{Neighbor, RankError};

/// Errors from a similarity query.
#[derive(Debug, Error)]
pub enum SimilarityError {
    #[error("riff not found: {0}")]
    TargetNotFound(String),

    /// The target itself could not be fingerprinted; there is nothing to
    /// compare against, so the query fails.
    #[error("target riff could not be analyzed: {0}")]
    TargetUnusable(#[source] AnalysisError),

    #[error(transparent)]
    Rank(#[from] RankError),
}

/// Similarity query engine.
///
/// Cheap to clone; the extractor and cache are shared.
#[derive(Clone)]
pub struct SimilarityEngine {
    extractor: Arc<FeatureExtractor>,
    cache: FingerprintCache,
    extraction_timeout: Duration,
}

impl SimilarityEngine {
    pub fn new(extraction_timeout: Duration) -> Self {
        Self {
            extractor: Arc::new(FeatureExtractor::new()),
            cache: FingerprintCache::new(),
            extraction_timeout,
        }
    }

    /// Fingerprint one riff, consulting the cache first.
    ///
    /// Extraction runs on the blocking pool under the configured timeout; a
    /// timeout surfaces as an extraction failure.
    pub async fn analyze(&self, id: &str, bytes: Vec<u8>) -> Result<CachedAnalysis, AnalysisError> {
        if let Some(hit) = self.cache.get(id).await {
            debug!(riff_id = %id, "fingerprint cache hit");
            return Ok(hit);
        }

        let extractor = Arc::clone(&self.extractor);
        let task = tokio::task::spawn_blocking(move || extractor.extract(&bytes));

        let (fingerprint, duration) = tokio::time::timeout(self.extraction_timeout, task)
            .await
            .map_err(|_| {
                AnalysisError::Extraction(format!(
                    "analysis timed out after {:?}",
                    self.extraction_timeout
                ))
            })?
            .map_err(|e| AnalysisError::Extraction(format!("analysis task failed: {e}")))??;

        let analysis = CachedAnalysis {
            fingerprint,
            duration,
        };
        self.cache.insert(id.to_string(), analysis.clone()).await;
        Ok(analysis)
    }

    /// Drop any cached fingerprint for `id`.
    pub async fn invalidate(&self, id: &str) {
        self.cache.invalidate(id).await;
    }

    /// Find the `k` riffs most similar to `target_id`.
    ///
    /// Every known riff (including the target, which the ranker excludes) is
    /// a candidate; candidates whose audio cannot be read or fingerprinted
    /// are skipped with a warning. Partial results beat total failure.
    pub async fn find_similar<C: AudioCatalog>(
        &self,
        catalog: &C,
        target_id: &str,
        k: usize,
    ) -> Result<Vec<Neighbor>, SimilarityError> {
        let target_bytes = catalog
            .audio_bytes(target_id)
            .await
            .map_err(|_| SimilarityError::TargetNotFound(target_id.to_string()))?;

        let target = self
            .analyze(target_id, target_bytes)
            .await
            .map_err(SimilarityError::TargetUnusable)?;

        let mut candidates = Vec::new();
        for id in catalog.list_ids().await {
            let bytes = match catalog.audio_bytes(&id).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(riff_id = %id, error = %e, "skipping candidate: audio unreadable");
                    continue;
                }
            };

            match self.analyze(&id, bytes).await {
                Ok(analysis) => candidates.push((id, analysis.fingerprint)),
                Err(e) => {
                    warn!(riff_id = %id, error = %e, "skipping candidate: analysis failed");
                }
            }
        }

        debug!(
            target_id,
            usable_candidates = candidates.len(),
            k,
            "ranking candidates"
        );

        Ok(ranker::rank(&target.fingerprint, target_id, &candidates, k)?)
    }
}
