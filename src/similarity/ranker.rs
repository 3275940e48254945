//! Nearest-neighbor ranking over fingerprints
//!
//! Partial selection with a bounded max-heap: only the k+1 closest candidates
//! are kept while scanning (k+1 because the target, when present among the
//! candidates, sits at distance 0 and is dropped from the output). Equal
//! distances keep candidate input order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use thiserror::Error;

use crate::analysis::Fingerprint;

/// Errors from ranking.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RankError {
    /// No usable candidates were supplied.
    #[error("no usable candidates to rank against")]
    EmptyCandidateSet,

    /// A candidate fingerprint disagrees with the target's dimensionality.
    /// This indicates mixed extraction configurations, a defect rather than
    /// user error.
    #[error("fingerprint for '{id}' has {got} dimensions, expected {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        got: usize,
    },
}

/// One ranked similarity result.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub id: String,
    pub distance: f32,
}

/// Max-heap entry; the greatest element is the current worst candidate.
struct HeapEntry {
    distance: f32,
    /// Candidate-set input position, used to keep ties stable.
    order: usize,
    id: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.order.cmp(&other.order))
    }
}

/// Rank `candidates` by Euclidean distance to `target`, closest first.
///
/// The entry whose id equals `target_id` is excluded from the output; when
/// the target is absent from the candidate set nothing is excluded and the
/// k best candidates are returned. Fewer than k non-target candidates yield
/// a shorter result, never an error.
pub fn rank(
    target: &Fingerprint,
    target_id: &str,
    candidates: &[(String, Fingerprint)],
    k: usize,
) -> Result<Vec<Neighbor>, RankError> {
    if candidates.is_empty() {
        return Err(RankError::EmptyCandidateSet);
    }

    // k is caller-supplied and unbounded; saturate instead of overflowing.
    let keep = k.saturating_add(1);
    let mut heap: BinaryHeap<HeapEntry> = BinaryHeap::with_capacity(keep.min(candidates.len()));

    for (order, (id, fingerprint)) in candidates.iter().enumerate() {
        if fingerprint.len() != target.len() {
            return Err(RankError::DimensionMismatch {
                id: id.clone(),
                expected: target.len(),
                got: fingerprint.len(),
            });
        }

        heap.push(HeapEntry {
            distance: target.distance_to(fingerprint),
            order,
            id: id.clone(),
        });
        if heap.len() > keep {
            heap.pop();
        }
    }

    let neighbors = heap
        .into_sorted_vec()
        .into_iter()
        .filter(|entry| entry.id != target_id)
        .map(|entry| Neighbor {
            id: entry.id,
            distance: entry.distance,
        })
        .take(k)
        .collect();

    Ok(neighbors)
}
