//! API and persistence models

use serde::{Deserialize, Serialize};

/// One cataloged riff.
///
/// `duration` is informational only; it is computed at upload time and set
/// to 0.0 when the audio could not be analyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Riff {
    pub id: String,
    pub name: String,
    pub date: String,
    pub audio_url: String,
    #[serde(default)]
    pub duration: f64,
}

/// A similarity result: the matched riff plus its distance to the target.
#[derive(Debug, Clone, Serialize)]
pub struct SimilarRiff {
    pub riff: Riff,
    pub distance: f32,
}
