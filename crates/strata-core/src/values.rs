use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A raw BM25 relevance score.
///
/// Unlike a normalized similarity score, BM25 scores are unbounded and can be
/// negative (a document can score below an all-zero-term baseline query).
/// Callers that need a non-negative display value should shift, not clamp —
/// see `strata_retrieval::pipeline::normalize_scores_for_display`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Score(f32);

impl Score {
    pub fn new(value: f32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f32 {
        self.0
    }
}

impl Default for Score {
    fn default() -> Self {
        Self(0.0)
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

impl From<f32> for Score {
    fn from(value: f32) -> Self {
        Self(value)
    }
}
