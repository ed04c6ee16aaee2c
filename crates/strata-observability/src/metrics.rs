use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Counters accumulated over a single artifact build.
///
/// Unlike a metrics registry meant for continuous export, this is a plain
/// struct filled in during one build and serialized into the build log at
/// the end of the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildMetrics {
    pub documents_parsed: u64,
    pub documents_skipped: u64,
    pub chunks_written: u64,
    pub bytes_compressed: u64,
    pub bytes_raw: u64,
    #[serde(skip, default)]
    started_at: Option<Instant>,
    pub build_duration_ms: u64,
}

impl BuildMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_document_parsed(&mut self) {
        self.documents_parsed += 1;
    }

    pub fn record_document_skipped(&mut self) {
        self.documents_skipped += 1;
    }

    pub fn record_chunks_written(&mut self, count: u64) {
        self.chunks_written += count;
    }

    pub fn record_compression(&mut self, raw_len: u64, compressed_len: u64) {
        self.bytes_raw += raw_len;
        self.bytes_compressed += compressed_len;
    }

    /// Stamp `build_duration_ms` from the elapsed time since `new()`.
    pub fn finish(&mut self) {
        if let Some(started_at) = self.started_at {
            self.build_duration_ms = elapsed_ms(started_at);
        }
    }

    pub fn compression_ratio(&self) -> f64 {
        if self.bytes_raw == 0 {
            return 1.0;
        }
        self.bytes_compressed as f64 / self.bytes_raw as f64
    }
}

fn elapsed_ms(started_at: Instant) -> u64 {
    let elapsed: Duration = started_at.elapsed();
    elapsed.as_millis() as u64
}
