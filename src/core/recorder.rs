//! Continuous session recording pipeline
//!
//! Stands in for the browser MediaRecorder: picks a container type from
//! the platform's supported set, buffers ordered chunks while active, and
//! flushes them into a single content-addressed artifact on finalize.
//!
//! Two ways recording halts:
//! - `suspend` (pause): chunks are retained, the artifact stays pending
//! - `stop` (completion): sets `processing` until `finalize` runs
//!
//! Zero buffered chunks at finalize leaves the artifact absent and clears
//! `processing`; the pipeline never hangs.

use crate::types::{KycError, VideoArtifact, VideoChunk};
use crate::PREFERRED_VIDEO_MIME_TYPES;

/// Buffered recording state for one liveness attempt
#[derive(Debug, Clone, Default)]
pub struct RecordingPipeline {
    active: bool,
    mime_type: Option<String>,
    chunks: Vec<VideoChunk>,
    artifact: Option<VideoArtifact>,
    processing: bool,
}

impl RecordingPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Is the recorder currently accepting chunks?
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Encode/flush still pending after a stop?
    pub fn is_processing(&self) -> bool {
        self.processing
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// The finalized artifact, if one was produced
    pub fn artifact(&self) -> Option<&VideoArtifact> {
        self.artifact.as_ref()
    }

    /// The container type the recording runs with, once started
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// Start (or restart after a pause) recording. Chunks from earlier
    /// segments of the same attempt are kept; the new segment appends.
    ///
    /// Picks the first preferred container type the platform supports;
    /// none supported → `RecordingUnavailable`.
    pub fn start(&mut self, supported: &[String]) -> Result<(), KycError> {
        let mime = PREFERRED_VIDEO_MIME_TYPES
            .iter()
            .find(|t| supported.iter().any(|s| s == *t))
            .ok_or(KycError::RecordingUnavailable)?;

        self.mime_type = Some(mime.to_string());
        self.active = true;
        Ok(())
    }

    /// Append one data segment. Segments arriving while the recorder is
    /// not active are dropped.
    pub fn append(&mut self, chunk: VideoChunk) {
        if self.active && !chunk.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Pause: stop accepting chunks immediately, keep everything buffered,
    /// leave the artifact pending
    pub fn suspend(&mut self) {
        self.active = false;
    }

    /// Final stop: recording ends, flush-to-artifact is now pending
    pub fn stop(&mut self) {
        if self.active {
            self.active = false;
            self.processing = true;
        }
    }

    /// Flush buffered chunks into the artifact. Sets the artifact exactly
    /// once per stop; repeat calls return the existing artifact.
    pub fn finalize(&mut self) -> Option<VideoArtifact> {
        if self.processing {
            self.processing = false;
            if !self.chunks.is_empty() {
                let mime = self
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| "video/webm".to_string());
                self.artifact = Some(VideoArtifact::from_chunks(&self.chunks, &mime));
            }
        }
        self.artifact.clone()
    }

    /// Discard everything: buffered chunks, artifact, pending flush
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// TESTS
// =============================================================================
