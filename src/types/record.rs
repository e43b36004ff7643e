//! The composed verification record produced at flow completion
//!
//! Key invariant: a record is only created once the document and all three
//! liveness photos are present. Each artifact is content-addressed with a
//! SHA-256 digest so an exported record can be validated on import.

use serde::{Deserialize, Serialize};

use crate::types::artifact::hex;
use crate::types::{KycDocument, KycError, LivenessData, Photo};

/// Hex digests of every artifact in the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordDigests {
    pub document_front: String,
    pub document_back: Option<String>,
    pub liveness_front: String,
    pub liveness_left: String,
    pub liveness_right: String,
    pub video: Option<String>,
}

/// The final composed KYC record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycRecord {
    pub id: String,
    pub timestamp_unix: i64,
    pub document: KycDocument,
    pub liveness: LivenessData,
    pub digests: RecordDigests,
}

impl KycRecord {
    /// Compose the final record. Fails if any required artifact is missing.
    pub fn compose(document: KycDocument, liveness: LivenessData) -> Result<Self, KycError> {
        if !document.is_complete() {
            return Err(KycError::InvalidArtifact(
                "document capture incomplete".to_string(),
            ));
        }
        if !liveness.angles.is_complete() {
            return Err(KycError::InvalidArtifact(
                "liveness capture incomplete".to_string(),
            ));
        }

        let digests = RecordDigests {
            document_front: photo_digest(document.front.as_ref())?,
            document_back: document.back.as_ref().map(|p| hex(&p.digest())),
            liveness_front: photo_digest(liveness.angles.front.as_ref())?,
            liveness_left: photo_digest(liveness.angles.left.as_ref())?,
            liveness_right: photo_digest(liveness.angles.right.as_ref())?,
            video: liveness.video.as_ref().map(|v| v.digest_hex().to_string()),
        };

        let now = chrono::Utc::now();
        let id = format!(
            "kyc_{}_{}",
            now.format("%Y%m%d_%H%M%S"),
            &digests.liveness_front[0..8]
        );

        Ok(Self {
            id,
            timestamp_unix: now.timestamp(),
            document,
            liveness,
            digests,
        })
    }

    /// Recompute every digest and compare against the stored ones
    pub fn validate(&self) -> Result<(), KycError> {
        let recomputed = RecordDigests {
            document_front: photo_digest(self.document.front.as_ref())?,
            document_back: self.document.back.as_ref().map(|p| hex(&p.digest())),
            liveness_front: photo_digest(self.liveness.angles.front.as_ref())?,
            liveness_left: photo_digest(self.liveness.angles.left.as_ref())?,
            liveness_right: photo_digest(self.liveness.angles.right.as_ref())?,
            video: self
                .liveness
                .video
                .as_ref()
                .map(|v| v.digest_hex().to_string()),
        };

        if recomputed != self.digests {
            return Err(KycError::InvalidArtifact(
                "record digests do not match artifacts".to_string(),
            ));
        }
        Ok(())
    }
}

fn photo_digest(photo: Option<&Photo>) -> Result<String, KycError> {
    photo
        .map(|p| hex(&p.digest()))
        .ok_or_else(|| KycError::InvalidArtifact("missing required artifact".to_string()))
}

// =============================================================================
// TESTS
// =============================================================================
