//! Captured artifacts: step photos, video chunks, and the finalized
//! video artifact
//!
//! Photos and video are opaque encoded blobs. The engine validates shape
//! (a well-formed data URI) and hashes bytes for content addressing, but
//! never decodes image data.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{HeadAngle, KycError};

lazy_static! {
    /// Shape check for encoded photo blobs: data URI, image media type,
    /// base64 payload
    static ref RE_PHOTO_DATA_URI: Regex =
        Regex::new(r"^data:image/(jpeg|png);base64,[A-Za-z0-9+/]+={0,2}$").unwrap();
}

/// An opaque encoded-image blob (data-URI string)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Photo(String);

impl Photo {
    /// Validate and wrap a data-URI photo string
    pub fn parse(uri: &str) -> Result<Self, KycError> {
        if RE_PHOTO_DATA_URI.is_match(uri) {
            Ok(Self(uri.to_string()))
        } else {
            Err(KycError::InvalidArtifact(format!(
                "not an encoded image data URI ({} bytes)",
                uri.len()
            )))
        }
    }

    /// Tiny valid JPEG data URI used by the CLI simulation modes, where no
    /// real camera exists
    pub fn placeholder() -> Self {
        Self("data:image/jpeg;base64,/9j/4AAQSkZJRgABAQAAAQ==".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 over the encoded bytes (content address)
    pub fn digest(&self) -> [u8; 32] {
        sha256(self.0.as_bytes())
    }

    pub fn byte_len(&self) -> usize {
        self.0.len()
    }
}

/// One buffered segment of the continuous session recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoChunk(pub Vec<u8>);

impl VideoChunk {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The finalized session recording, content-addressed by digest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoArtifact {
    /// Content-addressed URI (stands in for the browser blob URL)
    pub uri: String,
    /// Container type the recording was encoded with
    pub mime_type: String,
    /// Total bytes across all flushed chunks
    pub byte_len: usize,
}

impl VideoArtifact {
    /// Flush ordered chunks into a content-addressed artifact
    pub fn from_chunks(chunks: &[VideoChunk], mime_type: &str) -> Self {
        let mut hasher = Sha256::new();
        let mut byte_len = 0;
        for chunk in chunks {
            hasher.update(&chunk.0);
            byte_len += chunk.len();
        }
        let digest: [u8; 32] = hasher.finalize().into();
        Self {
            uri: format!("blob:sha256:{}", hex(&digest)),
            mime_type: mime_type.to_string(),
            byte_len,
        }
    }

    /// Digest bytes extracted back out of the URI, for record validation
    pub fn digest_hex(&self) -> &str {
        self.uri.strip_prefix("blob:sha256:").unwrap_or("")
    }
}

/// Write-once map of step photos, assembled monotonically front → left →
/// right during one attempt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapturedAngles {
    pub front: Option<Photo>,
    pub left: Option<Photo>,
    pub right: Option<Photo>,
}

impl CapturedAngles {
    pub fn get(&self, angle: HeadAngle) -> Option<&Photo> {
        match angle {
            HeadAngle::Front => self.front.as_ref(),
            HeadAngle::Left => self.left.as_ref(),
            HeadAngle::Right => self.right.as_ref(),
        }
    }

    /// Store a step photo. Entries are write-once per attempt: a second
    /// write to the same slot is rejected.
    pub fn set(&mut self, angle: HeadAngle, photo: Photo) -> Result<(), KycError> {
        let slot = match angle {
            HeadAngle::Front => &mut self.front,
            HeadAngle::Left => &mut self.left,
            HeadAngle::Right => &mut self.right,
        };
        if slot.is_some() {
            return Err(KycError::InvalidArtifact(format!(
                "step photo for '{}' already captured",
                angle
            )));
        }
        *slot = Some(photo);
        Ok(())
    }

    /// All three step photos present?
    pub fn is_complete(&self) -> bool {
        self.front.is_some() && self.left.is_some() && self.right.is_some()
    }

    pub fn count(&self) -> usize {
        HeadAngle::SEQUENCE
            .iter()
            .filter(|a| self.get(**a).is_some())
            .count()
    }
}

/// Everything the liveness session hands upward on completion
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LivenessData {
    pub angles: CapturedAngles,
    pub video: Option<VideoArtifact>,
}

/// SHA-256 helper
pub(crate) fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

/// Lowercase hex helper
pub(crate) fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

// =============================================================================
// TESTS
// =============================================================================
