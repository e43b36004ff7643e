//! Error taxonomy
//!
//! Every variant is recoverable at a component boundary: the flow can
//! always be fully reset. Nothing here is fatal to the process.

use serde::{Deserialize, Serialize};

use crate::types::HeadAngle;

/// Errors surfaced to the user or the API caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum KycError {
    /// Camera permission denied, device missing, or device busy.
    /// Recoverable by retry.
    CameraAccess(String),
    /// Pose model not loaded yet; gates the start action
    DetectionUnavailable,
    /// A liveness step did not satisfy within its bound. Does not
    /// transition the state machine; the user retries the step.
    StepFailed { step: HeadAngle, message: String },
    /// No supported video container, or zero captured segments. Photos
    /// are independent of video and keep working.
    RecordingUnavailable,
    /// Session operation not valid in the current phase
    InvalidPhase { expected: String, actual: String },
    /// Flow operation not valid in the current stage
    InvalidStage { expected: String, actual: String },
    /// Malformed or duplicate artifact
    InvalidArtifact(String),
    /// Record export/import IO failure
    Storage(String),
    /// Record (de)serialization failure
    Serialize(String),
}

impl std::fmt::Display for KycError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KycError::CameraAccess(detail) => write!(f, "camera access failed: {}", detail),
            KycError::DetectionUnavailable => {
                write!(f, "face detection model not loaded yet")
            }
            KycError::StepFailed { step, message } => {
                write!(f, "step '{}' failed: {}", step, message)
            }
            KycError::RecordingUnavailable => {
                write!(f, "video recording unavailable")
            }
            KycError::InvalidPhase { expected, actual } => {
                write!(f, "expected phase {}, session is {}", expected, actual)
            }
            KycError::InvalidStage { expected, actual } => {
                write!(f, "expected stage {}, flow is {}", expected, actual)
            }
            KycError::InvalidArtifact(detail) => write!(f, "invalid artifact: {}", detail),
            KycError::Storage(detail) => write!(f, "storage error: {}", detail),
            KycError::Serialize(detail) => write!(f, "serialization error: {}", detail),
        }
    }
}

impl std::error::Error for KycError {}
