//! Reason codes attached to every detection tick outcome

use serde::{Deserialize, Serialize};

/// Why a tick produced the output it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(non_camel_case_types)]
pub enum ReasonCode {
    // =========================================================================
    // L001: Detection
    // =========================================================================
    /// No face detected this tick; accumulator reset
    L001_NO_FACE,

    // =========================================================================
    // L002: Classification
    // =========================================================================
    /// Face detected but classified angle does not match the step target
    L002_ANGLE_MISMATCH,

    // =========================================================================
    // L003: Stability
    // =========================================================================
    /// Angle matched; stable time accumulating toward the threshold
    L003_STABILITY_ACCUMULATING,

    // =========================================================================
    // L004: Step transitions
    // =========================================================================
    /// Stable threshold crossed; step photo captured, advancing
    L004_STEP_SATISFIED,
    /// Final step satisfied; session complete, recording stopped
    L004_SESSION_COMPLETE,

    // =========================================================================
    // L005: Step failure
    // =========================================================================
    /// Step timeout crossed without satisfaction; accumulators reset
    L005_STEP_TIMEOUT,
}

impl ReasonCode {
    /// Get the code string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::L001_NO_FACE => "L001_NO_FACE",
            Self::L002_ANGLE_MISMATCH => "L002_ANGLE_MISMATCH",
            Self::L003_STABILITY_ACCUMULATING => "L003_STABILITY_ACCUMULATING",
            Self::L004_STEP_SATISFIED => "L004_STEP_SATISFIED",
            Self::L004_SESSION_COMPLETE => "L004_SESSION_COMPLETE",
            Self::L005_STEP_TIMEOUT => "L005_STEP_TIMEOUT",
        }
    }

    /// Get human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::L001_NO_FACE => "No face detected",
            Self::L002_ANGLE_MISMATCH => "Pose does not match step target",
            Self::L003_STABILITY_ACCUMULATING => "Holding pose, building stability",
            Self::L004_STEP_SATISFIED => "Step satisfied, photo captured",
            Self::L004_SESSION_COMPLETE => "All steps captured, session complete",
            Self::L005_STEP_TIMEOUT => "Step timed out without a stable pose",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
