//! Per-step configuration and progress reporting

use serde::{Deserialize, Serialize};

use crate::types::{HeadAngle, ReasonCode};
use crate::{
    ANGLE_RATIO_THRESHOLD, COUNTDOWN_SECONDS, DETECTION_TICK_MS, REQUIRED_STABLE_MS,
    STEP_TIMEOUT_MS,
};

/// Static configuration for one liveness step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepTarget {
    /// The pose this step requires
    pub angle: HeadAngle,
    /// Ratio threshold separating front from left/right
    /// (fraction of inter-eye distance)
    pub threshold: f64,
    /// Continuous matched time required before capture (ms)
    pub required_stable_ms: u64,
    /// Active-tracking bound before the step reports failure (ms)
    pub timeout_ms: u64,
}

/// Session-wide tunables. Defaults mirror the production values; the CLI
/// and the API can override per session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub threshold: f64,
    pub required_stable_ms: u64,
    pub timeout_ms: u64,
    pub tick_ms: u64,
    pub countdown_seconds: u8,
    /// Video container types the platform reports as supported
    pub supported_mime_types: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            threshold: ANGLE_RATIO_THRESHOLD,
            required_stable_ms: REQUIRED_STABLE_MS,
            timeout_ms: STEP_TIMEOUT_MS,
            tick_ms: DETECTION_TICK_MS,
            countdown_seconds: COUNTDOWN_SECONDS,
            supported_mime_types: crate::PREFERRED_VIDEO_MIME_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
        }
    }
}

impl SessionConfig {
    /// The ordered 3-step sequence this config produces
    pub fn steps(&self) -> [StepTarget; 3] {
        HeadAngle::SEQUENCE.map(|angle| StepTarget {
            angle,
            threshold: self.threshold,
            required_stable_ms: self.required_stable_ms,
            timeout_ms: self.timeout_ms,
        })
    }
}

/// Stability tracker output for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepProgress {
    /// The step being tracked
    pub step: HeadAngle,
    /// Continuously matched time so far (ms)
    pub stable_ms: u64,
    /// stable_ms / required, clamped to 1.0
    pub progress: f64,
    /// Edge-triggered: true exactly once, on the tick that crosses the
    /// required stable duration
    pub satisfied: bool,
    /// Edge-triggered: true on the tick that crosses the step timeout
    pub timed_out: bool,
    /// Why this tick produced this progress
    pub reason: ReasonCode,
}
