//! Per-tick output structure for terminal display and live updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CapturedAngles, HeadAngle, ReasonCode, SessionPhase};

/// Output of one detection tick against the liveness session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickOutput {
    /// Timestamp
    pub timestamp: DateTime<Utc>,
    /// Session phase after this tick
    pub phase: SessionPhase,
    /// The step that was being tracked
    pub step: HeadAngle,
    /// Was a usable face present this tick?
    pub face_detected: bool,
    /// Classified angle, when a face was present
    pub angle: Option<HeadAngle>,
    /// Nose-offset ratio, when a face was present
    pub ratio: Option<f64>,
    /// Continuously matched time for the current step (ms)
    pub stable_ms: u64,
    /// Step progress 0.0..=1.0
    pub progress: f64,
    /// Is the continuous recording running?
    pub recording: bool,
    /// Why this tick produced this outcome
    pub reason: ReasonCode,
    /// Set when this tick captured a step photo
    pub captured_step: Option<HeadAngle>,
    /// Set on the tick that completed the session: the full captured-angle
    /// map, including the just-captured final photo. Handed over explicitly
    /// so the consumer never reads a stale map.
    pub completed: Option<CapturedAngles>,
}

impl TickOutput {
    /// Format for terminal display (with colors)
    pub fn to_terminal_string(&self) -> String {
        let color = self.phase.color_code();
        let reset = SessionPhase::color_reset();
        let angle = self
            .angle
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let ratio = self
            .ratio
            .map(|r| format!("{:.3}", r))
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{}{} step={} angle={} ratio={} | stable={:.1}s ({:>3.0}%) | {}{}",
            color,
            self.phase.emoji(),
            self.step,
            angle,
            ratio,
            self.stable_ms as f64 / 1000.0,
            self.progress * 100.0,
            self.reason.code(),
            reset
        )
    }

    /// Format for parseable output (no colors)
    pub fn to_parseable_string(&self) -> String {
        let angle = self
            .angle
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let ratio = self
            .ratio
            .map(|r| format!("{:.3}", r))
            .unwrap_or_else(|| "-".to_string());

        format!(
            "step={} | angle={} | ratio={} | stable={:.1}s | progress={:.0}% | reason={}",
            self.step,
            angle,
            ratio,
            self.stable_ms as f64 / 1000.0,
            self.progress * 100.0,
            self.reason.code()
        )
    }
}
