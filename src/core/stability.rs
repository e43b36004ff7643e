//! Step stability tracker
//!
//! Debounces pose jitter: a step only satisfies after the classified angle
//! continuously matches the target for the required duration. A single
//! lucky frame of a photo held at an angle never passes. Time is counted
//! in tick intervals, not wall clock, so the tracker is deterministic.

use crate::types::{PoseSample, ReasonCode, StepProgress, StepTarget};

/// Per-step stability accumulator. One tracker per step entry; the session
/// builds a fresh one whenever a step begins.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    target: StepTarget,
    tick_ms: u64,
    /// Continuously matched time
    stable_ms: u64,
    /// Total active-tracking time on this step (for the timeout bound)
    elapsed_ms: u64,
    /// Latch: "step satisfied" already fired
    satisfied: bool,
}

impl StabilityTracker {
    /// Create a tracker for one step
    pub fn new(target: StepTarget, tick_ms: u64) -> Self {
        Self {
            target,
            tick_ms,
            stable_ms: 0,
            elapsed_ms: 0,
            satisfied: false,
        }
    }

    /// The step this tracker is accumulating for
    pub fn target(&self) -> &StepTarget {
        &self.target
    }

    /// Continuously matched time so far (ms)
    pub fn stable_ms(&self) -> u64 {
        self.stable_ms
    }

    /// Feed one detection tick. `None` means no usable face this tick.
    ///
    /// `satisfied` in the returned progress is edge-triggered: it is true
    /// exactly once, on the tick that crosses the required duration, and
    /// never again without an intervening tracker replacement.
    pub fn observe(&mut self, sample: Option<&PoseSample>) -> StepProgress {
        self.elapsed_ms += self.tick_ms;

        let reason = match sample {
            None => {
                self.stable_ms = 0;
                ReasonCode::L001_NO_FACE
            }
            Some(s) if s.angle != self.target.angle => {
                self.stable_ms = 0;
                ReasonCode::L002_ANGLE_MISMATCH
            }
            Some(_) => {
                self.stable_ms += self.tick_ms;
                ReasonCode::L003_STABILITY_ACCUMULATING
            }
        };

        let mut fired = false;
        if !self.satisfied && self.stable_ms >= self.target.required_stable_ms {
            self.satisfied = true;
            fired = true;
        }

        // Timeout is also edge-triggered; crossing it resets both clocks so
        // the failure surfaces once and the user retries from zero
        let mut timed_out = false;
        if !self.satisfied && self.elapsed_ms >= self.target.timeout_ms {
            timed_out = true;
            self.elapsed_ms = 0;
            self.stable_ms = 0;
        }

        let progress = if self.target.required_stable_ms == 0 {
            1.0
        } else {
            (self.stable_ms as f64 / self.target.required_stable_ms as f64).min(1.0)
        };

        StepProgress {
            step: self.target.angle,
            stable_ms: self.stable_ms,
            progress,
            satisfied: fired,
            timed_out,
            reason: if fired {
                ReasonCode::L004_STEP_SATISFIED
            } else if timed_out {
                ReasonCode::L005_STEP_TIMEOUT
            } else {
                reason
            },
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
