//! Liveness session phase definitions

use serde::{Deserialize, Serialize};

/// The five possible phases of a liveness session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    /// Not started, waiting for the user
    Idle,
    /// Counting down before detection begins
    Countdown,
    /// Detection loop running, recording active
    Active,
    /// User paused the test, recording suspended
    Paused,
    /// All three steps captured; terminal until a reset
    Complete,
}

impl SessionPhase {
    /// Get ANSI color code for terminal display
    pub fn color_code(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "\x1b[90m",      // Gray
            SessionPhase::Countdown => "\x1b[33m", // Orange/Yellow
            SessionPhase::Active => "\x1b[36m",    // Cyan
            SessionPhase::Paused => "\x1b[35m",    // Magenta
            SessionPhase::Complete => "\x1b[32m",  // Green
        }
    }

    /// Reset ANSI color
    pub fn color_reset() -> &'static str {
        "\x1b[0m"
    }

    /// Get emoji for phase
    pub fn emoji(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "⏳",
            SessionPhase::Countdown => "🔢",
            SessionPhase::Active => "🎥",
            SessionPhase::Paused => "⏸",
            SessionPhase::Complete => "✅",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionPhase::Idle => "IDLE",
            SessionPhase::Countdown => "COUNTDOWN",
            SessionPhase::Active => "ACTIVE",
            SessionPhase::Paused => "PAUSED",
            SessionPhase::Complete => "COMPLETE",
        };
        write!(f, "{}", name)
    }
}
