//! Head-pose angle classes

use serde::{Deserialize, Serialize};

/// The three discrete head poses the liveness test walks through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadAngle {
    /// Looking straight at the camera
    Front,
    /// Head turned left (nose toward the right edge of the mirrored preview)
    Left,
    /// Head turned right
    Right,
}

impl HeadAngle {
    /// Step order of the liveness test
    pub const SEQUENCE: [HeadAngle; 3] = [HeadAngle::Front, HeadAngle::Left, HeadAngle::Right];

    /// Lowercase name used in artifact filenames and JSON
    pub fn name(&self) -> &'static str {
        match self {
            HeadAngle::Front => "front",
            HeadAngle::Left => "left",
            HeadAngle::Right => "right",
        }
    }

    /// Short user instruction for this pose
    pub fn instruction(&self) -> &'static str {
        match self {
            HeadAngle::Front => "Look straight at the camera and hold still",
            HeadAngle::Left => "Turn your head LEFT and hold still",
            HeadAngle::Right => "Turn your head RIGHT and hold still",
        }
    }
}

impl std::fmt::Display for HeadAngle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
