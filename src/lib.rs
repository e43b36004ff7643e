//! KYCLive: headless KYC identity-verification engine
//!
//! Pipeline: face landmarks → angle classifier → stability tracker →
//! liveness session → KYC flow → composed record

pub mod core;
pub mod types;

// =============================================================================
// LIVENESS THRESHOLDS [C]
// =============================================================================

/// Nose-offset ratio below which the pose reads as FRONT.
/// Fraction of inter-eye distance.
pub const ANGLE_RATIO_THRESHOLD: f64 = 0.08;

/// How long the classified angle must continuously match the step target
/// before the step photo is captured (milliseconds)
pub const REQUIRED_STABLE_MS: u64 = 3000;

/// Detection sampling period (milliseconds)
pub const DETECTION_TICK_MS: u64 = 100;

/// Countdown shown before detection begins (seconds, 1 Hz tick)
pub const COUNTDOWN_SECONDS: u8 = 3;

/// Countdown tick period (milliseconds)
pub const COUNTDOWN_TICK_MS: u64 = 1000;

/// Active-tracking time after which a step reports failure (milliseconds).
/// Keeps a user who never reaches the target pose from stalling forever.
pub const STEP_TIMEOUT_MS: u64 = 30_000;

/// Face widths below this many pixels are degenerate; the tick counts as
/// "no face" rather than dividing by a near-zero inter-eye distance.
pub const MIN_FACE_WIDTH_PX: f64 = 1.0;

// =============================================================================
// LANDMARK INDICES [C] - 68-point face model
// =============================================================================

/// Outer corner of the left eye
pub const LEFT_EYE_OUTER_IDX: usize = 36;

/// Outer corner of the right eye
pub const RIGHT_EYE_OUTER_IDX: usize = 45;

/// Tip of the nose
pub const NOSE_TIP_IDX: usize = 30;

// =============================================================================
// ARTIFACT FORMATS [C]
// =============================================================================

/// Video container types in preference order; the recording pipeline picks
/// the first one the platform reports as supported
pub const PREFERRED_VIDEO_MIME_TYPES: [&str; 4] = [
    "video/webm;codecs=vp9",
    "video/webm;codecs=vp8",
    "video/webm",
    "video/mp4",
];

/// Encoding used for step photos
pub const PHOTO_MIME_TYPE: &str = "image/jpeg";

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
