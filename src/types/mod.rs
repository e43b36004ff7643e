//! Core types for KYCLive

mod angle;
mod artifact;
mod document;
mod error;
mod landmarks;
mod output;
mod phase;
mod reason;
mod record;
mod step;

pub use angle::HeadAngle;
pub use artifact::{CapturedAngles, LivenessData, Photo, VideoArtifact, VideoChunk};
pub use document::{DocumentSide, DocumentType, FlowStage, KycDocument};
pub use error::KycError;
pub use landmarks::{FaceLandmarks, Frame, Point, PoseSample};
pub use output::TickOutput;
pub use phase::SessionPhase;
pub use reason::ReasonCode;
pub use record::{KycRecord, RecordDigests};
pub use step::{SessionConfig, StepProgress, StepTarget};
