//! Core modules for KYCLive

pub mod api;
pub mod classifier;
pub mod export;
pub mod flow;
pub mod recorder;
pub mod session;
pub mod stability;

pub use api::{create_router, run_server};
pub use classifier::{classify, estimate, AngleEstimate};
pub use export::{load_and_validate_record, load_record, save_record};
pub use flow::KycFlow;
pub use recorder::RecordingPipeline;
pub use session::{LivenessSession, TickPermit};
pub use stability::StabilityTracker;
