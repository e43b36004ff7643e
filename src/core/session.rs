//! Liveness session controller: the state machine driving one
//! verification attempt
//!
//! Phase transitions:
//! - IDLE → COUNTDOWN: start (gated on the estimator being ready)
//! - COUNTDOWN → ACTIVE: countdown expires; recording + detection begin
//! - ACTIVE → ACTIVE: step satisfied, photo captured, next step
//! - ACTIVE → COMPLETE: final step satisfied; recording stops, the full
//!   captured-angle map is handed over in the same tick output
//! - ACTIVE|COUNTDOWN → PAUSED: recording suspended, countdown cancelled
//! - PAUSED → COUNTDOWN: resume re-runs the countdown, recording appends
//! - any → IDLE: reset discards everything
//!
//! Stale timers and overlapping detections are invalidated by a monotonic
//! generation counter: a countdown tick or detection permit issued before
//! a pause/reset/restart is ignored when it lands.

use chrono::Utc;

use crate::core::classifier;
use crate::core::recorder::RecordingPipeline;
use crate::core::stability::StabilityTracker;
use crate::types::{
    CapturedAngles, FaceLandmarks, Frame, KycError, LivenessData, ReasonCode, SessionConfig,
    SessionPhase, StepTarget, TickOutput, VideoArtifact, VideoChunk,
};

/// Permission to run one detection pass. Non-copyable: it must be handed
/// back to `finish_tick`, which serializes inference — a second
/// `begin_tick` before that returns nothing and the overlapping tick is
/// dropped.
#[derive(Debug)]
pub struct TickPermit {
    generation: u64,
}

/// One liveness verification attempt
#[derive(Debug)]
pub struct LivenessSession {
    config: SessionConfig,
    steps: [StepTarget; 3],
    phase: SessionPhase,
    /// Bumped on every start/pause/resume/reset; stale async callbacks
    /// carry an older value and are ignored
    generation: u64,
    detection_busy: bool,
    current_step_index: usize,
    tracker: Option<StabilityTracker>,
    captured: CapturedAngles,
    recording: RecordingPipeline,
    countdown: Option<u8>,
    estimator_ready: bool,
    last_error: Option<KycError>,
    update_count: u64,
}

impl Default for LivenessSession {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl LivenessSession {
    /// Create a session in IDLE with the estimator not yet ready
    pub fn new(config: SessionConfig) -> Self {
        let steps = config.steps();
        Self {
            config,
            steps,
            phase: SessionPhase::Idle,
            generation: 0,
            detection_busy: false,
            current_step_index: 0,
            tracker: None,
            captured: CapturedAngles::default(),
            recording: RecordingPipeline::new(),
            countdown: None,
            estimator_ready: false,
            last_error: None,
            update_count: 0,
        }
    }

    /// Signal that the pose model finished loading; start is gated on this
    pub fn mark_estimator_ready(&mut self) {
        self.estimator_ready = true;
    }

    pub fn is_estimator_ready(&self) -> bool {
        self.estimator_ready
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Index of the step currently being tracked (0..2)
    pub fn step_index(&self) -> usize {
        self.current_step_index
    }

    /// The step currently being tracked. After completion this stays on
    /// the final step.
    pub fn current_step(&self) -> StepTarget {
        self.steps[self.current_step_index.min(self.steps.len() - 1)]
    }

    pub fn captured(&self) -> &CapturedAngles {
        &self.captured
    }

    pub fn countdown(&self) -> Option<u8> {
        self.countdown
    }

    /// Continuously matched time on the current step (ms); zero outside
    /// ACTIVE
    pub fn stable_ms(&self) -> u64 {
        self.tracker.as_ref().map(|t| t.stable_ms()).unwrap_or(0)
    }

    /// Current-step progress 0.0..=1.0
    pub fn progress(&self) -> f64 {
        if self.config.required_stable_ms == 0 {
            return if self.tracker.is_some() { 1.0 } else { 0.0 };
        }
        (self.stable_ms() as f64 / self.config.required_stable_ms as f64).min(1.0)
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_active()
    }

    pub fn is_video_processing(&self) -> bool {
        self.recording.is_processing()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Most recent recoverable error (step timeout, recording
    /// unavailable), cleared on start/reset or dismiss
    pub fn last_error(&self) -> Option<&KycError> {
        self.last_error.as_ref()
    }

    /// User dismissed the error message
    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Begin the test: IDLE → COUNTDOWN (or straight to ACTIVE when the
    /// countdown is configured to zero).
    ///
    /// Returns the generation the caller's countdown timer must present on
    /// every tick; ticks with an older generation are ignored.
    pub fn start(&mut self) -> Result<u64, KycError> {
        if self.phase != SessionPhase::Idle {
            return Err(KycError::InvalidPhase {
                expected: SessionPhase::Idle.to_string(),
                actual: self.phase.to_string(),
            });
        }
        if !self.estimator_ready {
            return Err(KycError::DetectionUnavailable);
        }

        self.generation += 1;
        self.last_error = None;
        self.begin_countdown();
        Ok(self.generation)
    }

    /// One 1 Hz countdown tick from the timer started by `start`/`resume`.
    ///
    /// Returns `None` when the tick is stale (superseded generation or the
    /// countdown was cancelled); `Some(Some(n))` for the next displayed
    /// value; `Some(None)` when the countdown expired and the session went
    /// ACTIVE.
    pub fn countdown_tick(&mut self, generation: u64) -> Option<Option<u8>> {
        if generation != self.generation || self.phase != SessionPhase::Countdown {
            return None;
        }
        let value = self.countdown?;
        if value <= 1 {
            self.countdown = None;
            self.enter_active();
            Some(None)
        } else {
            self.countdown = Some(value - 1);
            Some(self.countdown)
        }
    }

    /// Pause: suspend recording immediately (chunks kept, artifact stays
    /// pending) and cancel any in-flight countdown or detection
    pub fn pause(&mut self) -> Result<(), KycError> {
        match self.phase {
            SessionPhase::Active | SessionPhase::Countdown => {
                self.generation += 1;
                self.countdown = None;
                self.detection_busy = false;
                self.recording.suspend();
                self.phase = SessionPhase::Paused;
                Ok(())
            }
            other => Err(KycError::InvalidPhase {
                expected: "ACTIVE or COUNTDOWN".to_string(),
                actual: other.to_string(),
            }),
        }
    }

    /// Resume from pause: re-run the countdown, then restart recording
    /// with a new segment appended to the prior chunks
    pub fn resume(&mut self) -> Result<u64, KycError> {
        if self.phase != SessionPhase::Paused {
            return Err(KycError::InvalidPhase {
                expected: SessionPhase::Paused.to_string(),
                actual: self.phase.to_string(),
            });
        }
        self.generation += 1;
        self.begin_countdown();
        Ok(self.generation)
    }

    /// Full reset from any phase: back to IDLE, step 0, captured photos
    /// cleared, buffered video discarded, all pending timers invalidated
    pub fn reset(&mut self) {
        self.generation += 1;
        self.phase = SessionPhase::Idle;
        self.countdown = None;
        self.detection_busy = false;
        self.current_step_index = 0;
        self.tracker = None;
        self.captured = CapturedAngles::default();
        self.recording.reset();
        self.last_error = None;
    }

    /// Claim the detection slot for one tick. `None` outside ACTIVE or
    /// while a previous detection is still in flight (that tick is
    /// dropped, never queued).
    pub fn begin_tick(&mut self) -> Option<TickPermit> {
        if self.phase != SessionPhase::Active || self.detection_busy {
            return None;
        }
        self.detection_busy = true;
        Some(TickPermit {
            generation: self.generation,
        })
    }

    /// Apply the result of one detection pass: estimator faces plus the
    /// read-only frame snapshot they came from.
    ///
    /// Returns `None` when the permit was superseded (pause/reset landed
    /// while inference was in flight).
    pub fn finish_tick(
        &mut self,
        permit: TickPermit,
        faces: &[FaceLandmarks],
        frame: &Frame,
    ) -> Option<TickOutput> {
        self.detection_busy = false;
        if permit.generation != self.generation || self.phase != SessionPhase::Active {
            return None;
        }
        self.update_count += 1;

        // The continuous recording consumes the same frame snapshot
        if self.recording.is_active() {
            self.recording
                .append(VideoChunk(frame.photo.as_str().as_bytes().to_vec()));
        }

        let step = self.steps[self.current_step_index];
        let sample = faces
            .first()
            .and_then(|face| classifier::classify(face, step.threshold));

        let progress = self.tracker.as_mut()?.observe(sample.as_ref());
        let mut reason = progress.reason;
        let mut captured_step = None;
        let mut completed = None;

        if progress.timed_out {
            self.last_error = Some(KycError::StepFailed {
                step: step.angle,
                message: "pose not held long enough, try again".to_string(),
            });
        }

        if progress.satisfied {
            // Write-once: a slot can only be empty here because steps
            // advance strictly in order within one attempt
            if self.captured.set(step.angle, frame.photo.clone()).is_ok() {
                captured_step = Some(step.angle);
            }
            self.current_step_index += 1;

            if self.current_step_index >= self.steps.len() {
                self.phase = SessionPhase::Complete;
                self.tracker = None;
                self.recording.stop();
                reason = ReasonCode::L004_SESSION_COMPLETE;
                // Hand the full map over in this tick's output, final
                // photo included, so the consumer never reads stale state
                completed = Some(self.captured.clone());
            } else {
                self.tracker = Some(StabilityTracker::new(
                    self.steps[self.current_step_index],
                    self.config.tick_ms,
                ));
            }
        }

        Some(TickOutput {
            timestamp: Utc::now(),
            phase: self.phase,
            step: step.angle,
            face_detected: sample.is_some(),
            angle: sample.map(|s| s.angle),
            ratio: sample.map(|s| s.ratio),
            stable_ms: progress.stable_ms,
            progress: progress.progress,
            recording: self.recording.is_active(),
            reason,
            captured_step,
            completed,
        })
    }

    /// Flush the stopped recording into its artifact (exactly once per
    /// stop; zero buffered chunks leave the artifact absent)
    pub fn finalize_recording(&mut self) -> Option<VideoArtifact> {
        self.recording.finalize()
    }

    /// Everything this attempt produced, for hand-off to the flow
    pub fn liveness_data(&self) -> LivenessData {
        LivenessData {
            angles: self.captured.clone(),
            video: self.recording.artifact().cloned(),
        }
    }

    fn begin_countdown(&mut self) {
        if self.config.countdown_seconds == 0 {
            self.enter_active();
        } else {
            self.phase = SessionPhase::Countdown;
            self.countdown = Some(self.config.countdown_seconds);
        }
    }

    /// Countdown expired: start recording (appending across resumes) and
    /// the detection loop for the current step. A missing video container
    /// surfaces as a recoverable error; photos keep working without video.
    fn enter_active(&mut self) {
        self.phase = SessionPhase::Active;
        self.countdown = None;
        if let Err(err) = self.recording.start(&self.config.supported_mime_types) {
            self.last_error = Some(err);
        }
        self.tracker = Some(StabilityTracker::new(
            self.steps[self.current_step_index],
            self.config.tick_ms,
        ));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HeadAngle, Photo, Point};
    use pretty_assertions::assert_eq;

    fn test_config() -> SessionConfig {
        SessionConfig {
            required_stable_ms: 300, // 3 ticks at 100ms
            ..SessionConfig::default()
        }
    }

    fn ready_session(config: SessionConfig) -> LivenessSession {
        let mut session = LivenessSession::new(config);
        session.mark_estimator_ready();
        session
    }

    fn face_at(nose_x: f64) -> Vec<FaceLandmarks> {
        vec![FaceLandmarks::from_key_points(
            Point::new(0.0, 50.0),
            Point::new(100.0, 50.0),
            Point::new(nose_x, 80.0),
        )]
    }

    fn face_for(angle: HeadAngle) -> Vec<FaceLandmarks> {
        match angle {
            HeadAngle::Front => face_at(50.0),
            HeadAngle::Left => face_at(70.0),
            HeadAngle::Right => face_at(30.0),
        }
    }

    fn frame() -> Frame {
        Frame::new(Photo::placeholder())
    }

    /// Drive the countdown to expiry
    fn run_countdown(session: &mut LivenessSession, generation: u64) {
        while session.phase() == SessionPhase::Countdown {
            session.countdown_tick(generation);
        }
    }

    /// Feed matched ticks for one angle until the step advances
    fn satisfy_step(session: &mut LivenessSession, angle: HeadAngle) -> TickOutput {
        let faces = face_for(angle);
        loop {
            let permit = session.begin_tick().expect("session should accept ticks");
            let output = session
                .finish_tick(permit, &faces, &frame())
                .expect("tick should apply");
            if output.captured_step.is_some() {
                return output;
            }
        }
    }

    #[test]
    fn test_start_gated_on_estimator() {
        let mut session = LivenessSession::new(test_config());
        assert_eq!(session.start().unwrap_err(), KycError::DetectionUnavailable);

        session.mark_estimator_ready();
        assert!(session.start().is_ok());
        assert_eq!(session.phase(), SessionPhase::Countdown);
    }

    #[test]
    fn test_countdown_sequence_three_two_one_then_active() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        assert_eq!(session.countdown(), Some(3));

        assert_eq!(session.countdown_tick(generation), Some(Some(2)));
        assert_eq!(session.countdown_tick(generation), Some(Some(1)));
        assert_eq!(session.countdown_tick(generation), Some(None));
        assert_eq!(session.phase(), SessionPhase::Active);
        assert!(session.is_recording());
    }

    #[test]
    fn test_stale_countdown_generation_ignored() {
        let mut session = ready_session(test_config());
        let old_generation = session.start().unwrap();
        session.pause().unwrap();
        session.resume().unwrap();

        // Timer from before the pause fires late: must be a no-op
        assert_eq!(session.countdown_tick(old_generation), None);
        assert_eq!(session.countdown(), Some(3));
    }

    #[test]
    fn test_start_rejected_outside_idle() {
        let mut session = ready_session(test_config());
        session.start().unwrap();
        assert!(matches!(
            session.start(),
            Err(KycError::InvalidPhase { .. })
        ));
    }

    #[test]
    fn test_no_ticks_accepted_before_active() {
        let mut session = ready_session(test_config());
        assert!(session.begin_tick().is_none());
        session.start().unwrap();
        assert!(session.begin_tick().is_none()); // still counting down
    }

    #[test]
    fn test_overlapping_detection_dropped() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        let permit = session.begin_tick().unwrap();
        // Second tick fires before the first detection resolves
        assert!(session.begin_tick().is_none());

        let _ = session.finish_tick(permit, &face_for(HeadAngle::Front), &frame());
        assert!(session.begin_tick().is_some());
    }

    #[test]
    fn test_in_flight_detection_invalidated_by_pause() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        let permit = session.begin_tick().unwrap();
        session.pause().unwrap();

        // Inference resolves after the pause: result must be discarded
        assert!(session
            .finish_tick(permit, &face_for(HeadAngle::Front), &frame())
            .is_none());
    }

    #[test]
    fn test_steps_advance_in_order_and_complete() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        let first = satisfy_step(&mut session, HeadAngle::Front);
        assert_eq!(first.captured_step, Some(HeadAngle::Front));
        assert!(first.completed.is_none());
        assert_eq!(session.step_index(), 1);

        let second = satisfy_step(&mut session, HeadAngle::Left);
        assert_eq!(second.captured_step, Some(HeadAngle::Left));
        assert_eq!(session.step_index(), 2);

        let last = satisfy_step(&mut session, HeadAngle::Right);
        assert_eq!(last.reason, ReasonCode::L004_SESSION_COMPLETE);
        assert_eq!(session.phase(), SessionPhase::Complete);

        // Full map handed over in the completing tick, final photo included
        let completed = last.completed.expect("completion carries the map");
        assert!(completed.is_complete());
    }

    #[test]
    fn test_wrong_pose_never_advances_out_of_order() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        // Holding LEFT during the FRONT step accumulates nothing
        for _ in 0..20 {
            let permit = session.begin_tick().unwrap();
            let output = session
                .finish_tick(permit, &face_for(HeadAngle::Left), &frame())
                .unwrap();
            assert_eq!(output.stable_ms, 0);
            assert_eq!(output.reason, ReasonCode::L002_ANGLE_MISMATCH);
        }
        assert_eq!(session.step_index(), 0);
        assert_eq!(session.captured().count(), 0);
    }

    #[test]
    fn test_complete_is_terminal_until_reset() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);
        for angle in HeadAngle::SEQUENCE {
            satisfy_step(&mut session, angle);
        }

        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(session.begin_tick().is_none());
        assert!(matches!(session.start(), Err(KycError::InvalidPhase { .. })));

        session.reset();
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.start().is_ok());
    }

    #[test]
    fn test_completion_stops_recording_and_finalizes_once() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);
        for angle in HeadAngle::SEQUENCE {
            satisfy_step(&mut session, angle);
        }

        assert!(!session.is_recording());
        assert!(session.is_video_processing());

        let artifact = session.finalize_recording().expect("chunks were buffered");
        assert!(!session.is_video_processing());
        assert!(artifact.uri.starts_with("blob:sha256:"));

        let data = session.liveness_data();
        assert!(data.angles.is_complete());
        assert_eq!(data.video, Some(artifact));
    }

    #[test]
    fn test_pause_stops_recording_and_resume_appends() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        satisfy_step(&mut session, HeadAngle::Front);
        assert!(session.is_recording());

        session.pause().unwrap();
        assert_eq!(session.phase(), SessionPhase::Paused);
        assert!(!session.is_recording());
        // Artifact stays pending on pause, not processing
        assert!(!session.is_video_processing());

        // Captured photos survive the pause
        assert_eq!(session.captured().count(), 1);

        let generation = session.resume().unwrap();
        assert_eq!(session.phase(), SessionPhase::Countdown);
        run_countdown(&mut session, generation);
        assert!(session.is_recording());
        assert_eq!(session.step_index(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);
        satisfy_step(&mut session, HeadAngle::Front);
        satisfy_step(&mut session, HeadAngle::Left);

        session.reset();

        assert_eq!(session.phase(), SessionPhase::Idle);
        assert_eq!(session.step_index(), 0);
        assert_eq!(session.captured(), &CapturedAngles::default());
        assert!(!session.is_recording());
        assert!(!session.is_video_processing());
        assert!(session.countdown().is_none());
        assert!(session.last_error().is_none());
        assert!(session.liveness_data().video.is_none());
    }

    #[test]
    fn test_step_timeout_surfaces_recoverable_error() {
        let config = SessionConfig {
            required_stable_ms: 300,
            timeout_ms: 500,
            ..SessionConfig::default()
        };
        let mut session = ready_session(config);
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        // Never reaching FRONT: 5 ticks crosses the 500ms bound
        let mut saw_timeout = false;
        for _ in 0..5 {
            let permit = session.begin_tick().unwrap();
            let output = session
                .finish_tick(permit, &face_for(HeadAngle::Left), &frame())
                .unwrap();
            saw_timeout |= output.reason == ReasonCode::L005_STEP_TIMEOUT;
        }
        assert!(saw_timeout);
        assert!(matches!(
            session.last_error(),
            Some(KycError::StepFailed { .. })
        ));
        // No transition: still ACTIVE on step 0, user retries
        assert_eq!(session.phase(), SessionPhase::Active);
        assert_eq!(session.step_index(), 0);

        session.dismiss_error();
        assert!(session.last_error().is_none());
    }

    #[test]
    fn test_recording_unavailable_does_not_block_photos() {
        let config = SessionConfig {
            required_stable_ms: 300,
            supported_mime_types: vec![], // nothing supported
            ..SessionConfig::default()
        };
        let mut session = ready_session(config);
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        assert!(!session.is_recording());
        assert_eq!(
            session.last_error(),
            Some(&KycError::RecordingUnavailable)
        );

        // Photos are independent of video
        for angle in HeadAngle::SEQUENCE {
            satisfy_step(&mut session, angle);
        }
        assert_eq!(session.phase(), SessionPhase::Complete);
        assert!(session.finalize_recording().is_none());
        assert!(!session.is_video_processing());
    }

    #[test]
    fn test_no_face_ticks_reset_progress() {
        let mut session = ready_session(test_config());
        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        // Two matched ticks, then the face disappears
        for _ in 0..2 {
            let permit = session.begin_tick().unwrap();
            session
                .finish_tick(permit, &face_for(HeadAngle::Front), &frame())
                .unwrap();
        }
        let permit = session.begin_tick().unwrap();
        let output = session.finish_tick(permit, &[], &frame()).unwrap();

        assert!(!output.face_detected);
        assert_eq!(output.stable_ms, 0);
        assert_eq!(output.reason, ReasonCode::L001_NO_FACE);
    }

    #[test]
    fn test_stable_ms_and_progress_follow_the_tracker() {
        let mut session = ready_session(test_config());
        assert_eq!(session.stable_ms(), 0);
        assert_eq!(session.progress(), 0.0);

        let generation = session.start().unwrap();
        run_countdown(&mut session, generation);

        let permit = session.begin_tick().unwrap();
        let _ = session.finish_tick(permit, &face_for(HeadAngle::Front), &frame());
        assert_eq!(session.stable_ms(), 100);
        assert!((session.progress() - 100.0 / 300.0).abs() < 1e-9);

        // Face lost: both drop back to zero
        let permit = session.begin_tick().unwrap();
        let _ = session.finish_tick(permit, &[], &frame());
        assert_eq!(session.stable_ms(), 0);
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn test_zero_countdown_enters_active_immediately() {
        let config = SessionConfig {
            countdown_seconds: 0,
            required_stable_ms: 300,
            ..SessionConfig::default()
        };
        let mut session = ready_session(config);
        session.start().unwrap();
        assert_eq!(session.phase(), SessionPhase::Active);
    }
}
