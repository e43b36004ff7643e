//! Integration tests for the liveness engine
//!
//! Tests the full path: landmarks → classifier → stability → session → output

use kyclive::core::{classifier, LivenessSession};
use kyclive::types::{
    FaceLandmarks, Frame, HeadAngle, KycError, Photo, Point, ReasonCode, SessionConfig,
    SessionPhase, TickOutput,
};
use kyclive::{ANGLE_RATIO_THRESHOLD, DETECTION_TICK_MS, REQUIRED_STABLE_MS};

fn face_at(nose_x: f64) -> FaceLandmarks {
    FaceLandmarks::from_key_points(
        Point::new(0.0, 50.0),
        Point::new(100.0, 50.0),
        Point::new(nose_x, 80.0),
    )
}

fn face_for(angle: HeadAngle) -> FaceLandmarks {
    match angle {
        HeadAngle::Front => face_at(50.0),
        HeadAngle::Left => face_at(70.0),
        HeadAngle::Right => face_at(30.0),
    }
}

fn frame() -> Frame {
    Frame::new(Photo::placeholder())
}

fn ready_session(config: SessionConfig) -> LivenessSession {
    let mut session = LivenessSession::new(config);
    session.mark_estimator_ready();
    session
}

fn start_active(session: &mut LivenessSession) {
    let generation = session.start().unwrap();
    while session.phase() == SessionPhase::Countdown {
        session.countdown_tick(generation);
    }
}

fn tick(session: &mut LivenessSession, faces: &[FaceLandmarks]) -> TickOutput {
    let permit = session.begin_tick().expect("session should accept ticks");
    session
        .finish_tick(permit, faces, &frame())
        .expect("tick should apply")
}

/// Full path: landmark geometry through classification to step capture
#[test]
fn test_full_liveness_path() {
    let mut session = ready_session(SessionConfig::default());
    start_active(&mut session);

    let faces = vec![face_for(HeadAngle::Front)];
    let output = tick(&mut session, &faces);

    assert!(output.face_detected);
    assert_eq!(output.angle, Some(HeadAngle::Front));
    assert_eq!(output.step, HeadAngle::Front);
    assert!(output.recording);
    assert!(!output.reason.code().is_empty());
}

/// Default timing: 3000ms continuous at 100ms ticks is exactly 30 ticks
/// per step; the 30th tick captures
#[test]
fn test_default_timing_thirty_ticks_per_step() {
    let mut session = ready_session(SessionConfig::default());
    start_active(&mut session);

    let ticks_per_step = (REQUIRED_STABLE_MS / DETECTION_TICK_MS) as usize;
    assert_eq!(ticks_per_step, 30);

    let faces = vec![face_for(HeadAngle::Front)];
    for i in 1..ticks_per_step {
        let output = tick(&mut session, &faces);
        assert_eq!(output.stable_ms, (i as u64) * DETECTION_TICK_MS);
        assert!(output.captured_step.is_none(), "captured early at tick {}", i);
    }

    let output = tick(&mut session, &faces);
    assert_eq!(output.captured_step, Some(HeadAngle::Front));
    assert_eq!(output.reason, ReasonCode::L004_STEP_SATISFIED);
}

/// Holding the wrong pose resets accumulated time; capture needs a fresh
/// unbroken run
#[test]
fn test_interruption_restarts_stability_clock() {
    let mut session = ready_session(SessionConfig::default());
    start_active(&mut session);

    let front = vec![face_for(HeadAngle::Front)];
    for _ in 0..15 {
        tick(&mut session, &front);
    }

    // One glance away resets everything
    let away = vec![face_for(HeadAngle::Left)];
    let output = tick(&mut session, &away);
    assert_eq!(output.stable_ms, 0);
    assert_eq!(output.reason, ReasonCode::L002_ANGLE_MISMATCH);

    // 29 more matched ticks are not enough
    for _ in 0..29 {
        let output = tick(&mut session, &front);
        assert!(output.captured_step.is_none());
    }
    let output = tick(&mut session, &front);
    assert_eq!(output.captured_step, Some(HeadAngle::Front));
}

/// Full three-step completion delivers the photo map and video artifact
#[test]
fn test_complete_session_produces_all_artifacts() {
    let config = SessionConfig {
        required_stable_ms: 300,
        ..SessionConfig::default()
    };
    let mut session = ready_session(config);
    start_active(&mut session);

    let mut last = None;
    for angle in HeadAngle::SEQUENCE {
        let faces = vec![face_for(angle)];
        loop {
            let output = tick(&mut session, &faces);
            if output.captured_step == Some(angle) {
                last = Some(output);
                break;
            }
        }
    }

    let last = last.unwrap();
    assert_eq!(last.phase, SessionPhase::Complete);
    assert_eq!(last.reason, ReasonCode::L004_SESSION_COMPLETE);
    let completed = last.completed.expect("completing tick carries the map");
    assert!(completed.is_complete());

    // Recording stopped on completion and finalizes exactly once
    assert!(!session.is_recording());
    let artifact = session.finalize_recording().expect("video was recorded");
    assert!(artifact.uri.starts_with("blob:sha256:"));
    assert!(artifact.byte_len > 0);

    let data = session.liveness_data();
    assert!(data.angles.is_complete());
    assert_eq!(data.video.as_ref(), Some(&artifact));
}

/// Pause mid-step, resume: captured photos survive, progress on the
/// interrupted step restarts, recording appends
#[test]
fn test_pause_resume_mid_session() {
    let config = SessionConfig {
        required_stable_ms: 300,
        ..SessionConfig::default()
    };
    let mut session = ready_session(config);
    start_active(&mut session);

    // Capture FRONT, then partial progress on LEFT
    let front = vec![face_for(HeadAngle::Front)];
    loop {
        if tick(&mut session, &front).captured_step.is_some() {
            break;
        }
    }
    let left = vec![face_for(HeadAngle::Left)];
    tick(&mut session, &left);

    session.pause().unwrap();
    assert_eq!(session.phase(), SessionPhase::Paused);
    assert!(!session.is_recording());
    assert_eq!(session.captured().count(), 1);

    let generation = session.resume().unwrap();
    while session.phase() == SessionPhase::Countdown {
        session.countdown_tick(generation);
    }
    assert!(session.is_recording());
    assert_eq!(session.step_index(), 1);

    // Finish the remaining steps after the pause
    for angle in [HeadAngle::Left, HeadAngle::Right] {
        let faces = vec![face_for(angle)];
        loop {
            if tick(&mut session, &faces).captured_step.is_some() {
                break;
            }
        }
    }
    assert_eq!(session.phase(), SessionPhase::Complete);
    assert!(session.finalize_recording().is_some());
}

/// A countdown timer from before a pause must never fire into the
/// resumed session
#[test]
fn test_stale_timer_cannot_advance_resumed_countdown() {
    let mut session = ready_session(SessionConfig::default());
    let old = session.start().unwrap();
    session.countdown_tick(old); // 3 → 2
    session.pause().unwrap();

    let fresh = session.resume().unwrap();
    assert_eq!(session.countdown(), Some(3));

    assert_eq!(session.countdown_tick(old), None);
    assert_eq!(session.countdown(), Some(3));

    assert_eq!(session.countdown_tick(fresh), Some(Some(2)));
}

/// Step timeout surfaces a recoverable error and the user retries the
/// same step in place
#[test]
fn test_timeout_then_successful_retry() {
    let config = SessionConfig {
        required_stable_ms: 300,
        timeout_ms: 600,
        ..SessionConfig::default()
    };
    let mut session = ready_session(config);
    start_active(&mut session);

    let wrong = vec![face_for(HeadAngle::Right)];
    let mut saw_timeout = false;
    for _ in 0..6 {
        saw_timeout |= tick(&mut session, &wrong).reason == ReasonCode::L005_STEP_TIMEOUT;
    }
    assert!(saw_timeout);
    assert!(matches!(
        session.last_error(),
        Some(KycError::StepFailed { step: HeadAngle::Front, .. })
    ));
    assert_eq!(session.phase(), SessionPhase::Active);

    session.dismiss_error();

    // Same step, fresh attempt
    let front = vec![face_for(HeadAngle::Front)];
    loop {
        let output = tick(&mut session, &front);
        if output.captured_step == Some(HeadAngle::Front) {
            break;
        }
    }
    assert_eq!(session.step_index(), 1);
}

/// Classification is deterministic over the same geometry
#[test]
fn test_classifier_determinism() {
    let face = face_at(63.7);
    let a = classifier::classify(&face, ANGLE_RATIO_THRESHOLD).unwrap();
    let b = classifier::classify(&face, ANGLE_RATIO_THRESHOLD).unwrap();
    let c = classifier::classify(&face, ANGLE_RATIO_THRESHOLD).unwrap();

    assert_eq!(a, b);
    assert_eq!(b, c);
}

/// Mirrored mapping: nose offset toward positive x reads as LEFT
#[test]
fn test_mirrored_angle_mapping() {
    let left = classifier::classify(&face_at(70.0), ANGLE_RATIO_THRESHOLD).unwrap();
    assert_eq!(left.angle, HeadAngle::Left);

    let right = classifier::classify(&face_at(30.0), ANGLE_RATIO_THRESHOLD).unwrap();
    assert_eq!(right.angle, HeadAngle::Right);

    let front = classifier::classify(&face_at(52.0), ANGLE_RATIO_THRESHOLD).unwrap();
    assert_eq!(front.angle, HeadAngle::Front);
}

/// Tick output serializes and deserializes cleanly
#[test]
fn test_json_output_valid() {
    let mut session = ready_session(SessionConfig::default());
    start_active(&mut session);

    let output = tick(&mut session, &[face_for(HeadAngle::Front)]);

    let json = serde_json::to_string(&output).unwrap();
    assert!(json.contains("\"phase\""));
    assert!(json.contains("\"ratio\""));
    assert!(json.contains("\"reason\""));

    let _: TickOutput = serde_json::from_str(&json).unwrap();
}

/// Parseable output format contains the expected fields
#[test]
fn test_parseable_output_format() {
    let mut session = ready_session(SessionConfig::default());
    start_active(&mut session);

    let output = tick(&mut session, &[face_for(HeadAngle::Front)]);
    let formatted = output.to_parseable_string();

    assert!(formatted.contains("step="));
    assert!(formatted.contains("angle="));
    assert!(formatted.contains("ratio="));
    assert!(formatted.contains("stable="));
    assert!(formatted.contains("reason="));
}
