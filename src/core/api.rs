//! HTTP + WebSocket API for KYCLive
//!
//! Endpoints:
//! - POST /session/new - Create new verification session
//! - GET /session/{id} - Get session status
//! - POST /session/{id}/document/select - Choose document type
//! - POST /session/{id}/document/capture - Store one document side
//! - POST /session/{id}/liveness/start - Begin the liveness countdown
//! - POST /session/{id}/liveness/tick - Feed one detection tick
//! - POST /session/{id}/liveness/pause | /resume - Pause control
//! - POST /session/{id}/reset - Discard everything, start over
//! - GET /session/{id}/record - Get the composed record
//! - WS /ws/{id} - Live updates
//! - GET /health - Health check

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::core::export::save_record;
use crate::core::{KycFlow, LivenessSession};
use crate::types::{
    DocumentSide, DocumentType, FaceLandmarks, FlowStage, Frame, KycError, KycRecord, Photo,
    Point, SessionConfig, TickOutput,
};
use crate::COUNTDOWN_TICK_MS;

/// Session state: outer flow plus the liveness state machine
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub flow: KycFlow,
    pub liveness: LivenessSession,
    pub saved_record_path: Option<String>,
    pub update_tx: broadcast::Sender<SessionUpdate>,
}

/// Live update message pushed to WebSocket subscribers
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    pub stage: String,
    pub phase: String,
    pub step: String,
    pub countdown: Option<u8>,
    pub stable_ms: u64,
    pub progress: f64,
    pub recording: bool,
    pub captured_count: usize,
    pub record_available: bool,
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, Session>>,
    pub artifact_dir: String,
}

/// Create new session request; every knob is optional
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    pub threshold: Option<f64>,
    pub required_stable_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub tick_ms: Option<u64>,
    pub countdown_seconds: Option<u8>,
    pub supported_mime_types: Option<Vec<String>>,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub stage: String,
    pub phase: String,
    pub document_type: Option<String>,
    pub document_side: String,
    pub step: String,
    pub countdown: Option<u8>,
    pub stable_ms: u64,
    pub progress: f64,
    pub captured_count: usize,
    pub recording: bool,
    pub video_processing: bool,
    pub record_available: bool,
    pub last_error: Option<String>,
}

/// Choose document type
#[derive(Debug, Deserialize)]
pub struct SelectDocumentRequest {
    pub doc_type: DocumentType,
}

/// Store one document side
#[derive(Debug, Deserialize)]
pub struct CaptureDocumentRequest {
    pub side: DocumentSide,
    pub photo: String,
}

/// Start/resume response: the countdown generation now running
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub generation: u64,
    pub countdown: Option<u8>,
    pub phase: String,
}

/// Estimator output for one face, as the three key landmarks
#[derive(Debug, Deserialize)]
pub struct FacePoints {
    pub left_eye: Point,
    pub right_eye: Point,
    pub nose: Point,
}

/// One detection tick: the frame snapshot plus what the estimator saw
#[derive(Debug, Deserialize)]
pub struct TickRequest {
    /// First detected face, absent when the estimator saw none
    pub face: Option<FacePoints>,
    /// Encoded JPEG still of this frame as a data URI
    pub frame: String,
}

/// Tick response wraps the engine output plus record availability
#[derive(Debug, Serialize)]
pub struct TickResponse {
    pub output: TickOutput,
    pub record_available: bool,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

/// Create the API router
pub fn create_router(artifact_dir: String) -> Router {
    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        artifact_dir,
    });

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session))
        .route("/session/:id/document/select", post(select_document))
        .route("/session/:id/document/capture", post(capture_document))
        .route("/session/:id/liveness/start", post(start_liveness))
        .route("/session/:id/liveness/tick", post(liveness_tick))
        .route("/session/:id/liveness/pause", post(pause_liveness))
        .route("/session/:id/liveness/resume", post(resume_liveness))
        .route("/session/:id/reset", post(reset_session))
        .route("/session/:id/record", get(get_record))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

fn error_response(err: KycError) -> (StatusCode, String) {
    let status = match &err {
        KycError::InvalidPhase { .. } | KycError::InvalidStage { .. } => StatusCode::CONFLICT,
        KycError::DetectionUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        KycError::CameraAccess(_) | KycError::InvalidArtifact(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, err.to_string())
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "session not found".to_string())
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Create new session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> ApiResult<NewSessionResponse> {
    let session_id = generate_session_id();
    let (tx, _) = broadcast::channel(100);

    let defaults = SessionConfig::default();
    let config = SessionConfig {
        threshold: req.threshold.unwrap_or(defaults.threshold),
        required_stable_ms: req.required_stable_ms.unwrap_or(defaults.required_stable_ms),
        timeout_ms: req.timeout_ms.unwrap_or(defaults.timeout_ms),
        tick_ms: req.tick_ms.unwrap_or(defaults.tick_ms),
        countdown_seconds: req.countdown_seconds.unwrap_or(defaults.countdown_seconds),
        supported_mime_types: req
            .supported_mime_types
            .unwrap_or(defaults.supported_mime_types),
    };

    let mut liveness = LivenessSession::new(config);
    // The server loads the pose model once at startup, so sessions are
    // born ready
    liveness.mark_estimator_ready();

    let session = Session {
        id: session_id.clone(),
        flow: KycFlow::new(),
        liveness,
        saved_record_path: None,
        update_tx: tx,
    };

    let mut sessions = state.sessions.write().await;
    sessions.insert(session_id.clone(), session);

    Ok(Json(NewSessionResponse {
        session_id: session_id.clone(),
        websocket_url: format!("/ws/{}", session_id),
    }))
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionStatusResponse> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(not_found)?;

    Ok(Json(status_of(session)))
}

/// Choose the document type
async fn select_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SelectDocumentRequest>,
) -> ApiResult<SessionStatusResponse> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;

    session
        .flow
        .select_document_type(req.doc_type)
        .map_err(error_response)?;
    broadcast_update(session);

    Ok(Json(status_of(session)))
}

/// Store one document side
async fn capture_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<CaptureDocumentRequest>,
) -> ApiResult<SessionStatusResponse> {
    let photo = Photo::parse(&req.photo).map_err(error_response)?;

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;

    session
        .flow
        .capture_document_side(req.side, photo)
        .map_err(error_response)?;
    broadcast_update(session);

    Ok(Json(status_of(session)))
}

/// Begin the liveness countdown; the 1 Hz timer runs server-side and
/// carries the issuing generation so a pause/reset supersedes it
async fn start_liveness(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StartResponse> {
    let generation = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(not_found)?;
        // Liveness only runs once the document is captured; completing a
        // session the flow cannot accept would strand it without a record
        if session.flow.stage() != FlowStage::Liveness {
            return Err(error_response(KycError::InvalidStage {
                expected: FlowStage::Liveness.to_string(),
                actual: session.flow.stage().to_string(),
            }));
        }
        let generation = session.liveness.start().map_err(error_response)?;
        broadcast_update(session);
        generation
    };

    spawn_countdown(state.clone(), id.clone(), generation);

    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(not_found)?;
    Ok(Json(StartResponse {
        generation,
        countdown: session.liveness.countdown(),
        phase: session.liveness.phase().to_string(),
    }))
}

/// Feed one detection tick
async fn liveness_tick(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TickRequest>,
) -> ApiResult<TickResponse> {
    let photo = Photo::parse(&req.frame)
        .map_err(|_| error_response(KycError::CameraAccess("frame is not an encoded image".to_string())))?;
    let frame = Frame::new(photo);
    let faces: Vec<FaceLandmarks> = req
        .face
        .map(|f| vec![FaceLandmarks::from_key_points(f.left_eye, f.right_eye, f.nose)])
        .unwrap_or_default();

    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;

    let permit = session.liveness.begin_tick().ok_or((
        StatusCode::CONFLICT,
        "session is not accepting detection ticks".to_string(),
    ))?;
    let output = session
        .liveness
        .finish_tick(permit, &faces, &frame)
        .ok_or((
            StatusCode::CONFLICT,
            "tick superseded by a concurrent pause or reset".to_string(),
        ))?;

    // Completion: finalize the recording and compose the record
    if output.completed.is_some() {
        let _ = session.liveness.finalize_recording();
        let data = session.liveness.liveness_data();
        let record = session
            .flow
            .complete_liveness(data)
            .map_err(error_response)?
            .clone();
        match save_record(&record, &state.artifact_dir) {
            Ok(path) => session.saved_record_path = Some(path),
            Err(err) => {
                // Export failure never loses the in-memory record
                eprintln!("record save failed: {}", err);
            }
        }
    }

    broadcast_update(session);

    let record_available = session.flow.record().is_some();
    Ok(Json(TickResponse {
        output,
        record_available,
    }))
}

/// Pause the liveness test
async fn pause_liveness(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionStatusResponse> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;

    session.liveness.pause().map_err(error_response)?;
    broadcast_update(session);

    Ok(Json(status_of(session)))
}

/// Resume from pause; re-runs the countdown
async fn resume_liveness(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StartResponse> {
    let generation = {
        let mut sessions = state.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or_else(not_found)?;
        let generation = session.liveness.resume().map_err(error_response)?;
        broadcast_update(session);
        generation
    };

    spawn_countdown(state.clone(), id.clone(), generation);

    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(not_found)?;
    Ok(Json(StartResponse {
        generation,
        countdown: session.liveness.countdown(),
        phase: session.liveness.phase().to_string(),
    }))
}

/// Discard everything and return to document selection
async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<SessionStatusResponse> {
    let mut sessions = state.sessions.write().await;
    let session = sessions.get_mut(&id).ok_or_else(not_found)?;

    session.flow.reset();
    session.liveness.reset();
    session.saved_record_path = None;
    broadcast_update(session);

    Ok(Json(status_of(session)))
}

/// Get the composed record for a completed session
async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<KycRecord> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(not_found)?;

    let record = session.flow.record().ok_or((
        StatusCode::NOT_FOUND,
        "verification not complete".to_string(),
    ))?;
    Ok(Json(record.clone()))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or_else(not_found)?;
    let rx = session.update_tx.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Forward broadcast updates to the socket; inbound messages are drained
/// and dropped
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<SessionUpdate>) {
    let (mut sender, mut receiver) = socket.split();

    tokio::spawn(async move { while receiver.next().await.is_some() {} });

    while let Ok(update) = rx.recv().await {
        let json = serde_json::to_string(&update).unwrap_or_default();
        if sender.send(Message::Text(json)).await.is_err() {
            break;
        }
    }
}

/// Server-side 1 Hz countdown timer. The generation it was issued with is
/// checked on every tick; a pause or reset makes the remaining ticks
/// no-ops and the task exits.
fn spawn_countdown(state: Arc<AppState>, id: String, generation: u64) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_millis(COUNTDOWN_TICK_MS)).await;

            let mut sessions = state.sessions.write().await;
            let Some(session) = sessions.get_mut(&id) else {
                break;
            };
            match session.liveness.countdown_tick(generation) {
                None => break, // superseded
                Some(value) => {
                    broadcast_update(session);
                    if value.is_none() {
                        break; // went ACTIVE
                    }
                }
            }
        }
    });
}

fn status_of(session: &Session) -> SessionStatusResponse {
    SessionStatusResponse {
        session_id: session.id.clone(),
        stage: session.flow.stage().to_string(),
        phase: session.liveness.phase().to_string(),
        document_type: session.flow.document_type().map(|t| t.to_string()),
        document_side: session.flow.document_side().to_string(),
        step: session.liveness.current_step().angle.to_string(),
        countdown: session.liveness.countdown(),
        stable_ms: session.liveness.stable_ms(),
        progress: session.liveness.progress(),
        captured_count: session.liveness.captured().count(),
        recording: session.liveness.is_recording(),
        video_processing: session.liveness.is_video_processing(),
        record_available: session.flow.record().is_some(),
        last_error: session.liveness.last_error().map(|e| e.to_string()),
    }
}

fn broadcast_update(session: &Session) {
    let update = SessionUpdate {
        stage: session.flow.stage().to_string(),
        phase: session.liveness.phase().to_string(),
        step: session.liveness.current_step().angle.to_string(),
        countdown: session.liveness.countdown(),
        stable_ms: session.liveness.stable_ms(),
        progress: session.liveness.progress(),
        recording: session.liveness.is_recording(),
        captured_count: session.liveness.captured().count(),
        record_available: session.flow.record().is_some(),
    };
    let _ = session.update_tx.send(update);
}

/// Generate session ID
fn generate_session_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("session_{:x}", nanos as u64)
}

/// Run the API server
pub async fn run_server(addr: &str, artifact_dir: String) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(artifact_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("KYCLive API running on {}", addr);
    println!("  POST /session/new                  - Create session");
    println!("  GET  /session/:id                  - Get status");
    println!("  POST /session/:id/document/select  - Choose document type");
    println!("  POST /session/:id/document/capture - Store document side");
    println!("  POST /session/:id/liveness/start   - Begin liveness countdown");
    println!("  POST /session/:id/liveness/tick    - Feed detection tick");
    println!("  POST /session/:id/liveness/pause   - Pause");
    println!("  POST /session/:id/liveness/resume  - Resume");
    println!("  POST /session/:id/reset            - Reset flow");
    println!("  GET  /session/:id/record           - Get composed record");
    println!("  WS   /ws/:id                       - Live updates");
    println!("  GET  /health                       - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
