//! KYCLive CLI
//!
//! Usage:
//!   kyclive --sample "10 90 65"             # Classify one landmark sample
//!   kyclive --interactive                   # Interactive liveness session
//!   kyclive --flow                          # Full KYC flow (document + liveness)
//!   kyclive --serve                         # HTTP API server
//!   kyclive --sample "10 90 65" --json      # JSON output

use clap::Parser;
use colored::Colorize;
use std::io::{self, BufRead, Write};

use kyclive::core::{classifier, run_server, save_record, KycFlow, LivenessSession};
use kyclive::types::{
    DocumentType, FaceLandmarks, FlowStage, Frame, Photo, Point, SessionConfig, SessionPhase,
    TickOutput,
};
use kyclive::{COUNTDOWN_TICK_MS, VERSION};

#[derive(Parser, Debug)]
#[command(
    name = "kyclive",
    version = VERSION,
    about = "KYCLive - document capture and head-pose liveness verification",
    long_about = "KYCLive is a KYC identity-verification engine.\n\n\
                  It classifies head pose from facial landmarks and walks a user\n\
                  through a three-step liveness test (front, left, right), capturing\n\
                  a photo per pose plus a continuous video of the whole attempt.\n\n\
                  Modes:\n  \
                  --sample       Classify one landmark sample (left-eye right-eye nose x-coords)\n  \
                  --interactive  Drive a liveness session from stdin\n  \
                  --flow         Full KYC flow: document selection, capture, liveness\n  \
                  --serve        HTTP API server mode\n\n\
                  Phases:\n  \
                  IDLE        - Waiting for start\n  \
                  COUNTDOWN   - 3..2..1 before detection begins\n  \
                  ACTIVE      - Detection loop running, recording\n  \
                  PAUSED      - Recording suspended, progress kept\n  \
                  COMPLETE    - All three poses captured"
)]
struct Args {
    /// Landmark sample to classify: "left_eye_x right_eye_x nose_x"
    #[arg(short, long)]
    sample: Option<String>,

    /// Interactive liveness session - read commands and samples from stdin
    #[arg(short, long)]
    interactive: bool,

    /// Full KYC flow: document selection, capture, then liveness
    #[arg(short, long)]
    flow: bool,

    /// Run as HTTP API server
    #[arg(long)]
    serve: bool,

    /// Server address (default: 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Show classification breakdown
    #[arg(long)]
    verbose: bool,

    /// Angle ratio threshold override
    #[arg(long)]
    threshold: Option<f64>,

    /// Required continuous stable time per step (ms)
    #[arg(long)]
    stable_ms: Option<u64>,

    /// Countdown length in seconds
    #[arg(long)]
    countdown: Option<u8>,

    /// Per-step timeout (ms)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Detection tick interval (ms)
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Directory for saved records (default: ./records)
    #[arg(long, default_value = "./records")]
    record_dir: String,

    /// Disable automatic record saving in flow mode
    #[arg(long)]
    no_save: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.serve {
        run_serve(&args).await;
    } else if args.flow {
        run_flow(&args);
    } else if args.interactive {
        run_interactive(&args);
    } else if let Some(ref sample) = args.sample {
        run_sample(sample, &args);
    } else {
        // Default to interactive if no mode specified
        run_interactive(&args);
    }
}

fn session_config(args: &Args) -> SessionConfig {
    let defaults = SessionConfig::default();
    SessionConfig {
        threshold: args.threshold.unwrap_or(defaults.threshold),
        required_stable_ms: args.stable_ms.unwrap_or(defaults.required_stable_ms),
        countdown_seconds: args.countdown.unwrap_or(defaults.countdown_seconds),
        timeout_ms: args.timeout_ms.unwrap_or(defaults.timeout_ms),
        tick_ms: args.tick_ms.unwrap_or(defaults.tick_ms),
        ..defaults
    }
}

/// Classify one landmark sample
fn run_sample(sample: &str, args: &Args) {
    let config = session_config(args);
    let Some(face) = parse_sample_line(sample) else {
        eprintln!("Expected three x-coordinates: \"left_eye_x right_eye_x nose_x\"");
        std::process::exit(1);
    };

    let result = classifier::classify(&face, config.threshold);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else if args.verbose {
        print_verbose_sample(&face, config.threshold, args.no_color);
    } else {
        match result {
            Some(pose) => println!("angle={} ratio={:.3}", pose.angle, pose.ratio),
            None => println!("angle=- (landmarks unusable)"),
        }
    }
}

/// Interactive liveness session
fn run_interactive(args: &Args) {
    let mut session = LivenessSession::new(session_config(args));
    // The CLI has no model download to wait for
    session.mark_estimator_ready();

    print_header("Liveness Session", args.no_color);
    println!("Commands: start, pause, resume, reset, status, quit");
    println!("During ACTIVE, each line is one detection tick:");
    println!("  \"left_eye_x right_eye_x nose_x\"  e.g. \"10 90 65\"");
    println!("  \"none\"                           no face this tick");
    println!(
        "Goal: hold each pose for {:.1}s (front, left, right)",
        session.config().required_stable_ms as f64 / 1000.0
    );
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        let prompt = format_prompt(&session, args.no_color);
        print!("{}", prompt);
        stdout.flush().unwrap();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => break,
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            println!("\nSession ended. Ticks: {}", session.update_count());
            break;
        }
        if line.is_empty() {
            continue;
        }

        if handle_session_command(&mut session, line, args) {
            continue;
        }

        match run_tick(&mut session, line) {
            Some(output) => print_tick(&session, &output, args),
            None => {
                if session.phase() != SessionPhase::Active {
                    println!("Not in ACTIVE phase - type 'start' first");
                } else {
                    println!("Unrecognized input: {}", line);
                }
            }
        }

        if session.phase() == SessionPhase::Complete {
            print_completion(&mut session, args);
        }
    }
}

/// Full KYC flow: document selection, capture, then liveness
fn run_flow(args: &Args) {
    let mut flow = KycFlow::new();
    let mut session = LivenessSession::new(session_config(args));
    session.mark_estimator_ready();

    print_header("KYC Flow", args.no_color);
    if !args.no_save {
        println!("Completed records will be saved to: {}", args.record_dir);
    }
    println!("Type 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        match flow.stage() {
            FlowStage::DocumentSelection => {
                println!("Select document type:");
                println!("  1) ID card (front + back)");
                println!("  2) Passport (front only)");
            }
            FlowStage::DocumentCapture => {
                println!(
                    "Capture the {} side of your {} (press Enter to capture)",
                    flow.document_side(),
                    flow.document_type().map(|t| t.to_string()).unwrap_or_default()
                );
            }
            FlowStage::Liveness => {}
            FlowStage::Complete => break,
        }

        let prompt = match flow.stage() {
            FlowStage::Liveness => format_prompt(&session, args.no_color),
            _ => "> ".to_string(),
        };
        print!("{}", prompt);
        stdout.flush().unwrap();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => {}
            Err(_) => return,
        }

        let line = line.trim();
        if line.eq_ignore_ascii_case("quit") || line.eq_ignore_ascii_case("exit") {
            println!("\nFlow abandoned at {}", flow.stage());
            return;
        }

        match flow.stage() {
            FlowStage::DocumentSelection => {
                let doc_type = match line {
                    "1" => DocumentType::IdCard,
                    "2" => DocumentType::Passport,
                    _ => {
                        println!("Enter 1 or 2");
                        continue;
                    }
                };
                if let Err(e) = flow.select_document_type(doc_type) {
                    println!("{}", format_error(&e.to_string(), args.no_color));
                }
            }
            FlowStage::DocumentCapture => {
                // The CLI stands in for the camera with a placeholder still
                let side = flow.document_side();
                match flow.capture_document_side(side, Photo::placeholder()) {
                    Ok(()) => println!("Captured {} side", side),
                    Err(e) => println!("{}", format_error(&e.to_string(), args.no_color)),
                }
                if flow.stage() == FlowStage::Liveness {
                    println!();
                    println!("Document captured. Starting liveness test.");
                    println!("Commands: start, pause, resume, reset, back, status, quit");
                    println!("During ACTIVE, each line is one tick: \"lx rx nx\" or \"none\"");
                    println!();
                }
            }
            FlowStage::Liveness => {
                if line.eq_ignore_ascii_case("back") {
                    if let Err(e) = flow.back_to_document_capture() {
                        println!("{}", format_error(&e.to_string(), args.no_color));
                    } else {
                        session.reset();
                    }
                    continue;
                }
                if handle_session_command(&mut session, line, args) {
                    continue;
                }
                match run_tick(&mut session, line) {
                    Some(output) => print_tick(&session, &output, args),
                    None => {
                        if session.phase() != SessionPhase::Active {
                            println!("Not in ACTIVE phase - type 'start' first");
                        } else {
                            println!("Unrecognized input: {}", line);
                        }
                    }
                }

                if session.phase() == SessionPhase::Complete {
                    print_completion(&mut session, args);
                    let data = session.liveness_data();
                    match flow.complete_liveness(data) {
                        Ok(record) => {
                            let record = record.clone();
                            println!();
                            let msg = format!("VERIFICATION COMPLETE - record {}", record.id);
                            if args.no_color {
                                println!("{}", msg);
                            } else {
                                println!("{}", msg.green().bold());
                            }
                            if !args.no_save {
                                match save_record(&record, &args.record_dir) {
                                    Ok(path) => {
                                        if args.no_color {
                                            println!("  RECORD SAVED: {}", path);
                                        } else {
                                            println!("  {}", format!("RECORD SAVED: {}", path).cyan());
                                        }
                                    }
                                    Err(e) => {
                                        println!("{}", format_error(&format!("record save failed: {}", e), args.no_color));
                                    }
                                }
                            }
                            if args.json {
                                println!("{}", serde_json::to_string_pretty(&record).unwrap());
                            }
                        }
                        Err(e) => println!("{}", format_error(&e.to_string(), args.no_color)),
                    }
                }
            }
            FlowStage::Complete => break,
        }
    }
}

/// Shared session commands for interactive and flow modes. Returns true
/// when the line was a command.
fn handle_session_command(session: &mut LivenessSession, line: &str, args: &Args) -> bool {
    match line.to_ascii_lowercase().as_str() {
        "start" => {
            match session.start() {
                Ok(generation) => run_countdown(session, generation, args),
                Err(e) => println!("{}", format_error(&e.to_string(), args.no_color)),
            }
            true
        }
        "pause" => {
            match session.pause() {
                Ok(()) => println!("Paused. Progress and recording kept."),
                Err(e) => println!("{}", format_error(&e.to_string(), args.no_color)),
            }
            true
        }
        "resume" => {
            match session.resume() {
                Ok(generation) => run_countdown(session, generation, args),
                Err(e) => println!("{}", format_error(&e.to_string(), args.no_color)),
            }
            true
        }
        "reset" => {
            session.reset();
            println!("Session reset.");
            true
        }
        "status" => {
            print_status(session);
            true
        }
        _ => false,
    }
}

/// Drive the 1 Hz countdown synchronously, printing each value
fn run_countdown(session: &mut LivenessSession, generation: u64, args: &Args) {
    while session.phase() == SessionPhase::Countdown {
        if let Some(value) = session.countdown() {
            if args.no_color {
                println!("  {}...", value);
            } else {
                println!("  {}", format!("{}...", value).yellow().bold());
            }
        }
        std::thread::sleep(std::time::Duration::from_millis(COUNTDOWN_TICK_MS));
        if session.countdown_tick(generation).is_none() {
            break;
        }
    }
    if session.phase() == SessionPhase::Active {
        let step = session.current_step().angle;
        if args.no_color {
            println!("GO - {}", step.instruction());
        } else {
            println!("{}", format!("GO - {}", step.instruction()).cyan().bold());
        }
    }
}

/// Feed one stdin line as a detection tick
fn run_tick(session: &mut LivenessSession, line: &str) -> Option<TickOutput> {
    let faces = if line.eq_ignore_ascii_case("none") {
        Vec::new()
    } else {
        vec![parse_sample_line(line)?]
    };
    let frame = Frame::new(Photo::placeholder());

    let permit = session.begin_tick()?;
    session.finish_tick(permit, &faces, &frame)
}

/// Parse "left_eye_x right_eye_x nose_x" into a landmark set. Eye and
/// nose y-coordinates are fixed; only horizontal geometry matters for
/// angle classification.
fn parse_sample_line(line: &str) -> Option<FaceLandmarks> {
    let coords: Vec<f64> = line
        .split_whitespace()
        .map(|t| t.parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    if coords.len() != 3 {
        return None;
    }
    Some(FaceLandmarks::from_key_points(
        Point::new(coords[0], 50.0),
        Point::new(coords[1], 50.0),
        Point::new(coords[2], 80.0),
    ))
}

fn print_tick(session: &LivenessSession, output: &TickOutput, args: &Args) {
    if args.json {
        println!("{}", serde_json::to_string(output).unwrap());
        return;
    }
    if args.no_color {
        println!("{}", output.to_parseable_string());
    } else {
        println!("{}", output.to_terminal_string());
    }

    if let Some(angle) = output.captured_step {
        let msg = format!("  ✓ {} captured ({}/3)", angle, session.captured().count());
        if args.no_color {
            println!("{}", msg);
        } else {
            println!("{}", msg.green());
        }
        if output.completed.is_none() {
            println!("  Next: {}", session.current_step().angle.instruction());
        }
    }
    if let Some(err) = session.last_error() {
        println!("{}", format_error(&err.to_string(), args.no_color));
    }
}

fn print_completion(session: &mut LivenessSession, args: &Args) {
    let artifact = session.finalize_recording();
    let msg = "  ✓ LIVENESS COMPLETE - all three poses captured";
    if args.no_color {
        println!("{}", msg);
    } else {
        println!("{}", msg.green().bold());
    }
    match artifact {
        Some(video) => println!(
            "  Video: {} ({} bytes, {})",
            video.uri, video.byte_len, video.mime_type
        ),
        None => println!("  Video: unavailable (photos only)"),
    }
}

fn print_status(session: &LivenessSession) {
    println!("phase={}", session.phase());
    println!("step={} ({}/3 captured)", session.current_step().angle, session.captured().count());
    println!("recording={}", session.is_recording());
    if let Some(value) = session.countdown() {
        println!("countdown={}", value);
    }
    if let Some(err) = session.last_error() {
        println!("error={}", err);
    }
}

/// Print header
fn print_header(mode: &str, no_color: bool) {
    if no_color {
        println!("========================================");
        println!("  KYCLive v{} - {}", VERSION, mode);
        println!("========================================");
    } else {
        println!("{}", "╔═════════════════════════════════════════════════╗".bold());
        println!("{}", format!("║     KYCLive v{} - {:<28}║", VERSION, mode).bold());
        println!("{}", "╚═════════════════════════════════════════════════╝".bold());
    }
    println!();
}

/// Format the session prompt with phase color and emoji
fn format_prompt(session: &LivenessSession, no_color: bool) -> String {
    let phase = session.phase();
    if no_color {
        format!("[{} {}] > ", phase, session.current_step().angle)
    } else {
        format!(
            "{}{} [{} {}]{} > ",
            phase.color_code(),
            phase.emoji(),
            phase,
            session.current_step().angle,
            SessionPhase::color_reset()
        )
    }
}

fn format_error(message: &str, no_color: bool) -> String {
    if no_color {
        format!("  ⚠ {}", message)
    } else {
        format!("  ⚠ {}", message).red().to_string()
    }
}

/// Print verbose classification breakdown
fn print_verbose_sample(face: &FaceLandmarks, threshold: f64, no_color: bool) {
    let Some(estimate) = classifier::estimate(face) else {
        println!("Landmarks unusable: missing key points or degenerate face width");
        return;
    };
    let pose = classifier::classify(face, threshold);

    let color = if no_color { "" } else { "\x1b[36m" };
    let reset = if no_color { "" } else { "\x1b[0m" };

    println!("{}┌──────────────────────────────────────────┐{}", color, reset);
    println!("{}│ eye_center_x: {:>8.2}{}", color, estimate.eye_center_x, reset);
    println!("{}│ nose_offset:  {:>8.2}{}", color, estimate.nose_offset, reset);
    println!("{}│ face_width:   {:>8.2}{}", color, estimate.face_width, reset);
    println!("{}├──────────────────────────────────────────┤{}", color, reset);
    println!("{}│ ratio:        {:>8.4}  (threshold {:.2}){}", color, estimate.ratio, threshold, reset);
    match pose {
        Some(p) => println!("{}│ angle:        {:>8}{}", color, p.angle, reset),
        None => println!("{}│ angle:        {:>8}{}", color, "-", reset),
    }
    println!("{}└──────────────────────────────────────────┘{}", color, reset);
}

/// Run HTTP API server
async fn run_serve(args: &Args) {
    println!();
    println!("╔════════════════════════════════════════════╗");
    println!("║  KYCLive API Server                        ║");
    println!("║  Version: {}                            ║", VERSION);
    println!("╚════════════════════════════════════════════╝");
    println!();

    if let Err(e) = run_server(&args.addr, args.record_dir.clone()).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
