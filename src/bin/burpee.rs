//! Burpee CLI - Command-line interface for the burpee counter
//!
//! Commands:
//! - replay: Count repetitions in recorded pose frames
//! - config: Print a detector preset as JSON
//! - validate: Check recorded pose frames
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use burpee_counter::replay::{FrameOverlay, ReplayOptions};
use burpee_counter::source::{classify_frame, parse_frames_ndjson, FrameStatus};
use burpee_counter::types::RepetitionEvent;
use burpee_counter::{
    replay_frames_with, CounterConfig, CounterError, DetectorKind, PoseFrame, ReplayReport,
    SessionSnapshot, WorkoutSession, WorkoutSummary, COUNTER_VERSION, PRODUCER_NAME,
};

/// Burpee - pose-driven repetition counter
#[derive(Parser)]
#[command(name = "burpee")]
#[command(version = COUNTER_VERSION)]
#[command(about = "Count burpees from recorded pose keypoints", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay recorded frames through a session
    Replay {
        /// Input file path, one pose frame per line (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Config file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Detector to use; overrides the config file
        #[arg(long)]
        detector: Option<DetectorArg>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Include overlay draw commands for every frame
        #[arg(long)]
        overlay: bool,
    },

    /// Print a detector preset as JSON
    Config {
        #[arg(long, default_value = "line-crossing")]
        detector: DetectorArg,
    },

    /// Validate recorded frames
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DetectorArg {
    /// Count reference line touches
    LineCrossing,
    /// Count up-then-down head movements
    DirectionReversal,
}

impl From<DetectorArg> for DetectorKind {
    fn from(arg: DetectorArg) -> Self {
        match arg {
            DetectorArg::LineCrossing => DetectorKind::LineCrossing,
            DetectorArg::DirectionReversal => DetectorKind::DirectionReversal,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// Single JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), BurpeeCliError> {
    match cli.command {
        Commands::Replay {
            input,
            config,
            detector,
            output_format,
            overlay,
        } => cmd_replay(&input, config.as_deref(), detector, output_format, overlay),

        Commands::Config { detector } => cmd_config(detector),

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn read_input(input: &Path) -> Result<String, BurpeeCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn resolve_config(
    config: Option<&Path>,
    detector: Option<DetectorArg>,
) -> Result<CounterConfig, BurpeeCliError> {
    let detector = detector.map(DetectorKind::from);
    let config = match (config, detector) {
        (Some(path), detector) => CounterConfig::load_for(path, detector)?,
        (None, Some(detector)) => CounterConfig::for_detector(detector),
        (None, None) => CounterConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// One line of ndjson replay output
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputRecord<'a> {
    Snapshot(&'a SessionSnapshot),
    Repetition(&'a RepetitionEvent),
    Overlay(&'a FrameOverlay),
    Summary(&'a WorkoutSummary),
}

fn cmd_replay(
    input: &Path,
    config: Option<&Path>,
    detector: Option<DetectorArg>,
    output_format: OutputFormat,
    overlay: bool,
) -> Result<(), BurpeeCliError> {
    let config = resolve_config(config, detector)?;
    let frames = parse_frames_ndjson(&read_input(input)?)?;
    if frames.is_empty() {
        return Err(BurpeeCliError::NoFrames);
    }

    log::info!(
        "replaying {} frames with {} detector",
        frames.len(),
        config.detector.as_str()
    );
    let report = replay_frames_with(
        WorkoutSession::try_new(config)?,
        frames,
        ReplayOptions { overlay },
    );

    let output = format_report(&report, &output_format)?;
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn format_report(report: &ReplayReport, format: &OutputFormat) -> Result<String, BurpeeCliError> {
    match format {
        OutputFormat::Ndjson => {
            let records = report
                .snapshots
                .iter()
                .map(OutputRecord::Snapshot)
                .chain(report.events.iter().map(OutputRecord::Repetition))
                .chain(report.overlays.iter().map(OutputRecord::Overlay))
                .chain(std::iter::once(OutputRecord::Summary(&report.summary)));
            let mut out = String::new();
            for record in records {
                out.push_str(&serde_json::to_string(&record)?);
                out.push('\n');
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(format!("{}\n", serde_json::to_string(report)?)),
        OutputFormat::JsonPretty => Ok(format!("{}\n", serde_json::to_string_pretty(report)?)),
    }
}

fn cmd_config(detector: DetectorArg) -> Result<(), BurpeeCliError> {
    println!("{}", CounterConfig::for_detector(detector.into()).to_json()?);
    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), BurpeeCliError> {
    let report = validate_frames(&read_input(input)?);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total frames:   {}", report.total_frames);
        println!("Valid frames:   {}", report.valid_frames);
        println!("Not ready:      {}", report.not_ready_frames);
        println!("Invalid frames: {}", report.invalid_frames);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!("  - Line {}: {}", err.line, err.error);
            }
        }
    }

    if report.invalid_frames > 0 {
        Err(BurpeeCliError::ValidationFailed(report.invalid_frames))
    } else {
        Ok(())
    }
}

/// Check every recorded frame. Not-ready frames are skipped polls during
/// replay, so they are reported but do not fail validation.
fn validate_frames(input_data: &str) -> ValidationReport {
    let mut total_frames = 0;
    let mut not_ready_frames = 0;
    let mut errors = Vec::new();
    for (i, line) in input_data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        total_frames += 1;
        let status = match serde_json::from_str::<PoseFrame>(line.trim()) {
            Ok(frame) => classify_frame(&frame),
            Err(e) => FrameStatus::Invalid(e.into()),
        };
        match status {
            FrameStatus::Usable => {}
            FrameStatus::NotReady => not_ready_frames += 1,
            FrameStatus::Invalid(e) => errors.push(ValidationErrorDetail {
                line: i + 1,
                error: e.to_string(),
            }),
        }
    }

    ValidationReport {
        total_frames,
        valid_frames: total_frames - not_ready_frames - errors.len(),
        not_ready_frames,
        invalid_frames: errors.len(),
        errors,
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), BurpeeCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("burpee-counter version {}", COUNTER_VERSION),
    });

    for kind in [DetectorKind::LineCrossing, DetectorKind::DirectionReversal] {
        let status = match CounterConfig::for_detector(kind).validate() {
            Ok(()) => DoctorCheck {
                name: format!("preset_{}", kind.as_str()),
                status: CheckStatus::Ok,
                message: "Preset is valid".to_string(),
            },
            Err(e) => DoctorCheck {
                name: format!("preset_{}", kind.as_str()),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        };
        checks.push(status);
    }

    if let Some(path) = config {
        let check = if !path.exists() {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist".to_string(),
            }
        } else {
            match CounterConfig::load(path) {
                Ok(config) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Config valid ({} detector)", config.detector.as_str()),
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            }
        };
        checks.push(check);
    }

    // Replay reads frames from stdin when given -
    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (replay from - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: COUNTER_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Burpee Doctor Report");
        println!("====================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(BurpeeCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum BurpeeCliError {
    Io(io::Error),
    Counter(CounterError),
    Json(serde_json::Error),
    NoFrames,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for BurpeeCliError {
    fn from(e: io::Error) -> Self {
        BurpeeCliError::Io(e)
    }
}

impl From<CounterError> for BurpeeCliError {
    fn from(e: CounterError) -> Self {
        BurpeeCliError::Counter(e)
    }
}

impl From<serde_json::Error> for BurpeeCliError {
    fn from(e: serde_json::Error) -> Self {
        BurpeeCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<BurpeeCliError> for CliError {
    fn from(e: BurpeeCliError) -> Self {
        match e {
            BurpeeCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            BurpeeCliError::Counter(CounterError::InvalidConfig(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'burpee config' for a valid starting point".to_string()),
            },
            BurpeeCliError::Counter(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'burpee validate' for details".to_string()),
            },
            BurpeeCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            BurpeeCliError::NoFrames => CliError {
                code: "NO_FRAMES".to_string(),
                message: "No frames found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            BurpeeCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} frames failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            BurpeeCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Serialize)]
struct ValidationReport {
    total_frames: usize,
    valid_frames: usize,
    not_ready_frames: usize,
    invalid_frames: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(Serialize)]
struct ValidationErrorDetail {
    line: usize,
    error: String,
}

#[derive(Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
