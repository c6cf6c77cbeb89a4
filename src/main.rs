//! VRChat Auto Fishing - terminal front-end
//!
//! Loads settings, connects the OSC client and the log tailer to the fishing
//! engine, then reads commands from stdin and prints status changes.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;

use vrchat_autofish::console::{Command, HELP};
use vrchat_autofish::{
    get_data_dir, CastDuration, EngineOptions, FishingEngine, LogTailer, OscClient, Settings,
};

/// Command line overrides for `config/settings.json`.
#[derive(Debug, Parser)]
#[command(name = "vrchat-autofish", version, about = "Auto fishing for VRChat over OSC")]
struct Args {
    /// Settings file (defaults to config/settings.json in the data directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// OSC host the game listens on
    #[arg(long)]
    host: Option<String>,
    /// OSC port the game listens on
    #[arg(long)]
    port: Option<u16>,
    /// Directory containing output_log_*.txt
    #[arg(long)]
    log_dir: Option<PathBuf>,
    /// Cast charge time in seconds (0.0 - 1.7)
    #[arg(long)]
    cast: Option<f64>,
    /// Start fishing immediately
    #[arg(long)]
    start: bool,
}

fn init_logging(base: &Path) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // Log filter configuration:
    // - Sets default level to 'info'
    // - Keeps the filesystem watcher quiet
    const LOG_FILTER: &str = "info,vrchat_autofish=info,notify=warn";

    let log_dir = base.join("debug").join("log");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file_path = log_dir.join("debug.log");
    let file_result = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LOG_FILTER));

    match file_result {
        Ok(file) => {
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_span_events(FmtSpan::CLOSE);

            let stdout_layer = tracing_subscriber::fmt::layer().with_span_events(FmtSpan::CLOSE);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(stdout_layer)
                .init();

            tracing::info!("[INIT] Logging initialized, file: {:?}", log_file_path);
        }
        Err(e) => {
            // Fallback: stdout-only logging with same filter
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            eprintln!(
                "[INIT] Failed to create debug log file at {:?}: {}",
                log_file_path, e
            );
        }
    }
}

fn load_settings(args: &Args) -> Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;

    if let Some(host) = &args.host {
        settings.osc_host = host.clone();
    }
    if let Some(port) = args.port {
        settings.osc_port = port;
    }
    if let Some(dir) = &args.log_dir {
        settings.log_dir = Some(dir.clone());
    }
    if let Some(secs) = args.cast {
        settings.cast_duration = CastDuration::from_secs(secs).context("Invalid --cast")?;
    }
    Ok(settings)
}

fn handle_command(engine: &FishingEngine, command: Command) -> bool {
    match command {
        Command::Start => match engine.start() {
            Ok(true) => println!("Fishing started"),
            Ok(false) => println!("Already running. Stop first."),
            Err(e) => println!("Cannot start: {}", e),
        },
        Command::Stop => engine.stop(),
        Command::Cast(secs) => match engine.set_cast_duration(secs) {
            Ok(duration) => println!("Cast duration: {}", duration),
            Err(e) => println!("{}", e),
        },
        Command::Status => println!("{}", engine.status_json()),
        Command::Help => println!("{}", HELP),
        Command::Quit => return false,
    }
    true
}

fn main() -> Result<()> {
    let args = Args::parse();
    let base = get_data_dir();
    init_logging(&base);

    println!("VRChat Auto Fishing {}", env!("CARGO_PKG_VERSION"));
    println!("================================");

    let settings = load_settings(&args)?;
    let log_dir = settings
        .resolve_log_dir()
        .context("Could not determine the VRChat log directory; pass --log-dir")?;
    if !log_dir.is_dir() {
        tracing::warn!("[INIT] Log directory {:?} does not exist yet", log_dir);
    }

    let client = OscClient::new(&settings.osc_host, settings.osc_port)
        .context("Failed to set up OSC client")?;
    println!("OSC target: {}", client.target());
    println!("Log directory: {}", log_dir.display());

    let tailer = Arc::new(LogTailer::new(log_dir, settings.log_glob.clone()));
    let engine = FishingEngine::new(
        Arc::new(client),
        tailer,
        EngineOptions {
            timings: settings.timings.clone(),
            cast_duration: settings.cast_duration,
            watch_log_dir: true,
        },
    )
    .context("Failed to create fishing engine")?;

    let updates = engine.subscribe();
    let _status_thread = thread::spawn(move || {
        for update in updates {
            println!(
                "[{}] {} (caught {})",
                update.at.format("%H:%M:%S"),
                update.text,
                update.fish_count
            );
        }
    });

    println!("{}", HELP);
    if args.start {
        engine.start().context("Failed to start fishing")?;
    }

    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("[INPUT] Failed to read stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(command) => {
                if !handle_command(&engine, command) {
                    break;
                }
            }
            Err(e) => println!("{} (type 'help')", e),
        }
    }

    println!("App is closing, cleaning up...");
    engine.shutdown();
    Ok(())
}
