//! hyprsetup - Main entry point
//!
//! Thin CLI front-end over the installation orchestration core: wires the
//! reference collaborators (file-backed session repository, pacman package
//! manager, JSON history recorder) and dispatches subcommands.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use tracing::{debug, info};

use hyprsetup::cli::{Cli, Commands};
use hyprsetup::config_file::SetupConfig;
use hyprsetup::history::{HistoryRecordingService, JsonHistoryRecorder};
use hyprsetup::installer::Installer;
use hyprsetup::merger::FileBackupMerger;
use hyprsetup::package_manager::PacmanPackageManager;
use hyprsetup::repository::JsonFileSessionRepository;
use hyprsetup::sanity;
use hyprsetup::session::{SessionId, SessionStatus};
use hyprsetup::snapshot::{self, FilesystemSnapshotProvider};
use hyprsetup::SetupError;

/// Initialize the logger with appropriate settings
fn init_logger() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();
}

/// Resolve the state directory: --state-dir or ~/.local/state/hyprsetup
fn state_dir(cli: &Cli) -> Result<PathBuf> {
    if let Some(dir) = &cli.state_dir {
        return Ok(dir.clone());
    }
    let home = std::env::var("HOME").context("HOME is not set; pass --state-dir")?;
    Ok(PathBuf::from(home).join(".local/state/hyprsetup"))
}

/// Wire the reference collaborators into an installer.
fn build_installer(state_dir: &PathBuf) -> Result<(Installer, Arc<JsonHistoryRecorder>)> {
    let repository = Arc::new(
        JsonFileSessionRepository::open(state_dir.join("sessions"))
            .context("Failed to open session store")?,
    );
    let history = Arc::new(
        JsonHistoryRecorder::open(state_dir.join("history.json"))
            .context("Failed to open history store")?,
    );
    let snapshots =
        Arc::new(FilesystemSnapshotProvider::for_current_user().context("Cannot locate home")?);

    let installer = Installer::new(
        repository,
        Arc::new(PacmanPackageManager::new()),
        history.clone(),
        Arc::new(FileBackupMerger::new()),
        snapshots,
    );
    Ok((installer, history))
}

/// Main application entry point
fn main() -> Result<()> {
    init_logger();
    info!("hyprsetup starting up");

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    let state = state_dir(&cli)?;

    match &cli.command {
        Commands::Install {
            config,
            save_config,
        } => {
            if let Some(save_path) = save_config {
                let setup = SetupConfig::default();
                setup.save_to_file(save_path)?;
                println!("✓ Default setup written to {:?}", save_path);
                return Ok(());
            }
            run_install(&cli, &state, config.as_deref())?;
        }
        Commands::Validate { config } => {
            info!("Validating setup file: {:?}", config);
            match SetupConfig::load_from_file(config).and_then(|c| c.validate()) {
                Ok(()) => println!("✓ Setup file is valid: {:?}", config),
                Err(e) => {
                    eprintln!("✗ Setup validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Status { session } => {
            let (installer, _) = build_installer(&state)?;
            let id = SessionId::parse(session)?;
            let status = installer.status(id)?;
            println!("session:    {}", status.session_id);
            println!("status:     {}", status.status);
            println!("phase:      {}", status.current_phase);
            println!("progress:   {}%", status.percent_complete);
            println!(
                "components: {}/{}",
                status.components_installed, status.components_total
            );
        }
        Commands::Cancel { session, reason } => {
            let (installer, _) = build_installer(&state)?;
            let id = SessionId::parse(session)?;
            let cancelled = installer.cancel(id, reason.as_deref())?;
            println!("✓ Session {} cancelled: {}", id, cancelled.failure_reason());
        }
        Commands::History { limit } => {
            let (_, history) = build_installer(&state)?;
            let mut records = history.records().map_err(SetupError::from)?;
            if let Some(limit) = limit {
                let skip = records.len().saturating_sub(*limit);
                records.drain(..skip);
            }
            if records.is_empty() {
                println!("No recorded installations.");
            }
            for record in records {
                let detail = if record.has_failure_details() {
                    format!(" ({})", record.failure_details())
                } else {
                    String::new()
                };
                println!(
                    "{}  {:7}  {} package(s){}",
                    record.record_id(),
                    record.outcome().to_string(),
                    record.packages().len(),
                    detail
                );
            }
        }
    }

    Ok(())
}

/// Load the setup, run preflight checks, and execute a session to a
/// terminal status.
fn run_install(cli: &Cli, state: &PathBuf, config_path: Option<&std::path::Path>) -> Result<()> {
    let mut setup = match config_path {
        Some(path) => SetupConfig::load_from_file(path)?,
        None => {
            info!("No setup file given; using the default stack");
            SetupConfig::default()
        }
    };
    setup.validate()?;
    setup.dry_run = setup.dry_run || cli.dry_run;
    let dry_run = setup.dry_run;

    sanity::run_preflight_checks(dry_run)?;

    let disk = snapshot::probe_disk_space(&setup.disk_path)?;
    let configuration = setup.into_configuration(disk)?;

    let (installer, _) = build_installer(state)?;
    let (tx, rx) = mpsc::channel();
    let installer = installer.with_progress_channel(tx);

    // Print progress lines as the orchestrator reports them, with an
    // advisory remaining-time estimate once progress is measurable
    let started = std::time::Instant::now();
    let printer = std::thread::spawn(move || {
        for update in rx {
            let remaining =
                hyprsetup::progress::estimate_remaining(update.percent_complete, started.elapsed());
            if remaining > std::time::Duration::ZERO {
                println!(
                    "[{:>3}%] {} (~{}s remaining)",
                    update.percent_complete,
                    update.message,
                    remaining.as_secs()
                );
            } else {
                println!("[{:>3}%] {}", update.percent_complete, update.message);
            }
        }
    });

    let id = installer.start_session(configuration)?;
    println!("Session {}", id);

    let session = installer.execute(id)?;
    drop(installer); // closes the progress channel
    let _ = printer.join();

    match session.status() {
        SessionStatus::Completed => {
            println!(
                "✓ Installation complete: {} package(s) installed",
                session.package_count()
            );
            Ok(())
        }
        _ => {
            eprintln!("✗ Installation failed: {}", session.failure_reason());
            std::process::exit(1);
        }
    }
}
