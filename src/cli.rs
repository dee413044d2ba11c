use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// hyprsetup - installer for the Hyprland desktop stack
#[derive(Parser)]
#[command(name = "hyprsetup")]
#[command(about = "Install and track a Hyprland desktop stack (compositor, bar, terminal, launcher)")]
#[command(version)]
pub struct Cli {
    /// Dry-run mode: log what would be installed without making changes.
    ///
    /// Destructive operations (package installs, config writes) are skipped
    /// and logged. Snapshot capture and conflict detection still run so the
    /// preview is realistic.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// State directory for session and history storage
    /// (default: ~/.local/state/hyprsetup)
    #[arg(long, global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an installation from a setup file
    Install {
        /// Path to the setup file (JSON); omit to use the default stack
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the default setup file to this path and exit
        #[arg(long)]
        save_config: Option<PathBuf>,
    },
    /// Validate a setup file
    Validate {
        /// Path to the setup file to validate
        config: PathBuf,
    },
    /// Show the status of a session
    Status {
        /// Session id
        session: String,
    },
    /// Cancel an in-flight session
    Cancel {
        /// Session id
        session: String,

        /// Optional cancellation detail recorded with the session
        #[arg(short, long)]
        reason: Option<String>,
    },
    /// List recorded installation history
    History {
        /// Show at most this many records, newest last
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
