use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Commands;

/// Task manager with an AI coach. Tasks live in a local JSON file by
/// default; set TASKCOACH_BACKEND_URL / TASKCOACH_BACKEND_KEY to sync
/// against a hosted backend instead.
#[derive(Parser)]
#[command(name = "taskcoach", version, about = "Personal task management with an AI coach")]
pub struct Cli {
    /// Path to the local JSON task file (forces the local backend).
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}
