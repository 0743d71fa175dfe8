//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::replay::ReplayArgs;

/// PlastiWatch host simulator.
///
/// Replays scripted sensor and user events against the activity session
/// controller and renders what the watch would show.
#[derive(Debug, Parser)]
#[command(name = "plastiwatch", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Replay a JSON-lines event script.
    Replay(ReplayArgs),

    /// Print the resolved configuration.
    Config,
}
