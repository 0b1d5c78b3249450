//! CLI module for Cutroom.

pub mod commands;
mod narration;
mod output;
pub mod preflight;
mod responder;

pub use narration::print_events;
pub use output::Output;
pub use responder::TerminalResponder;

use clap::{Parser, Subcommand};

/// Cutroom - media delivery by a four-stage agent pipeline
///
/// Reads the client's requirements from the working folder, then lets an
/// analyst, a planner, an executor and a quality checker work through them
/// with FFMPEG, ImageMagick and friends. Running without a subcommand starts
/// the pipeline.
#[derive(Parser, Debug)]
#[command(name = "cutroom")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Log level from the `-v` count, or `configured` when none was given.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Analysis -> Planning -> Execution -> Quality Check pipeline
    Run,

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
