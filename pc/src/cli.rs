//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pc - preemption-signal sidecar for training tasks
#[derive(Parser)]
#[command(
    name = "pc",
    about = "Watch for and acknowledge preemption signals from the master",
    version,
    after_help = "Environment overrides: PREEMPT_MASTER_URL, PREEMPT_ALLOCATION_ID, PREEMPT_RANK, PREEMPT_MODE"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run as chief of a one-process group and wait for a preemption signal
    Watch {
        /// Do not acknowledge the signal when it arrives
        #[arg(long)]
        no_ack: bool,

        /// Seconds between checks (overrides config)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Ask the master once for the current preemption state
    Check {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Acknowledge the preemption signal
    Ack,

    /// Print the effective configuration
    ShowConfig,
}

/// Output format for check
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}
