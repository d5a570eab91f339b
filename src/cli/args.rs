//! CLI argument definitions using clap
//!
//! Commands:
//! - noema validate --chain <path>
//! - noema execute --chain <path> --sources <path>
//! - noema audit --events <path>
//! - noema gate --events <path> --horizons <path> --horizon <id>
//! - noema verify --events <path> --horizons <path> --parent <id> --child <id>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration path; a missing file here means defaults
pub const DEFAULT_CONFIG_PATH: &str = "./noema.json";

/// Noema - epistemic data transformation engine
#[derive(Parser, Debug)]
#[command(name = "noema")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate an operator chain and describe the set it defines
    Validate {
        /// Chain file (JSON)
        #[arg(long)]
        chain: PathBuf,
    },

    /// Build a chain and execute it against a sources file
    Execute {
        /// Chain file (JSON)
        #[arg(long)]
        chain: PathBuf,
        /// Sources file (JSON)
        #[arg(long)]
        sources: PathBuf,
    },

    /// Run the advisory event validator over an events file
    Audit {
        /// Events file (JSON)
        #[arg(long)]
        events: PathBuf,
    },

    /// List the events visible under one horizon
    Gate {
        /// Events file (JSON)
        #[arg(long)]
        events: PathBuf,
        /// Horizon descriptors file (JSON)
        #[arg(long)]
        horizons: PathBuf,
        /// Horizon id to read through
        #[arg(long)]
        horizon: String,
    },

    /// Check that a child horizon sees no event its parent cannot
    Verify {
        /// Events file (JSON)
        #[arg(long)]
        events: PathBuf,
        /// Horizon descriptors file (JSON)
        #[arg(long)]
        horizons: PathBuf,
        #[arg(long)]
        parent: String,
        #[arg(long)]
        child: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
