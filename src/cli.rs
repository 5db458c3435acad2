use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cinefilm")]
#[command(author, version, about = "FILM movie inspection and interleave repair tool")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a film and display its descriptions and layout
    Info {
        /// Film to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that samples appear in the order the player consumes them
    Check {
        /// Film to check
        #[arg(required = true)]
        file: PathBuf,

        /// Fail if any interleave desync is found
        #[arg(long)]
        strict: bool,
    },

    /// Rebuild a chunky film into correctly interleaved chunks
    Repair {
        /// Film to repair
        #[arg(required = true)]
        input: PathBuf,

        /// Output path (default: <stem>.<suffix>.<ext> next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip re-validating the repaired film
        #[arg(long)]
        no_verify: bool,
    },

    /// Validate configuration file
    ValidateConfig {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
