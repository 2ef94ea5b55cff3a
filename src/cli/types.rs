//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden - Self-Healing Control Plane", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Path to a configuration file (defaults to .warden/config.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the control plane: workers, runner, and policy engine
    Start {
        /// Policy source file loaded into the registry at startup
        #[arg(short, long)]
        policies: Option<PathBuf>,
    },

    /// Policy source file commands
    #[command(subcommand)]
    Policy(PolicyCommands),

    /// Remediation action commands
    #[command(subcommand)]
    Action(ActionCommands),

    /// Ingest a single telemetry sample
    Ingest {
        /// Metric name
        #[arg(short, long)]
        name: String,

        /// Metric value
        #[arg(short, long)]
        value: f64,

        /// Tags as key=value pairs (repeatable)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// Show queue and action statistics
    Status,
}

#[derive(Subcommand)]
pub enum PolicyCommands {
    /// List the policies in a source file
    List {
        /// Policy source file
        file: PathBuf,
    },

    /// Show one policy from a source file
    Show {
        /// Policy source file
        file: PathBuf,

        /// Policy name
        name: String,
    },

    /// Validate a policy source file without loading it
    Validate {
        /// Policy source file
        file: PathBuf,
    },

    /// Apply a policy source file transactionally and tell a running
    /// daemon to re-read its policy source
    Reload {
        /// Policy source file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum ActionCommands {
    /// List recent actions
    List {
        /// Filter by status (pending, running, completed, failed, cancelled)
        #[arg(short, long)]
        status: Option<String>,

        /// Filter by target
        #[arg(short, long)]
        target: Option<String>,

        /// Maximum rows (default 50, max 500)
        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Show one action record
    Show {
        /// Action id
        id: i64,
    },

    /// Cancel a pending action
    Cancel {
        /// Action id
        id: i64,
    },
}
