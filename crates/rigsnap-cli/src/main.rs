//! rigsnap CLI - snap and bake rig poses from the command line
//!
//! This binary runs pose-matching operators against rig documents and
//! reports what they changed.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use rigsnap_cli::commands;

/// rigsnap - FK/IK pose snapping and keyframe baking
#[derive(Parser)]
#[command(name = "rigsnap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Log engine phases (equivalent to RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an operator against a rig
    Run {
        /// Path to the rig document (JSON)
        #[arg(short, long)]
        rig: String,

        /// Path to the operator invocation (JSON)
        #[arg(short, long)]
        op: String,

        /// Path to the session config (JSON)
        #[arg(short, long)]
        config: Option<String>,

        /// Write the modified rig to this path
        #[arg(long)]
        out: Option<String>,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print a summary of a rig document
    Inspect {
        /// Path to the rig document (JSON)
        #[arg(short, long)]
        rig: String,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Copy the rig's scene frame range into a session config
    FrameRange {
        /// Path to the rig document (JSON)
        #[arg(short, long)]
        rig: String,

        /// Config to update (defaults when omitted)
        #[arg(short, long)]
        config: Option<String>,

        /// Write the config to this path instead of stdout
        #[arg(long)]
        out: Option<String>,
    },

    /// Print an operator's label and check its parameters
    Describe {
        /// Path to the operator invocation (JSON)
        #[arg(short, long)]
        op: String,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run {
            rig,
            op,
            config,
            out,
            json,
        } => commands::run::run(&rig, &op, config.as_deref(), out.as_deref(), json),
        Commands::Inspect { rig, json } => commands::inspect::run(&rig, json),
        Commands::FrameRange { rig, config, out } => {
            commands::frame_range::run(&rig, config.as_deref(), out.as_deref())
        }
        Commands::Describe { op, json } => commands::describe::run(&op, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
