//! Run command implementation
//!
//! Loads a rig and an operator invocation, runs the operator and optionally
//! writes the modified rig back out.

use anyhow::{Context, Result};
use colored::Colorize;
use rigsnap_pose::invoke;
use rigsnap_spec::{OperatorReport, OperatorStatus, ReportLevel, SessionConfig};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

use crate::input::{load_config, load_invocation, load_rig, rig_document};

/// Machine-readable result of a run.
#[derive(Debug, Serialize)]
pub struct RunOutput {
    pub report: OperatorReport,
    /// Session config after the run.
    pub config: SessionConfig,
    /// BLAKE3 hash of the rig file as loaded.
    pub rig_hash_before: String,
    /// BLAKE3 hash of the rig document after the run.
    pub rig_hash_after: String,
    pub op_hash: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_path: Option<String>,
    pub duration_ms: u64,
}

/// Run the run command
///
/// # Arguments
/// * `rig_path` - Path to the rig document
/// * `op_path` - Path to the operator invocation
/// * `config_path` - Optional session config
/// * `out_path` - Where to write the modified rig, if anywhere
/// * `json_output` - Whether to print machine-readable JSON
///
/// # Returns
/// Exit code: 0 if the operator finished without errors, 1 otherwise
pub fn run(
    rig_path: &str,
    op_path: &str,
    config_path: Option<&str>,
    out_path: Option<&str>,
    json_output: bool,
) -> Result<ExitCode> {
    let start = Instant::now();

    let rig = load_rig(Path::new(rig_path))
        .with_context(|| format!("Failed to load rig: {}", rig_path))?;
    let invocation = load_invocation(Path::new(op_path))
        .with_context(|| format!("Failed to load operator: {}", op_path))?;
    let mut config = load_config(config_path.map(Path::new))
        .with_context(|| format!("Failed to load config: {}", config_path.unwrap_or("-")))?;

    let mut armature = rig.value;
    let report = invoke(&mut armature, &invocation.value, &mut config);

    let (document, rig_hash_after) =
        rig_document(&armature).context("Failed to serialize rig")?;
    if let Some(out) = out_path {
        std::fs::write(out, &document).with_context(|| format!("Failed to write rig: {}", out))?;
        info!(path = out, "Wrote rig");
    }

    let ok = report.status == OperatorStatus::Finished && !report.has_errors();
    let output = RunOutput {
        report,
        config,
        rig_hash_before: rig.source_hash,
        rig_hash_after,
        op_hash: invocation.source_hash,
        out_path: out_path.map(str::to_string),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_human(&output);
    }

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

fn print_human(output: &RunOutput) {
    let report = &output.report;
    println!("{} {}", "Operator:".cyan().bold(), report.operator);
    println!("{} {}", "Description:".dimmed(), report.description);
    println!("{} {}", "Rig:".dimmed(), &output.rig_hash_before[..16]);

    if !report.frames.is_empty() {
        let first = report.frames.first().copied().unwrap_or_default();
        let last = report.frames.last().copied().unwrap_or_default();
        println!(
            "{} {} frame(s), {}..{}",
            "Baked:".dimmed(),
            report.frames.len(),
            first,
            last
        );
    }

    for message in &report.messages {
        let marker = match message.level {
            ReportLevel::Info => "i".blue(),
            ReportLevel::Warning => "!".yellow(),
            ReportLevel::Error => "x".red(),
        };
        match &message.code {
            Some(code) => println!("  {} [{}] {}", marker, code.dimmed(), message.message),
            None => println!("  {} {}", marker, message.message),
        }
    }

    if let Some(out) = &output.out_path {
        println!("{} {} ({})", "Wrote:".dimmed(), out, &output.rig_hash_after[..16]);
    }

    match report.status {
        OperatorStatus::Finished if !report.has_errors() => println!(
            "\n{} Operator finished ({}ms)",
            "SUCCESS".green().bold(),
            output.duration_ms
        ),
        OperatorStatus::Finished => println!(
            "\n{} Operator finished with errors ({}ms)",
            "FAILED".red().bold(),
            output.duration_ms
        ),
        OperatorStatus::Cancelled => println!(
            "\n{} Operator cancelled ({}ms)",
            "CANCELLED".yellow().bold(),
            output.duration_ms
        ),
    }
}
