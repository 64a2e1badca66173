//! Frame range command implementation
//!
//! Copies a rig's scene frame range into a session config.

use anyhow::{Context, Result};
use colored::Colorize;
use rigsnap_pose::invoke;
use rigsnap_spec::{Invocation, Operator};
use std::path::Path;
use std::process::ExitCode;

use crate::input::{load_config, load_rig};

/// Run the frame-range command
///
/// # Arguments
/// * `rig_path` - Path to the rig document
/// * `config_path` - Config to start from; defaults when absent
/// * `out_path` - Where to write the updated config; stdout when absent
pub fn run(rig_path: &str, config_path: Option<&str>, out_path: Option<&str>) -> Result<ExitCode> {
    let rig = load_rig(Path::new(rig_path))
        .with_context(|| format!("Failed to load rig: {}", rig_path))?;
    let mut config = load_config(config_path.map(Path::new))
        .with_context(|| format!("Failed to load config: {}", config_path.unwrap_or("-")))?;

    let mut armature = rig.value;
    let report = invoke(
        &mut armature,
        &Invocation::single(Operator::GetFrameRange),
        &mut config,
    );
    if report.has_errors() {
        for message in &report.messages {
            eprintln!("{} {}", "error:".red().bold(), message.message);
        }
        return Ok(ExitCode::from(1));
    }

    let json = serde_json::to_string_pretty(&config)?;
    match out_path {
        Some(out) => {
            std::fs::write(out, &json).with_context(|| format!("Failed to write config: {}", out))?;
            println!(
                "{} frames {}..{} -> {}",
                "Frame range:".cyan().bold(),
                config.bake.start_frame,
                config.bake.end_frame,
                out
            );
        }
        None => println!("{}", json),
    }
    Ok(ExitCode::SUCCESS)
}
