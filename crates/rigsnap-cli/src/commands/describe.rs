//! Describe command implementation
//!
//! Prints an invocation's label and checks its parameters without a rig.

use anyhow::{Context, Result};
use colored::Colorize;
use rigsnap_pose::describe;
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

use crate::input::load_invocation;

/// Machine-readable description of an invocation.
#[derive(Debug, Serialize)]
pub struct DescribeOutput {
    pub operator: String,
    pub mode: rigsnap_spec::ExecutionMode,
    pub description: String,
    pub bakeable: bool,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run the describe command
///
/// # Returns
/// Exit code: 0 if the parameters are valid, 1 otherwise
pub fn run(op_path: &str, json_output: bool) -> Result<ExitCode> {
    let invocation = load_invocation(Path::new(op_path))
        .with_context(|| format!("Failed to load operator: {}", op_path))?
        .value;

    let validation = invocation.validate();
    let output = DescribeOutput {
        operator: invocation.operator.id().to_string(),
        mode: invocation.mode,
        description: describe(&invocation),
        bakeable: invocation.operator.supports_bake(),
        valid: validation.is_ok(),
        error: validation.err().map(|e| e.to_string()),
    };

    if json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} {}", "Operator:".cyan().bold(), output.operator);
        println!("{} {}", "Label:".dimmed(), output.description);
        println!(
            "{} {}",
            "Bake:".dimmed(),
            if output.bakeable { "supported" } else { "not supported" }
        );
        match &output.error {
            None => println!("\n{} Parameters are valid", "SUCCESS".green().bold()),
            Some(err) => println!("\n{} {}", "INVALID".red().bold(), err),
        }
    }

    Ok(if output.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}
