//! Inspect command implementation
//!
//! Prints a summary of a rig document: bones, constraints, animation.

use anyhow::{Context, Result};
use colored::Colorize;
use rigsnap_pose::{Armature, RigHost};
use serde::Serialize;
use std::path::Path;
use std::process::ExitCode;

use crate::input::load_rig;

/// Summary of one bone.
#[derive(Debug, Serialize)]
pub struct BoneSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    pub rotation_mode: String,
    pub constraints: Vec<String>,
    pub props: Vec<String>,
}

/// Summary of a rig document.
#[derive(Debug, Serialize)]
pub struct RigSummary {
    pub name: String,
    pub source_hash: String,
    pub frame_current: i32,
    pub frame_range: (i32, i32),
    pub bones: Vec<BoneSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    pub curves: usize,
    pub keys: usize,
}

impl RigSummary {
    /// Builds the summary of a loaded rig.
    pub fn of(rig: &Armature, source_hash: String) -> Self {
        let bones = rig
            .bones
            .iter()
            .map(|bone| BoneSummary {
                name: bone.name.clone(),
                parent: bone.parent.clone(),
                rotation_mode: bone.channels.rotation_mode.to_string(),
                constraints: bone
                    .constraints
                    .iter()
                    .map(|c| format!("{} ({})", c.name, c.kind.type_name()))
                    .collect(),
                props: bone.props.keys().map(str::to_string).collect(),
            })
            .collect();

        let action = rig.anim_data().and_then(|anim| anim.action.as_ref());
        Self {
            name: rig.name.clone(),
            source_hash,
            frame_current: rig.frame_current(),
            frame_range: rig.scene_frame_range(),
            bones,
            action: action.map(|a| a.name.clone()),
            curves: action.map_or(0, |a| a.fcurves.len()),
            keys: action.map_or(0, |a| a.key_count()),
        }
    }
}

/// Run the inspect command
///
/// # Arguments
/// * `rig_path` - Path to the rig document
/// * `json_output` - Whether to print machine-readable JSON
pub fn run(rig_path: &str, json_output: bool) -> Result<ExitCode> {
    let rig = load_rig(Path::new(rig_path))
        .with_context(|| format!("Failed to load rig: {}", rig_path))?;
    let summary = RigSummary::of(&rig.value, rig.source_hash);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("{} {}", "Rig:".cyan().bold(), summary.name);
    println!("{} {}", "Hash:".dimmed(), &summary.source_hash[..16]);
    println!(
        "{} {} (range {}..{})",
        "Frame:".dimmed(),
        summary.frame_current,
        summary.frame_range.0,
        summary.frame_range.1
    );

    println!("\n{} ({})", "Bones".bold(), summary.bones.len());
    for bone in &summary.bones {
        let parent = bone
            .parent
            .as_deref()
            .map(|p| format!(" <- {}", p))
            .unwrap_or_default();
        println!("  {}{} [{}]", bone.name, parent.dimmed(), bone.rotation_mode);
        for constraint in &bone.constraints {
            println!("    {} {}", "+".dimmed(), constraint);
        }
        if !bone.props.is_empty() {
            println!("    {} {}", "props:".dimmed(), bone.props.join(", "));
        }
    }

    match &summary.action {
        Some(action) => println!(
            "\n{} {} ({} curves, {} keys)",
            "Action:".bold(),
            action,
            summary.curves,
            summary.keys
        ),
        None => println!("\n{} none", "Action:".bold()),
    }

    Ok(ExitCode::SUCCESS)
}
