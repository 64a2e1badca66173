//! Test harness utilities for comparing poses and running the CLI on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use glam::{Mat4, Vec3};
use rigsnap_pose::{Armature, RigHost};
use rigsnap_spec::{Invocation, SessionConfig};
use tempfile::TempDir;

// =============================================================================
// Pose assertions
// =============================================================================

/// Pose-space head position of a bone.
pub fn pose_head(rig: &Armature, bone: &str) -> Vec3 {
    rig.pose_matrix(bone)
        .unwrap_or_else(|| panic!("bone {bone} not found"))
        .w_axis
        .truncate()
}

/// Pose-space tail position of a bone.
pub fn pose_tail(rig: &Armature, bone: &str) -> Vec3 {
    let length = rig
        .bone(bone)
        .unwrap_or_else(|| panic!("bone {bone} not found"))
        .length;
    rig.pose_matrix(bone)
        .unwrap_or_else(|| panic!("bone {bone} not found"))
        .transform_point3(Vec3::Y * length)
}

/// Assert that two points are within `tolerance` of each other.
pub fn assert_point_near(actual: Vec3, expected: Vec3, tolerance: f32, what: &str) {
    let distance = (actual - expected).length();
    assert!(
        distance <= tolerance,
        "{what}: {actual:?} is {distance} away from {expected:?} (tolerance {tolerance})"
    );
}

/// Assert that two pose matrices agree element-wise.
pub fn assert_matrix_near(actual: Mat4, expected: Mat4, tolerance: f32, what: &str) {
    assert!(
        actual.abs_diff_eq(expected, tolerance),
        "{what}: matrices differ beyond {tolerance}\nactual:   {actual:?}\nexpected: {expected:?}"
    );
}

/// Pose matrices of `bones` at every frame in `frames`.
///
/// Leaves the rig on the last frame visited.
pub fn sample_poses(rig: &mut Armature, bones: &[&str], frames: &[i32]) -> Vec<Vec<Mat4>> {
    frames
        .iter()
        .map(|&frame| {
            rig.frame_set(frame);
            bones
                .iter()
                .map(|bone| {
                    rig.pose_matrix(bone)
                        .unwrap_or_else(|| panic!("bone {bone} not found"))
                })
                .collect()
        })
        .collect()
}

// =============================================================================
// On-disk harness
// =============================================================================

/// A temporary directory holding rig, operator and config documents.
pub struct RigHarness {
    /// Working directory for test documents.
    pub work_dir: TempDir,
}

impl RigHarness {
    /// Create a new harness.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().expect("Failed to create work dir"),
        }
    }

    /// Get the working directory path.
    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Path of a file inside the working directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.work_dir.path().join(name)
    }

    /// Write a rig document and return its path.
    pub fn write_rig(&self, name: &str, rig: &Armature) -> PathBuf {
        let json = rig.to_json_pretty().expect("Failed to serialize rig");
        self.write(name, &json)
    }

    /// Write an operator invocation and return its path.
    pub fn write_invocation(&self, name: &str, invocation: &Invocation) -> PathBuf {
        let json = invocation
            .to_json_pretty()
            .expect("Failed to serialize invocation");
        self.write(name, &json)
    }

    /// Write a session config and return its path.
    pub fn write_config(&self, name: &str, config: &SessionConfig) -> PathBuf {
        let json = serde_json::to_string_pretty(config).expect("Failed to serialize config");
        self.write(name, &json)
    }

    /// Read a rig document back.
    pub fn read_rig(&self, path: &Path) -> Armature {
        let json = fs::read_to_string(path).expect("Failed to read rig");
        Armature::from_json(&json).expect("Failed to parse rig")
    }

    /// Read a session config back.
    pub fn read_config(&self, path: &Path) -> SessionConfig {
        let json = fs::read_to_string(path).expect("Failed to read config");
        SessionConfig::from_json(&json).expect("Failed to parse config")
    }

    /// BLAKE3 hash of a file, as lowercase hex.
    pub fn hash_file(&self, path: &Path) -> String {
        let bytes = fs::read(path).expect("Failed to read file");
        blake3::hash(&bytes).to_hex().to_string()
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.file(name);
        fs::write(&path, contents).expect("Failed to write file");
        path
    }
}

impl Default for RigHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `rigsnap run` in-process and return its exit code.
pub fn run_operator(
    rig: &Path,
    op: &Path,
    config: Option<&Path>,
    out: Option<&Path>,
) -> ExitCode {
    let rig = rig.to_string_lossy();
    let op = op.to_string_lossy();
    let config = config.map(|p| p.to_string_lossy().into_owned());
    let out = out.map(|p| p.to_string_lossy().into_owned());
    rigsnap_cli::commands::run::run(&rig, &op, config.as_deref(), out.as_deref(), true)
        .expect("run command failed")
}
