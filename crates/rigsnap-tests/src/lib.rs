//! rigsnap End-to-End Test Infrastructure
//!
//! This crate exercises the pose engine the way a caller would:
//!
//! - **Limb snaps**: IK controls placed from an FK pose on arm and leg rigs
//! - **Bakes**: Operators revisiting keyed frames and re-keying outputs
//! - **Parent switching**: Visual pose preserved across a parent change
//! - **Maintenance**: Clearing keys, frame range and vehicle floor operators
//! - **CLI**: Rig documents written to disk, run, and read back
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p rigsnap-tests
//! ```

pub mod fixtures;
pub mod harness;

pub use harness::{assert_matrix_near, assert_point_near, pose_head, pose_tail, RigHarness};
