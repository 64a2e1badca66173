//! rigsnap pose engine
//!
//! Snaps control chains of a character rig onto each other (FK to IK, IK to
//! FK, parent switches) and bakes those snaps over keyed frames so the
//! animation keeps its look while the rig's control scheme changes.
//!
//! The engine talks to the application that owns the rig through the
//! [`RigHost`] trait. [`Armature`] is a self-contained host with its own
//! evaluator, used by the CLI and the tests.
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use rigsnap_pose::{invoke, Armature, PoseBone, RigHost};
//! use rigsnap_spec::{BoneChain, GenericSnapParams, Invocation, Operator, SessionConfig};
//!
//! let mut ik = PoseBone::new("arm_ik", Vec3::ZERO, Vec3::Y);
//! ik.channels.location = Vec3::X;
//! let mut rig = Armature::new("rig")
//!     .with_bone(ik)
//!     .with_bone(PoseBone::new("arm_fk", Vec3::ZERO, Vec3::Y))
//!     .built();
//!
//! let invocation = Invocation::single(Operator::GenericSnap(GenericSnapParams::new(
//!     BoneChain::new(["arm_ik"]),
//!     BoneChain::new(["arm_fk"]),
//! )));
//! let report = invoke(&mut rig, &invocation, &mut SessionConfig::default());
//! assert!(!report.has_errors());
//! let fk = rig.pose_matrix("arm_fk").unwrap();
//! assert!(fk.w_axis.truncate().abs_diff_eq(Vec3::X, 1e-5));
//! ```
//!
//! # Modules
//!
//! - [`math`]: Rotation angles and 1-D minimization
//! - [`rig`]: Pose bones, channels, constraints and custom properties
//! - [`curves`]: Actions, F-curves and key range editing
//! - [`host`]: The [`RigHost`] trait
//! - [`armature`]: Reference host with constraint and IK evaluation
//! - [`transform`]: Reading and writing bone transforms across spaces
//! - [`keying`]: Keyframe insertion and flags
//! - [`bake`]: Single-frame and bake-over-keys execution
//! - [`snap`]: The pose-matching operators
//! - [`operators`]: Invocation dispatch

pub mod armature;
pub mod bake;
pub mod curves;
pub mod error;
pub mod host;
pub mod keying;
pub mod math;
pub mod operators;
pub mod rig;
pub mod snap;
pub mod transform;

pub use armature::Armature;
pub use bake::{execute_bake, execute_single, BakeSession, FrameOperator, Keying};
pub use error::{ErrorKind, PoseError, PoseResult};
pub use host::RigHost;
pub use operators::{describe, invoke};
pub use rig::{Channels, PoseBone, PropValue, RotationMode, Space};
