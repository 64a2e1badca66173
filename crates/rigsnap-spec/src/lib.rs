//! rigsnap operator contract
//!
//! This crate defines what callers send to the pose engine and what they get
//! back: typed operator parameters, session settings, and operator reports.
//! All types are plain serde documents so they can cross a process boundary
//! as JSON.
//!
//! # Example
//!
//! ```
//! use rigsnap_spec::{BoneChain, GenericSnapParams, Invocation, Operator};
//!
//! let op = Operator::GenericSnap(
//!     GenericSnapParams::new(
//!         BoneChain::new(["MCH-arm_ik", "MCH-forearm_ik"]),
//!         BoneChain::new(["arm_fk", "forearm_fk"]),
//!     )
//!     .with_tooltip("FK to IK"),
//! );
//! let invocation = Invocation::bake(op);
//! assert!(invocation.validate().is_ok());
//! assert_eq!(invocation.description(), "Apply snap FK to IK to keyframes");
//! ```
//!
//! # Modules
//!
//! - [`error`]: Parameter validation errors
//! - [`params`]: Per-operator parameter types
//! - [`operator`]: Operator enum and invocation wrapper
//! - [`settings`]: Bake settings and keying preferences
//! - [`report`]: Operator status and messages

pub mod error;
pub mod operator;
pub mod params;
pub mod report;
pub mod settings;

pub use error::ParamsError;
pub use operator::{ExecutionMode, Invocation, Operator};
pub use params::{
    BoneChain, ClearKeyframesParams, GenericSnapParams, LegRollIk2FkParams, LimbIk2FkParams,
    RollAxes, SwitchParentParams, TransformLocks, VehicleFloorParams,
};
pub use report::{OperatorReport, OperatorStatus, ReportLevel, ReportMessage};
pub use settings::{AutoKeyMode, BakeSettings, KeyingPreferences, SessionConfig};
