//! Operator parameter types.
//!
//! Every operator takes a flat set of typed parameters. Bone chains are
//! ordered name lists; they are matched index-by-index by the operators.

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

// =============================================================================
// Shared Types
// =============================================================================

/// An ordered list of bone names forming a logical chain.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoneChain(Vec<String>);

impl BoneChain {
    /// Creates a chain from bone names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Returns the bone names.
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Returns the number of bones in the chain.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the chain names no bones.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the first bone name.
    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Returns the last bone name.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Iterates over the bone names.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns a new chain with the bones of `other` appended.
    pub fn concat(&self, other: &BoneChain) -> BoneChain {
        BoneChain(self.0.iter().chain(other.0.iter()).cloned().collect())
    }
}

impl<S: Into<String>> FromIterator<S> for BoneChain {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Whole-channel exclusions applied when writing a transform.
///
/// An excluded channel keeps its previous value and is never keyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformLocks {
    /// Leave location untouched.
    #[serde(default)]
    pub location: bool,
    /// Leave rotation untouched.
    #[serde(default)]
    pub rotation: bool,
    /// Leave scale untouched.
    #[serde(default)]
    pub scale: bool,
}

impl TransformLocks {
    /// No channels excluded.
    pub fn none() -> Self {
        Self::default()
    }

    /// Only location is written; rotation and scale are excluded.
    pub fn location_only() -> Self {
        Self {
            location: false,
            rotation: true,
            scale: true,
        }
    }

    /// Sets all three flags.
    pub fn with_flags(mut self, location: bool, rotation: bool, scale: bool) -> Self {
        self.location = location;
        self.rotation = rotation;
        self.scale = scale;
        self
    }
}

// =============================================================================
// Generic Snap
// =============================================================================

fn default_tooltip() -> String {
    "FK to IK".to_string()
}

/// Copies the pose of an input chain onto an output chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenericSnapParams {
    /// Bones whose pose is read.
    pub input_bones: BoneChain,
    /// Bones whose channels are written, index-matched to the input chain.
    pub output_bones: BoneChain,
    /// Controls whose keys also mark frames to bake.
    #[serde(default)]
    pub ctrl_bones: BoneChain,
    /// Human-readable label used in operator descriptions.
    #[serde(default = "default_tooltip")]
    pub tooltip: String,
    /// Channels left untouched on the output chain.
    #[serde(default)]
    pub locks: TransformLocks,
    /// Compensate for copy-scale-with-offset constraints on output bones.
    #[serde(default)]
    pub undo_copy_scale: bool,
}

impl GenericSnapParams {
    /// Creates snap parameters for the given chains.
    pub fn new(input_bones: BoneChain, output_bones: BoneChain) -> Self {
        Self {
            input_bones,
            output_bones,
            ctrl_bones: BoneChain::default(),
            tooltip: default_tooltip(),
            locks: TransformLocks::default(),
            undo_copy_scale: false,
        }
    }

    /// Sets the control bones scanned when baking.
    pub fn with_ctrl_bones(mut self, ctrl_bones: BoneChain) -> Self {
        self.ctrl_bones = ctrl_bones;
        self
    }

    /// Sets the tooltip label.
    pub fn with_tooltip(mut self, tooltip: impl Into<String>) -> Self {
        self.tooltip = tooltip.into();
        self
    }

    /// Sets the channel locks.
    pub fn with_locks(mut self, locks: TransformLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Enables copy-scale compensation.
    pub fn with_undo_copy_scale(mut self, undo: bool) -> Self {
        self.undo_copy_scale = undo;
        self
    }

    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.input_bones.is_empty() {
            return Err(ParamsError::EmptyChain {
                field: "input_bones",
            });
        }
        if self.output_bones.len() > self.input_bones.len() {
            return Err(ParamsError::ChainLengthMismatch {
                left: "output_bones",
                left_len: self.output_bones.len(),
                right: "input_bones",
                right_len: self.input_bones.len(),
            });
        }
        if self.output_bones.is_empty() {
            return Err(ParamsError::EmptyChain {
                field: "output_bones",
            });
        }
        Ok(())
    }
}

// =============================================================================
// Limb IK to FK
// =============================================================================

fn default_pole_prop() -> String {
    "pole_vector".to_string()
}

/// Snaps an IK limb to the pose of its FK chain.
///
/// `ik_bones` and `ctrl_bones` are matched index-by-index: the first control
/// drives the base, the second is the pole target, the last is the end
/// effector control, and anything between is a middle control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimbIk2FkParams {
    /// Bone carrying the pole switch property.
    pub prop_bone: String,
    /// Name of the pole switch property.
    #[serde(default = "default_pole_prop")]
    pub pole_prop: String,
    /// FK chain read as the target pose, followed by FK tail bones.
    pub fk_bones: BoneChain,
    /// IK result bones.
    pub ik_bones: BoneChain,
    /// IK controls, index-matched to `ik_bones`.
    pub ctrl_bones: BoneChain,
    /// Trailing IK controls, index-matched to the FK bones after the limb.
    #[serde(default)]
    pub tail_bones: BoneChain,
    /// Helper controls reset to identity before snapping.
    #[serde(default)]
    pub extra_ctrls: BoneChain,
}

impl LimbIk2FkParams {
    /// Minimum number of bones in the IK chain.
    pub const MIN_CHAIN_LEN: usize = 3;

    /// Creates limb parameters.
    pub fn new(
        prop_bone: impl Into<String>,
        fk_bones: BoneChain,
        ik_bones: BoneChain,
        ctrl_bones: BoneChain,
    ) -> Self {
        Self {
            prop_bone: prop_bone.into(),
            pole_prop: default_pole_prop(),
            fk_bones,
            ik_bones,
            ctrl_bones,
            tail_bones: BoneChain::default(),
            extra_ctrls: BoneChain::default(),
        }
    }

    /// Sets the pole switch property name.
    pub fn with_pole_prop(mut self, pole_prop: impl Into<String>) -> Self {
        self.pole_prop = pole_prop.into();
        self
    }

    /// Sets the tail controls.
    pub fn with_tail_bones(mut self, tail_bones: BoneChain) -> Self {
        self.tail_bones = tail_bones;
        self
    }

    /// Sets the extra helper controls.
    pub fn with_extra_ctrls(mut self, extra_ctrls: BoneChain) -> Self {
        self.extra_ctrls = extra_ctrls;
        self
    }

    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.prop_bone.is_empty() {
            return Err(ParamsError::MissingName { field: "prop_bone" });
        }
        if self.ik_bones.len() < Self::MIN_CHAIN_LEN {
            return Err(ParamsError::ChainTooShort {
                field: "ik_bones",
                min: Self::MIN_CHAIN_LEN,
                actual: self.ik_bones.len(),
            });
        }
        if self.ctrl_bones.len() != self.ik_bones.len() {
            return Err(ParamsError::ChainLengthMismatch {
                left: "ctrl_bones",
                left_len: self.ctrl_bones.len(),
                right: "ik_bones",
                right_len: self.ik_bones.len(),
            });
        }
        let needed = self.ik_bones.len() + self.tail_bones.len();
        if self.fk_bones.len() < needed {
            return Err(ParamsError::ChainTooShort {
                field: "fk_bones",
                min: needed,
                actual: self.fk_bones.len(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Leg Roll IK to FK
// =============================================================================

/// Which heel-roll axes may absorb the foot rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RollAxes {
    /// Side-to-side rock.
    #[serde(default = "default_true")]
    pub rock: bool,
    /// Forward heel/toe roll.
    #[serde(default = "default_true")]
    pub roll: bool,
    /// Yaw around the leg axis.
    #[serde(default)]
    pub yaw: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RollAxes {
    fn default() -> Self {
        Self {
            rock: true,
            roll: true,
            yaw: false,
        }
    }
}

impl RollAxes {
    /// Returns the flags as `[rock, roll, yaw]`.
    pub fn as_array(&self) -> [bool; 3] {
        [self.rock, self.roll, self.yaw]
    }

    /// Returns true if any axis is enabled.
    pub fn any(&self) -> bool {
        self.rock || self.roll || self.yaw
    }
}

/// Limb snap that also preserves the foot control orientation through the
/// heel roll control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegRollIk2FkParams {
    /// The underlying limb snap.
    #[serde(flatten)]
    pub limb: LimbIk2FkParams,
    /// Heel roll control bone.
    pub heel_control: String,
    /// Heel axes allowed to absorb rotation.
    #[serde(default)]
    pub use_roll: RollAxes,
}

impl LegRollIk2FkParams {
    /// Creates leg roll parameters.
    pub fn new(limb: LimbIk2FkParams, heel_control: impl Into<String>) -> Self {
        Self {
            limb,
            heel_control: heel_control.into(),
            use_roll: RollAxes::default(),
        }
    }

    /// Sets the allowed roll axes.
    pub fn with_use_roll(mut self, use_roll: RollAxes) -> Self {
        self.use_roll = use_roll;
        self
    }

    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        self.limb.validate()?;
        if self.heel_control.is_empty() {
            return Err(ParamsError::MissingName {
                field: "heel_control",
            });
        }
        Ok(())
    }
}

// =============================================================================
// Switch Parent
// =============================================================================

/// Switches a control to another parent while keeping its pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SwitchParentParams {
    /// Control bone whose pose is preserved.
    pub bone: String,
    /// Bone carrying the parent selector property.
    pub prop_bone: String,
    /// Name of the integer parent selector property.
    pub prop_id: String,
    /// Candidate parent names, indexed by the selector value.
    pub parent_names: Vec<String>,
    /// Channels left untouched on the control.
    #[serde(default)]
    pub locks: TransformLocks,
    /// Parent index to switch to. `None` keeps the current selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected: Option<usize>,
}

impl SwitchParentParams {
    /// Creates switch parent parameters.
    pub fn new(
        bone: impl Into<String>,
        prop_bone: impl Into<String>,
        prop_id: impl Into<String>,
        parent_names: Vec<String>,
    ) -> Self {
        Self {
            bone: bone.into(),
            prop_bone: prop_bone.into(),
            prop_id: prop_id.into(),
            parent_names,
            locks: TransformLocks::default(),
            selected: None,
        }
    }

    /// Selects the target parent index.
    pub fn with_selected(mut self, selected: usize) -> Self {
        self.selected = Some(selected);
        self
    }

    /// Sets the channel locks.
    pub fn with_locks(mut self, locks: TransformLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.bone.is_empty() {
            return Err(ParamsError::MissingName { field: "bone" });
        }
        if self.prop_bone.is_empty() {
            return Err(ParamsError::MissingName { field: "prop_bone" });
        }
        if self.prop_id.is_empty() {
            return Err(ParamsError::MissingName { field: "prop_id" });
        }
        if self.parent_names.is_empty() {
            return Err(ParamsError::NoParents);
        }
        if let Some(selected) = self.selected {
            if selected >= self.parent_names.len() {
                return Err(ParamsError::SelectionOutOfRange {
                    selected,
                    count: self.parent_names.len(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// Clear Keyframes / Vehicle Floor
// =============================================================================

/// Removes transform keys from bones and resets their channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClearKeyframesParams {
    /// Bones to clear.
    pub bones: BoneChain,
}

impl ClearKeyframesParams {
    /// Validates the parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.bones.is_empty() {
            return Err(ParamsError::EmptyChain { field: "bones" });
        }
        Ok(())
    }
}

fn default_wheels_prop() -> String {
    "wheels".to_string()
}

fn default_null_bone() -> String {
    "MCH-null".to_string()
}

fn default_null_constraint() -> String {
    "Shrinkwrap".to_string()
}

/// Locates the wheel bones and the floor relay constraint on a vehicle rig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleFloorParams {
    /// Armature property listing the wheel bones.
    #[serde(default = "default_wheels_prop")]
    pub wheels_prop: String,
    /// Bone whose shrinkwrap constraint holds the floor object.
    #[serde(default = "default_null_bone")]
    pub null_bone: String,
    /// Name of the floor constraint on the null bone.
    #[serde(default = "default_null_constraint")]
    pub null_constraint: String,
}

impl Default for VehicleFloorParams {
    fn default() -> Self {
        Self {
            wheels_prop: default_wheels_prop(),
            null_bone: default_null_bone(),
            null_constraint: default_null_constraint(),
        }
    }
}
