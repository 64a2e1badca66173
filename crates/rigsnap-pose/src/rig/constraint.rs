//! Bone constraints that the engine inspects or the reference host evaluates.

use serde::{Deserialize, Serialize};

/// What a constraint reads from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum ConstraintTarget {
    /// No target assigned.
    #[default]
    None,
    /// A bone of the same armature.
    Bone { name: String },
    /// Another scene object.
    Object { name: String },
}

impl ConstraintTarget {
    /// Returns the target bone name, if the target is a bone.
    pub fn bone(&self) -> Option<&str> {
        match self {
            ConstraintTarget::Bone { name } => Some(name),
            _ => None,
        }
    }
}

/// Space a constraint reads its target in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetSpace {
    #[default]
    World,
    Pose,
    Local,
}

/// A custom property on a bone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyRef {
    pub bone: String,
    pub prop: String,
}

fn default_true() -> bool {
    true
}

fn default_one() -> f32 {
    1.0
}

fn default_chain_count() -> usize {
    2
}

/// Constraint-specific settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Copies (or, with offset, multiplies by) the target's scale.
    CopyScale {
        #[serde(default)]
        target: ConstraintTarget,
        #[serde(default)]
        target_space: TargetSpace,
        #[serde(default = "default_true")]
        use_x: bool,
        #[serde(default = "default_true")]
        use_y: bool,
        #[serde(default = "default_true")]
        use_z: bool,
        #[serde(default = "default_one")]
        power: f32,
        #[serde(default)]
        use_offset: bool,
        #[serde(default)]
        use_add: bool,
        #[serde(default)]
        use_make_uniform: bool,
    },
    /// Replaces the pose with the target's.
    CopyTransforms {
        #[serde(default)]
        target: ConstraintTarget,
    },
    /// Two-bone (or single-bone) inverse kinematics. Owned by the chain tip.
    Ik {
        target: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pole: Option<String>,
        /// Property that enables the pole; the pole is always used when unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pole_switch: Option<PropertyRef>,
        #[serde(default)]
        pole_angle: f32,
        #[serde(default = "default_chain_count")]
        chain_count: usize,
    },
    /// Follows the parent bone picked by an integer selector property.
    SwitchParent {
        selector: PropertyRef,
        targets: Vec<Option<String>>,
    },
    /// Projects onto a surface object. Only the target is modeled.
    Shrinkwrap {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
}

impl ConstraintKind {
    /// Display name of the constraint type.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConstraintKind::CopyScale { .. } => "COPY_SCALE",
            ConstraintKind::CopyTransforms { .. } => "COPY_TRANSFORMS",
            ConstraintKind::Ik { .. } => "IK",
            ConstraintKind::SwitchParent { .. } => "ARMATURE",
            ConstraintKind::Shrinkwrap { .. } => "SHRINKWRAP",
        }
    }
}

/// A constraint attached to a pose bone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    #[serde(default = "default_one")]
    pub influence: f32,
    #[serde(default)]
    pub mute: bool,
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

impl Constraint {
    /// Creates an unmuted constraint at full influence.
    pub fn new(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: name.into(),
            influence: 1.0,
            mute: false,
            kind,
        }
    }

    /// Sets the influence.
    pub fn with_influence(mut self, influence: f32) -> Self {
        self.influence = influence;
        self
    }

    /// Mutes the constraint.
    pub fn muted(mut self) -> Self {
        self.mute = true;
        self
    }

    /// Returns true if the constraint has any effect.
    pub fn is_active(&self) -> bool {
        !self.mute && self.influence > 0.0
    }

    /// Bones this constraint reads.
    pub fn dependencies(&self) -> Vec<&str> {
        match &self.kind {
            ConstraintKind::CopyScale { target, .. }
            | ConstraintKind::CopyTransforms { target } => target.bone().into_iter().collect(),
            ConstraintKind::Ik { target, pole, .. } => {
                let mut deps = vec![target.as_str()];
                deps.extend(pole.as_deref());
                deps
            }
            ConstraintKind::SwitchParent { targets, .. } => {
                targets.iter().flatten().map(String::as_str).collect()
            }
            ConstraintKind::Shrinkwrap { .. } => Vec::new(),
        }
    }
}

/// Builds a copy-scale-with-offset constraint targeting a bone.
pub fn copy_scale_offset(name: impl Into<String>, target_bone: impl Into<String>) -> Constraint {
    Constraint::new(
        name,
        ConstraintKind::CopyScale {
            target: ConstraintTarget::Bone {
                name: target_bone.into(),
            },
            target_space: TargetSpace::Pose,
            use_x: true,
            use_y: true,
            use_z: true,
            power: 1.0,
            use_offset: true,
            use_add: false,
            use_make_uniform: false,
        },
    )
}
