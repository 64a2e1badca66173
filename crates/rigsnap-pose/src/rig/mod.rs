//! Rig data model: pose bones, their channels, locks, constraints and
//! custom properties.

mod channels;
mod constraint;
mod props;

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

pub use channels::{transform_props_with_locks, Channels, RotationMode, TransformProp};
pub use constraint::{
    copy_scale_offset, Constraint, ConstraintKind, ConstraintTarget, PropertyRef, TargetSpace,
};
pub use props::{PropValue, PropertyBag};

/// Coordinate space of a transform matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Space {
    /// Scene world space.
    World,
    /// Armature object space, after constraints.
    Pose,
    /// Relative to the bone's rest pose and parent.
    Local,
    /// An arbitrary frame expressed in pose space.
    Custom(Mat4),
}

/// How a bone inherits scale from its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InheritScale {
    #[default]
    Full,
    None,
}

/// Per-component channel locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelLocks {
    #[serde(default)]
    pub location: [bool; 3],
    #[serde(default)]
    pub rotation: [bool; 3],
    #[serde(default)]
    pub rotation_w: bool,
    /// Lock quaternion and axis-angle components individually.
    #[serde(default)]
    pub rotations_4d: bool,
    #[serde(default)]
    pub scale: [bool; 3],
}

impl ChannelLocks {
    /// Lock flags for a 4-component rotation, `[w, x, y, z]`.
    pub fn rotation_4d(&self) -> [bool; 4] {
        if self.rotations_4d {
            let [x, y, z] = self.rotation;
            [self.rotation_w, x, y, z]
        } else {
            [self.rotation.iter().all(|&l| l); 4]
        }
    }

    /// Lock flags for the given transform property.
    pub fn for_prop(&self, prop: TransformProp) -> Vec<bool> {
        match prop {
            TransformProp::Location => self.location.to_vec(),
            TransformProp::RotationEuler => self.rotation.to_vec(),
            TransformProp::RotationQuaternion | TransformProp::RotationAxisAngle => {
                self.rotation_4d().to_vec()
            }
            TransformProp::Scale => self.scale.to_vec(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A bone of the armature together with its pose state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoseBone {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Rest matrix in armature space.
    pub rest: Mat4,
    /// Rest length, head to tail.
    pub length: f32,
    #[serde(default)]
    pub use_connect: bool,
    #[serde(default = "default_true")]
    pub inherit_rotation: bool,
    #[serde(default)]
    pub inherit_scale: InheritScale,
    #[serde(default)]
    pub channels: Channels,
    #[serde(default)]
    pub locks: ChannelLocks,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub props: PropertyBag,
}

impl PoseBone {
    /// Creates a bone whose rest pose runs from `head` to `tail`.
    ///
    /// The rest orientation is the shortest rotation taking +Y onto the bone
    /// direction.
    pub fn new(name: impl Into<String>, head: Vec3, tail: Vec3) -> Self {
        let direction = tail - head;
        let length = direction.length();
        let rotation = if length > 1e-6 {
            Quat::from_rotation_arc(Vec3::Y, direction / length)
        } else {
            Quat::IDENTITY
        };
        Self::with_rest(name, Mat4::from_rotation_translation(rotation, head), length)
    }

    /// Creates a bone from an explicit rest matrix.
    pub fn with_rest(name: impl Into<String>, rest: Mat4, length: f32) -> Self {
        Self {
            name: name.into(),
            parent: None,
            rest,
            length,
            use_connect: false,
            inherit_rotation: true,
            inherit_scale: InheritScale::Full,
            channels: Channels::default(),
            locks: ChannelLocks::default(),
            constraints: Vec::new(),
            props: PropertyBag::default(),
        }
    }

    /// Sets the parent bone.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Connects the bone's head to its parent's tail.
    pub fn connected(mut self) -> Self {
        self.use_connect = true;
        self
    }

    /// Sets the rotation mode, converting the current rotation.
    pub fn with_rotation_mode(mut self, mode: RotationMode) -> Self {
        self.channels.convert_rotation_mode(mode);
        self
    }

    /// Sets the channel locks.
    pub fn with_locks(mut self, locks: ChannelLocks) -> Self {
        self.locks = locks;
        self
    }

    /// Appends a constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Sets a custom property.
    pub fn with_prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.set(key, value);
        self
    }

    /// Head position in rest pose.
    pub fn rest_head(&self) -> Vec3 {
        self.rest.w_axis.truncate()
    }

    /// Tail position in rest pose.
    pub fn rest_tail(&self) -> Vec3 {
        self.rest.transform_point3(Vec3::Y * self.length)
    }

    /// First constraint of the given type name, e.g. `"SHRINKWRAP"`.
    pub fn constraint_of_type(&self, type_name: &str) -> Option<&Constraint> {
        self.constraints
            .iter()
            .find(|c| c.kind.type_name() == type_name)
    }

    /// Mutable access to the first constraint of the given type name.
    pub fn constraint_of_type_mut(&mut self, type_name: &str) -> Option<&mut Constraint> {
        self.constraints
            .iter_mut()
            .find(|c| c.kind.type_name() == type_name)
    }
}
