//! Local transform channels of a pose bone.

use std::fmt;

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::math::wrap_angle_near;

// =============================================================================
// Rotation Mode
// =============================================================================

/// Which rotation representation drives a bone.
///
/// Euler modes are named by the order their axes are applied, so `Xyz`
/// rotates about X first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RotationMode {
    #[default]
    #[serde(rename = "QUATERNION")]
    Quaternion,
    #[serde(rename = "AXIS_ANGLE")]
    AxisAngle,
    #[serde(rename = "XYZ")]
    Xyz,
    #[serde(rename = "XZY")]
    Xzy,
    #[serde(rename = "YXZ")]
    Yxz,
    #[serde(rename = "YZX")]
    Yzx,
    #[serde(rename = "ZXY")]
    Zxy,
    #[serde(rename = "ZYX")]
    Zyx,
}

impl RotationMode {
    /// Returns true for the six Euler modes.
    pub fn is_euler(self) -> bool {
        self.euler_axes().is_some()
    }

    /// Axis indices in application order, for Euler modes.
    pub fn euler_axes(self) -> Option<[usize; 3]> {
        match self {
            RotationMode::Xyz => Some([0, 1, 2]),
            RotationMode::Xzy => Some([0, 2, 1]),
            RotationMode::Yxz => Some([1, 0, 2]),
            RotationMode::Yzx => Some([1, 2, 0]),
            RotationMode::Zxy => Some([2, 0, 1]),
            RotationMode::Zyx => Some([2, 1, 0]),
            RotationMode::Quaternion | RotationMode::AxisAngle => None,
        }
    }

    /// Builds an Euler mode from axis indices in application order.
    pub fn from_euler_axes(axes: [usize; 3]) -> Option<Self> {
        match axes {
            [0, 1, 2] => Some(RotationMode::Xyz),
            [0, 2, 1] => Some(RotationMode::Xzy),
            [1, 0, 2] => Some(RotationMode::Yxz),
            [1, 2, 0] => Some(RotationMode::Yzx),
            [2, 0, 1] => Some(RotationMode::Zxy),
            [2, 1, 0] => Some(RotationMode::Zyx),
            _ => None,
        }
    }

    /// Moves the first applied axis to the end, e.g. `ZXY` becomes `XYZ`.
    pub fn rotate_euler_order(self) -> Option<Self> {
        self.euler_axes()
            .and_then(|[a, b, c]| Self::from_euler_axes([b, c, a]))
    }

    /// Intrinsic glam order equivalent to this Euler mode.
    fn glam_order(self) -> Option<EulerRot> {
        match self {
            RotationMode::Xyz => Some(EulerRot::ZYX),
            RotationMode::Xzy => Some(EulerRot::YZX),
            RotationMode::Yxz => Some(EulerRot::ZXY),
            RotationMode::Yzx => Some(EulerRot::XZY),
            RotationMode::Zxy => Some(EulerRot::YXZ),
            RotationMode::Zyx => Some(EulerRot::XYZ),
            RotationMode::Quaternion | RotationMode::AxisAngle => None,
        }
    }

    /// Composes an `(x, y, z)` Euler triple in this mode.
    ///
    /// Non-Euler modes fall back to `XYZ`.
    pub fn euler_to_quat(self, euler: Vec3) -> Quat {
        let order = self.glam_order().unwrap_or(EulerRot::ZYX);
        let [a, b, c] = glam_angle_order(order).map(|i| euler[i]);
        Quat::from_euler(order, a, b, c)
    }

    /// Decomposes a rotation into an `(x, y, z)` Euler triple in this mode.
    ///
    /// Non-Euler modes fall back to `XYZ`.
    pub fn quat_to_euler(self, rotation: Quat) -> Vec3 {
        let order = self.glam_order().unwrap_or(EulerRot::ZYX);
        let (a, b, c) = rotation.to_euler(order);
        let mut out = Vec3::ZERO;
        for (axis, angle) in glam_angle_order(order).into_iter().zip([a, b, c]) {
            out[axis] = angle;
        }
        out
    }
}

/// Axis index of each angle argument of a glam intrinsic order.
fn glam_angle_order(order: EulerRot) -> [usize; 3] {
    match order {
        EulerRot::ZYX => [2, 1, 0],
        EulerRot::YZX => [1, 2, 0],
        EulerRot::ZXY => [2, 0, 1],
        EulerRot::XZY => [0, 2, 1],
        EulerRot::YXZ => [1, 0, 2],
        _ => [0, 1, 2],
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RotationMode::Quaternion => "QUATERNION",
            RotationMode::AxisAngle => "AXIS_ANGLE",
            RotationMode::Xyz => "XYZ",
            RotationMode::Xzy => "XZY",
            RotationMode::Yxz => "YXZ",
            RotationMode::Yzx => "YZX",
            RotationMode::Zxy => "ZXY",
            RotationMode::Zyx => "ZYX",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Transform Properties
// =============================================================================

/// An animatable transform property of a pose bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TransformProp {
    Location,
    RotationEuler,
    RotationQuaternion,
    RotationAxisAngle,
    Scale,
}

impl TransformProp {
    /// Every transform property.
    pub const ALL: [TransformProp; 5] = [
        TransformProp::Location,
        TransformProp::RotationEuler,
        TransformProp::RotationQuaternion,
        TransformProp::RotationAxisAngle,
        TransformProp::Scale,
    ];
    /// Location only.
    pub const LOCATION: [TransformProp; 1] = [TransformProp::Location];
    /// All rotation representations.
    pub const ROTATION: [TransformProp; 3] = [
        TransformProp::RotationEuler,
        TransformProp::RotationQuaternion,
        TransformProp::RotationAxisAngle,
    ];
    /// Scale only.
    pub const SCALE: [TransformProp; 1] = [TransformProp::Scale];

    /// RNA-style property name used in data paths.
    pub fn path_name(self) -> &'static str {
        match self {
            TransformProp::Location => "location",
            TransformProp::RotationEuler => "rotation_euler",
            TransformProp::RotationQuaternion => "rotation_quaternion",
            TransformProp::RotationAxisAngle => "rotation_axis_angle",
            TransformProp::Scale => "scale",
        }
    }

    /// Parses a property name.
    pub fn from_path_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.path_name() == name)
    }

    /// Number of array components.
    pub fn len(self) -> usize {
        match self {
            TransformProp::RotationQuaternion | TransformProp::RotationAxisAngle => 4,
            _ => 3,
        }
    }

    /// The rotation property driven by `mode`.
    pub fn rotation_for(mode: RotationMode) -> Self {
        match mode {
            RotationMode::Quaternion => TransformProp::RotationQuaternion,
            RotationMode::AxisAngle => TransformProp::RotationAxisAngle,
            _ => TransformProp::RotationEuler,
        }
    }
}

/// Transform properties not excluded by whole-channel locks.
pub fn transform_props_with_locks(location: bool, rotation: bool, scale: bool) -> Vec<TransformProp> {
    let mut props = Vec::new();
    if !location {
        props.extend(TransformProp::LOCATION);
    }
    if !rotation {
        props.extend(TransformProp::ROTATION);
    }
    if !scale {
        props.extend(TransformProp::SCALE);
    }
    props
}

// =============================================================================
// Channels
// =============================================================================

fn default_quaternion() -> [f32; 4] {
    [1.0, 0.0, 0.0, 0.0]
}

fn default_axis_angle() -> [f32; 4] {
    [0.0, 0.0, 1.0, 0.0]
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

/// Local transform channels.
///
/// All three rotation representations are stored; only the one selected by
/// `rotation_mode` affects the pose. Quaternions are stored `[w, x, y, z]`
/// and axis-angle as `[angle, x, y, z]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Channels {
    #[serde(default)]
    pub location: Vec3,
    #[serde(default)]
    pub rotation_mode: RotationMode,
    #[serde(default = "default_quaternion")]
    pub rotation_quaternion: [f32; 4],
    #[serde(default)]
    pub rotation_euler: Vec3,
    #[serde(default = "default_axis_angle")]
    pub rotation_axis_angle: [f32; 4],
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

impl Default for Channels {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation_mode: RotationMode::default(),
            rotation_quaternion: default_quaternion(),
            rotation_euler: Vec3::ZERO,
            rotation_axis_angle: default_axis_angle(),
            scale: default_scale(),
        }
    }
}

impl Channels {
    /// Identity channels in the given rotation mode.
    pub fn identity(mode: RotationMode) -> Self {
        Self {
            rotation_mode: mode,
            ..Self::default()
        }
    }

    /// Rotation of the live representation.
    pub fn rotation(&self) -> Quat {
        match self.rotation_mode {
            RotationMode::Quaternion => {
                let [w, x, y, z] = self.rotation_quaternion;
                let q = Quat::from_xyzw(x, y, z, w);
                if q.length_squared() > 1e-12 {
                    q.normalize()
                } else {
                    Quat::IDENTITY
                }
            }
            RotationMode::AxisAngle => {
                let [angle, x, y, z] = self.rotation_axis_angle;
                let axis = Vec3::new(x, y, z);
                if axis.length_squared() > 1e-12 {
                    Quat::from_axis_angle(axis.normalize(), angle)
                } else {
                    Quat::IDENTITY
                }
            }
            mode => mode.euler_to_quat(self.rotation_euler),
        }
    }

    /// Local matrix built from location, live rotation and scale.
    pub fn matrix_basis(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.location)
    }

    /// Returns these channels with `matrix` decomposed into them.
    ///
    /// Only the live rotation representation changes. Quaternions keep the
    /// sign closest to the previous value and Euler angles stay within one
    /// turn of the previous angles.
    pub fn with_matrix_basis(&self, matrix: Mat4) -> Self {
        let (scale, rotation, location) = matrix.to_scale_rotation_translation();
        let mut out = *self;
        out.location = location;
        out.scale = scale;
        out.set_rotation(rotation);
        out
    }

    /// Writes `rotation` into the live representation.
    pub fn set_rotation(&mut self, rotation: Quat) {
        match self.rotation_mode {
            RotationMode::Quaternion => {
                let [w, x, y, z] = self.rotation_quaternion;
                let previous = Quat::from_xyzw(x, y, z, w);
                let q = if previous.dot(rotation) < 0.0 {
                    -rotation
                } else {
                    rotation
                };
                self.rotation_quaternion = [q.w, q.x, q.y, q.z];
            }
            RotationMode::AxisAngle => {
                let (axis, angle) = rotation.to_axis_angle();
                self.rotation_axis_angle = [angle, axis.x, axis.y, axis.z];
            }
            mode => {
                let euler = mode.quat_to_euler(rotation);
                let previous = self.rotation_euler;
                self.rotation_euler = Vec3::new(
                    wrap_angle_near(euler.x, previous.x),
                    wrap_angle_near(euler.y, previous.y),
                    wrap_angle_near(euler.z, previous.z),
                );
            }
        }
    }

    /// Switches the rotation mode, converting the current rotation into it.
    pub fn convert_rotation_mode(&mut self, mode: RotationMode) {
        let rotation = self.rotation();
        self.rotation_mode = mode;
        self.set_rotation(rotation);
    }

    /// Returns the components of a transform property.
    pub fn values(&self, prop: TransformProp) -> Vec<f32> {
        match prop {
            TransformProp::Location => self.location.to_array().to_vec(),
            TransformProp::RotationEuler => self.rotation_euler.to_array().to_vec(),
            TransformProp::RotationQuaternion => self.rotation_quaternion.to_vec(),
            TransformProp::RotationAxisAngle => self.rotation_axis_angle.to_vec(),
            TransformProp::Scale => self.scale.to_array().to_vec(),
        }
    }

    /// Returns one component of a transform property.
    pub fn value(&self, prop: TransformProp, index: usize) -> Option<f32> {
        self.values(prop).get(index).copied()
    }

    /// Sets one component of a transform property. Out-of-range indices are ignored.
    pub fn set_value(&mut self, prop: TransformProp, index: usize, value: f32) {
        match prop {
            TransformProp::Location if index < 3 => self.location[index] = value,
            TransformProp::RotationEuler if index < 3 => self.rotation_euler[index] = value,
            TransformProp::RotationQuaternion if index < 4 => {
                self.rotation_quaternion[index] = value
            }
            TransformProp::RotationAxisAngle if index < 4 => {
                self.rotation_axis_angle[index] = value
            }
            TransformProp::Scale if index < 3 => self.scale[index] = value,
            _ => {}
        }
    }

    /// Copies a whole property from `other`.
    pub fn copy_prop_from(&mut self, other: &Channels, prop: TransformProp) {
        match prop {
            TransformProp::Location => self.location = other.location,
            TransformProp::RotationEuler => self.rotation_euler = other.rotation_euler,
            TransformProp::RotationQuaternion => {
                self.rotation_quaternion = other.rotation_quaternion
            }
            TransformProp::RotationAxisAngle => {
                self.rotation_axis_angle = other.rotation_axis_angle
            }
            TransformProp::Scale => self.scale = other.scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx_quat(a: Quat, b: Quat) -> bool {
        a.dot(b).abs() > 1.0 - 1e-5
    }

    #[test]
    fn test_euler_modes_round_trip_rotation() {
        let euler = Vec3::new(0.3, -0.7, 1.1);
        for mode in [
            RotationMode::Xyz,
            RotationMode::Xzy,
            RotationMode::Yxz,
            RotationMode::Yzx,
            RotationMode::Zxy,
            RotationMode::Zyx,
        ] {
            let q = mode.euler_to_quat(euler);
            let back = mode.quat_to_euler(q);
            assert!((back - euler).length() < 1e-4, "{mode}: {back:?}");
        }
    }

    #[test]
    fn test_xyz_applies_x_first() {
        let q = RotationMode::Xyz.euler_to_quat(Vec3::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        let expected = Quat::from_rotation_z(FRAC_PI_2) * Quat::from_rotation_x(FRAC_PI_2);
        assert!(approx_quat(q, expected));
    }

    #[test]
    fn test_rotate_euler_order() {
        assert_eq!(RotationMode::Zxy.rotate_euler_order(), Some(RotationMode::Xyz));
        assert_eq!(RotationMode::Xzy.rotate_euler_order(), Some(RotationMode::Zyx));
        assert_eq!(RotationMode::Quaternion.rotate_euler_order(), None);
    }

    #[test]
    fn test_with_matrix_basis_keeps_other_representations() {
        let mut channels = Channels::identity(RotationMode::Zxy);
        channels.rotation_quaternion = [0.0, 1.0, 0.0, 0.0];
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.4),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let out = channels.with_matrix_basis(m);
        assert_eq!(out.rotation_quaternion, [0.0, 1.0, 0.0, 0.0]);
        assert!((out.rotation_euler.y - 0.4).abs() < 1e-5);
        assert!((out.scale - Vec3::splat(2.0)).length() < 1e-5);
        assert!((out.location - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn test_euler_stays_compatible_with_previous() {
        let mut channels = Channels::identity(RotationMode::Xyz);
        channels.rotation_euler = Vec3::new(0.0, 0.0, 6.0);
        let out = channels.with_matrix_basis(Mat4::from_quat(Quat::from_rotation_z(6.1)));
        assert!((out.rotation_euler.z - 6.1).abs() < 1e-4);
    }

    #[test]
    fn test_quaternion_sign_follows_previous() {
        let mut channels = Channels::identity(RotationMode::Quaternion);
        channels.rotation_quaternion = [-1.0, 0.0, 0.0, 0.0];
        let out = channels.with_matrix_basis(Mat4::IDENTITY);
        assert!(out.rotation_quaternion[0] < 0.0);
    }

    #[test]
    fn test_convert_rotation_mode() {
        let mut channels = Channels::identity(RotationMode::Quaternion);
        let q = Quat::from_rotation_x(0.5);
        channels.set_rotation(q);
        channels.convert_rotation_mode(RotationMode::Zxy);
        assert!(approx_quat(channels.rotation(), q));
        assert!((channels.rotation_euler.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_transform_props_with_locks() {
        let props = transform_props_with_locks(false, true, true);
        assert_eq!(props, vec![TransformProp::Location]);
        assert_eq!(transform_props_with_locks(false, false, false).len(), 5);
    }
}
