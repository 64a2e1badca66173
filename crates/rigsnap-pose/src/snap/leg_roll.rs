//! Leg IK to FK snap that preserves the foot control's orientation.
//!
//! The difference between the foot control's current orientation and the FK
//! foot is pushed into the heel roll control, and the toe's share of it into
//! the heel's `Toe_Roll` property, before the limb snap runs.

use std::collections::BTreeSet;

use glam::{Mat4, Vec3};
use rigsnap_spec::LegRollIk2FkParams;

use crate::bake::{BakeSession, FrameOperator, Keying};
use crate::error::{PoseError, PoseResult};
use crate::host::RigHost;
use crate::keying::{keyframe_transform_properties, set_custom_property_value, ChannelMask, KeyFlags};
use crate::math::rotation_of;
use crate::rig::{PropValue, RotationMode, TransformProp};
use crate::transform::{chain_transform_matrices, convert_via_rest_delta, invert};

use super::limb::{apply_limb_state, control_curves, init_limb};

/// Heel property receiving the toe roll ratio.
pub const TOE_ROLL_PROP: &str = "Toe_Roll";

/// Toe roll ratios below this are written as zero.
const TOE_ROLL_EPSILON: f32 = 1e-5;

/// Roll and turn axis indices, and the axis each roll flag maps to, for the
/// heel rotation modes the decomposition supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeelAxes {
    pub roll: usize,
    pub turn: usize,
    /// For each Euler component, the index into `[rock, roll, yaw]`.
    pub use_map: [usize; 3],
}

impl HeelAxes {
    /// Axes for a heel rotation mode, or `None` if the mode is unsupported.
    pub fn for_mode(mode: RotationMode) -> Option<Self> {
        match mode {
            RotationMode::Zxy => Some(Self {
                roll: 0,
                turn: 2,
                use_map: [1, 0, 2],
            }),
            RotationMode::Xzy => Some(Self {
                roll: 2,
                turn: 0,
                use_map: [2, 0, 1],
            }),
            _ => None,
        }
    }
}

/// Snaps a leg's IK controls to FK, absorbing foot orientation into heel roll.
#[derive(Debug)]
pub struct LegRollIk2Fk<'a> {
    params: &'a LegRollIk2FkParams,
}

impl<'a> LegRollIk2Fk<'a> {
    pub fn new(params: &'a LegRollIk2FkParams) -> Self {
        Self { params }
    }
}

impl FrameOperator for LegRollIk2Fk<'_> {
    type State = Vec<Mat4>;

    fn init(&mut self, host: &dyn RigHost) -> PoseResult<()> {
        init_limb(host, &self.params.limb)?;
        let heel = host.require_bone(&self.params.heel_control)?;
        let mode = heel.channels.rotation_mode;
        if self.params.use_roll.any() && HeelAxes::for_mode(mode).is_none() {
            return Err(PoseError::UnsupportedRotationMode {
                bone: heel.name.clone(),
                mode: mode.to_string(),
            });
        }
        Ok(())
    }

    fn scan_curves(
        &mut self,
        host: &dyn RigHost,
        session: &mut BakeSession,
    ) -> PoseResult<BTreeSet<usize>> {
        let limb = &self.params.limb;
        session.add_bone_frames(host, limb.fk_bones.iter(), &TransformProp::ALL);
        session.add_bone_frames(host, limb.ctrl_bones.last(), &TransformProp::ROTATION);
        Ok(control_curves(session, limb))
    }

    /// FK chain matrices followed by the foot control's matrix.
    fn save_frame_state(&mut self, host: &dyn RigHost) -> PoseResult<Vec<Mat4>> {
        let limb = &self.params.limb;
        chain_transform_matrices(host, limb.fk_bones.iter().chain(limb.ctrl_bones.last()))
    }

    fn apply_frame_state(
        &mut self,
        host: &mut dyn RigHost,
        keying: &Keying,
        matrices: Vec<Mat4>,
    ) -> PoseResult<()> {
        let params = self.params;
        let keyflags = keying.keyflags;
        apply_limb_state(host, &params.limb, &matrices, keyflags, |host| {
            assign_heel_roll(host, params, &matrices, keyflags)
        })
    }
}

fn assign_heel_roll(
    host: &mut dyn RigHost,
    params: &LegRollIk2FkParams,
    matrices: &[Mat4],
    keyflags: Option<KeyFlags>,
) -> PoseResult<()> {
    if !params.use_roll.any() {
        return Ok(());
    }
    let limb = &params.limb;
    let heel = params.heel_control.as_str();
    let (Some(foot_ctrl), Some(ik_last)) = (limb.ctrl_bones.last(), limb.ik_bones.last()) else {
        return Err(PoseError::missing_data("limb control chain"));
    };

    let ik_len = limb.ik_bones.len();
    let fk_len = limb.fk_bones.len();
    let (Some(&foot_matrix), Some(&ctrl_matrix)) = (
        ik_len.checked_sub(1).and_then(|i| matrices.get(i)),
        matrices.get(fk_len),
    )
    else {
        return Err(PoseError::StateTooShort {
            expected: fk_len + 1,
            actual: matrices.len(),
        });
    };

    let heel_rest = convert_via_rest_delta(host, ctrl_matrix, foot_ctrl, heel)?;
    let heel_rot = convert_via_rest_delta(host, foot_matrix, ik_last, heel)?;
    let heel_rest_inv = invert(heel_rest, heel)?;

    let heel_bone = host.require_bone(heel)?;
    let mode = heel_bone.channels.rotation_mode;
    let has_toe_roll = heel_bone.props.contains(TOE_ROLL_PROP);
    let axes = HeelAxes::for_mode(mode).ok_or_else(|| PoseError::UnsupportedRotationMode {
        bone: heel.to_string(),
        mode: mode.to_string(),
    })?;

    let requested = params.use_roll.as_array();
    let use_axes = axes.use_map.map(|i| requested[i]);

    // Turn axis unused: rotate the decomposition order by one.
    let decompose_mode = if use_axes[axes.turn] {
        mode
    } else {
        mode.rotate_euler_order().unwrap_or(mode)
    };

    let local = decompose_mode.quat_to_euler(rotation_of(&(heel_rest_inv * heel_rot)));
    let masked = Vec3::from_array(std::array::from_fn(|i| {
        if use_axes[i] {
            local[i]
        } else {
            0.0
        }
    }));
    host.require_bone_mut(heel)?.channels.rotation_euler = masked;

    if let Some(flags) = keyflags {
        keyframe_transform_properties(host, heel, flags, ChannelMask::excluding(true, false, true))?;
    }

    let Some(toe) = limb.tail_bones.first() else {
        return Ok(());
    };
    if !has_toe_roll {
        return Ok(());
    }
    let Some(&toe_matrix) = matrices.get(ik_len) else {
        return Err(PoseError::StateTooShort {
            expected: ik_len + 1,
            actual: matrices.len(),
        });
    };

    let heel_rot_toe = convert_via_rest_delta(host, toe_matrix, toe, heel)?;
    let toe_rot = decompose_mode.quat_to_euler(rotation_of(&(heel_rest_inv * heel_rot_toe)));

    let mut heel_applied = masked;
    heel_applied[axes.roll] = heel_applied[axes.roll].max(0.0);

    let ratio = toe_roll_ratio(heel_applied, toe_rot, use_axes, axes.roll, axes.turn);
    set_custom_property_value(
        host,
        heel,
        TOE_ROLL_PROP,
        PropValue::Float(f64::from(ratio)),
        keyflags,
    )
}

/// Share of the heel rotation that the toe rotation accounts for.
///
/// Considers the roll and turn axes that are in use and where heel and toe
/// rotate the same way, takes the smallest ratio, and clamps it to `[0, 1]`.
/// Ratios below `1e-5` become zero.
pub fn toe_roll_ratio(heel: Vec3, toe: Vec3, use_axes: [bool; 3], roll: usize, turn: usize) -> f32 {
    let ratio = [roll, turn]
        .into_iter()
        .filter(|&i| use_axes[i] && heel[i] * toe[i] > 0.0)
        .map(|i| toe[i] / heel[i])
        .reduce(f32::min)
        .unwrap_or(0.0)
        .clamp(0.0, 1.0);
    if ratio < TOE_ROLL_EPSILON {
        0.0
    } else {
        ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_heel_axes() {
        let zxy = HeelAxes::for_mode(RotationMode::Zxy).unwrap();
        assert_eq!((zxy.roll, zxy.turn), (0, 2));
        assert_eq!(zxy.use_map, [1, 0, 2]);
        let xzy = HeelAxes::for_mode(RotationMode::Xzy).unwrap();
        assert_eq!((xzy.roll, xzy.turn), (2, 0));
        assert!(HeelAxes::for_mode(RotationMode::Quaternion).is_none());
        assert!(HeelAxes::for_mode(RotationMode::Xyz).is_none());
    }

    #[test]
    fn test_toe_roll_ratio_clamps() {
        let all = [true; 3];
        // Toe rotates further than the heel: clamped to 1.
        let ratio = toe_roll_ratio(Vec3::new(0.2, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0), all, 0, 2);
        assert_eq!(ratio, 1.0);

        // Opposite directions contribute nothing.
        let ratio = toe_roll_ratio(Vec3::new(0.2, 0.0, 0.0), Vec3::new(-0.1, 0.0, 0.0), all, 0, 2);
        assert_eq!(ratio, 0.0);

        // Smallest ratio wins.
        let ratio = toe_roll_ratio(Vec3::new(0.4, 0.0, 0.2), Vec3::new(0.2, 0.0, 0.15), all, 0, 2);
        assert!((ratio - 0.5).abs() < 1e-6);

        // Tiny ratios become exactly zero.
        let ratio = toe_roll_ratio(Vec3::new(1.0, 0.0, 0.0), Vec3::new(1e-7, 0.0, 0.0), all, 0, 2);
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn test_toe_roll_ratio_ignores_unused_axes() {
        let use_axes = [false, true, true];
        let ratio = toe_roll_ratio(Vec3::new(0.4, 0.0, 0.2), Vec3::new(0.1, 0.0, 0.1), use_axes, 0, 2);
        assert!((ratio - 0.5).abs() < 1e-6);
    }
}
