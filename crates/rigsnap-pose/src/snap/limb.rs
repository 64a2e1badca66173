//! Limb IK to FK snap.
//!
//! Places the IK controls of a limb so that the IK chain reproduces the FK
//! chain's pose: the end control follows the FK end bone, the base control
//! takes the FK base position, and the base orientation is recovered either
//! by placing the pole target or by searching the base control's Y rotation.

use std::collections::BTreeSet;
use std::f32::consts::PI;

use glam::{Mat4, Vec3};
use rigsnap_spec::LimbIk2FkParams;
use tracing::debug;

use crate::bake::{BakeSession, FrameOperator, Keying};
use crate::error::{PoseError, PoseResult};
use crate::host::RigHost;
use crate::keying::{keyframe_transform_properties, ChannelMask, KeyFlags};
use crate::math::{bracket_minimum, ternary_minimize, BRACKET_STEP};
use crate::rig::{Channels, InheritScale, RotationMode, Space, TransformProp};
use crate::transform::{
    bone_vector, chain_transform_matrices, convert_via_pose_delta, convert_via_rest_delta,
    write_transform, WriteOptions,
};

use super::pole::match_pole_target;
use super::require_bones;

/// Maximum number of base scale correction passes.
pub const SCALE_CORRECTION_MAX_ITERATIONS: usize = 3;

/// Relative per-axis scale error accepted by the base scale correction.
pub const SCALE_CORRECTION_TOLERANCE: f32 = 0.01;

/// Angular tolerance of the base rotation search.
pub const ROTATION_SEARCH_TOLERANCE: f32 = PI / 180.0;

// =============================================================================
// Operator
// =============================================================================

/// Snaps a limb's IK controls to its FK pose.
#[derive(Debug)]
pub struct LimbIk2Fk<'a> {
    params: &'a LimbIk2FkParams,
}

impl<'a> LimbIk2Fk<'a> {
    pub fn new(params: &'a LimbIk2FkParams) -> Self {
        Self { params }
    }
}

impl FrameOperator for LimbIk2Fk<'_> {
    type State = Vec<Mat4>;

    fn init(&mut self, host: &dyn RigHost) -> PoseResult<()> {
        init_limb(host, self.params)
    }

    fn scan_curves(
        &mut self,
        host: &dyn RigHost,
        session: &mut BakeSession,
    ) -> PoseResult<BTreeSet<usize>> {
        session.add_bone_frames(host, self.params.fk_bones.iter(), &TransformProp::ALL);
        Ok(control_curves(session, self.params))
    }

    fn save_frame_state(&mut self, host: &dyn RigHost) -> PoseResult<Vec<Mat4>> {
        chain_transform_matrices(host, self.params.fk_bones.iter())
    }

    fn apply_frame_state(
        &mut self,
        host: &mut dyn RigHost,
        keying: &Keying,
        matrices: Vec<Mat4>,
    ) -> PoseResult<()> {
        apply_limb_state(host, self.params, &matrices, keying.keyflags, |_| Ok(()))
    }
}

pub(crate) fn init_limb(host: &dyn RigHost, params: &LimbIk2FkParams) -> PoseResult<()> {
    host.require_bone(&params.prop_bone)?;
    require_bones(host, params.fk_bones.iter())?;
    require_bones(host, params.ik_bones.iter())?;
    require_bones(host, params.ctrl_bones.iter())?;
    require_bones(host, params.tail_bones.iter())?;
    require_bones(host, params.extra_ctrls.iter())
}

/// Curves of the controls and extra controls, all transform properties.
pub(crate) fn control_curves(session: &BakeSession, params: &LimbIk2FkParams) -> BTreeSet<usize> {
    let bones = params.ctrl_bones.iter().chain(params.extra_ctrls.iter());
    session.bone_curves(bones, &TransformProp::ALL)
}

/// Returns true if the limb's pole target is enabled.
pub fn use_pole(host: &dyn RigHost, params: &LimbIk2FkParams) -> PoseResult<bool> {
    Ok(host
        .require_bone(&params.prop_bone)?
        .props
        .get(&params.pole_prop)
        .is_some_and(|value| value.is_truthy()))
}

// =============================================================================
// Snap
// =============================================================================

/// Applies captured FK matrices to the IK controls.
///
/// `matrices` holds the IK-matched FK matrices followed by the tail matrices.
/// `assign_extra` runs after the extra controls are reset and before the end
/// control is placed.
pub(crate) fn apply_limb_state<F>(
    host: &mut dyn RigHost,
    params: &LimbIk2FkParams,
    matrices: &[Mat4],
    keyflags: Option<KeyFlags>,
    assign_extra: F,
) -> PoseResult<()>
where
    F: FnOnce(&mut dyn RigHost) -> PoseResult<()>,
{
    let ik: Vec<&str> = params.ik_bones.iter().collect();
    let ctrl: Vec<&str> = params.ctrl_bones.iter().collect();
    let tail: Vec<&str> = params.tail_bones.iter().collect();

    let expected = ik.len() + tail.len();
    if matrices.len() < expected || ik.len() < 2 || ctrl.len() < 2 {
        return Err(PoseError::StateTooShort {
            expected,
            actual: matrices.len(),
        });
    }
    let (chain, tail_matrices) = matrices.split_at(ik.len());
    let last = ik.len() - 1;
    let ctrl_last = ctrl.len() - 1;

    let use_pole = use_pole(host, params)?;

    for extra in params.extra_ctrls.iter() {
        let options = WriteOptions::new()
            .in_space(Space::Local)
            .with_keyflags(keyflags);
        write_transform(host, extra, Mat4::IDENTITY, &options)?;
    }
    assign_extra(host)?;
    host.update();

    let end = convert_via_pose_delta(host, chain[last], ik[last], ctrl[ctrl_last])?;
    let options = WriteOptions::new()
        .with_undo_copy_scale(true)
        .with_keyflags(keyflags);
    write_transform(host, ctrl[ctrl_last], end, &options)?;

    let base = host.require_bone_mut(ctrl[0])?;
    base.channels = Channels::identity(base.channels.rotation_mode);
    let options = WriteOptions::new().no_scale(true).no_rot(use_pole);
    write_transform(host, ctrl[0], chain[0], &options)?;

    assign_middle_controls(host, chain, &ik, &ctrl, true, None)?;

    host.update();
    if use_pole {
        let length = host.require_bone(ik[0])?.length + host.require_bone(ik[1])?.length;
        match_pole_target(host, ik[0], ik[1], ctrl[1], chain[0], length)?;
    } else {
        correct_rotation(host, ik[0], chain[0], ctrl[0])?;
    }

    correct_scale(host, ik[0], chain[0], ctrl[0])?;

    assign_middle_controls(host, chain, &ik, &ctrl, false, keyflags)?;

    for (matrix, bone) in tail_matrices.iter().zip(&tail) {
        host.update();
        let options = WriteOptions::new().with_keyflags(keyflags);
        write_transform(host, bone, *matrix, &options)?;
    }

    if let Some(flags) = keyflags {
        if use_pole {
            keyframe_transform_properties(host, ctrl[1], flags, ChannelMask::excluding(false, true, true))?;
        }
        keyframe_transform_properties(host, ctrl[0], flags, ChannelMask::excluding(false, use_pole, false))?;
    }
    Ok(())
}

/// Places the controls between the base and the end, last first.
///
/// With `lock` the controls stop inheriting rotation and scale so that moving
/// the base does not disturb them; without it inheritance is restored.
fn assign_middle_controls(
    host: &mut dyn RigHost,
    matrices: &[Mat4],
    ik: &[&str],
    ctrl: &[&str],
    lock: bool,
    keyflags: Option<KeyFlags>,
) -> PoseResult<()> {
    let end = matrices.len().min(ctrl.len()).saturating_sub(1);
    for i in (2..end).rev() {
        let bone = host.require_bone_mut(ctrl[i])?;
        bone.inherit_rotation = !lock;
        bone.inherit_scale = if lock {
            InheritScale::None
        } else {
            InheritScale::Full
        };
        host.update();

        let matrix = convert_via_rest_delta(host, matrices[i], ik[i], ctrl[i])?;
        let options = WriteOptions::new().with_keyflags(keyflags);
        write_transform(host, ctrl[i], matrix, &options)?;
    }
    Ok(())
}

// =============================================================================
// Corrections
// =============================================================================

/// Turns `ctrl` about its own Y axis until `bone_ik` points along the Y axis
/// of `target`.
///
/// Quaternion and axis-angle controls are switched to `ZXY` Euler first.
/// When no bracketing interval is found the rotation is left at its start.
pub fn correct_rotation(
    host: &mut dyn RigHost,
    bone_ik: &str,
    target: Mat4,
    ctrl: &str,
) -> PoseResult<()> {
    let axis = target.y_axis.truncate().normalize_or_zero();

    let channels = &mut host.require_bone_mut(ctrl)?.channels;
    if !channels.rotation_mode.is_euler() {
        channels.convert_rotation_mode(RotationMode::Zxy);
    }
    let start = channels.rotation_euler.y;

    let distance = |host: &mut dyn RigHost, angle: f32| -> PoseResult<f32> {
        host.require_bone_mut(ctrl)?.channels.rotation_euler.y = angle;
        host.update();
        Ok(-bone_vector(host, bone_ik)?.normalize_or_zero().dot(axis))
    };

    let angle = match bracket_minimum(|a| distance(&mut *host, a), start, BRACKET_STEP)? {
        Some((left, right)) => ternary_minimize(
            |a| distance(&mut *host, a),
            left,
            right,
            ROTATION_SEARCH_TOLERANCE,
        )?,
        None => start,
    };
    debug!(ctrl, start, angle, "Corrected base rotation");

    host.require_bone_mut(ctrl)?.channels.rotation_euler.y = angle;
    host.update();
    Ok(())
}

/// Rescales `ctrl` until the pose scale of `bone_ik` matches `target`.
///
/// Runs at most [`SCALE_CORRECTION_MAX_ITERATIONS`] passes and stops once
/// every axis is within [`SCALE_CORRECTION_TOLERANCE`].
pub fn correct_scale(
    host: &mut dyn RigHost,
    bone_ik: &str,
    target: Mat4,
    ctrl: &str,
) -> PoseResult<()> {
    let input = target.to_scale_rotation_translation().0;

    for iteration in 0..SCALE_CORRECTION_MAX_ITERATIONS {
        let current = host.require_pose_matrix(bone_ik)?.to_scale_rotation_translation().0;
        if current.abs().min_element() < f32::EPSILON || input.abs().min_element() < f32::EPSILON {
            break;
        }

        let channels = &mut host.require_bone_mut(ctrl)?.channels;
        channels.scale = channels.scale * input / current;
        host.update();

        if scale_converged(input, current) {
            debug!(ctrl, iteration, "Base scale converged");
            break;
        }
    }
    Ok(())
}

fn scale_converged(input: Vec3, current: Vec3) -> bool {
    ((current - input) / input)
        .abs()
        .cmplt(Vec3::splat(SCALE_CORRECTION_TOLERANCE))
        .all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::Armature;
    use crate::rig::PoseBone;
    use glam::Quat;

    fn rig() -> Armature {
        Armature::new("rig")
            .with_bone(PoseBone::new("root", Vec3::ZERO, Vec3::Y))
            .with_bone(
                PoseBone::new("arm", Vec3::Y, Vec3::new(1.0, 1.0, 0.0)).with_parent("root"),
            )
            .built()
    }

    #[test]
    fn test_correct_rotation_aligns_child() {
        let mut rig = rig();
        let target = Mat4::from_quat(Quat::from_rotation_arc(Vec3::Y, Vec3::Z));
        correct_rotation(&mut rig, "arm", target, "root").unwrap();

        let root = rig.bone("root").unwrap();
        assert_eq!(root.channels.rotation_mode, RotationMode::Zxy);
        let vector = bone_vector(&rig, "arm").unwrap().normalize();
        assert!(vector.dot(Vec3::Z) > 0.999, "{vector:?}");
    }

    #[test]
    fn test_correct_scale_through_parent() {
        let mut rig = rig();
        rig.bone_mut("arm").unwrap().channels.scale = Vec3::splat(0.5);
        rig.update();

        let target = Mat4::from_scale(Vec3::splat(1.5));
        correct_scale(&mut rig, "arm", target, "root").unwrap();

        let root = rig.bone("root").unwrap().channels.scale;
        assert!(root.abs_diff_eq(Vec3::splat(3.0), 1e-4), "{root:?}");
        let scale = rig.pose_matrix("arm").unwrap().to_scale_rotation_translation().0;
        assert!(scale_converged(Vec3::splat(1.5), scale));
    }

    #[test]
    fn test_scale_converged() {
        assert!(scale_converged(Vec3::ONE, Vec3::splat(1.005)));
        assert!(!scale_converged(Vec3::ONE, Vec3::new(1.0, 1.02, 1.0)));
    }
}
