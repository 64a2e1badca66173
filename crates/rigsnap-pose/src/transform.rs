//! Reading and writing bone transforms.
//!
//! Writes go through the bone's local space, respect channel locks, keep the
//! non-live rotation representations untouched, and can compensate for
//! copy-scale-with-offset constraints so that the written channels reflect
//! the scale before the constraint applies.

use glam::{Mat4, Vec3};
use rigsnap_spec::TransformLocks;

use crate::error::{PoseError, PoseResult};
use crate::host::RigHost;
use crate::keying::{keyframe_transform_properties, ChannelMask, KeyFlags};
use crate::rig::{
    Channels, ChannelLocks, Constraint, ConstraintKind, ConstraintTarget, Space, TargetSpace,
    TransformProp,
};

// =============================================================================
// Options
// =============================================================================

/// Options for [`write_transform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WriteOptions {
    /// Space the input matrix is expressed in.
    pub space: Space,
    /// Compensate for copy-scale-with-offset constraints on the bone.
    pub undo_copy_scale: bool,
    /// Channels to leave untouched.
    pub mask: ChannelMask,
    /// Key the written channels with these flags.
    pub keyflags: Option<KeyFlags>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            space: Space::Pose,
            undo_copy_scale: false,
            mask: ChannelMask::default(),
            keyflags: None,
        }
    }
}

impl WriteOptions {
    /// Pose-space write of every unlocked channel, without keying.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the input space.
    pub fn in_space(mut self, space: Space) -> Self {
        self.space = space;
        self
    }

    /// Enables copy-scale compensation.
    pub fn with_undo_copy_scale(mut self, undo: bool) -> Self {
        self.undo_copy_scale = undo;
        self
    }

    /// Applies whole-channel locks from operator parameters.
    pub fn with_locks(mut self, locks: TransformLocks) -> Self {
        self.mask.no_loc = locks.location;
        self.mask.no_rot = locks.rotation;
        self.mask.no_scale = locks.scale;
        self
    }

    /// Leaves location untouched.
    pub fn no_loc(mut self, no_loc: bool) -> Self {
        self.mask.no_loc = no_loc;
        self
    }

    /// Leaves rotation untouched.
    pub fn no_rot(mut self, no_rot: bool) -> Self {
        self.mask.no_rot = no_rot;
        self
    }

    /// Leaves scale untouched.
    pub fn no_scale(mut self, no_scale: bool) -> Self {
        self.mask.no_scale = no_scale;
        self
    }

    /// Writes individually locked components too.
    pub fn ignore_locks(mut self, ignore: bool) -> Self {
        self.mask.ignore_locks = ignore;
        self
    }

    /// Keys written channels.
    pub fn with_keyflags(mut self, keyflags: Option<KeyFlags>) -> Self {
        self.keyflags = keyflags;
        self
    }
}

// =============================================================================
// Reading
// =============================================================================

/// Reads a bone matrix in `space`.
///
/// With `with_constraints` the evaluated pose matrix is used; otherwise the
/// raw local channels.
pub fn read_transform(
    host: &dyn RigHost,
    bone: &str,
    space: Space,
    with_constraints: bool,
) -> PoseResult<Mat4> {
    if with_constraints {
        let matrix = host.require_pose_matrix(bone)?;
        host.convert_space(bone, matrix, Space::Pose, space)
    } else {
        let basis = host.require_bone(bone)?.channels.matrix_basis();
        host.convert_space(bone, basis, Space::Local, space)
    }
}

/// Reads the post-constraint pose matrices of a chain.
pub fn chain_transform_matrices<'a>(
    host: &dyn RigHost,
    bones: impl IntoIterator<Item = &'a str>,
) -> PoseResult<Vec<Mat4>> {
    bones
        .into_iter()
        .map(|bone| read_transform(host, bone, Space::Pose, true))
        .collect()
}

// =============================================================================
// Writing
// =============================================================================

/// Writes `matrix` into a bone's local channels.
///
/// Excluded channels and locked components keep their previous values; the
/// channel set is committed in one assignment. Location is never written on
/// connected bones.
pub fn write_transform(
    host: &mut dyn RigHost,
    bone: &str,
    matrix: Mat4,
    options: &WriteOptions,
) -> PoseResult<()> {
    let mut local = host.convert_space(bone, matrix, options.space, Space::Local)?;
    if options.undo_copy_scale {
        local = undo_copy_scale_constraints(host, bone, local)?;
    }

    let pose_bone = host.require_bone(bone)?;
    let old = pose_bone.channels;
    let locks = pose_bone.locks;
    let mask = ChannelMask {
        no_loc: options.mask.no_loc || pose_bone.use_connect,
        ..options.mask
    };

    let channels = restore_locked_channels(old.with_matrix_basis(local), &old, &locks, mask);
    host.require_bone_mut(bone)?.channels = channels;

    if let Some(flags) = options.keyflags {
        keyframe_transform_properties(host, bone, flags, options.mask)?;
    }
    Ok(())
}

/// Copies excluded properties and locked components from `old` into `new`.
fn restore_locked_channels(
    mut new: Channels,
    old: &Channels,
    locks: &ChannelLocks,
    mask: ChannelMask,
) -> Channels {
    let rotation = TransformProp::rotation_for(old.rotation_mode);
    let props = [
        (TransformProp::Location, mask.no_loc),
        (rotation, mask.no_rot),
        (TransformProp::Scale, mask.no_scale),
    ];
    for (prop, excluded) in props {
        let prop_locks = locks.for_prop(prop);
        if excluded || (!mask.ignore_locks && prop_locks.iter().all(|&l| l)) {
            new.copy_prop_from(old, prop);
        } else if !mask.ignore_locks {
            for (i, _) in prop_locks.iter().enumerate().filter(|(_, &l)| l) {
                if let Some(value) = old.value(prop, i) {
                    new.set_value(prop, i, value);
                }
            }
        }
    }
    new
}

/// Writes matrices onto a chain, updating the rig after each bone.
pub fn set_chain_transforms<'a>(
    host: &mut dyn RigHost,
    bones: impl IntoIterator<Item = &'a str>,
    matrices: &[Mat4],
    options: &WriteOptions,
) -> PoseResult<()> {
    for (bone, matrix) in bones.into_iter().zip(matrices) {
        write_transform(host, bone, *matrix, options)?;
        host.update();
    }
    Ok(())
}

// =============================================================================
// Constraint Compensation
// =============================================================================

/// Matrix of a constraint's target in the constraint's target space.
pub fn constraint_target_matrix(
    host: &dyn RigHost,
    target: &ConstraintTarget,
    target_space: TargetSpace,
) -> PoseResult<Option<Mat4>> {
    let space = match target_space {
        TargetSpace::World => Space::World,
        TargetSpace::Pose => Space::Pose,
        TargetSpace::Local => Space::Local,
    };
    match target {
        ConstraintTarget::None => Ok(None),
        ConstraintTarget::Bone { name } => match host.pose_matrix(name) {
            Some(matrix) => host.convert_space(name, matrix, Space::Pose, space).map(Some),
            None => Ok(None),
        },
        ConstraintTarget::Object { name } => Ok(host.object_matrix(name).map(|world| match space {
            Space::World => world,
            _ => host.matrix_world().inverse() * world,
        })),
    }
}

/// Removes the scale a single copy-scale-with-offset constraint would add.
///
/// Muted, zero-influence, additive, non-offset and target-less constraints
/// leave the matrix unchanged.
pub fn undo_copy_scale_with_offset(
    host: &dyn RigHost,
    constraint: &Constraint,
    matrix: Mat4,
) -> PoseResult<Mat4> {
    let ConstraintKind::CopyScale {
        target,
        target_space,
        use_x,
        use_y,
        use_z,
        power,
        use_offset,
        use_add,
        use_make_uniform,
    } = &constraint.kind
    else {
        return Ok(matrix);
    };
    if !constraint.is_active() || !use_offset || *use_add {
        return Ok(matrix);
    }
    let Some(target_matrix) = constraint_target_matrix(host, target, *target_space)? else {
        return Ok(matrix);
    };

    let influence = constraint.influence;
    let use_axes = [*use_x, *use_y, *use_z];
    let mut target_scale = target_matrix.to_scale_rotation_translation().0;

    if *use_make_uniform {
        let total = if use_axes.iter().all(|&u| u) {
            target_matrix.determinant()
        } else {
            use_axes
                .iter()
                .enumerate()
                .filter(|(_, &u)| u)
                .map(|(i, _)| target_scale[i])
                .product()
        };
        target_scale = Vec3::splat(total.abs().cbrt());
    } else {
        for (i, &used) in use_axes.iter().enumerate() {
            if !used {
                target_scale[i] = 1.0;
            }
        }
    }

    let delta = target_scale.map(|s| 1.0 / (1.0 + (s.powf(*power) - 1.0) * influence));
    Ok(matrix * Mat4::from_scale(delta))
}

/// Undoes every copy-scale-with-offset constraint of a bone, last first.
pub fn undo_copy_scale_constraints(host: &dyn RigHost, bone: &str, matrix: Mat4) -> PoseResult<Mat4> {
    let constraints = &host.require_bone(bone)?.constraints;
    constraints
        .iter()
        .rev()
        .filter(|c| matches!(c.kind, ConstraintKind::CopyScale { .. }))
        .try_fold(matrix, |m, c| undo_copy_scale_with_offset(host, c, m))
}

// =============================================================================
// Bone Deltas
// =============================================================================

/// Transfers `matrix` from bone `from` to bone `to` through their rest poses.
pub fn convert_via_rest_delta(
    host: &dyn RigHost,
    matrix: Mat4,
    from: &str,
    to: &str,
) -> PoseResult<Mat4> {
    let from_rest = host.require_bone(from)?.rest;
    let to_rest = host.require_bone(to)?.rest;
    Ok(matrix * invert(from_rest, from)? * to_rest)
}

/// Transfers `matrix` from bone `from` to bone `to` through their current poses.
pub fn convert_via_pose_delta(
    host: &dyn RigHost,
    matrix: Mat4,
    from: &str,
    to: &str,
) -> PoseResult<Mat4> {
    let from_pose = host.require_pose_matrix(from)?;
    let to_pose = host.require_pose_matrix(to)?;
    Ok(matrix * invert(from_pose, from)? * to_pose)
}

/// Pose-space vector from a bone's head to its tail.
pub fn bone_vector(host: &dyn RigHost, bone: &str) -> PoseResult<Vec3> {
    let length = host.require_bone(bone)?.length;
    let pose = host.require_pose_matrix(bone)?;
    Ok(pose.transform_vector3(Vec3::Y * length))
}

/// Inverts an affine matrix, failing on singular input.
pub(crate) fn invert(matrix: Mat4, bone: &str) -> PoseResult<Mat4> {
    if matrix.determinant().abs() < 1e-12 {
        return Err(PoseError::SingularMatrix {
            bone: bone.to_string(),
        });
    }
    Ok(matrix.inverse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::Armature;
    use crate::rig::{copy_scale_offset, PoseBone, RotationMode};
    use glam::Quat;

    fn rig() -> Armature {
        Armature::new("rig")
            .with_bone(PoseBone::new("root", Vec3::ZERO, Vec3::Y))
            .with_bone(
                PoseBone::new("ctrl", Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0))
                    .with_parent("root"),
            )
            .built()
    }

    fn approx(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, 1e-4)
    }

    #[test]
    fn test_write_then_read_pose_matrix() {
        let mut rig = rig();
        let target = Mat4::from_scale_rotation_translation(
            Vec3::splat(1.5),
            Quat::from_rotation_z(0.7),
            Vec3::new(2.0, 1.0, -1.0),
        );
        write_transform(&mut rig, "ctrl", target, &WriteOptions::new()).unwrap();
        rig.update();
        assert!(approx(read_transform(&rig, "ctrl", Space::Pose, true).unwrap(), target));
    }

    #[test]
    fn test_locked_location_axis_restored() {
        let mut rig = rig();
        {
            let bone = rig.bone_mut("ctrl").unwrap();
            bone.locks.location = [true, false, false];
            bone.channels.location = Vec3::new(0.25, 0.0, 0.0);
        }
        rig.update();
        let local = Mat4::from_translation(Vec3::new(3.0, 4.0, 5.0));
        let options = WriteOptions::new().in_space(Space::Local);
        write_transform(&mut rig, "ctrl", local, &options).unwrap();
        let location = rig.bone("ctrl").unwrap().channels.location;
        assert_eq!(location, Vec3::new(0.25, 4.0, 5.0));

        let options = options.ignore_locks(true);
        write_transform(&mut rig, "ctrl", local, &options).unwrap();
        assert_eq!(rig.bone("ctrl").unwrap().channels.location, Vec3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn test_excluded_channels_and_connected_location() {
        let mut rig = rig();
        rig.bone_mut("ctrl").unwrap().use_connect = true;
        rig.rebuild();
        let local = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_x(0.3),
            Vec3::ONE,
        );
        let options = WriteOptions::new().in_space(Space::Local).no_scale(true);
        write_transform(&mut rig, "ctrl", local, &options).unwrap();
        let channels = rig.bone("ctrl").unwrap().channels;
        assert_eq!(channels.location, Vec3::ZERO);
        assert_eq!(channels.scale, Vec3::ONE);
        assert!(channels.rotation().angle_between(Quat::from_rotation_x(0.3)) < 1e-4);
    }

    #[test]
    fn test_non_live_rotations_untouched() {
        let mut rig = rig();
        {
            let bone = rig.bone_mut("ctrl").unwrap();
            bone.channels.convert_rotation_mode(RotationMode::Xyz);
            bone.channels.rotation_quaternion = [0.0, 0.0, 1.0, 0.0];
        }
        let options = WriteOptions::new().in_space(Space::Local);
        write_transform(&mut rig, "ctrl", Mat4::from_rotation_y(0.5), &options).unwrap();
        let channels = rig.bone("ctrl").unwrap().channels;
        assert_eq!(channels.rotation_quaternion, [0.0, 0.0, 1.0, 0.0]);
        assert!((channels.rotation_euler.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_undo_copy_scale_inverts_constraint() {
        let mut rig = rig();
        rig.bone_mut("root").unwrap().channels.scale = Vec3::new(2.0, 2.0, 2.0);
        rig.bone_mut("ctrl").unwrap().inherit_scale = crate::rig::InheritScale::None;
        rig.bone_mut("ctrl")
            .unwrap()
            .constraints
            .push(copy_scale_offset("Copy Scale", "root"));
        rig.rebuild();

        let target = Mat4::from_scale_rotation_translation(
            Vec3::splat(3.0),
            Quat::IDENTITY,
            Vec3::new(1.0, 0.0, 0.0),
        );
        let options = WriteOptions::new().with_undo_copy_scale(true);
        write_transform(&mut rig, "ctrl", target, &options).unwrap();
        rig.update();
        let scale = rig.pose_matrix("ctrl").unwrap().to_scale_rotation_translation().0;
        assert!((scale - Vec3::splat(3.0)).length() < 1e-3, "{scale:?}");
        assert!((rig.bone("ctrl").unwrap().channels.scale - Vec3::splat(1.5)).length() < 1e-3);
    }

    #[test]
    fn test_write_keys_written_channels() {
        let mut rig = rig();
        let options = WriteOptions::new()
            .no_rot(true)
            .no_scale(true)
            .with_keyflags(Some(KeyFlags::new()));
        write_transform(&mut rig, "ctrl", Mat4::from_translation(Vec3::X), &options).unwrap();
        let action = rig.anim_data().and_then(|a| a.action.as_ref()).unwrap();
        assert_eq!(action.fcurves.len(), 3);
    }

    #[test]
    fn test_bone_deltas() {
        let mut rig = rig();
        rig.update();
        let m = read_transform(&rig, "root", Space::Pose, true).unwrap();
        let moved = convert_via_rest_delta(&rig, m, "root", "ctrl").unwrap();
        assert!(approx(moved, rig.bone("ctrl").unwrap().rest));
        let v = bone_vector(&rig, "ctrl").unwrap();
        assert!((v - Vec3::Y).length() < 1e-5);
    }
}
