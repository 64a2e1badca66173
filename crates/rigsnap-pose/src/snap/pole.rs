//! Pole target placement for two-bone IK chains.

use glam::{Mat4, Quat, Vec3};
use tracing::debug;

use crate::error::PoseResult;
use crate::host::RigHost;
use crate::math::{matrix_rotation_angle, perpendicular};
use crate::rig::Space;
use crate::transform::bone_vector;

/// Places `pole` so the first IK bone's orientation matches `match_matrix`.
///
/// The pole goes on a circle of radius `length` around the midpoint of the
/// chain's head-to-tip line. It is first placed along an arbitrary
/// perpendicular, then rotated about the chain line by the remaining
/// rotation difference in both directions; the better of the two is kept.
/// The pole's location is assigned directly, ignoring its locks.
pub fn match_pole_target(
    host: &mut dyn RigHost,
    ik_first: &str,
    ik_last: &str,
    pole: &str,
    match_matrix: Mat4,
    length: f32,
) -> PoseResult<()> {
    let a = host.require_pose_matrix(ik_first)?.w_axis.truncate();
    let b = host.require_pose_matrix(ik_last)?.w_axis.truncate() + bone_vector(host, ik_last)?;
    let ikv = b - a;
    let axis = ikv.normalize_or_zero();
    let pv = perpendicular(ikv).normalize_or_zero() * length;

    let set_pole = |host: &mut dyn RigHost, offset: Vec3| -> PoseResult<f32> {
        let target = Mat4::from_translation(a + ikv / 2.0 + offset);
        let local = host.convert_space(pole, target, Space::Pose, Space::Local)?;
        host.require_bone_mut(pole)?.channels.location = local.w_axis.truncate();
        host.update();
        Ok(matrix_rotation_angle(&host.require_pose_matrix(ik_first)?, &match_matrix))
    };

    let angle = set_pole(host, pv)?;

    let pv1 = Quat::from_axis_angle(axis, angle) * pv;
    let ang1 = set_pole(host, pv1)?;

    let pv2 = Quat::from_axis_angle(axis, -angle) * pv;
    let ang2 = set_pole(host, pv2)?;

    debug!(pole, angle, ang1, ang2, "Placed pole target");
    if ang1 < ang2 {
        set_pole(host, pv1)?;
    }
    Ok(())
}
