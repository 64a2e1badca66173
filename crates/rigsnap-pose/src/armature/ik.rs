//! Analytic one- and two-bone IK used by the reference host.

use glam::{Mat3, Mat4, Quat, Vec3};

use crate::math::perpendicular;

const EPSILON: f32 = 1e-6;

/// Pre-IK state of a two-bone chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TwoBoneChain {
    pub root_pose: Mat4,
    pub tip_pose: Mat4,
    pub tip_length: f32,
    /// Direction of the chain end off the root's Y axis in rest, in root-local axes.
    pub bend_local: Vec3,
}

/// Pole target placement.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Pole {
    pub point: Vec3,
    pub angle: f32,
}

/// Bend side of a chain in its rest pose, in root-local axes.
pub(crate) fn rest_bend_local(root_rest: Mat4, tip_rest_tail: Vec3) -> Vec3 {
    let (_, rotation, head) = root_rest.to_scale_rotation_translation();
    let axis = rotation * Vec3::Y;
    let off = reject(tip_rest_tail - head, axis);
    if off.length_squared() > EPSILON * EPSILON {
        rotation.inverse() * off.normalize()
    } else {
        Vec3::Z
    }
}

/// Solves a two-bone chain so the tip's tail reaches `target`.
///
/// With a pole the bend plane contains the pole and the root is oriented from
/// its rest bend side, so moving the pole around the chain axis rotates the
/// whole chain rigidly. Without a pole the bend plane follows the pre-IK pose
/// and the root turns by the shortest arc.
pub(crate) fn solve_two_bone(chain: &TwoBoneChain, target: Vec3, pole: Option<Pole>) -> (Mat4, Mat4) {
    let (root_scale, root_rot, a) = chain.root_pose.to_scale_rotation_translation();
    let (tip_scale, tip_rot, joint_pre) = chain.tip_pose.to_scale_rotation_translation();
    let end_pre = chain.tip_pose.transform_point3(Vec3::Y * chain.tip_length);

    let l1 = (joint_pre - a).length();
    let l2 = (end_pre - joint_pre).length();
    if l1 < EPSILON || l2 < EPSILON {
        return (chain.root_pose, chain.tip_pose);
    }

    let root_axis = root_rot * Vec3::Y;
    let n = unit_or(target - a, unit_or(end_pre - a, root_axis));
    let dist = (target - a)
        .length()
        .clamp((l1 - l2).abs(), l1 + l2)
        .max(EPSILON);

    let bend = match pole {
        Some(pole) => {
            let b = unit_or(reject(pole.point - a, n), perpendicular(n).normalize());
            Quat::from_axis_angle(n, pole.angle) * b
        }
        None => {
            let pre_n = unit_or(end_pre - a, root_axis);
            let mut off = reject(joint_pre - a, pre_n);
            if off.length_squared() < EPSILON * EPSILON {
                off = reject(root_rot * Vec3::Z, pre_n);
            }
            let off = unit_or(off, perpendicular(pre_n).normalize());
            let b = Quat::from_rotation_arc(pre_n, n) * off;
            unit_or(reject(b, n), perpendicular(n).normalize())
        }
    };

    let cos_a = ((l1 * l1 + dist * dist - l2 * l2) / (2.0 * l1 * dist)).clamp(-1.0, 1.0);
    let sin_a = (1.0 - cos_a * cos_a).max(0.0).sqrt();
    let dir1 = (n * cos_a + bend * sin_a).normalize();
    let joint = a + dir1 * l1;
    let end = a + n * dist;
    let dir2 = unit_or(end - joint, dir1);

    let new_root_rot = match pole {
        Some(_) => {
            let side = n * sin_a - bend * cos_a;
            frame_rotation(dir1, side, chain.bend_local)
        }
        None => Quat::from_rotation_arc(root_axis, dir1) * root_rot,
    };

    let carried = new_root_rot * root_rot.inverse() * tip_rot;
    let new_tip_rot = Quat::from_rotation_arc(carried * Vec3::Y, dir2) * carried;

    (
        Mat4::from_scale_rotation_translation(root_scale, new_root_rot.normalize(), a),
        Mat4::from_scale_rotation_translation(tip_scale, new_tip_rot.normalize(), joint),
    )
}

/// Turns a single bone so its Y axis points at `target`.
pub(crate) fn solve_aim(pose: Mat4, target: Vec3) -> Mat4 {
    let (scale, rotation, head) = pose.to_scale_rotation_translation();
    let axis = rotation * Vec3::Y;
    let dir = unit_or(target - head, axis);
    let rotation = Quat::from_rotation_arc(axis, dir) * rotation;
    Mat4::from_scale_rotation_translation(scale, rotation.normalize(), head)
}

/// Rotation taking local `Y` to `y_world` and `side_local` toward `side_world`.
fn frame_rotation(y_world: Vec3, side_world: Vec3, side_local: Vec3) -> Quat {
    let side_world = unit_or(reject(side_world, y_world), perpendicular(y_world).normalize());
    let side_local = unit_or(reject(side_local, Vec3::Y), Vec3::Z);
    let world = Mat3::from_cols(side_world, y_world, side_world.cross(y_world));
    let local = Mat3::from_cols(side_local, Vec3::Y, side_local.cross(Vec3::Y));
    Quat::from_mat3(&(world * local.transpose())).normalize()
}

fn reject(v: Vec3, axis: Vec3) -> Vec3 {
    v - axis * v.dot(axis)
}

fn unit_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let len = v.length();
    if len > EPSILON {
        v / len
    } else {
        fallback
    }
}
