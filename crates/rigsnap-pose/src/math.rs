//! Spatial math utilities.
//!
//! Vector helpers and two 1-D minimizers used to solve for a rotation angle.
//! The minimizers take fallible objectives so that a caller can evaluate the
//! rig inside the objective and still propagate lookup errors.

use std::f32::consts::{PI, TAU};

use glam::{Mat4, Quat, Vec3};

/// Default bracket step for [`bracket_minimum`].
pub const BRACKET_STEP: f32 = PI / 8.0;

/// Iteration cap for [`ternary_minimize`] when the tolerance is unreachable.
const TERNARY_MAX_ITERATIONS: usize = 200;

/// Returns a vector perpendicular to `v`.
///
/// The result is not normalized. `v` must not be zero.
pub fn perpendicular(v: Vec3) -> Vec3 {
    let helper = if v.x.abs() < v.y.abs() {
        Vec3::X
    } else {
        Vec3::Y
    };
    v.cross(helper)
}

/// Returns the shortest-path rotation angle between two orientations, in `[0, π]`.
pub fn rotation_angle_between(a: Quat, b: Quat) -> f32 {
    let dot = a.normalize().dot(b.normalize()).clamp(-1.0, 1.0);
    let angle = dot.acos() * 2.0;
    if angle > PI {
        TAU - angle
    } else {
        angle
    }
}

/// Rotation angle between the rotation parts of two matrices.
pub fn matrix_rotation_angle(a: &Mat4, b: &Mat4) -> f32 {
    rotation_angle_between(rotation_of(a), rotation_of(b))
}

/// Extracts the rotation of an affine matrix, ignoring scale.
pub fn rotation_of(m: &Mat4) -> Quat {
    let (_, rotation, _) = m.to_scale_rotation_translation();
    rotation
}

/// Finds an interval that contains a local minimum of `f`.
///
/// Samples centers outward from `start` (`start`, `start + step`,
/// `start - step`, `start + 2·step`, ...) up to `±2π`, and returns
/// `(c - step, c + step)` for the first center `c` whose value is not greater
/// than either neighbour. Returns `None` when no such center exists.
///
/// The minimum nearest to `start` wins in either direction. For a periodic
/// `f` this picks the closest period, which can differ by a multiple of `2π`
/// from a search that only walks forward.
pub fn bracket_minimum<E>(
    mut f: impl FnMut(f32) -> Result<f32, E>,
    start: f32,
    step: f32,
) -> Result<Option<(f32, f32)>, E> {
    if step <= 0.0 || !step.is_finite() {
        return Ok(None);
    }
    let max_steps = (TAU / step + 1e-4).floor() as i32;

    for k in 0..=max_steps {
        let offsets: &[i32] = if k == 0 { &[0] } else { &[k, -k] };
        for &offset in offsets {
            let center = start + offset as f32 * step;
            let left = f(center - step)?;
            let middle = f(center)?;
            let right = f(center + step)?;
            if middle <= left && middle <= right {
                return Ok(Some((center - step, center + step)));
            }
        }
    }
    Ok(None)
}

/// Minimizes a unimodal `f` on `[left, right]` by ternary search.
///
/// Narrows the interval by thirds until it is narrower than `tolerance`, and
/// returns its midpoint.
pub fn ternary_minimize<E>(
    mut f: impl FnMut(f32) -> Result<f32, E>,
    mut left: f32,
    mut right: f32,
    tolerance: f32,
) -> Result<f32, E> {
    for _ in 0..TERNARY_MAX_ITERATIONS {
        if (right - left).abs() < tolerance {
            break;
        }
        let left_third = left + (right - left) / 3.0;
        let right_third = right - (right - left) / 3.0;
        if f(left_third)? > f(right_third)? {
            left = left_third;
        } else {
            right = right_third;
        }
    }
    Ok((left + right) / 2.0)
}

/// Wraps `value` to the representation closest to `reference` modulo 2π.
pub fn wrap_angle_near(value: f32, reference: f32) -> f32 {
    let turns = ((reference - value) / TAU).round();
    value + turns * TAU
}
