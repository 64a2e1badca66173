//! Bulk keyframe edits over a set of curves.

use super::{Action, FCurve, FrameRange, Interpolation};

fn in_range(frame: f32, range: Option<FrameRange>) -> bool {
    range.map_or(true, |(start, end)| start <= frame && frame <= end)
}

/// Distinct keyed frames across `curves`, sorted, within the inclusive range.
pub fn frames_with_keys<'a>(
    curves: impl IntoIterator<Item = &'a FCurve>,
    range: Option<FrameRange>,
) -> Vec<f32> {
    let mut frames: Vec<f32> = curves
        .into_iter()
        .flat_map(|c| c.keyframes.iter().map(|k| k.frame))
        .filter(|&f| in_range(f, range))
        .collect();
    frames.sort_by(f32::total_cmp);
    frames.dedup();
    frames
}

/// Removes every key within the inclusive range. Returns the number removed.
pub fn delete_keys_in_range<'a>(
    curves: impl IntoIterator<Item = &'a mut FCurve>,
    range: Option<FrameRange>,
) -> usize {
    let mut removed = 0;
    for curve in curves {
        let mut changed = false;
        for i in (0..curve.keyframes.len()).rev() {
            if in_range(curve.keyframes[i].frame, range) {
                curve.remove_key(i);
                changed = true;
                removed += 1;
            }
        }
        if changed {
            curve.update();
        }
    }
    removed
}

/// Sets the interpolation of every key within the inclusive range.
pub fn set_interpolation_in_range<'a>(
    curves: impl IntoIterator<Item = &'a mut FCurve>,
    mode: Interpolation,
    range: Option<FrameRange>,
) {
    for curve in curves {
        for key in curve.keyframes.iter_mut() {
            if in_range(key.frame, range) {
                key.interpolation = mode;
            }
        }
    }
}

/// Removes curves without keys. Returns the number removed.
pub fn strip_empty_curves(action: &mut Action) -> usize {
    let before = action.fcurves.len();
    action.fcurves.retain(|c| !c.is_empty());
    before - action.fcurves.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn curves() -> Vec<FCurve> {
        vec![
            FCurve::new("a", 0).with_keys([(1.0, 0.0), (5.0, 1.0), (10.0, 2.0)]),
            FCurve::new("a", 1).with_keys([(5.0, 0.0), (7.0, 1.0)]),
        ]
    }

    #[test]
    fn test_frames_with_keys_dedups_and_filters() {
        let curves = curves();
        assert_eq!(frames_with_keys(&curves, None), vec![1.0, 5.0, 7.0, 10.0]);
        assert_eq!(frames_with_keys(&curves, Some((5.0, 7.0))), vec![5.0, 7.0]);
        assert!(frames_with_keys(&curves, Some((11.0, 20.0))).is_empty());
    }

    #[test]
    fn test_delete_keys_in_range_is_inclusive() {
        let mut curves = curves();
        let removed = delete_keys_in_range(curves.iter_mut(), Some((5.0, 7.0)));
        assert_eq!(removed, 3);
        assert_eq!(frames_with_keys(&curves, None), vec![1.0, 10.0]);
        assert!(curves[1].is_empty());
        assert!(!curves[0].needs_update());
    }

    #[test]
    fn test_set_interpolation_in_range() {
        let mut curves = curves();
        set_interpolation_in_range(curves.iter_mut(), Interpolation::Constant, Some((4.0, 6.0)));
        assert_eq!(curves[0].keyframes[1].interpolation, Interpolation::Constant);
        assert_eq!(curves[0].keyframes[0].interpolation, Interpolation::Bezier);
        assert_eq!(curves[1].keyframes[0].interpolation, Interpolation::Constant);
    }

    #[test]
    fn test_strip_empty_curves() {
        let mut action = Action::new("walk");
        action.fcurves = curves();
        delete_keys_in_range(action.fcurves.iter_mut().skip(1), None);
        assert_eq!(strip_empty_curves(&mut action), 1);
        assert_eq!(action.fcurves.len(), 1);
        assert_eq!(strip_empty_curves(&mut action), 0);
    }
}
