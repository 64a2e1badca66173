//! Clear transform keyframes and reset bones.

use rigsnap_spec::{BakeSettings, ClearKeyframesParams};
use tracing::debug;

use crate::curves::{delete_keys_in_range, strip_empty_curves, CurveTable};
use crate::error::{PoseError, PoseResult};
use crate::host::RigHost;
use crate::rig::{Channels, TransformProp};

use super::require_bones;

/// Deletes the transform keys of the listed bones and resets their channels.
///
/// Keys are removed within the bake frame range when one is set, otherwise
/// everywhere. Rotation modes are kept. Returns the number of keys removed.
pub fn clear_keyframes(
    host: &mut dyn RigHost,
    params: &ClearKeyframesParams,
    settings: &BakeSettings,
) -> PoseResult<usize> {
    require_bones(host, params.bones.iter())?;
    let anim = host
        .anim_data()
        .filter(|anim| anim.action.is_some())
        .ok_or(PoseError::NoAction)?;

    let table = CurveTable::for_action(anim);
    let curves = table.bone_curves(params.bones.iter(), &TransformProp::ALL);
    let range_raw = anim.range_to_action(settings.frame_range());

    let anim = host.anim_data_mut();
    let mut removed = 0;
    if let Some(action) = anim.action.as_mut() {
        removed = delete_keys_in_range(action.curves_at_mut(&curves), range_raw);
    }

    for name in params.bones.iter() {
        let bone = host.require_bone_mut(name)?;
        bone.channels = Channels::identity(bone.channels.rotation_mode);
    }

    if let Some(action) = host.anim_data_mut().action.as_mut() {
        let stripped = strip_empty_curves(action);
        debug!(removed, stripped, "Cleared keyframes");
    }
    host.update();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::Armature;
    use crate::curves::{bone_prop_path, Action, FCurve};
    use crate::rig::{PoseBone, RotationMode};
    use glam::Vec3;
    use pretty_assertions::assert_eq;
    use rigsnap_spec::BoneChain;

    fn rig() -> Armature {
        let mut hand = PoseBone::new("hand", Vec3::ZERO, Vec3::Y).with_rotation_mode(RotationMode::Xyz);
        hand.channels.location = Vec3::ONE;
        hand.channels.rotation_euler = Vec3::new(0.3, 0.0, 0.0);
        hand.channels.scale = Vec3::splat(2.0);
        Armature::new("rig")
            .with_bone(hand)
            .with_bone(PoseBone::new("other", Vec3::X, Vec3::new(1.0, 1.0, 0.0)))
            .with_action(
                Action::new("Action")
                    .with_curve(
                        FCurve::new(bone_prop_path("hand", TransformProp::Location), 0)
                            .with_keys([(1.0, 0.0), (10.0, 1.0), (20.0, 2.0)]),
                    )
                    .with_curve(
                        FCurve::new(bone_prop_path("hand", TransformProp::Scale), 1)
                            .with_keys([(5.0, 2.0)]),
                    )
                    .with_curve(
                        FCurve::new(bone_prop_path("other", TransformProp::Location), 0)
                            .with_keys([(1.0, 0.0)]),
                    ),
            )
            .built()
    }

    fn params() -> ClearKeyframesParams {
        ClearKeyframesParams {
            bones: BoneChain::new(["hand"]),
        }
    }

    #[test]
    fn test_clear_all_keys_resets_channels() {
        let mut rig = rig();
        let removed = clear_keyframes(&mut rig, &params(), &BakeSettings::default()).unwrap();
        assert_eq!(removed, 4);

        let action = rig.anim_data().unwrap().action.as_ref().unwrap();
        assert_eq!(action.fcurves.len(), 1);
        let hand = rig.bone("hand").unwrap();
        assert_eq!(hand.channels, Channels::identity(RotationMode::Xyz));
    }

    #[test]
    fn test_clear_within_range() {
        let mut rig = rig();
        let settings = BakeSettings::new().with_frame_range(5, 15);
        let removed = clear_keyframes(&mut rig, &params(), &settings).unwrap();
        assert_eq!(removed, 2);

        let action = rig.anim_data().unwrap().action.as_ref().unwrap();
        assert_eq!(action.fcurves.len(), 2);
        assert_eq!(action.fcurves[0].keyframes.len(), 2);
    }

    #[test]
    fn test_clear_without_action_fails() {
        let mut rig = Armature::new("rig")
            .with_bone(PoseBone::new("hand", Vec3::ZERO, Vec3::Y))
            .built();
        let err = clear_keyframes(&mut rig, &params(), &BakeSettings::default()).unwrap_err();
        assert_eq!(err, PoseError::NoAction);
    }
}
