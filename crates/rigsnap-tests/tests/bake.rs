//! Baking operators over keyed frames.

use glam::Quat;
use pretty_assertions::assert_eq;
use rigsnap_pose::curves::{bone_prop_path, Action, FCurve};
use rigsnap_pose::rig::TransformProp;
use rigsnap_pose::{invoke, Armature, RigHost};
use rigsnap_spec::{
    BakeSettings, BoneChain, GenericSnapParams, Invocation, Operator, OperatorStatus,
    ReportLevel, SessionConfig,
};
use rigsnap_tests::fixtures::{arm_params, arm_rig, keyed_chain_rig, KEYED_FRAMES};
use rigsnap_tests::harness::{assert_matrix_near, assert_point_near, pose_head, pose_tail, sample_poses};

fn generic(input: &str, output: &str) -> Operator {
    Operator::GenericSnap(
        GenericSnapParams::new(BoneChain::new([input]), BoneChain::new([output]))
            .with_tooltip("Copy"),
    )
}

fn curve_frames(rig: &Armature, bone: &str, prop: TransformProp, index: usize) -> Vec<f32> {
    let path = bone_prop_path(bone, prop);
    let action = rig.anim_data().and_then(|a| a.action.as_ref()).unwrap();
    let curve = action.find(&path, index).map(|i| &action.fcurves[i]).unwrap();
    curve.keyframes.iter().map(|k| k.frame).collect()
}

// =============================================================================
// Generic snap
// =============================================================================

#[test]
fn test_generic_bake_matches_source_on_keyed_frames() {
    let mut rig = keyed_chain_rig();
    let expected = sample_poses(&mut rig, &["src"], &KEYED_FRAMES);
    rig.frame_set(1);

    let mut config = SessionConfig::default();
    let report = invoke(&mut rig, &Invocation::bake(generic("src", "dst")), &mut config);

    assert_eq!(report.status, OperatorStatus::Finished, "{:?}", report.messages);
    assert_eq!(report.frames, KEYED_FRAMES.to_vec());
    assert_eq!(report.description, "Apply snap Copy to keyframes");
    assert_eq!(rig.frame_current(), 1);

    assert_eq!(
        curve_frames(&rig, "dst", TransformProp::Location, 0),
        vec![1.0, 10.0, 20.0]
    );

    let baked = sample_poses(&mut rig, &["dst"], &KEYED_FRAMES);
    for ((frame, expected), baked) in KEYED_FRAMES.iter().zip(&expected).zip(&baked) {
        assert_matrix_near(baked[0], expected[0], 1e-4, &format!("dst at frame {frame}"));
    }
}

#[test]
fn test_generic_bake_respects_frame_range() {
    let mut rig = keyed_chain_rig();
    let mut config =
        SessionConfig::default().with_bake(BakeSettings::new().with_frame_range(5, 15));
    let report = invoke(&mut rig, &Invocation::bake(generic("src", "dst")), &mut config);

    assert_eq!(report.status, OperatorStatus::Finished);
    assert_eq!(report.frames, vec![10]);
    assert_eq!(curve_frames(&rig, "dst", TransformProp::Location, 0), vec![10.0]);
}

#[test]
fn test_empty_bake_leaves_rig_untouched() {
    let mut rig = keyed_chain_rig();
    rig.frame_set(7);
    let before = rig.to_json_pretty().unwrap();

    // `dst` has no keys, so there is nothing to revisit.
    let report = invoke(
        &mut rig,
        &Invocation::bake(generic("dst", "src")),
        &mut SessionConfig::default(),
    );

    assert_eq!(report.status, OperatorStatus::Cancelled);
    let warnings: Vec<_> = report.messages_at(ReportLevel::Warning).collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].message, "No keys to bake.");
    assert_eq!(rig.frame_current(), 7);
    assert_eq!(rig.to_json_pretty().unwrap(), before);
}

#[test]
fn test_bake_all_keys_includes_unrelated_curves() {
    let mut rig = keyed_chain_rig();
    let path = bone_prop_path("dst", TransformProp::Scale);
    rig.anim_data_mut()
        .action
        .as_mut()
        .unwrap()
        .fcurves
        .push(FCurve::new(path, 1).with_keys([(4.0, 1.0)]));
    rig.frame_set(1);

    let mut config = SessionConfig::default().with_bake(BakeSettings::new().with_all_keys(true));
    let report = invoke(&mut rig, &Invocation::bake(generic("src", "dst")), &mut config);

    assert_eq!(report.frames, vec![1, 4, 10, 20]);
}

// =============================================================================
// Limb snap
// =============================================================================

fn keyed_arm_rig() -> Armature {
    let mut rig = arm_rig(true);
    let path = bone_prop_path("upper_arm_fk", TransformProp::RotationQuaternion);
    let forearm = bone_prop_path("forearm_fk", TransformProp::RotationQuaternion);
    let start = Quat::from_rotation_z(0.2);
    let end = Quat::from_euler(glam::EulerRot::XYZ, 0.5, -0.2, 0.8);
    let bend = Quat::from_rotation_z(-0.4);

    let mut action = Action::new("ArmAction");
    for (i, (a, b)) in [
        (start.w, end.w),
        (start.x, end.x),
        (start.y, end.y),
        (start.z, end.z),
    ]
    .into_iter()
    .enumerate()
    {
        action = action.with_curve(FCurve::new(path.clone(), i as i32).with_keys([(1.0, a), (8.0, b)]));
    }
    for (i, value) in [bend.w, bend.x, bend.y, bend.z].into_iter().enumerate() {
        action = action.with_curve(FCurve::new(forearm.clone(), i as i32).with_keys([(8.0, value)]));
    }

    rig.anim_data_mut().action = Some(action);
    rig.frame_set(1);
    rig
}

#[test]
fn test_limb_bake_keys_controls_on_fk_frames() {
    let mut rig = keyed_arm_rig();
    let report = invoke(
        &mut rig,
        &Invocation::bake(Operator::LimbIk2Fk(arm_params())),
        &mut SessionConfig::default(),
    );

    assert_eq!(report.status, OperatorStatus::Finished, "{:?}", report.messages);
    assert_eq!(report.frames, vec![1, 8]);
    assert_eq!(
        curve_frames(&rig, "hand_ik", TransformProp::Location, 0),
        vec![1.0, 8.0]
    );

    for frame in [1, 8] {
        rig.frame_set(frame);
        let hand = rig.pose_matrix("hand_ik").unwrap();
        assert_matrix_near(
            hand,
            rig.pose_matrix("hand_fk").unwrap(),
            1e-3,
            &format!("hand_ik at frame {frame}"),
        );
        assert_point_near(
            pose_tail(&rig, "MCH-forearm_ik"),
            pose_head(&rig, "hand_ik"),
            1e-3,
            &format!("IK chain tip at frame {frame}"),
        );
    }
}
