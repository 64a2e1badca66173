//! Keyframe clearing, frame range and vehicle floor operators.

use glam::Vec3;
use pretty_assertions::assert_eq;
use rigsnap_pose::curves::bone_prop_path;
use rigsnap_pose::rig::TransformProp;
use rigsnap_pose::{describe, invoke, RigHost};
use rigsnap_spec::{
    BakeSettings, BoneChain, ClearKeyframesParams, Invocation, Operator, OperatorStatus,
    ReportLevel, SessionConfig, VehicleFloorParams,
};
use rigsnap_tests::fixtures::{keyed_chain_rig, shrinkwrap_target, vehicle_rig};

fn clear(bones: &[&str]) -> Invocation {
    Invocation::single(Operator::ClearKeyframes(ClearKeyframesParams {
        bones: BoneChain::new(bones.iter().copied()),
    }))
}

// =============================================================================
// Clear keyframes
// =============================================================================

#[test]
fn test_clear_keyframes_resets_bone() {
    let mut rig = keyed_chain_rig();
    rig.frame_set(10);
    assert!(rig.bone("src").unwrap().channels.location.x > 0.5);

    let report = invoke(&mut rig, &clear(&["src"]), &mut SessionConfig::default());
    assert_eq!(report.status, OperatorStatus::Finished, "{:?}", report.messages);

    let src = rig.bone("src").unwrap();
    assert_eq!(src.channels.location, Vec3::ZERO);
    assert_eq!(src.channels.rotation_euler, Vec3::ZERO);
    assert_eq!(src.channels.rotation_mode, rigsnap_pose::RotationMode::Xyz);

    let action = rig.anim_data().and_then(|a| a.action.as_ref()).unwrap();
    assert!(action.fcurves.is_empty());
}

#[test]
fn test_clear_keyframes_within_range() {
    let mut rig = keyed_chain_rig();
    let mut config =
        SessionConfig::default().with_bake(BakeSettings::new().with_frame_range(5, 15));
    invoke(&mut rig, &clear(&["src"]), &mut config);

    let path = bone_prop_path("src", TransformProp::Location);
    let action = rig.anim_data().and_then(|a| a.action.as_ref()).unwrap();
    let curve = &action.fcurves[action.find(&path, 0).unwrap()];
    let frames: Vec<f32> = curve.keyframes.iter().map(|k| k.frame).collect();
    assert_eq!(frames, vec![1.0, 20.0]);
}

#[test]
fn test_clear_keyframes_rejects_inverted_range() {
    let mut rig = keyed_chain_rig();
    let before = rig.to_json_pretty().unwrap();
    let mut config =
        SessionConfig::default().with_bake(BakeSettings::new().with_frame_range(15, 5));
    let report = invoke(&mut rig, &clear(&["src"]), &mut config);

    assert!(report.is_cancelled());
    assert_eq!(rig.to_json_pretty().unwrap(), before);
}

#[test]
fn test_clear_keyframes_unknown_bone_cancels() {
    let mut rig = keyed_chain_rig();
    rig.frame_set(10);
    let before = rig.to_json_pretty().unwrap();
    let report = invoke(
        &mut rig,
        &clear(&["src", "ghost"]),
        &mut SessionConfig::default(),
    );
    assert!(report.is_cancelled());
    assert_eq!(report.messages[0].code.as_deref(), Some("POSE_001"));
    assert_eq!(rig.to_json_pretty().unwrap(), before);
}

// =============================================================================
// Frame range
// =============================================================================

#[test]
fn test_get_frame_range_copies_scene_range() {
    let mut rig = keyed_chain_rig();
    let mut config = SessionConfig::default();
    let report = invoke(
        &mut rig,
        &Invocation::single(Operator::GetFrameRange),
        &mut config,
    );

    assert_eq!(report.status, OperatorStatus::Finished);
    assert_eq!((config.bake.start_frame, config.bake.end_frame), (1, 30));
    assert!(!config.bake.use_frame_range);
    assert_eq!(
        describe(&Invocation::single(Operator::GetFrameRange)),
        "Set start and end frame from scene"
    );
}

// =============================================================================
// Vehicle floor
// =============================================================================

#[test]
fn test_set_vehicle_floor_reports_wheels_without_shrinkwrap() {
    let mut rig = vehicle_rig(&["wheel_front", "wheel_spare", "wheel_back"]);
    let report = invoke(
        &mut rig,
        &Invocation::single(Operator::SetVehicleFloor(VehicleFloorParams::default())),
        &mut SessionConfig::default(),
    );

    assert_eq!(report.status, OperatorStatus::Finished);
    let errors: Vec<_> = report.messages_at(ReportLevel::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Shrinkwrap constraint not found");

    assert_eq!(shrinkwrap_target(&rig, "wheel_front").as_deref(), Some("Ground"));
    assert_eq!(shrinkwrap_target(&rig, "wheel_back").as_deref(), Some("Ground"));
}

#[test]
fn test_clear_vehicle_floor_detaches_everything() {
    let mut rig = vehicle_rig(&["wheel_front", "wheel_back"]);
    let params = VehicleFloorParams::default();
    let mut config = SessionConfig::default();
    invoke(
        &mut rig,
        &Invocation::single(Operator::SetVehicleFloor(params.clone())),
        &mut config,
    );
    let report = invoke(
        &mut rig,
        &Invocation::single(Operator::ClearVehicleFloor(params)),
        &mut config,
    );

    assert!(!report.has_errors(), "{:?}", report.messages);
    for bone in ["wheel_front", "wheel_back", "MCH-null"] {
        assert_eq!(shrinkwrap_target(&rig, bone), None, "{bone}");
    }
}

#[test]
fn test_vehicle_floor_without_null_reports_missing_data() {
    let mut rig = vehicle_rig(&["wheel_front"]);
    let params = VehicleFloorParams {
        null_bone: "MCH-missing".to_string(),
        ..VehicleFloorParams::default()
    };
    let report = invoke(
        &mut rig,
        &Invocation::single(Operator::SetVehicleFloor(params)),
        &mut SessionConfig::default(),
    );

    let errors: Vec<_> = report.messages_at(ReportLevel::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Missing data for wheel snapping");
    assert_eq!(shrinkwrap_target(&rig, "wheel_front"), None);
}
