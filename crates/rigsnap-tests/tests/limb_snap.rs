//! Limb IK to FK snapping on arm and leg rigs.
//!
//! Each test poses the FK chain, runs the snap through `invoke`, and checks
//! that the IK mechanism chain lands on the FK chain.

use glam::Vec3;
use pretty_assertions::assert_eq;
use rigsnap_pose::{invoke, Armature, RigHost, RotationMode};
use rigsnap_spec::{
    Invocation, Operator, OperatorReport, OperatorStatus, ReportLevel, RollAxes, SessionConfig,
};
use rigsnap_tests::fixtures::{
    arm_params, arm_rig, leg_params, leg_rig, pose_fk_arm, pose_fk_leg, HEEL,
};
use rigsnap_tests::harness::{assert_matrix_near, assert_point_near, pose_head, pose_tail};

fn run(rig: &mut Armature, operator: Operator) -> OperatorReport {
    let report = invoke(rig, &Invocation::single(operator), &mut SessionConfig::default());
    assert_eq!(report.status, OperatorStatus::Finished, "{:?}", report.messages);
    assert!(!report.has_errors(), "{:?}", report.messages);
    report
}

fn y_axis(rig: &Armature, bone: &str) -> Vec3 {
    (pose_tail(rig, bone) - pose_head(rig, bone)).normalize()
}

fn assert_arm_matches_fk(rig: &Armature, elbow_tolerance: f32) {
    let hand = rig.pose_matrix("hand_ik").unwrap();
    assert_matrix_near(hand, rig.pose_matrix("hand_fk").unwrap(), 1e-3, "hand_ik");

    assert_point_near(
        pose_tail(rig, "MCH-forearm_ik"),
        pose_head(rig, "hand_ik"),
        1e-3,
        "IK chain tip",
    );
    assert_point_near(
        pose_tail(rig, "MCH-upper_arm_ik"),
        pose_tail(rig, "upper_arm_fk"),
        elbow_tolerance,
        "elbow",
    );
    let dot = y_axis(rig, "MCH-upper_arm_ik").dot(y_axis(rig, "upper_arm_fk"));
    assert!(dot > 0.99, "upper arm direction differs: dot {dot}");
}

// =============================================================================
// Arm
// =============================================================================

#[test]
fn test_arm_snap_with_pole() {
    let mut rig = arm_rig(true);
    pose_fk_arm(&mut rig);
    run(&mut rig, Operator::LimbIk2Fk(arm_params()));

    assert_arm_matches_fk(&rig, 0.05);

    // The base control only takes the FK location when a pole is in use.
    let base = rig.bone("upper_arm_ik").unwrap();
    assert_eq!(base.channels.rotation_quaternion, [1.0, 0.0, 0.0, 0.0]);
    assert!(rig.bone("upper_arm_ik_target").unwrap().channels.location.length() > 1e-3);
}

#[test]
fn test_arm_snap_without_pole() {
    let mut rig = arm_rig(false);
    pose_fk_arm(&mut rig);
    let pole_before = rig.bone("upper_arm_ik_target").unwrap().channels;
    run(&mut rig, Operator::LimbIk2Fk(arm_params()));

    assert_arm_matches_fk(&rig, 0.1);

    // The rotation search switches the base control to ZXY Euler.
    let base = rig.bone("upper_arm_ik").unwrap();
    assert_eq!(base.channels.rotation_mode, RotationMode::Zxy);
    assert_eq!(rig.bone("upper_arm_ik_target").unwrap().channels, pole_before);
}

#[test]
fn test_arm_snap_is_stable() {
    let mut rig = arm_rig(true);
    pose_fk_arm(&mut rig);
    run(&mut rig, Operator::LimbIk2Fk(arm_params()));
    let first = rig.pose_matrix("MCH-forearm_ik").unwrap();

    run(&mut rig, Operator::LimbIk2Fk(arm_params()));
    let second = rig.pose_matrix("MCH-forearm_ik").unwrap();
    assert_matrix_near(second, first, 1e-3, "second snap");
}

#[test]
fn test_arm_snap_rejects_missing_bone() {
    let mut rig = arm_rig(true);
    let before = rig.to_json_pretty().unwrap();

    let mut params = arm_params();
    params.prop_bone = "missing_parent".to_string();
    let report = invoke(
        &mut rig,
        &Invocation::single(Operator::LimbIk2Fk(params)),
        &mut SessionConfig::default(),
    );

    assert!(report.is_cancelled());
    let errors: Vec<_> = report.messages_at(ReportLevel::Error).collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.starts_with("Invalid parameters: "));
    assert_eq!(rig.to_json_pretty().unwrap(), before);
}

// =============================================================================
// Leg
// =============================================================================

#[test]
fn test_leg_roll_snap_matches_fk() {
    let mut rig = leg_rig(true);
    pose_fk_leg(&mut rig);
    run(&mut rig, Operator::LegRollIk2Fk(leg_params()));

    let foot = rig.pose_matrix("MCH-foot_ik").unwrap();
    assert_matrix_near(foot, rig.pose_matrix("foot_fk").unwrap(), 1e-3, "MCH-foot_ik");
    let toe = rig.pose_matrix("toe_ik").unwrap();
    assert_matrix_near(toe, rig.pose_matrix("toe_fk").unwrap(), 1e-3, "toe_ik");

    assert_point_near(
        pose_tail(&rig, "MCH-shin_ik"),
        pose_head(&rig, "MCH-foot_ik"),
        1e-3,
        "IK chain tip",
    );
    assert_point_near(
        pose_tail(&rig, "MCH-thigh_ik"),
        pose_tail(&rig, "thigh_fk"),
        0.05,
        "knee",
    );

    let toe_roll = rig
        .bone(HEEL)
        .unwrap()
        .props
        .get("Toe_Roll")
        .and_then(|v| v.as_f32())
        .unwrap();
    assert!((0.0..=1.0).contains(&toe_roll), "Toe_Roll {toe_roll}");
}

#[test]
fn test_leg_roll_absorbs_foot_turn_into_heel() {
    let mut rig = leg_rig(true);
    pose_fk_leg(&mut rig);
    run(&mut rig, Operator::LegRollIk2Fk(leg_params()));

    // The default axes are rock and roll; yaw (Z on a ZXY heel) stays zero.
    let heel = rig.bone(HEEL).unwrap().channels;
    assert_eq!(heel.rotation_mode, RotationMode::Zxy);
    assert_eq!(heel.rotation_euler.z, 0.0);
    assert!(heel.rotation_euler.length() > 1e-4, "{heel:?}");
}

#[test]
fn test_leg_roll_without_axes_leaves_heel() {
    let mut rig = leg_rig(true);
    pose_fk_leg(&mut rig);
    let params = leg_params().with_use_roll(RollAxes {
        rock: false,
        roll: false,
        yaw: false,
    });
    run(&mut rig, Operator::LegRollIk2Fk(params));

    let heel = rig.bone(HEEL).unwrap();
    assert_eq!(heel.channels.rotation_euler, Vec3::ZERO);
    assert_eq!(heel.props.get("Toe_Roll").and_then(|v| v.as_f32()), Some(0.0));

    let foot = rig.pose_matrix("MCH-foot_ik").unwrap();
    assert_matrix_near(foot, rig.pose_matrix("foot_fk").unwrap(), 1e-3, "MCH-foot_ik");
}

#[test]
fn test_leg_roll_rejects_quaternion_heel() {
    let mut rig = leg_rig(true);
    rig.bone_mut(HEEL).unwrap().channels.rotation_mode = RotationMode::Quaternion;
    rig.update();

    let report = invoke(
        &mut rig,
        &Invocation::single(Operator::LegRollIk2Fk(leg_params())),
        &mut SessionConfig::default(),
    );

    assert!(report.is_cancelled());
    assert_eq!(report.messages[0].code.as_deref(), Some("POSE_005"));
}
