//! Rig fixtures shared by the integration tests.
//!
//! Rig builders return evaluated [`Armature`]s; the `*_params` functions next
//! to them return the operator parameters that drive each rig. The FK poses
//! bend every limb inside its rest plane, on the same side as the rest bend,
//! so an IK chain with the same rest can reproduce them exactly.

use glam::{Quat, Vec3};
use rigsnap_pose::curves::{bone_prop_path, Action, FCurve};
use rigsnap_pose::rig::{Constraint, ConstraintKind, PropertyRef, TransformProp};
use rigsnap_pose::{Armature, PoseBone, PropValue, RigHost, RotationMode};
use rigsnap_spec::{BoneChain, LegRollIk2FkParams, LimbIk2FkParams, SwitchParentParams};

/// Name of the pole switch property on limb property bones.
pub const POLE_PROP: &str = "pole_vector";

fn ik(target: &str, pole: &str, prop_bone: &str) -> Constraint {
    Constraint::new(
        "IK",
        ConstraintKind::Ik {
            target: target.to_string(),
            pole: Some(pole.to_string()),
            pole_switch: Some(PropertyRef {
                bone: prop_bone.to_string(),
                prop: POLE_PROP.to_string(),
            }),
            pole_angle: 0.0,
            chain_count: 2,
        },
    )
}

fn quat_channels(bone: &mut PoseBone, rotation: Quat) {
    bone.channels.rotation_quaternion = [rotation.w, rotation.x, rotation.y, rotation.z];
}

// =============================================================================
// Arm
// =============================================================================

const SHOULDER: Vec3 = Vec3::new(0.0, 0.0, 0.0);
const ELBOW: Vec3 = Vec3::new(1.0, 0.1, 0.0);
const WRIST: Vec3 = Vec3::new(2.0, 0.0, 0.0);
const HAND_TIP: Vec3 = Vec3::new(2.3, 0.0, 0.0);

/// A three-bone arm with FK bones, IK controls and IK mechanism bones.
///
/// The IK chain is `MCH-upper_arm_ik -> MCH-forearm_ik` solved toward the
/// head of `hand_ik`, with `upper_arm_ik_target` as the pole. The pole is
/// enabled by `arm_parent["pole_vector"]`.
pub fn arm_rig(use_pole: bool) -> Armature {
    Armature::new("arm_rig")
        .with_bone(
            PoseBone::new("arm_parent", Vec3::new(0.0, 0.0, 0.5), Vec3::new(0.0, 0.2, 0.5))
                .with_prop(POLE_PROP, PropValue::Int(i64::from(use_pole))),
        )
        // FK chain
        .with_bone(PoseBone::new("upper_arm_fk", SHOULDER, ELBOW))
        .with_bone(
            PoseBone::new("forearm_fk", ELBOW, WRIST)
                .with_parent("upper_arm_fk")
                .connected(),
        )
        .with_bone(
            PoseBone::new("hand_fk", WRIST, HAND_TIP)
                .with_parent("forearm_fk")
                .connected(),
        )
        // IK controls
        .with_bone(PoseBone::new("upper_arm_ik", SHOULDER, ELBOW))
        .with_bone(PoseBone::new(
            "upper_arm_ik_target",
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(1.0, 1.2, 0.0),
        ))
        .with_bone(PoseBone::new("hand_ik", WRIST, HAND_TIP))
        // IK mechanism
        .with_bone(PoseBone::new("MCH-upper_arm_ik", SHOULDER, ELBOW).with_parent("upper_arm_ik"))
        .with_bone(
            PoseBone::new("MCH-forearm_ik", ELBOW, WRIST)
                .with_parent("MCH-upper_arm_ik")
                .connected()
                .with_constraint(ik("hand_ik", "upper_arm_ik_target", "arm_parent")),
        )
        .with_frame_range(1, 24)
        .built()
}

/// Limb snap parameters for [`arm_rig`].
pub fn arm_params() -> LimbIk2FkParams {
    LimbIk2FkParams::new(
        "arm_parent",
        BoneChain::new(["upper_arm_fk", "forearm_fk", "hand_fk"]),
        BoneChain::new(["MCH-upper_arm_ik", "MCH-forearm_ik", "hand_ik"]),
        BoneChain::new(["upper_arm_ik", "upper_arm_ik_target", "hand_ik"]),
    )
}

/// Poses the FK arm: a swung shoulder, a bent elbow and a turned wrist.
pub fn pose_fk_arm(rig: &mut Armature) {
    if let Some(bone) = rig.bone_mut("upper_arm_fk") {
        quat_channels(bone, Quat::from_euler(glam::EulerRot::XYZ, 0.4, -0.3, 0.6));
    }
    if let Some(bone) = rig.bone_mut("forearm_fk") {
        quat_channels(bone, Quat::from_rotation_z(-0.5));
    }
    if let Some(bone) = rig.bone_mut("hand_fk") {
        quat_channels(bone, Quat::from_rotation_x(0.35));
    }
    rig.update();
}

// =============================================================================
// Leg
// =============================================================================

const HIP: Vec3 = Vec3::new(0.0, 0.0, 1.0);
const KNEE: Vec3 = Vec3::new(0.0, -0.05, 0.5);
const ANKLE: Vec3 = Vec3::new(0.0, 0.0, 0.1);
const BALL: Vec3 = Vec3::new(0.0, -0.2, 0.02);
const TOE_TIP: Vec3 = Vec3::new(0.0, -0.3, 0.0);

/// Heel roll control of [`leg_rig`].
pub const HEEL: &str = "foot_heel_ik";

/// A leg with FK bones, IK controls, a heel roll control and a toe.
///
/// `foot_ik -> foot_heel_ik -> MCH-foot_ik -> toe_ik` carries the foot; the
/// IK chain `MCH-thigh_ik -> MCH-shin_ik` reaches for `MCH-foot_ik`.
pub fn leg_rig(use_pole: bool) -> Armature {
    Armature::new("leg_rig")
        .with_bone(
            PoseBone::new("thigh_parent", Vec3::new(0.0, 0.0, 1.2), Vec3::new(0.0, 0.2, 1.2))
                .with_prop(POLE_PROP, PropValue::Int(i64::from(use_pole))),
        )
        // FK chain
        .with_bone(PoseBone::new("thigh_fk", HIP, KNEE))
        .with_bone(PoseBone::new("shin_fk", KNEE, ANKLE).with_parent("thigh_fk").connected())
        .with_bone(PoseBone::new("foot_fk", ANKLE, BALL).with_parent("shin_fk").connected())
        .with_bone(PoseBone::new("toe_fk", BALL, TOE_TIP).with_parent("foot_fk").connected())
        // IK controls
        .with_bone(PoseBone::new("thigh_ik", HIP, KNEE))
        .with_bone(PoseBone::new(
            "thigh_ik_target",
            Vec3::new(0.0, -0.8, 0.5),
            Vec3::new(0.0, -0.8, 0.7),
        ))
        .with_bone(PoseBone::new("foot_ik", ANKLE, BALL))
        .with_bone(
            PoseBone::new(HEEL, Vec3::new(0.0, 0.05, 0.02), Vec3::new(0.0, 0.15, 0.02))
                .with_parent("foot_ik")
                .with_rotation_mode(RotationMode::Zxy)
                .with_prop("Toe_Roll", PropValue::Float(0.0)),
        )
        .with_bone(PoseBone::new("MCH-foot_ik", ANKLE, BALL).with_parent(HEEL))
        .with_bone(PoseBone::new("toe_ik", BALL, TOE_TIP).with_parent("MCH-foot_ik"))
        // IK mechanism
        .with_bone(PoseBone::new("MCH-thigh_ik", HIP, KNEE).with_parent("thigh_ik"))
        .with_bone(
            PoseBone::new("MCH-shin_ik", KNEE, ANKLE)
                .with_parent("MCH-thigh_ik")
                .connected()
                .with_constraint(ik("MCH-foot_ik", "thigh_ik_target", "thigh_parent")),
        )
        .with_frame_range(1, 24)
        .built()
}

/// Leg roll parameters for [`leg_rig`].
pub fn leg_params() -> LegRollIk2FkParams {
    let limb = LimbIk2FkParams::new(
        "thigh_parent",
        BoneChain::new(["thigh_fk", "shin_fk", "foot_fk", "toe_fk"]),
        BoneChain::new(["MCH-thigh_ik", "MCH-shin_ik", "MCH-foot_ik"]),
        BoneChain::new(["thigh_ik", "thigh_ik_target", "foot_ik"]),
    )
    .with_tail_bones(BoneChain::new(["toe_ik"]));
    LegRollIk2FkParams::new(limb, HEEL)
}

/// Poses the FK leg with a bent knee and rolled foot, and turns the IK foot
/// control away from it.
pub fn pose_fk_leg(rig: &mut Armature) {
    if let Some(bone) = rig.bone_mut("thigh_fk") {
        quat_channels(bone, Quat::from_euler(glam::EulerRot::XYZ, -0.3, 0.2, 0.25));
    }
    if let Some(bone) = rig.bone_mut("shin_fk") {
        quat_channels(bone, Quat::from_rotation_x(0.6));
    }
    if let Some(bone) = rig.bone_mut("foot_fk") {
        quat_channels(bone, Quat::from_rotation_x(-0.2));
    }
    if let Some(bone) = rig.bone_mut("toe_fk") {
        quat_channels(bone, Quat::from_rotation_x(0.4));
    }
    if let Some(bone) = rig.bone_mut("foot_ik") {
        bone.channels.location = Vec3::new(0.1, 0.0, 0.05);
        quat_channels(bone, Quat::from_rotation_z(0.3));
    }
    rig.update();
}

// =============================================================================
// Keyed chain
// =============================================================================

/// Frames keyed on the source bone of [`keyed_chain_rig`].
pub const KEYED_FRAMES: [i32; 3] = [1, 10, 20];

/// Two unrelated bones: `src` animated on location and rotation, `dst` idle.
pub fn keyed_chain_rig() -> Armature {
    let location = bone_prop_path("src", TransformProp::Location);
    let rotation = bone_prop_path("src", TransformProp::RotationEuler);
    let mut rig = Armature::new("chain_rig")
        .with_bone(PoseBone::new("src", Vec3::ZERO, Vec3::Y).with_rotation_mode(RotationMode::Xyz))
        .with_bone(PoseBone::new("dst", Vec3::X, Vec3::new(1.0, 1.0, 0.0)))
        .with_action(
            Action::new("ChainAction")
                .with_curve(FCurve::new(location.clone(), 0).with_keys([
                    (1.0, 0.0),
                    (10.0, 1.0),
                    (20.0, 3.0),
                ]))
                .with_curve(FCurve::new(location, 2).with_keys([
                    (1.0, 0.0),
                    (10.0, 0.5),
                    (20.0, 0.0),
                ]))
                .with_curve(FCurve::new(rotation, 2).with_keys([(1.0, 0.0), (20.0, 1.2)])),
        )
        .with_frame_range(1, 30)
        .built();
    rig.frame_set(1);
    rig
}

// =============================================================================
// Switch parent
// =============================================================================

/// Frames keyed on the control of [`switch_parent_rig`].
pub const SWITCH_FRAMES: [i32; 2] = [1, 12];

/// A hand control under a switchable parent mechanism, with two candidate
/// parents. The selector starts on `root` (index 1).
pub fn switch_parent_rig() -> Armature {
    let mut torso = PoseBone::new("torso", Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 0.0));
    torso.channels.location = Vec3::new(0.0, 0.0, 1.0);
    quat_channels(&mut torso, Quat::from_rotation_y(0.7));

    let location = bone_prop_path("hand_ik", TransformProp::Location);
    let mut rig = Armature::new("switch_rig")
        .with_bone(PoseBone::new("root", Vec3::ZERO, Vec3::Y))
        .with_bone(torso)
        .with_bone(PoseBone::new("props", Vec3::ZERO, Vec3::Z).with_prop("parent", PropValue::Int(1)))
        .with_bone(
            PoseBone::new("MCH-hand_parent", Vec3::X, Vec3::new(1.0, 1.0, 0.0)).with_constraint(
                Constraint::new(
                    "SWITCH_PARENT",
                    ConstraintKind::SwitchParent {
                        selector: PropertyRef {
                            bone: "props".into(),
                            prop: "parent".into(),
                        },
                        targets: vec![None, Some("root".into()), Some("torso".into())],
                    },
                ),
            ),
        )
        .with_bone(
            PoseBone::new("hand_ik", Vec3::X, Vec3::new(1.0, 1.0, 0.0)).with_parent("MCH-hand_parent"),
        )
        .with_action(
            Action::new("HandAction")
                .with_curve(FCurve::new(location.clone(), 0).with_keys([(1.0, 0.1), (12.0, 0.6)]))
                .with_curve(FCurve::new(location, 1).with_keys([(1.0, 0.2), (12.0, -0.4)])),
        )
        .with_frame_range(1, 24)
        .built();
    rig.frame_set(1);
    rig
}

/// Switch parent parameters for [`switch_parent_rig`].
pub fn switch_parent_params() -> SwitchParentParams {
    SwitchParentParams::new(
        "hand_ik",
        "props",
        "parent",
        vec!["None".into(), "Root".into(), "Torso".into()],
    )
}

// =============================================================================
// Vehicle
// =============================================================================

fn shrinkwrap(target: Option<&str>) -> Constraint {
    Constraint::new(
        "Shrinkwrap",
        ConstraintKind::Shrinkwrap {
            target: target.map(str::to_string),
        },
    )
}

/// A vehicle whose null bone points at `Ground`, listing `wheels` in the
/// armature's `wheels` property. `wheel_spare` has no shrinkwrap constraint.
pub fn vehicle_rig(wheels: &[&str]) -> Armature {
    let list = wheels.iter().map(|w| w.to_string()).collect();
    Armature::new("car")
        .with_data_prop("wheels", PropValue::StringList(list))
        .with_bone(
            PoseBone::new("MCH-null", Vec3::ZERO, Vec3::Y).with_constraint(shrinkwrap(Some("Ground"))),
        )
        .with_bone(
            PoseBone::new("wheel_front", Vec3::Y, Vec3::new(0.0, 1.0, 0.5))
                .with_constraint(shrinkwrap(None)),
        )
        .with_bone(
            PoseBone::new("wheel_back", -Vec3::Y, Vec3::new(0.0, -1.0, 0.5))
                .with_constraint(shrinkwrap(None)),
        )
        .with_bone(PoseBone::new("wheel_spare", Vec3::Z, Vec3::new(0.0, 0.0, 1.5)))
        .built()
}

/// Current shrinkwrap target of a bone.
pub fn shrinkwrap_target(rig: &Armature, bone: &str) -> Option<String> {
    match &rig.bone(bone)?.constraint_of_type("SHRINKWRAP")?.kind {
        ConstraintKind::Shrinkwrap { target } => target.clone(),
        _ => None,
    }
}
