//! Pose evaluation for the reference host.

use std::collections::{BTreeMap, HashMap};

use glam::{Mat4, Quat, Vec3};
use tracing::warn;

use super::ik::{rest_bend_local, solve_aim, solve_two_bone, Pole, TwoBoneChain};
use crate::rig::{Constraint, ConstraintKind, ConstraintTarget, InheritScale, PoseBone, TargetSpace};

/// Evaluated matrices of one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Evaluated {
    /// Frame the local channels are expressed in, in pose space.
    pub parent_frame: Mat4,
    /// Final pose matrix after constraints.
    pub pose: Mat4,
}

/// Computes a dependency-respecting evaluation order.
///
/// Bones follow their parents and constraint targets. Bones that read an IK
/// chain root, other than the chain tip itself, follow the tip, since solving
/// the tip rewrites the root. Cycles are reported and the closing edge ignored.
pub(crate) fn evaluation_order(bones: &[PoseBone], index: &HashMap<String, usize>) -> Vec<usize> {
    let mut ik_tip_of_root = HashMap::new();
    for (i, bone) in bones.iter().enumerate() {
        for constraint in &bone.constraints {
            if let ConstraintKind::Ik { chain_count, .. } = constraint.kind {
                if chain_count >= 2 {
                    if let Some(&root) = bone.parent.as_ref().and_then(|p| index.get(p)) {
                        ik_tip_of_root.insert(root, i);
                    }
                }
            }
        }
    }

    let deps: Vec<Vec<usize>> = bones
        .iter()
        .enumerate()
        .map(|(i, bone)| {
            let direct = bone
                .parent
                .iter()
                .map(String::as_str)
                .chain(bone.constraints.iter().flat_map(Constraint::dependencies))
                .filter_map(|name| index.get(name).copied());
            let mut out = Vec::new();
            for dep in direct {
                out.push(dep);
                if let Some(&tip) = ik_tip_of_root.get(&dep) {
                    if tip != i {
                        out.push(tip);
                    }
                }
            }
            out
        })
        .collect();

    let mut state = vec![VisitState::New; bones.len()];
    let mut order = Vec::with_capacity(bones.len());
    for i in 0..bones.len() {
        visit(i, bones, &deps, &mut state, &mut order);
    }
    order
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    New,
    Visiting,
    Done,
}

fn visit(
    i: usize,
    bones: &[PoseBone],
    deps: &[Vec<usize>],
    state: &mut [VisitState],
    order: &mut Vec<usize>,
) {
    if state[i] != VisitState::New {
        return;
    }
    state[i] = VisitState::Visiting;
    for &dep in &deps[i] {
        match state[dep] {
            VisitState::New => visit(dep, bones, deps, state, order),
            VisitState::Visiting => warn!(
                bone = %bones[i].name,
                dependency = %bones[dep].name,
                "dependency cycle, ignoring edge"
            ),
            VisitState::Done => {}
        }
    }
    state[i] = VisitState::Done;
    order.push(i);
}

/// Scene context needed to resolve constraint targets.
pub(crate) struct Evaluator<'a> {
    pub bones: &'a [PoseBone],
    pub index: &'a HashMap<String, usize>,
    pub objects: &'a BTreeMap<String, Mat4>,
    pub matrix_world: Mat4,
}

impl Evaluator<'_> {
    /// Evaluates every bone in `order`.
    pub fn evaluate(&self, order: &[usize]) -> Vec<Evaluated> {
        let mut out: Vec<Evaluated> = self
            .bones
            .iter()
            .map(|b| Evaluated {
                parent_frame: b.rest,
                pose: b.rest,
            })
            .collect();

        for &i in order {
            let bone = &self.bones[i];
            let frame = self.parent_frame(bone, &out);
            out[i].parent_frame = frame;
            let mut pose = frame * basis_matrix(bone);
            for constraint in bone.constraints.iter().filter(|c| c.is_active()) {
                pose = self.apply_constraint(i, constraint, pose, &mut out);
            }
            out[i].pose = pose;
        }
        out
    }

    fn bone_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Frame of a bone's local space given its parent's evaluated pose.
    fn parent_frame(&self, bone: &PoseBone, evaluated: &[Evaluated]) -> Mat4 {
        let Some(parent) = bone.parent.as_deref().and_then(|p| self.bone_index(p)) else {
            return bone.rest;
        };
        let parent_pose = evaluated[parent].pose;
        let full = parent_pose * self.bones[parent].rest.inverse() * bone.rest;
        if bone.inherit_rotation && bone.inherit_scale == InheritScale::Full {
            return full;
        }
        let (scale, rotation, translation) = full.to_scale_rotation_translation();
        let rotation = if bone.inherit_rotation {
            rotation
        } else {
            bone.rest.to_scale_rotation_translation().1
        };
        let scale = match bone.inherit_scale {
            InheritScale::Full => scale,
            InheritScale::None => Vec3::ONE,
        };
        Mat4::from_scale_rotation_translation(scale, rotation, translation)
    }

    fn target_matrix(&self, target: &ConstraintTarget, space: TargetSpace, evaluated: &[Evaluated]) -> Option<Mat4> {
        match target {
            ConstraintTarget::None => None,
            ConstraintTarget::Bone { name } => {
                let i = self.bone_index(name)?;
                let pose = evaluated[i].pose;
                Some(match space {
                    TargetSpace::World => self.matrix_world * pose,
                    TargetSpace::Pose => pose,
                    TargetSpace::Local => evaluated[i].parent_frame.inverse() * pose,
                })
            }
            ConstraintTarget::Object { name } => {
                let world = *self.objects.get(name)?;
                Some(match space {
                    TargetSpace::World => world,
                    _ => self.matrix_world.inverse() * world,
                })
            }
        }
    }

    fn apply_constraint(
        &self,
        owner: usize,
        constraint: &Constraint,
        pose: Mat4,
        evaluated: &mut [Evaluated],
    ) -> Mat4 {
        let influence = constraint.influence.clamp(0.0, 1.0);
        match &constraint.kind {
            ConstraintKind::CopyScale {
                target,
                target_space,
                use_x,
                use_y,
                use_z,
                power,
                use_offset,
                use_add,
                use_make_uniform,
            } => {
                let Some(target) = self.target_matrix(target, *target_space, evaluated) else {
                    return pose;
                };
                let use_axes = [*use_x, *use_y, *use_z];
                let target_scale = target.to_scale_rotation_translation().0;
                let own = pose.to_scale_rotation_translation().0;
                let mut factor = Vec3::ONE;
                if *use_make_uniform {
                    let total: f32 = (0..3)
                        .filter(|&i| use_axes[i])
                        .map(|i| target_scale[i])
                        .product();
                    let uniform = total.abs().cbrt().powf(*power);
                    for i in 0..3 {
                        factor[i] = copy_scale_factor(uniform, own[i], *use_offset, *use_add);
                    }
                } else {
                    for i in (0..3).filter(|&i| use_axes[i]) {
                        let tgt = target_scale[i].powf(*power);
                        factor[i] = copy_scale_factor(tgt, own[i], *use_offset, *use_add);
                    }
                }
                let blended = factor.map(|f| 1.0 + (f - 1.0) * influence);
                pose * Mat4::from_scale(blended)
            }
            ConstraintKind::CopyTransforms { target } => {
                match self.target_matrix(target, TargetSpace::Pose, evaluated) {
                    Some(target) => blend(pose, target, influence),
                    None => pose,
                }
            }
            ConstraintKind::Ik {
                target,
                pole,
                pole_switch,
                pole_angle,
                chain_count,
            } => {
                let Some(goal) = self.bone_index(target).map(|i| evaluated[i].pose.w_axis.truncate()) else {
                    return pose;
                };
                let pole_enabled = pole_switch.as_ref().map_or(true, |switch| {
                    self.bone_index(&switch.bone)
                        .and_then(|i| self.bones[i].props.get(&switch.prop))
                        .is_some_and(|v| v.is_truthy())
                });
                let pole = pole
                    .as_deref()
                    .filter(|_| pole_enabled)
                    .and_then(|name| self.bone_index(name))
                    .map(|i| Pole {
                        point: evaluated[i].pose.w_axis.truncate(),
                        angle: *pole_angle,
                    });
                self.apply_ik(owner, pose, goal, pole, *chain_count, influence, evaluated)
            }
            ConstraintKind::SwitchParent { selector, targets } => {
                let selected = self
                    .bone_index(&selector.bone)
                    .and_then(|i| self.bones[i].props.get(&selector.prop))
                    .and_then(|v| v.as_index())
                    .and_then(|i| targets.get(i))
                    .and_then(|t| t.as_deref())
                    .and_then(|name| self.bone_index(name));
                match selected {
                    Some(i) => {
                        let delta = evaluated[i].pose * self.bones[i].rest.inverse();
                        blend(pose, delta * pose, influence)
                    }
                    None => pose,
                }
            }
            ConstraintKind::Shrinkwrap { .. } => pose,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_ik(
        &self,
        owner: usize,
        pose: Mat4,
        goal: Vec3,
        pole: Option<Pole>,
        chain_count: usize,
        influence: f32,
        evaluated: &mut [Evaluated],
    ) -> Mat4 {
        let bone = &self.bones[owner];
        let root = bone.parent.as_deref().and_then(|p| self.bone_index(p));
        let Some(root) = root.filter(|_| chain_count >= 2) else {
            return blend(pose, solve_aim(pose, goal), influence);
        };

        let root_bone = &self.bones[root];
        let chain = TwoBoneChain {
            root_pose: evaluated[root].pose,
            tip_pose: pose,
            tip_length: bone.length,
            bend_local: rest_bend_local(root_bone.rest, bone.rest_tail()),
        };
        let (new_root, new_tip) = solve_two_bone(&chain, goal, pole);
        evaluated[root].pose = blend(chain.root_pose, new_root, influence);
        evaluated[owner].parent_frame = self.parent_frame(bone, evaluated);
        blend(pose, new_tip, influence)
    }
}

/// Per-axis multiplier a copy-scale constraint applies to the owner's scale.
fn copy_scale_factor(target: f32, own: f32, use_offset: bool, use_add: bool) -> f32 {
    if use_offset && !use_add {
        return target;
    }
    if own.abs() < 1e-9 {
        return 1.0;
    }
    if use_offset {
        (own + target - 1.0) / own
    } else {
        target / own
    }
}

/// Local matrix of a bone's channels. Connected bones ignore location.
pub(crate) fn basis_matrix(bone: &PoseBone) -> Mat4 {
    let mut channels = bone.channels;
    if bone.use_connect {
        channels.location = Vec3::ZERO;
    }
    channels.matrix_basis()
}

/// Interpolates from `a` to `b` by `t`, decomposed.
fn blend(a: Mat4, b: Mat4, t: f32) -> Mat4 {
    if t >= 1.0 {
        return b;
    }
    if t <= 0.0 {
        return a;
    }
    let (sa, ra, ta) = a.to_scale_rotation_translation();
    let (sb, rb, tb) = b.to_scale_rotation_translation();
    let rb: Quat = if ra.dot(rb) < 0.0 { -rb } else { rb };
    Mat4::from_scale_rotation_translation(sa.lerp(sb, t), ra.slerp(rb, t), ta.lerp(tb, t))
}
