//! Switch a control's parent while keeping its visual transform.

use std::collections::BTreeSet;

use glam::Mat4;
use rigsnap_spec::{ParamsError, SwitchParentParams};

use crate::bake::{BakeSession, FrameOperator, Keying};
use crate::curves::FrameRange;
use crate::error::PoseResult;
use crate::host::RigHost;
use crate::keying::set_custom_property_value;
use crate::rig::{transform_props_with_locks, PropValue, Space};
use crate::transform::{read_transform, write_transform, WriteOptions};

/// Parent selection for one switch-parent run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ParentSelector {
    /// Parameters have not been checked against the rig yet.
    #[default]
    Uninitialized,
    /// Parents are known and a target index is chosen.
    Populated { parents: Vec<String>, selected: usize },
    /// The selection has been written at least once.
    Applied { parents: Vec<String>, selected: usize },
}

impl ParentSelector {
    /// Resolves the parent list and selection against the rig.
    ///
    /// Without an explicit selection the property's current value is used.
    pub fn populate(host: &dyn RigHost, params: &SwitchParentParams) -> PoseResult<Self> {
        if params.parent_names.is_empty() {
            return Err(ParamsError::NoParents.into());
        }
        host.require_bone(&params.bone)?;
        let current = host.bone_property(&params.prop_bone, &params.prop_id)?;

        let selected = params
            .selected
            .or_else(|| current.as_index())
            .unwrap_or(0);
        if selected >= params.parent_names.len() {
            return Err(ParamsError::SelectionOutOfRange {
                selected,
                count: params.parent_names.len(),
            }
            .into());
        }

        Ok(Self::Populated {
            parents: params.parent_names.clone(),
            selected,
        })
    }

    /// Selected parent index, once populated.
    pub fn selected(&self) -> Option<usize> {
        match self {
            Self::Uninitialized => None,
            Self::Populated { selected, .. } | Self::Applied { selected, .. } => Some(*selected),
        }
    }

    /// Selected parent name, once populated.
    pub fn selected_name(&self) -> Option<&str> {
        match self {
            Self::Uninitialized => None,
            Self::Populated { parents, selected } | Self::Applied { parents, selected } => {
                parents.get(*selected).map(String::as_str)
            }
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    fn mark_applied(&mut self) {
        if let Self::Populated { parents, selected } = self {
            *self = Self::Applied {
                parents: std::mem::take(parents),
                selected: *selected,
            };
        }
    }
}

/// Switches the parent selector and restores the control's pose.
#[derive(Debug)]
pub struct SwitchParent<'a> {
    params: &'a SwitchParentParams,
    selector: ParentSelector,
}

impl<'a> SwitchParent<'a> {
    pub fn new(params: &'a SwitchParentParams) -> Self {
        Self {
            params,
            selector: ParentSelector::Uninitialized,
        }
    }

    pub fn selector(&self) -> &ParentSelector {
        &self.selector
    }

    fn selected_value(&self) -> PropValue {
        PropValue::Int(self.selector.selected().unwrap_or(0) as i64)
    }
}

impl FrameOperator for SwitchParent<'_> {
    /// Pose matrix of the control before constraints.
    type State = Mat4;

    fn init(&mut self, host: &dyn RigHost) -> PoseResult<()> {
        self.selector = ParentSelector::populate(host, self.params)?;
        Ok(())
    }

    fn scan_curves(
        &mut self,
        host: &dyn RigHost,
        session: &mut BakeSession,
    ) -> PoseResult<BTreeSet<usize>> {
        let locks = self.params.locks;
        let props = transform_props_with_locks(locks.location, locks.rotation, locks.scale);
        Ok(session.add_bone_frames(host, [self.params.bone.as_str()], &props))
    }

    fn save_frame_state(&mut self, host: &dyn RigHost) -> PoseResult<Mat4> {
        read_transform(host, &self.params.bone, Space::Pose, false)
    }

    fn before_apply(
        &mut self,
        host: &mut dyn RigHost,
        session: &BakeSession,
        _range: (i32, i32),
        _range_raw: FrameRange,
    ) -> PoseResult<()> {
        let value = self.selected_value();
        session.replace_custom_prop_keys_constant(
            host,
            &self.params.prop_bone,
            &self.params.prop_id,
            value,
        )
    }

    fn apply_frame_state(
        &mut self,
        host: &mut dyn RigHost,
        keying: &Keying,
        old_matrix: Mat4,
    ) -> PoseResult<()> {
        set_custom_property_value(
            host,
            &self.params.prop_bone,
            &self.params.prop_id,
            self.selected_value(),
            keying.keyflags_switch,
        )?;
        host.update();

        let options = WriteOptions::new()
            .with_locks(self.params.locks)
            .with_keyflags(keying.keyflags);
        write_transform(host, &self.params.bone, old_matrix, &options)?;
        self.selector.mark_applied();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::Armature;
    use crate::bake::execute_single;
    use crate::rig::{Constraint, ConstraintKind, PoseBone, PropertyRef};
    use glam::{Quat, Vec3};
    use pretty_assertions::assert_eq;
    use rigsnap_spec::{OperatorReport, SessionConfig};

    fn rig() -> Armature {
        let mut torso = PoseBone::new("torso", Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 0.0));
        torso.channels.location = Vec3::new(0.0, 0.0, 1.0);
        torso.channels.rotation_quaternion = {
            let q = Quat::from_rotation_y(0.7);
            [q.w, q.x, q.y, q.z]
        };
        let mut ctrl = PoseBone::new("hand_ik", Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0))
            .with_parent("MCH-hand_parent");
        ctrl.channels.location = Vec3::new(0.1, 0.2, 0.3);

        Armature::new("rig")
            .with_bone(PoseBone::new("root", Vec3::ZERO, Vec3::Y))
            .with_bone(torso)
            .with_bone(PoseBone::new("props", Vec3::ZERO, Vec3::Z).with_prop("parent", PropValue::Int(1)))
            .with_bone(
                PoseBone::new("MCH-hand_parent", Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 1.0, 0.0))
                    .with_constraint(Constraint::new(
                        "SWITCH_PARENT",
                        ConstraintKind::SwitchParent {
                            selector: PropertyRef {
                                bone: "props".into(),
                                prop: "parent".into(),
                            },
                            targets: vec![None, Some("root".into()), Some("torso".into())],
                        },
                    )),
            )
            .with_bone(ctrl)
            .built()
    }

    fn params() -> SwitchParentParams {
        SwitchParentParams::new(
            "hand_ik",
            "props",
            "parent",
            vec!["None".into(), "Root".into(), "Torso".into()],
        )
    }

    #[test]
    fn test_populate_uses_current_value() {
        let rig = rig();
        let selector = ParentSelector::populate(&rig, &params()).unwrap();
        assert_eq!(selector.selected(), Some(1));
        assert_eq!(selector.selected_name(), Some("Root"));
        assert!(!selector.is_applied());
    }

    #[test]
    fn test_populate_rejects_missing_property() {
        let rig = rig();
        let mut params = params();
        params.prop_id = "missing".into();
        assert!(ParentSelector::populate(&rig, &params).is_err());

        let mut params = self::params();
        params.parent_names.clear();
        assert!(ParentSelector::populate(&rig, &params).is_err());
    }

    #[test]
    fn test_switch_preserves_pose() {
        let mut rig = rig();
        let before = rig.pose_matrix("hand_ik").unwrap();

        let params = params().with_selected(2);
        let mut op = SwitchParent::new(&params);
        let mut report = OperatorReport::new("switch_parent", "");
        execute_single(&mut rig, &mut op, &SessionConfig::default(), &mut report);
        assert!(!report.has_errors(), "{:?}", report.messages);
        assert!(op.selector().is_applied());

        assert_eq!(rig.bone_property("props", "parent").unwrap(), &PropValue::Int(2));
        let after = rig.pose_matrix("hand_ik").unwrap();
        assert!(before.abs_diff_eq(after, 1e-4), "{before:?} != {after:?}");
    }
}
