//! Generic chain snap: copy the visual pose of one chain onto another.

use std::collections::BTreeSet;

use glam::Mat4;
use rigsnap_spec::GenericSnapParams;

use crate::bake::{BakeSession, FrameOperator, Keying};
use crate::error::PoseResult;
use crate::host::RigHost;
use crate::rig::{transform_props_with_locks, TransformProp};
use crate::transform::{chain_transform_matrices, set_chain_transforms, WriteOptions};

use super::require_bones;

/// Snaps the output chain onto the input chain's pose-space matrices.
#[derive(Debug)]
pub struct GenericSnap<'a> {
    params: &'a GenericSnapParams,
}

impl<'a> GenericSnap<'a> {
    pub fn new(params: &'a GenericSnapParams) -> Self {
        Self { params }
    }

    fn write_options(&self, keying: &Keying) -> WriteOptions {
        WriteOptions::new()
            .with_undo_copy_scale(self.params.undo_copy_scale)
            .with_locks(self.params.locks)
            .with_keyflags(keying.keyflags)
    }
}

impl FrameOperator for GenericSnap<'_> {
    type State = Vec<Mat4>;

    fn init(&mut self, host: &dyn RigHost) -> PoseResult<()> {
        require_bones(host, self.params.input_bones.iter())?;
        require_bones(host, self.params.output_bones.iter())?;
        require_bones(host, self.params.ctrl_bones.iter())
    }

    fn scan_curves(
        &mut self,
        host: &dyn RigHost,
        session: &mut BakeSession,
    ) -> PoseResult<BTreeSet<usize>> {
        let locks = self.params.locks;
        let props = transform_props_with_locks(locks.location, locks.rotation, locks.scale);
        session.add_bone_frames(host, self.params.input_bones.iter(), &TransformProp::ALL);
        session.add_bone_frames(host, self.params.ctrl_bones.iter(), &TransformProp::ALL);
        Ok(session.bone_curves(self.params.output_bones.iter(), &props))
    }

    fn save_frame_state(&mut self, host: &dyn RigHost) -> PoseResult<Vec<Mat4>> {
        chain_transform_matrices(host, self.params.input_bones.iter())
    }

    fn apply_frame_state(
        &mut self,
        host: &mut dyn RigHost,
        keying: &Keying,
        matrices: Vec<Mat4>,
    ) -> PoseResult<()> {
        let options = self.write_options(keying);
        set_chain_transforms(host, self.params.output_bones.iter(), &matrices, &options)
    }
}
