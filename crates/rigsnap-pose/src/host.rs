//! The narrow interface the engine needs from the application that owns the rig.

use glam::Mat4;

use crate::curves::AnimData;
use crate::error::{PoseError, PoseResult};
use crate::rig::{PoseBone, PropValue, Space};

/// Scene and armature access consumed by the engine.
///
/// The host owns evaluation: `pose_matrix` returns post-constraint matrices
/// as of the last [`RigHost::update`] or [`RigHost::frame_set`]. Writes through
/// [`RigHost::bone_mut`] become visible to `pose_matrix` only after an update.
pub trait RigHost {
    /// Returns a pose bone.
    fn bone(&self, name: &str) -> Option<&PoseBone>;

    /// Returns a pose bone for mutation.
    fn bone_mut(&mut self, name: &str) -> Option<&mut PoseBone>;

    /// Evaluated pose-space matrix of a bone.
    fn pose_matrix(&self, name: &str) -> Option<Mat4>;

    /// Converts a matrix between spaces in the context of a bone.
    fn convert_space(&self, bone: &str, matrix: Mat4, from: Space, to: Space) -> PoseResult<Mat4>;

    /// World matrix of the armature object.
    fn matrix_world(&self) -> Mat4;

    /// World matrix of another scene object.
    fn object_matrix(&self, name: &str) -> Option<Mat4>;

    /// Re-evaluates the pose from the current channels.
    fn update(&mut self);

    /// Current scene frame.
    fn frame_current(&self) -> i32;

    /// Moves the scene to `frame`, evaluating animation and dependencies.
    fn frame_set(&mut self, frame: i32);

    /// Scene start and end frames.
    fn scene_frame_range(&self) -> (i32, i32);

    /// Animation data of the armature, if any.
    fn anim_data(&self) -> Option<&AnimData>;

    /// Animation data of the armature, created if missing.
    fn anim_data_mut(&mut self) -> &mut AnimData;

    /// Custom property of the armature data.
    fn data_property(&self, name: &str) -> Option<&PropValue>;

    /// Returns a pose bone or a not-found error.
    fn require_bone(&self, name: &str) -> PoseResult<&PoseBone> {
        self.bone(name).ok_or_else(|| PoseError::bone_not_found(name))
    }

    /// Returns a mutable pose bone or a not-found error.
    fn require_bone_mut(&mut self, name: &str) -> PoseResult<&mut PoseBone> {
        self.bone_mut(name).ok_or_else(|| PoseError::bone_not_found(name))
    }

    /// Evaluated pose matrix or a not-found error.
    fn require_pose_matrix(&self, name: &str) -> PoseResult<Mat4> {
        self.pose_matrix(name)
            .ok_or_else(|| PoseError::bone_not_found(name))
    }

    /// Custom property of a bone or a not-found error.
    fn bone_property(&self, bone: &str, prop: &str) -> PoseResult<&PropValue> {
        self.require_bone(bone)?
            .props
            .get(prop)
            .ok_or_else(|| PoseError::property_not_found(bone, prop))
    }
}
