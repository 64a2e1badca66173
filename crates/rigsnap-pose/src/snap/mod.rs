//! Pose-matching operators.
//!
//! Each snap operator implements [`FrameOperator`](crate::bake::FrameOperator)
//! and can run on the current frame or be baked over keys. Clearing keys and
//! the vehicle floor relay are plain one-shot functions.

mod clear;
mod generic;
mod leg_roll;
mod limb;
mod pole;
mod switch_parent;
mod vehicle;

pub use clear::clear_keyframes;
pub use generic::GenericSnap;
pub use leg_roll::{toe_roll_ratio, HeelAxes, LegRollIk2Fk, TOE_ROLL_PROP};
pub use limb::{
    correct_rotation, correct_scale, use_pole, LimbIk2Fk, ROTATION_SEARCH_TOLERANCE,
    SCALE_CORRECTION_MAX_ITERATIONS, SCALE_CORRECTION_TOLERANCE,
};
pub use pole::match_pole_target;
pub use switch_parent::{ParentSelector, SwitchParent};
pub use vehicle::{
    clear_vehicle_floor, set_vehicle_floor, FloorOutcome, MISSING_WHEEL_DATA,
    SHRINKWRAP_NOT_FOUND,
};

use crate::error::PoseResult;
use crate::host::RigHost;

/// Fails with the first bone name that does not exist on the rig.
pub(crate) fn require_bones<'a>(
    host: &dyn RigHost,
    bones: impl IntoIterator<Item = &'a str>,
) -> PoseResult<()> {
    for name in bones {
        host.require_bone(name)?;
    }
    Ok(())
}
