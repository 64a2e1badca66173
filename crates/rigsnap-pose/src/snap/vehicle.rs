//! Vehicle wheel floor relay.
//!
//! A vehicle rig lists its wheel bones in an armature property. A null bone
//! carries a shrinkwrap constraint whose target is the floor object; setting
//! the floor copies that target onto every wheel's shrinkwrap constraint.

use rigsnap_spec::VehicleFloorParams;
use tracing::{debug, warn};

use crate::error::{PoseError, PoseResult};
use crate::host::RigHost;
use crate::rig::ConstraintKind;

/// Reported when the wheel list, null bone or floor constraint is missing.
pub const MISSING_WHEEL_DATA: &str = "Missing data for wheel snapping";

/// Reported for each wheel without a shrinkwrap constraint.
pub const SHRINKWRAP_NOT_FOUND: &str = "Shrinkwrap constraint not found";

/// Wheels touched by a floor operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloorOutcome {
    /// Wheels whose shrinkwrap target was changed.
    pub updated: Vec<String>,
    /// Wheels without a shrinkwrap constraint.
    pub missing_constraint: Vec<String>,
}

/// Points every wheel's shrinkwrap at the null's floor object.
pub fn set_vehicle_floor(host: &mut dyn RigHost, params: &VehicleFloorParams) -> PoseResult<FloorOutcome> {
    let wheels = wheel_names(host, params)?;
    let floor = null_floor_target(host, params)?.clone();
    relay_target(host, &wheels, floor.as_deref())
}

/// Detaches every wheel and the null from the floor object.
pub fn clear_vehicle_floor(
    host: &mut dyn RigHost,
    params: &VehicleFloorParams,
) -> PoseResult<FloorOutcome> {
    let wheels = wheel_names(host, params)?;
    null_floor_target(host, params)?;

    let outcome = relay_target(host, &wheels, None)?;
    if let Some(ConstraintKind::Shrinkwrap { target }) = host
        .bone_mut(&params.null_bone)
        .and_then(|bone| bone.constraints.iter_mut().find(|c| c.name == params.null_constraint))
        .map(|c| &mut c.kind)
    {
        *target = None;
    }
    Ok(outcome)
}

fn wheel_names(host: &dyn RigHost, params: &VehicleFloorParams) -> PoseResult<Vec<String>> {
    host.data_property(&params.wheels_prop)
        .and_then(|value| value.as_string_list())
        .map(<[String]>::to_vec)
        .ok_or_else(|| PoseError::missing_data(MISSING_WHEEL_DATA))
}

fn null_floor_target<'a>(
    host: &'a dyn RigHost,
    params: &VehicleFloorParams,
) -> PoseResult<&'a Option<String>> {
    host.bone(&params.null_bone)
        .and_then(|bone| bone.constraints.iter().find(|c| c.name == params.null_constraint))
        .and_then(|constraint| match &constraint.kind {
            ConstraintKind::Shrinkwrap { target } => Some(target),
            _ => None,
        })
        .ok_or_else(|| PoseError::missing_data(MISSING_WHEEL_DATA))
}

/// Sets the first shrinkwrap target of each wheel, in order.
///
/// A wheel bone that does not exist stops the loop; earlier wheels keep their
/// new target.
fn relay_target(
    host: &mut dyn RigHost,
    wheels: &[String],
    floor: Option<&str>,
) -> PoseResult<FloorOutcome> {
    let mut outcome = FloorOutcome::default();
    for wheel in wheels {
        let bone = host
            .bone_mut(wheel)
            .ok_or_else(|| PoseError::missing_data(MISSING_WHEEL_DATA))?;
        match bone.constraint_of_type_mut("SHRINKWRAP").map(|c| &mut c.kind) {
            Some(ConstraintKind::Shrinkwrap { target }) => {
                *target = floor.map(str::to_string);
                debug!(wheel = %wheel, floor = ?floor, "Relayed floor target");
                outcome.updated.push(wheel.clone());
            }
            _ => {
                warn!(wheel = %wheel, "{SHRINKWRAP_NOT_FOUND}");
                outcome.missing_constraint.push(wheel.clone());
            }
        }
    }
    host.update();
    Ok(outcome)
}
