//! Operator invocations.

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;
use crate::params::{
    ClearKeyframesParams, GenericSnapParams, LegRollIk2FkParams, LimbIk2FkParams,
    SwitchParentParams, VehicleFloorParams,
};

/// An operator together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operator {
    /// Copy the pose of one chain onto another.
    GenericSnap(GenericSnapParams),
    /// Snap an IK limb to its FK pose.
    LimbIk2Fk(LimbIk2FkParams),
    /// Snap an IK leg to its FK pose, preserving foot roll.
    LegRollIk2Fk(LegRollIk2FkParams),
    /// Switch a control's parent while keeping its pose.
    SwitchParent(SwitchParentParams),
    /// Remove transform keys and reset bones.
    ClearKeyframes(ClearKeyframesParams),
    /// Copy the scene frame range into the bake settings.
    GetFrameRange,
    /// Relay the floor object to every wheel's shrinkwrap constraint.
    SetVehicleFloor(VehicleFloorParams),
    /// Detach the wheels from the floor object.
    ClearVehicleFloor(VehicleFloorParams),
}

impl Operator {
    /// Returns the stable operator identifier.
    pub fn id(&self) -> &'static str {
        match self {
            Operator::GenericSnap(_) => "generic_snap",
            Operator::LimbIk2Fk(_) => "limb_ik2fk",
            Operator::LegRollIk2Fk(_) => "leg_roll_ik2fk",
            Operator::SwitchParent(_) => "switch_parent",
            Operator::ClearKeyframes(_) => "clear_keyframes",
            Operator::GetFrameRange => "get_frame_range",
            Operator::SetVehicleFloor(_) => "set_vehicle_floor",
            Operator::ClearVehicleFloor(_) => "clear_vehicle_floor",
        }
    }

    /// Returns true if the operator has a bake variant.
    pub fn supports_bake(&self) -> bool {
        matches!(
            self,
            Operator::GenericSnap(_)
                | Operator::LimbIk2Fk(_)
                | Operator::LegRollIk2Fk(_)
                | Operator::SwitchParent(_)
        )
    }

    /// Returns the display label for the operator in the given mode.
    pub fn description(&self, mode: ExecutionMode) -> String {
        match (self, mode) {
            (Operator::GenericSnap(p), ExecutionMode::Single) => {
                format!("Snap {} on the current frame", p.tooltip)
            }
            (Operator::GenericSnap(p), ExecutionMode::Bake) => {
                format!("Apply snap {} to keyframes", p.tooltip)
            }
            (Operator::LimbIk2Fk(_), ExecutionMode::Single) => {
                "Snap the IK chain to FK result".to_string()
            }
            (Operator::LimbIk2Fk(_), ExecutionMode::Bake) => {
                "Snap the IK chain keyframes to FK result".to_string()
            }
            (Operator::LegRollIk2Fk(_), ExecutionMode::Single) => {
                "Snap the IK chain to FK result, using foot roll to preserve the current IK \
                 control orientation as much as possible"
                    .to_string()
            }
            (Operator::LegRollIk2Fk(_), ExecutionMode::Bake) => {
                "Snap the IK chain keyframes to FK result, using foot roll to preserve the \
                 current IK control orientation as much as possible"
                    .to_string()
            }
            (Operator::SwitchParent(_), ExecutionMode::Single) => {
                "Switch parent, preserving the bone position and orientation".to_string()
            }
            (Operator::SwitchParent(_), ExecutionMode::Bake) => {
                "Switch parent over a frame range, adjusting keys to preserve the bone \
                 position and orientation"
                    .to_string()
            }
            (Operator::ClearKeyframes(_), _) => {
                "Remove all keyframes for the relevant bones and reset transformation".to_string()
            }
            (Operator::GetFrameRange, _) => "Set start and end frame from scene".to_string(),
            (Operator::SetVehicleFloor(_), _) => "Stick the vehicle wheels to the floor".to_string(),
            (Operator::ClearVehicleFloor(_), _) => {
                "Release the vehicle wheels from the floor".to_string()
            }
        }
    }

    /// Validates the operator parameters.
    pub fn validate(&self) -> Result<(), ParamsError> {
        match self {
            Operator::GenericSnap(p) => p.validate(),
            Operator::LimbIk2Fk(p) => p.validate(),
            Operator::LegRollIk2Fk(p) => p.validate(),
            Operator::SwitchParent(p) => p.validate(),
            Operator::ClearKeyframes(p) => p.validate(),
            Operator::GetFrameRange
            | Operator::SetVehicleFloor(_)
            | Operator::ClearVehicleFloor(_) => Ok(()),
        }
    }
}

/// How an operator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Update the current frame only, keying per auto-key preferences.
    #[default]
    Single,
    /// Revisit and re-key every relevant keyed frame.
    Bake,
}

/// A complete operator request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Invocation {
    /// The operator and its parameters.
    pub operator: Operator,
    /// Execution mode.
    #[serde(default)]
    pub mode: ExecutionMode,
}

impl Invocation {
    /// Creates a single-frame invocation.
    pub fn single(operator: Operator) -> Self {
        Self {
            operator,
            mode: ExecutionMode::Single,
        }
    }

    /// Creates a bake invocation.
    pub fn bake(operator: Operator) -> Self {
        Self {
            operator,
            mode: ExecutionMode::Bake,
        }
    }

    /// Returns the display label.
    pub fn description(&self) -> String {
        self.operator.description(self.mode)
    }

    /// Validates the invocation.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.mode == ExecutionMode::Bake && !self.operator.supports_bake() {
            return Err(ParamsError::NotBakeable {
                operator: self.operator.id(),
            });
        }
        self.operator.validate()
    }

    /// Parses an invocation from JSON.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        serde_json::from_str(json).map_err(|e| ParamsError::Parse(e.to_string()))
    }

    /// Serializes the invocation to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, ParamsError> {
        serde_json::to_string_pretty(self).map_err(|e| ParamsError::Parse(e.to_string()))
    }
}
