//! Operator dispatch.
//!
//! [`invoke`] is the single entry point callers use: it validates an
//! [`Invocation`], routes it to the matching operator and folds every outcome
//! into an [`OperatorReport`].

use rigsnap_spec::{ExecutionMode, Invocation, Operator, OperatorReport, SessionConfig};
use tracing::info;

use crate::bake::{cancel_with, execute_bake, execute_single, report_exception, FrameOperator};
use crate::error::{PoseError, PoseResult};
use crate::host::RigHost;
use crate::snap::{
    clear_keyframes, clear_vehicle_floor, set_vehicle_floor, FloorOutcome, GenericSnap,
    LegRollIk2Fk, LimbIk2Fk, SwitchParent, MISSING_WHEEL_DATA, SHRINKWRAP_NOT_FOUND,
};

/// Runs one operator invocation against a rig.
///
/// `config` is mutable because the frame range operator writes the scene
/// range into the bake settings.
pub fn invoke(
    host: &mut dyn RigHost,
    invocation: &Invocation,
    config: &mut SessionConfig,
) -> OperatorReport {
    let operator = &invocation.operator;
    let mut report = OperatorReport::new(operator.id(), invocation.description());

    if let Err(err) = validate(invocation, config) {
        cancel_with(&mut report, &err);
        return report;
    }

    let mode = invocation.mode;
    match operator {
        Operator::GenericSnap(params) => {
            run_frame_operator(host, GenericSnap::new(params), mode, config, &mut report)
        }
        Operator::LimbIk2Fk(params) => {
            run_frame_operator(host, LimbIk2Fk::new(params), mode, config, &mut report)
        }
        Operator::LegRollIk2Fk(params) => {
            run_frame_operator(host, LegRollIk2Fk::new(params), mode, config, &mut report)
        }
        Operator::SwitchParent(params) => {
            run_frame_operator(host, SwitchParent::new(params), mode, config, &mut report)
        }
        Operator::ClearKeyframes(params) => match clear_keyframes(host, params, &config.bake) {
            Ok(removed) => info!(operator = %report.operator, removed, "Cleared keyframes"),
            Err(err) => cancel_with(&mut report, &err),
        },
        Operator::GetFrameRange => {
            let (start, end) = host.scene_frame_range();
            config.bake.start_frame = start;
            config.bake.end_frame = end;
            info!(start, end, "Copied scene frame range");
        }
        Operator::SetVehicleFloor(params) => {
            report_floor(set_vehicle_floor(host, params), &mut report)
        }
        Operator::ClearVehicleFloor(params) => {
            report_floor(clear_vehicle_floor(host, params), &mut report)
        }
    }

    report
}

/// Returns the display label of an invocation.
pub fn describe(invocation: &Invocation) -> String {
    invocation.description()
}

fn validate(invocation: &Invocation, config: &SessionConfig) -> PoseResult<()> {
    invocation.validate()?;
    let uses_range = invocation.mode == ExecutionMode::Bake
        || matches!(invocation.operator, Operator::ClearKeyframes(_));
    if uses_range {
        config.bake.validate()?;
    }
    Ok(())
}

fn run_frame_operator<O: FrameOperator>(
    host: &mut dyn RigHost,
    mut operator: O,
    mode: ExecutionMode,
    config: &SessionConfig,
    report: &mut OperatorReport,
) {
    match mode {
        ExecutionMode::Single => execute_single(host, &mut operator, config, report),
        ExecutionMode::Bake => execute_bake(host, &mut operator, config, report),
    }
}

fn report_floor(outcome: PoseResult<FloorOutcome>, report: &mut OperatorReport) {
    match outcome {
        Ok(outcome) => {
            for _ in &outcome.missing_constraint {
                report.error(SHRINKWRAP_NOT_FOUND);
            }
            info!(
                operator = %report.operator,
                updated = outcome.updated.len(),
                missing = outcome.missing_constraint.len(),
                "Relayed floor target"
            );
        }
        Err(err @ PoseError::MissingData { .. }) => {
            report.error_with_code(err.code(), MISSING_WHEEL_DATA);
        }
        Err(err) => report_exception(report, &err),
    }
}
