//! Single-frame and bake-over-keys execution of pose operators.
//!
//! A [`FrameOperator`] captures per-frame state from the rig and re-applies it.
//! [`execute_bake`] revisits every keyed frame of the operator's driver
//! curves: all states are captured before anything is written, the
//! destination keys in the range are cleared, and the states are applied and
//! keyed frame by frame. [`execute_single`] does one capture/apply pair on the
//! current frame with auto-key flags.

mod session;

pub use session::{BakeSession, Keying};

use std::collections::BTreeSet;

use rigsnap_spec::{OperatorReport, SessionConfig};
use tracing::{debug, error, info, warn};

use crate::curves::{delete_keys_in_range, strip_empty_curves, FrameRange};
use crate::error::{ErrorKind, PoseError, PoseResult};
use crate::host::RigHost;
use crate::keying::{add_flags_if_set, autokey_flags, KeyFlags};

/// Message reported when a bake finds no frames.
pub const NO_KEYS_MESSAGE: &str = "No keys to bake.";

/// An operator that can be run on one frame or baked over a range.
pub trait FrameOperator {
    /// State captured on one frame.
    type State;

    /// Checks that every referenced bone and property exists.
    ///
    /// Runs before anything is read or written; failure cancels the operator.
    fn init(&mut self, host: &dyn RigHost) -> PoseResult<()>;

    /// Registers the frames to revisit and returns the destination curves.
    fn scan_curves(
        &mut self,
        host: &dyn RigHost,
        session: &mut BakeSession,
    ) -> PoseResult<BTreeSet<usize>>;

    /// Called once before the first capture.
    fn before_save(&mut self, _host: &mut dyn RigHost) -> PoseResult<()> {
        Ok(())
    }

    /// Called once after the last capture, even if capturing failed.
    fn after_save(&mut self, _host: &mut dyn RigHost) {}

    /// Captures the state of the current frame.
    fn save_frame_state(&mut self, host: &dyn RigHost) -> PoseResult<Self::State>;

    /// Called after clearing, before the first apply.
    fn before_apply(
        &mut self,
        _host: &mut dyn RigHost,
        _session: &BakeSession,
        _range: (i32, i32),
        _range_raw: FrameRange,
    ) -> PoseResult<()> {
        Ok(())
    }

    /// Writes a captured state on the current frame.
    fn apply_frame_state(
        &mut self,
        host: &mut dyn RigHost,
        keying: &Keying,
        state: Self::State,
    ) -> PoseResult<()>;
}

// =============================================================================
// Single Frame
// =============================================================================

/// Keying used for a single-frame run: auto-key flags, plus AVAILABLE for
/// switch properties.
pub fn single_frame_keying(config: &SessionConfig) -> Keying {
    let keyflags = autokey_flags(&config.keying, true);
    Keying {
        keyflags,
        keyflags_switch: add_flags_if_set(keyflags, KeyFlags::new().with_available()),
    }
}

/// Runs one capture/apply pair on the current frame.
pub fn execute_single<O: FrameOperator>(
    host: &mut dyn RigHost,
    operator: &mut O,
    config: &SessionConfig,
    report: &mut OperatorReport,
) {
    if let Err(err) = operator.init(host) {
        cancel_with(report, &err);
        return;
    }

    let keying = single_frame_keying(config);
    info!(
        operator = %report.operator,
        frame = host.frame_current(),
        keyed = keying.keyflags.is_some(),
        "Running on current frame"
    );

    if let Err(err) = run_single(host, operator, &keying) {
        report_exception(report, &err);
    }
}

fn run_single<O: FrameOperator>(
    host: &mut dyn RigHost,
    operator: &mut O,
    keying: &Keying,
) -> PoseResult<()> {
    let state = save_states(host, operator, None)?;
    for (_, state) in state {
        operator.apply_frame_state(host, keying, state)?;
    }
    host.update();
    Ok(())
}

// =============================================================================
// Bake
// =============================================================================

/// Bakes the operator over the keyed frames of its driver curves.
pub fn execute_bake<O: FrameOperator>(
    host: &mut dyn RigHost,
    operator: &mut O,
    config: &SessionConfig,
    report: &mut OperatorReport,
) {
    if let Err(err) = operator.init(host) {
        cancel_with(report, &err);
        return;
    }

    let mut session = match BakeSession::new(host, &config.bake, &config.keying) {
        Ok(session) => session,
        Err(err) => {
            cancel_with(report, &err);
            return;
        }
    };

    if config.bake.use_all_keys {
        let all = session.table.all_curves();
        session.add_curve_frames(host, &all);
    }

    let curves = match operator.scan_curves(host, &mut session) {
        Ok(curves) => curves,
        Err(err) => {
            cancel_with(report, &err);
            return;
        }
    };

    session.finish_frames();
    if session.is_empty() {
        warn!(operator = %report.operator, "{NO_KEYS_MESSAGE}");
        report.warning(NO_KEYS_MESSAGE);
        report.cancel();
        return;
    }

    report.frames = session.frames().to_vec();
    info!(
        operator = %report.operator,
        frames = session.frames().len(),
        curves = curves.len(),
        "Baking"
    );

    if let Err(err) = run_bake(host, operator, &session, &curves) {
        report_exception(report, &err);
    }
}

fn run_bake<O: FrameOperator>(
    host: &mut dyn RigHost,
    operator: &mut O,
    session: &BakeSession,
    curves: &BTreeSet<usize>,
) -> PoseResult<()> {
    let states = save_states(host, operator, Some(session.frames()))?;

    let (range, range_raw) = session.bake_range_pair();
    host.frame_set(range.0);
    if let Some(action) = host.anim_data_mut().action.as_mut() {
        let removed = delete_keys_in_range(action.curves_at_mut(curves), Some(range_raw));
        debug!(removed, start = range_raw.0, end = range_raw.1, "Cleared destination keys");
    }

    operator.before_apply(host, session, range, range_raw)?;

    for (frame, state) in states {
        host.frame_set(frame);
        debug!(frame, "Applying");
        operator.apply_frame_state(host, &session.keying, state)?;
    }

    if let Some(action) = host.anim_data_mut().action.as_mut() {
        strip_empty_curves(action);
    }
    host.frame_set(session.current_frame);
    Ok(())
}

/// Captures state on each frame, or once on the current frame when `frames`
/// is `None`. Nothing is written until every frame has been captured.
fn save_states<O: FrameOperator>(
    host: &mut dyn RigHost,
    operator: &mut O,
    frames: Option<&[i32]>,
) -> PoseResult<Vec<(i32, O::State)>> {
    let result = operator.before_save(host).and_then(|()| match frames {
        None => {
            let frame = host.frame_current();
            Ok(vec![(frame, operator.save_frame_state(host)?)])
        }
        Some(frames) => {
            let mut states = Vec::with_capacity(frames.len());
            for &frame in frames {
                host.frame_set(frame);
                debug!(frame, "Capturing");
                states.push((frame, operator.save_frame_state(host)?));
            }
            Ok(states)
        }
    });
    operator.after_save(host);
    result
}

pub(crate) fn cancel_with(report: &mut OperatorReport, err: &PoseError) {
    warn!(operator = %report.operator, code = err.code(), "Cancelled: {err}");
    let message = match err.kind() {
        ErrorKind::InvalidParameters => format!("Invalid parameters: {err}"),
        _ => err.to_string(),
    };
    report.error_with_code(err.code(), message);
    report.cancel();
}

pub(crate) fn report_exception(report: &mut OperatorReport, err: &PoseError) {
    error!(operator = %report.operator, code = err.code(), "Operator failed: {err}");
    report.error_with_code(err.code(), format!("Exception: {err}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::armature::Armature;
    use crate::curves::{bone_prop_path, Action, FCurve};
    use crate::keying::{keyframe_transform_properties, ChannelMask};
    use crate::rig::{PoseBone, TransformProp};
    use glam::Vec3;
    use pretty_assertions::assert_eq;
    use rigsnap_spec::{BakeSettings, KeyingPreferences, OperatorStatus, ReportLevel};

    /// Copies `src` location x into `dst` location x each frame.
    #[derive(Default)]
    struct CopyX {
        fail_on_apply: Option<i32>,
        applied: Vec<(i32, f32)>,
        hooks: Vec<&'static str>,
    }

    impl FrameOperator for CopyX {
        type State = f32;

        fn init(&mut self, host: &dyn RigHost) -> PoseResult<()> {
            host.require_bone("src")?;
            host.require_bone("dst")?;
            Ok(())
        }

        fn scan_curves(
            &mut self,
            host: &dyn RigHost,
            session: &mut BakeSession,
        ) -> PoseResult<BTreeSet<usize>> {
            session.add_bone_frames(host, ["src"], &TransformProp::LOCATION);
            Ok(session.bone_curves(["dst"], &TransformProp::LOCATION))
        }

        fn before_save(&mut self, _host: &mut dyn RigHost) -> PoseResult<()> {
            self.hooks.push("before_save");
            Ok(())
        }

        fn after_save(&mut self, _host: &mut dyn RigHost) {
            self.hooks.push("after_save");
        }

        fn save_frame_state(&mut self, host: &dyn RigHost) -> PoseResult<f32> {
            Ok(host.require_bone("src")?.channels.location.x)
        }

        fn before_apply(
            &mut self,
            _host: &mut dyn RigHost,
            _session: &BakeSession,
            _range: (i32, i32),
            _range_raw: FrameRange,
        ) -> PoseResult<()> {
            self.hooks.push("before_apply");
            Ok(())
        }

        fn apply_frame_state(
            &mut self,
            host: &mut dyn RigHost,
            keying: &Keying,
            state: f32,
        ) -> PoseResult<()> {
            let frame = host.frame_current();
            if self.fail_on_apply == Some(frame) {
                return Err(PoseError::missing_data("test failure"));
            }
            host.require_bone_mut("dst")?.channels.location.x = state;
            if let Some(flags) = keying.keyflags {
                keyframe_transform_properties(host, "dst", flags, ChannelMask::all())?;
            }
            self.applied.push((frame, state));
            Ok(())
        }
    }

    /// Reads `src` location x and writes it back offset by ten, so every
    /// apply changes what a later capture on the same bone would see.
    #[derive(Default)]
    struct OffsetSrc {
        saved: Vec<(i32, f32)>,
    }

    impl FrameOperator for OffsetSrc {
        type State = f32;

        fn init(&mut self, host: &dyn RigHost) -> PoseResult<()> {
            host.require_bone("src")?;
            Ok(())
        }

        fn scan_curves(
            &mut self,
            host: &dyn RigHost,
            session: &mut BakeSession,
        ) -> PoseResult<BTreeSet<usize>> {
            session.add_bone_frames(host, ["src"], &TransformProp::LOCATION);
            Ok(session.bone_curves(["src"], &TransformProp::LOCATION))
        }

        fn save_frame_state(&mut self, host: &dyn RigHost) -> PoseResult<f32> {
            let x = host.require_bone("src")?.channels.location.x;
            self.saved.push((host.frame_current(), x));
            Ok(x)
        }

        fn apply_frame_state(
            &mut self,
            host: &mut dyn RigHost,
            keying: &Keying,
            state: f32,
        ) -> PoseResult<()> {
            host.require_bone_mut("src")?.channels.location.x = state + 10.0;
            if let Some(flags) = keying.keyflags {
                keyframe_transform_properties(host, "src", flags, ChannelMask::all())?;
            }
            Ok(())
        }
    }

    fn rig(src_keys: &[(f32, f32)]) -> Armature {
        let path = bone_prop_path("src", TransformProp::Location);
        Armature::new("rig")
            .with_bone(PoseBone::new("src", Vec3::ZERO, Vec3::Y))
            .with_bone(PoseBone::new("dst", Vec3::X, Vec3::new(1.0, 1.0, 0.0)))
            .with_action(
                Action::new("Action")
                    .with_curve(FCurve::new(path, 0).with_keys(src_keys.iter().copied())),
            )
            .built()
    }

    fn dst_x_curve(rig: &Armature) -> Option<&FCurve> {
        let path = bone_prop_path("dst", TransformProp::Location);
        let action = rig.anim_data()?.action.as_ref()?;
        action.find(&path, 0).map(|pos| &action.fcurves[pos])
    }

    #[test]
    fn test_bake_saves_all_frames_before_applying() {
        let mut rig = rig(&[(1.0, 0.0), (5.0, 2.0), (9.0, 4.0)]);
        let mut op = CopyX::default();
        let mut report = OperatorReport::new("copy_x", "Copy x");
        execute_bake(&mut rig, &mut op, &SessionConfig::default(), &mut report);

        assert_eq!(report.status, OperatorStatus::Finished);
        assert_eq!(report.frames, vec![1, 5, 9]);
        assert_eq!(op.applied, vec![(1, 0.0), (5, 2.0), (9, 4.0)]);
        assert_eq!(op.hooks, vec!["before_save", "after_save", "before_apply"]);

        let curve = dst_x_curve(&rig).expect("dst curve");
        let frames: Vec<f32> = curve.keyframes.iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![1.0, 5.0, 9.0]);
        assert_eq!(rig.frame_current(), 1);
    }

    #[test]
    fn test_saved_states_match_dry_run_when_applies_feed_back() {
        let mut rig = rig(&[(1.0, 0.0), (5.0, 2.0), (9.0, 4.0)]);
        let mut dry = OffsetSrc::default();
        for frame in [1, 5, 9] {
            rig.frame_set(frame);
            dry.save_frame_state(&rig).unwrap();
        }
        rig.frame_set(1);

        let mut op = OffsetSrc::default();
        let mut report = OperatorReport::new("offset_src", "Offset src");
        execute_bake(&mut rig, &mut op, &SessionConfig::default(), &mut report);

        assert_eq!(report.status, OperatorStatus::Finished, "{:?}", report.messages);
        assert_eq!(op.saved, dry.saved);
        assert_eq!(op.saved, vec![(1, 0.0), (5, 2.0), (9, 4.0)]);

        let path = bone_prop_path("src", TransformProp::Location);
        let action = rig.anim_data().and_then(|a| a.action.as_ref()).unwrap();
        let curve = &action.fcurves[action.find(&path, 0).unwrap()];
        let keys: Vec<(f32, f32)> = curve.keyframes.iter().map(|k| (k.frame, k.value)).collect();
        assert_eq!(keys, vec![(1.0, 10.0), (5.0, 12.0), (9.0, 14.0)]);
    }

    #[test]
    fn test_single_frame_leaves_pose_evaluated() {
        let mut rig = rig(&[(1.0, 3.0)]);
        rig.frame_set(1);
        let mut report = OperatorReport::new("copy_x", "Copy x");
        execute_single(&mut rig, &mut CopyX::default(), &SessionConfig::default(), &mut report);

        let dst = rig.pose_matrix("dst").unwrap();
        assert!((dst.w_axis.x - 4.0).abs() < 1e-5, "{dst:?}");
    }

    #[test]
    fn test_empty_bake_has_no_side_effects() {
        let mut rig = rig(&[]);
        rig.frame_set(7);
        let before = rig.clone();
        let mut op = CopyX::default();
        let mut report = OperatorReport::new("copy_x", "Copy x");
        execute_bake(&mut rig, &mut op, &SessionConfig::default(), &mut report);

        assert!(report.is_cancelled());
        let warnings: Vec<_> = report.messages_at(ReportLevel::Warning).collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].message, NO_KEYS_MESSAGE);
        assert!(op.hooks.is_empty());
        assert_eq!(rig.frame_current(), 7);
        assert_eq!(rig.anim_data(), before.anim_data());
    }

    #[test]
    fn test_bake_respects_frame_range() {
        let mut rig = rig(&[(1.0, 0.0), (5.0, 2.0), (9.0, 4.0), (20.0, 1.0)]);
        let config = SessionConfig::default().with_bake(BakeSettings::new().with_frame_range(4, 10));
        let mut op = CopyX::default();
        let mut report = OperatorReport::new("copy_x", "Copy x");
        execute_bake(&mut rig, &mut op, &config, &mut report);

        assert_eq!(report.frames, vec![5, 9]);
    }

    #[test]
    fn test_bake_without_action_cancels() {
        let mut rig = Armature::new("rig")
            .with_bone(PoseBone::new("src", Vec3::ZERO, Vec3::Y))
            .with_bone(PoseBone::new("dst", Vec3::X, Vec3::new(1.0, 1.0, 0.0)))
            .built();
        let mut report = OperatorReport::new("copy_x", "Copy x");
        execute_bake(&mut rig, &mut CopyX::default(), &SessionConfig::default(), &mut report);

        assert!(report.is_cancelled());
        assert_eq!(report.messages[0].code.as_deref(), Some("POSE_003"));
    }

    #[test]
    fn test_missing_bone_cancels_before_mutation() {
        let mut rig = Armature::new("rig")
            .with_bone(PoseBone::new("src", Vec3::ZERO, Vec3::Y))
            .built();
        let mut report = OperatorReport::new("copy_x", "Copy x");
        execute_single(&mut rig, &mut CopyX::default(), &SessionConfig::default(), &mut report);

        assert!(report.is_cancelled());
        assert!(report.has_errors());
    }

    #[test]
    fn test_apply_failure_is_reported_as_exception() {
        let mut rig = rig(&[(1.0, 0.0), (5.0, 2.0), (9.0, 4.0)]);
        let mut op = CopyX {
            fail_on_apply: Some(5),
            ..CopyX::default()
        };
        let mut report = OperatorReport::new("copy_x", "Copy x");
        execute_bake(&mut rig, &mut op, &SessionConfig::default(), &mut report);

        assert_eq!(report.status, OperatorStatus::Finished);
        assert!(report.messages[0].message.starts_with("Exception: "));
        assert_eq!(op.applied, vec![(1, 0.0)]);
    }

    #[test]
    fn test_single_frame_keys_only_with_auto_key() {
        let mut rig = rig(&[(1.0, 3.0)]);
        rig.frame_set(1);
        let mut report = OperatorReport::new("copy_x", "Copy x");
        execute_single(&mut rig, &mut CopyX::default(), &SessionConfig::default(), &mut report);
        assert_eq!(rig.bone("dst").map(|b| b.channels.location.x), Some(3.0));
        assert!(dst_x_curve(&rig).is_none());

        let config = SessionConfig::default().with_keying(KeyingPreferences::auto_keying());
        execute_single(&mut rig, &mut CopyX::default(), &config, &mut report);
        assert!(dst_x_curve(&rig).is_some());
    }

    #[test]
    fn test_single_frame_keying_adds_available_for_switch() {
        let keying = single_frame_keying(&SessionConfig::default());
        assert_eq!(keying, Keying::none());

        let config = SessionConfig::default().with_keying(KeyingPreferences::auto_keying());
        let keying = single_frame_keying(&config);
        let switch = keying.keyflags_switch.expect("switch flags");
        assert!(switch.available);
        assert!(!keying.keyflags.expect("flags").available);
    }
}
