//! Per-operation bake bookkeeping.

use std::collections::BTreeSet;

use rigsnap_spec::{BakeSettings, KeyingPreferences};

use crate::curves::{
    delete_keys_in_range, frames_with_keys, set_interpolation_in_range, AnimData, CurveTable,
    FrameRange, Interpolation,
};
use crate::error::{PoseError, PoseResult};
use crate::host::RigHost;
use crate::keying::{keying_flags, set_custom_property_value, KeyFlags};
use crate::rig::{PropValue, TransformProp};

/// Keying flags for one operator run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Keying {
    /// Flags for transform keys; `None` disables keying.
    pub keyflags: Option<KeyFlags>,
    /// Flags for switch-property keys; `None` disables keying.
    pub keyflags_switch: Option<KeyFlags>,
}

impl Keying {
    /// No keying.
    pub fn none() -> Self {
        Self::default()
    }
}

/// Transient state of a bake: frame range, curve index and frames to revisit.
#[derive(Debug, Clone)]
pub struct BakeSession {
    /// Explicit range in scene time.
    pub frame_range: Option<(i32, i32)>,
    /// Explicit range in action time.
    pub frame_range_raw: Option<FrameRange>,
    /// Index of the action's curves at the start of the bake.
    pub table: CurveTable,
    /// Scene frame to return to when done.
    pub current_frame: i32,
    pub keying: Keying,
    frames_raw: Vec<f32>,
    frames: Vec<i32>,
    tweak: AnimData,
}

impl BakeSession {
    /// Starts a bake on `host`. Fails when the rig has no action.
    pub fn new(
        host: &dyn RigHost,
        settings: &BakeSettings,
        prefs: &KeyingPreferences,
    ) -> PoseResult<Self> {
        let anim = host.anim_data().ok_or(PoseError::NoAction)?;
        if anim.action.is_none() {
            return Err(PoseError::NoAction);
        }
        let frame_range = settings.frame_range();
        let time = AnimData {
            action: None,
            tweak: anim.tweak,
            drivers: Vec::new(),
        };
        Ok(Self {
            frame_range,
            frame_range_raw: time.range_to_action(frame_range).map(ordered),
            table: CurveTable::for_action(anim),
            current_frame: host.frame_current(),
            keying: Keying {
                keyflags: Some(keying_flags(prefs)),
                keyflags_switch: None,
            },
            frames_raw: Vec::new(),
            frames: Vec::new(),
            tweak: time,
        })
    }

    /// Registers the frames keyed on the given curves, within the range.
    pub fn add_curve_frames(&mut self, host: &dyn RigHost, curves: &BTreeSet<usize>) {
        let Some(action) = host.anim_data().and_then(|a| a.action.as_ref()) else {
            return;
        };
        let frames = frames_with_keys(action.curves_at(curves), self.frame_range_raw);
        self.frames_raw.extend(frames);
    }

    /// Curves animating `props` of `bones`.
    pub fn bone_curves<'a>(
        &self,
        bones: impl IntoIterator<Item = &'a str>,
        props: &[TransformProp],
    ) -> BTreeSet<usize> {
        self.table.bone_curves(bones, props)
    }

    /// Registers the frames keyed on `props` of `bones` and returns their curves.
    pub fn add_bone_frames<'a>(
        &mut self,
        host: &dyn RigHost,
        bones: impl IntoIterator<Item = &'a str>,
        props: &[TransformProp],
    ) -> BTreeSet<usize> {
        let curves = self.bone_curves(bones, props);
        self.add_curve_frames(host, &curves);
        curves
    }

    /// Converts the registered frames to sorted, distinct scene frames.
    pub fn finish_frames(&mut self) {
        let mut frames: Vec<i32> = self
            .frames_raw
            .iter()
            .map(|&f| self.tweak.to_scene(f).round() as i32)
            .collect();
        frames.sort_unstable();
        frames.dedup();
        self.frames = frames;
    }

    /// Scene frames to revisit, ascending.
    pub fn frames(&self) -> &[i32] {
        &self.frames
    }

    /// Returns true if no frames were registered.
    pub fn is_empty(&self) -> bool {
        self.frames_raw.is_empty()
    }

    /// Baked range in scene time: explicit, or spanning the revisited frames.
    pub fn bake_range(&self) -> (i32, i32) {
        if let Some(range) = self.frame_range {
            return range;
        }
        match (self.frames.first(), self.frames.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => (self.current_frame, self.current_frame),
        }
    }

    /// Baked range in scene and action time.
    pub fn bake_range_pair(&self) -> ((i32, i32), FrameRange) {
        let range = self.bake_range();
        let raw = (
            self.tweak.to_action(range.0 as f32),
            self.tweak.to_action(range.1 as f32),
        );
        (range, ordered(raw))
    }

    /// Re-keys an animated custom property as a step at the start of the range.
    ///
    /// Keys inside the range are removed, the new value is keyed on existing
    /// curves only, and the range's keys become constant.
    pub fn replace_custom_prop_keys_constant(
        &self,
        host: &mut dyn RigHost,
        bone: &str,
        prop: &str,
        value: PropValue,
    ) -> PoseResult<()> {
        let Some(positions) = self.table.custom_prop_curves(bone, prop) else {
            return Ok(());
        };
        if !positions.contains_key(&0) {
            return Ok(());
        }
        let positions: BTreeSet<usize> = positions.values().copied().collect();
        let (_, range_raw) = self.bake_range_pair();

        if let Some(action) = host.anim_data_mut().action.as_mut() {
            delete_keys_in_range(action.curves_at_mut(&positions), Some(range_raw));
        }
        set_custom_property_value(host, bone, prop, value, Some(KeyFlags::new().with_available()))?;
        if let Some(action) = host.anim_data_mut().action.as_mut() {
            set_interpolation_in_range(
                action.curves_at_mut(&positions),
                Interpolation::Constant,
                Some(range_raw),
            );
        }
        Ok(())
    }
}

fn ordered((a, b): FrameRange) -> FrameRange {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
