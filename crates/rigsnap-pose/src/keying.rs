//! Keyframe insertion.
//!
//! Flags follow the host's keyframing preferences: `needed` skips keys that
//! would not change the curve, `available` only keys curves that already
//! exist, and `replace` only overwrites keys already present at the frame.

use rigsnap_spec::{AutoKeyMode, KeyingPreferences};

use crate::curves::{bone_custom_prop_path, bone_prop_path, Action, CurveColor};
use crate::error::PoseResult;
use crate::host::RigHost;
use crate::rig::{PropValue, TransformProp};

/// A value this close to the curve is not worth a key under `needed`.
const NEEDED_EPSILON: f32 = 1e-6;

/// Keyframe insertion options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyFlags {
    pub needed: bool,
    pub xyz_to_rgb: bool,
    /// Accepted for parity with host preferences; cyclic curves are not modeled.
    pub cycle_aware: bool,
    pub available: bool,
    pub replace: bool,
}

impl KeyFlags {
    /// No options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Union of two flag sets.
    pub fn union(self, other: KeyFlags) -> Self {
        Self {
            needed: self.needed || other.needed,
            xyz_to_rgb: self.xyz_to_rgb || other.xyz_to_rgb,
            cycle_aware: self.cycle_aware || other.cycle_aware,
            available: self.available || other.available,
            replace: self.replace || other.replace,
        }
    }

    /// Adds the `available` option.
    pub fn with_available(mut self) -> Self {
        self.available = true;
        self
    }

    /// Adds the `replace` option.
    pub fn with_replace(mut self) -> Self {
        self.replace = true;
        self
    }
}

/// General keying flags from user preferences.
pub fn keying_flags(prefs: &KeyingPreferences) -> KeyFlags {
    KeyFlags {
        needed: prefs.insert_needed,
        xyz_to_rgb: prefs.xyz_to_rgb,
        cycle_aware: prefs.cycle_aware,
        ..KeyFlags::default()
    }
}

/// Auto-key flags, or `None` when auto-keying is off.
///
/// Auto-keying restricted to the active keying set also yields `None` unless
/// `ignore_keyingset` is set.
pub fn autokey_flags(prefs: &KeyingPreferences, ignore_keyingset: bool) -> Option<KeyFlags> {
    if !prefs.auto_key || (prefs.auto_key_keyingset && !ignore_keyingset) {
        return None;
    }
    let mut flags = keying_flags(prefs);
    flags.available = prefs.auto_key_available;
    flags.replace = prefs.auto_key_mode == AutoKeyMode::ReplaceKeys;
    Some(flags)
}

/// Adds `extra` to `base` when `base` is set.
pub fn add_flags_if_set(base: Option<KeyFlags>, extra: KeyFlags) -> Option<KeyFlags> {
    base.map(|flags| flags.union(extra))
}

/// Inserts a key at the current frame. Returns true if the curve changed.
pub fn insert_keyframe(
    host: &mut dyn RigHost,
    data_path: &str,
    index: usize,
    value: f32,
    group: &str,
    flags: KeyFlags,
) -> bool {
    let scene_frame = host.frame_current() as f32;
    let anim = host.anim_data_mut();
    let frame = anim.to_action(scene_frame);

    let existing = anim
        .action
        .as_ref()
        .and_then(|action| action.find(data_path, index));

    if existing.is_none() && (flags.available || flags.replace) {
        return false;
    }

    let action = anim.action.get_or_insert_with(|| Action::new("Action"));
    let pos = match existing {
        Some(pos) => pos,
        None => {
            let pos = action.find_or_create(data_path, index, Some(group));
            if flags.xyz_to_rgb && index < 3 {
                action.fcurves[pos].color_mode = CurveColor::XyzToRgb;
            }
            pos
        }
    };

    let curve = &mut action.fcurves[pos];
    if flags.replace && curve.key_at(frame).is_none() {
        return false;
    }
    if flags.needed {
        if let Some(current) = curve.evaluate(frame) {
            if (current - value).abs() <= NEEDED_EPSILON {
                return false;
            }
        }
    }
    curve.insert_or_replace(frame, value);
    curve.update();
    true
}

/// Which transform channels are excluded from writing and keying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelMask {
    /// Write and key individually locked components too.
    pub ignore_locks: bool,
    pub no_loc: bool,
    pub no_rot: bool,
    pub no_scale: bool,
}

impl ChannelMask {
    /// Nothing excluded.
    pub fn all() -> Self {
        Self::default()
    }

    /// Whole-channel exclusions.
    pub fn excluding(no_loc: bool, no_rot: bool, no_scale: bool) -> Self {
        Self {
            ignore_locks: false,
            no_loc,
            no_rot,
            no_scale,
        }
    }
}

/// Keys a bone's transform channels, skipping excluded and locked ones.
///
/// A property with every component locked is not keyed. Location is never
/// keyed on connected bones. Rotation keys the live representation only.
pub fn keyframe_transform_properties(
    host: &mut dyn RigHost,
    bone: &str,
    flags: KeyFlags,
    mask: ChannelMask,
) -> PoseResult<()> {
    let pose_bone = host.require_bone(bone)?;
    let channels = pose_bone.channels;
    let locks = pose_bone.locks;

    let mut props = Vec::new();
    if !(mask.no_loc || pose_bone.use_connect) {
        props.push(TransformProp::Location);
    }
    if !mask.no_rot {
        props.push(TransformProp::rotation_for(channels.rotation_mode));
    }
    if !mask.no_scale {
        props.push(TransformProp::Scale);
    }

    for prop in props {
        let prop_locks = locks.for_prop(prop);
        if !mask.ignore_locks && prop_locks.iter().all(|&l| l) {
            continue;
        }
        let path = bone_prop_path(bone, prop);
        for (i, value) in channels.values(prop).into_iter().enumerate() {
            if mask.ignore_locks || !prop_locks[i] {
                insert_keyframe(host, &path, i, value, bone, flags);
            }
        }
    }
    Ok(())
}

/// Assigns a custom property and optionally keys it.
pub fn set_custom_property_value(
    host: &mut dyn RigHost,
    bone: &str,
    prop: &str,
    value: PropValue,
    keyflags: Option<KeyFlags>,
) -> PoseResult<()> {
    let numeric = value.as_f32();
    host.require_bone_mut(bone)?.props.set(prop, value);
    if let (Some(flags), Some(numeric)) = (keyflags, numeric) {
        let path = bone_custom_prop_path(bone, prop);
        insert_keyframe(host, &path, 0, numeric, bone, flags);
    }
    Ok(())
}
