//! Animation curves, actions and curve editing.

mod edit;
mod path;
mod table;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use edit::{delete_keys_in_range, frames_with_keys, set_interpolation_in_range, strip_empty_curves};
pub use path::{bone_custom_prop_path, bone_prop_path, quote_subscript, DataPath};
pub use table::CurveTable;

/// Two keys closer than this in time are the same key.
pub const KEY_TIME_THRESHOLD: f32 = 0.01;

/// Inclusive frame range in action time.
pub type FrameRange = (f32, f32);

/// How a curve moves from one key to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpolation {
    Constant,
    Linear,
    #[default]
    Bezier,
}

/// A keyframe point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Keyframe {
    pub frame: f32,
    pub value: f32,
    #[serde(default)]
    pub interpolation: Interpolation,
}

impl Keyframe {
    /// Creates a Bezier keyframe.
    pub fn new(frame: f32, value: f32) -> Self {
        Self {
            frame,
            value,
            interpolation: Interpolation::default(),
        }
    }
}

/// Curve color mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveColor {
    #[default]
    Auto,
    XyzToRgb,
}

/// Keyframes of one array component of one property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FCurve {
    pub data_path: String,
    #[serde(default)]
    pub array_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub color_mode: CurveColor,
    #[serde(default)]
    pub keyframes: Vec<Keyframe>,
    #[serde(skip)]
    needs_update: bool,
}

impl FCurve {
    /// Creates an empty curve.
    pub fn new(data_path: impl Into<String>, array_index: i32) -> Self {
        Self {
            data_path: data_path.into(),
            array_index,
            group: None,
            color_mode: CurveColor::Auto,
            keyframes: Vec::new(),
            needs_update: false,
        }
    }

    /// Sets the group name.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Appends keys, keeping them sorted by frame.
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        for (frame, value) in keys {
            self.insert_or_replace(frame, value);
        }
        self.update();
        self
    }

    /// Array index with negative indices treated as 0.
    pub fn index(&self) -> usize {
        self.array_index.max(0) as usize
    }

    /// Returns true if the curve has no keys.
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Position of the key at `frame`, within [`KEY_TIME_THRESHOLD`].
    pub fn key_at(&self, frame: f32) -> Option<usize> {
        self.keyframes
            .iter()
            .position(|k| (k.frame - frame).abs() < KEY_TIME_THRESHOLD)
    }

    /// Sets the value of the key at `frame`, or inserts a new Bezier key.
    pub fn insert_or_replace(&mut self, frame: f32, value: f32) {
        if let Some(i) = self.key_at(frame) {
            self.keyframes[i].value = value;
        } else {
            let pos = self.keyframes.partition_point(|k| k.frame < frame);
            self.keyframes.insert(pos, Keyframe::new(frame, value));
        }
        self.needs_update = true;
    }

    /// Removes the key at `position`.
    pub fn remove_key(&mut self, position: usize) {
        if position < self.keyframes.len() {
            self.keyframes.remove(position);
            self.needs_update = true;
        }
    }

    /// Re-sorts keys after an edit.
    pub fn update(&mut self) {
        self.keyframes.sort_by(|a, b| a.frame.total_cmp(&b.frame));
        self.needs_update = false;
    }

    /// Returns true if keys changed since the last [`FCurve::update`].
    pub fn needs_update(&self) -> bool {
        self.needs_update
    }

    /// Value of the curve at `frame`, held constant outside the keyed range.
    pub fn evaluate(&self, frame: f32) -> Option<f32> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        if frame >= last.frame {
            return Some(last.value);
        }
        let next = self.keyframes.partition_point(|k| k.frame <= frame);
        let a = self.keyframes[next - 1];
        let b = self.keyframes[next];
        let span = b.frame - a.frame;
        if span <= f32::EPSILON {
            return Some(b.value);
        }
        let t = (frame - a.frame) / span;
        let t = match a.interpolation {
            Interpolation::Constant => 0.0,
            Interpolation::Linear => t,
            Interpolation::Bezier => t * t * (3.0 - 2.0 * t),
        };
        Some(a.value + (b.value - a.value) * t)
    }
}

/// A named set of curves.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Action {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fcurves: Vec<FCurve>,
}

impl Action {
    /// Creates an empty action.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fcurves: Vec::new(),
        }
    }

    /// Appends a curve.
    pub fn with_curve(mut self, curve: FCurve) -> Self {
        self.fcurves.push(curve);
        self
    }

    /// Position of the curve for `data_path` and `index`.
    pub fn find(&self, data_path: &str, index: usize) -> Option<usize> {
        self.fcurves
            .iter()
            .position(|c| c.data_path == data_path && c.index() == index)
    }

    /// Position of the curve for `data_path` and `index`, created if missing.
    pub fn find_or_create(&mut self, data_path: &str, index: usize, group: Option<&str>) -> usize {
        if let Some(pos) = self.find(data_path, index) {
            return pos;
        }
        let mut curve = FCurve::new(data_path, index as i32);
        curve.group = group.map(str::to_string);
        self.fcurves.push(curve);
        self.fcurves.len() - 1
    }

    /// Curves at the given positions.
    pub fn curves_at<'a>(
        &'a self,
        positions: &'a BTreeSet<usize>,
    ) -> impl Iterator<Item = &'a FCurve> + 'a {
        positions.iter().filter_map(|&i| self.fcurves.get(i))
    }

    /// Mutable curves at the given positions.
    pub fn curves_at_mut<'a>(
        &'a mut self,
        positions: &'a BTreeSet<usize>,
    ) -> impl Iterator<Item = &'a mut FCurve> + 'a {
        self.fcurves
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| positions.contains(i))
            .map(|(_, c)| c)
    }

    /// Total number of keys across all curves.
    pub fn key_count(&self) -> usize {
        self.fcurves.iter().map(|c| c.keyframes.len()).sum()
    }
}

fn default_strip_scale() -> f32 {
    1.0
}

/// The strip whose action is being edited in place inside a nested timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TweakStrip {
    /// Scene frame where the strip starts.
    pub frame_start: f32,
    /// Action frame mapped to the strip start.
    pub action_frame_start: f32,
    /// Playback scale of the strip.
    #[serde(default = "default_strip_scale")]
    pub scale: f32,
}

impl TweakStrip {
    /// Converts action time to scene time.
    pub fn to_scene(&self, frame: f32) -> f32 {
        self.frame_start + (frame - self.action_frame_start) * self.scale
    }

    /// Converts scene time to action time.
    pub fn to_action(&self, frame: f32) -> f32 {
        let scale = if self.scale.abs() > f32::EPSILON {
            self.scale
        } else {
            1.0
        };
        self.action_frame_start + (frame - self.frame_start) / scale
    }
}

/// Animation attached to a rig.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnimData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    /// Active tweak strip; `None` means the action plays in scene time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tweak: Option<TweakStrip>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub drivers: Vec<FCurve>,
}

impl AnimData {
    /// Animation data playing `action` directly.
    pub fn with_action(action: Action) -> Self {
        Self {
            action: Some(action),
            tweak: None,
            drivers: Vec::new(),
        }
    }

    /// Converts an action-time frame to scene time.
    pub fn to_scene(&self, frame: f32) -> f32 {
        self.tweak.map_or(frame, |strip| strip.to_scene(frame))
    }

    /// Converts a scene-time frame to action time.
    pub fn to_action(&self, frame: f32) -> f32 {
        self.tweak.map_or(frame, |strip| strip.to_action(frame))
    }

    /// Converts a scene-time range to action time.
    pub fn range_to_action(&self, range: Option<(i32, i32)>) -> Option<FrameRange> {
        range.map(|(start, end)| (self.to_action(start as f32), self.to_action(end as f32)))
    }
}
