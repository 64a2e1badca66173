//! In-memory reference host.
//!
//! [`Armature`] is a serializable rig document: bones with rest matrices and
//! pose channels, a handful of constraint kinds, animation curves and a scene
//! clock. It implements [`RigHost`] so that every operator can run without
//! the real application, which is how the tests and the CLI drive the engine.

mod eval;
mod ik;

use std::collections::{BTreeMap, HashMap};

use glam::Mat4;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curves::{Action, AnimData, DataPath};
use crate::error::{PoseError, PoseResult};
use crate::host::RigHost;
use crate::rig::{PoseBone, PropValue, PropertyBag, Space};
use crate::transform::invert;
use eval::{evaluation_order, Evaluated, Evaluator};

fn default_matrix_world() -> Mat4 {
    Mat4::IDENTITY
}

fn default_frame() -> i32 {
    1
}

fn default_frame_end() -> i32 {
    250
}

/// Scene timeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scene {
    #[serde(default = "default_frame")]
    pub frame_current: i32,
    #[serde(default = "default_frame")]
    pub frame_start: i32,
    #[serde(default = "default_frame_end")]
    pub frame_end: i32,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            frame_current: default_frame(),
            frame_start: default_frame(),
            frame_end: default_frame_end(),
        }
    }
}

/// An armature object with its pose, animation and scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Armature {
    pub name: String,
    #[serde(default = "default_matrix_world")]
    pub matrix_world: Mat4,
    #[serde(default)]
    pub bones: Vec<PoseBone>,
    /// Custom properties of the armature data.
    #[serde(default)]
    pub data_props: PropertyBag,
    /// World matrices of other scene objects, by name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub objects: BTreeMap<String, Mat4>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animation_data: Option<AnimData>,
    #[serde(default)]
    pub scene: Scene,

    #[serde(skip)]
    index: HashMap<String, usize>,
    #[serde(skip)]
    order: Vec<usize>,
    #[serde(skip)]
    evaluated: Vec<Evaluated>,
}

impl Armature {
    /// Creates an empty armature.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matrix_world: Mat4::IDENTITY,
            bones: Vec::new(),
            data_props: PropertyBag::default(),
            objects: BTreeMap::new(),
            animation_data: None,
            scene: Scene::default(),
            index: HashMap::new(),
            order: Vec::new(),
            evaluated: Vec::new(),
        }
    }

    /// Adds a bone.
    pub fn with_bone(mut self, bone: PoseBone) -> Self {
        self.bones.push(bone);
        self
    }

    /// Sets an armature data property.
    pub fn with_data_prop(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.data_props.set(key, value);
        self
    }

    /// Adds a scene object.
    pub fn with_object(mut self, name: impl Into<String>, matrix_world: Mat4) -> Self {
        self.objects.insert(name.into(), matrix_world);
        self
    }

    /// Sets the active action.
    pub fn with_action(mut self, action: Action) -> Self {
        self.anim_data_mut().action = Some(action);
        self
    }

    /// Sets the scene frame range and moves to its start.
    pub fn with_frame_range(mut self, start: i32, end: i32) -> Self {
        self.scene.frame_start = start;
        self.scene.frame_end = end;
        self.scene.frame_current = start;
        self
    }

    /// Finishes construction by indexing and evaluating the rig.
    pub fn built(mut self) -> Self {
        self.rebuild();
        self
    }

    /// Re-indexes bones, recomputes the evaluation order and evaluates.
    pub fn rebuild(&mut self) {
        self.index = self
            .bones
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name.clone(), i))
            .collect();
        self.order = evaluation_order(&self.bones, &self.index);
        self.evaluate();
    }

    fn evaluate(&mut self) {
        let evaluator = Evaluator {
            bones: &self.bones,
            index: &self.index,
            objects: &self.objects,
            matrix_world: self.matrix_world,
        };
        self.evaluated = evaluator.evaluate(&self.order);
    }

    /// Parses a rig document and evaluates it at its current frame.
    pub fn from_json(json: &str) -> PoseResult<Self> {
        let mut armature: Armature =
            serde_json::from_str(json).map_err(|e| PoseError::Parse(e.to_string()))?;
        if let Some(anim) = armature.animation_data.as_mut() {
            let action_curves = anim.action.iter_mut().flat_map(|a| a.fcurves.iter_mut());
            for curve in action_curves.chain(anim.drivers.iter_mut()) {
                curve.update();
            }
        }
        let frame = armature.scene.frame_current;
        armature.rebuild();
        armature.frame_set(frame);
        Ok(armature)
    }

    /// Serializes the rig document.
    pub fn to_json_pretty(&self) -> PoseResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PoseError::Parse(e.to_string()))
    }

    /// Names of all bones, in document order.
    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.iter().map(|b| b.name.as_str())
    }

    fn evaluated_of(&self, bone: &str) -> PoseResult<Evaluated> {
        self.index
            .get(bone)
            .and_then(|&i| self.evaluated.get(i))
            .copied()
            .ok_or_else(|| PoseError::bone_not_found(bone))
    }

    /// Writes animated values at the current frame into channels and properties.
    fn apply_animation(&mut self) {
        let Some(anim) = self.animation_data.as_ref() else {
            return;
        };
        let Some(action) = anim.action.as_ref() else {
            return;
        };
        let frame = anim.to_action(self.scene.frame_current as f32);

        let mut writes = Vec::new();
        for curve in &action.fcurves {
            if let Some(value) = curve.evaluate(frame) {
                writes.push((DataPath::parse(&curve.data_path), curve.index(), value));
            }
        }

        for (path, index, value) in writes {
            match path {
                DataPath::Transform { bone, prop } => {
                    if let Some(&i) = self.index.get(&bone) {
                        self.bones[i].channels.set_value(prop, index, value);
                    }
                }
                DataPath::Custom { bone, prop } => {
                    if let Some(&i) = self.index.get(&bone) {
                        let props = &mut self.bones[i].props;
                        let typed = props
                            .get(&prop)
                            .map_or(PropValue::Float(f64::from(value)), |v| v.with_numeric(value));
                        props.set(prop, typed);
                    }
                }
                DataPath::Other(_) => {}
            }
        }
    }
}

impl RigHost for Armature {
    fn bone(&self, name: &str) -> Option<&PoseBone> {
        self.index.get(name).map(|&i| &self.bones[i])
    }

    fn bone_mut(&mut self, name: &str) -> Option<&mut PoseBone> {
        let i = *self.index.get(name)?;
        self.bones.get_mut(i)
    }

    fn pose_matrix(&self, name: &str) -> Option<Mat4> {
        self.evaluated_of(name).ok().map(|e| e.pose)
    }

    fn convert_space(&self, bone: &str, matrix: Mat4, from: Space, to: Space) -> PoseResult<Mat4> {
        if from == to {
            return Ok(matrix);
        }
        let frame = self.evaluated_of(bone)?.parent_frame;
        let pose = match from {
            Space::World => invert(self.matrix_world, &self.name)? * matrix,
            Space::Pose => matrix,
            Space::Local => frame * matrix,
            Space::Custom(custom) => custom * matrix,
        };
        Ok(match to {
            Space::World => self.matrix_world * pose,
            Space::Pose => pose,
            Space::Local => invert(frame, bone)? * pose,
            Space::Custom(custom) => invert(custom, bone)? * pose,
        })
    }

    fn matrix_world(&self) -> Mat4 {
        self.matrix_world
    }

    fn object_matrix(&self, name: &str) -> Option<Mat4> {
        self.objects.get(name).copied()
    }

    fn update(&mut self) {
        self.rebuild();
    }

    fn frame_current(&self) -> i32 {
        self.scene.frame_current
    }

    fn frame_set(&mut self, frame: i32) {
        debug!(frame, "frame_set");
        self.scene.frame_current = frame;
        self.apply_animation();
        self.update();
    }

    fn scene_frame_range(&self) -> (i32, i32) {
        (self.scene.frame_start, self.scene.frame_end)
    }

    fn anim_data(&self) -> Option<&AnimData> {
        self.animation_data.as_ref()
    }

    fn anim_data_mut(&mut self) -> &mut AnimData {
        self.animation_data.get_or_insert_with(AnimData::default)
    }

    fn data_property(&self, name: &str) -> Option<&PropValue> {
        self.data_props.get(name)
    }
}
