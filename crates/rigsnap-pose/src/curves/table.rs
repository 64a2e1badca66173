//! Curve lookup by data path and array index.

use std::collections::{BTreeMap, BTreeSet};

use super::{bone_custom_prop_path, bone_prop_path, AnimData, FCurve};
use crate::rig::TransformProp;

/// Index of curves by `(data_path, array_index)`.
///
/// Values are positions into the indexed curve list (the action's curves, or
/// the driver list for [`CurveTable::for_drivers`]). Positions stay valid
/// while curves are only appended; rebuild the table after stripping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurveTable {
    index: BTreeMap<String, BTreeMap<usize, usize>>,
}

impl CurveTable {
    /// Indexes a list of curves.
    pub fn new(curves: &[FCurve]) -> Self {
        let mut table = Self::default();
        for (pos, curve) in curves.iter().enumerate() {
            table.insert(curve, pos);
        }
        table
    }

    /// Indexes the curves of the active action.
    pub fn for_action(anim: &AnimData) -> Self {
        anim.action
            .as_ref()
            .map(|action| Self::new(&action.fcurves))
            .unwrap_or_default()
    }

    /// Indexes driver curves.
    pub fn for_drivers(anim: &AnimData) -> Self {
        Self::new(&anim.drivers)
    }

    fn insert(&mut self, curve: &FCurve, pos: usize) {
        self.index
            .entry(curve.data_path.clone())
            .or_default()
            .insert(curve.index(), pos);
    }

    /// Number of indexed curves.
    pub fn len(&self) -> usize {
        self.index.values().map(BTreeMap::len).sum()
    }

    /// Returns true if no curves are indexed.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Position of the curve for `data_path` and `index`.
    pub fn get(&self, data_path: &str, index: usize) -> Option<usize> {
        self.index.get(data_path)?.get(&index).copied()
    }

    /// Array index to position map for a data path.
    pub fn prop_curves(&self, data_path: &str) -> Option<&BTreeMap<usize, usize>> {
        self.index.get(data_path)
    }

    /// Positions of every curve animating `props` of `bones`.
    pub fn bone_curves<'a>(
        &self,
        bones: impl IntoIterator<Item = &'a str>,
        props: &[TransformProp],
    ) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        for bone in bones {
            for &prop in props {
                if let Some(curves) = self.prop_curves(&bone_prop_path(bone, prop)) {
                    out.extend(curves.values().copied());
                }
            }
        }
        out
    }

    /// Positions of the curves animating a custom property.
    pub fn custom_prop_curves(&self, bone: &str, prop: &str) -> Option<&BTreeMap<usize, usize>> {
        self.prop_curves(&bone_custom_prop_path(bone, prop))
    }

    /// Positions of every indexed curve.
    pub fn all_curves(&self) -> BTreeSet<usize> {
        self.index
            .values()
            .flat_map(|m| m.values().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curves::Action;
    use pretty_assertions::assert_eq;

    fn action() -> Action {
        Action::new("walk")
            .with_curve(FCurve::new(bone_prop_path("hand_ik", TransformProp::Location), 0))
            .with_curve(FCurve::new(bone_prop_path("hand_ik", TransformProp::Location), 2))
            .with_curve(FCurve::new(bone_prop_path("hand_ik", TransformProp::Scale), 1))
            .with_curve(FCurve::new(bone_prop_path("forearm_fk", TransformProp::Location), 0))
            .with_curve(FCurve::new(bone_custom_prop_path("hand_ik", "parent"), -1))
    }

    #[test]
    fn test_lookup_by_path_and_index() {
        let table = CurveTable::for_action(&AnimData::with_action(action()));
        assert_eq!(table.len(), 5);
        let loc = bone_prop_path("hand_ik", TransformProp::Location);
        assert_eq!(table.get(&loc, 2), Some(1));
        assert_eq!(table.get(&loc, 1), None);
        assert_eq!(table.custom_prop_curves("hand_ik", "parent").and_then(|m| m.get(&0)), Some(&4));
    }

    #[test]
    fn test_bone_curves_filters_props() {
        let table = CurveTable::new(&action().fcurves);
        let curves = table.bone_curves(["hand_ik"], &TransformProp::LOCATION);
        assert_eq!(curves.into_iter().collect::<Vec<_>>(), vec![0, 1]);
        let curves = table.bone_curves(["hand_ik", "forearm_fk"], &TransformProp::ALL);
        assert_eq!(curves.len(), 4);
    }

    #[test]
    fn test_driver_table_is_separate() {
        let anim = AnimData {
            drivers: vec![FCurve::new(bone_custom_prop_path("torso", "ik_fk"), 0)],
            ..AnimData::with_action(action())
        };
        let drivers = CurveTable::for_drivers(&anim);
        assert_eq!(drivers.all_curves().len(), 1);
        assert!(drivers.custom_prop_curves("torso", "ik_fk").is_some());
        assert!(CurveTable::for_action(&AnimData::default()).is_empty());
    }
}
