//! Typed custom properties.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A custom property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    StringList(Vec<String>),
}

impl PropValue {
    /// Numeric view of the value, used for animation curves.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PropValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            PropValue::Int(i) => Some(*i as f32),
            PropValue::Float(f) => Some(*f as f32),
            PropValue::String(_) | PropValue::StringList(_) => None,
        }
    }

    /// Truthiness: non-zero numbers, `true`, and non-empty strings or lists.
    pub fn is_truthy(&self) -> bool {
        match self {
            PropValue::Bool(b) => *b,
            PropValue::Int(i) => *i != 0,
            PropValue::Float(f) => *f != 0.0,
            PropValue::String(s) => !s.is_empty(),
            PropValue::StringList(l) => !l.is_empty(),
        }
    }

    /// Non-negative integer view of the value.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PropValue::Int(i) if *i >= 0 => Some(*i as usize),
            PropValue::Float(f) if *f >= 0.0 && f.fract() == 0.0 => Some(*f as usize),
            PropValue::Bool(b) => Some(usize::from(*b)),
            _ => None,
        }
    }

    /// String list view of the value.
    pub fn as_string_list(&self) -> Option<&[String]> {
        match self {
            PropValue::StringList(list) => Some(list),
            _ => None,
        }
    }

    /// Returns a value of the same type as `self` holding `value`.
    ///
    /// Used when an animation curve writes a float back into a typed property.
    pub fn with_numeric(&self, value: f32) -> PropValue {
        match self {
            PropValue::Bool(_) => PropValue::Bool(value >= 0.5),
            PropValue::Int(_) => PropValue::Int(value.round() as i64),
            _ => PropValue::Float(f64::from(value)),
        }
    }
}

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        PropValue::Float(f64::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

/// Custom properties keyed by name, with per-key hidden metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyBag {
    #[serde(default)]
    values: BTreeMap<String, PropValue>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    hidden: BTreeSet<String>,
}

impl PropertyBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a property value.
    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.values.get(key)
    }

    /// Returns true if the property exists.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Sets a property value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        self.values.insert(key.into(), value.into());
    }

    /// Marks a property as hidden from display.
    pub fn set_hidden(&mut self, key: impl Into<String>, hidden: bool) {
        let key = key.into();
        if hidden {
            self.hidden.insert(key);
        } else {
            self.hidden.remove(&key);
        }
    }

    /// Returns true if the property is hidden from display.
    pub fn is_hidden(&self, key: &str) -> bool {
        self.hidden.contains(key)
    }

    /// Iterates over visible properties.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.values
            .iter()
            .filter(|(k, _)| !self.hidden.contains(*k))
            .map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates over all property names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_untagged_values_parse_by_shape() {
        let bag: PropertyBag = serde_json::from_str(
            r#"{"values": {"pole_vector": 1, "fk_ik": 0.5, "ik_stretch": true,
                "wheels": ["wheel_f", "wheel_r"]}, "hidden": ["wheels"]}"#,
        )
        .unwrap();
        assert_eq!(bag.get("pole_vector"), Some(&PropValue::Int(1)));
        assert_eq!(bag.get("fk_ik"), Some(&PropValue::Float(0.5)));
        assert_eq!(bag.get("ik_stretch"), Some(&PropValue::Bool(true)));
        assert_eq!(
            bag.get("wheels").and_then(PropValue::as_string_list).map(<[String]>::len),
            Some(2)
        );
        assert!(bag.is_hidden("wheels"));
        assert_eq!(bag.visible().count(), 3);
    }

    #[test]
    fn test_numeric_write_back_keeps_type() {
        assert_eq!(PropValue::Int(0).with_numeric(2.2), PropValue::Int(2));
        assert_eq!(PropValue::Bool(false).with_numeric(0.9), PropValue::Bool(true));
        assert_eq!(PropValue::Float(0.0).with_numeric(0.25), PropValue::Float(0.25));
    }

    #[test]
    fn test_truthiness_and_index() {
        assert!(!PropValue::Float(0.0).is_truthy());
        assert!(PropValue::Int(2).is_truthy());
        assert_eq!(PropValue::Float(2.0).as_index(), Some(2));
        assert_eq!(PropValue::Float(1.5).as_index(), None);
        assert_eq!(PropValue::Int(-1).as_index(), None);
    }
}
