//! Session settings shared by all operators.
//!
//! These replace process-wide toggles: callers build a [`SessionConfig`] once
//! per editing session and pass it explicitly to every invocation.

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

// =============================================================================
// Bake Settings
// =============================================================================

/// Settings that control which frames a bake revisits.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BakeSettings {
    /// Bake every frame that has a key on any curve, not just the relevant ones.
    #[serde(default)]
    pub use_all_keys: bool,
    /// Only bake keys inside `start_frame..=end_frame`.
    #[serde(default)]
    pub use_frame_range: bool,
    /// First frame to bake when the range is enabled.
    #[serde(default)]
    pub start_frame: i32,
    /// Last frame to bake when the range is enabled.
    #[serde(default)]
    pub end_frame: i32,
}

impl BakeSettings {
    /// Creates bake settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables and sets the frame range.
    pub fn with_frame_range(mut self, start: i32, end: i32) -> Self {
        self.use_frame_range = true;
        self.start_frame = start;
        self.end_frame = end;
        self
    }

    /// Enables baking on every keyed frame.
    pub fn with_all_keys(mut self, use_all_keys: bool) -> Self {
        self.use_all_keys = use_all_keys;
        self
    }

    /// Returns the explicit frame range, if enabled.
    pub fn frame_range(&self) -> Option<(i32, i32)> {
        self.use_frame_range
            .then_some((self.start_frame, self.end_frame))
    }

    /// Validates the settings.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.use_frame_range && self.start_frame > self.end_frame {
            return Err(ParamsError::InvalidFrameRange {
                start: self.start_frame,
                end: self.end_frame,
            });
        }
        Ok(())
    }
}

// =============================================================================
// Keying Preferences
// =============================================================================

/// What auto-keying does with existing keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoKeyMode {
    /// Add and replace keys.
    #[default]
    AddReplace,
    /// Only replace existing keys.
    ReplaceKeys,
}

/// User keyframing preferences.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyingPreferences {
    /// Only insert keys when the value changed.
    #[serde(default)]
    pub insert_needed: bool,
    /// Color XYZ curves as RGB.
    #[serde(default)]
    pub xyz_to_rgb: bool,
    /// Keep cyclic animation seamless when keying.
    #[serde(default)]
    pub cycle_aware: bool,
    /// Auto-keying is enabled.
    #[serde(default)]
    pub auto_key: bool,
    /// Auto-keying only keys the active keying set.
    #[serde(default)]
    pub auto_key_keyingset: bool,
    /// Auto-keying only keys channels that already have curves.
    #[serde(default)]
    pub auto_key_available: bool,
    /// Auto-keying mode.
    #[serde(default)]
    pub auto_key_mode: AutoKeyMode,
}

impl KeyingPreferences {
    /// Creates preferences with auto-keying on.
    pub fn auto_keying() -> Self {
        Self {
            auto_key: true,
            ..Self::default()
        }
    }

    /// Sets the "only insert needed" flag.
    pub fn with_insert_needed(mut self, insert_needed: bool) -> Self {
        self.insert_needed = insert_needed;
        self
    }

    /// Sets the auto-key mode.
    pub fn with_auto_key_mode(mut self, mode: AutoKeyMode) -> Self {
        self.auto_key_mode = mode;
        self
    }
}

// =============================================================================
// Session Config
// =============================================================================

/// Everything an operator reads besides its own parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// Bake frame selection.
    #[serde(default)]
    pub bake: BakeSettings,
    /// Keyframing preferences.
    #[serde(default)]
    pub keying: KeyingPreferences,
}

impl SessionConfig {
    /// Creates a default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bake settings.
    pub fn with_bake(mut self, bake: BakeSettings) -> Self {
        self.bake = bake;
        self
    }

    /// Sets the keying preferences.
    pub fn with_keying(mut self, keying: KeyingPreferences) -> Self {
        self.keying = keying;
        self
    }

    /// Parses a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ParamsError> {
        serde_json::from_str(json).map_err(|e| ParamsError::Parse(e.to_string()))
    }
}
