//! Client-side preferences and their propagation as a declarative diff.
//!
//! Each field of [`ClientPreferences`] has one row in [`FIELDS`]: how to tell
//! whether it changed and which [`PreferenceChange`] to emit when it did. The
//! first propagation has no previous record and emits every row.

use serde::{Deserialize, Serialize};

use crate::compat::AppCompat;

/// Divisor mapping the stored volume (0..=100, default 50) to the player's
/// gain (default 0.4).
pub const SOUND_VOLUME_DIVISOR: f32 = 125.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientPreferences {
    pub haptic_feedback_enabled: bool,
    pub haptic_feedback_duration_ms: u32,
    pub sound_feedback_enabled: bool,
    pub sound_feedback_volume: u32,
    pub popup_feedback_enabled: bool,
    pub keyboard_layout: String,
    pub input_style: String,
    pub qwerty_layout_for_alphabet: bool,
    pub fullscreen_mode: bool,
    pub flick_sensitivity: i32,
    pub emoji_provider: String,
    pub hardware_key_map: String,
    pub skin: String,
    pub microphone_button_enabled: bool,
    pub layout_adjustment: String,
    pub keyboard_height_ratio: u32,
}

impl Default for ClientPreferences {
    fn default() -> Self {
        Self {
            haptic_feedback_enabled: false,
            haptic_feedback_duration_ms: 30,
            sound_feedback_enabled: false,
            sound_feedback_volume: 50,
            popup_feedback_enabled: true,
            keyboard_layout: "twelve_keys".into(),
            input_style: "toggle_flick".into(),
            qwerty_layout_for_alphabet: false,
            fullscreen_mode: false,
            flick_sensitivity: 0,
            emoji_provider: "none".into(),
            hardware_key_map: "default".into(),
            skin: "orange_lightgray".into(),
            microphone_button_enabled: true,
            layout_adjustment: "fill".into(),
            keyboard_height_ratio: 100,
        }
    }
}

/// One setter call on the feedback player or the keyboard view.
#[derive(Debug, Clone, PartialEq)]
pub enum PreferenceChange {
    HapticFeedbackEnabled(bool),
    HapticFeedbackDuration(u32),
    SoundFeedbackEnabled(bool),
    SoundFeedbackVolume(f32),
    PopupEnabled(bool),
    KeyboardLayout(String),
    InputStyle(String),
    QwertyLayoutForAlphabet(bool),
    FullscreenMode(bool),
    FlickSensitivity(i32),
    EmojiProvider(String),
    HardwareKeyMap(String),
    Skin(String),
    MicrophoneButtonEnabled(bool),
    LayoutAdjustment(String),
    KeyboardHeightRatio(u32),
}

pub struct PreferenceField {
    pub name: &'static str,
    changed: fn(&ClientPreferences, &ClientPreferences) -> bool,
    change: fn(&ClientPreferences, &AppCompat) -> PreferenceChange,
}

macro_rules! field {
    ($name:ident, |$p:ident, $c:ident| $make:expr) => {
        PreferenceField {
            name: stringify!($name),
            changed: |old, new| old.$name != new.$name,
            change: |$p, $c| $make,
        }
    };
}

pub static FIELDS: &[PreferenceField] = &[
    field!(haptic_feedback_enabled, |p, _c| {
        PreferenceChange::HapticFeedbackEnabled(p.haptic_feedback_enabled)
    }),
    field!(haptic_feedback_duration_ms, |p, _c| {
        PreferenceChange::HapticFeedbackDuration(p.haptic_feedback_duration_ms)
    }),
    field!(sound_feedback_enabled, |p, _c| {
        PreferenceChange::SoundFeedbackEnabled(p.sound_feedback_enabled)
    }),
    field!(sound_feedback_volume, |p, _c| {
        PreferenceChange::SoundFeedbackVolume(p.sound_feedback_volume as f32 / SOUND_VOLUME_DIVISOR)
    }),
    field!(popup_feedback_enabled, |p, _c| {
        PreferenceChange::PopupEnabled(p.popup_feedback_enabled)
    }),
    field!(keyboard_layout, |p, _c| {
        PreferenceChange::KeyboardLayout(p.keyboard_layout.clone())
    }),
    field!(input_style, |p, _c| {
        PreferenceChange::InputStyle(p.input_style.clone())
    }),
    field!(qwerty_layout_for_alphabet, |p, _c| {
        PreferenceChange::QwertyLayoutForAlphabet(p.qwerty_layout_for_alphabet)
    }),
    field!(fullscreen_mode, |p, c| {
        PreferenceChange::FullscreenMode(c.fullscreen_supported && p.fullscreen_mode)
    }),
    field!(flick_sensitivity, |p, _c| {
        PreferenceChange::FlickSensitivity(p.flick_sensitivity)
    }),
    field!(emoji_provider, |p, _c| {
        PreferenceChange::EmojiProvider(p.emoji_provider.clone())
    }),
    field!(hardware_key_map, |p, _c| {
        PreferenceChange::HardwareKeyMap(p.hardware_key_map.clone())
    }),
    field!(skin, |p, _c| PreferenceChange::Skin(p.skin.clone())),
    field!(microphone_button_enabled, |p, _c| {
        PreferenceChange::MicrophoneButtonEnabled(p.microphone_button_enabled)
    }),
    field!(layout_adjustment, |p, _c| {
        PreferenceChange::LayoutAdjustment(p.layout_adjustment.clone())
    }),
    field!(keyboard_height_ratio, |p, _c| {
        PreferenceChange::KeyboardHeightRatio(p.keyboard_height_ratio)
    }),
];

/// Changes needed to move collaborators from `old` to `new`, in table order.
pub fn diff(
    old: Option<&ClientPreferences>,
    new: &ClientPreferences,
    compat: &AppCompat,
) -> Vec<PreferenceChange> {
    FIELDS
        .iter()
        .filter(|f| old.map_or(true, |old| (f.changed)(old, new)))
        .map(|f| (f.change)(new, compat))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_propagation_emits_everything() {
        let prefs = ClientPreferences::default();
        let changes = diff(None, &prefs, &AppCompat::default());
        assert_eq!(changes.len(), FIELDS.len());
    }

    #[test]
    fn test_unchanged_emits_nothing() {
        let prefs = ClientPreferences::default();
        assert!(diff(Some(&prefs), &prefs, &AppCompat::default()).is_empty());
    }

    #[test]
    fn test_volume_scaled() {
        let old = ClientPreferences::default();
        let new = ClientPreferences {
            sound_feedback_volume: 100,
            ..old.clone()
        };
        let changes = diff(Some(&old), &new, &AppCompat::default());
        assert_eq!(changes, vec![PreferenceChange::SoundFeedbackVolume(0.8)]);
    }

    #[test]
    fn test_fullscreen_gated_by_compat() {
        let old = ClientPreferences::default();
        let new = ClientPreferences {
            fullscreen_mode: true,
            ..old.clone()
        };
        let unsupported = AppCompat {
            fullscreen_supported: false,
            ..AppCompat::default()
        };
        assert_eq!(
            diff(Some(&old), &new, &unsupported),
            vec![PreferenceChange::FullscreenMode(false)]
        );
        assert_eq!(
            diff(Some(&old), &new, &AppCompat::default()),
            vec![PreferenceChange::FullscreenMode(true)]
        );
    }

    #[test]
    fn test_field_names_unique() {
        let mut names: Vec<_> = FIELDS.iter().map(|f| f.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), FIELDS.len());
    }
}
