//! Key event envelope: one representation for hardware keys, soft keys and
//! keys synthesized by the engine adapter.

use serde::{Deserialize, Serialize};

use crate::spec::{CompositionMode, KeyboardSpecification};

// Android KeyEvent key codes
pub mod keycode {
    pub const UNKNOWN: i32 = 0;
    pub const BACK: i32 = 4;
    pub const DPAD_LEFT: i32 = 21;
    pub const DPAD_RIGHT: i32 = 22;
    pub const ALT_LEFT: i32 = 57;
    pub const ALT_RIGHT: i32 = 58;
    pub const SHIFT_LEFT: i32 = 59;
    pub const SHIFT_RIGHT: i32 = 60;
    pub const SPACE: i32 = 62;
    pub const SYM: i32 = 63;
    pub const ENTER: i32 = 66;
    pub const DEL: i32 = 67;
    pub const NUM: i32 = 78;
    pub const CTRL_LEFT: i32 = 113;
    pub const CTRL_RIGHT: i32 = 114;
    pub const META_LEFT: i32 = 117;
    pub const META_RIGHT: i32 = 118;
    pub const FUNCTION: i32 = 119;
}

// RawKeyEvent flag bits
pub const FLAG_SOFT_KEYBOARD: u32 = 0x2;
pub const FLAG_KEEP_TOUCH_MODE: u32 = 0x4;

pub const VIRTUAL_KEYBOARD_DEVICE: i32 = -1;

// EngineKey modifier bits
pub const MODIFIER_SHIFT: u8 = 1;
pub const MODIFIER_CTRL: u8 = 2;
pub const MODIFIER_ALT: u8 = 4;

pub fn is_modifier_key_code(key_code: i32) -> bool {
    matches!(
        key_code,
        keycode::SHIFT_LEFT
            | keycode::SHIFT_RIGHT
            | keycode::ALT_LEFT
            | keycode::ALT_RIGHT
            | keycode::CTRL_LEFT
            | keycode::CTRL_RIGHT
            | keycode::META_LEFT
            | keycode::META_RIGHT
            | keycode::SYM
            | keycode::NUM
            | keycode::FUNCTION
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyAction {
    Down,
    Up,
}

/// Platform key event, replayed to the application when a key bypasses the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawKeyEvent {
    pub key_code: i32,
    pub action: KeyAction,
    #[serde(default)]
    pub repeat_count: u32,
    #[serde(default)]
    pub meta_state: u32,
    #[serde(default)]
    pub device_id: i32,
    #[serde(default)]
    pub scan_code: i32,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub down_time_ms: u64,
    #[serde(default)]
    pub event_time_ms: u64,
}

impl RawKeyEvent {
    pub fn new(key_code: i32, action: KeyAction) -> Self {
        Self {
            key_code,
            action,
            repeat_count: 0,
            meta_state: 0,
            device_id: 0,
            scan_code: 0,
            flags: 0,
            down_time_ms: 0,
            event_time_ms: 0,
        }
    }

    pub fn is_meta_key(&self) -> bool {
        is_modifier_key_code(self.key_code)
    }

    /// Copy of this event re-stamped for injection into the application.
    pub fn replayed(&self, action: KeyAction, event_time_ms: u64, repeat_count: u32) -> Self {
        Self {
            action,
            event_time_ms,
            repeat_count,
            ..*self
        }
    }

    /// Soft-keyboard event synthesized for a key that has no platform event.
    pub fn soft_key(key_code: i32, action: KeyAction, time_ms: u64) -> Self {
        Self {
            device_id: VIRTUAL_KEYBOARD_DEVICE,
            flags: FLAG_SOFT_KEYBOARD | FLAG_KEEP_TOUCH_MODE,
            down_time_ms: time_ms,
            event_time_ms: time_ms,
            ..Self::new(key_code, action)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialKey {
    Enter,
    Backspace,
    Delete,
    Escape,
    Space,
    Tab,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

/// Key encoded for the conversion engine. The router only ever touches its mode.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EngineKey {
    #[serde(default)]
    pub key_code: Option<u32>,
    #[serde(default)]
    pub special: Option<SpecialKey>,
    #[serde(default)]
    pub modifiers: u8,
    #[serde(default)]
    pub mode: Option<CompositionMode>,
}

impl EngineKey {
    pub fn char(c: char) -> Self {
        Self {
            key_code: Some(c as u32),
            ..Self::default()
        }
    }

    pub fn special(key: SpecialKey) -> Self {
        Self {
            special: Some(key),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: CompositionMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchAction {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchSample {
    pub source_id: i32,
    pub action: TouchAction,
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: u64,
}

/// A key press from any origin.
///
/// At least one of `key_code` / `engine_key` is meaningful, except for a pure
/// specification change where both are absent and `spec` is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyEnvelope {
    #[serde(default)]
    pub key_code: i32,
    #[serde(default)]
    pub raw: Option<RawKeyEvent>,
    #[serde(default)]
    pub engine_key: Option<EngineKey>,
    #[serde(default)]
    pub spec: Option<KeyboardSpecification>,
    #[serde(default)]
    pub touch_trace: Vec<TouchSample>,
}

impl KeyEnvelope {
    pub fn soft(key_code: i32, engine_key: Option<EngineKey>) -> Self {
        Self {
            key_code,
            engine_key,
            ..Self::default()
        }
    }

    pub fn hardware(raw: RawKeyEvent, engine_key: Option<EngineKey>) -> Self {
        Self {
            key_code: raw.key_code,
            raw: Some(raw),
            engine_key,
            ..Self::default()
        }
    }

    pub fn spec_change(spec: KeyboardSpecification) -> Self {
        Self {
            spec: Some(spec),
            ..Self::default()
        }
    }

    pub fn with_spec(mut self, spec: KeyboardSpecification) -> Self {
        self.spec = Some(spec);
        self
    }

    pub fn with_touch_trace(mut self, trace: Vec<TouchSample>) -> Self {
        self.touch_trace = trace;
        self
    }

    /// True when the envelope carries something the router can act on.
    pub fn is_well_formed(&self) -> bool {
        self.engine_key.is_some()
            || self.key_code != keycode::UNKNOWN
            || self.raw.is_some()
            || self.spec.is_some()
    }

    pub fn trigger(&self) -> KeyTrigger {
        KeyTrigger {
            key_code: self.key_code,
            raw: self.raw,
        }
    }
}

/// The part of an envelope that outlives dispatch: what to replay to the
/// application if the engine does not take the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyTrigger {
    pub key_code: i32,
    pub raw: Option<RawKeyEvent>,
}

impl KeyTrigger {
    pub fn is_meta_key(&self) -> bool {
        self.raw.is_some_and(|r| r.is_meta_key())
    }
}
