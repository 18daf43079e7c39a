use kb_core::engine::{
    Candidate, CandidateCategory, CandidateList, CommitResult, DeletionRange, DeviceConfig,
    EngineResponse, Orientation, Preedit, PreeditSegment, RequestUpdate, SegmentAnnotation,
};
use kb_core::field::{FieldInfo, InputFieldType};
use kb_core::key::{
    EngineKey, KeyAction, KeyEnvelope, RawKeyEvent, SpecialKey, TouchAction, TouchSample,
};
use kb_core::preferences::{ClientPreferences, PreferenceChange};
use kb_core::spec::{CompositionMode, KeyboardSpecification};
use kb_session::{
    CandidateUpdate, CommandResult, CursorPlacement, HostAction, HostSelection, SpanStyle,
    SurfaceEdit, ViewUpdate,
};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum KbError {
    #[error("IO error: {msg}")]
    Io { msg: String },
    #[error("invalid data: {msg}")]
    InvalidData { msg: String },
    #[error("engine unavailable")]
    EngineUnavailable,
    #[error("engine error: {msg}")]
    Engine { msg: String },
    #[error("internal error: {msg}")]
    Internal { msg: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for KbError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Internal { msg: e.reason }
    }
}

// ---------------------------------------------------------------------------
// Enums mirrored one-to-one from the core
// ---------------------------------------------------------------------------

macro_rules! mirror_enum {
    ($ffi:ident <=> $core:ident { $($variant:ident),* $(,)? }) => {
        impl From<$ffi> for $core {
            fn from(v: $ffi) -> Self {
                match v {
                    $($ffi::$variant => $core::$variant,)*
                }
            }
        }

        impl From<$core> for $ffi {
            fn from(v: $core) -> Self {
                match v {
                    $($core::$variant => $ffi::$variant,)*
                }
            }
        }
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbKeyboardSpecification {
    TwelveKeyToggleKana,
    TwelveKeyFlickKana,
    TwelveKeyToggleAlphabet,
    QwertyKana,
    QwertyAlphabet,
    SymbolNumber,
    HardwareQwertyKana,
    HardwareQwertyAlphabet,
}

mirror_enum!(KbKeyboardSpecification <=> KeyboardSpecification {
    TwelveKeyToggleKana,
    TwelveKeyFlickKana,
    TwelveKeyToggleAlphabet,
    QwertyKana,
    QwertyAlphabet,
    SymbolNumber,
    HardwareQwertyKana,
    HardwareQwertyAlphabet,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbCompositionMode {
    Direct,
    Hiragana,
    FullKatakana,
    HalfAscii,
    FullAscii,
    HalfKatakana,
}

mirror_enum!(KbCompositionMode <=> CompositionMode {
    Direct,
    Hiragana,
    FullKatakana,
    HalfAscii,
    FullAscii,
    HalfKatakana,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbKeyAction {
    Down,
    Up,
}

mirror_enum!(KbKeyAction <=> KeyAction { Down, Up });

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbSpecialKey {
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

mirror_enum!(KbSpecialKey <=> SpecialKey {
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
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbTouchAction {
    Down,
    Move,
    Up,
}

mirror_enum!(KbTouchAction <=> TouchAction { Down, Move, Up });

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbInputFieldType {
    Normal,
    Password,
    Tel,
    Number,
}

mirror_enum!(KbInputFieldType <=> InputFieldType {
    Normal,
    Password,
    Tel,
    Number,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbOrientation {
    Portrait,
    Landscape,
}

mirror_enum!(KbOrientation <=> Orientation { Portrait, Landscape });

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbSegmentAnnotation {
    None,
    Underline,
    Highlight,
}

mirror_enum!(KbSegmentAnnotation <=> SegmentAnnotation {
    None,
    Underline,
    Highlight,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbCandidateCategory {
    Conversion,
    Prediction,
    Suggestion,
    Transliteration,
    Usage,
}

mirror_enum!(KbCandidateCategory <=> CandidateCategory {
    Conversion,
    Prediction,
    Suggestion,
    Transliteration,
    Usage,
});

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbCursorPlacement {
    Head,
    Tail,
}

mirror_enum!(KbCursorPlacement <=> CursorPlacement { Head, Tail });

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum KbSpanStyle {
    Underline,
    ConversionHighlight,
    ConversionNormal,
    BeforeCursor,
    AfterCursor,
}

mirror_enum!(KbSpanStyle <=> SpanStyle {
    Underline,
    ConversionHighlight,
    ConversionNormal,
    BeforeCursor,
    AfterCursor,
});

// ---------------------------------------------------------------------------
// Records: host -> core
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Record)]
pub struct KbRawKeyEvent {
    pub key_code: i32,
    pub action: KbKeyAction,
    pub repeat_count: u32,
    pub meta_state: u32,
    pub device_id: i32,
    pub scan_code: i32,
    pub flags: u32,
    pub down_time_ms: u64,
    pub event_time_ms: u64,
}

impl From<KbRawKeyEvent> for RawKeyEvent {
    fn from(e: KbRawKeyEvent) -> Self {
        Self {
            key_code: e.key_code,
            action: e.action.into(),
            repeat_count: e.repeat_count,
            meta_state: e.meta_state,
            device_id: e.device_id,
            scan_code: e.scan_code,
            flags: e.flags,
            down_time_ms: e.down_time_ms,
            event_time_ms: e.event_time_ms,
        }
    }
}

impl From<RawKeyEvent> for KbRawKeyEvent {
    fn from(e: RawKeyEvent) -> Self {
        Self {
            key_code: e.key_code,
            action: e.action.into(),
            repeat_count: e.repeat_count,
            meta_state: e.meta_state,
            device_id: e.device_id,
            scan_code: e.scan_code,
            flags: e.flags,
            down_time_ms: e.down_time_ms,
            event_time_ms: e.event_time_ms,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct KbEngineKey {
    pub key_code: Option<u32>,
    pub special: Option<KbSpecialKey>,
    pub modifiers: u8,
    pub mode: Option<KbCompositionMode>,
}

impl From<KbEngineKey> for EngineKey {
    fn from(k: KbEngineKey) -> Self {
        Self {
            key_code: k.key_code,
            special: k.special.map(Into::into),
            modifiers: k.modifiers,
            mode: k.mode.map(Into::into),
        }
    }
}

impl From<EngineKey> for KbEngineKey {
    fn from(k: EngineKey) -> Self {
        Self {
            key_code: k.key_code,
            special: k.special.map(Into::into),
            modifiers: k.modifiers,
            mode: k.mode.map(Into::into),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, uniffi::Record)]
pub struct KbTouchSample {
    pub source_id: i32,
    pub action: KbTouchAction,
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: u64,
}

impl From<KbTouchSample> for TouchSample {
    fn from(t: KbTouchSample) -> Self {
        Self {
            source_id: t.source_id,
            action: t.action.into(),
            x: t.x,
            y: t.y,
            timestamp_ms: t.timestamp_ms,
        }
    }
}

impl From<TouchSample> for KbTouchSample {
    fn from(t: TouchSample) -> Self {
        Self {
            source_id: t.source_id,
            action: t.action.into(),
            x: t.x,
            y: t.y,
            timestamp_ms: t.timestamp_ms,
        }
    }
}

/// One key press. `key_code` 0 means none.
#[derive(Clone, Debug, uniffi::Record)]
pub struct KbKeyEnvelope {
    pub key_code: i32,
    pub raw: Option<KbRawKeyEvent>,
    pub engine_key: Option<KbEngineKey>,
    pub spec: Option<KbKeyboardSpecification>,
    pub touch_trace: Vec<KbTouchSample>,
}

impl From<KbKeyEnvelope> for KeyEnvelope {
    fn from(e: KbKeyEnvelope) -> Self {
        Self {
            key_code: e.key_code,
            raw: e.raw.map(Into::into),
            engine_key: e.engine_key.map(Into::into),
            spec: e.spec.map(Into::into),
            touch_trace: e.touch_trace.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct KbFieldInfo {
    pub package_name: String,
    pub input_type: u32,
    pub ime_options: u32,
    pub action_id: i32,
    pub action_label: Option<String>,
    pub selection_start: Option<u32>,
    pub selection_end: Option<u32>,
    pub field_id: i32,
}

impl From<KbFieldInfo> for FieldInfo {
    fn from(f: KbFieldInfo) -> Self {
        let initial_selection = match (f.selection_start, f.selection_end) {
            (Some(start), Some(end)) => Some((start as usize, end as usize)),
            _ => None,
        };
        Self {
            package_name: f.package_name,
            input_type: f.input_type,
            ime_options: f.ime_options,
            action_id: f.action_id,
            action_label: f.action_label,
            initial_selection,
            field_id: f.field_id,
        }
    }
}

/// Selection change as reported by the editor.
#[derive(Clone, Copy, Debug, uniffi::Record)]
pub struct KbSelectionUpdate {
    pub old_start: u32,
    pub old_end: u32,
    pub new_start: u32,
    pub new_end: u32,
    pub composition_start: Option<u32>,
    pub composition_end: Option<u32>,
}

impl From<KbSelectionUpdate> for HostSelection {
    fn from(s: KbSelectionUpdate) -> Self {
        let composition = match (s.composition_start, s.composition_end) {
            (Some(start), Some(end)) => Some((start as usize, end as usize)),
            _ => None,
        };
        Self {
            old_start: s.old_start as usize,
            old_end: s.old_end as usize,
            new_start: s.new_start as usize,
            new_end: s.new_end as usize,
            composition,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Record)]
pub struct KbDeviceConfig {
    pub orientation: KbOrientation,
    pub hardware_keyboard: bool,
}

impl From<KbDeviceConfig> for DeviceConfig {
    fn from(d: KbDeviceConfig) -> Self {
        Self {
            orientation: d.orientation.into(),
            hardware_keyboard: d.hardware_keyboard,
        }
    }
}

impl From<DeviceConfig> for KbDeviceConfig {
    fn from(d: DeviceConfig) -> Self {
        Self {
            orientation: d.orientation.into(),
            hardware_keyboard: d.hardware_keyboard,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Record)]
pub struct KbRequestUpdate {
    pub spec: KbKeyboardSpecification,
    pub device: KbDeviceConfig,
}

impl From<&RequestUpdate> for KbRequestUpdate {
    fn from(r: &RequestUpdate) -> Self {
        Self {
            spec: r.spec.into(),
            device: r.device.into(),
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct KbPreferences {
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

impl From<KbPreferences> for ClientPreferences {
    fn from(p: KbPreferences) -> Self {
        Self {
            haptic_feedback_enabled: p.haptic_feedback_enabled,
            haptic_feedback_duration_ms: p.haptic_feedback_duration_ms,
            sound_feedback_enabled: p.sound_feedback_enabled,
            sound_feedback_volume: p.sound_feedback_volume,
            popup_feedback_enabled: p.popup_feedback_enabled,
            keyboard_layout: p.keyboard_layout,
            input_style: p.input_style,
            qwerty_layout_for_alphabet: p.qwerty_layout_for_alphabet,
            fullscreen_mode: p.fullscreen_mode,
            flick_sensitivity: p.flick_sensitivity,
            emoji_provider: p.emoji_provider,
            hardware_key_map: p.hardware_key_map,
            skin: p.skin,
            microphone_button_enabled: p.microphone_button_enabled,
            layout_adjustment: p.layout_adjustment,
            keyboard_height_ratio: p.keyboard_height_ratio,
        }
    }
}

// ---------------------------------------------------------------------------
// Records: engine -> core
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, uniffi::Record)]
pub struct KbDeletionRange {
    pub offset: i32,
    pub length: i32,
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct KbCommitResult {
    pub value: String,
    pub cursor_offset: Option<i32>,
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct KbPreeditSegment {
    pub value: String,
    pub annotation: KbSegmentAnnotation,
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct KbPreedit {
    pub segments: Vec<KbPreeditSegment>,
    pub cursor: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, uniffi::Record)]
pub struct KbCandidate {
    pub id: i32,
    pub value: String,
    pub annotation: Option<String>,
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct KbCandidateList {
    pub category: KbCandidateCategory,
    pub candidates: Vec<KbCandidate>,
    pub focused_index: Option<u32>,
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct KbEngineResponse {
    pub consumed: bool,
    pub deletion_range: Option<KbDeletionRange>,
    pub result: Option<KbCommitResult>,
    pub preedit: Option<KbPreedit>,
    pub candidates: Option<KbCandidateList>,
    pub mode: Option<KbCompositionMode>,
}

impl From<KbCandidate> for Candidate {
    fn from(c: KbCandidate) -> Self {
        Self {
            id: c.id,
            value: c.value,
            annotation: c.annotation,
        }
    }
}

impl From<Candidate> for KbCandidate {
    fn from(c: Candidate) -> Self {
        Self {
            id: c.id,
            value: c.value,
            annotation: c.annotation,
        }
    }
}

impl From<KbEngineResponse> for EngineResponse {
    fn from(r: KbEngineResponse) -> Self {
        Self {
            consumed: r.consumed,
            deletion_range: r.deletion_range.map(|d| DeletionRange {
                offset: d.offset,
                length: d.length,
            }),
            result: r.result.map(|c| CommitResult {
                value: c.value,
                cursor_offset: c.cursor_offset,
            }),
            preedit: r.preedit.map(|p| Preedit {
                segments: p
                    .segments
                    .into_iter()
                    .map(|s| PreeditSegment {
                        value: s.value,
                        annotation: s.annotation.into(),
                    })
                    .collect(),
                cursor: p.cursor,
            }),
            candidates: r.candidates.map(|l| CandidateList {
                category: l.category.into(),
                candidates: l.candidates.into_iter().map(Into::into).collect(),
                focused_index: l.focused_index,
            }),
            mode: r.mode.map(Into::into),
        }
    }
}

// ---------------------------------------------------------------------------
// Commands: core -> host
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Record)]
pub struct KbStyledSpan {
    pub start: u32,
    pub end: u32,
    pub style: KbSpanStyle,
}

#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum KbPreferenceChange {
    HapticFeedbackEnabled { enabled: bool },
    HapticFeedbackDuration { duration_ms: u32 },
    SoundFeedbackEnabled { enabled: bool },
    SoundFeedbackVolume { volume: f32 },
    PopupEnabled { enabled: bool },
    KeyboardLayout { layout: String },
    InputStyle { style: String },
    QwertyLayoutForAlphabet { enabled: bool },
    FullscreenMode { enabled: bool },
    FlickSensitivity { sensitivity: i32 },
    EmojiProvider { provider: String },
    HardwareKeyMap { key_map: String },
    Skin { skin: String },
    MicrophoneButtonEnabled { enabled: bool },
    LayoutAdjustment { adjustment: String },
    KeyboardHeightRatio { ratio: u32 },
}

impl From<PreferenceChange> for KbPreferenceChange {
    fn from(c: PreferenceChange) -> Self {
        use PreferenceChange as P;
        match c {
            P::HapticFeedbackEnabled(enabled) => Self::HapticFeedbackEnabled { enabled },
            P::HapticFeedbackDuration(duration_ms) => Self::HapticFeedbackDuration { duration_ms },
            P::SoundFeedbackEnabled(enabled) => Self::SoundFeedbackEnabled { enabled },
            P::SoundFeedbackVolume(volume) => Self::SoundFeedbackVolume { volume },
            P::PopupEnabled(enabled) => Self::PopupEnabled { enabled },
            P::KeyboardLayout(layout) => Self::KeyboardLayout { layout },
            P::InputStyle(style) => Self::InputStyle { style },
            P::QwertyLayoutForAlphabet(enabled) => Self::QwertyLayoutForAlphabet { enabled },
            P::FullscreenMode(enabled) => Self::FullscreenMode { enabled },
            P::FlickSensitivity(sensitivity) => Self::FlickSensitivity { sensitivity },
            P::EmojiProvider(provider) => Self::EmojiProvider { provider },
            P::HardwareKeyMap(key_map) => Self::HardwareKeyMap { key_map },
            P::Skin(skin) => Self::Skin { skin },
            P::MicrophoneButtonEnabled(enabled) => Self::MicrophoneButtonEnabled { enabled },
            P::LayoutAdjustment(adjustment) => Self::LayoutAdjustment { adjustment },
            P::KeyboardHeightRatio(ratio) => Self::KeyboardHeightRatio { ratio },
        }
    }
}

/// One step for the host to apply, in list order. Surface edits arrive
/// between `BeginBatchEdit` and `EndBatchEdit`; offsets are code points.
#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum KbCommand {
    // Host lifecycle
    RequestHide,
    PerformEditorAction {
        action_id: i32,
    },
    SendDefaultEditorAction {
        from_enter_key: bool,
    },
    ShowStatusIcon {
        hiragana: bool,
    },
    HideStatusIcon,
    // Text surface
    BeginBatchEdit,
    DeleteSurroundingText {
        left: u32,
        right: u32,
    },
    CommitText {
        text: String,
        cursor: KbCursorPlacement,
    },
    SetComposingText {
        text: String,
        spans: Vec<KbStyledSpan>,
        cursor: KbCursorPlacement,
    },
    SetSelection {
        start: u32,
        end: u32,
    },
    FinishComposingText,
    SendKeyEvent {
        event: KbRawKeyEvent,
    },
    EndBatchEdit,
    // Keyboard view
    ResetView,
    RefreshView {
        mode: Option<KbCompositionMode>,
        composing: bool,
    },
    ShowSubInputView,
    CloseSubInputView,
    ApplyPreferences {
        changes: Vec<KbPreferenceChange>,
    },
    // Candidate window
    ShowCandidates {
        category: KbCandidateCategory,
        candidates: Vec<KbCandidate>,
        focused_index: Option<u32>,
    },
    ClearCandidates,
    /// More results are on the way; call `poll` again.
    SchedulePoll,
}

fn surface_command(edit: SurfaceEdit) -> KbCommand {
    match edit {
        SurfaceEdit::DeleteSurrounding { left, right } => KbCommand::DeleteSurroundingText {
            left: left as u32,
            right: right as u32,
        },
        SurfaceEdit::CommitText { text, cursor } => KbCommand::CommitText {
            text,
            cursor: cursor.into(),
        },
        SurfaceEdit::SetComposingText { text, cursor } => KbCommand::SetComposingText {
            spans: text
                .spans
                .iter()
                .map(|s| KbStyledSpan {
                    start: s.start as u32,
                    end: s.end as u32,
                    style: s.style.into(),
                })
                .collect(),
            text: text.text,
            cursor: cursor.into(),
        },
        SurfaceEdit::SetSelection { start, end } => KbCommand::SetSelection {
            start: start as u32,
            end: end as u32,
        },
        SurfaceEdit::FinishComposingText => KbCommand::FinishComposingText,
        SurfaceEdit::SendKeyEvent(event) => KbCommand::SendKeyEvent {
            event: event.into(),
        },
    }
}

/// Flatten command results into the host's command list.
pub(super) fn convert_to_commands(results: Vec<CommandResult>, pending: bool) -> Vec<KbCommand> {
    let mut commands = Vec::new();
    for result in results {
        match result {
            CommandResult::InteractHost(action) => commands.push(match action {
                HostAction::RequestHide => KbCommand::RequestHide,
                HostAction::PerformEditorAction(action_id) => {
                    KbCommand::PerformEditorAction { action_id }
                }
                HostAction::SendDefaultEditorAction { from_enter_key } => {
                    KbCommand::SendDefaultEditorAction { from_enter_key }
                }
                HostAction::ShowStatusIcon { hiragana } => KbCommand::ShowStatusIcon { hiragana },
                HostAction::HideStatusIcon => KbCommand::HideStatusIcon,
            }),
            CommandResult::RenderToSurface(batch) => {
                if batch.is_empty() {
                    continue;
                }
                commands.push(KbCommand::BeginBatchEdit);
                commands.extend(batch.edits.into_iter().map(surface_command));
                commands.push(KbCommand::EndBatchEdit);
            }
            CommandResult::RenderToView(update) => commands.push(match update {
                ViewUpdate::Reset => KbCommand::ResetView,
                ViewUpdate::Refresh { mode, composing } => KbCommand::RefreshView {
                    mode: mode.map(Into::into),
                    composing,
                },
                ViewUpdate::ShowSubInputView => KbCommand::ShowSubInputView,
                ViewUpdate::CloseSubInputView => KbCommand::CloseSubInputView,
                ViewUpdate::ApplyPreferences(changes) => KbCommand::ApplyPreferences {
                    changes: changes.into_iter().map(Into::into).collect(),
                },
            }),
            CommandResult::RenderCandidates(update) => commands.push(match update {
                CandidateUpdate::Show {
                    category,
                    candidates,
                    focused_index,
                } => KbCommand::ShowCandidates {
                    category: category.into(),
                    candidates: candidates.into_iter().map(Into::into).collect(),
                    focused_index,
                },
                CandidateUpdate::Clear => KbCommand::ClearCandidates,
            }),
        }
    }
    if pending {
        commands.push(KbCommand::SchedulePoll);
    }
    commands
}
