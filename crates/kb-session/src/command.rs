//! Command results: what must happen next, decoupled from who applies it.
//!
//! Each variant goes to exactly one collaborator. Within one dispatch cycle the
//! host applies them in emission order, so a surface batch always lands before
//! the view and candidate updates that describe it.

use kb_core::engine::{Candidate, CandidateCategory, CandidateList};
use kb_core::key::RawKeyEvent;
use kb_core::preferences::PreferenceChange;
use kb_core::spec::CompositionMode;

#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    InteractHost(HostAction),
    RenderToSurface(SurfaceBatch),
    RenderToView(ViewUpdate),
    RenderCandidates(CandidateUpdate),
}

impl CommandResult {
    pub(crate) fn surface(edits: Vec<SurfaceEdit>) -> Self {
        Self::RenderToSurface(SurfaceBatch { edits })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostAction {
    RequestHide,
    PerformEditorAction(i32),
    SendDefaultEditorAction { from_enter_key: bool },
    ShowStatusIcon { hiragana: bool },
    HideStatusIcon,
}

/// Where the caret lands relative to inserted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorPlacement {
    Head,
    Tail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanStyle {
    Underline,
    ConversionHighlight,
    ConversionNormal,
    BeforeCursor,
    AfterCursor,
}

/// Style over `[start, end)`, in code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyledSpan {
    pub start: usize,
    pub end: usize,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledText {
    pub text: String,
    pub spans: Vec<StyledSpan>,
}

impl StyledText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            spans: Vec::new(),
        }
    }

    pub fn push_span(&mut self, start: usize, end: usize, style: SpanStyle) {
        self.spans.push(StyledSpan { start, end, style });
    }

    pub fn has_style(&self, style: SpanStyle) -> bool {
        self.spans.iter().any(|s| s.style == style)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEdit {
    DeleteSurrounding { left: usize, right: usize },
    CommitText { text: String, cursor: CursorPlacement },
    SetComposingText { text: StyledText, cursor: CursorPlacement },
    SetSelection { start: usize, end: usize },
    FinishComposingText,
    SendKeyEvent(RawKeyEvent),
}

impl SurfaceEdit {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeleteSurrounding { .. } => "delete_surrounding_text",
            Self::CommitText { .. } => "commit_text",
            Self::SetComposingText { .. } => "set_composing_text",
            Self::SetSelection { .. } => "set_selection",
            Self::FinishComposingText => "finish_composing_text",
            Self::SendKeyEvent(_) => "send_key_event",
        }
    }
}

/// Edits applied inside one begin/end batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceBatch {
    pub edits: Vec<SurfaceEdit>,
}

impl SurfaceBatch {
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    /// Back to the neutral keyboard with no composition.
    Reset,
    Refresh {
        mode: Option<CompositionMode>,
        composing: bool,
    },
    ShowSubInputView,
    CloseSubInputView,
    ApplyPreferences(Vec<PreferenceChange>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateUpdate {
    Show {
        category: CandidateCategory,
        candidates: Vec<Candidate>,
        focused_index: Option<u32>,
    },
    Clear,
}

impl CandidateUpdate {
    pub fn from_list(list: Option<&CandidateList>) -> Self {
        match list {
            Some(list) if !list.candidates.is_empty() => Self::Show {
                category: list.category,
                candidates: list.candidates.clone(),
                focused_index: list.focused_index,
            },
            _ => Self::Clear,
        }
    }
}
