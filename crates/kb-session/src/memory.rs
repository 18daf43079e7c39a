//! In-memory collaborators for headless use (tests, `kbtool replay`).
//!
//! `MemorySurface` follows the editing semantics of an Android editor closely
//! enough to exercise selection tracking: commits and composing text replace
//! the composing region (or the selection), and every batch that moves the
//! selection queues one `HostSelection` report, delivered after the outermost
//! `end_batch_edit`.

use std::collections::{HashSet, VecDeque};

use kb_core::key::{keycode, KeyAction, RawKeyEvent};

use crate::command::{CandidateUpdate, CursorPlacement, HostAction, StyledText, ViewUpdate};
use crate::selection::HostSelection;
use crate::surface::{CandidateView, HostLifecycle, KeyboardView, TextSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceOp {
    BeginBatch,
    EndBatch,
    DeleteSurrounding,
    CommitText,
    SetComposingText,
    SetSelection,
    FinishComposingText,
    SendKeyEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    BeginBatch,
    EndBatch,
    DeleteSurrounding(usize, usize),
    CommitText(String, CursorPlacement),
    SetComposingText(StyledText, CursorPlacement),
    SetSelection(usize, usize),
    FinishComposingText,
    SendKeyEvent(RawKeyEvent),
}

#[derive(Debug, Default)]
pub struct MemorySurface {
    text: Vec<char>,
    selection: (usize, usize),
    composing: Option<(usize, usize)>,
    batch_depth: u32,
    batch_origin: Option<((usize, usize), Option<(usize, usize)>)>,
    failing: HashSet<SurfaceOp>,
    calls: Vec<SurfaceCall>,
    reports: VecDeque<HostSelection>,
    key_events: Vec<RawKeyEvent>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surface already holding `text` with the caret at its end.
    pub fn with_text(text: &str) -> Self {
        let text: Vec<char> = text.chars().collect();
        let end = text.len();
        Self {
            text,
            selection: (end, end),
            ..Self::default()
        }
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub fn selection(&self) -> (usize, usize) {
        self.selection
    }

    pub fn caret(&self) -> usize {
        self.selection.1
    }

    pub fn composing_range(&self) -> Option<(usize, usize)> {
        self.composing
    }

    pub fn composing_text(&self) -> Option<String> {
        self.composing
            .map(|(start, end)| self.text[start..end].iter().collect())
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn key_events(&self) -> &[RawKeyEvent] {
        &self.key_events
    }

    /// Make `op` report failure (without effect) until cleared.
    pub fn set_failing(&mut self, op: SurfaceOp, failing: bool) {
        if failing {
            self.failing.insert(op);
        } else {
            self.failing.remove(&op);
        }
    }

    pub fn is_in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    pub fn pop_report(&mut self) -> Option<HostSelection> {
        self.reports.pop_front()
    }

    /// Simulate the user tapping at `pos` (outside any batch).
    pub fn tap(&mut self, pos: usize) {
        let before = self.snapshot();
        let pos = pos.min(self.text.len());
        self.selection = (pos, pos);
        self.report_if_changed(before);
    }

    /// Simulate the application replacing the whole field content.
    pub fn replace_all(&mut self, text: &str) {
        let before = self.snapshot();
        self.text = text.chars().collect();
        let end = self.text.len();
        self.selection = (end, end);
        self.composing = None;
        self.report_if_changed(before);
    }

    fn snapshot(&self) -> ((usize, usize), Option<(usize, usize)>) {
        (self.selection, self.composing)
    }

    fn report_if_changed(&mut self, before: ((usize, usize), Option<(usize, usize)>)) {
        if self.batch_depth > 0 {
            return;
        }
        if before != self.snapshot() {
            let (old, _) = before;
            self.reports.push_back(HostSelection {
                old_start: old.0,
                old_end: old.1,
                new_start: self.selection.0,
                new_end: self.selection.1,
                composition: self.composing,
            });
        }
    }

    fn fails(&self, op: SurfaceOp) -> bool {
        self.failing.contains(&op)
    }

    /// Replace the composing region, or the selection if none, with `text`.
    /// Returns the inserted range.
    fn replace_target(&mut self, text: &str) -> (usize, usize) {
        let (start, end) = match self.composing {
            Some(range) => range,
            None => (
                self.selection.0.min(self.selection.1),
                self.selection.0.max(self.selection.1),
            ),
        };
        let inserted: Vec<char> = text.chars().collect();
        let len = inserted.len();
        self.text.splice(start..end, inserted);
        (start, start + len)
    }

    fn mutate(&mut self, op: SurfaceOp, f: impl FnOnce(&mut Self)) -> bool {
        if self.fails(op) {
            return false;
        }
        let before = self.snapshot();
        f(self);
        self.report_if_changed(before);
        true
    }
}

impl TextSurface for MemorySurface {
    fn begin_batch_edit(&mut self) -> bool {
        self.calls.push(SurfaceCall::BeginBatch);
        if self.fails(SurfaceOp::BeginBatch) {
            return false;
        }
        if self.batch_depth == 0 {
            self.batch_origin = Some(self.snapshot());
        }
        self.batch_depth += 1;
        true
    }

    fn end_batch_edit(&mut self) -> bool {
        self.calls.push(SurfaceCall::EndBatch);
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 {
            if let Some(before) = self.batch_origin.take() {
                self.report_if_changed(before);
            }
        }
        !self.fails(SurfaceOp::EndBatch)
    }

    fn delete_surrounding_text(&mut self, left: usize, right: usize) -> bool {
        self.calls.push(SurfaceCall::DeleteSurrounding(left, right));
        self.mutate(SurfaceOp::DeleteSurrounding, |s| {
            let (sel_start, sel_end) = (
                s.selection.0.min(s.selection.1),
                s.selection.0.max(s.selection.1),
            );
            let after_end = (sel_end + right).min(s.text.len());
            s.text.drain(sel_end..after_end);
            let before_start = sel_start.saturating_sub(left);
            s.text.drain(before_start..sel_start);
            let removed = sel_start - before_start;
            s.selection = (sel_start - removed, sel_end - removed);
            s.composing = None;
        })
    }

    fn commit_text(&mut self, text: &str, cursor: CursorPlacement) -> bool {
        self.calls
            .push(SurfaceCall::CommitText(text.to_string(), cursor));
        self.mutate(SurfaceOp::CommitText, |s| {
            let (start, end) = s.replace_target(text);
            let caret = match cursor {
                CursorPlacement::Head => start,
                CursorPlacement::Tail => end,
            };
            s.selection = (caret, caret);
            s.composing = None;
        })
    }

    fn set_composing_text(&mut self, text: &StyledText, cursor: CursorPlacement) -> bool {
        self.calls
            .push(SurfaceCall::SetComposingText(text.clone(), cursor));
        self.mutate(SurfaceOp::SetComposingText, |s| {
            let (start, end) = s.replace_target(&text.text);
            let caret = match cursor {
                CursorPlacement::Head => start,
                CursorPlacement::Tail => end,
            };
            s.selection = (caret, caret);
            s.composing = (start != end).then_some((start, end));
        })
    }

    fn set_selection(&mut self, start: usize, end: usize) -> bool {
        self.calls.push(SurfaceCall::SetSelection(start, end));
        if start > self.text.len() || end > self.text.len() {
            return false;
        }
        self.mutate(SurfaceOp::SetSelection, |s| s.selection = (start, end))
    }

    fn finish_composing_text(&mut self) -> bool {
        self.calls.push(SurfaceCall::FinishComposingText);
        self.mutate(SurfaceOp::FinishComposingText, |s| s.composing = None)
    }

    fn send_key_event(&mut self, event: &RawKeyEvent) -> bool {
        self.calls.push(SurfaceCall::SendKeyEvent(*event));
        let event = *event;
        self.mutate(SurfaceOp::SendKeyEvent, |s| {
            s.key_events.push(event);
            if event.action != KeyAction::Down || event.key_code != keycode::DEL {
                return;
            }
            let (start, end) = (
                s.selection.0.min(s.selection.1),
                s.selection.0.max(s.selection.1),
            );
            if start != end {
                s.text.drain(start..end);
                s.selection = (start, start);
            } else if start > 0 {
                s.text.remove(start - 1);
                s.selection = (start - 1, start - 1);
            }
            s.composing = None;
        })
    }
}

/// Host lifecycle recorder.
#[derive(Debug, Default)]
pub struct RecordingHost {
    pub actions: Vec<HostAction>,
    pub status_icon: Option<bool>,
    pub hidden: bool,
}

impl HostLifecycle for RecordingHost {
    fn request_hide(&mut self) {
        self.hidden = true;
        self.actions.push(HostAction::RequestHide);
    }

    fn perform_editor_action(&mut self, action_id: i32) -> bool {
        self.actions.push(HostAction::PerformEditorAction(action_id));
        true
    }

    fn send_default_editor_action(&mut self, from_enter_key: bool) -> bool {
        self.actions
            .push(HostAction::SendDefaultEditorAction { from_enter_key });
        true
    }

    fn show_status_icon(&mut self, hiragana: bool) {
        self.status_icon = Some(hiragana);
        self.actions.push(HostAction::ShowStatusIcon { hiragana });
    }

    fn hide_status_icon(&mut self) {
        self.status_icon = None;
        self.actions.push(HostAction::HideStatusIcon);
    }
}

#[derive(Debug, Default)]
pub struct RecordingView {
    pub updates: Vec<ViewUpdate>,
}

impl KeyboardView for RecordingView {
    fn apply(&mut self, update: &ViewUpdate) {
        self.updates.push(update.clone());
    }
}

#[derive(Debug, Default)]
pub struct RecordingCandidates {
    pub updates: Vec<CandidateUpdate>,
}

impl RecordingCandidates {
    /// Whether the last update left candidates on screen.
    pub fn showing(&self) -> bool {
        matches!(self.updates.last(), Some(CandidateUpdate::Show { .. }))
    }
}

impl CandidateView for RecordingCandidates {
    fn apply(&mut self, update: &CandidateUpdate) {
        self.updates.push(update.clone());
    }
}
