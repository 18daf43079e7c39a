//! Collaborator boundaries and the code that applies command results to them.

use std::ops::{Deref, DerefMut};

use kb_core::key::RawKeyEvent;
use tracing::{debug, error};

use crate::command::{
    CandidateUpdate, CommandResult, CursorPlacement, HostAction, StyledText, SurfaceBatch,
    SurfaceEdit, ViewUpdate,
};

/// The focused text field. Mutations return `false` when the host rejects them.
pub trait TextSurface {
    fn begin_batch_edit(&mut self) -> bool;
    fn end_batch_edit(&mut self) -> bool;
    fn delete_surrounding_text(&mut self, left: usize, right: usize) -> bool;
    fn commit_text(&mut self, text: &str, cursor: CursorPlacement) -> bool;
    fn set_composing_text(&mut self, text: &StyledText, cursor: CursorPlacement) -> bool;
    fn set_selection(&mut self, start: usize, end: usize) -> bool;
    fn finish_composing_text(&mut self) -> bool;
    fn send_key_event(&mut self, event: &RawKeyEvent) -> bool;
}

pub trait HostLifecycle {
    fn request_hide(&mut self);
    fn perform_editor_action(&mut self, action_id: i32) -> bool;
    fn send_default_editor_action(&mut self, from_enter_key: bool) -> bool;
    fn show_status_icon(&mut self, hiragana: bool);
    fn hide_status_icon(&mut self);
}

pub trait KeyboardView {
    fn apply(&mut self, update: &ViewUpdate);
}

pub trait CandidateView {
    fn apply(&mut self, update: &CandidateUpdate);
}

/// Scoped batch edit: begun on creation, ended on drop.
pub struct BatchEdit<'a, S: TextSurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: TextSurface + ?Sized> BatchEdit<'a, S> {
    pub fn begin(surface: &'a mut S) -> Self {
        if !surface.begin_batch_edit() {
            error!("begin_batch_edit rejected");
        }
        Self { surface }
    }
}

impl<S: TextSurface + ?Sized> Deref for BatchEdit<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: TextSurface + ?Sized> DerefMut for BatchEdit<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: TextSurface + ?Sized> Drop for BatchEdit<'_, S> {
    fn drop(&mut self) {
        if !self.surface.end_batch_edit() {
            error!("end_batch_edit rejected");
        }
    }
}

pub fn apply_edit<S: TextSurface + ?Sized>(surface: &mut S, edit: &SurfaceEdit) -> bool {
    match edit {
        SurfaceEdit::DeleteSurrounding { left, right } => {
            surface.delete_surrounding_text(*left, *right)
        }
        SurfaceEdit::CommitText { text, cursor } => surface.commit_text(text, *cursor),
        SurfaceEdit::SetComposingText { text, cursor } => surface.set_composing_text(text, *cursor),
        SurfaceEdit::SetSelection { start, end } => surface.set_selection(*start, *end),
        SurfaceEdit::FinishComposingText => surface.finish_composing_text(),
        SurfaceEdit::SendKeyEvent(event) => surface.send_key_event(event),
    }
}

/// Apply every edit inside one batch. Rejections are logged and skipped.
/// Returns the number of rejected edits.
pub fn apply_batch<S: TextSurface + ?Sized>(surface: &mut S, batch: &SurfaceBatch) -> usize {
    if batch.is_empty() {
        return 0;
    }
    let mut edit = BatchEdit::begin(surface);
    let mut failures = 0;
    for e in &batch.edits {
        if !apply_edit(&mut *edit, e) {
            error!(op = e.name(), "surface rejected edit");
            failures += 1;
        }
    }
    failures
}

/// Everything command results are delivered to. `surface` is `None` while no
/// field is bound; surface results are then dropped.
pub struct Collaborators<'a> {
    pub host: &'a mut dyn HostLifecycle,
    pub surface: Option<&'a mut dyn TextSurface>,
    pub view: &'a mut dyn KeyboardView,
    pub candidates: &'a mut dyn CandidateView,
}

pub fn deliver(results: &[CommandResult], to: &mut Collaborators<'_>) {
    for result in results {
        match result {
            CommandResult::InteractHost(action) => apply_host_action(to.host, *action),
            CommandResult::RenderToSurface(batch) => match to.surface.as_deref_mut() {
                Some(surface) => {
                    apply_batch(surface, batch);
                }
                None => debug!(edits = batch.edits.len(), "no bound surface; batch dropped"),
            },
            CommandResult::RenderToView(update) => to.view.apply(update),
            CommandResult::RenderCandidates(update) => to.candidates.apply(update),
        }
    }
}

fn apply_host_action(host: &mut dyn HostLifecycle, action: HostAction) {
    match action {
        HostAction::RequestHide => host.request_hide(),
        HostAction::PerformEditorAction(id) => {
            if !host.perform_editor_action(id) {
                error!(action_id = id, "editor action rejected");
            }
        }
        HostAction::SendDefaultEditorAction { from_enter_key } => {
            if !host.send_default_editor_action(from_enter_key) {
                debug!(from_enter_key, "default editor action not handled");
            }
        }
        HostAction::ShowStatusIcon { hiragana } => host.show_status_icon(hiragana),
        HostAction::HideStatusIcon => host.hide_status_icon(),
    }
}
