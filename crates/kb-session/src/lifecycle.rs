use kb_core::compat::AppCompat;
use kb_core::engine::{CommitResult, DeviceConfig, EngineResponse};
use kb_core::field::FieldInfo;
use kb_core::key::TouchSample;
use kb_core::preferences::{self, ClientPreferences, PreferenceChange};
use kb_core::spec::KeyboardSpecification;
use tracing::{debug, debug_span, info};

use super::command::{CandidateUpdate, CommandResult, CursorPlacement, SurfaceEdit, ViewUpdate};
use super::job::{Action, EngineRequest};
use super::selection::{HostSelection, SelectionVerdict};
use super::InputSession;

impl InputSession {
    /// A field gained focus.
    pub fn on_focus(&mut self, field: FieldInfo) -> Vec<Action> {
        let _span = debug_span!("focus", package = %field.package_name).entered();
        self.compat = self.policy.for_package(&field.package_name);

        let mut actions = Vec::new();
        if let Some(prefs) = &self.preferences {
            let fullscreen = self.compat.fullscreen_supported && prefs.fullscreen_mode;
            actions.push(Action::Emit(CommandResult::RenderToView(
                ViewUpdate::ApplyPreferences(vec![PreferenceChange::FullscreenMode(fullscreen)]),
            )));
        }
        // The new field may already hold composing text; reset unconditionally.
        actions.extend(self.reset_context());
        if self.view.input_bound {
            actions.push(finish_composing());
        }
        actions.push(self.job(
            EngineRequest::SwitchInputFieldType(field.field_type()),
            None,
        ));
        self.mode.mark_dirty();

        let web_field = field.is_web_edit_text() || self.compat.pretend_web_field;
        self.tracker.on_focus(field.initial_selection, web_field);
        self.composing = false;
        info!(
            field_type = ?field.field_type(),
            web_field,
            "input started"
        );
        self.field = Some(field);

        if let Some((start, end)) = self.pending_resync.take() {
            debug!(start, end, "replaying selection from before configuration change");
            actions.extend(self.on_selection_changed(HostSelection {
                old_start: start,
                old_end: end,
                new_start: start,
                new_end: end,
                composition: None,
            }));
        }
        actions
    }

    /// The field lost focus. In-flight work for it is abandoned.
    pub fn on_blur(&mut self) -> Vec<Action> {
        let _span = debug_span!("blur").entered();
        self.generation += 1;
        let actions = self.reset_context();
        self.tracker.clear();
        self.compat = AppCompat::default();
        self.field = None;
        self.composing = false;
        actions
    }

    pub fn on_selection_changed(&mut self, report: HostSelection) -> Vec<Action> {
        let _span = debug_span!(
            "selection",
            new_start = report.new_start,
            new_end = report.new_end
        )
        .entered();
        let verdict = self
            .tracker
            .on_host_selection_changed(report, self.compat.ignore_tail_moves);
        match verdict {
            SelectionVerdict::DoNothing => Vec::new(),
            SelectionVerdict::MoveCursor(caret) => {
                let start = report.composition.map_or(caret, |(start, _)| start);
                let offset = caret.saturating_sub(start) as u32;
                vec![self.job(EngineRequest::MoveCursor(offset), None)]
            }
            SelectionVerdict::ResetContext => {
                let mut actions = vec![self.job(EngineRequest::ResetContext, None)];
                // Only when our keyboard is up; other editors may own the composition.
                if self.view.input_view_shown && self.view.input_bound {
                    actions.push(finish_composing());
                }
                actions.push(Action::Emit(CommandResult::RenderToView(ViewUpdate::Reset)));
                actions.push(Action::Emit(CommandResult::RenderCandidates(
                    CandidateUpdate::Clear,
                )));
                self.composing = false;
                self.tracker.acknowledge_reset();
                actions
            }
        }
    }

    /// Device rotation and similar. The caret is re-synchronised after the
    /// focus that the host sends next.
    pub fn on_configuration_changed(&mut self, device: DeviceConfig) -> Vec<Action> {
        let _span = debug_span!("configuration_changed", ?device).entered();
        let mut actions = Vec::new();
        if self.view.input_bound {
            actions.push(finish_composing());
            self.pending_resync = self.tracker.last_selection();
        }
        actions.extend(self.reset_context());
        self.tracker.clear();
        self.composing = false;

        self.mode.set_device(device);
        let request = self.mode.request_for(self.mode.current());
        actions.push(self.job(EngineRequest::UpdateRequest(request), None));
        actions
    }

    pub fn on_window_shown(&mut self) -> Vec<Action> {
        let _span = debug_span!("window_shown").entered();
        self.view.input_view_shown = true;
        let mut actions = vec![Action::Emit(self.status_icon())];
        // The engine session may have been trimmed while hidden.
        let spec = self.mode.current();
        actions.extend(self.send_spec(spec, None, None, Vec::new()));
        actions
    }

    pub fn on_window_hidden(&mut self) -> Vec<Action> {
        let _span = debug_span!("window_hidden").entered();
        self.generation += 1;
        let mut actions = self.reset_context();
        self.tracker.clear();
        self.composing = false;
        self.view.input_view_shown = false;
        self.view.sub_input_view = false;
        actions.push(Action::Emit(self.status_icon()));
        actions
    }

    pub fn on_candidate_selected(&mut self, id: i32, row: Option<u32>) -> Vec<Action> {
        vec![self.job(EngineRequest::SubmitCandidate { id, row }, None)]
    }

    pub fn on_undo(&mut self, touch_trace: Vec<TouchSample>) -> Vec<Action> {
        vec![self.job(EngineRequest::UndoOrRewind { touch_trace }, None)]
    }

    pub fn on_expand_suggestion(&mut self) -> Vec<Action> {
        vec![self.job(EngineRequest::ExpandSuggestion, None)]
    }

    pub fn on_submit_preedit(&mut self) -> Vec<Action> {
        vec![self.job(EngineRequest::Submit, None)]
    }

    pub fn on_show_symbol_panel(&mut self) -> Vec<Action> {
        if !self.view.sub_input_view {
            self.symbol_return = Some(self.mode.current());
        }
        let mut actions =
            self.send_spec(KeyboardSpecification::SymbolNumber, None, None, Vec::new());
        actions.push(Action::Emit(CommandResult::RenderToView(
            ViewUpdate::ShowSubInputView,
        )));
        self.view.sub_input_view = true;
        actions
    }

    pub fn on_close_symbol_panel(&mut self) -> Vec<Action> {
        self.close_symbol_panel()
    }

    pub(crate) fn close_symbol_panel(&mut self) -> Vec<Action> {
        self.view.sub_input_view = false;
        let mut actions = vec![Action::Emit(CommandResult::RenderToView(
            ViewUpdate::CloseSubInputView,
        ))];
        let restore = self.symbol_return.take();
        // In narrow mode the hardware keyboard already switched the specification.
        if !self.view.narrow_mode {
            if let Some(spec) = restore {
                actions.extend(self.send_spec(spec, None, None, Vec::new()));
            }
        }
        actions
    }

    /// A symbol picked from the panel is committed directly.
    pub fn on_symbol_selected(&mut self, symbol: &str) -> Vec<Action> {
        if symbol.is_empty() {
            return Vec::new();
        }
        self.tracker.on_render(&EngineResponse {
            consumed: true,
            result: Some(CommitResult {
                value: symbol.to_string(),
                cursor_offset: None,
            }),
            ..EngineResponse::default()
        });
        vec![Action::Emit(CommandResult::surface(vec![
            SurfaceEdit::CommitText {
                text: symbol.to_string(),
                cursor: CursorPlacement::Tail,
            },
        ]))]
    }

    pub fn on_narrow_mode_changed(&mut self, narrow: bool) -> Vec<Action> {
        self.view.narrow_mode = narrow;
        if narrow {
            return Vec::new();
        }
        // Hardware to software keyboard: submit the composition.
        vec![self.job(EngineRequest::Submit, None)]
    }

    /// The keyboard's action key (not enter).
    pub fn on_action_key(&mut self) -> Vec<Action> {
        vec![Action::Emit(self.editor_action(false))]
    }

    pub fn propagate_preferences(&mut self, prefs: ClientPreferences) -> Vec<Action> {
        let changes = preferences::diff(self.preferences.as_ref(), &prefs, &self.compat);
        self.preferences = Some(prefs);
        if changes.is_empty() {
            return Vec::new();
        }
        debug!(count = changes.len(), "propagating preferences");
        vec![Action::Emit(CommandResult::RenderToView(
            ViewUpdate::ApplyPreferences(changes),
        ))]
    }

    fn reset_context(&mut self) -> Vec<Action> {
        vec![
            self.job(EngineRequest::ResetContext, None),
            Action::Emit(CommandResult::RenderToView(ViewUpdate::Reset)),
        ]
    }
}

fn finish_composing() -> Action {
    Action::Emit(CommandResult::surface(vec![SurfaceEdit::FinishComposingText]))
}
