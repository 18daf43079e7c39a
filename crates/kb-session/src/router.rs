use kb_core::key::{
    keycode, EngineKey, KeyAction, KeyEnvelope, KeyTrigger, RawKeyEvent, TouchSample,
};
use kb_core::spec::{CompositionMode, KeyboardSpecification};
use tracing::{debug, debug_span, warn};

use super::command::{CommandResult, CursorPlacement, HostAction, SurfaceEdit, ViewUpdate};
use super::job::{Action, EngineRequest};
use super::InputSession;

impl InputSession {
    /// Route one key envelope.
    pub fn dispatch(&mut self, envelope: &KeyEnvelope) -> Vec<Action> {
        let _span = debug_span!(
            "dispatch",
            key_code = envelope.key_code,
            engine_key = envelope.engine_key.is_some(),
            spec = envelope.spec.map(|s| s.name()),
        )
        .entered();

        if !envelope.is_well_formed() {
            warn!("envelope carries neither a key nor a specification; dropped");
            return Vec::new();
        }
        if let Some(actions) = self.intercept(envelope) {
            return actions;
        }

        let trigger = envelope.trigger();
        match envelope.spec {
            Some(spec) if spec != self.mode.current() => {
                return self.change_spec_and_send(
                    spec,
                    envelope.engine_key.clone(),
                    Some(trigger),
                    envelope.touch_trace.clone(),
                );
            }
            _ => {}
        }

        if let Some(key) = &envelope.engine_key {
            let mut actions = self.flush_request_update();
            actions.push(self.job(
                EngineRequest::SendKey {
                    key: key.clone(),
                    touch_trace: envelope.touch_trace.clone(),
                },
                Some(trigger),
            ));
            return actions;
        }

        if envelope.key_code != keycode::UNKNOWN || envelope.raw.is_some() {
            debug!("no engine key; relaying to the application");
            return self
                .fallback(&trigger)
                .into_iter()
                .map(Action::Emit)
                .collect();
        }
        Vec::new()
    }

    /// Keys handled without the engine: back closes the symbol panel, enter
    /// runs the editor's own action when nothing is being composed.
    fn intercept(&mut self, envelope: &KeyEnvelope) -> Option<Vec<Action>> {
        match envelope.key_code {
            keycode::BACK if self.view.sub_input_view => {
                debug!("back closes the symbol panel");
                Some(self.close_symbol_panel())
            }
            keycode::ENTER if self.view.input_view_shown && !self.composing => {
                let field = self.field.as_ref()?;
                if !field.has_custom_enter_action() {
                    return None;
                }
                debug!(action_id = field.action_id, "enter performs editor action");
                Some(vec![Action::Emit(CommandResult::InteractHost(
                    HostAction::PerformEditorAction(field.action_id),
                ))])
            }
            _ => None,
        }
    }

    /// Switch specification, then either send the key in the new mode or
    /// switch the engine's input mode.
    pub(crate) fn change_spec_and_send(
        &mut self,
        spec: KeyboardSpecification,
        key: Option<EngineKey>,
        trigger: Option<KeyTrigger>,
        touch_trace: Vec<TouchSample>,
    ) -> Vec<Action> {
        let previous = self.mode.current();
        let mut actions = Vec::new();

        // Software to hardware by a printable key: flush the composition first.
        if !previous.is_hardware() && spec.is_hardware() && key.is_some() {
            debug!("submitting composition before hardware keyboard switch");
            actions.push(self.job(EngineRequest::Submit, None));
        }
        actions.extend(self.send_spec(spec, key, trigger, touch_trace));
        actions.push(Action::Emit(self.status_icon()));
        actions
    }

    /// Request update for `spec` followed by a key or a mode switch. No
    /// comparison with the current specification.
    pub(crate) fn send_spec(
        &mut self,
        spec: KeyboardSpecification,
        key: Option<EngineKey>,
        trigger: Option<KeyTrigger>,
        touch_trace: Vec<TouchSample>,
    ) -> Vec<Action> {
        let mode = spec.composition_mode();
        let request = self.mode.request_for(spec);
        let mut actions = vec![self.job(EngineRequest::UpdateRequest(request), None)];
        let next = match key {
            None => EngineRequest::SwitchInputMode(mode),
            Some(key) => EngineRequest::SendKey {
                key: key.with_mode(mode),
                touch_trace,
            },
        };
        actions.push(self.job(next, trigger));
        self.mode.set(spec);
        actions
    }

    fn flush_request_update(&mut self) -> Vec<Action> {
        match self.mode.take_pending_request() {
            Some(request) => vec![self.job(EngineRequest::UpdateRequest(request), None)],
            None => Vec::new(),
        }
    }

    pub(crate) fn status_icon(&self) -> CommandResult {
        let action = if self.view.input_view_shown {
            HostAction::ShowStatusIcon {
                hiragana: self.mode.current().composition_mode() == CompositionMode::Hiragana,
            }
        } else {
            HostAction::HideStatusIcon
        };
        CommandResult::InteractHost(action)
    }

    /// Deliver a key the engine did not take straight to the application.
    pub(crate) fn fallback(&mut self, trigger: &KeyTrigger) -> Vec<CommandResult> {
        if trigger.key_code == keycode::BACK && self.view.input_view_shown {
            if self.view.sub_input_view {
                self.view.sub_input_view = false;
                if let Some(spec) = self.symbol_return.take() {
                    self.mode.set(spec);
                    self.mode.mark_dirty();
                }
                return vec![CommandResult::RenderToView(ViewUpdate::CloseSubInputView)];
            }
            return vec![CommandResult::InteractHost(HostAction::RequestHide)];
        }
        if trigger.key_code == keycode::ENTER && self.view.input_view_shown {
            return vec![self.editor_action(true)];
        }

        let now = self.uptime_ms();
        if let Some(raw) = trigger.raw {
            if raw.is_meta_key() {
                return vec![CommandResult::surface(vec![SurfaceEdit::SendKeyEvent(
                    raw.replayed(raw.action, now, raw.repeat_count),
                )])];
            }
            return vec![CommandResult::surface(vec![
                SurfaceEdit::SendKeyEvent(raw.replayed(KeyAction::Down, now, 0)),
                SurfaceEdit::SendKeyEvent(raw.replayed(KeyAction::Up, now, 0)),
            ])];
        }

        match trigger.key_code {
            keycode::UNKNOWN => Vec::new(),
            keycode::SPACE => vec![CommandResult::surface(vec![SurfaceEdit::CommitText {
                text: " ".to_string(),
                cursor: CursorPlacement::Tail,
            }])],
            code => vec![CommandResult::surface(vec![
                SurfaceEdit::SendKeyEvent(RawKeyEvent::soft_key(code, KeyAction::Down, now)),
                SurfaceEdit::SendKeyEvent(RawKeyEvent::soft_key(code, KeyAction::Up, now)),
            ])],
        }
    }

    /// The editor's own action if it declares one, the default action otherwise.
    pub(crate) fn editor_action(&self, from_enter_key: bool) -> CommandResult {
        let action = match &self.field {
            Some(field) if field.has_custom_enter_action() => {
                HostAction::PerformEditorAction(field.action_id)
            }
            _ => HostAction::SendDefaultEditorAction { from_enter_key },
        };
        CommandResult::InteractHost(action)
    }
}
