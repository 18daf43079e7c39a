use std::sync::{Arc, Mutex};
use std::time::Duration;

use kb_core::engine::ConversionEngine;
use kb_core::settings::settings;

use crate::runner::SessionRunner;

use super::engine::{ForeignEngine, KbEngine};
use super::types::{
    convert_to_commands, KbCommand, KbDeviceConfig, KbFieldInfo, KbKeyEnvelope,
    KbKeyboardSpecification, KbPreferences, KbSelectionUpdate, KbTouchSample,
};

/// One input method session. Every call returns the commands that are ready;
/// a trailing `SchedulePoll` means engine work is still running.
#[derive(uniffi::Object)]
pub struct KbSession {
    runner: Mutex<SessionRunner>,
}

#[uniffi::export]
impl KbSession {
    #[uniffi::constructor]
    pub(super) fn new(engine: Option<Arc<dyn KbEngine>>) -> Arc<Self> {
        let engine = engine
            .map(|e| Box::new(ForeignEngine::new(e)) as Box<dyn ConversionEngine>);
        Arc::new(Self {
            runner: Mutex::new(SessionRunner::from_settings(settings(), engine)),
        })
    }

    fn dispatch_key(&self, envelope: KbKeyEnvelope) -> Vec<KbCommand> {
        self.with_runner(|r| r.dispatch(envelope.into()))
    }

    fn poll(&self) -> Vec<KbCommand> {
        self.with_runner(|_| {})
    }

    /// Block until pending work is rendered or `timeout_ms` passes.
    fn wait_idle(&self, timeout_ms: u64) -> Vec<KbCommand> {
        let mut runner = self.runner.lock().unwrap();
        let results = runner.wait(Duration::from_millis(timeout_ms));
        convert_to_commands(results, runner.has_pending())
    }

    fn set_input_bound(&self, bound: bool) {
        self.runner.lock().unwrap().set_input_bound(bound);
    }

    fn focus(&self, field: KbFieldInfo) -> Vec<KbCommand> {
        self.with_runner(|r| r.focus(field.into()))
    }

    fn blur(&self) -> Vec<KbCommand> {
        self.with_runner(SessionRunner::blur)
    }

    fn update_selection(&self, update: KbSelectionUpdate) -> Vec<KbCommand> {
        self.with_runner(|r| r.selection_changed(update.into()))
    }

    fn configuration_changed(&self, device: KbDeviceConfig) -> Vec<KbCommand> {
        self.with_runner(|r| r.configuration_changed(device.into()))
    }

    fn window_shown(&self) -> Vec<KbCommand> {
        self.with_runner(SessionRunner::window_shown)
    }

    fn window_hidden(&self) -> Vec<KbCommand> {
        self.with_runner(SessionRunner::window_hidden)
    }

    fn candidate_selected(&self, id: i32, row: Option<u32>) -> Vec<KbCommand> {
        self.with_runner(|r| r.candidate_selected(id, row))
    }

    fn submit_preedit(&self) -> Vec<KbCommand> {
        self.with_runner(SessionRunner::submit_preedit)
    }

    fn undo(&self, touch_trace: Vec<KbTouchSample>) -> Vec<KbCommand> {
        let trace = touch_trace.into_iter().map(Into::into).collect();
        self.with_runner(|r| r.undo(trace))
    }

    fn expand_suggestion(&self) -> Vec<KbCommand> {
        self.with_runner(SessionRunner::expand_suggestion)
    }

    fn show_symbol_panel(&self) -> Vec<KbCommand> {
        self.with_runner(SessionRunner::show_symbol_panel)
    }

    fn close_symbol_panel(&self) -> Vec<KbCommand> {
        self.with_runner(SessionRunner::close_symbol_panel)
    }

    fn symbol_selected(&self, symbol: String) -> Vec<KbCommand> {
        self.with_runner(|r| r.symbol_selected(&symbol))
    }

    fn narrow_mode_changed(&self, narrow: bool) -> Vec<KbCommand> {
        self.with_runner(|r| r.narrow_mode_changed(narrow))
    }

    fn action_key(&self) -> Vec<KbCommand> {
        self.with_runner(SessionRunner::action_key)
    }

    fn propagate_preferences(&self, prefs: KbPreferences) -> Vec<KbCommand> {
        self.with_runner(|r| r.propagate_preferences(prefs.into()))
    }

    fn is_composing(&self) -> bool {
        self.runner.lock().unwrap().session().is_composing()
    }

    fn current_spec(&self) -> KbKeyboardSpecification {
        self.runner.lock().unwrap().session().current_spec().into()
    }
}

impl KbSession {
    fn with_runner(&self, f: impl FnOnce(&mut SessionRunner)) -> Vec<KbCommand> {
        let mut runner = self.runner.lock().unwrap();
        f(&mut runner);
        let results = runner.poll();
        convert_to_commands(results, runner.has_pending())
    }
}
