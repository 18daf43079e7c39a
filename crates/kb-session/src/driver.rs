//! Synchronous driver: runs session actions to completion on the calling
//! thread against an engine and the in-memory collaborators. Used by tests
//! and by `kbtool replay`; the threaded runner lives in the host crate.

use kb_core::engine::{ConversionEngine, DeviceConfig};
use kb_core::field::FieldInfo;
use kb_core::key::{KeyEnvelope, TouchSample};
use kb_core::preferences::ClientPreferences;
use tracing::warn;

use crate::command::CommandResult;
use crate::job::Action;
use crate::memory::{MemorySurface, RecordingCandidates, RecordingHost, RecordingView};
use crate::selection::HostSelection;
use crate::surface::{deliver, Collaborators, TextSurface};
use crate::InputSession;

/// Upper bound on selection reports handled per pump, in case a host and the
/// tracker keep answering each other.
const MAX_REPORTS_PER_PUMP: usize = 32;

pub struct SyncDriver<E> {
    pub session: InputSession,
    pub engine: Option<E>,
    pub surface: MemorySurface,
    pub host: RecordingHost,
    pub view: RecordingView,
    pub candidates: RecordingCandidates,
    /// Feed surface selection reports back into the session after each step.
    pub echo_selection: bool,
    bound: bool,
    log: Vec<CommandResult>,
}

impl<E: ConversionEngine> SyncDriver<E> {
    pub fn new(session: InputSession, engine: Option<E>) -> Self {
        Self {
            session,
            engine,
            surface: MemorySurface::new(),
            host: RecordingHost::default(),
            view: RecordingView::default(),
            candidates: RecordingCandidates::default(),
            echo_selection: true,
            bound: false,
            log: Vec::new(),
        }
    }

    pub fn with_surface(mut self, surface: MemorySurface) -> Self {
        self.surface = surface;
        self
    }

    /// Every command result delivered so far.
    pub fn log(&self) -> &[CommandResult] {
        &self.log
    }

    pub fn take_log(&mut self) -> Vec<CommandResult> {
        std::mem::take(&mut self.log)
    }

    pub fn bind(&mut self, bound: bool) {
        self.bound = bound;
        self.session.set_input_bound(bound);
    }

    pub fn focus(&mut self, field: FieldInfo) {
        self.bind(true);
        let actions = self.session.on_focus(field);
        self.step(actions);
    }

    pub fn blur(&mut self) {
        let actions = self.session.on_blur();
        self.step(actions);
    }

    pub fn key(&mut self, envelope: &KeyEnvelope) {
        let actions = self.session.dispatch(envelope);
        self.step(actions);
    }

    pub fn selection(&mut self, report: HostSelection) {
        let actions = self.session.on_selection_changed(report);
        self.step(actions);
    }

    pub fn window_shown(&mut self) {
        let actions = self.session.on_window_shown();
        self.step(actions);
    }

    pub fn window_hidden(&mut self) {
        let actions = self.session.on_window_hidden();
        self.step(actions);
    }

    pub fn configuration_changed(&mut self, device: DeviceConfig) {
        let actions = self.session.on_configuration_changed(device);
        self.step(actions);
    }

    pub fn candidate_selected(&mut self, id: i32, row: Option<u32>) {
        let actions = self.session.on_candidate_selected(id, row);
        self.step(actions);
    }

    pub fn submit_preedit(&mut self) {
        let actions = self.session.on_submit_preedit();
        self.step(actions);
    }

    pub fn undo(&mut self, touch_trace: Vec<TouchSample>) {
        let actions = self.session.on_undo(touch_trace);
        self.step(actions);
    }

    pub fn expand_suggestion(&mut self) {
        let actions = self.session.on_expand_suggestion();
        self.step(actions);
    }

    pub fn preferences(&mut self, prefs: ClientPreferences) {
        let actions = self.session.propagate_preferences(prefs);
        self.step(actions);
    }

    /// Simulate a tap on the surface, then deliver the resulting report.
    pub fn tap(&mut self, pos: usize) {
        self.surface.tap(pos);
        self.pump_selection();
    }

    /// Run `actions` in order, then deliver pending selection reports.
    pub fn step(&mut self, actions: Vec<Action>) {
        self.run(actions);
        if self.echo_selection {
            self.pump_selection();
        }
    }

    pub fn pump_selection(&mut self) {
        for _ in 0..MAX_REPORTS_PER_PUMP {
            let Some(report) = self.surface.pop_report() else {
                return;
            };
            let actions = self.session.on_selection_changed(report);
            self.run(actions);
        }
        warn!("selection reports did not settle");
    }

    fn run(&mut self, actions: Vec<Action>) {
        for action in actions {
            let results = match action {
                Action::Engine(job) => {
                    let engine = self
                        .engine
                        .as_mut()
                        .map(|e| e as &mut dyn ConversionEngine);
                    let completion = job.run(engine);
                    self.session.complete(completion)
                }
                Action::Emit(result) => vec![result],
            };
            self.deliver(&results);
        }
    }

    fn deliver(&mut self, results: &[CommandResult]) {
        let mut to = Collaborators {
            host: &mut self.host,
            surface: if self.bound {
                Some(&mut self.surface as &mut dyn TextSurface)
            } else {
                None
            },
            view: &mut self.view,
            candidates: &mut self.candidates,
        };
        deliver(results, &mut to);
        self.log.extend_from_slice(results);
    }
}
