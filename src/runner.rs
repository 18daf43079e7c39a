//! Session runner: the single consumer that feeds one `InputSession` from the
//! host and the engine worker.
//!
//! Lifecycle events are applied at once. Key envelopes wait in a backlog
//! while earlier engine work is still unrendered, so each key is routed
//! against the state its predecessors left behind.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use kb_core::engine::{ConversionEngine, DeviceConfig};
use kb_core::field::FieldInfo;
use kb_core::key::{KeyEnvelope, TouchSample};
use kb_core::preferences::ClientPreferences;
use kb_core::settings::Settings;
use kb_session::{Action, CommandResult, HostSelection, InputSession};
use tracing::{debug, warn};

use crate::executor::{EngineWorker, WorkOutput};
use crate::housekeeping::Housekeeping;

pub struct SessionRunner {
    session: InputSession,
    housekeeping: Option<Housekeeping>,
    worker: EngineWorker,
    /// Actions submitted to the worker whose output has not been received.
    in_flight: usize,
    backlog: VecDeque<KeyEnvelope>,
    ready: Vec<CommandResult>,
}

impl SessionRunner {
    pub fn new(session: InputSession, engine: Option<Box<dyn ConversionEngine>>) -> Self {
        Self {
            session,
            housekeeping: None,
            worker: EngineWorker::spawn(engine),
            in_flight: 0,
            backlog: VecDeque::new(),
            ready: Vec::new(),
        }
    }

    pub fn from_settings(settings: &Settings, engine: Option<Box<dyn ConversionEngine>>) -> Self {
        let mut runner = Self::new(InputSession::from_settings(settings), engine);
        runner.housekeeping = Some(Housekeeping::start(
            runner.worker.handle(),
            settings.housekeeping.sync_interval(),
            settings.housekeeping.memory_trim_delay(),
        ));
        runner
    }

    pub fn session(&self) -> &InputSession {
        &self.session
    }

    /// Engine work or queued keys remain; the host should poll again.
    pub fn has_pending(&self) -> bool {
        self.in_flight > 0 || !self.backlog.is_empty()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    // --- Keys ---

    pub fn dispatch(&mut self, envelope: KeyEnvelope) {
        if self.has_pending() {
            debug!(backlog = self.backlog.len() + 1, "key queued behind engine work");
            self.backlog.push_back(envelope);
            return;
        }
        let actions = self.session.dispatch(&envelope);
        self.enqueue(actions);
    }

    // --- Results ---

    /// Command results ready now, in order. Releases queued keys once the
    /// work ahead of them has been rendered.
    pub fn poll(&mut self) -> Vec<CommandResult> {
        while let Some(output) = self.worker.try_recv() {
            self.accept(output);
        }
        self.release_backlog();
        std::mem::take(&mut self.ready)
    }

    /// Like [`poll`](Self::poll), but blocks until all work and queued keys
    /// are done or `timeout` passes.
    pub fn wait(&mut self, timeout: Duration) -> Vec<CommandResult> {
        let deadline = Instant::now() + timeout;
        loop {
            while let Some(output) = self.worker.try_recv() {
                self.accept(output);
            }
            self.release_backlog();
            if self.in_flight == 0 {
                break;
            }
            let left = deadline.saturating_duration_since(Instant::now());
            match self.worker.recv_timeout(left) {
                Some(output) => self.accept(output),
                None => {
                    warn!(in_flight = self.in_flight, "engine work still pending at timeout");
                    break;
                }
            }
        }
        std::mem::take(&mut self.ready)
    }

    // --- Lifecycle ---

    pub fn set_input_bound(&mut self, bound: bool) {
        self.session.set_input_bound(bound);
    }

    pub fn focus(&mut self, field: FieldInfo) {
        let actions = self.session.on_focus(field);
        self.enqueue(actions);
    }

    pub fn blur(&mut self) {
        self.drop_backlog("blur");
        let actions = self.session.on_blur();
        self.enqueue(actions);
    }

    pub fn selection_changed(&mut self, report: HostSelection) {
        let actions = self.session.on_selection_changed(report);
        self.enqueue(actions);
    }

    pub fn configuration_changed(&mut self, device: DeviceConfig) {
        let actions = self.session.on_configuration_changed(device);
        self.enqueue(actions);
    }

    pub fn window_shown(&mut self) {
        if let Some(housekeeping) = &self.housekeeping {
            housekeeping.window_shown();
        }
        let actions = self.session.on_window_shown();
        self.enqueue(actions);
    }

    pub fn window_hidden(&mut self) {
        self.drop_backlog("window hidden");
        let actions = self.session.on_window_hidden();
        self.enqueue(actions);
        if let Some(housekeeping) = &self.housekeeping {
            housekeeping.window_hidden();
        }
    }

    pub fn candidate_selected(&mut self, id: i32, row: Option<u32>) {
        let actions = self.session.on_candidate_selected(id, row);
        self.enqueue(actions);
    }

    pub fn submit_preedit(&mut self) {
        let actions = self.session.on_submit_preedit();
        self.enqueue(actions);
    }

    pub fn undo(&mut self, touch_trace: Vec<TouchSample>) {
        let actions = self.session.on_undo(touch_trace);
        self.enqueue(actions);
    }

    pub fn expand_suggestion(&mut self) {
        let actions = self.session.on_expand_suggestion();
        self.enqueue(actions);
    }

    pub fn show_symbol_panel(&mut self) {
        let actions = self.session.on_show_symbol_panel();
        self.enqueue(actions);
    }

    pub fn close_symbol_panel(&mut self) {
        let actions = self.session.on_close_symbol_panel();
        self.enqueue(actions);
    }

    pub fn symbol_selected(&mut self, symbol: &str) {
        let actions = self.session.on_symbol_selected(symbol);
        self.enqueue(actions);
    }

    pub fn narrow_mode_changed(&mut self, narrow: bool) {
        let actions = self.session.on_narrow_mode_changed(narrow);
        self.enqueue(actions);
    }

    pub fn action_key(&mut self) {
        let actions = self.session.on_action_key();
        self.enqueue(actions);
    }

    pub fn propagate_preferences(&mut self, prefs: ClientPreferences) {
        let actions = self.session.propagate_preferences(prefs);
        self.enqueue(actions);
    }

    // --- Internals ---

    fn enqueue(&mut self, actions: Vec<Action>) {
        let generation = self.session.generation();
        self.worker.set_generation(generation);
        for action in actions {
            match self.worker.submit(action, generation) {
                Ok(()) => self.in_flight += 1,
                Err(action) => {
                    warn!("engine worker gone; completing locally");
                    self.run_locally(action);
                }
            }
        }
    }

    fn run_locally(&mut self, action: Action) {
        match action {
            Action::Engine(job) => {
                let results = self.session.complete(job.run(None));
                self.ready.extend(results);
            }
            Action::Emit(result) => self.ready.push(result),
        }
    }

    fn accept(&mut self, output: WorkOutput) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match output {
            WorkOutput::Completed(completion) => {
                let results = self.session.complete(completion);
                self.ready.extend(results);
            }
            WorkOutput::Relayed(result) => self.ready.push(result),
            WorkOutput::Dropped => {}
        }
    }

    fn release_backlog(&mut self) {
        while self.in_flight == 0 {
            let Some(envelope) = self.backlog.pop_front() else {
                break;
            };
            let actions = self.session.dispatch(&envelope);
            self.enqueue(actions);
        }
    }

    fn drop_backlog(&mut self, reason: &str) {
        if !self.backlog.is_empty() {
            debug!(dropped = self.backlog.len(), reason, "queued keys discarded");
            self.backlog.clear();
        }
    }
}
