//! Input session core: routes key envelopes, renders engine responses into
//! surface edits and keeps the predicted caret consistent with the host.
//!
//! `InputSession` does no I/O. Every operation returns [`Action`]s: engine
//! jobs to run in order and command results to deliver once the jobs queued
//! before them have completed. Engine completions come back through
//! [`InputSession::complete`], which yields the command results for the host.

pub mod command;
pub mod driver;
pub mod job;
pub mod memory;
pub mod mode;
pub mod render;
pub mod selection;
pub mod surface;

mod completion;
mod lifecycle;
mod router;

#[cfg(test)]
mod tests;

use std::time::Instant;

use kb_core::compat::{AppCompat, CompatPolicy};
use kb_core::field::FieldInfo;
use kb_core::key::KeyTrigger;
use kb_core::preferences::ClientPreferences;
use kb_core::settings::Settings;
use kb_core::spec::KeyboardSpecification;

pub use command::{
    CandidateUpdate, CommandResult, CursorPlacement, HostAction, SpanStyle, StyledSpan,
    StyledText, SurfaceBatch, SurfaceEdit, ViewUpdate,
};
pub use job::{Action, Completion, EngineRequest, Job, Outcome};
pub use mode::KeyboardModeState;
pub use selection::{HostSelection, SelectionTracker, SelectionVerdict, TrackerStatus};

/// Host-side view flags the router consults.
#[derive(Debug, Clone, Copy, Default)]
struct ViewState {
    input_view_shown: bool,
    input_bound: bool,
    sub_input_view: bool,
    narrow_mode: bool,
}

/// One input session. Owns the keyboard mode state and the selection tracker;
/// a focus reinitialises both.
pub struct InputSession {
    mode: KeyboardModeState,
    tracker: SelectionTracker,
    policy: CompatPolicy,
    compat: AppCompat,
    field: Option<FieldInfo>,
    view: ViewState,
    /// Specification to restore when the symbol panel closes.
    symbol_return: Option<KeyboardSpecification>,
    /// Last consumed render left a composition on the surface.
    composing: bool,

    generation: u64,
    next_seq: u64,
    last_completed_seq: u64,

    /// Selection to replay after the focus that follows a configuration change.
    pending_resync: Option<(usize, usize)>,
    preferences: Option<ClientPreferences>,
    epoch: Instant,
}

impl InputSession {
    pub fn new(policy: CompatPolicy, max_selection_records: usize) -> Self {
        Self {
            mode: KeyboardModeState::default(),
            tracker: SelectionTracker::new(max_selection_records),
            policy,
            compat: AppCompat::default(),
            field: None,
            view: ViewState::default(),
            symbol_return: None,
            composing: false,
            generation: 0,
            next_seq: 0,
            last_completed_seq: 0,
            pending_resync: None,
            preferences: None,
            epoch: Instant::now(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            CompatPolicy::from_settings(&settings.compat),
            settings.selection.max_records,
        )
    }

    pub fn current_spec(&self) -> KeyboardSpecification {
        self.mode.current()
    }

    pub fn mode(&self) -> &KeyboardModeState {
        &self.mode
    }

    pub fn tracker(&self) -> &SelectionTracker {
        &self.tracker
    }

    pub fn field(&self) -> Option<&FieldInfo> {
        self.field.as_ref()
    }

    pub fn compat(&self) -> AppCompat {
        self.compat
    }

    /// Generation stamped on new jobs; bumped by blur and window hide.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_composing(&self) -> bool {
        self.composing
    }

    pub fn is_input_view_shown(&self) -> bool {
        self.view.input_view_shown
    }

    pub fn is_sub_input_view_open(&self) -> bool {
        self.view.sub_input_view
    }

    pub fn set_input_bound(&mut self, bound: bool) {
        self.view.input_bound = bound;
    }

    fn job(&mut self, request: EngineRequest, trigger: Option<KeyTrigger>) -> Action {
        self.next_seq += 1;
        Action::Engine(Job {
            seq: self.next_seq,
            generation: self.generation,
            request,
            trigger,
        })
    }

    fn uptime_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Default for InputSession {
    fn default() -> Self {
        Self::from_settings(kb_core::settings::settings())
    }
}
